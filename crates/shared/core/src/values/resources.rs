use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

use super::Quantity;

/// Errors produced while parsing a resource string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourcesError {
    #[error("Missing ':' in resource entry '{0}'")]
    MissingSeparator(String),

    #[error("Empty resource name in entry '{0}'")]
    EmptyName(String),

    #[error("Invalid quantity for resource '{name}': {value}")]
    InvalidQuantity { name: String, value: String },

    #[error("Negative quantity for resource '{name}': {value}")]
    NegativeQuantity { name: String, value: Quantity },

    #[error("Quantity of resource '{name}' is too large")]
    Overflow { name: String },
}

/// A bag of named scalar resources, e.g. `cpus:4;mem:4096`
///
/// Entries are kept sorted by name so iteration, display and equality are
/// deterministic. Zero quantities are never stored: subtracting a resource
/// down to zero removes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resources {
    scalars: BTreeMap<String, Quantity>,
}

impl Resources {
    /// Create an empty resource bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the canonical `name:value;name:value` form
    ///
    /// Whitespace around entries is ignored and repeated names are summed.
    pub fn parse(text: &str) -> Result<Self, ResourcesError> {
        let mut resources = Self::new();

        for entry in text.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, value) = entry
                .split_once(':')
                .ok_or_else(|| ResourcesError::MissingSeparator(entry.to_string()))?;

            let name = name.trim();
            if name.is_empty() {
                return Err(ResourcesError::EmptyName(entry.to_string()));
            }

            let quantity = Decimal::from_str(value.trim())
                .or_else(|_| Decimal::from_scientific(value.trim()))
                .map_err(|_| ResourcesError::InvalidQuantity {
                    name: name.to_string(),
                    value: value.trim().to_string(),
                })?;

            if quantity.is_sign_negative() && !quantity.is_zero() {
                return Err(ResourcesError::NegativeQuantity {
                    name: name.to_string(),
                    value: quantity,
                });
            }

            resources.checked_add_scalar(name, quantity)?;
        }

        Ok(resources)
    }

    fn checked_add_scalar(
        &mut self,
        name: &str,
        quantity: Quantity,
    ) -> Result<(), ResourcesError> {
        if quantity.is_zero() {
            return Ok(());
        }
        let entry = self.scalars.entry(name.to_string()).or_insert(Decimal::ZERO);
        *entry = entry
            .checked_add(quantity)
            .ok_or_else(|| ResourcesError::Overflow {
                name: name.to_string(),
            })?
            .normalize();
        Ok(())
    }

    /// Adds `quantity`, saturating at the largest representable value
    fn add_scalar(&mut self, name: impl Into<String>, quantity: Quantity) {
        if quantity.is_zero() {
            return;
        }
        let entry = self.scalars.entry(name.into()).or_insert(Decimal::ZERO);
        *entry = entry.saturating_add(quantity).normalize();
    }

    /// Quantity of a named resource, if present
    pub fn scalar(&self, name: &str) -> Option<Quantity> {
        self.scalars.get(name).copied()
    }

    pub fn cpus(&self) -> Option<Quantity> {
        self.scalar("cpus")
    }

    pub fn mem(&self) -> Option<Quantity> {
        self.scalar("mem")
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty()
    }

    /// Iterate `(name, quantity)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Quantity)> {
        self.scalars.iter().map(|(name, q)| (name.as_str(), *q))
    }

    /// True if every entry of `other` fits inside `self`
    pub fn contains(&self, other: &Resources) -> bool {
        other
            .scalars
            .iter()
            .all(|(name, q)| self.scalars.get(name).is_some_and(|have| have >= q))
    }
}

impl fmt::Display for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, q) in &self.scalars {
            if !first {
                write!(f, ";")?;
            }
            write!(f, "{}:{}", name, q)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Resources {
    type Err = ResourcesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Resources {
    type Error = ResourcesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Resources> for String {
    fn from(resources: Resources) -> Self {
        resources.to_string()
    }
}

/// Addition saturates at the largest representable quantity.
impl AddAssign<&Resources> for Resources {
    fn add_assign(&mut self, rhs: &Resources) {
        for (name, q) in &rhs.scalars {
            self.add_scalar(name.clone(), *q);
        }
    }
}

impl Add<&Resources> for Resources {
    type Output = Resources;

    fn add(mut self, rhs: &Resources) -> Resources {
        self += rhs;
        self
    }
}

/// Subtraction saturates at zero; exhausted entries are removed.
impl SubAssign<&Resources> for Resources {
    fn sub_assign(&mut self, rhs: &Resources) {
        for (name, q) in &rhs.scalars {
            if let Some(have) = self.scalars.get_mut(name) {
                if *have <= *q {
                    self.scalars.remove(name);
                } else {
                    *have = (*have - *q).normalize();
                }
            }
        }
    }
}

impl Sub<&Resources> for Resources {
    type Output = Resources;

    fn sub(mut self, rhs: &Resources) -> Resources {
        self -= rhs;
        self
    }
}

impl<'a> Sum<&'a Resources> for Resources {
    fn sum<I: Iterator<Item = &'a Resources>>(iter: I) -> Self {
        iter.fold(Resources::new(), |acc, r| acc + r)
    }
}
