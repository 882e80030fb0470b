use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

mod resources;

pub use resources::{Resources, ResourcesError};

/// Scalar resource quantity - uses Decimal so fractional cpus stay exact
pub type Quantity = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;
