use quarry_core::Resources;
use quarry_ports::SorterOptions;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::Sorter;

#[derive(Debug, Clone)]
struct Client {
    weight: Decimal,
    allocation: Resources,
}

/// Dominant Resource Fairness sorter
///
/// A client's share is the largest fraction of any single resource it holds,
/// divided by its weight. Clients with the smallest share go first; ties are
/// broken by name.
pub struct DrfSorter {
    clients: BTreeMap<String, Client>,
    total: Resources,
    options: SorterOptions,
}

impl DrfSorter {
    pub fn new(options: SorterOptions) -> Self {
        Self {
            clients: BTreeMap::new(),
            total: Resources::new(),
            options,
        }
    }

    /// Weighted dominant share of a client (zero for unknown clients)
    pub fn share(&self, client: &str) -> Decimal {
        self.clients
            .get(client)
            .map(|c| self.weighted_share(c))
            .unwrap_or(Decimal::ZERO)
    }

    fn weighted_share(&self, client: &Client) -> Decimal {
        let mut share = Decimal::ZERO;
        for (name, allocated) in client.allocation.iter() {
            if self.options.fairness_excluded_resource_names.contains(name) {
                continue;
            }
            let Some(total) = self.total.scalar(name) else {
                continue;
            };
            if total.is_zero() {
                continue;
            }
            share = share.max(allocated / total);
        }

        if client.weight.is_zero() {
            share
        } else {
            share / client.weight
        }
    }
}

impl Sorter for DrfSorter {
    fn name(&self) -> &str {
        "drf"
    }

    fn add(&mut self, client: &str) {
        self.clients.entry(client.to_string()).or_insert(Client {
            weight: Decimal::ONE,
            allocation: Resources::new(),
        });
    }

    fn contains(&self, client: &str) -> bool {
        self.clients.contains_key(client)
    }

    fn count(&self) -> usize {
        self.clients.len()
    }

    fn set_weight(&mut self, client: &str, weight: Decimal) {
        self.add(client);
        if let Some(c) = self.clients.get_mut(client) {
            c.weight = weight;
        }
    }

    fn add_total(&mut self, resources: &Resources) {
        self.total += resources;
    }

    fn allocated(&mut self, client: &str, resources: &Resources) {
        if let Some(c) = self.clients.get_mut(client) {
            c.allocation += resources;
        }
    }

    fn unallocated(&mut self, client: &str, resources: &Resources) {
        if let Some(c) = self.clients.get_mut(client) {
            c.allocation -= resources;
        }
    }

    fn sort(&mut self) -> Vec<String> {
        let mut shares: Vec<(Decimal, &String)> = self
            .clients
            .iter()
            .map(|(name, c)| (self.weighted_share(c), name))
            .collect();
        shares.sort();
        shares.into_iter().map(|(_, name)| name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn res(text: &str) -> Resources {
        Resources::parse(text).unwrap()
    }

    #[test]
    fn test_unallocated_clients_sort_by_name() {
        let mut sorter = DrfSorter::new(SorterOptions::default());
        sorter.add("b");
        sorter.add("a");
        sorter.add("c");
        sorter.add("a");

        assert_eq!(sorter.count(), 3);
        assert_eq!(sorter.sort(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_dominant_share_orders_clients() {
        let mut sorter = DrfSorter::new(SorterOptions::default());
        sorter.add_total(&res("cpus:10;mem:1000"));
        sorter.add("a");
        sorter.add("b");

        // a: cpus 4/10 = 0.4, mem 100/1000 = 0.1 -> 0.4
        sorter.allocated("a", &res("cpus:4;mem:100"));
        // b: cpus 1/10 = 0.1, mem 300/1000 = 0.3 -> 0.3
        sorter.allocated("b", &res("cpus:1;mem:300"));

        assert_eq!(sorter.share("a"), dec!(0.4));
        assert_eq!(sorter.share("b"), dec!(0.3));
        assert_eq!(sorter.sort(), vec!["b", "a"]);

        sorter.unallocated("a", &res("cpus:4"));
        assert_eq!(sorter.sort(), vec!["a", "b"]);
    }

    #[test]
    fn test_weight_scales_share() {
        let mut sorter = DrfSorter::new(SorterOptions::default());
        sorter.add_total(&res("cpus:10"));
        sorter.add("heavy");
        sorter.add("light");
        sorter.set_weight("heavy", dec!(4));

        sorter.allocated("heavy", &res("cpus:4"));
        sorter.allocated("light", &res("cpus:2"));

        // heavy: 0.4 / 4 = 0.1, light: 0.2
        assert_eq!(sorter.sort(), vec!["heavy", "light"]);
    }

    #[test]
    fn test_excluded_resources_ignored() {
        let options = SorterOptions {
            fairness_excluded_resource_names: ["gpus".to_string()].into_iter().collect(),
        };
        let mut sorter = DrfSorter::new(options);
        sorter.add_total(&res("cpus:10;gpus:2"));
        sorter.add("gpu-user");
        sorter.allocated("gpu-user", &res("cpus:1;gpus:2"));

        assert_eq!(sorter.share("gpu-user"), dec!(0.1));
    }

    #[test]
    fn test_allocation_for_unknown_client_is_ignored() {
        let mut sorter = DrfSorter::new(SorterOptions::default());
        sorter.add_total(&res("cpus:10"));
        sorter.allocated("ghost", &res("cpus:5"));

        assert!(!sorter.contains("ghost"));
        assert_eq!(sorter.share("ghost"), Decimal::ZERO);
    }
}
