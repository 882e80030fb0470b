use quarry_core::Resources;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

use super::Sorter;

/// Sorter that ignores allocations and shuffles clients every round
///
/// Seeded, so the same sequence of rounds yields the same orders.
pub struct RandomSorter {
    clients: BTreeSet<String>,
    rng: StdRng,
}

impl RandomSorter {
    pub fn new(seed: u64) -> Self {
        Self {
            clients: BTreeSet::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sorter for RandomSorter {
    fn name(&self) -> &str {
        "random"
    }

    fn add(&mut self, client: &str) {
        self.clients.insert(client.to_string());
    }

    fn contains(&self, client: &str) -> bool {
        self.clients.contains(client)
    }

    fn count(&self) -> usize {
        self.clients.len()
    }

    fn set_weight(&mut self, client: &str, _weight: Decimal) {
        self.add(client);
    }

    fn add_total(&mut self, _resources: &Resources) {}

    fn allocated(&mut self, _client: &str, _resources: &Resources) {}

    fn unallocated(&mut self, _client: &str, _resources: &Resources) {}

    fn sort(&mut self) -> Vec<String> {
        let mut order: Vec<String> = self.clients.iter().cloned().collect();
        order.shuffle(&mut self.rng);
        order
    }
}
