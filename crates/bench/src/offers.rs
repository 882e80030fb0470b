//! Offer collector
//!
//! The default offer sink: every (role, agent) entry of an allocation round
//! becomes one `OfferedResources`, queued for benchmark logic to consume.

use log::trace;
use quarry_core::{AgentId, FrameworkId, Resources};
use quarry_ports::{OfferMap, OfferSink};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// One agent's resources offered to one framework under one role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferedResources {
    pub framework_id: FrameworkId,
    pub agent_id: AgentId,
    pub resources: Resources,
    pub role: String,
}

/// Unbounded FIFO of offers between the allocator and benchmark logic
///
/// `put` never blocks and may be called from any context; `get` waits
/// until an offer is available. Consumers share the receiving end, so each
/// offer is delivered to exactly one of them.
pub struct OfferQueue {
    sender: UnboundedSender<OfferedResources>,
    receiver: Mutex<UnboundedReceiver<OfferedResources>>,
    queued: AtomicUsize,
}

impl OfferQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            queued: AtomicUsize::new(0),
        }
    }

    pub fn put(&self, offer: OfferedResources) {
        self.queued.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(offer).is_err() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Take the oldest offer, waiting for one if the queue is empty
    pub async fn get(&self) -> OfferedResources {
        let mut receiver = self.receiver.lock().await;
        match receiver.recv().await {
            Some(offer) => {
                self.queued.fetch_sub(1, Ordering::SeqCst);
                offer
            }
            // `self.sender` keeps the channel open
            None => std::future::pending().await,
        }
    }

    /// Take the oldest offer if one is queued and no other consumer is reading
    pub fn try_get(&self) -> Option<OfferedResources> {
        let mut receiver = self.receiver.try_lock().ok()?;
        let offer = receiver.try_recv().ok()?;
        self.queued.fetch_sub(1, Ordering::SeqCst);
        Some(offer)
    }

    /// Take everything queued right now, oldest first
    pub fn drain(&self) -> Vec<OfferedResources> {
        std::iter::from_fn(|| self.try_get()).collect()
    }

    pub fn len(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for OfferQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OfferSink for OfferQueue {
    fn offer(&self, framework_id: &FrameworkId, offers: &OfferMap) {
        for (role, by_agent) in offers {
            for (agent_id, resources) in by_agent {
                trace!(
                    "Offer of {} on {} to {} under role {}",
                    resources, agent_id, framework_id, role
                );
                self.put(OfferedResources {
                    framework_id: framework_id.clone(),
                    agent_id: agent_id.clone(),
                    resources: resources.clone(),
                    role: role.clone(),
                });
            }
        }
    }
}
