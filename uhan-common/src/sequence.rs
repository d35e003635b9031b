//! Recompute sequencing
//!
//! Every recompute takes a ticket before it starts. When it finishes, its
//! result is published only if no newer ticket has been issued meanwhile, so
//! the visible preview always reflects the most recently requested state.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sequence number of one recompute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Issues monotonically increasing tickets
#[derive(Debug, Default)]
pub struct RecomputeSequencer {
    issued: AtomicU64,
}

impl RecomputeSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next ticket; it becomes the latest
    pub fn issue(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Most recently issued ticket number (0 before the first)
    pub fn latest(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// True when no ticket newer than `ticket` exists
    pub fn is_latest(&self, ticket: Ticket) -> bool {
        ticket.0 == self.latest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_tickets_increase() {
        let seq = RecomputeSequencer::new();
        assert_eq!(seq.latest(), 0);
        let a = seq.issue();
        let b = seq.issue();
        assert!(b > a);
        assert_eq!(seq.latest(), b.value());
    }

    #[test]
    fn test_only_newest_ticket_is_latest() {
        let seq = RecomputeSequencer::new();
        let first = seq.issue();
        assert!(seq.is_latest(first));
        let second = seq.issue();
        assert!(!seq.is_latest(first));
        assert!(seq.is_latest(second));
    }

    #[tokio::test]
    async fn test_slow_older_recompute_is_dropped() {
        let seq = Arc::new(RecomputeSequencer::new());
        let published = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        let slow = {
            let seq = seq.clone();
            let published = published.clone();
            let ticket = seq.issue();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(80)).await;
                if seq.is_latest(ticket) {
                    published.lock().await.push("slow");
                }
            })
        };
        let fast = {
            let seq = seq.clone();
            let published = published.clone();
            let ticket = seq.issue();
            tokio::spawn(async move {
                if seq.is_latest(ticket) {
                    published.lock().await.push("fast");
                }
            })
        };

        fast.await.unwrap();
        slow.await.unwrap();
        assert_eq!(*published.lock().await, vec!["fast"]);
    }
}
