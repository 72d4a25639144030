//! Fan-out of encoded snapshots to per-session outboxes.
//!
//! Every session owns a bounded queue drained by its own writer task. The
//! tick loop never touches sockets: it pushes the shared frame into each
//! queue with `try_send`, so a slow or dead client only loses frames for
//! itself and never stalls the simulation. Frames leave each queue in the
//! order they were pushed, so a client sees snapshots in tick order.

use crate::game::SessionId;
use log::debug;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// One encoded snapshot line, shared between all recipients.
pub type Frame = Arc<str>;
pub type Outbox = mpsc::Sender<Frame>;
pub type Inbox = mpsc::Receiver<Frame>;

/// Frames a client may fall behind before new ones are dropped for it.
pub const OUTBOX_CAPACITY: usize = 8;

pub fn outbox() -> (Outbox, Inbox) {
    mpsc::channel(OUTBOX_CAPACITY)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    /// Outbox full, frame skipped this tick.
    pub lagging: usize,
    /// Writer gone, the read side will reap the session.
    pub closed: usize,
}

/// A tick's frame plus the outboxes registered when it was taken.
#[derive(Debug)]
pub struct Broadcast {
    pub tick: u64,
    frame: Frame,
    recipients: Vec<(SessionId, Outbox)>,
}

impl Broadcast {
    pub fn new(tick: u64, frame: Frame, recipients: Vec<(SessionId, Outbox)>) -> Self {
        Self {
            tick,
            frame,
            recipients,
        }
    }

    pub fn frame(&self) -> &str {
        &self.frame
    }

    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }

    /// Queues the frame for every recipient without blocking.
    pub fn deliver(self) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for (id, outbox) in &self.recipients {
            match outbox.try_send(Arc::clone(&self.frame)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!("Tick {}: client {} lagging, frame dropped", self.tick, id);
                    report.lagging += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Tick {}: client {} outbox closed", self.tick, id);
                    report.closed += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(text: &str) -> Frame {
        Arc::from(text)
    }

    #[test]
    fn test_deliver_to_all_recipients() {
        let (tx1, mut rx1) = outbox();
        let (tx2, mut rx2) = outbox();

        let broadcast = Broadcast::new(1, frame("{}\n"), vec![(1, tx1), (2, tx2)]);
        assert_eq!(broadcast.recipient_count(), 2);
        assert_eq!(broadcast.frame(), "{}\n");

        let report = broadcast.deliver();
        assert_eq!(report.delivered, 2);
        assert_eq!(rx1.try_recv().unwrap().as_ref(), "{}\n");
        assert_eq!(rx2.try_recv().unwrap().as_ref(), "{}\n");
    }

    #[test]
    fn test_failures_are_isolated() {
        let (healthy, mut healthy_rx) = outbox();
        let (slow, _slow_rx) = mpsc::channel(1);
        let (dead, dead_rx) = outbox();
        drop(dead_rx);
        slow.try_send(frame("old\n")).unwrap();

        let report = Broadcast::new(
            5,
            frame("new\n"),
            vec![(1, slow), (2, dead), (3, healthy)],
        )
        .deliver();

        assert_eq!(
            report,
            DeliveryReport {
                delivered: 1,
                lagging: 1,
                closed: 1
            }
        );
        assert_eq!(healthy_rx.try_recv().unwrap().as_ref(), "new\n");
    }

    #[test]
    fn test_frames_arrive_in_tick_order() {
        let (tx, mut rx) = outbox();

        for tick in 0..3 {
            Broadcast::new(tick, frame(&format!("{}\n", tick)), vec![(1, tx.clone())]).deliver();
        }

        for tick in 0..3 {
            assert_eq!(rx.try_recv().unwrap().as_ref(), format!("{}\n", tick));
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_slow_client_keeps_oldest_frames() {
        let (tx, mut rx) = outbox();

        for tick in 0..(OUTBOX_CAPACITY as u64 + 3) {
            Broadcast::new(tick, frame(&tick.to_string()), vec![(1, tx.clone())]).deliver();
        }

        let mut received = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            received.push(frame.to_string());
        }
        assert_eq!(received.len(), OUTBOX_CAPACITY);
        assert_eq!(received.first().map(String::as_str), Some("0"));
    }
}
