//! Item hand-off between the listing crawl and its consumer
//!
//! An item counts as handled once the consumer asks for the next one, or
//! sees the end of the stream. Until then it can still be lost along with
//! the consumer, so the sending side remembers where it came from and can
//! give it back to the crawl state.

use crate::crawler::records::ItemRecord;
use crate::state::ItemId;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

/// Consumer progress shared by both ends
#[derive(Default)]
struct Progress {
    handled: AtomicU64,
    closed: AtomicBool,
    changed: Notify,
}

impl Progress {
    fn handled(&self) -> u64 {
        self.handled.load(Ordering::Acquire)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Items of a listing run, in the order they were found
pub struct ItemStream {
    rx: mpsc::Receiver<ItemRecord>,
    progress: Arc<Progress>,
    holding: bool,
}

impl ItemStream {
    /// Receives the next item and marks the previous one as handled
    ///
    /// Returns None once the run has ended and every item was received.
    pub async fn recv(&mut self) -> Option<ItemRecord> {
        if self.holding {
            self.holding = false;
            self.progress.handled.fetch_add(1, Ordering::AcqRel);
            self.progress.changed.notify_one();
        }

        let item = self.rx.recv().await;
        self.holding = item.is_some();
        item
    }
}

impl Drop for ItemStream {
    fn drop(&mut self) {
        self.progress.closed.store(true, Ordering::Release);
        self.progress.changed.notify_one();
    }
}

/// An item that was admitted but never handled by the consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Undelivered {
    pub id: ItemId,
    pub category: String,
    /// Page the item was found on
    pub cursor: u32,
}

/// How a hand-off attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Handoff {
    Done,
    Cancelled,
    Closed,
}

/// Sending end, owned by the crawl task
pub(crate) struct ItemSender {
    tx: Option<mpsc::Sender<ItemRecord>>,
    progress: Arc<Progress>,
    sent: u64,
    in_flight: VecDeque<Undelivered>,
}

/// Creates a bounded item channel
pub(crate) fn item_channel(capacity: usize) -> (ItemSender, ItemStream) {
    let (tx, rx) = mpsc::channel(capacity);
    let progress = Arc::new(Progress::default());

    let sender = ItemSender {
        tx: Some(tx),
        progress: Arc::clone(&progress),
        sent: 0,
        in_flight: VecDeque::new(),
    };
    let stream = ItemStream {
        rx,
        progress,
        holding: false,
    };
    (sender, stream)
}

impl ItemSender {
    /// Hands one item to the consumer, waiting for room in the channel
    ///
    /// The wait is abandoned when `cancel` fires.
    pub async fn send(&mut self, item: ItemRecord, cursor: u32, cancel: &CancellationToken) -> Handoff {
        if self.progress.is_closed() {
            return Handoff::Closed;
        }
        let Some(tx) = &self.tx else {
            return Handoff::Closed;
        };

        let origin = Undelivered {
            id: item.id,
            category: item.category.clone(),
            cursor,
        };
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Handoff::Cancelled,
            result = tx.send(item) => result,
        };

        match result {
            Ok(()) => {
                self.sent += 1;
                self.in_flight.push_back(origin);
                Handoff::Done
            }
            Err(_) => Handoff::Closed,
        }
    }

    /// Waits until the consumer has handled every item sent so far
    pub async fn flush(&mut self, cancel: Option<&CancellationToken>) -> Handoff {
        loop {
            self.settle();
            if self.in_flight.is_empty() {
                return Handoff::Done;
            }
            if self.progress.is_closed() {
                return Handoff::Closed;
            }

            match cancel {
                Some(cancel) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Handoff::Cancelled,
                        _ = self.progress.changed.notified() => {}
                    }
                }
                None => self.progress.changed.notified().await,
            }
        }
    }

    /// Removes and returns the items the consumer has not handled
    pub fn take_unhandled(&mut self) -> Vec<Undelivered> {
        self.settle();
        self.in_flight.drain(..).collect()
    }

    /// Ends the stream, then waits for the consumer to drain or drop it
    ///
    /// Returns whatever was left unhandled.
    pub async fn close(&mut self) -> Vec<Undelivered> {
        self.tx = None;
        self.flush(None).await;
        self.take_unhandled()
    }

    fn settle(&mut self) {
        let outstanding = self.sent.saturating_sub(self.progress.handled());
        while self.in_flight.len() as u64 > outstanding {
            self.in_flight.pop_front();
        }
    }
}
