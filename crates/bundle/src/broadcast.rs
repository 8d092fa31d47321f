//! Fan-out of change lists to live subscribers.
//!
//! Every subscriber owns a bounded queue. A broadcast reserves room for the
//! whole change list in each queue before sending anything, so a subscriber
//! either receives every change of a cycle, in order, or none of them. When
//! the list does not fit, the subscriber is sent a single
//! [`Frame::Resync`] instead and has to read the whole snapshot again. Only a
//! subscriber whose queue is completely full is disconnected. A slow
//! subscriber never stalls the reload cycle or the other subscribers.

use crate::change::Change;
use async_stream::stream;
use futures::Stream;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// One message on a live change stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// Empty frame sent once, as soon as the subscriber is registered.
    Handshake,
    Change(Arc<Change>),
    /// The changes of one cycle did not fit in the queue. Incremental
    /// patching is unsafe until the whole snapshot has been read again.
    Resync,
}

/// Receiving end of a live change stream. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<Frame>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The next frame, or `None` once the subscriber has been disconnected
    /// and every queued frame was received.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    /// A queued frame, if there is one, without waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }

    pub fn into_stream(mut self) -> impl Stream<Item = Frame> {
        stream! {
            while let Some(frame) = self.receiver.recv().await {
                yield frame;
            }
        }
    }
}

/// What happened to one broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Subscribers that were sent the whole change list.
    pub delivered: usize,
    /// Subscribers sent [`Frame::Resync`] in place of the change list.
    pub resynced: usize,
    /// Subscribers disconnected because their queue was full.
    pub overflowed: usize,
    /// Subscribers that had already gone away.
    pub closed: usize,
}

/// The set of live subscribers.
///
/// Registering and deregistering never wait for a broadcast in progress:
/// a broadcast only holds the lock long enough to copy the current senders.
#[derive(Debug)]
pub struct Broadcaster {
    capacity: usize,
    next_id: AtomicU64,
    endpoints: RwLock<HashMap<u64, mpsc::Sender<Frame>>>,
}

impl Broadcaster {
    /// `capacity` bounds the frames queued for one subscriber. Longer change
    /// lists are collapsed into [`Frame::Resync`].
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_id: AtomicU64::new(0),
            endpoints: RwLock::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of registered subscribers, including ones that have gone away
    /// since the last registration or broadcast.
    pub fn len(&self) -> usize {
        self.endpoints.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a subscriber. Its first frame is [`Frame::Handshake`].
    ///
    /// Subscribers that have gone away are pruned first, so reconnecting
    /// clients do not pile up while no broadcast is running.
    pub fn register(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.capacity);
        // A fresh queue always has room for the handshake.
        let _ = sender.try_send(Frame::Handshake);
        let mut endpoints = self.endpoints.write().unwrap_or_else(PoisonError::into_inner);
        endpoints.retain(|_, sender| !sender.is_closed());
        endpoints.insert(id, sender);
        drop(endpoints);
        tracing::debug!(subscriber = id, "Subscriber registered");
        Subscription { id, receiver }
    }

    /// Remove a subscriber, returning whether it was registered.
    pub fn deregister(&self, id: u64) -> bool {
        let removed = self.endpoints.write().unwrap_or_else(PoisonError::into_inner).remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = id, "Subscriber deregistered");
        }
        removed
    }

    /// Queue `changes`, in order, for every subscriber registered when the
    /// broadcast starts.
    ///
    /// A subscriber without room for the whole list gets [`Frame::Resync`]
    /// if there is room for one frame, and is disconnected otherwise.
    pub fn broadcast(&self, changes: &[Arc<Change>]) -> Delivery {
        let mut delivery = Delivery::default();
        if changes.is_empty() {
            return delivery;
        }
        let endpoints: Vec<(u64, mpsc::Sender<Frame>)> = self
            .endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        let mut gone = Vec::new();
        for (id, sender) in &endpoints {
            match sender.try_reserve_many(changes.len()) {
                Ok(permits) => {
                    for (permit, change) in permits.zip(changes) {
                        permit.send(Frame::Change(Arc::clone(change)));
                    }
                    delivery.delivered += 1;
                },
                Err(TrySendError::Full(())) => match sender.try_reserve() {
                    Ok(permit) => {
                        tracing::debug!(subscriber = id, changes = changes.len(), "Change list does not fit, resyncing");
                        permit.send(Frame::Resync);
                        delivery.resynced += 1;
                    },
                    Err(TrySendError::Full(())) => {
                        tracing::warn!(subscriber = id, changes = changes.len(), "Subscriber queue full, disconnecting");
                        delivery.overflowed += 1;
                        gone.push(*id);
                    },
                    Err(TrySendError::Closed(())) => {
                        delivery.closed += 1;
                        gone.push(*id);
                    },
                },
                Err(TrySendError::Closed(())) => {
                    tracing::debug!(subscriber = id, "Subscriber gone");
                    delivery.closed += 1;
                    gone.push(*id);
                },
            }
        }
        if !gone.is_empty() {
            let mut endpoints = self.endpoints.write().unwrap_or_else(PoisonError::into_inner);
            for id in gone {
                endpoints.remove(&id);
            }
        }
        delivery
    }
}
