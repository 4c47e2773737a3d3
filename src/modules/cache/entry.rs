use crate::shared::errors::GatewayResult;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// In-flight computation, cloneable so every waiter can await the same result
pub(crate) type Computation<V> = Shared<BoxFuture<'static, GatewayResult<V>>>;

/// Observable lifecycle state of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryState {
    Empty,
    Pending,
    Ready,
}

/// Stored value with TTL bookkeeping
#[derive(Debug, Clone)]
pub(crate) struct ReadyEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
    /// `None` when the TTL reaches past what the clock can represent
    pub expires_at: Option<Instant>,
    pub last_access: Instant,
}

impl<V> ReadyEntry<V> {
    pub fn new(value: V, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            inserted_at: now,
            expires_at: now.checked_add(ttl),
            last_access: now,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |expires_at| now >= expires_at)
    }
}

pub(crate) enum Slot<V> {
    Pending {
        generation: u64,
        computation: Computation<V>,
    },
    Ready(ReadyEntry<V>),
}

impl<V> Slot<V> {
    /// True when this slot is the pending computation started as `generation`
    pub fn is_generation(&self, generation: u64) -> bool {
        matches!(self, Slot::Pending { generation: g, .. } if *g == generation)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        match self {
            Slot::Ready(entry) => entry.is_expired(now),
            Slot::Pending { .. } => false,
        }
    }

    pub fn state(&self, now: Instant) -> EntryState {
        match self {
            Slot::Pending { .. } => EntryState::Pending,
            Slot::Ready(entry) if entry.is_expired(now) => EntryState::Empty,
            Slot::Ready(_) => EntryState::Ready,
        }
    }
}
