//! Optional point in time after which outstanding calls give up.
//!
//! `Deadline::none()` waits for the slowest request, which is what a host gets
//! unless it asks for a timeout.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub const fn none() -> Self {
        Self { at: None }
    }

    pub fn at(instant: Instant) -> Self {
        Self { at: Some(instant) }
    }

    /// A deadline `timeout` from now. Saturates to no deadline if the instant
    /// would overflow.
    pub fn after(timeout: Duration) -> Self {
        Instant::now()
            .checked_add(timeout)
            .map_or(Self::none(), Self::at)
    }

    pub fn instant(&self) -> Option<Instant> {
        self.at
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| at <= Instant::now())
    }

    /// Keep this deadline if set, otherwise start `fallback` from now.
    pub fn or_timeout(self, fallback: Option<Duration>) -> Self {
        match (self.at, fallback) {
            (None, Some(timeout)) => Self::after(timeout),
            _ => self,
        }
    }
}
