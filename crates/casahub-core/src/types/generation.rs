//! Generation markers for discarding superseded asynchronous results.
//!
//! Every load attempt is tagged with a [`Generation`]. When the result of
//! an awaited operation arrives, the owning store compares the tag against
//! its current generation: only the newest generation's result is applied,
//! regardless of resolution order.

use std::fmt;

/// An opaque, totally ordered marker identifying one load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// The generation before any operation has started.
    pub const ZERO: Generation = Generation(0);

    /// Return the generation immediately following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
