//! Per-consumer cancellation and per-key supersession helpers.
//!
//! These replace ad hoc "am I still mounted" flags: consumers hold a
//! [`MountGuard`] whose token is cancelled on teardown, and stores run
//! each keyed operation through an [`OperationSlot`] so that only the
//! newest generation's result is ever applied, regardless of the order
//! in which overlapping operations resolve.

use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use casahub_core::types::Generation;

/// Ties async work to a consumer's lifetime.
///
/// Dropping the guard cancels every token it handed out, so no state
/// mutation can happen on behalf of a torn-down consumer.
#[derive(Debug)]
pub struct MountGuard {
    token: CancellationToken,
}

impl MountGuard {
    /// Creates a guard for a freshly mounted consumer.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Returns a token for one operation; cancelled when the guard drops.
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Whether the consumer is still mounted.
    pub fn is_alive(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Default for MountGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Single-key supersession slot.
///
/// Beginning a new operation cancels the previous one's token and bumps
/// the generation; a finished operation applies its result only if its
/// generation is still current.
#[derive(Debug)]
pub struct OperationSlot {
    current: Mutex<(Generation, CancellationToken)>,
}

impl OperationSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self {
            current: Mutex::new((Generation::ZERO, CancellationToken::new())),
        }
    }

    /// Starts a new operation, superseding any in-flight one.
    pub fn begin(&self) -> (Generation, CancellationToken) {
        let mut current = self.current.lock().expect("slot lock poisoned");
        current.1.cancel();
        let generation = current.0.next();
        let token = CancellationToken::new();
        *current = (generation, token.clone());
        (generation, token)
    }

    /// Whether the given generation is still the newest one.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.current.lock().expect("slot lock poisoned").0 == generation
    }

    /// Cancels the in-flight operation without starting a new one.
    pub fn invalidate(&self) {
        let mut current = self.current.lock().expect("slot lock poisoned");
        current.1.cancel();
        current.0 = current.0.next();
    }
}

impl Default for OperationSlot {
    fn default() -> Self {
        Self::new()
    }
}
