//! Virtual relay: one simulated output of the board.

use std::sync::{Mutex, MutexGuard, PoisonError};

use relayhub_domain::relay::RelayState;

/// A simulated relay output, de-energised at power-up.
pub struct VirtualRelay {
    state: Mutex<RelayState>,
    faulty: Mutex<bool>,
}

impl Default for VirtualRelay {
    fn default() -> Self {
        Self {
            state: Mutex::new(RelayState::Off),
            faulty: Mutex::new(false),
        }
    }
}

impl VirtualRelay {
    #[must_use]
    pub fn state(&self) -> RelayState {
        *lock(&self.state)
    }

    /// Switch to `state`. A faulty relay refuses and keeps its state.
    ///
    /// Returns `false` when the command was refused.
    pub fn switch(&self, state: RelayState) -> bool {
        if *lock(&self.faulty) {
            return false;
        }
        *lock(&self.state) = state;
        true
    }

    pub fn set_faulty(&self, faulty: bool) {
        *lock(&self.faulty) = faulty;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
