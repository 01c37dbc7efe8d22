//! Transaction phases and the lock-free phase cell guarding them

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::debug;

/// Phases of one sync transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SyncPhase {
    /// No transaction in flight
    Idle = 0,
    /// Listing the vault and computing the change set
    Diffing = 1,
    /// Reading local files into the request
    Requesting = 2,
    /// Exchanging with the server and decoding the reply
    Transmitting = 3,
    /// Writing and deleting local files
    Applying = 4,
    /// Replacing the snapshot
    Committing = 5,
    /// The transaction failed and is unwinding
    Aborted = 6,
}

impl SyncPhase {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Diffing,
            2 => Self::Requesting,
            3 => Self::Transmitting,
            4 => Self::Applying,
            5 => Self::Committing,
            6 => Self::Aborted,
            _ => Self::Idle,
        }
    }

    /// Check whether this phase may advance to `next`
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Diffing)
                | (Self::Diffing, Self::Requesting)
                | (Self::Requesting, Self::Transmitting)
                | (Self::Transmitting, Self::Applying)
                | (Self::Applying, Self::Committing)
                | (Self::Committing | Self::Aborted, Self::Idle)
        ) || (!matches!(self, Self::Idle | Self::Aborted) && matches!(next, Self::Aborted))
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Diffing => "diffing",
            Self::Requesting => "requesting",
            Self::Transmitting => "transmitting",
            Self::Applying => "applying",
            Self::Committing => "committing",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Atomic holder of the current [`SyncPhase`]
///
/// Entering a transaction is a compare-and-swap from `Idle`, so at most one
/// transaction runs per cell and no lock is held while it does.
#[derive(Debug, Default)]
pub struct PhaseCell {
    value: AtomicU8,
}

impl PhaseCell {
    /// Create an idle cell
    pub const fn new() -> Self {
        Self {
            value: AtomicU8::new(SyncPhase::Idle as u8),
        }
    }

    /// Get the current phase
    pub fn get(&self) -> SyncPhase {
        SyncPhase::from_u8(self.value.load(Ordering::Acquire))
    }

    /// Move from `Idle` to `Diffing`; returns the phase found if it was not idle
    pub fn try_begin(&self) -> Result<(), SyncPhase> {
        self.value
            .compare_exchange(
                SyncPhase::Idle as u8,
                SyncPhase::Diffing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| debug!("Sync phase changed to: {}", SyncPhase::Diffing))
            .map_err(SyncPhase::from_u8)
    }

    /// Advance to `next`; illegal transitions are ignored and reported as `false`
    pub fn advance(&self, next: SyncPhase) -> bool {
        let current = self.get();
        if !current.can_advance_to(next) {
            debug!("Ignoring phase transition {} -> {}", current, next);
            return false;
        }
        self.value.store(next as u8, Ordering::Release);
        debug!("Sync phase changed to: {}", next);
        true
    }

    /// Force the cell back to `Idle`
    pub fn reset(&self) {
        self.value.store(SyncPhase::Idle as u8, Ordering::Release);
    }
}
