//! # Ledger Configuration & Constants
//!
//! Every tunable number the ledger cares about lives here: the fixed time
//! constants, the four controller-managed parameters, and the one-shot
//! initialization record.
//!
//! Durations are plain seconds. The ledger never trusts the execution
//! environment's clock to better than [`BUFFER_WINDOW`], which is why no
//! duration may be shorter than a day plus that window.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::types::{decimal, Amount, Principal};

// ---------------------------------------------------------------------------
// Time Constants
// ---------------------------------------------------------------------------

/// One day in seconds.
pub const ONE_DAY: u64 = 86_400;

/// Clock-skew tolerance subtracted from "now" before a vault is considered
/// matured. 15 minutes comfortably covers timestamp drift between
/// block producers.
pub const BUFFER_WINDOW: u64 = 15 * 60;

/// Shortest accepted lock, stake or governance duration.
pub const MIN_DURATION: u64 = BUFFER_WINDOW + ONE_DAY;

// ---------------------------------------------------------------------------
// Limits & Versioning
// ---------------------------------------------------------------------------

/// Longest accepted fingerprint, in bytes.
pub const MAX_FINGERPRINT_LEN: usize = 40;

/// Version reported by a freshly initialized ledger. Upgrades must
/// propose something strictly greater.
pub const LEDGER_VERSION: u64 = 1;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Which release schedule a vault follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationKind {
    /// Released by `unlock`.
    Lock,
    /// Released by `unstake`.
    Stake,
    /// Released by `remove_votes`.
    Governance,
}

/// Identifies a controller-managed parameter in change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    /// [`LedgerParams::lock_size`].
    LockSize,
    /// [`LedgerParams::lock_duration`].
    LockDuration,
    /// [`LedgerParams::stake_duration`].
    StakeDuration,
    /// [`LedgerParams::governance_duration`].
    GovernanceDuration,
}

impl From<DurationKind> for Parameter {
    fn from(kind: DurationKind) -> Self {
        match kind {
            DurationKind::Lock => Parameter::LockDuration,
            DurationKind::Stake => Parameter::StakeDuration,
            DurationKind::Governance => Parameter::GovernanceDuration,
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parameter::LockSize => write!(f, "lock_size"),
            Parameter::LockDuration => write!(f, "lock_duration"),
            Parameter::StakeDuration => write!(f, "stake_duration"),
            Parameter::GovernanceDuration => write!(f, "governance_duration"),
        }
    }
}

/// The four values the controller may tune after initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Amount committed by every `lock` call.
    #[serde(with = "decimal")]
    pub lock_size: Amount,
    /// Seconds between `unlock` and release.
    pub lock_duration: u64,
    /// Seconds between `unstake` and release.
    pub stake_duration: u64,
    /// Seconds between `remove_votes` and release.
    pub governance_duration: u64,
}

impl LedgerParams {
    /// Checks lock size and all three durations.
    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_lock_size(self.lock_size)?;
        validate_duration(self.lock_duration)?;
        validate_duration(self.stake_duration)?;
        validate_duration(self.governance_duration)
    }

    /// Release delay for a vault of the given kind.
    pub fn duration_for(&self, kind: DurationKind) -> u64 {
        match kind {
            DurationKind::Lock => self.lock_duration,
            DurationKind::Stake => self.stake_duration,
            DurationKind::Governance => self.governance_duration,
        }
    }

    pub(crate) fn duration_mut(&mut self, kind: DurationKind) -> &mut u64 {
        match kind {
            DurationKind::Lock => &mut self.lock_duration,
            DurationKind::Stake => &mut self.stake_duration,
            DurationKind::Governance => &mut self.governance_duration,
        }
    }
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            lock_size: Amount::from(100u64),
            lock_duration: 7 * ONE_DAY,
            stake_duration: 14 * ONE_DAY,
            governance_duration: 3 * ONE_DAY,
        }
    }
}

/// Rejects a zero lock size.
pub fn validate_lock_size(lock_size: Amount) -> Result<(), LedgerError> {
    if lock_size.is_zero() {
        return Err(LedgerError::InvalidLockSize);
    }
    Ok(())
}

/// Rejects durations shorter than [`MIN_DURATION`].
pub fn validate_duration(duration: u64) -> Result<(), LedgerError> {
    if duration < MIN_DURATION {
        return Err(LedgerError::InvalidDuration {
            duration,
            minimum: MIN_DURATION,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

/// Everything `initialize` needs. Loaded from JSON by the operator CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Address of the custodied token.
    pub token: Principal,
    /// Address that holds the ledger's custodied balance at the gateway.
    pub custody: Principal,
    /// Principal granted the controller capability. Also receives
    /// forwarded gas deposits.
    pub controller: Principal,
    /// Source of reward payouts.
    pub rewards_pool: Principal,
    /// Initial tunable parameters.
    pub params: LedgerParams,
}

impl LedgerConfig {
    /// Parses a JSON config document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Validates the parameters.
    pub fn validate(&self) -> Result<(), LedgerError> {
        self.params.validate()
    }
}
