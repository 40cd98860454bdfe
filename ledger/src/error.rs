//! # Ledger Errors
//!
//! One error type for every ledger entry point. Variants are grouped by
//! [`ErrorKind`] so a caller can tell "your request was malformed" apart
//! from "the custody movement did not happen" without matching on every
//! variant.
//!
//! Every error is returned before any state is committed. A failing
//! operation leaves the ledger exactly as it found it.

use thiserror::Error;

use crate::types::{Amount, Capability, Principal};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Fingerprints must be between 1 and 40 bytes.
    #[error("invalid fingerprint: length {length} is outside 1..={max}")]
    InvalidFingerprint {
        /// Byte length of the rejected fingerprint.
        length: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// Amount-carrying operations reject zero.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// The lock size must be strictly positive.
    #[error("invalid lock size: must be greater than zero")]
    InvalidLockSize,

    /// Durations must cover at least one day plus the buffer window.
    #[error("invalid duration: {duration}s is below the minimum of {minimum}s")]
    InvalidDuration {
        /// The rejected duration in seconds.
        duration: u64,
        /// Smallest accepted duration in seconds.
        minimum: u64,
    },

    /// No positive lock exists for the fingerprint.
    #[error("no lock found for fingerprint '{0}'")]
    LockNotFound(String),

    /// The debited balance does not cover the request.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Amount the caller asked for.
        requested: Amount,
        /// Amount actually held.
        available: Amount,
    },

    /// The account's gas budget does not cover the settlement estimate.
    #[error("insufficient gas budget: estimate {estimate}, budget {budget}")]
    InsufficientGasBudget {
        /// Gas the controller wants to charge.
        estimate: Amount,
        /// Gas the account currently holds.
        budget: Amount,
    },

    /// The principal does not hold the capability required by the operation.
    #[error("capability denied: {principal} lacks {capability}")]
    CapabilityDenied {
        /// The capability that was required.
        capability: Capability,
        /// The principal that attempted the operation.
        principal: Principal,
    },

    /// The value transfer gateway refused a movement; nothing was committed.
    #[error("transfer declined: {0}")]
    TransferDeclined(String),

    /// A mutating call arrived while another one was still executing.
    #[error("reentrant call rejected")]
    ReentrancyRejected,

    /// The ledger is suspended and only privileged operations are allowed.
    #[error("ledger is suspended")]
    LedgerSuspended,

    /// The operation requires a suspended ledger.
    #[error("ledger is not suspended")]
    NotSuspended,

    /// `pause` was called on an already suspended ledger.
    #[error("ledger is already suspended")]
    AlreadySuspended,

    /// Upgrades must move to a strictly higher version.
    #[error("version {proposed} is not newer than current version {current}")]
    VersionNotNewer {
        /// Version currently running.
        current: u64,
        /// Version that was proposed.
        proposed: u64,
    },

    /// `initialize` may only run once.
    #[error("ledger already initialized")]
    AlreadyInitialized,

    /// No operation is accepted before `initialize`.
    #[error("ledger not initialized")]
    NotInitialized,

    /// A credit would exceed the 256-bit ceiling.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// A debit would drive a balance below zero.
    #[error("arithmetic underflow")]
    ArithmeticUnderflow,
}

/// Coarse classification of [`LedgerError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; retry with corrected arguments.
    Validation,
    /// Not enough free, staked or voting balance.
    InsufficientBalance,
    /// Not enough gas budget for reward settlement.
    InsufficientGasBudget,
    /// Missing capability.
    CapabilityDenied,
    /// External gateway refused the movement.
    TransferDeclined,
    /// Nested mutating call.
    ReentrancyRejected,
    /// Active/suspended mismatch.
    WrongOperationalState,
    /// Initialization or upgrade ordering problem.
    Lifecycle,
    /// Checked arithmetic failed.
    Arithmetic,
}

impl LedgerError {
    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidFingerprint { .. }
            | LedgerError::ZeroAmount
            | LedgerError::InvalidLockSize
            | LedgerError::InvalidDuration { .. }
            | LedgerError::LockNotFound(_) => ErrorKind::Validation,
            LedgerError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            LedgerError::InsufficientGasBudget { .. } => ErrorKind::InsufficientGasBudget,
            LedgerError::CapabilityDenied { .. } => ErrorKind::CapabilityDenied,
            LedgerError::TransferDeclined(_) => ErrorKind::TransferDeclined,
            LedgerError::ReentrancyRejected => ErrorKind::ReentrancyRejected,
            LedgerError::LedgerSuspended
            | LedgerError::NotSuspended
            | LedgerError::AlreadySuspended => ErrorKind::WrongOperationalState,
            LedgerError::VersionNotNewer { .. }
            | LedgerError::AlreadyInitialized
            | LedgerError::NotInitialized => ErrorKind::Lifecycle,
            LedgerError::ArithmeticOverflow | LedgerError::ArithmeticUnderflow => {
                ErrorKind::Arithmetic
            }
        }
    }

    /// `true` when the request itself was malformed, as opposed to a
    /// failure of state, permissions or custody.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::InsufficientBalance => "insufficient_balance",
            ErrorKind::InsufficientGasBudget => "insufficient_gas_budget",
            ErrorKind::CapabilityDenied => "capability_denied",
            ErrorKind::TransferDeclined => "transfer_declined",
            ErrorKind::ReentrancyRejected => "reentrancy_rejected",
            ErrorKind::WrongOperationalState => "wrong_operational_state",
            ErrorKind::Lifecycle => "lifecycle",
            ErrorKind::Arithmetic => "arithmetic",
        };
        write!(f, "{}", name)
    }
}
