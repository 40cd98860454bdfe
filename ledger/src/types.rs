//! # Ledger Data Model
//!
//! Accounts, vaults and the small value types that flow through every
//! ledger operation. Amounts are 256-bit unsigned integers and every
//! mutation goes through `checked_add` / `checked_sub`: a balance that
//! would wrap is an error, never a silently corrected number.

use std::collections::BTreeMap;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::config::{BUFFER_WINDOW, MAX_FINGERPRINT_LEN};
use crate::error::LedgerError;

/// Token amount in the smallest denomination.
pub type Amount = U256;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Opaque address of an account holder, operator or service.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Wraps an address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Principal {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of the resource a lock is attached to. Always 1 to 40 bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Validates the byte length and wraps the name.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidFingerprint`] for empty names or names
    /// longer than [`MAX_FINGERPRINT_LEN`] bytes.
    pub fn new(name: impl Into<String>) -> Result<Self, LedgerError> {
        let name = name.into();
        let length = name.len();
        if length == 0 || length > MAX_FINGERPRINT_LEN {
            return Err(LedgerError::InvalidFingerprint {
                length,
                max: MAX_FINGERPRINT_LEN,
            });
        }
        Ok(Self(name))
    }

    /// Returns the fingerprint as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = LedgerError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Capabilities & status
// ---------------------------------------------------------------------------

/// Named permission checked before privileged operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Tunes parameters and settles rewards.
    Controller,
    /// Suspends and resumes user operations.
    Pauser,
    /// Authorizes version upgrades.
    Upgrader,
    /// Emergency fund recovery.
    Admin,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 4] = [
        Capability::Controller,
        Capability::Pauser,
        Capability::Upgrader,
        Capability::Admin,
    ];
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Controller => write!(f, "controller"),
            Capability::Pauser => write!(f, "pauser"),
            Capability::Upgrader => write!(f, "upgrader"),
            Capability::Admin => write!(f, "admin"),
        }
    }
}

/// Whether user-facing operations are accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalStatus {
    /// Normal operation.
    #[default]
    Active,
    /// Only privileged operations are accepted.
    Suspended,
}

impl std::fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationalStatus::Active => write!(f, "Active"),
            OperationalStatus::Suspended => write!(f, "Suspended"),
        }
    }
}

// ---------------------------------------------------------------------------
// Vaults
// ---------------------------------------------------------------------------

/// A scheduled release of previously committed value.
///
/// Swept vaults are zeroed in place instead of removed, so the index of a
/// vault never changes once it has been emitted in a `VaultCreated` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Amount released when the vault is opened.
    pub amount: Amount,
    /// Release time; sweepable once strictly before `now - BUFFER_WINDOW`.
    pub available_at: Timestamp,
}

impl Vault {
    /// `true` once the slot has been swept.
    pub fn is_cleared(&self) -> bool {
        self.amount.is_zero() && self.available_at == 0
    }

    /// Whether a sweep at `now` would release this vault.
    pub fn is_matured(&self, now: Timestamp) -> bool {
        !self.is_cleared() && self.available_at < now.saturating_sub(BUFFER_WINDOW)
    }
}

// ---------------------------------------------------------------------------
// Draw policy
// ---------------------------------------------------------------------------

/// How a debit is funded: free balance first, external transfer for the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    /// Portion taken from `available`.
    pub from_available: Amount,
    /// Shortfall requested from the value transfer gateway.
    pub from_gateway: Amount,
}

impl Draw {
    /// Splits `amount` against the current free balance. The two parts
    /// always sum to `amount` and never overlap.
    pub fn split(available: Amount, amount: Amount) -> Self {
        if available >= amount {
            Self {
                from_available: amount,
                from_gateway: Amount::zero(),
            }
        } else {
            Self {
                from_available: available,
                from_gateway: amount - available,
            }
        }
    }

    /// `true` if the gateway has to be involved at all.
    pub fn needs_gateway(&self) -> bool {
        !self.from_gateway.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Everything the ledger tracks for one principal.
///
/// Created lazily on first interaction and never removed. Map entries that
/// drop to zero are deleted, so absence always means zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HodlerAccount {
    /// Free balance, withdrawable or committable.
    pub available: Amount,
    /// Locked amount per resource fingerprint.
    pub locks: BTreeMap<Fingerprint, Amount>,
    /// Staked amount per delegated operator.
    pub stakes: BTreeMap<Principal, Amount>,
    /// Pending releases, append-only apart from in-place clearing.
    pub vaults: Vec<Vault>,
    /// Amount committed to governance voting weight.
    pub votes: Amount,
    /// Prepaid budget for reward-settlement bookkeeping.
    pub gas: Amount,
}

impl HodlerAccount {
    /// Locked amount for `fingerprint`, zero when absent.
    pub fn lock_of(&self, fingerprint: &Fingerprint) -> Amount {
        self.locks.get(fingerprint).copied().unwrap_or_default()
    }

    /// Staked amount for `operator`, zero when absent.
    pub fn stake_of(&self, operator: &Principal) -> Amount {
        self.stakes.get(operator).copied().unwrap_or_default()
    }

    /// Sum of all locks.
    pub fn total_locked(&self) -> Result<Amount, LedgerError> {
        checked_sum(self.locks.values().copied())
    }

    /// Sum of all stakes.
    pub fn total_staked(&self) -> Result<Amount, LedgerError> {
        checked_sum(self.stakes.values().copied())
    }

    /// Sum of all pending vault amounts.
    pub fn total_vaulted(&self) -> Result<Amount, LedgerError> {
        checked_sum(self.vaults.iter().map(|v| v.amount))
    }

    /// `available + Σlocks + Σstakes + votes + Σvaults`.
    ///
    /// This is the quantity the ledger conserves: it only moves by external
    /// deposits, withdrawals and reward credits. Gas is tracked separately.
    pub fn total_committed(&self) -> Result<Amount, LedgerError> {
        checked_sum([
            self.available,
            self.total_locked()?,
            self.total_staked()?,
            self.votes,
            self.total_vaulted()?,
        ])
    }

    /// Amount a sweep at `now` would release, without touching the vaults.
    pub fn matured(&self, now: Timestamp) -> Result<Amount, LedgerError> {
        checked_sum(
            self.vaults
                .iter()
                .filter(|v| v.is_matured(now))
                .map(|v| v.amount),
        )
    }

    /// Appends a vault and returns its stable index.
    pub fn schedule_vault(&mut self, amount: Amount, available_at: Timestamp) -> usize {
        self.vaults.push(Vault {
            amount,
            available_at,
        });
        self.vaults.len() - 1
    }

    /// Zeroes every matured vault and credits the total to `available`.
    ///
    /// Returns the released amount and how many vaults were opened.
    /// Unmatured vaults are left untouched.
    pub fn open_matured(&mut self, now: Timestamp) -> Result<(Amount, usize), LedgerError> {
        let mut released = Amount::zero();
        let mut opened = 0usize;
        for vault in self.vaults.iter_mut().filter(|v| v.is_matured(now)) {
            released = released
                .checked_add(vault.amount)
                .ok_or(LedgerError::ArithmeticOverflow)?;
            *vault = Vault::default();
            opened += 1;
        }
        self.available = self
            .available
            .checked_add(released)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok((released, opened))
    }
}

fn checked_sum(values: impl IntoIterator<Item = Amount>) -> Result<Amount, LedgerError> {
    values.into_iter().try_fold(Amount::zero(), |acc, v| {
        acc.checked_add(v).ok_or(LedgerError::ArithmeticOverflow)
    })
}

/// Serde adapter writing [`Amount`] as a decimal string. Accepts decimal
/// strings or plain JSON integers on input, so config files stay readable.
pub mod decimal {
    use super::Amount;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Writes the amount as a base-10 string.
    pub fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    /// Reads a base-10 string or an unsigned JSON integer.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => Amount::from_dec_str(text.trim()).map_err(de::Error::custom),
            Repr::Number(n) => Ok(Amount::from(n)),
        }
    }
}
