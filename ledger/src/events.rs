//! # Ledger Events
//!
//! Every committed operation appends one or more [`LedgerEvent`]s to the
//! ledger's [`EventLog`]. Events are the audit trail consumed by indexers:
//! they are only recorded after all state changes and external transfers
//! of an operation have succeeded, so a failed operation leaves no trace.
//!
//! Each event is also mirrored to `tracing` at `info` level.

use serde::{Deserialize, Serialize};

use crate::config::{DurationKind, Parameter};
use crate::types::{Amount, Fingerprint, Principal, Timestamp};

/// Something that happened to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// One-time setup with the initial configuration.
    Initialized {
        token: Principal,
        controller: Principal,
        lock_size: Amount,
        lock_duration: u64,
        stake_duration: u64,
        governance_duration: u64,
    },
    /// `lock_size` committed to a fingerprint.
    Locked {
        account: Principal,
        fingerprint: Fingerprint,
        amount: Amount,
        from_available: Amount,
        from_gateway: Amount,
    },
    /// A lock cleared into a vault.
    Unlocked {
        account: Principal,
        fingerprint: Fingerprint,
        amount: Amount,
    },
    /// Value delegated to an operator.
    Staked {
        account: Principal,
        operator: Principal,
        amount: Amount,
        from_available: Amount,
        from_gateway: Amount,
    },
    /// Stake withdrawn into a vault.
    Unstaked {
        account: Principal,
        operator: Principal,
        amount: Amount,
    },
    /// Voting weight increased.
    VotesAdded {
        account: Principal,
        amount: Amount,
        from_available: Amount,
        from_gateway: Amount,
    },
    /// Voting weight moved into a vault.
    VotesRemoved { account: Principal, amount: Amount },
    /// A release was scheduled.
    VaultCreated {
        account: Principal,
        index: usize,
        amount: Amount,
        available_at: Timestamp,
        kind: DurationKind,
    },
    /// Matured vaults were swept into `available`.
    VaultsOpened {
        account: Principal,
        amount: Amount,
        vaults: usize,
    },
    /// Free balance paid out through the gateway.
    Withdrawn { account: Principal, amount: Amount },
    /// A bare deposit topped up the gas budget and was forwarded.
    GasDeposited {
        account: Principal,
        amount: Amount,
        forwarded_to: Principal,
    },
    /// The account asked the controller to settle its rewards.
    RewardsUpdateRequested { account: Principal, gas: Amount },
    /// The controller settled a reward.
    RewardSettled {
        account: Principal,
        amount: Amount,
        gas_charged: Amount,
        redeemed: bool,
    },
    /// A controller-managed parameter changed.
    ParameterChanged {
        parameter: Parameter,
        old: Amount,
        new: Amount,
        actor: Principal,
    },
    /// User operations suspended.
    Paused { actor: Principal },
    /// User operations resumed.
    Unpaused { actor: Principal },
    /// A higher version was authorized.
    UpgradeAuthorized {
        actor: Principal,
        from_version: u64,
        to_version: u64,
    },
    /// The custodied balance was swept to the admin.
    EmergencyWithdrawal { actor: Principal, amount: Amount },
}

impl LedgerEvent {
    /// Short snake_case name, matching the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Initialized { .. } => "initialized",
            LedgerEvent::Locked { .. } => "locked",
            LedgerEvent::Unlocked { .. } => "unlocked",
            LedgerEvent::Staked { .. } => "staked",
            LedgerEvent::Unstaked { .. } => "unstaked",
            LedgerEvent::VotesAdded { .. } => "votes_added",
            LedgerEvent::VotesRemoved { .. } => "votes_removed",
            LedgerEvent::VaultCreated { .. } => "vault_created",
            LedgerEvent::VaultsOpened { .. } => "vaults_opened",
            LedgerEvent::Withdrawn { .. } => "withdrawn",
            LedgerEvent::GasDeposited { .. } => "gas_deposited",
            LedgerEvent::RewardsUpdateRequested { .. } => "rewards_update_requested",
            LedgerEvent::RewardSettled { .. } => "reward_settled",
            LedgerEvent::ParameterChanged { .. } => "parameter_changed",
            LedgerEvent::Paused { .. } => "paused",
            LedgerEvent::Unpaused { .. } => "unpaused",
            LedgerEvent::UpgradeAuthorized { .. } => "upgrade_authorized",
            LedgerEvent::EmergencyWithdrawal { .. } => "emergency_withdrawal",
        }
    }
}

/// An event with its position in the log and the time it was committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number, starting at 0. Never reused, even after
    /// [`EventLog::drain`].
    pub seq: u64,
    /// Ledger time of the operation that produced the event.
    pub timestamp: Timestamp,
    /// The event itself.
    pub event: LedgerEvent,
}

/// Append-only list of committed events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
    next_seq: u64,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event and logs it.
    pub fn push(&mut self, timestamp: Timestamp, event: LedgerEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        tracing::info!(seq, timestamp, event = event.name(), detail = ?event, "ledger event");
        self.records.push(EventRecord {
            seq,
            timestamp,
            event,
        });
    }

    /// Records currently held.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Removes and returns all held records. Sequence numbers keep counting.
    pub fn drain(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.records)
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` if no records are held.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
