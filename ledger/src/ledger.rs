//! # Hodler Ledger
//!
//! The accounting engine. Maps each principal to a [`HodlerAccount`] and
//! applies every balance-affecting transition: lock/unlock, stake/unstake,
//! votes, vault sweeps, withdrawals, gas deposits and reward settlement,
//! plus the capability-gated parameter and lifecycle controls.
//!
//! ## Execution model
//!
//! Every mutating entry point runs as one indivisible step:
//!
//! 1. Raise the reentrancy flag (fail with `ReentrancyRejected` if raised).
//! 2. Check the ledger is initialized and in the right operational state.
//! 3. Check the caller's capability for privileged operations.
//! 4. Validate and stage the change on a copy of the affected account.
//! 5. Call the value transfer gateway, if the operation moves value.
//! 6. Commit the staged account and append the events.
//!
//! Anything that fails before step 6 leaves no trace: not in the accounts,
//! not in the parameters, not in the event log. The state mutex is never
//! held across a gateway call, so a gateway that calls back into the
//! ledger sees the reentrancy flag rather than a deadlock.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::authority::CapabilityAuthority;
use crate::clock::Clock;
use crate::config::{
    validate_duration, validate_lock_size, DurationKind, LedgerConfig, LedgerParams, Parameter,
    LEDGER_VERSION,
};
use crate::error::{ErrorKind, LedgerError};
use crate::events::{EventLog, EventRecord, LedgerEvent};
use crate::gateway::ValueGateway;
use crate::guard::EntryGuard;
use crate::types::{
    Amount, Capability, Draw, Fingerprint, HodlerAccount, OperationalStatus, Principal, Timestamp,
};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Everything the ledger persists. Also the shape of [`HodlerLedger::snapshot`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Set once by `initialize`.
    pub initialized: bool,
    /// Addresses and current parameters.
    pub config: LedgerConfig,
    /// Active or suspended.
    pub status: OperationalStatus,
    /// Currently authorized implementation version.
    pub version: u64,
    /// Per-principal balances. Accounts are never removed.
    pub accounts: BTreeMap<Principal, HodlerAccount>,
    /// Committed events.
    pub events: EventLog,
}

struct Inner {
    entered: AtomicBool,
    state: Mutex<LedgerState>,
    gateway: Arc<dyn ValueGateway>,
    authority: Arc<dyn CapabilityAuthority>,
    clock: Arc<dyn Clock>,
}

/// What an entry point requires before it may proceed.
#[derive(Debug, Clone, Copy)]
enum Gate {
    /// User operation: ledger must be active.
    Active,
    /// Privileged operation: capability required, status ignored.
    Privileged(Capability),
    /// Circuit breaker: ledger must be suspended and capability held.
    Suspended(Capability),
}

/// One in-flight operation. Holds the reentrancy flag until dropped.
struct Session<'a> {
    inner: &'a Inner,
    config: LedgerConfig,
    status: OperationalStatus,
    version: u64,
    now: Timestamp,
    _entry: EntryGuard<'a>,
}

impl Session<'_> {
    fn account(&self, principal: &Principal) -> HodlerAccount {
        self.inner
            .state
            .lock()
            .accounts
            .get(principal)
            .cloned()
            .unwrap_or_default()
    }

    fn params(&self) -> &LedgerParams {
        &self.config.params
    }

    /// Release time for a vault of `kind` created now.
    fn release_time(&self, kind: DurationKind) -> Result<Timestamp, LedgerError> {
        self.now
            .checked_add(self.params().duration_for(kind))
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    /// Appends a vault to the staged account and returns its creation event.
    fn schedule(
        &self,
        principal: &Principal,
        account: &mut HodlerAccount,
        amount: Amount,
        kind: DurationKind,
    ) -> Result<LedgerEvent, LedgerError> {
        let available_at = self.release_time(kind)?;
        let index = account.schedule_vault(amount, available_at);
        Ok(LedgerEvent::VaultCreated {
            account: principal.clone(),
            index,
            amount,
            available_at,
            kind,
        })
    }

    /// `transfer_from` through the gateway. Zero amounts never reach it.
    fn pull(&self, from: &Principal, to: &Principal, amount: Amount) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.inner
            .gateway
            .transfer_from(from, to, amount)
            .map_err(|e| LedgerError::TransferDeclined(e.to_string()))
    }

    /// Pulls the part of `draw` that free balance did not cover into custody.
    fn collect(&self, from: &Principal, draw: &Draw) -> Result<(), LedgerError> {
        if !draw.needs_gateway() {
            return Ok(());
        }
        self.pull(from, &self.config.custody, draw.from_gateway)
    }

    /// `transfer` out of custody through the gateway.
    fn pay(&self, to: &Principal, amount: Amount) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.inner
            .gateway
            .transfer(to, amount)
            .map_err(|e| LedgerError::TransferDeclined(e.to_string()))
    }

    /// Writes the staged account and its events in one step.
    fn commit(
        &self,
        principal: &Principal,
        account: HodlerAccount,
        events: impl IntoIterator<Item = LedgerEvent>,
    ) {
        let mut state = self.inner.state.lock();
        state.accounts.insert(principal.clone(), account);
        for event in events {
            state.events.push(self.now, event);
        }
    }

    /// Applies a ledger-wide change and its events in one step.
    fn commit_with(
        &self,
        change: impl FnOnce(&mut LedgerState),
        events: impl IntoIterator<Item = LedgerEvent>,
    ) {
        let mut state = self.inner.state.lock();
        change(&mut state);
        for event in events {
            state.events.push(self.now, event);
        }
    }
}

/// Takes the free-balance part of a draw out of the staged account.
fn draw_from(account: &mut HodlerAccount, amount: Amount) -> Result<Draw, LedgerError> {
    let draw = Draw::split(account.available, amount);
    account.available = account
        .available
        .checked_sub(draw.from_available)
        .ok_or(LedgerError::ArithmeticUnderflow)?;
    Ok(draw)
}

fn require_positive(amount: Amount) -> Result<(), LedgerError> {
    if amount.is_zero() {
        return Err(LedgerError::ZeroAmount);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Handle to a ledger instance. Cloning shares the same state.
///
/// Operations are serialized by rejection, not by waiting: while one call
/// is in flight, any other call on any clone, from any thread, fails with
/// [`LedgerError::ReentrancyRejected`]. Callers sharing a handle across
/// threads or tasks must order their requests themselves (a queue or an
/// outer mutex) and may retry rejected calls. Queries never take the
/// entry flag and always succeed.
#[derive(Clone)]
pub struct HodlerLedger {
    inner: Arc<Inner>,
}

impl HodlerLedger {
    /// Creates an uninitialized ledger. Every operation except
    /// [`initialize`](Self::initialize) fails with `NotInitialized` until
    /// it has run.
    pub fn new(
        gateway: Arc<dyn ValueGateway>,
        authority: Arc<dyn CapabilityAuthority>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::from_state(LedgerState::default(), gateway, authority, clock)
    }

    /// Restores a ledger from a previously exported snapshot.
    ///
    /// Capability grants live in the authority, not the snapshot, so the
    /// authority passed here must already hold them.
    pub fn from_state(
        state: LedgerState,
        gateway: Arc<dyn ValueGateway>,
        authority: Arc<dyn CapabilityAuthority>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                entered: AtomicBool::new(false),
                state: Mutex::new(state),
                gateway,
                authority,
                clock,
            }),
        }
    }

    fn enter(&self, caller: &Principal, gate: Gate) -> Result<Session<'_>, LedgerError> {
        let entry = EntryGuard::enter(&self.inner.entered)?;

        let (initialized, config, status, version) = {
            let state = self.inner.state.lock();
            (
                state.initialized,
                state.config.clone(),
                state.status,
                state.version,
            )
        };
        if !initialized {
            return Err(LedgerError::NotInitialized);
        }

        match gate {
            Gate::Active => {
                if status == OperationalStatus::Suspended {
                    return Err(LedgerError::LedgerSuspended);
                }
            }
            Gate::Privileged(capability) => self.require(capability, caller)?,
            Gate::Suspended(capability) => {
                if status != OperationalStatus::Suspended {
                    return Err(LedgerError::NotSuspended);
                }
                self.require(capability, caller)?;
            }
        }

        Ok(Session {
            inner: &self.inner,
            config,
            status,
            version,
            now: self.inner.clock.now(),
            _entry: entry,
        })
    }

    fn require(&self, capability: Capability, principal: &Principal) -> Result<(), LedgerError> {
        if self.inner.authority.has_capability(capability, principal) {
            Ok(())
        } else {
            Err(LedgerError::CapabilityDenied {
                capability,
                principal: principal.clone(),
            })
        }
    }

    /// Runs one operation and logs its rejection, if any.
    fn run<T>(
        &self,
        operation: &'static str,
        caller: &Principal,
        op: impl FnOnce() -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let result = op();
        if let Err(err) = &result {
            match err.kind() {
                ErrorKind::TransferDeclined
                | ErrorKind::CapabilityDenied
                | ErrorKind::ReentrancyRejected
                | ErrorKind::Arithmetic => {
                    tracing::warn!(operation, caller = %caller, error = %err, "operation rejected");
                }
                _ => {
                    tracing::debug!(operation, caller = %caller, error = %err, "operation rejected");
                }
            }
        }
        result
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// One-time setup.
    ///
    /// Validates the parameters, grants admin, pauser and upgrader to the
    /// `initializer` and controller to `config.controller`, and emits
    /// `Initialized`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AlreadyInitialized`] on a second call, or a
    /// validation error for a zero lock size or a too-short duration.
    pub fn initialize(
        &self,
        initializer: &Principal,
        config: LedgerConfig,
    ) -> Result<(), LedgerError> {
        self.run("initialize", initializer, || {
            let _entry = EntryGuard::enter(&self.inner.entered)?;
            if self.inner.state.lock().initialized {
                return Err(LedgerError::AlreadyInitialized);
            }
            config.validate()?;

            let authority = &self.inner.authority;
            authority.grant(Capability::Admin, initializer);
            authority.grant(Capability::Pauser, initializer);
            authority.grant(Capability::Upgrader, initializer);
            authority.grant(Capability::Controller, &config.controller);

            let now = self.inner.clock.now();
            let event = LedgerEvent::Initialized {
                token: config.token.clone(),
                controller: config.controller.clone(),
                lock_size: config.params.lock_size,
                lock_duration: config.params.lock_duration,
                stake_duration: config.params.stake_duration,
                governance_duration: config.params.governance_duration,
            };

            let mut state = self.inner.state.lock();
            state.initialized = true;
            state.config = config;
            state.status = OperationalStatus::Active;
            state.version = LEDGER_VERSION;
            state.events.push(now, event);
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Locks
    // -----------------------------------------------------------------------

    /// Commits `lock_size` to `fingerprint`.
    ///
    /// Draws from `available` first; only the shortfall is pulled from the
    /// caller through the gateway. Repeated locks on the same fingerprint
    /// accumulate.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidFingerprint`] for names outside 1..=40 bytes,
    /// [`LedgerError::TransferDeclined`] if the shortfall could not be pulled.
    pub fn lock(&self, caller: &Principal, fingerprint: &str) -> Result<(), LedgerError> {
        self.run("lock", caller, || {
            let session = self.enter(caller, Gate::Active)?;
            let fingerprint = Fingerprint::new(fingerprint)?;
            let amount = session.params().lock_size;

            let mut account = session.account(caller);
            let draw = draw_from(&mut account, amount)?;
            let slot = account.locks.entry(fingerprint.clone()).or_default();
            *slot = slot
                .checked_add(amount)
                .ok_or(LedgerError::ArithmeticOverflow)?;

            session.collect(caller, &draw)?;
            session.commit(
                caller,
                account,
                [LedgerEvent::Locked {
                    account: caller.clone(),
                    fingerprint,
                    amount,
                    from_available: draw.from_available,
                    from_gateway: draw.from_gateway,
                }],
            );
            Ok(())
        })
    }

    /// Clears the lock on `fingerprint` into a vault released after
    /// `lock_duration`. Returns the amount that was locked.
    ///
    /// # Errors
    ///
    /// [`LedgerError::LockNotFound`] if there is no positive lock.
    pub fn unlock(&self, caller: &Principal, fingerprint: &str) -> Result<Amount, LedgerError> {
        self.run("unlock", caller, || {
            let session = self.enter(caller, Gate::Active)?;
            let fingerprint = Fingerprint::new(fingerprint)?;

            let mut account = session.account(caller);
            let amount = account
                .locks
                .remove(&fingerprint)
                .filter(|a| !a.is_zero())
                .ok_or_else(|| LedgerError::LockNotFound(fingerprint.to_string()))?;
            let vault = session.schedule(caller, &mut account, amount, DurationKind::Lock)?;

            session.commit(
                caller,
                account,
                [
                    LedgerEvent::Unlocked {
                        account: caller.clone(),
                        fingerprint,
                        amount,
                    },
                    vault,
                ],
            );
            Ok(amount)
        })
    }

    // -----------------------------------------------------------------------
    // Stakes
    // -----------------------------------------------------------------------

    /// Delegates `amount` to `operator`, drawing from `available` first.
    pub fn stake(
        &self,
        caller: &Principal,
        operator: &Principal,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.run("stake", caller, || {
            let session = self.enter(caller, Gate::Active)?;
            require_positive(amount)?;

            let mut account = session.account(caller);
            let draw = draw_from(&mut account, amount)?;
            let slot = account.stakes.entry(operator.clone()).or_default();
            *slot = slot
                .checked_add(amount)
                .ok_or(LedgerError::ArithmeticOverflow)?;

            session.collect(caller, &draw)?;
            session.commit(
                caller,
                account,
                [LedgerEvent::Staked {
                    account: caller.clone(),
                    operator: operator.clone(),
                    amount,
                    from_available: draw.from_available,
                    from_gateway: draw.from_gateway,
                }],
            );
            Ok(())
        })
    }

    /// Moves `amount` of the stake on `operator` into a vault released
    /// after `stake_duration`. Unstaking everything removes the entry.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientBalance`] if `amount` exceeds the stake.
    pub fn unstake(
        &self,
        caller: &Principal,
        operator: &Principal,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.run("unstake", caller, || {
            let session = self.enter(caller, Gate::Active)?;
            require_positive(amount)?;

            let mut account = session.account(caller);
            let held = account.stake_of(operator);
            if amount > held {
                return Err(LedgerError::InsufficientBalance {
                    requested: amount,
                    available: held,
                });
            }
            if amount == held {
                account.stakes.remove(operator);
            } else {
                account.stakes.insert(operator.clone(), held - amount);
            }
            let vault = session.schedule(caller, &mut account, amount, DurationKind::Stake)?;

            session.commit(
                caller,
                account,
                [
                    LedgerEvent::Unstaked {
                        account: caller.clone(),
                        operator: operator.clone(),
                        amount,
                    },
                    vault,
                ],
            );
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Votes
    // -----------------------------------------------------------------------

    /// Adds `amount` of voting weight, drawing from `available` first.
    pub fn add_votes(&self, caller: &Principal, amount: Amount) -> Result<(), LedgerError> {
        self.run("add_votes", caller, || {
            let session = self.enter(caller, Gate::Active)?;
            require_positive(amount)?;

            let mut account = session.account(caller);
            let draw = draw_from(&mut account, amount)?;
            account.votes = account
                .votes
                .checked_add(amount)
                .ok_or(LedgerError::ArithmeticOverflow)?;

            session.collect(caller, &draw)?;
            session.commit(
                caller,
                account,
                [LedgerEvent::VotesAdded {
                    account: caller.clone(),
                    amount,
                    from_available: draw.from_available,
                    from_gateway: draw.from_gateway,
                }],
            );
            Ok(())
        })
    }

    /// Moves `amount` of voting weight into a vault released after
    /// `governance_duration`.
    pub fn remove_votes(&self, caller: &Principal, amount: Amount) -> Result<(), LedgerError> {
        self.run("remove_votes", caller, || {
            let session = self.enter(caller, Gate::Active)?;
            require_positive(amount)?;

            let mut account = session.account(caller);
            if amount > account.votes {
                return Err(LedgerError::InsufficientBalance {
                    requested: amount,
                    available: account.votes,
                });
            }
            account.votes -= amount;
            let vault = session.schedule(caller, &mut account, amount, DurationKind::Governance)?;

            session.commit(
                caller,
                account,
                [
                    LedgerEvent::VotesRemoved {
                        account: caller.clone(),
                        amount,
                    },
                    vault,
                ],
            );
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Vault sweep & withdrawal
    // -----------------------------------------------------------------------

    /// Sweeps every matured vault of the caller into `available` and
    /// returns the released total.
    ///
    /// A vault is matured when `available_at < now - BUFFER_WINDOW`.
    /// Swept slots are zeroed, never removed. No value crosses the gateway.
    pub fn open_expired(&self, caller: &Principal) -> Result<Amount, LedgerError> {
        self.run("open_expired", caller, || {
            let session = self.enter(caller, Gate::Active)?;

            let mut account = session.account(caller);
            let (released, opened) = account.open_matured(session.now)?;

            let event = (opened > 0).then(|| LedgerEvent::VaultsOpened {
                account: caller.clone(),
                amount: released,
                vaults: opened,
            });
            session.commit(caller, account, event);
            Ok(released)
        })
    }

    /// Pays `amount` of free balance out to the caller.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientBalance`] if `amount > available`;
    /// [`LedgerError::TransferDeclined`] if the payout failed, in which
    /// case `available` is left untouched.
    pub fn withdraw(&self, caller: &Principal, amount: Amount) -> Result<(), LedgerError> {
        self.run("withdraw", caller, || {
            let session = self.enter(caller, Gate::Active)?;
            require_positive(amount)?;

            let mut account = session.account(caller);
            if amount > account.available {
                return Err(LedgerError::InsufficientBalance {
                    requested: amount,
                    available: account.available,
                });
            }
            account.available -= amount;

            session.pay(caller, amount)?;
            session.commit(
                caller,
                account,
                [LedgerEvent::Withdrawn {
                    account: caller.clone(),
                    amount,
                }],
            );
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Gas & rewards
    // -----------------------------------------------------------------------

    /// Bare-value deposit: credits the sender's gas budget and forwards the
    /// whole amount to the controller. Nothing stays in ledger custody.
    pub fn deposit(&self, sender: &Principal, amount: Amount) -> Result<(), LedgerError> {
        self.run("deposit", sender, || {
            let session = self.enter(sender, Gate::Active)?;
            require_positive(amount)?;

            let mut account = session.account(sender);
            account.gas = account
                .gas
                .checked_add(amount)
                .ok_or(LedgerError::ArithmeticOverflow)?;

            let settlement = &session.config.controller;
            session.pull(sender, settlement, amount)?;
            session.commit(
                sender,
                account,
                [LedgerEvent::GasDeposited {
                    account: sender.clone(),
                    amount,
                    forwarded_to: settlement.clone(),
                }],
            );
            Ok(())
        })
    }

    /// Asks the controller to settle the caller's rewards.
    ///
    /// Moves no value; the payout happens in a later [`reward`](Self::reward)
    /// call. Returns the caller's current gas budget.
    pub fn redeem(&self, caller: &Principal) -> Result<Amount, LedgerError> {
        self.run("redeem", caller, || {
            let session = self.enter(caller, Gate::Active)?;
            let account = session.account(caller);
            let gas = account.gas;
            session.commit(
                caller,
                account,
                [LedgerEvent::RewardsUpdateRequested {
                    account: caller.clone(),
                    gas,
                }],
            );
            Ok(gas)
        })
    }

    /// Controller-only reward settlement.
    ///
    /// Charges `gas_estimate` against the account's gas budget. With
    /// `should_redeem` the reward is paid from the rewards pool straight to
    /// the account; otherwise it is pulled into custody and credited to
    /// `available`. A declined transfer rolls back the gas charge too.
    ///
    /// # Errors
    ///
    /// [`LedgerError::CapabilityDenied`] for non-controllers,
    /// [`LedgerError::InsufficientGasBudget`] if `gas < gas_estimate`.
    pub fn reward(
        &self,
        caller: &Principal,
        account: &Principal,
        reward_amount: Amount,
        gas_estimate: Amount,
        should_redeem: bool,
    ) -> Result<(), LedgerError> {
        self.run("reward", caller, || {
            let session = self.enter(caller, Gate::Privileged(Capability::Controller))?;

            let mut staged = session.account(account);
            if staged.gas < gas_estimate {
                return Err(LedgerError::InsufficientGasBudget {
                    estimate: gas_estimate,
                    budget: staged.gas,
                });
            }
            staged.gas -= gas_estimate;

            let pool = &session.config.rewards_pool;
            if should_redeem {
                session.pull(pool, account, reward_amount)?;
            } else {
                staged.available = staged
                    .available
                    .checked_add(reward_amount)
                    .ok_or(LedgerError::ArithmeticOverflow)?;
                session.pull(pool, &session.config.custody, reward_amount)?;
            }

            session.commit(
                account,
                staged,
                [LedgerEvent::RewardSettled {
                    account: account.clone(),
                    amount: reward_amount,
                    gas_charged: gas_estimate,
                    redeemed: should_redeem,
                }],
            );
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Parameters
    // -----------------------------------------------------------------------

    /// Controller-only. Sets the amount committed by each `lock`.
    pub fn set_lock_size(&self, caller: &Principal, lock_size: Amount) -> Result<(), LedgerError> {
        self.run("set_lock_size", caller, || {
            let session = self.enter(caller, Gate::Privileged(Capability::Controller))?;
            validate_lock_size(lock_size)?;

            let old = session.params().lock_size;
            session.commit_with(
                |state| state.config.params.lock_size = lock_size,
                [LedgerEvent::ParameterChanged {
                    parameter: Parameter::LockSize,
                    old,
                    new: lock_size,
                    actor: caller.clone(),
                }],
            );
            Ok(())
        })
    }

    /// Controller-only. Sets one of the three release durations.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidDuration`] below `BUFFER_WINDOW + ONE_DAY`.
    pub fn set_duration(
        &self,
        caller: &Principal,
        kind: DurationKind,
        duration: u64,
    ) -> Result<(), LedgerError> {
        self.run("set_duration", caller, || {
            let session = self.enter(caller, Gate::Privileged(Capability::Controller))?;
            validate_duration(duration)?;

            let old = session.params().duration_for(kind);
            session.commit_with(
                |state| *state.config.params.duration_mut(kind) = duration,
                [LedgerEvent::ParameterChanged {
                    parameter: Parameter::from(kind),
                    old: Amount::from(old),
                    new: Amount::from(duration),
                    actor: caller.clone(),
                }],
            );
            Ok(())
        })
    }

    /// Shorthand for [`set_duration`](Self::set_duration) with [`DurationKind::Lock`].
    pub fn set_lock_duration(&self, caller: &Principal, duration: u64) -> Result<(), LedgerError> {
        self.set_duration(caller, DurationKind::Lock, duration)
    }

    /// Shorthand for [`set_duration`](Self::set_duration) with [`DurationKind::Stake`].
    pub fn set_stake_duration(&self, caller: &Principal, duration: u64) -> Result<(), LedgerError> {
        self.set_duration(caller, DurationKind::Stake, duration)
    }

    /// Shorthand for [`set_duration`](Self::set_duration) with [`DurationKind::Governance`].
    pub fn set_governance_duration(
        &self,
        caller: &Principal,
        duration: u64,
    ) -> Result<(), LedgerError> {
        self.set_duration(caller, DurationKind::Governance, duration)
    }

    // -----------------------------------------------------------------------
    // Operational status, upgrades, emergency
    // -----------------------------------------------------------------------

    /// Pauser-only. Active → Suspended.
    pub fn pause(&self, caller: &Principal) -> Result<(), LedgerError> {
        self.run("pause", caller, || {
            let session = self.enter(caller, Gate::Privileged(Capability::Pauser))?;
            if session.status == OperationalStatus::Suspended {
                return Err(LedgerError::AlreadySuspended);
            }
            session.commit_with(
                |state| state.status = OperationalStatus::Suspended,
                [LedgerEvent::Paused {
                    actor: caller.clone(),
                }],
            );
            Ok(())
        })
    }

    /// Pauser-only. Suspended → Active.
    pub fn unpause(&self, caller: &Principal) -> Result<(), LedgerError> {
        self.run("unpause", caller, || {
            let session = self.enter(caller, Gate::Privileged(Capability::Pauser))?;
            if session.status != OperationalStatus::Suspended {
                return Err(LedgerError::NotSuspended);
            }
            session.commit_with(
                |state| state.status = OperationalStatus::Active,
                [LedgerEvent::Unpaused {
                    actor: caller.clone(),
                }],
            );
            Ok(())
        })
    }

    /// Upgrader-only. Accepts `proposed_version` if it is strictly greater
    /// than the current version.
    pub fn authorize_upgrade(
        &self,
        caller: &Principal,
        proposed_version: u64,
    ) -> Result<(), LedgerError> {
        self.run("authorize_upgrade", caller, || {
            let session = self.enter(caller, Gate::Privileged(Capability::Upgrader))?;
            if proposed_version <= session.version {
                return Err(LedgerError::VersionNotNewer {
                    current: session.version,
                    proposed: proposed_version,
                });
            }
            session.commit_with(
                |state| state.version = proposed_version,
                [LedgerEvent::UpgradeAuthorized {
                    actor: caller.clone(),
                    from_version: session.version,
                    to_version: proposed_version,
                }],
            );
            Ok(())
        })
    }

    /// Admin-only circuit breaker, allowed only while suspended. Sweeps the
    /// whole custodied token balance to the caller and returns the amount.
    ///
    /// Account records are left as they are; they describe what holders are
    /// owed once the funds are restored.
    pub fn emergency_withdraw(&self, caller: &Principal) -> Result<Amount, LedgerError> {
        self.run("emergency_withdraw", caller, || {
            let session = self.enter(caller, Gate::Suspended(Capability::Admin))?;
            let amount = self.inner.gateway.balance_of(&session.config.custody);

            session.pay(caller, amount)?;
            session.commit_with(
                |_| {},
                [LedgerEvent::EmergencyWithdrawal {
                    actor: caller.clone(),
                    amount,
                }],
            );
            Ok(amount)
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The account of `principal`, or an all-zero account if it has none.
    pub fn account(&self, principal: &Principal) -> HodlerAccount {
        self.inner
            .state
            .lock()
            .accounts
            .get(principal)
            .cloned()
            .unwrap_or_default()
    }

    /// What [`open_expired`](Self::open_expired) would release right now.
    pub fn matured_amount(&self, principal: &Principal) -> Result<Amount, LedgerError> {
        self.account(principal).matured(self.inner.clock.now())
    }

    /// Sum of every account's conserved total.
    pub fn total_committed(&self) -> Result<Amount, LedgerError> {
        let state = self.inner.state.lock();
        state.accounts.values().try_fold(Amount::zero(), |acc, a| {
            acc.checked_add(a.total_committed()?)
                .ok_or(LedgerError::ArithmeticOverflow)
        })
    }

    /// Current tunable parameters.
    pub fn params(&self) -> LedgerParams {
        self.inner.state.lock().config.params.clone()
    }

    /// Full configuration, including addresses.
    pub fn config(&self) -> LedgerConfig {
        self.inner.state.lock().config.clone()
    }

    /// Active or suspended.
    pub fn status(&self) -> OperationalStatus {
        self.inner.state.lock().status
    }

    /// Currently authorized version. Zero before initialization.
    pub fn version(&self) -> u64 {
        self.inner.state.lock().version
    }

    /// Whether `initialize` has run.
    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().initialized
    }

    /// Copies of the committed events still held in the log.
    pub fn events(&self) -> Vec<EventRecord> {
        self.inner.state.lock().events.records().to_vec()
    }

    /// Removes and returns held events, for consumers that ship them elsewhere.
    pub fn drain_events(&self) -> Vec<EventRecord> {
        self.inner.state.lock().events.drain()
    }

    /// A serializable copy of the whole ledger state.
    pub fn snapshot(&self) -> LedgerState {
        self.inner.state.lock().clone()
    }
}

impl std::fmt::Debug for HodlerLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("HodlerLedger")
            .field("initialized", &state.initialized)
            .field("status", &state.status)
            .field("version", &state.version)
            .field("accounts", &state.accounts.len())
            .field("events", &state.events.len())
            .finish()
    }
}
