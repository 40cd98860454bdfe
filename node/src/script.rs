//! # Operation Scripts
//!
//! A script is a JSON document describing a sequence of ledger calls plus
//! the out-of-band setup a real deployment would do elsewhere: minting
//! balances at the gateway, granting capabilities, moving the clock.
//!
//! ```json
//! {
//!   "initializer": "deployer",
//!   "mints": [{ "holder": "alice", "amount": "1000" }],
//!   "steps": [
//!     { "op": "lock", "caller": "alice", "fingerprint": "AAAA" },
//!     { "op": "advance", "seconds": 86400 },
//!     { "op": "unlock", "caller": "alice", "fingerprint": "AAAA" }
//!   ]
//! }
//! ```
//!
//! [`Replay`] runs a script against a fresh ledger backed by the in-memory
//! gateway, authority and a manual clock.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use hodler_ledger::types::decimal;
use hodler_ledger::{
    Amount, Capability, CapabilityAuthority, Clock, DurationKind, EventRecord, HodlerAccount,
    HodlerLedger, InMemoryAuthority, InMemoryGateway, LedgerConfig, LedgerError, ManualClock, Principal,
    Timestamp, ValueGateway,
};

use crate::metrics::LedgerMetrics;

// ---------------------------------------------------------------------------
// Script format
// ---------------------------------------------------------------------------

/// A complete replay script.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Principal that runs `initialize` and receives the admin, pauser and
    /// upgrader capabilities.
    pub initializer: Principal,
    /// Gateway balances created before initialization.
    #[serde(default)]
    pub mints: Vec<Mint>,
    /// Calls applied in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Credits `holder` at the gateway out of thin air.
#[derive(Debug, Clone, Deserialize)]
pub struct Mint {
    pub holder: Principal,
    #[serde(with = "decimal")]
    pub amount: Amount,
}

/// One scripted action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Lock {
        caller: Principal,
        fingerprint: String,
    },
    Unlock {
        caller: Principal,
        fingerprint: String,
    },
    Stake {
        caller: Principal,
        operator: Principal,
        #[serde(with = "decimal")]
        amount: Amount,
    },
    Unstake {
        caller: Principal,
        operator: Principal,
        #[serde(with = "decimal")]
        amount: Amount,
    },
    AddVotes {
        caller: Principal,
        #[serde(with = "decimal")]
        amount: Amount,
    },
    RemoveVotes {
        caller: Principal,
        #[serde(with = "decimal")]
        amount: Amount,
    },
    OpenExpired {
        caller: Principal,
    },
    Withdraw {
        caller: Principal,
        #[serde(with = "decimal")]
        amount: Amount,
    },
    Deposit {
        caller: Principal,
        #[serde(with = "decimal")]
        amount: Amount,
    },
    Redeem {
        caller: Principal,
    },
    Reward {
        caller: Principal,
        account: Principal,
        #[serde(with = "decimal")]
        amount: Amount,
        #[serde(with = "decimal")]
        gas: Amount,
        #[serde(default)]
        redeem: bool,
    },
    SetLockSize {
        caller: Principal,
        #[serde(with = "decimal")]
        amount: Amount,
    },
    SetDuration {
        caller: Principal,
        kind: DurationKind,
        seconds: u64,
    },
    Pause {
        caller: Principal,
    },
    Unpause {
        caller: Principal,
    },
    AuthorizeUpgrade {
        caller: Principal,
        version: u64,
    },
    EmergencyWithdraw {
        caller: Principal,
    },
    /// Moves the replay clock forward.
    Advance {
        seconds: u64,
    },
    /// Credits a gateway balance mid-script.
    Mint(Mint),
    /// Grants a capability directly at the authority.
    Grant {
        capability: Capability,
        principal: Principal,
    },
    /// Makes the gateway refuse (or accept again) transfers drawn from `holder`.
    Refuse {
        holder: Principal,
        #[serde(default = "default_true")]
        refused: bool,
    },
}

fn default_true() -> bool {
    true
}

impl Step {
    /// Operation name used in logs, metrics and the report.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Lock { .. } => "lock",
            Step::Unlock { .. } => "unlock",
            Step::Stake { .. } => "stake",
            Step::Unstake { .. } => "unstake",
            Step::AddVotes { .. } => "add_votes",
            Step::RemoveVotes { .. } => "remove_votes",
            Step::OpenExpired { .. } => "open_expired",
            Step::Withdraw { .. } => "withdraw",
            Step::Deposit { .. } => "deposit",
            Step::Redeem { .. } => "redeem",
            Step::Reward { .. } => "reward",
            Step::SetLockSize { .. } => "set_lock_size",
            Step::SetDuration { .. } => "set_duration",
            Step::Pause { .. } => "pause",
            Step::Unpause { .. } => "unpause",
            Step::AuthorizeUpgrade { .. } => "authorize_upgrade",
            Step::EmergencyWithdraw { .. } => "emergency_withdraw",
            Step::Advance { .. } => "advance",
            Step::Mint(_) => "mint",
            Step::Grant { .. } => "grant",
            Step::Refuse { .. } => "refuse",
        }
    }

    /// `false` for replay setup steps that never reach the ledger.
    pub fn is_ledger_call(&self) -> bool {
        !matches!(
            self,
            Step::Advance { .. } | Step::Mint(_) | Step::Grant { .. } | Step::Refuse { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Reads, parses and validates a ledger configuration file.
pub fn load_config(path: &Path) -> Result<LedgerConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = LedgerConfig::from_json(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Reads and parses a replay script.
pub fn load_script(path: &Path) -> Result<Script> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse script {}", path.display()))
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What happened to one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub ok: bool,
    /// Amount returned by `unlock`, `open_expired`, `redeem` and
    /// `emergency_withdraw`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

/// Final state after a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub succeeded: usize,
    pub failed: usize,
    pub final_time: Timestamp,
    /// Sum of every bucket of every account.
    #[serde(with = "decimal")]
    pub total_committed: Amount,
    pub steps: Vec<StepOutcome>,
    pub accounts: BTreeMap<Principal, HodlerAccount>,
    /// Gateway balances of every principal the script touched.
    pub gateway_balances: BTreeMap<Principal, String>,
    /// Who held each capability when the replay ended.
    pub capabilities: BTreeMap<Capability, Vec<Principal>>,
    pub events: Vec<EventRecord>,
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// A fresh ledger wired to in-memory collaborators.
pub struct Replay {
    ledger: HodlerLedger,
    gateway: Arc<InMemoryGateway>,
    authority: Arc<InMemoryAuthority>,
    clock: Arc<ManualClock>,
    metrics: Option<LedgerMetrics>,
    touched: BTreeSet<Principal>,
}

impl Replay {
    /// Builds the collaborators, applies the script's mints and initializes
    /// the ledger with `config`.
    pub fn new(
        config: LedgerConfig,
        script: &Script,
        start_time: Timestamp,
        metrics: Option<LedgerMetrics>,
    ) -> Result<Self> {
        let gateway = Arc::new(InMemoryGateway::new(config.custody.clone()));
        let authority = Arc::new(InMemoryAuthority::new());
        let clock = Arc::new(ManualClock::new(start_time));

        let mut touched = BTreeSet::new();
        for mint in &script.mints {
            gateway.mint(&mint.holder, mint.amount);
            touched.insert(mint.holder.clone());
        }
        touched.extend([
            gateway.custody().clone(),
            config.controller.clone(),
            config.rewards_pool.clone(),
        ]);

        let ledger = HodlerLedger::new(gateway.clone(), authority.clone(), clock.clone());
        ledger
            .initialize(&script.initializer, config)
            .context("ledger initialization failed")?;
        tracing::info!(initializer = %script.initializer, "ledger initialized");

        Ok(Self {
            ledger,
            gateway,
            authority,
            clock,
            metrics,
            touched,
        })
    }

    /// The ledger under replay.
    pub fn ledger(&self) -> &HodlerLedger {
        &self.ledger
    }

    /// Applies a single step.
    pub fn apply(&mut self, step: &Step) -> Result<Option<Amount>, LedgerError> {
        let ledger = &self.ledger;
        match step {
            Step::Lock {
                caller,
                fingerprint,
            } => ledger.lock(caller, fingerprint).map(|_| None),
            Step::Unlock {
                caller,
                fingerprint,
            } => ledger.unlock(caller, fingerprint).map(Some),
            Step::Stake {
                caller,
                operator,
                amount,
            } => ledger.stake(caller, operator, *amount).map(|_| None),
            Step::Unstake {
                caller,
                operator,
                amount,
            } => ledger.unstake(caller, operator, *amount).map(|_| None),
            Step::AddVotes { caller, amount } => ledger.add_votes(caller, *amount).map(|_| None),
            Step::RemoveVotes { caller, amount } => {
                ledger.remove_votes(caller, *amount).map(|_| None)
            }
            Step::OpenExpired { caller } => ledger.open_expired(caller).map(Some),
            Step::Withdraw { caller, amount } => ledger.withdraw(caller, *amount).map(|_| None),
            Step::Deposit { caller, amount } => ledger.deposit(caller, *amount).map(|_| None),
            Step::Redeem { caller } => ledger.redeem(caller).map(Some),
            Step::Reward {
                caller,
                account,
                amount,
                gas,
                redeem,
            } => ledger
                .reward(caller, account, *amount, *gas, *redeem)
                .map(|_| None),
            Step::SetLockSize { caller, amount } => {
                ledger.set_lock_size(caller, *amount).map(|_| None)
            }
            Step::SetDuration {
                caller,
                kind,
                seconds,
            } => ledger.set_duration(caller, *kind, *seconds).map(|_| None),
            Step::Pause { caller } => ledger.pause(caller).map(|_| None),
            Step::Unpause { caller } => ledger.unpause(caller).map(|_| None),
            Step::AuthorizeUpgrade { caller, version } => {
                ledger.authorize_upgrade(caller, *version).map(|_| None)
            }
            Step::EmergencyWithdraw { caller } => ledger.emergency_withdraw(caller).map(Some),
            Step::Advance { seconds } => {
                let now = self.clock.advance(*seconds);
                tracing::debug!(now, "clock advanced");
                Ok(None)
            }
            Step::Mint(mint) => {
                self.gateway.mint(&mint.holder, mint.amount);
                self.touched.insert(mint.holder.clone());
                Ok(None)
            }
            Step::Grant {
                capability,
                principal,
            } => {
                self.authority.grant(*capability, principal);
                Ok(None)
            }
            Step::Refuse { holder, refused } => {
                self.gateway.set_refused(holder, *refused);
                Ok(None)
            }
        }
    }

    /// Applies every step and builds the report.
    ///
    /// With `fail_fast`, the first rejected step aborts the replay with an
    /// error naming it. Otherwise rejections are recorded and the replay
    /// moves on, matching how independent callers would behave.
    pub fn run(mut self, steps: &[Step], fail_fast: bool) -> Result<ReplayReport> {
        let mut outcomes = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            let op = step.name();
            tracing::debug!(index, op, "applying step");
            let result = self.apply(step);

            if let Some(metrics) = self.metrics.as_ref().filter(|_| step.is_ledger_call()) {
                metrics.observe(op, &result.as_ref().map(|_| ()).map_err(|e| e.clone()));
            }

            let outcome = match result {
                Ok(returned) => StepOutcome {
                    index,
                    op,
                    ok: true,
                    returned: returned.map(|amount| amount.to_string()),
                    error: None,
                    error_kind: None,
                },
                Err(err) => {
                    if fail_fast {
                        return Err(anyhow::Error::new(err)
                            .context(format!("step {} ({}) rejected", index, op)));
                    }
                    StepOutcome {
                        index,
                        op,
                        ok: false,
                        returned: None,
                        error_kind: Some(err.kind().to_string()),
                        error: Some(err.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        self.finish(outcomes)
    }

    fn finish(self, steps: Vec<StepOutcome>) -> Result<ReplayReport> {
        let snapshot = self.ledger.snapshot();
        let total_committed = self
            .ledger
            .total_committed()
            .context("committed total overflowed")?;
        let events = snapshot.events.records().to_vec();

        if let Some(metrics) = &self.metrics {
            metrics.observe_events(&events);
            metrics.set_custodied(total_committed);
        }

        let mut touched = self.touched;
        touched.extend(snapshot.accounts.keys().cloned());
        let gateway_balances = touched
            .into_iter()
            .map(|holder| {
                let balance = self.gateway.balance_of(&holder).to_string();
                (holder, balance)
            })
            .collect();

        let capabilities = Capability::ALL
            .into_iter()
            .map(|capability| (capability, self.authority.holders(capability)))
            .collect();

        let succeeded = steps.iter().filter(|s| s.ok).count();
        Ok(ReplayReport {
            succeeded,
            failed: steps.len() - succeeded,
            final_time: self.clock.now(),
            total_committed,
            steps,
            accounts: snapshot.accounts,
            gateway_balances,
            capabilities,
            events,
        })
    }
}
