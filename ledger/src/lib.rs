// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Hodler Ledger
//!
//! The accounting engine behind a token-custody service. For every account
//! it tracks free balance, collateral locked against named resources,
//! collateral staked with delegated operators, voting weight, a schedule of
//! time-locked releases ("vaults") and a prepaid gas budget, and it decides
//! which movements between those buckets are legal.
//!
//! - **ledger** — [`HodlerLedger`], the state machine and its entry points.
//! - **types** — accounts, vaults, fingerprints, principals, the draw policy.
//! - **config** — time constants and the controller-managed parameters.
//! - **events** — the audit trail appended by every committed operation.
//! - **gateway** — the value transfer seam plus an in-memory implementation.
//! - **authority** — the capability seam plus an in-memory implementation.
//! - **clock** — injectable time source.
//!
//! ## Design Principles
//!
//! 1. Amounts are 256-bit and every mutation is checked. Wrapping
//!    arithmetic and custody do not mix.
//! 2. All-or-nothing: an operation either commits every state change and
//!    every external transfer it triggered, or none of them.
//! 3. Free balance is always spent before asking the gateway for more, and
//!    the same unit is never charged twice.
//! 4. Role membership, token movements and time are collaborators behind
//!    traits, so the ledger can be tested without any of them being real.

pub mod authority;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
mod guard;
pub mod ledger;
pub mod types;

pub use authority::{CapabilityAuthority, InMemoryAuthority};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DurationKind, LedgerConfig, LedgerParams, Parameter};
pub use error::{ErrorKind, LedgerError};
pub use events::{EventRecord, LedgerEvent};
pub use gateway::{GatewayCall, GatewayError, InMemoryGateway, ValueGateway};
pub use ledger::{HodlerLedger, LedgerState};
pub use types::{
    Amount, Capability, Draw, Fingerprint, HodlerAccount, OperationalStatus, Principal,
    Timestamp, Vault,
};
