//! # Value Transfer Gateway
//!
//! The ledger does not hold tokens itself. Deposits, withdrawals and reward
//! payouts are requested from a [`ValueGateway`], and every call site
//! treats a decline as a failure of the whole enclosing operation.
//!
//! [`InMemoryGateway`] keeps balances in a map, records every call it
//! receives, and can be told to decline transfers from specific holders.
//! An optional hook runs before each transfer, which lets tests play the
//! part of a hostile token calling back into the ledger.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Amount, Principal};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why the gateway refused a movement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The source does not hold enough.
    #[error("insufficient funds: {holder} holds {balance}, requested {requested}")]
    InsufficientFunds {
        /// Source of the transfer.
        holder: Principal,
        /// Its balance at the gateway.
        balance: Amount,
        /// Amount requested.
        requested: Amount,
    },

    /// The gateway refused for its own reasons (frozen account, paused token).
    #[error("transfer from {0} refused")]
    Refused(Principal),

    /// Crediting the recipient would overflow.
    #[error("recipient balance overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Moves the underlying asset into and out of the ledger's custody.
pub trait ValueGateway: Send + Sync {
    /// Moves `amount` from `from` to `to`.
    fn transfer_from(
        &self,
        from: &Principal,
        to: &Principal,
        amount: Amount,
    ) -> Result<(), GatewayError>;

    /// Moves `amount` out of the ledger's custody to `to`.
    fn transfer(&self, to: &Principal, amount: Amount) -> Result<(), GatewayError>;

    /// Balance held by `holder`.
    fn balance_of(&self, holder: &Principal) -> Amount;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// A call the gateway received, successful or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum GatewayCall {
    /// `transfer_from(from, to, amount)`.
    TransferFrom {
        from: Principal,
        to: Principal,
        amount: Amount,
    },
    /// `transfer(to, amount)` out of custody.
    Transfer { to: Principal, amount: Amount },
}

type TransferHook = Box<dyn Fn(&GatewayCall) + Send + Sync>;

#[derive(Default)]
struct Book {
    balances: HashMap<Principal, Amount>,
    refused: HashSet<Principal>,
    calls: Vec<GatewayCall>,
}

/// Gateway backed by a balance map.
pub struct InMemoryGateway {
    custody: Principal,
    book: Mutex<Book>,
    hook: Mutex<Option<TransferHook>>,
}

impl InMemoryGateway {
    /// Creates a gateway whose `transfer` calls draw from `custody`.
    pub fn new(custody: Principal) -> Self {
        Self {
            custody,
            book: Mutex::new(Book::default()),
            hook: Mutex::new(None),
        }
    }

    /// The address `transfer` draws from.
    pub fn custody(&self) -> &Principal {
        &self.custody
    }

    /// Credits `holder` out of thin air. Test and replay setup only.
    pub fn mint(&self, holder: &Principal, amount: Amount) {
        let mut book = self.book.lock();
        let balance = book.balances.entry(holder.clone()).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Makes every transfer sourced from `holder` fail (or succeed again).
    pub fn set_refused(&self, holder: &Principal, refused: bool) {
        let mut book = self.book.lock();
        if refused {
            book.refused.insert(holder.clone());
        } else {
            book.refused.remove(holder);
        }
    }

    /// Installs a hook that runs before every transfer attempt.
    pub fn set_hook(&self, hook: impl Fn(&GatewayCall) + Send + Sync + 'static) {
        *self.hook.lock() = Some(Box::new(hook));
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.book.lock().calls.clone()
    }

    fn run_hook(&self, call: &GatewayCall) {
        if let Some(hook) = self.hook.lock().as_ref() {
            hook(call);
        }
    }

    fn apply(&self, call: GatewayCall) -> Result<(), GatewayError> {
        // The hook runs without the book locked so it may call back in.
        self.run_hook(&call);

        let mut book = self.book.lock();
        book.calls.push(call.clone());

        let (from, to, amount) = match call {
            GatewayCall::TransferFrom { from, to, amount } => (from, to, amount),
            GatewayCall::Transfer { to, amount } => (self.custody.clone(), to, amount),
        };

        if book.refused.contains(&from) {
            return Err(GatewayError::Refused(from));
        }

        let balance = book.balances.get(&from).copied().unwrap_or_default();
        if balance < amount {
            return Err(GatewayError::InsufficientFunds {
                holder: from,
                balance,
                requested: amount,
            });
        }

        let credited = book
            .balances
            .get(&to)
            .copied()
            .unwrap_or_default()
            .checked_add(amount)
            .ok_or(GatewayError::Overflow)?;

        book.balances.insert(from, balance - amount);
        book.balances.insert(to, credited);
        Ok(())
    }
}

impl ValueGateway for InMemoryGateway {
    fn transfer_from(
        &self,
        from: &Principal,
        to: &Principal,
        amount: Amount,
    ) -> Result<(), GatewayError> {
        self.apply(GatewayCall::TransferFrom {
            from: from.clone(),
            to: to.clone(),
            amount,
        })
    }

    fn transfer(&self, to: &Principal, amount: Amount) -> Result<(), GatewayError> {
        self.apply(GatewayCall::Transfer {
            to: to.clone(),
            amount,
        })
    }

    fn balance_of(&self, holder: &Principal) -> Amount {
        self.book
            .lock()
            .balances
            .get(holder)
            .copied()
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for InMemoryGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let book = self.book.lock();
        f.debug_struct("InMemoryGateway")
            .field("custody", &self.custody)
            .field("holders", &book.balances.len())
            .field("calls", &book.calls.len())
            .finish()
    }
}
