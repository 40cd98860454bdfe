//! Integration tests for the hodler ledger.
//!
//! These tests drive the ledger through its public entry points with the
//! in-memory gateway, authority and a manual clock, covering the full
//! lock → unlock → sweep cycle, stake and vote flows, withdrawals, gas
//! deposits and reward settlement.

use std::sync::Arc;

use hodler_ledger::config::{BUFFER_WINDOW, ONE_DAY};
use hodler_ledger::{
    Amount, Fingerprint, GatewayCall, HodlerLedger, InMemoryAuthority, InMemoryGateway,
    LedgerConfig, LedgerError, LedgerEvent, LedgerParams, ManualClock, Principal, ValueGateway,
};

const START: u64 = 1_700_000_000;

struct Harness {
    ledger: HodlerLedger,
    gateway: Arc<InMemoryGateway>,
    clock: Arc<ManualClock>,
}

fn p(name: &str) -> Principal {
    Principal::from(name)
}

fn amt(n: u64) -> Amount {
    Amount::from(n)
}

/// Helper: an initialized ledger with lock size 100 and the default durations.
fn harness() -> Harness {
    let gateway = Arc::new(InMemoryGateway::new(p("ledger")));
    let clock = Arc::new(ManualClock::new(START));
    let ledger = HodlerLedger::new(
        gateway.clone(),
        Arc::new(InMemoryAuthority::new()),
        clock.clone(),
    );
    ledger
        .initialize(
            &p("deployer"),
            LedgerConfig {
                token: p("token"),
                custody: p("ledger"),
                controller: p("ctrl"),
                rewards_pool: p("pool"),
                params: LedgerParams {
                    lock_size: amt(100),
                    ..LedgerParams::default()
                },
            },
        )
        .unwrap();
    Harness {
        ledger,
        gateway,
        clock,
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn initialize_emits_configuration() {
    let h = harness();
    let events = h.ledger.events();
    assert_eq!(events.len(), 1);
    match &events[0].event {
        LedgerEvent::Initialized {
            token,
            controller,
            lock_size,
            ..
        } => {
            assert_eq!(token, &p("token"));
            assert_eq!(controller, &p("ctrl"));
            assert_eq!(*lock_size, amt(100));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn lock_unlock_sweep_round_trip() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&alice, amt(100));

    // 1. Lock: nothing available, so the full lock size comes from the gateway.
    h.ledger.lock(&alice, "AAAA").unwrap();
    assert_eq!(
        h.gateway.calls(),
        vec![GatewayCall::TransferFrom {
            from: alice.clone(),
            to: p("ledger"),
            amount: amt(100),
        }]
    );
    let fingerprint = Fingerprint::new("AAAA").unwrap();
    assert_eq!(h.ledger.account(&alice).lock_of(&fingerprint), amt(100));

    // 2. Unlock: lock cleared into a vault.
    let lock_duration = h.ledger.params().lock_duration;
    assert_eq!(h.ledger.unlock(&alice, "AAAA").unwrap(), amt(100));
    let account = h.ledger.account(&alice);
    assert!(account.locks.is_empty());
    assert_eq!(account.vaults.len(), 1);
    assert_eq!(account.vaults[0].amount, amt(100));
    assert_eq!(account.vaults[0].available_at, START + lock_duration);

    // 3. Too early: nothing matures.
    h.clock.advance(lock_duration);
    assert!(h.ledger.open_expired(&alice).unwrap().is_zero());

    // 4. Past duration + buffer: the vault opens.
    h.clock.advance(BUFFER_WINDOW + 1);
    assert_eq!(h.ledger.open_expired(&alice).unwrap(), amt(100));
    let account = h.ledger.account(&alice);
    assert_eq!(account.available, amt(100));
    assert!(account.vaults[0].is_cleared());
    assert_eq!(account.vaults.len(), 1);

    // 5. Withdraw everything.
    h.ledger.withdraw(&alice, amt(100)).unwrap();
    assert_eq!(h.gateway.balance_of(&alice), amt(100));
    assert!(h.gateway.balance_of(&p("ledger")).is_zero());
}

#[test]
fn vault_boundary_is_strict() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&alice, amt(100));
    h.ledger.lock(&alice, "AAAA").unwrap();
    h.ledger.unlock(&alice, "AAAA").unwrap();
    let available_at = h.ledger.account(&alice).vaults[0].available_at;

    // available_at == now - buffer: not sweepable.
    h.clock.set(available_at + BUFFER_WINDOW);
    assert!(h.ledger.open_expired(&alice).unwrap().is_zero());

    // available_at == now - buffer - 1: sweepable.
    h.clock.set(available_at + BUFFER_WINDOW + 1);
    assert_eq!(h.ledger.open_expired(&alice).unwrap(), amt(100));
}

#[test]
fn repeated_locks_accumulate() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&alice, amt(300));
    for _ in 0..3 {
        h.ledger.lock(&alice, "AAAA").unwrap();
    }
    let fingerprint = Fingerprint::new("AAAA").unwrap();
    assert_eq!(h.ledger.account(&alice).lock_of(&fingerprint), amt(300));
}

#[test]
fn sweep_only_releases_matured_vaults() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&alice, amt(150));
    h.ledger.add_votes(&alice, amt(50)).unwrap();
    h.ledger.stake(&alice, &p("op"), amt(100)).unwrap();

    h.ledger.remove_votes(&alice, amt(50)).unwrap();
    h.ledger.unstake(&alice, &p("op"), amt(100)).unwrap();

    // Governance (3 days) matures before stake (14 days).
    h.clock.advance(3 * ONE_DAY + BUFFER_WINDOW + 1);
    assert_eq!(h.ledger.open_expired(&alice).unwrap(), amt(50));
    let account = h.ledger.account(&alice);
    assert_eq!(account.available, amt(50));
    assert!(account.vaults[0].is_cleared());
    assert_eq!(account.vaults[1].amount, amt(100));
}

// ---------------------------------------------------------------------------
// Error Cases
// ---------------------------------------------------------------------------

#[test]
fn unstake_more_than_staked_leaves_state_unchanged() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&alice, amt(50));
    h.ledger.stake(&alice, &p("op"), amt(50)).unwrap();
    let before = h.ledger.snapshot();

    let result = h.ledger.unstake(&alice, &p("op"), amt(51));
    assert_eq!(
        result,
        Err(LedgerError::InsufficientBalance {
            requested: amt(51),
            available: amt(50),
        })
    );
    assert_eq!(h.ledger.snapshot(), before);
}

#[test]
fn withdraw_more_than_available_is_rejected() {
    let h = harness();
    let result = h.ledger.withdraw(&p("alice"), amt(1));
    assert!(matches!(
        result,
        Err(LedgerError::InsufficientBalance { .. })
    ));
    assert!(h.gateway.calls().is_empty());
}

#[test]
fn declined_withdraw_keeps_available() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&p("pool"), amt(40));
    h.ledger
        .reward(&p("ctrl"), &alice, amt(40), amt(0), false)
        .unwrap();
    h.gateway.set_refused(&p("ledger"), true);

    let result = h.ledger.withdraw(&alice, amt(40));
    assert!(matches!(result, Err(LedgerError::TransferDeclined(_))));
    assert_eq!(h.ledger.account(&alice).available, amt(40));
}

#[test]
fn stake_with_declined_shortfall_rolls_back_available() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&p("pool"), amt(10));
    h.ledger
        .reward(&p("ctrl"), &alice, amt(10), amt(0), false)
        .unwrap();
    let before = h.ledger.account(&alice);

    // 10 available, 15 short, alice has nothing at the gateway.
    let result = h.ledger.stake(&alice, &p("op"), amt(25));
    assert!(matches!(result, Err(LedgerError::TransferDeclined(_))));
    assert_eq!(h.ledger.account(&alice), before);
}

// ---------------------------------------------------------------------------
// Gas & Rewards
// ---------------------------------------------------------------------------

#[test]
fn deposit_credits_gas_and_forwards_to_controller() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&alice, amt(10));
    h.ledger.deposit(&alice, amt(10)).unwrap();

    assert_eq!(h.ledger.account(&alice).gas, amt(10));
    assert_eq!(h.gateway.balance_of(&p("ctrl")), amt(10));
    assert!(h.gateway.balance_of(&p("ledger")).is_zero());
    // Gas is not part of the conserved custody total.
    assert!(h.ledger.account(&alice).total_committed().unwrap().is_zero());
}

#[test]
fn every_deposit_increases_gas() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&alice, amt(6));
    for expected in 1..=3u64 {
        h.ledger.deposit(&alice, amt(expected)).unwrap();
    }
    assert_eq!(h.ledger.account(&alice).gas, amt(6));
}

#[test]
fn reward_without_redeem_credits_available() {
    let h = harness();
    let acct = p("acct");
    h.gateway.mint(&acct, amt(10));
    h.ledger.deposit(&acct, amt(10)).unwrap();
    h.gateway.mint(&p("pool"), amt(30));

    h.ledger
        .reward(&p("ctrl"), &acct, amt(30), amt(5), false)
        .unwrap();

    let account = h.ledger.account(&acct);
    assert_eq!(account.gas, amt(5));
    assert_eq!(account.available, amt(30));
    assert_eq!(h.gateway.balance_of(&p("ledger")), amt(30));
    assert!(h.gateway.balance_of(&p("pool")).is_zero());
}

#[test]
fn reward_with_redeem_pays_account_directly() {
    let h = harness();
    let acct = p("acct");
    h.gateway.mint(&acct, amt(10));
    h.ledger.deposit(&acct, amt(10)).unwrap();
    h.gateway.mint(&p("pool"), amt(30));

    h.ledger
        .reward(&p("ctrl"), &acct, amt(30), amt(10), true)
        .unwrap();

    let account = h.ledger.account(&acct);
    assert!(account.gas.is_zero());
    assert!(account.available.is_zero());
    assert_eq!(h.gateway.balance_of(&acct), amt(30));
}

#[test]
fn reward_over_gas_budget_is_rejected() {
    let h = harness();
    let acct = p("acct");
    let result = h.ledger.reward(&p("ctrl"), &acct, amt(30), amt(1), false);
    assert_eq!(
        result,
        Err(LedgerError::InsufficientGasBudget {
            estimate: amt(1),
            budget: amt(0),
        })
    );
}

#[test]
fn declined_reward_rolls_back_gas_charge() {
    let h = harness();
    let acct = p("acct");
    h.gateway.mint(&acct, amt(10));
    h.ledger.deposit(&acct, amt(10)).unwrap();

    // The pool is empty.
    let result = h.ledger.reward(&p("ctrl"), &acct, amt(30), amt(5), false);
    assert!(matches!(result, Err(LedgerError::TransferDeclined(_))));
    let account = h.ledger.account(&acct);
    assert_eq!(account.gas, amt(10));
    assert!(account.available.is_zero());
}

#[test]
fn redeem_reports_gas_without_moving_value() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&alice, amt(7));
    h.ledger.deposit(&alice, amt(7)).unwrap();
    let calls = h.gateway.calls().len();

    assert_eq!(h.ledger.redeem(&alice).unwrap(), amt(7));
    assert_eq!(h.gateway.calls().len(), calls);
    let last = h.ledger.events().pop().unwrap();
    assert_eq!(
        last.event,
        LedgerEvent::RewardsUpdateRequested {
            account: alice,
            gas: amt(7),
        }
    );
}

// ---------------------------------------------------------------------------
// Numeric Ceiling
// ---------------------------------------------------------------------------

#[test]
fn votes_past_ceiling_overflow_without_side_effects() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&alice, Amount::max_value());
    h.ledger.add_votes(&alice, Amount::max_value()).unwrap();
    h.gateway.mint(&alice, amt(1));
    let before = h.ledger.snapshot();
    let calls = h.gateway.calls().len();

    assert_eq!(
        h.ledger.add_votes(&alice, amt(1)),
        Err(LedgerError::ArithmeticOverflow)
    );
    assert_eq!(h.ledger.snapshot(), before);
    assert_eq!(h.gateway.calls().len(), calls);
    assert_eq!(h.gateway.balance_of(&alice), amt(1));
}

#[test]
fn reward_into_full_available_overflows_without_side_effects() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&p("pool"), Amount::max_value());
    h.ledger
        .reward(&p("ctrl"), &alice, Amount::max_value(), amt(0), false)
        .unwrap();
    assert_eq!(h.ledger.account(&alice).available, Amount::max_value());
    h.gateway.mint(&p("pool"), amt(1));
    let before = h.ledger.snapshot();

    assert_eq!(
        h.ledger.reward(&p("ctrl"), &alice, amt(1), amt(0), false),
        Err(LedgerError::ArithmeticOverflow)
    );
    assert_eq!(h.ledger.snapshot(), before);
    assert_eq!(h.gateway.balance_of(&p("pool")), amt(1));
}
