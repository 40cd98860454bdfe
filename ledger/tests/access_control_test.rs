//! Integration tests for capability gating, operational status and the
//! controller-managed parameters.

use std::sync::Arc;

use hodler_ledger::config::{BUFFER_WINDOW, ONE_DAY};
use hodler_ledger::{
    Amount, Capability, CapabilityAuthority, DurationKind, HodlerLedger, InMemoryAuthority,
    InMemoryGateway, LedgerConfig, LedgerError, LedgerEvent, LedgerParams, ManualClock,
    OperationalStatus, Parameter, Principal, ValueGateway,
};

struct Harness {
    ledger: HodlerLedger,
    gateway: Arc<InMemoryGateway>,
    authority: Arc<InMemoryAuthority>,
}

fn p(name: &str) -> Principal {
    Principal::from(name)
}

fn amt(n: u64) -> Amount {
    Amount::from(n)
}

fn harness() -> Harness {
    let gateway = Arc::new(InMemoryGateway::new(p("ledger")));
    let authority = Arc::new(InMemoryAuthority::new());
    let ledger = HodlerLedger::new(
        gateway.clone(),
        authority.clone(),
        Arc::new(ManualClock::new(1_700_000_000)),
    );
    ledger
        .initialize(
            &p("deployer"),
            LedgerConfig {
                token: p("token"),
                custody: p("ledger"),
                controller: p("ctrl"),
                rewards_pool: p("pool"),
                params: LedgerParams::default(),
            },
        )
        .unwrap();
    Harness {
        ledger,
        gateway,
        authority,
    }
}

#[test]
fn initialize_grants_expected_capabilities() {
    let h = harness();
    let deployer = p("deployer");
    assert!(h.authority.has_capability(Capability::Admin, &deployer));
    assert!(h.authority.has_capability(Capability::Pauser, &deployer));
    assert!(h.authority.has_capability(Capability::Upgrader, &deployer));
    assert!(!h.authority.has_capability(Capability::Controller, &deployer));
    assert!(h.authority.has_capability(Capability::Controller, &p("ctrl")));
}

#[test]
fn non_controller_cannot_set_lock_size() {
    let h = harness();
    let events_before = h.ledger.events().len();

    let result = h.ledger.set_lock_size(&p("mallory"), amt(1));
    assert_eq!(
        result,
        Err(LedgerError::CapabilityDenied {
            capability: Capability::Controller,
            principal: p("mallory"),
        })
    );
    assert_eq!(h.ledger.params().lock_size, LedgerParams::default().lock_size);
    assert_eq!(h.ledger.events().len(), events_before);
}

#[test]
fn parameter_change_emits_old_new_and_actor() {
    let h = harness();
    h.ledger.set_lock_size(&p("ctrl"), amt(250)).unwrap();
    assert_eq!(h.ledger.params().lock_size, amt(250));

    let last = h.ledger.events().pop().unwrap();
    assert_eq!(
        last.event,
        LedgerEvent::ParameterChanged {
            parameter: Parameter::LockSize,
            old: LedgerParams::default().lock_size,
            new: amt(250),
            actor: p("ctrl"),
        }
    );
}

#[test]
fn zero_lock_size_is_rejected() {
    let h = harness();
    assert_eq!(
        h.ledger.set_lock_size(&p("ctrl"), Amount::zero()),
        Err(LedgerError::InvalidLockSize)
    );
}

#[test]
fn duration_boundary() {
    let h = harness();
    let ctrl = p("ctrl");
    let minimum = BUFFER_WINDOW + ONE_DAY;

    h.ledger.set_lock_duration(&ctrl, minimum).unwrap();
    h.ledger.set_stake_duration(&ctrl, minimum).unwrap();
    h.ledger.set_governance_duration(&ctrl, minimum).unwrap();
    assert_eq!(h.ledger.params().lock_duration, minimum);
    assert_eq!(h.ledger.params().stake_duration, minimum);
    assert_eq!(h.ledger.params().governance_duration, minimum);

    for kind in [DurationKind::Lock, DurationKind::Stake, DurationKind::Governance] {
        assert!(matches!(
            h.ledger.set_duration(&ctrl, kind, minimum - 1),
            Err(LedgerError::InvalidDuration { .. })
        ));
    }
    assert_eq!(h.ledger.params().lock_duration, minimum);
}

#[test]
fn new_duration_applies_to_later_vaults_only() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&alice, amt(200));
    h.ledger.lock(&alice, "one").unwrap();
    h.ledger.lock(&alice, "two").unwrap();
    h.ledger.unlock(&alice, "one").unwrap();

    h.ledger.set_lock_duration(&p("ctrl"), 30 * ONE_DAY).unwrap();
    h.ledger.unlock(&alice, "two").unwrap();

    let vaults = h.ledger.account(&alice).vaults;
    assert_eq!(vaults[1].available_at - vaults[0].available_at, 23 * ONE_DAY);
}

#[test]
fn revoked_controller_loses_access() {
    let h = harness();
    h.authority.revoke(Capability::Controller, &p("ctrl"));
    assert!(matches!(
        h.ledger.reward(&p("ctrl"), &p("alice"), amt(0), amt(0), false),
        Err(LedgerError::CapabilityDenied { .. })
    ));
}

#[test]
fn only_pauser_can_pause() {
    let h = harness();
    assert!(matches!(
        h.ledger.pause(&p("ctrl")),
        Err(LedgerError::CapabilityDenied { .. })
    ));
    h.ledger.pause(&p("deployer")).unwrap();
    assert_eq!(h.ledger.status(), OperationalStatus::Suspended);
}

#[test]
fn emergency_withdraw_requires_suspension() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&alice, amt(100));
    h.ledger.lock(&alice, "AAAA").unwrap();

    assert_eq!(
        h.ledger.emergency_withdraw(&p("deployer")),
        Err(LedgerError::NotSuspended)
    );

    h.ledger.pause(&p("deployer")).unwrap();
    assert!(matches!(
        h.ledger.emergency_withdraw(&p("ctrl")),
        Err(LedgerError::CapabilityDenied { .. })
    ));

    let swept = h.ledger.emergency_withdraw(&p("deployer")).unwrap();
    assert_eq!(swept, amt(100));
    assert_eq!(h.gateway.balance_of(&p("deployer")), amt(100));
    assert!(h.gateway.balance_of(&p("ledger")).is_zero());
}

#[test]
fn privileged_operations_ignore_suspension() {
    let h = harness();
    h.ledger.pause(&p("deployer")).unwrap();
    h.ledger.set_stake_duration(&p("ctrl"), 2 * ONE_DAY).unwrap();
    h.ledger.authorize_upgrade(&p("deployer"), 2).unwrap();
    assert_eq!(h.ledger.version(), 2);
    assert!(matches!(
        h.ledger.withdraw(&p("alice"), amt(1)),
        Err(LedgerError::LedgerSuspended)
    ));
}

#[test]
fn suspended_ledger_rejects_deposits_and_withdrawals() {
    let h = harness();
    let alice = p("alice");
    h.gateway.mint(&alice, amt(50));
    h.ledger.deposit(&alice, amt(20)).unwrap();
    let calls = h.gateway.calls().len();
    h.ledger.pause(&p("deployer")).unwrap();

    assert_eq!(
        h.ledger.deposit(&alice, amt(10)),
        Err(LedgerError::LedgerSuspended)
    );
    assert_eq!(
        h.ledger.withdraw(&alice, amt(1)),
        Err(LedgerError::LedgerSuspended)
    );
    assert_eq!(h.ledger.account(&alice).gas, amt(20));
    assert_eq!(h.gateway.calls().len(), calls);
    assert_eq!(h.gateway.balance_of(&alice), amt(30));
}
