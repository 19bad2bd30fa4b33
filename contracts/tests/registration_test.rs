//! Integration tests for the registration lifecycle.
//!
//! Every test drives a bootstrapped `NameService` the way a client would:
//! approve the controller, commit, wait, register, renew. Assertions look at
//! the registry, registrar, wrapper and token together so that a failure
//! half-way through an operation would show up as a mismatch.

use fns_contracts::base_registrar::RegistrarError;
use fns_contracts::controller::{ControllerError, RegistrationRequest};
use fns_contracts::events::Event;
use fns_contracts::fuses::Fuses;
use fns_contracts::name_wrapper::WrapperError;
use fns_contracts::payment_token::TokenError;
use fns_contracts::resolver::{RecordCall, Resolver};
use fns_contracts::root::RootError;
use fns_contracts::{NameService, ServiceError};
use fns_protocol::config::{ServiceConfig, DAY, GRACE_PERIOD};
use fns_protocol::name::{labelhash, namehash};
use fns_protocol::{Address, Hash32, LabelHash};

const T0: u64 = 1_700_000_000;
const FUNDS: u128 = 1_000_000_000_000_000_000_000_000;

fn admin() -> Address {
    Address::derive("admin")
}

fn alice() -> Address {
    Address::derive("alice")
}

fn bob() -> Address {
    Address::derive("bob")
}

/// Helper: a service with the `[0, 0, 4, 2, 1]` rate table and a unit
/// reference price, with alice and bob funded and the controller approved.
fn service() -> NameService {
    service_with_rates(vec![0, 0, 4, 2, 1])
}

fn service_with_rates(rent_prices: Vec<u128>) -> NameService {
    let mut config = ServiceConfig {
        rent_prices,
        ..ServiceConfig::default()
    };
    config.genesis_balances.insert(alice(), FUNDS);
    config.genesis_balances.insert(bob(), FUNDS);
    let mut svc = NameService::bootstrap(admin(), config, T0).unwrap();
    let controller = svc.controller().address();
    svc.approve(alice(), T0, controller, u128::MAX).unwrap();
    svc.approve(bob(), T0, controller, u128::MAX).unwrap();
    svc.drain_events();
    svc
}

fn request(label: &str, owner: Address) -> RegistrationRequest {
    RegistrationRequest {
        label: label.into(),
        owner,
        duration: 28 * DAY,
        secret: Hash32::from_bytes([9u8; 32]),
        resolver: Address::ZERO,
        data: vec![],
        reverse_record: false,
        owner_controlled_fuses: 0,
    }
}

/// Helper: commits `req` as `caller` at `at` and returns the earliest time
/// it can be revealed.
fn commit(svc: &mut NameService, caller: Address, req: &RegistrationRequest, at: u64) -> u64 {
    let hash = svc.make_commitment(req).unwrap();
    svc.commit(caller, at, hash).unwrap();
    at + svc.min_commitment_age()
}

fn register(svc: &mut NameService, caller: Address, req: &RegistrationRequest, at: u64) -> (u64, u64) {
    let ready = commit(svc, caller, req, at);
    let expires = svc.register(caller, ready, req).unwrap();
    (ready, expires)
}

// ---------------------------------------------------------------------------
// Pricing and validity
// ---------------------------------------------------------------------------

#[test]
fn rent_price_follows_length_buckets() {
    let svc = service();
    let base = |label: &str| svc.rent_price(label, 3600, T0).unwrap().base;
    assert_eq!(base("foo"), 14_400);
    assert_eq!(base("quux"), 7_200);
    assert_eq!(base("fubar"), 3_600);
    assert_eq!(base("foobie"), 3_600);
}

#[test]
fn large_rates_price_exactly() {
    let svc = service_with_rates(vec![0, 0, 1_000_000_000_000_000_000, 2, 1]);
    let price = svc.rent_price("foo", 86_400, T0).unwrap();
    assert_eq!(price.base, 86_400 * 1_000_000_000_000_000_000);
    assert_eq!(price.premium, 0);
}

#[test]
fn label_validity() {
    let svc = service();
    for label in ["testing", "sixsix", "five5", "iii", "🚀🚀🚀"] {
        assert!(svc.valid(label), "{label} should be valid");
    }
    for label in ["", "ii", "i", "🚀🚀", "你好"] {
        assert!(!svc.valid(label), "{label} should be invalid");
    }
    assert!(svc.available("newname", T0));
    assert!(!svc.available("ab", T0));
}

// ---------------------------------------------------------------------------
// Commit / reveal
// ---------------------------------------------------------------------------

#[test]
fn register_right_after_commit_is_too_new() {
    let mut svc = service();
    let req = request("newname", alice());
    commit(&mut svc, alice(), &req, T0);
    let err = svc.register(alice(), T0, &req).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Controller(ControllerError::CommitmentTooNew(_))
    ));
}

#[test]
fn register_after_max_age_is_too_old() {
    let mut svc = service();
    let req = request("newname", alice());
    commit(&mut svc, alice(), &req, T0);
    let late = T0 + svc.max_commitment_age() + 1;
    let err = svc.register(alice(), late, &req).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Controller(ControllerError::CommitmentTooOld(_))
    ));
    // The boundary itself is still inside the window.
    let mut svc = service();
    commit(&mut svc, alice(), &req, T0);
    svc.register(alice(), T0 + svc.max_commitment_age(), &req).unwrap();
}

#[test]
fn registration_succeeds_exactly_once() {
    let mut svc = service();
    let req = request("newname", alice());
    let (ready, _) = register(&mut svc, alice(), &req, T0);

    // The commitment was consumed.
    let hash = svc.make_commitment(&req).unwrap();
    assert_eq!(svc.commitments(&hash), 0);
    assert!(matches!(
        svc.register(alice(), ready, &req).unwrap_err(),
        ServiceError::Controller(ControllerError::CommitmentTooOld(_))
    ));

    // A fresh commitment for the same label finds it taken.
    let mut again = request("newname", bob());
    again.secret = Hash32::from_bytes([1u8; 32]);
    let ready = commit(&mut svc, bob(), &again, ready);
    assert_eq!(
        svc.register(bob(), ready, &again).unwrap_err().to_string(),
        ControllerError::NameNotAvailable("newname".into()).to_string()
    );
}

#[test]
fn live_commitment_cannot_be_recommitted() {
    let mut svc = service();
    let hash = Hash32::from_bytes([5u8; 32]);
    svc.commit(alice(), T0, hash).unwrap();
    assert!(matches!(
        svc.commit(bob(), T0 + 100, hash).unwrap_err(),
        ServiceError::Controller(ControllerError::UnexpiredCommitmentExists(_))
    ));
    assert_eq!(svc.commitments(&hash), T0);
    svc.commit(bob(), T0 + svc.max_commitment_age() + 1, hash).unwrap();
}

#[test]
fn invalid_label_and_short_duration_are_rejected() {
    let mut svc = service();
    let req = request("ab", alice());
    let ready = commit(&mut svc, alice(), &req, T0);
    assert!(matches!(
        svc.register(alice(), ready, &req).unwrap_err(),
        ServiceError::Controller(ControllerError::InvalidLabel(_))
    ));

    let mut short = request("shortly", alice());
    short.duration = 27 * DAY;
    let ready = commit(&mut svc, alice(), &short, T0);
    assert!(matches!(
        svc.register(alice(), ready, &short).unwrap_err(),
        ServiceError::Controller(ControllerError::DurationTooShort(_))
    ));
}

#[test]
fn records_without_resolver_cannot_be_committed() {
    let svc = service();
    let mut req = request("newname", alice());
    req.data.push(RecordCall::SetAddr {
        node: svc.node_of("newname"),
        addr: alice(),
    });
    assert!(matches!(
        svc.make_commitment(&req).unwrap_err(),
        ServiceError::Controller(ControllerError::ResolverRequiredWhenDataSupplied)
    ));
}

// ---------------------------------------------------------------------------
// Atomicity
// ---------------------------------------------------------------------------

#[test]
fn mismatched_record_batch_reverts_everything() {
    let mut svc = service();
    let node = svc.node_of("newname");
    let mut req = request("newname", alice());
    req.resolver = svc.public_resolver();
    req.data = vec![
        RecordCall::SetAddr { node, addr: alice() },
        RecordCall::SetText {
            node: namehash("other.frax"),
            key: "url".into(),
            value: "https://example.com".into(),
        },
    ];
    let ready = commit(&mut svc, alice(), &req, T0);
    let hash = svc.make_commitment(&req).unwrap();
    let controller = svc.controller().address();

    let err = svc.register(alice(), ready, &req).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Controller(ControllerError::RecordNamehashMismatch { .. })
    ));
    assert_eq!(svc.balance_of(&alice()), FUNDS);
    assert_eq!(svc.balance_of(&controller), 0);
    assert_eq!(svc.registry().owner(&node), Address::ZERO);
    assert_eq!(svc.name_expires("newname"), 0);
    assert_eq!(svc.addr(&node), None);
    assert_eq!(svc.commitments(&hash), T0);
}

#[test]
fn missing_allowance_reverts_before_registration() {
    let mut svc = service();
    let carol = Address::derive("carol");
    svc.transfer(alice(), T0, carol, 1_000_000_000).unwrap();
    let req = request("newname", carol);
    let ready = commit(&mut svc, carol, &req, T0);

    let err = svc.register(carol, ready, &req).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Controller(ControllerError::Payment(TokenError::InsufficientAllowance { .. }))
    ));
    assert_eq!(svc.balance_of(&carol), 1_000_000_000);
    assert!(svc.available("newname", ready));
}

#[test]
fn unknown_resolver_reverts_registration() {
    let mut svc = service();
    let node = svc.node_of("newname");
    let mut req = request("newname", alice());
    req.resolver = Address::derive("not-a-resolver");
    req.data = vec![RecordCall::SetAddr { node, addr: alice() }];
    let ready = commit(&mut svc, alice(), &req, T0);
    assert!(matches!(
        svc.register(alice(), ready, &req).unwrap_err(),
        ServiceError::Controller(ControllerError::ResolverCallFailed(_))
    ));
    assert_eq!(svc.balance_of(&alice()), FUNDS);
}

#[test]
fn missing_balance_reverts_before_registration() {
    let mut svc = service();
    let carol = Address::derive("carol");
    svc.transfer(alice(), T0, carol, 1_000).unwrap();
    let controller = svc.controller().address();
    svc.approve(carol, T0, controller, u128::MAX).unwrap();
    let req = request("newname", carol);
    let ready = commit(&mut svc, carol, &req, T0);

    let err = svc.register(carol, ready, &req).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Controller(ControllerError::Payment(TokenError::InsufficientBalance { .. }))
    ));
    assert_eq!(svc.balance_of(&carol), 1_000);
    assert_eq!(svc.balance_of(&controller), 0);
    assert!(svc.available("newname", ready));
}

#[test]
fn reveal_with_different_owner_fails() {
    let mut svc = service();
    let committed = request("newname", alice());
    let ready = commit(&mut svc, alice(), &committed, T0);
    let hash = svc.make_commitment(&committed).unwrap();

    let revealed = request("newname", bob());
    assert!(matches!(
        svc.register(alice(), ready, &revealed).unwrap_err(),
        ServiceError::Controller(ControllerError::CommitmentTooOld(_))
    ));
    assert_eq!(svc.balance_of(&alice()), FUNDS);
    assert!(svc.available("newname", ready));
    assert_eq!(svc.commitments(&hash), T0);
}

#[test]
fn zero_owner_is_rejected_without_charging() {
    let mut svc = service();
    let controller = svc.controller().address();

    let plain = request("newname", Address::ZERO);
    let mut with_resolver = request("another", Address::ZERO);
    with_resolver.resolver = svc.public_resolver();

    for req in [plain, with_resolver] {
        let ready = commit(&mut svc, alice(), &req, T0);
        assert!(matches!(
            svc.register(alice(), ready, &req).unwrap_err(),
            ServiceError::Controller(ControllerError::Registrar(RegistrarError::ZeroOwner))
        ));
        assert!(svc.available(&req.label, ready));
        assert_eq!(svc.name_expires(&req.label), 0);
    }
    assert_eq!(svc.balance_of(&alice()), FUNDS);
    assert_eq!(svc.balance_of(&controller), 0);
}

#[test]
fn zero_duration_is_rejected_even_without_a_minimum() {
    let mut config = ServiceConfig {
        rent_prices: vec![0, 0, 4, 2, 1],
        min_registration_duration: 0,
        ..ServiceConfig::default()
    };
    config.genesis_balances.insert(alice(), FUNDS);
    let mut svc = NameService::bootstrap(admin(), config, T0).unwrap();
    let controller = svc.controller().address();
    svc.approve(alice(), T0, controller, u128::MAX).unwrap();

    let mut req = request("newname", alice());
    req.duration = 0;
    let ready = commit(&mut svc, alice(), &req, T0);
    assert!(matches!(
        svc.register(alice(), ready, &req).unwrap_err(),
        ServiceError::Controller(ControllerError::DurationTooShort(0))
    ));
    assert!(svc.available("newname", ready));

    req.duration = 1;
    let ready = commit(&mut svc, alice(), &req, ready);
    assert_eq!(svc.register(alice(), ready, &req).unwrap(), ready + 1);
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[test]
fn register_without_resolver_pays_and_emits() {
    let mut svc = service();
    let req = request("newname", alice());
    let ready = commit(&mut svc, alice(), &req, T0);
    let price = svc.rent_price("newname", req.duration, ready).unwrap();
    let controller = svc.controller().address();
    svc.drain_events();

    let expires = svc.register(alice(), ready, &req).unwrap();
    assert_eq!(expires, ready + 28 * DAY);
    assert_eq!(svc.balance_of(&controller), price.base + price.premium);
    assert_eq!(svc.balance_of(&alice()), FUNDS - price.base - price.premium);
    assert_eq!(svc.registry().owner(&svc.node_of("newname")), alice());
    assert_eq!(svc.owner_of("newname", ready), alice());

    let events = svc.drain_events();
    let registered = events
        .iter()
        .find_map(|e| match e {
            Event::NameRegistered {
                label,
                label_hash,
                owner,
                base,
                premium,
                expires,
            } => Some((label.clone(), *label_hash, *owner, *base, *premium, *expires)),
            _ => None,
        })
        .expect("NameRegistered emitted");
    assert_eq!(
        registered,
        (
            "newname".to_string(),
            labelhash("newname"),
            alice(),
            price.base,
            price.premium,
            expires,
        )
    );
}

#[test]
fn register_with_records_and_reverse() {
    let mut svc = service();
    let node = svc.node_of("newname");
    let resolver = svc.public_resolver();
    let mut req = request("newname", alice());
    req.resolver = resolver;
    req.reverse_record = true;
    req.data = vec![
        RecordCall::SetAddr { node, addr: alice() },
        RecordCall::SetText {
            node,
            key: "url".into(),
            value: "https://frax.finance".into(),
        },
    ];
    register(&mut svc, alice(), &req, T0);

    assert_eq!(svc.registry().owner(&node), alice());
    assert_eq!(svc.registry().resolver(&node), resolver);
    assert_eq!(svc.owner_of("newname", T0 + 600), alice());
    assert_eq!(svc.addr(&node), Some(alice()));
    assert_eq!(svc.text(&node, "url").as_deref(), Some("https://frax.finance"));
    assert_eq!(svc.reverse_lookup(&alice()).as_deref(), Some("newname.frax"));
    let reverse_node = svc.reverse().node(&alice());
    assert_eq!(svc.registry().owner(&reverse_node), alice());
}

#[test]
fn register_with_resolver_only_hands_over_ownership() {
    let mut svc = service();
    let node = svc.node_of("newname");
    let mut req = request("newname", bob());
    req.resolver = svc.public_resolver();
    let (ready, _) = register(&mut svc, alice(), &req, T0);

    assert_eq!(svc.registry().owner(&node), bob());
    assert_eq!(svc.registry().resolver(&node), svc.public_resolver());
    assert_eq!(svc.owner_of("newname", ready), bob());
}

#[test]
fn expired_name_can_be_registered_again() {
    let mut svc = service();
    let (_, expires) = register(&mut svc, alice(), &request("newname", alice()), T0);

    let in_grace = expires + GRACE_PERIOD;
    assert!(!svc.available("newname", in_grace));
    assert_eq!(svc.owner_of("newname", in_grace), alice());

    let released = in_grace + 1;
    assert!(svc.available("newname", released));
    let mut again = request("newname", bob());
    again.secret = Hash32::from_bytes([2u8; 32]);
    let (ready, _) = register(&mut svc, bob(), &again, released);
    assert_eq!(svc.owner_of("newname", ready), bob());
    assert_eq!(svc.registry().owner(&svc.node_of("newname")), bob());
}

// ---------------------------------------------------------------------------
// Renewal
// ---------------------------------------------------------------------------

#[test]
fn renew_extends_by_exactly_duration_and_anyone_can_pay() {
    let mut svc = service();
    let (ready, expires) = register(&mut svc, alice(), &request("newname", alice()), T0);
    let controller = svc.controller().address();
    let collected = svc.balance_of(&controller);
    let price = svc.rent_price("newname", 365 * DAY, ready).unwrap();

    let renewed = svc.renew(bob(), ready + 10, "newname", 365 * DAY).unwrap();
    assert_eq!(renewed, expires + 365 * DAY);
    assert_eq!(svc.name_expires("newname"), renewed);
    assert_eq!(svc.balance_of(&controller), collected + price.base);
    assert_eq!(svc.owner_of("newname", ready + 10), alice());

    assert!(matches!(
        svc.renew(bob(), ready + 10, "newname", 0).unwrap_err(),
        ServiceError::Controller(ControllerError::DurationTooShort(0))
    ));
}

#[test]
fn renew_of_wrapped_name_keeps_fuses() {
    let mut svc = service();
    let node = svc.node_of("newname");
    let mut req = request("newname", alice());
    req.owner_controlled_fuses = Fuses::CANNOT_TRANSFER.bits() as u16;
    let (ready, registrar_expiry) = register(&mut svc, alice(), &req, T0);

    let (owner, fuses, wrapper_expiry) = svc.get_data(&node, ready);
    assert_eq!(owner, alice());
    assert_eq!(wrapper_expiry, registrar_expiry + GRACE_PERIOD);
    for fuse in [
        Fuses::CANNOT_UNWRAP,
        Fuses::CANNOT_TRANSFER,
        Fuses::PARENT_CANNOT_CONTROL,
        Fuses::IS_BASE_NAME,
    ] {
        assert!(fuses.contains(fuse), "{fuse} missing from {fuses}");
    }
    assert_eq!(svc.registry().owner(&node), svc.wrapper().address());
    assert_eq!(svc.owner_of("newname", ready), svc.wrapper().address());

    let duration = 90 * DAY;
    let renewed = svc.renew(bob(), ready + 1, "newname", duration).unwrap();
    assert_eq!(renewed, registrar_expiry + duration);
    let (owner_after, fuses_after, expiry_after) = svc.get_data(&node, ready + 1);
    assert_eq!(owner_after, alice());
    assert_eq!(fuses_after, fuses);
    assert_eq!(expiry_after, wrapper_expiry + duration);
}

#[test]
fn wrapper_renew_is_controller_only() {
    let mut svc = service();
    let node = svc.node_of("newname");
    let mut req = request("newname", alice());
    req.owner_controlled_fuses = Fuses::CANNOT_SET_TTL.bits() as u16;
    let (ready, _) = register(&mut svc, alice(), &req, T0);
    assert!(matches!(
        svc.wrapper_renew(alice(), ready, node, DAY).unwrap_err(),
        ServiceError::Wrapper(WrapperError::ControllerOnly { .. })
    ));
}

// ---------------------------------------------------------------------------
// Fuses on registered names
// ---------------------------------------------------------------------------

#[test]
fn burned_fuses_gate_owner_operations() {
    let mut svc = service();
    let node = svc.node_of("newname");
    let mut req = request("newname", alice());
    req.owner_controlled_fuses = Fuses::CANNOT_TRANSFER.bits() as u16;
    let (ready, _) = register(&mut svc, alice(), &req, T0);

    assert!(matches!(
        svc.safe_transfer_from(alice(), ready, alice(), bob(), node).unwrap_err(),
        ServiceError::Wrapper(WrapperError::OperationProhibited { fuse, .. }) if fuse == Fuses::CANNOT_TRANSFER
    ));
    assert!(matches!(
        svc.unwrap(alice(), ready, "newname", alice(), alice()).unwrap_err(),
        ServiceError::Wrapper(WrapperError::OperationProhibited { fuse, .. }) if fuse == Fuses::CANNOT_UNWRAP
    ));

    // Resolver changes are still open until that fuse is burned too.
    svc.set_resolver(alice(), ready, node, svc.public_resolver()).unwrap();
    let burned = svc
        .set_fuses(alice(), ready, node, (Fuses::CANNOT_SET_RESOLVER | Fuses::CANNOT_BURN_FUSES).bits() as u16)
        .unwrap();
    assert!(burned.contains(Fuses::CANNOT_TRANSFER));
    assert!(matches!(
        svc.set_resolver(alice(), ready, node, Address::ZERO).unwrap_err(),
        ServiceError::Wrapper(WrapperError::OperationProhibited { .. })
    ));
    assert!(matches!(
        svc.set_fuses(alice(), ready, node, Fuses::CANNOT_SET_TTL.bits() as u16).unwrap_err(),
        ServiceError::Wrapper(WrapperError::OperationProhibited { fuse, .. }) if fuse == Fuses::CANNOT_BURN_FUSES
    ));
}

#[test]
fn wrapped_owner_manages_subnames() {
    let mut svc = service();
    let parent = svc.node_of("newname");
    let mut req = request("newname", alice());
    req.owner_controlled_fuses = Fuses::CANNOT_TRANSFER.bits() as u16;
    let (ready, _) = register(&mut svc, alice(), &req, T0);
    let (_, _, parent_expiry) = svc.get_data(&parent, ready);

    let sub = svc
        .set_wrapped_subnode_owner(alice(), ready, parent, "sub", bob(), Fuses::NONE, u64::MAX)
        .unwrap();
    assert_eq!(sub, namehash("sub.newname.frax"));
    let (owner, _, expiry) = svc.get_data(&sub, ready);
    assert_eq!(owner, bob());
    assert_eq!(expiry, parent_expiry);
    assert_eq!(svc.wrapper().name(&sub), Some("sub.newname.frax"));

    // Parent burns PARENT_CANNOT_CONTROL on the child; it can no longer be
    // taken back.
    svc.set_child_fuses(alice(), ready, parent, "sub", Fuses::PARENT_CANNOT_CONTROL, 0)
        .unwrap();
    assert!(matches!(
        svc.set_wrapped_subnode_owner(alice(), ready, parent, "sub", alice(), Fuses::NONE, 0)
            .unwrap_err(),
        ServiceError::Wrapper(WrapperError::OperationProhibited { .. })
    ));
}

// ---------------------------------------------------------------------------
// Treasury, reverse, root
// ---------------------------------------------------------------------------

#[test]
fn withdraw_sweeps_everything_to_admin() {
    let mut svc = service();
    register(&mut svc, alice(), &request("newname", alice()), T0);
    register(&mut svc, bob(), &request("othername", bob()), T0 + 1);
    let controller = svc.controller().address();
    let collected = svc.balance_of(&controller);
    assert!(collected > 0);

    let swept = svc.withdraw(bob(), T0 + 5_000).unwrap();
    assert_eq!(swept, collected);
    assert_eq!(svc.balance_of(&controller), 0);
    assert_eq!(svc.balance_of(&admin()), collected);
    assert_eq!(svc.withdraw(bob(), T0 + 5_001).unwrap(), 0);
}

#[test]
fn reverse_name_can_be_set_directly() {
    let mut svc = service();
    svc.set_reverse_name(bob(), T0, "bob.frax").unwrap();
    assert_eq!(svc.reverse_lookup(&bob()).as_deref(), Some("bob.frax"));
    let node = svc.reverse().node(&bob());
    let resolver = svc.resolvers().get(&svc.public_resolver()).unwrap();
    assert_eq!(resolver.name(&node), Some("bob.frax"));
}

#[test]
fn locked_tld_cannot_be_reassigned() {
    let mut svc = service();
    let tld = LabelHash::of("frax");
    svc.lock_tld(admin(), T0, tld).unwrap();
    assert!(matches!(
        svc.set_tld_owner(admin(), T0, tld, bob()).unwrap_err(),
        ServiceError::Root(RootError::Locked(_))
    ));
    assert!(matches!(
        svc.lock_tld(bob(), T0, LabelHash::of("other")).unwrap_err(),
        ServiceError::Root(RootError::Unauthorized { .. })
    ));
    let node = svc.set_tld_owner(admin(), T0, LabelHash::of("other"), bob()).unwrap();
    assert_eq!(svc.registry().owner(&node), bob());
}
