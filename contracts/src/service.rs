//! # Name Service
//!
//! Owns one instance of every component, wires them together at genesis and
//! runs each operation atomically.
//!
//! ## Genesis wiring
//!
//! ```text
//! Registry root ─── Root ──┬── <tld>          → BaseRegistrar
//!                          └── reverse ── addr → ReverseRegistrar
//!
//! BaseRegistrar controllers:  NameWrapper, RegistrationController
//! NameWrapper controllers:    RegistrationController
//! ReverseRegistrar controllers: RegistrationController
//! PublicResolver trusts:      RegistrationController, ReverseRegistrar
//! ```
//!
//! ## Atomicity
//!
//! [`NameService::execute`] runs an operation against a staged clone of the
//! whole service and swaps it in only when the operation returns `Ok`. A
//! failure anywhere, including deep inside a collaborator after payment was
//! taken, leaves every balance, owner, fuse and commitment as it was.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fns_protocol::config::{ConfigError, ServiceConfig, ADDR_REVERSE_LABEL, REVERSE_TLD};
use fns_protocol::name::{join, labelhash, namehash};
use fns_protocol::{Address, Hash32, LabelHash, Node};

use crate::base_registrar::{BaseRegistrar, RegistrarError};
use crate::context::CallContext;
use crate::controller::{Contracts, ControllerError, RegistrationController, RegistrationRequest};
use crate::events::Event;
use crate::fuses::Fuses;
use crate::name_wrapper::{NameWrapper, WrapperError};
use crate::payment_token::{PaymentLedger, PaymentToken, TokenError};
use crate::price_oracle::{FixedPriceFeed, Price, PriceError, PriceOracle};
use crate::registry::{Registry, RegistryError};
use crate::resolver::{
    Authority, PublicResolver, RecordCall, Resolver, ResolverDirectory, ResolverError, ResolverSet,
};
use crate::reverse_registrar::{ReverseError, ReverseRegistrar};
use crate::root::{Root, RootError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Root(#[from] RootError),

    #[error(transparent)]
    Registrar(#[from] RegistrarError),

    #[error(transparent)]
    Wrapper(#[from] WrapperError),

    #[error(transparent)]
    Price(#[from] PriceError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Reverse(#[from] ReverseError),

    #[error(transparent)]
    Controller(#[from] ControllerError),
}

impl ServiceError {
    /// Short machine-readable class, used for metrics labels and API codes.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Config(_) => "config",
            ServiceError::Registry(_) => "registry",
            ServiceError::Root(_) => "root",
            ServiceError::Registrar(_) => "registrar",
            ServiceError::Wrapper(_) => "wrapper",
            ServiceError::Price(_) => "price",
            ServiceError::Token(_) => "token",
            ServiceError::Resolver(_) => "resolver",
            ServiceError::Reverse(_) => "reverse",
            ServiceError::Controller(_) => "controller",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameService {
    config: ServiceConfig,
    admin: Address,
    registry: Registry,
    root: Root,
    registrar: BaseRegistrar,
    wrapper: NameWrapper,
    feed: FixedPriceFeed,
    token: PaymentToken,
    resolvers: ResolverSet,
    reverse: ReverseRegistrar,
    controller: RegistrationController,
    #[serde(skip)]
    events: Vec<Event>,
}

impl NameService {
    /// Deploys and wires a fresh name service administered by `admin`.
    pub fn bootstrap(admin: Address, config: ServiceConfig, now: u64) -> Result<Self, ServiceError> {
        config.validate()?;
        let base_node = namehash(&config.base_tld);
        let reverse_name = join(ADDR_REVERSE_LABEL, REVERSE_TLD);

        let mut root = Root::new(admin);
        let mut registry = Registry::new(root.address());
        let mut registrar = BaseRegistrar::new(admin, base_node, config.grace_period);
        let mut wrapper = NameWrapper::new(admin, &config.base_tld, base_node, config.grace_period);
        let mut reverse = ReverseRegistrar::new(admin, &reverse_name);
        let oracle = PriceOracle::new(config.rent_prices.clone(), config.premium, config.grace_period)?;
        let controller = RegistrationController::new(
            oracle,
            &config.base_tld,
            base_node,
            config.min_commitment_age,
            config.max_commitment_age,
            config.min_registration_duration,
        )?;
        let resolver = PublicResolver::new(Address::derive("resolver"), controller.address(), reverse.address());
        let resolver_address = resolver.address();
        let mut resolvers = ResolverSet::default();
        resolvers.insert(resolver);
        let mut token = PaymentToken::new(&config.token_name, &config.token_symbol, config.token_decimals);
        let feed = FixedPriceFeed::new(admin, config.reference_answer, config.reference_decimals);

        let mut events = Vec::new();
        let mut ctx = CallContext::new(admin, now, &mut events);

        root.set_controller(&mut ctx, admin, true)?;
        root.set_subnode_owner(&mut ctx, &mut registry, labelhash(&config.base_tld), registrar.address())?;
        let reverse_tld = root.set_subnode_owner(&mut ctx, &mut registry, labelhash(REVERSE_TLD), admin)?;
        registry.set_subnode_owner(&mut ctx, reverse_tld, labelhash(ADDR_REVERSE_LABEL), reverse.address())?;

        registrar.add_controller(&mut ctx, wrapper.address())?;
        registrar.add_controller(&mut ctx, controller.address())?;
        registrar.set_resolver(&mut ctx, &mut registry, resolver_address)?;
        wrapper.set_controller(&mut ctx, controller.address(), true)?;
        reverse.set_controller(&mut ctx, controller.address(), true)?;
        reverse.set_default_resolver(&mut ctx, resolver_address)?;

        for (holder, amount) in &config.genesis_balances {
            token.mint(&mut ctx, *holder, *amount)?;
        }

        tracing::info!(
            tld = %config.base_tld,
            %admin,
            registrar = %registrar.address(),
            controller = %controller.address(),
            "name service bootstrapped"
        );

        Ok(Self {
            config,
            admin,
            registry,
            root,
            registrar,
            wrapper,
            feed,
            token,
            resolvers,
            reverse,
            controller,
            events,
        })
    }

    /// Runs `op` against a staged copy and commits it only on success.
    pub fn execute<T, E>(
        &mut self,
        caller: Address,
        now: u64,
        op: impl FnOnce(&mut Self, &mut CallContext<'_>) -> Result<T, E>,
    ) -> Result<T, ServiceError>
    where
        ServiceError: From<E>,
    {
        let mut staged = self.clone();
        let mut emitted = Vec::new();
        let result = {
            let mut ctx = CallContext::new(caller, now, &mut emitted);
            op(&mut staged, &mut ctx)
        };
        match result {
            Ok(value) => {
                tracing::debug!(%caller, events = emitted.len(), "call committed");
                staged.events.extend(emitted);
                *self = staged;
                Ok(value)
            }
            Err(e) => {
                let err = ServiceError::from(e);
                tracing::debug!(%caller, error = %err, "call reverted");
                Err(err)
            }
        }
    }

    /// Takes every event committed since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    fn split(&mut self) -> (&mut RegistrationController, Contracts<'_>) {
        let contracts = Contracts {
            registry: &mut self.registry,
            registrar: &mut self.registrar,
            wrapper: &mut self.wrapper,
            token: &mut self.token,
            feed: &self.feed,
            resolvers: &mut self.resolvers,
            reverse: &mut self.reverse,
        };
        (&mut self.controller, contracts)
    }

    // -- Accessors ----------------------------------------------------------

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn registrar(&self) -> &BaseRegistrar {
        &self.registrar
    }

    pub fn wrapper(&self) -> &NameWrapper {
        &self.wrapper
    }

    pub fn controller(&self) -> &RegistrationController {
        &self.controller
    }

    pub fn token(&self) -> &PaymentToken {
        &self.token
    }

    pub fn feed(&self) -> &FixedPriceFeed {
        &self.feed
    }

    pub fn resolvers(&self) -> &ResolverSet {
        &self.resolvers
    }

    pub fn reverse(&self) -> &ReverseRegistrar {
        &self.reverse
    }

    /// Default resolver deployed at genesis.
    pub fn public_resolver(&self) -> Address {
        self.reverse.default_resolver()
    }

    /// Node of `label` under the base TLD.
    pub fn node_of(&self, label: &str) -> Node {
        self.registrar.base_node().child(&LabelHash::of(label))
    }

    // -- Controller ---------------------------------------------------------

    pub fn valid(&self, label: &str) -> bool {
        RegistrationController::valid(label)
    }

    pub fn available(&self, label: &str, now: u64) -> bool {
        self.controller.available(&self.registrar, label, now)
    }

    pub fn rent_price(&self, label: &str, duration: u64, now: u64) -> Result<Price, ServiceError> {
        Ok(self
            .controller
            .rent_price(&self.registrar, &self.feed, label, duration, now)?)
    }

    pub fn make_commitment(&self, request: &RegistrationRequest) -> Result<Hash32, ServiceError> {
        Ok(RegistrationController::make_commitment(request)?)
    }

    pub fn commitments(&self, commitment: &Hash32) -> u64 {
        self.controller.commitments(commitment)
    }

    pub fn min_commitment_age(&self) -> u64 {
        self.controller.min_commitment_age()
    }

    pub fn max_commitment_age(&self) -> u64 {
        self.controller.max_commitment_age()
    }

    pub fn commit(&mut self, caller: Address, now: u64, commitment: Hash32) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| s.controller.commit(ctx, commitment))
    }

    pub fn register(
        &mut self,
        caller: Address,
        now: u64,
        request: &RegistrationRequest,
    ) -> Result<u64, ServiceError> {
        self.execute(caller, now, |s, ctx| {
            let (controller, contracts) = s.split();
            controller.register(ctx, contracts, request)
        })
    }

    pub fn renew(&mut self, caller: Address, now: u64, label: &str, duration: u64) -> Result<u64, ServiceError> {
        self.execute(caller, now, |s, ctx| {
            let (controller, contracts) = s.split();
            controller.renew(ctx, contracts, label, duration)
        })
    }

    /// Sweeps controller fees to the registrar administrator.
    pub fn withdraw(&mut self, caller: Address, now: u64) -> Result<u128, ServiceError> {
        self.execute(caller, now, |s, ctx| {
            let treasury = s.registrar.admin();
            s.controller.withdraw(ctx, &mut s.token, treasury)
        })
    }

    // -- Registry -----------------------------------------------------------

    pub fn set_owner(&mut self, caller: Address, now: u64, node: Node, owner: Address) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| s.registry.set_owner(ctx, node, owner))
    }

    pub fn set_subnode_owner(
        &mut self,
        caller: Address,
        now: u64,
        parent: Node,
        label: LabelHash,
        owner: Address,
    ) -> Result<Node, ServiceError> {
        self.execute(caller, now, |s, ctx| {
            s.registry.set_subnode_owner(ctx, parent, label, owner)
        })
    }

    pub fn set_resolver(
        &mut self,
        caller: Address,
        now: u64,
        node: Node,
        resolver: Address,
    ) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| -> Result<(), ServiceError> {
            if s.registry.owner(&node) == s.wrapper.address() {
                Ok(s.wrapper.set_resolver(ctx, &mut s.registry, node, resolver)?)
            } else {
                s.registry
                    .set_resolver(ctx, node, resolver)
                    .map_err(ServiceError::from)
            }
        })
    }

    pub fn set_ttl(&mut self, caller: Address, now: u64, node: Node, ttl: u64) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| -> Result<(), ServiceError> {
            if s.registry.owner(&node) == s.wrapper.address() {
                Ok(s.wrapper.set_ttl(ctx, &mut s.registry, node, ttl)?)
            } else {
                s.registry.set_ttl(ctx, node, ttl).map_err(ServiceError::from)
            }
        })
    }

    pub fn set_registry_operator(
        &mut self,
        caller: Address,
        now: u64,
        operator: Address,
        approved: bool,
    ) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| {
            s.registry.set_approval_for_all(ctx, operator, approved);
            Ok::<_, RegistryError>(())
        })
    }

    // -- Root ---------------------------------------------------------------

    pub fn set_tld_owner(
        &mut self,
        caller: Address,
        now: u64,
        label: LabelHash,
        owner: Address,
    ) -> Result<Node, ServiceError> {
        self.execute(caller, now, |s, ctx| {
            s.root.set_subnode_owner(ctx, &mut s.registry, label, owner)
        })
    }

    pub fn lock_tld(&mut self, caller: Address, now: u64, label: LabelHash) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| s.root.lock(ctx, label))
    }

    // -- Registrar ----------------------------------------------------------

    pub fn add_registrar_controller(
        &mut self,
        caller: Address,
        now: u64,
        controller: Address,
    ) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| s.registrar.add_controller(ctx, controller))
    }

    pub fn remove_registrar_controller(
        &mut self,
        caller: Address,
        now: u64,
        controller: Address,
    ) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| s.registrar.remove_controller(ctx, controller))
    }

    pub fn name_expires(&self, label: &str) -> u64 {
        self.registrar.name_expires(&LabelHash::of(label))
    }

    pub fn owner_of(&self, label: &str, now: u64) -> Address {
        self.registrar.owner_of(&LabelHash::of(label), now)
    }

    pub fn transfer_label(
        &mut self,
        caller: Address,
        now: u64,
        label: &str,
        to: Address,
    ) -> Result<(), ServiceError> {
        let id = LabelHash::of(label);
        self.execute(caller, now, |s, ctx| {
            let from = s.registrar.owner_of(&id, now);
            s.registrar.transfer_from(ctx, from, to, id)
        })
    }

    pub fn approve_label(&mut self, caller: Address, now: u64, label: &str, to: Address) -> Result<(), ServiceError> {
        let id = LabelHash::of(label);
        self.execute(caller, now, |s, ctx| s.registrar.approve(ctx, to, id))
    }

    pub fn set_registrar_operator(
        &mut self,
        caller: Address,
        now: u64,
        operator: Address,
        approved: bool,
    ) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| {
            s.registrar.set_approval_for_all(ctx, operator, approved);
            Ok::<_, RegistrarError>(())
        })
    }

    pub fn reclaim(&mut self, caller: Address, now: u64, label: &str, owner: Address) -> Result<(), ServiceError> {
        let id = LabelHash::of(label);
        self.execute(caller, now, |s, ctx| {
            s.registrar.reclaim(ctx, &mut s.registry, id, owner)
        })
    }

    // -- Wrapper ------------------------------------------------------------

    pub fn get_data(&self, node: &Node, now: u64) -> (Address, Fuses, u64) {
        self.wrapper.get_data(node, now)
    }

    pub fn set_wrapper_controller(
        &mut self,
        caller: Address,
        now: u64,
        controller: Address,
        enabled: bool,
    ) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| s.wrapper.set_controller(ctx, controller, enabled))
    }

    pub fn set_fuses(&mut self, caller: Address, now: u64, node: Node, owner_fuses: u16) -> Result<Fuses, ServiceError> {
        self.execute(caller, now, |s, ctx| s.wrapper.set_fuses(ctx, node, owner_fuses))
    }

    pub fn set_child_fuses(
        &mut self,
        caller: Address,
        now: u64,
        parent: Node,
        label: &str,
        fuses: Fuses,
        expiry: u64,
    ) -> Result<(), ServiceError> {
        let label_hash = LabelHash::of(label);
        self.execute(caller, now, |s, ctx| {
            s.wrapper
                .set_child_fuses(ctx, &s.registry, parent, label_hash, fuses, expiry)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_wrapped_subnode_owner(
        &mut self,
        caller: Address,
        now: u64,
        parent: Node,
        label: &str,
        owner: Address,
        fuses: Fuses,
        expiry: u64,
    ) -> Result<Node, ServiceError> {
        self.execute(caller, now, |s, ctx| {
            s.wrapper
                .set_subnode_owner(ctx, &mut s.registry, parent, label, owner, fuses, expiry)
        })
    }

    /// Controller-only wrapper expiry extension.
    pub fn wrapper_renew(&mut self, caller: Address, now: u64, node: Node, duration: u64) -> Result<u64, ServiceError> {
        self.execute(caller, now, |s, ctx| s.wrapper.renew(ctx, node, duration))
    }

    pub fn wrap(
        &mut self,
        caller: Address,
        now: u64,
        label: &str,
        wrapped_owner: Address,
        owner_fuses: u16,
        resolver: Address,
    ) -> Result<Node, ServiceError> {
        self.execute(caller, now, |s, ctx| {
            s.wrapper.wrap(
                ctx,
                &mut s.registry,
                &mut s.registrar,
                label,
                wrapped_owner,
                owner_fuses,
                resolver,
            )
        })
    }

    pub fn unwrap(
        &mut self,
        caller: Address,
        now: u64,
        label: &str,
        registrant: Address,
        controller: Address,
    ) -> Result<(), ServiceError> {
        let label_hash = LabelHash::of(label);
        self.execute(caller, now, |s, ctx| {
            s.wrapper
                .unwrap(ctx, &mut s.registry, &mut s.registrar, label_hash, registrant, controller)
        })
    }

    pub fn safe_transfer_from(
        &mut self,
        caller: Address,
        now: u64,
        from: Address,
        to: Address,
        node: Node,
    ) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| s.wrapper.safe_transfer_from(ctx, from, to, node))
    }

    pub fn set_wrapper_operator(
        &mut self,
        caller: Address,
        now: u64,
        operator: Address,
        approved: bool,
    ) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| {
            s.wrapper.set_approval_for_all(ctx, operator, approved);
            Ok::<_, WrapperError>(())
        })
    }

    // -- Payment token ------------------------------------------------------

    pub fn balance_of(&self, who: &Address) -> u128 {
        self.token.balance_of(who)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.token.allowance(owner, spender)
    }

    pub fn approve(&mut self, caller: Address, now: u64, spender: Address, amount: u128) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| {
            s.token.approve(ctx, spender, amount);
            Ok::<_, TokenError>(())
        })
    }

    pub fn transfer(&mut self, caller: Address, now: u64, to: Address, amount: u128) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| s.token.transfer(ctx, to, amount))
    }

    // -- Price feed ---------------------------------------------------------

    pub fn set_reference_price(&mut self, caller: Address, now: u64, answer: u128) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| s.feed.set_answer(ctx, answer))
    }

    // -- Resolvers ----------------------------------------------------------

    /// Writes a record batch for `node` as its owner.
    pub fn set_records(
        &mut self,
        caller: Address,
        now: u64,
        resolver: Address,
        node: Node,
        calls: &[RecordCall],
    ) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| -> Result<(), ResolverError> {
            let authority = Authority {
                registry: &s.registry,
                wrapper: &s.wrapper,
                now,
            };
            s.resolvers
                .require_mut(&resolver)?
                .multicall_with_node_check(ctx, &authority, node, calls)
        })
    }

    pub fn set_resolver_operator(
        &mut self,
        caller: Address,
        now: u64,
        resolver: Address,
        operator: Address,
        approved: bool,
    ) -> Result<(), ServiceError> {
        self.execute(caller, now, |s, ctx| {
            let target = s
                .resolvers
                .get_mut(&resolver)
                .ok_or(ResolverError::NotAResolver(resolver))?;
            target.set_approval_for_all(ctx, operator, approved);
            Ok::<_, ResolverError>(())
        })
    }

    /// The resolver currently pointed at by `node`, if it is a live one.
    pub fn resolver_for(&self, node: &Node) -> Option<&dyn Resolver> {
        self.resolvers.resolver(&self.registry.resolver(node))
    }

    pub fn addr(&self, node: &Node) -> Option<Address> {
        self.resolver_for(node).and_then(|r| r.addr(node))
    }

    pub fn text(&self, node: &Node, key: &str) -> Option<String> {
        self.resolver_for(node)
            .and_then(|r| r.text(node, key))
            .map(str::to_string)
    }

    pub fn contenthash(&self, node: &Node) -> Option<Vec<u8>> {
        self.resolver_for(node)
            .and_then(|r| r.contenthash(node))
            .map(<[u8]>::to_vec)
    }

    // -- Reverse ------------------------------------------------------------

    pub fn set_reverse_name(&mut self, caller: Address, now: u64, name: &str) -> Result<Node, ServiceError> {
        self.execute(caller, now, |s, ctx| {
            s.reverse
                .set_name(ctx, &mut s.registry, &mut s.resolvers, &s.wrapper, name)
        })
    }

    /// Primary name of `addr` through its reverse record.
    pub fn reverse_lookup(&self, addr: &Address) -> Option<String> {
        let node = self.reverse.node(addr);
        self.resolver_for(&node)
            .and_then(|r| r.name(&node))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> NameService {
        let mut config = ServiceConfig::default();
        config.genesis_balances.insert(Address::derive("alice"), 1_000);
        NameService::bootstrap(Address::derive("admin"), config, 1_000).unwrap()
    }

    #[test]
    fn bootstrap_wires_tld_and_reverse() {
        let svc = service();
        assert!(svc.registrar().live(svc.registry()));
        assert_eq!(svc.registry().owner(&namehash("frax")), svc.registrar().address());
        assert_eq!(svc.registry().resolver(&namehash("frax")), svc.public_resolver());
        assert_eq!(
            svc.registry().owner(&namehash("addr.reverse")),
            svc.reverse().address()
        );
        assert_eq!(svc.registry().owner(&Node::ROOT), svc.root().address());
        assert_eq!(svc.balance_of(&Address::derive("alice")), 1_000);
        assert_eq!(svc.token().total_supply(), 1_000);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ServiceConfig {
            max_commitment_age: 10,
            min_commitment_age: 10,
            ..ServiceConfig::default()
        };
        assert!(matches!(
            NameService::bootstrap(Address::derive("admin"), config, 0),
            Err(ServiceError::Config(ConfigError::CommitmentWindow { .. }))
        ));
    }

    #[test]
    fn failed_call_leaves_state_and_events_untouched() {
        let mut svc = service();
        svc.drain_events();
        let alice = Address::derive("alice");
        let err = svc
            .transfer(alice, 2_000, Address::derive("bob"), 5_000)
            .unwrap_err();
        assert_eq!(err.kind(), "token");
        assert_eq!(svc.balance_of(&alice), 1_000);
        assert!(svc.drain_events().is_empty());

        svc.transfer(alice, 2_000, Address::derive("bob"), 400).unwrap();
        assert_eq!(svc.balance_of(&alice), 600);
        assert_eq!(svc.drain_events().len(), 1);
    }

    #[test]
    fn state_survives_bincode() {
        let svc = service();
        let bytes = bincode::serialize(&svc).unwrap();
        let restored: NameService = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored.balance_of(&Address::derive("alice")), 1_000);
        assert_eq!(restored.registrar().address(), svc.registrar().address());
    }
}
