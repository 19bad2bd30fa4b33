//! # Name Wrapper
//!
//! Wraps registry nodes so that control can be delegated under a fuse set.
//! A wrapped node is owned by the wrapper in the registry (and, for base
//! names, in the registrar too); the wrapper keeps its own record of the
//! real owner, the burned fuses and an expiry.
//!
//! ## Fuse rules
//!
//! - Fuses are only ever ORed in ([`Fuses::burn`]).
//! - Burning any owner-controlled fuse other than `PARENT_CANNOT_CONTROL`
//!   requires `PARENT_CANNOT_CONTROL | CANNOT_UNWRAP` in the resulting set,
//!   otherwise the burn could be undone by unwrapping or by the parent.
//! - A parent may burn `PARENT_CANNOT_CONTROL` (or any parent-controlled
//!   fuse) on a child only after burning `CANNOT_UNWRAP` on itself.
//! - Once a child has `PARENT_CANNOT_CONTROL`, the parent can neither
//!   reassign it nor change its fuses.
//!
//! ## Expiry
//!
//! Base names expire at registrar expiry + grace. [`NameWrapper::get_data`]
//! reads an expired record with empty fuses, and with a zero owner if
//! `PARENT_CANNOT_CONTROL` had been burned. The stored record is untouched;
//! this read-side normalization is the only way fuses ever disappear.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use fns_protocol::name::join;
use fns_protocol::{Address, LabelHash, Node};

use crate::base_registrar::{BaseRegistrar, RegistrarError};
use crate::context::CallContext;
use crate::events::Event;
use crate::fuses::Fuses;
use crate::registry::{Registry, RegistryError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WrapperError {
    #[error("{caller} is not authorized on node {node}")]
    Unauthorized { node: Node, caller: Address },

    #[error("only the wrapper administrator may do this, not {caller}")]
    AdminOnly { caller: Address },

    #[error("only a wrapper controller may do this, not {caller}")]
    ControllerOnly { caller: Address },

    #[error("operation on {node} prohibited by fuse {fuse}")]
    OperationProhibited { node: Node, fuse: Fuses },

    #[error("fuses {0} cannot be set here")]
    InvalidFuses(Fuses),

    #[error("node {0} is not wrapped")]
    NotWrapped(Node),

    #[error("node {0} is already wrapped")]
    AlreadyWrapped(Node),

    #[error("{0} cannot own a wrapped name")]
    InvalidTargetOwner(Address),

    #[error("expiry overflow")]
    Overflow,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Registrar(#[from] RegistrarError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedName {
    pub owner: Address,
    pub fuses: Fuses,
    pub expiry: u64,
    /// Dotted name, e.g. `alice.frax`.
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameWrapper {
    address: Address,
    admin: Address,
    base_node: Node,
    base_name: String,
    grace_period: u64,
    controllers: HashSet<Address>,
    names: HashMap<Node, WrappedName>,
    operators: HashMap<Address, HashSet<Address>>,
}

impl NameWrapper {
    pub fn new(admin: Address, base_name: &str, base_node: Node, grace_period: u64) -> Self {
        Self {
            address: Address::derive("wrapper"),
            admin,
            base_node,
            base_name: base_name.to_string(),
            grace_period,
            controllers: HashSet::new(),
            names: HashMap::new(),
            operators: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn set_controller(
        &mut self,
        ctx: &mut CallContext<'_>,
        controller: Address,
        enabled: bool,
    ) -> Result<(), WrapperError> {
        if ctx.caller != self.admin {
            return Err(WrapperError::AdminOnly { caller: ctx.caller });
        }
        if enabled {
            self.controllers.insert(controller);
        } else {
            self.controllers.remove(&controller);
        }
        ctx.emit(Event::WrapperControllerChanged {
            controller,
            enabled,
        });
        Ok(())
    }

    pub fn is_controller(&self, who: &Address) -> bool {
        self.controllers.contains(who)
    }

    // -- Reads --------------------------------------------------------------

    /// `(owner, fuses, expiry)` as seen at `now`.
    pub fn get_data(&self, node: &Node, now: u64) -> (Address, Fuses, u64) {
        let Some(record) = self.names.get(node) else {
            return (Address::ZERO, Fuses::NONE, 0);
        };
        let mut owner = record.owner;
        let mut fuses = record.fuses;
        if record.expiry < now {
            if fuses.contains(Fuses::PARENT_CANNOT_CONTROL) {
                owner = Address::ZERO;
            }
            fuses = Fuses::NONE;
        }
        (owner, fuses, record.expiry)
    }

    pub fn owner_of(&self, node: &Node, now: u64) -> Address {
        self.get_data(node, now).0
    }

    pub fn is_wrapped(&self, node: &Node, now: u64) -> bool {
        self.owner_of(node, now) != Address::ZERO
    }

    pub fn name(&self, node: &Node) -> Option<&str> {
        self.names.get(node).map(|r| r.name.as_str())
    }

    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.operators
            .get(owner)
            .is_some_and(|set| set.contains(operator))
    }

    /// Owner or operator, and not a base name sitting in its grace period.
    pub fn can_modify_name(&self, node: &Node, addr: &Address, now: u64) -> bool {
        let (owner, fuses, expiry) = self.get_data(node, now);
        owner != Address::ZERO
            && (owner == *addr || self.is_approved_for_all(&owner, addr))
            && !self.in_grace(fuses, expiry, now)
    }

    fn in_grace(&self, fuses: Fuses, expiry: u64, now: u64) -> bool {
        fuses.contains(Fuses::IS_BASE_NAME) && expiry.saturating_sub(self.grace_period) < now
    }

    // -- Base names ---------------------------------------------------------

    /// Registers `label` through the registrar with the wrapper as token
    /// holder and wraps it for `owner`. Controllers only. Returns the
    /// registrar expiry.
    #[allow(clippy::too_many_arguments)]
    pub fn wrap_and_register(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        registrar: &mut BaseRegistrar,
        label: &str,
        owner: Address,
        duration: u64,
        resolver: Address,
        owner_fuses: u16,
    ) -> Result<u64, WrapperError> {
        if !self.is_controller(&ctx.caller) {
            return Err(WrapperError::ControllerOnly { caller: ctx.caller });
        }
        self.check_target_owner(owner)?;
        let id = LabelHash::of(label);
        let registrar_expiry =
            registrar.register(&mut ctx.call_as(self.address), registry, id, self.address, duration)?;
        self.wrap_base_name(
            ctx,
            registry,
            label,
            owner,
            Fuses::from_owner_bits(owner_fuses),
            registrar_expiry,
            resolver,
        )?;
        Ok(registrar_expiry)
    }

    /// Wraps an already registered base name. The registrant must have
    /// approved the wrapper on the registrar beforehand.
    #[allow(clippy::too_many_arguments)]
    pub fn wrap(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        registrar: &mut BaseRegistrar,
        label: &str,
        wrapped_owner: Address,
        owner_fuses: u16,
        resolver: Address,
    ) -> Result<Node, WrapperError> {
        let id = LabelHash::of(label);
        let node = self.base_node.child(&id);
        let registrant = registrar.owner_of(&id, ctx.timestamp);
        if ctx.caller != registrant && !registrar.is_approved_for_all(&registrant, &ctx.caller) {
            return Err(WrapperError::Unauthorized {
                node,
                caller: ctx.caller,
            });
        }
        self.check_target_owner(wrapped_owner)?;

        let mut inner = ctx.call_as(self.address);
        registrar.transfer_from(&mut inner, registrant, self.address, id)?;
        registrar.reclaim(&mut inner, registry, id, self.address)?;
        let registrar_expiry = registrar.name_expires(&id);
        self.wrap_base_name(
            ctx,
            registry,
            label,
            wrapped_owner,
            Fuses::from_owner_bits(owner_fuses),
            registrar_expiry,
            resolver,
        )?;
        Ok(node)
    }

    /// Hands a base name back to `registrant` (token) and `controller`
    /// (registry node).
    pub fn unwrap(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        registrar: &mut BaseRegistrar,
        label_hash: LabelHash,
        registrant: Address,
        controller: Address,
    ) -> Result<(), WrapperError> {
        self.check_target_owner(registrant)?;
        let node = self.base_node.child(&label_hash);
        self.unwrap_node(ctx, registry, node, controller)?;
        registrar.transfer_from(
            &mut ctx.call_as(self.address),
            self.address,
            registrant,
            label_hash,
        )?;
        Ok(())
    }

    /// Unwraps a sub-name; the registry node goes to `controller`.
    pub fn unwrap_subname(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        parent: Node,
        label_hash: LabelHash,
        controller: Address,
    ) -> Result<(), WrapperError> {
        let node = parent.child(&label_hash);
        if parent == self.base_node {
            return Err(WrapperError::OperationProhibited {
                node,
                fuse: Fuses::IS_BASE_NAME,
            });
        }
        self.unwrap_node(ctx, registry, node, controller)
    }

    /// Registrar-driven expiry extension. Controllers only; fuses untouched.
    pub fn renew(
        &mut self,
        ctx: &mut CallContext<'_>,
        node: Node,
        duration: u64,
    ) -> Result<u64, WrapperError> {
        if !self.is_controller(&ctx.caller) {
            return Err(WrapperError::ControllerOnly { caller: ctx.caller });
        }
        let record = self
            .names
            .get_mut(&node)
            .ok_or(WrapperError::NotWrapped(node))?;
        let expiry = record
            .expiry
            .checked_add(duration)
            .ok_or(WrapperError::Overflow)?;
        record.expiry = expiry;
        ctx.emit(Event::ExpiryExtended { node, expiry });
        Ok(expiry)
    }

    // -- Fuses --------------------------------------------------------------

    /// Burns owner-controlled fuses on a name the caller controls.
    pub fn set_fuses(
        &mut self,
        ctx: &mut CallContext<'_>,
        node: Node,
        owner_fuses: u16,
    ) -> Result<Fuses, WrapperError> {
        let requested = Fuses::from_owner_bits(owner_fuses);
        if requested.contains(Fuses::PARENT_CANNOT_CONTROL) {
            return Err(WrapperError::InvalidFuses(requested));
        }
        self.only_token_owner(node, ctx)?;
        let (owner, old, expiry) = self.get_data(&node, ctx.timestamp);
        if old.contains(Fuses::CANNOT_BURN_FUSES) {
            return Err(WrapperError::OperationProhibited {
                node,
                fuse: Fuses::CANNOT_BURN_FUSES,
            });
        }
        let fuses = old.burn(requested);
        if !requested.is_empty() && !fuses.contains(Fuses::PARENT_CANNOT_CONTROL) {
            return Err(WrapperError::OperationProhibited {
                node,
                fuse: Fuses::PARENT_CANNOT_CONTROL,
            });
        }
        self.store_fuses(ctx, node, owner, fuses, expiry, expiry)?;
        Ok(fuses)
    }

    /// The parent's owner burns fuses on, or extends the expiry of, a
    /// wrapped child.
    pub fn set_child_fuses(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &Registry,
        parent: Node,
        label_hash: LabelHash,
        fuses: Fuses,
        expiry: u64,
    ) -> Result<(), WrapperError> {
        let node = parent.child(&label_hash);
        Self::check_settable(fuses)?;
        let now = ctx.timestamp;
        let (owner, old_fuses, old_expiry) = self.get_data(&node, now);
        if owner == Address::ZERO || registry.owner(&node) != self.address {
            return Err(WrapperError::NotWrapped(node));
        }
        let (_, parent_fuses, max_expiry) = self.get_data(&parent, now);
        let authority = if parent == Node::ROOT { node } else { parent };
        if !self.can_modify_name(&authority, &ctx.caller, now) {
            return Err(WrapperError::Unauthorized {
                node: authority,
                caller: ctx.caller,
            });
        }
        Self::check_parent_fuses(node, fuses, parent_fuses)?;
        let expiry = normalize_expiry(expiry, old_expiry, max_expiry);
        if old_fuses.contains(Fuses::PARENT_CANNOT_CONTROL) && old_fuses.burn(fuses) != old_fuses {
            return Err(WrapperError::OperationProhibited {
                node,
                fuse: Fuses::PARENT_CANNOT_CONTROL,
            });
        }
        self.store_fuses(ctx, node, owner, old_fuses.burn(fuses), old_expiry, expiry)
    }

    // -- Sub-names ----------------------------------------------------------

    /// Creates or reassigns a wrapped sub-name of a wrapped parent.
    #[allow(clippy::too_many_arguments)]
    pub fn set_subnode_owner(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        parent: Node,
        label: &str,
        owner: Address,
        fuses: Fuses,
        expiry: u64,
    ) -> Result<Node, WrapperError> {
        let label_hash = LabelHash::of(label);
        let node = parent.child(&label_hash);
        let now = ctx.timestamp;
        Self::check_settable(fuses)?;
        self.only_token_owner(parent, ctx)?;

        let (_, parent_fuses, max_expiry) = self.get_data(&parent, now);
        if registry.owner(&node) == Address::ZERO {
            if parent_fuses.contains(Fuses::CANNOT_CREATE_SUBDOMAIN) {
                return Err(WrapperError::OperationProhibited {
                    node,
                    fuse: Fuses::CANNOT_CREATE_SUBDOMAIN,
                });
            }
        } else if self
            .get_data(&node, now)
            .1
            .contains(Fuses::PARENT_CANNOT_CONTROL)
        {
            return Err(WrapperError::OperationProhibited {
                node,
                fuse: Fuses::PARENT_CANNOT_CONTROL,
            });
        }
        Self::check_parent_fuses(node, fuses, parent_fuses)?;
        let (old_owner, old_fuses, old_expiry) = self.get_data(&node, now);
        let expiry = normalize_expiry(expiry, old_expiry, max_expiry);

        if old_owner == Address::ZERO {
            registry.set_subnode_owner(&mut ctx.call_as(self.address), parent, label_hash, self.address)?;
            let parent_name = self.name(&parent).unwrap_or_default().to_string();
            self.mint(ctx, node, join(label, &parent_name), owner, fuses, expiry)?;
        } else {
            self.store_fuses(ctx, node, old_owner, old_fuses.burn(fuses), old_expiry, expiry)?;
            if owner == Address::ZERO {
                self.unwrap_node_unchecked(ctx, registry, node, Address::ZERO)?;
            } else if owner != old_owner {
                self.move_token(ctx, node, old_owner, owner);
            }
        }
        Ok(node)
    }

    // -- Owner entry points -------------------------------------------------

    pub fn set_resolver(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        node: Node,
        resolver: Address,
    ) -> Result<(), WrapperError> {
        self.only_token_owner(node, ctx)?;
        self.operation_allowed(node, Fuses::CANNOT_SET_RESOLVER, ctx.timestamp)?;
        registry.set_resolver(&mut ctx.call_as(self.address), node, resolver)?;
        Ok(())
    }

    pub fn set_ttl(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        node: Node,
        ttl: u64,
    ) -> Result<(), WrapperError> {
        self.only_token_owner(node, ctx)?;
        self.operation_allowed(node, Fuses::CANNOT_SET_TTL, ctx.timestamp)?;
        registry.set_ttl(&mut ctx.call_as(self.address), node, ttl)?;
        Ok(())
    }

    pub fn safe_transfer_from(
        &mut self,
        ctx: &mut CallContext<'_>,
        from: Address,
        to: Address,
        node: Node,
    ) -> Result<(), WrapperError> {
        if ctx.caller != from && !self.is_approved_for_all(&from, &ctx.caller) {
            return Err(WrapperError::Unauthorized {
                node,
                caller: ctx.caller,
            });
        }
        if to == Address::ZERO {
            return Err(WrapperError::InvalidTargetOwner(to));
        }
        let (owner, _, _) = self.get_data(&node, ctx.timestamp);
        if owner != from {
            return Err(WrapperError::Unauthorized {
                node,
                caller: ctx.caller,
            });
        }
        self.operation_allowed(node, Fuses::CANNOT_TRANSFER, ctx.timestamp)?;
        if from != to {
            self.move_token(ctx, node, from, to);
        }
        Ok(())
    }

    pub fn set_approval_for_all(
        &mut self,
        ctx: &mut CallContext<'_>,
        operator: Address,
        approved: bool,
    ) {
        let owner = ctx.caller;
        let set = self.operators.entry(owner).or_default();
        if approved {
            set.insert(operator);
        } else {
            set.remove(&operator);
        }
        ctx.emit(Event::ApprovalForAll {
            contract: self.address,
            owner,
            operator,
            approved,
        });
    }

    // -- Internals ----------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn wrap_base_name(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        label: &str,
        owner: Address,
        owner_fuses: Fuses,
        registrar_expiry: u64,
        resolver: Address,
    ) -> Result<(), WrapperError> {
        let node = self.base_node.child(&LabelHash::of(label));
        let expiry = registrar_expiry
            .checked_add(self.grace_period)
            .ok_or(WrapperError::Overflow)?;
        let fuses = owner_fuses
            .burn(Fuses::PARENT_CANNOT_CONTROL)
            .burn(Fuses::IS_BASE_NAME);
        let name = join(label, &self.base_name);
        self.mint(ctx, node, name, owner, fuses, expiry)?;
        if resolver != Address::ZERO {
            registry.set_resolver(&mut ctx.call_as(self.address), node, resolver)?;
        }
        Ok(())
    }

    /// Writes a fresh wrapped record. Parent-controlled fuses and a later
    /// expiry from an unexpired previous record carry over.
    fn mint(
        &mut self,
        ctx: &mut CallContext<'_>,
        node: Node,
        name: String,
        owner: Address,
        mut fuses: Fuses,
        mut expiry: u64,
    ) -> Result<(), WrapperError> {
        let (old_owner, _, _) = self.get_data(&node, ctx.timestamp);
        if old_owner != Address::ZERO {
            return Err(WrapperError::AlreadyWrapped(node));
        }
        if let Some(old) = self.names.get(&node) {
            expiry = expiry.max(old.expiry);
            if old.expiry >= ctx.timestamp {
                fuses = fuses.burn(Fuses::from_bits(old.fuses.bits() & Fuses::PARENT_CONTROLLED));
            }
        }
        Self::check_burnable(node, fuses)?;
        self.names.insert(
            node,
            WrappedName {
                owner,
                fuses,
                expiry,
                name: name.clone(),
            },
        );
        tracing::debug!(%node, %owner, %fuses, expiry, "name wrapped");
        ctx.emit(Event::NameWrapped {
            node,
            name,
            owner,
            fuses,
            expiry,
        });
        Ok(())
    }

    fn unwrap_node(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        node: Node,
        controller: Address,
    ) -> Result<(), WrapperError> {
        self.check_target_owner(controller)?;
        self.only_token_owner(node, ctx)?;
        self.operation_allowed(node, Fuses::CANNOT_UNWRAP, ctx.timestamp)?;
        self.unwrap_node_unchecked(ctx, registry, node, controller)
    }

    fn unwrap_node_unchecked(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        node: Node,
        controller: Address,
    ) -> Result<(), WrapperError> {
        if let Some(record) = self.names.get_mut(&node) {
            record.owner = Address::ZERO;
        }
        ctx.emit(Event::NameUnwrapped {
            node,
            owner: controller,
        });
        registry.set_owner(&mut ctx.call_as(self.address), node, controller)?;
        Ok(())
    }

    fn store_fuses(
        &mut self,
        ctx: &mut CallContext<'_>,
        node: Node,
        owner: Address,
        fuses: Fuses,
        old_expiry: u64,
        expiry: u64,
    ) -> Result<(), WrapperError> {
        Self::check_burnable(node, fuses)?;
        let record = self
            .names
            .get_mut(&node)
            .ok_or(WrapperError::NotWrapped(node))?;
        record.owner = owner;
        record.fuses = fuses;
        record.expiry = expiry;
        ctx.emit(Event::FusesSet { node, fuses });
        if expiry > old_expiry {
            ctx.emit(Event::ExpiryExtended { node, expiry });
        }
        Ok(())
    }

    fn move_token(&mut self, ctx: &mut CallContext<'_>, node: Node, from: Address, to: Address) {
        if let Some(record) = self.names.get_mut(&node) {
            record.owner = to;
        }
        ctx.emit(Event::WrappedTransfer { node, from, to });
    }

    fn only_token_owner(&self, node: Node, ctx: &CallContext<'_>) -> Result<(), WrapperError> {
        if self.can_modify_name(&node, &ctx.caller, ctx.timestamp) {
            Ok(())
        } else {
            Err(WrapperError::Unauthorized {
                node,
                caller: ctx.caller,
            })
        }
    }

    fn operation_allowed(&self, node: Node, fuse: Fuses, now: u64) -> Result<(), WrapperError> {
        if self.get_data(&node, now).1.contains(fuse) {
            Err(WrapperError::OperationProhibited { node, fuse })
        } else {
            Ok(())
        }
    }

    fn check_target_owner(&self, owner: Address) -> Result<(), WrapperError> {
        if owner == Address::ZERO || owner == self.address {
            Err(WrapperError::InvalidTargetOwner(owner))
        } else {
            Ok(())
        }
    }

    fn check_settable(fuses: Fuses) -> Result<(), WrapperError> {
        if fuses.contains(Fuses::IS_BASE_NAME) {
            Err(WrapperError::InvalidFuses(fuses))
        } else {
            Ok(())
        }
    }

    fn check_burnable(node: Node, fuses: Fuses) -> Result<(), WrapperError> {
        let required = Fuses::PARENT_CANNOT_CONTROL | Fuses::CANNOT_UNWRAP;
        if fuses.has_restrictive_owner_bits() && !fuses.contains(required) {
            return Err(WrapperError::OperationProhibited {
                node,
                fuse: required,
            });
        }
        Ok(())
    }

    fn check_parent_fuses(node: Node, fuses: Fuses, parent_fuses: Fuses) -> Result<(), WrapperError> {
        let parent_controlled =
            fuses.has_parent_controlled() || fuses.contains(Fuses::PARENT_CANNOT_CONTROL);
        if parent_controlled && !parent_fuses.contains(Fuses::CANNOT_UNWRAP) {
            return Err(WrapperError::OperationProhibited {
                node,
                fuse: Fuses::CANNOT_UNWRAP,
            });
        }
        Ok(())
    }
}

/// Clamps a requested child expiry to the parent's and never below the old.
fn normalize_expiry(expiry: u64, old_expiry: u64, max_expiry: u64) -> u64 {
    expiry.min(max_expiry).max(old_expiry)
}
