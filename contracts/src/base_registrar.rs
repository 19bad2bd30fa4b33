//! # Expiring Registrar
//!
//! Issues one time-bound ownership token per label under a single base node
//! (`frax`). The token id is the label hash.
//!
//! ## Lifecycle
//!
//! ```text
//!   register            expiry              expiry + grace
//!      |------ live -------|------ grace --------|------ available ------>
//!        owner_of = owner     owner_of = owner      owner_of = ZERO
//!        transferable         renewable only        registrable by anyone
//! ```
//!
//! Only allow-listed controllers may register or renew. Renewal extends the
//! stored expiry by exactly the requested duration; it never resets it to
//! `now + duration`.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use fns_protocol::{Address, LabelHash, Node};

use crate::context::CallContext;
use crate::events::Event;
use crate::registry::{Registry, RegistryError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrarError {
    /// The registrar does not own its base node in the registry.
    #[error("registrar is not live")]
    NotLive,

    #[error("label {0} is not available")]
    NameNotAvailable(LabelHash),

    #[error("label {0} has expired")]
    NameExpired(LabelHash),

    #[error("{caller} is not authorized for this registrar operation")]
    Unauthorized { caller: Address },

    #[error("cannot register a label to the zero address")]
    ZeroOwner,

    #[error("expiry arithmetic overflows for duration {0}")]
    DurationOverflow(u64),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// ---------------------------------------------------------------------------
// BaseRegistrar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseRegistrar {
    address: Address,
    admin: Address,
    base_node: Node,
    grace_period: u64,
    expiries: HashMap<LabelHash, u64>,
    owners: HashMap<LabelHash, Address>,
    token_approvals: HashMap<LabelHash, Address>,
    operators: HashMap<Address, HashSet<Address>>,
    controllers: HashSet<Address>,
}

impl BaseRegistrar {
    pub fn new(admin: Address, base_node: Node, grace_period: u64) -> Self {
        Self {
            address: Address::derive("registrar"),
            admin,
            base_node,
            grace_period,
            expiries: HashMap::new(),
            owners: HashMap::new(),
            token_approvals: HashMap::new(),
            operators: HashMap::new(),
            controllers: HashSet::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn base_node(&self) -> Node {
        self.base_node
    }

    pub fn grace_period(&self) -> u64 {
        self.grace_period
    }

    pub fn live(&self, registry: &Registry) -> bool {
        registry.owner(&self.base_node) == self.address
    }

    // -- Administration -----------------------------------------------------

    pub fn add_controller(
        &mut self,
        ctx: &mut CallContext<'_>,
        controller: Address,
    ) -> Result<(), RegistrarError> {
        self.only_admin(ctx)?;
        self.controllers.insert(controller);
        ctx.emit(Event::ControllerAdded { controller });
        Ok(())
    }

    pub fn remove_controller(
        &mut self,
        ctx: &mut CallContext<'_>,
        controller: Address,
    ) -> Result<(), RegistrarError> {
        self.only_admin(ctx)?;
        self.controllers.remove(&controller);
        ctx.emit(Event::ControllerRemoved { controller });
        Ok(())
    }

    pub fn is_controller(&self, who: &Address) -> bool {
        self.controllers.contains(who)
    }

    /// Points the base node at a resolver.
    pub fn set_resolver(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        resolver: Address,
    ) -> Result<(), RegistrarError> {
        self.only_admin(ctx)?;
        registry.set_resolver(&mut ctx.call_as(self.address), self.base_node, resolver)?;
        Ok(())
    }

    // -- Reads --------------------------------------------------------------

    /// Expiry timestamp, 0 if never registered.
    pub fn name_expires(&self, id: &LabelHash) -> u64 {
        self.expiries.get(id).copied().unwrap_or(0)
    }

    /// True once the label is past expiry plus grace, or was never registered.
    pub fn available(&self, id: &LabelHash, now: u64) -> bool {
        match self.expiries.get(id) {
            Some(expiry) => expiry.saturating_add(self.grace_period) < now,
            None => true,
        }
    }

    /// Token owner; `Address::ZERO` once the label is past its grace period.
    pub fn owner_of(&self, id: &LabelHash, now: u64) -> Address {
        if self.available(id, now) {
            return Address::ZERO;
        }
        self.owners.get(id).copied().unwrap_or(Address::ZERO)
    }

    pub fn get_approved(&self, id: &LabelHash) -> Address {
        self.token_approvals
            .get(id)
            .copied()
            .unwrap_or(Address::ZERO)
    }

    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.operators
            .get(owner)
            .is_some_and(|set| set.contains(operator))
    }

    // -- Controller entry points --------------------------------------------

    /// Registers `id` to `owner` for `duration` seconds and points the
    /// registry subnode at `owner`. Returns the new expiry.
    pub fn register(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        id: LabelHash,
        owner: Address,
        duration: u64,
    ) -> Result<u64, RegistrarError> {
        self.only_controller(ctx)?;
        if owner == Address::ZERO {
            return Err(RegistrarError::ZeroOwner);
        }
        if !self.live(registry) {
            return Err(RegistrarError::NotLive);
        }
        if !self.available(&id, ctx.timestamp) {
            return Err(RegistrarError::NameNotAvailable(id));
        }
        let expiry = ctx
            .timestamp
            .checked_add(duration)
            .filter(|e| e.checked_add(self.grace_period).is_some())
            .ok_or(RegistrarError::DurationOverflow(duration))?;

        self.expiries.insert(id, expiry);
        self.owners.insert(id, owner);
        self.token_approvals.remove(&id);
        ctx.emit(Event::LabelRegistered {
            id,
            owner,
            expires: expiry,
        });

        registry.set_subnode_owner(&mut ctx.call_as(self.address), self.base_node, id, owner)?;
        tracing::debug!(%id, %owner, expiry, "label registered");
        Ok(expiry)
    }

    /// Extends a live or in-grace label by exactly `duration`.
    pub fn renew(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &Registry,
        id: LabelHash,
        duration: u64,
    ) -> Result<u64, RegistrarError> {
        self.only_controller(ctx)?;
        if !self.live(registry) {
            return Err(RegistrarError::NotLive);
        }
        let current = self.name_expires(&id);
        if !self.expiries.contains_key(&id)
            || current.saturating_add(self.grace_period) < ctx.timestamp
        {
            return Err(RegistrarError::NameExpired(id));
        }
        let expiry = current
            .checked_add(duration)
            .filter(|e| e.checked_add(self.grace_period).is_some())
            .ok_or(RegistrarError::DurationOverflow(duration))?;

        self.expiries.insert(id, expiry);
        ctx.emit(Event::LabelRenewed {
            id,
            expires: expiry,
        });
        Ok(expiry)
    }

    // -- Token holder entry points -------------------------------------------

    pub fn approve(
        &mut self,
        ctx: &mut CallContext<'_>,
        to: Address,
        id: LabelHash,
    ) -> Result<(), RegistrarError> {
        let owner = self.live_owner(&id, ctx.timestamp)?;
        if ctx.caller != owner && !self.is_approved_for_all(&owner, &ctx.caller) {
            return Err(RegistrarError::Unauthorized { caller: ctx.caller });
        }
        self.token_approvals.insert(id, to);
        ctx.emit(Event::LabelApproved {
            id,
            owner,
            approved: to,
        });
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

    /// Moves the token. The registry subnode owner is left alone; the new
    /// holder calls [`BaseRegistrar::reclaim`] to take it.
    pub fn transfer_from(
        &mut self,
        ctx: &mut CallContext<'_>,
        from: Address,
        to: Address,
        id: LabelHash,
    ) -> Result<(), RegistrarError> {
        if !self.is_approved_or_owner(&ctx.caller, &id, ctx.timestamp)? {
            return Err(RegistrarError::Unauthorized { caller: ctx.caller });
        }
        let owner = self.live_owner(&id, ctx.timestamp)?;
        if owner != from || to == Address::ZERO {
            return Err(RegistrarError::Unauthorized { caller: ctx.caller });
        }
        self.owners.insert(id, to);
        self.token_approvals.remove(&id);
        ctx.emit(Event::LabelTransferred { id, from, to });
        Ok(())
    }

    /// Re-points the registry subnode for a token the caller controls.
    pub fn reclaim(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        id: LabelHash,
        owner: Address,
    ) -> Result<(), RegistrarError> {
        if !self.live(registry) {
            return Err(RegistrarError::NotLive);
        }
        if !self.is_approved_or_owner(&ctx.caller, &id, ctx.timestamp)? {
            return Err(RegistrarError::Unauthorized { caller: ctx.caller });
        }
        registry.set_subnode_owner(&mut ctx.call_as(self.address), self.base_node, id, owner)?;
        Ok(())
    }

    // -- Helpers ------------------------------------------------------------

    /// Owner of a token that has not reached its expiry.
    fn live_owner(&self, id: &LabelHash, now: u64) -> Result<Address, RegistrarError> {
        if self.name_expires(id) <= now {
            return Err(RegistrarError::NameExpired(*id));
        }
        Ok(self.owners.get(id).copied().unwrap_or(Address::ZERO))
    }

    fn is_approved_or_owner(
        &self,
        spender: &Address,
        id: &LabelHash,
        now: u64,
    ) -> Result<bool, RegistrarError> {
        let owner = self.live_owner(id, now)?;
        Ok(*spender == owner
            || self.get_approved(id) == *spender
            || self.is_approved_for_all(&owner, spender))
    }

    fn only_admin(&self, ctx: &CallContext<'_>) -> Result<(), RegistrarError> {
        if ctx.caller == self.admin {
            Ok(())
        } else {
            Err(RegistrarError::Unauthorized { caller: ctx.caller })
        }
    }

    fn only_controller(&self, ctx: &CallContext<'_>) -> Result<(), RegistrarError> {
        if self.is_controller(&ctx.caller) {
            Ok(())
        } else {
            Err(RegistrarError::Unauthorized { caller: ctx.caller })
        }
    }
}
