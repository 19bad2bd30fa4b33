//! # Reverse Registrar
//!
//! Owns `addr.reverse` and hands out `<hex>.addr.reverse` nodes so an
//! address can point back at a primary name. The record itself lives in a
//! resolver's `name` slot.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use fns_protocol::name::{labelhash, namehash};
use fns_protocol::{Address, Node};

use crate::context::CallContext;
use crate::events::Event;
use crate::name_wrapper::NameWrapper;
use crate::registry::{Registry, RegistryError};
use crate::resolver::{Authority, ResolverDirectory, ResolverError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReverseError {
    #[error("{caller} may not manage the reverse record of {addr}")]
    Unauthorized { addr: Address, caller: Address },

    #[error("only the reverse registrar administrator may do this, not {caller}")]
    AdminOnly { caller: Address },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseRegistrar {
    address: Address,
    admin: Address,
    base_node: Node,
    default_resolver: Address,
    controllers: HashSet<Address>,
}

impl ReverseRegistrar {
    pub fn new(admin: Address, reverse_name: &str) -> Self {
        Self {
            address: Address::derive("reverse-registrar"),
            admin,
            base_node: namehash(reverse_name),
            default_resolver: Address::ZERO,
            controllers: HashSet::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn default_resolver(&self) -> Address {
        self.default_resolver
    }

    /// The reverse node of `addr`.
    pub fn node(&self, addr: &Address) -> Node {
        self.base_node.child(&labelhash(&addr.to_plain_hex()))
    }

    pub fn set_controller(
        &mut self,
        ctx: &mut CallContext<'_>,
        controller: Address,
        enabled: bool,
    ) -> Result<(), ReverseError> {
        self.only_admin(ctx)?;
        if enabled {
            self.controllers.insert(controller);
        } else {
            self.controllers.remove(&controller);
        }
        ctx.emit(Event::ControllerChanged {
            contract: self.address,
            controller,
            enabled,
        });
        Ok(())
    }

    pub fn set_default_resolver(
        &mut self,
        ctx: &mut CallContext<'_>,
        resolver: Address,
    ) -> Result<(), ReverseError> {
        self.only_admin(ctx)?;
        self.default_resolver = resolver;
        Ok(())
    }

    /// Takes the reverse node of `addr` for `owner` with `resolver` set.
    pub fn claim_for_addr(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        addr: Address,
        owner: Address,
        resolver: Address,
    ) -> Result<Node, ReverseError> {
        self.authorize(ctx, registry, addr)?;
        let label = labelhash(&addr.to_plain_hex());
        let node = registry.set_subnode_record(
            &mut ctx.call_as(self.address),
            self.base_node,
            label,
            owner,
            resolver,
            0,
        )?;
        ctx.emit(Event::ReverseClaimed { addr, node });
        Ok(node)
    }

    /// Claims the reverse node, writes `name` into `resolver`, then hands
    /// the node to `owner`.
    #[allow(clippy::too_many_arguments)]
    pub fn set_name_for_addr(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        resolvers: &mut dyn ResolverDirectory,
        wrapper: &NameWrapper,
        addr: Address,
        owner: Address,
        resolver: Address,
        name: &str,
    ) -> Result<Node, ReverseError> {
        let node = self.claim_for_addr(ctx, registry, addr, self.address, resolver)?;
        {
            let authority = Authority {
                registry: &*registry,
                wrapper,
                now: ctx.timestamp,
            };
            resolvers
                .require_mut(&resolver)?
                .set_name(&mut ctx.call_as(self.address), &authority, node, name)?;
        }
        registry.set_owner(&mut ctx.call_as(self.address), node, owner)?;
        Ok(node)
    }

    /// The caller's own reverse record through the default resolver.
    pub fn set_name(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        resolvers: &mut dyn ResolverDirectory,
        wrapper: &NameWrapper,
        name: &str,
    ) -> Result<Node, ReverseError> {
        let caller = ctx.caller;
        let resolver = self.default_resolver;
        self.set_name_for_addr(ctx, registry, resolvers, wrapper, caller, caller, resolver, name)
    }

    fn authorize(
        &self,
        ctx: &CallContext<'_>,
        registry: &Registry,
        addr: Address,
    ) -> Result<(), ReverseError> {
        let caller = ctx.caller;
        if caller == addr
            || self.controllers.contains(&caller)
            || registry.is_approved_for_all(&addr, &caller)
        {
            Ok(())
        } else {
            Err(ReverseError::Unauthorized { addr, caller })
        }
    }

    fn only_admin(&self, ctx: &CallContext<'_>) -> Result<(), ReverseError> {
        if ctx.caller == self.admin {
            Ok(())
        } else {
            Err(ReverseError::AdminOnly { caller: ctx.caller })
        }
    }
}
