//! # Root
//!
//! Holds the registry root node. The administrator decides which accounts
//! may hand out top-level labels, and can lock a TLD so its owner is frozen
//! for good.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use fns_protocol::{Address, LabelHash, Node};

use crate::context::CallContext;
use crate::events::Event;
use crate::registry::{Registry, RegistryError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RootError {
    #[error("{caller} is not authorized on the root")]
    Unauthorized { caller: Address },

    #[error("top-level label {0} is locked")]
    Locked(LabelHash),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Root {
    address: Address,
    admin: Address,
    controllers: HashSet<Address>,
    locked: HashSet<LabelHash>,
}

impl Root {
    pub fn new(admin: Address) -> Self {
        Self {
            address: Address::derive("root"),
            admin,
            controllers: HashSet::new(),
            locked: HashSet::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn is_controller(&self, who: &Address) -> bool {
        self.controllers.contains(who)
    }

    pub fn is_locked(&self, label: &LabelHash) -> bool {
        self.locked.contains(label)
    }

    pub fn set_controller(
        &mut self,
        ctx: &mut CallContext<'_>,
        controller: Address,
        enabled: bool,
    ) -> Result<(), RootError> {
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

    /// Assigns a top-level label. Controllers only; locked labels are frozen.
    pub fn set_subnode_owner(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        label: LabelHash,
        owner: Address,
    ) -> Result<Node, RootError> {
        if !self.is_controller(&ctx.caller) {
            return Err(RootError::Unauthorized { caller: ctx.caller });
        }
        if self.is_locked(&label) {
            return Err(RootError::Locked(label));
        }
        let node = registry.set_subnode_owner(&mut ctx.call_as(self.address), Node::ROOT, label, owner)?;
        Ok(node)
    }

    pub fn lock(&mut self, ctx: &mut CallContext<'_>, label: LabelHash) -> Result<(), RootError> {
        self.only_admin(ctx)?;
        self.locked.insert(label);
        ctx.emit(Event::TldLocked { label });
        Ok(())
    }

    fn only_admin(&self, ctx: &CallContext<'_>) -> Result<(), RootError> {
        if ctx.caller == self.admin {
            Ok(())
        } else {
            Err(RootError::Unauthorized { caller: ctx.caller })
        }
    }
}
