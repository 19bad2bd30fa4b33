//! # Registry
//!
//! The flat node table every other component builds on: node -> owner,
//! resolver, ttl. Child nodes are addressed by `parent.child(label_hash)`;
//! the registry never stores the parent link.
//!
//! ## Authorization
//!
//! A node is mutable by its owner or by an operator the owner approved with
//! [`Registry::set_approval_for_all`]. Subnode creation authorizes against
//! the parent.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use fns_protocol::{Address, LabelHash, Node};

use crate::context::CallContext;
use crate::events::Event;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{caller} is not authorized on node {node}")]
    Unauthorized { node: Node, caller: Address },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub owner: Address,
    pub resolver: Address,
    pub ttl: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    address: Address,
    records: HashMap<Node, Record>,
    /// owner -> operators allowed to act on all of the owner's nodes.
    operators: HashMap<Address, HashSet<Address>>,
}

impl Registry {
    /// A registry whose root node belongs to `root_owner`.
    pub fn new(root_owner: Address) -> Self {
        let mut records = HashMap::new();
        records.insert(
            Node::ROOT,
            Record {
                owner: root_owner,
                ..Record::default()
            },
        );
        Self {
            address: Address::derive("registry"),
            records,
            operators: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    // -- Mutators -----------------------------------------------------------

    pub fn set_owner(
        &mut self,
        ctx: &mut CallContext<'_>,
        node: Node,
        owner: Address,
    ) -> Result<(), RegistryError> {
        self.authorize(node, ctx.caller)?;
        self.records.entry(node).or_default().owner = owner;
        ctx.emit(Event::Transfer { node, owner });
        Ok(())
    }

    /// Assigns `parent.child(label)` to `owner`; returns the child node.
    pub fn set_subnode_owner(
        &mut self,
        ctx: &mut CallContext<'_>,
        parent: Node,
        label: LabelHash,
        owner: Address,
    ) -> Result<Node, RegistryError> {
        self.authorize(parent, ctx.caller)?;
        let node = parent.child(&label);
        self.records.entry(node).or_default().owner = owner;
        ctx.emit(Event::NewOwner {
            node: parent,
            label,
            owner,
        });
        Ok(node)
    }

    pub fn set_resolver(
        &mut self,
        ctx: &mut CallContext<'_>,
        node: Node,
        resolver: Address,
    ) -> Result<(), RegistryError> {
        self.authorize(node, ctx.caller)?;
        self.records.entry(node).or_default().resolver = resolver;
        ctx.emit(Event::NewResolver { node, resolver });
        Ok(())
    }

    pub fn set_ttl(
        &mut self,
        ctx: &mut CallContext<'_>,
        node: Node,
        ttl: u64,
    ) -> Result<(), RegistryError> {
        self.authorize(node, ctx.caller)?;
        self.records.entry(node).or_default().ttl = ttl;
        ctx.emit(Event::NewTtl { node, ttl });
        Ok(())
    }

    pub fn set_record(
        &mut self,
        ctx: &mut CallContext<'_>,
        node: Node,
        owner: Address,
        resolver: Address,
        ttl: u64,
    ) -> Result<(), RegistryError> {
        self.set_owner(ctx, node, owner)?;
        self.set_resolver_and_ttl(ctx, node, resolver, ttl);
        Ok(())
    }

    pub fn set_subnode_record(
        &mut self,
        ctx: &mut CallContext<'_>,
        parent: Node,
        label: LabelHash,
        owner: Address,
        resolver: Address,
        ttl: u64,
    ) -> Result<Node, RegistryError> {
        let node = self.set_subnode_owner(ctx, parent, label, owner)?;
        self.set_resolver_and_ttl(ctx, node, resolver, ttl);
        Ok(node)
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

    // Authorization was already checked by the owner write that precedes
    // this; the new owner may not be the caller any more.
    fn set_resolver_and_ttl(
        &mut self,
        ctx: &mut CallContext<'_>,
        node: Node,
        resolver: Address,
        ttl: u64,
    ) {
        let record = self.records.entry(node).or_default();
        if record.resolver != resolver {
            record.resolver = resolver;
            ctx.emit(Event::NewResolver { node, resolver });
        }
        if record.ttl != ttl {
            record.ttl = ttl;
            ctx.emit(Event::NewTtl { node, ttl });
        }
    }

    // -- Reads --------------------------------------------------------------

    pub fn owner(&self, node: &Node) -> Address {
        self.records.get(node).map(|r| r.owner).unwrap_or(Address::ZERO)
    }

    pub fn resolver(&self, node: &Node) -> Address {
        self.records
            .get(node)
            .map(|r| r.resolver)
            .unwrap_or(Address::ZERO)
    }

    pub fn ttl(&self, node: &Node) -> u64 {
        self.records.get(node).map(|r| r.ttl).unwrap_or(0)
    }

    pub fn record(&self, node: &Node) -> Option<&Record> {
        self.records.get(node)
    }

    pub fn record_exists(&self, node: &Node) -> bool {
        self.owner(node) != Address::ZERO
    }

    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.operators
            .get(owner)
            .is_some_and(|set| set.contains(operator))
    }

    /// Owner or approved operator.
    pub fn is_authorized(&self, node: &Node, caller: &Address) -> bool {
        let owner = self.owner(node);
        owner != Address::ZERO && (owner == *caller || self.is_approved_for_all(&owner, caller))
    }

    fn authorize(&self, node: Node, caller: Address) -> Result<(), RegistryError> {
        if self.is_authorized(&node, &caller) {
            Ok(())
        } else {
            Err(RegistryError::Unauthorized { node, caller })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fns_protocol::name::{labelhash, namehash};

    fn who(tag: &str) -> Address {
        Address::derive(tag)
    }

    #[test]
    fn root_belongs_to_the_deployer() {
        let registry = Registry::new(who("root"));
        assert_eq!(registry.owner(&Node::ROOT), who("root"));
        assert!(registry.record_exists(&Node::ROOT));
        assert!(!registry.record_exists(&namehash("frax")));
    }

    #[test]
    fn subnode_owner_creates_child() {
        let mut registry = Registry::new(who("root"));
        let mut events = Vec::new();
        let mut ctx = CallContext::new(who("root"), 0, &mut events);
        let node = registry
            .set_subnode_owner(&mut ctx, Node::ROOT, labelhash("frax"), who("registrar"))
            .unwrap();
        assert_eq!(node, namehash("frax"));
        assert_eq!(registry.owner(&node), who("registrar"));
        assert!(matches!(events[0], Event::NewOwner { .. }));
    }

    #[test]
    fn only_owner_can_mutate() {
        let mut registry = Registry::new(who("root"));
        let mut events = Vec::new();
        let mut ctx = CallContext::new(who("mallory"), 0, &mut events);
        let err = registry
            .set_resolver(&mut ctx, Node::ROOT, who("resolver"))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Unauthorized {
                node: Node::ROOT,
                caller: who("mallory"),
            }
        );
        assert_eq!(registry.resolver(&Node::ROOT), Address::ZERO);
        assert!(events.is_empty());
    }

    #[test]
    fn operator_acts_for_owner() {
        let mut registry = Registry::new(who("root"));
        let mut events = Vec::new();
        {
            let mut ctx = CallContext::new(who("root"), 0, &mut events);
            registry.set_approval_for_all(&mut ctx, who("operator"), true);
        }
        let mut ctx = CallContext::new(who("operator"), 0, &mut events);
        registry.set_ttl(&mut ctx, Node::ROOT, 300).unwrap();
        assert_eq!(registry.ttl(&Node::ROOT), 300);
        assert!(registry.is_approved_for_all(&who("root"), &who("operator")));
    }

    #[test]
    fn set_record_hands_over_and_configures() {
        let mut registry = Registry::new(who("root"));
        let mut events = Vec::new();
        let mut ctx = CallContext::new(who("root"), 0, &mut events);
        let node = registry
            .set_subnode_record(
                &mut ctx,
                Node::ROOT,
                labelhash("frax"),
                who("alice"),
                who("resolver"),
                60,
            )
            .unwrap();
        assert_eq!(
            registry.record(&node),
            Some(&Record {
                owner: who("alice"),
                resolver: who("resolver"),
                ttl: 60,
            })
        );
        // Root no longer owns the child.
        assert!(registry.set_owner(&mut ctx, node, who("bob")).is_err());
    }

    #[test]
    fn zero_owner_is_not_authorized() {
        let mut registry = Registry::new(who("root"));
        let mut events = Vec::new();
        let mut ctx = CallContext::new(Address::ZERO, 0, &mut events);
        assert!(registry
            .set_owner(&mut ctx, namehash("nobody"), Address::ZERO)
            .is_err());
    }
}
