//! # Resolvers
//!
//! Record storage for nodes: address, text and contenthash records plus the
//! reverse `name` record. The controller never writes records itself; it
//! hands a batch of [`RecordCall`]s to a resolver's
//! `multicall_with_node_check`, which validates the whole batch before
//! applying any of it.
//!
//! A [`ResolverDirectory`] maps resolver addresses to live resolvers, so an
//! address named in a registration that is not a resolver fails cleanly.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use fns_protocol::{Address, Node};

use crate::context::CallContext;
use crate::events::Event;
use crate::name_wrapper::NameWrapper;
use crate::registry::Registry;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverError {
    #[error("{caller} may not edit records of {node}")]
    Unauthorized { node: Node, caller: Address },

    #[error("record call targets {found}, expected {expected}")]
    NodeMismatch { expected: Node, found: Node },

    #[error("{0} is not a resolver")]
    NotAResolver(Address),
}

// ---------------------------------------------------------------------------
// Record calls
// ---------------------------------------------------------------------------

/// One record update. Part of a registration's commitment pre-image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCall {
    SetAddr { node: Node, addr: Address },
    SetText { node: Node, key: String, value: String },
    SetContenthash { node: Node, hash: Vec<u8> },
}

impl RecordCall {
    pub fn node(&self) -> Node {
        match self {
            RecordCall::SetAddr { node, .. }
            | RecordCall::SetText { node, .. }
            | RecordCall::SetContenthash { node, .. } => *node,
        }
    }

    /// Canonical byte encoding: a selector byte, the node, then the
    /// length-prefixed arguments.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        match self {
            RecordCall::SetAddr { node, addr } => {
                out.push(0x01);
                out.extend_from_slice(node.as_bytes());
                out.extend_from_slice(addr.as_bytes());
            }
            RecordCall::SetText { node, key, value } => {
                out.push(0x02);
                out.extend_from_slice(node.as_bytes());
                push_prefixed(&mut out, key.as_bytes());
                push_prefixed(&mut out, value.as_bytes());
            }
            RecordCall::SetContenthash { node, hash } => {
                out.push(0x03);
                out.extend_from_slice(node.as_bytes());
                push_prefixed(&mut out, hash);
            }
        }
        out
    }
}

fn push_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
    out.extend_from_slice(bytes);
}

// ---------------------------------------------------------------------------
// Authority
// ---------------------------------------------------------------------------

/// Read-only view a resolver uses to decide who controls a node.
pub struct Authority<'a> {
    pub registry: &'a Registry,
    pub wrapper: &'a NameWrapper,
    pub now: u64,
}

impl Authority<'_> {
    /// Effective owner: the wrapped owner when the wrapper holds the node.
    pub fn owner(&self, node: &Node) -> Address {
        let owner = self.registry.owner(node);
        if owner == self.wrapper.address() {
            self.wrapper.owner_of(node, self.now)
        } else {
            owner
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

pub trait Resolver {
    fn address(&self) -> Address;

    /// Applies `calls` in order after checking every one targets `node`.
    fn multicall_with_node_check(
        &mut self,
        ctx: &mut CallContext<'_>,
        authority: &Authority<'_>,
        node: Node,
        calls: &[RecordCall],
    ) -> Result<(), ResolverError>;

    fn set_name(
        &mut self,
        ctx: &mut CallContext<'_>,
        authority: &Authority<'_>,
        node: Node,
        name: &str,
    ) -> Result<(), ResolverError>;

    fn addr(&self, node: &Node) -> Option<Address>;
    fn text(&self, node: &Node, key: &str) -> Option<&str>;
    fn contenthash(&self, node: &Node) -> Option<&[u8]>;
    fn name(&self, node: &Node) -> Option<&str>;
}

pub trait ResolverDirectory {
    fn resolver(&self, address: &Address) -> Option<&dyn Resolver>;
    fn resolver_mut(&mut self, address: &Address) -> Option<&mut dyn Resolver>;

    fn require_mut(&mut self, address: &Address) -> Result<&mut dyn Resolver, ResolverError> {
        self.resolver_mut(address)
            .ok_or(ResolverError::NotAResolver(*address))
    }
}

// ---------------------------------------------------------------------------
// PublicResolver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicResolver {
    address: Address,
    /// Writes from these two are trusted without an ownership check.
    trusted_controller: Address,
    trusted_reverse_registrar: Address,
    addrs: HashMap<Node, Address>,
    texts: HashMap<Node, HashMap<String, String>>,
    contenthashes: HashMap<Node, Vec<u8>>,
    names: HashMap<Node, String>,
    operators: HashMap<Address, HashSet<Address>>,
}

impl PublicResolver {
    pub fn new(address: Address, trusted_controller: Address, trusted_reverse_registrar: Address) -> Self {
        Self {
            address,
            trusted_controller,
            trusted_reverse_registrar,
            addrs: HashMap::new(),
            texts: HashMap::new(),
            contenthashes: HashMap::new(),
            names: HashMap::new(),
            operators: HashMap::new(),
        }
    }

    pub fn set_approval_for_all(&mut self, ctx: &mut CallContext<'_>, operator: Address, approved: bool) {
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

    fn is_authorized(&self, authority: &Authority<'_>, node: &Node, caller: &Address) -> bool {
        if *caller == self.trusted_controller || *caller == self.trusted_reverse_registrar {
            return true;
        }
        let owner = authority.owner(node);
        owner != Address::ZERO
            && (owner == *caller
                || self
                    .operators
                    .get(&owner)
                    .is_some_and(|set| set.contains(caller)))
    }

    fn authorize(&self, authority: &Authority<'_>, node: Node, caller: Address) -> Result<(), ResolverError> {
        if self.is_authorized(authority, &node, &caller) {
            Ok(())
        } else {
            Err(ResolverError::Unauthorized { node, caller })
        }
    }

    fn apply(&mut self, ctx: &mut CallContext<'_>, call: &RecordCall) {
        match call {
            RecordCall::SetAddr { node, addr } => {
                self.addrs.insert(*node, *addr);
                ctx.emit(Event::AddrChanged {
                    node: *node,
                    addr: *addr,
                });
            }
            RecordCall::SetText { node, key, value } => {
                self.texts
                    .entry(*node)
                    .or_default()
                    .insert(key.clone(), value.clone());
                ctx.emit(Event::TextChanged {
                    node: *node,
                    key: key.clone(),
                    value: value.clone(),
                });
            }
            RecordCall::SetContenthash { node, hash } => {
                self.contenthashes.insert(*node, hash.clone());
                ctx.emit(Event::ContenthashChanged {
                    node: *node,
                    hash: hash.clone(),
                });
            }
        }
    }
}

impl Resolver for PublicResolver {
    fn address(&self) -> Address {
        self.address
    }

    fn multicall_with_node_check(
        &mut self,
        ctx: &mut CallContext<'_>,
        authority: &Authority<'_>,
        node: Node,
        calls: &[RecordCall],
    ) -> Result<(), ResolverError> {
        if let Some(stray) = calls.iter().find(|c| c.node() != node) {
            return Err(ResolverError::NodeMismatch {
                expected: node,
                found: stray.node(),
            });
        }
        self.authorize(authority, node, ctx.caller)?;
        for call in calls {
            self.apply(ctx, call);
        }
        Ok(())
    }

    fn set_name(
        &mut self,
        ctx: &mut CallContext<'_>,
        authority: &Authority<'_>,
        node: Node,
        name: &str,
    ) -> Result<(), ResolverError> {
        self.authorize(authority, node, ctx.caller)?;
        self.names.insert(node, name.to_string());
        ctx.emit(Event::NameChanged {
            node,
            name: name.to_string(),
        });
        Ok(())
    }

    fn addr(&self, node: &Node) -> Option<Address> {
        self.addrs.get(node).copied()
    }

    fn text(&self, node: &Node, key: &str) -> Option<&str> {
        self.texts
            .get(node)
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }

    fn contenthash(&self, node: &Node) -> Option<&[u8]> {
        self.contenthashes.get(node).map(Vec::as_slice)
    }

    fn name(&self, node: &Node) -> Option<&str> {
        self.names.get(node).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// ResolverSet
// ---------------------------------------------------------------------------

/// The resolvers deployed in one name service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverSet {
    resolvers: HashMap<Address, PublicResolver>,
}

impl ResolverSet {
    pub fn insert(&mut self, resolver: PublicResolver) {
        self.resolvers.insert(resolver.address(), resolver);
    }

    pub fn get(&self, address: &Address) -> Option<&PublicResolver> {
        self.resolvers.get(address)
    }

    pub fn get_mut(&mut self, address: &Address) -> Option<&mut PublicResolver> {
        self.resolvers.get_mut(address)
    }
}

impl ResolverDirectory for ResolverSet {
    fn resolver(&self, address: &Address) -> Option<&dyn Resolver> {
        self.resolvers.get(address).map(|r| r as &dyn Resolver)
    }

    fn resolver_mut(&mut self, address: &Address) -> Option<&mut dyn Resolver> {
        self.resolvers
            .get_mut(address)
            .map(|r| r as &mut dyn Resolver)
    }
}
