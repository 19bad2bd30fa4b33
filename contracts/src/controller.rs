//! # Registration Controller
//!
//! Commit/reveal registration, renewal and fee withdrawal.
//!
//! ## Registration protocol
//!
//! ```text
//!   client                         controller
//!     | make_commitment(req) ----->  (pure hash)
//!     | commit(hash) ------------->  commitments[hash] = now
//!     |   ... wait min_commitment_age ..= max_commitment_age ...
//!     | register(req) ------------>  recompute hash, check age window,
//!     |                              validate, price, pull payment,
//!     |                              register or wrap, records, reverse
//! ```
//!
//! Every check runs before the first write; payment is pulled before the
//! registrar or wrapper is touched. Collaborators are borrowed one at a time
//! through [`Contracts`] and never get a handle back to the controller, so
//! no outbound call can re-enter it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use fns_protocol::crypto::hash::keccak256_concat;
use fns_protocol::name::{is_valid_label, join};
use fns_protocol::{Address, Hash32, LabelHash, Node};

use crate::base_registrar::{BaseRegistrar, RegistrarError};
use crate::context::CallContext;
use crate::events::Event;
use crate::fuses::Fuses;
use crate::name_wrapper::{NameWrapper, WrapperError};
use crate::payment_token::{PaymentLedger, TokenError};
use crate::price_oracle::{Price, PriceError, PriceFeed, PriceOracle};
use crate::registry::{Registry, RegistryError};
use crate::resolver::{Authority, RecordCall, ResolverDirectory, ResolverError};
use crate::reverse_registrar::{ReverseError, ReverseRegistrar};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("max commitment age must exceed min commitment age")]
    MaxCommitmentAgeTooLow,

    #[error("invalid label {0:?}")]
    InvalidLabel(String),

    #[error("name {0:?} is not available")]
    NameNotAvailable(String),

    #[error("a resolver is required when record data is supplied")]
    ResolverRequiredWhenDataSupplied,

    #[error("commitment {0} is still live")]
    UnexpiredCommitmentExists(Hash32),

    #[error("commitment {0} is too new")]
    CommitmentTooNew(Hash32),

    #[error("commitment {0} is too old or missing")]
    CommitmentTooOld(Hash32),

    #[error("duration {0} is too short")]
    DurationTooShort(u64),

    #[error("record call targets {found}, expected {expected}")]
    RecordNamehashMismatch { expected: Node, found: Node },

    #[error("resolver call failed: {0}")]
    ResolverCallFailed(#[from] ResolverError),

    #[error(transparent)]
    Payment(#[from] TokenError),

    #[error(transparent)]
    Price(#[from] PriceError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Registrar(#[from] RegistrarError),

    #[error(transparent)]
    Wrapper(#[from] WrapperError),

    #[error(transparent)]
    Reverse(#[from] ReverseError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything a registration commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub label: String,
    pub owner: Address,
    pub duration: u64,
    pub secret: Hash32,
    pub resolver: Address,
    pub data: Vec<RecordCall>,
    pub reverse_record: bool,
    /// Owner-controlled fuses. Zero registers without wrapping; anything
    /// else wraps with `CANNOT_UNWRAP` burned as well.
    pub owner_controlled_fuses: u16,
}

/// The collaborators one controller operation may touch.
pub struct Contracts<'a> {
    pub registry: &'a mut Registry,
    pub registrar: &'a mut BaseRegistrar,
    pub wrapper: &'a mut NameWrapper,
    pub token: &'a mut dyn PaymentLedger,
    pub feed: &'a dyn PriceFeed,
    pub resolvers: &'a mut dyn ResolverDirectory,
    pub reverse: &'a mut ReverseRegistrar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationController {
    address: Address,
    oracle: PriceOracle,
    base_node: Node,
    base_tld: String,
    min_commitment_age: u64,
    max_commitment_age: u64,
    min_registration_duration: u64,
    commitments: HashMap<Hash32, u64>,
}

impl RegistrationController {
    pub fn new(
        oracle: PriceOracle,
        base_tld: &str,
        base_node: Node,
        min_commitment_age: u64,
        max_commitment_age: u64,
        min_registration_duration: u64,
    ) -> Result<Self, ControllerError> {
        if max_commitment_age <= min_commitment_age {
            return Err(ControllerError::MaxCommitmentAgeTooLow);
        }
        Ok(Self {
            address: Address::derive("controller"),
            oracle,
            base_node,
            base_tld: base_tld.to_string(),
            min_commitment_age,
            max_commitment_age,
            min_registration_duration,
            commitments: HashMap::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn min_commitment_age(&self) -> u64 {
        self.min_commitment_age
    }

    pub fn max_commitment_age(&self) -> u64 {
        self.max_commitment_age
    }

    pub fn min_registration_duration(&self) -> u64 {
        self.min_registration_duration
    }

    pub fn oracle(&self) -> &PriceOracle {
        &self.oracle
    }

    // -- Reads --------------------------------------------------------------

    pub fn valid(label: &str) -> bool {
        is_valid_label(label)
    }

    pub fn available(&self, registrar: &BaseRegistrar, label: &str, now: u64) -> bool {
        Self::valid(label) && registrar.available(&LabelHash::of(label), now)
    }

    pub fn rent_price(
        &self,
        registrar: &BaseRegistrar,
        feed: &dyn PriceFeed,
        label: &str,
        duration: u64,
        now: u64,
    ) -> Result<Price, PriceError> {
        let expires = registrar.name_expires(&LabelHash::of(label));
        self.oracle.price(feed, label, expires, duration, now)
    }

    /// Timestamp of a stored commitment, 0 if none.
    pub fn commitments(&self, commitment: &Hash32) -> u64 {
        self.commitments.get(commitment).copied().unwrap_or(0)
    }

    /// Deterministic hash over every registration parameter.
    pub fn make_commitment(request: &RegistrationRequest) -> Result<Hash32, ControllerError> {
        if !request.data.is_empty() && request.resolver == Address::ZERO {
            return Err(ControllerError::ResolverRequiredWhenDataSupplied);
        }
        let label = LabelHash::of(&request.label);
        let duration = request.duration.to_be_bytes();
        let count = (request.data.len() as u64).to_be_bytes();
        let encoded: Vec<Vec<u8>> = request.data.iter().map(RecordCall::encode).collect();
        let lengths: Vec<[u8; 8]> = encoded
            .iter()
            .map(|e| (e.len() as u64).to_be_bytes())
            .collect();
        let reverse = [request.reverse_record as u8];
        let fuses = request.owner_controlled_fuses.to_be_bytes();

        let mut parts: Vec<&[u8]> = vec![
            label.as_bytes().as_slice(),
            request.owner.as_bytes().as_slice(),
            duration.as_slice(),
            request.secret.as_bytes().as_slice(),
            request.resolver.as_bytes().as_slice(),
            count.as_slice(),
        ];
        for (len, call) in lengths.iter().zip(&encoded) {
            parts.push(len.as_slice());
            parts.push(call.as_slice());
        }
        parts.push(reverse.as_slice());
        parts.push(fuses.as_slice());
        Ok(Hash32::from_bytes(keccak256_concat(&parts)))
    }

    // -- Commit -------------------------------------------------------------

    pub fn commit(&mut self, ctx: &mut CallContext<'_>, commitment: Hash32) -> Result<(), ControllerError> {
        if let Some(at) = self.commitments.get(&commitment) {
            if at.saturating_add(self.max_commitment_age) >= ctx.timestamp {
                return Err(ControllerError::UnexpiredCommitmentExists(commitment));
            }
        }
        self.commitments.insert(commitment, ctx.timestamp);
        ctx.emit(Event::CommitmentMade { commitment });
        Ok(())
    }

    // -- Register -----------------------------------------------------------

    /// Reveals a commitment and registers the name. Returns the registrar
    /// expiry.
    pub fn register(
        &mut self,
        ctx: &mut CallContext<'_>,
        c: Contracts<'_>,
        request: &RegistrationRequest,
    ) -> Result<u64, ControllerError> {
        let now = ctx.timestamp;
        let payer = ctx.caller;
        let label = request.label.as_str();
        let label_hash = LabelHash::of(label);
        let node = self.base_node.child(&label_hash);

        // Checks.
        let commitment = Self::make_commitment(request)?;
        self.check_commitment_age(commitment, now)?;
        if !Self::valid(label) {
            return Err(ControllerError::InvalidLabel(request.label.clone()));
        }
        if !c.registrar.available(&label_hash, now) {
            return Err(ControllerError::NameNotAvailable(request.label.clone()));
        }
        if request.duration == 0 || request.duration < self.min_registration_duration {
            return Err(ControllerError::DurationTooShort(request.duration));
        }
        if request.owner == Address::ZERO {
            return Err(RegistrarError::ZeroOwner.into());
        }
        if let Some(stray) = request.data.iter().find(|call| call.node() != node) {
            return Err(ControllerError::RecordNamehashMismatch {
                expected: node,
                found: stray.node(),
            });
        }
        if !request.data.is_empty() && c.resolvers.resolver(&request.resolver).is_none() {
            return Err(ResolverError::NotAResolver(request.resolver).into());
        }
        let price = self.rent_price(c.registrar, c.feed, label, request.duration, now)?;
        let cost = price.total()?;
        self.check_funds(&*c.token, payer, cost)?;

        // Effects.
        self.commitments.remove(&commitment);

        // Interactions.
        c.token
            .transfer_from(&mut ctx.call_as(self.address), payer, self.address, cost)?;
        let expires = if request.owner_controlled_fuses == 0 {
            self.register_unwrapped(ctx, c.registry, c.registrar, label_hash, node, request)?
        } else {
            c.wrapper.wrap_and_register(
                &mut ctx.call_as(self.address),
                c.registry,
                c.registrar,
                label,
                request.owner,
                request.duration,
                request.resolver,
                request.owner_controlled_fuses | Fuses::CANNOT_UNWRAP.bits() as u16,
            )?
        };

        if !request.data.is_empty() {
            let authority = Authority {
                registry: &*c.registry,
                wrapper: &*c.wrapper,
                now,
            };
            c.resolvers.require_mut(&request.resolver)?.multicall_with_node_check(
                &mut ctx.call_as(self.address),
                &authority,
                node,
                &request.data,
            )?;
        }
        if !request.data.is_empty() && request.owner_controlled_fuses == 0 {
            self.hand_over(ctx, c.registry, c.registrar, label_hash, request.owner)?;
        }

        if request.reverse_record {
            let resolver = if request.resolver == Address::ZERO {
                c.reverse.default_resolver()
            } else {
                request.resolver
            };
            let full_name = join(label, &self.base_tld);
            c.reverse.set_name_for_addr(
                &mut ctx.call_as(self.address),
                c.registry,
                c.resolvers,
                c.wrapper,
                payer,
                payer,
                resolver,
                &full_name,
            )?;
        }

        ctx.emit(Event::NameRegistered {
            label: request.label.clone(),
            label_hash,
            owner: request.owner,
            base: price.base,
            premium: price.premium,
            expires,
        });
        tracing::info!(label, owner = %request.owner, expires, cost, "name registered");
        Ok(expires)
    }

    /// Registers without wrapping. With a resolver, the controller holds the
    /// name long enough to point it at the resolver; [`Self::hand_over`]
    /// gives it to the owner once any records are written.
    fn register_unwrapped(
        &self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        registrar: &mut BaseRegistrar,
        label_hash: LabelHash,
        node: Node,
        request: &RegistrationRequest,
    ) -> Result<u64, ControllerError> {
        let mut inner = ctx.call_as(self.address);
        if request.resolver == Address::ZERO {
            return Ok(registrar.register(&mut inner, registry, label_hash, request.owner, request.duration)?);
        }
        let expires = registrar.register(&mut inner, registry, label_hash, self.address, request.duration)?;
        registry.set_resolver(&mut inner, node, request.resolver)?;
        if request.data.is_empty() {
            self.hand_over(ctx, registry, registrar, label_hash, request.owner)?;
        }
        Ok(expires)
    }

    fn hand_over(
        &self,
        ctx: &mut CallContext<'_>,
        registry: &mut Registry,
        registrar: &mut BaseRegistrar,
        label_hash: LabelHash,
        owner: Address,
    ) -> Result<(), ControllerError> {
        let mut inner = ctx.call_as(self.address);
        registrar.reclaim(&mut inner, registry, label_hash, owner)?;
        registrar.transfer_from(&mut inner, self.address, owner, label_hash)?;
        Ok(())
    }

    // -- Renew --------------------------------------------------------------

    /// Anyone may renew any name. Pays the base price only.
    pub fn renew(
        &mut self,
        ctx: &mut CallContext<'_>,
        c: Contracts<'_>,
        label: &str,
        duration: u64,
    ) -> Result<u64, ControllerError> {
        if duration == 0 {
            return Err(ControllerError::DurationTooShort(duration));
        }
        let now = ctx.timestamp;
        let payer = ctx.caller;
        let label_hash = LabelHash::of(label);
        let node = self.base_node.child(&label_hash);
        let price = self.rent_price(c.registrar, c.feed, label, duration, now)?;
        self.check_funds(&*c.token, payer, price.base)?;
        let wrapped = c.wrapper.is_wrapped(&node, now);

        c.token
            .transfer_from(&mut ctx.call_as(self.address), payer, self.address, price.base)?;
        let expires = c
            .registrar
            .renew(&mut ctx.call_as(self.address), c.registry, label_hash, duration)?;
        if wrapped {
            c.wrapper
                .renew(&mut ctx.call_as(self.address), node, duration)?;
        }

        ctx.emit(Event::NameRenewed {
            label: label.to_string(),
            label_hash,
            cost: price.base,
            expires,
        });
        tracing::info!(label, expires, cost = price.base, "name renewed");
        Ok(expires)
    }

    // -- Withdraw -----------------------------------------------------------

    /// Sends the controller's whole balance to `treasury`. Anyone may call.
    pub fn withdraw(
        &mut self,
        ctx: &mut CallContext<'_>,
        token: &mut dyn PaymentLedger,
        treasury: Address,
    ) -> Result<u128, ControllerError> {
        let amount = token.balance_of(&self.address);
        token.transfer(&mut ctx.call_as(self.address), treasury, amount)?;
        ctx.emit(Event::FundsWithdrawn {
            to: treasury,
            amount,
        });
        Ok(amount)
    }

    // -- Helpers ------------------------------------------------------------

    fn check_commitment_age(&self, commitment: Hash32, now: u64) -> Result<(), ControllerError> {
        let Some(&at) = self.commitments.get(&commitment) else {
            return Err(ControllerError::CommitmentTooOld(commitment));
        };
        if at.saturating_add(self.min_commitment_age) > now {
            return Err(ControllerError::CommitmentTooNew(commitment));
        }
        if at.saturating_add(self.max_commitment_age) < now {
            return Err(ControllerError::CommitmentTooOld(commitment));
        }
        Ok(())
    }

    fn check_funds(&self, token: &dyn PaymentLedger, payer: Address, amount: u128) -> Result<(), ControllerError> {
        let balance = token.balance_of(&payer);
        if balance < amount {
            return Err(TokenError::InsufficientBalance { balance, amount }.into());
        }
        let allowance = token.allowance(&payer, &self.address);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance { allowance, amount }.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fns_protocol::config::{PremiumSchedule, DAY};
    use fns_protocol::name::namehash;

    fn request(label: &str) -> RegistrationRequest {
        RegistrationRequest {
            label: label.into(),
            owner: Address::derive("owner"),
            duration: 28 * DAY,
            secret: Hash32::from_bytes([7u8; 32]),
            resolver: Address::ZERO,
            data: vec![],
            reverse_record: false,
            owner_controlled_fuses: 0,
        }
    }

    fn controller() -> RegistrationController {
        let oracle = PriceOracle::new(vec![1], PremiumSchedule::None, 90 * DAY).unwrap();
        RegistrationController::new(oracle, "frax", namehash("frax"), 600, DAY, 28 * DAY).unwrap()
    }

    #[test]
    fn valid_labels() {
        for label in ["testing", "sixsix", "five5", "iii", "🚀🚀🚀"] {
            assert!(RegistrationController::valid(label), "{label}");
        }
        for label in ["", "ii", "i", "🚀🚀", "你好"] {
            assert!(!RegistrationController::valid(label), "{label}");
        }
    }

    #[test]
    fn commitment_covers_every_parameter() {
        let base = RegistrationController::make_commitment(&request("newname")).unwrap();
        let mut other = request("newname");
        other.owner_controlled_fuses = 1;
        assert_ne!(base, RegistrationController::make_commitment(&other).unwrap());
        let mut other = request("newname");
        other.reverse_record = true;
        assert_ne!(base, RegistrationController::make_commitment(&other).unwrap());
        let mut other = request("newname");
        other.duration += 1;
        assert_ne!(base, RegistrationController::make_commitment(&other).unwrap());
        let mut other = request("newname");
        other.owner = Address::derive("someone-else");
        assert_ne!(base, RegistrationController::make_commitment(&other).unwrap());
        let mut other = request("newname");
        other.secret = Hash32::from_bytes([8u8; 32]);
        assert_ne!(base, RegistrationController::make_commitment(&other).unwrap());
        let mut other = request("newname");
        other.resolver = Address::derive("resolver");
        assert_ne!(base, RegistrationController::make_commitment(&other).unwrap());
        let with_data = |addr: Address| {
            let mut req = request("newname");
            req.resolver = Address::derive("resolver");
            req.data.push(RecordCall::SetAddr {
                node: namehash("newname.frax"),
                addr,
            });
            RegistrationController::make_commitment(&req).unwrap()
        };
        assert_ne!(with_data(Address::derive("a")), with_data(Address::derive("b")));
        let mut other = request("newname");
        other.resolver = Address::derive("resolver");
        assert_ne!(
            RegistrationController::make_commitment(&other).unwrap(),
            with_data(Address::derive("a"))
        );
        assert_eq!(base, RegistrationController::make_commitment(&request("newname")).unwrap());
    }

    #[test]
    fn data_without_resolver_is_rejected() {
        let mut req = request("newname");
        req.data.push(RecordCall::SetAddr {
            node: namehash("newname.frax"),
            addr: Address::derive("owner"),
        });
        assert_eq!(
            RegistrationController::make_commitment(&req),
            Err(ControllerError::ResolverRequiredWhenDataSupplied)
        );
    }

    #[test]
    fn live_commitment_cannot_be_replaced() {
        let mut controller = controller();
        let hash = Hash32::from_bytes([1u8; 32]);
        let mut events = Vec::new();
        let mut ctx = CallContext::new(Address::derive("user"), 1_000, &mut events);
        controller.commit(&mut ctx, hash).unwrap();
        assert_eq!(controller.commitments(&hash), 1_000);

        let mut ctx = CallContext::new(Address::derive("user"), 1_000 + DAY, &mut events);
        assert_eq!(
            controller.commit(&mut ctx, hash),
            Err(ControllerError::UnexpiredCommitmentExists(hash))
        );
        let mut ctx = CallContext::new(Address::derive("user"), 1_001 + DAY, &mut events);
        controller.commit(&mut ctx, hash).unwrap();
        assert_eq!(controller.commitments(&hash), 1_001 + DAY);
    }

    #[test]
    fn commitment_age_window() {
        let mut controller = controller();
        let hash = Hash32::from_bytes([2u8; 32]);
        let mut events = Vec::new();
        let mut ctx = CallContext::new(Address::derive("user"), 1_000, &mut events);
        controller.commit(&mut ctx, hash).unwrap();

        assert_eq!(
            controller.check_commitment_age(hash, 1_000),
            Err(ControllerError::CommitmentTooNew(hash))
        );
        assert!(controller.check_commitment_age(hash, 1_600).is_ok());
        assert!(controller.check_commitment_age(hash, 1_000 + DAY).is_ok());
        assert_eq!(
            controller.check_commitment_age(hash, 1_001 + DAY),
            Err(ControllerError::CommitmentTooOld(hash))
        );
        let missing = Hash32::from_bytes([3u8; 32]);
        assert_eq!(
            controller.check_commitment_age(missing, 1_600),
            Err(ControllerError::CommitmentTooOld(missing))
        );
    }

    #[test]
    fn inverted_window_is_rejected() {
        let oracle = PriceOracle::new(vec![1], PremiumSchedule::None, 0).unwrap();
        assert!(matches!(
            RegistrationController::new(oracle, "frax", namehash("frax"), 600, 600, 0),
            Err(ControllerError::MaxCommitmentAgeTooLow)
        ));
    }
}
