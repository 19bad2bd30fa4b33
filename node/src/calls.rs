//! # Signed Call Payloads
//!
//! The `payload` of a [`SignedEnvelope`](fns_protocol::envelope::SignedEnvelope)
//! is one `Call`, tagged by `method`:
//!
//! ```json
//! { "method": "commit", "commitment": "0x…" }
//! { "method": "renew", "label": "alice", "duration": 31536000 }
//! { "method": "approve", "spender": "0x…", "amount": "1000000000000000000" }
//! ```
//!
//! Amounts are decimal strings. A call runs as the envelope's signer at the
//! ledger's current time.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use fns_contracts::fuses::Fuses;
use fns_contracts::resolver::RecordCall;
use fns_contracts::{NameService, RegistrationRequest, ServiceError};
use fns_protocol::encoding::u128_string;
use fns_protocol::{Address, Hash32, Node};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Call {
    // ----- Payment token -----
    Approve {
        spender: Address,
        #[serde(with = "u128_string")]
        amount: u128,
    },
    Transfer {
        to: Address,
        #[serde(with = "u128_string")]
        amount: u128,
    },

    // ----- Controller -----
    Commit {
        commitment: Hash32,
    },
    Register(RegistrationRequest),
    Renew {
        label: String,
        duration: u64,
    },
    Withdraw,

    // ----- Names -----
    SetFuses {
        node: Node,
        fuses: u16,
    },
    SetResolver {
        node: Node,
        resolver: Address,
    },
    SetTtl {
        node: Node,
        ttl: u64,
    },
    SetRecords {
        resolver: Address,
        node: Node,
        calls: Vec<RecordCall>,
    },
    /// Wrapped-name transfer.
    TransferName {
        node: Node,
        to: Address,
    },
    /// Registrar-token transfer of an unwrapped second-level label.
    TransferLabel {
        label: String,
        to: Address,
    },
    SetSubnodeOwner {
        parent: Node,
        label: String,
        owner: Address,
        #[serde(default)]
        fuses: u32,
        #[serde(default)]
        expiry: u64,
    },
    SetReverseName {
        name: String,
    },
}

impl Call {
    pub fn method(&self) -> &'static str {
        match self {
            Call::Approve { .. } => "approve",
            Call::Transfer { .. } => "transfer",
            Call::Commit { .. } => "commit",
            Call::Register(_) => "register",
            Call::Renew { .. } => "renew",
            Call::Withdraw => "withdraw",
            Call::SetFuses { .. } => "set_fuses",
            Call::SetResolver { .. } => "set_resolver",
            Call::SetTtl { .. } => "set_ttl",
            Call::SetRecords { .. } => "set_records",
            Call::TransferName { .. } => "transfer_name",
            Call::TransferLabel { .. } => "transfer_label",
            Call::SetSubnodeOwner { .. } => "set_subnode_owner",
            Call::SetReverseName { .. } => "set_reverse_name",
        }
    }

    /// Runs the call against `service` and returns its JSON output.
    pub fn apply(
        &self,
        service: &mut NameService,
        caller: Address,
        now: u64,
    ) -> Result<Value, ServiceError> {
        match self {
            Call::Approve { spender, amount } => {
                service.approve(caller, now, *spender, *amount)?;
                Ok(Value::Null)
            }
            Call::Transfer { to, amount } => {
                service.transfer(caller, now, *to, *amount)?;
                Ok(Value::Null)
            }
            Call::Commit { commitment } => {
                service.commit(caller, now, *commitment)?;
                Ok(Value::Null)
            }
            Call::Register(request) => {
                let expires = service.register(caller, now, request)?;
                Ok(json!({
                    "node": service.node_of(&request.label),
                    "expires": expires,
                }))
            }
            Call::Renew { label, duration } => {
                let expires = service.renew(caller, now, label, *duration)?;
                Ok(json!({ "expires": expires }))
            }
            Call::Withdraw => {
                let amount = service.withdraw(caller, now)?;
                Ok(json!({ "amount": amount.to_string() }))
            }
            Call::SetFuses { node, fuses } => {
                let burned = service.set_fuses(caller, now, *node, *fuses)?;
                Ok(json!({ "fuses": burned.bits() }))
            }
            Call::SetResolver { node, resolver } => {
                service.set_resolver(caller, now, *node, *resolver)?;
                Ok(Value::Null)
            }
            Call::SetTtl { node, ttl } => {
                service.set_ttl(caller, now, *node, *ttl)?;
                Ok(Value::Null)
            }
            Call::SetRecords {
                resolver,
                node,
                calls,
            } => {
                service.set_records(caller, now, *resolver, *node, calls)?;
                Ok(Value::Null)
            }
            Call::TransferName { node, to } => {
                service.safe_transfer_from(caller, now, caller, *to, *node)?;
                Ok(Value::Null)
            }
            Call::TransferLabel { label, to } => {
                service.transfer_label(caller, now, label, *to)?;
                Ok(Value::Null)
            }
            Call::SetSubnodeOwner {
                parent,
                label,
                owner,
                fuses,
                expiry,
            } => {
                let node = service.set_wrapped_subnode_owner(
                    caller,
                    now,
                    *parent,
                    label,
                    *owner,
                    Fuses::from_bits(*fuses),
                    *expiry,
                )?;
                Ok(json!({ "node": node }))
            }
            Call::SetReverseName { name } => {
                let node = service.set_reverse_name(caller, now, name)?;
                Ok(json!({ "node": node }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_tag_and_string_amounts() {
        let call: Call = serde_json::from_value(json!({
            "method": "approve",
            "spender": Address::derive("controller"),
            "amount": "340282366920938463463374607431768211455",
        }))
        .unwrap();
        assert_eq!(
            call,
            Call::Approve {
                spender: Address::derive("controller"),
                amount: u128::MAX,
            }
        );
        assert_eq!(call.method(), "approve");
    }

    #[test]
    fn unit_and_newtype_variants_parse() {
        let withdraw: Call = serde_json::from_value(json!({ "method": "withdraw" })).unwrap();
        assert_eq!(withdraw, Call::Withdraw);

        let register: Call = serde_json::from_value(json!({
            "method": "register",
            "label": "alice",
            "owner": Address::derive("alice"),
            "duration": 31_536_000u64,
            "secret": Hash32::from_bytes([7; 32]),
            "resolver": Address::ZERO,
            "data": [],
            "reverse_record": false,
            "owner_controlled_fuses": 0,
        }))
        .unwrap();
        let Call::Register(request) = register else {
            panic!("expected register");
        };
        assert_eq!(request.label, "alice");
        assert_eq!(request.duration, 31_536_000);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let result: Result<Call, _> = serde_json::from_value(json!({ "method": "mint" }));
        assert!(result.is_err());
    }
}
