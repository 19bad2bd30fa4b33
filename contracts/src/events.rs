//! # Events
//!
//! Everything observable that an operation did. Events are buffered in the
//! [`CallContext`](crate::context::CallContext), kept only if the operation
//! succeeds, and then persisted and streamed by the node.
//!
//! Externally tagged: the same enum goes to bincode on disk and to
//! JSON on the wire, and bincode cannot read internally tagged enums.

use serde::{Deserialize, Serialize};

use fns_protocol::encoding::u128_string;
use fns_protocol::{Address, Hash32, LabelHash, Node};

use crate::fuses::Fuses;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    // ----- Registry -----
    Transfer {
        node: Node,
        owner: Address,
    },
    NewOwner {
        node: Node,
        label: LabelHash,
        owner: Address,
    },
    NewResolver {
        node: Node,
        resolver: Address,
    },
    NewTtl {
        node: Node,
        ttl: u64,
    },
    /// Operator approval on the registry, registrar or wrapper (`contract`).
    ApprovalForAll {
        contract: Address,
        owner: Address,
        operator: Address,
        approved: bool,
    },

    // ----- Root / reverse registrar -----
    ControllerChanged {
        contract: Address,
        controller: Address,
        enabled: bool,
    },
    TldLocked {
        label: LabelHash,
    },
    ReverseClaimed {
        addr: Address,
        node: Node,
    },

    // ----- Registrar -----
    ControllerAdded {
        controller: Address,
    },
    ControllerRemoved {
        controller: Address,
    },
    LabelRegistered {
        id: LabelHash,
        owner: Address,
        expires: u64,
    },
    LabelRenewed {
        id: LabelHash,
        expires: u64,
    },
    LabelTransferred {
        id: LabelHash,
        from: Address,
        to: Address,
    },
    LabelApproved {
        id: LabelHash,
        owner: Address,
        approved: Address,
    },

    // ----- Wrapper -----
    NameWrapped {
        node: Node,
        name: String,
        owner: Address,
        fuses: Fuses,
        expiry: u64,
    },
    NameUnwrapped {
        node: Node,
        owner: Address,
    },
    FusesSet {
        node: Node,
        fuses: Fuses,
    },
    ExpiryExtended {
        node: Node,
        expiry: u64,
    },
    WrappedTransfer {
        node: Node,
        from: Address,
        to: Address,
    },
    WrapperControllerChanged {
        controller: Address,
        enabled: bool,
    },

    // ----- Controller -----
    CommitmentMade {
        commitment: Hash32,
    },
    NameRegistered {
        label: String,
        label_hash: LabelHash,
        owner: Address,
        #[serde(with = "u128_string")]
        base: u128,
        #[serde(with = "u128_string")]
        premium: u128,
        expires: u64,
    },
    NameRenewed {
        label: String,
        label_hash: LabelHash,
        #[serde(with = "u128_string")]
        cost: u128,
        expires: u64,
    },
    FundsWithdrawn {
        to: Address,
        #[serde(with = "u128_string")]
        amount: u128,
    },

    // ----- Price feed -----
    ReferencePriceUpdated {
        #[serde(with = "u128_string")]
        answer: u128,
    },

    // ----- Payment token -----
    TokenTransfer {
        from: Address,
        to: Address,
        #[serde(with = "u128_string")]
        amount: u128,
    },
    TokenApproval {
        owner: Address,
        spender: Address,
        #[serde(with = "u128_string")]
        amount: u128,
    },

    // ----- Resolver -----
    AddrChanged {
        node: Node,
        addr: Address,
    },
    TextChanged {
        node: Node,
        key: String,
        value: String,
    },
    ContenthashChanged {
        node: Node,
        hash: Vec<u8>,
    },
    NameChanged {
        node: Node,
        name: String,
    },
}

impl Event {
    /// Short snake_case name, used for metrics labels and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Transfer { .. } => "transfer",
            Event::NewOwner { .. } => "new_owner",
            Event::NewResolver { .. } => "new_resolver",
            Event::NewTtl { .. } => "new_ttl",
            Event::ApprovalForAll { .. } => "approval_for_all",
            Event::ControllerChanged { .. } => "controller_changed",
            Event::TldLocked { .. } => "tld_locked",
            Event::ReverseClaimed { .. } => "reverse_claimed",
            Event::ControllerAdded { .. } => "controller_added",
            Event::ControllerRemoved { .. } => "controller_removed",
            Event::LabelRegistered { .. } => "label_registered",
            Event::LabelRenewed { .. } => "label_renewed",
            Event::LabelTransferred { .. } => "label_transferred",
            Event::LabelApproved { .. } => "label_approved",
            Event::NameWrapped { .. } => "name_wrapped",
            Event::NameUnwrapped { .. } => "name_unwrapped",
            Event::FusesSet { .. } => "fuses_set",
            Event::ExpiryExtended { .. } => "expiry_extended",
            Event::WrappedTransfer { .. } => "wrapped_transfer",
            Event::WrapperControllerChanged { .. } => "wrapper_controller_changed",
            Event::CommitmentMade { .. } => "commitment_made",
            Event::NameRegistered { .. } => "name_registered",
            Event::NameRenewed { .. } => "name_renewed",
            Event::FundsWithdrawn { .. } => "funds_withdrawn",
            Event::ReferencePriceUpdated { .. } => "reference_price_updated",
            Event::TokenTransfer { .. } => "token_transfer",
            Event::TokenApproval { .. } => "token_approval",
            Event::AddrChanged { .. } => "addr_changed",
            Event::TextChanged { .. } => "text_changed",
            Event::ContenthashChanged { .. } => "contenthash_changed",
            Event::NameChanged { .. } => "name_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_event_json_shape() {
        let event = Event::NameRegistered {
            label: "newname".into(),
            label_hash: LabelHash::of("newname"),
            owner: Address::derive("owner"),
            base: 86_400 * 10u128.pow(18),
            premium: 0,
            expires: 42,
        };
        let value = serde_json::to_value(&event).unwrap();
        let body = &value["name_registered"];
        assert_eq!(body["base"], "86400000000000000000000");
        assert_eq!(body["premium"], "0");
        assert_eq!(event.kind(), "name_registered");
    }

    #[test]
    fn events_survive_bincode() {
        let events = vec![
            Event::FundsWithdrawn {
                to: Address::derive("admin"),
                amount: u128::MAX,
            },
            Event::FusesSet {
                node: Node::ROOT,
                fuses: Fuses::CANNOT_UNWRAP,
            },
        ];
        let bytes = bincode::serialize(&events).unwrap();
        let back: Vec<Event> = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, events);
    }
}
