//! # Execution Context
//!
//! One operation, one context: who is calling, what the ledger clock reads,
//! and where emitted events go. Components never see a global clock or a
//! global caller; they get both from here.
//!
//! When a component calls another component it re-enters with its own
//! address as the caller through [`CallContext::call_as`]. The event buffer is
//! shared so the outer operation sees every event in emission order.

use fns_protocol::Address;

use crate::events::Event;

pub struct CallContext<'a> {
    /// The identity the callee authorizes against.
    pub caller: Address,
    /// Ledger timestamp, seconds.
    pub timestamp: u64,
    events: &'a mut Vec<Event>,
}

impl<'a> CallContext<'a> {
    pub fn new(caller: Address, timestamp: u64, events: &'a mut Vec<Event>) -> Self {
        Self {
            caller,
            timestamp,
            events,
        }
    }

    /// A nested context in which `caller` is the acting identity.
    pub fn call_as(&mut self, caller: Address) -> CallContext<'_> {
        CallContext {
            caller,
            timestamp: self.timestamp,
            events: &mut *self.events,
        }
    }

    pub fn emit(&mut self, event: Event) {
        tracing::trace!(?event, "event");
        self.events.push(event);
    }

    /// Events emitted so far in this operation.
    pub fn events(&self) -> &[Event] {
        self.events
    }
}
