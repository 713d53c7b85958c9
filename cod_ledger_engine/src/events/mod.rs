//! Ledger events and the hook channels that deliver them.
//!
//! Subscribers receive [`OrderDeliveredEvent`], [`CashCollectedEvent`] and [`ConfirmationCodeIssuedEvent`] after the
//! corresponding write has committed. A slow or failing subscriber never affects the operation that published the
//! event.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
