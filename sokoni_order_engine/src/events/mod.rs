//! Simple stateless pub-sub event hooks.
//!
//! Components of the wider marketplace (notifications, loyalty, analytics)
//! subscribe to order-engine events and react to them without access to engine
//! internals: all a handler receives is the event itself. Handlers are async
//! and run on their own tasks, so a slow subscriber never stalls a flow.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
