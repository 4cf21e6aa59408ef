//! In-process event hooks.
//!
//! Components outside the engine (a mailer, a delivery bot, the test suite) can subscribe to lifecycle events without
//! the engine knowing anything about them. Hooks are registered in [`EventHooks`], turned into running
//! [`EventHandlers`], and the APIs publish to them through [`EventProducers`].
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
