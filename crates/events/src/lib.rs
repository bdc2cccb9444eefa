//! Domain events and their distribution.
//!
//! Ledger operations describe what they changed as immutable facts. After a
//! successful save the store wraps each fact in an [`Envelope`] and publishes
//! it on an [`EventBus`].

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::Envelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
