//! Change notifications and the pub/sub plumbing that carries them.

pub mod bus;
pub mod change;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use change::{ChangeKind, ProductsChanged};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
