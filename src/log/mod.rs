pub mod event_bus;
pub mod logger;

pub use event_bus::{ChannelBus, Event, EventBus, TracingBus};
pub use logger::init_logger;
