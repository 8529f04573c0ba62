//! 事件流：拉取式、可取消、单槽背压

pub mod channel;
pub mod events;

pub use channel::{event_channel, EmitError, EventSink, EventStream};
pub use events::AgentEvent;
