//! Dataflow model: messages, ports, channels and tasks.

pub mod channel;
pub mod message;
pub mod task;

pub use channel::{Channel, Port};
pub use message::Message;
pub use task::{Shard, Task};
