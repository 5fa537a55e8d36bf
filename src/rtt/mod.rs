pub mod channel;
pub mod control_block;
pub mod engine;
pub mod ring;

pub use channel::RttChannel;
pub use engine::{ChannelSpec, Direction, RttConfig, RttEngine};
