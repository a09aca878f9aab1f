pub mod channel;
pub mod demux;
pub mod wire;

pub use channel::{ChannelFrame, LiveChannel, LiveServiceConfig, WebSocketChannel};
pub use demux::{classify, InboundEvent};
pub use wire::{AudioChunkMessage, ClientMessage, ServerMessage, SetupMessage};
