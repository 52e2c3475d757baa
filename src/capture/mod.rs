pub mod descriptor;
pub mod listener;

pub use descriptor::{DecodeError, PacketDescriptor, PacketKind, WifiSubtype};
pub use listener::{Listener, ListenerError, ListenerStats};
