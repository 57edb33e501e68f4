//! Transport implementations
//!
//! Contains LogTransport, StdoutTransport, FileTransport, UdpTransport and
//! MemoryTransport.

mod file;
mod log;
mod memory;
mod stdout;
mod udp;

pub use self::file::FileTransport;
pub use self::log::LogTransport;
pub use self::memory::{Delivery, MemoryTransport};
pub use self::stdout::StdoutTransport;
pub use self::udp::{UdpTransport, UdpTransportConfig};
