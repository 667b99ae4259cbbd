//! Serial device control: wire protocol, transport abstraction, and the
//! connection-owning channel.

pub mod channel;
pub mod mock;
pub mod protocol;
pub mod transport;

pub use channel::{ConnectionStatus, DeviceChannel};
pub use mock::{MockHandle, MockTransport};
pub use protocol::DeviceCommand;
pub use transport::{available_ports, SerialTransport, Transport};
