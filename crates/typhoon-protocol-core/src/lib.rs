pub mod codec;
pub mod connection;
pub mod packets;
pub mod registry;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod status;
pub mod version;

pub use codec::*;
pub use connection::Connection;
pub use packets::*;
pub use registry::PacketRegistry;
pub use session::{Outbound, Session};
pub use snapshot::*;
pub use state::*;
pub use status::build_status_response;
pub use version::*;
