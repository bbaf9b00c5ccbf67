use bytes::BytesMut;
use tracing::debug;

use super::{Decode, Handle, Packet};
use crate::codec::*;
use crate::session::Session;
use crate::snapshot::{DecodeLimits, ServerSnapshot};
use crate::state::ConnectionState;
use crate::version::ProtocolVersion;

/// First packet of every connection. Picks the protocol version and whether
/// the client wants a status response or to log in.
#[derive(Debug, Clone, PartialEq)]
pub struct Handshake {
    pub protocol_version: ProtocolVersion,
    pub server_address: String,
    pub server_port: u16,
    pub next_state: i32,
}

impl Packet for Handshake {
    const NAME: &'static str = "Handshake";
    const STATE: ConnectionState = ConnectionState::Handshaking;
}

impl Decode for Handshake {
    const SERVERBOUND_ID: i32 = 0x00;

    fn decode(
        buf: &mut BytesMut,
        _protocol: ProtocolVersion,
        limits: &DecodeLimits,
    ) -> CodecResult<Self> {
        let protocol_version = ProtocolVersion(read_varint(buf)?);
        let server_address = read_string(buf, limits.handshake_address)?;
        let server_port = read_u16(buf)?;
        let next_state = read_varint(buf)?;
        Ok(Self {
            protocol_version,
            server_address,
            server_port,
            next_state,
        })
    }
}

/// Client side of the handshake, for tests that play the client.
#[cfg(any(test, feature = "test-util"))]
impl super::Encode for Handshake {
    const CLIENTBOUND_ID: i32 = 0x00;

    fn encode(&self, buf: &mut BytesMut, _protocol: ProtocolVersion) -> CodecResult<()> {
        use bytes::BufMut;
        write_varint(buf, self.protocol_version.number());
        write_string(buf, &self.server_address)?;
        buf.put_u16(self.server_port);
        write_varint(buf, self.next_state);
        Ok(())
    }
}

impl Handle for Handshake {
    fn handle(self, session: &mut Session, _server: &ServerSnapshot) {
        debug!(
            "Handshake from {}: protocol={}, next_state={}",
            session.remote_addr(),
            self.protocol_version,
            self.next_state
        );
        session.set_protocol(self.protocol_version);
        session.set_virtual_host(self.server_address, self.server_port);
        match ConnectionState::from_handshake_next(self.next_state) {
            Some(next) => {
                session.transition(next);
            }
            None => {
                debug!("Invalid next state {} from {}", self.next_state, session.remote_addr());
                session.close();
            }
        }
    }
}
