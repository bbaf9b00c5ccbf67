use bytes::{BufMut, BytesMut};

use super::{Decode, Encode, Handle, Packet};
use crate::codec::*;
use crate::session::Session;
use crate::snapshot::{DecodeLimits, ServerSnapshot};
use crate::state::ConnectionState;
use crate::status::build_status_response;
use crate::version::ProtocolVersion;

#[derive(Debug, Clone, PartialEq)]
pub struct StatusRequest;

impl Packet for StatusRequest {
    const NAME: &'static str = "StatusRequest";
    const STATE: ConnectionState = ConnectionState::Status;
}

impl Decode for StatusRequest {
    const SERVERBOUND_ID: i32 = 0x00;

    fn decode(
        _buf: &mut BytesMut,
        _protocol: ProtocolVersion,
        _limits: &DecodeLimits,
    ) -> CodecResult<Self> {
        Ok(Self)
    }
}

impl Handle for StatusRequest {
    fn handle(self, session: &mut Session, server: &ServerSnapshot) {
        let json = build_status_response(session.protocol(), server);
        session.send(StatusResponse { json });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusResponse {
    pub json: String,
}

impl Packet for StatusResponse {
    const NAME: &'static str = "StatusResponse";
    const STATE: ConnectionState = ConnectionState::Status;
}

impl Encode for StatusResponse {
    const CLIENTBOUND_ID: i32 = 0x00;

    fn encode(&self, buf: &mut BytesMut, _protocol: ProtocolVersion) -> CodecResult<()> {
        write_string(buf, &self.json)
    }
}

/// Server list ping. The client's token is echoed back untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPing {
    pub payload: u64,
}

impl Packet for StatusPing {
    const NAME: &'static str = "StatusPing";
    const STATE: ConnectionState = ConnectionState::Status;
}

impl Decode for StatusPing {
    const SERVERBOUND_ID: i32 = 0x01;

    fn decode(
        buf: &mut BytesMut,
        _protocol: ProtocolVersion,
        _limits: &DecodeLimits,
    ) -> CodecResult<Self> {
        Ok(Self {
            payload: read_u64(buf)?,
        })
    }
}

impl Encode for StatusPing {
    const CLIENTBOUND_ID: i32 = 0x01;

    fn encode(&self, buf: &mut BytesMut, _protocol: ProtocolVersion) -> CodecResult<()> {
        buf.put_u64(self.payload);
        Ok(())
    }
}

impl Handle for StatusPing {
    fn handle(self, session: &mut Session, _server: &ServerSnapshot) {
        session.send(self);
    }
}
