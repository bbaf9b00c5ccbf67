use bytes::BytesMut;
use tracing::{debug, info};
use typhoon_types::GameProfile;

use super::{Decode, Encode, Handle, Packet};
use crate::codec::*;
use crate::session::Session;
use crate::snapshot::{DecodeLimits, ServerSnapshot};
use crate::state::ConnectionState;
use crate::version::ProtocolVersion;

#[derive(Debug, Clone, PartialEq)]
pub struct LoginStart {
    pub name: String,
}

impl Packet for LoginStart {
    const NAME: &'static str = "LoginStart";
    const STATE: ConnectionState = ConnectionState::Login;
}

impl Decode for LoginStart {
    const SERVERBOUND_ID: i32 = 0x00;

    fn decode(
        buf: &mut BytesMut,
        _protocol: ProtocolVersion,
        limits: &DecodeLimits,
    ) -> CodecResult<Self> {
        Ok(Self {
            name: read_string(buf, limits.player_name)?,
        })
    }
}

/// Client side of login start, for tests that play the client.
#[cfg(any(test, feature = "test-util"))]
impl Encode for LoginStart {
    const CLIENTBOUND_ID: i32 = 0x00;

    fn encode(&self, buf: &mut BytesMut, _protocol: ProtocolVersion) -> CodecResult<()> {
        write_string(buf, &self.name)
    }
}

impl Handle for LoginStart {
    fn handle(self, session: &mut Session, server: &ServerSnapshot) {
        let protocol = session.protocol();
        if !protocol.is_compatible() {
            info!("Rejecting {} ({}): incompatible protocol {}", self.name, session.remote_addr(), protocol);
            session.kick("Incompatible version");
            return;
        }

        let Some(slot) = server.reserve_slot() else {
            info!("Rejecting {} ({}): server is full", self.name, session.remote_addr());
            session.kick("Server is full");
            return;
        };
        session.hold_slot(slot);
        session.set_name(self.name);

        if let Some(threshold) = server.compression_threshold {
            if protocol.supports_compression() {
                session.send(SetCompression { threshold });
                session.enable_compression(threshold);
            }
        }

        let profile = session.profile().clone();
        session.send(LoginSuccess { profile });
        session.transition(ConnectionState::Play);
        debug!(
            "{} logged in as {} with protocol {}",
            session.remote_addr(),
            session.profile().name,
            protocol
        );

        for packet in server.join.packets() {
            session.send(packet);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginDisconnect {
    /// JSON text component.
    pub reason: String,
}

impl Packet for LoginDisconnect {
    const NAME: &'static str = "LoginDisconnect";
    const STATE: ConnectionState = ConnectionState::Login;
}

impl Encode for LoginDisconnect {
    const CLIENTBOUND_ID: i32 = 0x00;

    fn encode(&self, buf: &mut BytesMut, _protocol: ProtocolVersion) -> CodecResult<()> {
        write_string(buf, &self.reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginSuccess {
    pub profile: GameProfile,
}

impl Packet for LoginSuccess {
    const NAME: &'static str = "LoginSuccess";
    const STATE: ConnectionState = ConnectionState::Login;
}

impl Encode for LoginSuccess {
    const CLIENTBOUND_ID: i32 = 0x02;

    fn encode(&self, buf: &mut BytesMut, _protocol: ProtocolVersion) -> CodecResult<()> {
        write_string(buf, &self.profile.uuid.hyphenated().to_string())?;
        write_string(buf, &self.profile.name)
    }
}

/// Announces that every frame after this one is compression-framed.
#[derive(Debug, Clone, PartialEq)]
pub struct SetCompression {
    pub threshold: i32,
}

impl Packet for SetCompression {
    const NAME: &'static str = "SetCompression";
    const STATE: ConnectionState = ConnectionState::Login;
}

impl Encode for SetCompression {
    const CLIENTBOUND_ID: i32 = 0x03;

    fn encode(&self, buf: &mut BytesMut, _protocol: ProtocolVersion) -> CodecResult<()> {
        write_varint(buf, self.threshold);
        Ok(())
    }
}
