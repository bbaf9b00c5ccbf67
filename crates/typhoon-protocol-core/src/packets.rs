//! Packet model.
//!
//! Every packet is a plain struct. Serverbound packets implement [`Decode`]
//! and [`Handle`], clientbound packets implement [`Encode`]; the few that
//! travel both ways (ping, plugin message, keepalive) implement all three.
//! Packet ids are scoped per (state, direction), so a type carries a separate
//! id for each direction it travels in.

mod handshaking;
mod login;
mod play;
mod status;

use bytes::BytesMut;

use crate::codec::CodecResult;
use crate::session::Session;
use crate::snapshot::{DecodeLimits, ServerSnapshot};
use crate::state::ConnectionState;
use crate::version::ProtocolVersion;

pub use self::handshaking::*;
pub use self::login::*;
pub use self::play::*;
pub use self::status::*;

/// Metadata shared by all packets.
pub trait Packet {
    const NAME: &'static str;
    /// The connection state this packet belongs to.
    const STATE: ConnectionState;
}

/// A packet the client sends to us.
pub trait Decode: Packet + Sized {
    const SERVERBOUND_ID: i32;

    /// Read the packet body (everything after the packet id). `buf` holds
    /// exactly the rest of the frame, so `buf.len()` is the remaining payload
    /// length.
    fn decode(
        buf: &mut BytesMut,
        protocol: ProtocolVersion,
        limits: &DecodeLimits,
    ) -> CodecResult<Self>;
}

/// A packet we send to the client.
pub trait Encode: Packet {
    const CLIENTBOUND_ID: i32;

    /// Write the packet body (everything after the packet id).
    fn encode(&self, buf: &mut BytesMut, protocol: ProtocolVersion) -> CodecResult<()>;
}

/// Reaction to a decoded serverbound packet.
pub trait Handle {
    fn handle(self, session: &mut Session, server: &ServerSnapshot);
}

macro_rules! serverbound_packets {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// Any packet that can arrive from a client.
        #[derive(Debug, Clone, PartialEq)]
        pub enum ServerboundPacket {
            $($variant($ty),)*
        }

        impl ServerboundPacket {
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => <$ty as Packet>::NAME,)*
                }
            }

            pub fn handle(self, session: &mut Session, server: &ServerSnapshot) {
                match self {
                    $(Self::$variant(packet) => packet.handle(session, server),)*
                }
            }
        }

        $(
            impl From<$ty> for ServerboundPacket {
                fn from(packet: $ty) -> Self {
                    Self::$variant(packet)
                }
            }
        )*
    };
}

macro_rules! clientbound_packets {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// Any packet we can send to a client.
        #[derive(Debug, Clone, PartialEq)]
        pub enum ClientboundPacket {
            $($variant($ty),)*
        }

        impl ClientboundPacket {
            pub fn id(&self) -> i32 {
                match self {
                    $(Self::$variant(_) => <$ty as Encode>::CLIENTBOUND_ID,)*
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => <$ty as Packet>::NAME,)*
                }
            }

            pub fn state(&self) -> ConnectionState {
                match self {
                    $(Self::$variant(_) => <$ty as Packet>::STATE,)*
                }
            }

            pub fn encode(&self, buf: &mut BytesMut, protocol: ProtocolVersion) -> CodecResult<()> {
                match self {
                    $(Self::$variant(packet) => packet.encode(buf, protocol),)*
                }
            }
        }

        $(
            impl From<$ty> for ClientboundPacket {
                fn from(packet: $ty) -> Self {
                    Self::$variant(packet)
                }
            }
        )*
    };
}

serverbound_packets! {
    Handshake(Handshake),
    StatusRequest(StatusRequest),
    StatusPing(StatusPing),
    LoginStart(LoginStart),
    PlayChat(PlayChat),
    PluginMessage(PluginMessage),
    KeepAlive(KeepAlive),
}

clientbound_packets! {
    StatusResponse(StatusResponse),
    StatusPong(StatusPing),
    LoginDisconnect(LoginDisconnect),
    LoginSuccess(LoginSuccess),
    SetCompression(SetCompression),
    Message(Message),
    BossBar(BossBar),
    PluginMessage(PluginMessage),
    Disconnect(Disconnect),
    KeepAlive(KeepAlive),
    JoinGame(JoinGame),
    PlayerPositionLook(PlayerPositionLook),
    PlayerListHeaderFooter(PlayerListHeaderFooter),
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clientbound_ids() {
        let cases: Vec<(ClientboundPacket, i32)> = vec![
            (StatusResponse { json: String::new() }.into(), 0x00),
            (StatusPing { payload: 0 }.into(), 0x01),
            (LoginDisconnect { reason: String::new() }.into(), 0x00),
            (SetCompression { threshold: 256 }.into(), 0x03),
            (KeepAlive { id: 1 }.into(), 0x1F),
            (JoinGame::default().into(), 0x23),
            (PlayerPositionLook::default().into(), 0x2E),
            (PlayerListHeaderFooter::default().into(), 0x47),
            (
                PluginMessage {
                    channel: "MC|Brand".into(),
                    data: Vec::new(),
                }
                .into(),
                0x18,
            ),
            (Disconnect { reason: String::new() }.into(), 0x1A),
        ];
        for (packet, id) in cases {
            assert_eq!(packet.id(), id, "{}", packet.name());
        }
    }

    #[test]
    fn test_in_out_packets_use_direction_scoped_ids() {
        assert_eq!(<KeepAlive as Decode>::SERVERBOUND_ID, 0x0B);
        assert_eq!(<KeepAlive as Encode>::CLIENTBOUND_ID, 0x1F);
        assert_eq!(<PluginMessage as Decode>::SERVERBOUND_ID, 0x09);
        assert_eq!(<PluginMessage as Encode>::CLIENTBOUND_ID, 0x18);
        assert_eq!(<StatusPing as Decode>::SERVERBOUND_ID, 0x01);
        assert_eq!(<StatusPing as Encode>::CLIENTBOUND_ID, 0x01);
    }

    #[test]
    fn test_clientbound_states() {
        assert_eq!(
            ClientboundPacket::from(LoginDisconnect { reason: String::new() }).state(),
            ConnectionState::Login
        );
        assert_eq!(
            ClientboundPacket::from(Disconnect { reason: String::new() }).state(),
            ConnectionState::Play
        );
    }
}
