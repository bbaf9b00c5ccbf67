use std::net::SocketAddr;

use bytes::{Buf, BytesMut};
use tracing::{debug, trace, warn};
use typhoon_types::{GameProfile, TextComponent};
use uuid::Uuid;

use crate::codec::CodecResult;
use crate::packets::{ClientboundPacket, Disconnect, KeepAlive, LoginDisconnect};
use crate::registry::PacketRegistry;
use crate::snapshot::{OnlineGuard, ServerSnapshot};
use crate::state::ConnectionState;
use crate::version::ProtocolVersion;

/// Something a handler wants done on the wire, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Packet(ClientboundPacket),
    /// Frame everything after this point with compression.
    EnableCompression(i32),
    /// Flush what came before and close the connection.
    Close,
}

/// Per-connection protocol state.
///
/// Packet handlers only see this type: they can read what the client told
/// us, move the state machine forward, and queue output. The transport
/// drains the queue with [`Session::take_outbound`] after every frame.
#[derive(Debug)]
pub struct Session {
    remote: SocketAddr,
    state: ConnectionState,
    protocol: ProtocolVersion,
    virtual_host: Option<(String, u16)>,
    profile: GameProfile,
    compression_threshold: Option<i32>,
    keep_alive_id: i64,
    /// Player slot held from login until the session is dropped.
    slot: Option<OnlineGuard>,
    outbound: Vec<Outbound>,
    closing: bool,
}

impl Session {
    pub fn new(remote: SocketAddr, uuid: Uuid) -> Self {
        Self {
            remote,
            state: ConnectionState::Handshaking,
            protocol: ProtocolVersion::DEFAULT,
            virtual_host: None,
            profile: GameProfile::new(uuid, ""),
            compression_threshold: None,
            keep_alive_id: 0,
            slot: None,
            outbound: Vec::new(),
            closing: false,
        }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    pub fn set_protocol(&mut self, protocol: ProtocolVersion) {
        self.protocol = protocol;
    }

    /// Address and port the client says it connected to.
    pub fn virtual_host(&self) -> Option<(&str, u16)> {
        self.virtual_host
            .as_ref()
            .map(|(address, port)| (address.as_str(), *port))
    }

    pub fn set_virtual_host(&mut self, address: String, port: u16) {
        self.virtual_host = Some((address, port));
    }

    pub fn profile(&self) -> &GameProfile {
        &self.profile
    }

    pub fn set_name(&mut self, name: String) {
        self.profile.name = name;
    }

    /// Move to `next` if the state machine allows it. Returns whether the
    /// transition happened.
    pub fn transition(&mut self, next: ConnectionState) -> bool {
        if !self.state.can_transition_to(next) {
            warn!(
                "Refusing state transition {:?} -> {:?} for {}",
                self.state, next, self.remote
            );
            return false;
        }
        trace!("{}: {:?} -> {:?}", self.remote, self.state, next);
        self.state = next;
        true
    }

    pub fn hold_slot(&mut self, slot: OnlineGuard) {
        self.slot = Some(slot);
    }

    pub fn holds_slot(&self) -> bool {
        self.slot.is_some()
    }

    pub fn compression_threshold(&self) -> Option<i32> {
        self.compression_threshold
    }

    /// Turn compression on for every later frame. Once on it stays on with
    /// its first threshold.
    pub fn enable_compression(&mut self, threshold: i32) {
        if self.compression_threshold.is_some() {
            debug!("Compression already active for {}", self.remote);
            return;
        }
        self.compression_threshold = Some(threshold);
        self.push(Outbound::EnableCompression(threshold));
    }

    /// Last keepalive id sent (or, on old protocols, received).
    pub fn keep_alive_id(&self) -> i64 {
        self.keep_alive_id
    }

    pub fn set_keep_alive_id(&mut self, id: i64) {
        self.keep_alive_id = id;
    }

    pub fn send_keep_alive(&mut self, id: i64) {
        self.keep_alive_id = id;
        self.send(KeepAlive { id });
    }

    pub fn send(&mut self, packet: impl Into<ClientboundPacket>) {
        let packet = packet.into();
        if packet.state() != self.state {
            warn!(
                "Sending {} in {:?} state to {}",
                packet.name(),
                self.state,
                self.remote
            );
        }
        self.push(Outbound::Packet(packet));
    }

    /// Disconnect with a human readable reason. In Login and Play the client
    /// is told why first.
    pub fn kick(&mut self, reason: &str) {
        let reason = TextComponent::plain(reason).to_json();
        match self.state {
            ConnectionState::Login => self.send(LoginDisconnect { reason }),
            ConnectionState::Play => self.send(Disconnect { reason }),
            ConnectionState::Handshaking | ConnectionState::Status => {}
        }
        self.close();
    }

    pub fn close(&mut self) {
        self.push(Outbound::Close);
        self.closing = true;
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbound)
    }

    fn push(&mut self, outbound: Outbound) {
        if self.closing {
            trace!("Dropping {:?} queued after close for {}", outbound, self.remote);
            return;
        }
        self.outbound.push(outbound);
    }

    /// Decode one frame body and run its handler. Unregistered ids are
    /// skipped; codec failures are returned and the connection should go.
    pub fn process(
        &mut self,
        registry: &PacketRegistry,
        server: &ServerSnapshot,
        id: i32,
        mut data: BytesMut,
    ) -> CodecResult<()> {
        if self.closing {
            return Ok(());
        }
        let packet = registry.decode(self.state, id, &mut data, self.protocol, &server.limits)?;
        match packet {
            Some(packet) => {
                if data.has_remaining() {
                    trace!(
                        "{} left {} trailing bytes from {}",
                        packet.name(),
                        data.remaining(),
                        self.remote
                    );
                }
                trace!("Handling {} from {}", packet.name(), self.remote);
                packet.handle(self, server);
            }
            None => {
                debug!(
                    "Ignoring unknown packet id=0x{:02X} in {:?} state from {}",
                    id, self.state, self.remote
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{write_string, write_varint};
    use crate::packets::{Encode, Handshake, LoginStart, StatusPing};
    use bytes::BufMut;

    fn session() -> Session {
        Session::new("10.0.0.1:5000".parse().unwrap(), Uuid::nil())
    }

    fn body<P: Encode>(packet: &P) -> BytesMut {
        let mut buf = BytesMut::new();
        packet.encode(&mut buf, ProtocolVersion::DEFAULT).unwrap();
        buf
    }

    #[test]
    fn test_full_login_flow() {
        let registry = PacketRegistry::serverbound();
        let server = ServerSnapshot {
            compression_threshold: None,
            ..ServerSnapshot::default()
        };
        let mut session = session();

        let handshake = Handshake {
            protocol_version: ProtocolVersion::V1_11,
            server_address: "localhost".into(),
            server_port: 25565,
            next_state: 2,
        };
        session.process(&registry, &server, 0x00, body(&handshake)).unwrap();
        assert_eq!(session.state(), ConnectionState::Login);

        session
            .process(&registry, &server, 0x00, body(&LoginStart { name: "Bob".into() }))
            .unwrap();
        assert_eq!(session.state(), ConnectionState::Play);
        assert_eq!(session.profile().name, "Bob");
        assert_eq!(session.take_outbound().len(), 3);

        // Handshake id in Play state means nothing.
        session.process(&registry, &server, 0x00, body(&handshake)).unwrap();
        assert_eq!(session.state(), ConnectionState::Play);
        assert!(session.take_outbound().is_empty());
    }

    #[test]
    fn test_status_flow() {
        let registry = PacketRegistry::serverbound();
        let server = ServerSnapshot::default();
        let mut session = session();
        let handshake = Handshake {
            protocol_version: ProtocolVersion::V1_8,
            server_address: "localhost".into(),
            server_port: 25565,
            next_state: 1,
        };
        session.process(&registry, &server, 0x00, body(&handshake)).unwrap();
        session.process(&registry, &server, 0x00, BytesMut::new()).unwrap();
        session
            .process(&registry, &server, 0x01, body(&StatusPing { payload: 99 }))
            .unwrap();
        let outbound = session.take_outbound();
        assert_eq!(outbound.len(), 2);
        assert!(matches!(
            &outbound[0],
            Outbound::Packet(ClientboundPacket::StatusResponse(_))
        ));
        assert_eq!(
            outbound[1],
            Outbound::Packet(ClientboundPacket::StatusPong(StatusPing { payload: 99 }))
        );
        assert_eq!(session.state(), ConnectionState::Status);
    }

    #[test]
    fn test_malformed_packet_is_error() {
        let registry = PacketRegistry::serverbound();
        let server = ServerSnapshot::default();
        let mut session = session();
        let mut data = BytesMut::new();
        write_varint(&mut data, 340);
        write_string(&mut data, &"x".repeat(300)).unwrap();
        data.put_u16(25565);
        data.put_u8(2);
        assert!(session.process(&registry, &server, 0x00, data).is_err());
        assert_eq!(session.state(), ConnectionState::Handshaking);
    }

    #[test]
    fn test_sends_after_close_are_dropped() {
        let mut session = session();
        session.transition(ConnectionState::Login);
        session.kick("bye");
        session.send(LoginDisconnect {
            reason: "again".into(),
        });
        session.enable_compression(5);
        assert_eq!(
            session.take_outbound(),
            vec![
                Outbound::Packet(
                    LoginDisconnect {
                        reason: r#"{"text":"bye"}"#.into()
                    }
                    .into()
                ),
                Outbound::Close,
            ]
        );
    }

    #[test]
    fn test_kick_in_status_only_closes() {
        let mut session = session();
        session.transition(ConnectionState::Status);
        session.kick("bye");
        assert_eq!(session.take_outbound(), vec![Outbound::Close]);
    }

    #[test]
    fn test_compression_is_one_way() {
        let mut session = session();
        session.enable_compression(256);
        session.enable_compression(16);
        assert_eq!(session.compression_threshold(), Some(256));
        assert_eq!(session.take_outbound(), vec![Outbound::EnableCompression(256)]);
    }

    #[test]
    fn test_illegal_transitions_refused() {
        let mut session = session();
        assert!(!session.transition(ConnectionState::Play));
        assert!(session.transition(ConnectionState::Status));
        assert!(!session.transition(ConnectionState::Login));
        assert_eq!(session.state(), ConnectionState::Status);
    }
}
