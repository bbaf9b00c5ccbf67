use bytes::{BufMut, BytesMut};
use tracing::{info, warn};
use typhoon_types::{
    BossBarColor, BossBarDivision, ChatPosition, Difficulty, Dimension, GameMode, LevelType,
    TextComponent,
};
use uuid::Uuid;

use super::{Decode, Encode, Handle, Packet};
use crate::codec::*;
use crate::session::Session;
use crate::snapshot::{DecodeLimits, ServerSnapshot};
use crate::state::ConnectionState;
use crate::version::{KeepAliveWidth, ProtocolVersion};

/// Channel names are short identifiers; anything longer is not a channel we
/// care about.
pub const MAX_CHANNEL_BYTES: usize = 20;

pub const BRAND_CHANNELS: [&str; 2] = ["MC|Brand", "minecraft:brand"];

pub const SERVER_BRAND: &[u8] = b"typhoonlimbo";

/// Placeholder written for an unset tab list header or footer.
pub const EMPTY_COMPONENT: &str = r#"{"translate":""}"#;

// === Chat ===

#[derive(Debug, Clone, PartialEq)]
pub struct PlayChat {
    pub message: String,
}

impl Packet for PlayChat {
    const NAME: &'static str = "PlayChat";
    const STATE: ConnectionState = ConnectionState::Play;
}

impl Decode for PlayChat {
    const SERVERBOUND_ID: i32 = 0x02;

    fn decode(
        buf: &mut BytesMut,
        _protocol: ProtocolVersion,
        limits: &DecodeLimits,
    ) -> CodecResult<Self> {
        Ok(Self {
            message: read_string(buf, limits.chat_message)?,
        })
    }
}

impl Handle for PlayChat {
    fn handle(self, session: &mut Session, _server: &ServerSnapshot) {
        // Commands are not dispatched here.
        if self.message.is_empty() || self.message.starts_with('/') {
            return;
        }
        let name = &session.profile().name;
        info!("<{}> {}", name, self.message);
        let component = TextComponent::plain(format!("<{}> {}", name, self.message)).to_json();
        session.send(Message {
            component,
            position: ChatPosition::ChatBox,
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// JSON text component.
    pub component: String,
    pub position: ChatPosition,
}

impl Packet for Message {
    const NAME: &'static str = "Message";
    const STATE: ConnectionState = ConnectionState::Play;
}

impl Encode for Message {
    const CLIENTBOUND_ID: i32 = 0x0F;

    fn encode(&self, buf: &mut BytesMut, protocol: ProtocolVersion) -> CodecResult<()> {
        write_string(buf, &self.component)?;
        if protocol.has_chat_position() {
            buf.put_u8(self.position.id());
        }
        Ok(())
    }
}

// === Boss bar ===

/// Boss bar operation. Each action carries exactly the fields it writes.
#[derive(Debug, Clone, PartialEq)]
pub enum BossBarAction {
    Add {
        /// JSON text component.
        title: String,
        health: f32,
        color: BossBarColor,
        division: BossBarDivision,
        flags: u8,
    },
    Remove,
    UpdateHealth(f32),
    UpdateTitle(String),
    UpdateStyle {
        color: BossBarColor,
        division: BossBarDivision,
        flags: u8,
    },
    UpdateFlags(u8),
}

impl BossBarAction {
    pub fn id(&self) -> i32 {
        match self {
            BossBarAction::Add { .. } => 0,
            BossBarAction::Remove => 1,
            BossBarAction::UpdateHealth(_) => 2,
            BossBarAction::UpdateTitle(_) => 3,
            BossBarAction::UpdateStyle { .. } => 4,
            BossBarAction::UpdateFlags(_) => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BossBar {
    pub uuid: Uuid,
    pub action: BossBarAction,
}

impl Packet for BossBar {
    const NAME: &'static str = "BossBar";
    const STATE: ConnectionState = ConnectionState::Play;
}

impl Encode for BossBar {
    const CLIENTBOUND_ID: i32 = 0x0C;

    fn encode(&self, buf: &mut BytesMut, _protocol: ProtocolVersion) -> CodecResult<()> {
        write_uuid(buf, &self.uuid);
        write_varint(buf, self.action.id());
        match &self.action {
            BossBarAction::Add {
                title,
                health,
                color,
                division,
                flags,
            } => {
                write_string(buf, title)?;
                buf.put_f32(*health);
                write_varint(buf, color.id());
                write_varint(buf, division.id());
                buf.put_u8(*flags);
            }
            BossBarAction::Remove => {}
            BossBarAction::UpdateHealth(health) => buf.put_f32(*health),
            BossBarAction::UpdateTitle(title) => write_string(buf, title)?,
            BossBarAction::UpdateStyle {
                color,
                division,
                flags,
            } => {
                write_varint(buf, color.id());
                write_varint(buf, division.id());
                buf.put_u8(*flags);
            }
            BossBarAction::UpdateFlags(flags) => buf.put_u8(*flags),
        }
        Ok(())
    }
}

// === Plugin channels ===

#[derive(Debug, Clone, PartialEq)]
pub struct PluginMessage {
    pub channel: String,
    pub data: Vec<u8>,
}

impl Packet for PluginMessage {
    const NAME: &'static str = "PluginMessage";
    const STATE: ConnectionState = ConnectionState::Play;
}

impl Decode for PluginMessage {
    const SERVERBOUND_ID: i32 = 0x09;

    fn decode(
        buf: &mut BytesMut,
        protocol: ProtocolVersion,
        _limits: &DecodeLimits,
    ) -> CodecResult<Self> {
        let length = buf.len();
        let (channel, read) = read_string_counted(buf, MAX_CHANNEL_BYTES)?;
        let data_length = if protocol.has_plugin_payload_length() {
            read_u16(buf)? as usize
        } else {
            length - read
        };
        let data = read_byte_array(buf, data_length)?;
        Ok(Self { channel, data })
    }
}

impl Encode for PluginMessage {
    const CLIENTBOUND_ID: i32 = 0x18;

    fn encode(&self, buf: &mut BytesMut, protocol: ProtocolVersion) -> CodecResult<()> {
        write_string(buf, &self.channel)?;
        if protocol.has_plugin_payload_length() {
            let len = u16::try_from(self.data.len())
                .map_err(|_| CodecError::PayloadTooLong(self.data.len(), u16::MAX as usize))?;
            buf.put_u16(len);
        }
        write_byte_array(buf, &self.data);
        Ok(())
    }
}

impl Handle for PluginMessage {
    fn handle(self, session: &mut Session, _server: &ServerSnapshot) {
        if !BRAND_CHANNELS.contains(&self.channel.as_str()) {
            return;
        }
        info!(
            "{} is using {} client",
            session.profile().name,
            String::from_utf8_lossy(&self.data)
        );
        session.send(PluginMessage {
            channel: self.channel,
            data: SERVER_BRAND.to_vec(),
        });
    }
}

// === Connection upkeep ===

#[derive(Debug, Clone, PartialEq)]
pub struct Disconnect {
    /// JSON text component.
    pub reason: String,
}

impl Packet for Disconnect {
    const NAME: &'static str = "Disconnect";
    const STATE: ConnectionState = ConnectionState::Play;
}

impl Encode for Disconnect {
    const CLIENTBOUND_ID: i32 = 0x1A;

    fn encode(&self, buf: &mut BytesMut, _protocol: ProtocolVersion) -> CodecResult<()> {
        write_string(buf, &self.reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeepAlive {
    pub id: i64,
}

impl Packet for KeepAlive {
    const NAME: &'static str = "KeepAlive";
    const STATE: ConnectionState = ConnectionState::Play;
}

impl Decode for KeepAlive {
    const SERVERBOUND_ID: i32 = 0x0B;

    fn decode(
        buf: &mut BytesMut,
        protocol: ProtocolVersion,
        _limits: &DecodeLimits,
    ) -> CodecResult<Self> {
        let id = match protocol.keep_alive_width() {
            KeepAliveWidth::Long => read_u64(buf)? as i64,
            KeepAliveWidth::Int => read_u32(buf)? as i64,
            KeepAliveWidth::VarInt => read_varint(buf)? as i64,
        };
        Ok(Self { id })
    }
}

impl Encode for KeepAlive {
    const CLIENTBOUND_ID: i32 = 0x1F;

    fn encode(&self, buf: &mut BytesMut, protocol: ProtocolVersion) -> CodecResult<()> {
        match protocol.keep_alive_width() {
            KeepAliveWidth::Long => buf.put_u64(self.id as u64),
            KeepAliveWidth::Int => buf.put_u32(self.id as u32),
            KeepAliveWidth::VarInt => write_varint(buf, self.id as i32),
        }
        Ok(())
    }
}

impl Handle for KeepAlive {
    fn handle(self, session: &mut Session, _server: &ServerSnapshot) {
        if session.protocol().validates_keep_alive() {
            if self.id != session.keep_alive_id() {
                warn!(
                    "{} answered keepalive {} but {} was sent",
                    session.profile().name,
                    self.id,
                    session.keep_alive_id()
                );
                session.kick("Invalid keepalive");
            }
        } else {
            session.set_keep_alive_id(self.id);
        }
    }
}

// === Join sequence ===

#[derive(Debug, Clone, PartialEq)]
pub struct JoinGame {
    pub entity_id: u32,
    pub game_mode: GameMode,
    pub dimension: Dimension,
    pub difficulty: Difficulty,
    pub max_players: u8,
    pub level_type: LevelType,
    pub reduced_debug_info: bool,
}

/// A spectator floating in an empty End.
impl Default for JoinGame {
    fn default() -> Self {
        Self {
            entity_id: 0,
            game_mode: GameMode::Spectator,
            dimension: Dimension::End,
            difficulty: Difficulty::Normal,
            max_players: 0xFF,
            level_type: LevelType::Default,
            reduced_debug_info: false,
        }
    }
}

impl Packet for JoinGame {
    const NAME: &'static str = "JoinGame";
    const STATE: ConnectionState = ConnectionState::Play;
}

impl Encode for JoinGame {
    const CLIENTBOUND_ID: i32 = 0x23;

    fn encode(&self, buf: &mut BytesMut, protocol: ProtocolVersion) -> CodecResult<()> {
        if protocol.has_byte_entity_id() {
            buf.put_u8(self.entity_id as u8);
        } else {
            buf.put_u32(self.entity_id);
        }
        buf.put_u8(self.game_mode.id());
        buf.put_i32(self.dimension.id());
        buf.put_u8(self.difficulty.id());
        buf.put_u8(self.max_players);
        write_string(buf, self.level_type.as_str())?;
        if protocol.has_reduced_debug_info() {
            write_bool(buf, self.reduced_debug_info);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerPositionLook {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub flags: u8,
    pub teleport_id: i32,
}

impl Packet for PlayerPositionLook {
    const NAME: &'static str = "PlayerPositionLook";
    const STATE: ConnectionState = ConnectionState::Play;
}

impl Encode for PlayerPositionLook {
    const CLIENTBOUND_ID: i32 = 0x2E;

    fn encode(&self, buf: &mut BytesMut, protocol: ProtocolVersion) -> CodecResult<()> {
        buf.put_f64(self.x);
        buf.put_f64(self.y);
        buf.put_f64(self.z);
        buf.put_f32(self.yaw);
        buf.put_f32(self.pitch);
        buf.put_u8(self.flags);
        if protocol.has_teleport_id() {
            write_varint(buf, self.teleport_id);
        }
        Ok(())
    }
}

/// Tab list header and footer. Both fields are always on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerListHeaderFooter {
    pub header: Option<String>,
    pub footer: Option<String>,
}

impl Packet for PlayerListHeaderFooter {
    const NAME: &'static str = "PlayerListHeaderFooter";
    const STATE: ConnectionState = ConnectionState::Play;
}

impl Encode for PlayerListHeaderFooter {
    const CLIENTBOUND_ID: i32 = 0x47;

    fn encode(&self, buf: &mut BytesMut, _protocol: ProtocolVersion) -> CodecResult<()> {
        write_string(buf, self.header.as_deref().unwrap_or(EMPTY_COMPONENT))?;
        write_string(buf, self.footer.as_deref().unwrap_or(EMPTY_COMPONENT))
    }
}
