use base64::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use typhoon_protocol_core::packets::{
    BossBar, BossBarAction, Message, PlayerListHeaderFooter,
};
use typhoon_protocol_core::{DecodeLimits, JoinSequence, ServerSnapshot};
use typhoon_types::{BossBarColor, BossBarDivision, ChatPosition, TextComponent};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    #[serde(default = "default_motd")]
    pub motd: String,
    /// Refuse logins past `max_players`.
    #[serde(default)]
    pub restricted: bool,
    /// Path to a 64x64 PNG shown in the server list.
    #[serde(default)]
    pub favicon: Option<PathBuf>,
    #[serde(default = "default_compression")]
    pub compression: bool,
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: i32,
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_secs: u64,
    #[serde(default)]
    pub buffers: BufferConfig,
    /// Sent as a chat message right after joining.
    #[serde(default)]
    pub join_message: Option<String>,
    #[serde(default)]
    pub boss_bar: Option<BossBarConfig>,
    #[serde(default)]
    pub player_list: Option<PlayerListConfig>,
}

/// Byte limits for strings read from clients.
#[derive(Debug, Deserialize)]
pub struct BufferConfig {
    #[serde(default = "default_handshake_address")]
    pub handshake_address: usize,
    #[serde(default = "default_player_name")]
    pub player_name: usize,
    #[serde(default = "default_chat_message")]
    pub chat_message: usize,
}

#[derive(Debug, Deserialize)]
pub struct BossBarConfig {
    pub title: String,
    #[serde(default = "default_boss_bar_health")]
    pub health: f32,
    #[serde(default)]
    pub color: BossBarColor,
    #[serde(default)]
    pub division: BossBarDivision,
}

#[derive(Debug, Deserialize)]
pub struct PlayerListConfig {
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub footer: Option<String>,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    25565
}

fn default_max_players() -> usize {
    20
}

fn default_motd() -> String {
    "A Typhoon limbo".into()
}

fn default_compression() -> bool {
    true
}

fn default_compression_threshold() -> i32 {
    256
}

fn default_keepalive_interval() -> u64 {
    10
}

fn default_handshake_address() -> usize {
    255
}

fn default_player_name() -> usize {
    16
}

fn default_chat_message() -> usize {
    256
}

fn default_boss_bar_health() -> f32 {
    1.0
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            handshake_address: default_handshake_address(),
            player_name: default_player_name(),
            chat_message: default_chat_message(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_players: default_max_players(),
            motd: default_motd(),
            restricted: false,
            favicon: None,
            compression: default_compression(),
            compression_threshold: default_compression_threshold(),
            keepalive_interval_secs: default_keepalive_interval(),
            buffers: BufferConfig::default(),
            join_message: None,
            boss_bar: None,
            player_list: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: ServerConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            info!("No config file found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Freeze the configuration into what packet handlers get to see.
    pub fn to_snapshot(&self) -> ServerSnapshot {
        let join = JoinSequence {
            message: self.join_message.as_deref().map(|text| Message {
                component: component_json(text),
                position: ChatPosition::ChatBox,
            }),
            boss_bar: self.boss_bar.as_ref().map(|bar| BossBar {
                uuid: Uuid::new_v4(),
                action: BossBarAction::Add {
                    title: component_json(&bar.title),
                    health: bar.health.clamp(0.0, 1.0),
                    color: bar.color,
                    division: bar.division,
                    flags: 0,
                },
            }),
            header_footer: self.player_list.as_ref().map(|list| PlayerListHeaderFooter {
                header: list.header.as_deref().map(component_json),
                footer: list.footer.as_deref().map(component_json),
            }),
            ..JoinSequence::default()
        };

        ServerSnapshot {
            max_players: self.max_players,
            restricted: self.restricted,
            motd: self.motd.clone(),
            favicon: self.favicon.as_deref().map(load_favicon),
            compression_threshold: self.compression_threshold(),
            limits: DecodeLimits {
                handshake_address: self.buffers.handshake_address,
                player_name: self.buffers.player_name,
                chat_message: self.buffers.chat_message,
            },
            join,
            ..ServerSnapshot::default()
        }
    }

    /// Clients read a negative threshold as "compression off", so one
    /// here turns compression off for everybody.
    fn compression_threshold(&self) -> Option<i32> {
        if !self.compression {
            return None;
        }
        if self.compression_threshold < 0 {
            warn!(
                "compression_threshold {} is negative, compression disabled",
                self.compression_threshold
            );
            return None;
        }
        Some(self.compression_threshold)
    }

    pub fn keepalive_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.keepalive_interval_secs.max(1))
    }
}

/// Accept either a JSON text component or plain text.
fn component_json(text: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) if value.is_object() || value.is_array() => value.to_string(),
        _ => TextComponent::plain(text).to_json(),
    }
}

fn load_favicon(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(png) => {
            let mut uri = String::from("data:image/png;base64,");
            BASE64_STANDARD.encode_string(png, &mut uri);
            uri
        }
        Err(e) => {
            warn!("Could not read favicon {}: {}", path.display(), e);
            String::new()
        }
    }
}
