use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::packets::{
    BossBar, ClientboundPacket, JoinGame, Message, PlayerListHeaderFooter, PlayerPositionLook,
};

/// Per-field byte limits applied to strings read from clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeLimits {
    pub handshake_address: usize,
    pub player_name: usize,
    pub chat_message: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            handshake_address: 255,
            player_name: 16,
            chat_message: 256,
        }
    }
}

/// Packets pushed to every client right after Login Success. Built once at
/// startup and only ever cloned from.
#[derive(Debug, Clone, Default)]
pub struct JoinSequence {
    pub join_game: JoinGame,
    pub position: PlayerPositionLook,
    pub message: Option<Message>,
    pub boss_bar: Option<BossBar>,
    pub header_footer: Option<PlayerListHeaderFooter>,
}

impl JoinSequence {
    pub fn packets(&self) -> impl Iterator<Item = ClientboundPacket> + '_ {
        [
            Some(ClientboundPacket::from(self.join_game.clone())),
            Some(self.position.clone().into()),
        ]
        .into_iter()
        .chain([
            self.message.clone().map(ClientboundPacket::from),
            self.boss_bar.clone().map(ClientboundPacket::from),
            self.header_footer.clone().map(ClientboundPacket::from),
        ])
        .flatten()
    }
}

/// Number of clients currently in Play state.
#[derive(Debug, Clone, Default)]
pub struct PlayerCount(Arc<AtomicUsize>);

impl PlayerCount {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    /// Count one player until the returned guard is dropped.
    pub fn register(&self) -> OnlineGuard {
        self.0.fetch_add(1, Ordering::Relaxed);
        OnlineGuard(self.0.clone())
    }

    /// Like [`PlayerCount::register`], but only while fewer than `max` are
    /// counted. Check and increment are one atomic step.
    pub fn try_register(&self, max: usize) -> Option<OnlineGuard> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |online| {
                (online < max).then_some(online + 1)
            })
            .ok()?;
        Some(OnlineGuard(self.0.clone()))
    }
}

/// Keeps a player counted as online.
#[derive(Debug)]
pub struct OnlineGuard(Arc<AtomicUsize>);

impl Drop for OnlineGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Process-wide server state visible to packet handlers.
///
/// Handlers only read it. Configuration fills it in at startup and the
/// connection driver maintains the player count.
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    pub max_players: usize,
    /// When set, logins past `max_players` are refused and the status
    /// response keeps showing the configured maximum.
    pub restricted: bool,
    pub motd: String,
    /// `data:image/png;base64,...` URI.
    pub favicon: Option<String>,
    /// `Some` enables compression for clients that support it.
    pub compression_threshold: Option<i32>,
    pub limits: DecodeLimits,
    pub join: JoinSequence,
    pub players: PlayerCount,
}

impl Default for ServerSnapshot {
    fn default() -> Self {
        Self {
            max_players: 20,
            restricted: false,
            motd: "A Typhoon limbo".into(),
            favicon: None,
            compression_threshold: Some(256),
            limits: DecodeLimits::default(),
            join: JoinSequence::default(),
            players: PlayerCount::default(),
        }
    }
}

impl ServerSnapshot {
    pub fn online_players(&self) -> usize {
        self.players.get()
    }

    pub fn register_player(&self) -> OnlineGuard {
        self.players.register()
    }

    /// Claim a player slot. Only a restricted server can run out.
    pub fn reserve_slot(&self) -> Option<OnlineGuard> {
        if self.restricted {
            self.players.try_register(self.max_players)
        } else {
            Some(self.players.register())
        }
    }
}
