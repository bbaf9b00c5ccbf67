use std::fmt;

/// A protocol version number as advertised in the handshake.
///
/// Versions compare numerically, which matches release order. All wire-layout
/// branches go through the predicates below so that packets sharing a version
/// boundary cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion(pub i32);

impl ProtocolVersion {
    pub const V1_7_2: Self = Self(4);
    pub const V1_7_6: Self = Self(5);
    pub const V1_8: Self = Self(47);
    pub const V1_9: Self = Self(107);
    pub const V1_9_1: Self = Self(108);
    pub const V1_9_2: Self = Self(109);
    pub const V1_9_4: Self = Self(110);
    pub const V1_10: Self = Self(210);
    pub const V1_11: Self = Self(315);
    pub const V1_11_1: Self = Self(316);
    pub const V1_12: Self = Self(335);
    pub const V1_12_1: Self = Self(338);
    pub const V1_12_2: Self = Self(340);

    /// Every version this server speaks, newest first. The first entry is
    /// what status requests from unknown clients are told.
    pub const COMPATIBLE: &'static [ProtocolVersion] = &[
        Self::V1_12_2,
        Self::V1_12_1,
        Self::V1_12,
        Self::V1_11_1,
        Self::V1_11,
        Self::V1_10,
        Self::V1_9_4,
        Self::V1_9_2,
        Self::V1_9_1,
        Self::V1_9,
        Self::V1_8,
        Self::V1_7_6,
        Self::V1_7_2,
    ];

    pub const DEFAULT: Self = Self::COMPATIBLE[0];

    pub fn number(self) -> i32 {
        self.0
    }

    /// Set membership, not a range check: 100 sits between 1.8 and 1.9 but
    /// is not a version anybody ships.
    pub fn is_compatible(self) -> bool {
        Self::COMPATIBLE.contains(&self)
    }

    /// The advertised version if we speak it, otherwise [`Self::DEFAULT`].
    pub fn or_default(self) -> Self {
        if self.is_compatible() {
            self
        } else {
            Self::DEFAULT
        }
    }

    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::V1_7_2 => "1.7.2",
            Self::V1_7_6 => "1.7.6",
            Self::V1_8 => "1.8",
            Self::V1_9 => "1.9",
            Self::V1_9_1 => "1.9.1",
            Self::V1_9_2 => "1.9.2",
            Self::V1_9_4 => "1.9.4",
            Self::V1_10 => "1.10",
            Self::V1_11 => "1.11",
            Self::V1_11_1 => "1.11.1",
            Self::V1_12 => "1.12",
            Self::V1_12_1 => "1.12.1",
            Self::V1_12_2 => "1.12.2",
            _ => return None,
        };
        Some(name)
    }

    // === Wire layout predicates ===

    /// Set Compression exists from 1.8 on.
    pub fn supports_compression(self) -> bool {
        self >= Self::V1_8
    }

    /// Before 1.8 plugin message payloads carry a u16 length prefix.
    pub fn has_plugin_payload_length(self) -> bool {
        self < Self::V1_8
    }

    /// Chat position byte in clientbound chat.
    pub fn has_chat_position(self) -> bool {
        self > Self::V1_7_6
    }

    /// Reduced debug info flag in Join Game.
    pub fn has_reduced_debug_info(self) -> bool {
        self > Self::V1_7_6
    }

    /// Join Game entity id is a single byte up to and including 1.9.
    pub fn has_byte_entity_id(self) -> bool {
        self <= Self::V1_9
    }

    /// Teleport id trailing Player Position And Look.
    pub fn has_teleport_id(self) -> bool {
        self > Self::V1_8
    }

    /// Whether a keepalive reply must match the last id we sent.
    pub fn validates_keep_alive(self) -> bool {
        self > Self::V1_8
    }

    pub fn keep_alive_width(self) -> KeepAliveWidth {
        if self >= Self::V1_12_2 {
            KeepAliveWidth::Long
        } else if self <= Self::V1_7_6 {
            KeepAliveWidth::Int
        } else {
            KeepAliveWidth::VarInt
        }
    }
}

/// Wire encoding of a keepalive id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveWidth {
    /// Unsigned 32-bit.
    Int,
    VarInt,
    /// Unsigned 64-bit.
    Long,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", self.0, name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<i32> for ProtocolVersion {
    fn from(value: i32) -> Self {
        Self(value)
    }
}
