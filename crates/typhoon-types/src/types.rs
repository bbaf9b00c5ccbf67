use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A player's identity as announced in Login Success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameProfile {
    pub uuid: Uuid,
    pub name: String,
}

impl GameProfile {
    pub fn new(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
        }
    }
}

/// Text component for chat messages (simplified JSON text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextComponent {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extra: Vec<TextComponent>,
}

impl TextComponent {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            bold: None,
            italic: None,
            extra: Vec::new(),
        }
    }

    /// Serialize to the JSON form sent on the wire.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"text":""}"#.to_string())
    }
}

/// Game mode enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum GameMode {
    Survival = 0,
    Creative = 1,
    Adventure = 2,
    Spectator = 3,
}

impl GameMode {
    pub fn id(self) -> u8 {
        self as u8
    }
}

/// Dimension as sent in Join Game (pre-registry protocol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum Dimension {
    Nether = -1,
    Overworld = 0,
    End = 1,
}

impl Dimension {
    pub fn id(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Difficulty {
    Peaceful = 0,
    Easy = 1,
    Normal = 2,
    Hard = 3,
}

impl Difficulty {
    pub fn id(self) -> u8 {
        self as u8
    }
}

/// World generator type shown to the client in Join Game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelType {
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "flat")]
    Flat,
    #[serde(rename = "largeBiomes")]
    LargeBiomes,
    #[serde(rename = "amplified")]
    Amplified,
    #[serde(rename = "default_1_1")]
    Default1_1,
}

impl LevelType {
    pub fn as_str(self) -> &'static str {
        match self {
            LevelType::Default => "default",
            LevelType::Flat => "flat",
            LevelType::LargeBiomes => "largeBiomes",
            LevelType::Amplified => "amplified",
            LevelType::Default1_1 => "default_1_1",
        }
    }
}

/// Where a clientbound chat message is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ChatPosition {
    ChatBox = 0,
    System = 1,
    ActionBar = 2,
}

impl ChatPosition {
    pub fn id(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum BossBarColor {
    #[default]
    Pink = 0,
    Blue = 1,
    Red = 2,
    Green = 3,
    Yellow = 4,
    Purple = 5,
    White = 6,
}

impl BossBarColor {
    pub fn id(self) -> i32 {
        self as i32
    }
}

/// Number of notches drawn on a boss bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BossBarDivision {
    #[default]
    #[serde(rename = "none")]
    NoDivision = 0,
    #[serde(rename = "notches_6")]
    SixNotches = 1,
    #[serde(rename = "notches_10")]
    TenNotches = 2,
    #[serde(rename = "notches_12")]
    TwelveNotches = 3,
    #[serde(rename = "notches_20")]
    TwentyNotches = 4,
}

impl BossBarDivision {
    pub fn id(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_component_json() {
        assert_eq!(TextComponent::plain("hello").to_json(), r#"{"text":"hello"}"#);
    }

    #[test]
    fn test_component_escapes_text() {
        let json = TextComponent::plain("say \"hi\" \\ bye\n").to_json();
        assert_eq!(json, r#"{"text":"say \"hi\" \\ bye\n"}"#);
    }

    #[test]
    fn test_ids() {
        assert_eq!(GameMode::Spectator.id(), 3);
        assert_eq!(Dimension::End.id(), 1);
        assert_eq!(Dimension::Nether.id(), -1);
        assert_eq!(Difficulty::Normal.id(), 2);
        assert_eq!(ChatPosition::ChatBox.id(), 0);
        assert_eq!(BossBarColor::White.id(), 6);
        assert_eq!(BossBarDivision::TwentyNotches.id(), 4);
        assert_eq!(LevelType::Default.as_str(), "default");
    }

    #[test]
    fn test_boss_bar_style_names() {
        let color: BossBarColor = serde_json::from_str(r#""purple""#).unwrap();
        assert_eq!(color, BossBarColor::Purple);
        let division: BossBarDivision = serde_json::from_str(r#""notches_10""#).unwrap();
        assert_eq!(division, BossBarDivision::TenNotches);
    }
}
