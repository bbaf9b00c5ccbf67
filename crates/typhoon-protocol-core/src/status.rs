use serde::Serialize;

use crate::snapshot::ServerSnapshot;
use crate::version::ProtocolVersion;

/// Version name shown in the server list.
pub const SERVER_VERSION_NAME: &str = "Typhoon";

#[derive(Serialize)]
struct StatusDocument<'a> {
    version: VersionInfo,
    players: Players,
    description: Description<'a>,
    favicon: &'a str,
    modinfo: ModInfo,
}

#[derive(Serialize)]
struct VersionInfo {
    name: &'static str,
    protocol: i32,
}

#[derive(Serialize)]
struct Players {
    max: usize,
    online: usize,
    sample: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct Description<'a> {
    text: &'a str,
}

/// Forge clients refuse to list a server without a mod list.
#[derive(Serialize)]
struct ModInfo {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "modList")]
    mod_list: Vec<serde_json::Value>,
}

/// Build the JSON status document.
///
/// Clients on a protocol we do not speak are shown [`ProtocolVersion::DEFAULT`]
/// so their launcher flags the mismatch. Unless the server is restricted the
/// displayed maximum never drops below the online count.
pub fn build_status_response(protocol: ProtocolVersion, server: &ServerSnapshot) -> String {
    let online = server.online_players();
    let max = if server.restricted {
        server.max_players
    } else {
        server.max_players.max(online)
    };
    let document = StatusDocument {
        version: VersionInfo {
            name: SERVER_VERSION_NAME,
            protocol: protocol.or_default().number(),
        },
        players: Players {
            max,
            online,
            sample: Vec::new(),
        },
        description: Description { text: &server.motd },
        favicon: server.favicon.as_deref().unwrap_or(""),
        modinfo: ModInfo {
            kind: "FML",
            mod_list: Vec::new(),
        },
    };
    serde_json::to_string(&document).unwrap_or_default()
}
