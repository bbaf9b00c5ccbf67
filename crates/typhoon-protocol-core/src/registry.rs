use std::collections::HashMap;

use bytes::BytesMut;
use tracing::warn;

use crate::codec::CodecResult;
use crate::packets::*;
use crate::snapshot::DecodeLimits;
use crate::state::ConnectionState;
use crate::version::ProtocolVersion;

pub type DecodeFn =
    fn(&mut BytesMut, ProtocolVersion, &DecodeLimits) -> CodecResult<ServerboundPacket>;

#[derive(Clone, Copy)]
struct Entry {
    name: &'static str,
    decode: DecodeFn,
}

fn decode_into<P>(
    buf: &mut BytesMut,
    protocol: ProtocolVersion,
    limits: &DecodeLimits,
) -> CodecResult<ServerboundPacket>
where
    P: Decode + Into<ServerboundPacket>,
{
    P::decode(buf, protocol, limits).map(Into::into)
}

/// Serverbound packet lookup, one table per connection state.
///
/// The same numeric id means different packets in different states (0x00 is
/// Handshake, Status Request or Login Start), so lookups always go through
/// the state first.
pub struct PacketRegistry {
    tables: [HashMap<i32, Entry>; 4],
}

impl PacketRegistry {
    pub fn empty() -> Self {
        Self {
            tables: Default::default(),
        }
    }

    /// Every packet this server understands.
    pub fn serverbound() -> Self {
        let mut registry = Self::empty();
        registry.register::<Handshake>();
        registry.register::<StatusRequest>();
        registry.register::<StatusPing>();
        registry.register::<LoginStart>();
        registry.register::<PlayChat>();
        registry.register::<PluginMessage>();
        registry.register::<KeepAlive>();
        registry
    }

    /// Register `P` under its own state and serverbound id.
    pub fn register<P>(&mut self)
    where
        P: Decode + Into<ServerboundPacket>,
    {
        let entry = Entry {
            name: P::NAME,
            decode: decode_into::<P>,
        };
        if let Some(previous) = self.tables[P::STATE.index()].insert(P::SERVERBOUND_ID, entry) {
            warn!(
                "{} replaces {} as {:?} packet 0x{:02X}",
                P::NAME,
                previous.name,
                P::STATE,
                P::SERVERBOUND_ID
            );
        }
    }

    /// Name of the packet registered for `(state, id)`, if any.
    pub fn lookup(&self, state: ConnectionState, id: i32) -> Option<&'static str> {
        self.tables[state.index()].get(&id).map(|entry| entry.name)
    }

    /// Decode a frame body. `Ok(None)` means nothing is registered for
    /// `(state, id)`; callers skip such frames.
    pub fn decode(
        &self,
        state: ConnectionState,
        id: i32,
        buf: &mut BytesMut,
        protocol: ProtocolVersion,
        limits: &DecodeLimits,
    ) -> CodecResult<Option<ServerboundPacket>> {
        match self.tables[state.index()].get(&id) {
            Some(entry) => (entry.decode)(buf, protocol, limits).map(Some),
            None => Ok(None),
        }
    }
}

impl Default for PacketRegistry {
    fn default() -> Self {
        Self::serverbound()
    }
}
