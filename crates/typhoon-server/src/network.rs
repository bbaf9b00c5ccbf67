use anyhow::Result;
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, info_span, warn, Instrument};
use typhoon_protocol_core::{
    Connection, ConnectionState, PacketRegistry, ServerSnapshot, Session,
};
use uuid::Uuid;

/// Shared, read-only pieces every connection task needs.
#[derive(Clone)]
pub struct Shared {
    pub server: Arc<ServerSnapshot>,
    pub registry: Arc<PacketRegistry>,
    pub keepalive_interval: Duration,
}

/// Handle a single client connection from handshake until it closes.
pub async fn handle_connection<S>(stream: S, peer: SocketAddr, shared: Shared)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let span = info_span!("conn", %peer);
    async move {
        let mut session = Session::new(peer, Uuid::new_v4());
        match serve(Connection::new(stream), &mut session, &shared).await {
            Ok(()) => debug!("Connection closed"),
            Err(e) => debug!("Connection ended: {}", e),
        }
        if session.state() == ConnectionState::Play {
            info!("{} left", session.profile().name);
        }
    }
    .instrument(span)
    .await
}

async fn serve<S>(mut conn: Connection<S>, session: &mut Session, shared: &Shared) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut keep_alive = interval_at(
        Instant::now() + shared.keepalive_interval,
        shared.keepalive_interval,
    );
    keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut joined = false;

    loop {
        let in_play = session.state() == ConnectionState::Play;
        tokio::select! {
            frame = conn.read_packet() => {
                let (id, data) = frame?;
                if let Err(e) = session.process(&shared.registry, &shared.server, id, data) {
                    warn!("Dropping client after bad packet 0x{:02X}: {}", id, e);
                    session.close();
                }
            }
            _ = keep_alive.tick(), if in_play => {
                let id = rand::thread_rng().gen_range(1..=i32::MAX) as i64;
                session.send_keep_alive(id);
            }
        }

        if !joined && session.state() == ConnectionState::Play && !session.is_closing() {
            joined = true;
            info!(
                "{} ({}) joined with protocol {}",
                session.profile().name,
                session.profile().uuid,
                session.protocol()
            );
        }

        if !conn.flush_session(session).await? {
            return Ok(());
        }
    }
}
