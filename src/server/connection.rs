//! Connection handling
//!
//! Handshake for both ends plus the hub's per-peer reader task.
//!
//! ```text
//! client                          hub
//!   ── Hello { role, name } ──────>  admit()
//!   <───────── Welcome { peer_id }   (or Rejected { reason }, then close)
//!   ── Snapshot / Command ... ────>  on_frame() → mailbox + relay
//! ```

use anyhow::{bail, Context};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, FramedParts, FramedWrite};
use tracing::{debug, info, warn};

use super::hub::HubContext;
use super::link::PeerLink;
use crate::protocol::{PeerId, ProtocolError, Role, WireCodec, WireFrame};

/// Time allowed for each side of the handshake
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub(super) type WireStream = Framed<TcpStream, WireCodec>;

/// Reading half of a connection, keeping the codec and its counters
pub(super) type WireReader = Framed<OwnedReadHalf, WireCodec>;

/// Writing half of a connection
pub(super) type WireWriter = FramedWrite<OwnedWriteHalf, WireCodec>;

/// Split a handshaken connection into independent halves
///
/// Bytes already buffered by the reader carry over, so frames that arrived
/// together with the handshake are not lost.
pub(super) fn split_wire(framed: WireStream) -> (WireReader, WireWriter) {
    let parts = framed.into_parts();
    let (read_half, write_half) = parts.io.into_split();

    let mut read_parts = FramedParts::new::<WireFrame>(read_half, parts.codec);
    read_parts.read_buf = parts.read_buf;

    (
        Framed::from_parts(read_parts),
        FramedWrite::new(write_half, WireCodec::new()),
    )
}

/// Serve one accepted connection until it closes
pub(super) async fn serve_peer(stream: TcpStream, addr: SocketAddr, hub: HubContext) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("set_nodelay failed for {}: {}", addr, e);
    }
    let mut framed = Framed::new(stream, WireCodec::new());

    let (role, name) = match tokio::time::timeout(HANDSHAKE_TIMEOUT, framed.next()).await {
        Ok(Some(Ok(WireFrame::Hello { role, name }))) => (role, name),
        Ok(Some(Ok(other))) => {
            warn!("{} sent {} before hello, closing", addr, other.kind());
            let reason = format!("expected hello, got {}", other.kind());
            let _ = framed.send(WireFrame::Rejected { reason }).await;
            return;
        }
        Ok(Some(Err(e))) => {
            warn!("Handshake with {} failed: {}", addr, e);
            return;
        }
        Ok(None) => {
            debug!("{} closed before hello", addr);
            return;
        }
        Err(_) => {
            warn!("{} sent no hello within {:?}", addr, HANDSHAKE_TIMEOUT);
            return;
        }
    };

    let admitted = hub.registry.lock().admit(role, &name);
    let peer_id = match admitted {
        Ok(id) => id,
        Err(reason) => {
            info!("Rejecting {} '{}' from {}: {}", role, name, addr, reason);
            let _ = framed.send(WireFrame::Rejected { reason }).await;
            return;
        }
    };

    if let Err(e) = framed.send(WireFrame::Welcome { peer_id }).await {
        warn!("Welcome to {} failed: {}", addr, e);
        hub.registry.lock().remove(peer_id);
        return;
    }
    info!("Peer {} joined as {} '{}' from {}", peer_id, role, name, addr);

    let (mut frames, sink) = split_wire(framed);
    let (link, _writer) = PeerLink::spawn(peer_id, sink, hub.queue_depth);
    hub.registry.lock().attach(peer_id, link);

    let mut relay = hub.transport();
    while let Some(frame) = frames.next().await {
        match frame {
            Ok(frame) => {
                if let Err(e) = hub.on_frame(peer_id, frame, &mut relay) {
                    warn!("Peer {}: {}", peer_id, e);
                    if !e.is_recoverable() {
                        break;
                    }
                }
            }
            Err(e) => {
                warn!("Read from peer {} failed: {}", peer_id, e);
                break;
            }
        }
    }

    hub.registry.lock().remove(peer_id);

    let skipped = frames.codec().skipped_frames();
    if skipped > 0 {
        warn!("Peer {} sent {} undecodable frames", peer_id, skipped);
    }
    info!("Peer {} ({}) left", peer_id, addr);
}

/// Connect to a hub and complete the handshake
pub(super) async fn connect(
    server: &str,
    role: Role,
    name: &str,
) -> anyhow::Result<(PeerId, WireStream)> {
    let stream = TcpStream::connect(server)
        .await
        .with_context(|| format!("Failed to connect to {}", server))?;
    stream.set_nodelay(true)?;

    let mut framed = Framed::new(stream, WireCodec::new());
    framed
        .send(WireFrame::Hello {
            role,
            name: name.to_string(),
        })
        .await
        .context("Failed to send hello")?;

    match tokio::time::timeout(HANDSHAKE_TIMEOUT, framed.next()).await {
        Ok(Some(Ok(WireFrame::Welcome { peer_id }))) => {
            info!("Connected to {} as {} (peer {})", server, role, peer_id);
            Ok((peer_id, framed))
        }
        Ok(Some(Ok(WireFrame::Rejected { reason }))) => Err(ProtocolError::Rejected(reason).into()),
        Ok(Some(Ok(other))) => bail!("Unexpected {} frame during handshake", other.kind()),
        Ok(Some(Err(e))) => Err(e).context("Handshake failed"),
        Ok(None) => bail!("Server closed connection during handshake"),
        Err(_) => bail!("Timed out waiting for server welcome"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    async fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (client.unwrap(), accepted.unwrap().0)
    }

    #[tokio::test]
    async fn test_split_keeps_buffered_frames() {
        let (client, server) = pair().await;
        let mut client = Framed::new(client, WireCodec::new());
        let mut server = Framed::new(server, WireCodec::new());

        // Both frames land in one read on the server
        client
            .feed(WireFrame::Hello {
                role: Role::Owner,
                name: "phone".into(),
            })
            .await
            .unwrap();
        client.feed(WireFrame::Welcome { peer_id: 9 }).await.unwrap();
        client.flush().await.unwrap();

        assert!(matches!(server.next().await, Some(Ok(WireFrame::Hello { .. }))));
        let (mut reader, mut writer) = split_wire(server);
        assert_eq!(reader.next().await.unwrap().unwrap(), WireFrame::Welcome { peer_id: 9 });

        writer.send(WireFrame::Welcome { peer_id: 1 }).await.unwrap();
        assert_eq!(client.next().await.unwrap().unwrap(), WireFrame::Welcome { peer_id: 1 });
    }

    #[tokio::test]
    async fn test_reader_counts_undecodable_frames() {
        let (mut client, server) = pair().await;
        let (mut reader, _writer) = split_wire(Framed::new(server, WireCodec::new()));

        let garbage = br#"{"type":"warp"}"#;
        client.write_u32(garbage.len() as u32).await.unwrap();
        client.write_all(garbage).await.unwrap();
        let mut client = Framed::new(client, WireCodec::new());
        client.send(WireFrame::Welcome { peer_id: 2 }).await.unwrap();

        assert_eq!(reader.next().await.unwrap().unwrap(), WireFrame::Welcome { peer_id: 2 });
        assert_eq!(reader.codec().skipped_frames(), 1);
    }
}
