//! Raw TCP peer sessions: one task per connection, all sharing the store.

pub mod session;

use std::time::Duration;

use log::{error, info, warn};
use tokio::net::TcpListener;

pub use session::PeerSession;

use crate::state::AppState;

/// Accept connections forever, spawning a session for each.
pub async fn serve(listener: TcpListener, state: AppState, broadcast_interval: Duration) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("failed to accept peer connection: {e}");
                continue;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            warn!("failed to set TCP_NODELAY for {addr}: {e}");
        }
        info!("peer {addr} connected");

        let session = PeerSession::new(stream, state.clone(), broadcast_interval);
        tokio::spawn(async move {
            match session.run().await {
                Ok(()) => info!("peer {addr} disconnected"),
                Err(e) => warn!("peer {addr} session ended: {e}"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::time;

    use super::*;
    use crate::blockchain::{Block, ChainStore};

    #[tokio::test]
    async fn tcp_peers_share_one_chain() {
        let state = AppState::new(
            ChainStore::new(Block::genesis_at("t0".into()), 0),
            Duration::ZERO,
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state.clone(), Duration::from_secs(3600)));

        for bpm in [60, 61] {
            let mut conn = TcpStream::connect(addr).await.unwrap();
            conn.write_all(format!("{bpm}\n").as_bytes()).await.unwrap();
            let mut seen = String::new();
            let mut buf = [0u8; 256];
            let wait = async {
                while seen.matches(session::PROMPT).count() < 2 {
                    let n = conn.read(&mut buf).await.unwrap();
                    assert!(n > 0);
                    seen.push_str(std::str::from_utf8(&buf[..n]).unwrap());
                }
            };
            time::timeout(Duration::from_secs(5), wait).await.unwrap();
        }

        let chain = state.store.snapshot();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[2].measurement, 61);
        assert_eq!(chain[2].prev_hash, chain[1].hash);
    }
}
