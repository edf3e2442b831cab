//! Per-connection handling
//!
//! Each accepted socket is split into a read loop, which runs on the
//! connection task and forwards decoded intents to the hub, and a writer
//! task draining the connection's bounded outbound queue.
//!
//! Frames are newline-delimited JSON. A blank line is accepted as a
//! keepalive and only resets the idle timer.

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::protocol::decode_intent;
use crate::registry::ConnectionId;
use crate::server::config::ServerConfig;
use crate::server::hub::RelayHandle;

/// How long the writer may keep flushing queued frames after the read side ends
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A client connection bound to the relay hub
pub struct ClientConnection<S> {
    id: ConnectionId,
    stream: S,
    config: ServerConfig,
    hub: RelayHandle,
}

impl<S> ClientConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(id: ConnectionId, stream: S, config: ServerConfig, hub: RelayHandle) -> Self {
        Self {
            id,
            stream,
            config,
            hub,
        }
    }

    /// Serve the connection until the peer leaves or an error occurs
    ///
    /// The hub always sees a disconnect for this connection before this
    /// returns, whatever the outcome.
    pub async fn run(self) -> Result<()> {
        let Self {
            id,
            stream,
            config,
            hub,
        } = self;

        let (reader, writer) = tokio::io::split(stream);
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity);
        hub.connect(id, outbound_tx).await?;

        let mut writer_task = tokio::spawn(write_loop(writer, outbound_rx));
        let mut writer_done = false;

        let result = tokio::select! {
            result = read_loop(id, reader, &config, &hub) => result,
            joined = &mut writer_task => {
                writer_done = true;
                match joined {
                    Ok(result) => result,
                    Err(e) => Err(std::io::Error::from(e).into()),
                }
            }
        };

        let disconnected = hub.disconnect(id).await;

        // The hub dropped our queue on disconnect, so the writer ends once
        // it has flushed what was already queued.
        if !writer_done && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer_task).await.is_err() {
            tracing::debug!(connection = %id, "Writer did not drain in time");
            writer_task.abort();
        }

        result.and(disconnected)
    }
}

async fn read_loop<R>(
    id: ConnectionId,
    reader: R,
    config: &ServerConfig,
    hub: &RelayHandle,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    let limit = config.max_message_size as u64 + 1;

    loop {
        line.clear();

        let read = tokio::time::timeout(
            config.idle_timeout,
            (&mut reader).take(limit).read_until(b'\n', &mut line),
        )
        .await
        .map_err(|_| Error::IdleTimeout)??;

        if read == 0 {
            return Ok(());
        }
        if line.len() > config.max_message_size {
            return Err(Error::MessageTooLarge {
                limit: config.max_message_size,
            });
        }

        let frame = match std::str::from_utf8(&line) {
            Ok(text) => text.trim(),
            Err(e) => {
                tracing::warn!(connection = %id, error = %e, "Dropping frame that is not UTF-8");
                continue;
            }
        };
        if frame.is_empty() {
            continue;
        }

        match decode_intent(frame) {
            Ok(intent) => hub.intent(id, intent).await?,
            Err(e) => {
                tracing::warn!(connection = %id, error = %e, "Dropping undecodable frame");
            }
        }
    }
}

async fn write_loop<W>(mut writer: W, mut outbound: mpsc::Receiver<Bytes>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = outbound.recv().await {
        writer.write_all(&frame).await?;
    }
    writer.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Participant, ServerEvent};
    use crate::relay::Relay;
    use crate::server::hub::RelayHub;
    use tokio::io::{DuplexStream, Lines, ReadHalf, WriteHalf};
    use tokio::task::JoinHandle;
    use tokio_test::assert_ok;

    struct TestClient {
        lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl TestClient {
        async fn send(&mut self, frame: &str) {
            self.writer.write_all(frame.as_bytes()).await.unwrap();
        }

        async fn next_event(&mut self) -> ServerEvent {
            let line = self.lines.next_line().await.unwrap().unwrap();
            serde_json::from_str(&line).unwrap()
        }
    }

    fn spawn_connection(config: ServerConfig) -> (TestClient, RelayHandle, JoinHandle<Result<()>>) {
        let (hub, _hub_task) = RelayHub::spawn(Relay::new(), 16);
        let (client, server) = tokio::io::duplex(4096);
        let conn = ClientConnection::new(ConnectionId(1), server, config, hub.clone());
        let task = tokio::spawn(conn.run());

        let (reader, writer) = tokio::io::split(client);
        let client = TestClient {
            lines: BufReader::new(reader).lines(),
            writer,
        };
        (client, hub, task)
    }

    #[tokio::test]
    async fn test_announce_gets_presence_list() {
        let (mut client, _hub, _task) = spawn_connection(ServerConfig::default());

        client
            .send("{\"event\":\"announce\",\"data\":{\"name\":\"Alice\"}}\n")
            .await;

        assert_eq!(
            client.next_event().await,
            ServerEvent::PresenceList(vec![Participant::new(ConnectionId(1), "Alice")])
        );
    }

    #[tokio::test]
    async fn test_bad_frames_are_skipped() {
        let (mut client, _hub, _task) = spawn_connection(ServerConfig::default());

        client.send("not json\n").await;
        client.send("\n").await;
        client.send("{\"event\":\"rewind\",\"data\":{}}\n").await;
        client.send("{\"event\":\"announce\"}\n").await;

        assert_eq!(
            client.next_event().await,
            ServerEvent::PresenceList(vec![Participant::new(ConnectionId(1), "guest")])
        );
    }

    #[tokio::test]
    async fn test_invalid_utf8_frame_is_skipped() {
        let (mut client, _hub, task) = spawn_connection(ServerConfig::default());

        client.writer.write_all(b"\xff\xfe\n").await.unwrap();
        client
            .send("{\"event\":\"announce\",\"data\":{\"name\":\"Alice\"}}\n")
            .await;

        assert_eq!(
            client.next_event().await,
            ServerEvent::PresenceList(vec![Participant::new(ConnectionId(1), "Alice")])
        );
        assert!(!task.is_finished());
    }

    #[tokio::test]
    async fn test_oversized_frame_closes_connection() {
        let config = ServerConfig::default().max_message_size(32);
        let (mut client, _hub, task) = spawn_connection(config);

        let padding = "x".repeat(64);
        client
            .send(&format!("{{\"event\":\"announce\",\"data\":{{\"name\":\"{}\"}}}}\n", padding))
            .await;

        let result = task.await.unwrap();
        assert!(matches!(result, Err(Error::MessageTooLarge { limit: 32 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_connection_times_out() {
        let config = ServerConfig::default().idle_timeout(Duration::from_secs(5));
        let (_client, hub, task) = spawn_connection(config);

        let result = task.await.unwrap();
        assert!(matches!(result, Err(Error::IdleTimeout)));

        let stats = assert_ok!(hub.stats().await);
        assert_eq!(stats.connections_active, 0);
    }

    #[tokio::test]
    async fn test_peer_close_runs_disconnect() {
        let (mut client, hub, task) = spawn_connection(ServerConfig::default());

        client
            .send("{\"event\":\"announce\",\"data\":{\"name\":\"Alice\"}}\n")
            .await;
        client.next_event().await;
        assert_eq!(hub.stats().await.unwrap().participants, 1);

        drop(client);

        assert_ok!(task.await.unwrap());
        let stats = hub.stats().await.unwrap();
        assert_eq!(stats.participants, 0);
        assert_eq!(stats.connections_active, 0);
        assert_eq!(stats.connections_total, 1);
    }
}
