//! WebSocket client for the backend's Socket.IO push channel.

use std::collections::VecDeque;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::config::{BackendConfig, PushConfig};
use crate::error::{Error, Result};
use crate::router::{PushCommand, PushEvent};

use super::codec::{
    decode_engine, decode_socket, encode_event, encode_pong, EnginePacket, SocketPacket,
    CONNECT_FRAME,
};

/// Maximum delay between reconnect attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// What the push channel reports to the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The namespace connect was acknowledged
    Connected,
    /// The socket closed or failed; a reconnect follows
    Disconnected { reason: String },
    /// A decoded push event
    Event(PushEvent),
}

/// What to do with one incoming frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameAction {
    Reply(String),
    Emit(ChannelEvent),
    Close,
    Ignore,
}

/// Decide how to handle one incoming text frame.
///
/// Malformed or unknown push events are logged and ignored. Only engine-level
/// framing errors and a refused namespace connect are returned.
pub fn process_frame(frame: &str) -> Result<FrameAction> {
    let packet = decode_engine(frame)?;

    Ok(match packet {
        EnginePacket::Open(handshake) => {
            tracing::debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "Engine open");
            FrameAction::Reply(CONNECT_FRAME.to_string())
        }
        EnginePacket::Ping(data) => FrameAction::Reply(encode_pong(&data)),
        EnginePacket::Close => FrameAction::Close,
        EnginePacket::Message(body) => process_socket(&body)?,
        EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => FrameAction::Ignore,
    })
}

fn process_socket(body: &str) -> Result<FrameAction> {
    let packet = match decode_socket(body) {
        Ok(packet) => packet,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed socket packet");
            return Ok(FrameAction::Ignore);
        }
    };

    Ok(match packet {
        SocketPacket::Connect => FrameAction::Emit(ChannelEvent::Connected),
        SocketPacket::Disconnect => FrameAction::Close,
        SocketPacket::ConnectError(message) => {
            return Err(Error::Protocol(format!("connect refused: {}", message)))
        }
        SocketPacket::Event { name, payload } => match PushEvent::decode(&name, payload) {
            Ok(Some(event)) => FrameAction::Emit(ChannelEvent::Event(event)),
            Ok(None) => {
                tracing::debug!(event = %name, "Ignoring unknown push event");
                FrameAction::Ignore
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed push event");
                FrameAction::Ignore
            }
        },
        SocketPacket::Unsupported(kind) => {
            tracing::debug!(kind = %kind, "Ignoring unsupported socket packet");
            FrameAction::Ignore
        }
    })
}

/// Derive the Socket.IO WebSocket URL from the backend base URL.
pub fn socket_url(base_url: &str) -> Result<String> {
    let base = base_url.trim().trim_end_matches('/');
    let ws = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        return Err(Error::Config(format!(
            "cannot derive push URL from {:?}",
            base_url
        )));
    };
    Ok(format!("{}/socket.io/?EIO=4&transport=websocket", ws))
}

/// How a connected session ended.
enum SessionEnd {
    /// Remote closed; reconnect
    Closed,
    /// Our command channel closed; stop for good
    Shutdown,
}

/// Commands waiting for a connected namespace.
///
/// Commands are held across reconnects and leave in request order once the
/// backend acknowledges the namespace connect.
#[derive(Debug, Default)]
struct Outbox {
    queued: VecDeque<PushCommand>,
    connected: bool,
}

impl Outbox {
    fn push(&mut self, command: PushCommand) {
        if !self.connected {
            tracing::info!(command = command.event_name(), "Push channel not ready, queueing command");
        }
        self.queued.push_back(command);
    }

    fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// The next command to send, if the channel is connected.
    fn ready(&self) -> Option<PushCommand> {
        if self.connected {
            self.queued.front().copied()
        } else {
            None
        }
    }

    /// Drop the command returned by [`ready`](Self::ready) after it was sent.
    fn sent(&mut self) {
        self.queued.pop_front();
    }

    fn len(&self) -> usize {
        self.queued.len()
    }
}

/// Long-running push channel client with reconnects.
pub struct PushClient {
    url: String,
    reconnect: Duration,
}

impl PushClient {
    pub fn new(push: &PushConfig, backend: &BackendConfig) -> Result<Self> {
        let url = match &push.url {
            Some(url) => url.clone(),
            None => socket_url(&backend.base_url)?,
        };
        Ok(Self {
            url,
            reconnect: Duration::from_secs(push.reconnect_secs.max(1)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run the client in the background until `commands` is closed.
    ///
    /// Commands received while the socket is down are queued and sent after
    /// the next successful connect.
    pub fn spawn(
        self,
        events: mpsc::Sender<ChannelEvent>,
        commands: mpsc::UnboundedReceiver<PushCommand>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(events, commands))
    }

    async fn run(
        self,
        events: mpsc::Sender<ChannelEvent>,
        mut commands: mpsc::UnboundedReceiver<PushCommand>,
    ) {
        let mut outbox = Outbox::default();
        let mut backoff = self.reconnect;
        loop {
            tracing::debug!(url = %self.url, "Connecting push channel");
            let reason = match tokio_tungstenite::connect_async(self.url.as_str()).await {
                Ok((ws, _)) => {
                    backoff = self.reconnect;
                    let end = self.session(ws, &events, &mut commands, &mut outbox).await;
                    outbox.set_connected(false);
                    match end {
                        Ok(SessionEnd::Shutdown) => {
                            tracing::info!("Push channel shutting down");
                            return;
                        }
                        Ok(SessionEnd::Closed) => "closed by server".to_string(),
                        Err(e) => e.to_string(),
                    }
                }
                Err(e) => format!("connect failed: {}", e),
            };

            tracing::warn!(reason = %reason, retry_in = ?backoff, queued = outbox.len(), "Push channel down");
            if events
                .send(ChannelEvent::Disconnected { reason })
                .await
                .is_err()
            {
                return;
            }

            let retry = tokio::time::sleep(backoff);
            tokio::pin!(retry);
            loop {
                tokio::select! {
                    _ = &mut retry => break,
                    command = commands.recv() => match command {
                        Some(command) => outbox.push(command),
                        None => return,
                    },
                }
            }
            backoff = std::cmp::min(backoff * 2, MAX_BACKOFF);
        }
    }

    async fn session<W>(
        &self,
        ws: W,
        events: &mpsc::Sender<ChannelEvent>,
        commands: &mut mpsc::UnboundedReceiver<PushCommand>,
        outbox: &mut Outbox,
    ) -> Result<SessionEnd>
    where
        W: futures::Stream<Item = std::result::Result<Message, WsError>>
            + futures::Sink<Message, Error = WsError>
            + Unpin,
    {
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => match process_frame(&text)? {
                        FrameAction::Reply(reply) => sink
                            .send(Message::Text(reply))
                            .await
                            .map_err(|e| Error::Transport(e.to_string()))?,
                        FrameAction::Emit(event) => {
                            let connected = event == ChannelEvent::Connected;
                            if events.send(event).await.is_err() {
                                return Ok(SessionEnd::Shutdown);
                            }
                            if connected {
                                outbox.set_connected(true);
                                flush(&mut sink, outbox).await?;
                            }
                        }
                        FrameAction::Close => return Ok(SessionEnd::Closed),
                        FrameAction::Ignore => {}
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(Error::Transport(e.to_string())),
                },
                command = commands.recv() => match command {
                    Some(command) => {
                        outbox.push(command);
                        flush(&mut sink, outbox).await?;
                    }
                    None => {
                        let _ = sink.close().await;
                        return Ok(SessionEnd::Shutdown);
                    }
                },
            }
        }
    }
}

/// Send every queued command the outbox releases.
async fn flush<S>(sink: &mut S, outbox: &mut Outbox) -> Result<()>
where
    S: futures::Sink<Message, Error = WsError> + Unpin,
{
    while let Some(command) = outbox.ready() {
        tracing::debug!(command = command.event_name(), "Emitting command");
        sink.send(Message::Text(encode_event(command.event_name(), None)))
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        outbox.sent();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RosterRole;

    #[test]
    fn test_socket_url() {
        assert_eq!(
            socket_url("http://127.0.0.1:5000/").unwrap(),
            "ws://127.0.0.1:5000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            socket_url("https://example.com").unwrap(),
            "wss://example.com/socket.io/?EIO=4&transport=websocket"
        );
        assert!(socket_url("example.com").is_err());
    }

    #[test]
    fn test_push_url_override() {
        let push = PushConfig {
            url: Some("ws://other/socket.io/?EIO=4&transport=websocket".to_string()),
            ..Default::default()
        };
        let client = PushClient::new(&push, &BackendConfig::default()).unwrap();
        assert_eq!(client.url(), "ws://other/socket.io/?EIO=4&transport=websocket");
    }

    #[test]
    fn test_handshake_frames() {
        assert_eq!(
            process_frame(r#"0{"sid":"s","pingInterval":25000,"pingTimeout":20000}"#).unwrap(),
            FrameAction::Reply("40".to_string())
        );
        assert_eq!(
            process_frame(r#"40{"sid":"n"}"#).unwrap(),
            FrameAction::Emit(ChannelEvent::Connected)
        );
        assert_eq!(process_frame("2").unwrap(), FrameAction::Reply("3".to_string()));
        assert_eq!(process_frame("1").unwrap(), FrameAction::Close);
        assert_eq!(process_frame("41").unwrap(), FrameAction::Close);
    }

    #[test]
    fn test_event_frames() {
        let action =
            process_frame(r#"42["enemies_found",{"enemies":[{"gameName":"A","tagLine":"1"}]}]"#)
                .unwrap();
        let FrameAction::Emit(ChannelEvent::Event(PushEvent::Roster(batch))) = action else {
            panic!("expected roster event, got {:?}", action);
        };
        assert_eq!(batch.role, RosterRole::Enemies);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_unknown_and_malformed_events_are_ignored() {
        assert_eq!(
            process_frame(r#"42["vision_update",{}]"#).unwrap(),
            FrameAction::Ignore
        );
        assert_eq!(
            process_frame(r#"42["status_update",{}]"#).unwrap(),
            FrameAction::Ignore
        );
    }

    #[test]
    fn test_broken_socket_packets_are_dropped() {
        assert_eq!(
            process_frame(r#"42["enemies_found",{"enemies":[{"#).unwrap(),
            FrameAction::Ignore
        );
        assert_eq!(process_frame("42[42]").unwrap(), FrameAction::Ignore);
        assert_eq!(process_frame("49").unwrap(), FrameAction::Ignore);
        assert_eq!(process_frame("4").unwrap(), FrameAction::Ignore);
    }

    #[test]
    fn test_engine_framing_errors_fail_session() {
        assert!(process_frame("").is_err());
        assert!(process_frame("9").is_err());
        assert!(process_frame("0not json").is_err());
    }

    #[test]
    fn test_connect_error_fails_session() {
        assert!(process_frame(r#"44{"message":"nope"}"#).is_err());
    }

    #[test]
    fn test_outbox_holds_commands_until_connected() {
        let mut outbox = Outbox::default();
        outbox.push(PushCommand::StartAutoAccept);
        outbox.push(PushCommand::StartAutoAnalyze);
        assert_eq!(outbox.ready(), None);

        outbox.set_connected(true);
        assert_eq!(outbox.ready(), Some(PushCommand::StartAutoAccept));
        outbox.sent();
        assert_eq!(outbox.ready(), Some(PushCommand::StartAutoAnalyze));

        // Lost again before the second one went out.
        outbox.set_connected(false);
        assert_eq!(outbox.ready(), None);
        assert_eq!(outbox.len(), 1);
    }

    async fn next_text<S>(ws: &mut S) -> String
    where
        S: futures::Stream<Item = std::result::Result<Message, WsError>> + Unpin,
    {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text,
                Some(Ok(_)) => continue,
                other => panic!("socket ended: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_command_sent_while_down_is_delivered_after_reconnect() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let push = PushConfig {
            url: Some(format!(
                "ws://{}/socket.io/?EIO=4&transport=websocket",
                listener.local_addr().unwrap()
            )),
            reconnect_secs: 1,
        };
        let client = PushClient::new(&push, &BackendConfig::default()).unwrap();
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let handle = client.spawn(event_tx, command_rx);

        let scenario = async {
            // First attempt dies before the WebSocket handshake.
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
            assert!(matches!(
                event_rx.recv().await,
                Some(ChannelEvent::Disconnected { .. })
            ));

            command_tx.send(PushCommand::StartAutoAccept).unwrap();

            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(
                r#"0{"sid":"s","pingInterval":25000,"pingTimeout":20000}"#.to_string(),
            ))
            .await
            .unwrap();
            assert_eq!(next_text(&mut ws).await, "40");

            ws.send(Message::Text(r#"40{"sid":"n"}"#.to_string()))
                .await
                .unwrap();
            assert_eq!(event_rx.recv().await, Some(ChannelEvent::Connected));
            assert_eq!(next_text(&mut ws).await, r#"42["start_auto_accept"]"#);
        };
        tokio::time::timeout(Duration::from_secs(10), scenario)
            .await
            .expect("scenario timed out");

        drop(command_tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("client did not stop")
            .unwrap();
    }
}
