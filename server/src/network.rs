//! Server network layer: WebSocket connections feeding the session event loop

use crate::error::ServerError;
use crate::registry::ConnectionId;
use crate::session::{Effect, Session, SessionEvent};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::parse_join;
use std::borrow::Cow;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout_at, Instant};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

/// How long a connection may take to answer our close frame
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        connection: ConnectionId,
        sender: mpsc::UnboundedSender<Outgoing>,
    },
    Session(SessionEvent),
}

/// Frames queued for one connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    Close { code: u16, reason: String },
}

impl Outgoing {
    fn into_message(self) -> Message {
        match self {
            Outgoing::Text(text) => Message::Text(text),
            Outgoing::Close { code, reason } => Message::Close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: Cow::Owned(reason),
            })),
        }
    }
}

/// Main server owning the session and the outgoing queue of every connection
pub struct Server {
    listener: Arc<TcpListener>,
    session: Session,
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<Outgoing>>,
    close_grace: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn bind(addr: &str, session: Session) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Arc::new(listener),
            session,
            connections: HashMap::new(),
            close_grace: DEFAULT_CLOSE_GRACE,
            server_tx,
            server_rx,
        })
    }

    /// Overrides how long a closed connection may stay registered while
    /// the peer fails to acknowledge the close frame
    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Spawns task that accepts sockets and gives each its own connection task
    fn spawn_acceptor(&self) {
        let listener = Arc::clone(&self.listener);
        let server_tx = self.server_tx.clone();
        let close_grace = self.close_grace;

        tokio::spawn(async move {
            let mut next_id = 0;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        next_id += 1;
                        let connection = ConnectionId(next_id);
                        tokio::spawn(serve_connection(
                            stream,
                            addr,
                            connection,
                            close_grace,
                            server_tx.clone(),
                        ));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }

                if server_tx.is_closed() {
                    break;
                }
            }
        });
    }

    /// Posts a countdown tick back to the loop once `delay` has elapsed
    fn spawn_tick(&self, generation: u64, delay: Duration) {
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let tick = SessionEvent::CountdownTick { generation };
            if server_tx.send(ServerMessage::Session(tick)).is_err() {
                debug!("Server gone before countdown tick {}", generation);
            }
        });
    }

    fn deliver(&self, to: ConnectionId, outgoing: Outgoing) {
        match self.connections.get(&to) {
            Some(sender) => {
                if sender.send(outgoing).is_err() {
                    debug!("Writer for {} already finished", to);
                }
            }
            None => debug!("Dropping frame for unknown connection {}", to),
        }
    }

    /// Carries out session effects in the order they were produced
    fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send { to, text } => self.deliver(to, Outgoing::Text(text)),
                Effect::Broadcast { text } => {
                    for connection in self.session.connections() {
                        self.deliver(connection, Outgoing::Text(text.clone()));
                    }
                }
                Effect::Close { to, code, reason } => {
                    self.deliver(to, Outgoing::Close { code, reason })
                }
                Effect::ScheduleTick { generation, delay } => self.spawn_tick(generation, delay),
            }
        }
    }

    fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Connected { connection, sender } => {
                self.connections.insert(connection, sender);
            }
            ServerMessage::Session(event) => {
                if let SessionEvent::Close { connection } = &event {
                    self.connections.remove(connection);
                }
                let effects = self.session.handle(event);
                self.apply(effects);
            }
        }
    }

    /// Main server loop. Every session transition happens here, one event at a time.
    pub async fn run(mut self) {
        self.spawn_acceptor();
        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            self.handle_message(message);
        }

        info!("Server shutting down");
    }
}

/// Turns one text frame into a session event. Only the first `/join` of a
/// connection is a join request; later ones are ordinary text.
fn inbound_event(connection: ConnectionId, text: String, join_sent: &mut bool) -> SessionEvent {
    if !*join_sent {
        if let Some(name) = parse_join(&text) {
            *join_sent = true;
            return SessionEvent::Join {
                connection,
                name: name.to_string(),
            };
        }
    }
    SessionEvent::Message { connection, text }
}

async fn handshake(stream: TcpStream) -> Result<WebSocketStream<TcpStream>, ServerError> {
    Ok(accept_async(stream).await?)
}

/// Runs one connection: a writer task draining its queue and this reader loop
async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    connection: ConnectionId,
    close_grace: Duration,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    let ws = match handshake(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("Handshake with {} failed: {}", addr, e);
            return;
        }
    };
    info!("Connection {} opened from {}", connection, addr);

    let (mut sink, mut source) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outgoing>();
    if server_tx
        .send(ServerMessage::Connected {
            connection,
            sender: tx,
        })
        .is_err()
    {
        return;
    }

    // Fires once the writer is done, normally right after a close frame
    let (writer_done_tx, mut writer_done) = oneshot::channel::<()>();

    tokio::spawn(async move {
        while let Some(outgoing) = rx.recv().await {
            let closing = matches!(outgoing, Outgoing::Close { .. });
            if let Err(e) = sink.send(outgoing.into_message()).await {
                debug!("Write to {} failed: {}", connection, e);
                break;
            }
            if closing {
                break;
            }
        }
        let _ = writer_done_tx.send(());
    });

    let mut join_sent = false;
    let mut deadline: Option<Instant> = None;

    loop {
        let frame = match deadline {
            Some(deadline) => match timeout_at(deadline, source.next()).await {
                Ok(frame) => frame,
                Err(_) => {
                    info!("Connection {} never answered the close frame", connection);
                    break;
                }
            },
            None => tokio::select! {
                frame = source.next() => frame,
                _ = &mut writer_done => {
                    deadline = Some(Instant::now() + close_grace);
                    continue;
                }
            },
        };

        let event = match frame {
            Some(Ok(Message::Text(text))) => inbound_event(connection, text, &mut join_sent),
            // Keep polling so the close reply is flushed; the stream then ends
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                let fault = SessionEvent::Fault {
                    connection,
                    reason: e.to_string(),
                };
                let _ = server_tx.send(ServerMessage::Session(fault));
                break;
            }
            None => break,
        };

        if server_tx.send(ServerMessage::Session(event)).is_err() {
            break;
        }
    }

    info!("Connection {} closed", connection);
    let _ = server_tx.send(ServerMessage::Session(SessionEvent::Close { connection }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MatchSettings;
    use crate::word_bank::WordBank;
    use futures_util::Stream;
    use shared::{join_message, CLOSE_INVALID_NAME};
    use tokio::time::timeout;
    use tokio_test::assert_ok;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite;

    async fn start_server() -> SocketAddr {
        start_server_with_grace(DEFAULT_CLOSE_GRACE).await
    }

    async fn start_server_with_grace(grace: Duration) -> SocketAddr {
        let settings = MatchSettings {
            sequence_length: 3,
            win_threshold: 2,
            countdown_steps: 1,
            step_delay: Duration::from_millis(10),
        };
        let session =
            Session::with_seed(settings, WordBank::new(["gato", "sol", "mar"]), 7).unwrap();
        let server = Server::bind("127.0.0.1:0", session)
            .await
            .unwrap()
            .with_close_grace(grace);
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        addr
    }

    /// Next text frame, or None once the peer closes
    async fn next_text<S>(ws: &mut S) -> Option<String>
    where
        S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        loop {
            let frame = timeout(Duration::from_secs(5), ws.next()).await.ok()??;
            match frame.ok()? {
                Message::Text(text) => return Some(text),
                Message::Close(_) => return None,
                _ => {}
            }
        }
    }

    async fn close_code<S>(ws: &mut S) -> Option<u16>
    where
        S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        loop {
            let frame = timeout(Duration::from_secs(5), ws.next()).await.ok()??;
            if let Message::Close(Some(close)) = frame.ok()? {
                return Some(u16::from(close.code));
            }
        }
    }

    #[test]
    fn test_outgoing_close_frame() {
        let message = Outgoing::Close {
            code: 4002,
            reason: "Name already in use".to_string(),
        }
        .into_message();

        match message {
            Message::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), 4002);
                assert_eq!(frame.reason, "Name already in use");
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_only_first_join_is_a_join_request() {
        let connection = ConnectionId(1);
        let mut join_sent = false;

        let event = inbound_event(connection, "hello".to_string(), &mut join_sent);
        assert!(matches!(event, SessionEvent::Message { .. }));
        assert!(!join_sent);

        let event = inbound_event(connection, "/JOIN ana".to_string(), &mut join_sent);
        assert_eq!(
            event,
            SessionEvent::Join {
                connection,
                name: "ana".to_string(),
            }
        );
        assert!(join_sent);

        let event = inbound_event(connection, "/join now please".to_string(), &mut join_sent);
        assert_eq!(
            event,
            SessionEvent::Message {
                connection,
                text: "/join now please".to_string(),
            }
        );
    }

    #[test]
    fn test_outgoing_text_frame() {
        let message = Outgoing::Text("Type: gato".to_string()).into_message();
        assert_eq!(message, Message::Text("Type: gato".to_string()));
    }

    #[tokio::test]
    async fn test_bind_reports_ephemeral_port() {
        let session = assert_ok!(Session::new(MatchSettings::default(), WordBank::builtin()));
        let server = assert_ok!(Server::bind("127.0.0.1:0", session).await);
        assert_ne!(assert_ok!(server.local_addr()).port(), 0);
    }

    #[tokio::test]
    async fn test_join_receives_welcome() {
        let addr = start_server().await;
        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        ws.send(Message::Text(join_message("ana"))).await.unwrap();

        let mut lines = Vec::new();
        while let Some(line) = next_text(&mut ws).await {
            let done = line == "1 player connected.";
            lines.push(line);
            if done {
                break;
            }
        }
        assert!(lines.contains(&"Welcome to Typerace!".to_string()));
        assert!(lines.contains(&"ana joined the lobby.".to_string()));
    }

    #[tokio::test]
    async fn test_message_before_join_is_corrected() {
        let addr = start_server().await;
        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
        ws.send(Message::Text("/ready".to_string())).await.unwrap();

        assert_eq!(
            next_text(&mut ws).await.as_deref(),
            Some("Join first with /join <name>.")
        );
    }

    #[tokio::test]
    async fn test_invalid_name_closes_with_code() {
        let addr = start_server().await;
        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        ws.send(Message::Text("/JOIN    ".to_string())).await.unwrap();

        assert_eq!(close_code(&mut ws).await, Some(CLOSE_INVALID_NAME));
    }

    #[tokio::test]
    async fn test_join_text_after_joining_is_not_fatal() {
        let addr = start_server().await;
        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        ws.send(Message::Text(join_message("ana"))).await.unwrap();
        while let Some(line) = next_text(&mut ws).await {
            if line == "1 player connected." {
                break;
            }
        }

        ws.send(Message::Text("/join now please".to_string()))
            .await
            .unwrap();
        assert_eq!(
            next_text(&mut ws).await.as_deref(),
            Some("Unknown command. Use /ready, /wait, /resume-waiting or /leave.")
        );

        // Still registered and talking
        ws.send(Message::Text("/ready".to_string())).await.unwrap();
        assert_eq!(
            next_text(&mut ws).await.as_deref(),
            Some("ana is ready to start.")
        );
    }

    #[tokio::test]
    async fn test_silent_peer_is_dropped_after_close_grace() {
        let addr = start_server_with_grace(Duration::from_millis(100)).await;
        let url = format!("ws://{}", addr);

        let (mut ana, _) = connect_async(url.as_str()).await.unwrap();
        ana.send(Message::Text(join_message("ana"))).await.unwrap();
        let (mut bea, _) = connect_async(url.as_str()).await.unwrap();
        bea.send(Message::Text(join_message("bea"))).await.unwrap();
        while let Some(line) = next_text(&mut ana).await {
            if line == "2 players connected." {
                break;
            }
        }

        // bea asks to leave and then never reads, so the close is never answered
        bea.send(Message::Text("/leave".to_string())).await.unwrap();

        let mut left = false;
        while let Some(line) = next_text(&mut ana).await {
            if line == "bea left." {
                left = true;
                break;
            }
        }
        assert!(left);
        drop(bea);
    }
}
