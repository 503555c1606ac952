use crate::input::InputManager;
use crate::rendering::Renderer;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use shared::{join_message, CLOSE_INVALID_NAME, CLOSE_LEAVE, CLOSE_NAME_IN_USE};
use std::borrow::Cow;
use std::io::Write;
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),
}

/// How the server ended the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnd {
    pub code: Option<u16>,
    pub reason: String,
}

impl SessionEnd {
    /// True when the server refused the name and another one may succeed
    pub fn should_retry_name(&self) -> bool {
        matches!(self.code, Some(CLOSE_NAME_IN_USE) | Some(CLOSE_INVALID_NAME))
    }
}

pub struct Client {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Client {
    /// Opens the connection and sends the join message for `name`
    pub async fn connect(url: &str, name: &str) -> Result<Self, ClientError> {
        let (mut ws, _) = connect_async(url).await?;
        info!("Connected to {}", url);

        ws.send(Message::Text(join_message(name))).await?;
        Ok(Client { ws })
    }

    /// Forwards typed lines and renders server lines until the connection ends.
    ///
    /// End of input closes the connection with the leave code.
    pub async fn run<R, W>(
        self,
        input: &mut InputManager<R>,
        renderer: &mut Renderer<W>,
    ) -> Result<SessionEnd, ClientError>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let (mut sink, mut source) = self.ws.split();
        let mut input_open = true;

        let end = loop {
            tokio::select! {
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(line))) => renderer.render_line(&line)?,
                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(frame) => SessionEnd {
                                code: Some(u16::from(frame.code)),
                                reason: frame.reason.into_owned(),
                            },
                            None => SessionEnd {
                                code: None,
                                reason: "Connection closed".to_string(),
                            },
                        };
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        break SessionEnd {
                            code: None,
                            reason: "Connection lost".to_string(),
                        };
                    }
                },

                line = input.next_line(), if input_open => match line? {
                    Some(text) => sink.send(Message::Text(text)).await?,
                    None => {
                        debug!("Input ended, leaving");
                        input_open = false;
                        let frame = CloseFrame {
                            code: CloseCode::from(CLOSE_LEAVE),
                            reason: Cow::Borrowed("Player left"),
                        };
                        sink.send(Message::Close(Some(frame))).await?;
                    }
                },
            }
        };

        // Completes the closing handshake
        while let Some(Ok(_)) = source.next().await {}

        info!("Session ended: {:?}", end);
        Ok(end)
    }
}
