use crate::error::SessionError;
use crate::link::ServiceSession;
use async_trait::async_trait;
use aura_realtime_types::audio::Base64EncodedAudioBytes;
use aura_realtime_types::events::{client as client_events, ClientEvent, ServerEvent};
use aura_realtime_types::session::SessionConfig;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

mod config;
mod consts;
mod utils;

pub use config::Config;

pub type ClientTx = tokio::sync::mpsc::Sender<ClientEvent>;
type ServerTx = tokio::sync::broadcast::Sender<ServerEvent>;
pub type ServerRx = tokio::sync::broadcast::Receiver<ServerEvent>;

struct Connection {
    send_handle: tokio::task::JoinHandle<()>,
    recv_handle: tokio::task::JoinHandle<()>,
}

/// One streaming session to the speech model service.
///
/// Outbound events flow through an mpsc channel into a spawned send task;
/// inbound messages are parsed once and fanned out on a broadcast channel so
/// several consumers can observe the same event stream.
pub struct Client {
    capacity: usize,
    config: Config,
    c_tx: Option<ClientTx>,
    s_tx: Option<ServerTx>,
    connection: Option<Connection>,
}

impl Client {
    fn new(capacity: usize, config: Config) -> Self {
        Self {
            capacity,
            config,
            c_tx: None,
            s_tx: None,
            connection: None,
        }
    }

    async fn connect(&mut self) -> Result<(), SessionError> {
        if self.c_tx.is_some() {
            return Err(SessionError::AlreadyActive);
        }

        let request = utils::build_request(&self.config)
            .map_err(|e| SessionError::Connection(e.to_string()))?;
        let (ws_stream, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))?;

        let (mut write, mut read) = ws_stream.split();

        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel::<ClientEvent>(self.capacity);
        let (s_tx, _) = tokio::sync::broadcast::channel(self.capacity);

        self.c_tx = Some(c_tx.clone());
        self.s_tx = Some(s_tx.clone());

        let send_handle = tokio::spawn(async move {
            while let Some(event) = c_rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!("failed to send message: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize event: {}", e);
                    }
                }
            }
            // Sender side dropped: say goodbye to the service.
            if let Err(e) = write.close().await {
                tracing::debug!("websocket close: {}", e);
            }
        });

        let recv_handle = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        let _ = s_tx.send(ServerEvent::Error(
                            aura_realtime_types::events::server::ErrorEvent::new(e.to_string()),
                        ));
                        break;
                    }
                    Ok(message) => message,
                };
                match message {
                    Message::Text(text) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if let Err(e) = s_tx.send(event) {
                                tracing::error!("failed to fan out event: {}", e);
                            }
                        }
                        Err(e) => {
                            tracing::error!("failed to deserialize event: {}, text=> {:?}", e, text);
                        }
                    },
                    Message::Binary(bin) => {
                        tracing::warn!("unexpected binary message: {} bytes", bin.len());
                    }
                    Message::Close(reason) => {
                        tracing::info!("connection closed: {:?}", reason);
                        let _ = s_tx.send(ServerEvent::Close {
                            reason: reason.map(|f| f.reason.to_string()),
                        });
                        break;
                    }
                    _ => {}
                }
            }
        });

        self.connection = Some(Connection {
            send_handle,
            recv_handle,
        });
        Ok(())
    }

    /// Subscribes to the inbound event stream.
    pub fn server_events(&self) -> Result<ServerRx, SessionError> {
        match self.s_tx {
            Some(ref tx) => Ok(tx.subscribe()),
            None => Err(SessionError::NotConnected),
        }
    }

    async fn send_client_event(&mut self, event: ClientEvent) -> Result<(), SessionError> {
        match self.c_tx {
            Some(ref tx) => tx
                .send(event)
                .await
                .map_err(|e| SessionError::Connection(e.to_string())),
            None => Err(SessionError::NotConnected),
        }
    }
}

#[async_trait]
impl ServiceSession for Client {
    async fn configure(&mut self, config: SessionConfig) -> Result<(), SessionError> {
        let event =
            ClientEvent::SessionConfigure(client_events::SessionConfigureEvent::new(config));
        self.send_client_event(event).await
    }

    async fn append_audio(&mut self, audio: Base64EncodedAudioBytes) -> Result<(), SessionError> {
        let event = ClientEvent::InputAudioAppend(client_events::InputAudioAppendEvent::new(audio));
        self.send_client_event(event).await
    }

    async fn send_tool_result(
        &mut self,
        call_id: &str,
        name: &str,
        output: serde_json::Value,
    ) -> Result<(), SessionError> {
        let event = ClientEvent::ToolResult(client_events::ToolResultEvent::new(
            call_id.to_string(),
            name.to_string(),
            output,
        ));
        self.send_client_event(event)
            .await
            .map_err(|e| SessionError::ToolResponse(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        // Dropping the sender ends the send task, which closes the socket.
        self.c_tx.take();
        self.s_tx.take();
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.send_handle.await {
                tracing::debug!("send task ended: {}", e);
            }
            connection.recv_handle.abort();
        }
        Ok(())
    }
}

pub async fn connect_with_config(capacity: usize, config: Config) -> Result<Client, SessionError> {
    let mut client = Client::new(capacity, config);
    client.connect().await?;
    Ok(client)
}

pub async fn connect() -> Result<Client, SessionError> {
    let config = Config::new();
    connect_with_config(1024, config).await
}
