//! TCP connection to an INDI server
//!
//! A writer task drains the outbound command channel onto the socket and a
//! reader task decodes the server's XML stream into [`InboundEvent`]s.

use crate::error::{CcdError, CcdResult};
use crate::protocol::{
    encode_command, BlobMode, InboundEvent, MessageDecoder, OutboundCommand,
    INDI_PROTOCOL_VERSION,
};
use crate::transport::ChannelTransport;
use crate::INDI_DEFAULT_PORT;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

/// Server address and connection behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Timeout for establishing the TCP connection
    pub connection_timeout_secs: u64,
    /// Version announced in `getProperties`
    pub protocol_version: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: INDI_DEFAULT_PORT,
            connection_timeout_secs: 30,
            protocol_version: INDI_PROTOCOL_VERSION.to_string(),
        }
    }
}

impl ConnectionConfig {
    pub fn new(host: &str, port: Option<u16>) -> Self {
        Self {
            host: host.to_string(),
            port: port.unwrap_or(INDI_DEFAULT_PORT),
            ..Self::default()
        }
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Live connection to an INDI server
pub struct IndiConnection {
    config: ConnectionConfig,
    transport: ChannelTransport,
    connected: Arc<AtomicBool>,
    shutdown_tx: Option<watch::Sender<bool>>,
}

impl IndiConnection {
    /// Connect and request the property list.
    ///
    /// Returns the connection and the receiver of decoded server traffic.
    pub async fn connect(
        config: ConnectionConfig,
    ) -> CcdResult<(Self, mpsc::UnboundedReceiver<InboundEvent>)> {
        let addr = config.address();
        let connection_timeout = config.connection_timeout();

        let stream = match timeout(connection_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(CcdError::ConnectionFailed(format!(
                    "Failed to connect to INDI server at {}: {}. Check that the server is running and the address is correct.",
                    addr, e
                )));
            }
            Err(_) => {
                return Err(CcdError::ConnectionTimeout {
                    host: config.host.clone(),
                    port: config.port,
                    duration: connection_timeout,
                });
            }
        };
        tracing::info!("Connected to INDI server at {}", addr);

        let (read_half, write_half) = stream.into_split();
        let (transport, command_rx) = ChannelTransport::new();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let connected = Arc::new(AtomicBool::new(true));

        tokio::spawn(Self::writer_task(write_half, command_rx, shutdown_rx.clone()));
        tokio::spawn(Self::reader_task(
            read_half,
            event_tx,
            connected.clone(),
            shutdown_rx,
        ));

        let connection = Self {
            config,
            transport,
            connected,
            shutdown_tx: Some(shutdown_tx),
        };
        connection.get_properties(None)?;
        Ok((connection, event_rx))
    }

    /// Writer task - sends encoded commands to the server
    async fn writer_task<W: AsyncWrite + Unpin>(
        mut writer: W,
        mut rx: mpsc::UnboundedReceiver<OutboundCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            let command = tokio::select! {
                _ = shutdown.changed() => break,
                command = rx.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };
            let xml = encode_command(&command);
            tracing::trace!("INDI >> {}", xml);
            if let Err(e) = writer.write_all(xml.as_bytes()).await {
                tracing::error!("INDI write error: {}", e);
                break;
            }
            if let Err(e) = writer.write_all(b"\n").await {
                tracing::error!("INDI write error: {}", e);
                break;
            }
        }
        let _ = writer.shutdown().await;
    }

    /// Reader task - decodes server XML until EOF or shutdown
    async fn reader_task<R: AsyncRead + Unpin>(
        reader: R,
        events: mpsc::UnboundedSender<InboundEvent>,
        connected: Arc<AtomicBool>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut reader = quick_xml::reader::Reader::from_reader(tokio::io::BufReader::new(reader));
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut decoder = MessageDecoder::new();

        'read: loop {
            let result = tokio::select! {
                _ = shutdown.changed() => break,
                result = reader.read_event_into_async(&mut buf) => result,
            };

            match result {
                Ok(Event::Eof) => {
                    tracing::info!("INDI connection closed (EOF)");
                    break;
                }
                Ok(event) => {
                    for inbound in decoder.feed(event) {
                        if events.send(inbound).is_err() {
                            tracing::debug!("INDI event receiver dropped, stopping reader");
                            break 'read;
                        }
                    }
                }
                Err(quick_xml::Error::Io(e)) => {
                    tracing::error!("INDI read error: {}", e);
                    break;
                }
                Err(e) => {
                    tracing::error!("INDI XML parse error: {}", e);
                    // Continue on parse errors, drop the partial message
                    decoder.reset();
                }
            }
            buf.clear();
        }

        connected.store(false, Ordering::SeqCst);
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Transport for devices on this connection
    pub fn transport(&self) -> ChannelTransport {
        self.transport.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> CcdResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(CcdError::NotConnected)
        }
    }

    /// Request property definitions for one device, or all when `None`
    pub fn get_properties(&self, device: Option<&str>) -> CcdResult<()> {
        self.ensure_connected()?;
        self.transport.send_command(OutboundCommand::GetProperties {
            version: self.config.protocol_version.clone(),
            device: device.map(str::to_string),
        })
    }

    /// Ask the server to deliver BLOBs of `device`
    pub fn enable_blob(&self, device: &str, mode: BlobMode) -> CcdResult<()> {
        self.ensure_connected()?;
        self.transport.enable_blob(device, mode)
    }

    /// Stop both tasks and close the socket
    pub fn disconnect(&mut self) {
        tracing::info!("Disconnecting from INDI server {}", self.config.address());
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for IndiConnection {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
    }
}
