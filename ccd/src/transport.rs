//! Outbound transport
//!
//! Property mutations are fire-and-forget: a chip hands the mutated vector to
//! a [`PropertyTransport`] and returns without waiting for confirmation. The
//! device learns the outcome from the next inbound update.

use crate::error::{CcdError, CcdResult};
use crate::property::Property;
use crate::protocol::{BlobMode, OutboundCommand};
use tokio::sync::mpsc;

/// Sends mutated properties to the remote device
pub trait PropertyTransport: Send + Sync {
    /// Queue a `new*Vector` carrying every element of `property`
    fn send_property(&self, property: &Property);
}

/// Transport backed by an unbounded command channel
///
/// The receiving half is usually owned by the writer task of an
/// [`IndiConnection`](crate::connection::IndiConnection). Order of calls is
/// preserved on the wire.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<OutboundCommand>,
}

impl ChannelTransport {
    /// Create a transport and the receiver draining it
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: mpsc::UnboundedSender<OutboundCommand>) -> Self {
        Self { tx }
    }

    /// Queue an arbitrary command
    pub fn send_command(&self, command: OutboundCommand) -> CcdResult<()> {
        self.tx.send(command).map_err(|e| {
            CcdError::ChannelClosed(format!(
                "Failed to queue INDI command: {}. The connection may have been lost.",
                e
            ))
        })
    }

    /// Ask the server to deliver BLOBs for `device`
    pub fn enable_blob(&self, device: &str, mode: BlobMode) -> CcdResult<()> {
        self.send_command(OutboundCommand::EnableBlob {
            device: device.to_string(),
            mode,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl PropertyTransport for ChannelTransport {
    fn send_property(&self, property: &Property) {
        if let Err(e) = self.send_command(OutboundCommand::NewVector(property.clone())) {
            tracing::warn!(
                "Dropped update for {}.{}: {}",
                property.device(),
                property.name(),
                e
            );
        }
    }
}
