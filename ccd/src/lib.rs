//! INDI CCD device layer
//!
//! Client-side model of an INDI camera: typed vector properties, primary and
//! guide chip control, and routing of inbound images to disk, a viewer or a
//! live stream window.
//!
//! ## Features
//!
//! - Frame, binning, frame type and exposure control with bounds checking
//! - Fire-and-forget property updates through a pluggable transport
//! - FITS persistence with sequence naming and viewer tab reuse
//! - Video stream window lifecycle
//! - Async TCP connection with quick-xml decoding

mod chip;
mod connection;
mod device;
mod error;
pub mod property;
pub mod protocol;
pub mod storage;
mod transport;
mod viewer;

pub use chip::{BinType, CaptureFilter, CaptureTarget, CcdChip, ChipState, ChipType, Transmission};
pub use connection::{ConnectionConfig, IndiConnection};
pub use device::{CcdDevice, CcdEvent};
pub use error::{CcdError, CcdResult};
pub use property::{Property, PropertyStore};
pub use protocol::{
    decode_str, standard_properties, BlobMode, BlobPayload, CcdFrameType, InboundEvent,
    OutboundCommand, INDI_PROTOCOL_VERSION,
};
pub use storage::{CaptureStorageConfig, SequenceNaming};
pub use transport::{ChannelTransport, PropertyTransport};
pub use viewer::{
    CollaboratorFactory, HeadlessFactory, HeadlessStreamWindow, HeadlessViewer, ImageHandle,
    ImageViewer, StreamWindow, TabId,
};

/// Default INDI server port
pub const INDI_DEFAULT_PORT: u16 = 7624;
