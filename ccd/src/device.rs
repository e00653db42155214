//! CCD device
//!
//! Owns the property store, the chips and the display collaborators of one
//! camera, and routes inbound INDI traffic to them.

use crate::chip::{CaptureTarget, CcdChip, ChipState, ChipType};
use crate::error::CcdError;
use crate::property::{Property, PropertyStore};
use crate::protocol::{
    frame_elements::{HEIGHT, WIDTH},
    standard_properties::*,
    BlobPayload, InboundEvent,
};
use crate::storage::{self, CaptureStorageConfig, Destination, SequenceNaming};
use crate::transport::PropertyTransport;
use crate::viewer::{CollaboratorFactory, ImageViewer, StreamWindow, TabId};
use chrono::Local;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Notifications for the host application
#[derive(Debug, Clone, PartialEq)]
pub enum CcdEvent {
    PropertyDefined { device: String, name: String },
    PropertyUpdated { device: String, name: String },
    /// `name` is `None` when every property of the device was removed
    PropertyDeleted { device: String, name: Option<String> },
    /// A payload finished processing (or was passed through untouched)
    BlobUpdated {
        device: String,
        property: String,
        name: String,
        format: String,
        data: Arc<Vec<u8>>,
    },
    /// A batch capture was written to disk
    ImageSaved {
        device: String,
        chip: ChipType,
        path: PathBuf,
    },
    Message { device: String, message: String },
    /// The image viewer went away; its tabs are forgotten
    ViewerClosed { device: String },
}

/// A CCD camera as seen by the client
pub struct CcdDevice {
    name: String,
    store: PropertyStore,
    primary: ChipState,
    guide: Option<ChipState>,
    transport: Arc<dyn PropertyTransport>,
    factory: Box<dyn CollaboratorFactory>,
    viewer: Option<Box<dyn ImageViewer>>,
    stream_window: Option<Box<dyn StreamWindow>>,
    tabs: HashMap<CaptureTarget, TabId>,
    storage: CaptureStorageConfig,
    naming: SequenceNaming,
    event_tx: broadcast::Sender<CcdEvent>,
}

impl CcdDevice {
    pub fn new(
        name: &str,
        transport: Arc<dyn PropertyTransport>,
        factory: Box<dyn CollaboratorFactory>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            name: name.to_string(),
            store: PropertyStore::new(name),
            primary: ChipState::new(ChipType::Primary),
            guide: None,
            transport,
            factory,
            viewer: None,
            stream_window: None,
            tabs: HashMap::new(),
            storage: CaptureStorageConfig::default(),
            naming: SequenceNaming::default(),
            event_tx,
        }
    }

    pub fn with_storage(mut self, storage: CaptureStorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_naming(mut self, naming: SequenceNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.store
    }

    /// Subscribe to device events
    pub fn subscribe(&self) -> broadcast::Receiver<CcdEvent> {
        self.event_tx.subscribe()
    }

    pub fn storage_config(&self) -> &CaptureStorageConfig {
        &self.storage
    }

    pub fn set_storage_config(&mut self, storage: CaptureStorageConfig) {
        self.storage = storage;
    }

    pub fn sequence_naming(&self) -> &SequenceNaming {
        &self.naming
    }

    pub fn set_seq_prefix(&mut self, prefix: &str) {
        self.naming.prefix = prefix.to_string();
    }

    /// Sequence number used for the next batch file name
    pub fn set_next_sequence_id(&mut self, seq_count: u32) {
        self.naming.seq_count = seq_count;
    }

    pub fn set_iso_mode(&mut self, enabled: bool) {
        self.naming.iso_mode = enabled;
    }

    /// True once the driver has announced a guide head
    pub fn has_guide_head(&self) -> bool {
        self.guide.is_some()
    }

    pub fn primary_chip(&mut self) -> CcdChip<'_> {
        CcdChip {
            state: &mut self.primary,
            store: &mut self.store,
            transport: self.transport.as_ref(),
        }
    }

    pub fn guide_chip(&mut self) -> Option<CcdChip<'_>> {
        match self.guide.as_mut() {
            Some(state) => Some(CcdChip {
                state,
                store: &mut self.store,
                transport: self.transport.as_ref(),
            }),
            None => None,
        }
    }

    pub fn chip(&mut self, chip_type: ChipType) -> Option<CcdChip<'_>> {
        match chip_type {
            ChipType::Primary => Some(self.primary_chip()),
            ChipType::Guide => self.guide_chip(),
        }
    }

    pub fn has_stream_window(&self) -> bool {
        self.stream_window.is_some()
    }

    pub fn has_viewer(&self) -> bool {
        self.viewer.is_some()
    }

    /// Drive the device from an inbound event channel until it closes
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<InboundEvent>) {
        tracing::debug!("{}: event loop started", self.name);
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        tracing::debug!("{}: event loop finished", self.name);
    }

    /// Process one inbound event
    pub fn handle_event(&mut self, event: InboundEvent) {
        if event.device() != self.name {
            tracing::debug!("{}: ignoring event for {}", self.name, event.device());
            return;
        }

        match event {
            InboundEvent::Defined(property) => self.register_property(property),
            InboundEvent::Updated(update) => {
                if !self.store.apply(&update) {
                    tracing::debug!(
                        "{}: ignoring update for undefined property {}",
                        self.name,
                        update.name
                    );
                    return;
                }
                self.process_update(&update.name);
            }
            InboundEvent::Deleted { name, .. } => {
                match &name {
                    Some(n) => {
                        self.store.remove(n);
                    }
                    None => self.store.clear(),
                }
                self.emit(CcdEvent::PropertyDeleted {
                    device: self.name.clone(),
                    name,
                });
            }
            InboundEvent::Blob(blob) => self.process_blob(blob),
            InboundEvent::Message { message, .. } => {
                tracing::info!("{}: {}", self.name, message);
                self.emit(CcdEvent::Message {
                    device: self.name.clone(),
                    message,
                });
            }
        }
    }

    /// The host destroyed the image viewer
    pub fn viewer_destroyed(&mut self) {
        self.viewer = None;
        self.tabs.clear();
        self.emit(CcdEvent::ViewerClosed {
            device: self.name.clone(),
        });
    }

    /// The host destroyed the stream window
    pub fn stream_window_destroyed(&mut self) {
        tracing::debug!("{}: stream window destroyed", self.name);
        self.stream_window = None;
    }

    fn emit(&self, event: CcdEvent) {
        let _ = self.event_tx.send(event);
    }

    fn register_property(&mut self, property: Property) {
        let name = property.name().to_string();
        if name == GUIDER_EXPOSURE_REQUEST && self.guide.is_none() {
            tracing::info!("{}: guide head detected", self.name);
            self.guide = Some(ChipState::new(ChipType::Guide));
        }
        self.store.define(property);
        self.emit(CcdEvent::PropertyDefined {
            device: self.name.clone(),
            name,
        });
    }

    fn process_update(&mut self, name: &str) {
        match name {
            CCD_FRAME => {
                if let Some((w, h)) = self.frame_size() {
                    if let Some(window) = self.stream_window.as_mut() {
                        window.set_size(w, h);
                    }
                }
                return;
            }
            VIDEO_STREAM => {
                self.update_video_stream();
                return;
            }
            CONNECTION => {
                let disconnecting = self
                    .store
                    .switch(CONNECTION)
                    .map(|s| s.is_on(DISCONNECT))
                    .unwrap_or(false);
                if disconnecting {
                    if let Some(window) = self.stream_window.as_mut() {
                        window.enable_stream(false);
                        window.close();
                    }
                }
            }
            _ => {}
        }

        self.emit(CcdEvent::PropertyUpdated {
            device: self.name.clone(),
            name: name.to_string(),
        });
    }

    fn frame_size(&self) -> Option<(u32, u32)> {
        let frame = self.store.number(CCD_FRAME)?;
        Some((frame.value(WIDTH)? as u32, frame.value(HEIGHT)? as u32))
    }

    fn update_video_stream(&mut self) {
        let enabled = self
            .store
            .switch(VIDEO_STREAM)
            .and_then(|s| s.elements.first())
            .map(|s| s.on)
            .unwrap_or(false);

        if self.stream_window.is_none() {
            let mut window = self.factory.create_stream_window();
            match self.frame_size() {
                Some((w, h)) => window.set_size(w, h),
                None => tracing::debug!("{}: stream window created without frame size", self.name),
            }
            self.stream_window = Some(window);
        }

        if let Some(window) = self.stream_window.as_mut() {
            window.enable_stream(enabled);
        }
    }

    fn process_blob(&mut self, blob: BlobPayload) {
        if blob.is_stream() {
            match self.stream_window.as_mut() {
                Some(window) if window.is_stream_enabled() => {
                    let (w, h) = window.size();
                    window.show();
                    window.new_frame(&blob.data, w, h);
                }
                _ => tracing::trace!("{}: dropping stream frame", self.name),
            }
            return;
        }

        if !blob.is_fits() {
            self.emit_blob(blob);
            return;
        }

        let chip_type = if blob.name == CCD1 {
            ChipType::Primary
        } else {
            ChipType::Guide
        };
        let state = match chip_type {
            ChipType::Primary => &self.primary,
            ChipType::Guide => match self.guide.as_ref() {
                Some(state) => state,
                None => {
                    tracing::warn!(
                        "{}, passing image {} through",
                        CcdError::NoGuideChip(self.name.clone()),
                        blob.name
                    );
                    self.emit_blob(blob);
                    return;
                }
            },
        };
        let batch_mode = state.is_batch_mode();

        let destination =
            Destination::resolve(&self.storage, &self.naming, batch_mode, &Local::now());
        let path = match storage::save_payload(&destination, &blob.data) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("{}: {}", self.name, e);
                return;
            }
        };

        if batch_mode {
            tracing::info!("FITS file saved to {}", path.display());
            self.emit(CcdEvent::ImageSaved {
                device: self.name.clone(),
                chip: chip_type,
                path: path.clone(),
            });
        }

        if destination.is_preview() {
            self.display_image(chip_type, &path);
        }

        self.emit_blob(blob);
    }

    fn display_image(&mut self, chip_type: ChipType, path: &Path) {
        let state = match chip_type {
            ChipType::Primary => &mut self.primary,
            ChipType::Guide => match self.guide.as_mut() {
                Some(state) => state,
                None => return,
            },
        };
        let target = state.capture_target();
        let filter = state.capture_filter();

        let factory = &mut self.factory;
        let viewer = self.viewer.get_or_insert_with(|| factory.create_viewer());

        let tab = match (target, self.tabs.get(&target).copied()) {
            (CaptureTarget::Normal, _) | (_, None) => viewer.add_image(path, target, filter),
            (_, Some(tab)) => {
                if viewer.update_image(path, tab, filter) {
                    tab
                } else {
                    viewer.add_image(path, target, filter)
                }
            }
        };
        self.tabs.insert(target, tab);

        state.set_image(target, viewer.get_image(tab));
        viewer.show();
    }

    fn emit_blob(&self, blob: BlobPayload) {
        self.emit(CcdEvent::BlobUpdated {
            device: blob.device,
            property: blob.property,
            name: blob.name,
            format: blob.format,
            data: Arc::new(blob.data),
        });
    }
}
