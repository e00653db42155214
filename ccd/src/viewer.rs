//! Viewer and stream-window collaborators
//!
//! Rendering lives in the host application. The device only needs these
//! narrow interfaces and creates the instances lazily through a
//! [`CollaboratorFactory`].

use crate::chip::{CaptureFilter, CaptureTarget};
use std::path::{Path, PathBuf};

/// Viewer tab identifier
pub type TabId = u32;

/// Handle to an image decoded by the viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub tab: TabId,
    pub path: PathBuf,
}

/// Image viewer with one tab per displayed image
pub trait ImageViewer: Send {
    /// Open `path` in a new tab
    fn add_image(&mut self, path: &Path, target: CaptureTarget, filter: CaptureFilter) -> TabId;

    /// Reload `tab` from `path`; false when the tab can not be updated in place
    fn update_image(&mut self, path: &Path, tab: TabId, filter: CaptureFilter) -> bool;

    fn get_image(&self, tab: TabId) -> Option<ImageHandle>;

    fn show(&mut self);
}

/// Live video stream window
pub trait StreamWindow: Send {
    fn set_size(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    fn enable_stream(&mut self, enabled: bool);

    fn is_stream_enabled(&self) -> bool;

    fn new_frame(&mut self, data: &[u8], width: u32, height: u32);

    fn show(&mut self);

    /// Request the window to close. The host reports the actual destruction
    /// through `CcdDevice::stream_window_destroyed`.
    fn close(&mut self);
}

/// Creates collaborators on first use
pub trait CollaboratorFactory: Send {
    fn create_viewer(&mut self) -> Box<dyn ImageViewer>;

    fn create_stream_window(&mut self) -> Box<dyn StreamWindow>;
}

/// Factory for headless operation: images are saved, nothing is displayed
#[derive(Debug, Default)]
pub struct HeadlessFactory;

impl CollaboratorFactory for HeadlessFactory {
    fn create_viewer(&mut self) -> Box<dyn ImageViewer> {
        Box::<HeadlessViewer>::default()
    }

    fn create_stream_window(&mut self) -> Box<dyn StreamWindow> {
        Box::<HeadlessStreamWindow>::default()
    }
}

/// Viewer that only tracks which file each tab shows
#[derive(Debug, Default)]
pub struct HeadlessViewer {
    tabs: Vec<PathBuf>,
}

impl ImageViewer for HeadlessViewer {
    fn add_image(&mut self, path: &Path, _target: CaptureTarget, _filter: CaptureFilter) -> TabId {
        self.tabs.push(path.to_path_buf());
        (self.tabs.len() - 1) as TabId
    }

    fn update_image(&mut self, path: &Path, tab: TabId, _filter: CaptureFilter) -> bool {
        match self.tabs.get_mut(tab as usize) {
            Some(slot) => {
                *slot = path.to_path_buf();
                true
            }
            None => false,
        }
    }

    fn get_image(&self, tab: TabId) -> Option<ImageHandle> {
        self.tabs.get(tab as usize).map(|path| ImageHandle {
            tab,
            path: path.clone(),
        })
    }

    fn show(&mut self) {}
}

/// Stream window that counts frames instead of drawing them
#[derive(Debug, Default)]
pub struct HeadlessStreamWindow {
    width: u32,
    height: u32,
    enabled: bool,
    frames: u64,
}

impl HeadlessStreamWindow {
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl StreamWindow for HeadlessStreamWindow {
    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn enable_stream(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_stream_enabled(&self) -> bool {
        self.enabled
    }

    fn new_frame(&mut self, data: &[u8], width: u32, height: u32) {
        tracing::trace!("Stream frame: {} bytes at {}x{}", data.len(), width, height);
        self.frames += 1;
    }

    fn show(&mut self) {}

    fn close(&mut self) {
        self.enabled = false;
    }
}
