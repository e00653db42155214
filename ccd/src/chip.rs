//! CCD chip control
//!
//! A chip is one sensor of a camera: the primary imaging sensor or the
//! optional guide head. Its operations translate into mutations of the
//! device's vector properties, which are then handed to the transport.

use crate::error::{CcdError, CcdResult};
use crate::property::{Permission, PropertyStore};
use crate::protocol::{
    binning_elements::*, frame_elements::*, info_elements::*, standard_properties::*,
    CcdFrameType, ABORT,
};
use crate::transport::PropertyTransport;
use crate::viewer::ImageHandle;
use serde::{Deserialize, Serialize};

/// Which sensor a chip represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChipType {
    Primary,
    Guide,
}

impl ChipType {
    pub fn frame_property(self) -> &'static str {
        match self {
            ChipType::Primary => CCD_FRAME,
            ChipType::Guide => GUIDE_FRAME,
        }
    }

    pub fn exposure_property(self) -> &'static str {
        match self {
            ChipType::Primary => CCD_EXPOSURE_REQUEST,
            ChipType::Guide => GUIDER_EXPOSURE_REQUEST,
        }
    }

    pub fn abort_property(self) -> &'static str {
        match self {
            ChipType::Primary => CCD_ABORT_EXPOSURE,
            ChipType::Guide => GUIDER_ABORT_EXPOSURE,
        }
    }

    pub fn info_property(self) -> &'static str {
        match self {
            ChipType::Primary => CCD_INFO,
            ChipType::Guide => GUIDER_INFO,
        }
    }
}

/// What the next image from a chip is for; selects viewer tab and image slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CaptureTarget {
    #[default]
    Normal,
    Focus,
    Guide,
    Calibration,
}

impl CaptureTarget {
    pub const ALL: [CaptureTarget; 4] = [
        CaptureTarget::Normal,
        CaptureTarget::Focus,
        CaptureTarget::Guide,
        CaptureTarget::Calibration,
    ];

    fn index(self) -> usize {
        match self {
            CaptureTarget::Normal => 0,
            CaptureTarget::Focus => 1,
            CaptureTarget::Guide => 2,
            CaptureTarget::Calibration => 3,
        }
    }
}

/// Post-processing the viewer applies when displaying a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureFilter {
    #[default]
    None,
    Auto,
    Linear,
    Log,
    Sqrt,
    AutoStretch,
    HighContrast,
    Equalize,
    HighPass,
}

/// Symmetric binning presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BinType {
    #[default]
    Single,
    Double,
    Triple,
    Quadruple,
}

impl BinType {
    pub fn factor(self) -> i32 {
        match self {
            BinType::Single => 1,
            BinType::Double => 2,
            BinType::Triple => 3,
            BinType::Quadruple => 4,
        }
    }

    fn from_factor(factor: i32) -> Self {
        match factor {
            2 => BinType::Double,
            3 => BinType::Triple,
            4 => BinType::Quadruple,
            _ => BinType::Single,
        }
    }
}

/// Outcome of a successful mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transmission {
    /// The vector was mutated and handed to the transport
    Sent,
    /// Requested values were already current; nothing was sent
    Unchanged,
}

/// Capture state owned by the device for each chip
#[derive(Debug, Clone)]
pub struct ChipState {
    chip_type: ChipType,
    capture_target: CaptureTarget,
    capture_filter: CaptureFilter,
    batch_mode: bool,
    images: [Option<ImageHandle>; 4],
}

impl ChipState {
    pub fn new(chip_type: ChipType) -> Self {
        Self {
            chip_type,
            capture_target: CaptureTarget::Normal,
            capture_filter: CaptureFilter::None,
            batch_mode: false,
            images: Default::default(),
        }
    }

    pub fn chip_type(&self) -> ChipType {
        self.chip_type
    }

    pub fn capture_target(&self) -> CaptureTarget {
        self.capture_target
    }

    pub fn set_capture_target(&mut self, target: CaptureTarget) {
        self.capture_target = target;
    }

    pub fn capture_filter(&self) -> CaptureFilter {
        self.capture_filter
    }

    pub fn set_capture_filter(&mut self, filter: CaptureFilter) {
        self.capture_filter = filter;
    }

    pub fn is_batch_mode(&self) -> bool {
        self.batch_mode
    }

    pub fn set_batch_mode(&mut self, enabled: bool) {
        self.batch_mode = enabled;
    }

    pub fn image(&self, target: CaptureTarget) -> Option<&ImageHandle> {
        self.images[target.index()].as_ref()
    }

    /// Replace the image held for `target`; other slots are untouched
    pub fn set_image(&mut self, target: CaptureTarget, image: Option<ImageHandle>) {
        self.images[target.index()] = image;
    }
}

/// Control view over one chip, borrowing the device's properties and transport
pub struct CcdChip<'a> {
    pub(crate) state: &'a mut ChipState,
    pub(crate) store: &'a mut PropertyStore,
    pub(crate) transport: &'a dyn PropertyTransport,
}

impl<'a> std::ops::Deref for CcdChip<'a> {
    type Target = ChipState;

    fn deref(&self) -> &ChipState {
        &*self.state
    }
}

impl<'a> std::ops::DerefMut for CcdChip<'a> {
    fn deref_mut(&mut self) -> &mut ChipState {
        &mut *self.state
    }
}

impl<'a> CcdChip<'a> {
    fn device(&self) -> &str {
        self.store.device()
    }

    fn require_primary(&self, operation: &'static str) -> CcdResult<()> {
        match self.state.chip_type {
            ChipType::Primary => Ok(()),
            ChipType::Guide => Err(CcdError::UnsupportedOnGuideChip(operation)),
        }
    }

    fn check_writable(&self, property: &str) -> CcdResult<()> {
        match self.store.get(property).map(|p| p.perm()) {
            Some(Permission::ReadOnly) => Err(CcdError::PermissionDenied(property.to_string())),
            _ => Ok(()),
        }
    }

    fn transmit(&self, property: &str) {
        if let Some(p) = self.store.get(property) {
            tracing::debug!("Sending {}.{}", p.device(), p.name());
            self.transport.send_property(p);
        }
    }

    /// Frame geometry as (x, y, width, height)
    pub fn get_frame(&self) -> CcdResult<(i32, i32, i32, i32)> {
        let prop = self.state.chip_type.frame_property();
        let frame = self
            .store
            .number(prop)
            .ok_or_else(|| CcdError::property_not_found(self.device(), prop))?;

        let value = |element: &str| {
            frame
                .value(element)
                .map(|v| v as i32)
                .ok_or_else(|| CcdError::element_not_found(self.device(), prop, element))
        };
        Ok((value(X)?, value(Y)?, value(WIDTH)?, value(HEIGHT)?))
    }

    /// Set the region of interest
    pub fn set_frame(&mut self, x: i32, y: i32, w: i32, h: i32) -> CcdResult<Transmission> {
        let prop = self.state.chip_type.frame_property();
        let device = self.device().to_string();
        let requested = [(X, x), (Y, y), (WIDTH, w), (HEIGHT, h)];

        {
            let frame = self
                .store
                .number(prop)
                .ok_or_else(|| CcdError::property_not_found(&device, prop))?;

            let mut unchanged = true;
            for (element, value) in requested {
                let n = frame
                    .find(element)
                    .ok_or_else(|| CcdError::element_not_found(&device, prop, element))?;
                unchanged &= n.value == f64::from(value);
            }
            if unchanged {
                return Ok(Transmission::Unchanged);
            }

            for (element, value) in requested {
                if let Some(n) = frame.find(element) {
                    if !n.in_bounds(f64::from(value)) {
                        return Err(CcdError::OutOfBounds {
                            device,
                            property: prop.to_string(),
                            element: element.to_string(),
                            value: f64::from(value),
                            min: n.min,
                            max: n.max,
                        });
                    }
                }
            }
        }
        self.check_writable(prop)?;

        if let Some(frame) = self.store.number_mut(prop) {
            for (element, value) in requested {
                if let Some(n) = frame.find_mut(element) {
                    n.value = f64::from(value);
                }
            }
        }
        self.transmit(prop);
        Ok(Transmission::Sent)
    }

    /// Reset the frame to the full sensor reported in the info property
    pub fn reset_frame(&mut self) -> CcdResult<Transmission> {
        let prop = self.state.chip_type.info_property();
        let (max_x, max_y) = {
            let info = self
                .store
                .number(prop)
                .ok_or_else(|| CcdError::property_not_found(self.device(), prop))?;
            let value = |element: &str| {
                info.value(element)
                    .map(|v| v as i32)
                    .ok_or_else(|| CcdError::element_not_found(self.device(), prop, element))
            };
            (value(CCD_MAX_X)?, value(CCD_MAX_Y)?)
        };
        self.set_frame(0, 0, max_x, max_y)
    }

    /// Start an exposure of `exposure` seconds.
    ///
    /// Requests are not queued: a second call while an exposure is in flight
    /// is sent immediately.
    pub fn capture(&mut self, exposure: f64) -> CcdResult<Transmission> {
        let prop = self.state.chip_type.exposure_property();
        let device = self.device().to_string();
        {
            let request = self
                .store
                .number(prop)
                .ok_or_else(|| CcdError::property_not_found(&device, prop))?;
            let element = request
                .elements
                .first()
                .ok_or_else(|| CcdError::element_not_found(&device, prop, "<first>"))?;
            if !element.in_bounds(exposure) {
                return Err(CcdError::OutOfBounds {
                    device,
                    property: prop.to_string(),
                    element: element.name.clone(),
                    value: exposure,
                    min: element.min,
                    max: element.max,
                });
            }
        }
        self.check_writable(prop)?;

        if let Some(element) = self
            .store
            .number_mut(prop)
            .and_then(|v| v.elements.first_mut())
        {
            element.value = exposure;
        }
        tracing::info!(
            "{}: starting {:.3}s exposure on {:?} chip",
            self.device(),
            exposure,
            self.state.chip_type
        );
        self.transmit(prop);
        Ok(Transmission::Sent)
    }

    /// Abort the running exposure
    pub fn abort_exposure(&mut self) -> CcdResult<Transmission> {
        let prop = self.state.chip_type.abort_property();
        let device = self.device().to_string();
        {
            let abort = self
                .store
                .switch(prop)
                .ok_or_else(|| CcdError::property_not_found(&device, prop))?;
            if abort.find(ABORT).is_none() {
                return Err(CcdError::element_not_found(&device, prop, ABORT));
            }
        }
        self.check_writable(prop)?;

        if let Some(abort) = self.store.switch_mut(prop) {
            abort.reset();
            if let Some(s) = abort.find_mut(ABORT) {
                s.on = true;
            }
        }
        self.transmit(prop);
        Ok(Transmission::Sent)
    }

    /// Select light, dark, bias or flat frames. Primary chip only.
    ///
    /// Any non-light type switches the chip's capture target to calibration.
    pub fn set_frame_type(&mut self, frame_type: CcdFrameType) -> CcdResult<Transmission> {
        self.require_primary("set_frame_type")?;
        let device = self.device().to_string();
        let element = frame_type.element();
        {
            let types = self
                .store
                .switch(CCD_FRAME_TYPE)
                .ok_or_else(|| CcdError::property_not_found(&device, CCD_FRAME_TYPE))?;
            let current = types
                .find(element)
                .ok_or_else(|| CcdError::element_not_found(&device, CCD_FRAME_TYPE, element))?;
            if current.on {
                return Ok(Transmission::Unchanged);
            }
        }
        self.check_writable(CCD_FRAME_TYPE)?;

        if frame_type != CcdFrameType::Light {
            self.state.capture_target = CaptureTarget::Calibration;
        }

        if let Some(types) = self.store.switch_mut(CCD_FRAME_TYPE) {
            types.reset();
            if let Some(s) = types.find_mut(element) {
                s.on = true;
            }
        }
        self.transmit(CCD_FRAME_TYPE);
        Ok(Transmission::Sent)
    }

    /// Active frame type; light when unknown or on the guide chip
    pub fn frame_type(&self) -> CcdFrameType {
        if self.state.chip_type == ChipType::Guide {
            return CcdFrameType::Light;
        }
        self.store
            .switch(CCD_FRAME_TYPE)
            .and_then(|v| v.active())
            .and_then(|s| CcdFrameType::from_element(&s.name))
            .unwrap_or(CcdFrameType::Light)
    }

    /// Set a symmetric binning preset. Primary chip only.
    pub fn set_bin_type(&mut self, bin_type: BinType) -> CcdResult<Transmission> {
        self.require_primary("set_bin_type")?;
        let factor = bin_type.factor();
        self.set_binning(factor, factor)
    }

    /// Binning preset matching the horizontal factor; `Single` when unavailable
    pub fn bin_type(&self) -> BinType {
        match self.binning_values() {
            Some((x, _)) => BinType::from_factor(x),
            None => BinType::Single,
        }
    }

    /// Binning as (x, y); (1, 1) on the guide chip or when unavailable
    pub fn binning(&self) -> (i32, i32) {
        self.binning_values().unwrap_or((1, 1))
    }

    fn binning_values(&self) -> Option<(i32, i32)> {
        if self.state.chip_type == ChipType::Guide {
            return None;
        }
        let bin = self.store.number(CCD_BINNING)?;
        Some((bin.value(HOR_BIN)? as i32, bin.value(VER_BIN)? as i32))
    }

    /// Set binning per axis. Primary chip only.
    ///
    /// Only the declared maximum is enforced; values below the minimum are
    /// passed through to the driver.
    pub fn set_binning(&mut self, bin_x: i32, bin_y: i32) -> CcdResult<Transmission> {
        self.require_primary("set_binning")?;
        let device = self.device().to_string();
        {
            let bin = self
                .store
                .number(CCD_BINNING)
                .ok_or_else(|| CcdError::property_not_found(&device, CCD_BINNING))?;
            let hor = bin
                .find(HOR_BIN)
                .ok_or_else(|| CcdError::element_not_found(&device, CCD_BINNING, HOR_BIN))?;
            let ver = bin
                .find(VER_BIN)
                .ok_or_else(|| CcdError::element_not_found(&device, CCD_BINNING, VER_BIN))?;

            if hor.value == f64::from(bin_x) && ver.value == f64::from(bin_y) {
                return Ok(Transmission::Unchanged);
            }

            for (n, value) in [(hor, bin_x), (ver, bin_y)] {
                if f64::from(value) > n.max {
                    return Err(CcdError::OutOfBounds {
                        device,
                        property: CCD_BINNING.to_string(),
                        element: n.name.clone(),
                        value: f64::from(value),
                        min: n.min,
                        max: n.max,
                    });
                }
            }
        }
        self.check_writable(CCD_BINNING)?;

        if let Some(bin) = self.store.number_mut(CCD_BINNING) {
            if let Some(n) = bin.find_mut(HOR_BIN) {
                n.value = f64::from(bin_x);
            }
            if let Some(n) = bin.find_mut(VER_BIN) {
                n.value = f64::from(bin_y);
            }
        }
        self.transmit(CCD_BINNING);
        Ok(Transmission::Sent)
    }
}
