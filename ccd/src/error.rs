//! CCD error types
//!
//! Structured errors for property lookup, mutation and payload persistence.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the CCD property layer
#[derive(Error, Debug)]
pub enum CcdError {
    /// Property not defined by the device
    #[error("Property not found: {device}.{property}")]
    PropertyNotFound { device: String, property: String },

    /// Property exists but lacks the requested element
    #[error("Element not found: {device}.{property}.{element}")]
    ElementNotFound {
        device: String,
        property: String,
        element: String,
    },

    /// Requested value lies outside the element's declared bounds
    #[error("Value {value} out of range [{min}, {max}] for {device}.{property}.{element}")]
    OutOfBounds {
        device: String,
        property: String,
        element: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Attempted to write to a read-only property
    #[error("Permission denied: property '{0}' is read-only")]
    PermissionDenied(String),

    /// Operation only exists for the primary sensor
    #[error("Operation '{0}' is not supported on the guide chip")]
    UnsupportedOnGuideChip(&'static str),

    /// Payload addressed to a guide chip the device never announced
    #[error("Device {0} has no guide chip")]
    NoGuideChip(String),

    /// Image destination could not be created or opened
    #[error("Unable to open {path}: {source}")]
    FileOpenFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not connected to an INDI server
    #[error("Not connected to INDI server")]
    NotConnected,

    /// TCP connect failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// TCP connect did not complete in time
    #[error("Connection timeout: failed to connect to {host}:{port} after {duration:?}")]
    ConnectionTimeout {
        host: String,
        port: u16,
        duration: Duration,
    },

    /// Outbound command channel closed
    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

impl CcdError {
    pub(crate) fn property_not_found(device: &str, property: &str) -> Self {
        CcdError::PropertyNotFound {
            device: device.to_string(),
            property: property.to_string(),
        }
    }

    pub(crate) fn element_not_found(device: &str, property: &str, element: &str) -> Self {
        CcdError::ElementNotFound {
            device: device.to_string(),
            property: property.to_string(),
            element: element.to_string(),
        }
    }

    /// True for the lookup failures (missing property or element)
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            CcdError::PropertyNotFound { .. } | CcdError::ElementNotFound { .. }
        )
    }
}

impl From<CcdError> for String {
    fn from(err: CcdError) -> String {
        err.to_string()
    }
}

/// Result type for CCD operations
pub type CcdResult<T> = Result<T, CcdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CcdError::property_not_found("CCD Simulator", "CCD_FRAME");
        assert_eq!(err.to_string(), "Property not found: CCD Simulator.CCD_FRAME");

        let err = CcdError::element_not_found("CCD Simulator", "CCD_BINNING", "VER_BIN");
        assert_eq!(
            err.to_string(),
            "Element not found: CCD Simulator.CCD_BINNING.VER_BIN"
        );

        let err = CcdError::OutOfBounds {
            device: "CCD Simulator".to_string(),
            property: "CCD_FRAME".to_string(),
            element: "WIDTH".to_string(),
            value: 9000.0,
            min: 1.0,
            max: 4096.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("9000"));
        assert!(msg.contains("4096"));
        assert!(msg.contains("WIDTH"));
    }

    #[test]
    fn test_lookup_failure_classification() {
        assert!(CcdError::property_not_found("a", "b").is_lookup_failure());
        assert!(CcdError::element_not_found("a", "b", "c").is_lookup_failure());
        assert!(!CcdError::NotConnected.is_lookup_failure());
        assert!(!CcdError::UnsupportedOnGuideChip("set_binning").is_lookup_failure());
    }

    #[test]
    fn test_error_to_string_conversion() {
        let s: String = CcdError::NotConnected.into();
        assert_eq!(s, "Not connected to INDI server");
    }

    #[test]
    fn test_connection_timeout_display() {
        let err = CcdError::ConnectionTimeout {
            host: "192.168.1.100".to_string(),
            port: 7624,
            duration: Duration::from_secs(30),
        };
        let msg = err.to_string();
        assert!(msg.contains("192.168.1.100"));
        assert!(msg.contains("7624"));
    }
}
