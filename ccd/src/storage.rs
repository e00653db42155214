//! Image persistence
//!
//! Decides where a received FITS payload is written and writes it.

use crate::error::{CcdError, CcdResult};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Timestamp segment used in file names
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Global capture storage options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureStorageConfig {
    /// Directory receiving sequence and snapshot files
    pub fits_dir: PathBuf,
    /// Show single-shot captures in the viewer (saved to a temporary file)
    pub show_fits: bool,
}

impl Default for CaptureStorageConfig {
    fn default() -> Self {
        Self {
            fits_dir: std::env::temp_dir(),
            show_fits: true,
        }
    }
}

/// Per-device sequence naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceNaming {
    /// Optional prefix, joined to the counter with `_`
    pub prefix: String,
    /// Sequence number, zero padded to two digits. Owned by the caller.
    pub seq_count: u32,
    /// Append a timestamp after the counter
    pub iso_mode: bool,
}

impl Default for SequenceNaming {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            seq_count: 0,
            iso_mode: true,
        }
    }
}

impl SequenceNaming {
    /// File name for a batch capture
    pub fn sequence_file_name(&self, now: &DateTime<Local>) -> String {
        let separator = if self.prefix.is_empty() { "" } else { "_" };
        if self.iso_mode {
            format!(
                "{}{}{:02}_{}.fits",
                self.prefix,
                separator,
                self.seq_count,
                now.format(TIMESTAMP_FORMAT)
            )
        } else {
            format!("{}{}{:02}.fits", self.prefix, separator, self.seq_count)
        }
    }
}

/// File name for a single-shot capture that is not previewed
pub fn snapshot_file_name(now: &DateTime<Local>) -> String {
    format!("file_{}.fits", now.format(TIMESTAMP_FORMAT))
}

/// Where a capture goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Unique temporary file for the viewer
    Preview,
    /// Named file under the configured directory
    File(PathBuf),
}

impl Destination {
    pub fn resolve(
        config: &CaptureStorageConfig,
        naming: &SequenceNaming,
        batch_mode: bool,
        now: &DateTime<Local>,
    ) -> Self {
        if !batch_mode && config.show_fits {
            return Destination::Preview;
        }
        let name = if batch_mode {
            naming.sequence_file_name(now)
        } else {
            snapshot_file_name(now)
        };
        Destination::File(config.fits_dir.join(name))
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, Destination::Preview)
    }
}

/// Create the destination file and write `data` to it in full
pub fn save_payload(destination: &Destination, data: &[u8]) -> CcdResult<PathBuf> {
    let (mut file, path) = open_destination(destination)?;
    write_payload(&mut file, data).map_err(|source| CcdError::FileOpenFailure {
        path: path.clone(),
        source,
    })?;
    tracing::debug!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(path)
}

fn open_destination(destination: &Destination) -> CcdResult<(File, PathBuf)> {
    match destination {
        Destination::Preview => tempfile::Builder::new()
            .prefix("fits")
            .suffix(".fits")
            .tempfile()
            .and_then(|f| f.keep().map_err(|e| e.error))
            .map_err(|source| CcdError::FileOpenFailure {
                path: std::env::temp_dir(),
                source,
            }),
        Destination::File(path) => File::create(path)
            .map(|f| (f, path.clone()))
            .map_err(|source| CcdError::FileOpenFailure {
                path: path.clone(),
                source,
            }),
    }
}

/// Write every byte, retrying short writes
pub(crate) fn write_payload<W: Write>(writer: &mut W, data: &[u8]) -> std::io::Result<()> {
    let mut written = 0;
    while written < data.len() {
        match writer.write(&data[written..]) {
            Ok(0) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    format!("wrote {} of {} bytes", written, data.len()),
                ))
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    writer.flush()
}

/// True when `path` lives under the configured directory
pub fn is_in_fits_dir(config: &CaptureStorageConfig, path: &Path) -> bool {
    path.starts_with(&config.fits_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 21, 5, 7).unwrap()
    }

    #[test]
    fn test_sequence_names() {
        let now = fixed_time();
        let mut naming = SequenceNaming {
            prefix: "M31_Light".to_string(),
            seq_count: 7,
            iso_mode: false,
        };
        assert_eq!(naming.sequence_file_name(&now), "M31_Light_07.fits");

        naming.iso_mode = true;
        assert_eq!(
            naming.sequence_file_name(&now),
            "M31_Light_07_2024-03-09T21:05:07.fits"
        );

        naming.prefix.clear();
        naming.seq_count = 123;
        assert_eq!(naming.sequence_file_name(&now), "123_2024-03-09T21:05:07.fits");
    }

    #[test]
    fn test_snapshot_name() {
        assert_eq!(snapshot_file_name(&fixed_time()), "file_2024-03-09T21:05:07.fits");
    }

    #[test]
    fn test_destination_resolution() {
        let now = fixed_time();
        let config = CaptureStorageConfig {
            fits_dir: PathBuf::from("/data/fits/"),
            show_fits: true,
        };
        let naming = SequenceNaming {
            prefix: "Flat".to_string(),
            seq_count: 1,
            iso_mode: false,
        };

        assert_eq!(
            Destination::resolve(&config, &naming, false, &now),
            Destination::Preview
        );
        assert_eq!(
            Destination::resolve(&config, &naming, true, &now),
            Destination::File(PathBuf::from("/data/fits/Flat_01.fits"))
        );

        let no_preview = CaptureStorageConfig {
            show_fits: false,
            ..config
        };
        let dest = Destination::resolve(&no_preview, &naming, false, &now);
        assert_eq!(
            dest,
            Destination::File(PathBuf::from("/data/fits/file_2024-03-09T21:05:07.fits"))
        );
        assert!(!dest.is_preview());
    }

    #[test]
    fn test_save_payload_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_01.fits");
        let saved = save_payload(&Destination::File(path.clone()), b"SIMPLE  = T").unwrap();
        assert_eq!(saved, path);
        assert_eq!(std::fs::read(&path).unwrap(), b"SIMPLE  = T");
    }

    #[test]
    fn test_save_payload_preview_is_unique() {
        let a = save_payload(&Destination::Preview, b"a").unwrap();
        let b = save_payload(&Destination::Preview, b"b").unwrap();
        assert_ne!(a, b);
        assert_eq!(std::fs::read(&a).unwrap(), b"a");
        std::fs::remove_file(a).unwrap();
        std::fs::remove_file(b).unwrap();
    }

    #[test]
    fn test_save_payload_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("frame.fits");
        let err = save_payload(&Destination::File(path), b"data").unwrap_err();
        assert!(matches!(err, CcdError::FileOpenFailure { .. }));
    }

    /// Writer accepting at most three bytes per call
    struct Trickle(Vec<u8>);

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf.len().min(3);
            self.0.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_payload_tolerates_partial_writes() {
        let mut w = Trickle(Vec::new());
        write_payload(&mut w, b"0123456789").unwrap();
        assert_eq!(w.0, b"0123456789");
    }

    #[test]
    fn test_is_in_fits_dir() {
        let config = CaptureStorageConfig {
            fits_dir: PathBuf::from("/data/fits"),
            show_fits: false,
        };
        assert!(is_in_fits_dir(&config, Path::new("/data/fits/a.fits")));
        assert!(!is_in_fits_dir(&config, Path::new("/tmp/a.fits")));
    }
}
