//! Binary and JSON model files.
//!
//! ## Binary Layout
//!
//! ```text
//! +-------------------+
//! | Header (16 bytes) |
//! +-------------------+
//! | Map configuration |
//! | (bincode)         |
//! +-------------------+
//! ```
//!
//! ### Header
//! - Magic number (4 bytes): "KSOM"
//! - Version (2 bytes)
//! - Flags (2 bytes): bit 0 = prototypes stored denormalized
//! - Payload length (8 bytes)
//!
//! The payload is the map's [`SomConfig`], so a stored model carries its
//! layers, normalizer parameters and prototypes and is rebuilt with
//! [`Som::new`].

use crate::config::SomConfig;
use crate::error::{KohonenError, Result};
use crate::som::Som;
use log::info;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Magic number for model files.
const MAGIC: &[u8; 4] = b"KSOM";

/// Current format version.
const VERSION: u16 = 1;

/// Header size in bytes.
const HEADER_SIZE: usize = 16;

/// Prototypes are stored in raw (denormalized) units.
const FLAG_DENORMALIZED: u16 = 0x0001;

/// Model file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelHeader {
    /// Format version.
    pub version: u16,
    /// Flags.
    pub flags: u16,
    /// Payload length in bytes.
    pub payload_len: u64,
}

impl ModelHeader {
    fn new(denormalized: bool, payload_len: u64) -> Self {
        Self {
            version: VERSION,
            flags: if denormalized { FLAG_DENORMALIZED } else { 0 },
            payload_len,
        }
    }

    /// Whether prototypes are stored in raw units.
    pub fn is_denormalized(&self) -> bool {
        self.flags & FLAG_DENORMALIZED != 0
    }

    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(MAGIC);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.flags.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
        if &bytes[0..4] != MAGIC {
            return Err(KohonenError::InvalidModelFormat(
                "bad magic number".to_string(),
            ));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version == 0 || version > VERSION {
            return Err(KohonenError::InvalidModelFormat(format!(
                "unsupported version {}",
                version
            )));
        }

        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[8..16]);

        Ok(Self {
            version,
            flags: u16::from_le_bytes([bytes[6], bytes[7]]),
            payload_len: u64::from_le_bytes(len),
        })
    }
}

/// Reader/writer for model files.
pub struct ModelFormat;

impl ModelFormat {
    /// Writes a map to a binary model file.
    ///
    /// With `denormalized`, prototypes are stored in raw units and
    /// normalized again on load.
    pub fn write<P: AsRef<Path>>(path: P, som: &Som, denormalized: bool) -> Result<()> {
        let payload = bincode::serialize(&som.to_config(denormalized))?;
        let header = ModelHeader::new(denormalized, payload.len() as u64);

        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        writer.write_all(&header.to_bytes())?;
        writer.write_all(&payload)?;
        writer.flush()?;

        info!(
            "Wrote model to {:?} ({} layers, {} bytes)",
            path.as_ref(),
            som.layers().len(),
            HEADER_SIZE + payload.len()
        );
        Ok(())
    }

    /// Reads the header of a model file.
    pub fn read_header<P: AsRef<Path>>(path: P) -> Result<ModelHeader> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut bytes)?;
        ModelHeader::from_bytes(&bytes)
    }

    /// Reads a map from a binary model file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Som> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);

        let mut bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut bytes)?;
        let header = ModelHeader::from_bytes(&bytes)?;

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        if payload.len() as u64 != header.payload_len {
            return Err(KohonenError::InvalidModelFormat(format!(
                "payload is {} bytes, header says {}",
                payload.len(),
                header.payload_len
            )));
        }

        let config: SomConfig = bincode::deserialize(&payload)?;
        info!("Read model from {:?}", path.as_ref());
        Som::new(&config)
    }

    /// Serializes a map as pretty-printed JSON.
    pub fn to_json(som: &Som, denormalized: bool) -> Result<String> {
        Ok(serde_json::to_string_pretty(&som.to_config(denormalized))?)
    }

    /// Rebuilds a map from JSON produced by [`ModelFormat::to_json`] or
    /// written by hand.
    pub fn from_json(json: &str) -> Result<Som> {
        let config: SomConfig = serde_json::from_str(json)?;
        Som::new(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerConfig;
    use crate::distance::DistanceMetric;
    use crate::norm::Normalizer;
    use crate::som::Size;
    use tempfile::tempdir;

    fn test_som() -> Som {
        let mut numeric = LayerConfig::new("num", &["a", "b"]);
        numeric.norm = vec![
            Normalizer::Gaussian { mean: 3.0, std: 2.0 },
            Normalizer::Uniform { min: -1.0, max: 1.0 },
        ];
        numeric.weight = 0.5;
        let mut class = LayerConfig::new("class", &["x", "y", "z"]);
        class.categorical = true;
        class.metric = Some(DistanceMetric::Hamming);

        Som::new(&SomConfig {
            size: Size::new(3, 2),
            layers: vec![numeric, class],
            seed: Some(11),
        })
        .unwrap()
    }

    fn assert_close(a: &Som, b: &Som) {
        assert_eq!(a.size(), b.size());
        for (la, lb) in a.layers().iter().zip(b.layers()) {
            assert_eq!(la.name(), lb.name());
            assert_eq!(la.normalizers(), lb.normalizers());
            assert_eq!(la.metric(), lb.metric());
            for (x, y) in la.data().iter().zip(lb.data()) {
                assert!((x - y).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_binary_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.ksom");
        let som = test_som();

        ModelFormat::write(&path, &som, false).unwrap();
        let header = ModelFormat::read_header(&path).unwrap();
        assert_eq!(header.version, VERSION);
        assert!(!header.is_denormalized());

        let loaded = ModelFormat::read(&path).unwrap();
        assert_eq!(loaded, som);
    }

    #[test]
    fn test_denormalized_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.ksom");
        let som = test_som();

        ModelFormat::write(&path, &som, true).unwrap();
        assert!(ModelFormat::read_header(&path).unwrap().is_denormalized());
        assert_close(&ModelFormat::read(&path).unwrap(), &som);
    }

    #[test]
    fn test_json_roundtrip() {
        let som = test_som();
        let json = ModelFormat::to_json(&som, true).unwrap();
        assert!(json.contains("\"gaussian 3 2\""));
        assert_close(&ModelFormat::from_json(&json).unwrap(), &som);
    }

    #[test]
    fn test_rejects_bad_files() {
        let dir = tempdir().unwrap();

        let path = dir.path().join("bad_magic.ksom");
        std::fs::write(&path, b"NOPE\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00").unwrap();
        assert!(matches!(
            ModelFormat::read(&path),
            Err(KohonenError::InvalidModelFormat(_))
        ));

        let path = dir.path().join("truncated.ksom");
        let som = test_som();
        ModelFormat::write(&path, &som, false).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();
        assert!(matches!(
            ModelFormat::read(&path),
            Err(KohonenError::InvalidModelFormat(_))
        ));

        let path = dir.path().join("short.ksom");
        std::fs::write(&path, b"KSOM").unwrap();
        assert!(matches!(ModelFormat::read(&path), Err(KohonenError::Io(_))));
    }
}
