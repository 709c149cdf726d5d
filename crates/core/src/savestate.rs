//! Save state for the controller core.
//!
//! Captures every register, latch and registered output using bincode
//! serialization with deflate compression, so a simulation can be paused and
//! resumed at an exact tick.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "USPI"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Config digest    |  u32 little-endian (SpiConfig::fingerprint)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```
//!
//! The transport is not part of the state. Restore it separately, or
//! restore at a point where it is idle.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::bus::Handshake;
use crate::config::SpiConfig;
use crate::error::{Error, Result};
use crate::regs::Status;

/// Magic bytes identifying a save state.
const MAGIC: &[u8; 4] = b"USPI";
/// Current save state format version.
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFileState {
    pub tx_data: u32,
    pub control: u32,
    pub control_ext: u32,
    pub slave_select: u32,
    pub eop_value: u32,
    pub rx_data: u32,
    pub roe: bool,
    pub toe: bool,
    pub status: Status,
    pub rx_was_full: bool,
    pub read_data: u32,
    pub read_ch: Handshake,
    pub write_ch: Handshake,
    pub push: bool,
    pub pop: bool,
}

/// Complete core state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreState {
    pub regs: RegisterFileState,
    pub rate: u32,
    pub irq: bool,
    pub tick_count: u64,
}

/// Encode a state with header and deflate compression.
pub fn save_to_bytes(state: &CoreState, config: &SpiConfig) -> Result<Vec<u8>> {
    let payload = bincode::serialize(state)?;
    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&config.fingerprint().to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Decode a state, verifying magic, version and configuration digest.
pub fn load_from_bytes(data: &[u8], config: &SpiConfig) -> Result<CoreState> {
    if data.len() < HEADER_LEN {
        return Err(Error::Truncated(data.len()));
    }
    if &data[0..4] != MAGIC {
        return Err(Error::BadMagic);
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(Error::UnsupportedVersion { found: version, expected: FORMAT_VERSION });
    }
    let digest = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
    if digest != config.fingerprint() {
        return Err(Error::ConfigMismatch);
    }

    let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[HEADER_LEN..])
        .map_err(|e| Error::Decompress(format!("{:?}", e)))?;

    Ok(bincode::deserialize(&decompressed)?)
}

pub fn save_to_file(state: &CoreState, config: &SpiConfig, path: &Path) -> Result<()> {
    let bytes = save_to_bytes(state, config)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

pub fn load_from_file(path: &Path, config: &SpiConfig) -> Result<CoreState> {
    let data = std::fs::read(path)?;
    let state = load_from_bytes(&data, config)?;
    log::info!("loaded save state from {} (tick {})", path.display(), state.tick_count);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BusRequest, TransportStatus, UpSpi, CONTROL_REG, EOP_VALUE_REG};

    fn busy_core() -> UpSpi {
        let mut c = UpSpi::new(SpiConfig::default()).unwrap();
        let idle = TransportStatus::default();
        c.tick(&BusRequest::write(CONTROL_REG, 0x3F8), &idle);
        c.tick(&BusRequest::write(EOP_VALUE_REG, 0xAA), &idle);
        c.tick(&BusRequest::read(CONTROL_REG), &idle);
        c
    }

    #[test]
    fn test_restore_reproduces_core() {
        let c = busy_core();
        let cfg = *c.config();
        let bytes = save_to_bytes(&c.save_state(), &cfg).unwrap();
        let state = load_from_bytes(&bytes, &cfg).unwrap();

        let mut d = UpSpi::new(cfg).unwrap();
        d.load_state(&state);
        assert_eq!(d.save_state(), c.save_state());
        assert_eq!(d.response(), c.response());
        assert_eq!(d.irq(), c.irq());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let cfg = SpiConfig::default();
        let mut bytes = save_to_bytes(&busy_core().save_state(), &cfg).unwrap();
        bytes[0] = b'X';
        assert!(matches!(load_from_bytes(&bytes, &cfg), Err(Error::BadMagic)));
    }

    #[test]
    fn test_rejects_other_config() {
        let cfg = SpiConfig::default();
        let bytes = save_to_bytes(&busy_core().save_state(), &cfg).unwrap();
        let other = SpiConfig { word_width: 1, ..cfg };
        assert!(matches!(load_from_bytes(&bytes, &other), Err(Error::ConfigMismatch)));
    }

    #[test]
    fn test_rejects_truncated() {
        let cfg = SpiConfig::default();
        assert!(matches!(load_from_bytes(b"USPI", &cfg), Err(Error::Truncated(4))));
    }

    #[test]
    fn test_rejects_future_version() {
        let cfg = SpiConfig::default();
        let mut bytes = save_to_bytes(&busy_core().save_state(), &cfg).unwrap();
        bytes[4] = 2;
        assert!(matches!(
            load_from_bytes(&bytes, &cfg),
            Err(Error::UnsupportedVersion { found: 2, expected: 1 })
        ));
    }
}
