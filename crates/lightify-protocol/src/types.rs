//! Common types used throughout the protocol

use crate::frame::{Response, RESPONSE_HEADER_SIZE};
use bytes::Buf;
use thiserror::Error;

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Frame too short: {0} bytes")]
    FrameTooShort(usize),

    #[error("Unknown command ID: {0:#04X}")]
    UnknownCommand(u8),

    #[error("Incorrect data length for {expected} records: {actual} bytes")]
    RecordCount { expected: usize, actual: usize },

    #[error("Malformed response: {reason}")]
    MalformedResponse {
        #[source]
        reason: Box<ProtocolError>,
        data: Vec<u8>,
    },

    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request timeout")]
    Timeout,

    #[error("Transport not connected")]
    NotConnected,
}

impl ProtocolError {
    /// Whether the error came from the socket rather than from decoding
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(_) | ProtocolError::Timeout | ProtocolError::NotConnected
        )
    }

    /// Bytes the gateway sent, if they couldn't be decoded
    #[must_use]
    pub fn raw_data(&self) -> Option<&[u8]> {
        match self {
            ProtocolError::MalformedResponse { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// Size of a fixed-width name field
pub const NAME_SIZE: usize = 16;

/// Size of the status block inside a bulk light record
pub const STATUS_BLOCK_SIZE: usize = 16;

/// Total response size (after the length prefix) of an unreachable light
pub const UNREACHABLE_LIGHT_STATUS_SIZE: usize = 18;

/// Decode a zero-padded fixed-width name
fn parse_name(raw: &[u8]) -> Result<String, ProtocolError> {
    let name = std::str::from_utf8(raw)
        .map_err(|e| ProtocolError::InvalidFrame(format!("Invalid name encoding: {e}")))?;
    Ok(name.replace('\0', ""))
}

/// Convert a 16-bit group bitmask into 1-based group indices
///
/// Bit 15 is group 1 and bit 0 is group 16. Indices are returned walking
/// the mask from the most significant bit down.
#[must_use]
pub fn decode_group_mask(mask: u16) -> Vec<u8> {
    (0..16u8)
        .rev()
        .filter(|bit| mask & (1 << bit) != 0)
        .map(|bit| 16 - bit)
        .collect()
}

/// Group index of the first set bit of a scene's group bitmask
#[must_use]
pub fn decode_scene_group(mask: u16) -> Option<u8> {
    if mask == 0 {
        return None;
    }
    // leading_zeros is the MSB-first bit position
    let bit = 15 - mask.leading_zeros() as u8;
    Some(16 - bit)
}

/// Format the packed firmware version as eight hex digits
#[must_use]
pub fn format_version(raw: [u8; 4]) -> String {
    format!("{:08X}", u32::from_be_bytes(raw))
}

/// A record with a fixed wire size inside a list response
pub trait FixedRecord: Sized {
    const SIZE: usize;

    #[allow(clippy::missing_errors_doc)]
    fn parse(data: &[u8]) -> Result<Self, ProtocolError>;
}

/// Parse a `count(u16)` prefixed list of fixed-width records
#[allow(clippy::missing_errors_doc)]
pub fn parse_records<T: FixedRecord>(payload: &[u8]) -> Result<Vec<T>, ProtocolError> {
    if payload.len() < 2 {
        return Err(ProtocolError::FrameTooShort(payload.len()));
    }

    let count = u16::from_le_bytes([payload[0], payload[1]]) as usize;
    let body = &payload[2..];
    if body.len() < count * T::SIZE {
        return Err(ProtocolError::RecordCount {
            expected: count,
            actual: payload.len(),
        });
    }

    body.chunks_exact(T::SIZE)
        .take(count)
        .map(T::parse)
        .collect()
}

/// Decoded 16-byte status block of a bulk light record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusBlock {
    pub type_id: u8,
    pub version: [u8; 4],
    pub reachable: bool,
    pub group_mask: u16,
    pub on: bool,
    pub lum: u8,
    pub temp: u16,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl StatusBlock {
    #[allow(clippy::missing_errors_doc)]
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < STATUS_BLOCK_SIZE {
            return Err(ProtocolError::FrameTooShort(data.len()));
        }

        let mut buf = data;
        let type_id = buf.get_u8();
        let mut version = [0u8; 4];
        buf.copy_to_slice(&mut version);

        Ok(Self {
            type_id,
            version,
            reachable: buf.get_u8() != 0,
            group_mask: buf.get_u16_le(),
            on: buf.get_u8() != 0,
            lum: buf.get_u8(),
            temp: buf.get_u16_le(),
            red: buf.get_u8(),
            green: buf.get_u8(),
            blue: buf.get_u8(),
            alpha: buf.get_u8(),
        })
    }

    /// 1-based indices of the groups this light belongs to
    #[must_use]
    pub fn groups(&self) -> Vec<u8> {
        decode_group_mask(self.group_mask)
    }

    /// Firmware version as an eight digit hex string
    #[must_use]
    pub fn version_string(&self) -> String {
        format_version(self.version)
    }

    #[must_use]
    pub fn rgb(&self) -> (u8, u8, u8) {
        (self.red, self.green, self.blue)
    }
}

/// One light record of an `AllLightStatus` response
///
/// Layout: idx(2) + addr(8) + status(16) + name(16) + last_seen(4) + pad(4)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightRecord {
    pub index: u16,
    pub address: u64,
    pub status: StatusBlock,
    pub name: String,
    pub last_seen: u32,
}

impl FixedRecord for LightRecord {
    const SIZE: usize = 50;

    fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < Self::SIZE {
            return Err(ProtocolError::FrameTooShort(data.len()));
        }

        let mut buf = data;
        let index = buf.get_u16_le();
        let address = buf.get_u64_le();
        let status = StatusBlock::parse(&buf[..STATUS_BLOCK_SIZE])?;
        buf.advance(STATUS_BLOCK_SIZE);
        let name = parse_name(&buf[..NAME_SIZE])?;
        buf.advance(NAME_SIZE);
        let last_seen = buf.get_u32_le();

        Ok(Self {
            index,
            address,
            status,
            name,
            last_seen,
        })
    }
}

/// One record of a `GroupList` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub index: u16,
    pub name: String,
}

impl FixedRecord for GroupRecord {
    const SIZE: usize = 18;

    fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < Self::SIZE {
            return Err(ProtocolError::FrameTooShort(data.len()));
        }

        Ok(Self {
            index: u16::from_le_bytes([data[0], data[1]]),
            name: parse_name(&data[2..2 + NAME_SIZE])?,
        })
    }
}

/// One record of a `SceneList` response
///
/// Layout: idx(1) + pad(1) + name(16) + group bitmask(2)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneRecord {
    pub index: u8,
    pub name: String,
    pub group: u8,
}

impl FixedRecord for SceneRecord {
    const SIZE: usize = 20;

    fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < Self::SIZE {
            return Err(ProtocolError::FrameTooShort(data.len()));
        }

        let mask = u16::from_le_bytes([data[18], data[19]]);
        let group = decode_scene_group(mask).ok_or_else(|| {
            ProtocolError::InvalidFrame(format!("Scene {} has no group bit set", data[0]))
        })?;

        Ok(Self {
            index: data[0],
            name: parse_name(&data[2..2 + NAME_SIZE])?,
            group,
        })
    }
}

/// Response to the legacy `GroupInfo` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub index: u16,
    pub name: String,
    pub addresses: Vec<u64>,
}

impl GroupInfo {
    #[allow(clippy::missing_errors_doc)]
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        const FIXED: usize = 2 + NAME_SIZE + 1;
        if payload.len() < FIXED {
            return Err(ProtocolError::FrameTooShort(payload.len()));
        }

        let index = u16::from_le_bytes([payload[0], payload[1]]);
        let name = parse_name(&payload[2..2 + NAME_SIZE])?;
        let count = payload[FIXED - 1] as usize;

        let body = &payload[FIXED..];
        if body.len() < count * 8 {
            return Err(ProtocolError::RecordCount {
                expected: count,
                actual: payload.len(),
            });
        }

        let addresses = body
            .chunks_exact(8)
            .take(count)
            .map(|mut chunk| chunk.get_u64_le())
            .collect();

        Ok(Self {
            index,
            name,
            addresses,
        })
    }
}

/// Values returned by the single-light `LightStatus` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightState {
    pub on: bool,
    pub lum: u8,
    pub temp: u16,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl LightState {
    /// Offset of the on/off byte inside the response payload
    const PAYLOAD_OFFSET: usize = 19 - RESPONSE_HEADER_SIZE;

    /// Parse a `LightStatus` response; `None` if the light is unreachable
    #[allow(clippy::missing_errors_doc)]
    pub fn parse(response: &Response) -> Result<Option<Self>, ProtocolError> {
        let payload = &response.payload;
        if RESPONSE_HEADER_SIZE + payload.len() == UNREACHABLE_LIGHT_STATUS_SIZE {
            return Ok(None);
        }

        if payload.len() < Self::PAYLOAD_OFFSET + 11 {
            return Err(ProtocolError::FrameTooShort(
                RESPONSE_HEADER_SIZE + payload.len(),
            ));
        }

        let mut buf = &payload[Self::PAYLOAD_OFFSET..];
        Ok(Some(Self {
            on: buf.get_u8() != 0,
            lum: buf.get_u8(),
            temp: buf.get_u16_le(),
            red: buf.get_u8(),
            green: buf.get_u8(),
            blue: buf.get_u8(),
        }))
    }
}
