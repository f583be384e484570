//! Lightify frame structure and sequence numbering

use crate::commands::{CommandId, PacketFlag};
use crate::types::ProtocolError;
use bytes::{Buf, BufMut};

/// Size of the length prefix that starts every message
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Request sub-header: flag(1) + cmd(1) + reserved(2) + version(1) + seq(1)
pub const SUB_HEADER_SIZE: usize = 6;

/// Response sub-header: flag(1) + cmd(1) + request id(4) + status(1)
pub const RESPONSE_HEADER_SIZE: usize = 7;

/// Protocol identifier sent in every request
pub const PROTOCOL_VERSION: u8 = 0x07;

/// Width of the address/index field of addressed commands
pub const ADDRESS_FIELD_SIZE: usize = 8;

/// Destination of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Gateway-wide command without address field
    Global,
    /// A single light by MAC address
    Light(u64),
    /// A group or scene by gateway index
    Index(u8),
}

impl Target {
    #[must_use]
    pub fn flag(&self) -> PacketFlag {
        match self {
            Target::Light(_) => PacketFlag::Light,
            Target::Global | Target::Index(_) => PacketFlag::Global,
        }
    }

    /// Encoded address field, `None` for global commands
    #[must_use]
    pub fn address_field(&self) -> Option<[u8; ADDRESS_FIELD_SIZE]> {
        match *self {
            Target::Global => None,
            Target::Light(addr) => Some(addr.to_le_bytes()),
            Target::Index(idx) => {
                let mut field = [0u8; ADDRESS_FIELD_SIZE];
                field[0] = idx;
                Some(field)
            }
        }
    }
}

/// Lightify request frame
///
/// Frame format:
/// ```text
/// [Length: 2 bytes LE] (bytes following the length field)
/// [Flag: 1 byte] (0x00 light, 0x02 global/group/scene)
/// [Command ID: 1 byte]
/// [Reserved: 2 bytes] (always 0)
/// [Protocol: 1 byte] (0x07)
/// [Sequence: 1 byte]
/// [Address: 8 bytes LE] (addressed commands only)
/// [Payload: variable]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub flag: PacketFlag,
    pub command_id: CommandId,
    pub sequence: u8,
    pub address: Option<[u8; ADDRESS_FIELD_SIZE]>,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a global command (no address field)
    #[must_use]
    pub fn global(command_id: CommandId, sequence: u8, payload: Vec<u8>) -> Self {
        Self::addressed(Target::Global, command_id, sequence, payload)
    }

    /// Create a command for the given target
    #[must_use]
    pub fn addressed(target: Target, command_id: CommandId, sequence: u8, payload: Vec<u8>) -> Self {
        Self {
            flag: target.flag(),
            command_id,
            sequence,
            address: target.address_field(),
            payload,
        }
    }

    /// Value of the length field: everything after the length prefix
    #[must_use]
    pub fn length(&self) -> usize {
        SUB_HEADER_SIZE + self.address.map_or(0, |a| a.len()) + self.payload.len()
    }

    /// Serialize frame to bytes ready for the socket
    #[must_use]
    #[allow(clippy::missing_panics_doc)] // Panic only on protocol-violating payload size
    pub fn serialize(&self) -> Vec<u8> {
        let length = u16::try_from(self.length()).expect("payload exceeds protocol maximum");

        let mut data = Vec::with_capacity(LENGTH_PREFIX_SIZE + length as usize);
        data.put_u16_le(length);
        data.put_u8(self.flag as u8);
        data.put_u8(self.command_id as u8);
        data.put_u8(0x00);
        data.put_u8(0x00);
        data.put_u8(PROTOCOL_VERSION);
        data.put_u8(self.sequence);
        if let Some(address) = &self.address {
            data.put_slice(address);
        }
        data.put_slice(&self.payload);
        data
    }
}

/// Decoded request header, used to inspect frames on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u16,
    pub flag: u8,
    pub command_id: u8,
    pub protocol_version: u8,
    pub sequence: u8,
}

impl FrameHeader {
    /// Parse a serialized request, returning the header and the bytes after
    /// the sub-header (address field and payload)
    #[allow(clippy::missing_errors_doc)]
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8]), ProtocolError> {
        if data.len() < LENGTH_PREFIX_SIZE + SUB_HEADER_SIZE {
            return Err(ProtocolError::FrameTooShort(data.len()));
        }

        let mut buf = data;
        let length = buf.get_u16_le();
        if length as usize != buf.len() {
            return Err(ProtocolError::InvalidFrame(format!(
                "Frame length mismatch: header says {}, actual {}",
                length,
                buf.len()
            )));
        }

        let flag = buf.get_u8();
        let command_id = buf.get_u8();
        let _reserved = buf.get_u16_le();
        let protocol_version = buf.get_u8();
        let sequence = buf.get_u8();

        Ok((
            Self {
                length,
                flag,
                command_id,
                protocol_version,
                sequence,
            },
            buf,
        ))
    }
}

/// Gateway response, without the length prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub flag: u8,
    pub command_id: CommandId,
    pub request_id: [u8; 4],
    pub status: u8,
    pub payload: Vec<u8>,
}

impl Response {
    /// Parse the bytes that followed the length prefix
    #[allow(clippy::missing_errors_doc)]
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < RESPONSE_HEADER_SIZE {
            return Err(ProtocolError::FrameTooShort(data.len()));
        }

        let mut buf = data;
        let flag = buf.get_u8();
        let raw_command = buf.get_u8();
        let command_id =
            CommandId::from_u8(raw_command).ok_or(ProtocolError::UnknownCommand(raw_command))?;
        let mut request_id = [0u8; 4];
        buf.copy_to_slice(&mut request_id);
        let status = buf.get_u8();

        Ok(Self {
            flag,
            command_id,
            request_id,
            status,
            payload: buf.to_vec(),
        })
    }

    /// Serialize including the length prefix, as the gateway sends it
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn serialize(&self) -> Vec<u8> {
        let length = u16::try_from(RESPONSE_HEADER_SIZE + self.payload.len())
            .expect("payload exceeds protocol maximum");

        let mut data = Vec::with_capacity(LENGTH_PREFIX_SIZE + length as usize);
        data.put_u16_le(length);
        data.put_u8(self.flag);
        data.put_u8(self.command_id as u8);
        data.put_slice(&self.request_id);
        data.put_u8(self.status);
        data.put_slice(&self.payload);
        data
    }
}

/// Cyclic request sequence counter (1..=255, never 0)
#[derive(Debug, Clone, Default)]
pub struct SequenceGenerator {
    last: u8,
}

impl SequenceGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next sequence number
    pub fn next(&mut self) -> u8 {
        self.last = match self.last.wrapping_add(1) {
            0 => 1,
            n => n,
        };
        self.last
    }
}
