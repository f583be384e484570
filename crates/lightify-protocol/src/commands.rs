//! Lightify gateway command definitions

/// Command IDs understood by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandId {
    /// Status of every paired device (address, status block, name)
    AllLightStatus = 0x13,
    /// Group indices and names
    GroupList = 0x1E,
    /// Scene indices, names and owning group
    SceneList = 0x1F,
    /// Group index, name and member addresses (legacy)
    GroupInfo = 0x26,
    /// Set luminance (brightness)
    Luminance = 0x31,
    /// Switch on or off
    OnOff = 0x32,
    /// Set colour temperature
    Temperature = 0x33,
    /// Set RGB colour
    Colour = 0x36,
    /// Activate a stored scene
    ActivateScene = 0x52,
    /// Status of a single light (subset of the bulk status)
    LightStatus = 0x68,
}

impl CommandId {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x13 => Some(CommandId::AllLightStatus),
            0x1E => Some(CommandId::GroupList),
            0x1F => Some(CommandId::SceneList),
            0x26 => Some(CommandId::GroupInfo),
            0x31 => Some(CommandId::Luminance),
            0x32 => Some(CommandId::OnOff),
            0x33 => Some(CommandId::Temperature),
            0x36 => Some(CommandId::Colour),
            0x52 => Some(CommandId::ActivateScene),
            0x68 => Some(CommandId::LightStatus),
            _ => None,
        }
    }
}

/// Packet type carried in the second header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketFlag {
    /// Addressed to a single light by MAC address
    Light = 0x00,
    /// Gateway-wide, group or scene command
    Global = 0x02,
}

/// Payload flag for `AllLightStatus` requesting every available field
pub const ALL_LIGHT_STATUS_FULL: u8 = 0x01;

/// Alpha byte appended to every colour command
pub const DEFAULT_ALPHA: u8 = 0xFF;

/// Build the payload of a luminance command
#[must_use]
pub fn luminance_payload(lum: u8, transition: u16) -> Vec<u8> {
    let mut payload = Vec::with_capacity(3);
    payload.push(lum);
    payload.extend_from_slice(&transition.to_le_bytes());
    payload
}

/// Build the payload of an on/off command
#[must_use]
pub fn onoff_payload(on: bool) -> Vec<u8> {
    vec![u8::from(on)]
}

/// Build the payload of a colour temperature command
#[must_use]
pub fn temperature_payload(kelvin: u16, transition: u16) -> Vec<u8> {
    let mut payload = Vec::with_capacity(4);
    payload.extend_from_slice(&kelvin.to_le_bytes());
    payload.extend_from_slice(&transition.to_le_bytes());
    payload
}

/// Build the payload of an RGB colour command
#[must_use]
pub fn colour_payload(red: u8, green: u8, blue: u8, transition: u16) -> Vec<u8> {
    let mut payload = vec![red, green, blue, DEFAULT_ALPHA];
    payload.extend_from_slice(&transition.to_le_bytes());
    payload
}
