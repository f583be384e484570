//! Behaviour shared by lights and groups

use crate::device::Features;
use lightify_protocol::{CommandId, Frame, Target};

/// Upper bound of the luminance scale
pub const MAX_LUMINANCE: u8 = 100;

/// Luminance stored when a light is switched on from zero
pub const DEFAULT_LUMINANCE: u8 = 1;

/// Colour temperature a new light starts with, in kelvin
pub const DEFAULT_TEMPERATURE: u16 = 2700;

/// Clamp bounds for setter input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub min_temp: u16,
    pub max_temp: u16,
}

impl Bounds {
    #[must_use]
    pub fn new(min_temp: u16, max_temp: u16) -> Self {
        Self { min_temp, max_temp }
    }

    #[must_use]
    pub fn clamp_luminance(&self, lum: u8) -> u8 {
        lum.min(MAX_LUMINANCE)
    }

    #[must_use]
    pub fn clamp_temperature(&self, temp: u16) -> u16 {
        // max first so an empty range collapses onto min_temp
        temp.min(self.max_temp).max(self.min_temp)
    }
}

/// Something that can be addressed by a control command
pub trait Luminary {
    /// Where commands for this item go, `None` if it has no wire address
    fn target(&self) -> Option<Target>;

    fn features(&self) -> Features;

    fn bounds(&self) -> Bounds;

    fn is_deleted(&self) -> bool;

    /// Whether a setter for `feature` should do anything
    fn accepts(&self, feature: Features) -> bool {
        !self.is_deleted() && self.target().is_some() && self.features().contains(feature)
    }

    fn build_command(
        &self,
        sequence: u8,
        command_id: CommandId,
        payload: Vec<u8>,
    ) -> Option<Frame> {
        let target = self.target()?;
        Some(Frame::addressed(target, command_id, sequence, payload))
    }
}
