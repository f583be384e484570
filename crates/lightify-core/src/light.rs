//! Light state mirrored from the gateway

use crate::device::{Capability, DeviceSubType, DeviceType, Features};
use crate::luminary::{Bounds, Luminary, DEFAULT_LUMINANCE, DEFAULT_TEMPERATURE, MAX_LUMINANCE};
use lightify_protocol::{LightRecord, StatusBlock, Target};

/// Gateway reports last-seen in units of this many minutes
pub const LAST_SEEN_FACTOR: u32 = 5;

/// A light (or plug, switch, sensor) known to the gateway
///
/// Setters only change the cached values; the gateway client decides what
/// to send based on their return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Light {
    address: u64,
    serial: u64,
    index: u16,
    name: String,
    capability: Capability,
    reachable: bool,
    last_seen: u32,
    on: bool,
    lum: u8,
    temp: u16,
    red: u8,
    green: u8,
    blue: u8,
    version: String,
    groups: Vec<u8>,
    raw_values: StatusBlock,
    deleted: bool,
}

impl Light {
    /// Create a light with type-appropriate defaults
    #[must_use]
    pub fn new(address: u64, serial: u64, capability: Capability) -> Self {
        let actuator = capability.subtype.is_actuator();
        let (lum, temp, colour) = if actuator {
            (MAX_LUMINANCE, DEFAULT_TEMPERATURE, u8::MAX)
        } else {
            (0, 0, 0)
        };

        Self {
            address,
            serial,
            index: 0,
            name: String::new(),
            capability,
            reachable: true,
            last_seen: 0,
            on: false,
            lum,
            temp,
            red: colour,
            green: colour,
            blue: colour,
            version: String::new(),
            groups: Vec::new(),
            raw_values: StatusBlock::default(),
            deleted: false,
        }
    }

    /// Overwrite state from a bulk status record
    ///
    /// Attributes outside the feature set keep their defaults.
    pub fn update_status(&mut self, record: &LightRecord) {
        let status = &record.status;

        self.index = record.index;
        self.name.clone_from(&record.name);
        self.reachable = status.reachable;
        self.last_seen = record.last_seen.saturating_mul(LAST_SEEN_FACTOR);
        self.groups = status.groups();
        self.version = status.version_string();
        self.raw_values = *status;

        let features = self.capability.features;
        if features.contains(Features::ON) {
            self.on = status.on;
        }
        if features.contains(Features::LUM) {
            self.lum = status.lum;
        }
        if features.contains(Features::TEMP) {
            self.temp = status.temp;
        }
        if features.contains(Features::RGB) {
            self.red = status.red;
            self.green = status.green;
            self.blue = status.blue;
        }
    }

    /// Switch on or off; returns the value to send
    pub fn apply_onoff(&mut self, on: bool) -> Option<bool> {
        if !self.accepts(Features::ON) {
            return None;
        }

        self.on = on;
        if on && self.lum == 0 {
            self.lum = DEFAULT_LUMINANCE;
        }
        Some(on)
    }

    /// Set luminance; zero switches the light off. Returns the value to send.
    pub fn apply_luminance(&mut self, lum: u8) -> Option<u8> {
        if !self.accepts(Features::LUM) {
            return None;
        }

        let lum = self.bounds().clamp_luminance(lum);
        if lum > 0 {
            self.lum = lum;
            self.on = true;
        } else {
            self.lum = DEFAULT_LUMINANCE;
            self.on = false;
        }
        Some(lum)
    }

    /// Set colour temperature in kelvin; returns the clamped value to send
    pub fn apply_temperature(&mut self, temp: u16) -> Option<u16> {
        if !self.accepts(Features::TEMP) {
            return None;
        }

        let temp = self.bounds().clamp_temperature(temp);
        self.temp = temp;
        Some(temp)
    }

    /// Set RGB colour; returns the value to send
    pub fn apply_rgb(&mut self, red: u8, green: u8, blue: u8) -> Option<(u8, u8, u8)> {
        if !self.accepts(Features::RGB) {
            return None;
        }

        self.red = red;
        self.green = green;
        self.blue = blue;
        Some((red, green, blue))
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    #[must_use]
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Identity of this object; a light seen again after removal gets a new one
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Gateway-assigned list index
    #[must_use]
    pub fn index(&self) -> u16 {
        self.index
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn reachable(&self) -> bool {
        self.reachable
    }

    /// Minutes since the gateway last heard from the light
    #[must_use]
    pub fn last_seen(&self) -> u32 {
        self.last_seen
    }

    #[must_use]
    pub fn on(&self) -> bool {
        self.on
    }

    #[must_use]
    pub fn lum(&self) -> u8 {
        self.lum
    }

    #[must_use]
    pub fn temp(&self) -> u16 {
        self.temp
    }

    #[must_use]
    pub fn red(&self) -> u8 {
        self.red
    }

    #[must_use]
    pub fn green(&self) -> u8 {
        self.green
    }

    #[must_use]
    pub fn blue(&self) -> u8 {
        self.blue
    }

    #[must_use]
    pub fn rgb(&self) -> (u8, u8, u8) {
        (self.red, self.green, self.blue)
    }

    /// Firmware version as eight hex digits
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// 1-based indices of the groups the light belongs to
    #[must_use]
    pub fn groups(&self) -> &[u8] {
        &self.groups
    }

    /// Last status block as received, regardless of features
    #[must_use]
    pub fn raw_values(&self) -> &StatusBlock {
        &self.raw_values
    }

    #[must_use]
    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    #[must_use]
    pub fn type_id(&self) -> u8 {
        self.capability.type_id
    }

    #[must_use]
    pub fn assumed_type_id(&self) -> u8 {
        self.capability.assumed_type_id
    }

    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        self.capability.device_type
    }

    #[must_use]
    pub fn device_subtype(&self) -> DeviceSubType {
        self.capability.subtype
    }

    /// Device type name from the type table
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.capability.name
    }

    #[must_use]
    pub fn min_temp(&self) -> u16 {
        self.capability.temp_range.map_or(self.temp, |(min, _)| min)
    }

    #[must_use]
    pub fn max_temp(&self) -> u16 {
        self.capability.temp_range.map_or(self.temp, |(_, max)| max)
    }

    #[must_use]
    pub fn deleted(&self) -> bool {
        self.deleted
    }
}

impl Luminary for Light {
    fn target(&self) -> Option<Target> {
        Some(Target::Light(self.address))
    }

    fn features(&self) -> Features {
        self.capability.features
    }

    fn bounds(&self) -> Bounds {
        Bounds::new(self.min_temp(), self.max_temp())
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }
}
