//! Device types and the capability model

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display name used when the device type had to be guessed
pub const UNKNOWN_DEVICE_NAME: &str = "unknown device";

/// Raw type id assumed for unknown devices reporting the "no RGB" sentinel
pub const TYPE_LIGHT_TUNABLE_WHITE: u8 = 2;

/// Raw type id assumed for every other unknown device
pub const TYPE_LIGHT_RGBW: u8 = 10;

/// RGB triple reported by devices without colour support
pub const NO_RGB_VALUES: (u8, u8, u8) = (1, 0, 0);

pub const MIN_TEMPERATURE_TUNABLE_WHITE: u16 = 2700;
pub const MAX_TEMPERATURE_TUNABLE_WHITE: u16 = 6500;
pub const MIN_TEMPERATURE_RGBW: u16 = 1900;
pub const MAX_TEMPERATURE_RGBW: u16 = 6500;

/// Generalized device type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Light,
    Plug,
    Sensor,
    Switch,
}

/// Device sub type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceSubType {
    LightFixedWhite,
    LightTunableWhite,
    LightRgb,
    LightRgbw,
    Plug,
    Switch,
    ContactSensor,
    MotionSensor,
}

bitflags! {
    /// Attributes a device (or group) accepts
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Features: u8 {
        const ON = 0b0001;
        const LUM = 0b0010;
        const TEMP = 0b0100;
        const RGB = 0b1000;
    }
}

impl DeviceSubType {
    #[must_use]
    pub fn features(&self) -> Features {
        match self {
            DeviceSubType::Switch | DeviceSubType::ContactSensor | DeviceSubType::MotionSensor => {
                Features::empty()
            }
            DeviceSubType::Plug => Features::ON,
            DeviceSubType::LightFixedWhite => Features::ON | Features::LUM,
            DeviceSubType::LightTunableWhite => Features::ON | Features::LUM | Features::TEMP,
            DeviceSubType::LightRgb => Features::ON | Features::LUM | Features::RGB,
            DeviceSubType::LightRgbw => Features::all(),
        }
    }

    /// Default colour temperature range for temperature capable sub types
    #[must_use]
    pub fn default_temp_range(&self) -> Option<(u16, u16)> {
        match self {
            DeviceSubType::LightTunableWhite => Some((
                MIN_TEMPERATURE_TUNABLE_WHITE,
                MAX_TEMPERATURE_TUNABLE_WHITE,
            )),
            DeviceSubType::LightRgbw => Some((MIN_TEMPERATURE_RGBW, MAX_TEMPERATURE_RGBW)),
            _ => None,
        }
    }

    /// Whether the device is a light or plug (has output state at all)
    #[must_use]
    pub fn is_actuator(&self) -> bool {
        !matches!(
            self,
            DeviceSubType::Switch | DeviceSubType::ContactSensor | DeviceSubType::MotionSensor
        )
    }
}

/// One entry of the device type table
///
/// Serialized form, as accepted in override tables:
/// ```json
/// { "128": { "type": "light", "subtype": "light_tunable_white",
///            "name": "tradfri tunable white", "min_temp": 2200, "max_temp": 4000 } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTypeInfo {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub subtype: DeviceSubType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_temp: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_temp: Option<u16>,
}

impl DeviceTypeInfo {
    #[must_use]
    pub fn new(device_type: DeviceType, subtype: DeviceSubType, name: &str) -> Self {
        Self {
            device_type,
            subtype,
            name: name.to_string(),
            min_temp: None,
            max_temp: None,
        }
    }

    #[must_use]
    pub fn with_temp_range(mut self, min_temp: u16, max_temp: u16) -> Self {
        self.min_temp = Some(min_temp);
        self.max_temp = Some(max_temp);
        self
    }

    /// Colour temperature range, only for temperature capable sub types
    #[must_use]
    pub fn temp_range(&self) -> Option<(u16, u16)> {
        let (min, max) = self.subtype.default_temp_range()?;
        Some((self.min_temp.unwrap_or(min), self.max_temp.unwrap_or(max)))
    }
}

/// Resolved identity and capabilities of one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    /// Type id as reported by the gateway
    pub type_id: u8,
    /// Type id the capabilities were taken from
    pub assumed_type_id: u8,
    pub device_type: DeviceType,
    pub subtype: DeviceSubType,
    pub name: String,
    pub features: Features,
    pub temp_range: Option<(u16, u16)>,
}

impl Capability {
    fn from_info(type_id: u8, assumed_type_id: u8, info: &DeviceTypeInfo) -> Self {
        let name = if type_id == assumed_type_id {
            info.name.clone()
        } else {
            UNKNOWN_DEVICE_NAME.to_string()
        };

        Self {
            type_id,
            assumed_type_id,
            device_type: info.device_type,
            subtype: info.subtype,
            name,
            features: info.subtype.features(),
            temp_range: info.temp_range(),
        }
    }

    /// Whether the type was guessed rather than found in the table
    #[must_use]
    pub fn is_assumed(&self) -> bool {
        self.type_id != self.assumed_type_id
    }
}

/// Device type table: built-in entries merged with caller overrides
#[derive(Debug, Clone)]
pub struct DeviceTypes {
    table: HashMap<u8, DeviceTypeInfo>,
}

impl Default for DeviceTypes {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DeviceTypes {
    /// The built-in table of known device types
    #[must_use]
    pub fn builtin() -> Self {
        use DeviceSubType as S;
        use DeviceType as T;

        let table = HashMap::from([
            (1, DeviceTypeInfo::new(T::Light, S::LightFixedWhite, "light non softswitch")),
            (2, DeviceTypeInfo::new(T::Light, S::LightTunableWhite, "light tunable white")),
            (4, DeviceTypeInfo::new(T::Light, S::LightFixedWhite, "light fixed white")),
            (8, DeviceTypeInfo::new(T::Light, S::LightRgb, "light rgb")),
            (10, DeviceTypeInfo::new(T::Light, S::LightRgbw, "light rgbw")),
            (16, DeviceTypeInfo::new(T::Plug, S::Plug, "plug")),
            (31, DeviceTypeInfo::new(T::Sensor, S::ContactSensor, "contact sensor")),
            (32, DeviceTypeInfo::new(T::Sensor, S::MotionSensor, "motion sensor")),
            (64, DeviceTypeInfo::new(T::Switch, S::Switch, "2 button switch")),
            (65, DeviceTypeInfo::new(T::Switch, S::Switch, "4 button switch")),
            (66, DeviceTypeInfo::new(T::Switch, S::Switch, "3 button switch")),
            (67, DeviceTypeInfo::new(T::Switch, S::Switch, "unknown switch")),
            (68, DeviceTypeInfo::new(T::Switch, S::Switch, "unknown switch")),
            (
                128,
                DeviceTypeInfo::new(T::Light, S::LightTunableWhite, "tradfri tunable white")
                    .with_temp_range(2200, 4000),
            ),
        ]);

        Self { table }
    }

    /// Built-in table with `overrides` taking precedence
    #[must_use]
    pub fn with_overrides(overrides: HashMap<u8, DeviceTypeInfo>) -> Self {
        let mut types = Self::builtin();
        types.table.extend(overrides);
        types
    }

    #[must_use]
    pub fn get(&self, type_id: u8) -> Option<&DeviceTypeInfo> {
        self.table.get(&type_id)
    }

    #[must_use]
    pub fn contains(&self, type_id: u8) -> bool {
        self.table.contains_key(&type_id)
    }

    /// Resolve a raw type id, guessing from the reported colour if unknown
    #[must_use]
    pub fn resolve(&self, type_id: u8, rgb: (u8, u8, u8)) -> Capability {
        if let Some(info) = self.table.get(&type_id) {
            return Capability::from_info(type_id, type_id, info);
        }

        tracing::warn!("Unknown device type id: {}", type_id);
        let assumed = if rgb == NO_RGB_VALUES {
            TYPE_LIGHT_TUNABLE_WHITE
        } else {
            TYPE_LIGHT_RGBW
        };

        match self.table.get(&assumed) {
            Some(info) => Capability::from_info(type_id, assumed, info),
            None => {
                // Overrides can replace but never remove entries, so this
                // only happens with a hand-built table
                let fallback =
                    DeviceTypeInfo::new(DeviceType::Light, DeviceSubType::LightRgbw, "light rgbw");
                Capability::from_info(type_id, TYPE_LIGHT_RGBW, &fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let types = DeviceTypes::builtin();
        let cap = types.resolve(16, (0, 0, 0));
        assert_eq!(cap.device_type, DeviceType::Plug);
        assert_eq!(cap.features, Features::ON);
        assert_eq!(cap.name, "plug");
        assert!(!cap.is_assumed());
        assert_eq!(cap.temp_range, None);
    }

    #[test]
    fn test_unknown_with_no_rgb_sentinel_is_tunable_white() {
        let cap = DeviceTypes::builtin().resolve(200, NO_RGB_VALUES);
        assert_eq!(cap.assumed_type_id, TYPE_LIGHT_TUNABLE_WHITE);
        assert_eq!(cap.subtype, DeviceSubType::LightTunableWhite);
        assert_eq!(cap.name, UNKNOWN_DEVICE_NAME);
        assert!(cap.is_assumed());
        assert_eq!(cap.temp_range, Some((2700, 6500)));
    }

    #[test]
    fn test_unknown_with_colour_is_rgbw() {
        let cap = DeviceTypes::builtin().resolve(200, (255, 0, 0));
        assert_eq!(cap.assumed_type_id, TYPE_LIGHT_RGBW);
        assert_eq!(cap.features, Features::all());
        assert_eq!(cap.temp_range, Some((1900, 6500)));
    }

    #[test]
    fn test_device_specific_range() {
        let cap = DeviceTypes::builtin().resolve(128, (1, 0, 0));
        assert_eq!(cap.temp_range, Some((2200, 4000)));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let overrides = HashMap::from([
            (
                2,
                DeviceTypeInfo::new(DeviceType::Light, DeviceSubType::LightTunableWhite, "custom")
                    .with_temp_range(3000, 5000),
            ),
            (
                99,
                DeviceTypeInfo::new(DeviceType::Plug, DeviceSubType::Plug, "smart plug"),
            ),
        ]);
        let types = DeviceTypes::with_overrides(overrides);

        assert_eq!(types.resolve(2, (1, 0, 0)).temp_range, Some((3000, 5000)));
        assert_eq!(types.resolve(99, (0, 0, 0)).name, "smart plug");
        assert_eq!(types.get(2).map(|info| info.name.as_str()), Some("custom"));
        assert_eq!(types.get(99).map(|info| info.subtype), Some(DeviceSubType::Plug));
        assert_eq!(types.get(200), None);
        assert!(types.contains(10));
    }

    #[test]
    fn test_sensor_has_no_features() {
        let cap = DeviceTypes::builtin().resolve(32, (0, 0, 0));
        assert!(cap.features.is_empty());
        assert!(!cap.subtype.is_actuator());
    }

    #[test]
    fn test_override_json_shape() {
        let json = r#"{
            "128": { "type": "light", "subtype": "light_tunable_white",
                     "name": "tradfri", "min_temp": 2200, "max_temp": 4000 },
            "17": { "type": "plug", "subtype": "plug", "name": "outlet" }
        }"#;
        let parsed: HashMap<u8, DeviceTypeInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed[&128].temp_range(), Some((2200, 4000)));
        assert_eq!(parsed[&17].temp_range(), None);
    }
}
