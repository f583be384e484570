//! Groups of lights and their derived attributes

use crate::device::Features;
use crate::light::Light;
use crate::luminary::{Bounds, Luminary};
use lightify_protocol::Target;
use std::collections::BTreeMap;

/// A gateway group
///
/// Membership, scene names and the derived feature set and temperature
/// range are maintained by the gateway client on every refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    index: u16,
    serial: u64,
    name: String,
    lights: Vec<u64>,
    scenes: Vec<String>,
    features: Features,
    min_temp: u16,
    max_temp: u16,
    deleted: bool,
}

impl Group {
    #[must_use]
    pub fn new(index: u16, name: &str, serial: u64) -> Self {
        Self {
            index,
            serial,
            name: name.to_string(),
            lights: Vec::new(),
            scenes: Vec::new(),
            features: Features::empty(),
            min_temp: 0,
            max_temp: 0,
            deleted: false,
        }
    }

    /// Recompute membership and derived attributes from the light map
    ///
    /// Members are ordered by their gateway list index.
    pub(crate) fn update_lights(&mut self, lights: &BTreeMap<u64, Light>) {
        let mut members: Vec<&Light> = lights
            .values()
            .filter(|light| light.groups().iter().any(|&g| u16::from(g) == self.index))
            .collect();
        members.sort_by_key(|light| light.index());

        self.lights = members.iter().map(|light| light.address()).collect();
        self.features = members
            .iter()
            .fold(Features::empty(), |acc, light| acc | light.features());
        self.min_temp = members.iter().map(|l| l.min_temp()).min().unwrap_or(0);
        self.max_temp = members.iter().map(|l| l.max_temp()).max().unwrap_or(0);
    }

    pub(crate) fn set_scenes(&mut self, scenes: Vec<String>) {
        self.scenes = scenes;
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    /// Clamped luminance to send, `None` if the group can't take it
    #[must_use]
    pub fn prepare_luminance(&self, lum: u8) -> Option<u8> {
        self.accepts(Features::LUM)
            .then(|| self.bounds().clamp_luminance(lum))
    }

    /// Clamped temperature to send, `None` if the group can't take it
    #[must_use]
    pub fn prepare_temperature(&self, temp: u16) -> Option<u16> {
        self.accepts(Features::TEMP)
            .then(|| self.bounds().clamp_temperature(temp))
    }

    #[must_use]
    pub fn index(&self) -> u16 {
        self.index
    }

    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member light addresses ordered by light list index
    #[must_use]
    pub fn lights(&self) -> &[u64] {
        &self.lights
    }

    /// Names of the scenes stored for this group
    #[must_use]
    pub fn scenes(&self) -> &[String] {
        &self.scenes
    }

    #[must_use]
    pub fn min_temp(&self) -> u16 {
        self.min_temp
    }

    #[must_use]
    pub fn max_temp(&self) -> u16 {
        self.max_temp
    }

    #[must_use]
    pub fn deleted(&self) -> bool {
        self.deleted
    }

    /// Member lights still present in `lights`
    #[must_use]
    pub fn members<'a>(&self, lights: &'a BTreeMap<u64, Light>) -> Vec<&'a Light> {
        self.lights
            .iter()
            .filter_map(|addr| lights.get(addr))
            .collect()
    }

    #[must_use]
    pub fn light_names(&self, lights: &BTreeMap<u64, Light>) -> Vec<String> {
        self.members(lights)
            .iter()
            .map(|light| light.name().to_string())
            .collect()
    }

    /// True if any member light is on
    #[must_use]
    pub fn on(&self, lights: &BTreeMap<u64, Light>) -> bool {
        self.members(lights).iter().any(|light| light.on())
    }

    /// True if any member light is reachable
    #[must_use]
    pub fn reachable(&self, lights: &BTreeMap<u64, Light>) -> bool {
        self.members(lights).iter().any(|light| light.reachable())
    }

    #[must_use]
    pub fn lum(&self, lights: &BTreeMap<u64, Light>) -> u8 {
        best_guess(&self.members(lights), Features::LUM, Light::lum)
    }

    #[must_use]
    pub fn temp(&self, lights: &BTreeMap<u64, Light>) -> u16 {
        best_guess(&self.members(lights), Features::TEMP, Light::temp)
    }

    #[must_use]
    pub fn red(&self, lights: &BTreeMap<u64, Light>) -> u8 {
        best_guess(&self.members(lights), Features::RGB, Light::red)
    }

    #[must_use]
    pub fn green(&self, lights: &BTreeMap<u64, Light>) -> u8 {
        best_guess(&self.members(lights), Features::RGB, Light::green)
    }

    #[must_use]
    pub fn blue(&self, lights: &BTreeMap<u64, Light>) -> u8 {
        best_guess(&self.members(lights), Features::RGB, Light::blue)
    }

    #[must_use]
    pub fn rgb(&self, lights: &BTreeMap<u64, Light>) -> (u8, u8, u8) {
        best_guess(&self.members(lights), Features::RGB, Light::rgb)
    }
}

impl Luminary for Group {
    fn target(&self) -> Option<Target> {
        // Group indices are single byte on the wire
        u8::try_from(self.index).ok().map(Target::Index)
    }

    fn features(&self) -> Features {
        self.features
    }

    fn bounds(&self) -> Bounds {
        Bounds::new(self.min_temp, self.max_temp)
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// Pick a representative value for a group attribute
///
/// Lights supporting `feature` win; ties go to the larger value. Zero
/// (the type's default) if there are no members.
fn best_guess<T, F>(members: &[&Light], feature: Features, value: F) -> T
where
    T: Ord + Default,
    F: Fn(&Light) -> T,
{
    members
        .iter()
        .map(|light| (light.features().contains(feature), value(light)))
        .max()
        .map(|(_, value)| value)
        .unwrap_or_default()
}
