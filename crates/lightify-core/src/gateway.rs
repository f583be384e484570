//! Lightify gateway client
//!
//! Owns the connection and a mirror of the gateway's lights, groups and
//! scenes. Every operation runs under one lock, so socket I/O and map
//! updates from concurrent callers are strictly serialized.

use crate::device::{DeviceTypeInfo, DeviceTypes, Features};
use crate::error::GatewayError;
use crate::group::Group;
use crate::light::Light;
use crate::luminary::Luminary;
use crate::scene::Scene;
use lightify_protocol::commands::{
    colour_payload, luminance_payload, onoff_payload, temperature_payload, ALL_LIGHT_STATUS_FULL,
};
use lightify_protocol::{
    parse_records, CommandId, Connection, FixedRecord, Frame, GroupInfo, GroupRecord, LightRecord,
    LightState, Response, SceneRecord, Target, DEFAULT_TIMEOUT, GATEWAY_PORT,
};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Connection settings for a gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    /// Device type entries overriding the built-in table
    pub device_types: HashMap<u8, DeviceTypeInfo>,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            port: GATEWAY_PORT,
            timeout: DEFAULT_TIMEOUT,
            device_types: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_device_types(mut self, device_types: HashMap<u8, DeviceTypeInfo>) -> Self {
        self.device_types = device_types;
        self
    }
}

/// Entities added and removed by one refresh
///
/// Removed entries are marked deleted.
#[derive(Debug, Clone)]
pub struct Changes<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
}

impl<T> Default for Changes<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

impl<T> Changes<T> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Whether a refresh at `updated` is recent enough to skip another one
fn is_fresh(updated: Option<Instant>, throttle: Option<Duration>) -> bool {
    match (updated, throttle) {
        (Some(at), Some(interval)) => at.elapsed() < interval,
        _ => false,
    }
}

/// Parse a list response, logging the raw payload if it's malformed
fn parse_list<T: FixedRecord>(command_id: CommandId, payload: &[u8]) -> Option<Vec<T>> {
    match parse_records::<T>(payload) {
        Ok(records) => {
            tracing::debug!("{:?}: {} records", command_id, records.len());
            Some(records)
        }
        Err(e) => {
            tracing::warn!("Couldn't parse {:?} response: {}", command_id, e);
            tracing::warn!("Data: {:02X?}", payload);
            None
        }
    }
}

/// Build a control command for a light or group
fn command_frame<L: Luminary>(
    connection: &mut Connection,
    item: &L,
    command_id: CommandId,
    payload: Vec<u8>,
) -> Option<Frame> {
    let sequence = connection.next_sequence();
    let frame = item.build_command(sequence, command_id, payload);
    if frame.is_none() {
        tracing::warn!("{:?}: target has no wire address", command_id);
    }
    frame
}

/// Everything behind the client lock
struct GatewayState {
    connection: Connection,
    lights: BTreeMap<u64, Light>,
    groups: BTreeMap<String, Group>,
    scenes: BTreeMap<String, Scene>,
    lights_updated: Option<Instant>,
    lights_changed: Option<Instant>,
    lights_outdated: bool,
    groups_updated: Option<Instant>,
    scenes_updated: Option<Instant>,
    lights_hash: Option<Vec<u8>>,
    last_serial: u64,
}

impl GatewayState {
    fn new(connection: Connection) -> Self {
        Self {
            connection,
            lights: BTreeMap::new(),
            groups: BTreeMap::new(),
            scenes: BTreeMap::new(),
            lights_updated: None,
            lights_changed: None,
            lights_outdated: false,
            groups_updated: None,
            scenes_updated: None,
            lights_hash: None,
            last_serial: 0,
        }
    }

    fn next_serial(&mut self) -> u64 {
        self.last_serial += 1;
        self.last_serial
    }

    /// Local state diverged from the last status response
    fn set_lights_changed(&mut self) {
        self.lights_hash = None;
        self.lights_changed = Some(Instant::now());
    }

    /// Send a list command; `Ok(None)` if the response couldn't be decoded
    fn list_request(
        &mut self,
        command_id: CommandId,
        payload: Vec<u8>,
    ) -> Result<Option<Response>, GatewayError> {
        match self.connection.request(Target::Global, command_id, payload) {
            Ok(response) => Ok(Some(response)),
            Err(e) if !e.is_transport() => {
                tracing::warn!("Malformed {:?} response: {}", command_id, e);
                if let Some(data) = e.raw_data() {
                    tracing::warn!("Data: {:02X?}", data);
                }
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn refresh_lights(
        &mut self,
        types: &DeviceTypes,
        throttle: Option<Duration>,
    ) -> Result<Changes<Light>, GatewayError> {
        if !self.lights_outdated && is_fresh(self.lights_updated, throttle) {
            return Ok(Changes::default());
        }

        let Some(response) =
            self.list_request(CommandId::AllLightStatus, vec![ALL_LIGHT_STATUS_FULL])?
        else {
            return Ok(Changes::default());
        };

        let hash = Sha256::digest(&response.payload).to_vec();
        if self.lights_hash.as_ref() == Some(&hash) {
            tracing::debug!("Light status unchanged");
            self.lights_updated = Some(Instant::now());
            self.lights_outdated = false;
            return Ok(Changes::default());
        }

        let Some(records) = parse_list::<LightRecord>(CommandId::AllLightStatus, &response.payload)
        else {
            return Ok(Changes::default());
        };

        let mut changes = Changes::default();
        let mut fresh: BTreeMap<u64, Light> = BTreeMap::new();
        for record in &records {
            let existing = fresh
                .remove(&record.address)
                .or_else(|| self.lights.get(&record.address).cloned());
            let is_new = existing.is_none();

            let mut light = match existing {
                Some(light) => light,
                None => {
                    let status = &record.status;
                    let capability = types.resolve(status.type_id, status.rgb());
                    Light::new(record.address, self.next_serial(), capability)
                }
            };
            light.update_status(record);

            if is_new {
                tracing::info!("New light {:016X}: {:?}", record.address, light.name());
                changes.added.push(light.clone());
            }
            fresh.insert(record.address, light);
        }

        for (address, light) in &mut self.lights {
            if !fresh.contains_key(address) {
                tracing::info!("Light {:016X} removed: {:?}", address, light.name());
                light.mark_deleted();
                changes.removed.push(light.clone());
            }
        }

        self.lights = fresh;
        self.lights_hash = Some(hash);
        let now = Instant::now();
        self.lights_updated = Some(now);
        self.lights_changed = Some(now);
        self.lights_outdated = false;

        self.update_group_lights();
        Ok(changes)
    }

    fn refresh_groups(&mut self, throttle: Option<Duration>) -> Result<Changes<Group>, GatewayError> {
        if is_fresh(self.groups_updated, throttle) {
            return Ok(Changes::default());
        }

        let Some(response) = self.list_request(CommandId::GroupList, Vec::new())? else {
            return Ok(Changes::default());
        };
        let Some(records) = parse_list::<GroupRecord>(CommandId::GroupList, &response.payload)
        else {
            return Ok(Changes::default());
        };

        let mut added = Vec::new();
        let mut fresh: BTreeMap<String, Group> = BTreeMap::new();
        for record in records {
            let existing = self
                .groups
                .get(&record.name)
                .filter(|group| group.index() == record.index)
                .cloned();

            let group = match existing {
                Some(group) => group,
                None => {
                    tracing::info!("New group {}: {:?}", record.index, record.name);
                    added.push(record.name.clone());
                    Group::new(record.index, &record.name, self.next_serial())
                }
            };
            fresh.insert(record.name, group);
        }

        let mut changes = Changes::default();
        for (name, group) in &mut self.groups {
            let kept = fresh
                .get(name)
                .is_some_and(|g| g.serial() == group.serial());
            if !kept {
                tracing::info!("Group {} removed: {:?}", group.index(), name);
                group.mark_deleted();
                changes.removed.push(group.clone());
            }
        }

        self.groups = fresh;
        self.groups_updated = Some(Instant::now());
        self.update_group_lights();
        self.update_group_scenes();

        changes.added = added
            .iter()
            .filter_map(|name| self.groups.get(name).cloned())
            .collect();
        Ok(changes)
    }

    fn refresh_scenes(&mut self, throttle: Option<Duration>) -> Result<Changes<Scene>, GatewayError> {
        if is_fresh(self.scenes_updated, throttle) {
            return Ok(Changes::default());
        }

        let Some(response) = self.list_request(CommandId::SceneList, Vec::new())? else {
            return Ok(Changes::default());
        };
        let Some(records) = parse_list::<SceneRecord>(CommandId::SceneList, &response.payload)
        else {
            return Ok(Changes::default());
        };

        let mut changes = Changes::default();
        let mut fresh: BTreeMap<String, Scene> = BTreeMap::new();
        for record in records {
            let existing = self
                .scenes
                .get(&record.name)
                .filter(|scene| scene.matches(record.index, record.group))
                .cloned();

            let scene = match existing {
                Some(scene) => scene,
                None => {
                    tracing::info!(
                        "New scene {}: {:?} (group {})",
                        record.index,
                        record.name,
                        record.group
                    );
                    let scene =
                        Scene::new(record.index, record.group, &record.name, self.next_serial());
                    changes.added.push(scene.clone());
                    scene
                }
            };
            fresh.insert(record.name, scene);
        }

        for (name, scene) in &mut self.scenes {
            let kept = fresh
                .get(name)
                .is_some_and(|s| s.serial() == scene.serial());
            if !kept {
                tracing::info!("Scene {} removed: {:?}", scene.index(), name);
                scene.mark_deleted();
                changes.removed.push(scene.clone());
            }
        }

        self.scenes = fresh;
        self.scenes_updated = Some(Instant::now());
        self.update_group_scenes();
        Ok(changes)
    }

    fn update_group_lights(&mut self) {
        for group in self.groups.values_mut() {
            group.update_lights(&self.lights);
        }
    }

    fn update_group_scenes(&mut self) {
        for group in self.groups.values_mut() {
            let names = self
                .scenes
                .values()
                .filter(|scene| u16::from(scene.group()) == group.index())
                .map(|scene| scene.name().to_string())
                .collect();
            group.set_scenes(names);
        }
    }

    fn ensure_lights(&mut self, types: &DeviceTypes) -> Result<(), GatewayError> {
        if self.lights_updated.is_none() {
            self.refresh_lights(types, None)?;
        }
        Ok(())
    }

    fn ensure_scenes(&mut self) -> Result<(), GatewayError> {
        if self.scenes_updated.is_none() {
            self.refresh_scenes(None)?;
        }
        Ok(())
    }

    /// Groups need lights and scenes for their derived state
    fn ensure_groups(&mut self, types: &DeviceTypes) -> Result<(), GatewayError> {
        self.ensure_lights(types)?;
        self.ensure_scenes()?;
        if self.groups_updated.is_none() {
            self.refresh_groups(None)?;
        }
        Ok(())
    }

    fn activate_scene(&mut self, name: &str, serial: Option<u64>) -> Result<(), GatewayError> {
        let Some(scene) = self
            .scenes
            .get(name)
            .filter(|scene| serial.map_or(true, |s| scene.serial() == s))
        else {
            tracing::debug!("Scene {:?} no longer exists", name);
            return Ok(());
        };

        tracing::info!("Activating scene {:?}", name);
        self.connection
            .request(scene.target(), CommandId::ActivateScene, Vec::new())?;
        self.lights_outdated = true;
        Ok(())
    }
}

/// Client for one Lightify gateway
pub struct Gateway {
    device_types: DeviceTypes,
    state: Mutex<GatewayState>,
}

impl Gateway {
    /// Connect to the gateway described by `config`
    #[allow(clippy::missing_errors_doc)]
    pub fn connect(config: GatewayConfig) -> Result<Self, GatewayError> {
        tracing::info!("Initializing Lightify gateway client for {}", config.host);
        let connection = Connection::connect(&config.host, config.port, config.timeout)?;

        Ok(Self {
            device_types: DeviceTypes::with_overrides(config.device_types),
            state: Mutex::new(GatewayState::new(connection)),
        })
    }

    #[must_use]
    pub fn host(&self) -> String {
        self.state.lock().connection.host().to_string()
    }

    #[must_use]
    pub fn device_types(&self) -> &DeviceTypes {
        &self.device_types
    }

    /// Refresh the status of every light
    ///
    /// With a `throttle`, a refresh within that interval of the previous one
    /// is skipped unless a scene was activated since.
    #[allow(clippy::missing_errors_doc)]
    pub fn update_all_light_status(
        &self,
        throttle: Option<Duration>,
    ) -> Result<Changes<Light>, GatewayError> {
        self.state.lock().refresh_lights(&self.device_types, throttle)
    }

    /// Refresh the group list
    #[allow(clippy::missing_errors_doc)]
    pub fn update_group_list(
        &self,
        throttle: Option<Duration>,
    ) -> Result<Changes<Group>, GatewayError> {
        self.state.lock().refresh_groups(throttle)
    }

    /// Refresh the scene list
    #[allow(clippy::missing_errors_doc)]
    pub fn update_scene_list(
        &self,
        throttle: Option<Duration>,
    ) -> Result<Changes<Scene>, GatewayError> {
        self.state.lock().refresh_scenes(throttle)
    }

    /// Snapshot of all lights keyed by address
    #[allow(clippy::missing_errors_doc)]
    pub fn lights(&self) -> Result<BTreeMap<u64, Light>, GatewayError> {
        let mut state = self.state.lock();
        state.ensure_lights(&self.device_types)?;
        Ok(state.lights.clone())
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn light(&self, address: u64) -> Result<Option<LightHandle<'_>>, GatewayError> {
        let mut state = self.state.lock();
        state.ensure_lights(&self.device_types)?;
        Ok(state.lights.get(&address).map(|light| LightHandle {
            gateway: self,
            address,
            serial: light.serial(),
        }))
    }

    /// First light with the given name
    #[allow(clippy::missing_errors_doc)]
    pub fn light_by_name(&self, name: &str) -> Result<Option<LightHandle<'_>>, GatewayError> {
        let mut state = self.state.lock();
        state.ensure_lights(&self.device_types)?;
        Ok(state
            .lights
            .values()
            .find(|light| light.name() == name)
            .map(|light| LightHandle {
                gateway: self,
                address: light.address(),
                serial: light.serial(),
            }))
    }

    /// Snapshot of all groups keyed by name
    #[allow(clippy::missing_errors_doc)]
    pub fn groups(&self) -> Result<BTreeMap<String, Group>, GatewayError> {
        let mut state = self.state.lock();
        state.ensure_groups(&self.device_types)?;
        Ok(state.groups.clone())
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn group(&self, name: &str) -> Result<Option<GroupHandle<'_>>, GatewayError> {
        let mut state = self.state.lock();
        state.ensure_groups(&self.device_types)?;
        Ok(state.groups.get(name).map(|group| GroupHandle {
            gateway: self,
            name: name.to_string(),
            serial: group.serial(),
        }))
    }

    /// Snapshot of all scenes keyed by name
    #[allow(clippy::missing_errors_doc)]
    pub fn scenes(&self) -> Result<BTreeMap<String, Scene>, GatewayError> {
        let mut state = self.state.lock();
        state.ensure_scenes()?;
        Ok(state.scenes.clone())
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn scene(&self, name: &str) -> Result<Option<SceneHandle<'_>>, GatewayError> {
        let mut state = self.state.lock();
        state.ensure_scenes()?;
        Ok(state.scenes.get(name).map(|scene| SceneHandle {
            gateway: self,
            name: name.to_string(),
            serial: scene.serial(),
        }))
    }

    /// When the light status was last fetched
    #[must_use]
    pub fn lights_updated(&self) -> Option<Instant> {
        self.state.lock().lights_updated
    }

    /// When the light state last changed, locally or on the gateway
    #[must_use]
    pub fn lights_changed(&self) -> Option<Instant> {
        self.state.lock().lights_changed
    }

    #[must_use]
    pub fn groups_updated(&self) -> Option<Instant> {
        self.state.lock().groups_updated
    }

    #[must_use]
    pub fn scenes_updated(&self) -> Option<Instant> {
        self.state.lock().scenes_updated
    }

    /// Force the next light refresh through, regardless of throttling
    pub fn mark_lights_outdated(&self) {
        self.state.lock().lights_outdated = true;
    }

    /// Record a local change and invalidate the status hash
    pub fn set_lights_changed(&self) {
        self.state.lock().set_lights_changed();
    }

    /// Group names keyed by gateway index
    #[allow(clippy::missing_errors_doc)]
    pub fn group_list(&self) -> Result<BTreeMap<u16, String>, GatewayError> {
        let mut state = self.state.lock();
        state.refresh_groups(None)?;
        Ok(state
            .groups
            .values()
            .map(|group| (group.index(), group.name().to_string()))
            .collect())
    }

    /// Ask the gateway for one group's name and member addresses
    #[allow(clippy::missing_errors_doc)]
    pub fn group_info(&self, index: u8) -> Result<GroupInfo, GatewayError> {
        let mut state = self.state.lock();
        let response = state
            .connection
            .request(Target::Index(index), CommandId::GroupInfo, Vec::new())?;
        Ok(GroupInfo::parse(&response.payload)?)
    }

    /// Query a single light's status; `None` if it's unreachable
    #[allow(clippy::missing_errors_doc)]
    pub fn update_light_status(&self, address: u64) -> Result<Option<LightState>, GatewayError> {
        let mut state = self.state.lock();
        let response =
            state
                .connection
                .request(Target::Light(address), CommandId::LightStatus, Vec::new())?;
        let status = LightState::parse(&response)?;
        tracing::debug!("Light {:016X}: {:?}", address, status);
        Ok(status)
    }

    fn control_light<F>(&self, address: u64, serial: u64, apply: F) -> Result<(), GatewayError>
    where
        F: FnOnce(&mut Light) -> Option<(CommandId, Vec<u8>)>,
    {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Some(light) = state
            .lights
            .get_mut(&address)
            .filter(|light| light.serial() == serial)
        else {
            tracing::debug!("Light {:016X} no longer exists", address);
            return Ok(());
        };

        let Some((command_id, payload)) = apply(light) else {
            return Ok(());
        };
        let Some(frame) = command_frame(&mut state.connection, &*light, command_id, payload)
        else {
            return Ok(());
        };

        state.set_lights_changed();
        state.connection.send(&frame)?;
        Ok(())
    }

    /// Send a group command, then apply the sent value to each member
    fn control_group<V, P, A>(
        &self,
        name: &str,
        serial: u64,
        prepare: P,
        apply: A,
    ) -> Result<(), GatewayError>
    where
        V: Copy,
        P: FnOnce(&Group) -> Option<(V, CommandId, Vec<u8>)>,
        A: Fn(&mut Light, V),
    {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Some(group) = state
            .groups
            .get(name)
            .filter(|group| group.serial() == serial)
        else {
            tracing::debug!("Group {:?} no longer exists", name);
            return Ok(());
        };

        let Some((value, command_id, payload)) = prepare(group) else {
            return Ok(());
        };
        let Some(frame) = command_frame(&mut state.connection, group, command_id, payload) else {
            return Ok(());
        };
        let members = group.lights().to_vec();

        state.set_lights_changed();
        state.connection.send(&frame)?;

        // The gateway fans the group command out itself
        for address in &members {
            if let Some(light) = state.lights.get_mut(address) {
                apply(light, value);
            }
        }
        Ok(())
    }
}

/// Live reference to a light, resolved by address on every call
///
/// Once the light disappears from the gateway the handle goes inert, even
/// if a light with the same address shows up again later.
#[derive(Clone, Copy)]
pub struct LightHandle<'a> {
    gateway: &'a Gateway,
    address: u64,
    serial: u64,
}

impl LightHandle<'_> {
    #[must_use]
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Current state, `None` once the light is gone
    #[must_use]
    pub fn snapshot(&self) -> Option<Light> {
        self.gateway
            .state
            .lock()
            .lights
            .get(&self.address)
            .filter(|light| light.serial() == self.serial)
            .cloned()
    }

    #[must_use]
    pub fn deleted(&self) -> bool {
        self.snapshot().is_none()
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn set_onoff(&self, on: bool) -> Result<(), GatewayError> {
        self.gateway.control_light(self.address, self.serial, |light| {
            let on = light.apply_onoff(on)?;
            Some((CommandId::OnOff, onoff_payload(on)))
        })
    }

    /// Set luminance (0-100) with a transition in tenths of a second
    #[allow(clippy::missing_errors_doc)]
    pub fn set_luminance(&self, lum: u8, transition: u16) -> Result<(), GatewayError> {
        self.gateway.control_light(self.address, self.serial, |light| {
            let lum = light.apply_luminance(lum)?;
            Some((CommandId::Luminance, luminance_payload(lum, transition)))
        })
    }

    /// Set colour temperature in kelvin
    #[allow(clippy::missing_errors_doc)]
    pub fn set_temperature(&self, temp: u16, transition: u16) -> Result<(), GatewayError> {
        self.gateway.control_light(self.address, self.serial, |light| {
            let temp = light.apply_temperature(temp)?;
            Some((CommandId::Temperature, temperature_payload(temp, transition)))
        })
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn set_rgb(&self, red: u8, green: u8, blue: u8, transition: u16) -> Result<(), GatewayError> {
        self.gateway.control_light(self.address, self.serial, |light| {
            let (red, green, blue) = light.apply_rgb(red, green, blue)?;
            Some((CommandId::Colour, colour_payload(red, green, blue, transition)))
        })
    }

    /// Query this light's status directly
    #[allow(clippy::missing_errors_doc)]
    pub fn update_status(&self) -> Result<Option<LightState>, GatewayError> {
        self.gateway.update_light_status(self.address)
    }
}

/// Live reference to a group, resolved by name on every call
#[derive(Clone)]
pub struct GroupHandle<'a> {
    gateway: &'a Gateway,
    name: String,
    serial: u64,
}

impl GroupHandle<'_> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn read<R>(&self, f: impl FnOnce(&Group, &BTreeMap<u64, Light>) -> R) -> Option<R> {
        let state = self.gateway.state.lock();
        let group = state
            .groups
            .get(&self.name)
            .filter(|group| group.serial() == self.serial)?;
        Some(f(group, &state.lights))
    }

    /// Current state, `None` once the group is gone
    #[must_use]
    pub fn snapshot(&self) -> Option<Group> {
        self.read(|group, _| group.clone())
    }

    #[must_use]
    pub fn deleted(&self) -> bool {
        self.snapshot().is_none()
    }

    /// Member lights, ordered by light list index
    #[must_use]
    pub fn lights(&self) -> Vec<Light> {
        self.read(|group, lights| group.members(lights).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn light_names(&self) -> Vec<String> {
        self.read(Group::light_names).unwrap_or_default()
    }

    #[must_use]
    pub fn scenes(&self) -> Vec<String> {
        self.read(|group, _| group.scenes().to_vec())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn features(&self) -> Features {
        self.read(|group, _| group.features()).unwrap_or_default()
    }

    #[must_use]
    pub fn on(&self) -> bool {
        self.read(Group::on).unwrap_or_default()
    }

    #[must_use]
    pub fn reachable(&self) -> bool {
        self.read(Group::reachable).unwrap_or_default()
    }

    #[must_use]
    pub fn lum(&self) -> u8 {
        self.read(Group::lum).unwrap_or_default()
    }

    #[must_use]
    pub fn temp(&self) -> u16 {
        self.read(Group::temp).unwrap_or_default()
    }

    #[must_use]
    pub fn red(&self) -> u8 {
        self.read(Group::red).unwrap_or_default()
    }

    #[must_use]
    pub fn green(&self) -> u8 {
        self.read(Group::green).unwrap_or_default()
    }

    #[must_use]
    pub fn blue(&self) -> u8 {
        self.read(Group::blue).unwrap_or_default()
    }

    #[must_use]
    pub fn rgb(&self) -> (u8, u8, u8) {
        self.read(Group::rgb).unwrap_or_default()
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn set_onoff(&self, on: bool) -> Result<(), GatewayError> {
        self.gateway.control_group(
            &self.name,
            self.serial,
            |group| {
                group
                    .accepts(Features::ON)
                    .then(|| (on, CommandId::OnOff, onoff_payload(on)))
            },
            |light, on| {
                light.apply_onoff(on);
            },
        )
    }

    /// Set luminance, clamped to the scale; zero switches the lights off
    #[allow(clippy::missing_errors_doc)]
    pub fn set_luminance(&self, lum: u8, transition: u16) -> Result<(), GatewayError> {
        self.gateway.control_group(
            &self.name,
            self.serial,
            |group| {
                let lum = group.prepare_luminance(lum)?;
                Some((lum, CommandId::Luminance, luminance_payload(lum, transition)))
            },
            |light, lum| {
                light.apply_luminance(lum);
            },
        )
    }

    /// Set colour temperature, clamped to the members' combined range
    #[allow(clippy::missing_errors_doc)]
    pub fn set_temperature(&self, temp: u16, transition: u16) -> Result<(), GatewayError> {
        self.gateway.control_group(
            &self.name,
            self.serial,
            |group| {
                let temp = group.prepare_temperature(temp)?;
                Some((temp, CommandId::Temperature, temperature_payload(temp, transition)))
            },
            |light, temp| {
                light.apply_temperature(temp);
            },
        )
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn set_rgb(&self, red: u8, green: u8, blue: u8, transition: u16) -> Result<(), GatewayError> {
        self.gateway.control_group(
            &self.name,
            self.serial,
            |group| {
                group.accepts(Features::RGB).then(|| {
                    (
                        (red, green, blue),
                        CommandId::Colour,
                        colour_payload(red, green, blue, transition),
                    )
                })
            },
            |light, (red, green, blue)| {
                light.apply_rgb(red, green, blue);
            },
        )
    }

    /// Activate one of this group's scenes by name
    #[allow(clippy::missing_errors_doc)]
    pub fn activate_scene(&self, scene: &str) -> Result<(), GatewayError> {
        let mut state = self.gateway.state.lock();
        let owned = state
            .groups
            .get(&self.name)
            .filter(|group| group.serial() == self.serial)
            .is_some_and(|group| group.scenes().iter().any(|s| s == scene));
        if !owned {
            tracing::debug!("Group {:?} has no scene {:?}", self.name, scene);
            return Ok(());
        }
        state.activate_scene(scene, None)
    }
}

/// Live reference to a scene, resolved by name on every call
#[derive(Clone)]
pub struct SceneHandle<'a> {
    gateway: &'a Gateway,
    name: String,
    serial: u64,
}

impl SceneHandle<'_> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, `None` once the scene is gone
    #[must_use]
    pub fn snapshot(&self) -> Option<Scene> {
        self.gateway
            .state
            .lock()
            .scenes
            .get(&self.name)
            .filter(|scene| scene.serial() == self.serial)
            .cloned()
    }

    #[must_use]
    pub fn deleted(&self) -> bool {
        self.snapshot().is_none()
    }

    /// Activate the scene; the next light refresh bypasses throttling
    #[allow(clippy::missing_errors_doc)]
    pub fn activate(&self) -> Result<(), GatewayError> {
        self.gateway
            .state
            .lock()
            .activate_scene(&self.name, Some(self.serial))
    }
}
