//! Gateway client against a scripted in-process gateway

use lightify_core::{DeviceSubType, Features, Gateway, GatewayConfig};
use lightify_protocol::{CommandId, FrameHeader, Response};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const LAMP: u64 = 0x0017_8801_0000_0001;
const STRIP: u64 = 0x0017_8801_0000_0002;
const PLUG: u64 = 0x0017_8801_0000_0003;

fn name_field(name: &str) -> [u8; 16] {
    let mut field = [0u8; 16];
    field[..name.len()].copy_from_slice(name.as_bytes());
    field
}

#[derive(Clone, Copy)]
struct LightSpec {
    index: u16,
    address: u64,
    type_id: u8,
    group_mask: u16,
    on: bool,
    lum: u8,
    temp: u16,
    rgb: (u8, u8, u8),
    name: &'static str,
}

impl LightSpec {
    fn new(index: u16, address: u64, type_id: u8, name: &'static str) -> Self {
        Self {
            index,
            address,
            type_id,
            group_mask: 0x8000,
            on: true,
            lum: 50,
            temp: 3000,
            rgb: (255, 255, 255),
            name,
        }
    }

    fn record(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&self.index.to_le_bytes());
        data.extend_from_slice(&self.address.to_le_bytes());
        data.push(self.type_id);
        data.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        data.push(1);
        data.extend_from_slice(&self.group_mask.to_le_bytes());
        data.push(u8::from(self.on));
        data.push(self.lum);
        data.extend_from_slice(&self.temp.to_le_bytes());
        data.extend_from_slice(&[self.rgb.0, self.rgb.1, self.rgb.2, 0xFF]);
        data.extend_from_slice(&name_field(self.name));
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&[0; 4]);
        data
    }
}

fn list(records: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = (records.len() as u16).to_le_bytes().to_vec();
    for record in records {
        payload.extend_from_slice(record);
    }
    payload
}

fn lights_payload(lights: &[LightSpec]) -> Vec<u8> {
    list(&lights.iter().map(LightSpec::record).collect::<Vec<_>>())
}

fn group_record(index: u16, name: &str) -> Vec<u8> {
    let mut data = index.to_le_bytes().to_vec();
    data.extend_from_slice(&name_field(name));
    data
}

fn scene_record(index: u8, name: &str, mask: u16) -> Vec<u8> {
    let mut data = vec![index, 0];
    data.extend_from_slice(&name_field(name));
    data.extend_from_slice(&mask.to_le_bytes());
    data
}

/// A request as seen by the fake gateway
#[derive(Debug, Clone)]
struct Seen {
    flag: u8,
    command_id: u8,
    /// Address field and payload
    body: Vec<u8>,
}

/// List payloads the fake gateway currently serves
#[derive(Default)]
struct Script {
    lights: Vec<u8>,
    groups: Vec<u8>,
    scenes: Vec<u8>,
}

struct FakeGateway {
    port: u16,
    script: Arc<Mutex<Script>>,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl FakeGateway {
    fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let script = Arc::new(Mutex::new(script));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let (thread_script, thread_seen) = (Arc::clone(&script), Arc::clone(&seen));
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            while let Some(request) = read_request(&mut stream) {
                let (header, body) = FrameHeader::parse(&request).unwrap();
                thread_seen.lock().unwrap().push(Seen {
                    flag: header.flag,
                    command_id: header.command_id,
                    body: body.to_vec(),
                });

                let command_id = CommandId::from_u8(header.command_id).unwrap();
                let payload = {
                    let script = thread_script.lock().unwrap();
                    match command_id {
                        CommandId::AllLightStatus => script.lights.clone(),
                        CommandId::GroupList => script.groups.clone(),
                        CommandId::SceneList => script.scenes.clone(),
                        // 18 bytes after the length prefix: light unreachable
                        CommandId::LightStatus => vec![0; 11],
                        _ => vec![0, 0],
                    }
                };
                let response = Response {
                    flag: header.flag,
                    command_id,
                    request_id: [0, 0, 0, header.sequence],
                    status: 0,
                    payload,
                };
                if stream.write_all(&response.serialize()).is_err() {
                    break;
                }
            }
        });

        Self { port, script, seen }
    }

    fn connect(&self) -> Gateway {
        let config = GatewayConfig::new("127.0.0.1")
            .with_port(self.port)
            .with_timeout(Duration::from_secs(2));
        Gateway::connect(config).unwrap()
    }

    fn set_lights(&self, lights: &[LightSpec]) {
        self.script.lock().unwrap().lights = lights_payload(lights);
    }

    fn count(&self, command_id: CommandId) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|seen| seen.command_id == command_id as u8)
            .count()
    }

    fn last(&self, command_id: CommandId) -> Seen {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|seen| seen.command_id == command_id as u8)
            .cloned()
            .unwrap()
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut prefix = [0u8; 2];
    stream.read_exact(&mut prefix).ok()?;
    let mut rest = vec![0u8; u16::from_le_bytes(prefix) as usize];
    stream.read_exact(&mut rest).ok()?;
    Some([prefix.to_vec(), rest].concat())
}

fn living_room() -> Script {
    let mut lamp = LightSpec::new(0, LAMP, 128, "Lamp");
    lamp.temp = 2500;
    let mut strip = LightSpec::new(1, STRIP, 10, "Strip");
    strip.rgb = (10, 20, 30);
    let mut plug = LightSpec::new(2, PLUG, 16, "Plug");
    plug.group_mask = 0x4000;

    Script {
        lights: lights_payload(&[lamp, strip, plug]),
        groups: list(&[group_record(1, "Living"), group_record(2, "Hall")]),
        scenes: list(&[scene_record(3, "Relax", 0x8000)]),
    }
}

#[test]
fn test_lightstrip_status() {
    let mut strip = LightSpec::new(0, STRIP, 10, "Lightstrip");
    strip.lum = 80;
    strip.temp = 4000;
    strip.rgb = (10, 20, 30);
    let gateway_script = Script {
        lights: lights_payload(&[strip]),
        ..Script::default()
    };
    let fake = FakeGateway::start(gateway_script);
    let gateway = fake.connect();

    let lights = gateway.lights().unwrap();
    let light = &lights[&STRIP];
    assert!(light.on());
    assert_eq!(light.lum(), 80);
    assert_eq!(light.temp(), 4000);
    assert_eq!(light.rgb(), (10, 20, 30));
    assert_eq!(light.groups(), &[1]);
    assert_eq!(light.name(), "Lightstrip");
    assert_eq!(light.last_seen(), 5);
    assert_eq!(light.version(), "01020304");

    let request = fake.last(CommandId::AllLightStatus);
    assert_eq!(request.flag, 0x02);
    assert_eq!(request.body, vec![0x01]);
}

#[test]
fn test_light_diff_tombstones_removed_lights() {
    let a = LightSpec::new(0, LAMP, 2, "A");
    let b = LightSpec::new(1, STRIP, 2, "B");
    let c = LightSpec::new(2, PLUG, 16, "C");

    let fake = FakeGateway::start(Script {
        lights: lights_payload(&[a, b]),
        ..Script::default()
    });
    let gateway = fake.connect();

    let first = gateway.update_all_light_status(None).unwrap();
    assert_eq!(first.added.len(), 2);
    assert!(first.removed.is_empty());

    let handle_a = gateway.light(LAMP).unwrap().unwrap();
    let handle_b = gateway.light(STRIP).unwrap().unwrap();
    let serial_b = handle_b.snapshot().unwrap().serial();

    fake.set_lights(&[b, c]);
    let second = gateway.update_all_light_status(None).unwrap();
    assert_eq!(
        second.added.iter().map(|l| l.address()).collect::<Vec<_>>(),
        vec![PLUG]
    );
    assert_eq!(second.removed.len(), 1);
    assert_eq!(second.removed[0].address(), LAMP);
    assert!(second.removed[0].deleted());

    assert!(handle_a.deleted());
    assert_eq!(handle_b.snapshot().unwrap().serial(), serial_b);
    assert_eq!(
        gateway.lights().unwrap().keys().copied().collect::<Vec<_>>(),
        vec![STRIP, PLUG]
    );

    // A light that comes back is a new object
    fake.set_lights(&[a, b, c]);
    let third = gateway.update_all_light_status(None).unwrap();
    assert_eq!(third.added.len(), 1);
    assert!(handle_a.deleted());
    handle_a.set_onoff(false).unwrap();
    assert!(gateway.lights().unwrap()[&LAMP].on());
}

#[test]
fn test_unchanged_status_skips_reparse() {
    let fake = FakeGateway::start(Script {
        lights: lights_payload(&[LightSpec::new(0, LAMP, 2, "Lamp")]),
        ..Script::default()
    });
    let gateway = fake.connect();

    gateway.update_all_light_status(None).unwrap();
    let changed = gateway.lights_changed();
    assert_eq!(changed, gateway.lights_updated());

    thread::sleep(Duration::from_millis(5));
    let second = gateway.update_all_light_status(None).unwrap();
    assert!(second.is_empty());
    assert_eq!(fake.count(CommandId::AllLightStatus), 2);
    assert_eq!(gateway.lights_changed(), changed);
    assert!(gateway.lights_updated() > changed);

    // A local change invalidates the hash, so the same payload is parsed again
    let lamp = gateway.light(LAMP).unwrap().unwrap();
    lamp.set_luminance(20, 0).unwrap();
    assert_eq!(lamp.snapshot().unwrap().lum(), 20);

    gateway.update_all_light_status(None).unwrap();
    assert_eq!(lamp.snapshot().unwrap().lum(), 50);
    assert_eq!(gateway.lights_changed(), gateway.lights_updated());
}

#[test]
fn test_throttle_and_outdated_hint() {
    let fake = FakeGateway::start(living_room());
    let gateway = fake.connect();
    let throttle = Some(Duration::from_secs(60));

    gateway.update_all_light_status(throttle).unwrap();
    gateway.update_all_light_status(throttle).unwrap();
    assert_eq!(fake.count(CommandId::AllLightStatus), 1);

    gateway.scene("Relax").unwrap().unwrap().activate().unwrap();
    gateway.update_all_light_status(throttle).unwrap();
    assert_eq!(fake.count(CommandId::AllLightStatus), 2);

    gateway.update_group_list(throttle).unwrap();
    gateway.update_group_list(throttle).unwrap();
    assert_eq!(fake.count(CommandId::GroupList), 1);
}

#[test]
fn test_lazy_loading_order() {
    let fake = FakeGateway::start(living_room());
    let gateway = fake.connect();

    let groups = gateway.groups().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(fake.count(CommandId::AllLightStatus), 1);
    assert_eq!(fake.count(CommandId::SceneList), 1);
    assert_eq!(fake.count(CommandId::GroupList), 1);

    // Loaded once; later accessors use the mirror
    gateway.lights().unwrap();
    gateway.scenes().unwrap();
    gateway.groups().unwrap();
    assert_eq!(fake.seen.lock().unwrap().len(), 3);
}

#[test]
fn test_group_membership_and_aggregates() {
    let fake = FakeGateway::start(living_room());
    let gateway = fake.connect();

    let living = gateway.group("Living").unwrap().unwrap();
    assert_eq!(living.light_names(), vec!["Lamp", "Strip"]);
    assert_eq!(living.scenes(), vec!["Relax"]);
    assert_eq!(living.features(), Features::all());
    assert!(living.on());
    assert!(living.reachable());
    assert_eq!(living.rgb(), (10, 20, 30));

    let group = living.snapshot().unwrap();
    assert_eq!(group.lights(), &[LAMP, STRIP]);
    assert_eq!(group.min_temp(), 1900);
    assert_eq!(group.max_temp(), 6500);

    let hall = gateway.group("Hall").unwrap().unwrap();
    assert_eq!(hall.features(), Features::ON);
    assert!(hall.scenes().is_empty());
}

#[test]
fn test_group_setters_propagate_without_per_light_commands() {
    let fake = FakeGateway::start(living_room());
    let gateway = fake.connect();
    let living = gateway.group("Living").unwrap().unwrap();
    let before = fake.seen.lock().unwrap().len();

    living.set_temperature(6000, 5).unwrap();
    let request = fake.last(CommandId::Temperature);
    assert_eq!(request.flag, 0x02);
    assert_eq!(&request.body[..8], &[1, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(&request.body[8..], &[0x70, 0x17, 0x05, 0x00]);

    // Each light clamps to its own range
    let lights = gateway.lights().unwrap();
    assert_eq!(lights[&LAMP].temp(), 4000);
    assert_eq!(lights[&STRIP].temp(), 6000);

    living.set_luminance(150, 0).unwrap();
    assert_eq!(&fake.last(CommandId::Luminance).body[8..], &[100, 0, 0]);
    assert_eq!(living.lum(), 100);

    living.set_luminance(0, 0).unwrap();
    assert!(!living.on());

    // One command per setter, nothing per member
    assert_eq!(fake.seen.lock().unwrap().len(), before + 3);
}

#[test]
fn test_group_without_feature_sends_nothing() {
    let fake = FakeGateway::start(living_room());
    let gateway = fake.connect();
    let hall = gateway.group("Hall").unwrap().unwrap();

    hall.set_rgb(1, 2, 3, 0).unwrap();
    assert_eq!(fake.count(CommandId::Colour), 0);

    hall.set_onoff(false).unwrap();
    assert_eq!(fake.count(CommandId::OnOff), 1);
    assert!(!gateway.lights().unwrap()[&PLUG].on());
}

#[test]
fn test_light_setters() {
    let fake = FakeGateway::start(living_room());
    let gateway = fake.connect();

    let strip = gateway.light_by_name("Strip").unwrap().unwrap();
    strip.set_rgb(1, 2, 3, 10).unwrap();
    let request = fake.last(CommandId::Colour);
    assert_eq!(request.flag, 0x00);
    assert_eq!(&request.body[..8], &STRIP.to_le_bytes());
    assert_eq!(&request.body[8..], &[1, 2, 3, 0xFF, 10, 0]);

    let lamp = gateway.light(LAMP).unwrap().unwrap();
    lamp.set_temperature(6500, 0).unwrap();
    assert_eq!(&fake.last(CommandId::Temperature).body[8..10], &4000u16.to_le_bytes());

    // The plug has no luminance
    let plug = gateway.light(PLUG).unwrap().unwrap();
    plug.set_luminance(10, 0).unwrap();
    assert_eq!(fake.count(CommandId::Luminance), 0);
    assert_eq!(plug.snapshot().unwrap().lum(), 100);
}

#[test]
fn test_scene_activation() {
    let fake = FakeGateway::start(living_room());
    let gateway = fake.connect();

    let scenes = gateway.scenes().unwrap();
    assert_eq!(scenes["Relax"].group(), 1);

    gateway
        .group("Living")
        .unwrap()
        .unwrap()
        .activate_scene("Relax")
        .unwrap();
    let request = fake.last(CommandId::ActivateScene);
    assert_eq!(request.flag, 0x02);
    assert_eq!(request.body, vec![3, 0, 0, 0, 0, 0, 0, 0]);

    // Not one of the Hall's scenes
    gateway
        .group("Hall")
        .unwrap()
        .unwrap()
        .activate_scene("Relax")
        .unwrap();
    assert_eq!(fake.count(CommandId::ActivateScene), 1);
}

#[test]
fn test_scene_tombstoned_on_group_change() {
    let fake = FakeGateway::start(living_room());
    let gateway = fake.connect();
    let relax = gateway.scene("Relax").unwrap().unwrap();

    fake.script.lock().unwrap().scenes = list(&[scene_record(3, "Relax", 0x4000)]);
    let changes = gateway.update_scene_list(None).unwrap();
    assert_eq!(changes.added.len(), 1);
    assert_eq!(changes.removed.len(), 1);
    assert!(changes.removed[0].deleted());

    assert!(relax.deleted());
    relax.activate().unwrap();
    assert_eq!(fake.count(CommandId::ActivateScene), 0);
}

#[test]
fn test_renamed_group_is_replaced() {
    let fake = FakeGateway::start(living_room());
    let gateway = fake.connect();
    let hall = gateway.group("Hall").unwrap().unwrap();

    fake.script.lock().unwrap().groups =
        list(&[group_record(1, "Living"), group_record(2, "Corridor")]);
    let changes = gateway.update_group_list(None).unwrap();
    assert_eq!(changes.added[0].name(), "Corridor");
    assert_eq!(changes.added[0].lights(), &[PLUG]);
    assert_eq!(changes.removed[0].name(), "Hall");
    assert!(hall.deleted());
    assert_eq!(
        gateway.group_list().unwrap().into_iter().collect::<Vec<_>>(),
        vec![(1, "Living".to_string()), (2, "Corridor".to_string())]
    );
}

#[test]
fn test_reindexed_group_is_replaced() {
    let fake = FakeGateway::start(living_room());
    let gateway = fake.connect();
    let hall = gateway.group("Hall").unwrap().unwrap();
    let old_serial = hall.snapshot().unwrap().serial();

    // Same name, different index
    fake.script.lock().unwrap().groups =
        list(&[group_record(1, "Living"), group_record(5, "Hall")]);
    let changes = gateway.update_group_list(None).unwrap();

    assert_eq!(changes.removed.len(), 1);
    assert_eq!(changes.removed[0].name(), "Hall");
    assert_eq!(changes.removed[0].index(), 2);
    assert!(changes.removed[0].deleted());
    assert_eq!(changes.added.len(), 1);
    assert_eq!(changes.added[0].index(), 5);
    assert_ne!(changes.added[0].serial(), old_serial);
    assert!(hall.deleted());

    let fresh = gateway.group("Hall").unwrap().unwrap();
    assert!(!fresh.deleted());
    assert_eq!(fresh.snapshot().unwrap().index(), 5);
}

#[test]
fn test_concurrent_callers_are_serialized() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 20;

    let fake = FakeGateway::start(living_room());
    let gateway = fake.connect();
    let lamp = gateway.light(LAMP).unwrap().unwrap();

    thread::scope(|scope| {
        for worker in 0..THREADS {
            let gateway = &gateway;
            scope.spawn(move || {
                for round in 0..ROUNDS {
                    let lum = u8::try_from(1 + (worker * ROUNDS + round) % 100).unwrap();
                    lamp.set_luminance(lum, 0).unwrap();
                    gateway.update_all_light_status(None).unwrap();
                }
            });
        }
    });

    // Every frame got exactly one well-formed answer
    assert_eq!(fake.count(CommandId::Luminance), THREADS * ROUNDS);
    // One initial load plus one per round
    assert_eq!(fake.count(CommandId::AllLightStatus), 1 + THREADS * ROUNDS);
    assert_eq!(fake.seen.lock().unwrap().len(), 1 + 2 * THREADS * ROUNDS);
    // The last refresh wins over the local setter
    assert_eq!(lamp.snapshot().unwrap().lum(), 50);
}

#[test]
fn test_lights_outdated_and_changed_hints() {
    let fake = FakeGateway::start(Script {
        lights: lights_payload(&[LightSpec::new(0, LAMP, 2, "Lamp")]),
        ..Script::default()
    });
    let gateway = fake.connect();
    let throttle = Some(Duration::from_secs(60));

    gateway.update_all_light_status(throttle).unwrap();
    gateway.update_all_light_status(throttle).unwrap();
    assert_eq!(fake.count(CommandId::AllLightStatus), 1);

    gateway.mark_lights_outdated();
    gateway.update_all_light_status(throttle).unwrap();
    assert_eq!(fake.count(CommandId::AllLightStatus), 2);

    // Unchanged payload: the hash short-circuits and nothing is touched
    let updated = gateway.lights_changed();
    thread::sleep(Duration::from_millis(5));
    gateway.update_all_light_status(None).unwrap();
    assert_eq!(gateway.lights_changed(), updated);

    // A local change drops the hash, so the same payload is applied again
    thread::sleep(Duration::from_millis(5));
    gateway.set_lights_changed();
    let local = gateway.lights_changed();
    assert!(local > updated);
    thread::sleep(Duration::from_millis(5));
    gateway.update_all_light_status(None).unwrap();
    assert!(gateway.lights_changed() > local);
}

#[test]
fn test_malformed_status_keeps_previous_state() {
    let fake = FakeGateway::start(living_room());
    let gateway = fake.connect();
    let before = gateway.lights().unwrap();

    // Claims three records, carries one
    let mut payload = 3u16.to_le_bytes().to_vec();
    payload.extend_from_slice(&LightSpec::new(0, LAMP, 2, "Lamp").record());
    fake.script.lock().unwrap().lights = payload;

    let changes = gateway.update_all_light_status(None).unwrap();
    assert!(changes.is_empty());
    assert_eq!(gateway.lights().unwrap(), before);
}

#[test]
fn test_unknown_device_type_is_guessed() {
    let mut odd = LightSpec::new(0, LAMP, 200, "Odd");
    odd.rgb = (1, 0, 0);
    let fake = FakeGateway::start(Script {
        lights: lights_payload(&[odd]),
        ..Script::default()
    });
    let gateway = fake.connect();

    let lights = gateway.lights().unwrap();
    let light = &lights[&LAMP];
    assert_eq!(light.type_id(), 200);
    assert_eq!(light.assumed_type_id(), 2);
    assert_eq!(light.device_subtype(), DeviceSubType::LightTunableWhite);
    assert_eq!(light.type_name(), "unknown device");
}

#[test]
fn test_single_light_status_unreachable() {
    let fake = FakeGateway::start(living_room());
    let gateway = fake.connect();

    assert_eq!(gateway.update_light_status(LAMP).unwrap(), None);
    let request = fake.last(CommandId::LightStatus);
    assert_eq!(request.flag, 0x00);
    assert_eq!(request.body, LAMP.to_le_bytes().to_vec());
}
