//! Command line client for a Lightify gateway

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lightify_core::device_types::load_device_types;
use lightify_core::{Gateway, GatewayConfig, GroupHandle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "lightify")]
#[command(about = "Control lights, groups and scenes on a Lightify gateway")]
struct Args {
    /// Gateway host name or IP address
    #[arg(long, env = "LIGHTIFY_HOST")]
    host: String,

    /// Gateway TCP port
    #[arg(long, default_value_t = lightify_core::GATEWAY_PORT)]
    port: u16,

    /// Socket timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,

    /// JSON file with device type overrides
    #[arg(long, env = "LIGHTIFY_DEVICE_TYPES")]
    device_types: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List lights, groups and scenes
    List,
    /// Switch a group on
    On { group: String },
    /// Switch a group off
    Off { group: String },
    /// Set a group's luminance (0-100)
    Lum {
        group: String,
        lum: u8,
        /// Transition time in tenths of a second
        #[arg(long, default_value = "0")]
        transition: u16,
    },
    /// Set a group's colour temperature in kelvin
    Temp {
        group: String,
        kelvin: u16,
        #[arg(long, default_value = "0")]
        transition: u16,
    },
    /// Activate a scene
    Scene { name: String },
}

fn list(gateway: &Gateway) -> Result<()> {
    for light in gateway.lights()?.values() {
        println!(
            "light {:016X} {:<16} {:<22} on={} lum={} temp={} rgb={:?} reachable={} groups={:?}",
            light.address(),
            light.name(),
            light.type_name(),
            light.on(),
            light.lum(),
            light.temp(),
            light.rgb(),
            light.reachable(),
            light.groups(),
        );
    }

    for (name, group) in gateway.groups()? {
        println!(
            "group {:>2} {:<16} lights={} scenes={:?}",
            group.index(),
            name,
            group.lights().len(),
            group.scenes(),
        );
    }

    for (name, scene) in gateway.scenes()? {
        println!("scene {:>2} {:<16} group={}", scene.index(), name, scene.group());
    }
    Ok(())
}

fn group<'a>(gateway: &'a Gateway, name: &str) -> Result<GroupHandle<'a>> {
    gateway
        .group(name)?
        .with_context(|| format!("No group named {name:?}"))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lightify_core=info,lightify_protocol=info,warn".into()),
        )
        .init();

    let args = Args::parse();

    let device_types = match &args.device_types {
        Some(path) => load_device_types(path)
            .with_context(|| format!("Failed to load device types from {}", path.display()))?,
        None => Default::default(),
    };

    let config = GatewayConfig::new(&args.host)
        .with_port(args.port)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_device_types(device_types);
    let gateway = Gateway::connect(config)
        .with_context(|| format!("Failed to connect to {}", args.host))?;

    match args.command {
        Command::List => list(&gateway)?,
        Command::On { group: name } => group(&gateway, &name)?.set_onoff(true)?,
        Command::Off { group: name } => group(&gateway, &name)?.set_onoff(false)?,
        Command::Lum {
            group: name,
            lum,
            transition,
        } => group(&gateway, &name)?.set_luminance(lum, transition)?,
        Command::Temp {
            group: name,
            kelvin,
            transition,
        } => group(&gateway, &name)?.set_temperature(kelvin, transition)?,
        Command::Scene { name } => gateway
            .scene(&name)?
            .with_context(|| format!("No scene named {name:?}"))?
            .activate()?,
    }

    Ok(())
}
