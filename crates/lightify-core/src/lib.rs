//! Lightify gateway client
//!
//! This crate keeps a local mirror of the lights, groups and scenes known
//! to a Lightify gateway on top of the low-level `lightify-protocol` crate.

pub mod device;
pub mod device_types;
pub mod error;
pub mod gateway;
pub mod group;
pub mod light;
pub mod luminary;
pub mod scene;

pub use device::{Capability, DeviceSubType, DeviceType, DeviceTypeInfo, DeviceTypes, Features};
pub use error::GatewayError;
pub use gateway::{Changes, Gateway, GatewayConfig, GroupHandle, LightHandle, SceneHandle};
pub use group::Group;
pub use light::Light;
pub use lightify_protocol::{DEFAULT_TIMEOUT, GATEWAY_PORT};
pub use luminary::{Bounds, Luminary};
pub use scene::Scene;
