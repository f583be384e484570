//! Device type overrides loaded from JSON

use crate::device::DeviceTypeInfo;
use crate::error::GatewayError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Load device type overrides keyed by raw type id
///
/// A missing file yields an empty table; a file that exists but can't be
/// read or parsed is an error.
#[allow(clippy::missing_errors_doc)]
pub fn load_device_types(path: &Path) -> Result<HashMap<u8, DeviceTypeInfo>, GatewayError> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let types: HashMap<u8, DeviceTypeInfo> = serde_json::from_str(&contents)
                .inspect_err(|e| {
                    tracing::warn!("Failed to parse device types file {:?}: {}", path, e);
                })?;
            tracing::info!("Loaded {} device types from {:?}", types.len(), path);
            Ok(types)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No device types file found at {:?}, using built-in table", path);
            Ok(HashMap::new())
        }
        Err(e) => {
            tracing::warn!("Failed to read device types file {:?}: {}", path, e);
            Err(e.into())
        }
    }
}
