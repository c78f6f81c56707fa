//! Helpers for host integrations built on [`ZenseClient`](crate::ZenseClient)
//!
//! Brightness mapping between the controller's 0–100 levels and the usual
//! 0–255 UI scale, light/switch classification, and poll interval bounds.

use crate::error::{Result, ZenseError};
use crate::types::{clamp_level, Device, DeviceId, Level, LEVEL_SCALE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Full scale of UI brightness
pub const BRIGHTNESS_MAX: u8 = 255;

/// Default poll interval in minutes
pub const DEFAULT_POLL_MINUTES: u64 = 10;

const MIN_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Name fragments that suggest a plain on/off device
pub const SWITCH_NAME_KEYWORDS: &[&str] = &["stik", "kontakt", "ventilation", "fan", "pump", "pumpe"];

/// How a device is presented to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Light,
    Switch,
}

/// Controller level to UI brightness
pub fn level_to_brightness(level: Level) -> u8 {
    let level = clamp_level(level) as f64;
    (level / LEVEL_SCALE as f64 * BRIGHTNESS_MAX as f64).round() as u8
}

/// UI brightness to controller level
pub fn brightness_to_level(brightness: u8) -> Level {
    (brightness as f64 / BRIGHTNESS_MAX as f64 * LEVEL_SCALE as f64).round() as Level
}

/// Level to send when turning a light on
///
/// No brightness means full. Never 0, so "on" cannot turn a light off.
pub fn turn_on_level(brightness: Option<u8>) -> Level {
    brightness_to_level(brightness.unwrap_or(BRIGHTNESS_MAX)).clamp(1, LEVEL_SCALE)
}

/// Guess light vs switch from the device name
pub fn guess_entity_kind(name: &str) -> EntityKind {
    let name = name.trim().to_lowercase();
    if SWITCH_NAME_KEYWORDS.iter().any(|kw| name.contains(kw)) {
        EntityKind::Switch
    } else {
        EntityKind::Light
    }
}

/// Parse user overrides such as `{"12": "switch", "14": "Light"}`
///
/// An empty string means no overrides. Keys must be device ids and values
/// `light` or `switch` (any case).
pub fn parse_entity_map(json: &str) -> Result<BTreeMap<DeviceId, EntityKind>> {
    let json = json.trim();
    if json.is_empty() {
        return Ok(BTreeMap::new());
    }

    let raw: BTreeMap<String, String> = serde_json::from_str(json)?;
    raw.into_iter()
        .map(|(key, value)| {
            let id = key
                .trim()
                .parse::<DeviceId>()
                .map_err(|_| ZenseError::InvalidEntityMap(format!("bad device id '{}'", key)))?;
            let kind = parse_kind(&value).ok_or_else(|| {
                ZenseError::InvalidEntityMap(format!("unknown type '{}' for device {}", value, id))
            })?;
            Ok((id, kind))
        })
        .collect()
}

/// Like [`parse_entity_map`], but for options that were already saved
///
/// Entries with a bad id or an unknown type are skipped, and input that is
/// not a JSON object yields no overrides at all.
pub fn parse_entity_map_lenient(json: &str) -> BTreeMap<DeviceId, EntityKind> {
    let Ok(Value::Object(raw)) = serde_json::from_str::<Value>(json.trim()) else {
        return BTreeMap::new();
    };
    raw.iter()
        .filter_map(|(key, value)| {
            let id = key.trim().parse::<DeviceId>().ok()?;
            let kind = parse_kind(value.as_str()?)?;
            Some((id, kind))
        })
        .collect()
}

fn parse_kind(value: &str) -> Option<EntityKind> {
    match value.trim().to_lowercase().as_str() {
        "light" => Some(EntityKind::Light),
        "switch" => Some(EntityKind::Switch),
        _ => None,
    }
}

/// Kind for `device`: explicit override first, then the name heuristic
pub fn entity_kind(device: &Device, overrides: &BTreeMap<DeviceId, EntityKind>) -> EntityKind {
    overrides
        .get(&device.id)
        .copied()
        .unwrap_or_else(|| guess_entity_kind(&device.name))
}

/// Poll interval for a minutes setting, never below 30 seconds
pub fn poll_interval(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60)).max(MIN_POLL_INTERVAL)
}
