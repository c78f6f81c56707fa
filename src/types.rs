use serde::{Deserialize, Serialize};

/// Device identifier as reported by the controller
pub type DeviceId = u32;

/// Output intensity on the controller's `0..=LEVEL_SCALE` scale
///
/// `0` is off, anything above is on.
pub type Level = i32;

/// Full-scale level understood by the controller
pub const LEVEL_SCALE: Level = 100;

/// Clamp an arbitrary level into `0..=LEVEL_SCALE`
pub fn clamp_level(level: Level) -> Level {
    level.clamp(0, LEVEL_SCALE)
}

/// A device reported by the controller
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
}

impl Device {
    /// Name used when the controller cannot tell us one
    pub fn fallback_name(id: DeviceId) -> String {
        format!("Device_{}", id)
    }
}

/// Ordering of the list returned by discovery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiscoveryOrder {
    /// Keep the order the controller listed the ids in
    #[default]
    Reported,
    /// Sort by device id
    Ascending,
}

/// Observable state of the controller session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No socket open
    Disconnected,
    /// Socket open, login not (yet) accepted
    Connected,
    /// Login accepted, commands may be sent
    Authenticated,
}
