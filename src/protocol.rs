//! Wire framing for the ZenseHome control protocol
//!
//! Every message in either direction is ASCII text wrapped as `>>body<<`.
//! Parsing is deliberately lenient: a response missing its marker degrades
//! to an empty or fallback value instead of an error.

use crate::types::{clamp_level, Device, DeviceId, Level, LEVEL_SCALE};
use std::fmt;

/// Frame prefix
pub const FRAME_START: &str = ">>";

/// Frame terminator
pub const FRAME_END: &str = "<<";

const LOGIN_OK: &str = "Login Ok";
const TIMEOUT_TOKEN: &str = "Timeout";

const DEVICES_MARKER: &str = ">>Get Devices ";
const NAME_MARKER: &str = ">>Get Name ";
const LEVEL_MARKER: &str = ">>Get ";

/// Commands understood by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(u32),
    Logout,
    GetDevices,
    GetName(DeviceId),
    GetLevel(DeviceId),
    Set(DeviceId, Level),
    /// Fade to a level; [`Command::fade`] clamps on construction and the
    /// encoder clamps again, so out-of-range levels never reach the wire
    Fade(DeviceId, Level),
}

impl Command {
    /// Switch a device fully on
    pub fn on(id: DeviceId) -> Self {
        Command::Set(id, LEVEL_SCALE)
    }

    /// Switch a device off
    pub fn off(id: DeviceId) -> Self {
        Command::Set(id, 0)
    }

    /// Fade to `level`, clamped into `0..=LEVEL_SCALE`
    pub fn fade(id: DeviceId, level: Level) -> Self {
        Command::Fade(id, clamp_level(level))
    }

    /// Encode into a complete `>>...<<` frame
    pub fn encode(&self) -> String {
        format!("{}{}{}", FRAME_START, self, FRAME_END)
    }

    /// Encoded frame safe for logs, with the login code masked
    pub fn redacted(&self) -> String {
        match self {
            Command::Login(_) => format!("{}Login ****{}", FRAME_START, FRAME_END),
            other => other.encode(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Login(code) => write!(f, "Login {}", code),
            Command::Logout => f.write_str("Logout"),
            Command::GetDevices => f.write_str("Get Devices"),
            Command::GetName(id) => write!(f, "Get Name {}", id),
            Command::GetLevel(id) => write!(f, "Get {}", id),
            Command::Set(id, level) => write!(f, "Set {} {}", id, level),
            Command::Fade(id, level) => write!(f, "Fade {} {}", id, clamp_level(*level)),
        }
    }
}

/// Find the end of the first complete frame in `buf`
///
/// Returns the byte offset just past the first `<<`, if any.
pub fn frame_end(buf: &[u8]) -> Option<usize> {
    buf.windows(FRAME_END.len())
        .position(|w| w == FRAME_END.as_bytes())
        .map(|pos| pos + FRAME_END.len())
}

/// Text following `marker` up to the next terminator
fn payload<'a>(frame: &'a str, marker: &str) -> Option<&'a str> {
    let start = frame.find(marker)? + marker.len();
    let rest = &frame[start..];
    Some(rest.split(FRAME_END).next().unwrap_or(rest))
}

/// Whether a login response was accepted
pub fn is_login_ok(frame: &str) -> bool {
    frame.contains(LOGIN_OK)
}

/// Whether the controller answered with a `Timeout` payload
pub fn is_timeout(frame: &str) -> bool {
    frame.contains(TIMEOUT_TOKEN)
}

/// Parse a `Get Devices` response, dropping non-numeric ids
pub fn parse_device_ids(frame: &str) -> Vec<DeviceId> {
    let Some(list) = payload(frame, DEVICES_MARKER) else {
        return Vec::new();
    };

    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|s| s.parse().ok())
        .collect()
}

/// Parse a `Get Name` response, falling back to `Device_<id>`
pub fn parse_name(frame: &str, id: DeviceId) -> String {
    let name = payload(frame, NAME_MARKER)
        .map(|raw| {
            raw.trim()
                .trim_matches(|c: char| c == '\'' || c == '"')
                .trim()
        })
        .unwrap_or_default();

    if name.is_empty() || name.eq_ignore_ascii_case("timeout") {
        Device::fallback_name(id)
    } else {
        name.to_string()
    }
}

/// Parse a `Get <id>` response; `None` when the level is unreadable
pub fn parse_level(frame: &str) -> Option<Level> {
    payload(frame, LEVEL_MARKER)?.trim().parse().ok()
}
