use crate::config::ClientConfig;
use crate::executor::CommandExecutor;
use crate::protocol::{self, Command};
use crate::types::{Device, DeviceId, DiscoveryOrder, Level, SessionState};
use std::collections::BTreeMap;

/// Client for a ZenseHome controller
///
/// All operations share one session and one in-flight exchange. None of
/// them return transport errors: a failed exchange shows up as an empty
/// list, a `None` level, a fallback name or a `false` acknowledgement, which
/// callers should read as "state unknown" rather than "device off".
///
/// Wrap the client in an `Arc` to share it between tasks.
///
/// # Example
///
/// ```no_run
/// use zensehome::{ClientConfig, DiscoveryOrder, ZenseClient};
///
/// #[tokio::main]
/// async fn main() {
///     let client = ZenseClient::new(ClientConfig::new("192.168.1.50", 10001, 1234));
///     for device in client.discover(DiscoveryOrder::Ascending).await {
///         let level = client.get_level(device.id).await;
///         println!("{} ({}): {:?}", device.name, device.id, level);
///     }
///     client.fade(12, 60).await;
/// }
/// ```
pub struct ZenseClient {
    config: ClientConfig,
    executor: CommandExecutor,
}

impl ZenseClient {
    /// Create a client; nothing is sent until the first operation
    pub fn new(config: ClientConfig) -> Self {
        let executor = CommandExecutor::new(&config);
        Self { config, executor }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current session state
    pub async fn session_state(&self) -> SessionState {
        self.executor.state().await
    }

    /// Send a raw command and return the response frame
    pub async fn send_command(&self, command: &Command) -> Option<String> {
        self.executor.execute(command).await
    }

    /// Ids of every device the controller knows, in reported order
    pub async fn get_devices(&self) -> Vec<DeviceId> {
        self.send_command(&Command::GetDevices)
            .await
            .map(|frame| protocol::parse_device_ids(&frame))
            .unwrap_or_default()
    }

    /// Device name, or `Device_<id>` when it cannot be read
    pub async fn get_name(&self, id: DeviceId) -> String {
        match self.send_command(&Command::GetName(id)).await {
            Some(frame) => protocol::parse_name(&frame, id),
            None => Device::fallback_name(id),
        }
    }

    /// List devices with their names
    ///
    /// Names are fetched one at a time since the controller only handles a
    /// single exchange at once.
    pub async fn discover(&self, order: DiscoveryOrder) -> Vec<Device> {
        let mut ids = self.get_devices().await;
        if order == DiscoveryOrder::Ascending {
            ids.sort_unstable();
        }

        let mut devices = Vec::with_capacity(ids.len());
        for id in ids {
            let name = self.get_name(id).await;
            devices.push(Device { id, name });
        }
        tracing::info!("Discovered {} devices", devices.len());
        devices
    }

    /// Current level; `None` if it could not be determined
    pub async fn get_level(&self, id: DeviceId) -> Option<Level> {
        let frame = self.send_command(&Command::GetLevel(id)).await?;
        protocol::parse_level(&frame)
    }

    /// Levels for several devices, read one after another
    pub async fn get_levels(&self, ids: &[DeviceId]) -> BTreeMap<DeviceId, Option<Level>> {
        let mut levels = BTreeMap::new();
        for &id in ids {
            levels.insert(id, self.get_level(id).await);
        }
        levels
    }

    /// Switch fully on; `true` if the controller answered
    pub async fn set_on(&self, id: DeviceId) -> bool {
        self.send_command(&Command::on(id)).await.is_some()
    }

    /// Switch off; `true` if the controller answered
    pub async fn set_off(&self, id: DeviceId) -> bool {
        self.send_command(&Command::off(id)).await.is_some()
    }

    /// Fade to `level` (clamped to `0..=100`); `true` if the controller answered
    pub async fn fade(&self, id: DeviceId, level: Level) -> bool {
        self.send_command(&Command::fade(id, level)).await.is_some()
    }

    /// Check that the controller accepts our code and lists devices
    ///
    /// Always leaves the connection closed afterwards.
    pub async fn test_connection(&self) -> bool {
        let ok = self.executor.check_connection().await;
        tracing::info!(
            "Connection test against {}: {}",
            self.config.addr(),
            if ok { "ok" } else { "failed" }
        );
        ok
    }

    /// Best-effort logout and disconnect
    pub async fn logout(&self) {
        self.executor.logout().await;
    }

    /// Disconnect without logging out
    pub async fn close(&self) {
        self.executor.close().await;
    }
}
