use crate::client::ZenseClient;
use crate::types::{DeviceId, Level};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::sleep;

/// Default quiet period before a coalesced write is sent
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Write held back by the debouncer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingWrite {
    Fade(Level),
    Off,
}

struct Pending {
    generation: u64,
    cancel: oneshot::Sender<()>,
}

#[derive(Default)]
struct Slots {
    next_generation: u64,
    pending: HashMap<DeviceId, Pending>,
}

/// Coalesces rapid brightness changes into one command per device
///
/// Each schedule call replaces whatever was waiting for that device. A
/// write is only sent once the device has been quiet for the configured
/// period. Cancelling before then sends nothing; once the quiet period has
/// passed the command runs to completion.
pub struct FadeDebouncer {
    client: Arc<ZenseClient>,
    quiet: Duration,
    slots: Arc<Mutex<Slots>>,
}

impl FadeDebouncer {
    pub fn new(client: Arc<ZenseClient>) -> Self {
        Self::with_quiet_period(client, DEFAULT_QUIET_PERIOD)
    }

    pub fn with_quiet_period(client: Arc<ZenseClient>, quiet: Duration) -> Self {
        Self {
            client,
            quiet,
            slots: Arc::new(Mutex::new(Slots::default())),
        }
    }

    /// Queue a fade, replacing any pending write for `id`
    pub fn schedule_fade(&self, id: DeviceId, level: Level) {
        self.schedule(id, PendingWrite::Fade(level));
    }

    /// Queue a switch-off, replacing any pending write for `id`
    pub fn schedule_off(&self, id: DeviceId) {
        self.schedule(id, PendingWrite::Off);
    }

    /// Queue `write` for `id`
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, id: DeviceId, write: PendingWrite) {
        let (cancel, mut cancelled) = oneshot::channel();

        let generation = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            let generation = slots.next_generation;
            slots.next_generation += 1;
            if let Some(previous) = slots.pending.insert(id, Pending { generation, cancel }) {
                tracing::debug!("Superseding pending write for device {}", id);
                let _ = previous.cancel.send(());
            }
            generation
        };

        let client = self.client.clone();
        let slots = self.slots.clone();
        let quiet = self.quiet;
        tokio::spawn(async move {
            tokio::select! {
                _ = sleep(quiet) => {}
                _ = &mut cancelled => return,
            }

            {
                let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
                if slots.pending.get(&id).map(|p| p.generation) != Some(generation) {
                    return;
                }
                slots.pending.remove(&id);
            }

            let acknowledged = match write {
                PendingWrite::Fade(level) => client.fade(id, level).await,
                PendingWrite::Off => client.set_off(id).await,
            };
            if !acknowledged {
                tracing::warn!("Debounced {:?} for device {} got no answer", write, id);
            }
        });
    }

    /// Drop the pending write for `id`; `true` if there was one
    pub fn cancel(&self, id: DeviceId) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.pending.remove(&id) {
            Some(pending) => {
                let _ = pending.cancel.send(());
                true
            }
            None => false,
        }
    }

    /// Drop every pending write
    pub fn cancel_all(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, pending) in slots.pending.drain() {
            let _ = pending.cancel.send(());
        }
    }

    /// Devices with a write still waiting for its quiet period
    pub fn pending(&self) -> Vec<DeviceId> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<DeviceId> = slots.pending.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Drop for FadeDebouncer {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
