// Device view orchestration - session registry and background loops
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, broadcast};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::application::fleet_repository::FleetRepository;
use crate::application::view_session::{OpenViewError, ViewSession};
use crate::domain::view::{DeviceView, ViewEvent};
use crate::domain::window::TimePreset;

/// How often an open view re-reads the device snapshot.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);
/// Views untouched by any request for this long are closed by the sweeper.
pub const IDLE_TTL: Duration = Duration::from_secs(30 * 60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct DeviceViewService {
    repository: Arc<dyn FleetRepository>,
    sessions: Mutex<HashMap<Uuid, Arc<ViewSession>>>,
}

impl DeviceViewService {
    pub fn new(repository: Arc<dyn FleetRepository>) -> Self {
        Self {
            repository,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Opens a view session and starts its refresh loop. Nothing is
    /// retained when the initial device load fails.
    pub async fn open(
        &self,
        device_id: String,
        preset: TimePreset,
    ) -> Result<DeviceView, OpenViewError> {
        let id = Uuid::new_v4();
        let session =
            Arc::new(ViewSession::open(self.repository.clone(), id, device_id, preset).await?);
        let view = session.current_view().await;
        self.sessions.lock().await.insert(id, session.clone());
        spawn_refresh_loop(session);
        tracing::info!(
            view_id = %id,
            device_id = %view.device_id,
            preset = preset.as_str(),
            "device view opened"
        );
        Ok(view)
    }

    pub async fn view(&self, id: Uuid) -> Option<DeviceView> {
        let session = self.session(id).await?;
        Some(session.current_view().await)
    }

    pub async fn change_window(&self, id: Uuid, preset: TimePreset) -> Option<DeviceView> {
        let session = self.session(id).await?;
        Some(session.change_window(preset).await)
    }

    pub async fn change_page(&self, id: Uuid, page: u32) -> Option<DeviceView> {
        let session = self.session(id).await?;
        Some(session.change_page(page).await)
    }

    pub async fn subscribe(&self, id: Uuid) -> Option<(DeviceView, broadcast::Receiver<ViewEvent>)> {
        let session = self.session(id).await?;
        Some(session.subscribe().await)
    }

    /// Closes a view and cancels its refresh loop.
    pub async fn close(&self, id: Uuid) -> bool {
        match self.sessions.lock().await.remove(&id) {
            Some(session) => {
                session.close();
                tracing::info!(view_id = %id, device_id = %session.device_id(), "device view closed");
                true
            }
            None => false,
        }
    }

    /// One sweep pass over the registry.
    pub async fn sweep_idle(&self) {
        let candidates: Vec<Arc<ViewSession>> = {
            let sessions = self.sessions.lock().await;
            sessions.values().cloned().collect()
        };
        for session in candidates {
            if session.has_subscribers() {
                continue;
            }
            if session.idle_for().await > IDLE_TTL {
                tracing::info!(
                    view_id = %session.id(),
                    device_id = %session.device_id(),
                    "closing idle device view"
                );
                self.close(session.id()).await;
            }
        }
    }

    async fn session(&self, id: Uuid) -> Option<Arc<ViewSession>> {
        self.sessions.lock().await.get(&id).cloned()
    }
}

/// Periodically sweeps idle sessions. Runs until the process exits.
pub fn spawn_idle_sweeper(service: Arc<DeviceViewService>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            service.sweep_idle().await;
        }
    });
}

fn spawn_refresh_loop(session: Arc<ViewSession>) {
    tokio::spawn(async move {
        let cancel = session.cancel_token();
        let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Skip the immediate first tick; the open already loaded a snapshot.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(view_id = %session.id(), "refresh loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    session.refresh_snapshot().await;
                }
            }
        }
    });
}
