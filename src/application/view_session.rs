// View session - owned state for one open device view
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, broadcast};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::fleet_repository::{FleetApiError, FleetRepository};
use crate::application::history_pager::HistoryPager;
use crate::domain::device::DeviceSnapshot;
use crate::domain::history::{FIRST_PAGE, HistoryPage};
use crate::domain::map_scene::MapScene;
use crate::domain::summary::SummaryStats;
use crate::domain::track::Track;
use crate::domain::view::{DeviceView, HeaderView, HistoryView, SummaryView, ViewEvent, WindowView};
use crate::domain::window::{TimePreset, TimeWindow};

/// Track requests always ask for the same downsampled resolution.
pub const MAX_TRACK_POINTS: u32 = 500;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Failure to open a view. Nothing is retained for the device.
#[derive(Debug, thiserror::Error)]
pub enum OpenViewError {
    #[error("device {device_id} not found")]
    NotFound { device_id: String },
    #[error("device {device_id} is unavailable")]
    Unavailable {
        device_id: String,
        #[source]
        source: FleetApiError,
    },
}

// Everything one open view owns. Held behind a single lock, which is
// never held across a backend fetch.
struct ViewState {
    preset: TimePreset,
    window: TimeWindow,
    window_epoch: u64,
    snapshot: DeviceSnapshot,
    last_refreshed: DateTime<Utc>,
    summary: Option<SummaryStats>,
    track: Track,
    history: HistoryPage,
    scene: MapScene,
    last_touched: Instant,
}

pub struct ViewSession {
    id: Uuid,
    device_id: String,
    repository: Arc<dyn FleetRepository>,
    pager: HistoryPager,
    state: Mutex<ViewState>,
    events: broadcast::Sender<ViewEvent>,
    cancel: CancellationToken,
}

impl ViewSession {
    /// Opens a session by loading all four panels concurrently. Only the
    /// device snapshot can fail the open; the window-scoped panels degrade
    /// to their empty states.
    pub(crate) async fn open(
        repository: Arc<dyn FleetRepository>,
        id: Uuid,
        device_id: String,
        preset: TimePreset,
    ) -> Result<Self, OpenViewError> {
        let window = TimeWindow::resolve(preset);
        let pager = HistoryPager::new(repository.clone(), device_id.clone());
        let (snapshot, summary, track, history) = tokio::join!(
            repository.fetch_device(&device_id),
            repository.fetch_summary(&device_id, &window),
            repository.fetch_track(&device_id, &window, MAX_TRACK_POINTS),
            pager.fetch_page(&window, FIRST_PAGE),
        );

        let snapshot = snapshot.map_err(|source| match source {
            FleetApiError::NotFound => OpenViewError::NotFound {
                device_id: device_id.clone(),
            },
            other => OpenViewError::Unavailable {
                device_id: device_id.clone(),
                source: other,
            },
        })?;

        let summary = accept_or_degrade("summary", &device_id, summary);
        let track = accept_or_degrade("track", &device_id, track).unwrap_or_default();
        let history = accept_or_degrade("history", &device_id, history)
            .unwrap_or_else(|| HistoryPage::empty(FIRST_PAGE));

        let mut scene = MapScene::new();
        scene.update(&track, snapshot.live_position());

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            id,
            device_id,
            repository,
            pager,
            state: Mutex::new(ViewState {
                preset,
                window,
                window_epoch: 0,
                snapshot,
                last_refreshed: Utc::now(),
                summary,
                track,
                history,
                scene,
                last_touched: Instant::now(),
            }),
            events,
            cancel: CancellationToken::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn close(&self) {
        self.cancel.cancel();
    }

    pub(crate) async fn idle_for(&self) -> Duration {
        self.state.lock().await.last_touched.elapsed()
    }

    /// Whether any event-stream subscriber is attached. A subscribed
    /// session is live even when no request has touched it recently.
    pub(crate) fn has_subscribers(&self) -> bool {
        self.events.receiver_count() > 0
    }

    pub async fn current_view(&self) -> DeviceView {
        let mut state = self.state.lock().await;
        state.last_touched = Instant::now();
        self.render(&state)
    }

    /// Current model plus a receiver for subsequent updates. Subscribing
    /// happens before the read so no update can fall between the two.
    pub async fn subscribe(&self) -> (DeviceView, broadcast::Receiver<ViewEvent>) {
        let receiver = self.events.subscribe();
        let view = self.current_view().await;
        (view, receiver)
    }

    /// Switches the time window. Prior rows are discarded immediately, the
    /// page resets to 1 and all three window-scoped panels reload. Results
    /// arriving after a newer change are dropped wholesale.
    pub async fn change_window(&self, preset: TimePreset) -> DeviceView {
        let window = TimeWindow::resolve(preset);
        let epoch = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            state.last_touched = Instant::now();
            state.preset = preset;
            state.window = window;
            state.window_epoch += 1;
            state.summary = None;
            state.track = Track::default();
            state.history = HistoryPage::empty(FIRST_PAGE);
            state.scene.update(&state.track, state.snapshot.live_position());
            state.window_epoch
        };

        let (summary, track, history) = tokio::join!(
            self.repository.fetch_summary(&self.device_id, &window),
            self.repository
                .fetch_track(&self.device_id, &window, MAX_TRACK_POINTS),
            self.pager.fetch_page(&window, FIRST_PAGE),
        );

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if state.window_epoch != epoch {
            tracing::debug!(
                device_id = %self.device_id,
                preset = preset.as_str(),
                "window change superseded; dropping stale results"
            );
            return self.render(state);
        }

        state.summary = accept_or_degrade("summary", &self.device_id, summary);
        state.track = accept_or_degrade("track", &self.device_id, track).unwrap_or_default();
        state.history = accept_or_degrade("history", &self.device_id, history)
            .unwrap_or_else(|| HistoryPage::empty(FIRST_PAGE));
        state.scene.update(&state.track, state.snapshot.live_position());

        let view = self.render(state);
        let _ = self.events.send(ViewEvent::Window {
            window: view.window,
            summary: view.summary,
            map: view.map.clone(),
            history: view.history.clone(),
        });
        view
    }

    /// Loads a different page of the current window. A failed fetch keeps
    /// whatever page was already loaded.
    pub async fn change_page(&self, page: u32) -> DeviceView {
        let page = page.max(FIRST_PAGE);
        let (window, epoch) = {
            let mut state = self.state.lock().await;
            state.last_touched = Instant::now();
            (state.window, state.window_epoch)
        };

        let fetched = self.pager.fetch_page(&window, page).await;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if state.window_epoch != epoch {
            tracing::debug!(
                device_id = %self.device_id,
                page,
                "page load superseded; dropping stale results"
            );
            return self.render(state);
        }
        match fetched {
            Ok(history) => {
                state.history = history;
                let view = self.render(state);
                let _ = self.events.send(ViewEvent::History {
                    history: view.history.clone(),
                });
                view
            }
            Err(error) => {
                tracing::warn!(
                    device_id = %self.device_id,
                    page,
                    error = %error,
                    "history page load failed; keeping current rows"
                );
                self.render(state)
            }
        }
    }

    /// One live refresh pass. Failures are logged and the previous
    /// snapshot stays on screen.
    pub(crate) async fn refresh_snapshot(&self) {
        match self.repository.fetch_device(&self.device_id).await {
            Ok(snapshot) => {
                let mut guard = self.state.lock().await;
                let state = &mut *guard;
                state.snapshot = snapshot;
                state.last_refreshed = Utc::now();
                state.scene.update(&state.track, state.snapshot.live_position());
                let _ = self.events.send(ViewEvent::Snapshot {
                    header: HeaderView::from_snapshot(&state.snapshot),
                    map: state.scene.view(),
                    last_refreshed: state.last_refreshed,
                });
            }
            Err(error) => {
                tracing::debug!(
                    device_id = %self.device_id,
                    error = %error,
                    "live refresh failed; keeping last snapshot"
                );
            }
        }
    }

    fn render(&self, state: &ViewState) -> DeviceView {
        DeviceView {
            view_id: self.id,
            device_id: self.device_id.clone(),
            state: "ready",
            header: HeaderView::from_snapshot(&state.snapshot),
            window: WindowView::new(state.preset, &state.window),
            map: state.scene.view(),
            summary: state.summary.as_ref().map(SummaryView::from_stats),
            history: HistoryView::from_page(&state.history),
            last_refreshed: state.last_refreshed,
        }
    }
}

// Degraded panel policy: log the failure and fall back to the panel's
// empty state instead of failing the whole view.
fn accept_or_degrade<T>(
    panel: &str,
    device_id: &str,
    result: Result<T, FleetApiError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(device_id, panel, error = %error, "panel load failed");
            None
        }
    }
}
