// Application state for HTTP handlers
use std::sync::Arc;

use crate::application::device_view::DeviceViewService;

#[derive(Clone)]
pub struct AppState {
    pub device_views: Arc<DeviceViewService>,
}
