// History pager - fetches one page of records at a time
use std::sync::Arc;

use crate::application::fleet_repository::{FleetApiError, FleetRepository};
use crate::domain::history::{HistoryBatch, HistoryPage};
use crate::domain::window::TimeWindow;

/// Fixed page size for history queries. The backend caps pages at the
/// same value, which is what makes the has-next heuristic work.
pub const PAGE_SIZE: u32 = 50;

#[derive(Clone)]
pub struct HistoryPager {
    repository: Arc<dyn FleetRepository>,
    device_id: String,
}

impl HistoryPager {
    pub fn new(repository: Arc<dyn FleetRepository>, device_id: String) -> Self {
        Self {
            repository,
            device_id,
        }
    }

    /// Fetches one page. The backend reports no total count, so a further
    /// page is assumed to exist exactly when this one came back full.
    pub async fn fetch_page(
        &self,
        window: &TimeWindow,
        page: u32,
    ) -> Result<HistoryPage, FleetApiError> {
        let batch = self
            .repository
            .fetch_history(&self.device_id, window, page, PAGE_SIZE)
            .await?;
        Ok(Self::page_from(batch, page))
    }

    fn page_from(batch: HistoryBatch, page: u32) -> HistoryPage {
        let has_next = batch.returned_records == PAGE_SIZE;
        HistoryPage {
            rows: batch.rows,
            page,
            has_next,
        }
    }
}
