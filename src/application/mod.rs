// Application layer - Use cases and repository contracts
pub mod device_view;
pub mod fleet_repository;
pub mod history_pager;
pub mod view_session;
