// Domain layer - Core types and business rules
pub mod device;
pub mod elements;
pub mod history;
pub mod map_scene;
pub mod movement;
pub mod summary;
pub mod track;
pub mod view;
pub mod window;
