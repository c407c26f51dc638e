//! Session layer: socket admission and snapshot fan-out

pub mod broadcaster;
pub mod manager;

pub use broadcaster::Broadcaster;
pub use manager::ConnectionManager;
