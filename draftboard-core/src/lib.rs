pub mod commands;
pub mod config;
pub mod document;
pub mod events;
pub mod history;
pub mod id;
pub mod outline;
pub mod scene;

pub use config::OutlineConfig;
pub use id::NodeID;
