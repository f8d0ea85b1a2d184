//! Port traits the CLI drives; adapters provide the file-backed versions.

pub mod config_port;
pub mod data_port;
