//! Port traits separating the domain from concrete infrastructure.

pub mod config_port;
pub mod data_port;
