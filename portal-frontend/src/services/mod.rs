pub mod auth_client;
pub mod auth_gate;
pub mod data_client;
