pub mod api;
pub mod config;
pub mod device_coordinator;
pub mod entry;
pub mod flow;
pub mod http_response;
pub mod record_store;
pub mod services;
