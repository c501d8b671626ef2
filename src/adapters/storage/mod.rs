pub mod config_store;
pub mod detection_log;
