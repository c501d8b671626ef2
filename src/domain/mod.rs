pub mod camera;
pub mod config;
pub mod detection;
pub mod errors;
pub mod interaction;
pub mod model;
pub mod stats;
pub mod stream;
pub mod throttle;
