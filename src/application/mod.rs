pub mod controller;
pub mod dto;
pub mod filter;
pub mod notifier;
pub mod overlay;
pub mod ports;
pub mod services;
pub mod session;
