pub mod connection;
pub mod device_manager;
pub mod dto;
pub mod format_converter;
pub mod ports;
pub mod services;
pub mod streaming;
