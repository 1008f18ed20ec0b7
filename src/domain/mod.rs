pub mod connection;
pub mod device;
pub mod errors;
pub mod frame;
pub mod record;
pub mod settings;
pub mod stream;
