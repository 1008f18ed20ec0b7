pub mod memory;
pub mod settings_file;

pub use memory::{MemoryRecordStore, MemorySettingsStore};
pub use settings_file::JsonFileSettingsStore;
