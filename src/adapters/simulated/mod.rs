pub mod glasses;
pub mod session;

pub use glasses::{SimulatedGlasses, SimulatedGlassesConfig};
pub use session::{test_pattern, SessionLedger, SimulatedSession};
