pub mod controller;
pub mod events;
pub mod state;

pub use controller::{SafetyStore, StoreOptions};
pub use events::StoreEvent;
pub use state::{SafetyStats, StoreState};
