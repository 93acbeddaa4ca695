//! Types and helpers shared by every tier of the movement lookup.

pub mod credentials;
pub mod metrics_defs;
pub mod movement;
pub mod process_number;
pub mod text;

pub use credentials::Credentials;
pub use movement::{Field, MovementResult, Resolution, Sentinel, Tier};
pub use process_number::ProcessNumber;
