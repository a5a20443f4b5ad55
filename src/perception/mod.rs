pub mod screenshot;
pub mod traits;
pub mod types;

pub use traits::Perception;
pub use types::{Observation, Screenshot};
