pub mod grammar;
pub mod parser;
pub mod types;

pub use parser::parse_action;
pub use types::{Action, ActionResult, Coordinate, NormPoint};
