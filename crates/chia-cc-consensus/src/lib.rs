pub mod conditions;
pub mod error;
pub mod evaluator;
pub mod get_puzzle_and_solution;
pub mod npc_result;
pub mod validation;

pub use conditions::*;
pub use error::*;
pub use evaluator::*;
pub use get_puzzle_and_solution::*;
pub use npc_result::*;
