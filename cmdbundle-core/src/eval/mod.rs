//! Pure evaluators used by the resolver and the executor.

pub mod condition;
pub mod expression;
pub mod json_path;

pub use condition::evaluate_condition;
pub use expression::{ExpressionError, evaluate_expression};
pub use json_path::extract_json_value;
