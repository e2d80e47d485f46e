//! Stage functions of the pipeline.
//!
//! Each stage consumes the shared context and mutates the execution record.
//! The two branching stages (`interpret`, `handle_error`) also return a
//! routing verdict for the runner to dispatch on. No stage holds private
//! state across invocations.

pub mod execute_tool;
pub mod finalize;
pub mod handle_error;
pub mod interpret;
pub mod plan;
pub mod select_tool;
pub mod start;
