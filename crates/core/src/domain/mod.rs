pub mod message;
pub mod record;
pub mod run_error;
