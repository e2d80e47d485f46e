use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Final output already set for run {0}")]
    FinalOutputAlreadySet(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = Uuid::new_v4();
        let error = CoreError::FinalOutputAlreadySet(id);
        assert!(error.to_string().contains(&id.to_string()));
    }
}
