/// Domain error taxonomy shared by the mutation facade, the undo engine and
/// every store adapter.
///
/// Each variant is a distinct, stable kind so the HTTP layer can pick a
/// response category without inspecting messages.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Undo token not found")]
    TokenNotFound,

    #[error("Undo token already consumed")]
    TokenConsumed,

    #[error("Undo token expired")]
    TokenExpired,

    #[error("Unsupported action for undo: {0}")]
    UnsupportedAction(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl CoreError {
    /// Shorthand for an item id that does not resolve.
    pub fn item_not_found(id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: "Item",
            id: id.into(),
        }
    }

    /// Returns `true` for the three undo-token failure kinds.
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            CoreError::TokenNotFound | CoreError::TokenConsumed | CoreError::TokenExpired
        )
    }
}

/// Convenience alias used across the ports and services.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_are_grouped() {
        assert!(CoreError::TokenNotFound.is_token_error());
        assert!(CoreError::TokenConsumed.is_token_error());
        assert!(CoreError::TokenExpired.is_token_error());
        assert!(!CoreError::item_not_found("abc").is_token_error());
        assert!(!CoreError::Persistence("boom".into()).is_token_error());
    }

    #[test]
    fn not_found_message_names_the_id() {
        let msg = CoreError::item_not_found("abc-123").to_string();
        assert_eq!(msg, "Entity not found: Item with id abc-123");
    }
}
