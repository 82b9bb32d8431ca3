use thiserror::Error;

/// Failure reported by a record store.
///
/// Data-access functions surface these unchanged; "no identified caller"
/// is not an error and never shows up here for read paths.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found in {table}")]
    NotFound { table: &'static str },

    #[error("caller is not authorized")]
    Unauthorized,

    #[error("store transport error: {0}")]
    Transport(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("could not decode row: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound { table: "unknown" },
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
                if code.starts_with("23") {
                    StoreError::Constraint(db.message().to_string())
                } else if code == "42501" || code.starts_with("28") {
                    StoreError::Unauthorized
                } else {
                    StoreError::Transport(db.message().to_string())
                }
            }
            decode @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)) => {
                StoreError::Decode(decode.to_string())
            }
            other => StoreError::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}
