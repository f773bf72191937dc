use std::fmt::{self, Display};

use potion::Error;
use sqlx::error::ErrorKind;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(e),
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(e),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(String::from("Unknown error")),
        }
    }
}

/// Every failure an action can report to the API boundary.
#[derive(Debug, ThisError)]
pub enum ActionError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Permission(String),

    #[error("Query failed: {0}")]
    Query(QueryError),
}

impl ActionError {
    pub fn validation(info: &str) -> Self {
        Self::Validation(info.to_string())
    }

    pub fn conflict(info: &str) -> Self {
        Self::Conflict(info.to_string())
    }

    pub fn not_found(info: &str) -> Self {
        Self::NotFound(info.to_string())
    }

    pub fn permission(info: &str) -> Self {
        Self::Permission(info.to_string())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ActionError::Validation(_) => 400,
            ActionError::Permission(_) => 403,
            ActionError::NotFound(_) => 404,
            ActionError::Conflict(_) => 409,
            ActionError::Query(_) => 500,
        }
    }
}

impl From<sqlx::Error> for ActionError {
    fn from(value: sqlx::Error) -> Self {
        match &value {
            sqlx::Error::RowNotFound => return Self::not_found("No such row"),
            sqlx::Error::Database(e) => match e.kind() {
                ErrorKind::UniqueViolation => return Self::Conflict(e.message().to_string()),
                ErrorKind::ForeignKeyViolation => {
                    return Self::NotFound(e.message().to_string())
                }
                ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                    return Self::Validation(e.message().to_string())
                }
                _ => {}
            },
            _ => {}
        }

        log::error!("Database failure: {value}");
        Self::Query(QueryError::from(value))
    }
}

impl From<QueryError> for ActionError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

impl From<TypeError> for ActionError {
    fn from(value: TypeError) -> Self {
        Self::Validation(value.info)
    }
}

impl From<ActionError> for Error {
    fn from(value: ActionError) -> Self {
        Error {
            code: value.status_code().into(),
            info: Some(value.to_string()),
            redirect: None,
        }
    }
}

impl warp::reject::Reject for ActionError {}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(ActionError::validation("bad").status_code(), 400);
        assert_eq!(ActionError::permission("no").status_code(), 403);
        assert_eq!(ActionError::not_found("gone").status_code(), 404);
        assert_eq!(ActionError::conflict("twice").status_code(), 409);
        assert_eq!(
            ActionError::Query(QueryError::new(String::from("boom"))).status_code(),
            500
        );
    }

    #[test]
    fn framework_error_carries_status_and_message() {
        let error = Error::from(ActionError::conflict("Recipe is already in favorites"));
        assert_eq!(error.code, 409);
        assert_eq!(error.info.as_deref(), Some("Recipe is already in favorites"));

        assert_eq!(Error::from(ActionError::permission("no")).code, 403);
    }

    #[test]
    fn missing_row_is_not_found() {
        let error = ActionError::from(sqlx::Error::RowNotFound);
        assert!(matches!(error, ActionError::NotFound(_)));
    }

    #[test]
    fn pool_failures_are_query_errors() {
        let error = ActionError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(error, ActionError::Query(_)));
        assert_eq!(error.to_string(), "Query failed: Pool timed out");
    }

    #[test]
    fn type_errors_become_validation_errors() {
        let error: ActionError = TypeError::new("Invalid key").into();
        assert!(matches!(error, ActionError::Validation(ref info) if info == "Invalid key"));
    }
}
