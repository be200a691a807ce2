use axum::{
    http::StatusCode,
    response::{Html, IntoResponse},
};

pub const NOT_FOUND_PAGE: &str = "<h1>Page not found</h1>";

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("not found")]
    NotFound,
    #[error("not authorized: {0}")]
    NotAuthorized(&'static str),
    #[error("{0}")]
    RunTimeError(&'static str),
    #[error("record is still referenced and cannot be deleted")]
    Protected,
    #[error("internal server error")]
    ServerError,
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RequestError {
    /// True when the database rejected a write because of a UNIQUE index.
    pub fn is_unique_violation(&self) -> bool {
        self.database_message()
            .map(|message| message.contains("UNIQUE constraint failed"))
            .unwrap_or(false)
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        self.database_message()
            .map(|message| message.contains("FOREIGN KEY constraint failed"))
            .unwrap_or(false)
    }

    fn database_message(&self) -> Option<&str> {
        match self {
            RequestError::DatabaseError(sqlx::Error::Database(e)) => Some(e.message()),
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::NotFound => StatusCode::NOT_FOUND,
            RequestError::NotAuthorized(_) => StatusCode::UNAUTHORIZED,
            RequestError::RunTimeError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RequestError::Protected => StatusCode::CONFLICT,
            RequestError::ServerError
            | RequestError::DatabaseError(_)
            | RequestError::Template(_)
            | RequestError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = match &self {
            RequestError::NotFound => NOT_FOUND_PAGE.to_owned(),
            RequestError::NotAuthorized(message) => format!("<h1>{}</h1>", message),
            RequestError::RunTimeError(message) => format!("<h1>{}</h1>", message),
            RequestError::Protected => "<h1>Record is in use</h1>".to_owned(),
            other => {
                tracing::error!(error = %other, "request failed");
                "<h1>Internal Server Error</h1>".to_owned()
            }
        };
        (status, Html(body)).into_response()
    }
}
