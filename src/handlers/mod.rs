mod article_handlers;
mod contact_handlers;
mod user_handlers;

pub use article_handlers::*;
pub use contact_handlers::*;
pub use user_handlers::*;

use axum::{
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Serialize;

use crate::{
    context::{to_value, Context},
    errors::{RequestError, NOT_FOUND_PAGE},
    forms::FormErrors,
};

type HtmlResult = Result<Html<String>, RequestError>;
type PageResult = Result<Response, RequestError>;

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "alive"
}

pub async fn not_found(uri: Uri) -> (StatusCode, Html<&'static str>) {
    tracing::debug!(%uri, "no route matched");
    (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE))
}

/// Context entries for a form page: the submitted values and their errors.
fn form_context<F: Serialize>(form: &F, errors: &FormErrors) -> Result<Context, RequestError> {
    let mut context = Context::new();
    context.insert("form".to_owned(), to_value(form)?);
    context.insert("errors".to_owned(), to_value(errors)?);
    Ok(context)
}

/// Rendered page with the status used for rejected submissions.
fn invalid_form(page: Html<String>) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, page).into_response()
}

fn redirect_with_cookie(to: &str, cookie: String) -> Response {
    ([(header::SET_COOKIE, cookie)], Redirect::to(to)).into_response()
}
