use axum::{
    http::header,
    response::{IntoResponse, Redirect},
    Extension, Form as FormData,
};

use crate::{
    authentication::{
        expired_session_cookie, get_session_token, hash_password_argon2, session_cookie,
        verify_password_argon2, MaybeUser,
    },
    context::build_context,
    db_helpers::{get_user_by_username, insert_user},
    errors::RequestError,
    forms::{
        Form, FormErrors, LoginForm, RegisterForm, DUPLICATE_USERNAME_MESSAGE,
        INVALID_LOGIN_MESSAGE, NON_FIELD_ERRORS,
    },
    models::{NewUser, User},
    AppState,
};

use super::{form_context, invalid_form, redirect_with_cookie, HtmlResult, PageResult};

// ----------------- User Handlers -----------------
async fn render_register(
    state: &AppState,
    user: &MaybeUser,
    form: &RegisterForm,
    errors: &FormErrors,
) -> HtmlResult {
    let extra = form_context(form, errors)?;
    let context = build_context(&state.pool, &state.categories, user, "Registration", extra).await?;
    state.templates.render("register.html", context)
}

async fn render_login(
    state: &AppState,
    user: &MaybeUser,
    form: &LoginForm,
    errors: &FormErrors,
) -> HtmlResult {
    let extra = form_context(form, errors)?;
    let context =
        build_context(&state.pool, &state.categories, user, "Authorization", extra).await?;
    state.templates.render("login.html", context)
}

fn start_session(state: &AppState, user: &User) -> PageResult {
    let token = get_session_token(&state.config.jwt_secret, user.id, &user.username)
        .map_err(|e| {
            tracing::error!(error = %e, "could not issue session token");
            RequestError::ServerError
        })?;
    Ok(redirect_with_cookie("/", session_cookie(&token)))
}

pub async fn register_form(Extension(state): Extension<AppState>, user: MaybeUser) -> HtmlResult {
    render_register(&state, &user, &RegisterForm::default(), &FormErrors::new()).await
}

pub async fn register_user(
    Extension(state): Extension<AppState>,
    user: MaybeUser,
    FormData(form): FormData<RegisterForm>,
) -> PageResult {
    let cleaned = match form.validate() {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            let page = render_register(&state, &user, &form, &errors).await?;
            return Ok(invalid_form(page));
        }
    };

    let password = hash_password_argon2(cleaned.password).await.map_err(|e| {
        tracing::error!(error = %e, "could not hash password");
        RequestError::ServerError
    })?;
    let new_user = NewUser {
        username: cleaned.username,
        email: cleaned.email,
        password,
    };
    let created = match insert_user(&state.pool, &new_user).await {
        Ok(created) => created,
        Err(e) if e.is_unique_violation() => {
            let errors = FormErrors::single("username", DUPLICATE_USERNAME_MESSAGE);
            let page = render_register(&state, &user, &form, &errors).await?;
            return Ok(invalid_form(page));
        }
        Err(e) => return Err(e),
    };
    tracing::info!(username = %created.username, "user registered");
    start_session(&state, &created)
}

pub async fn login_form(Extension(state): Extension<AppState>, user: MaybeUser) -> HtmlResult {
    render_login(&state, &user, &LoginForm::default(), &FormErrors::new()).await
}

pub async fn login_user(
    Extension(state): Extension<AppState>,
    user: MaybeUser,
    FormData(form): FormData<LoginForm>,
) -> PageResult {
    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => {
            let page = render_login(&state, &user, &form, &errors).await?;
            return Ok(invalid_form(page));
        }
    };

    let found = get_user_by_username(&state.pool, &credentials.username).await?;
    let authenticated = match found {
        Some(found) => {
            let is_password_correct =
                verify_password_argon2(credentials.password, &found.password)
                    .await
                    .map_err(|e| {
                        tracing::error!(error = %e, "could not verify password");
                        RequestError::ServerError
                    })?;
            is_password_correct.then_some(found)
        }
        None => None,
    };

    match authenticated {
        Some(found) => {
            tracing::info!(username = %found.username, "user logged in");
            start_session(&state, &found)
        }
        None => {
            let errors = FormErrors::single(NON_FIELD_ERRORS, INVALID_LOGIN_MESSAGE);
            let page = render_login(&state, &user, &form, &errors).await?;
            Ok(invalid_form(page))
        }
    }
}

pub async fn logout_user() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Redirect::to("/login/"),
    )
}
