use axum::{
    response::{IntoResponse, Redirect},
    Extension, Form as FormData,
};

use crate::{
    authentication::MaybeUser,
    context::{build_context, to_value},
    forms::{ContactForm, Form, FormErrors},
    AppState,
};

use super::{form_context, invalid_form, HtmlResult, PageResult};

// ----------------- Contact Handlers -----------------
async fn render_contact(
    state: &AppState,
    user: &MaybeUser,
    form: &ContactForm,
    errors: &FormErrors,
) -> HtmlResult {
    let mut extra = form_context(form, errors)?;
    let challenge = state.captchas.issue().await;
    extra.insert("captcha".to_owned(), to_value(&challenge)?);
    let context = build_context(&state.pool, &state.categories, user, "Feedback", extra).await?;
    state.templates.render("contact.html", context)
}

pub async fn contact_form(Extension(state): Extension<AppState>, user: MaybeUser) -> HtmlResult {
    render_contact(&state, &user, &ContactForm::default(), &FormErrors::new()).await
}

/// Contact messages are not stored anywhere; a valid one is logged and dropped.
pub async fn contact(
    Extension(state): Extension<AppState>,
    user: MaybeUser,
    FormData(mut form): FormData<ContactForm>,
) -> PageResult {
    form.captcha_passed = !form.captcha.trim().is_empty()
        && state.captchas.verify(&form.captcha_key, &form.captcha).await;

    match form.validate() {
        Ok(message) => {
            tracing::info!(
                name = %message.name,
                email = %message.email,
                content = %message.content,
                "contact message received"
            );
            Ok(Redirect::to("/").into_response())
        }
        Err(errors) => {
            let page = render_contact(&state, &user, &form, &errors).await?;
            Ok(invalid_form(page))
        }
    }
}
