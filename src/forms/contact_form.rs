use serde::{Deserialize, Serialize};

use super::{max_length, required, valid_email, Form, Validator};

pub const NAME_MAX_LENGTH: usize = 255;
pub const CAPTCHA_MESSAGE: &str = "Invalid CAPTCHA";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub content: String,
    #[serde(skip_serializing)]
    pub captcha: String,
    #[serde(skip_serializing)]
    pub captcha_key: String,
    /// Set by the handler once the answer has been checked against the store.
    #[serde(skip)]
    pub captcha_passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub content: String,
}

fn name_required(form: &ContactForm) -> Result<(), String> {
    required(&form.name)
}

fn name_length(form: &ContactForm) -> Result<(), String> {
    max_length(form.name.trim(), NAME_MAX_LENGTH)
}

fn email_required(form: &ContactForm) -> Result<(), String> {
    required(&form.email)
}

fn email_format(form: &ContactForm) -> Result<(), String> {
    valid_email(&form.email)
}

fn content_required(form: &ContactForm) -> Result<(), String> {
    required(&form.content)
}

fn captcha_required(form: &ContactForm) -> Result<(), String> {
    required(&form.captcha)
}

fn captcha_matches(form: &ContactForm) -> Result<(), String> {
    if form.captcha_passed {
        Ok(())
    } else {
        Err(CAPTCHA_MESSAGE.to_owned())
    }
}

impl Form for ContactForm {
    type Cleaned = ContactMessage;

    const VALIDATORS: &'static [(&'static str, Validator<Self>)] = &[
        ("name", name_required),
        ("name", name_length),
        ("email", email_required),
        ("email", email_format),
        ("content", content_required),
        ("captcha", captcha_required),
        ("captcha", captcha_matches),
    ];

    fn cleaned(&self) -> ContactMessage {
        ContactMessage {
            name: self.name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            content: self.content.clone(),
        }
    }
}
