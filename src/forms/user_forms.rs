use serde::{Deserialize, Serialize};

use super::{max_length, required, valid_email, Form, Validator};

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const USERNAME_MESSAGE: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const DUPLICATE_USERNAME_MESSAGE: &str = "A user with that username already exists.";
pub const PASSWORD_MISMATCH_MESSAGE: &str = "The two password fields didn't match.";
pub const PASSWORD_NUMERIC_MESSAGE: &str = "This password is entirely numeric.";
pub const INVALID_LOGIN_MESSAGE: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

#[derive(Debug, Clone)]
pub struct CleanedRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
}

fn username_required(form: &RegisterForm) -> Result<(), String> {
    required(&form.username)
}

fn username_length(form: &RegisterForm) -> Result<(), String> {
    max_length(form.username.trim(), USERNAME_MAX_LENGTH)
}

fn username_characters(form: &RegisterForm) -> Result<(), String> {
    let valid = form
        .username
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(USERNAME_MESSAGE.to_owned())
    }
}

fn email_required(form: &RegisterForm) -> Result<(), String> {
    required(&form.email)
}

fn email_format(form: &RegisterForm) -> Result<(), String> {
    valid_email(&form.email)
}

fn password1_required(form: &RegisterForm) -> Result<(), String> {
    required(&form.password1)
}

fn password2_required(form: &RegisterForm) -> Result<(), String> {
    required(&form.password2)
}

fn passwords_match(form: &RegisterForm) -> Result<(), String> {
    if form.password1 == form.password2 {
        Ok(())
    } else {
        Err(PASSWORD_MISMATCH_MESSAGE.to_owned())
    }
}

fn password_long_enough(form: &RegisterForm) -> Result<(), String> {
    if form.password2.chars().count() < PASSWORD_MIN_LENGTH {
        Err(format!(
            "This password is too short. It must contain at least {} characters.",
            PASSWORD_MIN_LENGTH
        ))
    } else {
        Ok(())
    }
}

fn password_not_numeric(form: &RegisterForm) -> Result<(), String> {
    if form.password2.chars().all(|c| c.is_ascii_digit()) {
        Err(PASSWORD_NUMERIC_MESSAGE.to_owned())
    } else {
        Ok(())
    }
}

impl Form for RegisterForm {
    type Cleaned = CleanedRegistration;

    // Password strength is reported on the confirmation field.
    const VALIDATORS: &'static [(&'static str, Validator<Self>)] = &[
        ("username", username_required),
        ("username", username_length),
        ("username", username_characters),
        ("email", email_required),
        ("email", email_format),
        ("password1", password1_required),
        ("password2", password2_required),
        ("password2", passwords_match),
        ("password2", password_long_enough),
        ("password2", password_not_numeric),
    ];

    fn cleaned(&self) -> CleanedRegistration {
        CleanedRegistration {
            username: self.username.trim().to_owned(),
            email: self.email.trim().to_owned(),
            password: self.password1.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

fn login_username_required(form: &LoginForm) -> Result<(), String> {
    required(&form.username)
}

fn login_password_required(form: &LoginForm) -> Result<(), String> {
    required(&form.password)
}

impl Form for LoginForm {
    type Cleaned = Credentials;

    const VALIDATORS: &'static [(&'static str, Validator<Self>)] = &[
        ("username", login_username_required),
        ("password", login_password_required),
    ];

    fn cleaned(&self) -> Credentials {
        Credentials {
            username: self.username.trim().to_owned(),
            password: self.password.clone(),
        }
    }
}
