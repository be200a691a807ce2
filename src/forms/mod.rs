//! Field-level validation for the submitted forms.
//!
//! Every form lists its checks as ordered `(field, validator)` pairs. They run in
//! order and a field stops being checked after its first failure, so each field
//! reports at most one problem from this stage. Checks that need the database
//! (uniqueness, credentials) are added afterwards by the handlers through
//! [`FormErrors::add`].

mod article_form;
mod contact_form;
mod user_forms;

pub use article_form::*;
pub use contact_form::*;
pub use user_forms::*;

use serde::{ser::SerializeMap, Serialize, Serializer};

/// Key for errors that belong to the form as a whole.
pub const NON_FIELD_ERRORS: &str = "__all__";

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const EMAIL_MESSAGE: &str = "Enter a valid email address.";

pub type Validator<F> = fn(&F) -> Result<(), String>;

/// Outcome of validating a form: the cleaned data or the collected errors.
pub type Validation<T> = Result<T, FormErrors>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    errors: Vec<(String, Vec<String>)>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        match self.errors.iter_mut().find(|(name, _)| name == field) {
            Some((_, messages)) => messages.push(message),
            None => self.errors.push((field.to_owned(), vec![message])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for FormErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.errors.len()))?;
        for (field, messages) in &self.errors {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

pub trait Form: Sized + 'static {
    type Cleaned;

    const VALIDATORS: &'static [(&'static str, Validator<Self>)];

    /// Builds the cleaned value; only called once every validator passed.
    fn cleaned(&self) -> Self::Cleaned;

    fn validate(&self) -> Validation<Self::Cleaned> {
        let errors = run_validators(self, Self::VALIDATORS);
        if errors.is_empty() {
            Ok(self.cleaned())
        } else {
            Err(errors)
        }
    }
}

pub fn run_validators<F>(form: &F, validators: &[(&'static str, Validator<F>)]) -> FormErrors {
    let mut errors = FormErrors::new();
    for (field, validator) in validators {
        if errors.has(field) {
            continue;
        }
        if let Err(message) = validator(form) {
            errors.add(field, message);
        }
    }
    errors
}

pub fn required(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(REQUIRED_MESSAGE.to_owned())
    } else {
        Ok(())
    }
}

pub fn max_length(value: &str, limit: usize) -> Result<(), String> {
    let length = value.chars().count();
    if length > limit {
        Err(format!(
            "Ensure this value has at most {} characters (it has {}).",
            limit, length
        ))
    } else {
        Ok(())
    }
}

pub fn valid_email(value: &str) -> Result<(), String> {
    if validator::validate_email(value.trim()) {
        Ok(())
    } else {
        Err(EMAIL_MESSAGE.to_owned())
    }
}
