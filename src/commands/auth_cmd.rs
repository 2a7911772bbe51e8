//! Auth Form Commands
//!
//! Validation for the sign-in, sign-up and password forms, and switching
//! between them. Talking to the auth provider happens elsewhere; a valid form
//! is handed over as-is.

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult};
use crate::store::{AppStore, AuthView};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl AuthForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            confirm_password: String::new(),
        }
    }

    pub fn with_confirmation(mut self, confirm: impl Into<String>) -> Self {
        self.confirm_password = confirm.into();
        self
    }
}

fn invalid(message: &str) -> DomainError {
    DomainError::InvalidInput(message.to_string())
}

fn check_email(email: &str) -> DomainResult<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(invalid("Email is required"));
    }
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && !domain.is_empty() => Ok(email.to_string()),
        _ => Err(invalid("Email address is not valid")),
    }
}

fn check_new_password(password: &str, confirm: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(invalid("Password must be at least 6 characters"));
    }
    if password != confirm {
        return Err(invalid("Passwords do not match"));
    }
    Ok(())
}

/// Returns the form with the email trimmed
pub fn validate_sign_in(form: &AuthForm) -> DomainResult<AuthForm> {
    let email = check_email(&form.email)?;
    if form.password.is_empty() {
        return Err(invalid("Password is required"));
    }
    Ok(AuthForm {
        email,
        ..form.clone()
    })
}

pub fn validate_sign_up(form: &AuthForm) -> DomainResult<AuthForm> {
    let email = check_email(&form.email)?;
    check_new_password(&form.password, &form.confirm_password)?;
    Ok(AuthForm {
        email,
        ..form.clone()
    })
}

/// Returns the trimmed address the reset link goes to
pub fn validate_forgot_password(email: &str) -> DomainResult<String> {
    check_email(email)
}

pub fn validate_password_reset(password: &str, confirm: &str) -> DomainResult<()> {
    check_new_password(password, confirm)
}

/// Show another auth form; clears any error left by the previous one
pub fn switch_auth_view(store: &AppStore, view: AuthView) {
    store.update_if(|state| {
        if state.auth_view == view && state.data_error.is_none() {
            return false;
        }
        state.auth_view = view;
        state.data_error = None;
        true
    });
}
