use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, FieldError};
use crate::users::dto::{is_valid_full_name, AccountType, UserProfile};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Request body for account registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub full_name: String,
    pub email_address: String,
    pub account_type: Option<String>,
    pub password: String,
}

/// Signup fields after boundary validation; everything downstream can assume
/// these hold.
#[derive(Debug)]
pub struct ValidSignup {
    pub full_name: String,
    pub email_address: String,
    pub account_type: AccountType,
    pub password: String,
}

impl SignupRequest {
    pub fn validate(self) -> Result<ValidSignup, ApiError> {
        let mut errors = Vec::new();

        let full_name = self.full_name.trim().to_string();
        if !is_valid_full_name(&full_name) {
            errors.push(FieldError::new(
                "fullName",
                "Full name must be between 2 and 50 characters and contain only letters and spaces",
                Some(serde_json::json!(self.full_name)),
            ));
        }

        let email_address = self.email_address.trim().to_lowercase();
        if !is_valid_email(&email_address) {
            errors.push(FieldError::new(
                "emailAddress",
                "Please provide a valid email address",
                Some(serde_json::json!(self.email_address)),
            ));
        }

        let account_type = match self.account_type.as_deref() {
            None => AccountType::Personal,
            Some(raw) => raw.parse::<AccountType>().unwrap_or_else(|()| {
                errors.push(FieldError::new(
                    "accountType",
                    "Account type must be either personal, business, or savings",
                    Some(serde_json::json!(raw)),
                ));
                AccountType::Personal
            }),
        };

        if self.password.len() < 6 {
            errors.push(FieldError::new(
                "password",
                "Password must be at least 6 characters long",
                None,
            ));
        }

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(ValidSignup {
            full_name,
            email_address,
            account_type,
            password: self.password,
        })
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_address: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<(String, String), ApiError> {
        let mut errors = Vec::new();

        let email_address = self.email_address.trim().to_lowercase();
        if !is_valid_email(&email_address) {
            errors.push(FieldError::new(
                "emailAddress",
                "Please provide a valid email address",
                Some(serde_json::json!(self.email_address)),
            ));
        }

        if self.password.is_empty() {
            errors.push(FieldError::new("password", "Password is required", None));
        }

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok((email_address, self.password))
    }
}

/// Payload returned after signup and login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    pub user: UserProfile,
    pub auth_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("jordan@example.com"));
        assert!(is_valid_email("a.b-c@sub.domain.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("missing@tld"));
    }

    #[test]
    fn signup_normalizes_and_defaults() {
        let req = SignupRequest {
            full_name: "  Jordan Rivers  ".into(),
            email_address: "  Jordan@Example.COM ".into(),
            account_type: None,
            password: "hunter22".into(),
        };
        let valid = req.validate().expect("valid signup");
        assert_eq!(valid.full_name, "Jordan Rivers");
        assert_eq!(valid.email_address, "jordan@example.com");
        assert_eq!(valid.account_type, AccountType::Personal);
    }

    #[test]
    fn signup_collects_every_field_error() {
        let req = SignupRequest {
            full_name: "X".into(),
            email_address: "not-an-email".into(),
            account_type: Some("checking".into()),
            password: "abc".into(),
        };
        let err = req.validate().unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(
                    fields,
                    vec!["fullName", "emailAddress", "accountType", "password"]
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn login_requires_password() {
        let req = LoginRequest {
            email_address: "jordan@example.com".into(),
            password: String::new(),
        };
        assert!(req.validate().is_err());
    }
}
