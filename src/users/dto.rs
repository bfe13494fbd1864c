use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, FieldError};
use crate::users::repo::User;

pub const MAX_ADJUSTMENT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Personal,
    Business,
    Savings,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Business => "business",
            Self::Savings => "savings",
        }
    }
}

impl FromStr for AccountType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal" => Ok(Self::Personal),
            "business" => Ok(Self::Business),
            "savings" => Ok(Self::Savings),
            _ => Err(()),
        }
    }
}

pub(crate) fn is_valid_full_name(name: &str) -> bool {
    lazy_static! {
        static ref NAME_RE: Regex = Regex::new(r"^[a-zA-Z\s]+$").unwrap();
    }
    (2..=50).contains(&name.len()) && NAME_RE.is_match(name)
}

/// User payload returned by auth and profile endpoints. `accountAge` is
/// derived on every read, never stored.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: Uuid,
    pub full_name: String,
    pub email_address: String,
    pub account_type: String,
    pub current_balance: Decimal,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub account_created_date: OffsetDateTime,
    pub account_age: i64,
    pub is_account_active: bool,
}

impl UserProfile {
    pub fn from_user(user: &User, now: OffsetDateTime) -> Self {
        Self {
            user_id: user.id,
            full_name: user.full_name.clone(),
            email_address: user.email_address.clone(),
            account_type: user.account_type.clone(),
            current_balance: user.current_balance,
            last_login_date: user.last_login_date,
            account_created_date: user.account_created_date,
            account_age: (now - user.account_created_date).whole_days(),
            is_account_active: user.is_account_active,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub account_type: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(self) -> Result<(Option<String>, Option<AccountType>), ApiError> {
        let mut errors = Vec::new();

        let full_name = self.full_name.map(|n| n.trim().to_string());
        if let Some(name) = &full_name {
            if !is_valid_full_name(name) {
                errors.push(FieldError::new(
                    "fullName",
                    "Full name must be between 2 and 50 characters and contain only letters and spaces",
                    Some(serde_json::json!(name)),
                ));
            }
        }

        let account_type = match self.account_type.as_deref() {
            None => None,
            Some(raw) => match raw.parse::<AccountType>() {
                Ok(t) => Some(t),
                Err(()) => {
                    errors.push(FieldError::new(
                        "accountType",
                        "Account type must be either personal, business, or savings",
                        Some(serde_json::json!(raw)),
                    ));
                    None
                }
            },
        };

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok((full_name, account_type))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub current_balance: Decimal,
    pub currency: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustBalanceRequest {
    pub amount: Decimal,
    pub description: Option<String>,
}

impl AdjustBalanceRequest {
    pub fn validate(self) -> Result<(Decimal, Option<String>), ApiError> {
        let mut errors = Vec::new();

        if self.amount == Decimal::ZERO {
            errors.push(FieldError::new(
                "amount",
                "Amount cannot be zero",
                Some(serde_json::json!(0)),
            ));
        } else if self.amount.abs() > MAX_ADJUSTMENT {
            errors.push(FieldError::new(
                "amount",
                "Amount must be a number between -1,000,000 and 1,000,000",
                Some(serde_json::json!(self.amount.to_string())),
            ));
        }

        let description = self.description.map(|d| d.trim().to_string());
        if let Some(d) = &description {
            if d.len() > 200 {
                errors.push(FieldError::new(
                    "description",
                    "Description cannot exceed 200 characters",
                    Some(serde_json::json!(d)),
                ));
            }
        }

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok((self.amount, description))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustBalanceResponse {
    pub previous_balance: Decimal,
    pub current_balance: Decimal,
    pub amount_changed: Decimal,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn sample_user(created_days_ago: i64) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            full_name: "Jordan Rivers".into(),
            email_address: "jordan@example.com".into(),
            account_type: "personal".into(),
            password_hash: "$argon2id$stub".into(),
            current_balance: Decimal::new(50000, 2),
            is_account_active: true,
            last_login_date: None,
            account_created_date: now - Duration::days(created_days_ago),
            created_at: now - Duration::days(created_days_ago),
            updated_at: now,
        }
    }

    #[test]
    fn account_age_counts_whole_days() {
        let user = sample_user(10);
        let now = OffsetDateTime::now_utc();
        let profile = UserProfile::from_user(&user, now);
        assert_eq!(profile.account_age, 10);
    }

    #[test]
    fn account_age_is_idempotent() {
        let user = sample_user(3);
        let now = OffsetDateTime::now_utc();
        let first = UserProfile::from_user(&user, now);
        let second = UserProfile::from_user(&user, now);
        assert_eq!(first.account_age, second.account_age);
        assert_eq!(first.current_balance, second.current_balance);
    }

    #[test]
    fn account_type_parses_known_values_only() {
        assert_eq!("personal".parse::<AccountType>(), Ok(AccountType::Personal));
        assert_eq!("business".parse::<AccountType>(), Ok(AccountType::Business));
        assert_eq!("savings".parse::<AccountType>(), Ok(AccountType::Savings));
        assert!("checking".parse::<AccountType>().is_err());
        assert!("Personal".parse::<AccountType>().is_err());
    }

    #[test]
    fn full_name_validation() {
        assert!(is_valid_full_name("Jordan Rivers"));
        assert!(!is_valid_full_name("J"));
        assert!(!is_valid_full_name("Jordan99"));
        assert!(!is_valid_full_name(&"a".repeat(51)));
    }

    #[test]
    fn adjustment_rejects_zero_amount() {
        let req = AdjustBalanceRequest {
            amount: Decimal::ZERO,
            description: None,
        };
        let err = req.validate().unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors[0].field, "amount");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn adjustment_rejects_out_of_range_amount() {
        let req = AdjustBalanceRequest {
            amount: Decimal::from(2_000_000),
            description: None,
        };
        assert!(req.validate().is_err());

        let req = AdjustBalanceRequest {
            amount: Decimal::from(-2_000_000),
            description: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn adjustment_accepts_negative_in_range_amount() {
        let req = AdjustBalanceRequest {
            amount: Decimal::new(-2550, 2),
            description: Some("  refund correction  ".into()),
        };
        let (amount, description) = req.validate().expect("valid");
        assert_eq!(amount, Decimal::new(-2550, 2));
        assert_eq!(description.as_deref(), Some("refund correction"));
    }
}
