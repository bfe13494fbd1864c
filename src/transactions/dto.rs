use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::{format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime};
use uuid::Uuid;

use crate::error::{ApiError, FieldError};
use crate::transactions::repo::{StatsRow, Transaction};

pub const MIN_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl FromStr for TransactionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            _ => Err(()),
        }
    }
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD` (taken as midnight UTC).
pub(crate) fn parse_datetime(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(dt);
    }
    let date = time::Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()?;
    Some(date.midnight().assume_utc())
}

/// `+$X.XX` for credits, `-$X.XX` for debits. Derived on every read.
pub(crate) fn formatted_amount(transaction_type: &str, amount: Decimal) -> String {
    let sign = if transaction_type == "credit" { "+" } else { "-" };
    format!("{sign}${amount:.2}")
}

pub(crate) fn age_in_days(when: OffsetDateTime, now: OffsetDateTime) -> i64 {
    (now - when).whole_days()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub transaction_type: String,
    pub amount: Decimal,
    pub description: String,
    pub category: Option<String>,
    pub transaction_date: Option<String>,
}

/// Creation input after boundary validation.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub description: String,
    pub category: String,
    pub transaction_date: OffsetDateTime,
}

impl CreateTransactionRequest {
    pub fn validate(self, now: OffsetDateTime) -> Result<NewTransaction, ApiError> {
        let mut errors = Vec::new();

        let transaction_type = self
            .transaction_type
            .parse::<TransactionType>()
            .unwrap_or_else(|()| {
                errors.push(FieldError::new(
                    "transactionType",
                    "Transaction type must be either credit or debit",
                    Some(serde_json::json!(self.transaction_type)),
                ));
                TransactionType::Credit
            });

        if self.amount < MIN_AMOUNT || self.amount > MAX_AMOUNT {
            errors.push(FieldError::new(
                "amount",
                "Amount must be a positive number between 0.01 and 1,000,000",
                Some(serde_json::json!(self.amount.to_string())),
            ));
        }

        let description = self.description.trim().to_string();
        if !(3..=200).contains(&description.len()) {
            errors.push(FieldError::new(
                "description",
                "Description must be between 3 and 200 characters",
                Some(serde_json::json!(self.description)),
            ));
        }

        let category = match self.category.map(|c| c.trim().to_string()) {
            Some(c) if !c.is_empty() => {
                if c.len() > 50 {
                    errors.push(FieldError::new(
                        "category",
                        "Category cannot exceed 50 characters",
                        Some(serde_json::json!(c)),
                    ));
                }
                c
            }
            _ => "General".to_string(),
        };

        let transaction_date = match self.transaction_date.as_deref() {
            None => now,
            Some(raw) => parse_datetime(raw).unwrap_or_else(|| {
                errors.push(FieldError::new(
                    "transactionDate",
                    "Transaction date must be a valid ISO 8601 date format",
                    Some(serde_json::json!(raw)),
                ));
                now
            }),
        };

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(NewTransaction {
            transaction_type,
            amount: self.amount,
            description,
            category,
            transaction_date,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransactionRequest {
    pub description: Option<String>,
    pub category: Option<String>,
    pub transaction_date: Option<String>,
}

/// The only mutable transaction fields; amounts, types, and balance
/// snapshots are frozen at creation.
#[derive(Debug, Clone)]
pub struct UpdateFields {
    pub description: Option<String>,
    pub category: Option<String>,
    pub transaction_date: Option<OffsetDateTime>,
}

impl UpdateTransactionRequest {
    pub fn validate(self) -> Result<UpdateFields, ApiError> {
        let mut errors = Vec::new();

        let description = self.description.map(|d| d.trim().to_string());
        if let Some(d) = &description {
            if !(3..=200).contains(&d.len()) {
                errors.push(FieldError::new(
                    "description",
                    "Description must be between 3 and 200 characters",
                    Some(serde_json::json!(d)),
                ));
            }
        }

        let category = self.category.map(|c| c.trim().to_string());
        if let Some(c) = &category {
            if c.len() > 50 {
                errors.push(FieldError::new(
                    "category",
                    "Category cannot exceed 50 characters",
                    Some(serde_json::json!(c)),
                ));
            }
        }

        let transaction_date = match self.transaction_date.as_deref() {
            None => None,
            Some(raw) => match parse_datetime(raw) {
                Some(dt) => Some(dt),
                None => {
                    errors.push(FieldError::new(
                        "transactionDate",
                        "Transaction date must be a valid ISO 8601 date format",
                        Some(serde_json::json!(raw)),
                    ));
                    None
                }
            },
        };

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(UpdateFields {
            description,
            category,
            transaction_date,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub transaction_type: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Validated list parameters ready for SQL.
#[derive(Debug)]
pub struct TransactionFilters {
    pub page: i64,
    pub limit: i64,
    pub transaction_type: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<OffsetDateTime>,
    pub end_date: Option<OffsetDateTime>,
    pub sort_col: &'static str,
    pub descending: bool,
}

impl TransactionFilters {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

fn parse_page_param(raw: Option<&str>, default: i64) -> Result<i64, ApiError> {
    match raw {
        None => Ok(default),
        Some(s) => s.parse::<i64>().map_err(|_| ApiError::InvalidPagination),
    }
}

impl ListQuery {
    pub fn into_filters(self) -> Result<TransactionFilters, ApiError> {
        let page = parse_page_param(self.page.as_deref(), 1)?;
        let limit = parse_page_param(self.limit.as_deref(), 10)?;
        if page < 1 || limit < 1 || limit > 100 {
            return Err(ApiError::InvalidPagination);
        }

        let start_date = match self.start_date.as_deref() {
            None => None,
            Some(raw) => Some(parse_datetime(raw).ok_or(ApiError::InvalidDateFormat("start"))?),
        };
        let end_date = match self.end_date.as_deref() {
            None => None,
            Some(raw) => Some(parse_datetime(raw).ok_or(ApiError::InvalidDateFormat("end"))?),
        };

        // Sort columns are whitelisted; anything else falls back to the default.
        let sort_col = match self.sort_by.as_deref() {
            Some("amount") => "amount",
            Some("createdAt") => "created_at",
            _ => "transaction_date",
        };
        let descending = !matches!(self.sort_order.as_deref(), Some("asc"));

        Ok(TransactionFilters {
            page,
            limit,
            transaction_type: self.transaction_type,
            category: self.category,
            start_date,
            end_date,
            sort_col,
            descending,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl StatsQuery {
    pub fn parse(self) -> Result<(Option<OffsetDateTime>, Option<OffsetDateTime>), ApiError> {
        let start = match self.start_date.as_deref() {
            None => None,
            Some(raw) => Some(parse_datetime(raw).ok_or(ApiError::InvalidDateFormat("start"))?),
        };
        let end = match self.end_date.as_deref() {
            None => None,
            Some(raw) => Some(parse_datetime(raw).ok_or(ApiError::InvalidDateFormat("end"))?),
        };
        Ok((start, end))
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub limit: i64,
}

impl PaginationMeta {
    pub fn compute(page: i64, limit: i64, total_count: i64) -> Self {
        let total_pages = (total_count + limit - 1) / limit;
        Self {
            current_page: page,
            total_pages,
            total_count,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
            limit,
        }
    }
}

/// Transaction payload for list/get/update responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    pub transaction_id: Uuid,
    pub transaction_type: String,
    pub amount: Decimal,
    pub formatted_amount: String,
    pub description: String,
    pub category: String,
    #[serde(with = "time::serde::rfc3339")]
    pub transaction_date: OffsetDateTime,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub transaction_age: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TransactionData {
    pub fn from_row(t: &Transaction, now: OffsetDateTime) -> Self {
        Self {
            transaction_id: t.id,
            transaction_type: t.transaction_type.clone(),
            amount: t.amount,
            formatted_amount: formatted_amount(&t.transaction_type, t.amount),
            description: t.description.clone(),
            category: t.category.clone(),
            transaction_date: t.transaction_date,
            balance_before: t.balance_before,
            balance_after: t.balance_after,
            transaction_age: age_in_days(t.transaction_date, now),
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Creation response carries the post-commit balance instead of the age.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTransaction {
    pub transaction_id: Uuid,
    pub transaction_type: String,
    pub amount: Decimal,
    pub formatted_amount: String,
    pub description: String,
    pub category: String,
    #[serde(with = "time::serde::rfc3339")]
    pub transaction_date: OffsetDateTime,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub current_balance: Decimal,
}

impl CreatedTransaction {
    pub fn from_row(t: &Transaction, current_balance: Decimal) -> Self {
        Self {
            transaction_id: t.id,
            transaction_type: t.transaction_type.clone(),
            amount: t.amount,
            formatted_amount: formatted_amount(&t.transaction_type, t.amount),
            description: t.description.clone(),
            category: t.category.clone(),
            transaction_date: t.transaction_date,
            balance_before: t.balance_before,
            balance_after: t.balance_after,
            current_balance,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypeStats {
    pub count: i64,
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    pub total_transactions: i64,
    pub credit_transactions: TypeStats,
    pub debit_transactions: TypeStats,
    pub net_amount: Decimal,
}

impl From<StatsRow> for StatsData {
    fn from(row: StatsRow) -> Self {
        Self {
            total_transactions: row.total_transactions,
            credit_transactions: TypeStats {
                count: row.credit_count,
                total_amount: row.credit_total,
            },
            debit_transactions: TypeStats {
                count: row.debit_count,
                total_amount: row.debit_total,
            },
            net_amount: row.credit_total - row.debit_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn base_create() -> CreateTransactionRequest {
        CreateTransactionRequest {
            transaction_type: "credit".into(),
            amount: Decimal::new(50000, 2),
            description: "Salary deposit".into(),
            category: None,
            transaction_date: None,
        }
    }

    #[test]
    fn create_defaults_category_and_date() {
        let now = OffsetDateTime::now_utc();
        let new = base_create().validate(now).expect("valid");
        assert_eq!(new.category, "General");
        assert_eq!(new.transaction_date, now);
        assert_eq!(new.transaction_type, TransactionType::Credit);
    }

    #[test]
    fn create_rejects_non_positive_and_oversized_amounts() {
        let now = OffsetDateTime::now_utc();

        let mut req = base_create();
        req.amount = Decimal::ZERO;
        assert!(req.validate(now).is_err());

        let mut req = base_create();
        req.amount = Decimal::new(-100, 2);
        assert!(req.validate(now).is_err());

        let mut req = base_create();
        req.amount = MAX_AMOUNT + Decimal::new(1, 2);
        assert!(req.validate(now).is_err());

        let mut req = base_create();
        req.amount = MAX_AMOUNT;
        assert!(req.validate(now).is_ok());
    }

    #[test]
    fn create_rejects_bad_type_description_and_date() {
        let now = OffsetDateTime::now_utc();

        let mut req = base_create();
        req.transaction_type = "transfer".into();
        req.description = "ab".into();
        req.transaction_date = Some("not-a-date".into());
        let err = req.validate(now).unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(
                    fields,
                    vec!["transactionType", "description", "transactionDate"]
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_accepts_backdated_transactions() {
        let now = OffsetDateTime::now_utc();
        let mut req = base_create();
        req.transaction_date = Some("2024-01-15T10:30:00Z".into());
        let new = req.validate(now).expect("valid");
        assert_eq!(new.transaction_date.year(), 2024);
    }

    #[test]
    fn datetime_parsing_accepts_both_shapes() {
        let full = parse_datetime("2024-01-15T10:30:00Z").expect("rfc3339");
        assert_eq!(full.hour(), 10);

        let bare = parse_datetime("2024-01-15").expect("date only");
        assert_eq!(bare.hour(), 0);
        assert_eq!(bare.day(), 15);

        assert!(parse_datetime("15/01/2024").is_none());
        assert!(parse_datetime("soon").is_none());
    }

    #[test]
    fn formatted_amount_is_signed_and_padded() {
        assert_eq!(
            formatted_amount("credit", Decimal::new(50000, 2)),
            "+$500.00"
        );
        assert_eq!(formatted_amount("debit", Decimal::new(2550, 2)), "-$25.50");
        assert_eq!(formatted_amount("credit", Decimal::new(5, 1)), "+$0.50");
    }

    #[test]
    fn derivations_are_idempotent() {
        let now = OffsetDateTime::now_utc();
        let when = now - Duration::days(3);
        assert_eq!(age_in_days(when, now), 3);
        assert_eq!(age_in_days(when, now), age_in_days(when, now));
        assert_eq!(
            formatted_amount("debit", Decimal::new(100, 2)),
            formatted_amount("debit", Decimal::new(100, 2))
        );
    }

    fn query(page: Option<&str>, limit: Option<&str>) -> ListQuery {
        ListQuery {
            page: page.map(String::from),
            limit: limit.map(String::from),
            transaction_type: None,
            category: None,
            start_date: None,
            end_date: None,
            sort_by: None,
            sort_order: None,
        }
    }

    #[test]
    fn pagination_bounds() {
        assert!(query(Some("1"), Some("100")).into_filters().is_ok());
        assert!(matches!(
            query(Some("1"), Some("101")).into_filters(),
            Err(ApiError::InvalidPagination)
        ));
        assert!(matches!(
            query(Some("0"), Some("10")).into_filters(),
            Err(ApiError::InvalidPagination)
        ));
        assert!(matches!(
            query(Some("abc"), None).into_filters(),
            Err(ApiError::InvalidPagination)
        ));

        let defaults = query(None, None).into_filters().expect("defaults");
        assert_eq!(defaults.page, 1);
        assert_eq!(defaults.limit, 10);
        assert_eq!(defaults.sort_col, "transaction_date");
        assert!(defaults.descending);
    }

    #[test]
    fn sort_whitelist() {
        let mut q = query(None, None);
        q.sort_by = Some("amount".into());
        q.sort_order = Some("asc".into());
        let f = q.into_filters().expect("valid");
        assert_eq!(f.sort_col, "amount");
        assert!(!f.descending);

        let mut q = query(None, None);
        q.sort_by = Some("passwordHash".into());
        let f = q.into_filters().expect("valid");
        assert_eq!(f.sort_col, "transaction_date");
    }

    #[test]
    fn malformed_date_filters_are_rejected() {
        let mut q = query(None, None);
        q.start_date = Some("yesterday".into());
        assert!(matches!(
            q.into_filters(),
            Err(ApiError::InvalidDateFormat("start"))
        ));

        let mut q = query(None, None);
        q.end_date = Some("2024-13-45".into());
        assert!(matches!(
            q.into_filters(),
            Err(ApiError::InvalidDateFormat("end"))
        ));
    }

    #[test]
    fn pagination_meta_math() {
        let meta = PaginationMeta::compute(2, 10, 25);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next_page);
        assert!(meta.has_prev_page);

        let exact = PaginationMeta::compute(1, 10, 20);
        assert_eq!(exact.total_pages, 2);
        assert!(exact.has_next_page);
        assert!(!exact.has_prev_page);
    }

    #[test]
    fn empty_result_still_has_valid_pagination() {
        let meta = PaginationMeta::compute(1, 10, 0);
        assert_eq!(meta.total_pages, 0);
        assert_eq!(meta.total_count, 0);
        assert!(!meta.has_next_page);
        assert!(!meta.has_prev_page);
    }

    #[test]
    fn stats_net_amount_is_credits_minus_debits() {
        let data = StatsData::from(StatsRow {
            total_transactions: 5,
            credit_count: 3,
            credit_total: Decimal::new(90000, 2),
            debit_count: 2,
            debit_total: Decimal::new(35000, 2),
        });
        assert_eq!(data.net_amount, Decimal::new(55000, 2));
        assert_eq!(data.credit_transactions.count, 3);
        assert_eq!(data.debit_transactions.total_amount, Decimal::new(35000, 2));
    }
}
