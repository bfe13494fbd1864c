use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email_address: String,
    pub account_type: String,
    pub password_hash: String,
    pub current_balance: Decimal,
    pub is_account_active: bool,
    pub last_login_date: Option<OffsetDateTime>,
    pub account_created_date: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub struct NewUser<'a> {
    pub full_name: &'a str,
    pub email_address: &'a str,
    pub account_type: &'a str,
    pub password_hash: &'a str,
}

/// Result of a direct balance adjustment.
#[derive(Debug)]
pub struct BalanceChange {
    pub previous_balance: Decimal,
    pub current_balance: Decimal,
    pub updated_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, full_name, email_address, account_type, password_hash, \
     current_balance, is_account_active, last_login_date, account_created_date, \
     created_at, updated_at";

impl User {
    /// Case-insensitive lookup; addresses are stored lowercased.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email_address = lower($1)"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Persist a new user. The password must already be hashed.
    pub async fn create(db: &PgPool, new: &NewUser<'_>) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (full_name, email_address, account_type, password_hash) \
             VALUES ($1, lower($2), $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new.full_name)
        .bind(new.email_address)
        .bind(new.account_type)
        .bind(new.password_hash)
        .fetch_one(db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::DuplicateEmail
            }
            _ => ApiError::from(e),
        })?;
        Ok(user)
    }

    pub async fn touch_last_login(db: &PgPool, id: Uuid) -> Result<OffsetDateTime, ApiError> {
        let stamp = sqlx::query_scalar::<_, OffsetDateTime>(
            "UPDATE users SET last_login_date = now(), updated_at = now() \
             WHERE id = $1 RETURNING last_login_date",
        )
        .bind(id)
        .fetch_one(db)
        .await?;
        Ok(stamp)
    }

    /// Only `full_name` and `account_type` are profile-mutable.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        full_name: Option<&str>,
        account_type: Option<&str>,
    ) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                full_name = COALESCE($2, full_name), \
                account_type = COALESCE($3, account_type), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(full_name)
        .bind(account_type)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Row-locked read. Serializes all balance mutations for one user:
    /// concurrent transaction creations and direct adjustments queue here.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub async fn set_balance(
        conn: &mut PgConnection,
        id: Uuid,
        balance: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET current_balance = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(balance)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Direct balance adjustment. Does not emit a transaction record; the
    /// ledger fold and `current_balance` diverge once this is used.
    pub async fn adjust_balance(
        db: &PgPool,
        id: Uuid,
        delta: Decimal,
    ) -> Result<BalanceChange, ApiError> {
        let mut tx = db.begin().await?;

        let user = Self::lock_for_update(&mut tx, id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        let previous_balance = user.current_balance;
        let current_balance = previous_balance + delta;
        if current_balance < Decimal::ZERO {
            return Err(ApiError::InsufficientFunds);
        }

        let updated_at = sqlx::query_scalar::<_, OffsetDateTime>(
            "UPDATE users SET current_balance = $2, updated_at = now() \
             WHERE id = $1 RETURNING updated_at",
        )
        .bind(id)
        .bind(current_balance)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(BalanceChange {
            previous_balance,
            current_balance,
            updated_at,
        })
    }
}
