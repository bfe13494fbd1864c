use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::transactions::dto::{NewTransaction, TransactionFilters, UpdateFields};

#[derive(Debug, Clone, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub transaction_type: String,
    pub amount: Decimal,
    pub description: String,
    pub category: String,
    pub transaction_date: OffsetDateTime,
    pub is_active: bool,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct StatsRow {
    pub total_transactions: i64,
    pub credit_count: i64,
    pub credit_total: Decimal,
    pub debit_count: i64,
    pub debit_total: Decimal,
}

const TRANSACTION_COLUMNS: &str = "id, user_id, transaction_type, amount, description, category, \
     transaction_date, is_active, balance_before, balance_after, created_at, updated_at";

fn push_list_filters<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    user_id: Uuid,
    filters: &'a TransactionFilters,
) {
    qb.push(" WHERE user_id = ").push_bind(user_id);
    qb.push(" AND is_active = TRUE");
    if let Some(t) = &filters.transaction_type {
        qb.push(" AND transaction_type = ").push_bind(t.as_str());
    }
    if let Some(c) = &filters.category {
        qb.push(" AND category ILIKE ").push_bind(format!("%{c}%"));
    }
    if let Some(start) = filters.start_date {
        qb.push(" AND transaction_date >= ").push_bind(start);
    }
    if let Some(end) = filters.end_date {
        qb.push(" AND transaction_date <= ").push_bind(end);
    }
}

impl Transaction {
    /// Insert within an open unit of work; the caller owns the commit.
    pub async fn insert(
        conn: &mut PgConnection,
        user_id: Uuid,
        new: &NewTransaction,
        balance_before: Decimal,
        balance_after: Decimal,
    ) -> Result<Transaction, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(&format!(
            "INSERT INTO transactions \
                (user_id, transaction_type, amount, description, category, \
                 transaction_date, balance_before, balance_after) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(new.transaction_type.as_str())
        .bind(new.amount)
        .bind(&new.description)
        .bind(&new.category)
        .bind(new.transaction_date)
        .bind(balance_before)
        .bind(balance_after)
        .fetch_one(conn)
        .await
    }

    /// Owner-scoped lookup over active rows; absence is the caller's call.
    pub async fn find_active(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Transaction>, ApiError> {
        let row = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE id = $1 AND user_id = $2 AND is_active = TRUE"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn update_fields(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
        fields: &UpdateFields,
    ) -> Result<Option<Transaction>, ApiError> {
        let row = sqlx::query_as::<_, Transaction>(&format!(
            "UPDATE transactions SET \
                description = COALESCE($3, description), \
                category = COALESCE($4, category), \
                transaction_date = COALESCE($5, transaction_date), \
                updated_at = now() \
             WHERE id = $1 AND user_id = $2 AND is_active = TRUE \
             RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(fields.description.as_deref())
        .bind(fields.category.as_deref())
        .bind(fields.transaction_date)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Marks the row inactive. The user's balance is intentionally left
    /// untouched; the row only disappears from queries, stats, and future
    /// balance folds.
    pub async fn soft_delete(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, ApiError> {
        let deleted = sqlx::query_scalar::<_, Uuid>(
            "UPDATE transactions SET is_active = FALSE, updated_at = now() \
             WHERE id = $1 AND user_id = $2 AND is_active = TRUE \
             RETURNING id",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(deleted)
    }

    pub async fn list_with_filters(
        db: &PgPool,
        user_id: Uuid,
        filters: &TransactionFilters,
    ) -> Result<(Vec<Transaction>, i64), ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions"
        ));
        push_list_filters(&mut qb, user_id, filters);
        qb.push(" ORDER BY ")
            .push(filters.sort_col)
            .push(if filters.descending { " DESC" } else { " ASC" });
        qb.push(" LIMIT ")
            .push_bind(filters.limit)
            .push(" OFFSET ")
            .push_bind(filters.offset());
        let rows = qb
            .build_query_as::<Transaction>()
            .fetch_all(db)
            .await?;

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM transactions");
        push_list_filters(&mut count_qb, user_id, filters);
        let total_count: i64 = count_qb.build_query_scalar().fetch_one(db).await?;

        Ok((rows, total_count))
    }

    pub async fn stats(
        db: &PgPool,
        user_id: Uuid,
        start_date: Option<OffsetDateTime>,
        end_date: Option<OffsetDateTime>,
    ) -> Result<StatsRow, ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) AS total_transactions, \
             COUNT(*) FILTER (WHERE transaction_type = 'credit') AS credit_count, \
             COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'credit'), 0) AS credit_total, \
             COUNT(*) FILTER (WHERE transaction_type = 'debit') AS debit_count, \
             COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'debit'), 0) AS debit_total \
             FROM transactions WHERE user_id = ",
        );
        qb.push_bind(user_id);
        qb.push(" AND is_active = TRUE");
        if let Some(start) = start_date {
            qb.push(" AND transaction_date >= ").push_bind(start);
        }
        if let Some(end) = end_date {
            qb.push(" AND transaction_date <= ").push_bind(end);
        }
        let row = qb.build_query_as::<StatsRow>().fetch_one(db).await?;
        Ok(row)
    }
}
