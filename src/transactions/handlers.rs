use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::CurrentUser,
    error::{ApiError, ApiResponse},
    state::AppState,
    transactions::{
        dto::{
            CreateTransactionRequest, CreatedTransaction, ListQuery, PaginationMeta, StatsData,
            StatsQuery, TransactionData, UpdateTransactionRequest,
        },
        repo::Transaction,
        service,
    },
};

pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route("/transactions/stats", get(get_stats))
        .route(
            "/transactions/:id",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidId)
}

#[derive(Debug, Serialize)]
pub struct CreateData {
    transaction: CreatedTransaction,
}

#[instrument(skip(state, user, payload))]
pub async fn create_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateData>>), ApiError> {
    let new = payload.validate(OffsetDateTime::now_utc())?;

    let (record, current_balance) = service::create_transaction(&state.db, user.id, new).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::new(
            "Transaction created successfully",
            CreateData {
                transaction: CreatedTransaction::from_row(&record, current_balance),
            },
        ),
    ))
}

#[derive(Debug, Serialize)]
pub struct ListData {
    transactions: Vec<TransactionData>,
    pagination: PaginationMeta,
}

#[instrument(skip(state, user, query))]
pub async fn list_transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<ListData>>, ApiError> {
    let filters = query.into_filters()?;

    let (rows, total_count) = Transaction::list_with_filters(&state.db, user.id, &filters).await?;

    let now = OffsetDateTime::now_utc();
    let transactions = rows
        .iter()
        .map(|t| TransactionData::from_row(t, now))
        .collect();

    Ok(ApiResponse::new(
        "Transactions retrieved successfully",
        ListData {
            transactions,
            pagination: PaginationMeta::compute(filters.page, filters.limit, total_count),
        },
    ))
}

#[derive(Debug, Serialize)]
pub struct StatsPayload {
    statistics: StatsData,
}

#[instrument(skip(state, user, query))]
pub async fn get_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<StatsPayload>>, ApiError> {
    let (start_date, end_date) = query.parse()?;

    let row = Transaction::stats(&state.db, user.id, start_date, end_date).await?;

    Ok(ApiResponse::new(
        "Transaction statistics retrieved successfully",
        StatsPayload {
            statistics: StatsData::from(row),
        },
    ))
}

#[derive(Debug, Serialize)]
pub struct TransactionPayload {
    transaction: TransactionData,
}

#[instrument(skip(state, user))]
pub async fn get_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TransactionPayload>>, ApiError> {
    let id = parse_id(&id)?;

    let record = Transaction::find_active(&state.db, id, user.id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(ApiResponse::new(
        "Transaction retrieved successfully",
        TransactionPayload {
            transaction: TransactionData::from_row(&record, OffsetDateTime::now_utc()),
        },
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn update_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTransactionRequest>,
) -> Result<Json<ApiResponse<TransactionPayload>>, ApiError> {
    let id = parse_id(&id)?;
    let fields = payload.validate()?;

    let record = Transaction::update_fields(&state.db, id, user.id, &fields)
        .await?
        .ok_or(ApiError::NotFound)?;

    info!(user_id = %user.id, transaction_id = %id, "transaction updated");
    Ok(ApiResponse::new(
        "Transaction updated successfully",
        TransactionPayload {
            transaction: TransactionData::from_row(&record, OffsetDateTime::now_utc()),
        },
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteData {
    deleted_transaction_id: Uuid,
    current_balance: Decimal,
}

#[instrument(skip(state, user))]
pub async fn delete_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeleteData>>, ApiError> {
    let id = parse_id(&id)?;

    let deleted_id = Transaction::soft_delete(&state.db, id, user.id)
        .await?
        .ok_or(ApiError::NotFound)?;

    info!(user_id = %user.id, transaction_id = %deleted_id, "transaction soft deleted");
    Ok(ApiResponse::new(
        "Transaction deleted successfully",
        DeleteData {
            deleted_transaction_id: deleted_id,
            // Soft deletion never moves the balance.
            current_balance: user.current_balance,
        },
    ))
}
