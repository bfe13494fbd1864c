use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    auth::jwt::CurrentUser,
    error::{ApiError, ApiResponse},
    state::AppState,
    users::{
        dto::{
            AdjustBalanceRequest, AdjustBalanceResponse, BalanceResponse, UpdateProfileRequest,
            UserProfile,
        },
        repo::User,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/profile", get(get_profile).put(update_profile))
        .route("/users/balance", get(get_balance).put(adjust_balance))
}

#[derive(Debug, Serialize)]
pub struct ProfileData {
    user: UserProfile,
}

#[instrument(skip(user))]
pub async fn get_profile(
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<ProfileData>>, ApiError> {
    let profile = UserProfile::from_user(&user, OffsetDateTime::now_utc());
    Ok(ApiResponse::new(
        "User profile and balance retrieved successfully",
        ProfileData { user: profile },
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<ProfileData>>, ApiError> {
    let (full_name, account_type) = payload.validate()?;

    let updated = User::update_profile(
        &state.db,
        user.id,
        full_name.as_deref(),
        account_type.map(|t| t.as_str()),
    )
    .await?;

    info!(user_id = %user.id, "profile updated");
    Ok(ApiResponse::new(
        "Profile updated successfully",
        ProfileData {
            user: UserProfile::from_user(&updated, OffsetDateTime::now_utc()),
        },
    ))
}

#[instrument(skip(user))]
pub async fn get_balance(
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<BalanceResponse>>, ApiError> {
    Ok(ApiResponse::new(
        "Balance retrieved successfully",
        BalanceResponse {
            current_balance: user.current_balance,
            currency: "USD",
            last_updated: user.updated_at,
        },
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn adjust_balance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<AdjustBalanceRequest>,
) -> Result<Json<ApiResponse<AdjustBalanceResponse>>, ApiError> {
    let (amount, description) = payload.validate()?;

    let change = User::adjust_balance(&state.db, user.id, amount).await?;

    info!(
        user_id = %user.id,
        amount = %amount,
        balance = %change.current_balance,
        "balance adjusted"
    );
    Ok(ApiResponse::new(
        "Balance updated successfully",
        AdjustBalanceResponse {
            previous_balance: change.previous_balance,
            current_balance: change.current_balance,
            amount_changed: amount,
            description: description.unwrap_or_else(|| "Balance adjustment".to_string()),
            updated_at: change.updated_at,
        },
    ))
}
