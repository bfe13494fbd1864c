use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthData, LoginRequest, SignupRequest},
        jwt::{CurrentUser, JwtKeys},
        password::{hash_password, verify_password},
    },
    error::{ApiError, ApiResponse},
    state::AppState,
    users::{
        dto::UserProfile,
        repo::{NewUser, User},
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(profile))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthData>>), ApiError> {
    let valid = payload.validate()?;

    if User::find_by_email(&state.db, &valid.email_address)
        .await?
        .is_some()
    {
        warn!(email = %valid.email_address, "signup with taken email");
        return Err(ApiError::DuplicateEmail);
    }

    let hash = hash_password(&valid.password)?;

    let mut user = User::create(
        &state.db,
        &NewUser {
            full_name: &valid.full_name,
            email_address: &valid.email_address,
            account_type: valid.account_type.as_str(),
            password_hash: &hash,
        },
    )
    .await?;

    let keys = JwtKeys::from_ref(&state);
    let auth_token = keys.sign(user.id)?;

    user.last_login_date = Some(User::touch_last_login(&state.db, user.id).await?);

    info!(user_id = %user.id, email = %user.email_address, "user registered");
    Ok((
        StatusCode::CREATED,
        ApiResponse::new(
            "Account created successfully! Welcome to Finance Tracker.",
            AuthData {
                user: UserProfile::from_user(&user, OffsetDateTime::now_utc()),
                auth_token,
            },
        ),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthData>>, ApiError> {
    let (email_address, password) = payload.validate()?;

    let mut user = User::find_by_email(&state.db, &email_address)
        .await?
        .ok_or_else(|| {
            warn!(email = %email_address, "login unknown email");
            ApiError::InvalidCredentials
        })?;

    if !user.is_account_active {
        warn!(user_id = %user.id, "login on deactivated account");
        return Err(ApiError::AccountDeactivated);
    }

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let auth_token = keys.sign(user.id)?;

    user.last_login_date = Some(User::touch_last_login(&state.db, user.id).await?);

    info!(user_id = %user.id, email = %user.email_address, "user logged in");
    Ok(ApiResponse::new(
        "Login successful! Welcome back.",
        AuthData {
            user: UserProfile::from_user(&user, OffsetDateTime::now_utc()),
            auth_token,
        },
    ))
}

#[derive(Debug, serde::Serialize)]
pub struct ProfileData {
    user: UserProfile,
}

#[instrument(skip(user))]
pub async fn profile(
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<ProfileData>>, ApiError> {
    Ok(ApiResponse::new(
        "Profile retrieved successfully",
        ProfileData {
            user: UserProfile::from_user(&user, OffsetDateTime::now_utc()),
        },
    ))
}
