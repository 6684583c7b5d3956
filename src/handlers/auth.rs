// src/handlers/auth.rs

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, RegisterRequest, Role, User, UserResponse},
    utils::{
        hash::{hash_password, verify_password},
        json::AppJson,
        jwt::{bearer_token, sign_jwt, verify_jwt},
    },
};

/// Role granted to a new account. Open registration only creates students;
/// an admin account needs an admin's token on the request.
fn granted_role(
    requested: Option<Role>,
    headers: &HeaderMap,
    secret: &str,
) -> Result<Role, AppError> {
    match requested.unwrap_or(Role::Student) {
        Role::Student => Ok(Role::Student),
        Role::Admin => {
            let claims = bearer_token(headers)
                .map(|token| verify_jwt(token, secret))
                .transpose()?;
            match claims {
                Some(claims) if claims.is_admin() => Ok(Role::Admin),
                _ => Err(AppError::Forbidden(
                    "Only an admin can create admin accounts".to_string(),
                )),
            }
        }
    }
}

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    headers: HeaderMap,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let role = granted_role(payload.role, &headers, &config.jwt_secret)?;
    let hashed_password = hash_password(&payload.password)?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (name, email, password, role)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(role.as_str())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Postgres error code for unique violation is 23505
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict("Email already registered".to_string())
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id,
            name: payload.name,
            email: payload.email,
            role,
        }),
    ))
}

/// Authenticates a user and returns a JWT token.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, role, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&payload.email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    // Same message for unknown email and wrong password.
    let user = user.ok_or(AppError::AuthError("Invalid credentials".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let role = user.role().map_err(AppError::InternalServerError)?;

    let token = sign_jwt(
        user.id,
        &user.email,
        role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            role,
        }
    })))
}
