//! Registration, login and profile routes, plus password hashing.

pub mod gate;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::shared::error::{blocking, ApiError};
use crate::shared::models::schema::users;
use crate::shared::models::User;
use crate::shared::state::AppState;

pub use gate::{AuthUser, Claims, Role};

pub fn configure_auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/change-password", post(change_password))
}

// ===== Request/Response Structures =====

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub department: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Debug, Serialize)]
pub struct ProfileUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(rename = "currentPassword")]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

// ===== Handlers =====

/// POST /api/auth/register - Create an account
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let role = match &req.role {
        Some(r) => Role::parse(r)
            .ok_or_else(|| ApiError::Validation(format!("Unknown role: {}", r)))?
            .as_str()
            .to_string(),
        None => Role::Employee.as_str().to_string(),
    };
    let department = req.department.unwrap_or_else(|| "None".to_string());
    let password_hash = hash_password(&req.password)?;

    let conn = state.conn.clone();
    blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;

        let existing: Option<i32> = users::table
            .filter(users::email.eq(&req.email))
            .select(users::id)
            .first(&mut db_conn)
            .optional()?;
        if existing.is_some() {
            return Err(ApiError::Validation(
                "User already exists with this email".to_string(),
            ));
        }

        diesel::insert_into(users::table)
            .values((
                users::name.eq(&req.name),
                users::email.eq(&req.email),
                users::password.eq(&password_hash),
                users::role.eq(&role),
                users::department.eq(&department),
            ))
            .execute(&mut db_conn)?;
        Ok(())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "User registered successfully" })),
    ))
}

/// POST /api/auth/login - Exchange credentials for a bearer token
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let conn = state.conn.clone();
    let email = req.email.clone();
    let user = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let user: Option<User> = users::table
            .filter(users::email.eq(&email))
            .select(User::as_select())
            .first(&mut db_conn)
            .optional()?;
        Ok(user)
    })
    .await?;

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());
    let user = user.ok_or_else(invalid)?;
    if !verify_password(&req.password, &user.password) {
        return Err(invalid());
    }

    let token = gate::issue_token(user.id, &user.role, &user.department)?;
    info!("user {} logged in", user.id);

    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        },
    }))
}

/// GET /api/auth/me - Stored profile for the token's subject
async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor, Role::Employee])?;

    let conn = state.conn.clone();
    let user_id = claims.id;
    let profile = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let row: Option<(i32, String, String, String, String)> = users::table
            .filter(users::id.eq(user_id))
            .select((
                users::id,
                users::name,
                users::email,
                users::role,
                users::department,
            ))
            .first(&mut db_conn)
            .optional()?;
        row.ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    })
    .await?;

    Ok(Json(serde_json::json!({
        "user": ProfileUser {
            id: profile.0,
            name: profile.1,
            email: profile.2,
            role: profile.3,
            department: profile.4,
        }
    })))
}

/// POST /api/auth/change-password - Re-hash after verifying the current one
async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor, Role::Employee])?;

    let conn = state.conn.clone();
    let user_id = claims.id;
    let stored = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let hash: Option<String> = users::table
            .filter(users::id.eq(user_id))
            .select(users::password)
            .first(&mut db_conn)
            .optional()?;
        hash.ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    })
    .await?;

    if !verify_password(&req.current_password, &stored) {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let new_hash = hash_password(&req.new_password)?;
    let conn = state.conn.clone();
    blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        diesel::update(users::table.filter(users::id.eq(user_id)))
            .set(users::password.eq(&new_hash))
            .execute(&mut db_conn)?;
        Ok(())
    })
    .await?;

    Ok(Json(serde_json::json!({ "message": "Password changed successfully" })))
}

// ===== Password hashing =====

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }
}
