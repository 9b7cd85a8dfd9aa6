//! Employee directory handlers: lightweight user lookups for pickers,
//! the full employee roster with supervisor names, and the admin-only
//! mutations.

use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{AuthUser, Role};
use crate::shared::error::{blocking, ApiError};
use crate::shared::models::schema::users;
use crate::shared::models::User;
use crate::shared::state::AppState;

// ===== Request/Response Structures =====

#[derive(Debug, Queryable, Serialize)]
pub struct UserName {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Queryable, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub department: String,
    pub role: String,
}

#[derive(Debug, QueryableByName, Serialize)]
pub struct EmployeeRow {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub id: i32,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub name: String,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub email: String,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub department: String,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub role: String,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Integer>)]
    pub supervisor_id: Option<i32>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    pub supervisor_name: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployeeRequest {
    pub name: String,
    pub email: String,
    pub department: String,
    pub role: String,
    pub supervisor_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct AssignSupervisorRequest {
    pub supervisor_id: Option<i32>,
}

// ===== Handlers =====

/// GET /api/users - Id/name pairs for selection lists
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<UserName>>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor])?;

    let conn = state.conn.clone();
    let rows = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let rows: Vec<UserName> = users::table
            .select((users::id, users::name))
            .order(users::name.asc())
            .load(&mut db_conn)?;
        Ok(rows)
    })
    .await?;

    Ok(Json(rows))
}

/// GET /api/users/:id - One user's profile fields
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<UserProfile>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor])?;

    let conn = state.conn.clone();
    let row = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let row: Option<UserProfile> = users::table
            .find(id)
            .select((
                users::id,
                users::name,
                users::email,
                users::department,
                users::role,
            ))
            .first(&mut db_conn)
            .optional()?;
        row.ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    })
    .await?;

    Ok(Json(row))
}

/// GET /api/employees - Full roster with each employee's supervisor name
pub async fn list_employees(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<EmployeeRow>>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor])?;

    let conn = state.conn.clone();
    let rows = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let rows = diesel::sql_query(
            "SELECT u.id, u.name, u.email, u.department, u.role, u.supervisor_id, \
             s.name AS supervisor_name, u.created_at \
             FROM users u \
             LEFT JOIN users s ON u.supervisor_id = s.id \
             ORDER BY u.created_at DESC",
        )
        .load::<EmployeeRow>(&mut db_conn)?;
        Ok(rows)
    })
    .await?;

    Ok(Json(rows))
}

/// GET /api/employees/:id - One employee or 404
pub async fn get_employee(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<UserProfile>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor])?;

    let conn = state.conn.clone();
    let row = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let row: Option<UserProfile> = users::table
            .find(id)
            .select((
                users::id,
                users::name,
                users::email,
                users::department,
                users::role,
            ))
            .first(&mut db_conn)
            .optional()?;
        row.ok_or_else(|| ApiError::NotFound("Employee not found".to_string()))
    })
    .await?;

    Ok(Json(row))
}

/// PUT /api/employees/:id - Replace the editable profile fields
pub async fn update_employee(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<UpdateEmployeeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    claims.require(&[Role::Admin])?;

    if Role::parse(&req.role).is_none() {
        return Err(ApiError::Validation(format!("Unknown role: {}", req.role)));
    }

    let conn = state.conn.clone();
    let updated = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let updated: Option<User> = diesel::update(users::table.find(id))
            .set((
                users::name.eq(&req.name),
                users::email.eq(&req.email),
                users::department.eq(&req.department),
                users::role.eq(&req.role),
                users::supervisor_id.eq(req.supervisor_id),
            ))
            .get_result(&mut db_conn)
            .optional()?;
        updated.ok_or_else(|| ApiError::NotFound("Employee not found".to_string()))
    })
    .await?;

    Ok(Json(serde_json::json!({
        "message": "Employee updated",
        "employee": updated,
    })))
}

/// PUT /api/employees/:id/assign-supervisor - Set or clear the supervisor
pub async fn assign_supervisor(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<AssignSupervisorRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    claims.require(&[Role::Admin])?;

    let conn = state.conn.clone();
    let updated = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let updated: Option<User> = diesel::update(users::table.find(id))
            .set(users::supervisor_id.eq(req.supervisor_id))
            .get_result(&mut db_conn)
            .optional()?;
        updated.ok_or_else(|| ApiError::NotFound("Employee not found".to_string()))
    })
    .await?;

    info!("assigned supervisor {:?} to user {}", req.supervisor_id, id);
    Ok(Json(serde_json::json!({
        "message": "Supervisor assigned",
        "user": updated,
    })))
}

/// DELETE /api/employees/:id
pub async fn delete_employee(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    claims.require(&[Role::Admin])?;

    let conn = state.conn.clone();
    blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let affected = diesel::delete(users::table.find(id)).execute(&mut db_conn)?;
        if affected == 0 {
            return Err(ApiError::NotFound("Employee not found".to_string()));
        }
        Ok(())
    })
    .await?;

    info!("deleted user {}", id);
    Ok(Json(serde_json::json!({ "message": "Employee deleted" })))
}
