//! Department handlers. Headcount is matched on the department name
//! case-insensitively because user rows store the name as free text.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{AuthUser, Role};
use crate::shared::error::{blocking, ApiError};
use crate::shared::models::schema::departments;
use crate::shared::models::Department;
use crate::shared::state::AppState;

// ===== Request/Response Structures =====

#[derive(Debug, QueryableByName, Serialize)]
pub struct DepartmentRow {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub id: i32,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub name: String,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub head: String,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub total_employees: i64,
}

#[derive(Debug, Deserialize)]
pub struct DepartmentRequest {
    pub name: Option<String>,
    pub head: Option<String>,
}

impl DepartmentRequest {
    fn validated(self) -> Result<(String, String), ApiError> {
        let name = self.name.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let head = self.head.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        match (name, head) {
            (Some(name), Some(head)) => Ok((name, head)),
            _ => Err(ApiError::Validation("Name and head are required".to_string())),
        }
    }
}

// ===== Handlers =====

/// GET /api/departments - All departments with live headcounts
pub async fn list_departments(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<DepartmentRow>>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor])?;

    let conn = state.conn.clone();
    let rows = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let rows = diesel::sql_query(
            "SELECT d.id, d.name, d.head, \
             COALESCE((SELECT COUNT(*) FROM users u \
                 WHERE LOWER(u.department) = LOWER(d.name)), 0) AS total_employees \
             FROM departments d \
             ORDER BY d.name ASC",
        )
        .load::<DepartmentRow>(&mut db_conn)?;
        Ok(rows)
    })
    .await?;

    Ok(Json(rows))
}

/// POST /api/departments - Create, 201 with the new row
pub async fn create_department(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(req): Json<DepartmentRequest>,
) -> Result<(StatusCode, Json<Department>), ApiError> {
    claims.require(&[Role::Admin])?;
    let (name, head) = req.validated()?;

    let conn = state.conn.clone();
    let created = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let created: Department = diesel::insert_into(departments::table)
            .values((departments::name.eq(&name), departments::head.eq(&head)))
            .get_result(&mut db_conn)?;
        Ok(created)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/departments/:id
pub async fn get_department(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<Department>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor])?;

    let conn = state.conn.clone();
    let row = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let row: Option<Department> = departments::table
            .find(id)
            .select(Department::as_select())
            .first(&mut db_conn)
            .optional()?;
        row.ok_or_else(|| ApiError::NotFound("Department not found".to_string()))
    })
    .await?;

    Ok(Json(row))
}

/// PUT /api/departments/:id - Rename or change the head
pub async fn update_department(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<DepartmentRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    claims.require(&[Role::Admin])?;
    let (name, head) = req.validated()?;

    let conn = state.conn.clone();
    let updated = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let updated: Option<Department> = diesel::update(departments::table.find(id))
            .set((departments::name.eq(&name), departments::head.eq(&head)))
            .get_result(&mut db_conn)
            .optional()?;
        updated.ok_or_else(|| ApiError::NotFound("Department not found".to_string()))
    })
    .await?;

    Ok(Json(serde_json::json!({
        "message": "Department updated",
        "department": updated,
    })))
}

/// DELETE /api/departments/:id - 204 whether or not the row existed
pub async fn delete_department(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    claims.require(&[Role::Admin])?;

    let conn = state.conn.clone();
    blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        diesel::delete(departments::table.find(id)).execute(&mut db_conn)?;
        Ok(())
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_department_request_requires_both_fields() {
        let req: DepartmentRequest =
            serde_json::from_value(serde_json::json!({"name": "Engineering"})).unwrap();
        assert!(req.validated().is_err());

        let req: DepartmentRequest =
            serde_json::from_value(serde_json::json!({"name": "  ", "head": "Ada"})).unwrap();
        assert!(req.validated().is_err());

        let req: DepartmentRequest =
            serde_json::from_value(serde_json::json!({"name": "Engineering", "head": "Ada"}))
                .unwrap();
        let (name, head) = req.validated().unwrap();
        assert_eq!(name, "Engineering");
        assert_eq!(head, "Ada");
    }
}
