//! Portal settings, stored as a single row with a fixed id.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use diesel::prelude::*;
use diesel::upsert::excluded;
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::{AuthUser, Role};
use crate::shared::error::{blocking, ApiError};
use crate::shared::models::schema::settings;
use crate::shared::models::SettingsRow;
use crate::shared::state::AppState;

const SETTINGS_ROW_ID: i32 = 1;

pub fn configure_settings_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/settings", get(get_settings))
        .route("/api/settings", post(save_settings))
}

#[derive(Debug, Deserialize)]
pub struct SaveSettingsRequest {
    #[serde(rename = "companyName")]
    pub company_name: String,
    #[serde(rename = "maintenanceMode", default)]
    pub maintenance_mode: bool,
    #[serde(rename = "defaultLeaveDays")]
    pub default_leave_days: i32,
}

/// GET /api/settings - The singleton row, or an empty object before the
/// first save
async fn get_settings(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor])?;

    let conn = state.conn.clone();
    let row = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let row: Option<SettingsRow> = settings::table
            .select(SettingsRow::as_select())
            .first(&mut db_conn)
            .optional()?;
        Ok(row)
    })
    .await?;

    let body = match row {
        Some(row) => serde_json::to_value(row)
            .map_err(|e| ApiError::Internal(format!("serialize settings: {}", e)))?,
        None => serde_json::json!({}),
    };
    Ok(Json(body))
}

/// POST /api/settings - Upsert the singleton row
async fn save_settings(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(req): Json<SaveSettingsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    claims.require(&[Role::Admin])?;

    let conn = state.conn.clone();
    blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        diesel::insert_into(settings::table)
            .values((
                settings::id.eq(SETTINGS_ROW_ID),
                settings::company_name.eq(&req.company_name),
                settings::maintenance_mode.eq(req.maintenance_mode),
                settings::default_leave_days.eq(req.default_leave_days),
            ))
            .on_conflict(settings::id)
            .do_update()
            .set((
                settings::company_name.eq(excluded(settings::company_name)),
                settings::maintenance_mode.eq(excluded(settings::maintenance_mode)),
                settings::default_leave_days.eq(excluded(settings::default_leave_days)),
            ))
            .execute(&mut db_conn)?;
        Ok(())
    })
    .await?;

    Ok(Json(serde_json::json!({ "message": "Settings updated" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_request_uses_camel_case_keys() {
        let req: SaveSettingsRequest = serde_json::from_value(serde_json::json!({
            "companyName": "Acme",
            "maintenanceMode": true,
            "defaultLeaveDays": 21
        }))
        .unwrap();
        assert_eq!(req.company_name, "Acme");
        assert!(req.maintenance_mode);
        assert_eq!(req.default_leave_days, 21);
    }

    #[test]
    fn test_maintenance_mode_defaults_off() {
        let req: SaveSettingsRequest = serde_json::from_value(serde_json::json!({
            "companyName": "Acme",
            "defaultLeaveDays": 14
        }))
        .unwrap();
        assert!(!req.maintenance_mode);
    }
}
