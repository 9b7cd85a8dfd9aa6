//! Combines the per-module routers into the portal's single API surface.

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // ===== Authentication =====
        .merge(crate::auth::configure_auth_routes())
        // ===== Appraisals =====
        .merge(crate::appraisals::configure_appraisal_routes())
        // ===== Goals =====
        .merge(crate::goals::configure_goal_routes())
        // ===== Dashboards =====
        .merge(crate::dashboards::configure_dashboard_routes())
        // ===== Users, Employees & Departments =====
        .merge(crate::directory::configure_directory_routes())
        // ===== Settings =====
        .merge(crate::settings::configure_settings_routes())
}
