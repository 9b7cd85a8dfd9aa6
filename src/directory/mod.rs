//! User, employee and department directory routes.

pub mod departments;
pub mod employees;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::shared::state::AppState;

pub fn configure_directory_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(employees::list_users))
        .route("/api/users/:id", get(employees::get_user))
        .route("/api/employees", get(employees::list_employees))
        .route("/api/employees/:id", get(employees::get_employee))
        .route("/api/employees/:id", put(employees::update_employee))
        .route(
            "/api/employees/:id/assign-supervisor",
            put(employees::assign_supervisor),
        )
        .route("/api/employees/:id", delete(employees::delete_employee))
        .route("/api/departments", get(departments::list_departments))
        .route("/api/departments", post(departments::create_department))
        .route("/api/departments/:id", get(departments::get_department))
        .route("/api/departments/:id", put(departments::update_department))
        .route("/api/departments/:id", delete(departments::delete_department))
}
