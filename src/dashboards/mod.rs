//! Role-specific dashboard aggregations.
//!
//! These are the read-heavy endpoints; anything beyond a simple count
//! goes through `sql_query` so the grouping and COALESCE defaults stay
//! visible in one place. Averages are cast to `float8` so zero-data
//! groups serialize as `0`, never null.

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{AuthUser, Role};
use crate::shared::error::{blocking, ApiError};
use crate::shared::models::schema::{appraisal_periods, appraisals, goals, users};
use crate::shared::models::{Appraisal, Goal};
use crate::shared::state::AppState;

pub fn configure_dashboard_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dashboard/stats", get(admin_stats))
        .route("/api/dashboard/activity", get(admin_activity))
        .route("/api/dashboard/supervisor", get(supervisor_dashboard))
        .route("/api/dashboard/employee", get(employee_dashboard))
}

// ===== Row types =====

#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub total_employees: i64,
    pub total_departments: i64,
    pub completed_appraisals: i64,
    pub pending_appraisals: i64,
}

#[derive(Debug, Queryable, Serialize)]
pub struct RecentUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub department: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, QueryableByName, Serialize)]
pub struct DepartmentStatsRow {
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub department: String,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub employees: i64,
    #[diesel(sql_type = diesel::sql_types::Double)]
    pub completion_rate: f64,
    #[diesel(sql_type = diesel::sql_types::Double)]
    pub avg_rating: f64,
}

#[derive(Debug, QueryableByName, Serialize)]
pub struct AppraisalActivityRow {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub id: i32,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub employee_name: String,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub status: String,
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, QueryableByName, Serialize)]
pub struct PendingAppraisalRow {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub id: i32,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub employee_id: i32,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub status: String,
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub created_at: DateTime<Utc>,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub employee_name: String,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    pub position: Option<String>,
}

#[derive(Debug, Queryable, Serialize)]
pub struct TeamMember {
    pub id: i32,
    pub name: String,
    pub position: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, QueryableByName, Serialize)]
pub struct TeamStatsRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub team_size: i64,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub completed_appraisals: i64,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub pending_appraisals: i64,
    #[diesel(sql_type = diesel::sql_types::Double)]
    pub average_rating: f64,
}

// ===== Handlers =====

/// GET /api/dashboard/stats - System-wide counts, newest users and the
/// per-department completion/rating rollup
async fn admin_stats(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    claims.require(&[Role::Admin])?;

    let conn = state.conn.clone();
    let (system, recent_users, department_stats) = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;

        let total_employees: i64 = users::table.count().get_result(&mut db_conn)?;
        let total_departments: i64 = users::table
            .select(diesel::dsl::count_distinct(users::department))
            .get_result(&mut db_conn)?;
        let completed_appraisals: i64 = appraisals::table
            .filter(appraisals::status.eq("completed"))
            .count()
            .get_result(&mut db_conn)?;
        let pending_appraisals: i64 = appraisals::table
            .filter(appraisals::status.ne("completed"))
            .count()
            .get_result(&mut db_conn)?;

        let recent_users: Vec<RecentUser> = users::table
            .select((
                users::id,
                users::name,
                users::email,
                users::department,
                users::role,
                users::created_at,
            ))
            .order(users::created_at.desc())
            .limit(5)
            .load(&mut db_conn)?;

        let department_stats = diesel::sql_query(
            "SELECT u.department, \
             COUNT(DISTINCT u.id) AS employees, \
             COALESCE(ROUND(SUM(CASE WHEN a.status = 'completed' THEN 1 ELSE 0 END) \
                 * 100.0 / COUNT(DISTINCT u.id), 0), 0)::float8 AS completion_rate, \
             COALESCE(ROUND(AVG(pr.rating)::numeric, 1), 0)::float8 AS avg_rating \
             FROM users u \
             LEFT JOIN appraisals a ON u.id = a.employee_id \
             LEFT JOIN performance_ratings pr ON a.id = pr.appraisal_id \
             GROUP BY u.department",
        )
        .load::<DepartmentStatsRow>(&mut db_conn)?;

        Ok((
            SystemStats {
                total_employees,
                total_departments,
                completed_appraisals,
                pending_appraisals,
            },
            recent_users,
            department_stats,
        ))
    })
    .await?;

    Ok(Json(serde_json::json!({
        "systemStats": system,
        "recentUsers": recent_users,
        "departmentStats": department_stats,
    })))
}

/// GET /api/dashboard/activity - Ten most recently touched appraisals
/// and ten newest accounts
async fn admin_activity(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    claims.require(&[Role::Admin])?;

    let conn = state.conn.clone();
    let (appraisal_activity, user_activity) = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;

        let appraisal_activity = diesel::sql_query(
            "SELECT a.id, u.name AS employee_name, a.status, a.updated_at \
             FROM appraisals a \
             INNER JOIN users u ON a.employee_id = u.id \
             ORDER BY a.updated_at DESC \
             LIMIT 10",
        )
        .load::<AppraisalActivityRow>(&mut db_conn)?;

        let user_activity: Vec<RecentUser> = users::table
            .select((
                users::id,
                users::name,
                users::email,
                users::department,
                users::role,
                users::created_at,
            ))
            .order(users::created_at.desc())
            .limit(10)
            .load(&mut db_conn)?;

        Ok((appraisal_activity, user_activity))
    })
    .await?;

    Ok(Json(serde_json::json!({
        "appraisals": appraisal_activity,
        "users": user_activity,
    })))
}

/// GET /api/dashboard/supervisor - Department-scoped view for the
/// caller's team. Any non-supervisor token is rejected as unauthorized
/// rather than forbidden.
async fn supervisor_dashboard(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    if claims.role() != Some(Role::Supervisor) {
        return Err(ApiError::Unauthorized("Not authorized".to_string()));
    }

    let department = claims.department.clone();
    let conn = state.conn.clone();
    let (pending, team, stats) = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;

        let pending = diesel::sql_query(
            "SELECT a.id, a.employee_id, a.status, a.created_at, \
             u.name AS employee_name, u.position \
             FROM appraisals a \
             INNER JOIN users u ON a.employee_id = u.id \
             WHERE u.department = $1 AND a.status != 'completed' \
             ORDER BY a.created_at DESC",
        )
        .bind::<diesel::sql_types::Text, _>(&department)
        .load::<PendingAppraisalRow>(&mut db_conn)?;

        let team: Vec<TeamMember> = users::table
            .filter(users::department.eq(&department))
            .select((users::id, users::name, users::position, users::avatar))
            .load(&mut db_conn)?;

        let stats = diesel::sql_query(
            "SELECT \
             (SELECT COUNT(*) FROM users WHERE department = $1) AS team_size, \
             (SELECT COUNT(*) FROM appraisals a INNER JOIN users u ON a.employee_id = u.id \
                 WHERE u.department = $1 AND a.status = 'completed') AS completed_appraisals, \
             (SELECT COUNT(*) FROM appraisals a INNER JOIN users u ON a.employee_id = u.id \
                 WHERE u.department = $1 AND a.status != 'completed') AS pending_appraisals, \
             COALESCE((SELECT ROUND(AVG(a.overall_rating)::numeric, 1) \
                 FROM appraisals a INNER JOIN users u ON a.employee_id = u.id \
                 WHERE u.department = $1), 0)::float8 AS average_rating",
        )
        .bind::<diesel::sql_types::Text, _>(&department)
        .load::<TeamStatsRow>(&mut db_conn)?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Internal("team stats query returned no row".to_string()))?;

        Ok((pending, team, stats))
    })
    .await?;

    Ok(Json(serde_json::json!({
        "pendingAppraisals": pending,
        "teamMembers": team,
        "departmentStats": stats,
    })))
}

/// GET /api/dashboard/employee - The caller's recent appraisals, next
/// unfinished appraisal and goals
async fn employee_dashboard(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    claims.require(&[Role::Employee])?;

    let user_id = claims.id;
    let conn = state.conn.clone();
    let (recent, upcoming, my_goals) = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;

        let recent: Vec<Appraisal> = appraisals::table
            .filter(appraisals::employee_id.eq(user_id))
            .order(appraisals::created_at.desc())
            .limit(3)
            .select(Appraisal::as_select())
            .load(&mut db_conn)?;

        // Next unfinished appraisal by period end date
        let upcoming: Option<Appraisal> = appraisals::table
            .inner_join(appraisal_periods::table)
            .filter(appraisals::employee_id.eq(user_id))
            .filter(appraisals::status.ne("completed"))
            .order(appraisal_periods::end_date.asc())
            .select(Appraisal::as_select())
            .first(&mut db_conn)
            .optional()?;

        let my_goals: Vec<Goal> = goals::table
            .filter(goals::employee_id.eq(user_id))
            .select(Goal::as_select())
            .load(&mut db_conn)?;

        Ok((recent, upcoming, my_goals))
    })
    .await?;

    Ok(Json(serde_json::json!({
        "recentAppraisals": recent,
        "upcomingAppraisal": upcoming,
        "goals": my_goals,
    })))
}
