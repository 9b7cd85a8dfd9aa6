//! Goal creation and role-scoped listing.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{AuthUser, Role};
use crate::shared::error::{blocking, ApiError};
use crate::shared::models::schema::goals;
use crate::shared::models::Goal;
use crate::shared::state::AppState;

pub fn configure_goal_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/goals", post(create_goal))
        .route("/api/goals", get(list_goals))
        .route("/api/goals/mine", get(my_goals))
}

// ===== Request/Response Structures =====

#[derive(Debug, Deserialize)]
pub struct MineQuery {
    pub user_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    pub description: String,
    #[serde(rename = "targetDate", alias = "target_date")]
    pub target_date: Option<NaiveDate>,
    pub measures: Option<String>,
    pub appraisal_id: Option<i32>,
}

#[derive(Debug, QueryableByName, Serialize)]
pub struct GoalListRow {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub id: i32,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub employee_id: i32,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub description: String,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Date>)]
    pub target_date: Option<NaiveDate>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    pub measures: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub progress: i32,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub employee_name: String,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub department: String,
}

const GOAL_LIST_SELECT: &str = "SELECT g.id, g.employee_id, g.description, g.target_date, \
     g.measures, g.progress, u.name AS employee_name, u.department \
     FROM goals g \
     INNER JOIN users u ON u.id = g.employee_id";

// ===== Handlers =====

/// POST /api/goals - Record a goal for the caller
async fn create_goal(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(req): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<Goal>), ApiError> {
    claims.require(&[Role::Employee])?;

    let description = req.description.trim().to_string();
    if description.is_empty() {
        return Err(ApiError::Validation("Description is required".to_string()));
    }

    let conn = state.conn.clone();
    let employee_id = claims.id;
    let created = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let goal: Goal = diesel::insert_into(goals::table)
            .values((
                goals::employee_id.eq(employee_id),
                goals::appraisal_id.eq(req.appraisal_id),
                goals::description.eq(&description),
                goals::target_date.eq(req.target_date),
                goals::measures.eq(req.measures.as_deref()),
            ))
            .get_result(&mut db_conn)?;
        Ok(goal)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/goals - Goals visible to the caller's role: employees see
/// their own, supervisors their department, admins everything
async fn list_goals(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<GoalListRow>>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor, Role::Employee])?;

    let role = claims.role();
    let user_id = claims.id;
    let department = claims.department.clone();
    let conn = state.conn.clone();
    let rows = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let rows = match role {
            Some(Role::Admin) => diesel::sql_query(format!(
                "{} ORDER BY g.created_at DESC",
                GOAL_LIST_SELECT
            ))
            .load::<GoalListRow>(&mut db_conn)?,
            Some(Role::Supervisor) => diesel::sql_query(format!(
                "{} WHERE u.department = $1 ORDER BY g.created_at DESC",
                GOAL_LIST_SELECT
            ))
            .bind::<diesel::sql_types::Text, _>(department)
            .load::<GoalListRow>(&mut db_conn)?,
            _ => diesel::sql_query(format!(
                "{} WHERE g.employee_id = $1 ORDER BY g.created_at DESC",
                GOAL_LIST_SELECT
            ))
            .bind::<diesel::sql_types::Integer, _>(user_id)
            .load::<GoalListRow>(&mut db_conn)?,
        };
        Ok(rows)
    })
    .await?;

    Ok(Json(rows))
}

/// GET /api/goals/mine?user_id= - Goals for the given user (defaults to
/// the caller), soonest target first
async fn my_goals(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(params): Query<MineQuery>,
) -> Result<Json<Vec<Goal>>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor, Role::Employee])?;

    let conn = state.conn.clone();
    let user_id = params.user_id.unwrap_or(claims.id);
    let rows = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let rows = goals::table
            .filter(goals::employee_id.eq(user_id))
            .order(goals::target_date.asc())
            .select(Goal::as_select())
            .load(&mut db_conn)?;
        Ok(rows)
    })
    .await?;

    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_goal_accepts_both_date_keys() {
        let req: CreateGoalRequest = serde_json::from_value(
            serde_json::json!({"description": "ship v2", "targetDate": "2025-12-01"}),
        )
        .unwrap();
        assert_eq!(req.target_date.unwrap().to_string(), "2025-12-01");
        let req: CreateGoalRequest = serde_json::from_value(
            serde_json::json!({"description": "ship v2", "target_date": "2025-12-01"}),
        )
        .unwrap();
        assert!(req.target_date.is_some());
    }

    #[test]
    fn test_mine_query_user_id_is_optional() {
        let q: MineQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(q.user_id.is_none());
        let q: MineQuery = serde_json::from_value(serde_json::json!({"user_id": 9})).unwrap();
        assert_eq!(q.user_id, Some(9));
    }

    #[test]
    fn test_blank_description_is_rejected_before_insert() {
        let req: CreateGoalRequest =
            serde_json::from_value(serde_json::json!({"description": "   "})).unwrap();
        assert!(req.description.trim().is_empty());
    }
}
