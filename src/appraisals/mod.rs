//! Appraisal CRUD and the transactional creation path.
//!
//! Creation is the one multi-statement write in the system: period
//! resolution, the appraisal header, the eight criterion ratings, goals
//! and comments all commit or roll back as a unit.

pub mod criteria;
pub mod periods;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{AuthUser, Role};
use crate::shared::error::{blocking, ApiError};
use crate::shared::models::schema::{appraisals, comments, goals, performance_ratings};
use crate::shared::models::Appraisal;
use crate::shared::state::AppState;

pub use criteria::Criterion;

/// Closed status set; transitions themselves stay caller-driven.
pub const STATUSES: [&str; 4] = [
    "not_started",
    "self_assessment",
    "supervisor_review",
    "completed",
];

fn validate_status(status: &str) -> Result<(), ApiError> {
    if STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!("Unknown status: {}", status)))
    }
}

pub fn configure_appraisal_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/appraisals", post(create_appraisal))
        .route("/api/appraisals", get(list_appraisals))
        .route("/api/appraisals/recent", get(recent_appraisals))
        .route("/api/appraisals/:id", get(get_appraisal))
        .route("/api/appraisals/:id", put(update_appraisal))
        .route("/api/appraisals/:id", delete(delete_appraisal))
        .route("/api/appraisals/:id/score", put(update_score))
}

// ===== Request/Response Structures =====

#[derive(Debug, Deserialize)]
pub struct GoalInput {
    pub description: String,
    #[serde(rename = "targetDate", alias = "target_date")]
    pub target_date: Option<NaiveDate>,
    pub measures: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAppraisalRequest {
    pub employee_id: Option<i32>,
    pub supervisor_id: Option<i32>,
    pub period_name: Option<String>,
    pub status: Option<String>,
    pub job_knowledge: Option<i32>,
    pub work_quality: Option<i32>,
    pub productivity: Option<i32>,
    pub communication: Option<i32>,
    pub teamwork: Option<i32>,
    pub problem_solving: Option<i32>,
    pub initiative: Option<i32>,
    pub adaptability: Option<i32>,
    pub overall_rating: Option<f64>,
    #[serde(default)]
    pub goals: Vec<GoalInput>,
    pub employee_comments: Option<String>,
    pub manager_comments: Option<String>,
    pub development_plan: Option<String>,
}

impl CreateAppraisalRequest {
    /// Payload fields in fixed criterion order; an absent score still
    /// produces a (null) rating row.
    fn criterion_scores(&self) -> [(Criterion, Option<i32>); 8] {
        [
            (Criterion::JobKnowledge, self.job_knowledge),
            (Criterion::WorkQuality, self.work_quality),
            (Criterion::Productivity, self.productivity),
            (Criterion::Communication, self.communication),
            (Criterion::Teamwork, self.teamwork),
            (Criterion::ProblemSolving, self.problem_solving),
            (Criterion::Initiative, self.initiative),
            (Criterion::Adaptability, self.adaptability),
        ]
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateAppraisalRequest {
    pub status: Option<String>,
    pub overall_rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateScoreRequest {
    pub score: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub user_id: Option<i32>,
}

// Omitted fields keep their stored values; updated_at always moves.
#[derive(AsChangeset)]
#[diesel(table_name = appraisals)]
struct AppraisalChanges {
    status: Option<String>,
    overall_rating: Option<f64>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, QueryableByName, Serialize)]
pub struct AppraisalSummaryRow {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub id: i32,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub employee_id: i32,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub supervisor_id: i32,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub period_id: i32,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub status: String,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Double>)]
    pub overall_rating: Option<f64>,
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub created_at: DateTime<Utc>,
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub updated_at: DateTime<Utc>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    pub employee_name: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    pub supervisor_name: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    pub period_name: Option<String>,
}

const SUMMARY_SELECT: &str = "SELECT a.id, a.employee_id, a.supervisor_id, a.period_id, \
     a.status, a.overall_rating, a.created_at, a.updated_at, \
     u1.name AS employee_name, u2.name AS supervisor_name, p.name AS period_name \
     FROM appraisals a \
     LEFT JOIN users u1 ON u1.id = a.employee_id \
     LEFT JOIN users u2 ON u2.id = a.supervisor_id \
     LEFT JOIN appraisal_periods p ON p.id = a.period_id";

#[derive(Debug, QueryableByName, Serialize)]
pub struct RecentAppraisalRow {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub id: i32,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub period: String,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub status: String,
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub created_at: DateTime<Utc>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Double>)]
    pub performance_rating: Option<f64>,
}

// ===== Handlers =====

/// POST /api/appraisals - Create an appraisal with its ratings, goals and
/// comments in one transaction
async fn create_appraisal(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(req): Json<CreateAppraisalRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor, Role::Employee])?;

    let missing = || ApiError::Validation("Missing required fields".to_string());
    let employee_id = req.employee_id.ok_or_else(missing)?;
    let supervisor_id = req.supervisor_id.ok_or_else(missing)?;
    let period_name = req
        .period_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(missing)?
        .to_string();

    let status = req
        .status
        .clone()
        .unwrap_or_else(|| "not_started".to_string());
    validate_status(&status)?;

    let conn = state.conn.clone();
    let appraisal_id = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;

        db_conn.transaction::<i32, ApiError, _>(|conn| {
            let period_id = periods::resolve_or_create(conn, &period_name)?;

            let appraisal_id: i32 = diesel::insert_into(appraisals::table)
                .values((
                    appraisals::employee_id.eq(employee_id),
                    appraisals::supervisor_id.eq(supervisor_id),
                    appraisals::period_id.eq(period_id),
                    appraisals::status.eq(&status),
                    appraisals::overall_rating.eq(req.overall_rating),
                ))
                .returning(appraisals::id)
                .get_result(conn)?;

            for (criterion, rating) in req.criterion_scores() {
                diesel::insert_into(performance_ratings::table)
                    .values((
                        performance_ratings::appraisal_id.eq(appraisal_id),
                        performance_ratings::criteria_id.eq(criterion.id()),
                        performance_ratings::rating.eq(rating),
                    ))
                    .execute(conn)?;
            }

            for goal in &req.goals {
                diesel::insert_into(goals::table)
                    .values((
                        goals::employee_id.eq(employee_id),
                        goals::appraisal_id.eq(Some(appraisal_id)),
                        goals::description.eq(&goal.description),
                        goals::target_date.eq(goal.target_date),
                        goals::measures.eq(goal.measures.as_deref()),
                    ))
                    .execute(conn)?;
            }

            let typed_comments = [
                (req.employee_comments.as_deref(), "employee", employee_id),
                (req.manager_comments.as_deref(), "supervisor", supervisor_id),
                (
                    req.development_plan.as_deref(),
                    "development_plan",
                    supervisor_id,
                ),
            ];
            for (text, comment_type, author_id) in typed_comments {
                let Some(content) = text.map(str::trim).filter(|s| !s.is_empty()) else {
                    continue;
                };
                diesel::insert_into(comments::table)
                    .values((
                        comments::appraisal_id.eq(appraisal_id),
                        comments::user_id.eq(author_id),
                        comments::comment_type.eq(comment_type),
                        comments::content.eq(content),
                    ))
                    .execute(conn)?;
            }

            Ok(appraisal_id)
        })
    })
    .await?;

    info!(
        "created appraisal {} for employee {}",
        appraisal_id, employee_id
    );
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Appraisal created with full details",
            "appraisal_id": appraisal_id,
        })),
    ))
}

/// GET /api/appraisals - Every appraisal with joined names, newest first
async fn list_appraisals(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<AppraisalSummaryRow>>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor, Role::Employee])?;

    let conn = state.conn.clone();
    let rows = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let sql = format!("{} ORDER BY a.created_at DESC", SUMMARY_SELECT);
        let rows = diesel::sql_query(sql).load::<AppraisalSummaryRow>(&mut db_conn)?;
        Ok(rows)
    })
    .await?;

    Ok(Json(rows))
}

/// GET /api/appraisals/:id - One appraisal with joined names
async fn get_appraisal(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<AppraisalSummaryRow>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor, Role::Employee])?;

    let conn = state.conn.clone();
    let row = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let sql = format!("{} WHERE a.id = $1", SUMMARY_SELECT);
        let row = diesel::sql_query(sql)
            .bind::<diesel::sql_types::Integer, _>(id)
            .load::<AppraisalSummaryRow>(&mut db_conn)?
            .into_iter()
            .next();
        row.ok_or_else(|| ApiError::NotFound("Appraisal not found".to_string()))
    })
    .await?;

    Ok(Json(row))
}

/// PUT /api/appraisals/:id - Patch status/overall_rating, COALESCE-style
async fn update_appraisal(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<UpdateAppraisalRequest>,
) -> Result<Json<Appraisal>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor, Role::Employee])?;

    if let Some(status) = &req.status {
        validate_status(status)?;
    }

    let conn = state.conn.clone();
    let updated = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let changes = AppraisalChanges {
            status: req.status,
            overall_rating: req.overall_rating,
            updated_at: Utc::now(),
        };
        let updated: Option<Appraisal> = diesel::update(appraisals::table.find(id))
            .set(&changes)
            .get_result(&mut db_conn)
            .optional()?;
        updated.ok_or_else(|| ApiError::NotFound("Appraisal not found".to_string()))
    })
    .await?;

    Ok(Json(updated))
}

/// PUT /api/appraisals/:id/score - Set overall_rating only
async fn update_score(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<UpdateScoreRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor, Role::Employee])?;

    let score = req
        .score
        .ok_or_else(|| ApiError::Validation("Score is required.".to_string()))?;

    let conn = state.conn.clone();
    blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let affected = diesel::update(appraisals::table.find(id))
            .set((
                appraisals::overall_rating.eq(Some(score)),
                appraisals::updated_at.eq(Utc::now()),
            ))
            .execute(&mut db_conn)?;
        if affected == 0 {
            return Err(ApiError::NotFound("Appraisal not found.".to_string()));
        }
        Ok(())
    })
    .await?;

    Ok(Json(serde_json::json!({ "message": "Score updated successfully." })))
}

/// DELETE /api/appraisals/:id - Hard delete; children cascade in the schema
async fn delete_appraisal(
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
        let affected = diesel::delete(appraisals::table.find(id)).execute(&mut db_conn)?;
        if affected == 0 {
            return Err(ApiError::NotFound("Appraisal not found".to_string()));
        }
        Ok(())
    })
    .await?;

    info!("deleted appraisal {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/appraisals/recent - Caller's five newest appraisals with the
/// per-appraisal rating average
async fn recent_appraisals(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(params): Query<RecentQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    claims.require(&[Role::Admin, Role::Supervisor, Role::Employee])?;

    let employee_id = params.user_id.unwrap_or(claims.id);
    let conn = state.conn.clone();
    let rows = blocking(move || {
        let mut db_conn = conn
            .get()
            .map_err(|e| ApiError::Database(format!("connection error: {}", e)))?;
        let rows = diesel::sql_query(
            "SELECT a.id, p.name AS period, a.status, a.created_at, \
             ROUND(AVG(r.rating), 1)::float8 AS performance_rating \
             FROM appraisals a \
             INNER JOIN appraisal_periods p ON a.period_id = p.id \
             LEFT JOIN performance_ratings r ON r.appraisal_id = a.id \
             WHERE a.employee_id = $1 \
             GROUP BY a.id, p.name \
             ORDER BY a.created_at DESC \
             LIMIT 5",
        )
        .bind::<diesel::sql_types::Integer, _>(employee_id)
        .load::<RecentAppraisalRow>(&mut db_conn)?;
        Ok(rows)
    })
    .await?;

    Ok(Json(serde_json::json!({ "recentAppraisals": rows })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> CreateAppraisalRequest {
        serde_json::from_value(serde_json::json!({
            "employee_id": 1,
            "supervisor_id": 2,
            "period_name": "Q2 2025",
            "job_knowledge": 4,
            "teamwork": 5
        }))
        .unwrap()
    }

    #[test]
    fn test_criterion_scores_keep_fixed_order_and_keep_missing_entries() {
        let req = base_request();
        let scores = req.criterion_scores();
        assert_eq!(scores.len(), 8);
        assert_eq!(scores[0], (Criterion::JobKnowledge, Some(4)));
        assert_eq!(scores[1], (Criterion::WorkQuality, None));
        assert_eq!(scores[4], (Criterion::Teamwork, Some(5)));
        assert_eq!(scores[7], (Criterion::Adaptability, None));
    }

    #[test]
    fn test_goal_input_accepts_both_date_keys() {
        let g: GoalInput =
            serde_json::from_value(serde_json::json!({"description": "ship", "targetDate": "2025-09-01"}))
                .unwrap();
        assert_eq!(g.target_date.unwrap().to_string(), "2025-09-01");
        let g: GoalInput =
            serde_json::from_value(serde_json::json!({"description": "ship", "target_date": "2025-09-01"}))
                .unwrap();
        assert!(g.target_date.is_some());
    }

    #[test]
    fn test_status_validation() {
        for ok in STATUSES {
            assert!(validate_status(ok).is_ok());
        }
        assert!(validate_status("done").is_err());
    }

    // A missing period_name must be rejected before any insert runs,
    // never defaulted to some literal quarter.
    #[test]
    fn test_missing_period_name_is_a_validation_error() {
        let req: CreateAppraisalRequest = serde_json::from_value(serde_json::json!({
            "employee_id": 1,
            "supervisor_id": 2
        }))
        .unwrap();
        assert!(req.period_name.is_none());
        let normalized = req
            .period_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        assert!(normalized.is_none());
    }
}
