//! Creation-path checks that need a live database: the all-or-nothing
//! write and period-row reuse.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use appraisalserver::api_router::configure_api_routes;
use appraisalserver::auth::gate::issue_token;
use appraisalserver::config::AppConfig;
use appraisalserver::shared::models::schema::{
    appraisal_periods, appraisals, comments, goals, performance_ratings, users,
};
use appraisalserver::shared::state::AppState;
use appraisalserver::shared::utils::create_conn;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

fn seed_user(conn: &mut PgConnection, role: &str, department: &str) -> i32 {
    let email = format!(
        "{}-{}@atomicity.test",
        role,
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );
    diesel::insert_into(users::table)
        .values((
            users::name.eq(format!("{} under test", role)),
            users::email.eq(email),
            users::password.eq("unused"),
            users::role.eq(role),
            users::department.eq(department),
        ))
        .returning(users::id)
        .get_result(conn)
        .unwrap()
}

fn row_counts(conn: &mut PgConnection) -> (i64, i64, i64, i64) {
    (
        appraisals::table.count().get_result(conn).unwrap(),
        performance_ratings::table.count().get_result(conn).unwrap(),
        goals::table.count().get_result(conn).unwrap(),
        comments::table.count().get_result(conn).unwrap(),
    )
}

async fn post_appraisal(
    app: axum::Router,
    token: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/appraisals")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
#[ignore]
async fn test_creation_is_atomic_and_periods_are_reused() {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = create_conn(&url).unwrap();
    {
        let mut conn = pool.get().unwrap();
        conn.run_pending_migrations(MIGRATIONS).unwrap();
    }
    let state = Arc::new(AppState {
        conn: pool.clone(),
        config: AppConfig::from_env(),
    });
    let app = configure_api_routes().with_state(state);

    let mut conn = pool.get().unwrap();
    let employee_id = seed_user(&mut conn, "employee", "Atomicity");
    let supervisor_id = seed_user(&mut conn, "supervisor", "Atomicity");
    let token = issue_token(supervisor_id, "supervisor", "Atomicity").unwrap();

    let run = std::process::id();
    let good_period = format!("Q3 {}", 3000 + (run % 1000));
    let bad_period = format!("Q4 {}", 3000 + (run % 1000));

    // A valid payload persists one header, eight ratings, both goals and
    // both non-empty comments
    let before = row_counts(&mut conn);
    let (status, body) = post_appraisal(
        app.clone(),
        &token,
        serde_json::json!({
            "employee_id": employee_id,
            "supervisor_id": supervisor_id,
            "period_name": &good_period,
            "job_knowledge": 4,
            "teamwork": 5,
            "goals": [
                {"description": "ship the portal", "targetDate": "2031-09-01"},
                {"description": "mentor a junior"}
            ],
            "employee_comments": "solid quarter",
            "development_plan": "pair on reviews"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let first_id = body["appraisal_id"].as_i64().unwrap() as i32;

    let after = row_counts(&mut conn);
    assert_eq!(after.0, before.0 + 1, "appraisal header");
    assert_eq!(after.1, before.1 + 8, "one rating row per criterion");
    assert_eq!(after.2, before.2 + 2, "goal rows");
    assert_eq!(after.3, before.3 + 2, "employee + development_plan comments");

    // A payload that fails mid-transaction (unknown employee id breaks the
    // header insert after the period insert) leaves nothing behind, not
    // even the period row
    let before = row_counts(&mut conn);
    let periods_before: i64 = appraisal_periods::table
        .filter(appraisal_periods::name.eq(&bad_period))
        .count()
        .get_result(&mut conn)
        .unwrap();
    let (status, _) = post_appraisal(
        app.clone(),
        &token,
        serde_json::json!({
            "employee_id": -1,
            "supervisor_id": supervisor_id,
            "period_name": &bad_period,
            "job_knowledge": 3,
            "goals": [{"description": "never persisted"}],
            "employee_comments": "never persisted"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(row_counts(&mut conn), before);
    let periods_after: i64 = appraisal_periods::table
        .filter(appraisal_periods::name.eq(&bad_period))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(periods_after, periods_before, "rolled-back period insert");

    // A second create naming the same period reuses its row
    let (status, body) = post_appraisal(
        app.clone(),
        &token,
        serde_json::json!({
            "employee_id": employee_id,
            "supervisor_id": supervisor_id,
            "period_name": &good_period
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let second_id = body["appraisal_id"].as_i64().unwrap() as i32;

    let first_period: i32 = appraisals::table
        .find(first_id)
        .select(appraisals::period_id)
        .first(&mut conn)
        .unwrap();
    let second_period: i32 = appraisals::table
        .find(second_id)
        .select(appraisals::period_id)
        .first(&mut conn)
        .unwrap();
    assert_eq!(first_period, second_period);

    // Cleanup: users cascade to appraisals and their children, then the
    // period row is free to go
    diesel::delete(users::table.filter(users::id.eq_any([employee_id, supervisor_id])))
        .execute(&mut conn)
        .unwrap();
    diesel::delete(appraisal_periods::table.filter(appraisal_periods::name.eq(&good_period)))
        .execute(&mut conn)
        .unwrap();
}
