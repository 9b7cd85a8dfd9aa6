use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

pub mod schema {
    diesel::table! {
        users (id) {
            id -> Int4,
            name -> Text,
            email -> Text,
            password -> Text,
            role -> Text,
            department -> Text,
            supervisor_id -> Nullable<Int4>,
            position -> Nullable<Text>,
            avatar -> Nullable<Text>,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        appraisal_periods (id) {
            id -> Int4,
            name -> Text,
            start_date -> Date,
            end_date -> Date,
            status -> Text,
        }
    }

    diesel::table! {
        appraisals (id) {
            id -> Int4,
            employee_id -> Int4,
            supervisor_id -> Int4,
            period_id -> Int4,
            status -> Text,
            overall_rating -> Nullable<Float8>,
            created_at -> Timestamptz,
            updated_at -> Timestamptz,
        }
    }

    diesel::table! {
        performance_ratings (id) {
            id -> Int4,
            appraisal_id -> Int4,
            criteria_id -> Int4,
            rating -> Nullable<Int4>,
            created_at -> Timestamptz,
            updated_at -> Timestamptz,
        }
    }

    diesel::table! {
        goals (id) {
            id -> Int4,
            employee_id -> Int4,
            appraisal_id -> Nullable<Int4>,
            description -> Text,
            target_date -> Nullable<Date>,
            measures -> Nullable<Text>,
            progress -> Int4,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        comments (id) {
            id -> Int4,
            appraisal_id -> Int4,
            user_id -> Int4,
            comment_type -> Text,
            content -> Text,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        departments (id) {
            id -> Int4,
            name -> Text,
            head -> Text,
        }
    }

    diesel::table! {
        settings (id) {
            id -> Int4,
            company_name -> Text,
            maintenance_mode -> Bool,
            default_leave_days -> Int4,
        }
    }

    diesel::joinable!(goals -> users (employee_id));
    diesel::joinable!(appraisals -> appraisal_periods (period_id));
    diesel::joinable!(performance_ratings -> appraisals (appraisal_id));
    diesel::joinable!(comments -> appraisals (appraisal_id));

    diesel::allow_tables_to_appear_in_same_query!(
        users,
        appraisal_periods,
        appraisals,
        performance_ratings,
        goals,
        comments,
        departments,
    );
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::users)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: String,
    pub department: String,
    pub supervisor_id: Option<i32>,
    pub position: Option<String>,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::appraisal_periods)]
pub struct AppraisalPeriod {
    pub id: i32,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::appraisals)]
pub struct Appraisal {
    pub id: i32,
    pub employee_id: i32,
    pub supervisor_id: i32,
    pub period_id: i32,
    pub status: String,
    pub overall_rating: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::goals)]
pub struct Goal {
    pub id: i32,
    pub employee_id: i32,
    pub appraisal_id: Option<i32>,
    pub description: String,
    pub target_date: Option<NaiveDate>,
    pub measures: Option<String>,
    pub progress: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::departments)]
pub struct Department {
    pub id: i32,
    pub name: String,
    pub head: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = schema::settings)]
pub struct SettingsRow {
    pub id: i32,
    #[serde(rename = "companyName")]
    pub company_name: String,
    #[serde(rename = "maintenanceMode")]
    pub maintenance_mode: bool,
    #[serde(rename = "defaultLeaveDays")]
    pub default_leave_days: i32,
}

pub use schema::*;
