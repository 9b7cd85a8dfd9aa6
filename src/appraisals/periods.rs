//! Appraisal period resolution.
//!
//! Periods are addressed by name ("Q2 2025"). An unknown name is created
//! on the fly with calendar-quarter bounds derived from the name itself;
//! a name that is not `Q[1-4] <year>` is a validation error and aborts
//! the enclosing transaction.

use chrono::NaiveDate;
use diesel::prelude::*;

use crate::shared::error::ApiError;
use crate::shared::models::schema::appraisal_periods;

/// Calendar quarter bounds for a period name. Separators `_` and `-` are
/// accepted in place of the space, case-insensitively ("q2_2025").
pub fn quarter_bounds(name: &str) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let invalid = || {
        ApiError::Validation("Invalid period name format. Use e.g. 'Q2 2025'".to_string())
    };

    let cleaned = name.replace(['_', '-'], " ").to_uppercase();
    let mut parts = cleaned.split_whitespace();
    let quarter = parts.next().ok_or_else(invalid)?;
    let year: i32 = parts
        .next()
        .and_then(|y| y.parse().ok())
        .ok_or_else(invalid)?;
    if parts.next().is_some() {
        return Err(invalid());
    }

    let (start, end) = match quarter {
        "Q1" => ((1, 1), (3, 31)),
        "Q2" => ((4, 1), (6, 30)),
        "Q3" => ((7, 1), (9, 30)),
        "Q4" => ((10, 1), (12, 31)),
        _ => return Err(invalid()),
    };

    let start_date = NaiveDate::from_ymd_opt(year, start.0, start.1).ok_or_else(invalid)?;
    let end_date = NaiveDate::from_ymd_opt(year, end.0, end.1).ok_or_else(invalid)?;
    Ok((start_date, end_date))
}

/// Look up a period by exact name, creating it with `active` status when
/// absent. Runs on the caller's connection so it participates in the
/// appraisal-creation transaction.
pub fn resolve_or_create(conn: &mut PgConnection, name: &str) -> Result<i32, ApiError> {
    let existing: Option<i32> = appraisal_periods::table
        .filter(appraisal_periods::name.eq(name))
        .select(appraisal_periods::id)
        .first(conn)
        .optional()?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let (start_date, end_date) = quarter_bounds(name)?;
    let id = diesel::insert_into(appraisal_periods::table)
        .values((
            appraisal_periods::name.eq(name),
            appraisal_periods::start_date.eq(start_date),
            appraisal_periods::end_date.eq(end_date),
            appraisal_periods::status.eq("active"),
        ))
        .returning(appraisal_periods::id)
        .get_result(conn)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_quarter_bounds_table() {
        assert_eq!(
            quarter_bounds("Q1 2025").unwrap(),
            (date(2025, 1, 1), date(2025, 3, 31))
        );
        assert_eq!(
            quarter_bounds("Q2 2025").unwrap(),
            (date(2025, 4, 1), date(2025, 6, 30))
        );
        assert_eq!(
            quarter_bounds("Q3 2025").unwrap(),
            (date(2025, 7, 1), date(2025, 9, 30))
        );
        assert_eq!(
            quarter_bounds("Q4 2025").unwrap(),
            (date(2025, 10, 1), date(2025, 12, 31))
        );
    }

    #[test]
    fn test_separator_and_case_normalization() {
        assert_eq!(
            quarter_bounds("q2_2025").unwrap(),
            (date(2025, 4, 1), date(2025, 6, 30))
        );
        assert_eq!(
            quarter_bounds("q4-2030").unwrap(),
            (date(2030, 10, 1), date(2030, 12, 31))
        );
    }

    #[test]
    fn test_bad_formats_rejected() {
        for bad in ["", "Q5 2025", "2025 Q2", "Q2", "Q2 20x5", "Q2 2025 extra", "H1 2025"] {
            let err = quarter_bounds(bad).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "input: {:?}", bad);
        }
    }
}
