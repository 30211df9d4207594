//! Leaderboard handler.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use krossfire_core::scoring::Period;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    /// `daily`, `weekly`, or `all-time` (default).
    pub period: Option<String>,
    pub limit: Option<usize>,
}

fn parse_period(raw: Option<&str>) -> Result<Period, AppError> {
    match raw {
        None => Ok(Period::default()),
        Some("daily") => Ok(Period::Daily),
        Some("weekly") => Ok(Period::Weekly),
        Some("all-time") => Ok(Period::AllTime),
        Some(other) => Err(AppError::BadRequest(format!(
            "unknown period {other:?}, expected daily, weekly, or all-time"
        ))),
    }
}

/// GET /api/leaderboard/{mode}
pub async fn leaderboard(
    State(state): State<AppState>,
    Path(mode): Path<String>,
    Query(params): Query<LeaderboardParams>,
) -> AppResult<impl IntoResponse> {
    let period = parse_period(params.period.as_deref())?;
    let rows = state.games.leaderboard(&mode, period, params.limit).await?;
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_periods() {
        assert_eq!(parse_period(None).unwrap(), Period::AllTime);
        assert_eq!(parse_period(Some("daily")).unwrap(), Period::Daily);
        assert_eq!(parse_period(Some("weekly")).unwrap(), Period::Weekly);
        assert_eq!(parse_period(Some("all-time")).unwrap(), Period::AllTime);
    }

    #[test]
    fn rejects_unknown_period() {
        assert!(parse_period(Some("monthly")).is_err());
    }
}
