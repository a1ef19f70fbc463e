use axum::Json;
use axum::extract::{Query, State};
use serde::Serialize;
use shared::error::{AppError, ErrorCode};

use super::{ApiResult, BranchQuery};
use crate::auth::{Actor, CurrentUser};
use crate::db;
use crate::sales::{SalesReport, aggregate};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SalesResponse {
    /// `None` covers all branches
    pub branch_id: Option<i64>,
    #[serde(flatten)]
    pub report: SalesReport,
}

/// Branch to report on. Branch admins default to their own branch.
fn sales_branch(actor: &Actor, requested: Option<i64>) -> Result<Option<i64>, AppError> {
    let branch_id = if actor.is_super_admin() {
        requested
    } else {
        requested.or(actor.branch_id)
    };
    match branch_id {
        Some(branch_id) => {
            actor.require_administers(branch_id)?;
            Ok(Some(branch_id))
        }
        None if actor.is_super_admin() => Ok(None),
        None => Err(AppError::new(ErrorCode::AdminRequired)),
    }
}

pub async fn get_sales(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<BranchQuery>,
) -> ApiResult<SalesResponse> {
    let branch_id = sales_branch(&current.actor, query.branch_id)?;

    let rows = db::orders::paid_totals(&state.pool, branch_id).await?;
    Ok(Json(SalesResponse {
        branch_id,
        report: aggregate(&rows, chrono::Utc::now()),
    }))
}
