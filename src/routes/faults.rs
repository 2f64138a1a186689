//! Fault name listing

use axum::{extract::State, Json};

use crate::error::Result;
use crate::state::AppState;

/// GET /api/faults
///
/// Sorted parent fault names, used to suggest names in the query box.
pub async fn fault_names(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.db.get_fault_names().await?))
}
