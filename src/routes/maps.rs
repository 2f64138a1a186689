//! Rupture map endpoint

use axum::{
    extract::{Path, State},
    response::Html,
};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::Result;
use crate::map::rupture_figure;
use crate::scaling::estimate_fault_magnitudes;
use crate::state::AppState;
use crate::views::RuptureMap;

/// GET /rupture_map/:rupture_id
///
/// Returns a map fragment of the rupture's faults, coloured by the mean
/// rupture rate of each fault's segments at its estimated magnitude.
pub async fn rupture_map(
    State(state): State<AppState>,
    Path(rupture_id): Path<i64>,
) -> Result<Html<String>> {
    let rupture = state.rupture(rupture_id).await?;

    let rakes: BTreeMap<String, f64> = state
        .db
        .get_rupture_fault_info(rupture_id)
        .await?
        .into_iter()
        .map(|(name, info)| (name, info.rake))
        .collect();
    let magnitudes = estimate_fault_magnitudes(&rupture.faults, &rakes);
    let fault_rates = state.db.most_likely_fault(rupture_id, &magnitudes).await?;

    debug!(
        rupture_id,
        faults = rupture.faults.len(),
        rated = fault_rates.len(),
        "Rendering rupture map"
    );

    let figure = rupture_figure(&rupture, &fault_rates);
    let html = state.views.rupture_map(&RuptureMap { rupture_id, figure })?;
    Ok(Html(html))
}
