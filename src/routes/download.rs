//! CSV export of ruptures

use axum::{
    extract::{Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
};
use chrono::Local;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::info;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Maximum number of ruptures in one export
pub const MAX_DOWNLOAD: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Comma separated rupture ids
    pub ruptures: String,
}

/// Parse a comma separated id list, keeping the first occurrence of each id
pub fn parse_ids(list: &str) -> Result<Vec<i64>> {
    let ids = list
        .split(',')
        .map(|id| {
            let id = id.trim();
            id.parse::<i64>()
                .map_err(|_| AppError::InvalidRequest(format!("Invalid rupture id: '{}'", id)))
        })
        .collect::<Result<Vec<_>>>()?;

    if ids.len() > MAX_DOWNLOAD {
        return Err(AppError::InvalidRequest(format!(
            "At most {} ruptures can be downloaded at once",
            MAX_DOWNLOAD
        )));
    }

    let mut seen = HashSet::with_capacity(ids.len());
    Ok(ids.into_iter().filter(|id| seen.insert(*id)).collect())
}

/// Shortest round-trip form of a float, always with a fraction or exponent:
/// `7.0`, `0.001`, `1e-05`, `1.5e+16`.
pub fn format_float(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if value != 0.0 && !(-4..16).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    }

    let plain = value.to_string();
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}

/// GET /download?ruptures=1,2,3
///
/// Returns a CSV attachment with one row per requested rupture.
pub async fn download(
    State(state): State<AppState>,
    Query(params): Query<DownloadQuery>,
) -> Result<impl IntoResponse> {
    let ids = parse_ids(&params.ruptures)?;
    let ruptures = state.db.get_ruptures(&ids).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Rupture ID", "Magnitude", "Area", "Length", "Rate"])?;
    for id in &ids {
        let rupture = ruptures
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Rupture {}", id)))?;
        writer.write_record([
            rupture.rupture_id.to_string(),
            format_float(rupture.magnitude),
            format_float(rupture.area),
            format_float(rupture.length),
            format_float(rupture.rate),
        ])?;
    }
    let body = writer
        .into_inner()
        .map_err(|e| AppError::InternalError(format!("Failed to write CSV: {}", e)))?;

    info!(count = ids.len(), "Rupture list downloaded");

    let filename = format!(
        "attachment; filename=ruptures_{}.csv",
        Local::now().format("%Y-%m-%d_%H-%M")
    );
    Ok((
        [
            (CONTENT_TYPE, "application/x-csv".to_string()),
            (CONTENT_DISPOSITION, filename),
        ],
        body,
    ))
}
