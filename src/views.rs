//! HTML rendering with minijinja templates compiled into the binary

use minijinja::{context, Environment};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::Rupture;
use crate::scaling::rupture_magnitude;

/// Loaded template environment
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("index.html", include_str!("../templates/index.html"))?;
        env.add_template("ruptures.html", include_str!("../templates/ruptures.html"))?;
        env.add_template("rupture_map.html", include_str!("../templates/rupture_map.html"))?;
        Ok(Self { env })
    }

    pub fn index(&self, page: &IndexPage) -> Result<String> {
        Ok(self.env.get_template("index.html")?.render(page)?)
    }

    pub fn ruptures(&self, table: &RuptureTable) -> Result<String> {
        Ok(self
            .env
            .get_template("ruptures.html")?
            .render(context! { table => table })?)
    }

    pub fn rupture_map(&self, map: &RuptureMap) -> Result<String> {
        Ok(self.env.get_template("rupture_map.html")?.render(map)?)
    }
}

/// Search form values as shown in the inputs; absent values are empty strings
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormValues {
    pub query: String,
    pub magnitude_lower_bound: String,
    pub magnitude_upper_bound: String,
    pub rate_lower_bound: String,
    pub rate_upper_bound: String,
    pub max_fault_count: String,
}

/// Context for `index.html`
#[derive(Debug, Serialize)]
pub struct IndexPage {
    pub form: FormValues,
    /// None until a query has been run
    pub table: Option<RuptureTable>,
}

/// Context for `ruptures.html`
#[derive(Debug, Clone, Serialize)]
pub struct RuptureTable {
    pub rows: Vec<RuptureRow>,
    /// Comma separated ids for the download link
    pub download_ids: String,
    pub limit: u32,
    /// More ruptures matched than are shown
    pub limit_reached: bool,
    /// Names in the query that are not parent faults in the database
    pub unknown_faults: Vec<String>,
}

impl RuptureTable {
    /// Table of at most `limit` ruptures.
    ///
    /// Callers fetch one rupture beyond the limit; its presence marks the
    /// table as truncated.
    pub fn new(ruptures: &BTreeMap<i64, Rupture>, limit: u32) -> Self {
        let shown: Vec<&Rupture> = ruptures.values().take(limit as usize).collect();
        let download_ids = shown
            .iter()
            .map(|rupture| rupture.rupture_id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        Self {
            rows: shown.into_iter().map(RuptureRow::new).collect(),
            download_ids,
            limit,
            limit_reached: ruptures.len() > limit as usize,
            unknown_faults: Vec::new(),
        }
    }

    pub fn with_unknown_faults(mut self, unknown_faults: Vec<String>) -> Self {
        self.unknown_faults = unknown_faults;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RuptureRow {
    pub rupture_id: i64,
    pub summary: String,
    pub fault_names: String,
    pub magnitude: String,
    pub rate: String,
    pub area_km2: i64,
    pub length_km: i64,
}

impl RuptureRow {
    pub fn new(rupture: &Rupture) -> Self {
        let names = rupture.fault_names();
        Self {
            rupture_id: rupture.rupture_id,
            summary: fault_summary(&names),
            fault_names: names.join(", "),
            magnitude: format!("{:.2}", rupture_magnitude(rupture)),
            rate: format_rate(rupture.rate),
            area_km2: (rupture.area / 1e6).round() as i64,
            length_km: (rupture.length / 1e3).round() as i64,
        }
    }
}

/// Context for `rupture_map.html`
#[derive(Debug, Serialize)]
pub struct RuptureMap {
    pub rupture_id: i64,
    /// Plotly figure (`data` and `layout`)
    pub figure: serde_json::Value,
}

/// First fault name in sorted order, followed by the count of the others.
pub fn fault_summary(names: &[&str]) -> String {
    let mut sorted = names.to_vec();
    sorted.sort_unstable();
    match sorted.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} + {} others", first, rest.len()),
    }
}

/// Annual rate in the `1.23e-4` form used across the UI.
pub fn format_rate(rate: f64) -> String {
    format!("{:.2e}", rate)
}
