//! Rupture search endpoint and the search parameters shared with the index page

use axum::{
    extract::State,
    http::HeaderName,
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{Bounds, RuptureFilter};
use crate::query;
use crate::state::AppState;
use crate::views::{FormValues, RuptureTable};

/// Header telling htmx which URL to push into the browser history
pub const HX_PUSH_URL: HeaderName = HeaderName::from_static("hx-push-url");

/// Raw search fields as submitted by the form or the index query string.
///
/// Browsers submit empty inputs as empty strings, so every field arrives as
/// text and is parsed by [`SearchParams::parse`].
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub magnitude_lower_bound: Option<String>,
    pub magnitude_upper_bound: Option<String>,
    pub rate_lower_bound: Option<String>,
    pub rate_upper_bound: Option<String>,
    pub max_fault_count: Option<String>,
}

/// Validated search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Search {
    pub query: Option<String>,
    pub magnitude_lower_bound: Option<f64>,
    pub magnitude_upper_bound: Option<f64>,
    /// log10 of the annual rate
    pub rate_lower_bound: Option<f64>,
    /// log10 of the annual rate
    pub rate_upper_bound: Option<f64>,
    pub max_fault_count: Option<u32>,
}

impl SearchParams {
    pub fn parse(&self) -> Result<Search> {
        let search = Search {
            query: non_empty(self.query.as_deref()).map(str::to_string),
            magnitude_lower_bound: parse_number("magnitude_lower_bound", &self.magnitude_lower_bound)?,
            magnitude_upper_bound: parse_number("magnitude_upper_bound", &self.magnitude_upper_bound)?,
            rate_lower_bound: parse_number("rate_lower_bound", &self.rate_lower_bound)?,
            rate_upper_bound: parse_number("rate_upper_bound", &self.rate_upper_bound)?,
            max_fault_count: parse_field("max_fault_count", &self.max_fault_count)?,
        };

        if search.max_fault_count == Some(0) {
            return Err(AppError::InvalidRequest(
                "max_fault_count must be at least 1".into(),
            ));
        }
        check_order("magnitude", search.magnitude_lower_bound, search.magnitude_upper_bound)?;
        check_order("rate", search.rate_lower_bound, search.rate_upper_bound)?;

        Ok(search)
    }
}

impl Search {
    /// Database filter; rate bounds are converted from exponents to rates
    pub fn filter(&self, limit: u32) -> RuptureFilter {
        RuptureFilter {
            magnitude_bounds: Bounds::new(self.magnitude_lower_bound, self.magnitude_upper_bound),
            rate_bounds: Bounds::new(
                self.rate_lower_bound.map(|exponent| 10f64.powf(exponent)),
                self.rate_upper_bound.map(|exponent| 10f64.powf(exponent)),
            ),
            fault_count_limit: self.max_fault_count,
            limit,
        }
    }

    /// Values to show in the form inputs
    pub fn form_values(&self) -> FormValues {
        FormValues {
            query: self.query.clone().unwrap_or_default(),
            magnitude_lower_bound: display(self.magnitude_lower_bound),
            magnitude_upper_bound: display(self.magnitude_upper_bound),
            rate_lower_bound: display(self.rate_lower_bound),
            rate_upper_bound: display(self.rate_upper_bound),
            max_fault_count: display(self.max_fault_count),
        }
    }

    /// Index page URL that reproduces this search
    pub fn push_url(&self) -> String {
        let form = self.form_values();
        let fields = [
            ("query", &form.query),
            ("magnitude_lower_bound", &form.magnitude_lower_bound),
            ("magnitude_upper_bound", &form.magnitude_upper_bound),
            ("rate_lower_bound", &form.rate_lower_bound),
            ("rate_upper_bound", &form.rate_upper_bound),
            ("max_fault_count", &form.max_fault_count),
        ];

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in fields.iter().filter(|(_, value)| !value.is_empty()) {
            serializer.append_pair(name, value);
        }
        let encoded = serializer.finish();

        if encoded.is_empty() {
            "/".to_string()
        } else {
            format!("/?{}", encoded)
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_field<T: FromStr>(name: &str, value: &Option<String>) -> Result<Option<T>> {
    match non_empty(value.as_deref()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::InvalidRequest(format!("{} is not a valid number: {}", name, raw))),
    }
}

fn parse_number(name: &str, value: &Option<String>) -> Result<Option<f64>> {
    match parse_field::<f64>(name, value)? {
        Some(number) if !number.is_finite() => Err(AppError::InvalidRequest(format!(
            "{} must be finite",
            name
        ))),
        number => Ok(number),
    }
}

fn check_order(name: &str, lower: Option<f64>, upper: Option<f64>) -> Result<()> {
    match (lower, upper) {
        (Some(lower), Some(upper)) if lower > upper => Err(AppError::InvalidRequest(format!(
            "{} lower bound {} is above upper bound {}",
            name, lower, upper
        ))),
        _ => Ok(()),
    }
}

fn display<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

/// Run a search; None when no query was given
pub async fn run_search(state: &AppState, search: &Search) -> Result<Option<RuptureTable>> {
    let Some(text) = search.query.as_deref() else {
        return Ok(None);
    };

    let expr = query::parse(text)?;
    let names = expr.fault_names();
    let unknown = unknown_faults(state, &names).await?;
    if !unknown.is_empty() {
        warn!(query = %expr, unknown = ?unknown, "Query names unknown faults");
    }

    // One extra row tells the table whether results were cut off.
    let filter = search.filter(state.result_limit.saturating_add(1));
    let ruptures = state.db.query(&expr, &filter).await?;

    info!(
        query = %expr,
        faults = names.len(),
        count = ruptures.len(),
        "Rupture search completed"
    );

    let table = RuptureTable::new(&ruptures, state.result_limit).with_unknown_faults(unknown);
    Ok(Some(table))
}

/// Names that match no parent fault, compared ignoring ASCII case like `COLLATE NOCASE`
async fn unknown_faults(state: &AppState, names: &[&str]) -> Result<Vec<String>> {
    let known: HashSet<String> = state
        .db
        .get_fault_names()
        .await?
        .into_iter()
        .map(|name| name.to_ascii_lowercase())
        .collect();

    Ok(names
        .iter()
        .filter(|name| !known.contains(&name.to_ascii_lowercase()))
        .map(|name| name.to_string())
        .collect())
}

/// POST /ruptures
///
/// Runs the search and returns the results table fragment. The response
/// carries `HX-Push-Url` so the browser URL reflects the search; an empty
/// query clears the results and resets the URL to `/`.
pub async fn ruptures(
    State(state): State<AppState>,
    Form(params): Form<SearchParams>,
) -> Result<Response> {
    let search = params.parse()?;

    let Some(table) = run_search(&state, &search).await? else {
        return Ok(([(HX_PUSH_URL, "/".to_string())], Html(String::new())).into_response());
    };

    let html = state.views.ruptures(&table)?;
    Ok(([(HX_PUSH_URL, search.push_url())], Html(html)).into_response())
}
