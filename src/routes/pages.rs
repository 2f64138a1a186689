//! Index page

use axum::{
    extract::{Query, State},
    response::Html,
};

use crate::error::Result;
use crate::routes::ruptures::{run_search, SearchParams};
use crate::state::AppState;
use crate::views::IndexPage;

/// GET /
///
/// Renders the search page. When the query string carries a search (as
/// pushed by `POST /ruptures`), the results are rendered inline.
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>> {
    let search = params.parse()?;
    let table = run_search(&state, &search).await?;

    let html = state.views.index(&IndexPage {
        form: search.form_values(),
        table,
    })?;
    Ok(Html(html))
}
