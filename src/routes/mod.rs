//! HTTP routes

pub mod download;
pub mod faults;
pub mod health;
pub mod maps;
pub mod pages;
pub mod ruptures;

use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        // Pages and htmx fragments
        .route("/", get(pages::index))
        .route("/ruptures", post(ruptures::ruptures))
        .route("/rupture_map/:rupture_id", get(maps::rupture_map))
        .route("/download", get(download::download))
        // JSON
        .route("/api/faults", get(faults::fault_names))
        // Health
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        // Stylesheets and icons
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{fixture_database, ALPINE, HOPE, WELLINGTON};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        AppState::new(fixture_database().await, 100, 16).unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> Response {
        app.oneshot(request).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_form(fields: &[(&str, &str)]) -> Request<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        Request::builder()
            .method("POST")
            .uri("/ruptures")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn map_links(html: &str) -> Vec<i64> {
        html.split(r#"hx-get="/rupture_map/"#)
            .skip(1)
            .filter_map(|rest| rest.split('"').next()?.parse().ok())
            .collect()
    }

    #[tokio::test]
    async fn test_index_without_query_has_empty_results() {
        let app = router(test_state().await, "static");
        let response = send(app, get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_text(response).await;
        assert!(html.contains(r#"<div id="results"></div>"#));
        assert!(html.contains(r#"name="max_fault_count""#));
    }

    #[tokio::test]
    async fn test_index_with_query_renders_results_inline() {
        let app = router(test_state().await, "static");
        let response = send(app, get("/?query=Hope%3A+Hanmer&magnitude_lower_bound=")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_text(response).await;
        assert_eq!(map_links(&html), vec![2, 3]);
        assert!(html.contains(">Hope: Hanmer</textarea>"));
    }

    #[tokio::test]
    async fn test_empty_query_clears_results() {
        let app = router(test_state().await, "static");
        let response = send(app, post_form(&[("query", ""), ("magnitude_lower_bound", "")])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["hx-push-url"], "/");
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_returns_fragment_and_push_url() {
        let app = router(test_state().await, "static");
        let response = send(
            app,
            post_form(&[
                ("query", ALPINE),
                ("magnitude_lower_bound", "7"),
                ("magnitude_upper_bound", ""),
                ("rate_lower_bound", ""),
                ("rate_upper_bound", ""),
                ("max_fault_count", ""),
            ]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let push_url = response.headers()["hx-push-url"].to_str().unwrap().to_string();
        assert_eq!(
            push_url,
            "/?query=Alpine%3A+Kaniere+to+Springs+Junction&magnitude_lower_bound=7"
        );

        let html = body_text(response).await;
        assert_eq!(map_links(&html), vec![1, 2, 5]);
        assert!(!html.contains("<html"));
        assert!(html.contains("/download?ruptures=1,2,5"));
    }

    #[tokio::test]
    async fn test_rate_bounds_are_exponents() {
        let app = router(test_state().await, "static");
        let query = format!("{} | {} | {}", ALPINE, HOPE, WELLINGTON);
        let response = send(
            app,
            post_form(&[("query", query.as_str()), ("rate_lower_bound", "-4.5")]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(map_links(&body_text(response).await), vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn test_fault_count_limit() {
        let app = router(test_state().await, "static");
        let query = format!("{} | {} | {}", ALPINE, HOPE, WELLINGTON);
        let response = send(
            app,
            post_form(&[("query", query.as_str()), ("max_fault_count", "1")]),
        )
        .await;
        assert_eq!(map_links(&body_text(response).await), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_no_matches_message() {
        let app = router(test_state().await, "static");
        let response = send(app, post_form(&[("query", "Nowhere")])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("No ruptures match"));
    }

    #[tokio::test]
    async fn test_unknown_fault_names_are_reported() {
        let app = router(test_state().await, "static");
        let query = format!("Nowhere | {}", HOPE.to_uppercase());
        let response = send(app, post_form(&[("query", query.as_str())])).await;
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_text(response).await;
        assert!(html.contains(r#"class="notice""#));
        assert!(html.contains("Unknown fault: Nowhere"));
        assert!(!html.contains("HOPE"));
        assert_eq!(map_links(&html), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_known_fault_names_have_no_notice() {
        let app = router(test_state().await, "static");
        let response = send(app, post_form(&[("query", HOPE)])).await;
        assert!(!body_text(response).await.contains(r#"class="notice""#));
    }

    #[tokio::test]
    async fn test_result_limit_marks_truncation() {
        let query = format!("{} | {} | {}", ALPINE, HOPE, WELLINGTON);

        let state = AppState::new(fixture_database().await, 2, 16).unwrap();
        let html = body_text(send(router(state, "static"), post_form(&[("query", query.as_str())])).await).await;
        assert_eq!(map_links(&html), vec![1, 2]);
        assert!(html.contains("(first 2 shown)"));
        assert!(html.contains("/download?ruptures=1,2\""));

        let state = AppState::new(fixture_database().await, 5, 16).unwrap();
        let html = body_text(send(router(state, "static"), post_form(&[("query", query.as_str())])).await).await;
        assert_eq!(map_links(&html), vec![1, 2, 3, 4, 5]);
        assert!(!html.contains("shown)"));
    }

    #[tokio::test]
    async fn test_bad_query_is_a_client_error() {
        let app = router(test_state().await, "static");
        let response = send(app, post_form(&[("query", "Hope &")])).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains(r#"class="error""#));

        let app = router(test_state().await, "static");
        let response = send(
            app,
            post_form(&[("query", "Hope"), ("magnitude_lower_bound", "seven")]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rupture_map_fragment() {
        let state = test_state().await;
        let app = router(state.clone(), "static");
        let response = send(app, get("/rupture_map/2")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_text(response).await;
        assert!(html.contains("Plotly.newPlot"));
        assert!(html.contains(ALPINE));
        assert!(html.contains("choroplethmap"));
        assert_eq!(state.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_rupture_map_skips_faults_without_geometry() {
        let app = router(test_state().await, "static");
        let html = body_text(send(app, get("/rupture_map/4")).await).await;
        assert!(html.contains(WELLINGTON));
        assert!(!html.contains("Ohariu"));
    }

    #[tokio::test]
    async fn test_unknown_rupture_map_is_not_found() {
        let app = router(test_state().await, "static");
        let response = send(app, get("/rupture_map/99")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_csv() {
        let app = router(test_state().await, "static");
        let response = send(app, get("/download?ruptures=3,1,3")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/x-csv");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=ruptures_"));
        assert!(disposition.ends_with(".csv"));

        let csv = body_text(response).await;
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Rupture ID,Magnitude,Area,Length,Rate",
                "3,6.5,150000000.0,10000.0,0.001",
                "1,7.0,150000000.0,10000.0,0.0001",
            ]
        );
    }

    #[tokio::test]
    async fn test_download_rejects_bad_ids() {
        let app = router(test_state().await, "static");
        let response = send(app, get("/download?ruptures=1,x")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let app = router(test_state().await, "static");
        let response = send(app, get("/download?ruptures=1,99")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_fault_names_api() {
        let app = router(test_state().await, "static");
        let response = send(app, get("/api/faults")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let names: Vec<String> = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(names.len(), 4);
        assert_eq!(names[0], ALPINE);
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let state = test_state().await;
        let response = send(router(state.clone(), "static"), get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(router(state, "static"), get("/ready")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains(r#""status":"ready""#));
    }

    #[tokio::test]
    async fn test_ready_reports_unavailable_database() {
        let state = test_state().await;
        state.db.pool().close().await;

        let response = send(router(state.clone(), "static"), get("/ready")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_text(response).await;
        assert!(body.contains(r#""status":"not_ready""#));
        assert!(body.contains(r#""healthy":false"#));

        let response = send(router(state, "static"), get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_static_assets_are_served() {
        let static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/static");
        let app = router(test_state().await, static_dir);
        let response = send(app, get("/static/css/explorer.css")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
