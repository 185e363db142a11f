use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/illust", get(handlers::illust::list_illusts))
        .route(
            "/illust/:id",
            get(handlers::illust::get_illust).delete(handlers::illust::delete_illust),
        )
        .route("/illust/:id/page/:index", get(handlers::image::get_page_image))
        .route("/tag", get(handlers::tag::list_tags))
        .route("/stats", get(handlers::stats::get_stats))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO)),
        )
        .with_state(state)
}
