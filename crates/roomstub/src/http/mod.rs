//! Static HTTP endpoint serving the rooms fixture.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::playbook::HttpFixture;

/// The only path answered with content.
pub const ROOMS_PATH: &str = "/api/v1/rooms.get";

/// `GET /api/v1/rooms.get` returns the fixture; anything else is a bare 404.
pub fn router(fixture: Arc<HttpFixture>) -> Router {
    Router::new()
        // axum answers HEAD with the GET handler unless HEAD has its own.
        .route(
            ROOMS_PATH,
            get(rooms_get).head(not_found).fallback(not_found),
        )
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(fixture)
}

async fn rooms_get(State(fixture): State<Arc<HttpFixture>>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        fixture.body().to_vec(),
    )
        .into_response()
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
