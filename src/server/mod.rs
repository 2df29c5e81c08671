mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};

use crate::api::{DynAPI, API};
use crate::server::handlers::{quotes, trips};

pub fn router<T: API + Send + Sync + 'static>(api: T) -> Router {
    let api = Arc::new(api) as DynAPI;

    Router::new()
        .route("/quotes", post(quotes::create))
        .route("/trips", post(trips::create))
        .route("/available_trips", get(trips::available))
        .route("/trips/:id", get(trips::find))
        .route("/trips/:id/driver/request", patch(trips::request_driver))
        .route("/trips/:id/driver/assign", patch(trips::assign_driver))
        .route("/trips/:id/status", patch(trips::update_status))
        .layer(Extension(api))
}

pub async fn serve<T: API + Send + Sync + 'static>(api: T, addr: SocketAddr) {
    let app = router(api);

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
