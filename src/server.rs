//! HTTP routes for the dashboard.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use pidash_core::{AppError, Location};
use pidash_weather::WeatherProvider;
use serde::Serialize;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// Shared by every request
#[derive(Clone)]
pub struct AppState {
    pub provider: WeatherProvider,
    pub locations: Arc<Vec<Location>>,
    pub frontend_dir: PathBuf,
}

/// Serve until Ctrl-C.
pub async fn run(address: SocketAddr, state: AppState) -> Result<(), AppError> {
    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(address, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .map_err(|e| AppError::Server(format!("{}: {}", address, e)))?;

    tracing::info!("Listening on http://{}", bound);
    server.await;
    tracing::info!("Server stopped");
    Ok(())
}

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health_route = warp::path!("api" / "health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "ok": true })));

    let weather_route = warp::path!("api" / "weather")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(weather);

    let index_route = warp::path::end()
        .and(warp::get())
        .and(warp::fs::file(state.frontend_dir.join("index.html")));

    let static_route = warp::path("static").and(warp::fs::dir(state.frontend_dir));

    health_route
        .or(weather_route)
        .or(index_route)
        .or(static_route)
        .recover(rejection)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

async fn weather(state: AppState) -> Result<impl Reply, Rejection> {
    let payload = state.provider.build_payload(state.locations.as_slice()).await;
    Ok(warp::reply::json(&payload))
}

#[derive(Serialize)]
struct ErrorMessage {
    code: u16,
    message: String,
}

async fn rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found.")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
    };

    let json = warp::reply::json(&ErrorMessage {
        code: code.as_u16(),
        message: message.into(),
    });

    Ok(warp::reply::with_status(json, code))
}
