//! HTTP server for the forwarder API.
//!
//! Exposes registration, nonce lookup, verification and execution under
//! the `/api` base path.

use crate::apis;
use axum::{
	extract::{DefaultBodyLimit, Path, State},
	response::Json,
	routing::{get, post},
	Router,
};
use forwarder_config::ApiConfig;
use forwarder_core::ForwardingEngine;
use forwarder_types::{
	APIError, Address, ExecuteRequest, ExecutionResult, NonceResponse, RegisterDomainRequest,
	RegisterDomainResponse, RegisterTypeRequest, RegisterTypeResponse, RegisteredDomain,
	RegisteredType, SignedForwardRequest, VerifyResponse,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Engine serving every request.
	pub engine: Arc<ForwardingEngine>,
	/// Relayers allowed to attach value to executions.
	pub relayers: Arc<HashSet<Address>>,
}

/// Builds the API router.
pub fn router(engine: Arc<ForwardingEngine>, api_config: &ApiConfig) -> Router {
	let state = AppState {
		engine,
		relayers: Arc::new(api_config.relayers.iter().copied().collect()),
	};

	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/types", post(handle_register_type))
				.route("/types/{hash}", get(handle_get_type))
				.route("/domains", post(handle_register_domain))
				.route("/domains/{separator}", get(handle_get_domain))
				.route("/nonces/{address}", get(handle_get_nonce))
				.route("/verify", post(handle_verify))
				.route("/execute", post(handle_execute)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(CorsLayer::permissive())
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(state)
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<ForwardingEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Forwarder API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles POST /api/types requests.
async fn handle_register_type(
	State(state): State<AppState>,
	Json(request): Json<RegisterTypeRequest>,
) -> Result<Json<RegisterTypeResponse>, APIError> {
	match apis::registry::register_type(&state.engine, request).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Type registration failed: {}", e);
			Err(e)
		},
	}
}

/// Handles GET /api/types/{hash} requests.
async fn handle_get_type(
	Path(hash): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<RegisteredType>, APIError> {
	apis::registry::get_type(&state.engine, &hash).await.map(Json)
}

/// Handles POST /api/domains requests.
async fn handle_register_domain(
	State(state): State<AppState>,
	Json(request): Json<RegisterDomainRequest>,
) -> Result<Json<RegisterDomainResponse>, APIError> {
	match apis::registry::register_domain(&state.engine, request).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Domain registration failed: {}", e);
			Err(e)
		},
	}
}

/// Handles GET /api/domains/{separator} requests.
async fn handle_get_domain(
	Path(separator): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<RegisteredDomain>, APIError> {
	apis::registry::get_domain(&state.engine, &separator)
		.await
		.map(Json)
}

/// Handles GET /api/nonces/{address} requests.
async fn handle_get_nonce(
	Path(address): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<NonceResponse>, APIError> {
	apis::registry::get_nonce(&state.engine, &address)
		.await
		.map(Json)
}

/// Handles POST /api/verify requests.
async fn handle_verify(
	State(state): State<AppState>,
	Json(request): Json<SignedForwardRequest>,
) -> Result<Json<VerifyResponse>, APIError> {
	match apis::forward::verify(&state.engine, request).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Verification failed: {}", e);
			Err(e)
		},
	}
}

/// Handles POST /api/execute requests.
async fn handle_execute(
	State(state): State<AppState>,
	Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecutionResult>, APIError> {
	match apis::forward::execute(&state.engine, &state.relayers, request).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Execution failed: {}", e);
			Err(e)
		},
	}
}
