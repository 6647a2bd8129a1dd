use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::{Router, middleware, routing::get};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, warn};

use crate::auth::{AUTH_HEADER, require_secret};
use crate::config::Mode;
use crate::{AppState, handlers};

/// Routes that sit behind the shared-secret check
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/login", get(handlers::get_login))
        .route("/contents", get(handlers::get_contents))
        .route("/content", get(handlers::get_content))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_secret))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/version", get(handlers::version))
        .route("/configuration", get(handlers::get_configuration))
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    let mut router = Router::new()
        .merge(public_routes())
        .merge(protected_routes(&state));

    // Everything else is the web UI
    if let Some(static_path) = &state.config.static_path {
        router = router.fallback_service(ServeDir::new(static_path));
    }

    if let Some(cors) = build_cors_layer(&state) {
        router = router.layer(cors);
    }

    router.layer(trace_layer).with_state(state)
}

/// CORS is only needed when the UI is served by a separate dev server.
fn build_cors_layer(state: &AppState) -> Option<CorsLayer> {
    if state.config.mode != Mode::Dev {
        return None;
    }

    let origin = &state.config.dev_cors_frontend_url;
    let allow_origin = match origin.parse::<HeaderValue>() {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            warn!("CORS: Invalid dev frontend origin {:?}, allowing any origin", origin);
            AllowOrigin::any()
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                header::ACCEPT,
                HeaderName::from_static(AUTH_HEADER),
            ])
            .expose_headers([header::CONTENT_DISPOSITION]),
    )
}
