//! HTTP server setup and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use schedule_core::SystemClock;

use crate::api;
use crate::config::AppConfig;
use crate::gateway;
use crate::gateway::rate_limit::KeyedRateLimiters;
use crate::logging::OpTimer;
use crate::store::{Registry, RunLog, ScheduleStore};
use crate::{log_init_step, log_success, AppState};

/// Create the application with all routes and middleware.
///
/// Returns the router plus the shared state, which the caller also feeds
/// to the [`crate::dispatch::Dispatcher`].
pub fn create_app(config: AppConfig) -> anyhow::Result<(Router, AppState)> {
    let overall_timer = OpTimer::new("server", "create_app");

    // [1/4] Resolve the reference timezone.
    let tz = config
        .timezone()
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    log_init_step!(1, 4, "Timezone", tz.to_string());

    // [2/4] Reference data.
    let registry = if config.scheduling.seed_demo_data {
        Registry::with_demo_data()
    } else {
        Registry::new()
    };
    log_init_step!(
        2,
        4,
        "Registry",
        if config.scheduling.seed_demo_data {
            "demo fleet seeded"
        } else {
            "empty"
        }
    );

    // [3/4] Stores and rate limiters.
    let limiters = Arc::new(KeyedRateLimiters::new(
        config.gateway.rate_limit_per_minute,
        config.gateway.rate_limit_burst,
    ));
    let state = AppState {
        config: Arc::new(config.clone()),
        tz,
        clock: Arc::new(SystemClock),
        registry: Arc::new(registry),
        schedules: Arc::new(ScheduleStore::new()),
        runs: Arc::new(RunLog::new()),
        limiters,
    };
    log_init_step!(3, 4, "Stores", "in-memory schedule store + run log");

    // [4/4] Router with middleware.
    let api_router = Router::new()
        .merge(api::create_router())
        .merge(gateway::create_router());

    let app = api_router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            gateway::rate_limit::rate_limit_middleware,
        ))
        .with_state(state.clone());
    log_init_step!(4, 4, "Router", "routes + middleware configured");

    overall_timer.finish();
    log_success!("Botplane API ready");

    Ok((app, state))
}
