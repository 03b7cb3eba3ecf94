//! Shared test harness.

use axum_test::TestServer;
use chrono::{Duration, Utc};
use chrono_tz::Europe::Amsterdam;

use botplane_api::config::AppConfig;
use botplane_api::server::create_app;
use botplane_api::AppState;

/// App with the demo fleet seeded and rate limits out of the way.
pub fn test_app() -> (TestServer, AppState) {
    let mut config = AppConfig::default();
    config.gateway.rate_limit_per_minute = 10_000;
    config.gateway.rate_limit_burst = 1_000;
    let (router, state) = create_app(config).expect("app should build");
    (TestServer::new(router).expect("server should start"), state)
}

/// A wire-format schedule time (`YYYY-MM-DD HH:MM`, Amsterdam) relative
/// to now.
pub fn wire_time(from_now: Duration) -> String {
    (Utc::now() + from_now)
        .with_timezone(&Amsterdam)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// The Amsterdam calendar date a number of days from now (`YYYY-MM-DD`).
pub fn wire_date(days_from_now: i64) -> String {
    (Utc::now() + Duration::days(days_from_now))
        .with_timezone(&Amsterdam)
        .format("%Y-%m-%d")
        .to_string()
}
