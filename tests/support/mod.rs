//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use comicwiki_core::ConnectorConfig;
use tracing_subscriber::EnvFilter;
use wiremock::MockServer;

pub const SEARCH_KLO: &str = include_str!("../fixtures/search_klo.html");
pub const SEARCH_LOISEL_KLO: &str = include_str!("../fixtures/search_loisel_klo.html");
pub const KLO_1: &str = include_str!("../fixtures/klo_1.html");
pub const NOT_FOUND: &str = include_str!("../fixtures/not_found.html");

/// Installs a test-writer subscriber honoring `RUST_LOG`; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config pointing search and site origin at `server`, without spawn stagger.
pub fn config_for(server: &MockServer) -> ConnectorConfig {
    ConnectorConfig {
        search_endpoint: format!("{}/search", server.uri()),
        site_origin: server.uri(),
        spawn_stagger_ms: 0,
        page_timeout_secs: 5,
        default_timeout_secs: 5,
        ..ConnectorConfig::default()
    }
}
