//! CORS layer built from [`CorsConfig`].

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::config::CorsConfig;

/// Create the CORS layer for the HTTP router.
pub fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    let wildcard = config.allowed_origins.iter().any(|o| o == "*");

    let origins = if wildcard {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();

    let headers: Vec<HeaderName> = config
        .allowed_headers
        .iter()
        .filter_map(|h| h.parse().ok())
        .collect();

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .max_age(Duration::from_secs(config.max_age));

    // Browsers reject credentials combined with a wildcard origin.
    if config.allow_credentials && wildcard {
        warn!("Wildcard CORS origin configured, credentials disabled");
    } else if config.allow_credentials {
        cors = cors.allow_credentials(true);
    }

    cors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cors_config() {
        let config = CorsConfig::default();
        let _layer = create_cors_layer(&config);
    }

    #[test]
    fn test_wildcard_origin_without_credentials() {
        let config = CorsConfig {
            allowed_origins: vec!["*".into()],
            ..Default::default()
        };
        let _layer = create_cors_layer(&config);
    }
}
