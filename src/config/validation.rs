//! Configuration validation.
//!
//! Semantic checks on top of what serde enforces syntactically. Returns
//! every problem found, not just the first, so a broken config can be
//! fixed in one pass.

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address \"{0}\" is not a valid socket address")]
    BadBindAddress(String),

    #[error("rate_limit.max_requests must be greater than zero")]
    ZeroRateLimit,

    #[error("rate_limit.window_secs must be greater than zero")]
    ZeroRateWindow,

    #[error("timeouts.upstream_secs must be greater than zero")]
    ZeroUpstreamTimeout,

    #[error("app name must not be empty")]
    EmptyAppName,

    #[error("duplicate app name \"{0}\"")]
    DuplicateApp(String),

    #[error("app \"{0}\" has no allowed origins")]
    NoOrigins(String),

    #[error("app \"{app}\" api \"{api}\": url \"{url}\" is not a valid URL")]
    BadApiUrl { app: String, api: String, url: String },

    #[error("app \"{app}\" api \"{api}\": secret_ref must not be empty")]
    EmptySecretRef { app: String, api: String },
}

/// Validate the whole configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::BadBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::ZeroRateLimit);
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroRateWindow);
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroUpstreamTimeout);
    }

    let mut seen = HashSet::new();
    for app in &config.apps {
        if app.name.is_empty() {
            errors.push(ValidationError::EmptyAppName);
        } else if !seen.insert(app.name.clone()) {
            errors.push(ValidationError::DuplicateApp(app.name.clone()));
        }

        if app.origins.is_empty() {
            errors.push(ValidationError::NoOrigins(app.name.clone()));
        }

        for (api_name, api) in &app.apis {
            if Url::parse(&api.url).is_err() {
                errors.push(ValidationError::BadApiUrl {
                    app: app.name.clone(),
                    api: api_name.clone(),
                    url: api.url.clone(),
                });
            }
            if api.secret_ref.is_empty() {
                errors.push(ValidationError::EmptySecretRef {
                    app: app.name.clone(),
                    api: api_name.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ApiConfig, AppConfig};

    fn valid_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        let mut app = AppConfig {
            name: "myblog".into(),
            origins: vec!["https://myblog.com".into()],
            apis: Default::default(),
        };
        app.apis.insert(
            "weather".into(),
            ApiConfig {
                url: "https://api.weather.example/v1".into(),
                secret_ref: "WEATHER_API_KEY".into(),
                method: Default::default(),
                allowed_params: vec!["q".into()],
                allowed_body_fields: vec![],
                cache_ttl_secs: 60,
            },
        );
        config.apps.push(app);
        config
    }

    #[test]
    fn accepts_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = valid_config();
        config.listener.bind_address = "not-an-addr".into();
        config.rate_limit.max_requests = 0;
        config.apps[0].origins.clear();
        config.apps[0].apis.get_mut("weather").unwrap().url = "::bad::".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroRateLimit));
        assert!(errors.contains(&ValidationError::NoOrigins("myblog".into())));
    }

    #[test]
    fn rejects_duplicate_apps() {
        let mut config = valid_config();
        let dup = config.apps[0].clone();
        config.apps.push(dup);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateApp("myblog".into())));
    }
}
