//! Origin whitelist check.
//!
//! # Design Decisions
//! - Pure function over config and header values; no side effects
//! - Prefix semantics: a whitelisted `http://localhost:3000` admits
//!   `http://localhost:3000/page`
//! - Both headers absent → deny (fails closed)

use crate::config::schema::AppConfig;

/// Returns true if either header value starts with one of the app's
/// whitelisted origin strings.
pub fn is_allowed(app: &AppConfig, origin: Option<&str>, referer: Option<&str>) -> bool {
    [origin, referer]
        .into_iter()
        .flatten()
        .any(|value| app.origins.iter().any(|allowed| value.starts_with(allowed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> AppConfig {
        AppConfig {
            name: "myblog".into(),
            origins: vec![
                "https://myblog.com".into(),
                "http://localhost:3000".into(),
            ],
            apis: Default::default(),
        }
    }

    #[test]
    fn exact_origin_is_allowed() {
        assert!(is_allowed(&app(), Some("https://myblog.com"), None));
    }

    #[test]
    fn referer_alone_suffices() {
        assert!(is_allowed(&app(), None, Some("http://localhost:3000/page")));
    }

    #[test]
    fn prefix_of_whitelisted_entry_is_allowed() {
        assert!(is_allowed(&app(), Some("https://myblog.com/any/path"), None));
    }

    #[test]
    fn unlisted_origin_is_denied() {
        assert!(!is_allowed(&app(), Some("https://evil.com"), None));
        assert!(!is_allowed(&app(), Some("https://evil.com"), Some("https://evil.com/r")));
    }

    #[test]
    fn missing_both_headers_is_denied() {
        assert!(!is_allowed(&app(), None, None));
    }

    #[test]
    fn decision_is_deterministic() {
        let app = app();
        let first = is_allowed(&app, Some("https://myblog.com"), Some("https://evil.com"));
        for _ in 0..10 {
            assert_eq!(
                is_allowed(&app, Some("https://myblog.com"), Some("https://evil.com")),
                first
            );
        }
    }
}
