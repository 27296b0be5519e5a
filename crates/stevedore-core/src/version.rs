//! Version string resolution
//!
//! Release builds embed their git ref (`v1.2.3`, `1.2.3`, `release-1.2.3`,
//! `releases/1.2.3`). Anything else is a development build and falls back
//! to the build information.

use once_cell::sync::Lazy;
use regex::Regex;

static SEMVER_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v?\d+\.\d+\.\d+").expect("valid regex"));

/// Resolve a displayable version from a raw ref and an optional fallback
///
/// ```
/// use stevedore_core::resolve_version;
///
/// assert_eq!(resolve_version("1.0.0", None), "v1.0.0");
/// assert_eq!(resolve_version("release-1.0.0", None), "v1.0.0");
/// assert_eq!(resolve_version("main", Some("0.1.0-dev")), "0.1.0-dev");
/// ```
pub fn resolve_version(raw: &str, build_fallback: Option<&str>) -> String {
    let raw = raw.trim();

    for prefix in ["release-", "releases/"] {
        if let Some(rest) = raw.strip_prefix(prefix) {
            return with_v_prefix(rest);
        }
    }

    if SEMVER_LIKE.is_match(raw) {
        return with_v_prefix(raw);
    }

    match build_fallback {
        Some(fallback) if !fallback.trim().is_empty() => fallback.trim().to_string(),
        _ => raw.to_string(),
    }
}

/// Parse a chart version, accepting an optional leading `v`
pub fn parse_chart_version(raw: &str) -> crate::Result<semver::Version> {
    let trimmed = raw.trim().trim_start_matches('v');
    Ok(semver::Version::parse(trimmed)?)
}

fn with_v_prefix(version: &str) -> String {
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{}", version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_refs() {
        assert_eq!(resolve_version("1.0.0", None), "v1.0.0");
        assert_eq!(resolve_version("v1.0.0", None), "v1.0.0");
        assert_eq!(resolve_version("release-1.0.0", None), "v1.0.0");
        assert_eq!(resolve_version("releases/1.0.0", None), "v1.0.0");
        assert_eq!(resolve_version("v1.0.0-rc.1", None), "v1.0.0-rc.1");
    }

    #[test]
    fn test_development_build_uses_fallback() {
        assert_eq!(resolve_version("master", Some("0.1.0 (devel)")), "0.1.0 (devel)");
        assert_eq!(resolve_version("master", None), "master");
        assert_eq!(resolve_version("master", Some("  ")), "master");
    }

    #[test]
    fn test_parse_chart_version() {
        assert_eq!(parse_chart_version("v0.2.0").unwrap(), semver::Version::new(0, 2, 0));
        assert!(parse_chart_version("latest").is_err());
    }
}
