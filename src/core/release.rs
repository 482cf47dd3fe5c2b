//! Release selection
//!
//! Pure list operations over version identifiers:
//! - Filtering release tags by a minimum semver version
//! - Excluding versions, including their tagged variants

use semver::Version;
use thiserror::Error;

/// Errors related to release selection
#[derive(Error, Debug, PartialEq)]
pub enum ReleaseError {
    /// Invalid version format
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// Request to the release API failed
    #[error("Failed to list releases from '{url}': {error}")]
    Network { url: String, error: String },

    /// Release API returned something unexpected
    #[error("Unexpected response from '{url}': {error}")]
    InvalidResponse { url: String, error: String },
}

/// Parse a release tag as semver, accepting a leading `v`
pub fn parse_release(tag: &str) -> Result<Version, ReleaseError> {
    let trimmed = tag.strip_prefix('v').unwrap_or(tag);
    Version::parse(trimmed).map_err(|e| ReleaseError::InvalidVersion {
        version: tag.to_string(),
        reason: e.to_string(),
    })
}

/// Whether `version` names a release tag rather than a branch
pub fn is_release_tag(version: &str) -> bool {
    parse_release(version).is_ok()
}

/// Keep the release tags at or above `min_version`
///
/// Tags that are not semver are dropped. The result is sorted in ascending
/// semver order without duplicates.
pub fn filter_releases<S: AsRef<str>>(
    tags: &[S],
    min_version: &str,
) -> Result<Vec<String>, ReleaseError> {
    let min = parse_release(min_version)?;

    let mut releases: Vec<(Version, String)> = tags
        .iter()
        .map(AsRef::as_ref)
        .filter_map(|tag| match parse_release(tag) {
            Ok(version) => Some((version, tag.to_string())),
            Err(_) => {
                tracing::debug!("Ignoring non-release tag '{tag}'");
                None
            }
        })
        .filter(|(version, _)| *version >= min)
        .collect();

    releases.sort();
    releases.dedup_by(|a, b| a.1 == b.1);
    Ok(releases.into_iter().map(|(_, tag)| tag).collect())
}

/// Remove excluded versions from `versions`
///
/// A version is removed when it equals an excluded entry or is a tagged
/// variant of one (`<excluded>-<suffix>`). Order is preserved.
pub fn exclude<S: AsRef<str>, E: AsRef<str>>(versions: &[S], excluded: &[E]) -> Vec<String> {
    versions
        .iter()
        .map(AsRef::as_ref)
        .filter(|version| {
            !excluded
                .iter()
                .map(AsRef::as_ref)
                .any(|ex| is_excluded_by(version, ex))
        })
        .map(str::to_string)
        .collect()
}

fn is_excluded_by(version: &str, excluded: &str) -> bool {
    match version.strip_prefix(excluded) {
        Some("") => true,
        Some(rest) => rest.starts_with('-'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators::*;
    use proptest::prelude::*;

    // ============================================
    // Unit Tests - exclude
    // ============================================

    #[test]
    fn test_exclude_removes_exact_match() {
        let versions = ["v1.0.0", "v1.1.1-antfarm", "master"];
        assert_eq!(
            exclude(&versions, &["v1.0.0"]),
            vec!["v1.1.1-antfarm", "master"]
        );
    }

    #[test]
    fn test_exclude_removes_tagged_variants() {
        let versions = ["v1.2.3", "v1.2.3-antfarm", "v1.2.30", "v1.2.4"];
        assert_eq!(exclude(&versions, &["v1.2.3"]), vec!["v1.2.30", "v1.2.4"]);
    }

    #[test]
    fn test_exclude_variant_keeps_bare_version() {
        let versions = ["v1.2.3", "v1.2.3-antfarm"];
        assert_eq!(exclude(&versions, &["v1.2.3-antfarm"]), vec!["v1.2.3"]);
    }

    #[test]
    fn test_exclude_nothing() {
        let versions = ["v1.0.0", "master"];
        let none: [&str; 0] = [];
        assert_eq!(exclude(&versions, &none), vec!["v1.0.0", "master"]);
    }

    // ============================================
    // Unit Tests - filter_releases
    // ============================================

    #[test]
    fn test_filter_releases_applies_minimum() {
        let tags = ["v0.9.0", "v1.0.0", "v1.2.0", "v1.1.0"];
        assert_eq!(
            filter_releases(&tags, "v1.0.0").unwrap(),
            vec!["v1.0.0", "v1.1.0", "v1.2.0"]
        );
    }

    #[test]
    fn test_filter_releases_drops_non_semver() {
        let tags = ["master", "v1.0.0", "nightly-2024", "1.1.0"];
        assert_eq!(
            filter_releases(&tags, "1.0.0").unwrap(),
            vec!["v1.0.0", "1.1.0"]
        );
    }

    #[test]
    fn test_filter_releases_orders_prerelease_before_release() {
        let tags = ["v1.1.0", "v1.1.0-rc1", "v1.0.0"];
        assert_eq!(
            filter_releases(&tags, "v1.0.0").unwrap(),
            vec!["v1.0.0", "v1.1.0-rc1", "v1.1.0"]
        );
    }

    #[test]
    fn test_filter_releases_invalid_minimum() {
        let result = filter_releases(&["v1.0.0"], "latest");
        assert!(matches!(result, Err(ReleaseError::InvalidVersion { .. })));
    }

    #[test]
    fn test_is_release_tag() {
        assert!(is_release_tag("v1.5.0"));
        assert!(is_release_tag("1.5.0-rc.1"));
        assert!(!is_release_tag("master"));
        assert!(!is_release_tag("v1.5"));
    }

    // ============================================
    // Property-Based Tests
    // ============================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Excluding the same list twice changes nothing the second time
        #[test]
        fn prop_exclude_idempotent(versions in version_list(), excluded in version_list()) {
            let once = exclude(&versions, &excluded);
            let twice = exclude(&once, &excluded);
            prop_assert_eq!(once, twice);
        }

        /// No excluded version or tagged variant of it survives
        #[test]
        fn prop_exclude_removes_variants(
            tag in release_tag(),
            suffix in variant_suffix(),
            versions in version_list(),
        ) {
            let mut all = versions.clone();
            all.push(tag.clone());
            all.push(format!("{tag}-{suffix}"));

            let kept = exclude(&all, &[tag.clone()]);
            let variant_prefix = format!("{tag}-");
            prop_assert!(kept.iter().all(|v| *v != tag && !v.starts_with(&variant_prefix)));
        }

        /// Survivors keep their relative order
        #[test]
        fn prop_exclude_preserves_order(versions in version_list(), excluded in version_list()) {
            let kept = exclude(&versions, &excluded);
            let mut remaining = versions.iter();
            for v in &kept {
                prop_assert!(remaining.any(|orig| orig == v));
            }
        }

        /// Filtered releases are sorted and all at or above the minimum
        #[test]
        fn prop_filter_releases_sorted(versions in version_list(), min in release_tag()) {
            let filtered = filter_releases(&versions, &min).unwrap();
            let min = parse_release(&min).unwrap();
            let parsed: Vec<_> = filtered.iter().map(|t| parse_release(t).unwrap()).collect();
            prop_assert!(parsed.iter().all(|v| *v >= min));
            prop_assert!(parsed.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
