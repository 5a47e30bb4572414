//! Static route classification.
//!
//! Paths are matched against an ordered table: public patterns first, then
//! the admin prefix, and everything unmatched is protected by default. The
//! table is process-wide and fixed at compile time.

/// Classification of a request path for access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Reachable by anyone, authenticated or not.
    Public,
    /// Requires an authenticated session with the admin role.
    Admin,
    /// Requires an authenticated session (the default for unmatched paths).
    ProtectedDefault,
}

/// A single path matcher. `Prefix` matches the path itself and any sub-path
/// below it, on segment boundaries (`/pricing` matches `/pricing` and
/// `/pricing/teams`, never `/pricingx`).
#[derive(Debug, Clone, Copy)]
enum Pattern {
    Exact(&'static str),
    Prefix(&'static str),
}

impl Pattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            Pattern::Exact(p) => path == *p,
            Pattern::Prefix(p) => {
                path.len() >= p.len()
                    && path.starts_with(p)
                    && (path.len() == p.len() || path.as_bytes()[p.len()] == b'/')
            }
        }
    }
}

/// Marketing, docs, and bootstrap surfaces — reachable without a session.
const PUBLIC_PATTERNS: &[Pattern] = &[
    Pattern::Exact("/"),
    Pattern::Prefix("/product"),
    Pattern::Prefix("/programs"),
    Pattern::Prefix("/pricing"),
    Pattern::Prefix("/company"),
    Pattern::Prefix("/news"),
    Pattern::Prefix("/docs"),
    Pattern::Exact("/login"),
    Pattern::Prefix("/legal"),
    Pattern::Prefix("/changelog"),
    // Provider callbacks authenticate themselves out of band.
    Pattern::Prefix("/api/v1/webhooks"),
    Pattern::Exact("/api/v1/health"),
    // Introspection degrades to `authenticated: false` instead of being
    // gated — the client bootstrap calls it before any session exists.
    Pattern::Exact("/api/v1/session"),
    Pattern::Exact("/api/v1/leads"),
    Pattern::Exact("/api/v1/track"),
];

const ADMIN_PREFIX: Pattern = Pattern::Prefix("/admin");

/// Classify a request path. Pure and deterministic; evaluated per request so
/// dynamic path segments (`/programs/rust-101`) classify like their parents.
pub fn classify(path: &str) -> RouteClass {
    if PUBLIC_PATTERNS.iter().any(|p| p.matches(path)) {
        return RouteClass::Public;
    }
    if ADMIN_PREFIX.matches(path) {
        return RouteClass::Admin;
    }
    RouteClass::ProtectedDefault
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matches_stop_at_segment_boundaries() {
        assert_eq!(classify("/pricing"), RouteClass::Public);
        assert_eq!(classify("/pricing/teams"), RouteClass::Public);
        assert_eq!(classify("/pricingx"), RouteClass::ProtectedDefault);
    }

    #[test]
    fn root_is_exact() {
        assert_eq!(classify("/"), RouteClass::Public);
        assert_eq!(classify("/dashboard"), RouteClass::ProtectedDefault);
    }

    #[test]
    fn admin_subtree_is_admin() {
        assert_eq!(classify("/admin"), RouteClass::Admin);
        assert_eq!(classify("/admin/users/42"), RouteClass::Admin);
        assert_eq!(classify("/administrator"), RouteClass::ProtectedDefault);
    }

    #[test]
    fn dynamic_segments_classify_like_their_parents() {
        assert_eq!(classify("/programs/rust-101"), RouteClass::Public);
        assert_eq!(classify("/news/2026/08/launch"), RouteClass::Public);
        assert_eq!(classify("/courses/rust-101/lesson/3"), RouteClass::ProtectedDefault);
    }
}
