//! Include/exclude pattern matching for interceptors.
//!
//! A pattern is either `method:<VERB>`, compared exactly against the request
//! method, or a shell glob matched against the request URL. `*` stays within
//! one path segment while `**` crosses `/`.
//!
//! ```
//! use axis_net::matcher::Matcher;
//!
//! let matcher = Matcher::new(
//!     Some(vec!["/api/**".into()]),
//!     Some(vec!["method:DELETE".into()]),
//! );
//! assert!(matcher.matches("GET", "/api/users/1"));
//! assert!(!matcher.matches("DELETE", "/api/users/1"));
//! assert!(!matcher.matches("GET", "/static/app.js"));
//! ```

use globset::{GlobBuilder, GlobMatcher};

use axis_core::logging::targets;

const METHOD_PREFIX: &str = "method:";

/// Include/exclude rules shared by every interceptor factory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Patterns a request must match. `None` admits everything.
    pub include: Option<Vec<String>>,
    /// Patterns that reject a request. Takes precedence over `include`.
    pub exclude: Option<Vec<String>>,
}

impl MatchOptions {
    /// Compile these options into a [`Matcher`].
    pub fn matcher(&self) -> Matcher {
        Matcher::new(self.include.clone(), self.exclude.clone())
    }
}

#[derive(Clone, Debug)]
enum Pattern {
    Method(String),
    Glob(GlobMatcher),
    Invalid,
}

impl Pattern {
    fn compile(pattern: &str) -> Self {
        if let Some(method) = pattern.strip_prefix(METHOD_PREFIX) {
            return Self::Method(method.trim().to_string());
        }
        match GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => Self::Glob(glob.compile_matcher()),
            Err(e) => {
                tracing::warn!(target: targets::INTERCEPTORS, pattern, error = %e, "invalid glob pattern, it will never match");
                Self::Invalid
            }
        }
    }

    fn is_match(&self, method: &str, url: &str) -> bool {
        match self {
            Self::Method(expected) => expected == method,
            Self::Glob(glob) => glob.is_match(url),
            Self::Invalid => false,
        }
    }
}

/// A compiled include/exclude predicate over a request's method and URL.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    include: Option<Vec<Pattern>>,
    exclude: Option<Vec<Pattern>>,
}

impl Matcher {
    /// Compile `include` and `exclude` pattern lists.
    pub fn new(include: Option<Vec<String>>, exclude: Option<Vec<String>>) -> Self {
        let compile = |patterns: Vec<String>| {
            patterns
                .iter()
                .map(|p| Pattern::compile(p))
                .collect::<Vec<_>>()
        };
        Self {
            include: include.map(compile),
            exclude: exclude.map(compile),
        }
    }

    /// Decide whether a request is in scope.
    ///
    /// Any exclude match rejects; otherwise the request is accepted when no
    /// include list is given or when one of its patterns matches. An empty
    /// include list therefore accepts nothing.
    pub fn matches(&self, method: &str, url: &str) -> bool {
        let hit = |patterns: &[Pattern]| patterns.iter().any(|p| p.is_match(method, url));

        let result = match (&self.include, &self.exclude) {
            (None, None) => true,
            (_, Some(exclude)) if hit(exclude.as_slice()) => false,
            (None, _) => true,
            (Some(include), _) => hit(include.as_slice()),
        };

        tracing::trace!(target: targets::INTERCEPTORS, method, url, result, "matcher evaluated");
        result
    }
}

/// Build a matcher closure from `include` and `exclude`.
pub fn create_matcher(
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
) -> impl Fn(&str, &str) -> bool + Clone + Send + Sync + 'static {
    let matcher = Matcher::new(include, exclude);
    move |method: &str, url: &str| matcher.matches(method, url)
}

/// Test a single pattern against a method and URL.
pub fn match_pattern(pattern: &str, method: &str, url: &str) -> bool {
    Pattern::compile(pattern).is_match(method, url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(patterns: &[&str]) -> Option<Vec<String>> {
        Some(patterns.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn test_no_rules_matches_everything() {
        let matcher = Matcher::new(None, None);
        assert!(matcher.matches("GET", "/anything"));
        assert!(matcher.matches("", ""));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let matcher = Matcher::new(strings(&["/api/**"]), strings(&["/api/private/**"]));
        assert!(matcher.matches("GET", "/api/public/list"));
        assert!(!matcher.matches("GET", "/api/private/keys"));

        let both = Matcher::new(strings(&["method:GET"]), strings(&["method:GET"]));
        assert!(!both.matches("GET", "/x"));
    }

    #[test]
    fn test_exclude_only() {
        let matcher = Matcher::new(None, strings(&["method:POST"]));
        assert!(matcher.matches("GET", "/users"));
        assert!(!matcher.matches("POST", "/users"));
    }

    #[test]
    fn test_method_pattern_is_exact() {
        assert!(match_pattern("method:POST", "POST", "/x"));
        assert!(match_pattern("method: POST ", "POST", "/x"));
        assert!(!match_pattern("method:POST", "post", "/x"));
        assert!(!match_pattern("method:POST", "POSTS", "/x"));
        assert!(!match_pattern("method:POST", "GET", "/x"));
    }

    #[test]
    fn test_glob_segments() {
        assert!(match_pattern("/users/*", "GET", "/users/42"));
        assert!(!match_pattern("/users/*", "GET", "/users/42/posts"));
        assert!(match_pattern("/users/**", "GET", "/users/42/posts"));
        assert!(match_pattern("/items/?", "GET", "/items/7"));
        assert!(match_pattern("/{a,b}/x", "GET", "/b/x"));
        assert!(match_pattern("/v[12]/x", "GET", "/v2/x"));
    }

    #[test]
    fn test_invalid_glob_never_matches() {
        assert!(!match_pattern("/broken/[", "GET", "/broken/["));
        let matcher = Matcher::new(strings(&["/broken/["]), None);
        assert!(!matcher.matches("GET", "/broken/["));
    }

    #[test]
    fn test_empty_include_matches_nothing() {
        let matcher = Matcher::new(Some(Vec::new()), None);
        assert!(!matcher.matches("GET", "/users"));
    }

    #[test]
    fn test_create_matcher_closure() {
        let matcher = create_matcher(strings(&["method:GET", "/upload/**"]), None);
        let clone = matcher.clone();
        assert!(matcher("GET", "/a"));
        assert!(clone("PUT", "/upload/file"));
        assert!(!matcher("PUT", "/a"));
    }

    #[test]
    fn test_match_options_matcher() {
        let options = MatchOptions {
            include: strings(&["method:PATCH"]),
            exclude: None,
        };
        assert!(options.matcher().matches("PATCH", "/x"));
        assert!(!options.matcher().matches("GET", "/x"));
    }
}
