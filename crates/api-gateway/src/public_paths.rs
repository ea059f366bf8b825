//! Public path allowlist.
//!
//! Prefixes match on path-segment boundaries: `/api/auth/login` matches
//! `/api/auth/login` and `/api/auth/login/x`, never `/api/auth/loginx`.

/// True if `path` equals `prefix` or continues it with a new segment.
pub fn matches_prefix(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

/// True if any segment is `.` or `..`, literally or percent-encoded.
///
/// Such paths could escape a public prefix after upstream normalization, so
/// they never qualify as public.
fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        let decoded = segment.replace("%2e", ".").replace("%2E", ".");
        decoded == "." || decoded == ".."
    })
}

/// True if the path carries an encoded slash or a backslash.
///
/// Upstreams that decode these would see different segments than the
/// gateway matched on.
fn has_ambiguous_separator(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.contains("%2f") || lower.contains("%5c") || path.contains('\\')
}

/// Prefixes that need no bearer token. Built once at boot.
#[derive(Debug, Clone, Default)]
pub struct PublicPaths {
    prefixes: Vec<String>,
}

impl PublicPaths {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        !has_dot_segment(path)
            && !has_ambiguous_separator(path)
            && self
                .prefixes
                .iter()
                .any(|prefix| matches_prefix(prefix, path))
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}
