//! Path-template and method matching shared by RBAC rules and route policies.
//!
//! Templates use `{name}` placeholders; a placeholder matches exactly one
//! non-empty path segment. Each template is compiled into its own `matchit`
//! router so that overlapping templates never conflict at insert time and
//! callers keep full control over precedence.

use std::collections::BTreeSet;
use std::fmt;

/// Error compiling a path template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathTemplateError {
    #[error("path template is empty")]
    Empty,

    #[error("path template must start with '/'")]
    NotAbsolute,

    #[error("catch-all placeholders are not supported")]
    CatchAll,

    #[error("{0}")]
    Invalid(String),
}

/// A compiled path template.
pub struct PathTemplate {
    raw: String,
    templated: bool,
    router: matchit::Router<()>,
}

impl PathTemplate {
    /// Compile a template such as `/content/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`PathTemplateError`] if the template is empty, relative,
    /// uses a catch-all placeholder, or is otherwise rejected by the router.
    pub fn parse(raw: &str) -> Result<Self, PathTemplateError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathTemplateError::Empty);
        }
        if !raw.starts_with('/') {
            return Err(PathTemplateError::NotAbsolute);
        }
        if raw.contains("{*") {
            return Err(PathTemplateError::CatchAll);
        }

        let mut router = matchit::Router::new();
        router
            .insert(raw, ())
            .map_err(|e| PathTemplateError::Invalid(e.to_string()))?;

        Ok(Self {
            raw: raw.to_owned(),
            templated: raw.contains('{'),
            router,
        })
    }

    /// The template as written in configuration.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the template contains at least one placeholder.
    #[must_use]
    pub fn is_templated(&self) -> bool {
        self.templated
    }

    /// Whether `path` matches this template.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.router.at(path).is_ok()
    }
}

impl fmt::Debug for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathTemplate")
            .field("raw", &self.raw)
            .field("templated", &self.templated)
            .finish_non_exhaustive()
    }
}

impl PartialEq for PathTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for PathTemplate {}

/// A normalized (upper-case) set of HTTP method names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet(BTreeSet<String>);

impl MethodSet {
    /// Case-insensitive exact membership.
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.0.contains(&method.to_ascii_uppercase())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for MethodSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|m| m.as_ref().trim().to_ascii_uppercase())
                .filter(|m| !m.is_empty())
                .collect(),
        )
    }
}
