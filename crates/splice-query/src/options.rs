//! Rewrite configuration.

use std::fmt;

/// What to do with a tagged call that cannot be rewritten.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Fallback {
    /// Leave the call in place silently.
    Ignore,
    /// Leave the call in place and log a warning.
    #[default]
    Warn,
    /// Abort the rewrite with [`crate::RewriteError::UnhandledTag`].
    Deny,
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Fallback::Ignore => "ignore",
            Fallback::Warn => "warn",
            Fallback::Deny => "deny",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewriteOptions {
    pub fallback: Fallback,
    /// Maximum nesting of expansions, redirects and parameter resolutions.
    pub max_depth: usize,
}

impl RewriteOptions {
    pub const DEFAULT_MAX_DEPTH: usize = 256;

    pub fn new() -> Self {
        RewriteOptions {
            fallback: Fallback::default(),
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self::new()
    }
}
