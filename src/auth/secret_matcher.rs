//! Detection of "invalid client secret" rejections
//!
//! The identity platform reports a bad secret with an `AADSTS` error code
//! embedded in free text. The exact codes drift between service versions, so
//! the matcher is an extensible list of substrings rather than a fixed check.

/// Substrings recognised out of the box
pub const DEFAULT_INVALID_SECRET_PATTERNS: [&str; 2] = ["AADSTS7000215", "Invalid client secret"];

/// Case-insensitive substring matcher over token acquisition errors
///
/// # Examples
///
/// ```
/// use graph_mcp::auth::secret_matcher::InvalidSecretMatcher;
///
/// let matcher = InvalidSecretMatcher::default();
/// assert!(matcher.matches("invalid_client: AADSTS7000215: Invalid client secret provided."));
/// assert!(!matcher.matches("AADSTS50034: The user account does not exist"));
/// ```
#[derive(Debug, Clone)]
pub struct InvalidSecretMatcher {
    patterns: Vec<String>,
}

impl Default for InvalidSecretMatcher {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_INVALID_SECRET_PATTERNS
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }
}

impl InvalidSecretMatcher {
    /// Matcher with no patterns at all
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Add patterns; blank entries and duplicates are skipped
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            let pattern = pattern.as_ref().trim().to_lowercase();
            if !pattern.is_empty() && !self.patterns.contains(&pattern) {
                self.patterns.push(pattern);
            }
        }
        self
    }

    /// True if `message` contains any known pattern
    pub fn matches(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.patterns.iter().any(|p| message.contains(p.as_str()))
    }

    /// The active patterns, lowercased
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
