//! Steam Guard code extraction.

use regex::Regex;

use guardrelay_types::RelayError;

/// Pulls the login code out of a decoded message body.
#[derive(Debug, Clone)]
pub struct CodeExtractor {
    pattern: Regex,
}

impl CodeExtractor {
    /// Matches `Login Code` followed by optional whitespace and the code.
    pub const DEFAULT_PATTERN: &'static str = r"Login Code\s*([A-Za-z0-9]+)";

    /// Compile `pattern`. The first capture group is taken as the code, so
    /// the pattern must have one.
    pub fn new(pattern: &str) -> Result<Self, RelayError> {
        let pattern = Regex::new(pattern).map_err(|e| RelayError::ConfigInvalid {
            reason: format!("invalid mailbox.code_pattern: {e}"),
        })?;
        if pattern.captures_len() < 2 {
            return Err(RelayError::ConfigInvalid {
                reason: "mailbox.code_pattern needs a capture group for the code".into(),
            });
        }
        Ok(Self { pattern })
    }

    /// First capture of the first match in `body`.
    pub fn extract(&self, body: &str) -> Option<String> {
        self.pattern
            .captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

impl Default for CodeExtractor {
    fn default() -> Self {
        Self {
            pattern: Regex::new(Self::DEFAULT_PATTERN).expect("default code pattern compiles"),
        }
    }
}
