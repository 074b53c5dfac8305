//! Client classification.
//!
//! Decides which applications are two-way communication clients worth
//! tracking, which canonical name they are tracked under, and which of them
//! may keep the output stream open without holding the headset in duplex mode.

use std::collections::BTreeMap;

use regex::Regex;

use super::event::StreamKind;
use crate::config::{ClientPattern, ClientsConfig, MatchStrategy};
use crate::error::SwitcherError;

/// A compiled, case-sensitive name matcher.
#[derive(Debug, Clone)]
enum Matcher {
    Exact(String),
    Contains(String),
    StartsWith(String),
    Regex(Regex),
}

impl Matcher {
    fn compile(pattern: &ClientPattern) -> Result<Self, SwitcherError> {
        let name = pattern.name().to_string();
        Ok(match pattern.strategy() {
            MatchStrategy::Exact => Self::Exact(name),
            MatchStrategy::Contains => Self::Contains(name),
            MatchStrategy::StartsWith => Self::StartsWith(name),
            // Anchored so the whole application name has to match.
            MatchStrategy::Regex => Self::Regex(Regex::new(&format!("^(?:{name})$"))?),
        })
    }

    fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Exact(pattern) => name == pattern,
            Self::Contains(pattern) => name.contains(pattern.as_str()),
            Self::StartsWith(pattern) => name.starts_with(pattern.as_str()),
            Self::Regex(regex) => regex.is_match(name),
        }
    }
}

fn compile_all(patterns: &[ClientPattern]) -> Result<Vec<Matcher>, SwitcherError> {
    patterns.iter().map(Matcher::compile).collect()
}

/// Classifies application names into tracked clients.
#[derive(Debug, Clone)]
pub struct ClientClassifier {
    allow: Vec<Matcher>,
    persistent: Vec<Matcher>,
    aliases: BTreeMap<String, String>,
}

impl ClientClassifier {
    /// Builds a classifier from the client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SwitcherError::Config`] if a regex pattern is invalid.
    pub fn new(config: &ClientsConfig) -> Result<Self, SwitcherError> {
        Ok(Self {
            allow: compile_all(&config.allow)?,
            persistent: compile_all(&config.persistent_speakers)?,
            aliases: config.aliases.clone(),
        })
    }

    /// Returns the canonical client name for a stream, or `None` if the
    /// application is not an allowed client.
    #[must_use]
    pub fn classify(&self, kind: StreamKind, application: &str) -> Option<String> {
        if !self.allow.iter().any(|matcher| matcher.is_match(application)) {
            tracing::debug!(%kind, application, "ignoring unrecognized client");
            return None;
        }

        let canonical = self.aliases.get(application).map_or(application, String::as_str);
        tracing::trace!(%kind, application, canonical, "recognized client");
        Some(canonical.to_string())
    }

    /// Returns whether a canonical client may hold only the output stream
    /// without keeping the device in duplex mode.
    #[must_use]
    pub fn is_persistent_speaker(&self, canonical: &str) -> bool {
        self.persistent.iter().any(|matcher| matcher.is_match(canonical))
    }
}
