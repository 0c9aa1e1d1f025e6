use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{info, warn};

use crate::condition::Condition;
use crate::error::Result;
use crate::types::ProxyMode;

/// Ordered list of country tokens substituted for `ROGUE` in Reject lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RogueSet {
    codes: Vec<String>,
}

impl RogueSet {
    /// Create an empty rogue set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a rogue set from tokens. Blank tokens are dropped, the rest are
    /// trimmed and upper-cased.
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes = codes
            .into_iter()
            .map(|c| c.as_ref().trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        Self { codes }
    }

    /// Parse one code per line; `#` starts a comment.
    pub fn parse(text: &str) -> Self {
        let set = Self::new(text.lines().map(|line| match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        }));

        for code in &set.codes {
            if !Condition::is_country_code(code) {
                warn!("Rogue entry '{}' is not a country code, it will match as a hostname", code);
            }
        }
        set
    }

    /// Load the rogue list. A missing file yields an empty set.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => {
                let set = Self::parse(&text);
                info!("Loaded {} rogue countries from {}", set.len(), path.display());
                Ok(set)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Rogue list {} not found, ROGUE expands to nothing", path.display());
                Ok(Self::empty())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The rogue set as conditions for a frontend of the given mode, in load order
    pub fn expand(&self, mode: ProxyMode) -> impl Iterator<Item = Condition> + '_ {
        self.codes.iter().map(move |c| Condition::classify(c, mode))
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
