use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a tutorial, the key into the progress table.
///
/// Always trimmed and non-empty.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TutorialId(String);

impl TutorialId {
    /// Create a validated tutorial id.
    ///
    /// # Errors
    ///
    /// Returns `TutorialIdError::Empty` if the id is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, TutorialIdError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TutorialIdError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Derive an id from a human-readable title, e.g. `"Build Your First Pack"`
    /// becomes `build-your-first-pack`.
    ///
    /// # Errors
    ///
    /// Returns `TutorialIdError::EmptySlug` if nothing usable remains.
    pub fn from_title(title: &str) -> Result<Self, TutorialIdError> {
        let slug = slugify(title);
        if slug.is_empty() {
            return Err(TutorialIdError::EmptySlug {
                title: title.to_string(),
            });
        }
        Ok(Self(slug))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '-' {
            pending_dash = true;
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        }
    }
    slug
}

impl fmt::Debug for TutorialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TutorialId({:?})", self.0)
    }
}

impl fmt::Display for TutorialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TutorialId {
    type Err = TutorialIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TutorialId {
    type Error = TutorialIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TutorialId> for String {
    fn from(id: TutorialId) -> Self {
        id.0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TutorialIdError {
    #[error("tutorial id cannot be empty")]
    Empty,
    #[error("title {title:?} does not produce a usable tutorial id")]
    EmptySlug { title: String },
}

/// One-based index of a tutorial step.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct StepNumber(u32);

impl StepNumber {
    /// Creates a new `StepNumber`.
    ///
    /// # Errors
    ///
    /// Returns `StepError::Zero` for `0`; steps are numbered from one.
    pub fn new(value: u32) -> Result<Self, StepError> {
        if value == 0 {
            return Err(StepError::Zero);
        }
        Ok(Self(value))
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for StepNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepNumber({})", self.0)
    }
}

impl fmt::Display for StepNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StepNumber {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s.trim().parse().map_err(|_| StepError::Invalid {
            raw: s.to_string(),
        })?;
        Self::new(value)
    }
}

impl TryFrom<u32> for StepNumber {
    type Error = StepError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StepNumber> for u32 {
    fn from(step: StepNumber) -> Self {
        step.0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepError {
    #[error("step numbers start at 1")]
    Zero,
    #[error("invalid step number: {raw}")]
    Invalid { raw: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tutorial_id_is_trimmed() {
        let id = TutorialId::new("  demo-1 ").unwrap();
        assert_eq!(id.as_str(), "demo-1");
        assert_eq!(TutorialId::new("   "), Err(TutorialIdError::Empty));
    }

    #[test]
    fn title_becomes_slug() {
        let id = TutorialId::from_title("  Build Your First Pack!  ").unwrap();
        assert_eq!(id.as_str(), "build-your-first-pack");

        let id = TutorialId::from_title("OAuth --  MCP   setup").unwrap();
        assert_eq!(id.as_str(), "oauth-mcp-setup");

        let id = TutorialId::from_title("snake_case stays").unwrap();
        assert_eq!(id.as_str(), "snake_case-stays");
    }

    #[test]
    fn slug_has_no_edge_dashes() {
        let id = TutorialId::from_title("  Hello ").unwrap();
        assert_eq!(id.as_str(), "hello");
        let id = TutorialId::from_title("-- Hello, world --").unwrap();
        assert_eq!(id.as_str(), "hello-world");
    }

    #[test]
    fn title_without_word_characters_is_rejected() {
        assert!(matches!(
            TutorialId::from_title("?!  --"),
            Err(TutorialIdError::EmptySlug { .. })
        ));
    }

    #[test]
    fn step_zero_is_rejected() {
        assert_eq!(StepNumber::new(0), Err(StepError::Zero));
        assert_eq!(StepNumber::new(3).unwrap().value(), 3);
        assert_eq!("2".parse::<StepNumber>().unwrap().value(), 2);
        assert!(matches!(
            "-1".parse::<StepNumber>(),
            Err(StepError::Invalid { .. })
        ));
    }

    #[test]
    fn serde_validates_on_decode() {
        let step: Result<StepNumber, _> = serde_json::from_str("0");
        assert!(step.is_err());
        let id: Result<TutorialId, _> = serde_json::from_str("\"  \"");
        assert!(id.is_err());
        let id: TutorialId = serde_json::from_str("\"demo-1\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"demo-1\"");
    }
}
