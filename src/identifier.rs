//! 128-bit identifiers for projects and project types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Project type identifier of a standard C# project
pub const CSHARP_PROJECT_TYPE: Identifier =
    Identifier(Uuid::from_u128(0xFAE04EC0_301F_11D3_BF4B_00C04F79EFBC));

/// Raised when text is not a valid identifier
#[derive(Error, Debug)]
#[error("Invalid identifier '{value}': {source}")]
pub struct IdentifierError {
    pub value: String,
    #[source]
    pub source: uuid::Error,
}

/// A GUID as used by project descriptors and solutions.
///
/// `Display` gives the lowercase hyphenated form (`73123bfc-2a8a-...`),
/// [`Identifier::braced`] the uppercase braced form used inside files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(Uuid);

impl Identifier {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse plain, hyphenated or braced text
    pub fn parse(text: &str) -> Result<Self, IdentifierError> {
        let trimmed = text.trim();
        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|source| IdentifierError {
                value: trimmed.to_string(),
                source,
            })
    }

    /// `{73123BFC-2A8A-4160-80FC-597A2B460C66}`
    pub fn braced(&self) -> String {
        format!("{{{}}}", self.0.hyphenated()).to_uppercase()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for Identifier {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_identifiers_are_distinct() {
        let a = Identifier::generate();
        let b = Identifier::generate();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 36);
    }

    #[test]
    fn test_parse_accepts_braced_uppercase() {
        let id = Identifier::parse("{73123BFC-2A8A-4160-80FC-597A2B460C66}").unwrap();
        assert_eq!(id.to_string(), "73123bfc-2a8a-4160-80fc-597a2b460c66");
        assert_eq!(id.braced(), "{73123BFC-2A8A-4160-80FC-597A2B460C66}");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Identifier::parse("not-a-guid").unwrap_err();
        assert_eq!(err.value, "not-a-guid");
    }

    #[test]
    fn test_csharp_project_type_constant() {
        assert_eq!(
            CSHARP_PROJECT_TYPE.braced(),
            "{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}"
        );
    }
}
