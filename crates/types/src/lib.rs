//! Validated text primitives shared by the trendy crates.
//!
//! Trend selectors are joined with a two-character separator, so every component that
//! takes part in a selector is an [`Identifier`], which cannot contain that separator.

/// Separator used between the components of an encoded trend selector.
pub const IDENTIFIER_SEPARATOR: &str = "__";

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// Errors that can occur when creating an [`Identifier`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("identifier cannot be empty")]
    Empty,
    #[error("identifier '{0}' contains characters other than ASCII letters, digits and '_'")]
    InvalidCharacters(String),
    #[error("identifier '{0}' contains the reserved separator '__'")]
    ContainsSeparator(String),
    #[error("identifier '{0}' cannot start or end with '_'")]
    EdgeUnderscore(String),
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A name that can safely take part in an encoded trend selector.
///
/// Identifiers are ASCII letters, digits and single underscores. They never contain
/// [`IDENTIFIER_SEPARATOR`] and never start or end with `_`, so joining identifiers
/// with the separator and splitting them again is lossless.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validates and wraps `input`.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentifierError`] describing the first rule the input breaks.
    pub fn new(input: impl AsRef<str>) -> Result<Self, IdentifierError> {
        let input = input.as_ref();

        if input.is_empty() {
            return Err(IdentifierError::Empty);
        }

        if !input
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return Err(IdentifierError::InvalidCharacters(input.to_owned()));
        }

        if input.contains(IDENTIFIER_SEPARATOR) {
            return Err(IdentifierError::ContainsSeparator(input.to_owned()));
        }

        if input.starts_with('_') || input.ends_with('_') {
            return Err(IdentifierError::EdgeUnderscore(input.to_owned()));
        }

        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identifier::new(s)
    }
}

impl serde::Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Identifier::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_is_trimmed() {
        let text = NonEmptyText::new("  Allergies ").expect("valid text");
        assert_eq!(text.as_str(), "Allergies");
    }

    #[test]
    fn non_empty_text_rejects_whitespace() {
        assert!(matches!(NonEmptyText::new("   "), Err(TextError::Empty)));
    }

    #[test]
    fn accepts_snake_case_identifiers() {
        let id = Identifier::new("date_of_birth").expect("valid identifier");
        assert_eq!(id.as_str(), "date_of_birth");
        assert_eq!(id.to_string(), "date_of_birth");
    }

    #[test]
    fn rejects_separator() {
        let err = Identifier::new("drug__fk").expect_err("should reject separator");
        assert_eq!(err, IdentifierError::ContainsSeparator("drug__fk".into()));
    }

    #[test]
    fn rejects_edge_underscores() {
        assert!(matches!(
            Identifier::new("_drug"),
            Err(IdentifierError::EdgeUnderscore(_))
        ));
        assert!(matches!(
            Identifier::new("drug_"),
            Err(IdentifierError::EdgeUnderscore(_))
        ));
    }

    #[test]
    fn rejects_punctuation_and_empty() {
        assert_eq!(Identifier::new(""), Err(IdentifierError::Empty));
        assert!(matches!(
            Identifier::new("drug=1"),
            Err(IdentifierError::InvalidCharacters(_))
        ));
    }

    #[test]
    fn deserialize_validates() {
        let ok: Identifier = serde_json::from_str("\"allergies\"").expect("valid json");
        assert_eq!(ok.as_str(), "allergies");

        let err = serde_json::from_str::<Identifier>("\"a__b\"");
        assert!(err.is_err());
    }
}
