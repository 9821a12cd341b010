use crate::domain::errors::ValidationError;

/// A validated object key in a bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Create a new ObjectKey with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ValidationError::EmptyObjectKey);
        }

        if value.len() > 1024 {
            return Err(ValidationError::ObjectKeyTooLong {
                actual: value.len(),
                max: 1024,
            });
        }

        if value.contains('\0') {
            return Err(ValidationError::InvalidObjectKeyCharacter('\0'));
        }

        if value.starts_with('/') {
            return Err(ValidationError::ObjectKeyStartsWithSlash);
        }

        if value.contains("//") {
            return Err(ValidationError::ObjectKeyContainsDoubleSlash);
        }

        Ok(Self(value))
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accept a key as listed by a provider.
    ///
    /// Providers store keys with a leading `/` or with `//` inside, so only
    /// an empty key is rejected here.
    pub fn from_provider(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ValidationError::EmptyObjectKey);
        }

        Ok(Self(value))
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_object_key() {
        assert!(ObjectKey::new("file.txt").is_ok());
        assert!(ObjectKey::new("a1b2c3firstfile.txt").is_ok());
        assert!(ObjectKey::new("folder/file.txt").is_ok());
    }

    #[test]
    fn test_invalid_object_key() {
        assert!(ObjectKey::new("").is_err());
        assert!(ObjectKey::new("/leading-slash").is_err());
        assert!(ObjectKey::new("double//slash").is_err());
        assert!(ObjectKey::new("null\0byte").is_err());
        assert!(ObjectKey::new("x".repeat(1025)).is_err());
    }

    #[test]
    fn test_provider_keys_are_lenient() {
        let key = ObjectKey::from_provider("/leading-slash.txt").unwrap();
        assert_eq!(key.as_str(), "/leading-slash.txt");
        assert!(ObjectKey::from_provider("logs//x.txt").is_ok());
        assert!(ObjectKey::from_provider("").is_err());
    }
}
