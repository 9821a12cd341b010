use crate::domain::errors::ValidationError;
use crate::services::resource_namer;

/// A validated bucket name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketName(String);

impl BucketName {
    /// Create a new BucketName with S3 naming rules
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.len() < 3 {
            return Err(ValidationError::BucketNameTooShort {
                actual: value.len(),
                min: 3,
            });
        }

        if value.len() > 63 {
            return Err(ValidationError::BucketNameTooLong {
                actual: value.len(),
                max: 63,
            });
        }

        // Must start and end with lowercase letter or number
        if !value
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(ValidationError::BucketNameInvalidStart);
        }

        if !value
            .chars()
            .last()
            .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(ValidationError::BucketNameInvalidEnd);
        }

        for c in value.chars() {
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '.' {
                return Err(ValidationError::BucketNameInvalidCharacter(c));
            }
        }

        if value.contains("--") {
            return Err(ValidationError::BucketNameConsecutiveHyphens);
        }

        if value.contains("..") {
            return Err(ValidationError::BucketNameConsecutiveDots);
        }

        if Self::looks_like_ip_address(&value) {
            return Err(ValidationError::BucketNameLooksLikeIpAddress);
        }

        Ok(Self(value))
    }

    /// Generate a fresh bucket name from `prefix` and validate it.
    ///
    /// The prefix is not checked on its own; an illegal prefix surfaces as the
    /// validation error of the combined name.
    pub fn generate(prefix: &str) -> Result<Self, ValidationError> {
        Self::new(resource_namer::unique_bucket_name(prefix))
    }

    /// Get the bucket name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn looks_like_ip_address(s: &str) -> bool {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 4 {
            return false;
        }

        parts.iter().all(|part| part.parse::<u8>().is_ok())
    }
}

impl std::fmt::Display for BucketName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BucketName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_bucket_names() {
        assert!(BucketName::new("my-bucket").is_ok());
        assert!(BucketName::new("bucket123").is_ok());
        assert!(BucketName::new("123bucket").is_ok());
        assert!(BucketName::new("my.bucket.logs").is_ok());
    }

    #[test]
    fn test_invalid_bucket_names() {
        assert!(BucketName::new("ab").is_err());
        assert!(BucketName::new("a".repeat(64)).is_err());
        assert!(BucketName::new("-bucket").is_err());
        assert!(BucketName::new("bucket-").is_err());
        assert!(BucketName::new("Bucket").is_err());
        assert!(BucketName::new("my_bucket").is_err());
        assert!(BucketName::new("my bucket").is_err());
        assert!(BucketName::new("my--bucket").is_err());
        assert!(BucketName::new("my..bucket").is_err());
        assert!(BucketName::new("192.168.1.1").is_err());
    }

    #[test]
    fn test_generate_from_prefix() {
        let first = BucketName::generate("first-bucket-").unwrap();
        let second = BucketName::generate("first-bucket-").unwrap();

        assert!(first.as_str().starts_with("first-bucket-"));
        assert_eq!(first.as_str().len(), "first-bucket-".len() + 36);
        assert_ne!(first, second);
    }

    #[test]
    fn test_generate_rejects_illegal_prefix() {
        assert_eq!(
            BucketName::generate("Upper"),
            Err(ValidationError::BucketNameInvalidStart)
        );
        assert!(matches!(
            BucketName::generate(&"x".repeat(40)),
            Err(ValidationError::BucketNameTooLong { .. })
        ));
    }
}
