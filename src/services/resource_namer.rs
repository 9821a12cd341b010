//! Collision-resistant names for buckets and local temp files.

use uuid::Uuid;

/// Hex characters of the random tag prepended to temp file names
pub const TEMP_FILE_TAG_LEN: usize = 6;

/// `prefix` followed by a fresh hyphenated UUID v4.
///
/// The prefix is not validated; collisions are left to the 122 random bits
/// of the UUID.
pub fn unique_bucket_name(prefix: &str) -> String {
    format!("{}{}", prefix, Uuid::new_v4())
}

/// `file_name` prefixed with a short random hex tag
pub fn temp_file_name(file_name: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("{}{}", &token[..TEMP_FILE_TAG_LEN], file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bucket_names_are_unique() {
        let names: HashSet<String> = (0..1000)
            .map(|_| unique_bucket_name("first-bucket-"))
            .collect();
        assert_eq!(names.len(), 1000);
    }

    #[test]
    fn test_bucket_name_shape() {
        let name = unique_bucket_name("demo-");
        let token = name.strip_prefix("demo-").unwrap();

        assert!(Uuid::parse_str(token).is_ok());
        assert_eq!(token.len(), 36);
        assert_eq!(token, token.to_lowercase());
    }

    #[test]
    fn test_prefix_is_not_validated() {
        assert!(unique_bucket_name("Not A Bucket_").starts_with("Not A Bucket_"));
        assert_eq!(unique_bucket_name("").len(), 36);
    }

    #[test]
    fn test_temp_file_names() {
        let first = temp_file_name("firstfile.txt");
        let second = temp_file_name("firstfile.txt");

        assert_ne!(first, second);
        for name in [&first, &second] {
            let (tag, rest) = name.split_at(TEMP_FILE_TAG_LEN);
            assert_eq!(rest, "firstfile.txt");
            assert!(tag.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }
}
