use std::io;
use std::path::PathBuf;
use tracing::debug;

use crate::services::resource_namer::temp_file_name;

/// A local file created for a run
#[derive(Debug, Clone, PartialEq)]
pub struct TempFile {
    /// Generated file name, also used as the object key
    pub name: String,
    pub path: PathBuf,
}

/// Creates uniquely named files in a working directory and removes them again
#[derive(Debug)]
pub struct TempFiles {
    dir: PathBuf,
    created: Vec<PathBuf>,
}

impl TempFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            created: Vec::new(),
        }
    }

    /// Write `content` repeated `size` times to a new file named after `file_name`
    pub async fn create(
        &mut self,
        size: usize,
        file_name: &str,
        content: &str,
    ) -> io::Result<TempFile> {
        let name = temp_file_name(file_name);
        let path = self.dir.join(&name);

        tokio::fs::write(&path, content.repeat(size)).await?;
        debug!(path = %path.display(), bytes = size * content.len(), "created temp file");

        self.created.push(path.clone());
        Ok(TempFile { name, path })
    }

    /// Remember a file created elsewhere so `remove_all` deletes it too
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.created.push(path.into());
    }

    /// Delete every remembered file; files already gone are skipped.
    /// Returns how many files were removed.
    pub async fn remove_all(&mut self) -> io::Result<usize> {
        let mut removed = 0;
        while let Some(path) = self.created.pop() {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    self.created.push(path);
                    return Err(e);
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_writes_repeated_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = TempFiles::new(dir.path());

        let file = files.create(300, "firstfile.txt", "f").await.unwrap();
        let content = tokio::fs::read_to_string(&file.path).await.unwrap();

        assert!(file.name.ends_with("firstfile.txt"));
        assert_eq!(file.path, dir.path().join(&file.name));
        assert_eq!(content, "f".repeat(300));
    }

    #[tokio::test]
    async fn test_same_file_name_gives_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = TempFiles::new(dir.path());

        let a = files.create(1, "same.txt", "a").await.unwrap();
        let b = files.create(1, "same.txt", "b").await.unwrap();

        assert_ne!(a.path, b.path);
    }

    #[tokio::test]
    async fn test_remove_all_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = TempFiles::new(dir.path());

        let kept = files.create(10, "kept.txt", "k").await.unwrap();
        let gone = files.create(10, "gone.txt", "g").await.unwrap();
        tokio::fs::remove_file(&gone.path).await.unwrap();
        files.track(dir.path().join("never-created.txt"));

        assert_eq!(files.remove_all().await.unwrap(), 1);
        assert!(!kept.path.exists());
        assert_eq!(files.remove_all().await.unwrap(), 0);
    }
}
