use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::PathBuf;

/// Filesystem storage rooted at `base_path`. Absolute paths bypass the root.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new(".")
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.resolve(path))?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.resolve(dir))? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path());

        storage
            .write_file("statistics/StationStats.csv", b"StationId\n")
            .await
            .unwrap();

        let data = storage.read_file("statistics/StationStats.csv").await.unwrap();
        assert_eq!(data, b"StationId\n");
    }

    #[tokio::test]
    async fn test_list_files_is_sorted_and_skips_directories() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Facility-B.txt"), "b").unwrap();
        std::fs::write(temp.path().join("Facility-A.txt"), "a").unwrap();
        std::fs::create_dir(temp.path().join("nested")).unwrap();

        let storage = LocalStorage::new(temp.path());
        let names = storage.list_files(".").await.unwrap();

        assert_eq!(names, vec!["Facility-A.txt", "Facility-B.txt"]);
    }

    #[tokio::test]
    async fn test_absolute_paths_ignore_base() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("report.txt");
        std::fs::write(&file, "content").unwrap();

        let storage = LocalStorage::new("/nonexistent-base");
        let data = storage.read_file(&file.to_string_lossy()).await.unwrap();
        assert_eq!(data, b"content");
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_io_error() {
        let storage = LocalStorage::default();
        let err = storage.list_files("/nonexistent/satlink/input").await.unwrap_err();
        assert!(matches!(err, crate::utils::error::SatLinkError::IoError(_)));
    }
}
