use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, instrument};

use crate::models::FileId;

/// Directory shared with the preprocessing service. Raw POWER responses are
/// written here and the service reads them back by path.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    dir: PathBuf,
}

impl DatasetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Server-side path of the raw dataset for `id`
    #[must_use]
    pub fn path_for(&self, id: &FileId) -> PathBuf {
        self.dir.join(id.dataset_file_name())
    }

    /// Writes through a uniquely named temporary file and renames it into
    /// place, so a reader of `path_for(id)` never sees a partial file.
    #[instrument(level = "debug", skip(self, csv))]
    pub async fn save(&self, id: &FileId, csv: &str) -> std::io::Result<PathBuf> {
        static NEXT_TEMP: AtomicU64 = AtomicU64::new(0);

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(id);
        let temp = self.dir.join(format!(
            ".{}.{}.{}.tmp",
            id.dataset_file_name(),
            std::process::id(),
            NEXT_TEMP.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(err) = tokio::fs::write(&temp, csv).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(err);
        }
        if let Err(err) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(err);
        }
        debug!("Saved dataset to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;

    #[test]
    fn test_path_for() {
        let store = DatasetStore::new("/data/sets");
        let path = store.path_for(&Location::new(10.0, 20.0).file_id());
        assert_eq!(
            path,
            PathBuf::from("/data/sets/nasa_power_data_10.0000_20.0000.csv")
        );
    }

    #[tokio::test]
    async fn test_save_creates_directory() {
        let dir = std::env::temp_dir().join(format!("powerfetch-dataset-{}", std::process::id()));
        let store = DatasetStore::new(dir.join("nested"));
        let id = Location::new(1.5, 2.5).file_id();

        let path = store.save(&id, "YEAR,MO\n2018,1\n").await.unwrap();
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "YEAR,MO\n2018,1\n");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_saves_of_same_location_leave_one_complete_file() {
        let dir = std::env::temp_dir().join(format!(
            "powerfetch-dataset-dup-{}",
            std::process::id()
        ));
        let store = DatasetStore::new(&dir);
        let id = Location::new(3.0, 4.0).file_id();
        let first = "YEAR,MO\n".to_string() + &"2018,1\n".repeat(2000);
        let second = "YEAR,MO\n".to_string() + &"2019,2\n".repeat(3000);

        let (a, b) = tokio::join!(store.save(&id, &first), store.save(&id, &second));
        assert_eq!(a.unwrap(), b.unwrap());

        let written = tokio::fs::read_to_string(store.path_for(&id)).await.unwrap();
        assert!(written == first || written == second);

        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec![id.dataset_file_name()]);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
