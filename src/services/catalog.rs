use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{ClusterId, RecipeRecord};

/// Error types for the catalog stage.
///
/// An unreadable source and an empty one are distinct cases: the latter is
/// recoverable by fixing the data, and callers may want to say so.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read recipe catalog {path}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode recipe catalog {path}")]
    Undecodable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("recipe catalog {path} contains no records")]
    Empty { path: PathBuf },
}

/// In-memory view of the catalog source, immutable after load.
#[derive(Debug)]
pub struct CatalogSnapshot {
    /// Records in source order.
    pub records: Vec<RecipeRecord>,
    pub loaded_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Records whose cluster tag equals `id`, preserving source order.
    /// Records without a parseable tag never match.
    pub fn filter_by_cluster(&self, id: ClusterId) -> Vec<RecipeRecord> {
        self.records
            .iter()
            .filter(|record| record.cluster == Some(id))
            .cloned()
            .collect()
    }
}

/// Raw CSV row, header-addressed. `cluster` stays optional so a data-entry
/// gap in one row degrades that row instead of aborting the load.
#[derive(Debug, Deserialize)]
struct RawRecipeRow {
    #[serde(default)]
    name: String,
    #[serde(default)]
    calories: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    cluster: Option<String>,
}

/// Lazily loaded, session-cached recipe catalog.
///
/// The snapshot is shared behind an `Arc` and safe for concurrent reads;
/// first load is double-checked under the write lock so concurrent first
/// access reads the source exactly once.
pub struct RecipeCatalog {
    path: PathBuf,
    snapshot: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl RecipeCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            snapshot: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached snapshot, loading the source on first use.
    /// Repeated calls never re-read the source; use [`refresh`] for that.
    ///
    /// [`refresh`]: RecipeCatalog::refresh
    pub async fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let mut guard = self.snapshot.write().await;
        // Another request may have loaded while we waited for the lock.
        if let Some(snapshot) = guard.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let loaded = Arc::new(self.load().await?);
        *guard = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Re-reads the source and replaces the cached snapshot.
    pub async fn refresh(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let mut guard = self.snapshot.write().await;
        let loaded = Arc::new(self.load().await?);
        *guard = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    async fn load(&self) -> Result<CatalogSnapshot, CatalogError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CatalogError::Unreadable {
                path: self.path.clone(),
                source: e,
            }
        })?;

        let mut reader = csv::Reader::from_reader(raw.as_bytes());
        let mut records = Vec::new();

        for (index, row) in reader.deserialize::<RawRecipeRow>().enumerate() {
            let row = row.map_err(|e| CatalogError::Undecodable {
                path: self.path.clone(),
                source: e,
            })?;

            // Header line is row 1, so the first data row is row 2.
            let row_number = index + 2;

            let raw_cluster = row.cluster.as_deref().map(str::trim).unwrap_or("");
            if raw_cluster.is_empty() {
                tracing::warn!(
                    row = row_number,
                    name = %row.name,
                    "recipe row has no cluster tag, skipping"
                );
                continue;
            }

            // Unparseable tags are kept but excluded from every filter.
            let cluster = raw_cluster.parse::<u32>().ok().map(ClusterId);
            records.push(RecipeRecord {
                name: row.name,
                calories: row.calories,
                kind: row.kind,
                image: row.image,
                cluster,
            });
        }

        if records.is_empty() {
            return Err(CatalogError::Empty {
                path: self.path.clone(),
            });
        }

        tracing::info!(
            path = %self.path.display(),
            records = records.len(),
            "recipe catalog loaded"
        );

        Ok(CatalogSnapshot {
            records,
            loaded_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_catalog(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    const SAMPLE: &str = "\
name,calories,type,image,cluster
Oat Porridge,220,breakfast,oat_porridge.jpg,0
Chicken Soup,310,lunch,chicken_soup.jpg,1
Grilled Fish,280,dinner,grilled_fish.jpg,1
Fruit Salad,150,snack,fruit_salad.jpg,2
Veggie Omelette,260,breakfast,veggie_omelette.jpg,1
";

    #[tokio::test]
    async fn test_filter_preserves_source_order() {
        let file = write_catalog(SAMPLE);
        let catalog = RecipeCatalog::new(file.path());
        let snapshot = catalog.snapshot().await.unwrap();

        let matches = snapshot.filter_by_cluster(ClusterId(1));
        let names: Vec<&str> = matches.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Chicken Soup", "Grilled Fish", "Veggie Omelette"]);
    }

    #[tokio::test]
    async fn test_filter_unmatched_cluster_is_empty() {
        let file = write_catalog(SAMPLE);
        let catalog = RecipeCatalog::new(file.path());
        let snapshot = catalog.snapshot().await.unwrap();
        assert!(snapshot.filter_by_cluster(ClusterId(9)).is_empty());
    }

    #[tokio::test]
    async fn test_rows_without_cluster_tag_are_skipped() {
        let file = write_catalog(
            "name,calories,type,image,cluster\n\
             Kept,100,snack,kept.jpg,0\n\
             Dropped,200,snack,dropped.jpg,\n",
        );
        let catalog = RecipeCatalog::new(file.path());
        let snapshot = catalog.snapshot().await.unwrap();

        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].name, "Kept");
    }

    #[tokio::test]
    async fn test_unparseable_cluster_tags_are_kept_but_never_match() {
        let file = write_catalog(
            "name,calories,type,image,cluster\n\
             Tagged,100,snack,tagged.jpg,2\n\
             Mistagged,200,snack,mistagged.jpg,two\n",
        );
        let catalog = RecipeCatalog::new(file.path());
        let snapshot = catalog.snapshot().await.unwrap();

        assert_eq!(snapshot.records.len(), 2);
        assert_eq!(snapshot.records[1].cluster, None);
        assert_eq!(snapshot.filter_by_cluster(ClusterId(2)).len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let catalog = RecipeCatalog::new("/nonexistent/recipes.csv");
        let err = catalog.snapshot().await.unwrap_err();
        assert!(matches!(err, CatalogError::Unreadable { .. }));
    }

    #[tokio::test]
    async fn test_header_only_file_is_empty() {
        let file = write_catalog("name,calories,type,image,cluster\n");
        let catalog = RecipeCatalog::new(file.path());
        let err = catalog.snapshot().await.unwrap_err();
        assert!(matches!(err, CatalogError::Empty { .. }));
    }

    #[tokio::test]
    async fn test_snapshot_is_cached_until_refresh() {
        let file = write_catalog(SAMPLE);
        let catalog = RecipeCatalog::new(file.path());

        let first = catalog.snapshot().await.unwrap();
        let second = catalog.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // Rewrite the source; the cached snapshot must not notice.
        std::fs::write(
            file.path(),
            "name,calories,type,image,cluster\nNew Dish,400,dinner,new.jpg,0\n",
        )
        .unwrap();
        let cached = catalog.snapshot().await.unwrap();
        assert_eq!(cached.records.len(), first.records.len());

        let refreshed = catalog.refresh().await.unwrap();
        assert_eq!(refreshed.records.len(), 1);
        assert_eq!(refreshed.records[0].name, "New Dish");
    }

    #[tokio::test]
    async fn test_concurrent_first_access_loads_once() {
        let file = write_catalog(SAMPLE);
        let catalog = Arc::new(RecipeCatalog::new(file.path()));

        let a = Arc::clone(&catalog);
        let b = Arc::clone(&catalog);
        let (first, second) = tokio::join!(
            tokio::spawn(async move { a.snapshot().await.unwrap() }),
            tokio::spawn(async move { b.snapshot().await.unwrap() }),
        );
        assert!(Arc::ptr_eq(&first.unwrap(), &second.unwrap()));
    }
}
