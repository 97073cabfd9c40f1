//! Issued file storage
//!
//! Files are addressed by a metadata key (context, component, area, item,
//! path, name) and their content is stored once per SHA-256 hash under
//! `{root}/{h[0..2]}/{h[2..4]}/{h}`. Lookups from outside go through the
//! content hash only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use tokio::sync::RwLock;

use shared::validation::validate_content_hash;

/// Component name of issued certificate files
pub const COMPONENT: &str = "mod_certificate";

/// File area holding rendered issues
pub const ISSUE_AREA: &str = "issue";

pub const PDF_MIME_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid content hash: {0}")]
    InvalidHash(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Metadata address of a stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileKey {
    pub context_id: i64,
    pub component: String,
    pub file_area: String,
    pub item_id: i64,
    pub file_path: String,
    pub file_name: String,
}

impl FileKey {
    /// Key of the rendered PDF of one issue inside a course module
    pub fn issue(cm_id: i64, issue_id: i64, file_name: impl Into<String>) -> Self {
        Self {
            context_id: cm_id,
            component: COMPONENT.to_string(),
            file_area: ISSUE_AREA.to_string(),
            item_id: issue_id,
            file_path: "/".to_string(),
            file_name: file_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub id: i64,
    pub key: FileKey,
    pub content_hash: String,
    pub size: i64,
    pub mime_type: String,
    pub user_id: i64,
    pub time_created: i64,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store content under the key unless a file already exists there
    async fn save_if_absent(
        &self,
        key: &FileKey,
        mime_type: &str,
        user_id: i64,
        content: &[u8],
    ) -> Result<StoredFile, StorageError>;

    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<StoredFile>, StorageError>;

    async fn read(&self, file: &StoredFile) -> Result<Vec<u8>, StorageError>;

    /// Files of one item in an area, ordered by name
    async fn item_files(
        &self,
        context_id: i64,
        file_area: &str,
        item_id: i64,
    ) -> Result<Vec<StoredFile>, StorageError>;

    /// Remove every file of a context area, returning how many were removed
    async fn delete_area(&self, context_id: i64, file_area: &str) -> Result<u64, StorageError>;
}

/// Lowercase hex SHA-256 of a byte string
pub fn content_hash(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// Blob location of a content hash below the storage root
pub fn blob_path(root: &Path, hash: &str) -> Result<PathBuf, StorageError> {
    validate_content_hash(hash).map_err(|_| StorageError::InvalidHash(hash.to_string()))?;
    Ok(root.join(&hash[0..2]).join(&hash[2..4]).join(hash))
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ============================================================================
// Disk blobs with PostgreSQL metadata
// ============================================================================

#[derive(Debug, FromRow)]
struct FileRow {
    id: i64,
    context_id: i64,
    component: String,
    file_area: String,
    item_id: i64,
    file_path: String,
    file_name: String,
    content_hash: String,
    file_size: i64,
    mime_type: String,
    user_id: i64,
    time_created: i64,
}

impl From<FileRow> for StoredFile {
    fn from(row: FileRow) -> Self {
        StoredFile {
            id: row.id,
            key: FileKey {
                context_id: row.context_id,
                component: row.component,
                file_area: row.file_area,
                item_id: row.item_id,
                file_path: row.file_path,
                file_name: row.file_name,
            },
            content_hash: row.content_hash,
            size: row.file_size,
            mime_type: row.mime_type,
            user_id: row.user_id,
            time_created: row.time_created,
        }
    }
}

const FILE_COLUMNS: &str = "id, context_id, component, file_area, item_id, file_path, \
    file_name, content_hash, file_size, mime_type, user_id, time_created";

/// Blobs on the local filesystem, metadata in the `files` table
#[derive(Clone)]
pub struct DiskFileStore {
    db: PgPool,
    root: PathBuf,
}

impl DiskFileStore {
    pub fn new(db: PgPool, root: impl Into<PathBuf>) -> Self {
        Self {
            db,
            root: root.into(),
        }
    }

    async fn write_blob(&self, hash: &str, content: &[u8]) -> Result<(), StorageError> {
        let path = blob_path(&self.root, hash)?;
        if tokio::fs::try_exists(&path).await? {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = path.with_extension("part");
        tokio::fs::write(&partial, content).await?;
        tokio::fs::rename(&partial, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl FileStore for DiskFileStore {
    async fn save_if_absent(
        &self,
        key: &FileKey,
        mime_type: &str,
        user_id: i64,
        content: &[u8],
    ) -> Result<StoredFile, StorageError> {
        let hash = content_hash(content);
        self.write_blob(&hash, content).await?;

        let inserted = sqlx::query_as::<_, FileRow>(&format!(
            r#"
            INSERT INTO files (
                context_id, component, file_area, item_id, file_path, file_name,
                content_hash, file_size, mime_type, user_id, time_created
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (context_id, component, file_area, item_id, file_path, file_name)
            DO NOTHING
            RETURNING {}
            "#,
            FILE_COLUMNS
        ))
        .bind(key.context_id)
        .bind(&key.component)
        .bind(&key.file_area)
        .bind(key.item_id)
        .bind(&key.file_path)
        .bind(&key.file_name)
        .bind(&hash)
        .bind(content.len() as i64)
        .bind(mime_type)
        .bind(user_id)
        .bind(now())
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = inserted {
            return Ok(row.into());
        }

        let existing = sqlx::query_as::<_, FileRow>(&format!(
            r#"
            SELECT {}
            FROM files
            WHERE context_id = $1 AND component = $2 AND file_area = $3 AND item_id = $4
              AND file_path = $5 AND file_name = $6
            "#,
            FILE_COLUMNS
        ))
        .bind(key.context_id)
        .bind(&key.component)
        .bind(&key.file_area)
        .bind(key.item_id)
        .bind(&key.file_path)
        .bind(&key.file_name)
        .fetch_one(&self.db)
        .await?;

        Ok(existing.into())
    }

    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<StoredFile>, StorageError> {
        validate_content_hash(content_hash)
            .map_err(|_| StorageError::InvalidHash(content_hash.to_string()))?;

        let row = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {} FROM files WHERE content_hash = $1 ORDER BY id LIMIT 1",
            FILE_COLUMNS
        ))
        .bind(content_hash)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(StoredFile::from))
    }

    async fn read(&self, file: &StoredFile) -> Result<Vec<u8>, StorageError> {
        let path = blob_path(&self.root, &file.content_hash)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(file.content_hash.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn item_files(
        &self,
        context_id: i64,
        file_area: &str,
        item_id: i64,
    ) -> Result<Vec<StoredFile>, StorageError> {
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            r#"
            SELECT {}
            FROM files
            WHERE context_id = $1 AND component = $2 AND file_area = $3 AND item_id = $4
            ORDER BY file_name
            "#,
            FILE_COLUMNS
        ))
        .bind(context_id)
        .bind(COMPONENT)
        .bind(file_area)
        .bind(item_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StoredFile::from).collect())
    }

    async fn delete_area(&self, context_id: i64, file_area: &str) -> Result<u64, StorageError> {
        let hashes = sqlx::query_scalar::<_, String>(
            r#"
            DELETE FROM files
            WHERE context_id = $1 AND component = $2 AND file_area = $3
            RETURNING content_hash
            "#,
        )
        .bind(context_id)
        .bind(COMPONENT)
        .bind(file_area)
        .fetch_all(&self.db)
        .await?;

        for hash in &hashes {
            let still_used = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM files WHERE content_hash = $1)",
            )
            .bind(hash)
            .fetch_one(&self.db)
            .await?;

            if !still_used {
                let path = blob_path(&self.root, hash)?;
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(hash = %hash, error = %e, "Orphaned blob could not be removed");
                }
            }
        }

        Ok(hashes.len() as u64)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
struct MemoryFiles {
    next_id: i64,
    files: Vec<StoredFile>,
    blobs: HashMap<String, Vec<u8>>,
}

/// Files kept in process memory
#[derive(Default)]
pub struct MemoryFileStore {
    inner: RwLock<MemoryFiles>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn files(&self) -> Vec<StoredFile> {
        self.inner.read().await.files.clone()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn save_if_absent(
        &self,
        key: &FileKey,
        mime_type: &str,
        user_id: i64,
        content: &[u8],
    ) -> Result<StoredFile, StorageError> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.files.iter().find(|f| &f.key == key) {
            return Ok(existing.clone());
        }

        let hash = content_hash(content);
        inner
            .blobs
            .entry(hash.clone())
            .or_insert_with(|| content.to_vec());
        inner.next_id += 1;
        let file = StoredFile {
            id: inner.next_id,
            key: key.clone(),
            content_hash: hash,
            size: content.len() as i64,
            mime_type: mime_type.to_string(),
            user_id,
            time_created: now(),
        };
        inner.files.push(file.clone());
        Ok(file)
    }

    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<StoredFile>, StorageError> {
        validate_content_hash(content_hash)
            .map_err(|_| StorageError::InvalidHash(content_hash.to_string()))?;
        Ok(self
            .inner
            .read()
            .await
            .files
            .iter()
            .find(|f| f.content_hash == content_hash)
            .cloned())
    }

    async fn read(&self, file: &StoredFile) -> Result<Vec<u8>, StorageError> {
        self.inner
            .read()
            .await
            .blobs
            .get(&file.content_hash)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(file.content_hash.clone()))
    }

    async fn item_files(
        &self,
        context_id: i64,
        file_area: &str,
        item_id: i64,
    ) -> Result<Vec<StoredFile>, StorageError> {
        let mut files: Vec<_> = self
            .inner
            .read()
            .await
            .files
            .iter()
            .filter(|f| {
                f.key.context_id == context_id
                    && f.key.file_area == file_area
                    && f.key.item_id == item_id
            })
            .cloned()
            .collect();
        files.sort_by(|a, b| a.key.file_name.cmp(&b.key.file_name));
        Ok(files)
    }

    async fn delete_area(&self, context_id: i64, file_area: &str) -> Result<u64, StorageError> {
        let mut inner = self.inner.write().await;
        let before = inner.files.len();
        inner
            .files
            .retain(|f| !(f.key.context_id == context_id && f.key.file_area == file_area));
        let removed = (before - inner.files.len()) as u64;

        let MemoryFiles { files, blobs, .. } = &mut *inner;
        blobs.retain(|hash, _| files.iter().any(|f| &f.content_hash == hash));
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_paths_fan_out_by_prefix() {
        let hash = content_hash(b"certificate");
        let path = blob_path(Path::new("/srv/files"), &hash).unwrap();
        let expected = format!("/srv/files/{}/{}/{}", &hash[0..2], &hash[2..4], hash);
        assert_eq!(path, PathBuf::from(expected));
    }

    #[test]
    fn blob_path_rejects_traversal() {
        assert!(blob_path(Path::new("/srv/files"), "../../etc/passwd").is_err());
    }

    #[test]
    fn sha256_hex() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
