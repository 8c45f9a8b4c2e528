//! File storage collaborator
//!
//! The core only depends on the [`FileStore`] contract: hand it bytes and a
//! folder, get back a URL. Whether an upload failure aborts the business
//! mutation is decided per call site - evidence and issued documents fail the
//! request, FIR documents are best-effort.

use std::io::Write;
use std::path::PathBuf;

/// Logical folder an upload lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    Firs,
    Evidence,
    WitnessStatements,
    CourtOrders,
    IssuedDocuments,
}

impl Folder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Folder::Firs => "firs",
            Folder::Evidence => "evidence",
            Folder::WitnessStatements => "witness-statements",
            Folder::CourtOrders => "court-orders",
            Folder::IssuedDocuments => "issued-documents",
        }
    }
}

/// Result of a successful upload
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub url: String,
}

/// Upload contract consumed by the core
pub trait FileStore {
    fn upload(&self, bytes: &[u8], folder: Folder, name: &str) -> std::io::Result<StoredFile>;
}

/// Writes files under a local directory tree. Stands in for a real media
/// service in the CLI and in tests.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl FileStore for LocalFileStore {
    fn upload(&self, bytes: &[u8], folder: Folder, name: &str) -> std::io::Result<StoredFile> {
        let dir = self.root.join(folder.as_str());
        std::fs::create_dir_all(&dir)?;
        // Random prefix keeps repeated uploads of the same name distinct
        let prefix = uuid::Uuid::new_v4().simple().to_string();
        let path = dir.join(format!("{}_{}", prefix, name));
        let mut file = std::fs::File::create(&path)?;
        file.write_all(bytes)?;
        Ok(StoredFile {
            url: format!("file://{}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let stored = store.upload(b"order text", Folder::CourtOrders, "order.pdf").unwrap();
        assert!(stored.url.starts_with("file://"));
        assert!(stored.url.contains("court-orders"));
        assert!(stored.url.ends_with("order.pdf"));
    }

    #[test]
    fn test_uploads_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let a = store.upload(b"a", Folder::Evidence, "scan.png").unwrap();
        let b = store.upload(b"b", Folder::Evidence, "scan.png").unwrap();
        assert_ne!(a.url, b.url);
    }
}
