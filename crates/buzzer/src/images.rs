//! Hook for the image upload collaborator.
//!
//! Round images are uploaded and served outside this server; rounds only
//! carry [`ImageRef`](buzzer_protocol::ImageRef)s pointing at them. The
//! one thing the server owes the uploader is a signal that a room is gone
//! so its files can be dropped. That signal is the [`ImageStore`] trait.

use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;

use buzzer_protocol::RoomCode;

/// Releases the images stored for a room.
///
/// Called once per room, after the room has closed and its members have
/// been told. Failures are the store's business: the room is already gone
/// either way.
///
/// # Example
///
/// ```rust
/// use buzzer::ImageStore;
/// use buzzer_protocol::RoomCode;
///
/// /// Logs instead of deleting anything.
/// struct LoggingStore;
///
/// impl ImageStore for LoggingStore {
///     async fn release(&self, code: &RoomCode) {
///         println!("room {code} closed");
///     }
/// }
/// ```
pub trait ImageStore: Send + Sync + 'static {
    fn release(&self, code: &RoomCode) -> impl Future<Output = ()> + Send;
}

/// An [`ImageStore`] that keeps nothing, for servers whose rounds carry
/// inline `data:` images.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImageStore;

impl ImageStore for NoImageStore {
    async fn release(&self, _code: &RoomCode) {}
}

/// An [`ImageStore`] over an upload directory laid out as
/// `<root>/<ROOM CODE>/<file>`. Releasing a room deletes its directory.
#[derive(Debug, Clone)]
pub struct UploadDirStore {
    root: PathBuf,
}

impl UploadDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where a room's uploads live.
    pub fn room_dir(&self, code: &RoomCode) -> PathBuf {
        self.root.join(code.as_str())
    }
}

impl ImageStore for UploadDirStore {
    async fn release(&self, code: &RoomCode) {
        let dir = self.room_dir(code);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => tracing::info!(room = %code, dir = %dir.display(), "room uploads removed"),
            // rooms that never uploaded anything
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(room = %code, dir = %dir.display(), error = %e, "failed to remove room uploads");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("buzzer-images-{tag}-{}", std::process::id()))
    }

    #[tokio::test]
    async fn test_upload_dir_store_removes_room_dir_only() {
        let root = scratch_dir("remove");
        let store = UploadDirStore::new(&root);
        let gone = RoomCode::parse("A7F3").unwrap();
        let kept = RoomCode::parse("B8G4").unwrap();

        for code in [&gone, &kept] {
            let dir = store.room_dir(code);
            tokio::fs::create_dir_all(&dir).await.unwrap();
            tokio::fs::write(dir.join("img_1.png"), b"png").await.unwrap();
        }

        store.release(&gone).await;

        assert!(!store.room_dir(&gone).exists());
        assert!(store.room_dir(&kept).join("img_1.png").exists());
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_dir_store_missing_dir_is_fine() {
        let store = UploadDirStore::new(scratch_dir("missing"));
        store.release(&RoomCode::parse("C9H5").unwrap()).await;
    }

    #[test]
    fn test_room_dir_layout() {
        let store = UploadDirStore::new("uploads");
        let code = RoomCode::parse("a7f3").unwrap();
        assert_eq!(store.room_dir(&code), Path::new("uploads").join("A7F3"));
    }

    #[tokio::test]
    async fn test_no_image_store_is_noop() {
        NoImageStore.release(&RoomCode::parse("A7F3").unwrap()).await;
    }
}
