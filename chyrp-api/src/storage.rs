//! Local filesystem storage for uploaded media.

use chyrp_common::model::media::{MediaKind, MediaPath};
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::fs;
use tracing::{debug, warn};

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct MediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStore {
    #[must_use]
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self { root, url_prefix }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The route stored media is served under, if it is served by this process at all.
    #[must_use]
    pub fn serve_route(&self) -> Option<&str> {
        let route = self.url_prefix.trim_end_matches('/');
        (route.starts_with('/') && route.len() > 1).then_some(route)
    }

    /// Creates the directory tree for every kind of media.
    pub async fn prepare(&self) -> io::Result<()> {
        for kind in [
            MediaKind::ProfilePicture,
            MediaKind::PostImage,
            MediaKind::PostVideo,
            MediaKind::PostFile,
        ] {
            fs::create_dir_all(self.root.join(kind.directory())).await?;
        }

        Ok(())
    }

    pub async fn write(&self, path: &MediaPath, contents: &[u8]) -> io::Result<()> {
        let full_path = self.root.join(path.get());
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&full_path, contents).await?;
        debug!(path = path.get(), bytes = contents.len(), "Stored media");

        Ok(())
    }

    /// Deletes a stored file. Failures are logged and otherwise ignored.
    pub async fn remove(&self, path: &MediaPath) {
        match fs::remove_file(self.root.join(path.get())).await {
            Ok(()) => debug!(path = path.get(), "Removed media"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = path.get(), %err, "Could not remove media"),
        }
    }

    pub async fn remove_all(&self, paths: &[MediaPath]) {
        for path in paths {
            self.remove(path).await;
        }
    }

    /// Public URL of a stored file.
    #[must_use]
    pub fn url(&self, path: &MediaPath) -> String {
        format!("{}{}", self.url_prefix, path.get())
    }
}
