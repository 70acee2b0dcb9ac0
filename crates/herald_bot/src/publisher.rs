//! Turning stored posts into outbound albums.

use crate::transcoder::Transcoder;
use crate::transport::{MediaSource, OutboundItem, OutboundKind, Transport};
use herald_core::{FileKind, Post};
use herald_error::{HeraldResult, WorkerError, WorkerErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, instrument, warn};

/// Local files downloaded or produced while building an album.
///
/// Files live in a directory of their own, created on first use, so
/// concurrent builds of the same post never share a path. Call
/// [`ScratchFiles::cleanup`] once the send attempt is over; anything still
/// tracked when the value is dropped is removed synchronously.
#[derive(Debug, Default)]
pub struct ScratchFiles {
    paths: Vec<PathBuf>,
    dir: Option<TempDir>,
}

impl ScratchFiles {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a file for removal.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Tracked files, in creation order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Directory holding this tracker's files, once one was created.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Directory under `parent` for this tracker's files, created on first call.
    pub fn dir_in(&mut self, parent: &Path) -> Result<&Path, WorkerError> {
        let dir = match self.dir.take() {
            Some(dir) => dir,
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("herald-")
                    .tempdir_in(parent)
                    .map_err(|e| {
                        WorkerError::new(WorkerErrorKind::ScratchDir {
                            path: parent.display().to_string(),
                            message: e.to_string(),
                        })
                    })?;
                debug!(path = %dir.path().display(), "Created scratch directory");
                dir
            }
        };
        Ok(self.dir.insert(dir).path())
    }

    /// Remove every tracked file and the directory, returning one error per
    /// path that could not be removed.
    pub async fn cleanup(&mut self) -> Vec<WorkerError> {
        let mut errors = Vec::new();
        for path in self.paths.drain(..) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Removed temporary file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => errors.push(cleanup_error(&path, e)),
            }
        }
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                errors.push(cleanup_error(&path, e));
            }
        }
        errors
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            if let Err(e) = std::fs::remove_file(&path)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = %path.display(), error = %e, "Failed to remove temporary file");
            }
        }
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %path.display(), error = %e, "Failed to remove scratch directory");
            }
        }
    }
}

fn cleanup_error(path: &Path, e: std::io::Error) -> WorkerError {
    WorkerError::new(WorkerErrorKind::Cleanup {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// The two albums built from one post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Albums {
    /// What subscribers see; the post text is on the last item
    pub primary: Vec<OutboundItem>,
    /// Original documents for the follow-up; the comment is on the last item
    pub sources: Vec<OutboundItem>,
}

/// Builds outbound albums from posts.
#[derive(Clone)]
pub struct Publisher {
    transport: Arc<dyn Transport>,
    transcoder: Arc<dyn Transcoder>,
    scratch_dir: PathBuf,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("scratch_dir", &self.scratch_dir)
            .finish_non_exhaustive()
    }
}

impl Publisher {
    /// Create a publisher that downloads into `scratch_dir`.
    pub fn new(
        transport: Arc<dyn Transport>,
        transcoder: Arc<dyn Transcoder>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            transcoder,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Directory per-build scratch directories are created in.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Build the primary and sources albums for `post`.
    ///
    /// Photos and videos are passed through by reference. Documents are
    /// downloaded, images are transcoded when the transcoder asks for it, and
    /// the original reference goes to the sources album. Every local file is
    /// tracked in `scratch`, including on error.
    ///
    /// # Errors
    ///
    /// Returns the first transport or transcoder failure.
    #[instrument(skip(self, post, scratch), fields(id = %post.id, files = post.files.len()))]
    pub async fn build(&self, post: &Post, scratch: &mut ScratchFiles) -> HeraldResult<Albums> {
        let mut albums = Albums::default();

        for file in &post.files {
            let remote = self.transport.file_by_id(&file.remote_id).await?;
            match file.kind {
                FileKind::Photo => albums.primary.push(OutboundItem::new(
                    OutboundKind::Photo,
                    MediaSource::Remote(file.remote_id.clone()),
                )),
                FileKind::Video => albums.primary.push(OutboundItem::new(
                    OutboundKind::Video,
                    MediaSource::Remote(file.remote_id.clone()),
                )),
                FileKind::DocPhoto => {
                    let mut local =
                        local_path(scratch.dir_in(&self.scratch_dir)?, &file.remote_id);
                    scratch.track(&local);
                    self.transport.download(&remote, &local).await?;

                    let info = self.transcoder.identify(&local).await?;
                    if self.transcoder.needs_transcode(&info) {
                        local = self.transcoder.transcode(&local).await?;
                        scratch.track(&local);
                    }
                    albums.primary.push(OutboundItem::new(
                        OutboundKind::Photo,
                        MediaSource::Local(local),
                    ));
                    albums.sources.push(source_of(&file.remote_id));
                }
                FileKind::DocVideo => {
                    let local = local_path(scratch.dir_in(&self.scratch_dir)?, &file.remote_id);
                    scratch.track(&local);
                    self.transport.download(&remote, &local).await?;

                    albums.primary.push(OutboundItem::new(
                        OutboundKind::Video,
                        MediaSource::Local(local),
                    ));
                    albums.sources.push(source_of(&file.remote_id));
                }
            }
        }

        if let Some(last) = albums.primary.last_mut() {
            last.caption = post.text.clone();
        }
        if let Some(last) = albums.sources.last_mut() {
            last.caption = post.comment.clone();
        }

        debug!(
            primary = albums.primary.len(),
            sources = albums.sources.len(),
            downloaded = scratch.paths().len(),
            "Built albums"
        );
        Ok(albums)
    }
}

fn local_path(dir: &Path, remote_id: &str) -> PathBuf {
    let name: String = remote_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    dir.join(name)
}

fn source_of(remote_id: &str) -> OutboundItem {
    OutboundItem::new(
        OutboundKind::Document,
        MediaSource::Remote(remote_id.to_string()),
    )
}
