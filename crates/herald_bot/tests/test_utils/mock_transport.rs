//! Recording mocks of the messaging backend and the image tool.

use async_trait::async_trait;
use herald_bot::{
    ImageInfo, OutboundItem, RemoteFile, SendOptions, SentMessage, Transcoder, Transport,
    TransportResult,
};
use herald_error::{TranscodeError, TranscodeErrorKind, TransportError};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// One backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Album {
        destination: i64,
        items: Vec<OutboundItem>,
        options: SendOptions,
    },
    Text {
        destination: i64,
        text: String,
        options: SendOptions,
    },
    Delete(SentMessage),
    FileById(String),
    Download(PathBuf),
}

/// Transport that records every call and hands out increasing message ids.
#[derive(Debug)]
pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI64,
    fail_albums: bool,
    fail_downloads: bool,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(100),
            fail_albums: false,
            fail_downloads: false,
        }
    }

    pub fn with_album_failure(mut self) -> Self {
        self.fail_albums = true;
        self
    }

    pub fn with_download_failure(mut self) -> Self {
        self.fail_downloads = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Sends only, without lookups and downloads.
    pub fn sends(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Album { .. } | Call::Text { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next(&self, chat_id: i64) -> SentMessage {
        SentMessage {
            chat_id,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_album(
        &self,
        destination: i64,
        items: &[OutboundItem],
        options: &SendOptions,
    ) -> TransportResult<Vec<SentMessage>> {
        self.record(Call::Album {
            destination,
            items: items.to_vec(),
            options: options.clone(),
        });
        if self.fail_albums {
            return Err(TransportError::new("Mock album failure"));
        }
        Ok(items.iter().map(|_| self.next(destination)).collect())
    }

    async fn send_text(
        &self,
        destination: i64,
        text: &str,
        options: &SendOptions,
    ) -> TransportResult<SentMessage> {
        self.record(Call::Text {
            destination,
            text: text.to_string(),
            options: options.clone(),
        });
        Ok(self.next(destination))
    }

    async fn delete(&self, message: SentMessage) -> TransportResult<()> {
        self.record(Call::Delete(message));
        Ok(())
    }

    async fn file_by_id(&self, remote_id: &str) -> TransportResult<RemoteFile> {
        self.record(Call::FileById(remote_id.to_string()));
        Ok(RemoteFile::new(remote_id, Some(4)))
    }

    async fn download(&self, _file: &RemoteFile, local_path: &Path) -> TransportResult<()> {
        self.record(Call::Download(local_path.to_path_buf()));
        if self.fail_downloads {
            std::fs::write(local_path, b"part").map_err(|e| TransportError::new(e.to_string()))?;
            return Err(TransportError::new("Mock download failure"));
        }
        std::fs::write(local_path, b"data").map_err(|e| TransportError::new(e.to_string()))
    }
}

/// Transcoder that reports a fixed image and writes a `.jpg` copy on transcode.
#[derive(Debug)]
pub struct MockTranscoder {
    needs_transcode: bool,
    fail_identify: bool,
    transcoded: Mutex<Vec<PathBuf>>,
}

impl MockTranscoder {
    pub fn new(needs_transcode: bool) -> Self {
        Self {
            needs_transcode,
            fail_identify: false,
            transcoded: Mutex::new(Vec::new()),
        }
    }

    pub fn with_identify_failure(mut self) -> Self {
        self.fail_identify = true;
        self
    }

    pub fn transcoded(&self) -> Vec<PathBuf> {
        self.transcoded.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    async fn identify(&self, path: &Path) -> Result<ImageInfo, TranscodeError> {
        if self.fail_identify {
            return Err(TranscodeError::new(TranscodeErrorKind::Identify {
                path: path.display().to_string(),
                message: "Mock identify failure".to_string(),
            }));
        }
        Ok(ImageInfo {
            size: 4,
            width: 8000,
            height: 6000,
            format: "webp".to_string(),
        })
    }

    fn needs_transcode(&self, _info: &ImageInfo) -> bool {
        self.needs_transcode
    }

    async fn transcode(&self, path: &Path) -> Result<PathBuf, TranscodeError> {
        let mut target = path.as_os_str().to_owned();
        target.push(".jpg");
        let target = PathBuf::from(target);
        std::fs::write(&target, b"jpeg")?;
        self.transcoded.lock().unwrap().push(path.to_path_buf());
        Ok(target)
    }
}
