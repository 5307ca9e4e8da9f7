//! Attachment uploader: turns local files into public image URLs.
//!
//! Per file, as a sequential pipeline:
//! 1. read the payload and encode it as base64          → [`EncodedFile`]
//! 2. ask the content store for the current version     → [`PreparedWrite`]
//! 3. create-or-update carrying that version, if any    → [`UploadedImage`]
//! 4. derive the public URL from owner/repo/branch/path (no round trip)
//!
//! Steps 2 and 3 run under a per-path async lock so two uploads of the same
//! name never interleave their check-then-write. Conflicts are reported,
//! never retried.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::lock::Mutex;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use chat_types::{
    Result, UploadFailure,
    config::ContentStoreConfig,
};
use crate::ports::{ContentStorePort, LocalFile, PutObject, VersionToken};

/// Characters escaped inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode each segment of a `/`-separated path
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Stage 1: payload read and encoded
#[derive(Debug, Clone)]
pub struct EncodedFile {
    pub file_name: String,
    pub path: String,
    pub content_base64: String,
}

/// Stage 2: version captured, ready to write
#[derive(Debug, Clone)]
pub struct PreparedWrite {
    pub file: EncodedFile,
    pub version: Option<VersionToken>,
}

/// Stage 3: written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub file_name: String,
    pub path: String,
    pub url: String,
    pub version: VersionToken,
    /// False when an existing object was updated
    pub created: bool,
}

/// Result of one batch: every success and every failure, independently
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub uploaded: Vec<UploadedImage>,
    pub failures: Vec<UploadFailure>,
}

impl BatchReport {
    pub fn urls(&self) -> Vec<String> {
        self.uploaded.iter().map(|u| u.url.clone()).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One async mutex per object path, dropped once nobody holds or waits on it
#[derive(Default)]
struct PathLocks {
    locks: RefCell<HashMap<String, Rc<Mutex<()>>>>,
}

impl PathLocks {
    fn acquire(&self, path: &str) -> PathLease<'_> {
        let lock = self
            .locks
            .borrow_mut()
            .entry(path.to_string())
            .or_insert_with(|| Rc::new(Mutex::new(())))
            .clone();
        PathLease {
            locks: self,
            path: path.to_string(),
            lock,
        }
    }

    fn len(&self) -> usize {
        self.locks.borrow().len()
    }
}

/// A claim on one path's mutex. The map entry goes away with the last
/// claim, even when the upload future is dropped mid-flight.
struct PathLease<'a> {
    locks: &'a PathLocks,
    path: String,
    lock: Rc<Mutex<()>>,
}

impl Drop for PathLease<'_> {
    fn drop(&mut self) {
        // One count for the map, one for this lease
        if Rc::strong_count(&self.lock) == 2 {
            self.locks.locks.borrow_mut().remove(&self.path);
        }
    }
}

pub struct AttachmentUploader {
    store: Rc<dyn ContentStorePort>,
    config: ContentStoreConfig,
    locks: PathLocks,
}

impl AttachmentUploader {
    pub fn new(store: Rc<dyn ContentStorePort>, config: ContentStoreConfig) -> Self {
        Self {
            store,
            config,
            locks: PathLocks::default(),
        }
    }

    /// Public raw-content URL of an object path
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.config.raw_base.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            self.config.branch,
            encode_path(path)
        )
    }

    /// Upload every file in order. A failed file does not stop the batch.
    pub async fn upload_batch(&self, files: &[Rc<dyn LocalFile>]) -> BatchReport {
        let mut report = BatchReport::default();
        for file in files {
            match self.upload(file.as_ref()).await {
                Ok(image) => {
                    log::info!(
                        "Uploaded {} ({})",
                        image.file_name,
                        if image.created { "created" } else { "updated" }
                    );
                    report.uploaded.push(image);
                }
                Err(error) => {
                    log::warn!("Upload of {} failed: {}", file.name(), error);
                    report.failures.push(UploadFailure {
                        file_name: file.name().to_string(),
                        error,
                    });
                }
            }
        }
        report
    }

    pub async fn upload(&self, file: &dyn LocalFile) -> Result<UploadedImage> {
        let encoded = self.encode(file).await?;
        let lease = self.locks.acquire(&encoded.path);
        let _guard = lease.lock.lock().await;
        let prepared = self.prepare(encoded).await?;
        self.write(prepared).await
    }

    async fn encode(&self, file: &dyn LocalFile) -> Result<EncodedFile> {
        let bytes = file.read_bytes().await?;
        Ok(EncodedFile {
            file_name: file.name().to_string(),
            path: self.config.object_path(file.name()),
            content_base64: STANDARD.encode(bytes),
        })
    }

    async fn prepare(&self, file: EncodedFile) -> Result<PreparedWrite> {
        let version = self.store.fetch_version(&file.path).await?;
        Ok(PreparedWrite { file, version })
    }

    async fn write(&self, prepared: PreparedWrite) -> Result<UploadedImage> {
        let PreparedWrite { file, version } = prepared;
        let created = version.is_none();
        let written = self
            .store
            .put_object(PutObject {
                path: file.path.clone(),
                message: format!("Upload {}", file.file_name),
                content_base64: file.content_base64,
                version,
            })
            .await?;

        Ok(UploadedImage {
            url: self.public_url(&file.path),
            file_name: file.file_name,
            path: file.path,
            version: written,
            created,
        })
    }

    /// Paths with a live lock; zero when no upload is in flight
    pub fn locked_paths(&self) -> usize {
        self.locks.len()
    }
}
