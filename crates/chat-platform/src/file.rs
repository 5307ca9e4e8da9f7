//! Local files: browser `File` objects and in-memory payloads.
//!
//! Both implement [`LocalFile`], so the uploader never knows whether bytes
//! came from the picker, a drag-and-drop or a test.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{File, HtmlInputElement};

use chat_core::ports::LocalFile;
use chat_types::{message::Attachment, ChatError, Result};

// ─── Browser file ────────────────────────────────────────────

/// A `File` picked by the user; the payload is read lazily
pub struct BrowserFile {
    file: File,
    attachment: Attachment,
}

impl BrowserFile {
    pub fn new(file: File) -> Self {
        let attachment = Attachment::new(file.name(), file.size() as u64, file.type_());
        Self { file, attachment }
    }
}

#[async_trait(?Send)]
impl LocalFile for BrowserFile {
    fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    async fn read_bytes(&self) -> Result<Vec<u8>> {
        let read_failed = |e: JsValue| ChatError::ReadFailed {
            name: self.attachment.name.clone(),
            message: format!("{:?}", e),
        };
        let buf = JsFuture::from(self.file.array_buffer())
            .await
            .map_err(read_failed)?;
        Ok(js_sys::Uint8Array::new(&buf).to_vec())
    }
}

// ─── In-memory file ──────────────────────────────────────────

/// Payload already in memory, e.g. from a drag-and-drop.
/// `None` bytes model a file whose content the browser withheld.
pub struct MemoryFile {
    attachment: Attachment,
    bytes: Option<Vec<u8>>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Option<Vec<u8>>) -> Self {
        let size = bytes.as_ref().map_or(0, |b| b.len() as u64);
        Self {
            attachment: Attachment::new(name, size, mime),
            bytes,
        }
    }
}

#[async_trait(?Send)]
impl LocalFile for MemoryFile {
    fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    async fn read_bytes(&self) -> Result<Vec<u8>> {
        self.bytes.clone().ok_or_else(|| ChatError::ReadFailed {
            name: self.attachment.name.clone(),
            message: "no content available".to_string(),
        })
    }
}

// ─── Picker ──────────────────────────────────────────────────

/// Open the native file dialog through a detached `<input type=file>`.
/// Resolves with an empty list when the dialog is dismissed.
pub async fn pick_files(accept: &str, multiple: bool) -> Result<Vec<BrowserFile>> {
    let input: HtmlInputElement = gloo_utils::document()
        .create_element("input")
        .map_err(|e| ChatError::JsInterop(format!("{:?}", e)))?
        .dyn_into()
        .map_err(|e| ChatError::JsInterop(format!("{:?}", e)))?;
    input.set_type("file");
    input.set_accept(accept);
    input.set_multiple(multiple);

    let (tx, rx) = oneshot::channel::<Vec<BrowserFile>>();
    let tx = Rc::new(RefCell::new(Some(tx)));

    let on_change = {
        let tx = tx.clone();
        let input = input.clone();
        Closure::<dyn FnMut()>::new(move || {
            let files = selected_files(&input);
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(files);
            }
        })
    };
    let on_cancel = {
        let tx = tx.clone();
        Closure::<dyn FnMut()>::new(move || {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(Vec::new());
            }
        })
    };

    input.set_onchange(Some(on_change.as_ref().unchecked_ref()));
    input
        .add_event_listener_with_callback("cancel", on_cancel.as_ref().unchecked_ref())
        .map_err(|e| ChatError::JsInterop(format!("{:?}", e)))?;
    input.click();

    // Closures stay alive until the dialog settles
    let files = rx.await.unwrap_or_default();
    input.set_onchange(None);
    drop(on_change);
    drop(on_cancel);

    log::info!("Picked {} file(s)", files.len());
    Ok(files)
}

fn selected_files(input: &HtmlInputElement) -> Vec<BrowserFile> {
    let Some(list) = input.files() else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.get(i))
        .map(BrowserFile::new)
        .collect()
}
