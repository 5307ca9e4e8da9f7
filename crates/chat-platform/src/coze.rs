//! Coze v3 chat adapter.
//!
//! Opens `POST {api_base}/v3/chat` with `stream: true` and turns the SSE
//! response body into [`ChatStreamEvent`]s. The body is read chunk by chunk
//! from the fetch `ReadableStream`, so deltas reach the UI as they arrive.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use gloo_net::http::Request;
use serde::Deserialize;
use serde_json::{json, Value};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{ReadableStream, ReadableStreamDefaultReader};

use chat_core::ports::{ChatPort, ChatRequest, ChatStream, ChatStreamEvent};
use chat_types::{config::CozeConfig, ChatError, Result};

use crate::sse::{SseDecoder, SseFrame};

pub struct CozeChatProvider {
    config: CozeConfig,
}

impl CozeChatProvider {
    pub fn new(config: CozeConfig) -> Self {
        Self { config }
    }
}

impl ChatPort for CozeChatProvider {
    fn stream_chat(&self, req: ChatRequest) -> ChatStream {
        let url = self.config.chat_url();
        let token = self.config.token.clone();
        let body = build_request_body(&self.config, &req);
        log::debug!("POST {} ({} image(s))", url, req.image_urls.len());

        Box::pin(
            stream::once(async move { open_stream(&url, &token, &body).await }).flat_map(
                |opened| match opened {
                    Ok(reader) => decode_body(BrowserBody { reader }).boxed_local(),
                    Err(e) => {
                        log::error!("Failed to open chat stream: {}", e);
                        stream::iter(vec![ChatStreamEvent::Failed(e.to_string())]).boxed_local()
                    }
                },
            ),
        )
    }
}

// ─── Request ─────────────────────────────────────────────────

/// JSON body of a streaming chat request
pub fn build_request_body(config: &CozeConfig, req: &ChatRequest) -> Value {
    let message = if req.image_urls.is_empty() {
        json!({
            "role": "user",
            "content": req.text,
            "content_type": "text",
        })
    } else {
        let mut parts = Vec::new();
        if !req.text.trim().is_empty() {
            parts.push(json!({ "type": "text", "text": req.text }));
        }
        parts.extend(
            req.image_urls
                .iter()
                .map(|url| json!({ "type": "image", "file_url": url })),
        );
        json!({
            "role": "user",
            "content": Value::Array(parts).to_string(),
            "content_type": "object_string",
        })
    };

    json!({
        "bot_id": config.bot_id,
        "user_id": config.user_id,
        "stream": true,
        "auto_save_history": true,
        "additional_messages": [message],
    })
}

async fn open_stream(url: &str, token: &str, body: &Value) -> Result<ReadableStreamDefaultReader> {
    let response = Request::post(url)
        .header("Content-Type", "application/json")
        .header("Authorization", &format!("Bearer {}", token))
        .json(body)
        .map_err(|e| ChatError::Network(e.to_string()))?
        .send()
        .await
        .map_err(|e| ChatError::Network(e.to_string()))?;

    if !response.ok() {
        let status = response.status();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| response.status_text());
        return Err(ChatError::Http { status, message });
    }

    let body: ReadableStream = response
        .body()
        .ok_or_else(|| ChatError::Stream("response has no body".to_string()))?;
    Ok(body.get_reader().unchecked_into())
}

// ─── Response ────────────────────────────────────────────────

#[derive(Deserialize)]
struct DeltaData {
    #[serde(default)]
    content: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct ErrorData {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    last_error: Option<Box<ErrorData>>,
}

impl ErrorData {
    fn message(&self) -> Option<String> {
        self.last_error
            .as_ref()
            .and_then(|e| e.message())
            .or_else(|| self.msg.clone().filter(|m| !m.is_empty()))
    }
}

/// Map one SSE frame to a chat event; `None` for frames that carry nothing
/// for the placeholder (message created, follow-up suggestions, pings).
pub fn map_frame(frame: &SseFrame) -> Option<ChatStreamEvent> {
    match frame.event.as_deref()? {
        "conversation.message.delta" => {
            let data: DeltaData = match serde_json::from_str(&frame.data) {
                Ok(d) => d,
                Err(e) => {
                    log::warn!("Unreadable delta frame: {}", e);
                    return None;
                }
            };
            match data.kind.as_deref() {
                None | Some("answer") => Some(ChatStreamEvent::Delta(data.content)),
                Some(_) => None,
            }
        }
        "conversation.chat.completed" | "done" => Some(ChatStreamEvent::Completed),
        "conversation.chat.failed" | "error" => {
            let reason = serde_json::from_str::<ErrorData>(&frame.data)
                .ok()
                .and_then(|e| e.message())
                .unwrap_or_else(|| "chat failed".to_string());
            Some(ChatStreamEvent::Failed(reason))
        }
        _ => None,
    }
}

/// SSE decoding plus frame mapping; stops producing after a terminal event
#[derive(Debug, Default)]
pub struct CozeEventDecoder {
    sse: SseDecoder,
    finished: bool,
}

impl CozeEventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<ChatStreamEvent> {
        let frames = self.sse.push(chunk);
        self.collect(frames)
    }

    pub fn finish(&mut self) -> Vec<ChatStreamEvent> {
        let frames: Vec<SseFrame> = self.sse.finish().into_iter().collect();
        self.collect(frames)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn collect(&mut self, frames: Vec<SseFrame>) -> Vec<ChatStreamEvent> {
        let mut events = Vec::new();
        for frame in frames {
            if self.finished {
                break;
            }
            if let Some(event) = map_frame(&frame) {
                self.finished = matches!(
                    event,
                    ChatStreamEvent::Completed | ChatStreamEvent::Failed(_)
                );
                events.push(event);
            }
        }
        events
    }
}

/// A response body read chunk by chunk
#[async_trait(?Send)]
pub trait ChunkSource {
    /// Next chunk, `None` once the body is exhausted
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Stop the transfer; called when the body is abandoned before its end
    fn cancel(&mut self);
}

/// Cancels the source on drop unless it was read to the end
struct BodyGuard<S: ChunkSource> {
    source: S,
    exhausted: bool,
}

impl<S: ChunkSource> Drop for BodyGuard<S> {
    fn drop(&mut self) {
        if !self.exhausted {
            self.source.cancel();
        }
    }
}

struct ReadState<S: ChunkSource> {
    body: BodyGuard<S>,
    decoder: CozeEventDecoder,
    queue: VecDeque<ChatStreamEvent>,
}

/// Decode a Coze SSE body into chat events. The body is cancelled when a
/// terminal event arrives before its end, or when the stream is dropped.
pub fn decode_body<S: ChunkSource>(source: S) -> impl futures::Stream<Item = ChatStreamEvent> {
    let state = ReadState {
        body: BodyGuard {
            source,
            exhausted: false,
        },
        decoder: CozeEventDecoder::new(),
        queue: VecDeque::new(),
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = st.queue.pop_front() {
                return Some((event, st));
            }
            if st.body.exhausted || st.decoder.is_finished() {
                return None;
            }
            match st.body.source.next_chunk().await {
                Ok(Some(bytes)) => st.queue.extend(st.decoder.push(&bytes)),
                Ok(None) => {
                    st.body.exhausted = true;
                    st.queue.extend(st.decoder.finish());
                }
                Err(e) => {
                    // Reader is errored, nothing left to cancel
                    st.body.exhausted = true;
                    st.queue.push_back(ChatStreamEvent::Failed(e.to_string()));
                }
            }
        }
    })
}

/// Fetch response body backed by a locked `ReadableStreamDefaultReader`
struct BrowserBody {
    reader: ReadableStreamDefaultReader,
}

#[async_trait(?Send)]
impl ChunkSource for BrowserBody {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        read_chunk(&self.reader).await
    }

    fn cancel(&mut self) {
        log::debug!("Cancelling chat response body");
        let _ = self.reader.cancel();
    }
}

impl Drop for BrowserBody {
    fn drop(&mut self) {
        let _ = self.reader.release_lock();
    }
}

/// Next body chunk, `None` at end of stream
async fn read_chunk(reader: &ReadableStreamDefaultReader) -> Result<Option<Vec<u8>>> {
    let result = JsFuture::from(reader.read())
        .await
        .map_err(|e| ChatError::Stream(format!("{:?}", e)))?;

    let done = js_sys::Reflect::get(&result, &"done".into())
        .map_err(|e| ChatError::JsInterop(format!("{:?}", e)))?
        .as_bool()
        .unwrap_or(true);
    if done {
        return Ok(None);
    }

    let value = js_sys::Reflect::get(&result, &"value".into())
        .map_err(|e| ChatError::JsInterop(format!("{:?}", e)))?;
    Ok(Some(js_sys::Uint8Array::new(&value).to_vec()))
}
