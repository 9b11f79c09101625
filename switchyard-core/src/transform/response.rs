//! Provider responses as seen by the outbound stage

use bytes::Bytes;
use futures::stream::BoxStream;
use serde_json::Value;
use std::fmt;

/// Stream of server-sent events, already framed by the transport
pub type EventStream = BoxStream<'static, SseEvent>;

/// One server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name (`event:` line), if any
    pub event: Option<String>,
    /// Payload (`data:` lines joined by newlines)
    pub data: String,
}

impl SseEvent {
    /// Terminal sentinel used by OpenAI-compatible providers
    pub const DONE: &'static str = "[DONE]";

    /// Unnamed event carrying `data`
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    /// Named event carrying `data`
    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }

    /// Whether this is the `[DONE]` sentinel
    pub fn is_done(&self) -> bool {
        self.data.trim() == Self::DONE
    }

    /// Wire encoding, terminated by a blank line
    pub fn encode(&self) -> Bytes {
        let mut out = String::new();
        if let Some(event) = &self.event {
            out.push_str("event: ");
            out.push_str(event);
            out.push('\n');
        }
        for line in self.data.split('\n') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        Bytes::from(out)
    }
}

/// Response body, complete or streamed
pub enum ResponseBody {
    /// Entire body received
    Full(Bytes),
    /// Incrementally delivered events
    Stream(EventStream),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A provider response handed to the outbound stage
#[derive(Debug)]
pub struct ProviderResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers in received order
    pub headers: Vec<(String, String)>,
    /// Body
    pub body: ResponseBody,
}

impl ProviderResponse {
    /// Complete JSON response with a JSON content type
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: ResponseBody::Full(Bytes::from(body.to_string())),
        }
    }

    /// Streamed response with an event-stream content type
    pub fn event_stream(status: u16, events: EventStream) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "text/event-stream".to_string())],
            body: ResponseBody::Stream(events),
        }
    }

    /// First header value matching `name`, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Replace the value of `name`, if present
    pub(crate) fn replace_header(&mut self, name: &str, value: String) {
        if let Some((_, current)) = self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            *current = value;
        }
    }

    /// Whether the body is streamed
    pub fn is_streaming(&self) -> bool {
        matches!(self.body, ResponseBody::Stream(_))
    }

    /// Whole body bytes, `None` for streams
    pub fn body_bytes(&self) -> Option<&Bytes> {
        match &self.body {
            ResponseBody::Full(bytes) => Some(bytes),
            ResponseBody::Stream(_) => None,
        }
    }
}
