//! Pub/sub fan-out for the background streaming path: every chunk a run
//! produces is appended to a durable, replay-from-start channel keyed by run
//! id, so a consumer that subscribes after the run started still sees every
//! event from the beginning.
//!
//! This deliberately does not reuse stream-event's broadcast-and-drop
//! channel pattern: that shape is a poor fit for a background run whose
//! consumer may attach minutes after the producer started, and dropping
//! chunks under backpressure would violate replay-from-start. Bounded
//! channels with a blocking `send` give the "producers block, no drop"
//! behavior this bus needs instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::stream::StreamEvent;

/// Per-subscriber channel capacity. Replay of the backlog happens while
/// holding the run's lock, so a backlog longer than this would block
/// `subscribe` until a consumer drains it; callers of a long-lived event bus
/// should subscribe promptly after a run starts rather than long after.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("event bus is not configured (no-op default): {0}")]
    NotConfigured(&'static str),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Durable, replay-from-start pub/sub for one run's stream chunks.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, run_id: &str, event: StreamEvent) -> Result<(), EventBusError>;

    /// Subscribes to `run_id`, returning a channel that first replays every
    /// event published so far, then forwards new events as they arrive.
    async fn subscribe(&self, run_id: &str) -> Result<mpsc::Receiver<StreamEvent>, EventBusError>;
}

#[derive(Default)]
struct RunLog {
    events: Vec<StreamEvent>,
    subscribers: Vec<mpsc::Sender<StreamEvent>>,
}

/// In-process event bus backed by an append-only log per run. The default;
/// satisfies every testable property without an external dependency.
#[derive(Clone, Default)]
pub struct InProcessEventBus {
    runs: Arc<RwLock<HashMap<String, Arc<Mutex<RunLog>>>>>,
}

impl InProcessEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    async fn log_for(&self, run_id: &str) -> Arc<Mutex<RunLog>> {
        if let Some(log) = self.runs.read().await.get(run_id) {
            return log.clone();
        }
        self.runs.write().await.entry(run_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(RunLog::default()))).clone()
    }
}

#[async_trait]
impl EventBus for InProcessEventBus {
    async fn publish(&self, run_id: &str, event: StreamEvent) -> Result<(), EventBusError> {
        let log = self.log_for(run_id).await;
        let mut log = log.lock().await;
        log.events.push(event.clone());
        log.subscribers.retain(|tx| !tx.is_closed());
        for tx in &log.subscribers {
            // Blocking send: a lagging consumer applies backpressure to the
            // producer rather than silently dropping chunks.
            let _ = tx.send(event.clone()).await;
        }
        Ok(())
    }

    async fn subscribe(&self, run_id: &str) -> Result<mpsc::Receiver<StreamEvent>, EventBusError> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let log = self.log_for(run_id).await;
        let mut log = log.lock().await;
        for event in log.events.clone() {
            if tx.send(event).await.is_err() {
                return Ok(rx);
            }
        }
        log.subscribers.push(tx);
        Ok(rx)
    }
}

/// Bus that rejects every call; the service-unavailable path the streaming
/// dispatcher's background fan-out falls back to when no durable bus is
/// configured (background execution requires a non-noop bus).
#[derive(Clone, Default)]
pub struct NoOpEventBus;

#[async_trait]
impl EventBus for NoOpEventBus {
    async fn publish(&self, _run_id: &str, _event: StreamEvent) -> Result<(), EventBusError> {
        Err(EventBusError::NotConfigured("publish"))
    }

    async fn subscribe(&self, _run_id: &str) -> Result<mpsc::Receiver<StreamEvent>, EventBusError> {
        Err(EventBusError::NotConfigured("subscribe"))
    }
}

/// Redis Streams-backed bus for multi-process deployments: `XADD` on
/// publish, `XREAD` (from `0`, then blocking from the last seen id) on
/// subscribe. Exercised by tests only against the `EventBus` trait, never
/// against a live Redis instance.
pub struct RedisEventBus {
    client: redis::Client,
}

impl RedisEventBus {
    pub fn new(redis_url: &str) -> Result<Self, EventBusError> {
        let client = redis::Client::open(redis_url).map_err(|e| EventBusError::Backend(e.to_string()))?;
        Ok(Self { client })
    }

    fn stream_key(run_id: &str) -> String {
        format!("agentloop:run:{run_id}:events")
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn publish(&self, run_id: &str, event: StreamEvent) -> Result<(), EventBusError> {
        use redis::AsyncCommands;
        let payload = serde_json::to_string(&SerializableEvent::from(&event)).map_err(|e| EventBusError::Backend(e.to_string()))?;
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(|e| EventBusError::Backend(e.to_string()))?;
        let _: String = conn
            .xadd(Self::stream_key(run_id), "*", &[("event", payload.as_str())])
            .await
            .map_err(|e| EventBusError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn subscribe(&self, run_id: &str) -> Result<mpsc::Receiver<StreamEvent>, EventBusError> {
        use redis::AsyncCommands;
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut conn = self.client.get_multiplexed_async_connection().await.map_err(|e| EventBusError::Backend(e.to_string()))?;
        let key = Self::stream_key(run_id);

        tokio::spawn(async move {
            let mut last_id = "0".to_string();
            loop {
                let opts = redis::streams::StreamReadOptions::default().block(5000).count(100);
                let reply: Result<redis::streams::StreamReadReply, _> = conn.xread_options(&[&key], &[&last_id], &opts).await;
                let Ok(reply) = reply else { break };
                let mut any = false;
                for stream_key in reply.keys {
                    for stream_id in stream_key.ids {
                        last_id = stream_id.id.clone();
                        if let Some(redis::Value::BulkString(bytes)) = stream_id.map.get("event") {
                            if let Ok(text) = std::str::from_utf8(bytes) {
                                if let Ok(serializable) = serde_json::from_str::<SerializableEvent>(text) {
                                    any = true;
                                    if tx.send(serializable.into()).await.is_err() {
                                        return;
                                    }
                                }
                            }
                        }
                    }
                }
                if tx.is_closed() {
                    return;
                }
                let _ = any;
            }
        });

        Ok(rx)
    }
}

/// JSON-serializable mirror of [`StreamEvent`] for the Redis wire. `StreamEvent`
/// itself stays serde-free to keep it cheap to clone on the in-process path.
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
enum SerializableEvent {
    MessageStart,
    MessageDelta { content: String },
    MessageEnd { message: crate::message::Message },
    ToolCallStart { tool_call: crate::message::ToolCall },
    ToolCallEnd { result: crate::message::ToolResult },
    Usage { prompt_tokens: u32, completion_tokens: u32, total_tokens: u32 },
    Custom { value: serde_json::Value },
    StopReason { reason: crate::run_manager::StopReason, error_type: Option<crate::error::ErrorType> },
    Error { message: String, error_type: crate::error::ErrorType },
    Done { error: Option<String> },
}

impl From<&StreamEvent> for SerializableEvent {
    fn from(e: &StreamEvent) -> Self {
        match e.clone() {
            StreamEvent::MessageStart => Self::MessageStart,
            StreamEvent::MessageDelta(content) => Self::MessageDelta { content },
            StreamEvent::MessageEnd(message) => Self::MessageEnd { message },
            StreamEvent::ToolCallStart(tool_call) => Self::ToolCallStart { tool_call },
            StreamEvent::ToolCallEnd(result) => Self::ToolCallEnd { result },
            StreamEvent::Usage { prompt_tokens, completion_tokens, total_tokens } => Self::Usage { prompt_tokens, completion_tokens, total_tokens },
            StreamEvent::Custom(value) => Self::Custom { value },
            StreamEvent::StopReason { reason, error_type } => Self::StopReason { reason, error_type },
            StreamEvent::Error { message, error_type } => Self::Error { message, error_type },
            StreamEvent::Done { error } => Self::Done { error },
        }
    }
}

impl From<SerializableEvent> for StreamEvent {
    fn from(e: SerializableEvent) -> Self {
        match e {
            SerializableEvent::MessageStart => StreamEvent::MessageStart,
            SerializableEvent::MessageDelta { content } => StreamEvent::MessageDelta(content),
            SerializableEvent::MessageEnd { message } => StreamEvent::MessageEnd(message),
            SerializableEvent::ToolCallStart { tool_call } => StreamEvent::ToolCallStart(tool_call),
            SerializableEvent::ToolCallEnd { result } => StreamEvent::ToolCallEnd(result),
            SerializableEvent::Usage { prompt_tokens, completion_tokens, total_tokens } => StreamEvent::Usage { prompt_tokens, completion_tokens, total_tokens },
            SerializableEvent::Custom { value } => StreamEvent::Custom(value),
            SerializableEvent::StopReason { reason, error_type } => StreamEvent::StopReason { reason, error_type },
            SerializableEvent::Error { message, error_type } => StreamEvent::Error { message, error_type },
            SerializableEvent::Done { error } => StreamEvent::Done { error },
        }
    }
}
