//! Integration Host
//!
//! Owns one integration and drives it from three independent sources: a
//! stream of ledger events, a periodic timer and webhook requests. Each
//! handler runs under the integration lock, so a render always sees a
//! consistent set of contracts even while events keep arriving.

use crate::error::{IntegrationError, Result};
use crate::events::{Command, LedgerEvent};
use crate::integration::Integration;
use crate::webhook::{WebhookRequest, WebhookResponse, WebhookRoute};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Destination for commands emitted by integration handlers
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn submit(&self, commands: Vec<Command>) -> Result<()>;
}

/// Hands commands to an in-process receiver
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Command>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<Command>) -> Self {
        Self { sender }
    }

    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl CommandSink for ChannelSink {
    async fn submit(&self, commands: Vec<Command>) -> Result<()> {
        for command in commands {
            self.sender.send(command).map_err(|_| {
                IntegrationError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "command receiver dropped",
                ))
            })?;
        }
        Ok(())
    }
}

/// Writes one JSON command per line
pub struct NdjsonSink<W> {
    writer: Mutex<W>,
}

impl<W> NdjsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl NdjsonSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W> CommandSink for NdjsonSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn submit(&self, commands: Vec<Command>) -> Result<()> {
        let mut writer = self.writer.lock().await;
        for command in &commands {
            let mut line = serde_json::to_vec(command)?;
            line.push(b'\n');
            writer.write_all(&line).await?;
        }
        writer.flush().await?;
        Ok(())
    }
}

pub struct IntegrationHost {
    kind: &'static str,
    timer_interval: Option<Duration>,
    integration: Arc<Mutex<Box<dyn Integration>>>,
    sink: Arc<dyn CommandSink>,
}

impl IntegrationHost {
    pub fn new(integration: Box<dyn Integration>, sink: Arc<dyn CommandSink>) -> Self {
        Self {
            kind: integration.kind(),
            timer_interval: integration.timer_interval(),
            integration: Arc::new(Mutex::new(integration)),
            sink,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn timer_interval(&self) -> Option<Duration> {
        self.timer_interval
    }

    pub async fn routes(&self) -> Vec<WebhookRoute> {
        self.integration.lock().await.webhooks()
    }

    /// Runs the event handler and forwards its commands. Returns the number
    /// of commands emitted.
    pub async fn dispatch(&self, event: &LedgerEvent) -> Result<usize> {
        let commands = {
            let mut integration = self.integration.lock().await;
            integration.handle_ledger_event(event)
        };
        self.submit(commands).await
    }

    pub async fn fire_timer(&self) -> Result<usize> {
        let commands = {
            let mut integration = self.integration.lock().await;
            integration.handle_timer()
        };
        self.submit(commands).await
    }

    async fn submit(&self, commands: Vec<Command>) -> Result<usize> {
        let count = commands.len();
        if count > 0 {
            debug!("Submitting {} commands from {}", count, self.kind);
            self.sink.submit(commands).await?;
        }
        Ok(count)
    }

    /// Routes a request to the integration. Requests that match none of its
    /// webhooks get a 404 without reaching it.
    pub async fn webhook(&self, request: &WebhookRequest) -> WebhookResponse {
        let mut integration = self.integration.lock().await;
        if !integration.webhooks().iter().any(|route| route.matches(request)) {
            return WebhookResponse::not_found(&request.path);
        }
        match integration.handle_webhook(request) {
            Ok(response) => response,
            Err(e) => {
                error!("Webhook {} failed: {}", request.path, e);
                WebhookResponse::error(500, &e.to_string())
            }
        }
    }

    /// Feeds newline-delimited JSON ledger events until the reader ends.
    /// Lines that do not decode are skipped. Returns the number of events
    /// dispatched.
    pub async fn run_events<R>(&self, reader: R) -> Result<u64>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut dispatched = 0u64;
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match LedgerEvent::from_json_line(line) {
                Ok(event) => {
                    self.dispatch(&event).await?;
                    dispatched += 1;
                }
                Err(e) => warn!("Skipping ledger event line: {}", e),
            }
        }
        Ok(dispatched)
    }

    /// Starts the periodic timer task, if the integration has a timer.
    pub fn spawn_timer(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let period = self.timer_interval?;
        let host = Arc::clone(self);
        info!("Timer for {} every {:?}", self.kind, period);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = host.fire_timer().await {
                    error!("Timer handler failed: {}", e);
                }
            }
        }))
    }
}
