//! JSON-lines host adapter.
//!
//! Plays the platform's part: reads lifecycle, message and fetch events from
//! an input stream, drives the [`RequestRouter`], and writes one JSON reply
//! line per outcome.
//!
//! ```text
//! {"event":"install"}
//! {"event":"activate"}
//! {"event":"message","data":{"type":"SKIP_WAITING"}}
//! {"event":"fetch","id":1,"url":"/static/app.js","mode":"same-origin"}
//! {"event":"status"}
//! ```
//!
//! Install, activate, message and status events are handled one at a time in
//! arrival order. Each fetch runs on its own task, so replies to fetches may
//! come back in any order; match them by `id`.

use crate::error::AdapterError;
use crate::lifecycle::{ActivationReport, ClientControl, InstallReport, LifecycleState};
use crate::message::WorkerMessage;
use crate::router::{FetchOutcome, RequestRouter};
use async_trait::async_trait;
use figus_client::{Fetcher, resolve};
use figus_core::{Error, Request, RequestMode, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

fn default_method() -> String {
    "GET".into()
}

/// One inbound line.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Event {
    Install,
    Activate,
    Message {
        data: serde_json::Value,
    },
    Fetch {
        id: u64,
        /// Absolute URL, or a path relative to the app origin.
        url: String,
        #[serde(default)]
        mode: RequestMode,
        #[serde(default = "default_method")]
        method: String,
    },
    Status,
}

/// One outbound line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Reply {
    Install {
        ok: bool,
        report: Option<InstallReport>,
        error: Option<String>,
    },
    Activate {
        ok: bool,
        report: Option<ActivationReport>,
        error: Option<String>,
    },
    Message {
        ok: bool,
        activate_now: bool,
        error: Option<String>,
    },
    Fetch {
        id: u64,
        /// False when the request went to the network untouched.
        intercepted: bool,
        status: u16,
        status_text: String,
        headers: Vec<(String, String)>,
        /// Body decoded as UTF-8, lossy for binary content.
        body: String,
        body_len: usize,
    },
    FetchError {
        id: u64,
        error: String,
    },
    Status {
        state: LifecycleState,
        skip_waiting: bool,
        cache_name: String,
        caches: Vec<String>,
        entries: u64,
        bytes: u64,
        controlled: bool,
    },
    Invalid {
        error: String,
    },
}

impl Reply {
    fn fetched(id: u64, intercepted: bool, response: Response) -> Self {
        Reply::Fetch {
            id,
            intercepted,
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            body: String::from_utf8_lossy(&response.body).into_owned(),
            body_len: response.body.len(),
        }
    }
}

/// Tracks whether the worker controls the page on the other end of the stream.
///
/// Until activation claims it, fetches from the page bypass the router.
#[derive(Debug, Clone, Default)]
pub struct ClientsHandle {
    controlled: Arc<AtomicBool>,
}

impl ClientsHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_controlled(&self) -> bool {
        self.controlled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientControl for ClientsHandle {
    async fn claim(&self) -> Result<usize, Error> {
        self.controlled.store(true, Ordering::SeqCst);
        Ok(1)
    }
}

/// Connects a router to a line-oriented event stream.
#[derive(Clone)]
pub struct Adapter {
    router: Arc<RequestRouter>,
    network: Arc<dyn Fetcher>,
    clients: ClientsHandle,
}

impl Adapter {
    /// `network` performs default handling for requests the router does not intercept.
    pub fn new(router: Arc<RequestRouter>, network: Arc<dyn Fetcher>, clients: ClientsHandle) -> Self {
        Self { router, network, clients }
    }

    /// Process events until `input` ends, then wait for in-flight fetches and
    /// background cache work. Returns `output` once every reply is written.
    ///
    /// Stops reading as soon as writing a reply fails and returns that error.
    pub async fn run<R, W>(&self, input: R, output: W) -> Result<W, AdapterError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Reply>();
        let writer = tokio::spawn(async move {
            let mut output = output;
            while let Some(reply) = rx.recv().await {
                let mut line = serde_json::to_vec(&reply)?;
                line.push(b'\n');
                output.write_all(&line).await?;
                output.flush().await?;
            }
            Ok::<W, AdapterError>(output)
        });

        let mut fetches = JoinSet::new();
        let mut lines = input.lines();
        loop {
            // A closed channel means the writer failed; its error is returned below.
            let line = tokio::select! {
                line = lines.next_line() => line?,
                () = tx.closed() => break,
            };
            let Some(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<Event>(&line) {
                Ok(Event::Fetch { id, url, mode, method }) => {
                    let adapter = self.clone();
                    let tx = tx.clone();
                    fetches.spawn(async move {
                        let reply = adapter.fetch(id, &url, mode, method).await;
                        let _ = tx.send(reply);
                    });
                }
                Ok(event) => {
                    for reply in self.dispatch(event).await {
                        let _ = tx.send(reply);
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "unparseable event line");
                    let _ = tx.send(Reply::Invalid { error: e.to_string() });
                }
            }

            while fetches.try_join_next().is_some() {}
        }

        if tx.is_closed() {
            tracing::warn!(pending = fetches.len(), "reply stream closed, abandoning in-flight fetches");
            fetches.shutdown().await;
        } else {
            while let Some(result) = fetches.join_next().await {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "fetch task failed");
                }
            }
        }
        self.router.flush().await;
        drop(tx);

        writer.await?
    }

    async fn dispatch(&self, event: Event) -> Vec<Reply> {
        match event {
            Event::Install => match self.router.handle_install().await {
                Ok(report) => {
                    let skip_waiting = report.skip_waiting;
                    let mut replies = vec![Reply::Install { ok: true, report: Some(report), error: None }];
                    if skip_waiting {
                        replies.push(self.activate().await);
                    }
                    replies
                }
                Err(e) => vec![Reply::Install { ok: false, report: None, error: Some(e.to_string()) }],
            },
            Event::Activate => vec![self.activate().await],
            Event::Message { data } => match WorkerMessage::from_value(data) {
                Ok(message) => {
                    let activate_now = self.router.handle_message(message);
                    let mut replies = vec![Reply::Message { ok: true, activate_now, error: None }];
                    if activate_now {
                        replies.push(self.activate().await);
                    }
                    replies
                }
                Err(e) => vec![Reply::Message { ok: false, activate_now: false, error: Some(e.to_string()) }],
            },
            Event::Status => vec![self.status().await],
            Event::Fetch { id, url, mode, method } => vec![self.fetch(id, &url, mode, method).await],
        }
    }

    async fn activate(&self) -> Reply {
        match self.router.handle_activate().await {
            Ok(report) => Reply::Activate { ok: true, report: Some(report), error: None },
            Err(e) => Reply::Activate { ok: false, report: None, error: Some(e.to_string()) },
        }
    }

    async fn status(&self) -> Reply {
        let storage = self.router.storage();
        let cache_name = self.router.cache_name().to_string();
        let caches = storage.names().await.unwrap_or_default();
        let usage = storage.usage(&cache_name).await.unwrap_or_default();
        Reply::Status {
            state: self.router.state(),
            skip_waiting: self.router.skip_waiting_requested(),
            cache_name,
            caches,
            entries: usage.entries,
            bytes: usage.bytes,
            controlled: self.clients.is_controlled(),
        }
    }

    async fn fetch(&self, id: u64, url: &str, mode: RequestMode, method: String) -> Reply {
        let url = match resolve(&self.router.config().origin, url) {
            Ok(url) => url,
            Err(e) => return Reply::FetchError { id, error: Error::InvalidUrl(e.to_string()).to_string() },
        };
        let request = Request { method, url, mode };

        let outcome = if self.clients.is_controlled() {
            self.router.handle_fetch(request.clone()).await
        } else {
            Ok(FetchOutcome::Passthrough)
        };

        let result = match outcome {
            Ok(FetchOutcome::Respond(response)) => Ok((true, response)),
            Ok(FetchOutcome::Passthrough) => self.network.fetch(&request).await.map(|response| (false, response)),
            Err(e) => Err(e),
        };

        match result {
            Ok((intercepted, response)) => Reply::fetched(id, intercepted, response),
            Err(e) => Reply::FetchError { id, error: e.to_string() },
        }
    }
}
