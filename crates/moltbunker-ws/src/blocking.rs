//! Blocking sessions for callers without an async runtime.
//!
//! Each session owns a single-worker tokio runtime. The receive loop runs
//! on that worker thread while caller threads use the blocking methods
//! below. Callbacks also run on the worker thread, so they must not call
//! `connect`, `wait`, `recv` or `close` on the session that invoked them;
//! `subscribe`, `unsubscribe`, `send` and `resize` are safe there.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use moltbunker_auth::{MessageSigner, SignedChallenge};
use moltbunker_config::EventsConfig;
use serde_json::Value;
use tokio::runtime::{Builder, Runtime};

use crate::error::SessionError;
use crate::exec::{ExecOptions, Received};
use crate::state::ConnectionState;

fn worker_runtime(name: &str) -> Result<Runtime, SessionError> {
    Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name(name)
        .enable_all()
        .build()
        .map_err(|e| SessionError::Config(format!("failed to start runtime: {}", e)))
}

/// Blocking [`crate::EventStream`].
pub struct EventStream {
    inner: crate::events::EventStream,
    runtime: Runtime,
}

impl EventStream {
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        config: &EventsConfig,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            inner: crate::events::EventStream::new(base_url, token, config)?,
            runtime: worker_runtime("moltbunker-events")?,
        })
    }

    /// Wrap an already configured stream.
    pub fn from_async(inner: crate::events::EventStream) -> Result<Self, SessionError> {
        Ok(Self {
            inner,
            runtime: worker_runtime("moltbunker-events")?,
        })
    }

    pub fn connect(&self) -> Result<(), SessionError> {
        self.runtime.block_on(self.inner.connect())
    }

    pub fn subscribe<F>(&self, channel: impl Into<String>, callback: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.inner.subscribe(channel, callback);
    }

    pub fn unsubscribe(&self, channel: &str) {
        self.inner.unsubscribe(channel);
    }

    pub fn channels(&self) -> Vec<String> {
        self.inner.channels()
    }

    /// Block until the stream is closed.
    pub fn wait(&self) {
        self.runtime.block_on(self.inner.wait());
    }

    /// Block for at most `timeout`. Returns `true` if the stream closed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.runtime
            .block_on(async { tokio::time::timeout(timeout, self.inner.wait()).await })
            .is_ok()
    }

    pub fn close(&self) {
        self.runtime.block_on(self.inner.close());
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.inner.last_error()
    }
}

/// Blocking [`crate::ExecSession`].
pub struct ExecSession {
    inner: crate::exec::ExecSession,
    runtime: Runtime,
}

impl ExecSession {
    pub fn new(
        base_url: &str,
        container_id: &str,
        bearer_token: &str,
        private_key: &str,
        options: ExecOptions,
    ) -> Result<Self, SessionError> {
        let inner =
            crate::exec::ExecSession::new(base_url, container_id, bearer_token, private_key, options)?;
        Self::from_async(inner)
    }

    pub fn with_signer(
        base_url: &str,
        container_id: &str,
        bearer_token: &str,
        signer: Arc<dyn MessageSigner>,
        options: ExecOptions,
    ) -> Result<Self, SessionError> {
        let inner =
            crate::exec::ExecSession::with_signer(base_url, container_id, bearer_token, signer, options)?;
        Self::from_async(inner)
    }

    pub fn from_async(inner: crate::exec::ExecSession) -> Result<Self, SessionError> {
        Ok(Self {
            inner,
            runtime: worker_runtime("moltbunker-exec")?,
        })
    }

    pub fn connect(&self) -> Result<(), SessionError> {
        self.runtime.block_on(self.inner.connect())
    }

    pub fn connect_with(&self, signed: SignedChallenge) -> Result<(), SessionError> {
        self.runtime.block_on(self.inner.connect_with(signed))
    }

    pub fn send(&self, data: impl Into<Bytes>) -> Result<(), SessionError> {
        self.inner.send(data)
    }

    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), SessionError> {
        self.inner.resize(cols, rows)
    }

    pub fn on_data<F>(&self, callback: F)
    where
        F: Fn(Bytes) + Send + Sync + 'static,
    {
        self.inner.on_data(callback);
    }

    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.inner.on_error(callback);
    }

    pub fn recv(&self, timeout: Duration) -> Received {
        self.runtime.block_on(self.inner.recv(timeout))
    }

    pub fn wait(&self) {
        self.runtime.block_on(self.inner.wait());
    }

    pub fn close(&self) {
        self.runtime.block_on(self.inner.close());
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.inner.last_error()
    }
}
