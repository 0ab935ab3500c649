//! Actor boundary around a [`LintSession`].
//!
//! Editors deliver save events from wherever they like; the session only
//! ever runs on the service task, one request at a time and in arrival
//! order. Callers hold a cheap [`LintHandle`].

use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};

use pyright_bridge_types::{Diagnostic, DiagnosticsSnapshot, PyrightSettings};

use crate::session::LintSession;

const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// One editor event for the service.
#[derive(Debug, Clone, PartialEq)]
pub struct LintRequest {
    pub document: PathBuf,
    pub saved: bool,
    /// Applied before the lint when present.
    pub settings: Option<PyrightSettings>,
}

impl LintRequest {
    /// A save of `document` under the current settings.
    pub fn save(document: impl Into<PathBuf>) -> Self {
        Self {
            document: document.into(),
            saved: true,
            settings: None,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: PyrightSettings) -> Self {
        self.settings = Some(settings);
        self
    }
}

#[derive(Debug, thiserror::Error)]
#[error("lint service has shut down")]
pub struct ServiceClosed;

enum ServiceCommand {
    Lint {
        request: LintRequest,
        reply: oneshot::Sender<Vec<Diagnostic>>,
    },
    Snapshot {
        reply: oneshot::Sender<DiagnosticsSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

pub struct LintService {
    session: LintSession,
    rx: mpsc::Receiver<ServiceCommand>,
}

impl LintService {
    /// Move `session` onto its own task and return a handle to it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(session: LintSession) -> LintHandle {
        let (tx, rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let service = Self { session, rx };
        tokio::spawn(service.run());
        LintHandle { tx }
    }

    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                ServiceCommand::Lint { request, reply } => {
                    if let Some(settings) = request.settings {
                        self.session.reconfigure(settings).await;
                    }
                    let items = self.session.on_save(&request.document, request.saved).await;
                    let _ = reply.send(items);
                }
                ServiceCommand::Snapshot { reply } => {
                    let _ = reply.send(self.session.snapshot());
                }
                ServiceCommand::Shutdown { reply } => {
                    self.rx.close();
                    self.session.shutdown().await;
                    let _ = reply.send(());
                    return;
                }
            }
        }

        tracing::debug!("All lint handles dropped; stopping analyzer");
        self.session.shutdown().await;
    }
}

/// Cloneable front end of a running [`LintService`].
#[derive(Clone)]
pub struct LintHandle {
    tx: mpsc::Sender<ServiceCommand>,
}

impl LintHandle {
    pub async fn lint(&self, request: LintRequest) -> Result<Vec<Diagnostic>, ServiceClosed> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ServiceCommand::Lint { request, reply })
            .await
            .map_err(|_| ServiceClosed)?;
        rx.await.map_err(|_| ServiceClosed)
    }

    pub async fn snapshot(&self) -> Result<DiagnosticsSnapshot, ServiceClosed> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ServiceCommand::Snapshot { reply })
            .await
            .map_err(|_| ServiceClosed)?;
        rx.await.map_err(|_| ServiceClosed)
    }

    /// Stop the analyzer and the service task. Requests already queued
    /// ahead of this one are still answered.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(ServiceCommand::Shutdown { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
