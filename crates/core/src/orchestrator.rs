//! The edit request orchestrator.
//!
//! [`Orchestrator`] owns the [`SessionState`] and is the only thing that
//! mutates it. Every intent takes `&mut self`, so transitions never interleave.
//! Network work runs on spawned tasks that report back through a channel; the
//! owner applies those completions when it chooses to, via
//! [`Orchestrator::next_completion`], [`Orchestrator::drain_completions`] or
//! [`Orchestrator::settle`].
//!
//! Results are fenced by [`RequestId`]: only the outcome of the latest request
//! for the current photo is ever applied, whatever order they arrive in.

use crate::capture::{CaptureOutcome, CaptureProvider, CaptureSource};
use crate::client::Transformer;
use crate::error::{AppError, EditError, Result};
use crate::photo::PhotoRef;
use crate::session::{EditOutcome, RequestId, SessionState};
use crate::style::StyleId;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;

/// A finished request, as reported by its task.
#[derive(Debug)]
pub struct Completion {
    pub request_id: RequestId,
    pub outcome: EditOutcome,
}

pub struct Orchestrator<T: Transformer> {
    transformer: Arc<T>,
    state: SessionState,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    snapshots: watch::Sender<SessionState>,
    in_flight: Option<AbortHandle>,
    abort_superseded: bool,
}

impl<T: Transformer> Orchestrator<T> {
    pub fn new(transformer: T) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (snapshots, _) = watch::channel(SessionState::new());
        Self {
            transformer: Arc::new(transformer),
            state: SessionState::new(),
            completions_tx,
            completions_rx,
            snapshots,
            in_flight: None,
            abort_superseded: false,
        }
    }

    /// Aborts the transport of superseded requests instead of only ignoring
    /// their results.
    pub fn with_abort_superseded(mut self, abort: bool) -> Self {
        self.abort_superseded = abort;
        self
    }

    /// Read-only view of the current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    /// Receiver that sees a fresh snapshot after every transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.snapshots.subscribe()
    }

    /// Makes `photo` current and resets to Ready.
    ///
    /// Any in-flight request is abandoned; its result will be discarded.
    pub fn select_photo(&mut self, photo: PhotoRef) {
        tracing::debug!(photo = %photo, "photo selected");
        self.supersede_in_flight();
        self.state.select_photo(photo);
        self.discard_arrived();
        self.publish();
    }

    /// Asks a capture provider for a photo and applies the answer.
    ///
    /// Cancellation is a no-op. A device failure becomes a notice in the
    /// state and leaves photo and result as they were.
    pub async fn acquire<P>(&mut self, provider: &P, source: CaptureSource) -> CaptureOutcome
    where
        P: CaptureProvider + ?Sized,
    {
        let outcome = provider.acquire(source).await;
        match &outcome {
            CaptureOutcome::Selected(photo) => self.select_photo(photo.clone()),
            CaptureOutcome::Cancelled => {
                tracing::debug!(?source, "capture cancelled");
            }
            CaptureOutcome::Failed(err) => {
                tracing::warn!(?source, error = %err, "capture failed");
                self.state.record_notice(err.clone());
                self.publish();
            }
        }
        outcome
    }

    /// Submits the current photo for `style`, superseding any pending request.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NoPhotoSelected`] when there is no photo. The state
    /// is left untouched in that case.
    pub fn request_edit(&mut self, style: StyleId) -> Result<RequestId> {
        let was_pending = self.state.pending;
        let request = self
            .state
            .begin_request(style)
            .ok_or(AppError::NoPhotoSelected)?;
        let request_id = request.request_id;

        if was_pending {
            tracing::debug!(request_id = request_id.get(), "superseding pending request");
            self.supersede_in_flight();
        }
        self.discard_arrived();

        let transformer = Arc::clone(&self.transformer);
        let tx = self.completions_tx.clone();
        let handle = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(async move { transformer.submit(request).await })
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    tracing::warn!(request_id = request_id.get(), "edit task panicked");
                    Err(EditError::network("edit task failed"))
                });
            // The receiver lives as long as the orchestrator.
            let _ = tx.send(Completion {
                request_id,
                outcome,
            });
        });
        self.in_flight = Some(handle.abort_handle());

        self.publish();
        Ok(request_id)
    }

    /// Applies a finished request. Stale outcomes are dropped silently.
    ///
    /// Returns whether the outcome changed the state.
    pub fn on_result(&mut self, request_id: RequestId, outcome: EditOutcome) -> bool {
        let summary = match &outcome {
            Ok(result) => Ok(result.to_string()),
            Err(err) => Err(err.clone()),
        };

        if !self.state.apply_outcome(request_id, outcome) {
            tracing::debug!(request_id = request_id.get(), "discarding stale result");
            return false;
        }

        self.in_flight = None;
        match summary {
            Ok(url) => tracing::info!(request_id = request_id.get(), result = %url, "edit completed"),
            Err(err) => tracing::warn!(
                request_id = request_id.get(),
                kind = err.kind(),
                error = %err,
                "edit failed"
            ),
        }
        self.publish();
        true
    }

    /// Waits for the next completion and applies it.
    ///
    /// Returns whether it was current. Never returns `None` while the
    /// orchestrator is alive, so callers should only await this while a
    /// request is outstanding.
    pub async fn next_completion(&mut self) -> Option<bool> {
        let completion = self.completions_rx.recv().await?;
        Some(self.on_result(completion.request_id, completion.outcome))
    }

    /// Applies every completion that has already arrived, without waiting.
    ///
    /// Completions left over from superseded requests are dropped on the next
    /// intent; a front end that goes idle with requests outstanding should
    /// still call this regularly.
    ///
    /// Returns how many of them were current.
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            if self.on_result(completion.request_id, completion.outcome) {
                applied += 1;
            }
        }
        applied
    }

    /// Applies completions until no request is pending.
    pub async fn settle(&mut self) -> &SessionState {
        while self.state.pending {
            if self.next_completion().await.is_none() {
                break;
            }
        }
        &self.state
    }

    /// Drops completions already queued. Called right after a transition that
    /// makes every issued request stale.
    fn discard_arrived(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            tracing::debug!(
                request_id = completion.request_id.get(),
                "discarding stale result"
            );
        }
    }

    fn supersede_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if self.abort_superseded {
                handle.abort();
            }
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.state.clone());
    }
}
