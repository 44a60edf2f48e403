//! Session state and its transition functions.
//!
//! The session follows a small cyclic state machine:
//!
//! ```text
//! Idle --select--> Ready --request--> Pending --matching ok--> Completed
//!                    ^                   |  \--matching err--> Failed
//!                    |                   '--request--> Pending (supersedes)
//!                    '--select-- (from any phase)
//! ```
//!
//! Completed and Failed return to Pending on the next request. Every
//! transition lives on [`SessionState`] so the rules can be checked without a
//! runtime or network.

use crate::error::{DeviceError, EditError};
use crate::photo::PhotoRef;
use crate::style::StyleId;
use std::fmt;
use url::Url;

/// Monotonic fencing token identifying one edit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One submission to the transformation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub request_id: RequestId,
    pub photo: PhotoRef,
    pub style: StyleId,
}

/// Locator of a transformed image returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRef(Url);

impl ResultRef {
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for ResultRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// What a submitted request resolved to.
pub type EditOutcome = Result<ResultRef, EditError>;

/// Phase derived from the session fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No photo yet.
    Idle,
    /// Photo present, nothing requested or the last request was abandoned.
    Ready,
    /// A request is in flight.
    Pending,
    /// The current photo has a transformed result.
    Completed,
    /// The last request for the current photo failed.
    Failed,
}

/// The single mutable record behind a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub photo: Option<PhotoRef>,
    pub result: Option<ResultRef>,
    pub pending: bool,
    pub error: Option<EditError>,
    /// Non-fatal notice from the last failed capture attempt.
    pub notice: Option<DeviceError>,
    /// Token of the request whose outcome will be applied, if any.
    pub current_request: Option<RequestId>,
    last_issued: RequestId,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        match (&self.photo, self.pending, &self.result, &self.error) {
            (None, ..) => Phase::Idle,
            (Some(_), true, ..) => Phase::Pending,
            (Some(_), false, Some(_), _) => Phase::Completed,
            (Some(_), false, None, Some(_)) => Phase::Failed,
            (Some(_), false, None, None) => Phase::Ready,
        }
    }

    /// Highest token handed out so far.
    pub fn last_issued(&self) -> RequestId {
        self.last_issued
    }

    /// Replaces the photo and resets to Ready, abandoning any pending request.
    pub fn select_photo(&mut self, photo: PhotoRef) {
        self.photo = Some(photo);
        self.result = None;
        self.error = None;
        self.notice = None;
        self.pending = false;
        self.current_request = None;
    }

    /// Moves to Pending with a fresh token.
    ///
    /// Returns `None`, leaving the state untouched, when no photo is selected.
    pub fn begin_request(&mut self, style: StyleId) -> Option<EditRequest> {
        let photo = self.photo.clone()?;

        let request_id = self.last_issued.next();
        self.last_issued = request_id;
        self.current_request = Some(request_id);
        self.pending = true;
        self.result = None;
        self.error = None;
        self.notice = None;

        Some(EditRequest {
            request_id,
            photo,
            style,
        })
    }

    /// Applies an outcome if it belongs to the current request.
    ///
    /// Returns `false` and changes nothing for stale tokens.
    pub fn apply_outcome(&mut self, request_id: RequestId, outcome: EditOutcome) -> bool {
        if self.current_request != Some(request_id) {
            return false;
        }

        match outcome {
            Ok(result) => self.result = Some(result),
            Err(err) => self.error = Some(err),
        }
        self.pending = false;
        self.current_request = None;
        true
    }

    /// Records a capture-device failure without touching photo or result.
    pub fn record_notice(&mut self, notice: DeviceError) {
        self.notice = Some(notice);
    }
}
