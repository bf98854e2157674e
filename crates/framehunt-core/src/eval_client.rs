//! The evaluation-server submission client — out of scope (§1); this module
//! is only the hook `SessionCore::submit` calls through.

use crate::frame_store::FrameId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitResult {
    Correct,
    Incorrect,
    NotLoggedIn,
}

/// External collaborator. A real implementation talks to a VBS or DRES
/// server (§6); failures here never corrupt session state (§7.4) — they
/// surface as `NotLoggedIn` or are logged as a warning by the caller.
pub trait EvalClient: Send + Sync {
    fn submit(&self, frame_id: FrameId) -> SubmitResult;
}

/// Always reports not-logged-in. Used when no eval server is configured.
pub struct NullEvalClient;

impl EvalClient for NullEvalClient {
    fn submit(&self, _frame_id: FrameId) -> SubmitResult {
        SubmitResult::NotLoggedIn
    }
}
