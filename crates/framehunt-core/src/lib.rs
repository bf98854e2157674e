//! # framehunt-core
//!
//! Known-item video retrieval engine: interactive rescoring over
//! pre-extracted keyframe features, driven by text, canvas, relocation, and
//! temporal queries, with relevance feedback, filtering, and a background
//! Self-Organising Map browse mode.
//!
//! Feature extraction, persistent storage, the evaluation-server wire
//! protocol, an HTTP/API surface, and benchmark harnesses are all out of
//! scope for this crate — it consumes their outputs through the traits and
//! plain data defined here ([`canvas_ranker::ImageEncoder`],
//! [`eval_client::EvalClient`], [`feature_store::FeatureMatrix`]).
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use framehunt_core::{SessionCore, Query, TemporalQuery};
//!
//! let mut session = SessionCore::new(/* stores, rankers, logger, ... */);
//! let query = Query {
//!     temporal_queries: vec![TemporalQuery::Textual("a red car".into())],
//!     ..Default::default()
//! };
//! let result = session.rescore(query, false)?;
//! let page = session.get_display(Default::default());
//! # Ok::<(), framehunt_core::EngineError>(())
//! ```

pub mod caps;
pub mod canvas_ranker;
pub mod config;
pub mod display;
pub mod error;
pub mod eval_client;
pub mod feature_store;
pub mod filter_engine;
pub mod frame_store;
pub mod keyword_ranker;
pub mod logging;
pub mod query;
pub mod relocation_ranker;
pub mod score_model;
pub mod session;
pub mod som;

pub use canvas_ranker::{CanvasRanker, ImageEncoder, RegionGrid, RegionTensor};
pub use config::Config;
pub use display::{DisplayConfig, DisplayRequest, DisplayResult, DisplayRouter, DisplayType};
pub use error::{EngineError, Result};
pub use eval_client::{EvalClient, NullEvalClient, SubmitResult};
pub use feature_store::{cosine_similarity, FeatureMatrix, FeatureStore};
pub use filter_engine::FilterEngine;
pub use frame_store::{Frame, FrameId, FrameStore, ShotId, VideoId};
pub use keyword_ranker::KeywordRanker;
pub use logging::{ChannelSessionLog, LogEvent, NullSessionLog, RecordingSessionLog, SessionLog};
pub use query::{
    CanvasPayload, CanvasSubquery, Filters, Keyword, Query, Rect, TemporalQuery, MAX_TEMPORAL_SIZE,
};
pub use relocation_ranker::RelocationRanker;
pub use score_model::{ScoreModel, NORMALIZE_TARGET};
pub use session::{RescoreResult, SearchContext, SessionCore, UsedTools};
pub use som::{Grid, SomWorker, IMAGE_ID_ERR_VAL};

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::{
        CanvasPayload, CanvasSubquery, DisplayRequest, DisplayType, EngineError, Filters,
        FrameId, Query, RescoreResult, Result, SessionCore, SessionLog, TemporalQuery,
    };
}
