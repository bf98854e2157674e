//! Configuration document (§6). Only the sub-documents the core actually
//! reads are strongly typed; everything the core never opens (API/model/
//! dataset file paths) is carried as opaque strings so this crate does not
//! reach into the excluded parsing/file-format surface (§1).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PresentationViews {
    pub display_page_size: usize,
    pub topn_frames_per_video: usize,
    pub topn_frames_per_shot: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalServerKind {
    Vbs,
    Dres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvalServerConfig {
    pub do_network_requests: bool,
    pub submit_lsc_ids: bool,
    pub allow_insecure: bool,
    pub team_id: String,
    pub member_id: String,
    pub log_dir_submitted: String,
    pub log_dir_actions: String,
    pub log_dir_queries: String,
    pub log_dir_requests: String,
    pub log_file_suffix: String,
    pub extra_verbose_log: bool,
    pub send_logs_to_server_period: u64,
    pub log_action_timeout_ms: u64,
    pub submit_server: EvalServerKind,
}

/// Opaque — the core never opens model/feature files directly.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ModelsConfig {
    #[serde(flatten)]
    pub raw: serde_json::Map<String, serde_json::Value>,
}

/// Opaque — the core never opens dataset files directly, but needs to know
/// whether LSC-style temporal metadata is present at all ([`DatasetsConfig::has_metadata`]).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DatasetsConfig {
    pub lsc_metadata_file: Option<String>,
    #[serde(flatten)]
    pub raw: serde_json::Map<String, serde_json::Value>,
}

impl DatasetsConfig {
    pub fn has_metadata(&self) -> bool {
        self.lsc_metadata_file.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub local_only: bool,
    pub port: u16,
    pub config_filepath: String,
    pub docs_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub presentation_views: PresentationViews,
    pub api: ApiConfig,
    pub eval_server: EvalServerConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub datasets: DatasetsConfig,
}

impl Config {
    pub fn from_json(text: &str) -> crate::error::Result<Self> {
        let mut config: Config = serde_json::from_str(text)
            .map_err(|e| crate::error::EngineError::Config(e.to_string()))?;
        if !config.api.docs_dir.ends_with('/') {
            config.api.docs_dir.push('/');
        }
        Ok(config)
    }
}
