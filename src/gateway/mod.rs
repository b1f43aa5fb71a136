//! The tutor's only I/O boundary.
//!
//! [`TutorGateway`] turns a photo into tutor text. Its public operations
//! return `String`, never `Result`: transport failures, provider errors and
//! empty model output are all converted into fixed, operation-specific
//! fallback messages here, so callers only ever see degraded content.

pub mod gemini;

use crate::locale::Strings;
use crate::session::machine::{Dispatch, TutorReply};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorTask {
    Hint,
    FullAnalysis,
}

impl TutorTask {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hint => "hint",
            Self::FullAnalysis => "full_analysis",
        }
    }
}

impl fmt::Display for TutorTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("GEMINI_API_KEY or GOOGLE_API_KEY not set")]
    MissingApiKey,

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider returned an invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// One multimodal request: a persona, a JPEG photo and a task instruction.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub model: String,
    pub system_instruction: &'static str,
    pub image_jpeg: Arc<[u8]>,
    pub instruction: &'static str,
    pub thinking_budget: u32,
}

/// A model backend. `Ok(None)` means the call succeeded but produced no text.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn generate(&self, request: &VisionRequest) -> Result<Option<String>, GatewayError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThinkingBudgets {
    pub hint: u32,
    pub analysis: u32,
}

pub struct TutorGateway {
    model: Arc<dyn VisionModel>,
    model_name: String,
    budgets: ThinkingBudgets,
    strings: &'static Strings,
}

impl TutorGateway {
    pub fn new(
        model: Arc<dyn VisionModel>,
        model_name: impl Into<String>,
        budgets: ThinkingBudgets,
        strings: &'static Strings,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            budgets,
            strings,
        }
    }

    pub async fn request_hint(&self, image_jpeg: Arc<[u8]>) -> String {
        self.run(TutorTask::Hint, image_jpeg).await
    }

    pub async fn request_full_analysis(&self, image_jpeg: Arc<[u8]>) -> String {
        self.run(TutorTask::FullAnalysis, image_jpeg).await
    }

    /// Runs the request described by a dispatch and pairs the text with it,
    /// ready to be fed back into the session.
    pub async fn answer(&self, dispatch: Dispatch) -> TutorReply {
        let text = match dispatch.task {
            TutorTask::Hint => self.request_hint(dispatch.image_jpeg).await,
            TutorTask::FullAnalysis => self.request_full_analysis(dispatch.image_jpeg).await,
        };
        TutorReply {
            task: dispatch.task,
            pending_id: dispatch.pending_id,
            text,
        }
    }

    fn build_request(&self, task: TutorTask, image_jpeg: Arc<[u8]>) -> VisionRequest {
        let (instruction, thinking_budget) = match task {
            TutorTask::Hint => (self.strings.hint_instruction, self.budgets.hint),
            TutorTask::FullAnalysis => (self.strings.analysis_instruction, self.budgets.analysis),
        };
        VisionRequest {
            model: self.model_name.clone(),
            system_instruction: self.strings.persona,
            image_jpeg,
            instruction,
            thinking_budget,
        }
    }

    fn fallbacks(&self, task: TutorTask) -> (&'static str, &'static str) {
        match task {
            TutorTask::Hint => (self.strings.hint_empty, self.strings.hint_failed),
            TutorTask::FullAnalysis => (self.strings.analysis_empty, self.strings.analysis_failed),
        }
    }

    async fn run(&self, task: TutorTask, image_jpeg: Arc<[u8]>) -> String {
        let request = self.build_request(task, image_jpeg);
        let (empty_fallback, error_fallback) = self.fallbacks(task);
        info!(
            task = task.as_str(),
            model = %request.model,
            image_bytes = request.image_jpeg.len(),
            thinking_budget = request.thinking_budget,
            "dispatching tutor request"
        );

        match self.model.generate(&request).await {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(task = task.as_str(), "model returned no text; using fallback");
                empty_fallback.to_string()
            }
            Err(err) => {
                warn!(task = task.as_str(), error = %err, "tutor request failed; using fallback");
                error_fallback.to_string()
            }
        }
    }
}
