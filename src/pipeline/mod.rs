//! Alignment analysis pipeline.
//!
//! Chooses between a single analysis call and the three-call
//! generate/critique/refine sequence, then degrades step by step when a
//! call fails. Whatever happens, callers get a well-shaped
//! [`AlignmentResult`]; generation and parsing errors never escape.
//!
//! | Outcome                         | `processing_method` | `api_calls_used` |
//! |:--------------------------------|:--------------------|:----------------:|
//! | simple call succeeded           | `simple`            | 1                |
//! | all three calls succeeded       | `self_critique`     | 3                |
//! | critique call failed            | `simple_fallback`   | 2                |
//! | refine call failed              | `simple_fallback`   | 3                |
//! | first call failed, bad snapshot | `fallback`          | 0                |

mod enhance;
mod extract;
mod prompts;

pub use enhance::check_for_enhancement_needs;
use extract::extract_payload;

use crate::config::Config;
use crate::llm::{GenerationError, TextGenerator};
use crate::models::{AlignmentResult, ProcessDetails, ProcessingMethod, UnifiedSnapshot};
use prompts::{alignment_prompt, critique_prompt, excerpt, refine_prompt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Which path a snapshot is analyzed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Simple,
    SelfCritique,
}

/// Pipeline knobs, resolved from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub enable_self_critique: bool,
    pub simple_threshold: usize,
    pub min_document_types: usize,
    pub max_tokens: u32,
    pub critique_max_tokens: u32,
    pub context_excerpt_chars: usize,
    pub detail_excerpt_chars: usize,
    pub suggest_enhancements: bool,
    /// Bounded wait per generation call.
    pub timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        let analysis = &config.analysis;
        Self {
            enable_self_critique: analysis.enable_self_critique,
            simple_threshold: analysis.simple_threshold,
            min_document_types: analysis.min_document_types,
            max_tokens: analysis.max_tokens,
            critique_max_tokens: analysis.critique_max_tokens,
            context_excerpt_chars: analysis.context_excerpt_chars,
            detail_excerpt_chars: analysis.detail_excerpt_chars,
            suggest_enhancements: analysis.suggest_enhancements,
            timeout: Duration::from_secs(config.model.timeout_seconds),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct AlignmentPipeline {
    generator: Arc<dyn TextGenerator>,
    settings: PipelineSettings,
}

impl AlignmentPipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: PipelineSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Analyze a serialized snapshot. An unreadable snapshot yields the fallback result.
    pub async fn analyze_alignment_with_critique(&self, snapshot_json: &str) -> AlignmentResult {
        match UnifiedSnapshot::from_json(snapshot_json) {
            Ok(snapshot) => self.analyze(&snapshot).await,
            Err(e) => {
                error!("Error in alignment analysis: {}", e);
                AlignmentResult::fallback()
            }
        }
    }

    pub async fn analyze(&self, snapshot: &UnifiedSnapshot) -> AlignmentResult {
        let content = match snapshot.to_json_pretty() {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to serialize snapshot: {}", e);
                return AlignmentResult::fallback();
            }
        };

        match self.determine_processing_method(snapshot) {
            Strategy::Simple => self.simple_analysis(snapshot, &content).await,
            Strategy::SelfCritique => self.self_critique_analysis(snapshot, &content).await,
        }
    }

    /// Simple for thin projects (few sections or few populated slots), self-critique otherwise.
    pub fn determine_processing_method(&self, snapshot: &UnifiedSnapshot) -> Strategy {
        let total_sections = snapshot.total_sections();
        let non_empty = snapshot.non_empty_slots();
        debug!(
            "Snapshot has {} sections in {} non-empty slots",
            total_sections, non_empty
        );

        if !self.settings.enable_self_critique
            || total_sections < self.settings.simple_threshold
            || non_empty < self.settings.min_document_types
        {
            Strategy::Simple
        } else {
            Strategy::SelfCritique
        }
    }

    async fn simple_analysis(&self, snapshot: &UnifiedSnapshot, content: &str) -> AlignmentResult {
        info!("Using simple alignment analysis");

        match self
            .call("analysis", &alignment_prompt(content), self.settings.max_tokens)
            .await
        {
            Ok(text) => AlignmentResult {
                analysis: extract_payload(&text),
                processing_method: ProcessingMethod::Simple,
                api_calls_used: 1,
                enhancement_suggestions: self.enhancement_hints(snapshot),
                process_details: None,
            },
            Err(_) => AlignmentResult::fallback(),
        }
    }

    async fn self_critique_analysis(
        &self,
        snapshot: &UnifiedSnapshot,
        content: &str,
    ) -> AlignmentResult {
        info!("Using self-critique alignment analysis");

        let initial = match self
            .call("analysis", &alignment_prompt(content), self.settings.max_tokens)
            .await
        {
            Ok(text) => text,
            Err(_) => return AlignmentResult::fallback(),
        };

        let context = excerpt(content, self.settings.context_excerpt_chars);

        let critique = match self
            .call(
                "critique",
                &critique_prompt(&initial, context),
                self.settings.critique_max_tokens,
            )
            .await
        {
            Ok(text) => text,
            Err(_) => return self.simple_fallback(snapshot, &initial, 2),
        };

        let enhanced = match self
            .call(
                "refine",
                &refine_prompt(&initial, &critique, context),
                self.settings.max_tokens,
            )
            .await
        {
            Ok(text) => text,
            Err(_) => return self.simple_fallback(snapshot, &initial, 3),
        };

        let detail_chars = self.settings.detail_excerpt_chars;
        AlignmentResult {
            analysis: extract_payload(&enhanced),
            processing_method: ProcessingMethod::SelfCritique,
            api_calls_used: 3,
            enhancement_suggestions: self.enhancement_hints(snapshot),
            process_details: Some(ProcessDetails {
                initial_response: format!("{}...", excerpt(&initial, detail_chars)),
                critique,
                enhanced_response: format!("{}...", excerpt(&enhanced, detail_chars)),
            }),
        }
    }

    /// Package the first analysis when a later step failed.
    fn simple_fallback(
        &self,
        snapshot: &UnifiedSnapshot,
        initial: &str,
        api_calls_used: u32,
    ) -> AlignmentResult {
        warn!(
            "Self-critique incomplete, using initial analysis ({} calls attempted)",
            api_calls_used
        );

        AlignmentResult {
            analysis: extract_payload(initial),
            processing_method: ProcessingMethod::SimpleFallback,
            api_calls_used,
            enhancement_suggestions: self.enhancement_hints(snapshot),
            process_details: None,
        }
    }

    fn enhancement_hints(&self, snapshot: &UnifiedSnapshot) -> Vec<crate::models::EnhancementHint> {
        if self.settings.suggest_enhancements {
            check_for_enhancement_needs(snapshot)
        } else {
            Vec::new()
        }
    }

    /// One bounded generation call. Failures are logged here and never retried.
    async fn call(
        &self,
        step: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        debug!("Generation step '{}' ({} max tokens)", step, max_tokens);

        let result =
            match tokio::time::timeout(self.settings.timeout, self.generator.generate(prompt, max_tokens))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout(self.settings.timeout.as_secs())),
            };

        if let Err(ref e) = result {
            warn!("Generation step '{}' failed: {}", step, e);
        }
        result
    }
}
