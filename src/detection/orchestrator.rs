//! Detection Orchestrator
//!
//! One run per request:
//!
//! ```text
//!   extract ──err(video)──────────────────────────────► Analysis Error
//!      │
//!      ▼
//!   provider A ─► provider B ──none, err(audio)───────► Analysis Error
//!      │              │
//!      │              ▼
//!      │          local heuristic (audio) ─► simulation
//!      ▼
//!   first verdict wins ──► append LogEntry ──► caller
//! ```
//!
//! The whole run, log append included, is a detached task: a caller that
//! goes away does not cancel it. The walk itself runs in a nested task, so
//! if it panics, or the log append fails, the caller receives the fixed safe
//! verdict instead of an error.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::extract::FeatureExtractor;
use super::features::{ExtractError, FeatureMap};
use super::heuristic::AudioHeuristicModel;
use super::providers::{Provider, ProviderInput, ProviderSet};
use super::simulation;
use super::verdict::{DetectionRequest, MediaType, Verdict};
use crate::models::LogEntry;
use crate::store::Store;

// ============================================================================
// STRATEGIES
// ============================================================================

/// Everything a strategy may look at
#[derive(Debug)]
pub struct DetectionContext {
    pub request: DetectionRequest,
    pub features: FeatureMap,
}

impl DetectionContext {
    /// What file-based providers receive: the derived frame if any, else the upload
    fn submission(&self) -> Option<&Path> {
        self.features
            .derived_media()
            .or(self.request.file_path.as_deref())
    }
}

/// One link of a fallback chain. `None` means "no answer, try the next one".
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, ctx: &DetectionContext) -> Option<Verdict>;
}

/// A remote provider adapter as a chain link
pub struct ProviderStep {
    provider: Arc<dyn Provider>,
}

impl ProviderStep {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Strategy for ProviderStep {
    fn name(&self) -> &'static str {
        self.provider.name()
    }

    async fn attempt(&self, ctx: &DetectionContext) -> Option<Verdict> {
        let input = match ctx.request.media_type {
            MediaType::Text => ProviderInput::Text(&ctx.request.input_data),
            _ => ProviderInput::File(ctx.submission()?),
        };
        self.provider.invoke(input).await
    }
}

/// Rule-based audio model over the extracted features
#[derive(Default)]
pub struct LocalHeuristicStep {
    model: AudioHeuristicModel,
}

#[async_trait]
impl Strategy for LocalHeuristicStep {
    fn name(&self) -> &'static str {
        "local_heuristic"
    }

    async fn attempt(&self, ctx: &DetectionContext) -> Option<Verdict> {
        let analysis = self.model.analyze(&ctx.features);
        tracing::debug!(
            result = %analysis.result,
            fake_probability = analysis.fake_probability,
            reason = %analysis.reason,
            details = ?analysis.details,
            "Local heuristic analysis"
        );
        Some(analysis.verdict())
    }
}

/// Deterministic last resort; always answers
pub struct SimulationStep;

#[async_trait]
impl Strategy for SimulationStep {
    fn name(&self) -> &'static str {
        "simulation"
    }

    async fn attempt(&self, ctx: &DetectionContext) -> Option<Verdict> {
        let seed = simulation::seed_for(&ctx.request).await;
        Some(simulation::simulate(&seed))
    }
}

// ============================================================================
// CHAINS
// ============================================================================

fn step(provider: Arc<dyn Provider>) -> Arc<dyn Strategy> {
    Arc::new(ProviderStep::new(provider))
}

/// Ordered strategies for one media type
#[derive(Clone, Default)]
pub struct Chain {
    /// Remote providers, tried even when audio extraction failed
    pub providers: Vec<Arc<dyn Strategy>>,
    /// Local model and simulation, only reached with usable features
    pub fallbacks: Vec<Arc<dyn Strategy>>,
}

#[derive(Clone)]
pub struct Chains {
    pub video: Arc<Chain>,
    pub audio: Arc<Chain>,
    pub text: Arc<Chain>,
    pub image: Arc<Chain>,
}

impl Chains {
    /// Production wiring:
    /// video/image: Sightengine → HF image; audio: ElevenLabs → HF audio →
    /// local heuristic; text: Grok → HF text ensemble; all end in simulation.
    pub fn standard(providers: ProviderSet) -> Self {
        let ProviderSet {
            sightengine,
            hf_image,
            elevenlabs,
            hf_audio,
            grok,
            hf_text,
        } = providers;

        let simulation: Arc<dyn Strategy> = Arc::new(SimulationStep);

        let visual = Arc::new(Chain {
            providers: vec![step(Arc::new(sightengine)), step(Arc::new(hf_image))],
            fallbacks: vec![simulation.clone()],
        });

        let audio = Arc::new(Chain {
            providers: vec![step(Arc::new(elevenlabs)), step(Arc::new(hf_audio))],
            fallbacks: vec![
                Arc::new(LocalHeuristicStep::default()) as Arc<dyn Strategy>,
                simulation.clone(),
            ],
        });

        let text = Arc::new(Chain {
            providers: vec![step(Arc::new(grok)), step(Arc::new(hf_text))],
            fallbacks: vec![simulation],
        });

        Self {
            video: visual.clone(),
            audio,
            text,
            image: visual,
        }
    }

    fn for_media(&self, media: MediaType) -> Arc<Chain> {
        match media {
            MediaType::Video => self.video.clone(),
            MediaType::Audio => self.audio.clone(),
            MediaType::Text => self.text.clone(),
            MediaType::Image => self.image.clone(),
        }
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// Final verdict plus the link that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub verdict: Verdict,
    pub source: &'static str,
}

impl Resolution {
    fn extraction_failed(err: &ExtractError) -> Self {
        Self {
            verdict: Verdict::analysis_error(&err.to_string()),
            source: "extraction",
        }
    }
}

pub struct Orchestrator {
    extractor: Arc<dyn FeatureExtractor>,
    chains: Chains,
    store: Arc<dyn Store>,
}

impl Orchestrator {
    pub fn new(providers: ProviderSet, extractor: Arc<dyn FeatureExtractor>, store: Arc<dyn Store>) -> Self {
        Self::with_chains(Chains::standard(providers), extractor, store)
    }

    pub fn with_chains(chains: Chains, extractor: Arc<dyn FeatureExtractor>, store: Arc<dyn Store>) -> Self {
        Self {
            extractor,
            chains,
            store,
        }
    }

    /// Run the chain for `request`, log the outcome once and return it.
    /// Never fails. The run is detached from the caller, so a dropped request
    /// still finishes its walk and its log append.
    pub async fn detect(&self, request: DetectionRequest) -> Verdict {
        let chain = self.chains.for_media(request.media_type);
        let run = run(self.extractor.clone(), chain, self.store.clone(), request);

        match tokio::spawn(run).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::error!("Detection run failed: {}", e);
                Verdict::safe_fallback()
            }
        }
    }
}

/// Walk in a task of its own, then record whatever came out of it
async fn run(
    extractor: Arc<dyn FeatureExtractor>,
    chain: Arc<Chain>,
    store: Arc<dyn Store>,
    request: DetectionRequest,
) -> Verdict {
    let media = request.media_type;

    let verdict = match tokio::spawn(walk(extractor, chain, request.clone())).await {
        Ok(resolution) => {
            tracing::info!(
                %media,
                source = resolution.source,
                result = %resolution.verdict.result,
                confidence = resolution.verdict.confidence,
                "Detection resolved"
            );
            resolution.verdict
        }
        Err(e) => {
            tracing::error!(%media, "Detection walk failed: {}", e);
            Verdict::safe_fallback()
        }
    };

    match store.append_log(LogEntry::new(&request, &verdict)).await {
        Ok(_) => verdict,
        Err(e) => {
            tracing::error!("Failed to record detection: {}", e);
            Verdict::safe_fallback()
        }
    }
}

async fn walk(
    extractor: Arc<dyn FeatureExtractor>,
    chain: Arc<Chain>,
    request: DetectionRequest,
) -> Resolution {
    let media = request.media_type;
    let extracted = extractor.extract(&request).await;

    let (features, extraction_error) = match extracted {
        Ok(features) => (features, None),
        Err(err) if media == MediaType::Video => return Resolution::extraction_failed(&err),
        Err(err) => {
            tracing::warn!(%media, "Feature extraction failed: {}", err);
            (FeatureMap::new(), Some(err))
        }
    };

    let ctx = DetectionContext { request, features };

    for strategy in &chain.providers {
        if let Some(verdict) = strategy.attempt(&ctx).await {
            return Resolution {
                verdict,
                source: strategy.name(),
            };
        }
    }

    if let Some(err) = extraction_error {
        return Resolution::extraction_failed(&err);
    }

    for strategy in &chain.fallbacks {
        if let Some(verdict) = strategy.attempt(&ctx).await {
            return Resolution {
                verdict,
                source: strategy.name(),
            };
        }
    }

    tracing::warn!(%media, "Every strategy declined");
    Resolution {
        verdict: Verdict::safe_fallback(),
        source: "safe_fallback",
    }
}
