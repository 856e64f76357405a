use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::ingest::{IngestRequest, IngestionMeta, IngestionOutcome, Ingestor};
use crate::rewrite::{Rewriter, RewriterFactory, common::effective_instruction};
use crate::sources::{Source, SourceLoader};
use crate::youtube::{
    MetadataProbe, MetadataProber, ProbePolicy, TrackDescriptor, VideoIdentity, VideoMetadata, VideoPlatform,
    VideoPlatformFactory,
};

/// Result of a rewrite run.
#[derive(Debug, Clone, Serialize)]
pub struct RewriteOutcome {
    pub instruction: String,
    pub source_text: String,
    pub rewritten: String,
    /// Present when the source was a video
    pub ingestion: Option<IngestionMeta>,
}

pub struct Workflow {
    config: Config,
    platform: Arc<dyn VideoPlatform>,
    prober: MetadataProber,
    ingestor: Arc<Ingestor>,
    loader: SourceLoader,
    rewriter: Option<Arc<dyn Rewriter>>,
}

impl Workflow {
    /// Production wiring: yt-dlp platform and the configured LLM provider.
    /// A provider that cannot be built (missing key) only matters to the
    /// operations that need it.
    pub fn new(config: Config) -> Result<Self> {
        let platform = VideoPlatformFactory::create_default(&config.youtube);
        let rewriter = match RewriterFactory::create(&config.llm) {
            Ok(rewriter) => Some(rewriter),
            Err(e) => {
                warn!("LLM provider unavailable, summarize and rewrite are disabled: {}", e);
                None
            }
        };
        Self::with_components(config, platform, rewriter)
    }

    pub fn with_components(
        config: Config,
        platform: Arc<dyn VideoPlatform>,
        rewriter: Option<Arc<dyn Rewriter>>,
    ) -> Result<Self> {
        let ingestor = Arc::new(Ingestor::from_config(&config, platform.clone(), rewriter.clone()));
        let loader = SourceLoader::new(&config.extract, Some(ingestor.clone()))?;
        let prober = MetadataProber::new(platform.clone(), ProbePolicy::from_config(&config.youtube));

        Ok(Self {
            config,
            platform,
            prober,
            ingestor,
            loader,
            rewriter,
        })
    }

    /// Run the YouTube ingestion pipeline
    pub async fn ingest(&self, request: &IngestRequest) -> Result<IngestionOutcome> {
        self.ingestor.ingest(request).await
    }

    /// Load `source` and rewrite it following `instruction`
    pub async fn rewrite(&self, source: &Source, instruction: Option<&str>) -> Result<RewriteOutcome> {
        let rewriter = match &self.rewriter {
            Some(rewriter) => rewriter.clone(),
            None => RewriterFactory::create(&self.config.llm)?,
        };
        rewriter.check_availability().await?;

        let loaded = self.loader.load(source).await?;
        let instruction = effective_instruction(instruction.unwrap_or_default()).to_string();
        info!(
            "Rewriting {} chars with {:?}/{}",
            loaded.text.chars().count(),
            self.config.llm.provider,
            self.config.llm.model
        );

        let rewritten = rewriter.rewrite(&instruction, &loaded.text).await?;
        Ok(RewriteOutcome {
            instruction,
            source_text: loaded.text,
            rewritten,
            ingestion: loaded.ingestion,
        })
    }

    /// Validate a video URL and list its caption tracks
    pub async fn captions(&self, url: &str) -> Result<(VideoIdentity, Vec<TrackDescriptor>)> {
        let identity = self.ingestor.validator().validate(url)?;
        let tracks = self.platform.list_caption_tracks(&identity.video_id).await?;
        info!("Video {} has {} caption tracks", identity.video_id, tracks.len());
        Ok((identity, tracks))
    }

    /// Validate a video URL and probe its metadata
    pub async fn probe(&self, url: &str) -> Result<VideoMetadata> {
        self.ingestor.validator().validate(url)?;
        self.prober.probe(url).await
    }
}
