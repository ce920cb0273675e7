//! Wired services behind the CLI commands.
//!
//! One `App` owns one in-memory registry. One-shot commands build a fresh
//! `App` per process; the shell keeps a single one alive for the session.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapters::{CredentialGate, EnvCredentialGate, GeminiClient};
use crate::config::{self, ResolvedConfig};
use crate::core::{
    confirmation, default_poster_prompt, BlobStore, CommitReceipt, CommitRequest,
    EngagementCounter, GenerationOrchestrator, MediaKind, PromptLibrary, SlotRegistry, Studio,
    UploadCommitPipeline,
};
use crate::domain::{Asset, Category, GenerationRequest, JobState, ReferenceImage};

/// Where a generation's reference image comes from
#[derive(Debug, Clone)]
pub enum ReferenceSource {
    /// Image file on disk
    File(std::path::PathBuf),

    /// The category's current poster
    CurrentPoster(Category),
}

/// Registry, pipelines and providers for one process
pub struct App {
    pub registry: Arc<SlotRegistry>,
    pub blobs: BlobStore,
    pub commits: UploadCommitPipeline,
    pub engagement: EngagementCounter,
    pub orchestrator: GenerationOrchestrator,
    pub studio: Studio,
    pub prompts: PromptLibrary,
}

impl App {
    /// Build everything from the resolved configuration
    pub async fn from_config(cfg: &ResolvedConfig) -> Result<Self> {
        let seed = match cfg.seed {
            Some(ref path) => config::read_seed(path)?,
            None => Vec::new(),
        };
        let registry = Arc::new(
            SlotRegistry::with_seed(cfg.version_policy, seed).context("Invalid registry seed")?,
        );
        let blobs = BlobStore::open(&cfg.blobs).await?;

        let client = Arc::new(GeminiClient::new(cfg.provider.clone()));
        let credentials: Arc<dyn CredentialGate> =
            Arc::new(EnvCredentialGate::new(cfg.api_key_env.clone()));

        info!(
            policy = ?cfg.version_policy,
            blobs = %cfg.blobs.display(),
            "Slot registry ready"
        );

        Ok(Self {
            commits: UploadCommitPipeline::new(registry.clone()),
            engagement: EngagementCounter::new(registry.clone()),
            orchestrator: GenerationOrchestrator::new(
                client.clone(),
                credentials.clone(),
                blobs.clone(),
                cfg.limits.clone(),
            ),
            studio: Studio::new(client, credentials, blobs.clone()),
            prompts: PromptLibrary::default(),
            registry,
            blobs,
        })
    }

    /// Print every slot with its current occupant
    pub async fn list_slots(&self) -> Result<()> {
        println!(
            "{:<22} {:<10} {:<4} {:<7} {:<30} {}",
            "CATEGORY", "ID", "VER", "VIEWS", "SHOWN AT", "LOCATOR"
        );
        println!("{}", "-".repeat(100));

        for category in Category::ALL {
            let exposure = category.exposure();
            let shown_at = format!("{} ({})", exposure.label, exposure.path);
            match self.registry.current_for(category).await {
                Some(asset) => println!(
                    "{:<22} {:<10} {:<4} {:<7} {:<30} {}",
                    category.label(),
                    asset.id,
                    asset.version,
                    asset.play_count,
                    shown_at,
                    asset.locator
                ),
                None => println!(
                    "{:<22} {:<10} {:<4} {:<7} {:<30} {}",
                    category.label(),
                    "-",
                    "-",
                    "-",
                    shown_at,
                    "(empty)"
                ),
            }
        }

        Ok(())
    }

    /// Stage local files and commit them
    pub async fn upload(
        &self,
        category: Category,
        video: &Path,
        poster: Option<&Path>,
        description: Option<String>,
        draft: bool,
    ) -> Result<Asset> {
        let locator = self.blobs.stage_file(video, MediaKind::Video).await?;

        let mut request = CommitRequest::new(category, locator);
        if let Some(poster) = poster {
            request = request.with_poster(self.blobs.stage_file(poster, MediaKind::Poster).await?);
        }
        match description {
            Some(text) => request = request.with_description(text),
            None if draft => {
                let drafted = self.studio.draft_description(category).await;
                if drafted.is_empty() {
                    eprintln!("AI description failed. Enter one manually.");
                } else {
                    request = request.with_description(drafted);
                }
            }
            None => {}
        }

        let asset = self.commits.commit(request).await?;
        println!("{}", CommitReceipt::from(&asset).message);
        Ok(asset)
    }

    /// Delete a category's current asset
    pub async fn remove(&self, category: Category) -> Result<()> {
        let asset = self
            .registry
            .current_for(category)
            .await
            .with_context(|| format!("No asset in slot '{}'", category))?;

        self.registry.remove(&asset.id).await;
        println!("Removed {} (v{}) from {}", asset.id, asset.version, category);
        Ok(())
    }

    /// Record a playback start for the category's current asset
    pub async fn play(&self, category: Category) -> Result<()> {
        let asset = self
            .registry
            .current_for(category)
            .await
            .with_context(|| format!("No asset in slot '{}'", category))?;

        self.engagement.record_play(&asset.id).await;
        let source = self
            .blobs
            .resolve(&asset.locator)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| asset.locator.clone());
        println!("Playing {}: {}", asset.title, source);
        Ok(())
    }

    /// Run a generation job, optionally committing the result
    pub async fn generate(
        &self,
        prompt: String,
        reference: Option<ReferenceSource>,
        commit_to: Option<Category>,
    ) -> Result<()> {
        let mut request = GenerationRequest::new(prompt);
        if let Some(source) = reference {
            request = request.with_reference(self.reference_image(&source).await?);
        }

        let cancel = CancellationToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };
        let mut status = self.orchestrator.subscribe();
        let printer = tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let snapshot = status.borrow_and_update().clone();
                if !matches!(snapshot.state, JobState::Completed | JobState::Failed) {
                    eprintln!("{}", snapshot.status_message);
                }
            }
        });

        let result = self.orchestrator.start(request, cancel).await;
        interrupt.abort();
        printer.abort();

        let job = match result {
            Ok(job) => job,
            Err(e) => {
                eprintln!("{}", e.status_message());
                return Err(e.into());
            }
        };
        let locator = job
            .result_locator
            .context("Completed job carried no result")?;
        println!("Generated video: {}", locator);

        if let Some(category) = commit_to {
            let asset = self
                .commits
                .commit(CommitRequest::new(category, locator))
                .await?;
            println!("{}", confirmation(&asset));
        }

        Ok(())
    }

    /// Draft and print a description for a category
    pub async fn describe(&self, category: Category) -> Result<()> {
        let text = self.studio.draft_description(category).await;
        if text.is_empty() {
            anyhow::bail!("AI description failed. Enter one manually.");
        }
        println!("{}", text);
        Ok(())
    }

    /// Render a poster for a category and print its locator
    pub async fn poster(&self, category: Category, prompt: Option<String>) -> Result<String> {
        let prompt = prompt.unwrap_or_else(|| default_poster_prompt(category));
        let locator = self.studio.render_poster(&prompt).await?;
        println!("Poster staged: {}", locator);
        Ok(locator)
    }

    /// Print the engagement report
    pub async fn stats(&self) -> Result<()> {
        let rows = self.engagement.report().await;
        if rows.is_empty() {
            println!("No assets");
            return Ok(());
        }

        println!("{:<8} {:<34} {:>8}", "NAME", "TITLE", "VIEWS");
        println!("{}", "-".repeat(52));
        for row in rows {
            println!("{:<8} {:<34} {:>8}", row.name, row.title, row.views);
        }
        Ok(())
    }

    async fn reference_image(&self, source: &ReferenceSource) -> Result<Option<ReferenceImage>> {
        match source {
            ReferenceSource::File(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read reference image: {}", path.display()))?;
                let extension = path
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_default();
                Ok(Some(ReferenceImage::from_extension(bytes, &extension)))
            }
            ReferenceSource::CurrentPoster(category) => {
                let poster = self
                    .registry
                    .current_for(*category)
                    .await
                    .and_then(|asset| asset.poster_locator);
                let Some(locator) = poster else {
                    return Ok(None);
                };
                if self.blobs.resolve(&locator).is_none() {
                    return Ok(None);
                }

                let bytes = self.blobs.load(&locator).await?;
                let extension =
                    crate::core::blob_store::locator_extension(&locator).unwrap_or_default();
                Ok(Some(ReferenceImage::from_extension(bytes, &extension)))
            }
        }
    }
}
