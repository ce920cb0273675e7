//! Studio assistance: descriptions, posters and prompt ideas.
//!
//! Everything here is optional polish around a commit. Description drafting
//! never fails (it degrades to an empty string); poster rendering reports
//! errors so the caller can retry.

use std::sync::Arc;

use rand::seq::IndexedRandom;
use tracing::{info, instrument, warn};

use crate::adapters::{CredentialGate, StudioProvider};
use crate::domain::Category;

use super::blob_store::BlobStore;
use super::generation::GenerationError;

/// Ideas offered by [`random_prompt`]
pub const VIDEO_IDEAS: [&str; 7] = [
    "A futuristic classroom with holograms floating in the air, cinematic lighting, 4k",
    "A drone shot of a futuristic school campus with solar panels and green roofs",
    "Close up of a student using a transparent tablet with glowing data visualizations",
    "Abstract visualization of neural networks connecting global knowledge nodes",
    "Cyberpunk city street with neon lights reflecting on wet pavement, detailed texture",
    "Time-lapse of a flower blooming in a digital garden, particles floating",
    "A robot teacher explaining mathematics to children in a bright, modern room",
];

const DEFAULT_SAVED_PROMPTS: [&str; 2] = [
    "Futuristic AI education environment, blue and white theme, 3d render, high tech",
    "Abstract network connections, data flow, dark background, professional, corporate style",
];

/// Pick one of the built-in video ideas
pub fn random_prompt() -> &'static str {
    VIDEO_IDEAS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(VIDEO_IDEAS[0])
}

/// Poster prompt suggested for a category
pub fn default_poster_prompt(category: Category) -> String {
    format!(
        "A futuristic, high-tech, abstract background image suitable for a video thumbnail about {}.\n\
         Keywords: AI, Education, Data, Blue and Dark Navy Color Palette, Minimalist, Corporate, Professional.\n\
         Style: 3D render, digital art, high resolution, glowing lines, connectivity.\n\
         No text.",
        category.label()
    )
}

fn description_prompt(category: Category) -> String {
    format!(
        "Write a short, professional video description (1 sentence) for a corporate AI video about {}. \
         Tone: Innovative, Trustworthy.",
        category.label()
    )
}

/// Saved poster prompts, trimmed and free of duplicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptLibrary {
    prompts: Vec<String>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self {
            prompts: DEFAULT_SAVED_PROMPTS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl PromptLibrary {
    /// Save a prompt; returns false for blanks and duplicates
    pub fn save(&mut self, prompt: &str) -> bool {
        let prompt = prompt.trim();
        if prompt.is_empty() || self.prompts.iter().any(|p| p == prompt) {
            return false;
        }
        self.prompts.push(prompt.to_string());
        true
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.prompts.get(index).map(String::as_str)
    }
}

/// Text and image helpers backed by a studio provider
pub struct Studio {
    provider: Arc<dyn StudioProvider>,
    credentials: Arc<dyn CredentialGate>,
    blobs: BlobStore,
}

impl Studio {
    pub fn new(
        provider: Arc<dyn StudioProvider>,
        credentials: Arc<dyn CredentialGate>,
        blobs: BlobStore,
    ) -> Self {
        Self {
            provider,
            credentials,
            blobs,
        }
    }

    /// Draft a one-sentence description; empty on any failure
    #[instrument(skip(self), fields(category = %category))]
    pub async fn draft_description(&self, category: Category) -> String {
        let credential = match self.credentials.credential().await {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "No credential for description drafting");
                return String::new();
            }
        };

        match self
            .provider
            .write_text(&description_prompt(category), &credential)
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "Description drafting failed; enter one manually");
                String::new()
            }
        }
    }

    /// Render a poster image and stage it; returns its blob locator
    #[instrument(skip(self, prompt))]
    pub async fn render_poster(&self, prompt: &str) -> Result<String, GenerationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::Validation(
                "a prompt is required to render a poster".to_string(),
            ));
        }

        let credential = self
            .credentials
            .credential()
            .await
            .map_err(GenerationError::Credential)?;
        let image = self
            .provider
            .render_image(prompt, &credential)
            .await
            .map_err(GenerationError::Provider)?
            .filter(|bytes| !bytes.is_empty())
            .ok_or(GenerationError::EmptyResult)?;

        let locator = self
            .blobs
            .put(&image, "png")
            .await
            .map_err(|e| GenerationError::Storage(format!("{:#}", e)))?;
        info!(%locator, bytes = image.len(), "Poster rendered");
        Ok(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{Credential, ProviderError, ProviderErrorKind};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FixedGate;

    #[async_trait]
    impl CredentialGate for FixedGate {
        async fn has_credential(&self) -> Result<bool, ProviderError> {
            Ok(true)
        }
        async fn select_credential(&self) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn credential(&self) -> Result<Credential, ProviderError> {
            Ok(Credential::new("k"))
        }
    }

    struct CannedStudio {
        text: Result<String, ProviderError>,
        image: Option<Vec<u8>>,
    }

    #[async_trait]
    impl StudioProvider for CannedStudio {
        async fn write_text(
            &self,
            _prompt: &str,
            _credential: &Credential,
        ) -> Result<String, ProviderError> {
            self.text.clone()
        }

        async fn render_image(
            &self,
            _prompt: &str,
            _credential: &Credential,
        ) -> Result<Option<Vec<u8>>, ProviderError> {
            Ok(self.image.clone())
        }
    }

    async fn studio(provider: CannedStudio, temp: &TempDir) -> Studio {
        let blobs = BlobStore::open(temp.path()).await.unwrap();
        Studio::new(Arc::new(provider), Arc::new(FixedGate), blobs)
    }

    #[test]
    fn test_prompt_library_trims_and_dedupes() {
        let mut library = PromptLibrary::default();
        assert_eq!(library.prompts().len(), 2);

        assert!(library.save("  neon skyline  "));
        assert!(!library.save("neon skyline"));
        assert!(!library.save("   "));
        assert_eq!(library.get(2), Some("neon skyline"));
    }

    #[test]
    fn test_random_prompt_is_an_idea() {
        assert!(VIDEO_IDEAS.contains(&random_prompt()));
    }

    #[test]
    fn test_default_poster_prompt_names_category() {
        let prompt = default_poster_prompt(Category::Vision);
        assert!(prompt.contains("AX Vision Film"));
        assert!(prompt.ends_with("No text."));
    }

    #[tokio::test]
    async fn test_description_failure_is_empty() {
        let temp = TempDir::new().unwrap();
        let failing = CannedStudio {
            text: Err(ProviderError::new(ProviderErrorKind::Transport, "offline")),
            image: None,
        };

        let studio = studio(failing, &temp).await;
        assert_eq!(studio.draft_description(Category::Brand).await, "");
    }

    #[tokio::test]
    async fn test_poster_without_image_is_empty_result() {
        let temp = TempDir::new().unwrap();
        let provider = CannedStudio {
            text: Ok("unused".to_string()),
            image: None,
        };

        let studio = studio(provider, &temp).await;
        assert_eq!(
            studio.render_poster("city at dusk").await,
            Err(GenerationError::EmptyResult)
        );
        assert!(matches!(
            studio.render_poster("  ").await,
            Err(GenerationError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_poster_is_staged() {
        let temp = TempDir::new().unwrap();
        let provider = CannedStudio {
            text: Ok(" Learning, reconnected. ".to_string()),
            image: Some(vec![0x89, b'P', b'N', b'G']),
        };

        let studio = studio(provider, &temp).await;
        let locator = studio.render_poster("city at dusk").await.unwrap();
        assert!(locator.starts_with("blob:") && locator.ends_with(".png"));
        assert_eq!(
            studio.draft_description(Category::UseCase).await,
            "Learning, reconnected."
        );
    }
}
