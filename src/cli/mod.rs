//! Command-line interface for vidslot.
//!
//! Provides commands for inspecting slots, uploading and removing assets,
//! counting plays, generating videos and posters, and a shell session that
//! keeps one registry alive across commands.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config;
use crate::core::random_prompt;
use crate::domain::Category;

pub mod app;
pub mod shell;

use app::{App, ReferenceSource};

/// vidslot - Versioned media slots with generative video
#[derive(Parser, Debug)]
#[command(name = "vidslot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every slot and its current asset
    Slots,

    /// Upload a local video (and optional poster) into a slot
    Upload {
        /// Slot (brand, use-case, vision)
        category: Category,

        /// Video file (mp4, mov, webm)
        video: PathBuf,

        /// Poster image (png, jpg, jpeg, webp)
        #[arg(short, long)]
        poster: Option<PathBuf>,

        /// Description text
        #[arg(short, long, conflicts_with = "draft")]
        description: Option<String>,

        /// Draft the description with the text model
        #[arg(long)]
        draft: bool,
    },

    /// Delete a slot's current asset
    Remove {
        /// Slot to clear
        category: Category,
    },

    /// Record a playback start for a slot
    Play {
        /// Slot to play
        category: Category,
    },

    /// Generate a video from a text prompt
    Generate {
        /// Prompt text (a random idea is used with --random)
        #[arg(required_unless_present = "random")]
        prompt: Option<String>,

        /// Use a random built-in idea as the prompt
        #[arg(long, conflicts_with = "prompt")]
        random: bool,

        /// Reference image file
        #[arg(long, conflicts_with = "use_poster")]
        reference: Option<PathBuf>,

        /// Use this slot's current poster as the reference image
        #[arg(long)]
        use_poster: Option<Category>,

        /// Commit the generated video into this slot
        #[arg(long)]
        commit: Option<Category>,
    },

    /// Draft a one-sentence description for a slot
    Describe {
        category: Category,
    },

    /// Render a poster image for a slot
    Poster {
        category: Category,

        /// Image prompt (defaults to the slot's template)
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// List saved poster prompts
    Prompts {
        /// Save a new prompt first
        #[arg(short, long)]
        save: Option<String>,

        /// Print a random video idea instead
        #[arg(long)]
        random: bool,
    },

    /// Show views per asset
    Stats,

    /// Show resolved configuration (debug)
    Config,

    /// Interactive session over stdin sharing one registry
    Shell,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        if let Commands::Config = self.command {
            return show_config();
        }

        let cfg = config::config()?;
        let mut app = App::from_config(cfg).await?;

        match self.command {
            Commands::Shell => shell::run(&mut app).await,
            command => dispatch(&mut app, command).await,
        }
    }
}

/// Run one command against a live app
pub(crate) async fn dispatch(app: &mut App, command: Commands) -> Result<()> {
    match command {
        Commands::Slots => app.list_slots().await,
        Commands::Upload {
            category,
            video,
            poster,
            description,
            draft,
        } => app
            .upload(category, &video, poster.as_deref(), description, draft)
            .await
            .map(|_| ()),
        Commands::Remove { category } => app.remove(category).await,
        Commands::Play { category } => app.play(category).await,
        Commands::Generate {
            prompt,
            random,
            reference,
            use_poster,
            commit,
        } => {
            let prompt = match prompt {
                Some(prompt) if !random => prompt,
                _ => {
                    let idea = random_prompt();
                    eprintln!("Prompt: {}", idea);
                    idea.to_string()
                }
            };
            let reference = reference
                .map(ReferenceSource::File)
                .or(use_poster.map(ReferenceSource::CurrentPoster));
            app.generate(prompt, reference, commit).await
        }
        Commands::Describe { category } => app.describe(category).await,
        Commands::Poster { category, prompt } => app.poster(category, prompt).await.map(|_| ()),
        Commands::Prompts { save, random } => {
            if random {
                println!("{}", random_prompt());
                return Ok(());
            }
            if let Some(prompt) = save {
                if !app.prompts.save(&prompt) {
                    eprintln!("Prompt is empty or already saved");
                }
            }
            for (i, prompt) in app.prompts.prompts().iter().enumerate() {
                println!("{:>2}. {}", i + 1, prompt);
            }
            Ok(())
        }
        Commands::Stats => app.stats().await,
        Commands::Config => show_config(),
        Commands::Shell => anyhow::bail!("Already in a shell session"),
    }
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("vidslot configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:  {}", cfg.home.display());
    println!("  Blobs: {}", cfg.blobs.display());
    println!(
        "  Seed:  {}",
        cfg.seed
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!();
    println!("Provider:");
    println!("  Base URL:    {}", cfg.provider.base_url);
    println!("  Video model: {}", cfg.provider.video_model);
    println!("  Text model:  {}", cfg.provider.text_model);
    println!("  Image model: {}", cfg.provider.image_model);
    println!("  API key env: {}", cfg.api_key_env);
    println!(
        "  Output:      {} {} x{}",
        cfg.provider.resolution, cfg.provider.aspect_ratio, cfg.provider.number_of_videos
    );
    println!();
    println!("Generation limits:");
    println!("  Poll interval: {}s", cfg.limits.poll_interval_seconds);
    println!("  Max wait:      {}s", cfg.limits.max_wait_seconds);
    println!("  Max polls:     {}", cfg.limits.max_polls);
    println!();
    println!("Registry:");
    println!("  Version policy: {:?}", cfg.version_policy);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_parse_generate_with_commit() {
        let cli = Cli::try_parse_from([
            "vidslot",
            "generate",
            "a drone shot",
            "--use-poster",
            "brand",
            "--commit",
            "use-case",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate {
                prompt,
                use_poster,
                commit,
                ..
            } => {
                assert_eq!(prompt.as_deref(), Some("a drone shot"));
                assert_eq!(use_poster, Some(Category::Brand));
                assert_eq!(commit, Some(Category::UseCase));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_generate_needs_prompt_or_random() {
        assert_err!(Cli::try_parse_from(["vidslot", "generate"]));
        assert_ok!(Cli::try_parse_from(["vidslot", "generate", "--random"]));
        assert_err!(Cli::try_parse_from([
            "vidslot", "generate", "x", "--reference", "a.png", "--use-poster", "brand"
        ]));
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        assert_err!(Cli::try_parse_from(["vidslot", "play", "sports"]));
        assert_ok!(Cli::try_parse_from(["vidslot", "upload", "Use_Case", "demo.mp4"]));
    }
}
