// Command line front end for copy analysis.
//
// `analyze` runs the full pipeline and prints the outcome as JSON,
// `preview` checks a URL and prints its title.

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use clap::{Parser, Subcommand};
use copy_critic::{
    AnalysisRequest, CopyAnalyzer, OpenAiChatModel, UserImage, WebsiteRequest, load_yaml_config,
    preview_url,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "copy-critic")]
#[command(about = "Scores marketing copy, images and landing pages with a language model")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze copy text, images and websites
    Analyze {
        /// Copy text to analyze
        #[arg(long, conflicts_with = "copy_file")]
        copy: Option<String>,

        /// Read the copy text from a file
        #[arg(long)]
        copy_file: Option<PathBuf>,

        /// Website to include (repeatable)
        #[arg(long = "url")]
        urls: Vec<String>,

        /// Image file to include (repeatable)
        #[arg(long = "image")]
        images: Vec<PathBuf>,

        /// Skip website screenshots
        #[arg(long)]
        no_screenshots: bool,
    },

    /// Check that a URL is reachable and print its title
    Preview { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("copy_critic=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Analyze {
            copy,
            copy_file,
            urls,
            images,
            no_screenshots,
        } => {
            let copy_text = match copy_file {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read copy from {}", path.display()))?,
                ),
                None => copy,
            };

            let request = AnalysisRequest {
                copy_text,
                user_images: images
                    .iter()
                    .map(|path| load_image(path))
                    .collect::<Result<_>>()?,
                website_requests: urls.into_iter().map(WebsiteRequest::new).collect(),
            };

            let mut config = load_yaml_config().context("Failed to load config.yaml")?;
            if no_screenshots {
                config.browser.enabled = false;
            }

            let model = OpenAiChatModel::from_env(&config.model)?;
            let analyzer = CopyAnalyzer::from_config(&config, Arc::new(model))?;

            let outcome = analyzer.run(request).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Preview { url } => {
            info!(url = %url, "Previewing URL");
            let preview = preview_url(&url).await?;
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
    }

    Ok(())
}

fn load_image(path: &Path) -> Result<UserImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;

    let mime_type = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };

    Ok(UserImage {
        name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        data: BASE64.encode(bytes),
        mime_type: Some(mime_type.to_string()),
    })
}
