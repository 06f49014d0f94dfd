use anyhow::{bail, Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use insight_client::{GeminiClient, GeminiSettings};
use insight_core::render::render_status;
use insight_core::{upload, Phase};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod actions;
mod config;
mod engine;
mod interactive;

use actions::ResultActions;
use config::Config;
use engine::EngineError;

#[derive(Parser)]
#[command(name = "face-insight", about = "AI face analysis for a single photo", version)]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/face-insight/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one photo and print the result
    Analyze {
        /// Image file to analyze
        path: String,
        /// Declared MIME type, overriding the file extension
        #[arg(long)]
        mime: Option<String>,
        /// Copy the result to the clipboard
        #[arg(long)]
        copy: bool,
        /// Share the result through the host share command
        #[arg(long)]
        share: bool,
        /// Share the result to KakaoTalk
        #[arg(long)]
        kakao: bool,
        /// Save the result as ai_face_analysis.txt
        #[arg(long)]
        download: bool,
    },
    /// Interactive session: upload, reset and act on results
    Interactive,
    /// Show which result actions this host supports
    Capabilities,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    tracing::debug!(model = %config.model, base_url = %config.api_base_url, "configuration loaded");

    let analyzer = GeminiClient::new(GeminiSettings {
        api_key: config.api_key.clone(),
        model: config.model.clone(),
        base_url: config.api_base_url.clone(),
        timeout: config.request_timeout(),
    })
    .context("creating Gemini client")?;
    let actions = ResultActions::detect(&config);

    match cli.command {
        Commands::Analyze {
            path,
            mime,
            copy,
            share,
            kakao,
            download,
        } => {
            let engine = engine::spawn_engine(Arc::new(analyzer), config.prompt.clone());
            let image = upload::select(upload::normalize_dropped_path(&path), mime.as_deref());

            let cycle = match engine.upload(image).await {
                Ok(cycle) => cycle,
                Err(EngineError::Upload(err)) => bail!("{err}"),
                Err(err) => return Err(err.into()),
            };
            if let Some(loading) = engine.loading(cycle).await {
                print!("{}", render_status(&loading, &actions.capabilities()));
            }
            let status = engine.settled(cycle).await;
            if status.phase() == Phase::Error {
                bail!("{}", status.error_message().unwrap_or_default());
            }
            print!("{}", render_status(&status, &actions.capabilities()));

            let Some(result) = status.result() else {
                return Ok(());
            };
            let text = result.text.as_str();

            if copy {
                actions.copy(text).await?;
                println!("copied!");
                // Keep the clipboard owner alive for the acknowledgment window.
                let mut copied = actions.copy_ack().subscribe();
                while *copied.borrow_and_update() {
                    if copied.changed().await.is_err() {
                        break;
                    }
                }
            }
            if share && actions.share(text).await? {
                println!("shared");
            }
            if kakao {
                actions.chat_share(text).await?;
                println!("sent to KakaoTalk");
            }
            if download {
                let saved = actions.download(text)?;
                println!("saved {}", saved.display());
            }
        }
        Commands::Interactive => {
            println!("AI 얼굴 분석기 (© {} AI Face Analyzer)", chrono::Local::now().year());
            let engine = engine::spawn_engine(Arc::new(analyzer), config.prompt.clone());
            interactive::run(engine, actions).await?;
        }
        Commands::Capabilities => {
            let caps = actions.capabilities();
            println!(
                "{}",
                serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "model": config.model,
                    "api_key_configured": config.api_key.is_some(),
                    "clipboard": caps.clipboard,
                    "native_share": caps.native_share,
                    "chat_share": caps.chat_share,
                    "download_dir": config.download_dir.display().to_string(),
                })
            );
        }
    }

    Ok(())
}
