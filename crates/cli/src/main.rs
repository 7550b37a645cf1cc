mod events;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stickerpack_core::{
    create_planner, load_config, metrics, resolve_config_path, validate_config, Config, Emotion,
    HttpImageGenerator, ImageProcessor, PackExporter, PackOrchestrator, SanitizedConfig,
    StickerStatus,
};

#[derive(Parser)]
#[command(name = "stickerpack", version, about = "Generate captioned chat sticker packs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan, generate and package one sticker pack
    Generate {
        /// Character or subject of the pack
        #[arg(long)]
        topic: String,
        /// Art style applied to every sticker
        #[arg(long)]
        style: String,
        /// Where to write the zip archive
        #[arg(long, default_value = "pack.zip")]
        out: PathBuf,
        /// Config file (overrides STICKERPACK_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Replace a caption after generation, e.g. `--edit 3=收到啦`
        #[arg(long = "edit", value_parser = parse_edit)]
        edits: Vec<(u32, String)>,
        /// Regenerate failed stickers once before exporting
        #[arg(long)]
        retry_failed: bool,
        /// Print Prometheus metrics when done
        #[arg(long)]
        metrics: bool,
    },
    /// List the emotions every pack contains
    Emotions,
}

fn parse_edit(value: &str) -> Result<(u32, String), String> {
    let (id, caption) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ID=CAPTION, got {:?}", value))?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| format!("invalid sticker id {:?}", id))?;
    Ok((id, caption.to_string()))
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Emotions => {
            for (idx, emotion) in Emotion::ALL.iter().enumerate() {
                println!(
                    "{:>2}  {:<12} {}  {}",
                    idx + 1,
                    emotion.key(),
                    emotion.caption(),
                    emotion.intent()
                );
            }
            Ok(())
        }
        Commands::Generate {
            topic,
            style,
            out,
            config,
            edits,
            retry_failed,
            metrics: print_metrics,
        } => {
            let config = read_config(config.as_deref())?;
            generate(config, &topic, &style, &out, &edits, retry_failed).await?;
            if print_metrics {
                print!("{}", metrics::encode_metrics());
            }
            Ok(())
        }
    }
}

fn read_config(explicit: Option<&Path>) -> Result<Config> {
    let config_path = resolve_config_path(explicit);
    let config = if config_path.exists() || explicit.is_some() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        warn!("No config at {:?}, using defaults", config_path);
        Config::default()
    };

    validate_config(&config).context("Configuration validation failed")?;
    let sanitized = serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default();
    info!(config = %sanitized, "Configuration loaded");
    Ok(config)
}

async fn generate(
    config: Config,
    topic: &str,
    style: &str,
    out: &Path,
    edits: &[(u32, String)],
    retry_failed: bool,
) -> Result<()> {
    let planner = create_planner(&config.planner).context("Failed to create planner")?;
    let generator = Arc::new(HttpImageGenerator::new(config.generator.clone()));
    let processor = Arc::new(
        ImageProcessor::from_config(config.processor.clone())
            .context("Failed to create processor (is processor.caption.font_path set?)")?,
    );
    let exporter = PackExporter::new(config.export.clone());

    let orchestrator = PackOrchestrator::new(
        config.orchestrator.clone(),
        planner,
        generator,
        processor,
        exporter,
    );
    let logger = tokio::spawn(events::log_events(orchestrator.subscribe()));

    info!(topic, style, "Generating pack");
    let summary = orchestrator
        .generate_pack(topic, style)
        .await
        .context("Pack generation failed")?;
    info!(
        complete = summary.complete,
        failed = summary.failed,
        "Generation settled"
    );

    for (id, caption) in edits {
        match orchestrator.edit_caption(*id, caption).await {
            Ok(record) if record.status == StickerStatus::Complete => {
                info!(id, caption = %record.caption, "Caption updated")
            }
            Ok(record) => warn!(
                id,
                error = record.error.as_deref().unwrap_or("unknown"),
                "Caption edit did not complete"
            ),
            Err(e) => warn!(id, "Caption edit rejected: {}", e),
        }
    }

    if retry_failed {
        let failed: Vec<u32> = orchestrator
            .records()
            .await
            .iter()
            .filter(|r| r.status == StickerStatus::Error)
            .map(|r| r.id)
            .collect();
        for id in failed {
            match orchestrator.regenerate(id).await {
                Ok(record) => info!(id, status = %record.status, "Retried sticker"),
                Err(e) => warn!(id, "Retry rejected: {}", e),
            }
        }
    }

    let summary = orchestrator.summary().await;
    if summary.complete == 0 {
        logger.abort();
        bail!("No sticker completed; nothing to export");
    }

    let pack = orchestrator.export().await.context("Export failed")?;
    tokio::fs::write(out, &pack.bytes)
        .await
        .with_context(|| format!("Failed to write {:?}", out))?;
    info!(
        path = %out.display(),
        stickers = pack.sticker_count,
        failed = summary.failed,
        "Pack written"
    );

    logger.abort();
    Ok(())
}
