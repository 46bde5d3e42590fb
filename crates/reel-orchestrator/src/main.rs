//! Command-line story generation.
//!
//! Usage: `reel-generate <prompt...>`. Style, duration, aspect ratio and owner
//! come from `REEL_STYLE`, `REEL_DURATION`, `REEL_ASPECT_RATIO` and
//! `REEL_OWNER_ID`.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_api_client::{JobService, StoryApiClient};
use reel_library::{
    FirestoreClient, FirestoreConfig, FirestoreVideoLibrary, MemoryVideoLibrary, VideoLibrary,
};
use reel_models::{AspectRatio, GenerationRequest, StoryDuration, VisualStyle};
use reel_orchestrator::{GenerationOrchestrator, OrchestratorConfig};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing()?;

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let request = request_from_env(prompt)?;
    let owner_id = std::env::var("REEL_OWNER_ID").unwrap_or_else(|_| "local".to_string());

    let config = OrchestratorConfig::from_env();
    info!(
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        result_base_url = %config.result_base_url,
        "Starting reel-generate"
    );

    let service: Arc<dyn JobService> =
        Arc::new(StoryApiClient::from_env().context("failed to create story API client")?);
    let library = build_library().await?;

    let orchestrator = Arc::new(GenerationOrchestrator::new(config, service, library)?);

    let mut updates = orchestrator.subscribe();
    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            info!(
                status = %state.status,
                progress = state.progress,
                phase = %state.phase,
                scene = state.current_scene_index + 1,
                scenes = state.scenes.len(),
                "{}",
                state.phase.label()
            );
        }
    });

    let canceller = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received interrupt, cancelling generation");
                if !orchestrator.cancel_generation().await {
                    warn!("Cancellation did not take effect");
                }
            }
        })
    };

    let result = orchestrator.start_generation(&owner_id, request).await;
    canceller.abort();
    watcher.abort();

    let completed = result.context("generation did not complete")?;
    info!(job_id = %completed.job_id, "Story ready");
    match completed.result_url {
        Some(url) => println!("{}", url),
        None => bail!("job {} completed without a result URL", completed.job_id),
    }

    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn,reel=info"))
        .context("invalid log filter")?;

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    Ok(())
}

fn request_from_env(prompt: String) -> anyhow::Result<GenerationRequest> {
    let mut request = GenerationRequest::new(prompt);

    if let Ok(style) = std::env::var("REEL_STYLE") {
        request = request.with_style(
            style
                .parse::<VisualStyle>()
                .map_err(|e| anyhow!("REEL_STYLE: {}", e))?,
        );
    }
    if let Ok(duration) = std::env::var("REEL_DURATION") {
        request = request.with_duration(
            duration
                .parse::<StoryDuration>()
                .map_err(|e| anyhow!("REEL_DURATION: {}", e))?,
        );
    }
    if let Ok(ratio) = std::env::var("REEL_ASPECT_RATIO") {
        request = request.with_aspect_ratio(
            ratio
                .parse::<AspectRatio>()
                .map_err(|e| anyhow!("REEL_ASPECT_RATIO: {}", e))?,
        );
    }

    Ok(request)
}

/// Firestore when a project is configured, otherwise an in-process library.
async fn build_library() -> anyhow::Result<Arc<dyn VideoLibrary>> {
    match FirestoreConfig::from_env() {
        Ok(config) => {
            info!(project_id = %config.project_id, "Using Firestore video library");
            let client = FirestoreClient::new(config)
                .await
                .context("failed to create Firestore client")?;
            Ok(Arc::new(FirestoreVideoLibrary::new(client)))
        }
        Err(e) => {
            warn!("Firestore not configured ({}), using in-memory library", e);
            Ok(Arc::new(MemoryVideoLibrary::new()))
        }
    }
}
