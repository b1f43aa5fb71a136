mod app;
mod config;
mod event;
mod gateway;
mod locale;
mod markdown;
mod session;
mod theme;

use anyhow::{anyhow, Context as _};
use app::TutorApp;
use config::TutorConfig;
use eframe::egui;
use gateway::gemini::GeminiClient;
use gateway::{ThinkingBudgets, TutorGateway};
use std::sync::{mpsc, Arc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let config = TutorConfig::from_env().context("invalid configuration")?;
    info!(
        model = %config.model,
        api_base = %config.api_base,
        language = %config.language,
        "tutorlens starting"
    );
    if config.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; tutor replies will fall back to error messages");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("tutorlens-runtime")
        .build()
        .context("failed to build tokio runtime")?;

    let (tx, rx) = mpsc::channel();
    let model = Arc::new(GeminiClient::new(config.api_base.clone(), config.api_key.clone()));
    let gateway = Arc::new(TutorGateway::new(
        model,
        config.model.clone(),
        ThinkingBudgets {
            hint: config.hint_budget,
            analysis: config.analysis_budget,
        },
        config.language.strings(),
    ));

    let app = TutorApp::new(rx, tx, runtime.handle().clone(), gateway, config.language);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 860.0])
            .with_min_inner_size([420.0, 560.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        config.language.strings().app_title,
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(app))),
    )
    .map_err(|err| anyhow!("failed to open window: {err}"))?;

    drop(runtime);
    Ok(())
}
