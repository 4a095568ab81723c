mod bootstrap;
mod report;

use anyhow::{Context, Result};
use insight_core::dates::DateNormalizer;
use insight_core::settings::Settings;
use insight_core::time_utils::resolve_timezone_or_utc;
use insight_core::view::MonthView;
use insight_data::reader::{read_source, SourceFormat};
use insight_runtime::dispatcher::{Dispatcher, StrategyPreference};

use crate::report::ProgressLine;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Sales Insight v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "File: {}, Strategy: {}, Timezone: {}",
        settings.file.display(),
        settings.strategy,
        settings.timezone
    );

    let preference: StrategyPreference = settings.strategy.parse()?;
    let normalizer = DateNormalizer::new(resolve_timezone_or_utc(&settings.timezone));
    let format = SourceFormat::from_path(&settings.file);

    // Single scoped read; the file is closed before either path starts.
    let buffer = read_source(&settings.file)?;

    let mut dispatcher = Dispatcher::new(preference, normalizer);
    let mut progress = ProgressLine::new(settings.format == "table");

    let outcome = tokio::select! {
        outcome = dispatcher.run(buffer, format, |msg| progress.observe(msg)) => outcome,
        _ = tokio::signal::ctrl_c() => {
            // A background run keeps going until its job ends; its output is discarded.
            tracing::info!("Ctrl+C received; discarding the run");
            return Ok(());
        }
    };

    if let Some(advisory) = &outcome.advisory {
        tracing::warn!("{}", advisory);
    }
    tracing::info!("Run finished on the {} path", outcome.strategy);

    let result = outcome
        .result
        .with_context(|| format!("failed to analyse {}", settings.file.display()))?;
    if result.is_empty() {
        tracing::warn!("No data rows in {}", settings.file.display());
    }

    let mut view = MonthView::new(&result);
    if let Some(month) = &settings.month {
        if !view.select(month) {
            tracing::warn!("Month {} has no dated invoices; showing the overview", month);
        }
    }
    for action in &settings.nav {
        view.apply(*action);
    }

    let rendered = match settings.format.as_str() {
        "json" => report::render_json(&result, &view)?,
        _ => report::render_table(&result, &view, settings.top),
    };
    print!("{}", rendered);

    Ok(())
}
