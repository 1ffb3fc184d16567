use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prolong_events::NotificationDispatcher;
use prolong_pipeline::PipelineConfig;
use prolong_worker::TriggerSweep;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prolong_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = prolong_db::create_pool(&database_url).await?;
    prolong_db::health_check(&pool).await?;

    let config = PipelineConfig::from_env();
    tracing::info!(
        interval_secs = config.sweep_interval_secs,
        ignore_kind = config.ignore_kind,
        "Trigger sweep worker starting"
    );

    // Email addresses resolve through the host platform; without a
    // directory the dispatcher records notifications and skips delivery.
    let dispatcher = NotificationDispatcher::from_env(pool.clone(), None);
    let sweep = TriggerSweep::new(pool, config, dispatcher);

    let cancel = CancellationToken::new();
    let sweep_cancel = cancel.clone();
    let handle = tokio::spawn(async move { sweep.run(sweep_cancel).await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    cancel.cancel();
    handle.await?;
    Ok(())
}
