use anyhow::Result;
use futures::future;
use wisun_collector::collector::Collector;
use wisun_collector::config::Config;
use wisun_collector::journal::Journal;
use wisun_collector::publish::ThingSpeakPublisher;
use wisun_collector::runner::Runner;
use wisun_collector::transport::CommandTransport;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,wisun_collector=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => {
            tracing::warn!(error=%err, "failed to listen for ctrl-c; running until killed");
            future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing()?;

    let transport = CommandTransport::from_config(&config);
    let publisher = ThingSpeakPublisher::from_config(&config)?;
    let journal = config.csv_path.clone().map(Journal::new);

    tracing::info!(
        node=%config.coap_base_uri(),
        client=%config.coap_client,
        update_url=%config.update_url,
        interval_secs=config.poll_interval.as_secs(),
        journal=?config.csv_path,
        "wisun-collector starting"
    );
    if let Some(timeout) = config.fetch_timeout {
        tracing::info!(timeout_secs = timeout.as_secs(), "CoAP requests are time-bounded");
    }

    let runner = Runner::new(Collector::new(transport), publisher, config.poll_interval)
        .with_journal(journal);
    let completed = runner.run_until(shutdown_signal()).await;
    tracing::info!(completed, "wisun-collector stopped");

    Ok(())
}
