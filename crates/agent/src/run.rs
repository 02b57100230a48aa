use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::api::{self, PatrolState};
use crate::cli::{Command, Opts};
use crate::config::{load, Settings, StorageBackend};
use crate::configurator::{AnyConfigurator, ConfigMapConfigurator, FileConfigurator};
use crate::patrol::{CardinalityDetector, PatrolLoop};
use crate::prom::PromClient;
use crate::relabel::RuleLifecycle;
use crate::store::SuppressionStore;

pub async fn execute(opts: Opts) -> anyhow::Result<()> {
    let settings = load(opts.config.as_deref()).context("loading settings")?;

    match opts.cmd.unwrap_or(Command::Run) {
        Command::Run => run_daemon(settings).await,
        Command::List => list_suppressions(settings).await,
        Command::Unsilence { target } => unsilence(settings, &target).await,
    }
}

async fn run_daemon(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        prometheus_url = %settings.prometheus_url,
        interval_s = settings.patrol.interval_seconds,
        top_n = settings.patrol.top_n,
        threshold = settings.patrol.threshold,
        "labelguard starting"
    );

    let (scrape, suppression) = configurators(&settings).await?;
    let state = PatrolState::new();
    let lifecycle = build_lifecycle(&settings, scrape, suppression)?;
    let detector = CardinalityDetector::new(prom_client(&settings)?, state.clone(), &settings.patrol);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let patrol = PatrolLoop {
        detector,
        lifecycle,
        interval: Duration::from_secs(settings.patrol.interval_seconds),
        max_consecutive_failures: settings.patrol.max_consecutive_failures,
        state: state.clone(),
    };
    let patrol_handle = tokio::spawn(patrol.run(shutdown_rx));

    let addr = format!("0.0.0.0:{}", settings.api_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding exposition server on {addr}"))?;
    tracing::info!(addr = %addr, "exposition server listening");
    tokio::spawn(async move {
        if let Err(e) = api::serve(listener, state).await {
            tracing::error!(error = %e, "exposition server error");
        }
    });

    crate::shutdown::wait_for_shutdown().await;
    tracing::info!("shutting down");
    let _ = shutdown_tx.send(true);
    let _ = patrol_handle.await;
    Ok(())
}

async fn list_suppressions(settings: Settings) -> anyhow::Result<()> {
    let (_scrape, suppression) = configurators(&settings).await?;
    let store = SuppressionStore::new(suppression);

    println!("Suppressed labels (metric.label):");
    for (metric, label) in store.list().await? {
        println!("{metric}.{label}");
    }
    Ok(())
}

async fn unsilence(settings: Settings, target: &str) -> anyhow::Result<()> {
    let Some((metric, label)) = target.split_once('.') else {
        anyhow::bail!("target must be in metric.label form, got {target:?}");
    };

    let (scrape, suppression) = configurators(&settings).await?;
    let lifecycle = build_lifecycle(&settings, scrape, suppression)?;

    println!("Removing silence rule for {metric}.{label}");
    lifecycle.remove_silence(metric, label).await?;
    Ok(())
}

async fn configurators(settings: &Settings) -> anyhow::Result<(AnyConfigurator, AnyConfigurator)> {
    match settings.storage.backend {
        StorageBackend::File => {
            let file = &settings.storage.file;
            Ok((
                AnyConfigurator::File(FileConfigurator::new(&file.scrape_config_path)),
                AnyConfigurator::File(FileConfigurator::new(&file.suppression_path)),
            ))
        }
        StorageBackend::ConfigMap => {
            let client = kube::Client::try_default()
                .await
                .context("building cluster client")?;
            let cm = &settings.storage.configmap;
            Ok((
                AnyConfigurator::ConfigMap(ConfigMapConfigurator::new(
                    client.clone(),
                    &cm.namespace,
                    &cm.scrape_name,
                    &cm.scrape_key,
                )),
                AnyConfigurator::ConfigMap(ConfigMapConfigurator::new(
                    client,
                    &cm.namespace,
                    &cm.suppression_name,
                    &cm.suppression_key,
                )),
            ))
        }
    }
}

fn build_lifecycle(
    settings: &Settings,
    scrape: AnyConfigurator,
    suppression: AnyConfigurator,
) -> anyhow::Result<RuleLifecycle<AnyConfigurator, AnyConfigurator>> {
    let reset_endpoint = format!("http://127.0.0.1:{}/metrics/reset", settings.api_port);
    Ok(RuleLifecycle::new(
        scrape,
        SuppressionStore::new(suppression),
        prom_client(settings)?,
        settings.patrol.sentinel_value.clone(),
        reset_endpoint,
    ))
}

fn prom_client(settings: &Settings) -> anyhow::Result<PromClient> {
    PromClient::new(
        &settings.prometheus_url,
        Duration::from_secs(settings.patrol.request_timeout_seconds),
    )
    .context("building prometheus client")
}
