//! msync-daemon entry point.
//!
//! Builds everything from one `Config`, then runs three things until a
//! shutdown signal: the sweep ticker, the event loop and the admin HTTP
//! server. Any failure before the listener is up aborts startup.

use std::sync::Arc;

use anyhow::Context;
use msync_config::Config;
use msync_daemon::{
    event_loop::run_event_loop,
    routes,
    source::ChannelSource,
    state::AppState,
    telemetry,
};
use msync_db::{MatchStore, PgMatchStore};
use msync_reconcile::{Clock, Dispatcher, Reconciler, SystemClock, WorkerPool};
use msync_schemas::MatchIdSource;
use msync_tmt2::{MatchTemplate, Tmt2Client, Tmt2ClientOptions};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{debug, info, warn, Level};

/// Envelopes waiting between the admin route and the event loop.
const EVENT_QUEUE_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::dotenv();

    let cfg = Config::from_env().context("load configuration")?;
    telemetry::init_tracing(&cfg.log_level);
    info!(
        config_hash = cfg.config_hash().unwrap_or("none"),
        workers = cfg.worker_count,
        template = %cfg.tmt2.template_name,
        "configuration loaded"
    );
    debug!(config = ?cfg, "effective configuration");

    let metrics = telemetry::install_metrics()?;

    // Store
    let pool = msync_db::connect(&cfg.secrets.database_url).await?;
    msync_db::migrate(&pool).await?;
    let store: Arc<dyn MatchStore> = Arc::new(PgMatchStore::new(pool, cfg.store_timeout));

    // Orchestration API
    let client = Tmt2Client::new(
        cfg.tmt2.url.as_str(),
        cfg.secrets.tmt2_access_token.as_str(),
        Tmt2ClientOptions {
            insecure_tls: cfg.tmt2.insecure_tls,
            ..Default::default()
        },
    )
    .context("build TMT2 client")?;
    client.login().await.context("TMT2 login")?;
    info!(url = %client.base_url(), "TMT2 login ok");

    let template = MatchTemplate::parse(cfg.tmt2.template_name.as_str(), cfg.match_template())
        .with_context(|| format!("parse template {}", cfg.tmt2.template_name))?;
    let grace = chrono::Duration::from_std(cfg.match_delete_wait_time)
        .context("MATCH_DELETE_WAIT_TIME out of range")?;

    // Engine
    let cancel = CancellationToken::new();
    let workers = WorkerPool::new(cfg.worker_count);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let reconciler = Arc::new(
        Reconciler::new(
            Arc::clone(&store),
            Arc::new(client),
            template,
            workers.clone(),
            Arc::clone(&clock),
            grace,
        )
        .with_cancellation(cancel.clone()),
    );
    let dispatcher = Arc::new(Dispatcher::new(
        store,
        MatchIdSource::from_flag(cfg.use_match_service_id),
        clock,
    ));

    let (events_tx, channel_source) = ChannelSource::new(EVENT_QUEUE_CAPACITY);
    let sweep_task = tokio::spawn(reconciler.run(cfg.jobs_process_interval, cancel.clone()));
    let event_task =
        spawn_event_loop(&cfg, channel_source, dispatcher, workers.clone(), cancel.clone()).await?;

    // HTTP
    let state = Arc::new(AppState::new(events_tx).with_metrics(metrics));
    let app = routes::build_router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let listener = tokio::net::TcpListener::bind(cfg.http_addr)
        .await
        .with_context(|| format!("bind {}", cfg.http_addr))?;
    info!("msync-daemon listening on http://{}", cfg.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .context("server crashed")?;

    // In-flight sweeps are not waited for.
    cancel.cancel();
    workers.close();
    let _ = sweep_task.await;
    let _ = event_task.await;
    info!("msync-daemon stopped");
    Ok(())
}

#[cfg(feature = "pulsar")]
async fn spawn_event_loop(
    cfg: &Config,
    channel: ChannelSource,
    dispatcher: Arc<Dispatcher>,
    workers: WorkerPool,
    cancel: CancellationToken,
) -> anyhow::Result<JoinHandle<u64>> {
    use msync_daemon::source::{MergedSource, PulsarSource};

    let Some(pulsar) = &cfg.pulsar else {
        info!("no PULSAR_URL, events arrive over HTTP only");
        return Ok(tokio::spawn(run_event_loop(channel, dispatcher, workers, cancel)));
    };
    let broker = PulsarSource::connect(
        &pulsar.url,
        &pulsar.base_topic,
        cfg.secrets.pulsar_auth_token.as_deref(),
    )
    .await?;
    Ok(tokio::spawn(run_event_loop(
        MergedSource::new(channel, broker),
        dispatcher,
        workers,
        cancel,
    )))
}

#[cfg(not(feature = "pulsar"))]
async fn spawn_event_loop(
    cfg: &Config,
    channel: ChannelSource,
    dispatcher: Arc<Dispatcher>,
    workers: WorkerPool,
    cancel: CancellationToken,
) -> anyhow::Result<JoinHandle<u64>> {
    if cfg.pulsar.is_some() {
        warn!("PULSAR_URL is set but this build lacks the `pulsar` feature; events arrive over HTTP only");
    }
    Ok(tokio::spawn(run_event_loop(channel, dispatcher, workers, cancel)))
}

/// Resolves on ctrl-c, SIGTERM or an external cancel; cancels either way.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("interrupt received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
        _ = cancel.cancelled() => {}
    }
    cancel.cancel();
}
