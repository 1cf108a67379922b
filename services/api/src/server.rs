use crate::cli::ServeArgs;
use crate::infra::{AppState, PortalStore};
use crate::routes::with_admission_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use uap_admission::admissions::{AdmissionService, LifecycleScheduler};
use uap_admission::config::{AppConfig, SchedulerConfig};
use uap_admission::error::AppError;
use uap_admission::telemetry;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(data_dir) = args.data_dir.take() {
        config.storage.data_dir = Some(data_dir);
    }
    if args.in_memory {
        config.storage.data_dir = None;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = PortalStore::open(config.storage.data_dir.as_deref())?;
    info!(store = %store.describe(), "admission store opened");
    let service = Arc::new(AdmissionService::new(Arc::new(store)).with_merit_weights(config.merit));

    spawn_scheduler(service.clone(), config.scheduler);

    let app = with_admission_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admission portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Drive the sweep and payment simulator from a fixed-rate tokio interval. Ticks run on
/// the blocking pool.
fn spawn_scheduler(service: Arc<AdmissionService<PortalStore>>, config: SchedulerConfig) {
    tokio::spawn(async move {
        let mut scheduler = LifecycleScheduler::new(&config, service.now());
        let mut interval = tokio::time::interval(config.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let worker = service.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                let report = scheduler.tick(worker.as_ref(), worker.now());
                (scheduler, report)
            })
            .await;

            match outcome {
                Ok((returned, report)) => {
                    scheduler = returned;
                    match report {
                        Ok(report) => {
                            for event in &report.payments {
                                info!(?event, "payment update");
                            }
                        }
                        Err(err) => warn!(error = %err, "scheduler tick failed"),
                    }
                }
                Err(err) => {
                    error!(error = %err, "scheduler task aborted, restarting schedule");
                    scheduler = LifecycleScheduler::new(&config, service.now());
                }
            }
        }
    });
}
