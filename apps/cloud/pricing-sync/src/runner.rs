//! Sync, schedule, status and preview commands

use domain_pricing::{
    Aggregator, CloudPlan, CloudProvider, PgPlanRepository, PlanQuery, PlanRepository, PlanSource,
    PlanSync, PricingResult, PricingService, ProviderRegistry, ProviderStatus, SyncOptions,
    SyncReport, selector::BestPerProviderSelector,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info, warn};

use crate::config::Config;

/// Output of `pricing-sync status`.
#[derive(Debug, Serialize)]
pub struct SyncStatus {
    pub total_plans: u64,
    pub providers: Vec<ProviderStatus>,
}

pub struct SyncRunner {
    config: Config,
    http: reqwest::Client,
}

impl SyncRunner {
    pub fn new(config: Config, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    fn aggregator(&self) -> Aggregator {
        let providers = &self.config.pricing.providers;
        Aggregator::new(
            ProviderRegistry::from_config(providers, self.http.clone()),
            providers.timeout(),
        )
    }

    fn repository(&self, db: database::postgres::DatabaseConnection) -> Arc<PgPlanRepository> {
        Arc::new(PgPlanRepository::new(db).with_batch_size(self.config.pricing.sync_batch_size))
    }

    pub fn plan_sync(&self, db: database::postgres::DatabaseConnection) -> PlanSync<PgPlanRepository> {
        PlanSync::new(self.aggregator(), self.repository(db))
    }

    /// Run the sync every time `cron` fires until Ctrl+C.
    pub async fn run_scheduled(
        &self,
        db: database::postgres::DatabaseConnection,
        cron: &str,
        clear: bool,
    ) -> eyre::Result<()> {
        info!(cron = cron, clear = clear, "Starting scheduled pricing sync");

        let mut sched = JobScheduler::new().await?;
        sched
            .add(scheduled_job(cron, Arc::new(self.plan_sync(db)), clear)?)
            .await?;
        sched.start().await?;

        info!("Scheduler started, waiting for jobs...");
        tokio::signal::ctrl_c().await?;

        info!("Stopping scheduler");
        sched.shutdown().await?;
        Ok(())
    }

    pub async fn status(&self, db: database::postgres::DatabaseConnection) -> PricingResult<SyncStatus> {
        let service = PricingService::new(
            self.aggregator(),
            self.repository(db),
            Arc::new(BestPerProviderSelector),
            PlanSource::Database,
        );

        let providers = service.provider_status().await?;
        Ok(SyncStatus {
            total_plans: providers.iter().map(|p| p.stored_plans).sum(),
            providers,
        })
    }

    /// Live aggregate without touching the store.
    pub async fn preview(&self, providers: Vec<CloudProvider>, regions: Vec<String>) -> Vec<CloudPlan> {
        self.aggregator()
            .aggregate(&PlanQuery {
                regions,
                ..PlanQuery::for_providers(providers)
            })
            .await
    }
}

/// Cron job running one sync pass per tick; a tick that fires while the
/// previous pass is still running is skipped.
pub fn scheduled_job<R>(cron: &str, sync: Arc<PlanSync<R>>, clear: bool) -> Result<Job, JobSchedulerError>
where
    R: PlanRepository + 'static,
{
    let running = Arc::new(Mutex::new(()));
    let options = SyncOptions {
        providers: Vec::new(),
        clear,
    };

    Job::new_async(cron, move |_uuid, _l| {
        let sync = sync.clone();
        let running = running.clone();
        let options = options.clone();

        Box::pin(async move {
            info!("Running scheduled pricing sync");
            match run_guarded(&sync, &options, &running).await {
                Some(Ok(report)) => {
                    info!(
                        fetched = report.fetched,
                        inserted = report.inserted,
                        duration_ms = report.duration_ms,
                        "Scheduled sync complete"
                    );
                }
                Some(Err(e)) => error!(error = %e, "Scheduled sync failed"),
                None => {}
            }
        })
    })
}

/// `None` when another pass holds `guard`.
pub async fn run_guarded<R: PlanRepository>(
    sync: &PlanSync<R>,
    options: &SyncOptions,
    guard: &Mutex<()>,
) -> Option<PricingResult<SyncReport>> {
    let Ok(_running) = guard.try_lock() else {
        warn!("Previous sync still running, skipping this tick");
        return None;
    };
    Some(sync.run(options).await)
}
