use super::DBClient;
use super::UserExt;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

impl DBClient {
    /// Registers the hourly verification-code sweep and starts the scheduler.
    /// The returned scheduler keeps running in the background.
    pub async fn start_cleanup_task(&self) -> Result<JobScheduler, JobSchedulerError> {
        let sched = JobScheduler::new().await?;
        let db = self.clone();

        let job = Job::new_async("0 0 * * * *", move |uuid, _l| {
            let db = db.clone();
            Box::pin(async move {
                tracing::debug!("Running verification code cleanup job {:?}", uuid);

                match db.delete_stale_verification_codes().await {
                    Ok(deleted) => {
                        tracing::info!(
                            "Cleanup job {:?} finished, deleted {} verification codes",
                            uuid,
                            deleted
                        );
                    }
                    Err(e) => {
                        tracing::error!("Cleanup job {:?} failed: {:?}", uuid, e);
                    }
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;
        Ok(sched)
    }
}
