use crate::pipeline::EtlPipeline;
use anyhow::{Result, bail};
use chrono::{DateTime, Local, Utc};
use log::info;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

/// Single-threaded timer loop around the pipeline.
///
/// Runs one tick at startup, then keeps an explicit next-fire time and polls
/// the wall clock between coarse sleeps. Ticks run synchronously inside the
/// loop, so two ticks can never overlap.
#[derive(Debug)]
pub struct Scheduler {
    interval: Duration,
    poll_interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(interval: Duration, poll_interval: Duration, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            interval,
            poll_interval,
            shutdown,
        }
    }

    /// Run the pipeline immediately, then on the configured cadence until the
    /// shutdown flag is raised (clean return) or the pipeline exhausts its
    /// failure ceiling (error return; the process must exit non-zero).
    ///
    /// The shutdown flag is honored at the top of each sleep iteration, never
    /// mid-tick.
    pub async fn run(&self, pipeline: &mut EtlPipeline) -> Result<()> {
        let mut next_run = self.tick(pipeline).await?;

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Interrupt received, shutting down scheduler");
                return Ok(());
            }

            if Utc::now() >= next_run {
                next_run = self.tick(pipeline).await?;
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Run one tick, enforce the failure ceiling, and report the next fire
    /// time with the hourly heartbeat.
    async fn tick(&self, pipeline: &mut EtlPipeline) -> Result<DateTime<Utc>> {
        pipeline.run_tick().await;

        if pipeline.is_exhausted() {
            bail!(
                "Pipeline stopped after {} consecutive failed runs",
                pipeline.consecutive_failures()
            );
        }

        let next_run = Utc::now() + chrono::Duration::from_std(self.interval)?;
        info!(
            "Scheduler heartbeat: next run at {}",
            next_run
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
        );

        Ok(next_run)
    }
}
