use anyhow::Result;

use crate::core::AppConfig;
use crate::core::db::open_initialized_db;
use crate::jobs::{PeriodicJob, RefreshToken, RenewChannels};

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum JobId {
    RefreshToken,
    RenewChannels,
}

pub async fn run(id: JobId, config: &AppConfig) -> Result<()> {
    let db = open_initialized_db(&config.db_path).await?;

    let job: Box<dyn PeriodicJob> = match id {
        JobId::RefreshToken => Box::new(RefreshToken),
        JobId::RenewChannels => Box::new(RenewChannels),
    };

    println!("Running job: {:?}", id);
    job.run_job(config, &db).await;
    println!("Job completed");

    Ok(())
}
