use anyhow::Result;
use calsync::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
