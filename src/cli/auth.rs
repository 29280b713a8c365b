use anyhow::Result;
use std::io::{self, Write};

use crate::backend::BackendClient;
use crate::core::AppConfig;
use crate::core::db::open_initialized_db;
use crate::google::oauth::OAuthClient;
use crate::sync::onboarding::complete_authorization;

pub async fn run(config: &AppConfig) -> Result<()> {
    let auth_url = OAuthClient::from_config(config).authorize_url();
    println!(
        "\nPlease open the following URL in your browser and authorize access:\n\n{}\n",
        auth_url
    );
    print!("Paste the authorization code shown by Google here: ");
    io::stdout().flush()?;
    let mut code = String::new();
    io::stdin().read_line(&mut code)?;
    let code = code.trim();

    let db = open_initialized_db(&config.db_path).await?;
    let backend = BackendClient::from_config(config);
    let sync_config = complete_authorization(config, &db, &backend, code).await?;
    println!(
        "Authorized {} and enabled sync for calendar {}.",
        sync_config.email, sync_config.calendar_id
    );
    Ok(())
}
