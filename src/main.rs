use std::{net::TcpListener, sync::Arc};

use anyhow::Context;
use env_logger::Env;
use tcin_checker::{
    configuration::get_configuration,
    services::{DroidLauncher, IndexChecker},
    startup::run,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().context("Failed to read configuration.")?;

    let launcher = Arc::new(DroidLauncher::new(configuration.webdriver.clone()));
    let checker = IndexChecker::new(launcher, configuration.search.clone())
        .context("Invalid search base url")?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    log::info!("Listening on {}", address);

    run(listener, checker)?.await?;
    Ok(())
}
