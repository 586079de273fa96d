use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use mobile_base_apps::{
    utils::{get_config_path, init_tracing, resolve_config},
    Error, MobileBaseAppConfig, MobileBaseCommand, MobileBaseCommandExecutor,
};
use tracing::info;

/// A mobile base command line tool.
#[derive(Parser, Debug)]
#[command(name = env!("CARGO_BIN_NAME"))]
struct MobileBaseCommandArgs {
    /// Path to the setting file.
    #[arg(short, long)]
    config_path: Option<PathBuf>,
    /// gRPC endpoint. Takes priority over the setting file.
    #[arg(long)]
    endpoint: Option<String>,
    #[command(subcommand)]
    command: Option<MobileBaseCommand>,
    /// Prints the default setting as TOML.
    #[arg(long)]
    show_default_config: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let args = MobileBaseCommandArgs::parse();
    info!("ParsedArgs {:?}", args);

    if args.show_default_config {
        print!("{}", toml::to_string(&MobileBaseAppConfig::default())?);
        return Ok(());
    }

    let command = args.command.ok_or(Error::NoCommand)?;
    let config_path = get_config_path(args.config_path);
    let mut config = resolve_config(config_path.as_deref())?;
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }

    let connect_timeout = config.connect_timeout()?;
    let base = tokio::time::timeout(
        connect_timeout,
        mobile_base_remote::connect_mobile_base(config.endpoint.clone(), config.mobile_base),
    )
    .await
    .map_err(|_| Error::ConnectTimeout(config.endpoint.clone(), connect_timeout))??;
    info!(%base, endpoint = %config.endpoint, "connected");

    let executor = MobileBaseCommandExecutor::default();
    tokio::task::block_in_place(|| executor.execute(&base, &command))?;
    Ok(())
}
