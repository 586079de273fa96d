use clap::{Parser, ValueEnum};
use schemars::schema_for;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = env!("CARGO_BIN_NAME"))]
struct Args {
    #[command(subcommand)]
    subcommand: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
enum Subcommand {
    /// Generate JSON schema for the specified config file.
    Schema {
        /// Kind of config file.
        #[arg(value_enum, ignore_case = true)]
        kind: ConfigKind,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConfigKind {
    AppConfig,
    MobileBaseConfig,
}

fn main() -> anyhow::Result<()> {
    mobile_base_apps::utils::init_tracing();
    let args = Args::parse();
    debug!(?args);

    match args.subcommand {
        Subcommand::Schema { kind } => {
            let schema = match kind {
                ConfigKind::AppConfig => schema_for!(mobile_base_apps::MobileBaseAppConfig),
                ConfigKind::MobileBaseConfig => schema_for!(mobile_base::MobileBaseConfig),
            };
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }
    Ok(())
}
