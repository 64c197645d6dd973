use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use ip_guard::admin::{self, IpGuard};
use ip_guard::cli::{Cli, Commands};
use ip_guard::config::{self, Config};
use ip_guard::store::{RuleStore, SqliteRuleStore, StaticRuleStore};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Quieter by default for one-shot admin commands
    let directive = match (&cli.command, cli.verbose) {
        (_, true) => "ip_guard=debug",
        (Commands::Serve, false) => "ip_guard=info",
        (Commands::Admin(_), false) => "ip_guard=warn",
    };
    let filter = match directive.parse::<tracing_subscriber::filter::Directive>() {
        Ok(d) => tracing_subscriber::EnvFilter::from_default_env().add_directive(d),
        Err(_) => tracing_subscriber::EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let cfg = config::load(cli.config.as_deref())?;
    info!("Configuration loaded");

    match cli.command {
        Commands::Serve => {
            info!("Starting ip-guard v{}", env!("CARGO_PKG_VERSION"));
            ip_guard::api::serve(cfg).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Admin(cmd) => {
            let guard = IpGuard::new(admin_store(&cfg).await?);
            let mut stdout = std::io::stdout().lock();
            Ok(admin::run(cmd, &guard, &mut stdout).await.into())
        }
    }
}

/// Administration works on the database. Without one, the configured lists
/// are shown but changes last only for this invocation.
async fn admin_store(cfg: &Config) -> Result<Arc<dyn RuleStore>> {
    if cfg.guard.use_database {
        let pool = ip_guard::db::init(cfg).await?;
        return Ok(Arc::new(SqliteRuleStore::new(pool)));
    }
    tracing::warn!("guard.use_database is off: changes will not be saved");
    Ok(Arc::new(StaticRuleStore::from_lists(
        &cfg.guard.whitelist(),
        &cfg.guard.blacklist(),
    )))
}
