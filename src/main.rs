use clap::Parser;
use schema_admin::cli::{self, Cli, Outcome};
use schema_admin::config::{Config, DSN_ENV};
use schema_admin::core::Result;
use schema_admin::{IdentifierPolicy, SchemaAdmin};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::discover(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    // RUST_LOG wins over the configured filter. Logs go to stderr so command
    // output can be piped.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting schema-admin...");

    match run(&cli, &config) {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::Absent) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli, config: &Config) -> Result<Outcome> {
    let dsn = config.resolve_dsn(cli.dsn.as_deref(), std::env::var(DSN_ENV).ok())?;
    let policy = if cli.strict || config.strict_identifiers() {
        IdentifierPolicy::Strict
    } else {
        IdentifierPolicy::Trusted
    };
    debug!(?policy, "identifier policy");

    let mut admin = SchemaAdmin::connect(&dsn)?.with_policy(policy);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let outcome = cli::execute(&mut admin, &cli.command, cli.json, &mut out);
    admin.close();
    outcome
}
