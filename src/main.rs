use clap::Parser;
use modroute::cli::{run_cli, Cli};
use modroute::logging::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logging = init_logging(&LogConfig::from_env())?;
    let stdout = std::io::stdout();
    run_cli(cli, &mut stdout.lock())
}
