use catalog_viewer::{AppShell, Cli, Command, Config, LogTarget, init_logger};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env().with_cli(&cli);
    let command = cli.command();

    let target = match command {
        Command::Browse => LogTarget::Panel,
        _ => LogTarget::Terminal,
    };
    init_logger(&config.log_level, config.log_dir.as_deref(), target)?;

    let shell = AppShell::mount(&config)?;
    shell.run(command).await
}
