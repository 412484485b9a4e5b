use clap::Parser;

use shortdigest::cli::Cli;
use shortdigest::config::init_config;
use shortdigest::errors::ShortdigestError;
use shortdigest::interfaces::cli::run_cli_command;
use shortdigest::system::init_logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<ShortdigestError>() {
            Some(e) => eprintln!("{}", e.format_colored()),
            None => eprintln!("{:#}", err),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = init_config(cli.config.as_deref())?;
    // guard 需要活到进程退出
    let _guard = init_logging(&config.logging)?;

    run_cli_command(cli.command, cli.json).await
}
