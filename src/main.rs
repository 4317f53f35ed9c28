use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use market_ledger::csv::{read_commands, write_wallets};
use market_ledger::{AppConfig, Ledger, WalletService};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: market-ledger <commands.csv>");
        return ExitCode::from(2);
    };

    if !path.ends_with(".csv") {
        warn!(path, "input file seems to not be a csv file");
    }

    match run(path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(path: String) -> market_ledger::Result<()> {
    let config = AppConfig::from_env()?;
    let ledger = Arc::new(Ledger::new(config.default_currency));
    let service = WalletService::with_fee_policy(ledger.clone(), config.fee_policy());

    let commands = read_commands(path)?;
    let (cmd_sender, cmd_receiver) = tokio::sync::mpsc::channel(16);

    tokio::spawn(async move {
        for result in commands {
            match result {
                Ok(command) => {
                    if cmd_sender.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    service.replay(ReceiverStream::new(cmd_receiver)).await;

    let wallets = ledger.wallets()?;
    write_wallets(std::io::stdout().lock(), &wallets)?;
    Ok(())
}
