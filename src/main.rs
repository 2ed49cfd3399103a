use std::process::ExitCode;

use clap::Parser;
use tokio::sync::broadcast;

use getman_check::cli::{Cli, Command, OutputFormat, RunArgs};
use getman_check::http::ReqwestTransport;
use getman_check::{init_logging, storage, suite};

const CONFIG_ERROR_EXIT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> ExitCode {
    init_logging(&args.log_level);

    let prepared = args.resolve_config().and_then(|config| {
        let sequencer = suite::booking_sequencer(&config)?;
        let transport = ReqwestTransport::new()?;
        Ok((sequencer, transport))
    });
    let (sequencer, transport) = match prepared {
        Ok(prepared) => prepared,
        Err(err) => {
            tracing::error!(error = %err, "cannot start run");
            eprintln!("{err}");
            return ExitCode::from(CONFIG_ERROR_EXIT);
        }
    };

    // Ctrl-C stops the run after the case in flight.
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(());
        }
    });

    let report = sequencer.run_until_cancelled(&transport, &mut cancel_rx).await;

    match args.format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(err) => tracing::error!(error = %err, "cannot serialize report"),
        },
    }

    if let Some(path) = &args.report {
        if let Err(err) = storage::save_report(&report, path) {
            tracing::error!(error = %err, "cannot write report");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::from(report.exit_code())
}
