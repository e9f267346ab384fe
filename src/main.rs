//! Perfdash server
//!
//! Periodically collects performance results from CI artifacts and serves
//! them to the dashboard. `--once` runs a single collection and exits.

use clap::Parser;

use perfdash::cli::{logging, run_once, run_server, Args, Error, Settings, EXIT_SUCCESS};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let code = match run(args).await {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(args: Args) -> Result<(), Error> {
    let settings = Settings::load(&args)?;
    logging::init(&settings.logging)?;
    tracing::info!("Starting perfdash {}", env!("CARGO_PKG_VERSION"));

    if args.once {
        run_once(&settings).await.map(|_| ())
    } else {
        run_server(&settings).await
    }
}
