use anyhow::Result;
use clap::Parser;
use loan_docflow::cli;
use tracing::error;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        if tracing::dispatcher::has_been_set() {
            error!("{:#}", err);
        } else {
            // failed before logging was initialised (bad config)
            eprintln!("error: {:#}", err);
        }
        std::process::exit(1);
    }
    Ok(())
}
