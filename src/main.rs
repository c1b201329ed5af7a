// src/main.rs

use procset::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("procset error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    let strict = args.strict;
    let summary = run(args).await?;

    if strict && summary.has_failures() {
        return Ok(2);
    }
    Ok(0)
}
