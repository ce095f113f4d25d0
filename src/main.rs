use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use twochoice::{KeyArena, config::Args, harness, report};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let arena = KeyArena::open(&args.input)?;
    let keys = arena.keys();

    // Fail on an unusable output directory before doing the work.
    report::ensure_dir(&args.out_dir)?;

    let config = args.run_config();
    let result = harness::run(&keys, &config).with_context(|| {
        format!(
            "{} keys did not fit in a table of {} slots",
            keys.len(),
            config.table_capacity
        )
    })?;

    let path = report::save(&args.out_dir, &args.result_name(), &result)?;
    tracing::info!(path = %path.display(), "results written");

    println!("{}", report::summary(config.threads, &result));
    Ok(())
}
