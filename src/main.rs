mod bits;
mod cli;
mod error;
mod sampler;
mod writer;

use clap::Parser;
use log::info;

use bits::Orchestrator;
use cli::Cli;
use error::BitsError;

fn run(cli: &Cli) -> Result<(), BitsError> {
    let mut jobs = Vec::new();

    if let Some(pattern) = &cli.sample {
        let samples = sampler::sample_disk(&cli.input, pattern, cli.radiance)?;
        let mut orch = Orchestrator::new(cli.delimiter);
        for window in &samples {
            orch.ingest(window, false);
        }
        orch.choose_delimiter();
        jobs.extend(orch.iterate());
    } else {
        let orch = Orchestrator::load_file(&cli.input, cli.delimiter)?;
        jobs.extend(orch.iterate());
    }

    info!("{} job record(s) extracted", jobs.len());

    let out = std::fs::File::create(&cli.output)?;
    writer::write_csv(out, &jobs)?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new().filter_level(level).init();

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
