use anyhow::Context;
use definitions::DataSet;
use std::io::{BufReader, BufWriter};
#[macro_use]
extern crate log;

fn main() -> anyhow::Result<()> {
    let matches = mdbg_cli::mdbg_commands::mdbg_parser().get_matches();
    if let Some((_, sub_m)) = matches.subcommand() {
        let level = match sub_m.occurrences_of("verbose") {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    }
    match matches.subcommand() {
        Some(("resolve", sub_m)) => resolve(sub_m),
        Some(("stats", sub_m)) => stats(sub_m),
        _ => unreachable!(),
    }
}

fn get_input_file(matches: &clap::ArgMatches) -> anyhow::Result<DataSet> {
    let file = matches.value_of("input").unwrap();
    debug!("Opening {}", file);
    let reader = std::fs::File::open(file)
        .map(BufReader::new)
        .with_context(|| format!("failed to open {}", file))?;
    let dataset: DataSet =
        serde_json::from_reader(reader).with_context(|| format!("failed to parse {}", file))?;
    if !dataset.sanity_check() {
        anyhow::bail!("dataset {} is inconsistent", file);
    }
    Ok(dataset)
}

fn set_threads(matches: &clap::ArgMatches) {
    if let Some(threads) = matches.value_of("threads").and_then(|n| n.parse().ok()) {
        debug!("Set {} threads", threads);
        if let Err(why) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            debug!("{:?}: the thread pool is already initialized", why);
        }
    }
}

fn resolve(matches: &clap::ArgMatches) -> anyhow::Result<()> {
    use resolver::{ResolveConfig, ResolveRepeats};
    debug!("START\tResolve");
    set_threads(matches);
    let dataset = get_input_file(matches)?;
    let start_k: usize = matches
        .value_of("start_k")
        .and_then(|k| k.parse().ok())
        .context("start_k must be a positive integer")?;
    let saturating_k: usize = matches
        .value_of("saturating_k")
        .and_then(|k| k.parse().ok())
        .context("saturating_k must be a positive integer")?;
    if saturating_k < start_k {
        anyhow::bail!("saturating_k ({}) is below start_k ({})", saturating_k, start_k);
    }
    let out_dir = matches.value_of("output").unwrap();
    let config = ResolveConfig::new(start_k, saturating_k, matches.is_present("validate"), out_dir);
    let resolution = dataset.resolve_repeats(&config)?;
    info!(
        "Wrote {} contigs into {} (k={}, frozen={})",
        resolution.contigs.len(),
        out_dir,
        resolution.final_k,
        resolution.frozen,
    );
    Ok(())
}

fn stats(matches: &clap::ArgMatches) -> anyhow::Result<()> {
    use resolver::Stats;
    debug!("START\tStats");
    let dataset = get_input_file(matches)?;
    match matches.value_of("file") {
        Some(path) => {
            let wtr = BufWriter::new(std::fs::File::create(path)?);
            dataset.stats(wtr)?;
        }
        None => {
            let stdout = std::io::stdout();
            dataset.stats(stdout.lock())?;
        }
    }
    Ok(())
}
