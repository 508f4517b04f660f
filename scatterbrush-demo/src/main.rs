mod cli;
mod scene;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .init();

    // --paint or --place runs a single scenario, --seed N fixes the generator,
    // --trace enables the engine's verbose tracing
    let args: Vec<String> = std::env::args().collect();
    let seed = args
        .iter()
        .position(|a| a == "--seed")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.parse::<u64>())
        .transpose()?
        .unwrap_or(42);
    let only_paint = args.iter().any(|a| a == "--paint");
    let only_place = args.iter().any(|a| a == "--place");
    let run = cli::RunConfig {
        seed,
        trace: args.iter().any(|a| a == "--trace"),
    };

    if !only_place {
        cli::run_paint(run)?;
    }
    if !only_paint {
        cli::run_place(run)?;
    }
    Ok(())
}
