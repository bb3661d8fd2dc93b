use clap::Args;
use heatlog_core::{Config, ConvergenceSimulator, PredictorVariant, SimulationConfig};

#[derive(Args)]
pub struct SimulateArgs {
    /// Number of simulated days
    #[arg(long, default_value_t = 28)]
    days: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Predictor to exercise (kernel or window); defaults to the configured one
    #[arg(long)]
    variant: Option<PredictorVariant>,
    #[arg(long)]
    json: bool,
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.days == 0 {
        return Err("--days must be at least 1".into());
    }
    let mut predictor = Config::load_or_default().predictor;
    if let Some(variant) = args.variant {
        predictor.variant = variant;
    }

    let report = ConvergenceSimulator::with_predictor(
        SimulationConfig {
            days: args.days,
            seed: args.seed,
            ..Default::default()
        },
        predictor,
    )
    .run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("predictor {} (seed {})", report.predictor, report.seed);
    println!(" day  dur  temp  served  ideal  rated  error");
    for d in &report.days {
        println!(
            "{:>4} {:>4.0} {:>5.0} {:>7.1} {:>6.2} {:>6.0} {:>6.2}",
            d.day + 1,
            d.duration,
            d.temperature,
            d.predicted,
            d.ideal,
            d.satisfaction,
            d.abs_error
        );
    }
    println!("first week MAE: {:.2} min", report.first_week_mae);
    println!("last week MAE:  {:.2} min", report.last_week_mae);
    Ok(())
}
