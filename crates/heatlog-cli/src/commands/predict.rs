use clap::Args;
use heatlog_core::{PredictionSource, Query};

#[derive(Args)]
pub struct PredictArgs {
    /// Who is showering
    #[arg(long)]
    owner: String,
    /// Planned shower length in minutes
    #[arg(long)]
    duration: f64,
    /// Ambient temperature in degrees
    #[arg(long, allow_hyphen_values = true)]
    temperature: f64,
    /// Print the full prediction as JSON
    #[arg(long)]
    json: bool,
}

fn describe(source: PredictionSource) -> &'static str {
    match source {
        PredictionSource::ColdStart => "default formula, no history yet",
        PredictionSource::Global => "other households",
        PredictionSource::User => "your history",
        PredictionSource::Blended => "your history blended with other households",
        PredictionSource::PatternOverride => "strategic jump, recent attempts were stuck",
    }
}

pub fn run(args: PredictArgs) -> Result<(), Box<dyn std::error::Error>> {
    let service = super::open_service()?;
    let prediction = service.predict(&Query::new(args.owner, args.duration, args.temperature))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
        return Ok(());
    }

    println!("Heat for {} min", prediction.heating_time);
    println!("  based on: {}", describe(prediction.source));
    println!("  estimate: {:.2} min", prediction.raw_value);
    if let Some(u) = prediction.uncertainty {
        println!("  spread:   ±{u:.2} min");
    }
    Ok(())
}
