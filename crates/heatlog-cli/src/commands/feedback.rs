use chrono::{DateTime, Utc};
use clap::Args;
use heatlog_core::Feedback;

#[derive(Args)]
pub struct FeedbackArgs {
    #[arg(long)]
    owner: String,
    /// Shower length in minutes
    #[arg(long)]
    duration: f64,
    /// Ambient temperature in degrees
    #[arg(long, allow_hyphen_values = true)]
    temperature: f64,
    /// Heating time actually used, in minutes
    #[arg(long)]
    heating_time: f64,
    /// Rating on the configured scale (perfect is the midpoint)
    #[arg(long)]
    satisfaction: f64,
    /// When the shower happened (RFC 3339), defaults to now
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

pub fn run(args: FeedbackArgs) -> Result<(), Box<dyn std::error::Error>> {
    let service = super::open_service()?;
    let observation = service.submit_feedback(Feedback {
        owner: args.owner,
        duration: args.duration,
        temperature: args.temperature,
        heating_time: args.heating_time,
        satisfaction: args.satisfaction,
        occurred_at: args.at,
    })?;
    println!("Recorded: {}", observation.id);
    Ok(())
}
