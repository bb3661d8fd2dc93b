use clap::Args;
use heatlog_core::{Config, ObservationStore};

#[derive(Args)]
pub struct HistoryArgs {
    /// Only this owner's observations
    #[arg(long)]
    owner: Option<String>,
    /// Maximum number of rows, newest first
    #[arg(long, default_value_t = 20)]
    limit: usize,
    #[arg(long)]
    json: bool,
}

pub fn run(args: HistoryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = super::open_database(&config)?;
    let rows = db.list(args.owner.as_deref(), Some(args.limit))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No observations.");
        return Ok(());
    }
    for o in rows {
        println!(
            "{}  {}  {:<12} {:>5.1} min  {:>5.1}°  heat {:>5.1} min  rated {:>5.1}",
            o.id,
            o.occurred_at.format("%Y-%m-%d %H:%M"),
            o.owner,
            o.duration,
            o.temperature,
            o.heating_time,
            o.satisfaction
        );
    }
    Ok(())
}
