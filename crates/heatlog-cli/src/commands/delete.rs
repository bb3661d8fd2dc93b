use clap::{ArgGroup, Args};
use heatlog_core::{Config, ObservationStore};

#[derive(Args)]
#[command(group(ArgGroup::new("target").required(true).args(["id", "owner", "all"])))]
pub struct DeleteArgs {
    /// Observation id
    id: Option<String>,
    /// Delete every observation of this owner
    #[arg(long)]
    owner: Option<String>,
    /// Delete every observation
    #[arg(long)]
    all: bool,
}

pub fn run(args: DeleteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = super::open_database(&config)?;

    if let Some(id) = args.id {
        db.delete(&id)?;
        println!("Deleted {id}");
    } else if let Some(owner) = args.owner {
        let n = db.delete_owner(&owner)?;
        println!("Deleted {n} observation(s) of {owner}");
    } else if args.all {
        let n = db.delete_all()?;
        println!("Deleted {n} observation(s)");
    }
    Ok(())
}
