use std::error::Error;

use clap::{Args, Parser, Subcommand};
use migration::MigratorTrait;
use sea_orm::{ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use engine::{Parcel as EngineParcel, parcels};

#[derive(Parser, Debug)]
#[command(name = "prorata_admin")]
#[command(about = "Admin utilities for Prorata (bootstrap community parcels)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./prorata.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Parcel(Parcel),
}

#[derive(Args, Debug)]
struct Parcel {
    #[command(subcommand)]
    command: ParcelCommand,
}

#[derive(Subcommand, Debug)]
enum ParcelCommand {
    Create(ParcelCreateArgs),
    List(ParcelListArgs),
}

#[derive(Args, Debug)]
struct ParcelCreateArgs {
    /// Parcel id; generated when omitted.
    #[arg(long)]
    id: Option<Uuid>,
    /// Surface in square meters (integer weight for proration).
    #[arg(long)]
    area: i64,
    #[arg(long)]
    community: String,
    #[arg(long)]
    owner: String,
}

#[derive(Args, Debug)]
struct ParcelListArgs {
    #[arg(long)]
    community: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let db = connect(&cli.database_url).await?;

    match cli.command {
        Command::Parcel(parcel) => match parcel.command {
            ParcelCommand::Create(args) => parcel_create(&db, args).await?,
            ParcelCommand::List(args) => parcel_list(&db, args).await?,
        },
    }

    Ok(())
}

async fn connect(url: &str) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn parcel_create(
    db: &DatabaseConnection,
    args: ParcelCreateArgs,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if args.area <= 0 {
        return Err("area must be > 0".into());
    }

    let id = args.id.unwrap_or_else(Uuid::new_v4);
    let parcel = parcels::ActiveModel {
        id: Set(id.to_string()),
        area: Set(args.area),
        community_id: Set(args.community.clone()),
        owner_id: Set(args.owner.clone()),
    };
    parcels::Entity::insert(parcel).exec(db).await?;

    println!("created parcel {id} in community {}", args.community);
    Ok(())
}

async fn parcel_list(
    db: &DatabaseConnection,
    args: ParcelListArgs,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let models = parcels::Entity::find()
        .filter(parcels::Column::CommunityId.eq(args.community.clone()))
        .all(db)
        .await?;

    if models.is_empty() {
        println!("no parcels in community {}", args.community);
        return Ok(());
    }

    for model in models {
        let parcel = EngineParcel::try_from(model)?;
        println!(
            "{}\tarea={}\towner={}",
            parcel.id, parcel.area, parcel.owner_id
        );
    }
    Ok(())
}
