// src/main.rs
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

use grscicoll_lib::{
    config::{self, MatcherConfig},
    models::{Country, DuplicatesSearchParams, EntityKind, LookupParams},
    DuplicatesService, InMemoryRegistry, LookupService,
};

#[derive(Parser)]
#[command(name = "grscicoll")]
#[command(about = "Match occurrence records to GRSciColl entities and scan for duplicates")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Registry snapshot (JSON) to run against.
    #[arg(long, global = true, env = config::SNAPSHOT_ENV_VAR)]
    snapshot: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Match institution and collection fields of one record.
    Lookup(LookupArgs),
    /// Group institutions or collections that look like duplicates.
    Duplicates(DuplicatesArgs),
}

#[derive(Args)]
struct LookupArgs {
    #[arg(long)]
    dataset_key: Option<Uuid>,
    #[arg(long)]
    institution_code: Option<String>,
    #[arg(long)]
    institution_id: Option<String>,
    #[arg(long)]
    owner_institution_code: Option<String>,
    #[arg(long)]
    collection_code: Option<String>,
    #[arg(long)]
    collection_id: Option<String>,
    #[arg(long)]
    country: Option<Country>,
    /// Report alternatives even for accepted matches.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Institution,
    Collection,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Institution => EntityKind::Institution,
            KindArg::Collection => EntityKind::Collection,
        }
    }
}

#[derive(Args)]
struct DuplicatesArgs {
    #[arg(long, value_enum)]
    kind: KindArg,
    #[arg(long)]
    same_code: bool,
    #[arg(long)]
    same_name: bool,
    #[arg(long)]
    same_fuzzy_name: bool,
    #[arg(long)]
    same_country: bool,
    #[arg(long)]
    same_city: bool,
    #[arg(long)]
    same_institution_key: bool,
    #[arg(long, value_delimiter = ',')]
    in_countries: Vec<Country>,
    #[arg(long, value_delimiter = ',')]
    not_in_countries: Vec<Country>,
    #[arg(long, value_delimiter = ',')]
    in_institutions: Vec<Uuid>,
    #[arg(long, value_delimiter = ',')]
    not_in_institutions: Vec<Uuid>,
    #[arg(long, value_delimiter = ',')]
    exclude_keys: Vec<Uuid>,
}

impl From<LookupArgs> for LookupParams {
    fn from(args: LookupArgs) -> Self {
        LookupParams {
            dataset_key: args.dataset_key,
            institution_code: args.institution_code,
            institution_id: args.institution_id,
            owner_institution_code: args.owner_institution_code,
            collection_code: args.collection_code,
            collection_id: args.collection_id,
            country: args.country,
            verbose: args.verbose,
        }
    }
}

impl From<DuplicatesArgs> for DuplicatesSearchParams {
    fn from(args: DuplicatesArgs) -> Self {
        DuplicatesSearchParams {
            same_code: args.same_code,
            same_name: args.same_name,
            same_fuzzy_name: args.same_fuzzy_name,
            same_country: args.same_country,
            same_city: args.same_city,
            same_institution_key: args.same_institution_key,
            in_countries: args.in_countries,
            not_in_countries: args.not_in_countries,
            in_institutions: args.in_institutions,
            not_in_institutions: args.not_in_institutions,
            exclude_keys: args.exclude_keys,
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    // .env before the runtime spawns its workers, and before clap reads it
    config::load_env();
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let mut matcher_config = MatcherConfig::from_env()?;
    if let Some(path) = cli.snapshot {
        matcher_config = matcher_config.with_snapshot_path(path);
    }
    let snapshot_path = matcher_config.snapshot_path.clone().with_context(|| {
        format!(
            "No registry snapshot given, use --snapshot or set {}",
            config::SNAPSHOT_ENV_VAR
        )
    })?;

    let start_time = Instant::now();
    let registry = InMemoryRegistry::load(&snapshot_path)?;

    let output = match cli.command {
        Command::Lookup(args) => {
            let params = LookupParams::from(args);
            let service = LookupService::new(registry, matcher_config);
            let result = service.lookup(&params).await?;
            serde_json::to_string_pretty(&result).context("Failed to serialize lookup result")?
        }
        Command::Duplicates(args) => {
            let kind = EntityKind::from(args.kind);
            let params = DuplicatesSearchParams::from(args);
            let service = DuplicatesService::new(registry);
            let result = service.find_possible_duplicates(kind, &params).await?;
            serde_json::to_string_pretty(&result)
                .context("Failed to serialize duplicates result")?
        }
    };

    println!("{}", output);
    info!("Done in {:.2?}", start_time.elapsed());
    Ok(())
}
