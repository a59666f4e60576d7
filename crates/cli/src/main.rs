use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use trendy_core::{
    apply_request_filters, field_pie_chart, EpisodeSet, RecordStore, RequestContext, Schema,
    TrendConfig, TrendRegistry,
};

#[derive(Parser)]
#[command(name = "trendy")]
#[command(about = "Trend charts over clinical episode records")]
struct Cli {
    /// Subrecord schema YAML (defaults to the built-in schema)
    #[arg(long, global = true)]
    schema: Option<PathBuf>,
    /// Trend configuration YAML
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Request path with any drill-down filters already applied
    #[arg(long, global = true, default_value = "/")]
    path: String,
    /// Date ages are measured from (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered trend kinds
    Slugs,
    /// Print a trend's chart data
    Graph {
        /// Record store JSON
        store: PathBuf,
        /// Trend selector, e.g. allergies__fkftquery__drug
        token: String,
    },
    /// List the episodes in one bucket of a trend
    Query {
        /// Record store JSON
        store: PathBuf,
        /// Trend selector
        token: String,
        /// Bucket value, e.g. "20 - 40"
        value: String,
    },
    /// Print a trend's label and a bucket description
    Describe {
        /// Trend selector
        token: String,
        /// Bucket value (optional)
        value: Option<String>,
    },
    /// Count subrecord rows by one column
    FieldPie {
        /// Record store JSON
        store: PathBuf,
        /// Subrecord api name
        subrecord: String,
        /// Column name, e.g. drug_fk
        column: String,
    },
}

fn registry(cli: &Cli) -> Result<TrendRegistry, Box<dyn std::error::Error>> {
    let schema = match &cli.schema {
        Some(path) => Schema::load(path)?,
        None => Schema::opal_default()?,
    };
    let mut config = match &cli.config {
        Some(path) => TrendConfig::load(path)?,
        None => TrendConfig::default(),
    };
    if let Some(today) = cli.today {
        config = config.with_today(today);
    }
    Ok(TrendRegistry::builtin(Arc::new(schema), Arc::new(config))?)
}

fn episodes(path: &Path) -> Result<EpisodeSet, Box<dyn std::error::Error>> {
    let store = RecordStore::load(path)?;
    Ok(EpisodeSet::all(Arc::new(store)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let registry = registry(&cli)?;
    let request = RequestContext::new(cli.path.clone());

    match &cli.command {
        Some(Commands::Slugs) => {
            for kind in registry.kinds() {
                println!("{}\t{}", kind.slug, kind.display_name);
            }
        }
        Some(Commands::Graph { store, token }) => {
            let drill = apply_request_filters(&registry, &request, &episodes(store)?)?;
            for description in drill.descriptions() {
                println!("# {}", description);
            }

            let trend = registry.from_get_param(token, &request)?;
            let output = trend.get_graph_data(&drill.episodes)?;
            println!("{}", trend.label());
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Some(Commands::Query {
            store,
            token,
            value,
        }) => {
            let drill = apply_request_filters(&registry, &request, &episodes(store)?)?;
            let trend = registry.from_get_param(token, &request)?;
            let narrowed = trend.query(value, &drill.episodes)?;

            println!("{}", trend.get_description(Some(value)));
            if narrowed.is_empty() {
                println!("No episodes found.");
            } else {
                for episode in narrowed.episodes() {
                    println!("Episode: {}, Patient: {}", episode.id, episode.patient_id);
                }
            }
        }
        Some(Commands::Describe { token, value }) => {
            let trend = registry.from_get_param(token, &request)?;
            println!("{}", trend.label());
            println!("{}", trend.get_description(value.as_deref()));
            if let Some(value) = value {
                println!("{}", trend.to_link(value));
            }
        }
        Some(Commands::FieldPie {
            store,
            subrecord,
            column,
        }) => {
            let subrecord = registry.schema().subrecord(subrecord)?;
            let drill = apply_request_filters(&registry, &request, &episodes(store)?)?;
            let data = field_pie_chart(&drill.episodes, subrecord, column);
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        None => {
            println!("Use 'trendy --help' for commands");
        }
    }

    Ok(())
}
