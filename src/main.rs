use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fertility_atlas::config::AppConfig;
use fertility_atlas::processing::{build_table_view, build_view, MarkerStyle};
use fertility_atlas::types::{Dataset, Filter, MissingValues, TableScope, ViewRequest};
use fertility_atlas::{data, export, server};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print fertility-rate series for the chosen countries as JSON
    Series {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        range: RangeArgs,
        /// Emit missing years as null instead of 0.0
        #[arg(long)]
        gaps: bool,
    },
    /// Print map markers for one year as JSON
    Points {
        #[command(flatten)]
        common: CommonArgs,
        /// Year to plot (defaults to view.default_year, then the last year)
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Print a table slice as CSV
    Table {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        table: TableArgs,
    },
    /// Write a table slice to a CSV file
    Export {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        table: TableArgs,
        /// Output file (defaults to output.export_path)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Serve the views over HTTP
    Serve {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,
}

#[derive(Args)]
struct RangeArgs {
    /// Country name, repeat to select several (order is kept)
    #[arg(long = "country", value_name = "NAME")]
    countries: Vec<String>,
    /// First year of the range (defaults to the first year in the data)
    #[arg(long)]
    start: Option<i32>,
    /// Last year of the range (defaults to the last year in the data)
    #[arg(long)]
    end: Option<i32>,
}

#[derive(Args)]
struct TableArgs {
    #[command(flatten)]
    range: RangeArgs,
    /// Include every row regardless of --country
    #[arg(long)]
    full: bool,
    /// Keep only the first N rows
    #[arg(long, value_name = "N")]
    head: Option<usize>,
}

impl RangeArgs {
    fn filter(&self, dataset: &Dataset) -> Result<Filter> {
        let range = dataset.resolve_range(self.start, self.end)?;
        Ok(Filter::new(self.countries.clone(), range))
    }
}

impl TableArgs {
    fn scope(&self) -> TableScope {
        if self.full {
            TableScope::Full
        } else {
            TableScope::Selected
        }
    }
}

fn load(common: &CommonArgs) -> Result<(AppConfig, Dataset)> {
    let app_config = AppConfig::load_from_file(&common.config)?;
    let dataset = data::load_dataset(&app_config.input).context("Failed to load dataset")?;
    Ok((app_config, dataset))
}

fn marker_style(config: &AppConfig) -> MarkerStyle {
    MarkerStyle {
        scale: config.view.marker_scale,
        precision: config.view.label_precision,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the views, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Series {
            common,
            range,
            gaps,
        } => {
            let (app_config, dataset) = load(common)?;
            let missing = if *gaps {
                MissingValues::Gap
            } else {
                app_config.view.missing_values
            };
            let request = ViewRequest::Series {
                filter: range.filter(&dataset)?,
                missing,
            };
            let view = build_view(&dataset, &request, &marker_style(&app_config))?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Commands::Points { common, year } => {
            let (app_config, dataset) = load(common)?;
            let year = year
                .or(app_config.view.default_year)
                .unwrap_or(dataset.last_year);
            let request = ViewRequest::Points { year };
            let view = build_view(&dataset, &request, &marker_style(&app_config))?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Commands::Table { common, table } => {
            let (_, dataset) = load(common)?;
            let filter = table.range.filter(&dataset)?;
            let slice = build_table_view(&dataset, &filter, table.scope(), table.head)?;
            let bytes = export::table_to_csv(&slice)?;
            std::io::stdout().write_all(&bytes)?;
        }
        Commands::Export {
            common,
            table,
            output,
        } => {
            let (app_config, dataset) = load(common)?;
            let filter = table.range.filter(&dataset)?;
            let slice = build_table_view(&dataset, &filter, table.scope(), table.head)?;
            let path = output
                .clone()
                .unwrap_or_else(|| app_config.output.export_path.clone());
            export::write_table_csv(&slice, &path)?;
            info!("Exported {} rows to {:?}", slice.rows.len(), path);
        }
        Commands::Serve { common } => {
            let (app_config, dataset) = load(common)?;
            server::start_server(app_config, dataset).await?;
        }
    }

    Ok(())
}
