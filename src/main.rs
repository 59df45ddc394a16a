use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use placement_stats::db::{self, PgDocumentStore};
use placement_stats::models::{
    ChartSeries, Dashboard, EmploymentType, NewPlacement, PlacementStatus, Scope,
};
use placement_stats::records::ManualEntry;
use placement_stats::service::{ImportSummary, StatsService};
use placement_stats::store::{DocumentStore, MemoryStore};
use placement_stats::{coerce, config, export, import, placements, report, telemetry};

#[derive(Parser)]
#[command(name = "placement-stats")]
#[command(about = "Department placement statistics and off-campus placement tracker", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: config::Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample yearly stats and placements
    Seed,
    /// Bulk import yearly stats from a .csv or spreadsheet file
    Import {
        #[arg(long)]
        file: PathBuf,
        /// Parse and aggregate the file without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Save one year's stats, replacing any existing record for that year
    Upsert {
        #[arg(long)]
        year: String,
        #[arg(long, default_value = "")]
        eligible: String,
        #[arg(long, default_value = "")]
        placed: String,
        #[arg(long, default_value = "")]
        higher_studies: String,
    },
    /// Show stat cards and chart series for all years or one year
    Stats {
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Package, employment type, domain and company distributions
    Insights {
        #[arg(long)]
        json: bool,
    },
    /// Manage off-campus placements
    Placement {
        #[command(subcommand)]
        action: PlacementAction,
    },
    /// Write a CSV export
    Export {
        #[arg(value_enum)]
        what: ExportKind,
        #[arg(long)]
        out: PathBuf,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        year: Option<String>,
        #[arg(long, default_value = "placement-report.md")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum PlacementAction {
    Add {
        #[arg(long)]
        student: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long)]
        company: String,
        #[arg(long)]
        role: String,
        /// Annual package in LPA; omit when not disclosed
        #[arg(long)]
        package: Option<String>,
        #[arg(long, default_value = "Full-time")]
        employment_type: String,
        #[arg(long, default_value = "")]
        domain: String,
        /// YYYY-MM-DD
        #[arg(long)]
        offer_date: NaiveDate,
        #[arg(long, default_value = "pending")]
        status: String,
        #[arg(long)]
        document_url: Option<String>,
    },
    List {
        #[arg(long)]
        status: Option<String>,
    },
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    Yearly,
    Placements,
}

fn print_dashboard(dashboard: &Dashboard) {
    println!("Placement stats for {}:", dashboard.scope);
    if let Some(notice) = &dashboard.notice {
        println!("{notice}");
    }

    let summary = &dashboard.summary;
    println!("- Eligible: {}", summary.total);
    println!("- Placed: {} ({}%)", summary.placed, summary.percentage);
    println!("- Higher studies: {}", summary.higher_studies);
    println!("- Average yearly rate: {}%", summary.avg_yearly_rate);

    match &dashboard.chart {
        ChartSeries::StackedBar(bars) => {
            for bar in bars {
                println!(
                    "  {} placed {} | higher studies {}",
                    bar.year, bar.placed, bar.higher_studies
                );
            }
        }
        ChartSeries::Pie(slices) => {
            for slice in slices {
                println!("  {}: {}", slice.name, slice.value);
            }
        }
    }
}

fn print_import_summary(summary: &ImportSummary, file: &Path) {
    println!(
        "Imported {} year(s) from {} ({} row(s) skipped without a year).",
        summary.written.len(),
        file.display(),
        summary.skipped
    );
    if !summary.over_counted.is_empty() {
        println!(
            "Warning: placed + higher studies exceeds eligible for {}.",
            summary.over_counted.join(", ")
        );
    }
}

async fn preview_import(file: &Path) -> anyhow::Result<()> {
    let parsed = import::read_file(file)?;
    let preview = StatsService::new(Arc::new(MemoryStore::new()));
    let summary = preview.import(parsed).await?;

    print_import_summary(&summary, file);
    print_dashboard(&preview.dashboard(&Scope::AllYears).await);
    println!("Dry run: nothing was written.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    telemetry::init_tracing(env!("CARGO_CRATE_NAME"), &cli.config.log_level);

    if let Commands::Import {
        file,
        dry_run: true,
    } = &cli.command
    {
        return preview_import(file).await;
    }

    let pool = cli.config.connect().await?;
    let store: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(pool.clone()));
    let stats = StatsService::new(Arc::clone(&store));

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&stats, store.as_ref()).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { file, .. } => {
            let parsed = import::read_file(&file)?;
            let summary = stats.import(parsed).await?;
            print_import_summary(&summary, &file);
        }
        Commands::Upsert {
            year,
            eligible,
            placed,
            higher_studies,
        } => {
            let record = ManualEntry {
                year,
                eligible,
                placed,
                higher_studies,
            }
            .into_record()?;
            stats.upsert(record.clone()).await?;
            println!(
                "Saved {}: eligible {}, placed {}, higher studies {}, unplaced {}.",
                record.year,
                record.eligible,
                record.placed,
                record.higher_studies,
                record.unplaced
            );
        }
        Commands::Stats { year, json } => {
            let scope = Scope::from_option(year.as_deref());
            let dashboard = stats.dashboard(&scope).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                print_dashboard(&dashboard);
            }
        }
        Commands::Insights { json } => {
            let insights = placements::insights(store.as_ref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&insights)?);
            } else {
                println!("Package ranges:");
                for bucket in &insights.package_ranges {
                    println!("- {}: {}", bucket.range, bucket.count);
                }
                println!("Employment types:");
                for entry in &insights.employment_types {
                    println!("- {}: {}", entry.name, entry.count);
                }
                println!("Top domains:");
                for entry in &insights.top_domains {
                    println!("- {}: {}", entry.name, entry.count);
                }
                println!("Top companies:");
                for entry in &insights.top_companies {
                    println!("- {}: {}", entry.company, entry.count);
                }
            }
        }
        Commands::Placement { action } => match action {
            PlacementAction::Add {
                student,
                email,
                company,
                role,
                package,
                employment_type,
                domain,
                offer_date,
                status,
                document_url,
            } => {
                let new = NewPlacement {
                    student_name: student,
                    student_email: email,
                    company,
                    role,
                    package: package.as_deref().and_then(coerce::package_from_str),
                    employment_type: employment_type
                        .parse::<EmploymentType>()
                        .map_err(anyhow::Error::msg)?,
                    domain,
                    offer_date,
                    status: status
                        .parse::<PlacementStatus>()
                        .map_err(anyhow::Error::msg)?,
                    document_url,
                };
                let placement = placements::create(store.as_ref(), new).await?;
                println!(
                    "Recorded {} at {} ({}).",
                    placement.student_name, placement.company, placement.id
                );
            }
            PlacementAction::List { status } => {
                let listed = match status {
                    Some(status) => {
                        let status = status
                            .parse::<PlacementStatus>()
                            .map_err(anyhow::Error::msg)?;
                        placements::list_by_status(store.as_ref(), status).await?
                    }
                    None => placements::list(store.as_ref()).await?,
                };

                if listed.is_empty() {
                    println!("No placements recorded.");
                    return Ok(());
                }

                for placement in &listed {
                    let package = placement
                        .package
                        .map(|value| format!("{value} LPA"))
                        .unwrap_or_else(|| "Not Disclosed".to_string());
                    println!(
                        "- {} {} at {} as {} [{}] {} ({}) {}",
                        placement.offer_date,
                        placement.student_name,
                        placement.company,
                        placement.role,
                        placement.employment_type.label(),
                        package,
                        placement.status.as_str(),
                        placement.id
                    );
                }
            }
            PlacementAction::Delete { id } => {
                if placements::delete(store.as_ref(), id).await? {
                    println!("Deleted {id}.");
                } else {
                    println!("No placement with id {id}.");
                }
            }
        },
        Commands::Export { what, out } => {
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let rows = match what {
                ExportKind::Yearly => {
                    let records = stats.records().await?;
                    export::export_yearly(&records, file)?
                }
                ExportKind::Placements => {
                    let listed = placements::list(store.as_ref()).await?;
                    export::export_placements(&listed, file)?
                }
            };
            println!("Wrote {rows} row(s) to {}.", out.display());
        }
        Commands::Report { year, out } => {
            let scope = Scope::from_option(year.as_deref());
            let records = stats.records_or_empty().await;
            let listed = match placements::list(store.as_ref()).await {
                Ok(listed) => listed,
                Err(e) => {
                    tracing::error!(error = %e, "failed to load placements for report");
                    Vec::new()
                }
            };
            let report = report::build_report(&scope, &records, &listed);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
