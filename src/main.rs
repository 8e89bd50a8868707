//! Factory Planner
//!
//! A production plan calculator for factory-building games.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::Connection;
use tracing::{debug, error, trace};
use tracing_subscriber::EnvFilter;

use factory_planner::config::Config;
use factory_planner::{calculator, db, import, report, sample};
use factory_planner::{PlanOptions, PlanRequest, SqliteCatalog};

#[derive(Parser)]
#[command(name = "factory-planner")]
#[command(about = "Production plan calculator for factory-building games")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Replace a tenant's catalogue with the built-in sample
    LoadSample {
        #[arg(short, long)]
        tenant: Option<i64>,
    },

    /// Import JSON catalogue documents from a file or directory
    Import {
        path: PathBuf,

        #[arg(short, long)]
        tenant: Option<i64>,

        /// Clear the tenant's catalogue before importing
        #[arg(long)]
        clear: bool,
    },

    /// Calculate the production plan for a target resource
    Calc {
        /// Target resource to produce (e.g., "reinforced_iron_plate")
        resource: String,

        /// Target production rate in units per second
        #[arg(short, long, default_value = "1.0")]
        rate: f64,

        #[arg(short, long)]
        tenant: Option<i64>,

        /// Alternate recipe to consider (repeatable)
        #[arg(long = "alt-recipe")]
        alt_recipes: Vec<String>,

        /// Alternate machine to consider (repeatable)
        #[arg(long = "alt-machine")]
        alt_machines: Vec<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary)]
        format: OutputFormat,
    },

    /// List all recipes of a tenant
    ListRecipes {
        #[arg(short, long)]
        tenant: Option<i64>,
    },

    /// List all machines of a tenant
    ListMachines {
        #[arg(short, long)]
        tenant: Option<i64>,
    },

    /// List all resources of a tenant and whether a recipe produces them
    ListResources {
        #[arg(short, long)]
        tenant: Option<i64>,
    },

    /// Show details for a specific recipe
    Recipe {
        name: String,

        #[arg(short, long)]
        tenant: Option<i64>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Tree,
    Summary,
}

fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_line_number(verbose >= 3)
        .init();

    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database.path = database;
    }
    init_logging(cli.verbose, &config);
    debug!(?config, "configuration loaded");

    let conn = Connection::open(&config.database.path)?;
    db::init_schema(&conn)?;

    let tenant_or_default = |tenant: Option<i64>| tenant.unwrap_or(config.planner.default_tenant);

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", config.database.path.display());
        }

        Commands::LoadSample { tenant } => {
            let tenant = tenant_or_default(tenant);
            let stats = sample::load_sample_data(&conn, tenant)?;
            println!("Sample data loaded for tenant {}: {}", tenant, stats);
        }

        Commands::Import {
            path,
            tenant,
            clear,
        } => {
            let tenant = tenant_or_default(tenant);
            if clear {
                println!("Clearing existing data for tenant {}...", tenant);
                db::clear_tenant_data(&conn, tenant)?;
            }

            let stats = import::import_path(&conn, tenant, &path)?;
            println!("{}", stats);
        }

        Commands::Calc {
            resource,
            rate,
            tenant,
            alt_recipes,
            alt_machines,
            format,
        } => {
            let request = PlanRequest::new(tenant_or_default(tenant), resource, rate)
                .with_alt_recipes(alt_recipes)
                .with_alt_machines(alt_machines);
            let options = PlanOptions {
                max_depth: config.planner.max_depth,
            };

            let catalog = SqliteCatalog::new(&conn);
            let plan = match calculator::calculate(&catalog, &request, &options) {
                Ok(plan) => plan,
                Err(err) => {
                    error!(client_error = err.is_client_error(), "calculation failed: {err}");
                    eprintln!(
                        "Could not generate production plan for '{}': {}",
                        request.resource, err
                    );
                    return Ok(ExitCode::from(err.exit_code()));
                }
            };

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
                OutputFormat::Tree => {
                    println!("Production plan:\n");
                    print!("{}", report::format_plan_tree(&plan));
                }
                OutputFormat::Summary => println!("{}", report::summarize_plan(&plan)),
            }
        }

        Commands::ListRecipes { tenant } => {
            let recipes = db::list_recipes(&conn, tenant_or_default(tenant))?;
            if recipes.is_empty() {
                println!("No recipes in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<28} {:>8} {:>8}", "Recipe", "Time (s)", "Default");
                println!("{}", "-".repeat(46));
                for r in recipes {
                    println!(
                        "{:<28} {:>8.1} {:>8}",
                        r.name,
                        r.production_time_s,
                        if r.default_choice { "yes" } else { "" }
                    );
                }
            }
        }

        Commands::ListMachines { tenant } => {
            let machines = db::list_machines(&conn, tenant_or_default(tenant))?;
            if machines.is_empty() {
                println!("No machines in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<20} {:>6} {:>10} {:>8}", "Machine", "Speed", "Power (kW)", "Default");
                println!("{}", "-".repeat(47));
                for m in machines {
                    println!(
                        "{:<20} {:>6.2} {:>10.1} {:>8}",
                        m.name,
                        m.speed,
                        m.power_kw,
                        if m.default_choice { "yes" } else { "" }
                    );
                }
            }
        }

        Commands::ListResources { tenant } => {
            let tenant = tenant_or_default(tenant);
            let resources = db::list_resources(&conn, tenant)?;
            if resources.is_empty() {
                println!("No resources in database. Run 'import' or 'load-sample' first.");
            } else {
                let producible = db::list_producible_resources(&conn, tenant)?;
                println!("{:<24} {:>6} {:>6} {:>10}", "Resource", "Liquid", "Unit", "Producible");
                println!("{}", "-".repeat(49));
                for r in resources {
                    println!(
                        "{:<24} {:>6} {:>6} {:>10}",
                        r.name,
                        if r.liquid { "yes" } else { "" },
                        r.unit,
                        if producible.contains(&r.name) { "yes" } else { "no" }
                    );
                }
            }
        }

        Commands::Recipe { name, tenant } => {
            let tenant = tenant_or_default(tenant);
            if let Some(r) = db::find_recipe(&conn, tenant, &name)? {
                println!("Recipe: {}", r.name);
                println!("  Production time: {}s", r.production_time_s);
                println!("  Default: {}", r.default_choice);

                if !r.inputs.is_empty() {
                    println!("  Inputs:");
                    for i in &r.inputs {
                        println!("    {} x{}", i.resource, i.amount);
                    }
                }
                println!("  Outputs:");
                for o in &r.outputs {
                    println!("    {} x{}", o.resource, o.amount);
                }

                let machines = db::machines_for_recipe(&conn, tenant, r.id)?;
                if !machines.is_empty() {
                    println!("  Machines:");
                    for m in machines {
                        println!("    {} (speed {}, {} kW)", m.name, m.speed, m.power_kw);
                    }
                }
            } else {
                println!("Recipe '{}' not found", name);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
