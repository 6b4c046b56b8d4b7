//! linkmap CLI - barrier detection and network centrality for connectivity modelling

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use linkmap_algorithms::barriers::run_barriers;
use linkmap_algorithms::circuit::{run_centrality, Circuitscape};
use linkmap_algorithms::engine::{LocalEngine, RasterEngine};
use linkmap_algorithms::network::{build_graph, component_count, find_components};
use linkmap_core::config::ProjectConfig;
use linkmap_core::LinkTable;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "linkmap")]
#[command(author, version, about = "Corridor barrier detection and network centrality", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map barriers along corridors at one or more search radii (step 6)
    Barriers(BarrierArgs),
    /// Compute current-flow centrality of cores and links (step 7)
    Centrality(CentralityArgs),
    /// Summarize a link table
    Links {
        /// Link table file
        input: PathBuf,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

#[derive(Args)]
struct BarrierArgs {
    /// Project file
    #[arg(short, long)]
    config: PathBuf,
    /// Sum benefits across core pairs instead of taking the maximum
    #[arg(long, conflicts_with = "max")]
    sum: bool,
    /// Take the maximum benefit across core pairs
    #[arg(long)]
    max: bool,
    /// First search radius, in map units
    #[arg(long)]
    start_radius: Option<u32>,
    /// Last search radius, in map units
    #[arg(long)]
    end_radius: Option<u32>,
    /// Radius increment; 0 runs the start radius only
    #[arg(long)]
    radius_step: Option<u32>,
    /// Also write benefit as a percentage of corridor cost distance
    #[arg(long)]
    pct: bool,
    /// Also write circles trimmed by per-cell resistance
    #[arg(long)]
    trim: bool,
    /// Keep per-pair barrier rasters
    #[arg(long)]
    save_barrier_rasters: bool,
    /// Keep focal minimum rasters
    #[arg(long)]
    save_focal_rasters: bool,
}

#[derive(Args)]
struct CentralityArgs {
    /// Project file
    #[arg(short, long)]
    config: PathBuf,
    /// Core attribute table (CSV)
    #[arg(long)]
    core_table: Option<PathBuf>,
    /// Column holding core ids
    #[arg(long)]
    core_field: Option<String>,
    /// Circuitscape executable
    #[arg(long)]
    solver: Option<PathBuf>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_project(path: &PathBuf) -> Result<ProjectConfig> {
    ProjectConfig::load(path)
        .with_context(|| format!("Failed to read project file {}", path.display()))
}

/// Keep user input errors as plain messages; give tool failures the stage context
fn stage_error(stage: &'static str) -> impl Fn(linkmap_core::Error) -> anyhow::Error {
    move |e| {
        if e.is_user_facing() {
            anyhow::anyhow!("{}", e)
        } else {
            anyhow::Error::new(e).context(stage)
        }
    }
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Commands ───────────────────────────────────────────────────────────

fn barriers(args: BarrierArgs) -> Result<()> {
    let mut project = load_project(&args.config)?;
    let settings = project
        .barriers
        .as_mut()
        .context("Project file has no [barriers] table")?;
    if args.sum {
        settings.sum_barriers = true;
    }
    if args.max {
        settings.sum_barriers = false;
    }
    if let Some(r) = args.start_radius {
        settings.start_radius = r;
    }
    if let Some(r) = args.end_radius {
        settings.end_radius = r;
    }
    if let Some(s) = args.radius_step {
        settings.radius_step = s;
    }
    settings.write_pct_rasters |= args.pct;
    settings.write_trim_rasters |= args.trim;
    settings.save_barrier_rasters |= args.save_barrier_rasters;
    settings.save_focal_rasters |= args.save_focal_rasters;

    let config = project
        .barrier_config()
        .map_err(stage_error("Invalid barrier settings"))?;

    let start = Instant::now();
    let pb = spinner("Mapping barriers...");
    let result = run_barriers(&config, &LocalEngine::new());
    pb.finish_and_clear();
    let report = result.map_err(stage_error("step 6 barrier detection failed"))?;
    let elapsed = start.elapsed();

    for (radius, pairs) in &report.radii {
        info!("Radius {}: {} core pairs", radius, pairs);
    }
    for output in &report.outputs {
        println!("  {}", output.display());
    }
    done("Link table", &report.link_table, elapsed);
    Ok(())
}

fn centrality(args: CentralityArgs) -> Result<()> {
    let mut project = load_project(&args.config)?;
    if let Some(table) = args.core_table {
        project.centrality.core_table = Some(table);
    }
    if let Some(field) = args.core_field {
        project.centrality.core_field = field;
    }
    if let Some(solver) = args.solver {
        project.centrality.solver_path = Some(solver);
    }

    let config = project
        .centrality_config()
        .map_err(stage_error("Invalid centrality settings"))?;
    let solver = Circuitscape::locate(config.solver_path.as_deref())
        .map_err(stage_error("step 7 centrality failed"))?;
    info!("Using Circuitscape at {}", solver.program().display());

    let start = Instant::now();
    let pb = spinner("Calculating current flow centrality...");
    let result = run_centrality(&config, &solver);
    pb.finish_and_clear();
    let report = result.map_err(stage_error("step 7 centrality failed"))?;
    let elapsed = start.elapsed();

    info!(
        "{} cores in {} components; {} links received a current",
        report.nodes, report.components, report.links_updated
    );
    println!("Core table saved to: {}", report.core_table.display());
    done("Link table", &report.link_table, elapsed);
    Ok(())
}

fn links(input: PathBuf) -> Result<()> {
    let table = LinkTable::load(&input).context("Failed to read link table")?;
    let active = table.count_active_corridor_links();
    let cores = table.core_ids();

    println!("File: {}", input.display());
    println!(
        "Links: {} ({} active corridors)",
        table.len(),
        active
    );
    println!("Core areas: {}", cores.len());
    if table.was_widened() {
        println!("Layout: base columns only (no analysis results yet)");
    }

    match build_graph(table.rows()) {
        Ok(graph) => {
            let labels = find_components(&graph);
            println!(
                "Network: {} cores, {} edges, {} connected components",
                graph.node_count(),
                graph.edge_count(),
                component_count(&labels)
            );
        }
        Err(e) => println!("Network: {}", e),
    }
    Ok(())
}

fn raster_info(input: PathBuf) -> Result<()> {
    let pb = spinner("Reading raster...");
    let raster = LocalEngine::new()
        .load(&input)
        .context("Failed to read raster")?;
    pb.finish_and_clear();

    let (rows, cols) = raster.shape();
    let stats = raster.statistics();
    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
    println!("Cell size: {}", raster.cell_size());
    let t = raster.transform();
    println!("Origin: ({:.6}, {:.6})", t.origin_x, t.origin_y);
    println!(
        "Valid cells: {} ({} null)",
        stats.valid_count, stats.null_count
    );
    if let (Some(min), Some(max), Some(mean)) = (stats.min, stats.max, stats.mean) {
        println!("Min: {:.6}  Max: {:.6}  Mean: {:.6}", min, max, mean);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Barriers(args) => barriers(args),
        Commands::Centrality(args) => centrality(args),
        Commands::Links { input } => links(input),
        Commands::Info { input } => raster_info(input),
    }
}
