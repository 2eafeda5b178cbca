use als::ColdStartStrategy;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use data_loader::{InteractionStore, ItemCatalog, UserId, parser};
use orchestrator::{
    EnrichedRecommendation, RecommendationOrchestrator, WorkflowConfig, WorkflowReport,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// ALS matrix factorization recommender
#[derive(Parser)]
#[command(name = "als-recs")]
#[command(about = "Train an ALS recommender on explicit ratings, evaluate it and recommend", long_about = None)]
struct Cli {
    /// Ratings file: userId, itemId, rating per line, separated by `::`, `,` or tab
    #[arg(short, long, default_value = "data/ml-1m/ratings.dat")]
    ratings: PathBuf,

    /// Optional item file (itemId, title, ...) used to show titles
    #[arg(short, long)]
    items: Option<PathBuf>,

    /// JSON workflow configuration; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: AlsOverrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct AlsOverrides {
    /// Latent factor dimensionality
    #[arg(long, global = true)]
    rank: Option<usize>,

    #[arg(long, global = true)]
    max_iterations: Option<usize>,

    /// Regularization strength λ
    #[arg(long, global = true)]
    regularization: Option<f64>,

    /// `drop` or `nan`
    #[arg(long, global = true)]
    cold_start_strategy: Option<ColdStartStrategy>,

    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Early stop when the objective changes by less than this; 0 disables
    #[arg(long, global = true)]
    tolerance: Option<f64>,

    /// Stop training after this many seconds, keeping the last full iteration
    #[arg(long, global = true)]
    time_limit_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Split, train, evaluate and recommend for every user
    Run {
        #[arg(long)]
        train_fraction: Option<f64>,

        /// Recommendations per user
        #[arg(long)]
        top_k: Option<usize>,

        /// Drop recommendations predicted below this score
        #[arg(long)]
        min_score: Option<f64>,

        /// Write the full report as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Split, train and report held-out RMSE
    Evaluate {
        #[arg(long)]
        train_fraction: Option<f64>,
    },

    /// Train on all ratings and recommend for one user
    Recommend {
        #[arg(long)]
        user_id: UserId,

        #[arg(long)]
        top_k: Option<usize>,

        /// Drop recommendations predicted below this score
        #[arg(long)]
        min_score: Option<f64>,
    },

    /// Show a user's rating history
    User {
        #[arg(long)]
        user_id: UserId,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    cli.overrides.apply(&mut config);

    println!("Loading ratings from {}...", cli.ratings.display());
    let start = Instant::now();
    let store = Arc::new(
        InteractionStore::load_from_file(&cli.ratings).context("Failed to load ratings")?,
    );
    let (users, items, interactions) = store.counts();
    println!(
        "{} Loaded {} ratings ({} users, {} items) in {:?}",
        "✓".green(),
        interactions,
        users,
        items,
        start.elapsed()
    );

    let catalog = match &cli.items {
        Some(path) => Some(Arc::new(
            parser::parse_items(path).context("Failed to load item catalog")?,
        )),
        None => None,
    };

    match cli.command {
        Commands::Run {
            train_fraction,
            top_k,
            min_score,
            output,
        } => {
            if let Some(fraction) = train_fraction {
                config.train_fraction = fraction;
            }
            if let Some(k) = top_k {
                config.top_k = k;
            }
            if min_score.is_some() {
                config.min_score = min_score;
            }
            handle_run(store, catalog, config, output.as_deref()).await?
        }
        Commands::Evaluate { train_fraction } => {
            if let Some(fraction) = train_fraction {
                config.train_fraction = fraction;
            }
            handle_evaluate(store, config).await?
        }
        Commands::Recommend {
            user_id,
            top_k,
            min_score,
        } => {
            if min_score.is_some() {
                config.min_score = min_score;
            }
            let k = top_k.unwrap_or(config.top_k);
            handle_recommend(store, catalog, config, user_id, k).await?
        }
        Commands::User { user_id } => handle_user(&store, catalog.as_deref(), user_id),
    }

    Ok(())
}

impl AlsOverrides {
    fn apply(&self, config: &mut WorkflowConfig) {
        if let Some(rank) = self.rank {
            config.als.rank = rank;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.als.max_iterations = max_iterations;
        }
        if let Some(regularization) = self.regularization {
            config.als.regularization = regularization;
        }
        if let Some(strategy) = self.cold_start_strategy {
            config.als.cold_start_strategy = strategy;
        }
        if let Some(seed) = self.seed {
            config.als.seed = seed;
        }
        if let Some(tolerance) = self.tolerance {
            config.als.tolerance = tolerance;
        }
        if self.time_limit_secs.is_some() {
            config.time_limit_secs = self.time_limit_secs;
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<WorkflowConfig> {
    let Some(path) = path else {
        return Ok(WorkflowConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

/// Build the orchestrator and cancel training on Ctrl-C
fn build_orchestrator(
    store: Arc<InteractionStore>,
    catalog: Option<Arc<ItemCatalog>>,
    config: WorkflowConfig,
) -> Result<RecommendationOrchestrator> {
    let mut orchestrator = RecommendationOrchestrator::new(store, config)?;
    if let Some(catalog) = catalog {
        orchestrator = orchestrator.with_catalog(catalog);
    }

    let token = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current iteration");
            token.cancel();
        }
    });

    Ok(orchestrator)
}

/// Handle the 'run' command
async fn handle_run(
    store: Arc<InteractionStore>,
    catalog: Option<Arc<ItemCatalog>>,
    config: WorkflowConfig,
    output: Option<&Path>,
) -> Result<()> {
    let orchestrator = build_orchestrator(store, catalog, config)?;
    let report = orchestrator.run().await?;

    print_training(&report.training);
    print_rmse(report.evaluation.rmse, report.evaluation.skipped);
    print_recommendations(&report.recommendations);

    if let Some(path) = output {
        write_report(path, &report)?;
        info!(path = %path.display(), "Wrote workflow report");
    }
    Ok(())
}

/// Handle the 'evaluate' command
async fn handle_evaluate(store: Arc<InteractionStore>, config: WorkflowConfig) -> Result<()> {
    let orchestrator = build_orchestrator(store, None, config)?;
    let run = orchestrator.evaluate().await?;

    println!(
        "Split: {} training / {} held out",
        run.training_interactions, run.evaluation_interactions
    );
    print_training(&run.training);
    print_rmse(run.evaluation.rmse, run.evaluation.skipped);
    Ok(())
}

/// Handle the 'recommend' command
async fn handle_recommend(
    store: Arc<InteractionStore>,
    catalog: Option<Arc<ItemCatalog>>,
    config: WorkflowConfig,
    user_id: UserId,
    k: usize,
) -> Result<()> {
    if !store.contains_user(user_id) {
        println!(
            "{} User {} has no ratings; no recommendations are produced for unseen users",
            "!".yellow(),
            user_id
        );
        return Ok(());
    }

    let orchestrator = build_orchestrator(store, catalog, config)?;
    let result = orchestrator.recommend_for_user(user_id, k).await?;

    print_training(&result.training);
    print_recommendations(&result.recommendations);
    Ok(())
}

/// Handle the 'user' command
fn handle_user(store: &InteractionStore, catalog: Option<&ItemCatalog>, user_id: UserId) {
    let ratings = store.get_user_ratings(user_id);
    println!("{}", format!("User ID: {}", user_id).bold().blue());
    if ratings.is_empty() {
        println!("{}No ratings", "• ".green());
        return;
    }

    let average = ratings.iter().map(|&(_, rating)| rating).sum::<f64>() / ratings.len() as f64;
    println!("{}Number of ratings: {}", "• ".cyan(), ratings.len());
    println!("{}Average rating: {:.2}", "• ".cyan(), average);

    let mut top_rated = ratings.to_vec();
    top_rated.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    println!("Top rated items:");
    for (item_id, rating) in top_rated.iter().take(10) {
        println!("  - {} (Rating: {})", display_item(catalog, *item_id), rating);
    }
}

fn display_item(catalog: Option<&ItemCatalog>, item_id: u32) -> String {
    match catalog.and_then(|catalog| catalog.get_title(item_id)) {
        Some(title) => format!("{} [{}]", title, item_id),
        None => format!("Item {}", item_id),
    }
}

fn print_training(report: &als::TrainingReport) {
    let status = if report.converged {
        "converged".green()
    } else {
        "did not converge".yellow()
    };
    println!(
        "{} Trained {} iterations ({:?}), {} in {:.2?}",
        "✓".green(),
        report.iterations,
        report.stop_reason,
        status,
        report.elapsed
    );
    if let Some(objective) = report.final_objective() {
        println!("  Final objective: {:.4}", objective);
    }
    if report.instability_events > 0 {
        println!(
            "  {} {} factor rows were reset after failed solves",
            "!".yellow(),
            report.instability_events
        );
    }
}

fn print_rmse(rmse: Option<f64>, skipped: usize) {
    match rmse {
        Some(rmse) => println!("{} {:.4}", "Held-out RMSE:".bold(), rmse),
        None => println!("{} n/a (nothing to score)", "Held-out RMSE:".bold()),
    }
    if skipped > 0 {
        println!("  {} cold-start pairs skipped", skipped);
    }
}

fn print_recommendations(recommendations: &[EnrichedRecommendation]) {
    println!("{}", "Recommendations:".bold().blue());
    let mut current_user = None;
    let mut rank = 0;
    for rec in recommendations {
        if current_user != Some(rec.user_id) {
            current_user = Some(rec.user_id);
            rank = 0;
            println!("{}", format!("User {}", rec.user_id).bold());
        }
        rank += 1;
        let label = match &rec.title {
            Some(title) => format!("{} [{}]", title, rec.item_id),
            None => format!("Item {}", rec.item_id),
        };
        println!(
            "  {}. {} - Score: {:.3}",
            rank.to_string().green(),
            label,
            rec.predicted_score
        );
    }
}

fn write_report(path: &Path, report: &WorkflowReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
