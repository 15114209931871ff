use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use browser_goal_agent::brain::{self, Planner};
use browser_goal_agent::dom::{describe_context, get_page_context};
use browser_goal_agent::primitives::safe_goto;
use browser_goal_agent::search::ProductSearch;
use browser_goal_agent::{AgentConfig, BrowserSession, ExecutionResult, GoalExecutor};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "agent")]
#[command(version, about = "Drive Chrome toward a goal using a language-model planner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Run Chrome without a visible window (overrides HEADLESS)
    #[arg(long, global = true)]
    headless: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the model for a plan and execute it
    Goal {
        /// What to accomplish, e.g. "Search for a dinosaur on Amazon"
        goal: String,

        /// Page to open before planning (defaults to the blank start page)
        #[arg(long, value_name = "URL")]
        start_url: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scripted product search; reads the term from stdin when omitted
    Search {
        /// Product to search for
        term: Option<String>,
    },

    /// Print what the planner would see on a page
    Context {
        /// Page to inspect
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = AgentConfig::from_env().context("Failed to load configuration")?;
    if cli.headless {
        config.headless = true;
    }

    match cli.command {
        Commands::Goal {
            goal,
            start_url,
            json,
        } => run_goal(&config, &goal, start_url.as_deref(), json).await,
        Commands::Search { term } => run_search(&config, term).await,
        Commands::Context { url } => run_context(&config, &url).await,
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose {
        "browser_goal_agent=debug,agent=debug,info"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();
}

/// Chrome launch blocks for a while; keep it off the async workers.
async fn launch(config: &AgentConfig) -> Result<BrowserSession> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || BrowserSession::launch(&config))
        .await
        .context("Browser launch panicked")?
}

async fn close(session: BrowserSession) -> Result<()> {
    tokio::task::spawn_blocking(move || session.close())
        .await
        .context("Browser shutdown panicked")
}

async fn run_goal(config: &AgentConfig, goal: &str, start_url: Option<&str>, json: bool) -> Result<()> {
    // Credential check happens before Chrome is started.
    let model = brain::client_from_config(config)?;
    let session = launch(config).await?;

    let mut executor = GoalExecutor::new(session.page(), Planner::new(model), config);
    let result = executor.execute_goal(goal, start_url).await;
    close(session).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if !result.success {
        bail!(
            "Goal failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn print_result(result: &ExecutionResult) {
    if result.success {
        println!("Success: executed {} steps ({} failed)", result.steps_executed, result.failed_steps);
        if let Some(url) = &result.final_url {
            println!("Final URL: {}", url);
        }
    } else {
        println!(
            "Failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
}

async fn run_search(config: &AgentConfig, term: Option<String>) -> Result<()> {
    let term = match term {
        Some(term) => term,
        None => prompt_for_term()?,
    };
    let term = term.trim();
    if term.is_empty() {
        bail!("Product cannot be empty!");
    }

    let session = launch(config).await?;
    let page = session.page();
    let search = ProductSearch::new(&page, config);

    let product = if search.search(term).await {
        search.first_product().await
    } else {
        None
    };
    close(session).await?;

    match product {
        Some(product) => {
            println!("Name:  {}", product.name);
            println!("Price: ${}", product.price);
            Ok(())
        }
        None => bail!("Could not find a product for '{}'", term),
    }
}

fn prompt_for_term() -> Result<String> {
    print!("Enter a product to search for on Amazon: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read search term")?;
    Ok(line)
}

async fn run_context(config: &AgentConfig, url: &str) -> Result<()> {
    let session = launch(config).await?;
    let page = session.page();

    let context = if safe_goto(&page, url, config.nav_timeout).await {
        tokio::time::sleep(config.settle_delay).await;
        get_page_context(&page).await.map_err(anyhow::Error::from)
    } else {
        Err(anyhow::anyhow!("Could not open {}", url))
    };
    close(session).await?;

    let context = context?;
    info!("[Context] This is what the planner receives");
    println!("{}", describe_context(&context));
    Ok(())
}
