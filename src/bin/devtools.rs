use asin_cache::core::models::Asin;
use asin_cache::devtools::controller::DEFAULT_WATCHDOG;
use asin_cache::devtools::{HttpInvalidator, InvalidationController, Settled};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "asin-devtools", about = "Force ASIN cache invalidation on a running server")]
struct Cli {
    /// Base URL of the asin-cache server
    #[arg(long, env = "ASIN_CACHE_SITE", default_value = "http://127.0.0.1:3000")]
    site: String,
    /// Seconds before a pending refetch is shown as idle regardless of outcome
    #[arg(long, env = "INVALIDATION_WATCHDOG_SECS", default_value_t = DEFAULT_WATCHDOG.as_secs())]
    watchdog_secs: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Invalidate and refetch the given ASINs one by one
    Refetch {
        #[arg(required = true)]
        asins: Vec<String>,
    },
    /// Invalidate and refetch every ASIN in one batch
    RefetchAll {
        #[arg(long, env = "TRACKED_ASINS", value_delimiter = ',', required = true)]
        asins: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let invalidator = Arc::new(HttpInvalidator::new(&cli.site)?);
    let watchdog = Duration::from_secs(cli.watchdog_secs);

    let (asins, all) = match &cli.command {
        Command::Refetch { asins } => (asins, false),
        Command::RefetchAll { asins } => (asins, true),
    };
    let asins = asins.iter().map(|raw| Asin::parse(raw)).collect::<Result<Vec<_>, _>>()?;
    let controller = InvalidationController::new(invalidator, asins.clone(), watchdog);

    let work = {
        let controller = controller.clone();
        async move {
            if all {
                vec![controller.request_all().await]
            } else {
                let requests = asins.iter().map(|asin| controller.request_one(asin.clone()));
                futures::future::join_all(requests).await
            }
        }
    };

    let outcomes = tokio::select! {
        outcomes = work => outcomes,
        _ = tokio::signal::ctrl_c() => {
            controller.cancel_all();
            eprintln!("cancelled; server-side refetches continue in the background");
            return Ok(());
        }
    };

    for outcome in &outcomes {
        if let Settled::Failed(e) = outcome {
            eprintln!("error: {}", e);
        }
    }
    let snapshot = controller.snapshot();
    let mut rows: Vec<_> = snapshot.data.iter().collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));
    for (asin, record) in rows {
        println!("{}\t{}\t{:?}\t{}", asin, record.title, record.price, record.purchase_link);
    }
    Ok(())
}
