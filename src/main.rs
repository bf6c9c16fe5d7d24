use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use legendas_srs::config::{self, SchedulerConfig};
use legendas_srs::service::ReviewService;
use legendas_srs::srs::Scheduler;
use legendas_srs::store::SqliteStore;

#[derive(Parser)]
#[command(version, about = "Phrase-card scheduling for LegendasPT", long_about = None)]
struct Cli {
  /// SQLite database (defaults to config.toml, then DATABASE_PATH, then data/legendas.db)
  #[arg(long, global = true)]
  db: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// List cards due now, earliest first, with the due count and next due date.
  Due {
    #[arg(long)]
    user: String,
    #[arg(long)]
    limit: Option<usize>,
  },
  /// Record a review: 1 = Again, 2 = Hard, 3 = Good, 4 = Easy.
  Review {
    #[arg(long)]
    user: String,
    #[arg(long)]
    phrase: i64,
    #[arg(long)]
    rating: i64,
  },
  /// Show what each rating would schedule, without saving.
  Preview {
    #[arg(long)]
    user: String,
    #[arg(long)]
    phrase: i64,
  },
  /// Progress projection for one phrase.
  Progress {
    #[arg(long)]
    user: String,
    #[arg(long)]
    phrase: i64,
  },
  /// Aggregate progress for a learner.
  Summary {
    #[arg(long)]
    user: String,
  },
}

fn print_json<T: Serialize>(value: &T) -> legendas_srs::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn run(cli: Cli) -> legendas_srs::Result<()> {
  let db_path = cli.db.unwrap_or_else(config::load_database_path);
  let store = SqliteStore::open(&db_path)?;
  let scheduler = Scheduler::new(SchedulerConfig::load())?;
  let mut service = ReviewService::new(store, scheduler);
  let now = Utc::now();

  match cli.command {
    Command::Due { user, limit } => {
      let mut queue = service.due_queue(&user, now)?;
      if let Some(limit) = limit {
        queue.cards.truncate(limit);
      }
      print_json(&queue)
    }
    Command::Review {
      user,
      phrase,
      rating,
    } => {
      let outcome = service.submit_review(&user, phrase, rating, now)?;
      tracing::info!(
        "Recorded review for {}#{}: next due {}",
        user,
        phrase,
        outcome.card.due_date
      );
      print_json(&outcome)
    }
    Command::Preview { user, phrase } => print_json(&service.preview(&user, phrase, now)?),
    Command::Progress { user, phrase } => print_json(&service.progress(&user, phrase)?),
    Command::Summary { user } => print_json(&service.summary(&user)?),
  }
}

fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "legendas_srs=info".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  if let Err(e) = run(Cli::parse()) {
    eprintln!("Error: {}", e);
    std::process::exit(1);
  }
}
