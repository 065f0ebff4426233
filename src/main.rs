//! drill - streak-based vocabulary and grammar drills in the terminal
//!
//! Serves one prompt at a time, checks the typed answer and keeps going until
//! every task in the collection has been answered right three times in a row.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use streakdrill::catalog::Catalog;
use streakdrill::config::Config;
use streakdrill::models::Collection;
use streakdrill::runs::format_elapsed;
use streakdrill::session::{Phase, Session, SessionSettings, Turn};
use streakdrill::store::{MemoryStore, ProgressStore, RunStore, SqliteStore};
use streakdrill::summary::summarize;

// ══════════════════════════════════════════════════════════════════════════
// CLI Arguments
// ══════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(name = "drill")]
#[command(author, version, about = "Streak-based vocabulary and grammar drills", long_about = None)]
struct Args {
    /// Progress database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON file with collections to use instead of the bundled ones
    #[arg(long, global = true)]
    collections: Option<PathBuf>,

    /// Seed for a reproducible task order
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Keep progress in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Mistakes allowed before the run ends
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    max_lives: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show progress for every collection
    List,

    /// Drill a collection until every task is mastered
    Run {
        /// Collection id
        collection: String,
    },

    /// Erase stored progress for a collection
    Reset {
        /// Collection id
        collection: String,
    },

    /// Save the effective settings, including flags given now, to the config file
    SaveConfig,
}

// ══════════════════════════════════════════════════════════════════════════
// Main Entry Point
// ══════════════════════════════════════════════════════════════════════════

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        log::warn!("Ignoring config: {:#}", e);
        Config::default()
    });
    if args.db.is_some() {
        config.database_path = args.db.clone();
    }
    if args.collections.is_some() {
        config.collections_path = args.collections.clone();
    }
    if args.max_lives.is_some() {
        config.max_lives = args.max_lives;
    }

    if let Command::SaveConfig = args.command {
        config.save()?;
        println!("✓ Saved settings to {:?}", Config::default_path());
        return Ok(());
    }

    let catalog = Catalog::load_or_bundled(config.collections_path.as_deref())?;
    let settings = config.session_settings(args.seed);

    if args.ephemeral {
        dispatch(&args.command, &catalog, MemoryStore::new(), &settings)
    } else {
        let path = config.database_path();
        let store = SqliteStore::open(&path)
            .with_context(|| format!("Failed to open progress database: {:?}", path))?;
        dispatch(&args.command, &catalog, store, &settings)
    }
}

fn dispatch<S>(command: &Command, catalog: &Catalog, store: S, settings: &SessionSettings) -> Result<()>
where
    S: ProgressStore + RunStore,
{
    match command {
        Command::List => list(catalog, &store),
        Command::Run { collection } => {
            let collection = find(catalog, collection)?.clone();
            run(Session::new(collection, store, settings))
        }
        Command::Reset { collection } => {
            let collection = find(catalog, collection)?;
            store.reset_collection(&collection.id)?;
            println!("✓ Progress for '{}' has been reset", collection.name);
            Ok(())
        }
        Command::SaveConfig => Ok(()),
    }
}

fn find<'a>(catalog: &'a Catalog, id: &str) -> Result<&'a Collection> {
    catalog.get(id).ok_or_else(|| {
        anyhow!(
            "Unknown collection '{}'. Available: {}",
            id,
            catalog.ids().join(", ")
        )
    })
}

// ══════════════════════════════════════════════════════════════════════════
// Commands
// ══════════════════════════════════════════════════════════════════════════

fn list<S: ProgressStore + RunStore>(catalog: &Catalog, store: &S) -> Result<()> {
    for summary in summarize(store, &catalog.collections)? {
        let best = summary
            .best
            .as_ref()
            .map(|b| format!("  best {}s", format_elapsed(b.elapsed())))
            .unwrap_or_default();
        println!(
            "{:<20} {:<7} {:>3}/{:<3} {:>3}%  circles {}{}",
            summary.id,
            summary.kind.name(),
            summary.completed,
            summary.total,
            summary.percent(),
            summary.circles,
            best
        );
    }
    Ok(())
}

fn run<S: ProgressStore + RunStore>(mut session: Session<S>) -> Result<()> {
    if session.load()? == Phase::Finished {
        println!(
            "✓ '{}' is already mastered. Use `drill reset {}` to start over.",
            session.collection().name,
            session.collection().id
        );
        return Ok(());
    }
    println!(
        "{} ({}/{} mastered). Empty line to quit.\n",
        session.collection().name,
        session.completed_count(),
        session.total_count()
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let Some(task) = session.current_task()? else {
            return Ok(());
        };
        let expected = task.prompt.answer.to_string();
        print!("{}", task.prompt.question);
        if let Some(hint) = task.prompt.hint {
            print!("  ({})", hint);
        }
        print!("\n> ");
        io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            return Ok(());
        };
        if line.trim().is_empty() {
            println!("Stopped at {}/{}.", session.completed_count(), session.total_count());
            return Ok(());
        }

        let correct = answer_matches(&line, &expected);
        if correct {
            println!("✓");
        } else {
            println!("✗ {}", expected);
        }

        match session.submit_answer(correct)? {
            Turn::Next(_) => {
                if let Some(lives) = session.lives_left() {
                    if !correct {
                        println!("  {} lives left", lives);
                    }
                }
            }
            Turn::Finished(stats) => {
                println!(
                    "\n✓ Circle {} done: {}/{} in {}s, {} answers, {} mistakes",
                    stats.circle,
                    stats.completed,
                    stats.total,
                    format_elapsed(stats.elapsed),
                    stats.answers,
                    stats.mistakes
                );
                if stats.is_new_best {
                    println!("  New best time!");
                } else if let Some(best) = &stats.previous_best {
                    println!("  Best: {}s", format_elapsed(best.elapsed()));
                }
                return Ok(());
            }
            Turn::GameOver { mistakes } => {
                println!("\n✗ Out of lives after {} mistakes. Progress so far is kept.", mistakes);
                return Ok(());
            }
        }
    }
}

/// Trimmed, case-insensitive match against any `" / "`-separated alternative.
fn answer_matches(given: &str, expected: &str) -> bool {
    let given = given.trim().to_lowercase();
    expected
        .split(" / ")
        .any(|alt| alt.trim().to_lowercase() == given)
}
