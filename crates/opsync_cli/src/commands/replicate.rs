//! Push, pull, rebase and sync command implementations.

use super::Context;
use opsync_sync_engine::{PullOutcome, PushOutcome, RebaseOutcome, ServerLog};
use std::path::Path;

/// Runs the push command.
pub fn push(ctx: &Context, db: &Path, log: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ctx.engine(db)?;
    let outcome = engine.push(&ServerLog::new(log))?;
    print_push(&outcome);
    Ok(())
}

/// Runs the pull command.
pub fn pull(ctx: &Context, db: &Path, log: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ctx.engine(db)?;
    let outcome = engine.pull(&ServerLog::new(log))?;
    print_pull(&outcome);
    Ok(())
}

/// Runs the rebase command.
pub fn rebase(ctx: &Context, db: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ctx.engine(db)?;
    let outcome = engine.rebase()?;
    print_rebase(&outcome);
    Ok(())
}

/// Runs the sync command.
pub fn sync(ctx: &Context, db: &Path, log: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ctx.engine(db)?;
    let cycle = engine.sync(&ServerLog::new(log))?;
    print_pull(&cycle.pull);
    print_rebase(&cycle.rebase);
    print_push(&cycle.push);
    println!("Sync finished in {:?}", cycle.duration);
    Ok(())
}

fn print_push(outcome: &PushOutcome) {
    println!(
        "Pushed {} commit(s) (fork point {})",
        outcome.appended.len(),
        outcome.fork_point
    );
    for commit in &outcome.appended {
        println!("  {}", commit);
    }
}

fn print_pull(outcome: &PullOutcome) {
    if outcome.rebuilt {
        println!(
            "Remote branch diverged from the log at {}; rebuilt from scratch",
            outcome.fork_point
        );
    }
    println!(
        "Pulled {} record(s): {} synced, {} replayed",
        outcome.synced + outcome.replayed,
        outcome.synced,
        outcome.replayed
    );
    match &outcome.head {
        Some(head) => println!("Remote head: {}", head),
        None => println!("Remote head: (empty)"),
    }
}

fn print_rebase(outcome: &RebaseOutcome) {
    match outcome {
        RebaseOutcome::FastForward { head } => {
            let head = head.map(|h| h.to_string()).unwrap_or_else(|| "(empty)".into());
            println!("Local already contains remote; head {}", head);
        }
        RebaseOutcome::Rebased {
            fork_point,
            replayed,
            head,
        } => {
            println!(
                "Rebased {} commit(s) from fork point {}; head {}",
                replayed, fork_point, head
            );
        }
    }
}
