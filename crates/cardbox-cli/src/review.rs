//! Line-based study loop: Enter shows the answer, `1`-`4` or a rating name
//! rates it, `q` quits. Each rating is written to the store before the next
//! card is shown.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use cardbox_core::{
    Clock, QueueReason, Rating, ReviewSession, SessionState, format_interval, preview_intervals,
};
use cardbox_store::CollectionStore;

use crate::scope_for;

enum Input {
    Line(String),
    Quit,
}

fn prompt(lines: &mut impl Iterator<Item = io::Result<String>>, text: &str) -> Result<Input> {
    print!("{text} ");
    io::stdout().flush().context("failed to flush stdout")?;
    match lines.next() {
        None => Ok(Input::Quit),
        Some(line) => {
            let line = line.context("failed to read stdin")?;
            let line = line.trim();
            if line.eq_ignore_ascii_case("q") {
                Ok(Input::Quit)
            } else {
                Ok(Input::Line(line.to_string()))
            }
        }
    }
}

pub fn run(store: &CollectionStore, deck: Option<&str>, clock: &impl Clock) -> Result<()> {
    let mut collection = store
        .store()
        .load_collection(clock)
        .context("failed to load collection")?;
    let scope = scope_for(&collection, deck)?;

    let mut session = ReviewSession::new(scope);
    session.start(&collection, clock)?;
    if session.is_finished() {
        match session.reason() {
            QueueReason::Limit => {
                let limits = collection.limits(clock.today());
                println!(
                    "daily limit reached ({}/{}); come back tomorrow",
                    limits.studied, limits.max
                );
            }
            QueueReason::Ok => println!("nothing to review"),
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        match session.state() {
            SessionState::ShowingQuestion => {
                let Some((_, note)) = session.current(&collection) else {
                    break;
                };
                println!();
                println!("[{} left] {}", session.remaining(), note.front);
                match prompt(&mut lines, "(Enter: show answer, q: quit)")? {
                    Input::Quit => break,
                    Input::Line(_) => session.reveal()?,
                }
            }
            SessionState::ShowingAnswer => {
                let Some((card, note)) = session.current(&collection) else {
                    break;
                };
                println!("= {}", note.back);
                let previews = preview_intervals(card, clock.today());
                let choices: Vec<String> = Rating::ALL
                    .iter()
                    .zip(previews)
                    .enumerate()
                    .map(|(i, (rating, days))| {
                        format!("{} {rating} ({})", i + 1, format_interval(days))
                    })
                    .collect();

                let rating = match prompt(&mut lines, &format!("{} >", choices.join("  ")))? {
                    Input::Quit => break,
                    Input::Line(line) => match line.parse::<Rating>() {
                        Ok(rating) => rating,
                        Err(e) => {
                            println!("{e}");
                            continue;
                        }
                    },
                };

                match session.rate(&mut collection, rating, clock)? {
                    Some(event) => {
                        store
                            .store()
                            .record_rating(&collection, &event)
                            .context("failed to save rating")?;
                        println!("{rating}: next in {}", format_interval(event.new_interval));
                    }
                    None => tracing::debug!("card was removed before it could be rated"),
                }
            }
            SessionState::AwaitingQueue | SessionState::Finished => break,
        }
    }

    if session.skipped_count() > 0 {
        tracing::warn!(
            skipped = session.skipped_count(),
            "skipped queued cards that no longer exist"
        );
    }

    println!();
    println!("reviewed {} cards", session.rated_count());
    if session.reason() == QueueReason::Limit {
        println!("daily limit reached");
    } else if session.is_finished() {
        println!("all done for now");
    }
    Ok(())
}
