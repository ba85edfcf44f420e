mod review;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use cardbox_core::{
    Clock, Collection, Deck, Note, NoteDraft, Scope, SystemClock, normalize_tags,
    parse_bulk_lines,
};
use cardbox_store::CollectionStore;
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "cardbox", about = "Spaced-repetition flashcards in the terminal")]
struct Cli {
    /// Collection to open (default: config file, then "default")
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List decks with due/new/total counts
    Decks,

    /// Create, rename or delete a deck
    Deck {
        #[command(subcommand)]
        action: DeckAction,
    },

    /// Add a note (and its card)
    Add {
        front: String,
        back: String,
        /// Deck id or name (default: first deck)
        #[arg(long)]
        deck: Option<String>,
        /// Space-separated tags
        #[arg(long, default_value = "")]
        tags: String,
    },

    /// Edit a note; its card keeps its schedule
    Edit {
        /// Note id (or unique id prefix)
        note: String,
        #[arg(long)]
        front: Option<String>,
        #[arg(long)]
        back: Option<String>,
        /// Move the note to another deck
        #[arg(long)]
        deck: Option<String>,
        /// Replace the tags
        #[arg(long)]
        tags: Option<String>,
    },

    /// Delete a note and its card
    Delete {
        /// Note id (or unique id prefix)
        note: String,
    },

    /// Add many notes from `front<TAB>back` or `front;back` lines
    Bulk {
        /// Input file (stdin when omitted)
        file: Option<PathBuf>,
        #[arg(long)]
        deck: Option<String>,
        #[arg(long, default_value = "")]
        tags: String,
    },

    /// Search notes by front, back or tag
    Browse {
        query: Option<String>,
        #[arg(long)]
        deck: Option<String>,
    },

    /// Show counts and today's progress
    Stats {
        #[arg(long)]
        deck: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change the daily limits
    Settings {
        #[arg(long)]
        new_per_day: Option<u32>,
        #[arg(long)]
        reviews_per_day: Option<u32>,
    },

    /// Study due and new cards interactively
    Review {
        #[arg(long)]
        deck: Option<String>,
    },

    /// Export the collection to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Replace the collection with a JSON export
    Import {
        /// Input file path
        path: PathBuf,
    },

    /// Delete everything and start over
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum DeckAction {
    /// Create a deck
    Add { name: String },
    /// Rename a deck
    Rename { deck: String, name: String },
    /// Delete a deck with all of its notes and cards
    Delete { deck: String },
}

fn open_store(cli: &Cli) -> Result<CollectionStore> {
    let base_dir = cardbox_store::base_dir_from_env();
    CollectionStore::open(cli.collection.as_deref(), Some(&base_dir))
        .context("failed to open collection store")
}

fn load(store: &CollectionStore, clock: &impl Clock) -> Result<Collection> {
    store
        .store()
        .load_collection(clock)
        .context("failed to load collection")
}

fn save(store: &CollectionStore, collection: &Collection) -> Result<()> {
    store
        .store()
        .save_collection(collection)
        .context("failed to save collection")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let clock = SystemClock;

    match &cli.command {
        Commands::Decks => cmd_decks(&cli, &clock),
        Commands::Deck { action } => cmd_deck(&cli, action, &clock),
        Commands::Add {
            front,
            back,
            deck,
            tags,
        } => cmd_add(&cli, front, back, deck.as_deref(), tags, &clock),
        Commands::Edit {
            note,
            front,
            back,
            deck,
            tags,
        } => cmd_edit(
            &cli,
            note,
            NoteEdit {
                front: front.as_deref(),
                back: back.as_deref(),
                deck: deck.as_deref(),
                tags: tags.as_deref(),
            },
            &clock,
        ),
        Commands::Delete { note } => cmd_delete(&cli, note, &clock),
        Commands::Bulk { file, deck, tags } => {
            cmd_bulk(&cli, file.as_deref(), deck.as_deref(), tags, &clock)
        }
        Commands::Browse { query, deck } => {
            cmd_browse(&cli, query.as_deref().unwrap_or(""), deck.as_deref(), &clock)
        }
        Commands::Stats { deck, json } => cmd_stats(&cli, deck.as_deref(), *json, &clock),
        Commands::Settings {
            new_per_day,
            reviews_per_day,
        } => cmd_settings(&cli, *new_per_day, *reviews_per_day, &clock),
        Commands::Review { deck } => {
            let store = open_store(&cli)?;
            review::run(&store, deck.as_deref(), &clock)
        }
        Commands::Export { path } => cmd_export(&cli, path, &clock),
        Commands::Import { path } => cmd_import(&cli, path, &clock),
        Commands::Reset { yes } => cmd_reset(&cli, *yes, &clock),
    }
}

// ---------------------------------------------------------------------------
// Lookup helpers
// ---------------------------------------------------------------------------

/// Deck named by `--deck`, else the first deck.
fn pick_deck<'c>(collection: &'c Collection, key: Option<&str>) -> Result<&'c Deck> {
    match key {
        Some(key) => Ok(collection.find_deck(key)?),
        None => collection
            .decks
            .first()
            .context("collection has no decks"),
    }
}

pub(crate) fn scope_for(collection: &Collection, deck: Option<&str>) -> Result<Scope> {
    match deck {
        Some(key) => Ok(Scope::Deck(collection.find_deck(key)?.id)),
        None => Ok(Scope::All),
    }
}

/// Note by full id or unique id prefix.
fn find_note<'c>(collection: &'c Collection, key: &str) -> Result<&'c Note> {
    let key = key.trim().to_lowercase();
    if let Ok(id) = Uuid::parse_str(&key) {
        return collection
            .note(id)
            .with_context(|| format!("note not found: {key}"));
    }
    let matches: Vec<&Note> = collection
        .notes
        .iter()
        .filter(|n| !key.is_empty() && n.id.to_string().starts_with(&key))
        .collect();
    match matches.as_slice() {
        [note] => Ok(*note),
        [] => bail!("note not found: {key}"),
        _ => bail!("note id prefix '{key}' is ambiguous ({} matches)", matches.len()),
    }
}

fn deck_name(collection: &Collection, id: Uuid) -> &str {
    collection.deck(id).map(|d| d.name.as_str()).unwrap_or("?")
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_decks(cli: &Cli, clock: &impl Clock) -> Result<()> {
    let store = open_store(cli)?;
    let collection = load(&store, clock)?;
    let today = clock.today();

    for deck in collection.decks_by_name() {
        let counts = collection.compute_counts(&Scope::Deck(deck.id), today);
        println!(
            "{:<24} due {:>4}  new {:>4}  total {:>4}  {}",
            deck.name, counts.due, counts.new, counts.total, deck.id
        );
    }
    Ok(())
}

fn cmd_deck(cli: &Cli, action: &DeckAction, clock: &impl Clock) -> Result<()> {
    let store = open_store(cli)?;
    let mut collection = load(&store, clock)?;

    match action {
        DeckAction::Add { name } => {
            let id = collection.add_deck(name, clock)?;
            save(&store, &collection)?;
            println!("created deck {} ({id})", name.trim());
        }
        DeckAction::Rename { deck, name } => {
            let id = collection.find_deck(deck)?.id;
            collection.rename_deck(id, name)?;
            save(&store, &collection)?;
            println!("renamed deck {id} to {}", name.trim());
        }
        DeckAction::Delete { deck } => {
            let id = collection.find_deck(deck)?.id;
            let cards = collection.compute_counts(&Scope::Deck(id), clock.today()).total;
            let removed = collection.delete_deck(id)?;
            save(&store, &collection)?;
            println!("deleted deck {} and {cards} cards", removed.name);
        }
    }
    Ok(())
}

fn cmd_add(
    cli: &Cli,
    front: &str,
    back: &str,
    deck: Option<&str>,
    tags: &str,
    clock: &impl Clock,
) -> Result<()> {
    let store = open_store(cli)?;
    let mut collection = load(&store, clock)?;
    let deck = pick_deck(&collection, deck)?;
    let (deck_id, name) = (deck.id, deck.name.clone());

    let note_id = collection.upsert_note(
        NoteDraft {
            id: None,
            deck_id,
            front: front.to_string(),
            back: back.to_string(),
            tags: normalize_tags(tags),
        },
        clock,
    )?;
    save(&store, &collection)?;
    println!("added note {note_id} to {name}");
    Ok(())
}

struct NoteEdit<'a> {
    front: Option<&'a str>,
    back: Option<&'a str>,
    deck: Option<&'a str>,
    tags: Option<&'a str>,
}

fn cmd_edit(cli: &Cli, key: &str, edit: NoteEdit<'_>, clock: &impl Clock) -> Result<()> {
    let store = open_store(cli)?;
    let mut collection = load(&store, clock)?;

    let note = find_note(&collection, key)?;
    let deck_id = match edit.deck {
        Some(deck) => collection.find_deck(deck)?.id,
        None => note.deck_id,
    };
    let draft = NoteDraft {
        id: Some(note.id),
        deck_id,
        front: edit.front.unwrap_or(&note.front).to_string(),
        back: edit.back.unwrap_or(&note.back).to_string(),
        tags: edit.tags.map(normalize_tags).unwrap_or_else(|| note.tags.clone()),
    };

    let note_id = collection.upsert_note(draft, clock)?;
    save(&store, &collection)?;
    println!("updated note {note_id} in {}", deck_name(&collection, deck_id));
    Ok(())
}

fn cmd_delete(cli: &Cli, key: &str, clock: &impl Clock) -> Result<()> {
    let store = open_store(cli)?;
    let mut collection = load(&store, clock)?;
    let id = find_note(&collection, key)?.id;
    let note = collection.delete_note(id)?;
    save(&store, &collection)?;
    println!("deleted note {} ({})", note.id, note.front);
    Ok(())
}

fn cmd_bulk(
    cli: &Cli,
    file: Option<&Path>,
    deck: Option<&str>,
    tags: &str,
    clock: &impl Clock,
) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let parsed = parse_bulk_lines(&text);
    let store = open_store(cli)?;
    let mut collection = load(&store, clock)?;
    let deck = pick_deck(&collection, deck)?;
    let (deck_id, name) = (deck.id, deck.name.clone());

    let added = collection.add_bulk(deck_id, &parsed.pairs, &normalize_tags(tags), clock)?;
    if added > 0 {
        save(&store, &collection)?;
    }
    println!("added {added} notes to {name}, skipped {} lines", parsed.skipped);
    Ok(())
}

fn cmd_browse(cli: &Cli, query: &str, deck: Option<&str>, clock: &impl Clock) -> Result<()> {
    let store = open_store(cli)?;
    let collection = load(&store, clock)?;
    let scope = scope_for(&collection, deck)?;

    let notes = collection.browse(&scope, query);
    if notes.is_empty() {
        println!("(no notes found)");
        return Ok(());
    }
    for note in notes {
        let tags = if note.tags.is_empty() {
            String::new()
        } else {
            format!("  #{}", note.tags.join(" #"))
        };
        println!(
            "{}  [{}] {} → {}{tags}",
            note.id,
            deck_name(&collection, note.deck_id),
            note.front,
            note.back
        );
    }
    Ok(())
}

fn cmd_stats(cli: &Cli, deck: Option<&str>, json: bool, clock: &impl Clock) -> Result<()> {
    let store = open_store(cli)?;
    let collection = load(&store, clock)?;
    let scope = scope_for(&collection, deck)?;
    let today = clock.today();

    let counts = collection.compute_counts(&scope, today);
    let limits = collection.limits(today);
    let studied = collection.daily.get(today);

    if json {
        let value = serde_json::json!({
            "collection": store.name(),
            "counts": counts,
            "limits": limits,
            "today": studied,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("failed to serialize stats")?
        );
        return Ok(());
    }

    println!("collection: {}", store.name());
    println!("decks:      {}", collection.decks.len());
    println!("cards:      {} (new {})", counts.total, counts.new);
    println!("due:        {}", counts.due);
    println!(
        "studied:    {}/{} (remaining {})",
        limits.studied, limits.max, limits.remaining
    );
    println!(
        "today:      again {}, hard {}, good {}, easy {}",
        studied.again, studied.hard, studied.good, studied.easy
    );
    Ok(())
}

fn cmd_settings(
    cli: &Cli,
    new_per_day: Option<u32>,
    reviews_per_day: Option<u32>,
    clock: &impl Clock,
) -> Result<()> {
    let store = open_store(cli)?;
    let mut collection = load(&store, clock)?;

    if new_per_day.is_some() || reviews_per_day.is_some() {
        let current = collection.settings;
        let updated = collection.set_settings(
            new_per_day.unwrap_or(current.new_per_day),
            reviews_per_day.unwrap_or(current.reviews_per_day),
        );
        store
            .store()
            .save_settings(&updated)
            .context("failed to save settings")?;
        tracing::info!(
            new_per_day = updated.new_per_day,
            reviews_per_day = updated.reviews_per_day,
            "settings updated"
        );
    }

    println!("new per day:     {}", collection.settings.new_per_day);
    println!("reviews per day: {}", collection.settings.reviews_per_day);
    Ok(())
}

fn cmd_export(cli: &Cli, path: &Path, clock: &impl Clock) -> Result<()> {
    let store = open_store(cli)?;
    store
        .store()
        .export_json_file(path, clock)
        .context("failed to export JSON")?;
    println!("exported to {}", path.display());
    Ok(())
}

fn cmd_import(cli: &Cli, path: &Path, clock: &impl Clock) -> Result<()> {
    let store = open_store(cli)?;
    let collection = store
        .store()
        .import_json_file(path, clock)
        .context("failed to import JSON")?;

    println!(
        "imported from {}. decks={}, notes={}, cards={}",
        path.display(),
        collection.decks.len(),
        collection.notes.len(),
        collection.cards.len()
    );
    Ok(())
}

fn cmd_reset(cli: &Cli, yes: bool, clock: &impl Clock) -> Result<()> {
    if !yes {
        bail!("reset deletes every deck, note and review; pass --yes to confirm");
    }
    let store = open_store(cli)?;
    let mut collection = load(&store, clock)?;
    collection.reset(clock);
    save(&store, &collection)?;
    println!("collection {} reset", store.name());
    Ok(())
}
