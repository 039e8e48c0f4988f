use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use uuid::Uuid;
use vokabel_core::export::{export_words_csv, write_words_csv};
use vokabel_core::tutor::{render_explanation, render_stats, QuizCard};
use vokabel_core::*;

type CliTutor = Tutor<JsonFileStore, OfflineOracle>;

#[derive(Parser)]
#[command(name = "vokabel")]
#[command(about = "Vocabulary tutor with spaced-repetition reviews", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Learner whose deck to use
    #[arg(long, global = true)]
    user: Option<String>,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a word: "der Tisch | table | die Tische | Möbel"
    Add {
        #[arg(required = true, num_args = 1..)]
        entry: Vec<String>,
    },

    /// Explain a grammar topic
    Explain { topic: Vec<String> },

    /// Quiz due cards and schedule them by the answers
    Quiz {
        /// Number of cards (defaults to the configured quiz size)
        count: Option<usize>,

        /// Answer automatically instead of prompting (for scripting)
        #[arg(long, value_enum)]
        answer: Option<AutoAnswer>,
    },

    /// Record a review with an explicit SM-2 quality (0-5)
    Review {
        card_id: Uuid,

        /// Values outside 0-5 are clamped
        #[arg(long, allow_negative_numbers = true)]
        quality: i32,
    },

    /// Show how many cards are due (default)
    Due {
        /// List the due cards
        #[arg(long)]
        list: bool,
    },

    /// Show deck statistics
    Stats,

    /// Export the deck to CSV ("-" writes to stdout)
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Read chat messages from stdin and reply to each
    Chat,

    /// Print the effective configuration
    Config {
        /// Write it to the config file if none exists yet
        #[arg(long)]
        write: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AutoAnswer {
    Correct,
    Incorrect,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    vokabel_core::logging::init(cli.verbose);

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let user = cli
        .user
        .unwrap_or_else(|| config.tutor.default_user.clone());
    tracing::debug!("Using data dir {:?} for user {}", data_dir, user);

    let mut tutor = Tutor::new(
        JsonFileStore::new(Config::deck_path(&data_dir)),
        OfflineOracle,
        JsonlReviewLog::new(Config::review_log_path(&data_dir)),
        &config,
    );

    match cli.command {
        Some(Commands::Add { entry }) => cmd_add(&tutor, &user, &entry.join(" ")),
        Some(Commands::Explain { topic }) => cmd_explain(&tutor, &user, &topic.join(" ")),
        Some(Commands::Quiz { count, answer }) => cmd_quiz(&mut tutor, &user, count, answer),
        Some(Commands::Review { card_id, quality }) => {
            cmd_review(&mut tutor, &user, card_id, quality)
        }
        Some(Commands::Due { list }) => cmd_due(&tutor, &user, list),
        Some(Commands::Stats) => cmd_stats(&tutor, &user),
        Some(Commands::Export { out }) => {
            let out = out.unwrap_or_else(|| data_dir.join("words.csv"));
            cmd_export(&tutor, &user, out)
        }
        Some(Commands::Chat) => cmd_chat(&mut tutor, &user),
        Some(Commands::Config { write }) => cmd_config(&config, write),
        None => cmd_due(&tutor, &user, false),
    }
}

fn cmd_add(tutor: &CliTutor, user: &str, payload: &str) -> Result<()> {
    let word = tutor.add_word(user, payload, Utc::now())?;
    println!(
        "✅ Hinzugefügt: {} — {}",
        word.entry.headword(),
        word.entry.translation
    );
    println!("  id: {}", word.id);
    Ok(())
}

fn cmd_explain(tutor: &CliTutor, user: &str, topic: &str) -> Result<()> {
    let topic = if topic.trim().is_empty() {
        tutor.settings().default_explain_topic.clone()
    } else {
        topic.to_string()
    };
    let explanation = tutor.explain(user, &topic, Utc::now())?;
    println!("{}", render_explanation(&explanation));
    Ok(())
}

fn cmd_quiz(
    tutor: &mut CliTutor,
    user: &str,
    count: Option<usize>,
    auto: Option<AutoAnswer>,
) -> Result<()> {
    let count = count.unwrap_or(tutor.settings().quiz_size);
    let cards = tutor.quiz(user, count, Utc::now())?;
    if cards.is_empty() {
        println!("🎉 Keine fälligen Karten. Mit 'add' neue Wörter lernen!");
        return Ok(());
    }

    let stdin = io::stdin();
    let mut input = stdin.lock().lines();

    for card in cards {
        let key = card.key();
        match card.item.clone() {
            Some(item) => {
                println!("\n{}", card.clone().into_reply());
                let given = match auto {
                    Some(AutoAnswer::Correct) => item.answer.clone(),
                    Some(AutoAnswer::Incorrect) => String::new(),
                    None => match prompt(&mut input)? {
                        Some(line) => line,
                        None => break,
                    },
                };
                let outcome = tutor.answer(&key, &item, &given, Utc::now())?;
                println!("{}", outcome.feedback());
            }
            None => {
                let correct = match auto {
                    Some(AutoAnswer::Correct) => true,
                    Some(AutoAnswer::Incorrect) => false,
                    None => match self_graded(&card, &mut input)? {
                        Some(correct) => correct,
                        None => break,
                    },
                };
                let quality = Quality::from_correct(correct).value() as i32;
                let event = tutor.record_review(&key, quality, Utc::now())?;
                println!(
                    "Nächste Wiederholung: {}",
                    scheduler::format_timestamp(event.due_at)
                );
            }
        }
    }

    Ok(())
}

fn cmd_review(tutor: &mut CliTutor, user: &str, card_id: Uuid, quality: i32) -> Result<()> {
    let key = CardKey::new(user, card_id);
    let event = tutor.record_review(&key, quality, Utc::now())?;
    println!(
        "✓ Reviewed with quality {} ({})",
        event.quality,
        if event.passed { "pass" } else { "lapse" }
    );
    println!(
        "  Ease: {:.2}  Interval: {} days  Repetitions: {}",
        event.ease, event.interval, event.repetitions
    );
    println!("  Due: {}", scheduler::format_timestamp(event.due_at));
    Ok(())
}

fn cmd_due(tutor: &CliTutor, user: &str, list: bool) -> Result<()> {
    let due = tutor.due(user, Utc::now())?;
    println!("📅 Fällig: {}", due.len());
    if list {
        for word in &due {
            println!(
                "  {}  {} → {}",
                word.id,
                word.entry.headword(),
                word.entry.translation
            );
        }
    }
    Ok(())
}

fn cmd_stats(tutor: &CliTutor, user: &str) -> Result<()> {
    let stats = tutor.stats(user, Utc::now())?;
    println!("{}", render_stats(&stats));
    Ok(())
}

fn cmd_export(tutor: &CliTutor, user: &str, out: PathBuf) -> Result<()> {
    let words = tutor.store().list_words(user)?;
    if out.as_os_str() == "-" {
        write_words_csv(&words, io::stdout().lock())?;
        return Ok(());
    }

    let count = export_words_csv(&words, &out)?;
    println!("✓ Exported {} words", count);
    println!("  CSV: {}", out.display());
    Ok(())
}

fn cmd_chat(tutor: &mut CliTutor, user: &str) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock().lines();

    while let Some(line) = prompt(&mut input)? {
        if line.trim().is_empty() {
            continue;
        }
        for reply in tutor.handle_message(user, &line, Utc::now()) {
            println!("{}", reply);
            if let Reply::Quiz { key, item } = reply {
                let Some(given) = prompt(&mut input)? else {
                    return Ok(());
                };
                let outcome = tutor.answer(&key, &item, &given, Utc::now())?;
                println!("{}", outcome.feedback());
            }
        }
    }

    Ok(())
}

fn cmd_config(config: &Config, write: bool) -> Result<()> {
    let path = Config::default_config_path();
    if write {
        if path.exists() {
            println!("Config already exists: {}", path.display());
        } else {
            config.save_to(&path)?;
            println!("✓ Wrote {}", path.display());
        }
        return Ok(());
    }

    println!("# {}", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}

/// Print a prompt and read one line; `None` at end of input
fn prompt<I>(input: &mut I) -> Result<Option<String>>
where
    I: Iterator<Item = io::Result<String>>,
{
    print!("> ");
    io::stdout().flush()?;
    match input.next() {
        Some(line) => Ok(Some(line?.trim().to_string())),
        None => Ok(None),
    }
}

fn self_graded<I>(card: &QuizCard, input: &mut I) -> Result<Option<bool>>
where
    I: Iterator<Item = io::Result<String>>,
{
    println!("\n{}", card.flashcard());
    println!("Gewusst? (j/n)");
    Ok(prompt(input)?.map(|answer| {
        matches!(answer.to_lowercase().as_str(), "j" | "ja" | "y" | "yes")
    }))
}
