use clap::{Parser, Subcommand, ValueEnum};
use notemark::config::Config;
use notemark::document::{NoteStorage, NoteStore};
use notemark::note_session::NoteSession;
use notemark::richtext::{html_to_markdown, markdown_to_html};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "notemark")]
#[command(about = "Rich-text notes stored as Markdown", long_about = None)]
struct Args {
    /// Directory containing the notes (overrides the config file)
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    notes_dir: Option<PathBuf>,

    /// Log conversion and storage details to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all notes
    Ls,
    /// Print a note as stored (Markdown)
    View {
        title: String,
    },
    /// Print a note as editor markup
    Html {
        title: String,
    },
    /// Store editor markup read from FILE (or stdin) as a note
    Save {
        title: String,
        file: Option<PathBuf>,
    },
    /// Delete a note
    Rm {
        title: String,
    },
    /// Convert between editor markup and Markdown
    Convert {
        /// Output format
        #[arg(long, value_enum)]
        to: Format,
        file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Markdown,
    Html,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .try_init();
}

fn read_input(file: Option<&Path>) -> Result<String, String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e)),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            Ok(input)
        }
    }
}

fn cmd_ls(store: &NoteStore) -> Result<(), String> {
    for title in store.list_notes().map_err(|e| e.to_string())? {
        println!("{}", title);
    }
    Ok(())
}

fn cmd_view(store: &NoteStore, title: &str) -> Result<(), String> {
    let content = store.load_note(title).map_err(|e| e.to_string())?;
    if content.is_empty() {
        println!("(empty)");
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn cmd_html(store: &NoteStore, title: &str) -> Result<(), String> {
    let content = store.load_note(title).map_err(|e| e.to_string())?;
    println!("{}", markdown_to_html(&content));
    Ok(())
}

fn cmd_save(store: NoteStore, config: &Config, title: &str, file: Option<&Path>) -> Result<(), String> {
    let markup = read_input(file)?;
    let now = Instant::now();

    let mut session = NoteSession::new(store, config);
    session.set_title(title, now);
    session.edit_markup(&markup, now);
    let result = session.save_now(now);

    if let Some(message) = session.status().latest() {
        eprintln!("{}", message.text);
    }
    result.map_err(|e| e.to_string())
}

fn cmd_rm(store: &NoteStore, title: &str) -> Result<(), String> {
    store.delete_note(title).map_err(|e| e.to_string())
}

fn cmd_convert(to: Format, file: Option<&Path>) -> Result<(), String> {
    let input = read_input(file)?;
    let output = match to {
        Format::Markdown => html_to_markdown(&input),
        Format::Html => markdown_to_html(&input),
    };
    println!("{}", output);
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::load();
    let notes_dir = args.notes_dir.clone().unwrap_or_else(|| config.notes_dir());
    debug!(notes_dir = %notes_dir.display(), "using notes directory");
    let store = NoteStore::new(notes_dir);

    let result = match args.command {
        Commands::Ls => cmd_ls(&store),
        Commands::View { title } => cmd_view(&store, &title),
        Commands::Html { title } => cmd_html(&store, &title),
        Commands::Save { title, file } => cmd_save(store, &config, &title, file.as_deref()),
        Commands::Rm { title } => cmd_rm(&store, &title),
        Commands::Convert { to, file } => cmd_convert(to, file.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
