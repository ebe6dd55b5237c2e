// command line interface

use crate::core::{AnswerKind, ClassifierWeights, ContentClassifier, Role, Store};
use crate::{Output, Server};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "learnhub", about = "Chapters, practice answers and exams")]
struct Cli {
    /// database connection url
    #[arg(
        long,
        short,
        env = "DATABASE_URL",
        default_value = "sqlite://learnhub.db",
        global = true
    )]
    db: String,

    /// toml file overriding the classifier weights
    #[arg(long, short, env = "LEARNHUB_WEIGHTS", global = true)]
    weights: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// decide whether an answer renders as text or code
    Classify {
        /// file to read, stdin when omitted
        file: Option<PathBuf>,

        /// declared answer kind (text, code, image, mixed)
        #[arg(long, short)]
        kind: Option<AnswerKind>,

        /// show the score and which signals fired
        #[arg(long, short)]
        explain: bool,

        /// print json instead of text
        #[arg(long)]
        json: bool,
    },

    /// start as http server
    Serve {
        /// port number
        #[arg(long, short, default_value = "3000")]
        port: u16,

        /// host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// create the default chapters
    Seed,

    /// delete chapters whose title repeats an older one
    Cleanup,

    /// list chapters in display order
    Chapters {
        #[arg(long)]
        json: bool,
    },

    /// list users or change a role
    Users {
        #[command(subcommand)]
        action: Option<UserAction>,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// give a user the admin role
    Promote { uid: String },
    /// take the admin role away (never from the last admin)
    Demote { uid: String },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let classifier = match &cli.weights {
        Some(path) => ContentClassifier::with_weights(ClassifierWeights::load(path)?),
        None => ContentClassifier::new(),
    };

    match cli.command {
        Commands::Classify {
            file,
            kind,
            explain,
            json,
        } => {
            let text = read_input(file.as_deref())?;
            let explanation = classifier.explain(&text, kind);

            match (json, explain) {
                (true, true) => Output::raw(&explanation),
                (true, false) => Output::raw(&explanation.result),
                (false, true) => Output::explanation(&text, &explanation),
                (false, false) => {
                    let result = explanation.result;
                    if result.is_code {
                        println!("code ({})", result.language);
                    } else {
                        println!("text");
                    }
                }
            }
            Ok(())
        }

        Commands::Serve { port, host } => {
            let store = Store::connect(&cli.db).await?;
            Ok(Server::run(store, classifier, &host, port).await?)
        }

        Commands::Seed => {
            let store = Store::connect(&cli.db).await?;
            let created = store.seed_default_chapters().await?;
            println!("created {} chapters", created.len());
            Ok(())
        }

        Commands::Cleanup => {
            let store = Store::connect(&cli.db).await?;
            let deleted = store.cleanup_duplicate_chapters().await?;
            println!("deleted {deleted} duplicate chapters");
            Ok(())
        }

        Commands::Chapters { json } => {
            let store = Store::connect(&cli.db).await?;
            let chapters = store.chapters().await?;
            if json {
                Output::raw(&chapters);
            } else {
                Output::chapters(&chapters);
            }
            Ok(())
        }

        Commands::Users { action } => {
            let users = Store::connect(&cli.db).await?.users();
            match action {
                None => Output::users(&users.users().await?),
                Some(UserAction::Promote { uid }) => {
                    let user = users.set_role(&uid, Role::Admin).await?;
                    println!("{} is now {}", user.email, user.role);
                }
                Some(UserAction::Demote { uid }) => {
                    let user = users.set_role(&uid, Role::User).await?;
                    println!("{} is now {}", user.email, user.role);
                }
            }
            Ok(())
        }
    }
}

// RUST_LOG wins, otherwise info; logs go to stderr so json output stays clean
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(file: Option<&Path>) -> Result<String> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path).into_diagnostic()?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).into_diagnostic()?;
            text
        }
    };

    // the newline editors and shells append would count as a second line
    let trimmed = text.strip_suffix('\n').unwrap_or(&text);
    let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
    Ok(trimmed.to_string())
}
