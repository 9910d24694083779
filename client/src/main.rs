mod api;
mod session;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shared::{Confirmation, DocumentDraft, EditorState};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use api::ApiClient;
use session::EditCommand;

#[derive(Debug, Parser)]
#[command(name = "infradocs", version, about = "Infrastructure documentation client")]
struct Cli {
    /// Server base URL
    #[arg(long, env = "INFRADOCS_SERVER", default_value = "http://localhost:3000")]
    server: String,

    /// Bearer token from `infradocs login`
    #[arg(long, env = "INFRADOCS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the server is up
    Health,
    /// Log in and print a bearer token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "INFRADOCS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// List documents, most recently updated first
    List,
    /// Print a document's outline, or its JSON with --json
    Show {
        identifier: String,
        #[arg(long)]
        json: bool,
    },
    /// Print a document as HTML
    Render {
        identifier: String,
        /// Render locally instead of asking the server
        #[arg(long)]
        local: bool,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Create a document from a JSON file, or interactively
    Create {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Edit an existing document interactively
    Edit { identifier: String },
    /// Delete a document
    Delete {
        identifier: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.server, cli.token);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    match cli.command {
        Command::Health => {
            let health = client.health().await?;
            println!("{} (server {})", health.status, health.version);
        }
        Command::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt(&mut input, "password: ").await?,
            };
            let payload = client.login(&email, &password).await?;
            eprintln!(
                "Logged in as {} ({})",
                payload.user.username, payload.user.role
            );
            println!("{}", payload.token);
        }
        Command::List => {
            let docs = client.list_documents().await?;
            for doc in &docs {
                println!(
                    "{:<16} {:<40} {}",
                    doc.identifier,
                    doc.title,
                    doc.last_updated.format("%Y-%m-%d %H:%M")
                );
            }
            eprintln!("{} documents", docs.len());
        }
        Command::Show { identifier, json } => {
            let doc = client.get_document(&identifier).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                print!("{}", session::outline(&EditorState::from_document(&doc)));
            }
        }
        Command::Render {
            identifier,
            local,
            output,
        } => {
            let html = if local {
                shared::render::render_page(&client.get_document(&identifier).await?)
            } else {
                client.render(&identifier).await?
            };
            match output {
                Some(path) => std::fs::write(&path, html)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{html}"),
            }
        }
        Command::Create { file: Some(path) } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let draft: DocumentDraft = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a valid document", path.display()))?;
            draft.validate()?;
            let doc = client.create_document(&draft).await?;
            println!("Created {}", doc.identifier);
        }
        Command::Create { file: None } => {
            edit(&client, EditorState::new_document(), &mut input).await?;
        }
        Command::Edit { identifier } => {
            let doc = client.get_document(&identifier).await?;
            edit(&client, EditorState::from_document(&doc), &mut input).await?;
        }
        Command::Delete { identifier, yes } => {
            if !yes && !confirm(&mut input, &format!("Delete {identifier}?")).await? {
                bail!("Aborted");
            }
            let doc = client.delete_document(&identifier).await?;
            println!("Deleted {} ({})", doc.identifier, doc.title);
        }
    }

    Ok(())
}

async fn prompt(input: &mut Input, text: &str) -> Result<String> {
    print!("{text}");
    std::io::stdout().flush()?;
    match input.next_line().await? {
        Some(line) => Ok(line),
        None => bail!("Unexpected end of input"),
    }
}

async fn confirm(input: &mut Input, question: &str) -> Result<bool> {
    let answer = prompt(input, &format!("{question} [y/N] ")).await?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

async fn edit(client: &ApiClient, mut state: EditorState, input: &mut Input) -> Result<()> {
    println!("{}", session::HELP);
    print!("{}", session::outline(&state));

    loop {
        let line = match prompt(input, "> ").await {
            Ok(line) => line,
            Err(_) => return Ok(()),
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match session::parse(&line) {
            Ok(command) => command,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        match command {
            EditCommand::Quit => return Ok(()),
            EditCommand::Help => println!("{}", session::HELP),
            EditCommand::Show => print!("{}", session::outline(&state)),
            EditCommand::Preview => println!("{}", shared::render::render_sections(state.sections(), 1)),
            EditCommand::Save => match save(client, &state, input).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(err) => eprintln!("Save failed: {err:#}"),
            },
            command => {
                let confirmation = if command.needs_confirmation() {
                    match confirm(input, "Remove this section and everything below it?").await? {
                        true => Confirmation::Confirmed,
                        false => Confirmation::Declined,
                    }
                } else {
                    Confirmation::Confirmed
                };
                match session::apply(&mut state, command, confirmation) {
                    Ok(()) => print!("{}", session::outline(&state)),
                    Err(err) => eprintln!("{err}"),
                }
            }
        }
    }
}

/// Returns `Ok(false)` when the user backs out at the warning prompt.
async fn save(client: &ApiClient, state: &EditorState, input: &mut Input) -> Result<bool> {
    let empty = state.sections_without_blocks();
    if !empty.is_empty() {
        let paths: Vec<String> = empty.iter().map(ToString::to_string).collect();
        eprintln!("Sections without blocks: {}", paths.join(", "));
        if !confirm(input, "Save anyway?").await? {
            return Ok(false);
        }
    }

    let doc = if state.is_new() {
        client.create_document(&state.to_draft()?).await?
    } else {
        client
            .update_document(state.identifier(), &state.to_update()?)
            .await?
    };
    println!("Saved {} at {}", doc.identifier, doc.last_updated);
    Ok(true)
}
