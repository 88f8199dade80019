use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use todo_sync::config::ClientConfig;
use todo_sync::logging;
use todo_sync::models::deadline::parse_date;
use todo_sync::sync::{MutationOutcome, TodoView};
use todo_sync::{Deadline, HttpTodoStore, NewTodo, ReconcileStrategy, TodoSync};

#[derive(Parser, Debug)]
#[command(name = "todo", about = "Edit a remote todo list", version)]
struct Cli {
    /// Base URL of the todo collection (overrides TODO_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// How to reconcile after an update: patch or refetch
    #[arg(long, global = true)]
    reconcile: Option<ReconcileStrategy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show every todo, newest first
    List,
    /// Create a todo
    Add {
        text: String,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Change fields of an existing todo
    Edit {
        id: String,
        #[arg(long)]
        text: Option<String>,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Flip the completed flag
    Toggle { id: String },
    /// Delete a todo
    Delete { id: String },
}

#[derive(Args, Debug, Default)]
struct RangeArgs {
    /// First day of the deadline (YYYY-MM-DD)
    #[arg(long, value_parser = parse_day)]
    from: Option<chrono::NaiveDate>,
    /// Last day of the deadline (YYYY-MM-DD)
    #[arg(long, value_parser = parse_day)]
    to: Option<chrono::NaiveDate>,
}

impl RangeArgs {
    fn deadline(&self) -> Deadline {
        Deadline::new(self.from, self.to)
    }
}

fn parse_day(value: &str) -> Result<chrono::NaiveDate, String> {
    parse_date(value).ok_or_else(|| format!("not a date: {}", value))
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    logging::init("todo_sync=warn");

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ClientConfig::new_from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(reconcile) = cli.reconcile {
        config.reconcile = reconcile;
    }
    debug!("using {} with {} reconciliation", config.api_url, config.reconcile);

    let store = Arc::new(HttpTodoStore::new(&config)?);
    let sync = TodoSync::new(store, config.reconcile);

    if let Err(e) = sync.refresh().await {
        print_view(&sync).await;
        return Err(e.into());
    }

    let outcome = match cli.command {
        Command::List => None,
        Command::Add { text, range } => {
            let created = sync.create(NewTodo::new(text, range.deadline())).await?;
            println!("added {}", created.id);
            None
        }
        Command::Edit {
            id,
            text,
            range,
            completed,
        } => {
            let Some(current) = sync.get(&id).await else {
                return Err(format!("no todo with id {}", id).into());
            };
            sync.begin_edit(&id, &current.text).await;
            if let Some(text) = text {
                sync.set_text(text).await?;
            }
            sync.set_date_range(range.deadline()).await?;
            if let Some(completed) = completed {
                sync.set_completed(&id, completed).await;
            }
            Some((id.clone(), sync.commit(&id).await?))
        }
        Command::Toggle { id } => match sync.get(&id).await {
            Some(todo) => {
                let current = sync.completion(&id).await.unwrap_or(todo.completed);
                sync.set_completed(&id, !current).await;
                Some((id.clone(), sync.commit(&id).await?))
            }
            None => Some((id, MutationOutcome::Missing)),
        },
        Command::Delete { id } => Some((id.clone(), sync.delete(&id).await?)),
    };

    if let Some((id, MutationOutcome::Missing)) = outcome {
        return Err(format!("no todo with id {}", id).into());
    }

    print_view(&sync).await;
    Ok(())
}

async fn print_view(sync: &TodoSync) {
    match sync.view().await {
        TodoView::Loading => println!("Loading..."),
        TodoView::Error(message) => println!("{}", message),
        TodoView::Rows(rows) => {
            for row in rows {
                let mark = if row.completed { "x" } else { " " };
                println!("[{}] {}  {}  ({})", mark, row.text, row.deadline, row.id);
            }
        }
    }
}

