use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use tally_core::{CategoryOutcome, Filter, Storage, Task, TaskStore, Theme};

mod auth;
mod categorize_worker;
mod config;
mod gemini;
mod state;

use categorize_worker::CategorizeRequest;
use config::GeminiSection;
use state::FileStorage;

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "AI-assisted to-do list for the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a task; Gemini picks a category for it in the background
    Add {
        /// Task text (quotes optional)
        text: Vec<String>,
    },

    /// Show the task list
    List {
        /// all | active | completed
        #[arg(long, default_value = "all")]
        filter: String,
    },

    /// Flip a task between done and not done
    Toggle { id: String },

    /// Replace a task's text
    Edit { id: String, text: Vec<String> },

    /// Delete a task
    Rm { id: String },

    /// Remove every completed task
    Clear,

    /// Set a task's category by hand
    Category { id: String, name: String },

    /// Ask Gemini for candidate categories for a task
    Categories { id: String },

    /// Ask Gemini for 3 new task suggestions
    Suggest {
        /// Add each suggestion that isn't already on the list
        #[arg(long)]
        apply: bool,
    },

    /// Show or change the color theme
    Theme {
        /// light | dark | toggle (omit to show the current theme)
        value: Option<String>,
    },

    /// Manage the Gemini API key
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// Manage ~/.tally/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Paste and store a Gemini API key
    PasteGeminiKey,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Add { text } => {
            let text = text.join(" ");
            let (mut store, warn) = open_store()?;
            report_load_warning(warn);

            let (id, warn) = store.add(&text);
            if let Some(e) = warn {
                warn_save(&e);
            }
            let Some(id) = id else {
                bail!("task text is empty");
            };

            let cfg = config::load_config()?;
            let requests = vec![CategorizeRequest {
                task_id: id.clone(),
                text: text.trim().to_string(),
            }];
            run_categorization(&mut store, &cfg.gemini, requests).await;

            if let Some(task) = store.get(&id) {
                println!("{}", render_task(task));
            }
        }

        Command::List { filter } => {
            let filter: Filter = filter.parse()?;
            let (store, warn) = open_store()?;
            report_load_warning(warn);
            print_list(&store, filter);
        }

        Command::Toggle { id } => {
            let (mut store, warn) = open_store()?;
            report_load_warning(warn);
            require_task(&store, &id)?;
            report_save(store.toggle(&id));
            if let Some(task) = store.get(&id) {
                println!("{}", render_task(task));
            }
        }

        Command::Edit { id, text } => {
            let text = text.join(" ");
            if text.trim().is_empty() {
                bail!("task text is empty");
            }
            let (mut store, warn) = open_store()?;
            report_load_warning(warn);
            require_task(&store, &id)?;
            report_save(store.edit(&id, &text));
            if let Some(task) = store.get(&id) {
                println!("{}", render_task(task));
            }
        }

        Command::Rm { id } => {
            let (mut store, warn) = open_store()?;
            report_load_warning(warn);
            require_task(&store, &id)?;
            report_save(store.delete(&id));
            println!("Deleted {id}");
        }

        Command::Clear => {
            let (mut store, warn) = open_store()?;
            report_load_warning(warn);
            let before = store.len();
            report_save(store.clear_completed());
            println!("Removed {} completed task(s)", before - store.len());
        }

        Command::Category { id, name } => {
            let (mut store, warn) = open_store()?;
            report_load_warning(warn);
            require_task(&store, &id)?;
            report_save(store.set_category(&id, &name));
            if let Some(task) = store.get(&id) {
                println!("{}", render_task(task));
            }
        }

        Command::Categories { id } => {
            let (store, warn) = open_store()?;
            report_load_warning(warn);
            let Some(task) = store.get(&id) else {
                bail!("no task with id {id}");
            };
            let cfg = config::load_config()?;
            let candidates = gemini::suggest_categories(&cfg.gemini, &task.text).await;
            if candidates.is_empty() {
                println!("No suggestions.");
            } else {
                for c in candidates {
                    println!("{c}");
                }
            }
        }

        Command::Suggest { apply } => {
            let (mut store, warn) = open_store()?;
            report_load_warning(warn);
            let cfg = config::load_config()?;

            let suggestions = gemini::suggest_tasks(&cfg.gemini, store.tasks())
                .await
                .context("failed to get suggestions (check your API key and try again)")?;

            if suggestions.is_empty() {
                println!("No suggestions right now.");
                return Ok(());
            }

            println!("Suggested tasks:");
            for (i, s) in suggestions.iter().enumerate() {
                println!("  {}. {}", i + 1, s);
            }

            if !apply {
                println!();
                println!("Re-run with --apply to add them.");
                return Ok(());
            }

            let mut requests = Vec::new();
            for s in &suggestions {
                if store.contains_text(s) {
                    println!("Already on the list, skipping: {s}");
                    continue;
                }
                let (id, warn) = store.add(s);
                if let Some(e) = warn {
                    warn_save(&e);
                }
                if let Some(id) = id {
                    requests.push(CategorizeRequest {
                        task_id: id,
                        text: s.clone(),
                    });
                }
            }

            let added = requests.len();
            run_categorization(&mut store, &cfg.gemini, requests).await;
            println!("Added {added} task(s).");
        }

        Command::Theme { value } => {
            let storage = FileStorage::in_home()?;
            match value.as_deref() {
                None => println!("{}", storage.load_theme().as_str()),
                Some(v) => {
                    // strict parse for user input; the lenient fallback is
                    // only for stored values
                    let next = match v {
                        "light" => Theme::Light,
                        "dark" => Theme::Dark,
                        "toggle" => storage.load_theme().toggled(),
                        other => bail!("unknown theme '{other}' (expected light|dark|toggle)"),
                    };
                    if let Err(e) = storage.save_theme(next) {
                        eprintln!("warning: could not save theme: {e:#}");
                    }
                    println!("{}", next.as_str());
                }
            }
        }

        Command::Auth { command } => match command {
            AuthCommand::PasteGeminiKey => auth::paste_gemini_key()?,
        },

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
        },
    }

    Ok(())
}

fn open_store() -> Result<(TaskStore<FileStorage>, Option<anyhow::Error>)> {
    let storage = FileStorage::in_home()?;
    Ok(TaskStore::load(storage))
}

fn report_load_warning(warn: Option<anyhow::Error>) {
    if let Some(e) = warn {
        eprintln!("warning: could not load your saved tasks, starting empty: {e:#}");
    }
}

fn warn_save(e: &anyhow::Error) {
    eprintln!("warning: could not save your tasks: {e:#}");
}

fn report_save(res: Result<()>) {
    if let Err(e) = res {
        warn_save(&e);
    }
}

/// Dispatch categorization requests and drain the events back into the
/// store as id-keyed patches. A request whose event never arrives is
/// settled as Failed so its task doesn't stay pending forever.
async fn run_categorization(
    store: &mut TaskStore<FileStorage>,
    gemini_cfg: &GeminiSection,
    requests: Vec<CategorizeRequest>,
) {
    if requests.is_empty() {
        return;
    }

    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let (ev_tx, mut ev_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(categorize_worker::run_worker(req_rx, ev_tx, gemini_cfg.clone()));

    let mut pending: Vec<String> = requests.iter().map(|r| r.task_id.clone()).collect();
    for req in requests {
        let _ = req_tx.send(req);
    }
    drop(req_tx);

    // the event channel closes once every in-flight request has settled
    while let Some(ev) = ev_rx.recv().await {
        pending.retain(|p| p != &ev.task_id);
        report_save(store.apply_category(&ev.task_id, CategoryOutcome::Resolved(ev.category)));
    }
    for task_id in pending {
        tracing::warn!("no categorization event for task {task_id}");
        report_save(store.apply_category(&task_id, CategoryOutcome::Failed));
    }

    let _ = worker.await;
}

fn require_task(store: &TaskStore<FileStorage>, id: &str) -> Result<()> {
    if store.get(id).is_none() {
        bail!("no task with id {id}");
    }
    Ok(())
}

fn print_list(store: &TaskStore<FileStorage>, filter: Filter) {
    let visible = store.filtered(filter);
    if visible.is_empty() {
        if store.is_empty() {
            println!("Your to-do list is empty!");
            println!("Add a task with: tally add <text>");
        } else {
            println!("No {} tasks found.", filter.as_str());
            println!("Try a different filter.");
        }
        return;
    }

    for task in visible {
        println!("{}", render_task(task));
    }
    println!();
    println!(
        "{} task(s), {} completed",
        store.len(),
        store.completed_count()
    );
}

fn render_task(task: &Task) -> String {
    let mark = if task.completed { 'x' } else { ' ' };
    let mut line = format!("[{mark}] {}  {}", task.id, task.text);
    if let Some(category) = &task.category {
        line.push_str(&format!("  ({category})"));
    } else if task.is_categorizing {
        line.push_str("  (categorizing...)");
    }
    line
}
