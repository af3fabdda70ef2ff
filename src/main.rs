use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use std::io::{self, Write};
use std::path::PathBuf;
use taskflow::models::format_due_date;
use taskflow::{
    DirStore, FilterMode, KeyValueStore, Notice, NoticeLevel, SortKey, Task, TaskStore, ValidationError, local_now,
    parse_due_date,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(about = "TaskFlow - Task list manager with local snapshot persistence")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the store directory (default: platform data directory)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title
        title: String,
        /// Longer description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Due date (YYYY-MM-DD or YYYY-MM-DDTHH:MM)
        #[arg(long, value_parser = parse_due)]
        due: Option<NaiveDateTime>,
    },

    /// List tasks
    List {
        /// all, completed, pending or overdue
        #[arg(short, long, default_value = "all", value_parser = parse_filter)]
        filter: FilterMode,
        /// created, dueDate, title or status
        #[arg(short = 'o', long, default_value = "created", value_parser = parse_sort)]
        sort: SortKey,
    },

    /// Toggle a task between pending and completed
    Toggle {
        /// Task id (or a unique prefix)
        id: String,
    },

    /// Edit a task; omitted fields keep their values
    Edit {
        /// Task id (or a unique prefix)
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// New due date (YYYY-MM-DD or YYYY-MM-DDTHH:MM)
        #[arg(long, value_parser = parse_due, conflicts_with = "clear_due")]
        due: Option<NaiveDateTime>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },

    /// Delete a task
    Delete {
        /// Task id (or a unique prefix)
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete all tasks
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show task counts
    Stats,

    /// Export all tasks to a dated JSON backup
    Export {
        /// Directory to write the backup into
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Replace all tasks with the contents of a JSON backup
    Import {
        /// Backup file to read
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    // Open store
    let store_path = cli.store_path.unwrap_or_else(default_store_path);
    let mut store = TaskStore::open(DirStore::new(&store_path));
    print_notices(store.take_notices());

    let result = run(&mut store, cli.command);
    print_notices(store.take_notices());

    result
}

fn run<S: KeyValueStore>(store: &mut TaskStore<S>, command: Commands) -> Result<()> {
    match command {
        Commands::Add {
            title,
            description,
            due,
        } => match store.add(&title, &description, due) {
            Some(task) => println!("Task added (ID: {})", task.id),
            None => print_notice(&Notice::error("Task title cannot be empty")),
        },

        Commands::List { filter, sort } => {
            let now = local_now();
            let view = store.view_at(filter, sort, now);

            if view.is_empty() {
                println!("{}", "No tasks to show".dimmed());
            }
            for task in &view {
                println!("{}", render_task(task, now));
            }
            println!();
            print_stats(store);
        }

        Commands::Toggle { id } => {
            if let Some(id) = resolve_id(store, &id) {
                match store.toggle_completion(&id) {
                    Some(true) => println!("Task completed!"),
                    Some(false) => println!("Task marked as pending"),
                    None => {}
                }
            }
        }

        Commands::Edit {
            id,
            title,
            description,
            due,
            clear_due,
        } => {
            let Some(id) = resolve_id(store, &id) else {
                return Ok(());
            };
            let Some(current) = store.get(&id).cloned() else {
                return Ok(());
            };

            let title = title.unwrap_or(current.title);
            let description = description.unwrap_or(current.description);
            let due = if clear_due { None } else { due.or(current.due_date) };

            match store.edit(&id, &title, &description, due) {
                Ok(true) => println!("Task updated"),
                Ok(false) => {}
                Err(ValidationError::EmptyTitle) => print_notice(&Notice::error(ValidationError::EmptyTitle.to_string())),
            }
        }

        Commands::Delete { id, yes } => {
            if let Some(id) = resolve_id(store, &id) {
                let title = store.get(&id).map(|t| t.title.clone()).unwrap_or_default();
                if yes || confirm(&format!("Delete task \"{}\"?", title))? {
                    store.delete(&id);
                    println!("Task deleted");
                }
            }
        }

        Commands::Clear { yes } => {
            if yes || confirm("Are you sure you want to delete all tasks? This action cannot be undone.")? {
                let removed = store.clear_all();
                println!("All tasks cleared ({} removed)", removed);
            }
        }

        Commands::Stats => print_stats(store),

        Commands::Export { dir } => match store.export_to(&dir, Local::now().date_naive()) {
            Ok(path) => println!("Tasks exported to {}", path.display()),
            Err(e) => print_notice(&Notice::error(format!("Error exporting tasks: {:#}", e))),
        },

        Commands::Import { file } => match store.import_from(&file) {
            Ok(count) => println!("Imported {} tasks", count),
            Err(e) => print_notice(&Notice::error(format!("Error importing tasks: {:#}", e))),
        },
    }

    Ok(())
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("taskflow"))
        .unwrap_or_else(|| PathBuf::from(".taskflow"))
}

/// Accept a full id or any unambiguous prefix of one
fn resolve_id<S: KeyValueStore>(store: &TaskStore<S>, input: &str) -> Option<String> {
    if store.get(input).is_some() {
        return Some(input.to_string());
    }

    match store.find_by_prefix(input).as_slice() {
        [task] => Some(task.id.clone()),
        [] => {
            print_notice(&Notice::info(format!("No task with id {}", input)));
            None
        }
        matches => {
            print_notice(&Notice::info(format!(
                "Id prefix {} is ambiguous ({} tasks match)",
                input,
                matches.len()
            )));
            None
        }
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn render_task(task: &Task, now: NaiveDateTime) -> String {
    let check = if task.completed { "[x]".green() } else { "[ ]".normal() };
    let title = if task.completed {
        task.title.dimmed().strikethrough()
    } else {
        task.title.bold()
    };

    let mut line = format!("{} {} {}", check, title, task.id.dimmed());

    if let Some(due) = &task.due_date {
        let due = format!("due {}", format_due_date(due));
        let due = if task.is_overdue(now) { due.red() } else { due.cyan() };
        line.push_str(&format!("  {}", due));
    }
    if !task.description.is_empty() {
        line.push_str(&format!("\n      {}", task.description));
    }

    line
}

fn print_stats<S: KeyValueStore>(store: &TaskStore<S>) {
    let stats = store.stats();
    println!(
        "{} total, {} completed, {} pending",
        stats.total,
        stats.completed.to_string().green(),
        stats.pending.to_string().yellow()
    );
}

fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Error => eprintln!("{}", notice.message.red()),
        NoticeLevel::Info => eprintln!("{}", notice.message.blue()),
    }
}

fn print_notices(notices: Vec<Notice>) {
    for notice in &notices {
        print_notice(notice);
    }
}

fn parse_due(s: &str) -> Result<NaiveDateTime, String> {
    parse_due_date(s).map_err(|e| e.to_string())
}

fn parse_filter(s: &str) -> Result<FilterMode, String> {
    s.parse::<FilterMode>().map_err(|e| e.to_string())
}

fn parse_sort(s: &str) -> Result<SortKey, String> {
    s.parse::<SortKey>().map_err(|e| e.to_string())
}
