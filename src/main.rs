use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use futures_util::{SinkExt, StreamExt};

use silex::{
    models::store::Store,
    services::{
        assignment::{AssignError, assign, unassign},
        specifications::{
            CreateSpecificationError, CreateSpecificationParameters, SpecificationPatch,
            create_specification, delete_specification, list_all, seed_if_new,
            update_specification,
        },
        tasks::{
            CreateTaskError, CreateTaskParameters, StatusFilter, TaskPatch, add_subtask,
            create_task, delete_task, list_filtered, priority_tasks, remove_subtask,
            sorted_by_priority_then_deadline, stats, toggle_subtask, update_task,
        },
        transfer::{export_tasks, import_tasks},
    },
    storage::{Storage, json::JsonFileStorage},
    sync::{
        event::{ChangeEvent, PresenceUser, ServerMessage, apply_remote_change},
        gateway::{LocalOnlyGateway, RemoteGateway, SyncGateway},
    },
    ui,
};

#[derive(Parser)]
#[command(
    name = "silex",
    about = "A task and specification tracker with multi-client sync"
)]
struct Cli {
    /// Base URL of a sync server to mirror changes to
    #[arg(long, global = true, env = "SILEX_REMOTE")]
    remote: Option<String>,

    /// Override the store file location
    #[arg(long, global = true, env = "SILEX_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title
        title: String,

        /// Deadline (YYYY-MM-DD)
        #[arg(short, long)]
        deadline: String,

        /// Status: not-started, in-progress, standby, completed
        #[arg(short, long)]
        status: Option<String>,

        /// Domain tag (development, design, research, ...)
        #[arg(long)]
        domain: Option<String>,

        /// Free-text constraint note
        #[arg(long)]
        condition: Option<String>,

        /// Duration estimate (e.g. "2d")
        #[arg(long)]
        duration: Option<String>,

        /// Difficulty, 1-10
        #[arg(long)]
        difficulty: Option<u8>,

        /// Priority, 0-100
        #[arg(short, long)]
        priority: Option<u8>,

        /// Assignee name
        #[arg(short, long)]
        assignee: Option<String>,

        /// Add a checklist item (can be used multiple times)
        #[arg(long = "subtask", action = clap::ArgAction::Append)]
        subtasks: Vec<String>,

        /// Assign to a specification
        #[arg(long = "spec")]
        specification: Option<String>,
    },

    /// List tasks, sorted by priority then deadline
    List {
        /// Filter by status, or "all"
        #[arg(short, long, default_value = "all")]
        status: String,
    },

    /// Show a task in detail
    Show { task_id: u64 },

    /// Edit a task
    Edit {
        task_id: u64,

        #[arg(long)]
        title: Option<String>,

        /// Deadline (YYYY-MM-DD)
        #[arg(short, long)]
        deadline: Option<String>,

        #[arg(short, long)]
        status: Option<String>,

        #[arg(long)]
        domain: Option<String>,

        #[arg(long)]
        condition: Option<String>,

        #[arg(long)]
        duration: Option<String>,

        #[arg(long)]
        difficulty: Option<u8>,

        #[arg(short, long)]
        priority: Option<u8>,

        #[arg(short, long)]
        assignee: Option<String>,

        /// Manual progress, 0-100 (only without a checklist)
        #[arg(long)]
        progress: Option<u8>,

        /// Move to a specification
        #[arg(long = "spec", conflicts_with = "no_spec")]
        specification: Option<String>,

        /// Detach from its specification
        #[arg(long)]
        no_spec: bool,
    },

    /// Delete a task
    Delete {
        task_id: u64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Set manual progress on a task without a checklist
    Progress { task_id: u64, value: u8 },

    /// Manage a task's checklist
    #[command(subcommand)]
    Subtask(SubtaskCommands),

    /// Manage specifications
    #[command(subcommand)]
    Spec(SpecCommands),

    /// Assign a task to a specification
    Assign { task_id: u64, spec_id: String },

    /// Detach a task from its specification
    Unassign { task_id: u64 },

    /// Show overall statistics and priority tasks
    Dashboard,

    /// Export all tasks to a JSON file
    Export { file: PathBuf },

    /// Import tasks from a JSON file, replacing the current list
    Import {
        file: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Seed three demonstration tasks into an empty store
    Demo,

    /// Talk to a sync server
    #[command(subcommand)]
    Sync(SyncCommands),

    /// Run the sync server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3001, env = "SILEX_PORT")]
        port: u16,

        /// Address to bind
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[derive(Debug, Subcommand)]
enum SubtaskCommands {
    /// Add a checklist item
    Add { task_id: u64, text: String },
    /// Toggle a checklist item
    Toggle { task_id: u64, subtask_id: u64 },
    /// Remove a checklist item
    Remove { task_id: u64, subtask_id: u64 },
}

#[derive(Debug, Subcommand)]
enum SpecCommands {
    /// Create a new specification
    New {
        title: String,

        /// What this specification covers
        #[arg(short, long)]
        description: String,

        /// Fixed id; a token is generated when omitted
        #[arg(long)]
        id: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        priority: Option<u8>,

        #[arg(short, long)]
        status: Option<String>,
    },
    /// List all specifications by priority
    List,
    /// Show a specification and its tasks
    Show { spec_id: String },
    /// Edit a specification
    Edit {
        spec_id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        priority: Option<u8>,

        #[arg(short, long)]
        status: Option<String>,
    },
    /// Delete a specification, detaching its tasks
    Delete {
        spec_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum SyncCommands {
    /// Replace local data with the server's current state
    Pull,
    /// Follow the server's event channel, applying every change locally
    Listen {
        /// Presence name announced to other clients
        #[arg(short, long, env = "USER")]
        username: Option<String>,
    },
}

/// Synchronous yes/no gate for destructive commands
fn confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    // Initialize storage
    let storage_path = cli.store.clone().unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("silex")
            .join("store.json")
    });

    if let Some(parent) = storage_path.parent() {
        std::fs::create_dir_all(parent).unwrap_or_else(|e| {
            eprintln!("Error: Failed to create data directory: {}", e);
            std::process::exit(1);
        });
    }

    // The serve command owns the store itself
    if let Some(Commands::Serve { port, bind }) = &cli.command {
        let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("Error: Failed to start async runtime: {}", e);
            std::process::exit(1);
        });
        if let Err(e) = runtime.block_on(silex::server::run_server(*port, bind, storage_path)) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let storage = JsonFileStorage::new(storage_path);

    let mut store = match storage.load() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: Failed to load store: {}", e);
            std::process::exit(1);
        }
    };

    // First run: install the fixed specification list
    match seed_if_new(&mut store, &storage) {
        Ok(true) => log::info!("Installed seed specifications"),
        Ok(false) => {}
        Err(e) => {
            eprintln!("Error: Failed to seed store: {}", e);
            std::process::exit(1);
        }
    }

    // Remote mirroring is opt-in; everything works local-only
    let gateway: Box<dyn SyncGateway> = match &cli.remote {
        Some(url) => Box::new(RemoteGateway::new(url.clone())),
        None => Box::new(LocalOnlyGateway),
    };
    let gateway = gateway.as_ref();

    match cli.command {
        Some(Commands::Add {
            title,
            deadline,
            status,
            domain,
            condition,
            duration,
            difficulty,
            priority,
            assignee,
            subtasks,
            specification,
        }) => {
            let params = CreateTaskParameters {
                title,
                deadline,
                status,
                domain,
                condition,
                duration,
                difficulty,
                priority,
                assignee,
                subtasks,
                specification,
            };

            match create_task(&mut store, &storage, gateway, params) {
                Ok(task) => {
                    println!("✓ Task added: {}", task.title);
                    println!("  #{}", task.id);
                    if let Some(spec) = task
                        .specification_id
                        .as_deref()
                        .and_then(|id| store.get_specification(id))
                    {
                        println!("  Spec: {}", spec.title);
                    }
                }
                Err(CreateTaskError::InvalidDeadline(date_str, error)) => {
                    eprintln!("Error: Invalid deadline '{}': {}", date_str, error);
                    eprintln!("\nExpected format: YYYY-MM-DD (e.g., 2026-03-01)");
                    std::process::exit(1);
                }
                Err(CreateTaskError::SpecificationNotFound(id)) => {
                    eprintln!("Error: Specification '{}' not found", id);

                    let specs = list_all(&store);
                    if !specs.is_empty() {
                        eprintln!("\nAvailable specifications:");
                        for spec in specs {
                            eprintln!("  - {} ({})", spec.title, spec.id);
                        }
                    } else {
                        eprintln!("\nNo specifications exist yet. Create one first or omit --spec.");
                    }
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::List { status }) => {
            let filter = match status.parse::<StatusFilter>() {
                Ok(filter) => filter,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            let filtered = list_filtered(&store, filter);
            let sorted = sorted_by_priority_then_deadline(&filtered);

            if sorted.is_empty() {
                println!("No tasks found");
            } else {
                let header = match filter {
                    StatusFilter::All => "Tasks".to_string(),
                    StatusFilter::Only(s) => format!("Tasks · {}", s.label()),
                };
                ui::render_view_header(&header, sorted.len());
                let today = ui::today();
                for task in sorted {
                    ui::render_task_line(task, &store, today);
                }
            }
        }
        Some(Commands::Show { task_id }) => match store.get_task(task_id) {
            Some(task) => ui::render_task_card(task, &store, ui::today()),
            None => {
                eprintln!("Error: Task #{} not found", task_id);
                std::process::exit(1);
            }
        },
        Some(Commands::Edit {
            task_id,
            title,
            deadline,
            status,
            domain,
            condition,
            duration,
            difficulty,
            priority,
            assignee,
            progress,
            specification,
            no_spec,
        }) => {
            let specification = if no_spec {
                Some(None)
            } else {
                specification.map(Some)
            };

            let patch = TaskPatch {
                title,
                deadline,
                status,
                domain,
                condition,
                duration,
                difficulty,
                priority,
                assignee,
                progress,
                subtasks: None,
                specification,
            };

            match update_task(&mut store, &storage, gateway, task_id, patch) {
                Ok(task) => {
                    println!("✓ Task updated: {}", task.title);
                    println!("  #{}", task.id);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Delete { task_id, yes }) => {
            let title = match store.get_task(task_id) {
                Some(task) => task.title.clone(),
                None => {
                    eprintln!("Error: Task #{} not found", task_id);
                    std::process::exit(1);
                }
            };

            if !yes && !confirm(&format!("Delete task #{} '{}'?", task_id, title)) {
                println!("Cancelled");
                return;
            }

            match delete_task(&mut store, &storage, gateway, task_id) {
                Ok(task) => println!("✓ Task deleted: {}", task.title),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Progress { task_id, value }) => {
            let patch = TaskPatch {
                progress: Some(value),
                ..TaskPatch::default()
            };

            match update_task(&mut store, &storage, gateway, task_id, patch) {
                Ok(task) => {
                    println!("✓ Progress set: {}", ui::progress_bar(task.progress, 20));
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Subtask(SubtaskCommands::Add { task_id, text })) => {
            match add_subtask(&mut store, &storage, gateway, task_id, text) {
                Ok(task) => {
                    let added = task.subtasks.last().unwrap();
                    println!("✓ Subtask #{} added to task #{}", added.id, task.id);
                    println!("  {}", ui::progress_bar(task.progress, 20));
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Subtask(SubtaskCommands::Toggle {
            task_id,
            subtask_id,
        })) => match toggle_subtask(&mut store, &storage, gateway, task_id, subtask_id) {
            Ok(task) => {
                let subtask = task.subtasks.iter().find(|s| s.id == subtask_id).unwrap();
                let state = if subtask.completed { "done" } else { "open" };
                println!("✓ Subtask #{} is now {}", subtask_id, state);
                println!("  {}", ui::progress_bar(task.progress, 20));
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::Subtask(SubtaskCommands::Remove {
            task_id,
            subtask_id,
        })) => match remove_subtask(&mut store, &storage, gateway, task_id, subtask_id) {
            Ok(task) => {
                println!("✓ Subtask #{} removed from task #{}", subtask_id, task.id);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::Spec(SpecCommands::New {
            title,
            description,
            id,
            category,
            priority,
            status,
        })) => {
            let params = CreateSpecificationParameters {
                id,
                title,
                description,
                category,
                priority,
                status,
            };

            match create_specification(&mut store, &storage, gateway, params) {
                Ok(spec) => {
                    println!("✓ Specification created: {}", spec.title);
                    println!("  id: {}", spec.id);
                }
                Err(CreateSpecificationError::AlreadyExists(id)) => {
                    eprintln!("Error: Specification '{}' already exists", id);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Spec(SpecCommands::List)) => {
            let specs = list_all(&store);

            if specs.is_empty() {
                println!("No specifications found");
            } else {
                println!(
                    "{} ({} {})\n",
                    "SPECIFICATIONS".cyan(),
                    specs.len(),
                    if specs.len() == 1 {
                        "specification"
                    } else {
                        "specifications"
                    }
                );
                for spec in specs {
                    ui::render_specification_line(spec, &store);
                    println!();
                }
            }
        }
        Some(Commands::Spec(SpecCommands::Show { spec_id })) => {
            match store.get_specification(&spec_id) {
                Some(spec) => ui::render_specification_card(spec, &store, ui::today()),
                None => {
                    eprintln!("Error: Specification '{}' not found", spec_id);

                    let specs = list_all(&store);
                    if !specs.is_empty() {
                        eprintln!("\nAvailable specifications:");
                        for spec in specs {
                            eprintln!("  - {} ({})", spec.title, spec.id);
                        }
                    }
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Spec(SpecCommands::Edit {
            spec_id,
            title,
            description,
            category,
            priority,
            status,
        })) => {
            let patch = SpecificationPatch {
                title,
                description,
                category,
                priority,
                status,
            };

            match update_specification(&mut store, &storage, gateway, &spec_id, patch) {
                Ok(spec) => {
                    println!("✓ Specification updated: {}", spec.title);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Spec(SpecCommands::Delete { spec_id, yes })) => {
            let (title, attached) = match store.get_specification(&spec_id) {
                Some(spec) => (spec.title.clone(), spec.task_ids.len()),
                None => {
                    eprintln!("Error: Specification '{}' not found", spec_id);
                    std::process::exit(1);
                }
            };

            let prompt = if attached > 0 {
                format!(
                    "Delete specification '{}'? {} task(s) will be detached.",
                    title, attached
                )
            } else {
                format!("Delete specification '{}'?", title)
            };
            if !yes && !confirm(&prompt) {
                println!("Cancelled");
                return;
            }

            match delete_specification(&mut store, &storage, gateway, &spec_id) {
                Ok(result) => {
                    println!("✓ Specification deleted: {}", result.specification.title);
                    if result.detached_tasks_count > 0 {
                        println!("  └─ {} task(s) detached", result.detached_tasks_count);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Assign { task_id, spec_id }) => {
            match assign(&mut store, &storage, gateway, task_id, &spec_id) {
                Ok(()) => {
                    let spec = store.get_specification(&spec_id).unwrap();
                    println!("✓ Task #{} assigned to '{}'", task_id, spec.title);
                }
                Err(AssignError::SpecificationNotFound(id)) => {
                    eprintln!("Error: Specification '{}' not found", id);

                    let specs = list_all(&store);
                    if !specs.is_empty() {
                        eprintln!("\nAvailable specifications:");
                        for spec in specs {
                            eprintln!("  - {} ({})", spec.title, spec.id);
                        }
                    }
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Unassign { task_id }) => {
            let spec_id = match store.get_task(task_id) {
                Some(task) => task.specification_id.clone(),
                None => {
                    eprintln!("Error: Task #{} not found", task_id);
                    std::process::exit(1);
                }
            };

            match spec_id {
                None => println!("Task #{} is not assigned to any specification", task_id),
                Some(spec_id) => {
                    match unassign(&mut store, &storage, gateway, task_id, &spec_id) {
                        Ok(()) => println!("✓ Task #{} detached from '{}'", task_id, spec_id),
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            std::process::exit(1);
                        }
                    }
                }
            }
        }
        Some(Commands::Dashboard) => {
            let today = ui::today();
            let task_stats = stats(&store, today);
            let top = priority_tasks(&store, 3);
            ui::render_dashboard(&task_stats, &top, &store, today);
        }
        Some(Commands::Export { file }) => match export_tasks(&store, &file) {
            Ok(count) => println!("✓ Exported {} task(s) to {}", count, file.display()),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::Import { file, yes }) => {
            let prompt = format!(
                "Importing replaces the current {} task(s). Continue?",
                store.tasks.len()
            );
            if !yes && !confirm(&prompt) {
                println!("Cancelled");
                return;
            }

            match import_tasks(&mut store, &storage, &file) {
                Ok(count) => println!("✓ Imported {} task(s) from {}", count, file.display()),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Demo) => {
            if !store.tasks.is_empty() {
                println!("Store already has tasks, demo data not created");
                return;
            }

            if let Err(e) = create_demo_tasks(&mut store, &storage, gateway) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
            println!("✓ Created {} demonstration tasks", store.tasks.len());
        }
        Some(Commands::Sync(SyncCommands::Pull)) => {
            let Some(url) = cli.remote else {
                eprintln!("Error: No sync server configured. Pass --remote or set SILEX_REMOTE.");
                std::process::exit(1);
            };

            let remote = RemoteGateway::new(url);
            let tasks = match remote.fetch_tasks() {
                Ok(tasks) => tasks,
                Err(e) => {
                    eprintln!("Error: Failed to fetch tasks: {}", e);
                    std::process::exit(1);
                }
            };
            let specifications = match remote.fetch_specifications() {
                Ok(specs) => specs,
                Err(e) => {
                    eprintln!("Error: Failed to fetch specifications: {}", e);
                    std::process::exit(1);
                }
            };

            store.tasks = tasks;
            store.specifications = specifications;
            let max_id = store.tasks.iter().map(|t| t.id).max().unwrap_or(0);
            if store.task_id_counter < max_id {
                store.task_id_counter = max_id;
            }

            if let Err(e) = storage.save(&store) {
                eprintln!("Error: Failed to save pulled data: {}", e);
                std::process::exit(1);
            }

            println!(
                "✓ Pulled {} task(s) and {} specification(s)",
                store.tasks.len(),
                store.specifications.len()
            );
        }
        Some(Commands::Sync(SyncCommands::Listen { username })) => {
            let Some(url) = cli.remote else {
                eprintln!("Error: No sync server configured. Pass --remote or set SILEX_REMOTE.");
                std::process::exit(1);
            };

            let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
                eprintln!("Error: Failed to start async runtime: {}", e);
                std::process::exit(1);
            });

            let result = runtime.block_on(listen(
                &url,
                username.unwrap_or_else(|| "silex-cli".to_string()),
                &mut store,
                &storage,
            ));

            if let Err(e) = result {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { .. }) => unreachable!("handled before store load"),
        None => {
            // Default: show the full task list
            let filtered = list_filtered(&store, StatusFilter::All);
            let sorted = sorted_by_priority_then_deadline(&filtered);

            if sorted.is_empty() {
                println!("No tasks yet. Try `silex add` or `silex demo`.");
            } else {
                ui::render_view_header("Tasks", sorted.len());
                let today = ui::today();
                for task in sorted {
                    ui::render_task_line(task, &store, today);
                }
            }
        }
    }
}

/// Three demonstration tasks, created only into an empty store
fn create_demo_tasks(
    store: &mut Store,
    storage: &impl Storage,
    gateway: &dyn SyncGateway,
) -> Result<(), CreateTaskError> {
    use jiff::ToSpan;

    let today = ui::today();
    let demo = |title: &str,
                offset_days: i64,
                status: &str,
                domain: &str,
                condition: &str,
                duration: &str,
                difficulty: u8,
                priority: u8,
                assignee: &str| CreateTaskParameters {
        title: title.to_string(),
        deadline: today.saturating_add((offset_days as i32).days()).to_string(),
        status: Some(status.to_string()),
        domain: Some(domain.to_string()),
        condition: Some(condition.to_string()),
        duration: Some(duration.to_string()),
        difficulty: Some(difficulty),
        priority: Some(priority),
        assignee: Some(assignee.to_string()),
        subtasks: vec![],
        specification: None,
    };

    create_task(
        store,
        storage,
        gateway,
        demo(
            "Design the user interface",
            7,
            "in-progress",
            "design",
            "Stick to the organic style guide",
            "1w",
            6,
            85,
            "Lead designer",
        ),
    )?;
    create_task(
        store,
        storage,
        gateway,
        demo(
            "Implement the save system",
            3,
            "not-started",
            "development",
            "Local store with remote fallback",
            "2d",
            4,
            92,
            "Backend developer",
        ),
    )?;
    create_task(
        store,
        storage,
        gateway,
        demo(
            "User testing and feedback",
            14,
            "standby",
            "research",
            "At least 10 test users",
            "1w",
            3,
            60,
            "UX researcher",
        ),
    )?;

    Ok(())
}

/// Follow the server's event channel and fold every update into the local
/// store, so this client stays a live mirror.
async fn listen(
    base_url: &str,
    username: String,
    store: &mut Store,
    storage: &impl Storage,
) -> Result<(), String> {
    use tokio_tungstenite::tungstenite::Message;

    let ws_url = format!(
        "{}/ws/events",
        base_url
            .trim_end_matches('/')
            .replacen("http://", "ws://", 1)
            .replacen("https://", "wss://", 1)
    );

    let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .map_err(|e| format!("Failed to connect to {ws_url}: {e}"))?;
    let (mut write, mut read) = ws_stream.split();

    let hello = ServerMessage::UserLogin(PresenceUser {
        user_id: uuid::Uuid::new_v4().to_string(),
        username: username.clone(),
    });
    let hello_json = serde_json::to_string(&hello).map_err(|e| e.to_string())?;
    write
        .send(Message::Text(hello_json))
        .await
        .map_err(|e| format!("Failed to announce presence: {e}"))?;

    println!("Listening for changes as '{}' (ctrl-c to stop)...", username);

    while let Some(message) = read.next().await {
        let message = message.map_err(|e| format!("Connection lost: {e}"))?;
        match message {
            Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text) {
                Ok(ServerMessage::DataUpdate(update)) => {
                    apply_remote_change(store, &update.event);
                    if let Err(e) = storage.save(store) {
                        log::warn!("Failed to persist remote change: {e}");
                    }
                    println!("  ↳ {}", describe_event(&update.event));
                }
                Ok(ServerMessage::UserJoined(user)) => {
                    println!("  ↳ {} joined", user.username.green());
                }
                Ok(ServerMessage::UserLeft(user)) => {
                    println!("  ↳ {} left", user.username.dimmed());
                }
                Ok(ServerMessage::UserLogin(_)) => {}
                Err(e) => log::debug!("Unparseable server frame: {e}"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    println!("Server closed the connection");
    Ok(())
}

fn describe_event(event: &ChangeEvent) -> String {
    match event {
        ChangeEvent::TaskCreated(task) => format!("task #{} created: {}", task.id, task.title),
        ChangeEvent::TaskUpdated(task) => format!("task #{} updated: {}", task.id, task.title),
        ChangeEvent::TaskDeleted(deleted) => format!("task #{} deleted", deleted.id),
        ChangeEvent::SpecificationCreated(spec) => {
            format!("specification '{}' created", spec.id)
        }
        ChangeEvent::SpecificationUpdated(spec) => {
            format!("specification '{}' updated", spec.id)
        }
        ChangeEvent::SpecificationDeleted(deleted) => {
            format!("specification '{}' deleted", deleted.id)
        }
        ChangeEvent::TaskAssigned(assignment) => format!(
            "task #{} assigned to '{}'",
            assignment.task_id, assignment.specification_id
        ),
        ChangeEvent::TaskUnassigned(unassignment) => {
            format!("task #{} unassigned", unassignment.task_id)
        }
    }
}
