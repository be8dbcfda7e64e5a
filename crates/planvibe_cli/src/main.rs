use clap::{CommandFactory, Parser};
use planvibe_cli::cli::{CONFIG_OVERRIDE_FLAG, Cli, Command, GoalCommand, collect_overrides};
use planvibe_core::backend::{owner_id, remote_client};
use planvibe_core::config::{BackendMode, Config, load_config_with_fallback, merge_overrides};
use planvibe_core::error::AppError;
use planvibe_core::model::{
    Goal, GoalCategory, GoalDraft, GoalPatch, Progress, Task, TaskFormData, TaskPatch, TaskStatus,
    format_date, parse_date,
};
use planvibe_core::remote::auth::{self, Credentials, Registration};
use planvibe_core::remote::dashboard;
use planvibe_core::storage::{FileMedium, Storage};
use planvibe_core::summary::DashboardSummary;
use planvibe_core::{GoalStore, TaskBackend, TaskStore, open_backend, session};
use std::io::{self, BufRead, IsTerminal};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::OffsetDateTime;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Per-process state: one task store is opened lazily and reused by every
/// command of an interactive session.
struct App {
    config: Config,
    storage: Storage<FileMedium>,
    tasks: Option<TaskStore>,
}

impl App {
    fn open(config: Config) -> Result<Self, AppError> {
        let storage = Storage::new(FileMedium::new(config.data_dir()?));
        Ok(Self {
            config,
            storage,
            tasks: None,
        })
    }

    fn tasks(&mut self) -> Result<&mut TaskStore, AppError> {
        if self.tasks.is_none() {
            let session = session::load(&self.storage);
            let backend = open_backend(&self.config, session.as_ref())?;
            let store = TaskStore::open(backend);
            if let Some(err) = store.load_failure() {
                return Err(err.clone());
            }
            debug!(backend = %store.backend().describe(), count = store.tasks().len(), "opened task store");
            self.tasks = Some(store);
        }
        self.tasks
            .as_mut()
            .ok_or_else(|| AppError::invalid_data("task store is not open"))
    }

    fn goals(&self) -> Result<GoalStore, AppError> {
        let session = session::load(&self.storage);
        let client = remote_client(&self.config, session.as_ref());
        let mut store = GoalStore::new(client, owner_id(&self.config, session.as_ref())?);
        store.refresh()?;
        Ok(store)
    }

    /// Drops the open store so the next command sees the new session.
    fn reset(&mut self) {
        self.tasks = None;
    }
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

impl TaskRow {
    fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            status: task.status.to_string(),
            priority: task.priority.to_string(),
            due: due_label(task),
            tags: task.tags.join(", "),
        }
    }
}

#[derive(Tabled)]
struct GoalRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Due")]
    due: String,
}

fn due_label(task: &Task) -> String {
    task.due_date.map(format_date).unwrap_or_else(|| "-".to_string())
}

fn parse_optional_date(raw: Option<&str>) -> Result<Option<time::Date>, AppError> {
    raw.map(parse_date).transpose()
}

fn today() -> time::Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|err| AppError::invalid_data(err.to_string()))
}

fn print_tasks_plain(tasks: &[&Task]) {
    if tasks.is_empty() {
        println!("No tasks");
        return;
    }
    let mut table = Table::new(tasks.iter().map(|task| TaskRow::from_task(task)));
    table.with(Style::sharp());
    println!("{table}");
}

fn print_task_plain(task: &Task) {
    println!("ID:          {}", task.id);
    println!("Title:       {}", task.title);
    println!(
        "Description: {}",
        task.description.as_deref().unwrap_or("-")
    );
    println!("Status:      {}", task.status);
    println!("Priority:    {}", task.priority);
    println!("Due:         {}", due_label(task));
    let tags = if task.tags.is_empty() {
        "-".to_string()
    } else {
        task.tags.join(", ")
    };
    println!("Tags:        {tags}");
    println!("Created:     {}", task.created_at);
    println!("Updated:     {}", task.updated_at);
}

fn print_board(store: &TaskStore, json: bool) -> Result<(), AppError> {
    if json {
        let mut columns = serde_json::Map::new();
        for status in TaskStatus::ALL {
            let tasks = serde_json::to_value(store.tasks_by_status(status))
                .map_err(|err| AppError::invalid_data(err.to_string()))?;
            columns.insert(status.as_str().to_string(), tasks);
        }
        println!("{}", serde_json::Value::Object(columns));
        return Ok(());
    }

    for status in TaskStatus::ALL {
        let tasks = store.tasks_by_status(status);
        println!("== {} ({}) ==", status.wire_label(), tasks.len());
        for task in tasks {
            println!("  {} | {} | {} | {}", task.id, task.title, task.priority, due_label(task));
        }
    }
    Ok(())
}

fn print_dashboard(summary: &DashboardSummary, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", to_json(summary)?);
        return Ok(());
    }

    println!("Completed tasks: {}", summary.completed_tasks);
    println!("Goal progress:   {}", summary.goals_progress);
    if summary.upcoming_tasks.is_empty() {
        println!("Upcoming: none");
    } else {
        println!("Upcoming:");
        for task in &summary.upcoming_tasks {
            let due = task.due_date.map(format_date).unwrap_or_else(|| "-".to_string());
            println!("  {} | {} | {} | {}", due, task.title, task.priority, task.id);
        }
    }
    for goal in &summary.goals {
        println!("  goal {} | {} | {}", goal.id, goal.title, goal.progress);
    }
    Ok(())
}

fn print_goals_plain(goals: &[&Goal]) {
    if goals.is_empty() {
        println!("No goals");
        return;
    }
    let rows = goals.iter().map(|goal| GoalRow {
        id: goal.id.clone(),
        title: goal.title.clone(),
        category: goal.category.to_string(),
        progress: goal.progress.to_string(),
        due: goal.due_date.map(format_date).unwrap_or_else(|| "-".to_string()),
    });
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{table}");
}

fn report_task(verb: &str, task: &Task, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", to_json(task)?);
    } else {
        println!("{verb} task: {} ({})", task.title, task.id);
    }
    Ok(())
}

fn report_goal(verb: &str, goal: &Goal, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", to_json(goal)?);
    } else {
        println!("{verb} goal: {} ({}) {}", goal.title, goal.id, goal.progress);
    }
    Ok(())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;
    let mut quoted = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            quoted = true;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() || quoted {
                args.push(std::mem::take(&mut current));
                quoted = false;
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() || quoted {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_goal_command(app: &App, goal: GoalCommand, json: bool) -> Result<(), AppError> {
    let mut store = app.goals()?;
    match goal {
        GoalCommand::List { category } => {
            let goals: Vec<&Goal> = match category {
                Some(raw) => store.by_category(&GoalCategory::from(raw)),
                None => store.goals().iter().collect(),
            };
            if json {
                println!("{}", to_json(&goals)?);
            } else {
                print_goals_plain(&goals);
                if !goals.is_empty() {
                    println!("Average progress: {}", store.average_progress());
                }
            }
        }
        GoalCommand::Add {
            title,
            description,
            category,
            progress,
            due,
        } => {
            let draft = GoalDraft {
                title,
                description,
                category: GoalCategory::from(category),
                progress: Progress::clamped(progress),
                due_date: parse_optional_date(due.as_deref())?,
            };
            let goal = store.add(draft)?;
            report_goal("Added", &goal, json)?;
        }
        GoalCommand::Edit {
            id,
            title,
            description,
            category,
            progress,
            due,
            clear_due,
        } => {
            let due_date = if clear_due {
                Some(None)
            } else {
                parse_optional_date(due.as_deref())?.map(Some)
            };
            let patch = GoalPatch {
                title,
                description,
                category: category.map(GoalCategory::from),
                progress: progress.map(Progress::clamped),
                due_date,
            };
            let goal = store.update(&id, patch)?;
            report_goal("Updated", &goal, json)?;
        }
        GoalCommand::Delete { id } => match store.remove(&id)? {
            Some(goal) => report_goal("Deleted", &goal, json)?,
            None if json => println!("null"),
            None => println!("No goal with id {}", id.trim()),
        },
    }
    Ok(())
}

fn run_command(app: &mut App, cli: Cli) -> Result<(), AppError> {
    let json = cli.json;
    match cli.command {
        Command::Add {
            title,
            description,
            priority,
            due,
            tags,
        } => {
            let title = match title {
                Some(value) if !value.trim().is_empty() => value,
                _ => return Err(AppError::invalid_input("title is required")),
            };

            let form = TaskFormData {
                description,
                priority,
                due_date: parse_optional_date(due.as_deref())?,
                tags,
                ..TaskFormData::new(title)
            };
            let task = app.tasks()?.add(form)?;
            report_task("Added", &task, json)?;
        }
        Command::Edit {
            id,
            title,
            description,
            clear_description,
            priority,
            due,
            clear_due,
            tags,
            clear_tags,
        } => {
            let patch = TaskPatch {
                title,
                description: if clear_description {
                    Some(None)
                } else {
                    description.map(Some)
                },
                status: None,
                priority,
                due_date: if clear_due {
                    Some(None)
                } else {
                    parse_optional_date(due.as_deref())?.map(Some)
                },
                tags: if clear_tags {
                    Some(Vec::new())
                } else if tags.is_empty() {
                    None
                } else {
                    Some(tags)
                },
            };
            if patch.is_empty() {
                return Err(AppError::invalid_input("nothing to update"));
            }
            let task = app.tasks()?.update(&id, patch)?;
            report_task("Updated", &task, json)?;
        }
        Command::Move { id, status } => {
            let task = app.tasks()?.update(&id, TaskPatch::status(status))?;
            if json {
                println!("{}", to_json(&task)?);
            } else {
                println!("Moved task: {} ({}) to {}", task.title, task.id, task.status);
            }
        }
        Command::Done { id } => {
            let task = app
                .tasks()?
                .update(&id, TaskPatch::status(TaskStatus::Completed))?;
            report_task("Completed", &task, json)?;
        }
        Command::Delete { id } => match app.tasks()?.remove(&id)? {
            Some(task) => report_task("Deleted", &task, json)?,
            None if json => println!("null"),
            None => println!("No task with id {}", id.trim()),
        },
        Command::Show { id } => {
            let store = app.tasks()?;
            let task = store
                .get(&id)
                .ok_or_else(|| AppError::not_found(planvibe_core::task_store::TASK_NOT_FOUND))?;
            if json {
                println!("{}", to_json(task)?);
            } else {
                print_task_plain(task);
            }
        }
        Command::List { status, tag } => {
            let store = app.tasks()?;
            let tasks: Vec<&Task> = store
                .tasks()
                .iter()
                .filter(|task| status.is_none_or(|wanted| task.status == wanted))
                .filter(|task| tag.as_deref().is_none_or(|wanted| task.has_tag(wanted)))
                .collect();
            if json {
                println!("{}", to_json(&tasks)?);
            } else {
                print_tasks_plain(&tasks);
            }
        }
        Command::Board => {
            let store = app.tasks()?;
            print_board(store, json)?;
        }
        Command::Dashboard => {
            let backend = app.config.backend;
            let summary = match backend {
                BackendMode::Remote => {
                    let session = session::load(&app.storage);
                    dashboard::fetch(&remote_client(&app.config, session.as_ref()))?
                }
                BackendMode::Local => DashboardSummary::derive(app.tasks()?.tasks(), &[], today()),
            };
            print_dashboard(&summary, json)?;
        }
        Command::Goal { goal } => run_goal_command(app, goal, json)?,
        Command::Register {
            username,
            email,
            password,
        } => {
            let client = remote_client(&app.config, None);
            let message = auth::register(
                &client,
                &Registration {
                    username,
                    email,
                    password,
                },
            )?;
            if json {
                println!("{}", serde_json::json!({ "message": message }));
            } else if message.is_empty() {
                println!("Registered");
            } else {
                println!("{message}");
            }
        }
        Command::Login { email, password } => {
            let client = remote_client(&app.config, None);
            let session = auth::login(&client, &Credentials { email, password })?;
            if !session::save(&mut app.storage, &session) {
                return Err(AppError::io("could not store the session"));
            }
            app.reset();
            if json {
                println!("{}", to_json(&session.user)?);
            } else {
                println!(
                    "Logged in as {} ({})",
                    session.user.username, session.user.email
                );
            }
        }
        Command::Logout => {
            if !session::clear(&mut app.storage) {
                return Err(AppError::io("could not remove the session"));
            }
            app.reset();
            if json {
                println!("{}", serde_json::json!({ "logged_out": true }));
            } else {
                println!("Logged out");
            }
        }
    }

    if let Some(store) = app.tasks.as_ref()
        && !store.state().last_write_ok
    {
        warn!("the last change was applied but could not be saved");
    }

    Ok(())
}

fn run_interactive(app: &mut App) -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("planvibe".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if !cli.config_override.is_empty() {
            eprintln!(
                "ERROR: {}",
                AppError::invalid_input(format!(
                    "{CONFIG_OVERRIDE_FLAG} is only accepted on the command line"
                ))
            );
            continue;
        }

        if let Err(err) = run_command(app, cli) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn load_app(raw_overrides: &[String]) -> Result<App, AppError> {
    let loaded = load_config_with_fallback();
    if let Some(err) = loaded.error.as_ref() {
        warn!(error = %err, "using default configuration");
    }
    let overrides = collect_overrides(raw_overrides).map_err(AppError::invalid_input)?;
    App::open(merge_overrides(&loaded.config, &overrides))
}

fn main() {
    init_tracing();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        let result = load_app(&[]).and_then(|mut app| run_interactive(&mut app));
        if let Err(err) = result {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if !err.use_stderr() {
                let _ = err.print();
                return;
            }
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let result = load_app(&cli.config_override).and_then(|mut app| run_command(&mut app, cli));
    if let Err(err) = result {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
