use clap::{Parser, Subcommand};
use planvibe_core::config::{BackendMode, ConfigOverrides};
use planvibe_core::model::{TaskPriority, TaskStatus};

#[derive(Parser, Debug)]
#[command(name = "planvibe", author, version, about = "Track tasks and goals", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: planvibe add "Draft report" --priority high --due 2024-03-20 --tag work
    Add {
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long, default_value = "medium")]
        priority: TaskPriority,
        /// Due date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
        #[arg(short = 't', long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },
    /// Edit a task's fields
    ///
    /// Example: planvibe edit <ID> --title "Draft final report" --clear-due
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(short, long)]
        priority: Option<TaskPriority>,
        #[arg(long, value_name = "DATE", conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
        /// Replace the tag set
        #[arg(short = 't', long = "tag", value_name = "TAG", conflicts_with = "clear_tags")]
        tags: Vec<String>,
        #[arg(long)]
        clear_tags: bool,
    },
    /// Move a task to another status
    ///
    /// Example: planvibe move <ID> in-progress
    Move { id: String, status: TaskStatus },
    /// Mark a task as completed
    ///
    /// Example: planvibe done <ID>
    Done { id: String },
    /// Delete a task
    ///
    /// Example: planvibe delete <ID>
    Delete { id: String },
    /// Show details of a task
    ///
    /// Example: planvibe show <ID>
    Show { id: String },
    /// List tasks
    ///
    /// Example: planvibe list --status todo
    List {
        #[arg(short, long)]
        status: Option<TaskStatus>,
        #[arg(short = 't', long = "tag", value_name = "TAG")]
        tag: Option<String>,
    },
    /// Show tasks grouped by status
    ///
    /// Example: planvibe board
    Board,
    /// Summarize completed work, upcoming tasks and goal progress
    ///
    /// Example: planvibe dashboard
    Dashboard,
    /// Manage goals (remote backend)
    Goal {
        #[command(subcommand)]
        goal: GoalCommand,
    },
    /// Create an account on the backend
    ///
    /// Example: planvibe register ada ada@example.com --password secret1
    Register {
        username: String,
        email: String,
        #[arg(long, env = "PLANVIBE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in and remember the session
    ///
    /// Example: planvibe login ada@example.com --password secret1
    Login {
        email: String,
        #[arg(long, env = "PLANVIBE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    /// List goals
    ///
    /// Example: planvibe goal list --category learning
    List {
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Add a goal
    ///
    /// Example: planvibe goal add "Launch MVP" --category work --progress 10
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "Work")]
        category: String,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        progress: i64,
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
    },
    /// Edit a goal
    ///
    /// Example: planvibe goal edit <ID> --progress 75
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        progress: Option<i64>,
        #[arg(long, value_name = "DATE", conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
    },
    /// Delete a goal
    Delete { id: String },
}

/// Flag name used to identify config override arguments by the runtime.
pub const CONFIG_OVERRIDE_FLAG: &str = "--config-override";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Backend,
    ApiBase,
    UserId,
    DataDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let canonical_field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "backend" | "mode" => ConfigOverrideTarget::Backend,
        "api_base" | "api" | "api_url" | "base_url" => ConfigOverrideTarget::ApiBase,
        "user_id" | "user" => ConfigOverrideTarget::UserId,
        "data_dir" => ConfigOverrideTarget::DataDir,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

/// Folds raw overrides into [`ConfigOverrides`]; later values win.
pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::Backend => {
                let backend: BackendMode = parsed.value.parse().map_err(|err| format!("{err}"))?;
                overrides.backend = Some(backend);
            }
            ConfigOverrideTarget::ApiBase => {
                if parsed.value.is_empty() {
                    return Err("api_base override cannot be empty".to_string());
                }
                overrides.api_base = Some(parsed.value);
            }
            ConfigOverrideTarget::UserId => {
                let user_id = parsed
                    .value
                    .parse()
                    .map_err(|_| format!("user_id must be a number, got '{}'", parsed.value))?;
                overrides.user_id = Some(user_id);
            }
            ConfigOverrideTarget::DataDir => overrides.data_dir = Some(parsed.value),
        }
    }
    Ok(overrides)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
