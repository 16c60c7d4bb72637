use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use jotterapp::model::{ItemKind, Partition};
use jotterapp::store::View;
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
}

const COMPLETIONS_HELP: &str = "Enable shell completions:
  eval \"$(jotter completions bash)\"  # add to ~/.bashrc
  eval \"$(jotter completions zsh)\"   # add to ~/.zshrc";

#[derive(Parser, Debug)]
#[command(
    name = "jotter",
    bin_name = "jotter",
    version,
    disable_help_subcommand = true,
    after_help = COMPLETIONS_HELP
)]
#[command(about = "Notes and todo lists from the command line", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "JOTTER_CONFIG", help_heading = "Options")]
    pub config: Option<PathBuf>,

    /// Directory holding the saved session
    #[arg(long, global = true, env = "JOTTER_DATA_DIR", help_heading = "Options")]
    pub data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

/// Builds the clap Command, used for completion scripts.
pub fn build_command() -> clap::Command {
    Cli::command()
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and remember the session
    #[command(display_order = 1)]
    Login {
        email: String,

        /// Password (prefer the environment variable over the flag)
        #[arg(long, env = "JOTTER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account
    #[command(display_order = 2)]
    Register {
        #[arg(long)]
        firstname: String,

        #[arg(long)]
        lastname: String,

        email: String,

        #[arg(long, env = "JOTTER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the saved session
    #[command(display_order = 3)]
    Logout,

    /// Turn autosave on or off for this account
    #[command(display_order = 4)]
    Autosave { state: Toggle },

    /// Manage the logged-in account
    #[command(display_order = 5)]
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Active notes and todos together, newest first
    #[command(alias = "h", display_order = 9)]
    Home(HomeArgs),

    /// Work with notes
    #[command(alias = "n", display_order = 10)]
    Notes {
        #[command(subcommand)]
        action: ItemAction,
    },

    /// Work with todo lists
    #[command(alias = "t", display_order = 11)]
    Todos {
        #[command(subcommand)]
        action: ItemAction,
    },

    /// Manage the tasks of a todo list
    #[command(display_order = 12)]
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Search notes and todos
    #[command(alias = "s", display_order = 20)]
    Search(SearchArgs),

    /// Print a shell completion script
    #[command(display_order = 30)]
    Completions { shell: CompletionShell },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        matches!(self, Toggle::On)
    }
}

#[derive(Subcommand, Debug)]
pub enum AccountAction {
    /// Change name or email; omitted fields keep their current value
    Profile {
        #[arg(long)]
        firstname: Option<String>,

        #[arg(long)]
        lastname: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },

    /// Change the password
    Password {
        /// Current password
        #[arg(long, env = "JOTTER_PASSWORD", hide_env_values = true)]
        old: String,

        #[arg(long, env = "JOTTER_NEW_PASSWORD", hide_env_values = true)]
        new: String,

        /// Repeat of the new password
        #[arg(long, env = "JOTTER_CONFIRM_PASSWORD", hide_env_values = true)]
        confirm: String,
    },

    /// Delete the account with all of its notes and todos
    Delete {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct HomeArgs {
    /// Only show notes
    #[arg(long, conflicts_with = "todos")]
    pub notes: bool,

    /// Only show todo lists
    #[arg(long, conflicts_with = "notes")]
    pub todos: bool,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,
}

impl HomeArgs {
    pub fn kind(&self) -> Option<ItemKind> {
        match (self.notes, self.todos) {
            (true, _) => Some(ItemKind::Note),
            (_, true) => Some(ItemKind::Todo),
            _ => None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ItemAction {
    /// List one page of items
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show one item in full
    #[command(alias = "v")]
    View { id: String },

    /// Create an item
    #[command(alias = "new")]
    Create(DraftArgs),

    /// Change an item's fields
    Edit {
        id: String,

        #[command(flatten)]
        fields: DraftArgs,
    },

    /// Move an active item to the archive
    Archive { id: String },

    /// Bring an archived item back
    Unarchive { id: String },

    /// Move an item to the trash
    #[command(alias = "rm")]
    Trash { id: String },

    /// Bring a trashed item back to the active list
    Restore { id: String },

    /// Pin or unpin an item
    Pin { id: String },

    /// Delete a trashed item for good
    Delete { id: String },
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// List archived items
    #[arg(long, conflicts_with_all = ["trashed", "pinned"])]
    pub archived: bool,

    /// List trashed items
    #[arg(long, conflicts_with_all = ["archived", "pinned"])]
    pub trashed: bool,

    /// List pinned items
    #[arg(long, conflicts_with_all = ["archived", "trashed"])]
    pub pinned: bool,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Items per page (defaults to the configured page size)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: Option<u32>,
}

impl ListArgs {
    pub fn view(&self) -> View {
        if self.archived {
            View::ARCHIVED
        } else if self.trashed {
            View::TRASHED
        } else if self.pinned {
            View::Pinned
        } else {
            View::ACTIVE
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct DraftArgs {
    /// Title words
    #[arg(trailing_var_arg = true)]
    pub title: Vec<String>,

    /// Note body
    #[arg(long)]
    pub content: Option<String>,

    /// Due date of a todo list (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<NaiveDate>,
}

impl DraftArgs {
    pub fn title(&self) -> Option<String> {
        if self.title.is_empty() {
            None
        } else {
            Some(self.title.join(" "))
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum TaskAction {
    /// Add a task to a todo list
    Add {
        todo_id: String,

        #[arg(required = true, trailing_var_arg = true)]
        title: Vec<String>,
    },

    /// Mark a task as completed
    Done { todo_id: String, task_id: String },

    /// Mark a task as not completed
    Undone { todo_id: String, task_id: String },

    /// Change a task's title
    Rename {
        todo_id: String,
        task_id: String,

        #[arg(required = true, trailing_var_arg = true)]
        title: Vec<String>,
    },

    /// Remove a task
    Remove { todo_id: String, task_id: String },
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    #[arg(required = true)]
    pub keyword: Vec<String>,

    /// Only search notes
    #[arg(long, conflicts_with = "todos")]
    pub notes: bool,

    /// Only search todo lists
    #[arg(long, conflicts_with = "notes")]
    pub todos: bool,

    /// Only search archived items
    #[arg(long, conflicts_with = "trashed")]
    pub archived: bool,

    /// Only search trashed items
    #[arg(long, conflicts_with = "archived")]
    pub trashed: bool,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,
}

impl SearchArgs {
    pub fn keyword(&self) -> String {
        self.keyword.join(" ")
    }

    pub fn kind(&self) -> Option<ItemKind> {
        match (self.notes, self.todos) {
            (true, _) => Some(ItemKind::Note),
            (_, true) => Some(ItemKind::Todo),
            _ => None,
        }
    }

    pub fn category(&self) -> Option<Partition> {
        match (self.archived, self.trashed) {
            (true, _) => Some(Partition::Archived),
            (_, true) => Some(Partition::Trashed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("jotter").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_flags_pick_the_view() {
        let cli = parse(&["notes", "list", "--trashed", "--page", "2"]);
        match cli.command {
            Commands::Notes {
                action: ItemAction::List(args),
            } => {
                assert_eq!(args.view(), View::TRASHED);
                assert_eq!(args.page, 2);
                assert_eq!(args.limit, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn list_views_are_exclusive() {
        let err = Cli::try_parse_from(["jotter", "todos", "ls", "--archived", "--pinned"]);
        assert!(err.is_err());
    }

    #[test]
    fn page_zero_is_rejected() {
        assert!(Cli::try_parse_from(["jotter", "notes", "ls", "--page", "0"]).is_err());
    }

    #[test]
    fn create_joins_title_words_and_parses_due_date() {
        let cli = parse(&["todos", "create", "--due", "2024-05-01", "Weekly", "groceries"]);
        match cli.command {
            Commands::Todos {
                action: ItemAction::Create(draft),
            } => {
                assert_eq!(draft.title().as_deref(), Some("Weekly groceries"));
                assert_eq!(draft.due, NaiveDate::from_ymd_opt(2024, 5, 1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn home_kind_and_page() {
        let cli = parse(&["home", "--todos", "--page", "3"]);
        match cli.command {
            Commands::Home(args) => {
                assert_eq!(args.kind(), Some(ItemKind::Todo));
                assert_eq!(args.page, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from(["jotter", "home", "--notes", "--todos"]).is_err());
    }

    #[test]
    fn profile_fields_are_optional() {
        let cli = parse(&["account", "profile", "--email", "ada@example.org"]);
        match cli.command {
            Commands::Account {
                action: AccountAction::Profile {
                    firstname,
                    lastname,
                    email,
                },
            } => {
                assert_eq!(firstname, None);
                assert_eq!(lastname, None);
                assert_eq!(email.as_deref(), Some("ada@example.org"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn password_change_takes_three_values() {
        let cli = parse(&["account", "password", "--old", "a", "--new", "b", "--confirm", "b"]);
        match cli.command {
            Commands::Account {
                action: AccountAction::Password { old, new, confirm },
            } => assert_eq!((old.as_str(), new.as_str(), confirm.as_str()), ("a", "b", "b")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn search_filters() {
        let cli = parse(&["search", "milk", "run", "--todos", "--trashed"]);
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.keyword(), "milk run");
                assert_eq!(args.kind(), Some(ItemKind::Todo));
                assert_eq!(args.category(), Some(Partition::Trashed));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
