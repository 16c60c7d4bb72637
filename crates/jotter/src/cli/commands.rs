//! # Command Dispatch
//!
//! Parses the arguments, wires the facade to the saved session and maps each
//! subcommand onto one (or two) facade calls.
//!
//! Every run follows the same path:
//!
//! 1. Load config (`--config`, env, defaults) and the saved session.
//! 2. Call the facade. It never returns `Err`; failures arrive as a
//!    [`CmdResult`] with an error message and a failure class.
//! 3. Mirror the facade's session back to disk. A login writes it, a logout
//!    or a rejected credential removes it.
//! 4. Print the rendered body and messages to stdout, error messages to
//!    stderr. The return value tells `main` whether the command succeeded.

use super::render::{render_item, render_list, render_messages};
use super::session_file::SessionFile;
use super::setup::{
    build_command, AccountAction, Cli, Commands, CompletionShell, DraftArgs, HomeArgs, ItemAction,
    SearchArgs, TaskAction,
};
use anyhow::{bail, Result};
use chrono::Utc;
use clap::Parser;
use jotterapp::commands::{CmdResult, Redirect};
use jotterapp::config::JotterConfig;
use jotterapp::model::{Item, ItemId, Note, NoteDraft, Todo, TodoDraft};
use jotterapp::pagination::PaginationPatch;
use jotterapp::remote::{HttpRemote, ProfileUpdate, Registration, SearchQuery};
use jotterapp::JotterApi;
use tracing_subscriber::EnvFilter;

type Api = JotterApi<HttpRemote>;

/// What a subcommand produced: the facade's result and how to show it.
struct Outcome {
    result: CmdResult,
    body: Body,
}

enum Body {
    Messages,
    List,
    Item,
}

impl Outcome {
    fn messages(result: CmdResult) -> Self {
        Self {
            result,
            body: Body::Messages,
        }
    }

    fn list(result: CmdResult) -> Self {
        Self {
            result,
            body: Body::List,
        }
    }

    fn item(result: CmdResult) -> Self {
        Self {
            result,
            body: Body::Item,
        }
    }
}

pub async fn run() -> Result<bool> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completions { shell } = cli.command {
        print_completions(shell);
        return Ok(true);
    }

    let config = JotterConfig::load(cli.config.as_deref())?;
    tracing::debug!(api_url = %config.api_url, "config loaded");
    let session_file = SessionFile::locate(cli.data_dir.as_deref())?;
    let api = JotterApi::connect(config)?;
    if let Some(session) = session_file.load() {
        api.resume(session);
    }

    let outcome = dispatch(&api, cli.command).await?;

    match api.session() {
        Some(session) => session_file.save(&session)?,
        None => session_file.clear()?,
    }

    print_outcome(&outcome);
    Ok(!outcome.result.is_failure())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("JOTTER_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A second init (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_completions(shell: CompletionShell) {
    let mut cmd = build_command();
    let mut out = std::io::stdout();
    match shell {
        CompletionShell::Bash => {
            clap_complete::generate(clap_complete::Shell::Bash, &mut cmd, "jotter", &mut out)
        }
        CompletionShell::Zsh => {
            clap_complete::generate(clap_complete::Shell::Zsh, &mut cmd, "jotter", &mut out)
        }
    }
}

async fn dispatch(api: &Api, command: Commands) -> Result<Outcome> {
    let outcome = match command {
        Commands::Login { email, password } => {
            Outcome::messages(api.login(&email, &password).await)
        }
        Commands::Register {
            firstname,
            lastname,
            email,
            password,
        } => {
            let registration = Registration {
                firstname,
                lastname,
                email,
                password,
            };
            Outcome::messages(api.register(&registration).await)
        }
        Commands::Logout => Outcome::messages(api.logout()),
        Commands::Autosave { state } => Outcome::messages(api.set_autosave(state.enabled()).await),
        Commands::Account { action } => account_action(api, action).await?,
        Commands::Home(args) => home(api, args).await,
        Commands::Notes { action } => item_action::<Note>(api, action).await?,
        Commands::Todos { action } => item_action::<Todo>(api, action).await?,
        Commands::Tasks { action } => task_action(api, action).await,
        Commands::Search(args) => search(api, args).await,
        Commands::Completions { shell } => {
            print_completions(shell);
            Outcome::messages(CmdResult::default())
        }
    };
    Ok(outcome)
}

/// Builds an item draft from the create/edit flags.
trait DraftFromArgs: Item {
    fn build_draft(base: Option<Self::Draft>, fields: &DraftArgs) -> Result<Self::Draft>;
}

impl DraftFromArgs for Note {
    fn build_draft(base: Option<NoteDraft>, fields: &DraftArgs) -> Result<NoteDraft> {
        if fields.due.is_some() {
            bail!("--due only applies to todo lists");
        }
        let mut draft = base.unwrap_or_else(|| NoteDraft::new("", ""));
        if let Some(title) = fields.title() {
            draft.title = title;
        }
        if let Some(content) = &fields.content {
            draft.content = content.clone();
        }
        Ok(draft)
    }
}

impl DraftFromArgs for Todo {
    fn build_draft(base: Option<TodoDraft>, fields: &DraftArgs) -> Result<TodoDraft> {
        if fields.content.is_some() {
            bail!("--content only applies to notes");
        }
        let mut draft = base.unwrap_or_else(|| TodoDraft::new(""));
        if let Some(title) = fields.title() {
            draft.title = title;
        }
        if fields.due.is_some() {
            draft.due_date = fields.due;
        }
        Ok(draft)
    }
}

async fn item_action<T: DraftFromArgs>(api: &Api, action: ItemAction) -> Result<Outcome> {
    let outcome = match action {
        ItemAction::List(args) => {
            let view = args.view();
            if let Some(limit) = args.limit {
                let patch = PaginationPatch {
                    limit: Some(limit),
                    ..Default::default()
                };
                api.store().write(|s| s.set_pagination::<T>(view, &patch));
            }
            Outcome::list(api.fetch::<T>(view, args.page).await)
        }
        ItemAction::View { id } => Outcome::item(api.open::<T>(&ItemId::new(id)).await),
        ItemAction::Create(fields) => {
            let draft = T::build_draft(None, &fields)?;
            Outcome::item(api.create::<T>(draft).await)
        }
        ItemAction::Edit { id, fields } => {
            if fields.title.is_empty() && fields.content.is_none() && fields.due.is_none() {
                bail!("Nothing to change; pass a title, --content or --due");
            }
            Outcome::item(edit::<T>(api, &ItemId::new(id), &fields).await?)
        }
        ItemAction::Archive { id } => Outcome::messages(api.archive::<T>(&ItemId::new(id)).await),
        ItemAction::Unarchive { id } => {
            Outcome::messages(api.unarchive::<T>(&ItemId::new(id)).await)
        }
        ItemAction::Trash { id } => Outcome::messages(api.trash::<T>(&ItemId::new(id)).await),
        ItemAction::Restore { id } => Outcome::messages(api.restore::<T>(&ItemId::new(id)).await),
        ItemAction::Pin { id } => Outcome::messages(api.toggle_pin::<T>(&ItemId::new(id)).await),
        ItemAction::Delete { id } => {
            Outcome::messages(api.delete_permanently::<T>(&ItemId::new(id)).await)
        }
    };
    Ok(outcome)
}

/// Edits through an editing session so the change goes out as one save.
async fn edit<T: DraftFromArgs>(api: &Api, id: &ItemId, fields: &DraftArgs) -> Result<CmdResult> {
    let mut editor = match api.edit::<T>(id).await {
        Ok(editor) => editor,
        Err(failed) => return Ok(failed),
    };
    let draft = T::build_draft(Some(editor.draft()), fields)?;
    editor.edit(draft);
    let result = editor.save_now().await;
    editor.close();
    Ok(result)
}

async fn task_action(api: &Api, action: TaskAction) -> Outcome {
    let todo_id = match &action {
        TaskAction::Add { todo_id, .. }
        | TaskAction::Done { todo_id, .. }
        | TaskAction::Undone { todo_id, .. }
        | TaskAction::Rename { todo_id, .. }
        | TaskAction::Remove { todo_id, .. } => ItemId::new(todo_id.as_str()),
    };
    // Load the todo first so the task change lands on a cached copy we can show.
    let opened = api.open::<Todo>(&todo_id).await;
    if opened.is_failure() {
        return Outcome::messages(opened);
    }

    let result = match action {
        TaskAction::Add { title, .. } => api.add_task(&todo_id, &title.join(" ")).await,
        TaskAction::Done { task_id, .. } => {
            api.set_task_completed(&todo_id, &ItemId::new(task_id), true).await
        }
        TaskAction::Undone { task_id, .. } => {
            api.set_task_completed(&todo_id, &ItemId::new(task_id), false).await
        }
        TaskAction::Rename { task_id, title, .. } => {
            api.rename_task(&todo_id, &ItemId::new(task_id), &title.join(" ")).await
        }
        TaskAction::Remove { task_id, .. } => {
            api.remove_task(&todo_id, &ItemId::new(task_id)).await
        }
    };
    Outcome::item(result)
}

async fn account_action(api: &Api, action: AccountAction) -> Result<Outcome> {
    let outcome = match action {
        AccountAction::Profile {
            firstname,
            lastname,
            email,
        } => {
            if firstname.is_none() && lastname.is_none() && email.is_none() {
                bail!("Nothing to change; pass --firstname, --lastname or --email");
            }
            // Omitted fields are filled from the saved session.
            let profile = match api.session() {
                Some(session) => ProfileUpdate {
                    firstname: firstname.unwrap_or(session.user.firstname),
                    lastname: lastname.unwrap_or(session.user.lastname),
                    email: email.unwrap_or(session.user.email),
                },
                None => ProfileUpdate {
                    firstname: firstname.unwrap_or_default(),
                    lastname: lastname.unwrap_or_default(),
                    email: email.unwrap_or_default(),
                },
            };
            Outcome::messages(api.update_profile(&profile).await)
        }
        AccountAction::Password { old, new, confirm } => {
            Outcome::messages(api.change_password(&old, &new, &confirm).await)
        }
        AccountAction::Delete { yes } => {
            if !yes {
                bail!("Deleting the account removes every note and todo; pass --yes to confirm");
            }
            Outcome::messages(api.delete_account().await)
        }
    };
    Ok(outcome)
}

async fn home(api: &Api, args: HomeArgs) -> Outcome {
    let first = api.home(args.kind()).await;
    if first.is_failure() || args.page == 1 {
        return Outcome::list(first);
    }
    Outcome::list(api.home_page(args.page).await)
}

async fn search(api: &Api, args: SearchArgs) -> Outcome {
    let mut query = SearchQuery::new(args.keyword());
    query.kind = args.kind();
    query.category = args.category();

    let first = api.search(query).await;
    if first.is_failure() || args.page == 1 {
        return Outcome::list(first);
    }
    Outcome::list(api.search_page(args.page).await)
}

fn print_outcome(outcome: &Outcome) {
    let result = &outcome.result;
    let now = Utc::now();
    let body = match outcome.body {
        Body::List => render_list(&result.listed, now),
        Body::Item => result
            .affected
            .first()
            .map(|item| render_item(item, now))
            .unwrap_or_default(),
        Body::Messages => String::new(),
    };
    if !body.is_empty() {
        print!("{}", body);
        if matches!(outcome.body, Body::Item) {
            println!();
        }
    }
    print!("{}", render_messages(&result.messages, false));
    eprint!("{}", render_messages(&result.messages, true));
    match result.redirect {
        Some(Redirect::Login) if result.is_failure() => {
            eprintln!("Run `jotter login <EMAIL>` to start a new session.");
        }
        Some(Redirect::Register) => {
            println!("Run `jotter register <EMAIL>` to create a new account.");
        }
        _ => {}
    }
}
