//! Command implementations

use anyhow::{Context, Result, anyhow, bail};
use chrono::Local;
use log::{info, warn};
use mail::compose::{ComposeContext, StyleMetrics, build_compose_prompt};
use mail::driver::FixedDriverFactory;
use mail::fetch::{ActionPageFetcher, HttpPageFetcher, ListKey, PageFetcher};
use mail::storage::EarlyAccessOutcome;
use mail::view::{DraftsListView, EmptyState, RowView, ThreadListView};
use mail::{
    ActionContext, ActionResult, Connection, ConnectionStore, DriverFactory, EmailAddress,
    InMemoryConnectionStore, LabelDelta, MailActions, ProviderDrivers, Revalidator, Session,
    SessionProvider, Settings, SqliteConnectionStore, StaticSession, ThreadPage,
};
use std::sync::Arc;

use crate::cli::{Cli, Commands};
use crate::{demo, render};

/// Saved session filename in the Zero config directory
const SESSION_FILE: &str = "session.json";

/// Logs stale paths; the terminal has no cached views to refresh
struct LogRevalidator;

impl Revalidator for LogRevalidator {
    fn revalidate(&self, path: &str) {
        info!("Revalidating {}", path);
    }
}

/// Everything a command needs
struct App {
    settings: Settings,
    store: Arc<dyn ConnectionStore>,
    sessions: Arc<StaticSession>,
    actions: MailActions,
    compact: bool,
    offline: bool,
}

impl App {
    fn open(cli: &Cli) -> Result<Self> {
        let settings = Settings::load()?;

        let store: Arc<dyn ConnectionStore>;
        let drivers: Arc<dyn DriverFactory>;
        let session;
        if cli.offline {
            let memory = InMemoryConnectionStore::new();
            memory.upsert_connection(demo::connection())?;
            store = Arc::new(memory);
            drivers = Arc::new(FixedDriverFactory::new(Arc::new(demo::mailbox())));
            session = Some(Session::new(
                demo::USER_ID,
                Some(demo::CONNECTION_ID.to_string()),
            ));
        } else {
            let path = cli
                .db
                .clone()
                .or_else(|| settings.database_path())
                .context("Could not determine database path")?;
            store = Arc::new(SqliteConnectionStore::open(&path)?);
            drivers = Arc::new(ProviderDrivers::from_env());
            session = resolve_session(cli);
        }

        let sessions = Arc::new(StaticSession::new(session));
        let context = ActionContext::new(
            sessions.clone(),
            store.clone(),
            drivers,
            Arc::new(LogRevalidator),
        );

        Ok(Self {
            settings,
            store,
            sessions,
            actions: MailActions::new(context),
            compact: cli.compact,
            offline: cli.offline,
        })
    }

    /// Forget the saved session once the action layer signed it out
    fn forget_revoked_session(&self) {
        if self.offline || self.sessions.current_session().is_some() {
            return;
        }
        warn!("The connection was revoked; run `zero connect` again");
        if let Some(path) = config::config_path(SESSION_FILE)
            && path.exists()
            && let Err(e) = std::fs::remove_file(&path)
        {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Session from flags, falling back to the saved one
fn resolve_session(cli: &Cli) -> Option<Session> {
    let saved: Option<Session> = if config::config_exists(SESSION_FILE) {
        config::load_json(SESSION_FILE)
            .map_err(|e| warn!("Ignoring saved session: {:#}", e))
            .ok()
    } else {
        None
    };

    let user = cli
        .user
        .clone()
        .or_else(|| saved.as_ref().map(|s| s.user_id.clone()))?;
    let connection = cli
        .connection
        .clone()
        .or_else(|| saved.and_then(|s| s.connection_id));
    Some(Session::new(user, connection))
}

pub fn run(cli: Cli) -> Result<()> {
    let app = App::open(&cli)?;
    let result = execute(&app, cli);
    app.forget_revoked_session();
    result
}

fn execute(app: &App, cli: Cli) -> Result<()> {
    let actions = &app.actions;
    match cli.command {
        Commands::Connect {
            id,
            email,
            provider,
            access_token,
            refresh_token,
        } => {
            let user = cli
                .user
                .or_else(|| resolve_session_user(app))
                .context("--user is required for the first connection")?;
            let connection = Connection::new(&id, &user, provider, email)
                .with_tokens(access_token, refresh_token);
            app.store.upsert_connection(connection)?;
            if !app.offline {
                config::save_json(SESSION_FILE, &Session::new(user, Some(id.clone())))?;
            }
            println!("Connected {id}");
            Ok(())
        }
        Commands::List {
            folder,
            query,
            pages,
            max,
            remote,
        } => {
            let fetcher: Box<dyn PageFetcher<ThreadPage>> = if remote {
                Box::new(HttpPageFetcher::new(app.settings.api_base_url.clone()))
            } else {
                Box::new(ActionPageFetcher::new(actions.clone()))
            };
            let mut view = ThreadListView::new(
                actions.clone(),
                fetcher,
                folder.as_str(),
                &app.settings,
                app.compact,
            )
            .with_page_size(max.unwrap_or(app.settings.default_page_size));
            view.navigate(&folder, &query);
            require_session(actions, view.list().key())?;
            list_threads(&mut view, pages)
        }
        Commands::Drafts { query, pages } => {
            let fetcher = Box::new(ActionPageFetcher::new(actions.clone()));
            let mut view = DraftsListView::new(actions.clone(), fetcher, &app.settings, app.compact);
            view.search(&query);
            require_session(actions, view.list().key())?;
            for _ in 0..pages.max(1) {
                if !view.load_more()? {
                    break;
                }
            }
            let now = Local::now();
            let drafts = view.drafts();
            if drafts.is_empty() {
                println!("No drafts");
            }
            for draft in drafts {
                println!("{}", render::row(&RowView::for_draft(draft, view.selection(), &query, now)));
            }
            Ok(())
        }
        Commands::Show { id, remote } => {
            let detail = if remote {
                HttpPageFetcher::new(app.settings.api_base_url.clone()).fetch_thread(&id)?
            } else {
                actions.get_mail(&id)?
            };
            print!("{}", render::thread(&detail));
            Ok(())
        }
        Commands::Read(t) => report(actions.mark_as_read(&t.ids)?),
        Commands::Unread(t) => report(actions.mark_as_unread(&t.ids)?),
        Commands::Important(t) => report(actions.mark_as_important(&t.ids)?),
        Commands::Star(t) => report(actions.bulk_star(&t.ids)?),
        Commands::Unstar(t) => report(actions.bulk_unstar(&t.ids)?),
        Commands::Archive(t) => report(actions.bulk_archive(&t.ids)?),
        Commands::Trash(t) => report(actions.bulk_delete_thread(&t.ids)?),
        Commands::Mute(t) => report(actions.mute_thread(&t.ids)?),
        Commands::ToggleStar(t) => report(actions.toggle_star(&t.ids)?),
        Commands::Labels { add, remove, ids } => {
            report(actions.modify_labels(&ids, &LabelDelta::new(add, remove))?)
        }
        Commands::Delete { id } => report(actions.delete_thread(&id)?),
        Commands::Prompt {
            metrics,
            draft,
            subject,
            to,
            reply_to,
            request,
        } => {
            let json = std::fs::read_to_string(&metrics)
                .with_context(|| format!("Failed to read {}", metrics.display()))?;
            let metrics = StyleMetrics::from_json(&json)?;

            let mut context = ComposeContext::new(request.join(" "));
            if let Some(draft) = draft {
                context = context.with_draft(draft);
            }
            if let Some(subject) = subject {
                context = context.with_subject(subject);
            }
            if let Some(to) = to {
                context = context.with_recipients(EmailAddress::parse_list(&to));
            }
            if let Some(id) = reply_to {
                context = context.reply_to(&actions.get_mail(&id)?);
            }

            println!("{}", build_compose_prompt(&metrics, &context)?);
            Ok(())
        }
        Commands::Waitlist { email } => {
            match app.store.register_early_access(&email)? {
                EarlyAccessOutcome::Registered => println!("Added to the waitlist"),
                EarlyAccessOutcome::AlreadyRegistered => println!("Already on the waitlist"),
            }
            Ok(())
        }
    }
}

/// A list without a key never fetches; report why instead of printing nothing
fn require_session(actions: &MailActions, key: Option<&ListKey>) -> Result<()> {
    if key.is_none() {
        actions.context().get_active_driver()?;
    }
    Ok(())
}

fn resolve_session_user(app: &App) -> Option<String> {
    app.sessions.current_session().map(|s| s.user_id)
}

fn list_threads(view: &mut ThreadListView, pages: usize) -> Result<()> {
    for _ in 0..pages.max(1) {
        if !view.load_more()? {
            break;
        }
    }

    if let Some(empty) = view.empty_state() {
        match empty {
            EmptyState::Search => println!("No results"),
            EmptyState::Folder(folder) => println!("{folder} is empty"),
        }
        return Ok(());
    }

    let now = Local::now();
    for thread in view.threads() {
        let row = RowView::for_thread(thread, view.selection(), view.query(), now);
        println!("{}", render::row(&row));
    }
    if let Some(token) = view.list().next_page_token() {
        info!("More threads available (next page {})", token);
    }
    Ok(())
}

fn report(result: ActionResult) -> Result<()> {
    if result.success {
        println!("Done");
        return Ok(());
    }
    match result.error {
        Some(error) => Err(anyhow!(error)),
        None => bail!("Action failed"),
    }
}
