use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::backend::gotrue::GoTrueAuth;
use crate::backend::postgrest::PostgrestStore;
use crate::backend::rest::{RestClient, UreqClient};
use crate::backend::{AuthProvider, Credentials};
use crate::cli::CliCommand;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::guard::resolve_entry;
use crate::navigation::{History, Route};
use crate::session::SessionStore;
use crate::shell::{render_tasks, run_shell};
use crate::task::StatusFilter;
use crate::view::{Outcome, TaskView};

pub const PASSWORD_ENV: &str = "TASKDECK_PASSWORD";

/// Build the hosted auth and data store adapters around one shared session.
pub fn connect(config: &Config) -> Result<(GoTrueAuth, PostgrestStore)> {
    let api_key = config.api_key()?;
    let client: Arc<dyn RestClient> = Arc::new(UreqClient::new(&config.url, &api_key));
    let sessions = Arc::new(SessionStore::open(&config.session_file));
    Ok((
        GoTrueAuth::new(Arc::clone(&client), Arc::clone(&sessions)),
        PostgrestStore::new(client, sessions),
    ))
}

pub async fn run(command: CliCommand, config: Config) -> Result<()> {
    let (auth, store) = connect(&config)?;

    match command {
        CliCommand::Login { email } => {
            let password = read_password().await?;
            let session = auth
                .begin_session(&Credentials { email, password })
                .await?;
            println!(
                "signed in as {}",
                session.user.email.as_deref().unwrap_or(&session.user.id)
            );
            Ok(())
        }
        CliCommand::Logout => {
            auth.end_session().await?;
            println!("signed out");
            Ok(())
        }
        CliCommand::List { status, search } => {
            let status_filter: StatusFilter = status.parse()?;
            let view = TaskView::new(auth, store, History::new(Route::Tasks), config.view_options());
            // Filters set before mounting are picked up by the initial load.
            view.set_status_filter(status_filter).await;
            view.apply_search(search.unwrap_or_default()).await;

            match view.mount().await {
                Outcome::Failed(e) => Err(not_signed_in(e)),
                _ => {
                    print!("{}", render_tasks(&view.tasks(), &view.flags()));
                    Ok(())
                }
            }
        }
        CliCommand::Open => {
            let nav = History::default();
            if resolve_entry(&auth, &nav).await == Route::Login {
                return Err(not_signed_in(Error::AuthRequired(
                    "no active session".to_string(),
                )));
            }

            let view = Arc::new(TaskView::new(auth, store, nav, config.view_options()));
            if let Outcome::Failed(e) = view.mount().await {
                return Err(not_signed_in(e));
            }
            run_shell(&view).await?;
            info!(route = %view.navigator().current(), "task view closed");
            Ok(())
        }
    }
}

fn not_signed_in(e: Error) -> Error {
    match e {
        Error::AuthRequired(_) => {
            Error::AuthRequired("not signed in (run `taskdeck login --email <email>`)".to_string())
        }
        other => other,
    }
}

async fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    eprint!("password: ");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let line = lines
        .next_line()
        .await?
        .ok_or_else(|| Error::Validation("no password given".to_string()))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
