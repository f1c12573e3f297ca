use std::fmt::Write as _;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::warn;

use crate::backend::{AuthProvider, DataStore};
use crate::error::{Error, Result};
use crate::list::TransientFlags;
use crate::navigation::Navigator;
use crate::task::{Status, StatusFilter, Task, TaskStats};
use crate::view::{Outcome, TaskView};

const HELP: &str = "\
commands:
  add <title> [| description] [| status]   create a task
  rm <n|id>                                delete a task
  set <n|id> <todo|in-progress|done>       change a task's status
  done-all                                 mark every open task done
  filter <all|todo|in-progress|done>       filter by status
  search [text]                            search titles (empty clears)
  list                                     show tasks
  stats                                    show counts
  logout                                   sign out and leave
  quit                                     leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Add {
        title: String,
        description: String,
        status: Status,
    },
    Remove(String),
    SetStatus(String, Status),
    DoneAll,
    Filter(StatusFilter),
    Search(String),
    List,
    Stats,
    Logout,
    Quit,
    Help,
}

pub fn parse_command(line: &str) -> Result<ShellCommand> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "add" => {
            let mut parts = rest.split('|').map(str::trim);
            let title = parts.next().unwrap_or_default().to_string();
            let description = parts.next().unwrap_or_default().to_string();
            let status = match parts.next() {
                Some(s) if !s.is_empty() => s.parse()?,
                _ => Status::Todo,
            };
            ShellCommand::Add {
                title,
                description,
                status,
            }
        }
        "rm" | "delete" => ShellCommand::Remove(required(rest, "rm <n|id>")?.to_string()),
        "set" => {
            let usage = "set <n|id> <status>";
            let (target, status) = required(rest, usage)?
                .split_once(char::is_whitespace)
                .ok_or_else(|| Error::Validation(format!("usage: {usage}")))?;
            ShellCommand::SetStatus(target.to_string(), status.parse()?)
        }
        "done-all" => ShellCommand::DoneAll,
        "filter" => ShellCommand::Filter(required(rest, "filter <status>")?.parse()?),
        "search" => ShellCommand::Search(rest.to_string()),
        "list" | "ls" => ShellCommand::List,
        "stats" => ShellCommand::Stats,
        "logout" => ShellCommand::Logout,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        "help" | "?" => ShellCommand::Help,
        other => {
            return Err(Error::Validation(format!(
                "unknown command: {other} (try `help`)"
            )));
        }
    };
    Ok(command)
}

fn required<'a>(rest: &'a str, usage: &str) -> Result<&'a str> {
    if rest.is_empty() {
        Err(Error::Validation(format!("usage: {usage}")))
    } else {
        Ok(rest)
    }
}

/// Resolve a 1-based list position or a literal id to a task id.
pub fn resolve_target(tasks: &[Task], target: &str) -> Option<String> {
    if let Some(task) = tasks.iter().find(|t| t.id == target) {
        return Some(task.id.clone());
    }
    let n: usize = target.parse().ok()?;
    tasks.get(n.checked_sub(1)?).map(|t| t.id.clone())
}

pub fn render_tasks(tasks: &[Task], flags: &TransientFlags) -> String {
    if tasks.is_empty() {
        return "No tasks found\n".to_string();
    }
    let mut out = String::new();
    for (i, task) in tasks.iter().enumerate() {
        let row = flags.row(&task.id);
        let busy = if row.deleting {
            " (deleting)"
        } else if row.updating {
            " (updating)"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "{:>3}. [{:<11}] {}{busy}  ({})",
            i + 1,
            task.status,
            task.title,
            task.id
        );
        if !task.description.is_empty() {
            let _ = writeln!(out, "       {}", task.description);
        }
    }
    out
}

pub fn render_stats(stats: &TaskStats) -> String {
    format!(
        "total {}  todo {}  in-progress {}  done {}",
        stats.total, stats.todo, stats.in_progress, stats.done
    )
}

enum Flow {
    Continue,
    Quit,
}

/// Run the interactive task view on stdin until the user quits, signs out,
/// or closes the input.
pub async fn run_shell<A, D, N>(view: &Arc<TaskView<A, D, N>>) -> Result<()>
where
    A: AuthProvider + Send + Sync + 'static,
    D: DataStore + Send + Sync + 'static,
    N: Navigator + 'static,
{
    run_shell_with(view, BufReader::new(tokio::io::stdin())).await
}

/// Shell loop over any line source. Store calls run on a `JoinSet`, so
/// input, debounced search and notifications keep flowing while they are in
/// flight. Pending calls are awaited before returning.
pub async fn run_shell_with<A, D, N, R>(view: &Arc<TaskView<A, D, N>>, input: R) -> Result<()>
where
    A: AuthProvider + Send + Sync + 'static,
    D: DataStore + Send + Sync + 'static,
    N: Navigator + 'static,
    R: AsyncBufRead + Unpin,
{
    let mut search = view.search_updates();
    let mut toasts = view.notifier().subscribe();
    let mut lines = input.lines();
    let mut in_flight: JoinSet<Outcome> = JoinSet::new();

    print!("{}", render_tasks(&view.tasks(), &view.flags()));
    println!("type `help` for commands");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if let Flow::Quit = execute(view, &line, &mut in_flight).await {
                    break;
                }
            }
            Ok(()) = search.changed() => {
                let term = search.borrow_and_update().clone();
                let view = Arc::clone(view);
                in_flight.spawn(async move { view.apply_search(term).await });
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                match joined {
                    Ok(Outcome::Applied) => print!("{}", render_tasks(&view.tasks(), &view.flags())),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "command task failed"),
                }
            }
            Ok(toast) = toasts.recv() => {
                println!("[{}] {}", toast.severity, toast.message);
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "command task failed");
        }
    }
    Ok(())
}

/// Handle one input line. Local commands finish here; store calls are
/// spawned onto `in_flight`.
async fn execute<A, D, N>(
    view: &Arc<TaskView<A, D, N>>,
    line: &str,
    in_flight: &mut JoinSet<Outcome>,
) -> Flow
where
    A: AuthProvider + Send + Sync + 'static,
    D: DataStore + Send + Sync + 'static,
    N: Navigator + 'static,
{
    let command = match parse_command(line) {
        Ok(command) => command,
        Err(e) => {
            println!("{e}");
            return Flow::Continue;
        }
    };

    let handle = Arc::clone(view);
    match command {
        ShellCommand::Add {
            title,
            description,
            status,
        } => {
            if !view.can_submit(&title) {
                println!("a task needs a title");
                return Flow::Continue;
            }
            in_flight.spawn(async move { handle.create_task(&title, &description, status).await });
        }
        ShellCommand::Remove(target) => match resolve_target(&view.tasks(), &target) {
            Some(id) => {
                in_flight.spawn(async move { handle.delete_task(&id).await });
            }
            None => return no_such_task(&target),
        },
        ShellCommand::SetStatus(target, status) => match resolve_target(&view.tasks(), &target) {
            Some(id) => {
                in_flight.spawn(async move { handle.change_status(&id, status).await });
            }
            None => return no_such_task(&target),
        },
        ShellCommand::DoneAll => {
            in_flight.spawn(async move { handle.mark_all_done().await });
        }
        ShellCommand::Filter(filter) => {
            in_flight.spawn(async move { handle.set_status_filter(filter).await });
        }
        ShellCommand::Search(text) => view.search_input(text),
        ShellCommand::List => print!("{}", render_tasks(&view.tasks(), &view.flags())),
        ShellCommand::Stats => println!("{}", render_stats(&view.stats())),
        ShellCommand::Logout => {
            view.logout().await;
            println!("signed out");
            return Flow::Quit;
        }
        ShellCommand::Quit => return Flow::Quit,
        ShellCommand::Help => println!("{HELP}"),
    }
    Flow::Continue
}

fn no_such_task(target: &str) -> Flow {
    println!("no task matches {target}");
    Flow::Continue
}
