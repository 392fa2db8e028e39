// SPDX-License-Identifier: AGPL-3.0
// Estate Finder CLI - Command handlers

use crate::cli::{Cli, Command};
use estate_finder_core::{
    AppContext, AppError, Candidate, CandidateKind, FileStorage, SearchPhase, SearchUpdate,
    SelectionState,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// How long to wait for the last search once input is closed
const SETTLE_GRACE: Duration = Duration::from_secs(10);

pub async fn run(cli: Cli) -> Result<(), AppError> {
    let storage = match &cli.config_dir {
        Some(dir) => FileStorage::in_dir(dir)?,
        None => FileStorage::new()?,
    };
    let storage_dir = storage.dir().to_path_buf();
    let context = AppContext::with_overrides(Arc::new(storage), cli.overrides())?;

    match cli.command {
        Command::Search { kind, json } => search(&context, kind.into(), json).await,
        Command::Select {
            city_id,
            city,
            area_id,
            area,
            locality,
        } => {
            let mut state = SelectionState::city(city_id, city);
            if let (Some(area_id), Some(area)) = (area_id, area) {
                state = state.with_area(area_id, area);
            }
            if let Some(locality) = locality {
                state = state.with_locality(locality);
            }
            context.select(state.clone())?;
            println!("Selected {}", state.display_name);
            Ok(())
        }
        Command::Show { json } => show(&context, json),
        Command::Recent { clear } => recent(&context, clear),
        Command::Config => config(&context, &storage_dir),
    }
}

/// One line of interactive input
#[derive(Debug, PartialEq, Eq)]
enum LineCommand<'a> {
    Text(&'a str),
    Pick(usize),
    Clear,
    Reload,
    Quit,
}

fn parse_line(line: &str) -> Result<LineCommand<'_>, String> {
    let Some(command) = line.trim().strip_prefix(':') else {
        return Ok(LineCommand::Text(line));
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("pick" | "p"), Some(n)) => n
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(LineCommand::Pick)
            .ok_or_else(|| format!("Not a result number: {}", n)),
        (Some("clear" | "c"), None) => Ok(LineCommand::Clear),
        (Some("reload" | "r"), None) => Ok(LineCommand::Reload),
        (Some("quit" | "q"), None) => Ok(LineCommand::Quit),
        _ => Err(format!("Unknown command: :{}", command)),
    }
}

/// The `n`-th (1-based) candidate of the last update
fn pick(last: Option<&SearchUpdate>, n: usize) -> Option<&Candidate> {
    last.and_then(|update| update.candidates.get(n.checked_sub(1)?))
}

async fn search(context: &AppContext, kind: CandidateKind, json: bool) -> Result<(), AppError> {
    let search = context.start_search(kind)?;
    let updates = search.updates();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut last: Option<SearchUpdate> = None;
    let mut typed: Option<String> = None;
    let mut chosen: Option<SelectionState> = None;
    let mut input_closed = false;

    if !json {
        eprintln!(
            "Type to search {}; :pick N to choose, :clear, :reload, :quit",
            kind.label().to_lowercase()
        );
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    input_closed = true;
                    break;
                };
                match parse_line(&line) {
                    Ok(LineCommand::Text(text)) => {
                        typed = Some(text.trim().to_string());
                        search.input(text).await?;
                    }
                    Ok(LineCommand::Clear) => {
                        typed = None;
                        search.clear().await?;
                    }
                    Ok(LineCommand::Reload) => search.reload().await?,
                    Ok(LineCommand::Pick(n)) => match pick(last.as_ref(), n) {
                        Some(candidate) => {
                            chosen = Some(context.choose(candidate)?);
                            break;
                        }
                        None => eprintln!("No result #{}", n),
                    },
                    Ok(LineCommand::Quit) => break,
                    Err(message) => eprintln!("{}", message),
                }
            }
            update = updates.recv() => {
                let Ok(update) = update else { break };
                print_update(&update, json);
                last = Some(update);
            }
        }
    }

    // Piped input: let the final query settle before exiting
    if input_closed {
        if let Some(query) = typed {
            let grace = context.effective_settings().debounce() + SETTLE_GRACE;
            wait_for_settle(&updates, &query, grace, json, last.as_ref()).await;
        }
    }

    search.shutdown().await;

    if let Some(state) = chosen {
        println!("Selected {}", state.display_name);
    }
    Ok(())
}

async fn wait_for_settle(
    updates: &async_channel::Receiver<SearchUpdate>,
    query: &str,
    grace: Duration,
    json: bool,
    last: Option<&SearchUpdate>,
) {
    if last.map(|update| is_settled(update, query)).unwrap_or(false) {
        return;
    }

    let deadline = tokio::time::sleep(grace);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                tracing::warn!("Gave up waiting for results for {:?}", query);
                break;
            }
            update = updates.recv() => {
                let Ok(update) = update else { break };
                print_update(&update, json);
                if is_settled(&update, query) {
                    break;
                }
            }
        }
    }
}

fn is_settled(update: &SearchUpdate, query: &str) -> bool {
    update.query == query && update.phase != SearchPhase::AwaitingRemote
}

fn print_update(update: &SearchUpdate, json: bool) {
    if json {
        match serde_json::to_string(update) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("Failed to serialize update: {}", e),
        }
    } else {
        print!("{}", render_update(update));
    }
}

fn render_update(update: &SearchUpdate) -> String {
    let status = match update.phase {
        SearchPhase::Idle => "cleared",
        SearchPhase::Filtering => "local",
        SearchPhase::AwaitingRemote => "searching",
        SearchPhase::Merged => "done",
        SearchPhase::Error => "local only",
    };

    let mut out = format!(
        "[{}] {} result(s), {}\n",
        update.query,
        update.candidates.len(),
        status
    );
    for (i, candidate) in update.candidates.iter().enumerate() {
        match &candidate.area_name {
            Some(area) => out.push_str(&format!("  {:>2}. {} ({})\n", i + 1, candidate.name, area)),
            None => out.push_str(&format!("  {:>2}. {}\n", i + 1, candidate.name)),
        }
    }
    if let Some(notice) = &update.notice {
        out.push_str(&format!("  ! {}\n", notice));
    }
    out
}

fn show(context: &AppContext, json: bool) -> Result<(), AppError> {
    let state = context.selection.get();
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else if state.is_empty() {
        println!("No location selected");
    } else {
        println!("{}", state.display_name);
    }
    Ok(())
}

fn recent(context: &AppContext, clear: bool) -> Result<(), AppError> {
    if clear {
        context.recent.clear()?;
        println!("Cleared recent locations");
        return Ok(());
    }

    let locations = context.recent.list();
    if locations.is_empty() {
        println!("No recent locations");
    }
    for (i, location) in locations.iter().enumerate() {
        println!("{:>2}. {}", i + 1, location.display_name);
    }
    Ok(())
}

fn config(context: &AppContext, storage_dir: &Path) -> Result<(), AppError> {
    println!("Config directory: {}", storage_dir.display());
    println!("{}", serde_json::to_string_pretty(&context.effective_settings())?);
    Ok(())
}
