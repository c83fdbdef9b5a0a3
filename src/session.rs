//! Line-oriented browse session.
//!
//! Reads one command per line and prints the resulting view. Page fetches and
//! bulk selections run as background tasks, so the user can keep paging (or
//! start a "select first N") while a slow page is still loading. The view is
//! printed again when a fetch lands; a page request overtaken by a newer one
//! prints nothing.
//!
//! Commands:
//! - `n` / `next`, `p` / `prev`: move one page
//! - `g <page>`: go to a 1-based page number
//! - `t <id>`: toggle a record by id
//! - `a` / `all`: toggle every row on the visible page
//! - `s <count>`: select the first `count` records of the catalog
//! - `c` / `clear`: clear the selection
//! - `r` / `retry`: reload the current page
//! - `l` / `list`: print the current page again
//! - `selected`: print the selected ids
//! - `q` / `quit`

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;
use tracing::debug;

use crate::browser::{Browser, BrowserView};
use crate::bulk::{BulkReport, BulkSelectError};
use crate::model::RecordId;
use crate::pagination::{PageOutcome, PendingPage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseCommand {
    Next,
    Previous,
    Goto(usize),
    Toggle(RecordId),
    TogglePage,
    SelectFirst(String),
    Clear,
    Retry,
    List,
    Selected,
    Quit,
}

pub fn parse_browse_command(line: &str) -> Result<BrowseCommand, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Err("empty command".into());
    };
    let rest: Vec<&str> = parts.collect();
    let arg = rest.join(" ");

    match head.to_ascii_lowercase().as_str() {
        "n" | "next" => Ok(BrowseCommand::Next),
        "p" | "prev" | "previous" => Ok(BrowseCommand::Previous),
        "g" | "goto" => match arg.parse::<usize>() {
            Ok(page) if page >= 1 => Ok(BrowseCommand::Goto(page - 1)),
            _ => Err(format!("goto needs a page number >= 1, got `{arg}`")),
        },
        "t" | "toggle" => arg
            .trim_start_matches('#')
            .parse::<u64>()
            .map(|id| BrowseCommand::Toggle(RecordId(id)))
            .map_err(|_| format!("toggle needs a record id, got `{arg}`")),
        "a" | "all" => Ok(BrowseCommand::TogglePage),
        "s" | "select" => Ok(BrowseCommand::SelectFirst(arg)),
        "c" | "clear" => Ok(BrowseCommand::Clear),
        "r" | "retry" => Ok(BrowseCommand::Retry),
        "l" | "list" => Ok(BrowseCommand::List),
        "selected" => Ok(BrowseCommand::Selected),
        "q" | "quit" | "exit" => Ok(BrowseCommand::Quit),
        other => Err(format!("unknown command `{other}`")),
    }
}

/// Text rendering of a view: header, one line per row, footer.
pub fn render_view(view: &BrowserView) -> String {
    let state = &view.pagination;
    let mut out = String::new();

    let first = view.buffered_page_index * state.page_size;
    out.push_str(&format!(
        "Page {}/{} (rows {}-{} of {})",
        view.buffered_page_index + 1,
        view.page_count.max(1),
        if view.rows.is_empty() { 0 } else { first + 1 },
        if view.rows.is_empty() { 0 } else { first + view.rows.len() },
        state.total_count
    ));
    if state.loading {
        out.push_str(" [loading]");
    }
    if let Some(kind) = state.last_error {
        out.push_str(&format!(
            " [error: {kind} loading page {}]",
            state.current_page_index + 1
        ));
    }
    out.push('\n');

    for row in &view.rows {
        let art = &row.artwork;
        let years = match (art.date_start, art.date_end) {
            (Some(s), Some(e)) if s != e => format!("{s}-{e}"),
            (Some(s), _) => s.to_string(),
            (None, Some(e)) => e.to_string(),
            (None, None) => String::new(),
        };
        out.push_str(&format!(
            "[{}] {:>8}  {} | {} | {} | {}\n",
            if row.selected { "x" } else { " " },
            art.id,
            art.display_title(),
            art.place_of_origin.as_deref().unwrap_or("-"),
            art.artist_display
                .as_deref()
                .unwrap_or("-")
                .replace('\n', " "),
            years
        ));
    }
    out.push_str(&format!("selected: {}\n", view.selected_count));
    out
}

type BulkResult = Result<BulkReport, BulkSelectError>;

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum SessionEvent<'a> {
    View { view: &'a BrowserView },
    Bulk {
        report: Option<BulkReport>,
        error: Option<String>,
        selected_count: usize,
    },
    Selected { ids: Vec<RecordId> },
    Message { text: String },
}

struct Printer<'w, W: Write> {
    out: &'w mut W,
    json: bool,
}

impl<W: Write> Printer<'_, W> {
    fn view(&mut self, view: &BrowserView) -> Result<()> {
        if self.json {
            self.event(&SessionEvent::View { view })
        } else {
            write!(self.out, "{}", render_view(view))?;
            Ok(())
        }
    }

    fn message(&mut self, text: String) -> Result<()> {
        if self.json {
            self.event(&SessionEvent::Message { text })
        } else {
            writeln!(self.out, "{text}")?;
            Ok(())
        }
    }

    fn bulk(&mut self, result: &BulkResult, selected_count: usize) -> Result<()> {
        if self.json {
            return self.event(&SessionEvent::Bulk {
                report: result.as_ref().ok().copied(),
                error: result.as_ref().err().map(ToString::to_string),
                selected_count,
            });
        }
        match result {
            Ok(report) => writeln!(
                self.out,
                "bulk: took {} of {} requested ({} new), {selected_count} selected",
                report.accumulated, report.requested, report.newly_selected
            )?,
            Err(err) => writeln!(
                self.out,
                "bulk: {err}; kept {} records, {selected_count} selected",
                err.applied()
            )?,
        }
        Ok(())
    }

    fn selected(&mut self, ids: Vec<RecordId>) -> Result<()> {
        if self.json {
            return self.event(&SessionEvent::Selected { ids });
        }
        let joined: Vec<String> = ids.iter().map(ToString::to_string).collect();
        writeln!(self.out, "selected ({}): {}", ids.len(), joined.join(" "))?;
        Ok(())
    }

    fn event(&mut self, event: &SessionEvent<'_>) -> Result<()> {
        serde_json::to_writer(&mut *self.out, event)?;
        writeln!(self.out)?;
        Ok(())
    }
}

const NO_MORE_PAGES: &str = "no more pages in that direction";

fn describe_outcome(outcome: PageOutcome) -> Option<String> {
    match outcome {
        PageOutcome::Failed(kind) => Some(format!("{kind} error: {}", kind.hint())),
        PageOutcome::Applied | PageOutcome::Superseded => None,
    }
}

/// Page fetches running in the background.
///
/// Only the most recently started one matters at exit; the older ones are
/// superseded and get aborted when the set is dropped.
#[derive(Default)]
struct Navigation {
    tasks: JoinSet<(u64, PageOutcome)>,
    next_seq: u64,
    latest: Option<u64>,
}

impl Navigation {
    fn start(&mut self, browser: &Arc<Browser>, pending: PendingPage) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.latest = Some(seq);
        debug!(page_index = pending.index(), seq, "browse: navigation started");
        let browser = Arc::clone(browser);
        self.tasks
            .spawn(async move { (seq, browser.pagination().complete(pending).await) });
    }

    fn finish(&mut self, seq: u64) {
        if self.latest == Some(seq) {
            self.latest = None;
        }
    }
}

fn report_navigation<W: Write>(
    printer: &mut Printer<'_, W>,
    browser: &Browser,
    outcome: PageOutcome,
) -> Result<()> {
    // A newer request is in flight and will render when it lands.
    if outcome == PageOutcome::Superseded {
        return Ok(());
    }
    if let Some(msg) = describe_outcome(outcome) {
        printer.message(msg)?;
    }
    printer.view(&browser.view())
}

/// Drive `browser` from `input` until EOF or `quit`.
///
/// Page fetches and bulk selections run as background tasks, so the next
/// command is read while they are in flight. At exit, bulk selections still
/// running and the latest page fetch are awaited so their results are
/// reported.
pub async fn run_browse<R, W>(
    browser: Arc<Browser>,
    input: R,
    out: &mut W,
    json: bool,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut printer = Printer { out, json };
    let mut bulk_tasks: JoinSet<BulkResult> = JoinSet::new();
    let mut nav = Navigation::default();
    let mut lines = input.lines();

    if let Some(msg) = browser.activate().await.and_then(describe_outcome) {
        printer.message(msg)?;
    }
    printer.view(&browser.view())?;

    loop {
        tokio::select! {
            Some(joined) = nav.tasks.join_next() => {
                let (seq, outcome) = joined?;
                nav.finish(seq);
                report_navigation(&mut printer, &browser, outcome)?;
            }
            Some(joined) = bulk_tasks.join_next() => {
                printer.bulk(&joined?, browser.selection().len())?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match parse_browse_command(&line) {
                    Ok(command) => command,
                    Err(msg) => {
                        printer.message(msg)?;
                        continue;
                    }
                };
                debug!(?command, "browse: command");
                let pagination = browser.pagination();
                match command {
                    BrowseCommand::Quit => break,
                    BrowseCommand::Next => match pagination.begin_next() {
                        Some(pending) => nav.start(&browser, pending),
                        None => printer.message(NO_MORE_PAGES.into())?,
                    },
                    BrowseCommand::Previous => match pagination.begin_previous() {
                        Some(pending) => nav.start(&browser, pending),
                        None => printer.message(NO_MORE_PAGES.into())?,
                    },
                    BrowseCommand::Goto(index) => {
                        let page_count = pagination.page_count();
                        if page_count > 0 && index >= page_count {
                            printer.message(format!(
                                "page {} is past the last page ({page_count})",
                                index + 1
                            ))?;
                        } else {
                            nav.start(&browser, pagination.begin_request(index));
                        }
                    }
                    BrowseCommand::Retry => nav.start(&browser, pagination.begin_retry()),
                    BrowseCommand::Toggle(id) => {
                        browser.toggle(id);
                        printer.view(&browser.view())?;
                    }
                    BrowseCommand::TogglePage => {
                        browser.toggle_current_page();
                        printer.view(&browser.view())?;
                    }
                    BrowseCommand::SelectFirst(text) => {
                        let browser = Arc::clone(&browser);
                        bulk_tasks.spawn(async move { browser.select_first_n(&text).await });
                    }
                    BrowseCommand::Clear => {
                        browser.clear_selection();
                        printer.view(&browser.view())?;
                    }
                    BrowseCommand::List => printer.view(&browser.view())?,
                    BrowseCommand::Selected => printer.selected(browser.selection().sorted_ids())?,
                }
            }
        }
    }

    while !bulk_tasks.is_empty() || nav.latest.is_some() {
        tokio::select! {
            Some(joined) = nav.tasks.join_next() => {
                let (seq, outcome) = joined?;
                nav.finish(seq);
                report_navigation(&mut printer, &browser, outcome)?;
            }
            Some(joined) = bulk_tasks.join_next() => {
                printer.bulk(&joined?, browser.selection().len())?;
            }
            else => break,
        }
    }
    Ok(())
}
