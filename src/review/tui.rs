//! Interactive terminal front end for [`ReportUi`].
//!
//! Keys:
//!
//! - `Up`/`Down` (`k`/`j`): move between checkbox rows
//! - `Space`: toggle the checkbox under the cursor
//! - `Enter`: fold or unfold the collection or page under the cursor
//! - `a` / `n` / `i`: select all, none, inverse
//! - `A` / `R`: approve or retry the selection
//! - `c` / `e` / `m`: collapse all, expand all, collapse images
//! - `Esc`: close the command modal
//! - `q`: quit

use std::io::{Stdout, Write, stdout};
use std::time::Duration;

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    style::{Color, Print, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use super::command::CliCommand;
use super::controller::ReportUi;
use super::types::ReviewResult;
use super::view::{LineStyle, RowTarget, ViewLine, render_lines};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
}

/// Terminal session state beyond the controller itself
#[derive(Debug, Default)]
pub struct TuiSession {
    /// Index into the rows that carry a target
    pub cursor: usize,
    pub status: String,
}

impl TuiSession {
    fn targets(lines: &[ViewLine]) -> Vec<&RowTarget> {
        lines.iter().filter_map(|l| l.target.as_ref()).collect()
    }

    fn current<'a>(&self, lines: &'a [ViewLine]) -> Option<&'a RowTarget> {
        Self::targets(lines).get(self.cursor).copied()
    }

    /// Pull the cursor back onto the last row after folding removed rows
    pub fn clamp(&mut self, lines: &[ViewLine]) {
        self.cursor = self.cursor.min(Self::targets(lines).len().saturating_sub(1));
    }

    /// Apply one key press to the controller
    ///
    /// The status line only reports on the key just handled.
    pub fn handle_key(&mut self, ui: &mut ReportUi, lines: &[ViewLine], code: KeyCode) -> KeyOutcome {
        self.status.clear();
        self.clamp(lines);
        if ui.modal().is_some() {
            match code {
                KeyCode::Char('q') => return KeyOutcome::Quit,
                KeyCode::Esc | KeyCode::Enter => {
                    ui.close_cli_modal();
                    self.status = "Selection cleared".to_string();
                }
                _ => {}
            }
            return KeyOutcome::Continue;
        }

        let target_count = Self::targets(lines).len();
        match code {
            KeyCode::Char('q') => return KeyOutcome::Quit,
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < target_count {
                    self.cursor += 1;
                }
            }
            KeyCode::Char(' ') => self.toggle_checkbox(ui, lines),
            KeyCode::Enter => match self.current(lines) {
                Some(RowTarget::Collection(collection)) => {
                    ui.toggle_collection_disclosure(collection)
                }
                Some(RowTarget::Page {
                    collection,
                    html_file_path,
                }) => ui.toggle_page_disclosure(collection, html_file_path),
                _ => {}
            },
            KeyCode::Char('a') => ui.select_all(),
            KeyCode::Char('n') => ui.select_none(),
            KeyCode::Char('i') => ui.select_inverse(),
            KeyCode::Char('A') => {
                if ui.approve_selected().is_none() {
                    self.status = "Nothing selected".to_string();
                }
            }
            KeyCode::Char('R') => {
                if ui.retry_selected().is_none() {
                    self.status = "Nothing selected".to_string();
                }
            }
            KeyCode::Char('c') => ui.collapse_all(),
            KeyCode::Char('e') => ui.collapse_none(),
            KeyCode::Char('m') => ui.collapse_images(),
            _ => {}
        }
        KeyOutcome::Continue
    }

    fn toggle_checkbox(&mut self, ui: &mut ReportUi, lines: &[ViewLine]) {
        let Some(target) = self.current(lines).cloned() else {
            return;
        };
        let ui_state = ui.ui_state();
        match target {
            RowTarget::Collection(collection) => {
                let checked = ui_state
                    .collection(&collection)
                    .is_some_and(|c| c.checkbox.checked);
                ui.toggle_collection(&collection, !checked);
            }
            RowTarget::Page {
                collection,
                html_file_path,
            } => {
                let checked = ui_state
                    .collection(&collection)
                    .and_then(|c| c.page(&html_file_path))
                    .is_some_and(|p| p.checkbox.checked);
                ui.toggle_page(&collection, &html_file_path, !checked);
            }
            RowTarget::UserAgent(key) => match ui.state().item(&key) {
                Some(item) if item.disabled => {
                    self.status = format!("{} is not runnable", key.user_agent_alias);
                }
                Some(item) => {
                    let checked = item.checked;
                    ui.toggle_user_agent(&key, !checked);
                }
                None => {}
            },
        }
    }
}

fn style_colors(style: LineStyle, selected: bool) -> (Color, Color) {
    let fg = match style {
        LineStyle::Header => Color::Cyan,
        LineStyle::Toolbar => Color::Yellow,
        LineStyle::Collection => Color::White,
        LineStyle::Page => Color::White,
        LineStyle::UserAgent => Color::Grey,
        LineStyle::Disabled => Color::DarkGrey,
        LineStyle::Detail => Color::DarkGrey,
        LineStyle::Modal => Color::Green,
    };
    let bg = if selected { Color::Blue } else { Color::Reset };
    (fg, bg)
}

fn draw(w: &mut Stdout, lines: &[ViewLine], nav: &TuiSession) -> std::io::Result<()> {
    let (width, height) = terminal::size()?;
    execute!(w, Clear(ClearType::All))?;

    let cursor_line = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.target.is_some())
        .nth(nav.cursor)
        .map(|(i, _)| i);

    // Keep the cursor row on screen, leaving the last row for the status bar
    let body_rows = usize::from(height.saturating_sub(1)).max(1);
    let first = cursor_line
        .map(|i| i.saturating_sub(body_rows.saturating_sub(1)))
        .unwrap_or(0);

    for (row, (index, line)) in lines.iter().enumerate().skip(first).take(body_rows).enumerate() {
        let (fg, bg) = style_colors(line.style, Some(index) == cursor_line);
        let text: String = line.text.chars().take(usize::from(width)).collect();
        execute!(
            w,
            MoveTo(0, row as u16),
            SetBackgroundColor(bg),
            SetForegroundColor(fg),
            Print(text),
            SetBackgroundColor(Color::Reset),
            SetForegroundColor(Color::Reset),
        )?;
    }

    let status = format!("{:width$}", nav.status, width = usize::from(width));
    execute!(
        w,
        MoveTo(0, height.saturating_sub(1)),
        SetBackgroundColor(Color::DarkGrey),
        SetForegroundColor(Color::White),
        Print(status),
        SetBackgroundColor(Color::Reset),
        SetForegroundColor(Color::Reset),
    )?;
    w.flush()
}

fn event_loop(w: &mut Stdout, ui: &mut ReportUi) -> std::io::Result<()> {
    let mut nav = TuiSession {
        cursor: 0,
        status: "q quit | space toggle | A approve | R retry".to_string(),
    };
    loop {
        let lines = render_lines(ui);
        nav.clamp(&lines);
        draw(w, &lines, &nav)?;

        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if nav.handle_key(ui, &lines, key.code) == KeyOutcome::Quit {
                return Ok(());
            }
        }
    }
}

/// Run the interactive review until the user quits
///
/// Returns the last command built so the caller can print it after the
/// terminal is restored.
pub fn run(ui: &mut ReportUi) -> ReviewResult<Option<CliCommand>> {
    let mut out = stdout();
    execute!(out, Hide)?;
    terminal::enable_raw_mode()?;

    let result = event_loop(&mut out, ui);

    execute!(out, Clear(ClearType::All), MoveTo(0, 0), Show)?;
    terminal::disable_raw_mode()?;

    if let Err(ref e) = result {
        tracing::error!(error = %e, "terminal loop failed");
    }
    result?;
    Ok(ui.last_command().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScriptSettings;
    use crate::review::types::ItemKey;
    use crate::schema::{ReportData, Screenshot, ScreenshotCategory, Screenshots, UserAgent};

    fn ui() -> ReportUi {
        let shot = |page: &str, alias: &str| Screenshot {
            html_file_path: page.to_string(),
            user_agent: Some(UserAgent {
                alias: alias.to_string(),
                is_runnable: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut screenshots = Screenshots::default();
        screenshots.push(ScreenshotCategory::Changed, shot("a.html", "chrome"));
        screenshots.push(ScreenshotCategory::Changed, shot("a.html", "firefox"));
        ReportUi::from_report(
            ReportData {
                screenshots: Some(screenshots),
                ..Default::default()
            },
            ScriptSettings {
                approve: "screenshot:approve".to_string(),
                test: "screenshot:test".to_string(),
            },
        )
    }

    fn press(nav: &mut TuiSession, ui: &mut ReportUi, code: KeyCode) -> KeyOutcome {
        let lines = render_lines(ui);
        nav.handle_key(ui, &lines, code)
    }

    #[test]
    fn test_space_toggles_row_under_cursor() {
        let mut ui = ui();
        let mut nav = TuiSession::default();

        // Rows: collection, page, chrome, firefox
        press(&mut nav, &mut ui, KeyCode::Down);
        press(&mut nav, &mut ui, KeyCode::Down);
        press(&mut nav, &mut ui, KeyCode::Char(' '));
        assert!(ui.state().item(&ItemKey::new("changed", "a.html", "chrome")).unwrap().checked);
        assert!(ui.ui_state().collection("changed").unwrap().checkbox.indeterminate);

        nav.cursor = 0;
        press(&mut nav, &mut ui, KeyCode::Char(' '));
        assert_eq!(ui.ui_state().checked().len(), 0);
        press(&mut nav, &mut ui, KeyCode::Char(' '));
        assert_eq!(ui.ui_state().checked().len(), 2);
    }

    #[test]
    fn test_approve_then_escape() {
        let mut ui = ui();
        let mut nav = TuiSession::default();
        press(&mut nav, &mut ui, KeyCode::Char('A'));
        assert_eq!(nav.status, "Nothing selected");
        assert!(ui.modal().is_none());

        press(&mut nav, &mut ui, KeyCode::Char('a'));
        press(&mut nav, &mut ui, KeyCode::Char('A'));
        assert!(ui.modal().is_some());

        // Selection keys are ignored while the modal is open
        press(&mut nav, &mut ui, KeyCode::Char('i'));
        assert_eq!(ui.ui_state().checked().len(), 2);

        press(&mut nav, &mut ui, KeyCode::Esc);
        assert!(ui.modal().is_none());
        assert!(ui.ui_state().checked().is_empty());
        assert_eq!(press(&mut nav, &mut ui, KeyCode::Char('q')), KeyOutcome::Quit);
    }

    #[test]
    fn test_enter_folds_collection() {
        let mut ui = ui();
        let mut nav = TuiSession::default();
        press(&mut nav, &mut ui, KeyCode::Enter);
        assert!(ui.disclosure().is_collection_collapsed("changed"));
        press(&mut nav, &mut ui, KeyCode::Down);
        assert_eq!(nav.cursor, 0);
    }

    #[test]
    fn test_collapse_all_moves_cursor_onto_remaining_row() {
        let mut ui = ui();
        let mut nav = TuiSession::default();
        for _ in 0..5 {
            press(&mut nav, &mut ui, KeyCode::Down);
        }
        assert_eq!(nav.cursor, 3);

        // Only the collection row is left
        press(&mut nav, &mut ui, KeyCode::Char('c'));
        press(&mut nav, &mut ui, KeyCode::Char(' '));
        assert_eq!(nav.cursor, 0);
        assert_eq!(ui.ui_state().checked().len(), 2);
        assert!(!ui.ui_state().collection("changed").unwrap().checkbox.indeterminate);

        press(&mut nav, &mut ui, KeyCode::Up);
        assert_eq!(nav.cursor, 0);
    }

    #[test]
    fn test_status_reports_only_last_key() {
        let mut ui = ui();
        let mut nav = TuiSession::default();
        press(&mut nav, &mut ui, KeyCode::Char('R'));
        assert_eq!(nav.status, "Nothing selected");

        press(&mut nav, &mut ui, KeyCode::Char('a'));
        assert_eq!(nav.status, "");
        press(&mut nav, &mut ui, KeyCode::Char('R'));
        assert!(ui.modal().is_some());
        assert_eq!(nav.status, "");

        press(&mut nav, &mut ui, KeyCode::Esc);
        assert_eq!(nav.status, "Selection cleared");
        press(&mut nav, &mut ui, KeyCode::Down);
        assert_eq!(nav.status, "");
    }
}
