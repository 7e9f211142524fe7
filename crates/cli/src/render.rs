//! Terminal renderer for the session's event feed.
//!
//! Mirrors the node's view of each job as two-line progress bars and
//! coloured status lines. The renderer is a [`SessionObserver`]; it keeps
//! just enough state to redraw a still-running bar in place and to separate
//! unrelated output with blank lines.

use std::io::Write;

use fcpmon_core::{JobType, ProgressState, RequestSnapshot, SessionObserver, Severity, StatusEvent};
use nu_ansi_term::{Color, Style};

use crate::format::{format_size, truncate};

/// Filled and empty bar cells.
const BAR_FULL: &str = "█";
const BAR_EMPTY: &str = "░";
/// Overline cell marking the failed share of the outstanding blocks.
const BAR_FAILED: &str = "…";

/// Moves the cursor two lines up and clears the line, to redraw a bar.
const REDRAW: &str = "\x1b[2F\x1b[G\x1b[K";

/// Column widths below which the numeric indicators are dropped, from the
/// least to the most expendable.
const REMAIN_MIN_WIDTH: usize = 37;
const SUCCEEDED_MIN_WIDTH: usize = 45;
const FAILED_MIN_WIDTH: usize = 60;

/// Visible width reserved for one numeric indicator.
const INDICATOR_WIDTH: usize = 6;
/// Visible width reserved for the percent column.
const PERCENT_WIDTH: usize = 6;

/// What the previously printed line was, for redraw and spacing decisions.
#[derive(Clone, Debug, Eq, PartialEq)]
enum LastLine {
    Progress(String),
    Status(Option<String>),
}

/// Writes the event feed to a terminal.
#[derive(Debug)]
pub struct Renderer<W> {
    out: W,
    use_colors: bool,
    fixed_width: Option<usize>,
    last: Option<LastLine>,
}

impl<W: Write> Renderer<W> {
    /// Creates a renderer that queries the terminal width per redraw.
    pub fn new(out: W, use_colors: bool) -> Self {
        Self {
            out,
            use_colors,
            fixed_width: None,
            last: None,
        }
    }

    /// Creates an uncoloured renderer with a fixed width, for tests and
    /// non-terminal output.
    pub fn with_width(out: W, width: usize) -> Self {
        Self {
            out,
            use_colors: false,
            fixed_width: Some(width),
            last: None,
        }
    }

    fn width(&self) -> usize {
        self.fixed_width
            .or_else(|| terminal_size::terminal_size().map(|(w, _)| w.0 as usize))
            .unwrap_or(80)
    }

    fn paint(&self, color: Color, text: &str) -> String {
        if self.use_colors && !text.is_empty() {
            color.paint(text).to_string()
        } else {
            text.to_owned()
        }
    }

    fn paint_bold(&self, color: Option<Color>, text: &str) -> String {
        if !self.use_colors {
            return text.to_owned();
        }
        let style = color.map_or_else(|| Style::new().bold(), |c| Style::new().bold().fg(c));
        style.paint(text).to_string()
    }

    /// One right-aligned `count` + glyph cell; returns the painted text and
    /// its visible width.
    fn indicator(&self, count: u64, color: Color, glyph: &str) -> (String, usize) {
        let number = count.to_string();
        let visible = number.chars().count() + 1;
        let pad = INDICATOR_WIDTH.saturating_sub(visible);
        let text = format!("{}{number}{}", " ".repeat(pad), self.paint(color, glyph));
        (text, pad + visible)
    }
}

fn severity_color(severity: Severity) -> Option<Color> {
    match severity {
        Severity::Info => None,
        Severity::Active => Some(Color::Blue),
        Severity::Success => Some(Color::Green),
        Severity::Warning => Some(Color::Yellow),
        Severity::Error => Some(Color::Red),
    }
}

fn percent(ratio: f64) -> String {
    let per_mille = (ratio * 1000.0).ceil() as u64;
    if per_mille >= 1000 {
        "100%".to_owned()
    } else {
        format!("{:.1}%", per_mille as f64 / 10.0)
    }
}

impl<W: Write> SessionObserver for Renderer<W> {
    fn status(&mut self, event: &StatusEvent) {
        let identifier = event.identifier().map(str::to_owned);
        if self.last != Some(LastLine::Status(identifier.clone())) {
            let _ = writeln!(self.out);
        }

        let color = severity_color(event.severity());
        let label = match event.size() {
            Some(size) => format!("{}: {}", event.label(), format_size(size)),
            None => event.label().to_owned(),
        };
        let mut line = format!(
            "{} {}",
            self.paint_bold(color, identifier.as_deref().unwrap_or("-")),
            color.map_or_else(|| label.clone(), |c| self.paint(c, &label)),
        );
        if let Some(comment) = event.comment() {
            line.push_str(&format!(" ({comment})"));
        }
        let _ = writeln!(self.out, "{line}");
        self.last = Some(LastLine::Status(identifier));
    }

    fn detail(&mut self, identifier: Option<&str>, text: &str) {
        let _ = writeln!(self.out, "{text}");
        self.last = Some(LastLine::Status(identifier.map(str::to_owned)));
    }

    fn progress(&mut self, snapshot: &RequestSnapshot, state: ProgressState) {
        let identifier = snapshot.identifier().to_owned();
        let continuing = self.last == Some(LastLine::Progress(identifier.clone()));
        // A cooldown notice only refreshes a bar that is already on screen.
        if state == ProgressState::Cooldown && !continuing {
            return;
        }

        let width = self.width();
        let bar_width = width / 3;
        let filled =
            ((snapshot.progress_ratio() * bar_width as f64).floor() as usize).min(bar_width);
        let overline =
            ((snapshot.failure_ratio() * bar_width as f64).ceil() as usize).min(bar_width);

        let fill_color = if snapshot.job_type() == JobType::Put {
            Color::Cyan
        } else if !snapshot.finalized_total() {
            Color::Blue
        } else if state == ProgressState::Cooldown {
            Color::Yellow
        } else {
            Color::Green
        };
        let empty_color = if state == ProgressState::Failed {
            Color::Red
        } else {
            fill_color
        };

        let arrow = match (snapshot.job_type(), snapshot.real_time()) {
            (JobType::Get, true) => "⇊",
            (JobType::Get, false) => "↓",
            (JobType::Put, true) => "⇈",
            (JobType::Put, false) => "↑",
        };

        let available = width.saturating_sub(bar_width);
        let mut indicators = String::new();
        let mut indicators_width = 0usize;
        if available >= REMAIN_MIN_WIDTH {
            let (text, visible) = self.indicator(
                snapshot.required().saturating_sub(snapshot.succeeded()),
                Color::Yellow,
                arrow,
            );
            indicators.push_str(&text);
            indicators_width += visible;
        }
        if available >= SUCCEEDED_MIN_WIDTH {
            let (text, visible) = self.indicator(snapshot.succeeded(), Color::Green, "✔");
            indicators.push_str(&text);
            indicators_width += visible;
        }
        if available >= FAILED_MIN_WIDTH {
            let (text, visible) = self.indicator(snapshot.failed(), Color::Red, "!");
            indicators.push_str(&text);
            indicators_width += visible;
        }

        let percent = format!("{:>PERCENT_WIDTH$}", percent(snapshot.progress_ratio()));
        let label_width = available
            .saturating_sub(indicators_width)
            .saturating_sub(PERCENT_WIDTH)
            .saturating_sub(1);
        let label = format!(
            "{:<label_width$}",
            truncate(&identifier, label_width)
        );
        let lead_width = label_width + indicators_width + 1;

        let mut row = String::new();
        if continuing {
            row.push_str(REDRAW);
        }
        row.push_str(&" ".repeat(lead_width));
        row.push_str(&self.paint(Color::Red, &BAR_FAILED.repeat(overline)));
        row.push('\n');
        row.push_str(&label);
        row.push_str(&indicators);
        row.push(' ');
        row.push_str(&self.paint(fill_color, &BAR_FULL.repeat(filled)));
        row.push_str(&self.paint(empty_color, &BAR_EMPTY.repeat(bar_width - filled)));
        row.push_str(&percent);
        let _ = writeln!(self.out, "{row}");
        self.last = Some(LastLine::Progress(identifier));
    }
}
