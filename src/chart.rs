use std::io::Write;

use chrono::{DateTime, Local};
use colored::{Color, Colorize};

use crate::errors::RenderError;
use crate::store::Snapshot;

pub const TITLE: &str = "Real-Time Messages vs Category";
pub const X_LABEL: &str = "Categories";
pub const Y_LABEL: &str = "Number of Messages";

/// Bar colors, assigned by first-seen position so a category keeps its color between frames.
pub const PALETTE: [Color; 7] = [
    Color::Red,
    Color::TrueColor { r: 255, g: 165, b: 0 }, // orange
    Color::Yellow,
    Color::Green,
    Color::Blue,
    Color::Magenta,
    Color::TrueColor { r: 255, g: 192, b: 203 }, // pink
];

const BAR_CELL: char = '█';
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub count: u64,
    pub color: Color,
}

/// Everything needed to draw one frame, in drawing order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartFrame {
    pub bars:     Vec<Bar>,
    pub total:    u64,
    pub taken_at: DateTime<Local>,
}

impl ChartFrame {
    pub fn from_snapshot(snapshot: &Snapshot, taken_at: DateTime<Local>) -> ChartFrame {
        let bars = snapshot
            .iter()
            .enumerate()
            .map(|(idx, (label, count))| Bar {
                label: label.to_string(),
                count: count,
                color: PALETTE[idx % PALETTE.len()],
            })
            .collect::<Vec<_>>();

        ChartFrame { bars: bars, total: snapshot.total(), taken_at: taken_at }
    }

    pub fn max_count(&self) -> u64 { self.bars.iter().map(|bar| bar.count).max().unwrap_or(0) }
}

/// A display the render timer can redraw once per tick.
pub trait ChartSurface {
    fn draw(&mut self, frame: &ChartFrame) -> Result<(), RenderError>;
}

impl<S: ChartSurface + ?Sized> ChartSurface for Box<S> {
    fn draw(&mut self, frame: &ChartFrame) -> Result<(), RenderError> { (**self).draw(frame) }
}

/// Horizontal bar chart drawn with text cells on a terminal (or any writer).
pub struct TerminalChart<W: Write> {
    out:          W,
    bar_width:    usize,
    color:        bool,
    clear_screen: bool,
}

impl<W: Write> TerminalChart<W> {
    pub fn new(out: W, bar_width: usize) -> TerminalChart<W> {
        TerminalChart { out: out, bar_width: bar_width.max(1), color: true, clear_screen: true }
    }

    pub fn with_color(mut self, color: bool) -> TerminalChart<W> {
        self.color = color;
        self
    }

    pub fn with_clear_screen(mut self, clear_screen: bool) -> TerminalChart<W> {
        self.clear_screen = clear_screen;
        self
    }

    pub fn into_inner(self) -> W { self.out }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color { text.color(color).to_string() } else { text.to_string() }
    }

    fn bold(&self, text: &str) -> String {
        if self.color { text.bold().to_string() } else { text.to_string() }
    }

    /// Number of cells for `count`, relative to the largest bar. Non-zero counts get at least one.
    fn cells(&self, count: u64, max: u64) -> usize {
        if count == 0 || max == 0 {
            return 0;
        }
        let scaled = (count as u128 * self.bar_width as u128 + max as u128 - 1) / max as u128;
        (scaled as usize).max(1)
    }
}

/// Labels come straight from producers: control characters are escaped so a label
/// can neither move the cursor nor start a row of its own.
fn display_label(label: &str) -> String {
    if label.is_empty() {
        "\"\"".to_string()
    } else if label.chars().any(char::is_control) {
        label.chars().map(|c| if c.is_control() { c.escape_debug().to_string() } else { c.to_string() }).collect()
    } else {
        label.to_string()
    }
}

impl<W: Write> ChartSurface for TerminalChart<W> {
    fn draw(&mut self, frame: &ChartFrame) -> Result<(), RenderError> {
        let mut buf = String::new();

        if self.clear_screen {
            buf.push_str(CLEAR_SCREEN);
        }
        buf.push_str(&format!("{}\n", self.bold(TITLE)));
        buf.push_str(&format!(
            "updated {} -- {} message(s) in {} categor{}\n\n",
            frame.taken_at.format("%Y-%m-%d %H:%M:%S"),
            frame.total,
            frame.bars.len(),
            if frame.bars.len() == 1 { "y" } else { "ies" }
        ));

        let labels = frame.bars.iter().map(|bar| display_label(&bar.label)).collect::<Vec<_>>();
        let width = labels.iter().map(|l| l.chars().count()).chain(Some(X_LABEL.len())).max().unwrap_or(0);

        let header = format!("{:<width$}", X_LABEL, width = width);
        buf.push_str(&format!("{}  {}\n", self.bold(&header), self.bold(Y_LABEL)));

        if frame.bars.is_empty() {
            buf.push_str("(waiting for messages...)\n");
        }

        let max = frame.max_count();
        for (bar, label) in frame.bars.iter().zip(labels.iter()) {
            let cells = BAR_CELL.to_string().repeat(self.cells(bar.count, max));
            let padding = width - label.chars().count();
            buf.push_str(&format!(
                "{}{} |{} {}\n",
                label,
                " ".repeat(padding),
                self.paint(&cells, bar.color),
                bar.count
            ));
        }

        self.out.write_all(buf.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}
