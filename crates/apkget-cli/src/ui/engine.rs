//! Split frame - rows redrawn in place, keyed by split name.
//!
//! Between redraws the cursor is parked on the line just below the last row.
//! Redrawing a row moves up to it, writes, and moves back down, so nothing
//! depends on a saved absolute position: scrolling does not break the frame,
//! and a split the frame has not seen yet is appended at the bottom.

use crossterm::{
    QueueableCommand,
    cursor::{MoveDown, MoveToColumn, MoveUp},
    terminal::{Clear, ClearType},
};
use std::io::{Result, Stdout, Write, stdout};

pub struct SplitFrame<W: Write = Stdout> {
    out: W,
    names: Vec<String>,
}

impl<W: Write> std::fmt::Debug for SplitFrame<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitFrame")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl SplitFrame<Stdout> {
    pub fn stdout() -> Self {
        Self::new(stdout())
    }
}

impl<W: Write> SplitFrame<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            names: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn row_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Claim the parked line for `name` and park below it.
    pub fn push(&mut self, name: &str) -> Result<usize> {
        writeln!(self.out)?;
        self.names.push(name.to_string());
        Ok(self.names.len() - 1)
    }

    /// Redraw the row for `name`, appending it first if needed.
    /// Queued only; call [`flush`](Self::flush).
    pub fn draw(&mut self, name: &str, f: impl FnOnce(&mut W) -> Result<()>) -> Result<()> {
        let idx = match self.row_of(name) {
            Some(idx) => idx,
            None => self.push(name)?,
        };
        let up = u16::try_from(self.names.len() - idx).unwrap_or(u16::MAX);

        self.out.queue(MoveUp(up))?;
        self.out.queue(MoveToColumn(0))?;
        f(&mut self.out)?;
        // Clear after writing, so a shrinking status never flashes blank.
        self.out.queue(Clear(ClearType::UntilNewLine))?;
        self.out.queue(MoveDown(up))?;
        self.out.queue(MoveToColumn(0))?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()
    }

    /// Stop tracking rows. The cursor is already below them.
    pub fn finish(&mut self) -> Result<()> {
        self.names.clear();
        self.out.flush()
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(frame: &SplitFrame<Vec<u8>>) -> String {
        String::from_utf8_lossy(frame.output()).into_owned()
    }

    #[test]
    fn test_rows_follow_push_order() {
        let mut frame = SplitFrame::new(Vec::new());
        for name in ["base", "config.arm64_v8a", "config.xxhdpi"] {
            frame.push(name).unwrap();
        }
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.row_of("config.arm64_v8a"), Some(1));
        assert_eq!(frame.row_of("config.fa"), None);
        assert_eq!(text(&frame), "\n\n\n");
    }

    #[test]
    fn test_draw_moves_up_to_the_row_and_back() {
        let mut frame = SplitFrame::new(Vec::new());
        frame.push("base").unwrap();
        frame.push("config.xxhdpi").unwrap();

        frame
            .draw("base", |out| write!(out, "base done"))
            .unwrap();
        let out = text(&frame);
        let up = out.find("\x1b[2A").unwrap();
        let body = out.find("base done").unwrap();
        let down = out.find("\x1b[2B").unwrap();
        assert!(up < body && body < down, "{out:?}");
    }

    #[test]
    fn test_unknown_split_is_appended() {
        let mut frame = SplitFrame::new(Vec::new());
        frame.push("base").unwrap();

        frame
            .draw("config.fa", |out| write!(out, "late split"))
            .unwrap();
        assert_eq!(frame.row_of("config.fa"), Some(1));
        assert!(text(&frame).contains("late split"));

        frame.finish().unwrap();
        assert!(frame.is_empty());
    }
}
