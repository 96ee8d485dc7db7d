//! Arrow-key menus and prompts.
//!
//! Falls back to a numbered prompt on stdin when stdout is not a terminal,
//! so piped and scripted runs still work.

use std::io::{self, BufRead, IsTerminal, Write};

use crossterm::{
    QueueableCommand,
    cursor::{Hide, MoveToColumn, MoveUp, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    style::Stylize,
    terminal::{self, Clear, ClearType},
};

use super::theme::Theme;

#[derive(Debug, Clone)]
pub struct MenuItem {
    pub label: String,
    pub detail: Option<String>,
    pub enabled: bool,
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            detail: None,
            enabled: true,
        }
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Next enabled index from `current` moving by `step` (+1 or -1), wrapping.
/// Stays put when nothing else is enabled.
fn step_selection(items: &[MenuItem], current: usize, step: isize) -> usize {
    let len = items.len() as isize;
    let mut idx = current as isize;
    for _ in 0..items.len() {
        idx = (idx + step).rem_euclid(len);
        if items[idx as usize].enabled {
            return idx as usize;
        }
    }
    current
}

fn first_enabled(items: &[MenuItem]) -> Option<usize> {
    items.iter().position(|i| i.enabled)
}

/// Let the user pick one item. `None` when cancelled (q, Esc, Ctrl-C) or
/// when no item is enabled.
pub fn select(title: &str, items: &[MenuItem]) -> io::Result<Option<usize>> {
    let Some(start) = first_enabled(items) else {
        return Ok(None);
    };
    if io::stdout().is_terminal() && io::stdin().is_terminal() {
        select_interactive(title, items, start)
    } else {
        select_numbered(title, items)
    }
}

struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = io::stdout().queue(Show).and_then(Write::flush);
    }
}

fn draw(out: &mut io::Stdout, items: &[MenuItem], selected: usize, theme: &Theme) -> io::Result<()> {
    for (i, item) in items.iter().enumerate() {
        out.queue(MoveToColumn(0))?;
        out.queue(Clear(ClearType::CurrentLine))?;
        let pointer = if i == selected { theme.icons.pointer } else { " " };
        let label = format!("{} {}", pointer, item.label);
        let label = if !item.enabled {
            label.with(theme.colors.secondary).to_string()
        } else if i == selected {
            label.with(theme.colors.highlight).bold().to_string()
        } else {
            label
        };
        match &item.detail {
            Some(d) => write!(out, "  {label}  {}\r\n", d.as_str().with(theme.colors.secondary))?,
            None => write!(out, "  {label}\r\n")?,
        }
    }
    out.flush()
}

fn select_interactive(title: &str, items: &[MenuItem], start: usize) -> io::Result<Option<usize>> {
    let theme = Theme::default();
    let mut out = io::stdout();
    println!();
    println!("{}", title.bold());
    println!("{}", "  ↑/↓ to move, Enter to select, q to cancel".dark_grey());

    let _raw = RawMode::enable()?;
    out.queue(Hide)?;
    let mut selected = start;
    draw(&mut out, items, selected, &theme)?;

    let rows = items.len() as u16;
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        else {
            continue;
        };

        let choice = match code {
            KeyCode::Up | KeyCode::Char('k') => {
                selected = step_selection(items, selected, -1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                selected = step_selection(items, selected, 1);
                None
            }
            KeyCode::Enter => Some(Some(selected)),
            KeyCode::Esc | KeyCode::Char('q') => Some(None),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(None),
            KeyCode::Char(c) => c
                .to_digit(10)
                .and_then(|d| (d as usize).checked_sub(1))
                .filter(|&i| i < items.len() && items[i].enabled)
                .map(Some),
            _ => None,
        };

        if let Some(choice) = choice {
            return Ok(choice);
        }
        if rows > 0 {
            out.queue(MoveUp(rows))?;
        }
        draw(&mut out, items, selected, &theme)?;
    }
}

fn select_numbered(title: &str, items: &[MenuItem]) -> io::Result<Option<usize>> {
    println!();
    println!("{title}");
    for (i, item) in items.iter().enumerate() {
        let suffix = if item.enabled { "" } else { " (unavailable)" };
        match &item.detail {
            Some(d) => println!("  {}. {}{suffix} - {d}", i + 1, item.label),
            None => println!("  {}. {}{suffix}", i + 1, item.label),
        }
    }
    let answer = prompt("Choice (number, empty to cancel)")?;
    Ok(parse_choice(&answer, items))
}

fn parse_choice(answer: &str, items: &[MenuItem]) -> Option<usize> {
    answer
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .filter(|&i| i < items.len() && items[i].enabled)
}

/// One line from stdin, trimmed. Empty on EOF.
pub fn prompt(question: &str) -> io::Result<String> {
    print!("{question}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

pub fn confirm(question: &str, default: bool) -> io::Result<bool> {
    let hint = if default { "Y/n" } else { "y/N" };
    let answer = prompt(&format!("{question} [{hint}]"))?;
    Ok(match answer.to_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    })
}
