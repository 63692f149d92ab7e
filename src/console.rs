use std::io::{self, IsTerminal, Write};

use crossterm::style::{Color, Stylize};

/// User-facing console. Logs go to the tracing file, never here.
pub struct Console {
    out: Box<dyn Write>,
    color: bool,
}

impl Console {
    pub fn new(out: Box<dyn Write>, color: bool) -> Self {
        Self { out, color }
    }

    pub fn stdout() -> Self {
        let color = io::stdout().is_terminal();
        Self::new(Box::new(io::stdout()), color)
    }

    pub fn step(&mut self, index: usize, total: usize, name: &str) {
        let counter = format!("[{index}/{total}]");
        let counter = self.paint(&counter, Color::Cyan);
        self.line(&format!("{counter} {name}"));
    }

    pub fn skipped(&mut self, reason: &str) {
        let tag = self.paint("skip", Color::DarkGrey);
        self.line(&format!("      {tag} {reason}"));
    }

    pub fn declined(&mut self) {
        let tag = self.paint("skip", Color::DarkGrey);
        self.line(&format!("      {tag} not requested"));
    }

    pub fn completed(&mut self, detail: Option<&str>) {
        let tag = self.paint("ok", Color::Green);
        match detail {
            Some(detail) => self.line(&format!("      {tag} {detail}")),
            None => self.line(&format!("      {tag}")),
        }
    }

    pub fn warn(&mut self, message: &str) {
        let tag = self.paint("warn", Color::Yellow);
        self.line(&format!("      {tag} {message}"));
    }

    pub fn error(&mut self, message: &str) {
        let tag = self.paint("error", Color::Red);
        self.line(&format!("{tag} {message}"));
    }

    pub fn text(&mut self, text: &str) {
        let _ = write!(self.out, "{text}");
        let _ = self.out.flush();
    }

    pub fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).bold().to_string()
        } else {
            text.to_string()
        }
    }
}
