//! Terminal output for server lines and the player's own match stats

use shared::{ServerLine, WORD_PREFIX};
use std::io::{self, Write};

/// Running totals for the current match, fed by the server's markers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalStats {
    pub correct: u32,
    pub errors: u32,
}

pub struct Renderer<W: Write> {
    out: W,
    stats: LocalStats,
}

impl Renderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            stats: LocalStats::default(),
        }
    }

    pub fn stats(&self) -> LocalStats {
        self.stats
    }

    /// Renders one line received from the server
    pub fn render_line(&mut self, line: &str) -> io::Result<()> {
        match ServerLine::parse(line) {
            ServerLine::Score(score) => {
                self.stats.correct = score;
                writeln!(self.out, "Correct! ({} so far)", score)?;
            }
            ServerLine::Errors(errors) => {
                self.stats.errors = errors;
            }
            ServerLine::ShowStats => {
                writeln!(
                    self.out,
                    "Your match: {} correct, {} errors",
                    self.stats.correct, self.stats.errors
                )?;
                self.stats = LocalStats::default();
            }
            ServerLine::Text(text) => match text.strip_prefix(WORD_PREFIX) {
                Some(word) => writeln!(self.out, "\n>>> {} <<<", word)?,
                None => writeln!(self.out, "{}", text)?,
            },
        }
        self.out.flush()
    }

    /// Prints a message that originates from the client itself
    pub fn notice(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "* {}", text)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
