//! Incremental terminal output of completion fragments

use colored::{Color, Colorize};
use eyre::Result;
use std::io::{self, Write};

const LOADING: &str = "Loading...\r";
const CLEAR_LINE: &str = "\x1b[K";

/// Parse a configured color name; `none` disables styling
pub fn parse_color(name: &str) -> Result<Option<Color>> {
    if name.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    name.parse::<Color>()
        .map(Some)
        .map_err(|_| eyre::eyre!("Unknown color: {} (use a terminal color name or 'none')", name))
}

/// Writes fragments as they arrive and returns their concatenation
pub struct StreamPrinter<W: Write> {
    out: W,
    color: Option<Color>,
    streaming: bool,
}

impl StreamPrinter<io::Stdout> {
    pub fn stdout(color: Option<Color>, streaming: bool) -> Self {
        Self::new(io::stdout(), color, streaming)
    }
}

impl<W: Write> StreamPrinter<W> {
    pub fn new(out: W, color: Option<Color>, streaming: bool) -> Self {
        Self { out, color, streaming }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Render `fragments` and return the full text
    ///
    /// With streaming disabled a loading line is shown until the first
    /// fragment. An error from the source ends the line and is returned as is;
    /// whatever was already written stays.
    pub fn print<I>(&mut self, fragments: I) -> Result<String>
    where
        I: IntoIterator<Item = Result<String>>,
    {
        let mut loading = false;
        if !self.streaming {
            self.out.write_all(LOADING.as_bytes())?;
            self.out.flush()?;
            loading = true;
        }

        let mut full = String::new();
        for fragment in fragments {
            let fragment = match fragment {
                Ok(fragment) => fragment,
                Err(e) => {
                    self.finish_line(loading)?;
                    return Err(e);
                }
            };

            if loading {
                self.out.write_all(CLEAR_LINE.as_bytes())?;
                loading = false;
            }
            self.write_styled(&fragment)?;
            self.out.flush()?;
            full.push_str(&fragment);
        }

        self.finish_line(loading)?;
        log::debug!("Printed completion of {} bytes", full.len());
        Ok(full)
    }

    fn write_styled(&mut self, text: &str) -> io::Result<()> {
        match self.color {
            Some(color) => write!(self.out, "{}", text.color(color).bold()),
            None => self.out.write_all(text.as_bytes()),
        }
    }

    fn finish_line(&mut self, loading: bool) -> io::Result<()> {
        if loading {
            self.out.write_all(CLEAR_LINE.as_bytes())?;
        }
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}
