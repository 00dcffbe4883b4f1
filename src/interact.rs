//! Terminal questions: yes/no confirmations and free-text answers

use eyre::{Context, Result};
use std::io::{self, BufRead, Write};

/// Something that can answer a yes/no question
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Ask on stdout, read the answer from stdin; anything but `y`/`yes` declines
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = ask(&format!("{} [y/N] ", question))?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }
}

/// Always the same answer; `--force` uses `Fixed(true)`
pub struct Fixed(pub bool);

impl Confirm for Fixed {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        log::debug!("Answering {:?} with {}", question, self.0);
        Ok(self.0)
    }
}

/// Print `question` without a newline and read one trimmed line from stdin
///
/// End of input reads as an empty answer.
pub fn ask(question: &str) -> Result<String> {
    print!("{}", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read from stdin")?;
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_answers() {
        assert!(Fixed(true).confirm("Overwrite?").unwrap());
        assert!(!Fixed(false).confirm("Overwrite?").unwrap());
    }
}
