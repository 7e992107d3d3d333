//! Interactive prompts on the terminal.

use std::io::{self, BufRead, Write};

use playtime_core::Prompter;

/// Asks questions on `output` and reads answers from `input`.
///
/// End of input or a read error counts as "no".
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_answer(&mut self) -> Option<String> {
        let _ = self.output.flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn confirm(&mut self, question: &str) -> bool {
        loop {
            let _ = write!(self.output, "{question} [y/n] ");
            let Some(answer) = self.read_answer() else {
                let _ = writeln!(self.output);
                return false;
            };
            match answer.to_lowercase().as_str() {
                "y" | "yes" => return true,
                "n" | "no" => return false,
                _ => {
                    let _ = writeln!(self.output, "Please answer y or n.");
                }
            }
        }
    }

    fn choose(&mut self, question: &str, options: &[String]) -> Option<usize> {
        let _ = writeln!(self.output, "{question}");
        for (index, option) in options.iter().enumerate() {
            let _ = writeln!(self.output, "  {}) {}", index + 1, option);
        }
        let _ = writeln!(self.output, "  0) None of these");

        loop {
            let _ = write!(self.output, "Selection: ");
            let answer = self.read_answer()?;
            match answer.parse::<usize>() {
                Ok(0) => return None,
                Ok(n) if n <= options.len() => return Some(n - 1),
                _ => {
                    let _ = writeln!(self.output, "Enter a number from 0 to {}.", options.len());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompter(input: &str) -> TerminalPrompter<&[u8], Vec<u8>> {
        TerminalPrompter::new(input.as_bytes(), Vec::new())
    }

    #[test]
    fn confirm_reads_yes_and_no() {
        let mut p = prompter("y\nNo\n");
        assert!(p.confirm("Keep?"));
        assert!(!p.confirm("Keep?"));
    }

    #[test]
    fn confirm_repeats_until_answered() {
        let mut p = prompter("maybe\nyes\n");
        assert!(p.confirm("Keep?"));
        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("Please answer y or n."));
    }

    #[test]
    fn confirm_at_end_of_input_declines() {
        assert!(!prompter("").confirm("Keep?"));
    }

    #[test]
    fn choose_maps_numbers_to_options() {
        let options = vec!["Portal 2".to_string(), "Portal 2 Soundtrack".to_string()];
        assert_eq!(prompter("2\n").choose("Which?", &options), Some(1));
        assert_eq!(prompter("0\n").choose("Which?", &options), None);
        assert_eq!(prompter("7\n1\n").choose("Which?", &options), Some(0));
        assert_eq!(prompter("").choose("Which?", &options), None);
    }
}
