//! Line-oriented terminal prompter.
//!
//! Passwords go through `rpassword`: from the controlling terminal without
//! echo when stdin is a TTY, otherwise one line from the input stream so
//! piped sessions and tests behave the same way.

use std::io::{self, BufRead, IsTerminal, Stdin, StdinLock, Stdout, Write};

use cfr_core::traits::Prompter;

/// [`Prompter`] over a line reader and a writer.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
    tty: bool,
}

impl TerminalPrompter<StdinLock<'static>, Stdout> {
    /// Prompter on the process stdin and stdout.
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        let tty = stdin.is_terminal();
        Self {
            input: stdin.lock(),
            output: io::stdout(),
            tty,
        }
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    /// Prompter over arbitrary streams. Passwords are read from `input`.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            tty: false,
        }
    }

    fn ask(&mut self, message: &str) -> io::Result<String> {
        write!(self.output, "{message} ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while waiting for an answer",
            ));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{text}")?;
        self.output.flush()
    }

    fn password(&mut self, message: &str) -> io::Result<String> {
        if self.tty {
            self.output.flush()?;
            return rpassword::prompt_password(format!("{message} "));
        }
        write!(self.output, "{message} ")?;
        self.output.flush()?;
        let password = rpassword::read_password_from_bufread(&mut self.input)?;
        writeln!(self.output)?;
        Ok(password)
    }

    fn confirm(&mut self, message: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "(Y/n)" } else { "(y/N)" };
        loop {
            let answer = self.ask(&format!("{message} {hint}"))?;
            match answer.to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say("Please answer yes or no.")?,
            }
        }
    }

    fn select(&mut self, message: &str, choices: &[&str]) -> io::Result<usize> {
        if choices.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "nothing to choose from"));
        }
        self.say(message)?;
        for (i, choice) in choices.iter().enumerate() {
            writeln!(self.output, "  {}) {choice}", i + 1)?;
        }
        loop {
            let answer = self.ask(">")?;
            if let Ok(n) = answer.parse::<usize>() {
                if (1..=choices.len()).contains(&n) {
                    return Ok(n - 1);
                }
            }
            if let Some(i) = choices.iter().position(|c| c.eq_ignore_ascii_case(&answer)) {
                return Ok(i);
            }
            self.say(&format!("Enter a number from 1 to {}.", choices.len()))?;
        }
    }
}
