//! Interactive input used by credential-mode retries.

use std::io::{self, BufRead, Write};

/// Source of answers to interactive questions.
///
/// Answers are returned without their trailing newline. End of input reads as
/// an empty answer, which the session treats as "exit".
pub trait Prompter {
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;

    /// Like [`Prompter::read_line`] but without echoing the answer.
    fn read_secret(&mut self, prompt: &str) -> io::Result<String>;

    /// Show a message to the user.
    fn notify(&mut self, message: &str);
}

/// Prompts on stderr, reads from stdin.
///
/// Stdout is left alone so the archive path stays machine-readable.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }

    fn ask(prompt: &str) -> io::Result<String> {
        let mut stderr = io::stderr().lock();
        stderr.write_all(prompt.as_bytes())?;
        stderr.flush()?;
        drop(stderr);

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        Self::ask(prompt)
    }

    fn read_secret(&mut self, prompt: &str) -> io::Result<String> {
        let _guard = EchoGuard::disable();
        Self::ask(prompt)
    }

    fn notify(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

/// Turns terminal echo off for stdin until dropped.
///
/// A no-op when stdin is not a terminal.
struct EchoGuard {
    #[cfg(unix)]
    saved: Option<libc::termios>,
}

#[cfg(unix)]
impl EchoGuard {
    fn disable() -> Self {
        let fd = libc::STDIN_FILENO;
        if unsafe { libc::isatty(fd) } != 1 {
            return Self { saved: None };
        }

        let mut term = std::mem::MaybeUninit::<libc::termios>::uninit();
        if unsafe { libc::tcgetattr(fd, term.as_mut_ptr()) } != 0 {
            return Self { saved: None };
        }
        let saved = unsafe { term.assume_init() };

        let mut silent = saved;
        silent.c_lflag &= !libc::ECHO;
        silent.c_lflag |= libc::ECHONL;
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &silent) } != 0 {
            return Self { saved: None };
        }
        Self { saved: Some(saved) }
    }
}

#[cfg(not(unix))]
impl EchoGuard {
    fn disable() -> Self {
        Self {}
    }
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(saved) = self.saved.take() {
            unsafe {
                libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &saved);
            }
        }
    }
}
