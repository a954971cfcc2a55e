//! Per-deletion confirmation port
//!
//! The blocking terminal prompt lives behind a trait so the engine is
//! testable without a terminal.

use crate::model::Resource;
use std::io::{BufRead, Write};

/// Operator's answer to a per-deletion prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Accept,
    Skip,
    /// Skip this resource and stop prompting; remaining deletions are not
    /// attempted and the run ends cleanly with what was recorded so far.
    AbortRemaining,
}

pub trait ConfirmationPort: Send + Sync {
    fn ask(&self, resource: &Resource) -> Confirmation;
}

impl ConfirmationPort for Box<dyn ConfirmationPort> {
    fn ask(&self, resource: &Resource) -> Confirmation {
        (**self).ask(resource)
    }
}

/// Accepts every deletion; used when `--confirm` is not set
pub struct AutoApprove;

impl ConfirmationPort for AutoApprove {
    fn ask(&self, _resource: &Resource) -> Confirmation {
        Confirmation::Accept
    }
}

/// Interactive prompt reading from stdin.
///
/// Deletions run sequentially, so blocking on the terminal here is fine.
pub struct StdinConfirmer;

impl ConfirmationPort for StdinConfirmer {
    fn ask(&self, resource: &Resource) -> Confirmation {
        let stdin = std::io::stdin();
        loop {
            print!("Delete {resource}? [y]es / [n]o / [a]bort remaining: ");
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            if stdin.lock().read_line(&mut line).is_err() {
                // Unreadable terminal: never delete on a garbled answer
                return Confirmation::AbortRemaining;
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Confirmation::Accept,
                "n" | "no" | "" => return Confirmation::Skip,
                "a" | "abort" => return Confirmation::AbortRemaining,
                other => println!("Unrecognized answer '{other}'"),
            }
        }
    }
}
