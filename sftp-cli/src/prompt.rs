//! Stands in for the GUI's confirm dialogs (spec.md §1 puts the
//! user-interaction layer out of the core's scope): reads yes/no answers
//! from the controlling terminal.

use std::io::{self, Write};

use sftp_client::progress::{OverwriteAnswer, Prompter, ResumeAnswer};

/// Prompts on stdin/stdout. `assume_yes` answers every prompt as if the
/// user typed "yes", for non-interactive / scripted invocations (`--yes`).
pub struct TerminalPrompter {
    pub assume_yes: bool,
}

impl TerminalPrompter {
    fn ask(&self, question: &str) -> String {
        print!("{question} ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() {
            return String::new();
        }
        line.trim().to_lowercase()
    }
}

impl Prompter for TerminalPrompter {
    fn confirm_overwrite(&mut self, name: &str) -> OverwriteAnswer {
        if self.assume_yes {
            return OverwriteAnswer::YesToAll;
        }
        loop {
            // Answers are matched lowercase, so the shortcuts below must be
            // distinct letters regardless of case — no capital-only option.
            let answer = self.ask(&format!(
                "{name} already exists. Overwrite? [y]es/[n]o/[a]ll/[s]kip-all/a[b]ort:"
            ));
            return match answer.as_str() {
                "y" | "yes" => OverwriteAnswer::Yes,
                "a" | "all" => OverwriteAnswer::YesToAll,
                "n" | "no" => OverwriteAnswer::No,
                "s" | "skip-all" | "none" => OverwriteAnswer::NoToAll,
                "b" | "abort" => OverwriteAnswer::Abort,
                "" => OverwriteAnswer::Yes,
                _ => continue,
            };
        }
    }

    fn confirm_resume(&mut self, name: &str, partial_bigger_than_source: bool) -> ResumeAnswer {
        if self.assume_yes {
            return ResumeAnswer::Resume;
        }
        if partial_bigger_than_source {
            let _ = self.ask(&format!(
                "A partial file for {name} is larger than the source; it will be restarted. [ok]"
            ));
            return ResumeAnswer::Restart;
        }
        loop {
            // Same constraint as confirm_overwrite: the matched answer is
            // lowercased, so "resume" and "restart" need distinct letters.
            let answer = self.ask(&format!(
                "A partial transfer for {name} exists. [r]esume/re[s]tart/a[b]ort:"
            ));
            return match answer.as_str() {
                "r" | "resume" | "" => ResumeAnswer::Resume,
                "s" | "restart" => ResumeAnswer::Restart,
                "b" | "abort" => ResumeAnswer::Abort,
                _ => continue,
            };
        }
    }

    fn acknowledge_failure(&mut self, name: &str, message: &str) -> bool {
        if self.assume_yes {
            return false;
        }
        let answer = self.ask(&format!(
            "{name} failed: {message}. [o]k to continue/a[b]ort:"
        ));
        matches!(answer.as_str(), "b" | "abort")
    }
}
