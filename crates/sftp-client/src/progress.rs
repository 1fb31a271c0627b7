//! `CopyParameters` and `OperationProgress`, the two data types spec.md §3
//! gives the transfer engine to carry caller policy and batch state,
//! plus the `Prompter` trait standing in for the terminal's interactive
//! `DoQueryUser` (spec.md §6), since user interaction is explicitly out
//! of this crate's scope.

/// Line-ending convention an ASCII transfer converts between. The
/// terminal/session object that would normally own this choice is out of
/// scope (spec.md §1); the caller supplies it instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EolStyle {
    Lf,
    CrLf,
}

/// Per-batch transfer policy. Every predicate is supplied by the caller
/// rather than hardcoded, since the terminal/session object that would
/// normally own these decisions is an external collaborator (spec.md §1).
pub struct CopyParameters {
    pub preserve_rights: bool,
    pub preserve_time: bool,
    /// `AllowResume(size)`: whether a file of this size may use resume at
    /// all (callers typically gate this on a minimum size).
    pub allow_resume: Box<dyn Fn(u64) -> bool + Send + Sync>,
    /// `UseAsciiTransfer(name)`: whether this file should have its line
    /// endings converted in transit.
    pub use_ascii_transfer: Box<dyn Fn(&str) -> bool + Send + Sync>,
    /// `ChangeFileNameCase(name)`: name transform applied to the
    /// destination's leaf component.
    pub change_file_name_case: Box<dyn Fn(&str) -> String + Send + Sync>,
    /// `RemoteFileRights(local_attrs)`: permission bits to request for a
    /// newly created remote file, derived from the local file's mode.
    pub remote_file_rights: Box<dyn Fn(u32) -> u32 + Send + Sync>,
    /// Suffix appended to an in-progress destination name
    /// (`PartialExt` in spec.md §6; `.filepart` is WinSCP's own default).
    pub partial_ext: String,
    /// Whether the destination-exists case should prompt at all, or treat
    /// a bare overwrite as implicitly allowed.
    pub confirm_overwriting: bool,
    /// Remove the source after a successful transfer (`cpDelete`).
    pub delete_source: bool,
    /// Line ending the session speaks on the wire for ASCII transfers.
    pub session_eol: EolStyle,
    /// Line ending the local filesystem uses.
    pub local_eol: EolStyle,
}

impl Default for CopyParameters {
    fn default() -> Self {
        CopyParameters {
            preserve_rights: false,
            preserve_time: true,
            allow_resume: Box::new(|_size| true),
            use_ascii_transfer: Box::new(|_name| false),
            change_file_name_case: Box::new(|name| name.to_string()),
            remote_file_rights: Box::new(|local| local),
            partial_ext: ".filepart".to_string(),
            confirm_overwriting: true,
            delete_source: false,
            session_eol: EolStyle::CrLf,
            local_eol: EolStyle::Lf,
        }
    }
}

/// Cooperative cancellation state, polled by the engine between blocks and
/// after every user prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelState {
    #[default]
    None,
    Cancel,
}

/// Mutable, per-file progress state the engine updates as a transfer runs.
/// Owned by the caller (so a CLI can wire it to a progress bar); the
/// engine only ever borrows it.
///
/// `on_update`, if set, is called synchronously after every block — there
/// is no second task polling this state (spec.md §5: one logical thread
/// per session), so a CLI drives its progress bar straight from the
/// callback instead of spawning a poller against a shared `Mutex`.
#[derive(Default)]
pub struct OperationProgress {
    pub file_name: String,
    pub local_size: u64,
    pub transfer_size: u64,
    pub transferred: u64,
    pub resumed: u64,
    pub block_size: u32,
    pub cancel: CancelState,
    /// Sticky "yes" answer from an earlier overwrite prompt in this batch;
    /// once set, later prompts are skipped and treated as `Yes`.
    pub yes_to_all: bool,
    /// Sticky "no" answer; later prompts are skipped and treated as skip.
    pub no_to_all: bool,
    pub ascii: bool,
    pub resuming: bool,
    pub on_update: Option<Box<dyn FnMut(&OperationProgressSnapshot) + Send>>,
}

impl std::fmt::Debug for OperationProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationProgress")
            .field("file_name", &self.file_name)
            .field("local_size", &self.local_size)
            .field("transfer_size", &self.transfer_size)
            .field("transferred", &self.transferred)
            .field("resumed", &self.resumed)
            .field("block_size", &self.block_size)
            .field("cancel", &self.cancel)
            .field("yes_to_all", &self.yes_to_all)
            .field("no_to_all", &self.no_to_all)
            .field("ascii", &self.ascii)
            .field("resuming", &self.resuming)
            .finish_non_exhaustive()
    }
}

/// A read-only copy of the progress fields a callback needs, so `on_update`
/// doesn't have to borrow `OperationProgress` itself while it's already
/// mutably borrowed by the engine.
#[derive(Debug, Clone, Copy)]
pub struct OperationProgressSnapshot {
    pub transferred: u64,
    pub resumed: u64,
    pub transfer_size: u64,
}

impl OperationProgress {
    pub fn start_file(&mut self, name: &str, local_size: u64, transfer_size: u64) {
        self.file_name = name.to_string();
        self.local_size = local_size;
        self.transfer_size = transfer_size;
        self.transferred = 0;
        self.resumed = 0;
        self.ascii = false;
        self.resuming = false;
    }

    pub fn add_transferred(&mut self, n: u64) {
        self.transferred += n;
        if let Some(callback) = self.on_update.as_mut() {
            callback(&OperationProgressSnapshot {
                transferred: self.transferred,
                resumed: self.resumed,
                transfer_size: self.transfer_size,
            });
        }
    }

    pub fn set_resumed(&mut self, n: u64) {
        self.resumed = n;
        self.transferred = n;
        self.resuming = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel == CancelState::Cancel
    }

    pub fn block_size(&self) -> u32 {
        if self.block_size == 0 {
            32 * 1024
        } else {
            self.block_size
        }
    }

    /// Terminator for a file's progress: `Finish(name, success)`.
    pub fn finish(&mut self, success: bool) -> (String, bool) {
        (std::mem::take(&mut self.file_name), success)
    }
}

/// The caller's answer to an overwrite prompt. `NeverAskAgain` falls
/// through to `YesToAll` falls through to `Yes` — preserved intentionally
/// from the source implementation, per spec.md §9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteAnswer {
    Yes,
    YesToAll,
    NeverAskAgain,
    No,
    NoToAll,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAnswer {
    Resume,
    Restart,
    Abort,
}

/// Stands in for the terminal's `DoQueryUser`: the interactive decisions
/// the transfer engine needs mid-flight.
pub trait Prompter: Send {
    fn confirm_overwrite(&mut self, name: &str) -> OverwriteAnswer;
    fn confirm_resume(&mut self, name: &str, partial_bigger_than_source: bool) -> ResumeAnswer;

    /// A child of a directory recursion failed; spec.md §4.6.3 has the
    /// user acknowledge it with OK (continue the batch) or Abort (unwind
    /// it). Returns `true` to abort.
    fn acknowledge_failure(&mut self, name: &str, message: &str) -> bool;
}

/// A prompter that never interacts: always answers as if the user chose
/// to proceed. Useful for non-interactive callers and tests.
pub struct AlwaysYes;

impl Prompter for AlwaysYes {
    fn confirm_overwrite(&mut self, _name: &str) -> OverwriteAnswer {
        OverwriteAnswer::Yes
    }

    fn confirm_resume(&mut self, _name: &str, _partial_bigger_than_source: bool) -> ResumeAnswer {
        ResumeAnswer::Resume
    }

    fn acknowledge_failure(&mut self, _name: &str, _message: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_size_falls_back_to_a_default() {
        let mut progress = OperationProgress::default();
        assert_eq!(progress.block_size(), 32 * 1024);
        progress.block_size = 4096;
        assert_eq!(progress.block_size(), 4096);
    }

    #[test]
    fn set_resumed_marks_resuming_and_seeds_transferred() {
        let mut progress = OperationProgress::default();
        progress.set_resumed(4096);
        assert!(progress.resuming);
        assert_eq!(progress.transferred, 4096);
    }
}
