use tracing::{debug, warn};

use super::breaks;
use super::sections::Splitter;

/// Write access to a system clipboard.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> anyhow::Result<()>;
}

/// Outcome of a copy action, for the UI layer to present however it likes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyEvent {
    Copied { chars: usize },
    Nothing,
    Failed { reason: String },
}

/// Plain-text main body: breaks become `\n`, the appendix is cut off.
pub fn prepare_copy_text(raw: &str) -> String {
    prepare_with(&Splitter::default(), raw)
}

pub fn prepare_with(splitter: &Splitter, raw: &str) -> String {
    let plain = breaks::to_newlines(raw);
    splitter.split(&plain).main_body.to_string()
}

/// Copy an already prepared main body.
pub fn copy_text(text: &str, clipboard: &mut impl Clipboard) -> CopyEvent {
    if text.is_empty() {
        return CopyEvent::Nothing;
    }
    match clipboard.write_text(text) {
        Ok(()) => {
            let chars = text.chars().count();
            debug!(chars, "main body copied");
            CopyEvent::Copied { chars }
        }
        Err(e) => {
            warn!(error = %e, "clipboard write failed");
            CopyEvent::Failed {
                reason: e.to_string(),
            }
        }
    }
}

/// Prepare and copy in one step.
pub fn copy_main_body(raw: &str, clipboard: &mut impl Clipboard) -> CopyEvent {
    copy_text(&prepare_copy_text(raw), clipboard)
}

// ── Tests ──
