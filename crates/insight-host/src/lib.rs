//! insight-host — Host platform integration for result actions.
//!
//! Clipboard access on a dedicated owner thread, the share command, and the
//! plain-text download writer.

pub mod clipboard;
pub mod download;
pub mod share;

pub use clipboard::{Clipboard, ClipboardError, CopyAck, SystemClipboard, COPY_ACK_WINDOW};
pub use download::{DownloadError, DOWNLOAD_FILE_NAME};
pub use share::{CommandShare, ShareError, SharePayload, ShareTarget};
