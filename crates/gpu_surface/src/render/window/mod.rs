//! Native window subsystem
//!
//! - **`native`**: Shared, revalidated handles to platform windows
//! - **`mailbox`**: Single-slot lifecycle mailbox from the UI thread to the render thread

pub mod mailbox;
pub mod native;

// Re-export the main public types for convenience
pub use mailbox::{MailboxSender, WindowMailbox, WindowMessage};
pub use native::{NativeWindow, WindowHandleKind};
