//! Crate-wide error taxonomy (spec.md §7).
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can be surfaced through `Result`. Taxonomy items that
/// spec.md §7 calls fatal-by-contract (startup impossible, allocation
/// failure, unexpected X errors) are reported via these variants and then
/// handled by `crate::startup`, which logs and exits; benign X errors and
/// missing optional properties never reach this type (they are swallowed
/// or defaulted at the point they occur, per spec.md §7 items 3 and 5).
#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to connect to the X server: {0}")]
    Connect(#[from] x11rb::errors::ConnectError),

    #[error("X11 connection error: {0}")]
    Connection(#[from] x11rb::errors::ConnectionError),

    #[error("X11 request failed: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),

    #[error("X11 request failed: {0}")]
    ReplyOrId(#[from] x11rb::errors::ReplyOrIdError),

    #[error("another window manager is already running on this display")]
    AnotherWmRunning,

    #[error("the X server does not support the Xinerama extension")]
    MissingXinerama,

    #[error("a requested atom was never interned: {0}")]
    UnknownAtom(String),

    #[error("failed to install the SIGCHLD handler: {0}")]
    SignalHandler(#[from] nix::errno::Errno),

    #[error("{0}")]
    Other(String),
}
