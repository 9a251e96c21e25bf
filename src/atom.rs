//! The fixed set of ICCCM/EWMH atoms this window manager reads or writes
//! (spec.md §6 "EWMH/ICCCM atoms").
use strum::{AsRefStr, EnumIter, EnumString};

/// Every atom the window manager interns at startup. Interning them all in
/// one batch of requests (see [`crate::x::Connection::intern_known_atoms`])
/// avoids one server round-trip per atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumString, EnumIter)]
pub enum Atom {
    #[strum(serialize = "UTF8_STRING")]
    Utf8String,
    #[strum(serialize = "WM_PROTOCOLS")]
    WmProtocols,
    #[strum(serialize = "WM_DELETE_WINDOW")]
    WmDeleteWindow,
    #[strum(serialize = "WM_STATE")]
    WmState,
    #[strum(serialize = "WM_TAKE_FOCUS")]
    WmTakeFocus,
    #[strum(serialize = "_NET_ACTIVE_WINDOW")]
    NetActiveWindow,
    #[strum(serialize = "_NET_SUPPORTED")]
    NetSupported,
    #[strum(serialize = "_NET_WM_NAME")]
    NetWmName,
    #[strum(serialize = "_NET_WM_STATE")]
    NetWmState,
    #[strum(serialize = "_NET_SUPPORTING_WM_CHECK")]
    NetSupportingWmCheck,
    #[strum(serialize = "_NET_WM_STATE_FULLSCREEN")]
    NetWmStateFullscreen,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE")]
    NetWmWindowType,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_DIALOG")]
    NetWmWindowTypeDialog,
    #[strum(serialize = "_NET_CLIENT_LIST")]
    NetClientList,
}

/// Atoms advertised in the root's `_NET_SUPPORTED` property (spec.md §6).
pub const EWMH_SUPPORTED: &[Atom] = &[
    Atom::NetActiveWindow,
    Atom::NetSupported,
    Atom::NetWmName,
    Atom::NetWmState,
    Atom::NetSupportingWmCheck,
    Atom::NetWmStateFullscreen,
    Atom::NetWmWindowType,
    Atom::NetWmWindowTypeDialog,
    Atom::NetClientList,
];
