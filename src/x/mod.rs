//! The property/ICCCM adapter as a trait seam (spec.md §4 expansion "C1").
//!
//! Everything above this module treats the X server as a given (spec.md
//! §1): `crate::manager` and `crate::layout` talk only to `Connection`, never
//! to `x11rb` directly. This mirrors the teacher's `XConn` trait
//! (`core::xconnection::XConn`) — one seam, one production implementation
//! (`backend`).
pub mod backend;

use crate::atom::Atom;
use crate::bindings::{ButtonBinding, KeyBinding};
use crate::error::Result;
use crate::event::XEvent;
use crate::geometry::{Rect, SizeHints};
use crate::Xid;

/// `WM_HINTS` fields this WM cares about (spec.md §3 "State flags" sourced
/// from `WM_HINTS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WmHints {
    pub urgent: bool,
    /// `input` field: false means the client never wants X input focus
    /// (spec.md §4.4 "neverfocus").
    pub accepts_input: bool,
}

/// Which of the two protocols from `WM_PROTOCOLS` a client advertises
/// (spec.md §6 atom list: `WM_TAKE_FOCUS`, `WM_DELETE_WINDOW`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WmProtocolsSupport {
    pub take_focus: bool,
    pub delete_window: bool,
}

/// A window's class/instance pair from `WM_CLASS`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassHint {
    pub class: String,
    pub instance: String,
}

/// The cursor shown during each interactive mode (spec.md §3 "one cursor per
/// interactive mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    Normal,
    Resize,
    Move,
}

/// Geometry as reported by `GetGeometry`/`ConfigureNotify`, border included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireGeometry {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub bw: i32,
}

/// Every X operation the rest of the window manager needs, modeled on the
/// teacher's `XConn` trait. One production implementation
/// (`backend::X11rbConnection`) backs it with `x11rb`; a fake connection
/// used in tests would implement this trait directly instead of talking to
/// a real display, the role the teacher's `MockXConn` plays.
pub trait Connection {
    /// Intern every atom in [`crate::atom::Atom`] in one batch (spec.md §9
    /// "Global state": the atom table is built once at startup).
    fn intern_known_atoms(&mut self) -> Result<()>;

    /// Look up an already-interned atom's id. Panics if called before
    /// `intern_known_atoms` — a programming error, not a runtime one.
    fn atom_id(&self, atom: Atom) -> u32;

    /// Resolve an atom id back to the `Atom` it was interned as, if any.
    fn atom_name_for(&self, id: u32) -> Option<Atom>;

    fn root(&self) -> Xid;

    /// Query Xinerama for the current screen rectangles (spec.md §4.5,
    /// §6 "optionally Xinerama"). Deduplication by origin+size is the
    /// caller's job (`crate::monitor` enumeration), not this seam's.
    fn query_screens(&self) -> Result<Vec<Rect>>;

    /// Create the 1x1 override-redirect check window and return its id
    /// (spec.md §6 "A 1x1 dummy window... `_NET_SUPPORTING_WM_CHECK`").
    fn create_check_window(&mut self) -> Result<Xid>;

    /// Publish `_NET_SUPPORTING_WM_CHECK` on both `check_win` and root, and
    /// `_NET_WM_NAME` on `check_win`.
    fn set_supporting_wm_check(&self, check_win: Xid) -> Result<()>;

    /// Publish the `_NET_SUPPORTED` atom list on root (spec.md §6).
    fn set_supported(&self) -> Result<()>;

    /// Clear `_NET_CLIENT_LIST` on root (done once at startup before `scan`).
    fn delete_client_list(&self) -> Result<()>;

    fn get_window_attributes_override_redirect(&self, id: Xid) -> Result<bool>;

    fn get_geometry(&self, id: Xid) -> Result<WireGeometry>;

    /// Read `WM_NORMAL_HINTS`. Per spec.md §9's first open question: if the
    /// underlying request fails, return hints that are all-zero (the
    /// original's documented, if suspicious, behavior) rather than an error.
    fn get_size_hints(&self, id: Xid) -> Result<SizeHints>;

    fn get_wm_hints(&self, id: Xid) -> Result<Option<WmHints>>;

    fn get_wm_protocols(&self, id: Xid) -> Result<WmProtocolsSupport>;

    fn get_transient_for(&self, id: Xid) -> Result<Option<Xid>>;

    fn get_class_hint(&self, id: Xid) -> Result<ClassHint>;

    /// First atom in `_NET_WM_WINDOW_TYPE`, if set.
    fn get_window_type(&self, id: Xid) -> Result<Option<Atom>>;

    /// `_NET_WM_NAME` (preferred) falling back to `WM_NAME`; `None` if
    /// neither is set or readable (spec.md §7 item 5).
    fn get_title(&self, id: Xid) -> Result<Option<String>>;

    /// `WM_NAME` of the root window, used for bar status text.
    fn get_root_name(&self) -> Result<Option<String>>;

    fn set_wm_state_withdrawn(&self, id: Xid) -> Result<()>;
    fn set_wm_state_normal(&self, id: Xid) -> Result<()>;

    fn set_client_list(&self, ids: &[Xid]) -> Result<()>;
    fn append_client_list(&self, id: Xid) -> Result<()>;

    fn set_active_window(&self, id: Option<Xid>) -> Result<()>;

    fn set_fullscreen_state(&self, id: Xid, fullscreen: bool) -> Result<()>;

    /// `ConfigureWindow` with x/y/w/h/border-width.
    fn configure(&self, id: Xid, geom: WireGeometry) -> Result<()>;
    fn configure_border_width(&self, id: Xid, bw: i32) -> Result<()>;
    fn send_synthetic_configure_notify(&self, id: Xid, geom: WireGeometry) -> Result<()>;

    /// `ConfigureWindow` honoring only the fields `value_mask` (the raw
    /// `xproto::ConfigWindow` bitmask from the request) actually asked for
    /// (spec.md §4.1 "ConfigureRequest... For unmanaged windows, pass
    /// through to X").
    fn configure_passthrough(&self, id: Xid, geom: WireGeometry, value_mask: u16) -> Result<()>;

    fn raise_window(&self, id: Xid) -> Result<()>;

    /// Stack `id` immediately below `sibling` (used by `restack` to keep
    /// the focus-stack order on screen, spec.md §4.3 "restack").
    fn stack_below(&self, id: Xid, sibling: Xid) -> Result<()>;

    /// Select the event mask a managed client needs
    /// (EnterWindow|FocusChange|PropertyChange|StructureNotify).
    fn select_client_input(&self, id: Xid) -> Result<()>;

    /// Select the root's SubstructureRedirect/Notify mask; fails with
    /// [`crate::error::Error::AnotherWmRunning`] if a `BadAccess` is raised
    /// (spec.md §5 "a startup handler that aborts on BadAccess").
    fn become_window_manager(&self) -> Result<()>;

    fn grab_keys(&self, keys: &[KeyBinding], numlock_mask: u16) -> Result<()>;
    fn ungrab_keys(&self) -> Result<()>;

    /// Grab buttons on `id`. `focused` selects the replicated
    /// configured-combinations-only grab vs. the any-button synchronous
    /// grab used for unfocused clients (spec.md §5 "Grabs").
    fn grab_buttons(&self, id: Xid, focused: bool, buttons: &[ButtonBinding], numlock_mask: u16) -> Result<()>;

    fn set_input_focus(&self, id: Xid) -> Result<()>;
    fn revert_focus_to_root(&self) -> Result<()>;

    fn send_wm_take_focus(&self, id: Xid) -> Result<()>;
    fn send_wm_delete(&self, id: Xid) -> Result<()>;
    fn kill_client(&self, id: Xid) -> Result<()>;

    fn map_window(&self, id: Xid) -> Result<()>;
    fn unmap_window(&self, id: Xid) -> Result<()>;

    fn set_border_color(&self, id: Xid, pixel: u32) -> Result<()>;
    fn set_border_width(&self, id: Xid, bw: i32) -> Result<()>;

    /// Enumerate top-level children of root for the initial `scan`
    /// (spec.md §6 "Persisted state").
    fn query_tree(&self) -> Result<Vec<Xid>>;

    /// True if `WM_STATE` is absent (never mapped) or Iconic/Normal, i.e.
    /// a window `scan` should adopt.
    fn is_viewable_or_iconic(&self, id: Xid) -> Result<bool>;

    fn warp_pointer(&self, id: Xid, x: i32, y: i32) -> Result<()>;

    /// Create a core-font glyph cursor for one interactive mode (spec.md §6
    /// expansion: cursor creation is out of scope as a subsystem, satisfied
    /// here as a one-line `create_glyph_cursor` collaborator call).
    fn create_cursor(&self, shape: CursorShape) -> Result<Xid>;
    fn grab_pointer(&self, cursor: Xid) -> Result<()>;
    fn ungrab_pointer(&self) -> Result<()>;

    /// Replay the event that triggered a synchronous button grab to the
    /// grabbing client (spec.md §4.1: a click on a client area "focuses that
    /// client, restacks, and replays the pointer so the client also
    /// receives it").
    fn allow_replay_pointer(&self) -> Result<()>;

    /// Block for the next event.
    fn next_event(&self) -> Result<XEvent>;
    /// Drain already-queued events without blocking (used to flush stray
    /// EnterNotify events after a `restack`, spec.md §4.3).
    fn poll_events(&self) -> Result<Vec<XEvent>>;

    fn flush(&self) -> Result<()>;
    fn sync(&self) -> Result<()>;

    /// The modifier mask bound to NumLock at the current keyboard mapping
    /// (spec.md §4.1 "Modifier cleaning removes NumLock").
    fn numlock_mask(&self) -> u16;
    /// Re-derive `numlock_mask` after a MappingNotify (spec.md §4.1
    /// "MappingNotify... re-grab keys if the keyboard mapping changed").
    fn refresh_keyboard_mapping(&mut self) -> Result<bool>;
}
