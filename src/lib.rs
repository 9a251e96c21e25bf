//! `rwm`: a dwm-style tiling window manager for X11 (spec.md §1 "Overview").
//!
//! The crate is split along the seam spec.md §9 describes: everything below
//! [`x`] talks only to the [`x::Connection`] trait, never to `x11rb`
//! directly, so the pure placement/state logic in [`layout`] and
//! [`monitor`] can be exercised without a display.
pub mod atom;
pub mod bar;
pub mod bindings;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod layout;
pub mod manager;
pub mod monitor;
pub mod x;

/// An X11 resource id. A plain alias rather than a newtype: the protocol
/// itself treats windows, pixmaps and cursors interchangeably as `u32`s, and
/// so does every method on [`x::Connection`].
pub type Xid = u32;

/// `CARGO_PKG_VERSION` at build time, used for the `-v` flag and as the bar
/// status fallback (spec.md §4.6 "fallback `\"dwm-<VERSION>\"`").
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
