//! The 14 X event kinds the dispatcher consumes (spec.md §4.1), as a tagged
//! enum rather than the server's raw per-type structs — matching dwm's fixed
//! `handler[event->type]` table, but as a match instead of a function-pointer
//! array (spec.md §9 "Event table").
use crate::Xid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCode {
    pub keysym: u32,
    pub state: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonCode {
    pub button: u8,
    pub state: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geom {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub bw: i32,
}

#[derive(Debug, Clone)]
pub enum XEvent {
    ButtonPress {
        window: Xid,
        subwindow: Xid,
        root_pt: Point,
        event_pt: Point,
        code: ButtonCode,
        time: u32,
    },
    ClientMessage {
        window: Xid,
        type_atom: Xid,
        data: [u32; 5],
    },
    ConfigureRequest {
        window: Xid,
        geom: Geom,
        value_mask: u16,
    },
    ConfigureNotify {
        window: Xid,
        geom: Geom,
        is_root: bool,
    },
    DestroyNotify {
        window: Xid,
    },
    EnterNotify {
        window: Xid,
        root_pt: Point,
        mode_normal: bool,
        detail_inferior: bool,
    },
    Expose {
        window: Xid,
        count: u16,
    },
    FocusIn {
        window: Xid,
    },
    KeyPress {
        window: Xid,
        code: KeyCode,
    },
    MappingNotify,
    MapRequest {
        window: Xid,
        override_redirect: bool,
    },
    MotionNotify {
        window: Xid,
        root_pt: Point,
        time: u32,
    },
    PropertyNotify {
        window: Xid,
        atom_name: String,
        is_root: bool,
    },
    UnmapNotify {
        window: Xid,
        send_event: bool,
    },
    ButtonRelease {
        code: ButtonCode,
    },
}
