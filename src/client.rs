//! Per-window state: geometry, ICCCM size hints, floating/fullscreen/urgent
//! flags and tag membership (spec.md §3 "Client").
use crate::geometry::SizeHints;
use crate::monitor::MonitorId;
use crate::Xid;

/// Maximum length in bytes retained for a client's title (spec.md §3: "a
/// bounded UTF-8 string (≤255 bytes)").
pub const MAX_TITLE_BYTES: usize = 255;

/// The literal title used when a client's name property cannot be read.
pub const BROKEN_TITLE: &str = "broken";

/// A snapshot of geometry and border width, used to restore a client after
/// it leaves fullscreen (spec.md §3 "shadow" fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometrySnapshot {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub bw: i32,
}

/// One managed top-level X window and all of the state the window manager
/// tracks about it.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: Xid,

    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub bw: i32,
    pub old: GeometrySnapshot,

    /// This client's `x` before `showhide` parked it off-screen for a
    /// tag switch, so it can be restored verbatim when it becomes visible
    /// again (spec.md §4.3 "showhide"). `None` means not currently parked.
    pub parked_x: Option<i32>,

    pub hints: SizeHints,

    pub is_floating: bool,
    pub is_urgent: bool,
    pub never_focus: bool,
    pub is_fullscreen: bool,
    /// The floating flag saved across a fullscreen toggle.
    pub old_state: bool,

    /// Bitmask over the configured tags (at most 31 set bits of use, bit
    /// `i` meaning "tag `i`"). Never has bits set above the configured tag
    /// count (spec.md §3 invariants).
    pub tags: u32,

    pub title: String,
    pub class: String,
    pub instance: String,

    pub monitor: MonitorId,

    /// True iff this client advertises `WM_TAKE_FOCUS` in `WM_PROTOCOLS`.
    pub supports_take_focus: bool,
    /// True iff this client advertises `WM_DELETE_WINDOW` in `WM_PROTOCOLS`.
    pub supports_delete_window: bool,
}

impl Client {
    pub fn new(id: Xid, monitor: MonitorId, tags: u32) -> Self {
        Self {
            id,
            x: 0,
            y: 0,
            w: 1,
            h: 1,
            bw: 0,
            old: GeometrySnapshot::default(),
            parked_x: None,
            hints: SizeHints::default(),
            is_floating: false,
            is_urgent: false,
            never_focus: false,
            is_fullscreen: false,
            old_state: false,
            tags,
            title: String::new(),
            class: String::new(),
            instance: String::new(),
            monitor,
            supports_take_focus: false,
            supports_delete_window: false,
        }
    }

    /// Derived from size hints: true iff `maxw == minw > 0 && maxh == minh > 0`.
    pub fn is_fixed(&self) -> bool {
        self.hints.is_fixed()
    }

    /// True iff `(tags & monitor_active_tags) != 0` (spec.md §3 visibility rule).
    pub fn is_visible_on(&self, active_tags: u32) -> bool {
        self.tags & active_tags != 0
    }

    /// Save current geometry/border into `old` before entering fullscreen.
    pub fn snapshot_geometry(&mut self) {
        self.old = GeometrySnapshot {
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
            bw: self.bw,
        };
    }

    pub fn restore_geometry(&mut self) {
        self.x = self.old.x;
        self.y = self.old.y;
        self.w = self.old.w;
        self.h = self.old.h;
        self.bw = self.old.bw;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let mut title = title.into();
        if title.len() > MAX_TITLE_BYTES {
            // Truncate on a char boundary so we never split a UTF-8 sequence.
            let mut end = MAX_TITLE_BYTES;
            while !title.is_char_boundary(end) {
                end -= 1;
            }
            title.truncate(end);
        }
        self.title = title;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new(1, MonitorId(0), 0b1)
    }

    #[test]
    fn visible_iff_tags_intersect_active_mask() {
        let mut c = client();
        c.tags = 0b0010;
        assert!(!c.is_visible_on(0b0001));
        assert!(c.is_visible_on(0b0011));
    }

    #[test]
    fn fullscreen_round_trip_restores_geometry_and_border() {
        let mut c = client();
        c.x = 10;
        c.y = 20;
        c.w = 300;
        c.h = 200;
        c.bw = 2;
        c.snapshot_geometry();

        c.x = 0;
        c.y = 0;
        c.w = 1920;
        c.h = 1080;
        c.bw = 0;

        c.restore_geometry();
        assert_eq!((c.x, c.y, c.w, c.h, c.bw), (10, 20, 300, 200, 2));
    }

    #[test]
    fn title_longer_than_255_bytes_is_truncated() {
        let mut c = client();
        c.set_title("x".repeat(300));
        assert_eq!(c.title.len(), MAX_TITLE_BYTES);
    }
}
