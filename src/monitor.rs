//! One output region: its geometry, bar, layout selection, master area and
//! dual-tagset/focus-stack state (spec.md §3 "Monitor").
use crate::geometry::Rect;
use crate::layout::LayoutKind;
use crate::Xid;

/// A stable, non-owning index into the monitor arena (spec.md §9: "model as
/// a non-owning index into the monitor table", never shared ownership).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonitorId(pub usize);

/// A monitor's two-slot tagset with toggle-between-last-two semantics
/// (spec.md §3 "Tagsets").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSet {
    slots: [u32; 2],
    selected: usize,
}

impl TagSet {
    pub fn new(initial: u32) -> Self {
        Self {
            slots: [initial, initial],
            selected: 0,
        }
    }

    pub fn active(&self) -> u32 {
        self.slots[self.selected]
    }

    /// `view(mask)`: no-op if `mask` is already active; otherwise flip the
    /// active slot and, if `mask != 0`, assign it there (spec.md §4.4).
    pub fn view(&mut self, mask: u32) {
        if mask == self.active() {
            return;
        }
        self.selected ^= 1;
        if mask != 0 {
            self.slots[self.selected] = mask;
        }
    }

    /// `toggleview(mask)`: XOR into the active slot; refuses a change that
    /// would empty it. Returns whether the change was applied.
    pub fn toggle_view(&mut self, mask: u32) -> bool {
        let candidate = self.active() ^ mask;
        if candidate == 0 {
            return false;
        }
        self.slots[self.selected] = candidate;
        true
    }
}

/// One output region and everything hung off it: usable geometry, bar,
/// active layout, master-area sizing, tagset and the dual client/focus
/// lists (spec.md §3 invariants: a client appears in exactly one position
/// of both `clients` and `stack`, and `sel` is null or a member of `stack`).
#[derive(Debug, Clone)]
pub struct Monitor {
    pub num: usize,

    pub total: Rect,
    pub usable: Rect,

    pub bar_window: Option<Xid>,
    pub bar_y: i32,
    pub show_bar: bool,
    pub top_bar: bool,

    pub layouts: [LayoutKind; 2],
    pub sel_layout: usize,
    pub layout_symbol: String,

    pub mfact: f32,
    pub nmaster: u32,

    pub tagset: TagSet,

    /// Insertion-ordered membership list.
    pub clients: Vec<Xid>,
    /// Focus-ordered list, most-recently-focused first.
    pub stack: Vec<Xid>,
    /// The focused client on this monitor, if any. Always a member of
    /// `stack` when `Some`.
    pub sel: Option<Xid>,
}

impl Monitor {
    pub fn new(num: usize, total: Rect, usable: Rect, default_tags: u32, default_layouts: [LayoutKind; 2]) -> Self {
        Self {
            num,
            total,
            usable,
            bar_window: None,
            bar_y: 0,
            show_bar: true,
            top_bar: true,
            layouts: default_layouts,
            sel_layout: 0,
            layout_symbol: default_layouts[0].symbol().to_string(),
            mfact: 0.55,
            nmaster: 1,
            tagset: TagSet::new(default_tags),
            clients: Vec::new(),
            stack: Vec::new(),
            sel: None,
        }
    }

    pub fn active_layout(&self) -> LayoutKind {
        self.layouts[self.sel_layout]
    }

    /// Attach a client at the head of both lists (spec.md §3 "Lifecycles":
    /// "attached to both lists at head").
    pub fn attach(&mut self, id: Xid) {
        self.clients.insert(0, id);
        self.stack.insert(0, id);
    }

    /// Detach a client from both lists, preserving relative order of the
    /// rest (spec.md §9: "Deletion must preserve the dual-list invariant").
    pub fn detach(&mut self, id: Xid) {
        self.clients.retain(|&c| c != id);
        self.stack.retain(|&c| c != id);
        if self.sel == Some(id) {
            self.sel = self.stack.first().copied();
        }
    }

    /// Move `id` to the head of the focus stack (focus-recency update).
    pub fn raise_in_stack(&mut self, id: Xid) {
        self.stack.retain(|&c| c != id);
        self.stack.insert(0, id);
    }

    /// Move `id` to the head of the clients list (used by `zoom`).
    pub fn raise_in_clients(&mut self, id: Xid) {
        self.clients.retain(|&c| c != id);
        self.clients.insert(0, id);
    }

    pub fn contains(&self, id: Xid) -> bool {
        self.clients.contains(&id)
    }

    pub fn bar_height(&self) -> i32 {
        self.total.h - self.usable.h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // spec.md §8 boundary scenario 4.
    #[test]
    fn view_toggles_selected_slot_and_preserves_previous_mask() {
        let mut ts = TagSet::new(0b0001);
        assert_eq!(ts.active(), 0b0001);

        ts.view(0b0010);
        assert_eq!(ts.active(), 0b0010);

        // view(0) flips back without touching either slot's stored mask.
        ts.view(0);
        assert_eq!(ts.active(), 0b0001);
    }

    #[test]
    fn view_same_mask_twice_is_a_no_op() {
        let mut ts = TagSet::new(0b0001);
        ts.view(0b0010);
        let before = ts;
        ts.view(0b0010);
        assert_eq!(ts, before);
    }

    #[test]
    fn toggle_view_twice_is_identity_when_never_empty() {
        let mut ts = TagSet::new(0b0111);
        let before = ts.active();
        assert!(ts.toggle_view(0b0010));
        assert!(ts.toggle_view(0b0010));
        assert_eq!(ts.active(), before);
    }

    #[test]
    fn toggle_view_refuses_to_empty_the_active_tagset() {
        let mut ts = TagSet::new(0b0001);
        assert!(!ts.toggle_view(0b0001));
        assert_eq!(ts.active(), 0b0001);
    }

    #[test]
    fn attach_detach_preserve_dual_list_invariant() {
        let mut m = Monitor::new(
            0,
            Rect::new(0, 0, 1920, 1080),
            Rect::new(0, 0, 1920, 1080),
            1,
            [LayoutKind::Tile, LayoutKind::Floating],
        );
        m.attach(1);
        m.attach(2);
        assert_eq!(m.clients, vec![2, 1]);
        assert_eq!(m.stack, vec![2, 1]);

        m.detach(2);
        assert_eq!(m.clients, vec![1]);
        assert_eq!(m.stack, vec![1]);
    }
}

#[cfg(test)]
mod quickcheck_tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    // spec.md §8 "toggleview is its own inverse except where it would empty
    // the tagset": applying the same mask twice always returns to the
    // starting tagset, for any nonzero initial mask and any toggled mask.
    #[quickcheck]
    fn toggle_view_twice_is_identity(initial: u32, mask: u32) -> bool {
        let initial = if initial == 0 { 1 } else { initial };
        let mut ts = TagSet::new(initial);
        let before = ts;
        ts.toggle_view(mask);
        ts.toggle_view(mask);
        ts == before
    }

    // spec.md §8 "view is idempotent": calling view with the tagset's own
    // active mask twice in a row never changes it further after the first
    // call settles.
    #[quickcheck]
    fn view_is_idempotent_once_settled(initial: u32, mask: u32) -> bool {
        let initial = if initial == 0 { 1 } else { initial };
        let mut ts = TagSet::new(initial);
        ts.view(mask);
        let settled = ts.active();
        ts.view(settled);
        ts.active() == settled
    }
}
