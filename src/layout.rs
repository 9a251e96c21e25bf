//! Tile, monocle and floating arrangements, plus `showhide` visibility
//! placement (spec.md §4.3).
use crate::client::Client;
use crate::geometry::Rect;
use crate::monitor::Monitor;
use crate::Xid;
use std::collections::HashMap;

/// The three arrangements spec.md §4.3 defines. Fixed at three variants
/// (rather than an open `Box<dyn Layout>` set) because the specification
/// treats them as the complete list; a monitor's two-slot `layouts` array
/// picks two of these at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    Tile,
    Monocle,
    Floating,
}

impl LayoutKind {
    /// The symbol shown in the bar before any monocle override is applied.
    pub fn symbol(&self) -> &'static str {
        match self {
            LayoutKind::Tile => "[]=",
            LayoutKind::Monocle => "[M]",
            LayoutKind::Floating => "><>",
        }
    }

    /// Floating has no arrange function (spec.md §4.3 "Floating... the
    /// layout's arrange function is absent").
    pub fn has_arrange(&self) -> bool {
        !matches!(self, LayoutKind::Floating)
    }
}

/// Clients on `m` that tiling should place: visible on the monitor's active
/// tagset, not floating, not fullscreen. Order follows `m.clients`.
pub fn tiled_clients<'a>(m: &Monitor, clients: &'a HashMap<Xid, Client>) -> Vec<&'a Client> {
    let active = m.tagset.active();
    m.clients
        .iter()
        .filter_map(|id| clients.get(id))
        .filter(|c| c.is_visible_on(active) && !c.is_floating && !c.is_fullscreen)
        .collect()
}

/// Arrange the tiled clients of `m` in place, mutating each `Client`'s
/// stored geometry. Returns the ids that were (re)placed, in the order
/// they should be restacked (spec.md §4.3 "Order follows monitor `clients`
/// list").
pub fn arrange(m: &mut Monitor, clients: &mut HashMap<Xid, Client>) -> Vec<Xid> {
    match m.active_layout() {
        LayoutKind::Tile => tile(m, clients),
        LayoutKind::Monocle => monocle(m, clients),
        LayoutKind::Floating => {
            m.layout_symbol = LayoutKind::Floating.symbol().to_string();
            Vec::new()
        }
    }
}

/// spec.md §4.3 "Tile": master strip of width `ww * mfact` holding up to
/// `nmaster` clients, remainder in the stack area. Heights follow the
/// recurrence `h_i = (wh - accumulated) / remaining`, matching dwm's
/// `tile()` exactly (including its integer-division rounding, verified by
/// spec.md §8 boundary scenario 1).
fn tile(m: &mut Monitor, clients: &mut HashMap<Xid, Client>) -> Vec<Xid> {
    let ids: Vec<Xid> = m
        .clients
        .iter()
        .copied()
        .filter(|id| {
            clients
                .get(id)
                .map(|c| c.is_visible_on(m.tagset.active()) && !c.is_floating && !c.is_fullscreen)
                .unwrap_or(false)
        })
        .collect();
    let n = ids.len();
    m.layout_symbol = LayoutKind::Tile.symbol().to_string();
    if n == 0 {
        return ids;
    }

    let Rect { x: wx, y: wy, w: ww, h: wh } = m.usable;
    let nmaster = m.nmaster as usize;

    let mw = if n > nmaster && nmaster > 0 {
        (ww as f32 * m.mfact) as i32
    } else {
        ww
    };

    let mut my = 0;
    let mut ty = 0;
    for (i, id) in ids.iter().enumerate() {
        let c = clients.get_mut(id).expect("tiled id must be in the arena");
        let bw = c.bw;
        if i < nmaster {
            let remaining = n.min(nmaster) - i;
            let h = (wh - my) / remaining as i32;
            c.x = wx;
            c.y = wy + my;
            c.w = mw - 2 * bw;
            c.h = h - 2 * bw;
            my += h;
        } else {
            let remaining = n - i;
            let h = (wh - ty) / remaining as i32;
            c.x = wx + mw;
            c.y = wy + ty;
            c.w = ww - mw - 2 * bw;
            c.h = h - 2 * bw;
            ty += h;
        }
    }
    ids
}

/// spec.md §4.3 "Monocle": every tiled client fills the usable area; the
/// layout symbol is overridden to `"[N]"`.
fn monocle(m: &mut Monitor, clients: &mut HashMap<Xid, Client>) -> Vec<Xid> {
    let ids: Vec<Xid> = m
        .clients
        .iter()
        .copied()
        .filter(|id| {
            clients
                .get(id)
                .map(|c| c.is_visible_on(m.tagset.active()) && !c.is_floating && !c.is_fullscreen)
                .unwrap_or(false)
        })
        .collect();
    m.layout_symbol = format!("[{}]", ids.len());
    let Rect { x: wx, y: wy, w: ww, h: wh } = m.usable;
    for id in &ids {
        let c = clients.get_mut(id).expect("tiled id must be in the arena");
        let bw = c.bw;
        c.x = wx;
        c.y = wy;
        c.w = ww - 2 * bw;
        c.h = wh - 2 * bw;
    }
    ids
}

/// spec.md §4.3 "`showhide`": walk the focus stack; visible clients move to
/// their stored `(x, y)` top-down, invisible ones are parked off-screen to
/// the left bottom-up. The real `x` is saved in `Client::parked_x` before
/// parking and restored when the client becomes visible again, so a
/// floating client (never repositioned by `tile`/`monocle`) doesn't lose
/// its geometry permanently across a hide/show cycle.
pub fn showhide(m: &Monitor, clients: &mut HashMap<Xid, Client>) {
    let active = m.tagset.active();
    for id in m.stack.iter().rev() {
        if let Some(c) = clients.get_mut(id) {
            if c.is_visible_on(active) {
                if let Some(x) = c.parked_x.take() {
                    c.x = x;
                }
            } else if c.parked_x.is_none() {
                c.parked_x = Some(c.x);
                c.x = -2 * (c.w + 2 * c.bw);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::MonitorId;

    fn monitor_with(n: usize, mfact: f32, nmaster: u32, usable: Rect) -> (Monitor, HashMap<Xid, Client>) {
        let mut m = Monitor::new(0, usable, usable, 0b1, [LayoutKind::Tile, LayoutKind::Floating]);
        m.mfact = mfact;
        m.nmaster = nmaster;
        let mut clients = HashMap::new();
        for i in 0..n {
            let id = (i + 1) as Xid;
            let c = Client::new(id, MonitorId(0), 0b1);
            clients.insert(id, c);
            m.attach(id);
        }
        // attach() inserts at head each time; restore ascending id order to
        // match "order follows monitor clients list" with id 1 mapped first.
        m.clients.reverse();
        m.stack.reverse();
        (m, clients)
    }

    // spec.md §8 boundary scenario 1.
    #[test]
    fn tile_master_and_stack_geometry_matches_spec_scenario() {
        let (mut m, mut clients) = monitor_with(4, 0.55, 1, Rect::new(0, 0, 1600, 1000));
        tile(&mut m, &mut clients);

        let c1 = &clients[&1];
        assert_eq!((c1.x, c1.y, c1.w, c1.h), (0, 0, 880, 1000));

        let heights: Vec<i32> = [2, 3, 4].iter().map(|i| clients[i].h).collect();
        assert_eq!(heights, vec![333, 333, 334]);
        for id in [2, 3, 4] {
            assert_eq!(clients[&id].x, 880);
        }
    }

    // spec.md §8 boundary scenario 3.
    #[test]
    fn monocle_fills_usable_area_and_sets_count_symbol() {
        let usable = Rect::new(0, 0, 1920, 1080);
        let (mut m, mut clients) = monitor_with(3, 0.55, 1, usable);
        for c in clients.values_mut() {
            c.bw = 1;
        }
        monocle(&mut m, &mut clients);
        assert_eq!(m.layout_symbol, "[3]");
        for id in 1..=3 {
            let c = &clients[&id];
            assert_eq!((c.x, c.y, c.w, c.h), (0, 0, 1918, 1078));
        }
    }

    #[test]
    fn tile_with_no_tiled_clients_is_a_no_op() {
        let mut m = Monitor::new(0, Rect::new(0, 0, 100, 100), Rect::new(0, 0, 100, 100), 0b1, [LayoutKind::Tile, LayoutKind::Floating]);
        let mut clients = HashMap::new();
        let ids = tile(&mut m, &mut clients);
        assert!(ids.is_empty());
    }

    #[test]
    fn showhide_parks_invisible_clients_off_screen_to_the_left() {
        let mut m = Monitor::new(0, Rect::new(0, 0, 1000, 1000), Rect::new(0, 0, 1000, 1000), 0b01, [LayoutKind::Tile, LayoutKind::Floating]);
        let mut clients = HashMap::new();
        let mut c = Client::new(1, MonitorId(0), 0b10);
        c.w = 300;
        c.bw = 2;
        clients.insert(1, c);
        m.attach(1);

        showhide(&m, &mut clients);
        assert_eq!(clients[&1].x, -2 * (300 + 4));
    }

    #[test]
    fn showhide_restores_floating_geometry_after_tag_switches_back() {
        let mut m = Monitor::new(0, Rect::new(0, 0, 1000, 1000), Rect::new(0, 0, 1000, 1000), 0b01, [LayoutKind::Tile, LayoutKind::Floating]);
        let mut clients = HashMap::new();
        let mut c = Client::new(1, MonitorId(0), 0b10);
        c.is_floating = true;
        c.x = 150;
        c.w = 300;
        c.bw = 2;
        clients.insert(1, c);
        m.attach(1);

        // Tag 0b01 is active but the client only carries tag 0b10: hidden.
        showhide(&m, &mut clients);
        assert_eq!(clients[&1].x, -2 * (300 + 4));
        assert_eq!(clients[&1].parked_x, Some(150));

        // Switch the active tag back to the one the client carries.
        m.tagset.view(0b10);
        showhide(&m, &mut clients);
        assert_eq!(clients[&1].x, 150);
        assert_eq!(clients[&1].parked_x, None);
    }
}
