//! The event-driven window manager core (spec.md §4.1 "C6", §4.4, §4.5, §5):
//! lifecycle, the 14-event dispatch table, client management, the focus
//! model, layout application and interactive move/resize.
//!
//! `Wm<C>` is generic over [`Connection`] the way the teacher's
//! `WindowManager<'a>` was generic over `XConn` — the pure state transitions
//! here never touch `x11rb` directly, only the trait.
use std::collections::HashMap;

use tracing::{info, warn};

use crate::atom::Atom;
use crate::bar::{BarGeometry, Drawable};
use crate::bindings::{Action, Arg, ClickRegion, ModifierKey};
use crate::client::{Client, BROKEN_TITLE};
use crate::config::Config;
use crate::error::Result;
use crate::event::Point;
use crate::event::XEvent;
use crate::geometry::{apply_size_hints, Geometry, HintContext, Rect};
use crate::monitor::{Monitor, MonitorId};
use crate::x::{Connection, CursorShape, WireGeometry};
use crate::Xid;

// Raw `ConfigureWindow` value-mask bits (X11 protocol ch. 8), used to decide
// which fields of a `ConfigureRequest` the caller actually asked to change.
const CW_X: u16 = 1 << 0;
const CW_Y: u16 = 1 << 1;
const CW_WIDTH: u16 = 1 << 2;
const CW_HEIGHT: u16 = 1 << 3;
const CW_BORDER_WIDTH: u16 = 1 << 4;

/// How long, in milliseconds, to let `MotionNotify` events coalesce inside
/// an interactive move/resize loop before acting on one (spec.md §4.2
/// "roughly 60Hz").
const MOTION_THROTTLE_MS: u32 = 16;

/// The running window manager: one X connection, the monitor arena, every
/// managed client, and the bits of global state spec.md §9 calls out
/// ("selected monitor", "status text", "running").
pub struct Wm<C: Connection> {
    conn: C,
    cfg: Config,
    drawable: Box<dyn Drawable>,

    root: Xid,
    #[allow(dead_code)]
    check_win: Xid,
    #[allow(dead_code)]
    cursor_normal: Xid,
    cursor_resize: Xid,
    cursor_move: Xid,

    monitors: Vec<Monitor>,
    sel_mon: usize,
    clients: HashMap<Xid, Client>,

    status: String,
    running: bool,
}

impl<C: Connection> Wm<C> {
    /// Perform the startup sequence spec.md §5 describes: intern atoms,
    /// become the window manager (fails loudly if one is already running),
    /// publish the EWMH check window/supported list, grab keys, install the
    /// `SIGCHLD` handler, and enumerate the initial monitor set.
    pub fn new(mut conn: C, cfg: Config, drawable: Box<dyn Drawable>) -> Result<Self> {
        conn.intern_known_atoms()?;
        conn.become_window_manager()?;
        let root = conn.root();

        let check_win = conn.create_check_window()?;
        conn.set_supporting_wm_check(check_win)?;
        conn.set_supported()?;
        conn.delete_client_list()?;

        let cursor_normal = conn.create_cursor(CursorShape::Normal)?;
        let cursor_resize = conn.create_cursor(CursorShape::Resize)?;
        let cursor_move = conn.create_cursor(CursorShape::Move)?;

        conn.grab_keys(cfg.keys, conn.numlock_mask())?;
        install_sigchld_handler()?;

        let mut wm = Self {
            conn,
            cfg,
            drawable,
            root,
            check_win,
            cursor_normal,
            cursor_resize,
            cursor_move,
            monitors: Vec::new(),
            sel_mon: 0,
            clients: HashMap::new(),
            status: format!("rwm-{}", crate::VERSION),
            running: true,
        };
        wm.update_geometry()?;
        Ok(wm)
    }

    /// Adopt every pre-existing top-level window (spec.md §6 "Persisted
    /// state" / dwm's `scan`): transient windows are managed last so their
    /// owner is already known.
    pub fn scan(&mut self) -> Result<()> {
        let windows = self.conn.query_tree()?;
        let mut transients = Vec::new();
        for w in windows {
            if self.conn.get_window_attributes_override_redirect(w).unwrap_or(true) {
                continue;
            }
            if !self.conn.is_viewable_or_iconic(w).unwrap_or(false) {
                continue;
            }
            if self.conn.get_transient_for(w).ok().flatten().is_some() {
                transients.push(w);
                continue;
            }
            self.manage(w)?;
        }
        for w in transients {
            self.manage(w)?;
        }
        Ok(())
    }

    /// Block on events forever (spec.md §4.1's "C6"), until a `Quit` action
    /// flips `running` to false.
    pub fn run(&mut self) -> Result<()> {
        while self.running {
            let ev = self.conn.next_event()?;
            if let Err(e) = self.handle_event(ev) {
                warn!("error handling event: {e}");
            }
        }
        self.teardown()
    }

    /// Unmanage every surviving client and release global grabs (spec.md §5
    /// "Teardown").
    fn teardown(&mut self) -> Result<()> {
        let ids: Vec<Xid> = self.clients.keys().copied().collect();
        for id in ids {
            self.unmanage(id, false)?;
        }
        self.conn.ungrab_keys()?;
        Ok(())
    }

    // ---- dispatch -----------------------------------------------------

    fn handle_event(&mut self, ev: XEvent) -> Result<()> {
        match ev {
            XEvent::ButtonPress { window, subwindow, root_pt, event_pt, code, .. } => {
                self.on_button_press(window, subwindow, root_pt, event_pt, code)
            }
            XEvent::ClientMessage { window, type_atom, data } => self.on_client_message(window, type_atom, data),
            XEvent::ConfigureRequest { window, geom, value_mask } => {
                self.on_configure_request(window, geom, value_mask)
            }
            XEvent::ConfigureNotify { window, is_root, .. } => self.on_configure_notify(window, is_root),
            XEvent::DestroyNotify { window } => self.unmanage(window, true),
            XEvent::EnterNotify { window, mode_normal, detail_inferior, .. } => {
                self.on_enter_notify(window, mode_normal, detail_inferior)
            }
            XEvent::Expose { window, count } => self.on_expose(window, count),
            XEvent::FocusIn { window } => self.on_focus_in(window),
            XEvent::KeyPress { code, .. } => self.on_key_press(code.keysym, code.state),
            XEvent::MappingNotify => self.on_mapping_notify(),
            XEvent::MapRequest { window, override_redirect } => self.on_map_request(window, override_redirect),
            XEvent::MotionNotify { window, root_pt, .. } => self.on_motion_notify(window, root_pt),
            XEvent::PropertyNotify { window, atom_name, is_root } => {
                self.on_property_notify(window, atom_name, is_root)
            }
            XEvent::UnmapNotify { window, send_event } => self.on_unmap_notify(window, send_event),
            XEvent::ButtonRelease { .. } => Ok(()),
        }
    }

    fn on_map_request(&mut self, window: Xid, override_redirect: bool) -> Result<()> {
        if override_redirect || self.clients.contains_key(&window) {
            return Ok(());
        }
        self.manage(window)
    }

    fn on_unmap_notify(&mut self, window: Xid, send_event: bool) -> Result<()> {
        if !self.clients.contains_key(&window) {
            return Ok(());
        }
        if send_event {
            self.conn.set_wm_state_withdrawn(window)?;
            Ok(())
        } else {
            self.unmanage(window, false)
        }
    }

    fn on_configure_notify(&mut self, window: Xid, is_root: bool) -> Result<()> {
        if is_root && window == self.root {
            self.update_geometry()?;
            self.arrange(None)?;
        }
        Ok(())
    }

    fn on_configure_request(&mut self, window: Xid, geom: crate::event::Geom, value_mask: u16) -> Result<()> {
        let Some(c) = self.clients.get(&window).cloned() else {
            return self.conn.configure_passthrough(
                window,
                WireGeometry { x: geom.x, y: geom.y, w: geom.w, h: geom.h, bw: geom.bw },
                value_mask,
            );
        };

        let mon = self.monitors[c.monitor.0].clone();
        let floating = c.is_floating || !mon.active_layout().has_arrange();

        if floating {
            let mut nx = if value_mask & CW_X != 0 { geom.x } else { c.x };
            let mut ny = if value_mask & CW_Y != 0 { geom.y } else { c.y };
            let nw = if value_mask & CW_WIDTH != 0 { geom.w } else { c.w };
            let nh = if value_mask & CW_HEIGHT != 0 { geom.h } else { c.h };
            let nbw = if value_mask & CW_BORDER_WIDTH != 0 { geom.bw } else { c.bw };

            let total = mon.total;
            if nx + nw > total.right() {
                nx = total.x + (total.w - nw) / 2;
            }
            if ny + nh > total.bottom() {
                ny = total.y + (total.h - nh) / 2;
            }

            let pos_changed = nx != c.x || ny != c.y;
            let size_changed = nw != c.w || nh != c.h || nbw != c.bw;

            if let Some(cm) = self.clients.get_mut(&window) {
                cm.x = nx;
                cm.y = ny;
                cm.w = nw;
                cm.h = nh;
                cm.bw = nbw;
            }

            let new_geom = WireGeometry { x: nx, y: ny, w: nw, h: nh, bw: nbw };
            if pos_changed && !size_changed {
                self.conn.send_synthetic_configure_notify(window, new_geom)?;
            }
            if c.is_visible_on(mon.tagset.active()) {
                self.conn.configure(window, new_geom)?;
            }
        } else {
            if value_mask & CW_BORDER_WIDTH != 0 {
                if let Some(cm) = self.clients.get_mut(&window) {
                    cm.bw = geom.bw;
                }
                self.conn.configure_border_width(window, geom.bw)?;
            }
            let cur = &self.clients[&window];
            self.conn
                .send_synthetic_configure_notify(window, WireGeometry { x: cur.x, y: cur.y, w: cur.w, h: cur.h, bw: cur.bw })?;
        }
        Ok(())
    }

    fn on_client_message(&mut self, window: Xid, type_atom: Xid, data: [u32; 5]) -> Result<()> {
        let Some(name) = self.conn.atom_name_for(type_atom) else { return Ok(()) };
        match name {
            Atom::NetWmState => {
                let fs_atom = self.conn.atom_id(Atom::NetWmStateFullscreen);
                if data[1] == fs_atom || data[2] == fs_atom {
                    if let Some(c) = self.clients.get(&window) {
                        let want = match data[0] {
                            0 => false,
                            1 => true,
                            _ => !c.is_fullscreen,
                        };
                        self.set_fullscreen(window, want)?;
                    }
                }
            }
            Atom::NetActiveWindow => {
                if let Some(c) = self.clients.get(&window) {
                    let mon = c.monitor;
                    let is_sel = self.monitors[mon.0].sel == Some(window);
                    if !is_sel && !c.is_urgent {
                        self.clients.get_mut(&window).unwrap().is_urgent = true;
                        self.redraw_bar(mon)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn on_property_notify(&mut self, window: Xid, atom_name: String, is_root: bool) -> Result<()> {
        if is_root {
            if atom_name == "WM_NAME" {
                self.status = self.conn.get_root_name()?.unwrap_or_else(|| format!("rwm-{}", crate::VERSION));
                self.redraw_bars()?;
            }
            return Ok(());
        }
        if !self.clients.contains_key(&window) {
            return Ok(());
        }
        match atom_name.parse::<Atom>() {
            Ok(Atom::NetWmName) => self.refresh_title(window)?,
            Ok(Atom::NetWmWindowType) => {
                if self.conn.get_window_type(window)? == Some(Atom::NetWmWindowTypeDialog) {
                    if let Some(c) = self.clients.get_mut(&window) {
                        c.is_floating = true;
                    }
                    let mon = self.clients[&window].monitor;
                    self.arrange(Some(mon))?;
                }
            }
            _ => self.on_icccm_property(window, &atom_name)?,
        }
        Ok(())
    }

    fn on_icccm_property(&mut self, window: Xid, name: &str) -> Result<()> {
        match name {
            "WM_TRANSIENT_FOR" => {
                if !self.clients[&window].is_floating {
                    if let Some(t) = self.conn.get_transient_for(window)? {
                        if self.clients.contains_key(&t) {
                            self.clients.get_mut(&window).unwrap().is_floating = true;
                            let mon = self.clients[&window].monitor;
                            self.arrange(Some(mon))?;
                        }
                    }
                }
            }
            "WM_NORMAL_HINTS" => {
                let hints = self.conn.get_size_hints(window)?;
                self.clients.get_mut(&window).unwrap().hints = hints;
            }
            "WM_HINTS" => {
                if let Some(h) = self.conn.get_wm_hints(window)? {
                    let mon = self.clients[&window].monitor;
                    let c = self.clients.get_mut(&window).unwrap();
                    c.is_urgent = h.urgent;
                    c.never_focus = !h.accepts_input;
                    self.redraw_bar(mon)?;
                }
            }
            "WM_NAME" => self.refresh_title(window)?,
            _ => {}
        }
        Ok(())
    }

    fn refresh_title(&mut self, window: Xid) -> Result<()> {
        let title = self.conn.get_title(window)?.unwrap_or_else(|| BROKEN_TITLE.to_string());
        let Some(c) = self.clients.get_mut(&window) else { return Ok(()) };
        c.set_title(title);
        let mon = c.monitor;
        if self.monitors[mon.0].sel == Some(window) {
            self.redraw_bar(mon)?;
        }
        Ok(())
    }

    fn on_enter_notify(&mut self, window: Xid, mode_normal: bool, detail_inferior: bool) -> Result<()> {
        if (!mode_normal || detail_inferior) && window != self.root {
            return Ok(());
        }
        if self.clients.contains_key(&window) {
            self.focus(Some(window))?;
        }
        Ok(())
    }

    fn on_motion_notify(&mut self, window: Xid, root_pt: Point) -> Result<()> {
        if window != self.root {
            return Ok(());
        }
        let rect = Rect::new(root_pt.x, root_pt.y, 1, 1);
        let target = self.recttomon(rect);
        if target.0 != self.sel_mon {
            self.sel_mon = target.0;
            self.focus(None)?;
        }
        Ok(())
    }

    fn on_mapping_notify(&mut self) -> Result<()> {
        if self.conn.refresh_keyboard_mapping()? {
            self.conn.grab_keys(self.cfg.keys, self.conn.numlock_mask())?;
        }
        Ok(())
    }

    fn on_focus_in(&mut self, window: Xid) -> Result<()> {
        if let Some(sel) = self.monitors[self.sel_mon].sel {
            if window != sel {
                self.conn.set_input_focus(sel)?;
            }
        }
        Ok(())
    }

    fn on_expose(&mut self, window: Xid, count: u16) -> Result<()> {
        if count != 0 {
            return Ok(());
        }
        if let Some(m) = self.monitors.iter().position(|m| m.bar_window == Some(window)) {
            self.redraw_bar(MonitorId(m))?;
        }
        Ok(())
    }

    fn on_key_press(&mut self, keysym: u32, state: u16) -> Result<()> {
        let clean = crate::bindings::clean_mask(state, self.conn.numlock_mask());
        let action = self
            .cfg
            .keys
            .iter()
            .find(|k| k.keysym == keysym && k.modmask == clean)
            .map(|k| k.action);
        if let Some(action) = action {
            self.dispatch_action(action, None)?;
        }
        Ok(())
    }

    fn on_button_press(
        &mut self,
        window: Xid,
        subwindow: Xid,
        root_pt: Point,
        event_pt: Point,
        code: crate::event::ButtonCode,
    ) -> Result<()> {
        if let Some(m) = self.monitors.iter().position(|mon| mon.bar_window == Some(window)) {
            if m != self.sel_mon {
                self.sel_mon = m;
                self.focus(None)?;
            }
            let status = self.status.clone();
            let is_sel = m == self.sel_mon;
            let (region, bit) =
                crate::bar::classify_click(self.drawable.as_mut(), &self.cfg, &self.monitors[m], is_sel, &status, event_pt.x)?;
            let shift = crate::bindings::clean_mask(code.state, self.conn.numlock_mask()) & ModifierKey::Shift.mask() != 0;
            match region {
                ClickRegion::TagBar => match (code.button, shift) {
                    (1, false) => self.view(bit)?,
                    (1, true) => self.tag(bit)?,
                    (3, false) => self.toggle_view(bit)?,
                    (3, true) => self.toggle_tag(bit)?,
                    _ => {}
                },
                ClickRegion::LayoutSymbol if code.button == 1 => self.zoom()?,
                _ => {}
            }
            return Ok(());
        }

        let target = self.clients.values().find(|c| c.id == window || c.id == subwindow).map(|c| (c.id, c.monitor));
        if let Some((id, mon)) = target {
            self.focus(Some(id))?;
            self.restack(mon)?;
            self.conn.allow_replay_pointer()?;
            let clean = crate::bindings::clean_mask(code.state, self.conn.numlock_mask());
            let action = self
                .cfg
                .buttons
                .iter()
                .find(|b| b.region == ClickRegion::ClientArea && b.button.code() == code.button && b.modmask == clean)
                .map(|b| b.action);
            if let Some(action) = action {
                self.dispatch_action(action, Some((id, root_pt)))?;
            }
        }
        Ok(())
    }

    // ---- action dispatch ------------------------------------------------

    fn dispatch_action(&mut self, action: Action, ctx: Option<(Xid, Point)>) -> Result<()> {
        match action {
            Action::Spawn(argv) => spawn(argv),
            Action::ToggleBar => self.toggle_bar()?,
            Action::FocusStack(arg) => self.focus_stack(arg_i32(arg))?,
            Action::IncNMaster(arg) => self.inc_nmaster(arg_i32(arg))?,
            Action::SetMFact(arg) => self.set_mfact(arg_f32(arg))?,
            Action::Zoom => self.zoom()?,
            Action::View(arg) => self.view(arg_u32(arg))?,
            Action::KillClient => self.kill_client()?,
            Action::SetLayout(Arg::Layout(idx)) => self.set_layout(idx)?,
            Action::SetLayout(_) => {}
            Action::ToggleFloating => self.toggle_floating()?,
            Action::FocusMon(arg) => self.focus_mon(arg_i32(arg))?,
            Action::TagMon(arg) => self.tag_mon(arg_i32(arg))?,
            Action::Tag(arg) => self.tag(arg_u32(arg))?,
            Action::ToggleView(arg) => self.toggle_view(arg_u32(arg))?,
            Action::ToggleTag(arg) => self.toggle_tag(arg_u32(arg))?,
            Action::MoveMouse => {
                if let Some((id, pt)) = ctx {
                    self.move_mouse(id, pt)?;
                }
            }
            Action::ResizeMouse => {
                if let Some((id, _)) = ctx {
                    self.resize_mouse(id)?;
                }
            }
            Action::Quit => self.running = false,
        }
        Ok(())
    }

    // ---- manage / unmanage ----------------------------------------------

    fn apply_rules(&self, class: &str, instance: &str, title: &str) -> (u32, bool, Option<i32>) {
        match crate::config::match_rule(self.cfg.rules, class, instance, title) {
            Some(r) => {
                let mon = if r.monitor >= 0 { Some(r.monitor) } else { None };
                (r.tags, r.is_floating, mon)
            }
            None => (0, false, None),
        }
    }

    /// Adopt a single window (spec.md §4.1 "manage").
    pub fn manage(&mut self, win: Xid) -> Result<()> {
        if self.clients.contains_key(&win) {
            return Ok(());
        }

        let geom = self.conn.get_geometry(win)?;
        let hints = self.conn.get_size_hints(win)?;
        let transient_for = self.conn.get_transient_for(win)?;
        let class_hint = self.conn.get_class_hint(win)?;
        let title = self.conn.get_title(win)?.unwrap_or_else(|| BROKEN_TITLE.to_string());
        let wm_hints = self.conn.get_wm_hints(win)?;
        let protocols = self.conn.get_wm_protocols(win)?;
        let window_type = self.conn.get_window_type(win)?;

        let owner = transient_for.filter(|t| self.clients.contains_key(t));
        let (mon_id, tags, mut floating) = if let Some(t) = owner {
            let owner = &self.clients[&t];
            (owner.monitor, owner.tags, true)
        } else {
            let (rule_tags, rule_floating, rule_mon) = self.apply_rules(&class_hint.class, &class_hint.instance, &title);
            let idx = rule_mon
                .and_then(|num| self.monitors.iter().position(|m| m.num == num as usize))
                .unwrap_or(self.sel_mon);
            let mon_id = MonitorId(idx);
            let tags = if rule_tags != 0 {
                rule_tags & self.cfg.tag_mask()
            } else {
                self.monitors[idx].tagset.active()
            };
            (mon_id, tags, rule_floating)
        };

        let mut c = Client::new(win, mon_id, tags);
        c.class = class_hint.class;
        c.instance = class_hint.instance;
        c.set_title(title);
        c.hints = hints;
        c.bw = self.cfg.border_px;
        c.x = geom.x;
        c.y = geom.y;
        c.w = geom.w.max(1);
        c.h = geom.h.max(1);
        if let Some(h) = wm_hints {
            c.is_urgent = h.urgent;
            c.never_focus = !h.accepts_input;
        }
        c.supports_take_focus = protocols.take_focus;
        c.supports_delete_window = protocols.delete_window;
        if c.is_fixed() {
            floating = true;
        }
        if window_type == Some(Atom::NetWmWindowTypeDialog) {
            floating = true;
        }
        c.is_floating = floating;

        let total = self.monitors[mon_id.0].total;
        if c.x + c.w > total.right() {
            c.x = total.right() - c.w;
        }
        if c.y + c.h > total.bottom() {
            c.y = total.bottom() - c.h;
        }
        c.x = c.x.max(total.x);
        c.y = c.y.max(total.y);
        c.snapshot_geometry();

        self.conn.configure(win, WireGeometry { x: c.x, y: c.y, w: c.w, h: c.h, bw: c.bw })?;
        self.conn.set_border_width(win, c.bw)?;
        self.conn.set_border_color(win, self.cfg.colors.normal.border)?;
        self.conn.select_client_input(win)?;
        self.conn.grab_buttons(win, false, self.cfg.buttons, self.conn.numlock_mask())?;

        self.monitors[mon_id.0].attach(win);
        self.clients.insert(win, c);
        self.conn.append_client_list(win)?;
        self.conn.set_wm_state_normal(win)?;
        self.conn.map_window(win)?;

        if window_type == Some(Atom::NetWmStateFullscreen) {
            self.set_fullscreen(win, true)?;
        }

        self.arrange(Some(mon_id))?;
        self.focus(Some(win))?;
        info!("managed window {win:#x} on monitor {}", mon_id.0);
        Ok(())
    }

    /// Forget a client (spec.md §4.1 "unmanage"). `destroyed` skips the
    /// border-width/withdrawn-state restoration since the window is already
    /// gone server-side.
    pub fn unmanage(&mut self, id: Xid, destroyed: bool) -> Result<()> {
        let Some(c) = self.clients.remove(&id) else { return Ok(()) };
        let mon = c.monitor;
        self.monitors[mon.0].detach(id);
        if !destroyed {
            let _ = self.conn.set_border_width(id, c.old.bw);
            let _ = self.conn.set_wm_state_withdrawn(id);
        }
        self.sync_client_list()?;
        self.focus(None)?;
        self.arrange(Some(mon))?;
        Ok(())
    }

    fn sync_client_list(&self) -> Result<()> {
        let ids: Vec<Xid> = self.monitors.iter().flat_map(|m| m.clients.iter().copied()).collect();
        self.conn.set_client_list(&ids)
    }

    // ---- focus model (spec.md §4.4) -------------------------------------

    fn is_visible(&self, id: Xid) -> bool {
        self.clients
            .get(&id)
            .map(|c| c.is_visible_on(self.monitors[c.monitor.0].tagset.active()))
            .unwrap_or(false)
    }

    fn set_border(&self, id: Xid, selected: bool) -> Result<()> {
        let pixel = if selected { self.cfg.colors.selected.border } else { self.cfg.colors.normal.border };
        self.conn.set_border_color(id, pixel)
    }

    /// Focus `id` if given and visible; otherwise fall back to the
    /// most-recently-focused visible client on the selected monitor, or
    /// nothing (spec.md §4.4 "focus").
    pub fn focus(&mut self, id: Option<Xid>) -> Result<()> {
        let mon_idx = self.sel_mon;
        let chosen = match id {
            Some(id) if self.is_visible(id) => Some(id),
            _ => {
                let active = self.monitors[mon_idx].tagset.active();
                self.monitors[mon_idx]
                    .stack
                    .iter()
                    .copied()
                    .find(|&id| self.clients.get(&id).map(|c| c.is_visible_on(active)).unwrap_or(false))
            }
        };

        if let Some(prev) = self.monitors[mon_idx].sel {
            if Some(prev) != chosen {
                self.set_border(prev, false)?;
            }
        }

        match chosen {
            Some(cid) => {
                let c_mon = self.clients[&cid].monitor;
                if c_mon.0 != mon_idx {
                    self.sel_mon = c_mon.0;
                }
                self.monitors[c_mon.0].raise_in_stack(cid);
                self.monitors[c_mon.0].sel = Some(cid);
                if !self.clients[&cid].never_focus {
                    self.conn.set_input_focus(cid)?;
                }
                self.conn.set_active_window(Some(cid))?;
                if self.clients[&cid].supports_take_focus {
                    self.conn.send_wm_take_focus(cid)?;
                }
                self.set_border(cid, true)?;
            }
            None => {
                self.monitors[mon_idx].sel = None;
                self.conn.set_active_window(None)?;
                self.conn.revert_focus_to_root()?;
            }
        }
        self.redraw_bars()
    }

    fn focus_stack(&mut self, dir: i32) -> Result<()> {
        let mon = self.sel_mon;
        let Some(sel) = self.monitors[mon].sel else { return Ok(()) };
        let active = self.monitors[mon].tagset.active();
        let visible: Vec<Xid> = self.monitors[mon]
            .clients
            .iter()
            .copied()
            .filter(|id| self.clients.get(id).map(|c| c.is_visible_on(active)).unwrap_or(false))
            .collect();
        if visible.len() < 2 {
            return Ok(());
        }
        let i = visible.iter().position(|&id| id == sel).unwrap_or(0) as i32;
        let n = visible.len() as i32;
        let next = (((i + dir.signum()) % n) + n) % n;
        self.focus(Some(visible[next as usize]))
    }

    fn focus_mon(&mut self, dir: i32) -> Result<()> {
        if self.monitors.len() < 2 {
            return Ok(());
        }
        let n = self.monitors.len() as i32;
        let i = self.sel_mon as i32;
        let next = (((i + dir.signum()) % n) + n) % n;
        self.sel_mon = next as usize;
        self.focus(None)
    }

    fn tag_mon(&mut self, dir: i32) -> Result<()> {
        if self.monitors.len() < 2 {
            return Ok(());
        }
        let mon = self.sel_mon;
        let Some(sel) = self.monitors[mon].sel else { return Ok(()) };
        let n = self.monitors.len() as i32;
        let next = (((mon as i32 + dir.signum()) % n) + n) % n;
        let target = MonitorId(next as usize);
        self.monitors[mon].detach(sel);
        self.clients.get_mut(&sel).unwrap().monitor = target;
        self.monitors[target.0].attach(sel);
        self.sync_client_list()?;
        self.arrange(Some(MonitorId(mon)))?;
        self.arrange(Some(target))?;
        self.focus(None)
    }

    // ---- tag operations (spec.md §4.4) -----------------------------------

    pub fn view(&mut self, mask: u32) -> Result<()> {
        let mon = self.sel_mon;
        let before = self.monitors[mon].tagset;
        self.monitors[mon].tagset.view(mask & self.cfg.tag_mask());
        if self.monitors[mon].tagset != before {
            self.focus(None)?;
            self.arrange(Some(MonitorId(mon)))?;
        }
        Ok(())
    }

    pub fn toggle_view(&mut self, mask: u32) -> Result<()> {
        let mon = self.sel_mon;
        if self.monitors[mon].tagset.toggle_view(mask & self.cfg.tag_mask()) {
            self.focus(None)?;
            self.arrange(Some(MonitorId(mon)))?;
        }
        Ok(())
    }

    pub fn tag(&mut self, mask: u32) -> Result<()> {
        let mon = self.sel_mon;
        let Some(sel) = self.monitors[mon].sel else { return Ok(()) };
        let masked = mask & self.cfg.tag_mask();
        if masked == 0 {
            return Ok(());
        }
        self.clients.get_mut(&sel).unwrap().tags = masked;
        self.focus(None)?;
        self.arrange(Some(MonitorId(mon)))
    }

    pub fn toggle_tag(&mut self, mask: u32) -> Result<()> {
        let mon = self.sel_mon;
        let Some(sel) = self.monitors[mon].sel else { return Ok(()) };
        let masked = mask & self.cfg.tag_mask();
        let c = self.clients.get_mut(&sel).unwrap();
        let candidate = c.tags ^ masked;
        if candidate == 0 {
            return Ok(());
        }
        c.tags = candidate;
        self.focus(None)?;
        self.arrange(Some(MonitorId(mon)))
    }

    fn zoom(&mut self) -> Result<()> {
        let mon = self.sel_mon;
        let Some(sel) = self.monitors[mon].sel else { return Ok(()) };
        if self.clients[&sel].is_floating {
            return Ok(());
        }
        let list = self.monitors[mon].clients.clone();
        if list.first() == Some(&sel) {
            let active = self.monitors[mon].tagset.active();
            let next = list
                .iter()
                .skip(1)
                .copied()
                .find(|&id| self.clients.get(&id).map(|c| c.is_visible_on(active) && !c.is_floating).unwrap_or(false));
            match next {
                Some(next) => self.monitors[mon].raise_in_clients(next),
                None => return Ok(()),
            }
        } else {
            self.monitors[mon].raise_in_clients(sel);
        }
        self.arrange(Some(MonitorId(mon)))
    }

    fn set_mfact(&mut self, delta: f32) -> Result<()> {
        let mon = self.sel_mon;
        let next = self.monitors[mon].mfact + delta;
        if !(0.1..=0.9).contains(&next) {
            return Ok(());
        }
        self.monitors[mon].mfact = next;
        self.arrange(Some(MonitorId(mon)))
    }

    fn inc_nmaster(&mut self, delta: i32) -> Result<()> {
        let mon = self.sel_mon;
        let cur = self.monitors[mon].nmaster as i32;
        self.monitors[mon].nmaster = (cur + delta).max(0) as u32;
        self.arrange(Some(MonitorId(mon)))
    }

    fn set_layout(&mut self, idx: usize) -> Result<()> {
        let Some(&kind) = self.cfg.layouts.get(idx) else { return Ok(()) };
        let mon = self.sel_mon;
        let slot = self.monitors[mon].sel_layout;
        self.monitors[mon].layouts[slot] = kind;
        self.monitors[mon].layout_symbol = kind.symbol().to_string();
        self.arrange(Some(MonitorId(mon)))
    }

    fn toggle_floating(&mut self) -> Result<()> {
        let mon = self.sel_mon;
        let Some(sel) = self.monitors[mon].sel else { return Ok(()) };
        let c = self.clients.get_mut(&sel).unwrap();
        if c.is_fullscreen {
            return Ok(());
        }
        c.is_floating = !c.is_floating;
        self.arrange(Some(MonitorId(mon)))
    }

    fn kill_client(&mut self) -> Result<()> {
        let mon = self.sel_mon;
        let Some(sel) = self.monitors[mon].sel else { return Ok(()) };
        if self.clients[&sel].supports_delete_window {
            self.conn.send_wm_delete(sel)
        } else {
            self.conn.kill_client(sel)
        }
    }

    fn toggle_bar(&mut self) -> Result<()> {
        let mon = self.sel_mon;
        self.monitors[mon].show_bar = !self.monitors[mon].show_bar;
        self.update_bar_geom(mon)?;
        self.arrange(Some(MonitorId(mon)))
    }

    fn set_fullscreen(&mut self, id: Xid, fullscreen: bool) -> Result<()> {
        let Some(c) = self.clients.get(&id) else { return Ok(()) };
        if fullscreen == c.is_fullscreen {
            return Ok(());
        }
        let mon = c.monitor;
        if fullscreen {
            self.conn.set_fullscreen_state(id, true)?;
            let total = self.monitors[mon.0].total;
            let c = self.clients.get_mut(&id).unwrap();
            c.old_state = c.is_floating;
            c.snapshot_geometry();
            c.is_fullscreen = true;
            c.is_floating = true;
            c.x = total.x;
            c.y = total.y;
            c.w = total.w;
            c.h = total.h;
            c.bw = 0;
            self.conn.configure(id, WireGeometry { x: total.x, y: total.y, w: total.w, h: total.h, bw: 0 })?;
            self.conn.raise_window(id)
        } else {
            self.conn.set_fullscreen_state(id, false)?;
            let c = self.clients.get_mut(&id).unwrap();
            c.is_fullscreen = false;
            c.is_floating = c.old_state;
            c.restore_geometry();
            let (x, y, w, h, bw) = (c.x, c.y, c.w, c.h, c.bw);
            self.conn.configure(id, WireGeometry { x, y, w, h, bw })?;
            self.arrange(Some(mon))
        }
    }

    // ---- layout application (spec.md §4.3) -------------------------------

    pub fn arrange(&mut self, mon: Option<MonitorId>) -> Result<()> {
        match mon {
            Some(m) => self.arrange_one(m.0),
            None => {
                for i in 0..self.monitors.len() {
                    self.arrange_one(i)?;
                }
                Ok(())
            }
        }
    }

    fn arrange_one(&mut self, idx: usize) -> Result<()> {
        crate::layout::showhide(&self.monitors[idx], &mut self.clients);
        crate::layout::arrange(&mut self.monitors[idx], &mut self.clients);
        self.push_geometry(idx)?;
        self.restack(MonitorId(idx))
    }

    fn push_geometry(&self, idx: usize) -> Result<()> {
        for &id in &self.monitors[idx].clients {
            if let Some(c) = self.clients.get(&id) {
                self.conn.configure(id, WireGeometry { x: c.x, y: c.y, w: c.w, h: c.h, bw: c.bw })?;
            }
        }
        Ok(())
    }

    fn restack(&mut self, m: MonitorId) -> Result<()> {
        self.redraw_bar(m)?;

        let sel = self.monitors[m.0].sel;
        if let Some(sel) = sel {
            let floating = self.clients.get(&sel).map(|c| c.is_floating).unwrap_or(false);
            if floating || !self.monitors[m.0].active_layout().has_arrange() {
                self.conn.raise_window(sel)?;
            }
        }

        if self.monitors[m.0].active_layout().has_arrange() {
            if let Some(bar) = self.monitors[m.0].bar_window {
                let active = self.monitors[m.0].tagset.active();
                let stack = self.monitors[m.0].stack.clone();
                let mut prev = bar;
                for id in stack {
                    let tiled = self.clients.get(&id).map(|c| !c.is_floating && c.is_visible_on(active)).unwrap_or(false);
                    if tiled {
                        self.conn.stack_below(id, prev)?;
                        prev = id;
                    }
                }
            }
        }
        self.conn.flush()?;
        // Restacking windows generates stray EnterNotify events as the
        // pointer crosses client boundaries; drain and discard only those
        // (spec.md §4.3), re-dispatching anything else that was queued
        // (ButtonPress, ConfigureRequest, MapRequest, ...) instead of
        // dropping it on the floor.
        for ev in self.conn.poll_events()? {
            if !matches!(ev, XEvent::EnterNotify { .. }) {
                self.handle_event(ev)?;
            }
        }
        Ok(())
    }

    fn redraw_bar(&mut self, m: MonitorId) -> Result<()> {
        let Some(bar) = self.monitors[m.0].bar_window else { return Ok(()) };
        let is_sel = m.0 == self.sel_mon;
        let status = self.status.clone();
        crate::bar::render(self.drawable.as_mut(), bar, &self.cfg, &self.monitors[m.0], &self.clients, is_sel, &status)
    }

    fn redraw_bars(&mut self) -> Result<()> {
        for i in 0..self.monitors.len() {
            self.redraw_bar(MonitorId(i))?;
        }
        Ok(())
    }

    // ---- monitor enumeration (spec.md §4.5) ------------------------------

    /// Intersection-area winner, falling back to the selected monitor when
    /// nothing overlaps (spec.md §4.5 "recttomon").
    fn recttomon(&self, rect: Rect) -> MonitorId {
        let best = self
            .monitors
            .iter()
            .enumerate()
            .max_by_key(|(_, m)| rect.intersection_area(&m.total));
        match best {
            Some((i, m)) if rect.intersection_area(&m.total) > 0 => MonitorId(i),
            _ => MonitorId(self.sel_mon),
        }
    }

    /// Re-query Xinerama, dedupe by origin+size, grow/shrink the monitor
    /// arena to match, migrating orphaned clients to monitor 0 (spec.md
    /// §4.5 "updategeom").
    pub fn update_geometry(&mut self) -> Result<()> {
        let screens = match self.conn.query_screens() {
            Ok(s) if !s.is_empty() => s,
            _ => {
                let g = self.conn.get_geometry(self.root)?;
                vec![Rect::new(g.x, g.y, g.w, g.h)]
            }
        };
        let unique = dedupe_rects(screens);
        let target = unique.len().max(1);

        while self.monitors.len() < target {
            let num = self.monitors.len();
            let total = unique.get(num).copied().unwrap_or(unique[0]);
            let default_layouts = [
                self.cfg.layouts.first().copied().unwrap_or(crate::layout::LayoutKind::Tile),
                self.cfg.layouts.get(1).copied().unwrap_or(crate::layout::LayoutKind::Floating),
            ];
            let mut m = Monitor::new(num, total, total, self.cfg.tag_mask() & 1, default_layouts);
            m.mfact = self.cfg.mfact;
            m.nmaster = self.cfg.nmaster;
            m.show_bar = self.cfg.show_bar;
            m.top_bar = self.cfg.top_bar;
            self.monitors.push(m);
            self.update_bar_geom(num)?;
        }

        while self.monitors.len() > target {
            let retired = self.monitors.pop().unwrap();
            if let Some(bar) = retired.bar_window {
                let _ = self.conn.unmap_window(bar);
            }
            for id in retired.clients {
                if let Some(c) = self.clients.get_mut(&id) {
                    c.monitor = MonitorId(0);
                }
                self.monitors[0].attach(id);
            }
            if self.sel_mon >= self.monitors.len() {
                self.sel_mon = 0;
            }
        }

        for (i, total) in unique.iter().enumerate().take(self.monitors.len()) {
            self.monitors[i].total = *total;
            self.update_bar_geom(i)?;
            self.resync_fullscreen_geometry(i)?;
        }
        Ok(())
    }

    /// Keep a fullscreen client's geometry following its monitor across a
    /// resize (spec.md §8 boundary scenario 5). `tile`/`monocle` skip
    /// fullscreen clients entirely, so nothing else re-syncs them; `old`
    /// is left untouched for the later toggle-off.
    fn resync_fullscreen_geometry(&mut self, idx: usize) -> Result<()> {
        let total = self.monitors[idx].total;
        let ids: Vec<Xid> = self.monitors[idx].clients.clone();
        for id in ids {
            if let Some(c) = self.clients.get_mut(&id) {
                if c.is_fullscreen {
                    c.x = total.x;
                    c.y = total.y;
                    c.w = total.w;
                    c.h = total.h;
                    self.conn.configure(id, WireGeometry { x: total.x, y: total.y, w: total.w, h: total.h, bw: 0 })?;
                }
            }
        }
        Ok(())
    }

    fn update_bar_geom(&mut self, idx: usize) -> Result<()> {
        let bar_h = self.drawable.line_height();
        let total = self.monitors[idx].total;
        let top_bar = self.monitors[idx].top_bar;
        if self.monitors[idx].show_bar {
            let bar_y = if top_bar { total.y } else { total.y + total.h - bar_h };
            self.monitors[idx].usable = Rect::new(total.x, if top_bar { total.y + bar_h } else { total.y }, total.w, total.h - bar_h);
            self.monitors[idx].bar_y = bar_y;
        } else {
            self.monitors[idx].usable = total;
            self.monitors[idx].bar_y = -bar_h;
        }
        let geom = BarGeometry { x: total.x, y: self.monitors[idx].bar_y, w: total.w, h: bar_h };
        match self.monitors[idx].bar_window {
            Some(win) => {
                self.drawable.reposition_bar_window(win, geom)?;
                if self.monitors[idx].show_bar {
                    self.conn.map_window(win)?;
                } else {
                    self.conn.unmap_window(win)?;
                }
            }
            None => {
                let win = self.drawable.create_bar_window(self.root, geom, top_bar)?;
                self.monitors[idx].bar_window = Some(win);
                if !self.monitors[idx].show_bar {
                    self.conn.unmap_window(win)?;
                }
            }
        }
        Ok(())
    }

    /// Move a client that ended up on the wrong monitor (post drag) onto
    /// whichever monitor now contains most of its geometry.
    fn migrate_to_pointer_monitor(&mut self, id: Xid) -> Result<()> {
        let Some(c) = self.clients.get(&id) else { return Ok(()) };
        let rect = Rect::new(c.x, c.y, c.w, c.h);
        let target = self.recttomon(rect);
        let current = c.monitor;
        if target != current {
            self.monitors[current.0].detach(id);
            self.clients.get_mut(&id).unwrap().monitor = target;
            self.monitors[target.0].attach(id);
            self.sel_mon = target.0;
            self.sync_client_list()?;
            self.arrange(Some(current))?;
            self.arrange(Some(target))?;
            self.focus(Some(id))?;
        }
        Ok(())
    }

    // ---- interactive move/resize (spec.md §4.2, §5) ----------------------

    fn restack_for_drag(&mut self, id: Xid) -> Result<()> {
        self.focus(Some(id))?;
        let mon = self.clients[&id].monitor;
        self.restack(mon)
    }

    fn move_mouse(&mut self, id: Xid, start: Point) -> Result<()> {
        if self.clients.get(&id).map(|c| c.is_fullscreen).unwrap_or(true) {
            return Ok(());
        }
        self.restack_for_drag(id)?;
        self.conn.grab_pointer(self.cursor_move)?;

        let (ox, oy) = {
            let c = &self.clients[&id];
            (c.x, c.y)
        };
        let mut last_time = 0u32;

        loop {
            let ev = self.conn.next_event()?;
            match ev {
                XEvent::MotionNotify { root_pt, time, .. } => {
                    if last_time != 0 && time.wrapping_sub(last_time) <= MOTION_THROTTLE_MS {
                        continue;
                    }
                    last_time = time;

                    let dx = root_pt.x - start.x;
                    let dy = root_pt.y - start.y;
                    let mon = self.clients[&id].monitor;
                    let usable = self.monitors[mon.0].usable;
                    let snap = self.cfg.snap_px;
                    let (w, h, bw) = {
                        let c = &self.clients[&id];
                        (c.w, c.h, c.bw)
                    };

                    let mut nx = ox + dx;
                    let mut ny = oy + dy;
                    if (nx - usable.x).abs() < snap {
                        nx = usable.x;
                    } else if ((nx + w + 2 * bw) - usable.right()).abs() < snap {
                        nx = usable.right() - w - 2 * bw;
                    }
                    if (ny - usable.y).abs() < snap {
                        ny = usable.y;
                    } else if ((ny + h + 2 * bw) - usable.bottom()).abs() < snap {
                        ny = usable.bottom() - h - 2 * bw;
                    }

                    // Clamp so the drag can't push the window entirely off
                    // the monitor (spec.md §4.2 step 2).
                    let contained = crate::geometry::contain(crate::geometry::Geometry { x: nx, y: ny, w, h }, usable, bw);
                    nx = contained.x;
                    ny = contained.y;

                    let was_floating = self.clients[&id].is_floating;
                    if !was_floating && (dx.abs() > snap || dy.abs() > snap) {
                        self.clients.get_mut(&id).unwrap().is_floating = true;
                        self.arrange(Some(mon))?;
                    }
                    if self.clients[&id].is_floating {
                        let c = self.clients.get_mut(&id).unwrap();
                        c.x = nx;
                        c.y = ny;
                        self.conn.configure(id, WireGeometry { x: nx, y: ny, w, h, bw })?;
                    }
                }
                XEvent::ButtonRelease { .. } => break,
                other => self.handle_event(other)?,
            }
        }
        self.conn.ungrab_pointer()?;
        self.migrate_to_pointer_monitor(id)
    }

    fn resize_mouse(&mut self, id: Xid) -> Result<()> {
        if self.clients.get(&id).map(|c| c.is_fullscreen).unwrap_or(true) {
            return Ok(());
        }
        self.restack_for_drag(id)?;
        let mon = self.clients[&id].monitor;
        let (x, y, w, h, bw) = {
            let c = &self.clients[&id];
            (c.x, c.y, c.w, c.h, c.bw)
        };
        self.conn.warp_pointer(id, w + bw - 1, h + bw - 1)?;
        self.conn.grab_pointer(self.cursor_resize)?;

        let mut last_time = 0u32;
        loop {
            let ev = self.conn.next_event()?;
            match ev {
                XEvent::MotionNotify { root_pt, time, .. } => {
                    if last_time != 0 && time.wrapping_sub(last_time) <= MOTION_THROTTLE_MS {
                        continue;
                    }
                    last_time = time;

                    let nw = (root_pt.x - x - 2 * bw + 1).max(1);
                    let nh = (root_pt.y - y - 2 * bw + 1).max(1);
                    let hints = self.clients[&id].hints;
                    let respect =
                        self.clients[&id].is_floating || !self.monitors[mon.0].active_layout().has_arrange() || self.cfg.resize_hints;
                    let ctx = HintContext { hints, respect_hints: respect, bw };
                    let bar_h = self.monitors[mon.0].bar_height();
                    let g = apply_size_hints(Geometry { x, y, w: nw, h: nh }, &ctx, bar_h);

                    let was_floating = self.clients[&id].is_floating;
                    if !was_floating {
                        self.clients.get_mut(&id).unwrap().is_floating = true;
                        self.arrange(Some(mon))?;
                    }
                    let c = self.clients.get_mut(&id).unwrap();
                    c.w = g.w;
                    c.h = g.h;
                    self.conn.configure(id, WireGeometry { x, y, w: g.w, h: g.h, bw })?;
                }
                XEvent::ButtonRelease { .. } => break,
                other => self.handle_event(other)?,
            }
        }
        self.conn.ungrab_pointer()?;
        self.migrate_to_pointer_monitor(id)
    }
}

fn arg_i32(a: Arg) -> i32 {
    match a {
        Arg::Int(v) => v,
        _ => 0,
    }
}

fn arg_u32(a: Arg) -> u32 {
    match a {
        Arg::UInt(v) => v,
        _ => 0,
    }
}

fn arg_f32(a: Arg) -> f32 {
    match a {
        Arg::Float(v) => v,
        _ => 0.0,
    }
}

fn dedupe_rects(rects: Vec<Rect>) -> Vec<Rect> {
    let mut out: Vec<Rect> = Vec::new();
    for r in rects {
        if !out.contains(&r) {
            out.push(r);
        }
    }
    out
}

fn spawn(argv: &'static [&'static str]) -> Result<()> {
    if argv.is_empty() {
        return Ok(());
    }
    match std::process::Command::new(argv[0]).args(&argv[1..]).spawn() {
        Ok(_) => {}
        Err(e) => warn!("failed to spawn {argv:?}: {e}"),
    }
    Ok(())
}

/// Install a `SIGCHLD` handler that reaps every exited child non-blockingly
/// (spec.md §5 "Spawned children... reaped via a `SIGCHLD` handler calling
/// `waitpid` in a loop with `WNOHANG`").
fn install_sigchld_handler() -> Result<()> {
    use nix::sys::signal::{signal, SigHandler, Signal};
    unsafe {
        signal(Signal::SIGCHLD, SigHandler::Handler(reap_children))?;
    }
    Ok(())
}

extern "C" fn reap_children(_: i32) {
    use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
    use nix::unistd::Pid;
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            Ok(_) => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rule;

    #[test]
    fn dedupe_rects_drops_duplicate_origin_and_size() {
        let a = Rect::new(0, 0, 1920, 1080);
        let b = Rect::new(0, 0, 1920, 1080);
        let c = Rect::new(1920, 0, 1920, 1080);
        assert_eq!(dedupe_rects(vec![a, b, c]), vec![a, c]);
    }

    #[test]
    fn arg_helpers_default_on_mismatched_variant() {
        assert_eq!(arg_i32(Arg::Float(1.0)), 0);
        assert_eq!(arg_u32(Arg::None), 0);
        assert_eq!(arg_f32(Arg::Int(1)), 0.0);
    }

    #[test]
    fn matching_rule_reports_floating_and_unset_monitor() {
        let rs = [Rule { class: Some("Gimp"), instance: None, title: None, tags: 0, is_floating: true, monitor: -1 }];
        let r = crate::config::match_rule(&rs, "Gimp", "gimp", "").unwrap();
        assert!(r.is_floating);
        assert_eq!(r.monitor, -1);
    }
}
