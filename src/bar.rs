//! The per-monitor status/tag bar (spec.md §4.6, C7) and the font/drawing
//! seam it depends on (spec.md §4 expansion: the real font/drawing library
//! is out of scope; `Drawable` is the trait a richer implementation would
//! satisfy).
use tracing::warn;
use x11rb::connection::Connection as RawConnection;
use x11rb::protocol::xproto::{
    Char2b, ChangeGCAux, ConnectionExt as _, CreateGCAux, CreateWindowAux, Font, Gcontext,
    Rectangle, WindowClass,
};
use x11rb::rust_connection::RustConnection;

use crate::bindings::ClickRegion;
use crate::client::Client;
use crate::config::Config;
use crate::error::Result;
use crate::monitor::Monitor;
use crate::Xid;

/// Per-monitor bar geometry, independent of what is drawn in it. Computed
/// once per `arrange` call from the monitor's `usable`/`total` rects.
#[derive(Debug, Clone, Copy)]
pub struct BarGeometry {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// A fixed-width text/rectangle drawing surface.
///
/// The font/drawing library proper (glyph shaping, UTF-8 fallback chains,
/// anti-aliasing) is explicitly out of scope (spec.md §1); this trait is the
/// seam at which such a library would plug in. The codepoint-by-codepoint
/// font-fallback behavior spec.md §9 describes ("decode a UTF-8 string into
/// codepoints, for each codepoint find the first font in the fallback chain
/// that contains it, emit runs, append discovered fallback fonts to the
/// chain") is a contract a `Drawable` implementation must honor internally;
/// callers only ever see whole strings and a single reported pixel width.
/// [`CoreFontDrawable`] below renders via one fixed server-side font with no
/// fallback, which is sufficient for ASCII tag names and titles but does not
/// implement that contract — a real deployment would swap in a richer
/// implementation (Xft/cairo/pango) without changing `Bar`.
pub trait Drawable {
    /// Create the override-redirect bar window for one monitor.
    fn create_bar_window(&mut self, root: Xid, geom: BarGeometry, topbar: bool) -> Result<Xid>;

    /// Move/resize an existing bar window after a monitor geometry change
    /// (spec.md §4.5 "update monitor rectangles and bar positions").
    fn reposition_bar_window(&mut self, window: Xid, geom: BarGeometry) -> Result<()>;

    /// Height in pixels of one line of text, the bar's own height.
    fn line_height(&self) -> i32;

    /// Pixel width `text` would occupy if drawn.
    fn text_width(&mut self, text: &str) -> Result<i32>;

    fn clear(&mut self, window: Xid, w: i32, h: i32, bg: u32) -> Result<()>;
    fn fill_rect(&mut self, window: Xid, x: i32, y: i32, w: i32, h: i32, color: u32) -> Result<()>;
    fn outline_rect(&mut self, window: Xid, x: i32, y: i32, w: i32, h: i32, color: u32) -> Result<()>;

    /// Draw `text` left-aligned at `(x, y)` against `bg`, returning the
    /// pixel width consumed.
    fn text(&mut self, window: Xid, x: i32, y: i32, fg: u32, bg: u32, text: &str) -> Result<i32>;

    fn flush(&mut self) -> Result<()>;
}

/// A minimal core-protocol-only [`Drawable`]: one fixed server-side font
/// (`fixed`), `PolyFillRectangle`/`ImageText8` for drawing. Modeled directly
/// on the teacher's `X11rbDrawContext` (`src/x11rb/draw.rs`), reduced to the
/// single font case since Xft/cairo text shaping is out of scope here.
pub struct CoreFontDrawable {
    conn: RustConnection,
    gc: Gcontext,
    font: Font,
    ascent: i16,
    line_height: i32,
}

impl CoreFontDrawable {
    /// Opens its own connection to `$DISPLAY`, matching the teacher's
    /// `X11rbDraw::new()` (a bar surface is a second client of the same
    /// display, not a shared handle into the window manager's own
    /// connection).
    pub fn new(root: Xid, font_names: &[&str]) -> Result<Self> {
        let (conn, _) = x11rb::connect(None)?;
        let font = conn.generate_id()?;
        let name = font_names.first().copied().unwrap_or("fixed");
        // Core fonts don't take a point size; "fixed" is always present.
        if conn.open_font(font, name.as_bytes()).is_err() {
            warn!("falling back to the core 'fixed' font (requested {name:?})");
            conn.open_font(font, b"fixed")?;
        }
        let query = conn.query_font(font)?.reply()?;
        let ascent = query.font_ascent;
        let line_height = (query.font_ascent + query.font_descent) as i32 + 2;

        let gc = conn.generate_id()?;
        conn.create_gc(gc, root, &CreateGCAux::new().font(font))?;

        Ok(Self { conn, gc, font, ascent, line_height })
    }
}

impl Drawable for CoreFontDrawable {
    fn create_bar_window(&mut self, root: Xid, geom: BarGeometry, _topbar: bool) -> Result<Xid> {
        let id = self.conn.generate_id()?;
        let aux = CreateWindowAux::new().override_redirect(1);
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            id,
            root,
            geom.x as i16,
            geom.y as i16,
            geom.w as u16,
            geom.h as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &aux,
        )?;
        self.conn.map_window(id)?;
        Ok(id)
    }

    fn reposition_bar_window(&mut self, window: Xid, geom: BarGeometry) -> Result<()> {
        let aux = x11rb::protocol::xproto::ConfigureWindowAux::new()
            .x(geom.x)
            .y(geom.y)
            .width(geom.w as u32)
            .height(geom.h as u32);
        self.conn.configure_window(window, &aux)?;
        Ok(())
    }

    fn line_height(&self) -> i32 {
        self.line_height
    }

    fn text_width(&mut self, text: &str) -> Result<i32> {
        let chars: Vec<Char2b> = text.bytes().map(|b| Char2b { byte1: 0, byte2: b }).collect();
        let extents = self.conn.query_text_extents(self.font, &chars)?.reply()?;
        Ok(extents.overall_width as i32)
    }

    fn clear(&mut self, window: Xid, w: i32, h: i32, bg: u32) -> Result<()> {
        self.fill_rect(window, 0, 0, w, h, bg)
    }

    fn fill_rect(&mut self, window: Xid, x: i32, y: i32, w: i32, h: i32, color: u32) -> Result<()> {
        self.conn.change_gc(self.gc, &ChangeGCAux::new().foreground(color))?;
        let rect = Rectangle { x: x as i16, y: y as i16, width: w as u16, height: h as u16 };
        self.conn.poly_fill_rectangle(window, self.gc, &[rect])?;
        Ok(())
    }

    fn outline_rect(&mut self, window: Xid, x: i32, y: i32, w: i32, h: i32, color: u32) -> Result<()> {
        self.conn.change_gc(self.gc, &ChangeGCAux::new().foreground(color))?;
        let rect = Rectangle { x: x as i16, y: y as i16, width: w as u16, height: h as u16 };
        self.conn.poly_rectangle(window, self.gc, &[rect])?;
        Ok(())
    }

    fn text(&mut self, window: Xid, x: i32, y: i32, fg: u32, bg: u32, text: &str) -> Result<i32> {
        self.conn.change_gc(self.gc, &ChangeGCAux::new().foreground(fg).background(bg))?;
        self.conn
            .image_text8(window, self.gc, x as i16, y as i16 + self.ascent as i32, text.as_bytes())?;
        self.text_width(text)
    }

    fn flush(&mut self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}

/// One cell of the tag area, used by both rendering and click classification
/// so the two can never disagree about where a tag lives.
struct TagCell {
    bit: u32,
    x: i32,
    w: i32,
}

fn tag_cells(draw: &mut dyn Drawable, cfg: &Config, padding: i32) -> Result<Vec<TagCell>> {
    let mut x = 0;
    let mut cells = Vec::with_capacity(cfg.tags.len());
    for (i, name) in cfg.tags.iter().enumerate() {
        let w = draw.text_width(name)? + padding;
        cells.push(TagCell { bit: 1 << i, x, w });
        x += w;
    }
    Ok(cells)
}

/// Render one monitor's bar (spec.md §4.6): tags, layout symbol, title,
/// status text (status only on the selected monitor).
pub fn render(
    draw: &mut dyn Drawable,
    window: Xid,
    cfg: &Config,
    m: &Monitor,
    clients: &std::collections::HashMap<Xid, Client>,
    is_selected_monitor: bool,
    status: &str,
) -> Result<()> {
    let colors = &cfg.colors;
    let padding = draw.line_height();
    draw.clear(window, m.total.w, draw.line_height(), colors.normal.bg)?;

    let sel_tags = m.sel.and_then(|id| clients.get(&id)).map(|c| c.tags).unwrap_or(0);
    let urgent_tags: u32 = m
        .clients
        .iter()
        .filter_map(|id| clients.get(id))
        .filter(|c| c.is_urgent)
        .fold(0, |acc, c| acc | c.tags);
    let occupied_tags: u32 = m.clients.iter().filter_map(|id| clients.get(id)).fold(0, |acc, c| acc | c.tags);

    let cells = tag_cells(draw, cfg, padding)?;
    for cell in &cells {
        let active = m.tagset.active() & cell.bit != 0;
        let urgent = urgent_tags & cell.bit != 0;
        let scheme = if active ^ urgent { &colors.selected } else { &colors.normal };
        let name = cfg.tags[cell.bit.trailing_zeros() as usize];
        draw.text(window, cell.x, 0, scheme.fg, scheme.bg, name)?;
        if occupied_tags & cell.bit != 0 {
            let dot_w = 4;
            let dot_x = cell.x + 2;
            let dot_y = 2;
            if sel_tags & cell.bit != 0 {
                draw.fill_rect(window, dot_x, dot_y, dot_w, dot_w, scheme.fg)?;
            } else {
                draw.outline_rect(window, dot_x, dot_y, dot_w, dot_w, scheme.fg)?;
            }
        }
    }
    let mut x = cells.last().map(|c| c.x + c.w).unwrap_or(0);

    let layout_w = draw.text_width(&m.layout_symbol)? + padding;
    draw.text(window, x, 0, colors.normal.fg, colors.normal.bg, &m.layout_symbol)?;
    x += layout_w;

    let status_w = if is_selected_monitor { draw.text_width(status)? + padding } else { 0 };
    let title_area_end = m.total.w - status_w;

    if let Some(c) = m.sel.and_then(|id| clients.get(&id)) {
        let scheme = if c.is_urgent { &colors.selected } else { &colors.normal };
        draw.fill_rect(window, x, 0, (title_area_end - x).max(0), draw.line_height(), scheme.bg)?;
        draw.text(window, x, 0, scheme.fg, scheme.bg, &c.title)?;
    } else {
        draw.fill_rect(window, x, 0, (title_area_end - x).max(0), draw.line_height(), colors.normal.bg)?;
    }

    if is_selected_monitor {
        let status_x = m.total.w - status_w;
        draw.text(window, status_x, 0, colors.normal.fg, colors.normal.bg, status)?;
    }

    draw.flush()
}

/// Classify an X position on a bar window into a [`ClickRegion`] (spec.md
/// §4.1 "classify the click region"). Returns the tag bit alongside
/// [`ClickRegion::TagBar`] clicks so the caller's button table dispatch has
/// it without recomputing layout.
pub fn classify_click(
    draw: &mut dyn Drawable,
    cfg: &Config,
    m: &Monitor,
    is_selected_monitor: bool,
    status: &str,
    x: i32,
) -> Result<(ClickRegion, u32)> {
    let padding = draw.line_height();
    let cells = tag_cells(draw, cfg, padding)?;
    for cell in &cells {
        if x >= cell.x && x < cell.x + cell.w {
            return Ok((ClickRegion::TagBar, cell.bit));
        }
    }
    let after_tags = cells.last().map(|c| c.x + c.w).unwrap_or(0);
    let layout_w = draw.text_width(&m.layout_symbol)? + padding;
    if x < after_tags + layout_w {
        return Ok((ClickRegion::LayoutSymbol, 0));
    }
    if is_selected_monitor {
        let status_w = draw.text_width(status)? + padding;
        if x >= m.total.w - status_w {
            return Ok((ClickRegion::StatusText, 0));
        }
    }
    Ok((ClickRegion::WindowTitle, 0))
}
