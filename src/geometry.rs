//! Rectangles, monitor-overlap scoring and ICCCM size-hint enforcement.
//!
//! Coordinates are signed: a hidden client is parked at a negative `x`
//! (see [`crate::layout::showhide`]), so unlike a purely virtual-desktop
//! layout engine we cannot assume everything lives in the positive quadrant.

/// An axis-aligned rectangle in root-window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// Area of the intersection between `self` and `other`, clamped to zero
    /// when they do not overlap. Used by [`crate::monitor::recttomon`].
    pub fn intersection_area(&self, other: &Rect) -> i64 {
        let ix = self.x.max(other.x);
        let iy = self.y.max(other.y);
        let iright = self.right().min(other.right());
        let ibottom = self.bottom().min(other.bottom());
        let w = (iright - ix).max(0) as i64;
        let h = (ibottom - iy).max(0) as i64;
        w * h
    }
}

/// ICCCM `WM_NORMAL_HINTS`-derived sizing constraints for a single client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeHints {
    pub base_w: i32,
    pub base_h: i32,
    pub inc_w: i32,
    pub inc_h: i32,
    pub min_w: i32,
    pub min_h: i32,
    pub max_w: i32,
    pub max_h: i32,
    pub min_aspect: f64,
    pub max_aspect: f64,
}

impl Default for SizeHints {
    fn default() -> Self {
        Self {
            base_w: 0,
            base_h: 0,
            inc_w: 0,
            inc_h: 0,
            min_w: 0,
            min_h: 0,
            max_w: 0,
            max_h: 0,
            min_aspect: 0.0,
            max_aspect: 0.0,
        }
    }
}

impl SizeHints {
    /// True iff the hints pin the client to exactly one size (spec.md §3:
    /// `isfixed` is derived from `maxw == minw > 0 && maxh == minh > 0`).
    pub fn is_fixed(&self) -> bool {
        self.max_w == self.min_w && self.max_h == self.min_h && self.min_w > 0 && self.min_h > 0
    }
}

/// Inputs to [`apply_size_hints`] that don't belong on `SizeHints` itself.
#[derive(Debug, Clone, Copy)]
pub struct HintContext {
    pub hints: SizeHints,
    /// Apply ICCCM 4.1.2.3 (aspect/increment/min/max). Mirrors dwm's
    /// `(c->isfloating || !lt[sellt]->arrange || resizehints)` gate.
    pub respect_hints: bool,
    pub bw: i32,
}

/// Proposed geometry for a client, pre-containment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Clamp `r` so it isn't pushed entirely off `bounds` (spec.md §4.2 step 2).
pub fn contain(mut g: Geometry, bounds: Rect, bw: i32) -> Geometry {
    if g.x > bounds.right() {
        g.x = bounds.right() - g.w - 2 * bw;
    }
    if g.y > bounds.bottom() {
        g.y = bounds.bottom() - g.h - 2 * bw;
    }
    if g.x + g.w + 2 * bw < bounds.x {
        g.x = bounds.x;
    }
    if g.y + g.h + 2 * bw < bounds.y {
        g.y = bounds.y;
    }
    g
}

/// Apply ICCCM 4.1.2.3 size-hint enforcement (spec.md §4.2).
///
/// `bar_h` is the lower bound subtracted in step 3 ("lower bound both
/// dimensions by the bar height"). Returns the adjusted geometry; the
/// caller compares against the client's stored geometry to decide whether
/// an X `ConfigureWindow` is actually needed (applying this function twice
/// to the same input is a fixed point, matching spec.md §8's law).
pub fn apply_size_hints(mut g: Geometry, ctx: &HintContext, bar_h: i32) -> Geometry {
    g.w = g.w.max(1);
    g.h = g.h.max(1);
    g.w = g.w.max(bar_h);
    g.h = g.h.max(bar_h);

    if !ctx.respect_hints {
        return g;
    }

    let h = &ctx.hints;
    let base_is_min = h.base_w == h.min_w && h.base_h == h.min_h;

    let mut w = g.w;
    let mut ht = g.h;

    if !base_is_min {
        w -= h.base_w;
        ht -= h.base_h;
    }

    if h.min_aspect > 0.0 || h.max_aspect > 0.0 {
        let fw = w as f64;
        let fh = ht as f64;
        if h.max_aspect > 0.0 && h.max_aspect < fw / fh {
            w = (fh * h.max_aspect + 0.5) as i32;
        } else if h.min_aspect > 0.0 && h.min_aspect < fh / fw {
            ht = (w as f64 * h.min_aspect + 0.5) as i32;
        }
    }

    w -= h.base_w;
    ht -= h.base_h;

    if h.inc_w > 0 {
        w -= w % h.inc_w;
    }
    if h.inc_h > 0 {
        ht -= ht % h.inc_h;
    }

    w += h.base_w;
    ht += h.base_h;

    w = w.max(h.min_w);
    ht = ht.max(h.min_h);
    if h.max_w > 0 {
        w = w.min(h.max_w);
    }
    if h.max_h > 0 {
        ht = ht.min(h.max_h);
    }

    g.w = w.max(1);
    g.h = ht.max(1);
    g
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_area_of_disjoint_rects_is_zero() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(200, 200, 100, 100);
        assert_eq!(a.intersection_area(&b), 0);
    }

    #[test]
    fn intersection_area_overlap() {
        let a = Rect::new(0, 0, 1920, 1080);
        let b = Rect::new(1920, 0, 1920, 1080);
        assert_eq!(a.intersection_area(&b), 0);
        let c = Rect::new(1000, 0, 1920, 1080);
        assert_eq!(a.intersection_area(&c), 920 * 1080);
    }

    // spec.md §8 boundary scenario 2: incw=80, inch=16, base=0,0, min=80,16
    #[test]
    fn increment_hints_resize_to_nearest_multiple() {
        let ctx = HintContext {
            hints: SizeHints {
                base_w: 0,
                base_h: 0,
                inc_w: 80,
                inc_h: 16,
                min_w: 80,
                min_h: 16,
                max_w: 0,
                max_h: 0,
                min_aspect: 0.0,
                max_aspect: 0.0,
            },
            respect_hints: true,
            bw: 0,
        };
        let g = apply_size_hints(
            Geometry {
                x: 0,
                y: 0,
                w: 837,
                h: 409,
            },
            &ctx,
            0,
        );
        assert_eq!((g.w, g.h), (800, 400));
    }

    #[test]
    fn size_hint_application_is_a_fixed_point() {
        let ctx = HintContext {
            hints: SizeHints {
                base_w: 10,
                base_h: 10,
                inc_w: 7,
                inc_h: 11,
                min_w: 20,
                min_h: 20,
                max_w: 2000,
                max_h: 2000,
                min_aspect: 0.0,
                max_aspect: 0.0,
            },
            respect_hints: true,
            bw: 1,
        };
        let g0 = Geometry {
            x: 0,
            y: 0,
            w: 613,
            h: 241,
        };
        let once = apply_size_hints(g0, &ctx, 0);
        let twice = apply_size_hints(once, &ctx, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn contain_pulls_a_window_dragged_past_the_right_edge_back_into_bounds() {
        let bounds = Rect::new(0, 0, 1920, 1080);
        let g = Geometry { x: 2000, y: 100, w: 400, h: 300 };
        let contained = contain(g, bounds, 0);
        assert_eq!(contained.x, bounds.right() - g.w);
        assert_eq!(contained.y, 100);
    }

    #[test]
    fn contain_pulls_a_window_dragged_past_the_left_edge_back_into_bounds() {
        let bounds = Rect::new(0, 0, 1920, 1080);
        let g = Geometry { x: -500, y: -500, w: 400, h: 300 };
        let contained = contain(g, bounds, 0);
        assert_eq!(contained.x, bounds.x);
        assert_eq!(contained.y, bounds.y);
    }

    #[test]
    fn contain_is_a_no_op_for_geometry_already_inside_bounds() {
        let bounds = Rect::new(0, 0, 1920, 1080);
        let g = Geometry { x: 100, y: 100, w: 400, h: 300 };
        assert_eq!(contain(g, bounds, 0), g);
    }

    #[test]
    fn is_fixed_requires_both_axes_pinned_and_positive() {
        let mut h = SizeHints::default();
        assert!(!h.is_fixed());
        h.min_w = 100;
        h.max_w = 100;
        h.min_h = 50;
        h.max_h = 50;
        assert!(h.is_fixed());
        h.min_w = 0;
        h.max_w = 0;
        assert!(!h.is_fixed());
    }
}

#[cfg(test)]
mod quickcheck_tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    // spec.md §8 "applying size-hint enforcement twice is a fixed point",
    // generalized over arbitrary increment hints and proposed dimensions
    // (base/min pinned to zero so every width/height is reachable).
    #[quickcheck]
    fn increment_only_hints_are_a_fixed_point(inc_w: u8, inc_h: u8, w: u16, h: u16) -> bool {
        let ctx = HintContext {
            hints: SizeHints {
                base_w: 0,
                base_h: 0,
                inc_w: inc_w as i32,
                inc_h: inc_h as i32,
                min_w: 0,
                min_h: 0,
                max_w: 0,
                max_h: 0,
                min_aspect: 0.0,
                max_aspect: 0.0,
            },
            respect_hints: true,
            bw: 0,
        };
        let g0 = Geometry { x: 0, y: 0, w: w as i32, h: h as i32 };
        let once = apply_size_hints(g0, &ctx, 0);
        let twice = apply_size_hints(once, &ctx, 0);
        once == twice
    }
}
