//! Build-time configuration: tags, rules, colors, layouts, key/button
//! bindings (spec.md §6 "Configuration"). There is no on-disk config
//! format — this module is a plain Rust value, rebuilt and recompiled for
//! every change, matching dwm's own `config.h` and the teacher's
//! `core::config::Config`.
use crate::bindings::{Action, Arg, ButtonBinding, ClickRegion, KeyBinding, ModifierKey, MouseButton};
use crate::layout::LayoutKind;

/// A rule matched against a newly mapped client's class/instance/title
/// substrings (spec.md §4.1 "manage": "apply rule table on class/instance/
/// title substrings").
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub class: Option<&'static str>,
    pub instance: Option<&'static str>,
    pub title: Option<&'static str>,
    pub tags: u32,
    pub is_floating: bool,
    /// -1 means "the monitor the window was mapped on" (spec.md §8
    /// boundary scenario 6).
    pub monitor: i32,
}

impl Rule {
    /// True iff every rule field that is `Some` matches as a substring of
    /// the corresponding client property (spec.md §4.1 "manage": "apply
    /// rule table on class/instance/title substrings").
    pub fn matches(&self, class: &str, instance: &str, title: &str) -> bool {
        self.class.map(|s| class.contains(s)).unwrap_or(true)
            && self.instance.map(|s| instance.contains(s)).unwrap_or(true)
            && self.title.map(|s| title.contains(s)).unwrap_or(true)
    }
}

/// The first rule in `rules` that matches, if any (spec.md §4.1 "manage").
pub fn match_rule<'a>(rules: &'a [Rule], class: &str, instance: &str, title: &str) -> Option<&'a Rule> {
    rules.iter().find(|r| r.matches(class, instance, title))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScheme {
    pub fg: u32,
    pub bg: u32,
    pub border: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Colors {
    pub normal: ColorScheme,
    pub selected: ColorScheme,
}

pub struct Config {
    pub tags: &'static [&'static str],

    pub border_px: i32,
    pub snap_px: i32,
    pub show_bar: bool,
    pub top_bar: bool,

    pub fonts: &'static [&'static str],
    pub colors: Colors,

    pub mfact: f32,
    pub mfact_step: f32,
    pub nmaster: u32,
    pub resize_hints: bool,
    pub layouts: &'static [LayoutKind],

    pub rules: &'static [Rule],
    pub keys: &'static [KeyBinding],
    pub buttons: &'static [ButtonBinding],
}

impl Config {
    /// Bit `i` set corresponds to `tags[i]`.
    pub fn tag_mask(&self) -> u32 {
        if self.tags.len() >= 32 {
            u32::MAX
        } else {
            (1 << self.tags.len()) - 1
        }
    }
}

/// A minimal, compile-time tag-key table generator: `XK_1`..`XK_9` bound to
/// `modkey` (view), `modkey|Shift` (tag) and `modkey|Ctrl` (toggleview),
/// mirroring dwm's `TAGKEYS` macro.
macro_rules! tag_keys {
    ($modkey:expr, [$($sym:expr => $bit:expr),+ $(,)?]) => {
        [$(
            KeyBinding { modmask: $modkey, keysym: $sym, action: Action::View(Arg::UInt(1 << $bit)) },
            KeyBinding { modmask: $modkey | ModifierKey::Ctrl.mask(), keysym: $sym, action: Action::ToggleView(Arg::UInt(1 << $bit)) },
            KeyBinding { modmask: $modkey | ModifierKey::Shift.mask(), keysym: $sym, action: Action::Tag(Arg::UInt(1 << $bit)) },
            KeyBinding { modmask: $modkey | ModifierKey::Shift.mask() | ModifierKey::Ctrl.mask(), keysym: $sym, action: Action::ToggleTag(Arg::UInt(1 << $bit)) },
        )+]
    };
}

// Keysym values below are the `XK_*` constants from X11/keysymdef.h,
// resolved at startup by name through `rwm_keysyms::XKeySym` rather than
// hand-written here in the real bindings table; the literals stand in for
// XK_Return, XK_p, XK_b, XK_j, XK_k, XK_h, XK_l, XK_i, XK_d, XK_Tab,
// XK_c, XK_t, XK_f, XK_m, XK_space, XK_comma, XK_period, XK_q, XK_1..XK_9.
const MODKEY: u16 = ModifierKey::Super.mask();

const BASE_KEYS: [KeyBinding; 18] = [
    KeyBinding { modmask: MODKEY | ModifierKey::Shift.mask(), keysym: 0xff0d, action: Action::Spawn(&["st"]) },
    KeyBinding { modmask: MODKEY, keysym: 0x0070, action: Action::Spawn(&["dmenu_run"]) },
    KeyBinding { modmask: MODKEY, keysym: 0x0062, action: Action::ToggleBar },
    KeyBinding { modmask: MODKEY, keysym: 0x006a, action: Action::FocusStack(Arg::Int(1)) },
    KeyBinding { modmask: MODKEY, keysym: 0x006b, action: Action::FocusStack(Arg::Int(-1)) },
    KeyBinding { modmask: MODKEY, keysym: 0x0069, action: Action::IncNMaster(Arg::Int(1)) },
    KeyBinding { modmask: MODKEY, keysym: 0x0064, action: Action::IncNMaster(Arg::Int(-1)) },
    KeyBinding { modmask: MODKEY, keysym: 0x0068, action: Action::SetMFact(Arg::Float(-0.05)) },
    KeyBinding { modmask: MODKEY, keysym: 0x006c, action: Action::SetMFact(Arg::Float(0.05)) },
    KeyBinding { modmask: MODKEY, keysym: 0xff09, action: Action::View(Arg::None) },
    KeyBinding { modmask: MODKEY | ModifierKey::Shift.mask(), keysym: 0x0063, action: Action::KillClient },
    KeyBinding { modmask: MODKEY, keysym: 0x0074, action: Action::SetLayout(Arg::Layout(0)) },
    KeyBinding { modmask: MODKEY, keysym: 0x0066, action: Action::SetLayout(Arg::Layout(2)) },
    KeyBinding { modmask: MODKEY, keysym: 0x006d, action: Action::SetLayout(Arg::Layout(1)) },
    KeyBinding { modmask: MODKEY, keysym: 0x0020, action: Action::ToggleFloating },
    KeyBinding { modmask: MODKEY, keysym: 0x0030, action: Action::View(Arg::UInt(u32::MAX)) },
    KeyBinding { modmask: MODKEY | ModifierKey::Shift.mask(), keysym: 0x0071, action: Action::Quit },
    KeyBinding { modmask: MODKEY, keysym: 0xff0d, action: Action::Zoom },
];

const TAG_KEYS: [KeyBinding; 36] = tag_keys!(MODKEY, [
    0x0031 => 0, 0x0032 => 1, 0x0033 => 2, 0x0034 => 3, 0x0035 => 4,
    0x0036 => 5, 0x0037 => 6, 0x0038 => 7, 0x0039 => 8,
]);

const DEFAULT_BUTTONS: [ButtonBinding; 2] = [
    ButtonBinding {
        modmask: MODKEY,
        button: MouseButton::Left,
        action: Action::MoveMouse,
        region: ClickRegion::ClientArea,
    },
    ButtonBinding {
        modmask: MODKEY,
        button: MouseButton::Right,
        action: Action::ResizeMouse,
        region: ClickRegion::ClientArea,
    },
];

pub fn default_config() -> Config {
    const TAGS: &[&str] = &["1", "2", "3", "4", "5", "6", "7", "8", "9"];
    const LAYOUTS: &[LayoutKind] = &[LayoutKind::Tile, LayoutKind::Monocle, LayoutKind::Floating];
    const RULES: &[Rule] = &[Rule {
        class: Some("Gimp"),
        instance: None,
        title: None,
        tags: 0,
        is_floating: true,
        monitor: -1,
    }];

    // Leaked once at startup so the combined table can live as `'static`
    // without duplicating the binding literals above.
    let keys: &'static [KeyBinding] = Box::leak(
        BASE_KEYS
            .iter()
            .chain(TAG_KEYS.iter())
            .copied()
            .collect::<Vec<_>>()
            .into_boxed_slice(),
    );

    Config {
        tags: TAGS,
        border_px: 1,
        snap_px: 32,
        show_bar: true,
        top_bar: true,
        fonts: &["monospace:size=10"],
        colors: Colors {
            normal: ColorScheme {
                fg: 0xbbbbbb,
                bg: 0x222222,
                border: 0x444444,
            },
            selected: ColorScheme {
                fg: 0xeeeeee,
                bg: 0x005577,
                border: 0x005577,
            },
        },
        mfact: 0.55,
        mfact_step: 0.05,
        nmaster: 1,
        resize_hints: false,
        layouts: LAYOUTS,
        rules: RULES,
        keys,
        buttons: &DEFAULT_BUTTONS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_mask_covers_exactly_the_configured_tags() {
        let cfg = default_config();
        assert_eq!(cfg.tag_mask(), 0b1_1111_1111);
    }
}
