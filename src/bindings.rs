//! Key/mouse binding tables and the modifier-mask cleaning used to match
//! them against incoming events (spec.md §4.1 "KeyPress"/"ButtonPress").
use strum::EnumIter;

/// The seven "real" modifiers a grabbed key/button combination is matched
/// against once NumLock and CapsLock have been masked out (spec.md §4.1:
/// "Modifier cleaning removes NumLock and CapsLock bits and masks to the
/// seven real modifiers").
pub const CLEAN_MASK: u16 = 0x00FF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ModifierKey {
    Shift,
    Lock,
    Ctrl,
    Alt,
    Mod2,
    Mod3,
    Super,
    Mod5,
}

impl ModifierKey {
    pub const fn mask(self) -> u16 {
        match self {
            ModifierKey::Shift => 1 << 0,
            ModifierKey::Lock => 1 << 1,
            ModifierKey::Ctrl => 1 << 2,
            ModifierKey::Alt => 1 << 3,
            ModifierKey::Mod2 => 1 << 4,
            ModifierKey::Mod3 => 1 << 5,
            ModifierKey::Super => 1 << 6,
            ModifierKey::Mod5 => 1 << 7,
        }
    }
}

/// Remove NumLock (runtime-detected, see [`crate::x::backend::numlock_mask`])
/// and CapsLock from `mask`, then mask to [`CLEAN_MASK`].
pub fn clean_mask(mask: u16, numlock_mask: u16) -> u16 {
    (mask & !(numlock_mask | ModifierKey::Lock.mask())) & CLEAN_MASK
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    ScrollUp,
    ScrollDown,
    Other(u8),
}

impl MouseButton {
    pub fn code(self) -> u8 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
            MouseButton::ScrollUp => 4,
            MouseButton::ScrollDown => 5,
            MouseButton::Other(b) => b,
        }
    }
}

/// An argument carried by an [`Action`]; the closest analogue of dwm's
/// `union Arg`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg {
    Int(i32),
    UInt(u32),
    Float(f32),
    Layout(usize),
    None,
}

/// A compile-time-configured command bound to a key or button combination.
/// Actions that launch external processes (`Spawn`) carry a `&'static`
/// argv, matching spec.md §6's "dmenu/terminal command templates" being
/// build-time data, not a runtime shell.
#[derive(Debug, Clone, Copy)]
pub enum Action {
    Spawn(&'static [&'static str]),
    ToggleBar,
    FocusStack(Arg),
    IncNMaster(Arg),
    SetMFact(Arg),
    Zoom,
    View(Arg),
    KillClient,
    SetLayout(Arg),
    ToggleFloating,
    FocusMon(Arg),
    TagMon(Arg),
    Tag(Arg),
    ToggleView(Arg),
    ToggleTag(Arg),
    MoveMouse,
    ResizeMouse,
    Quit,
}

/// A grabbed key combination: a keysym (resolved to a keycode at grab time,
/// spec.md §9's `XkbKeycodeToKeysym`-equivalent group-0/index-0 lookup) and
/// the clean modifier mask required to hold it down.
#[derive(Debug, Clone, Copy)]
pub struct KeyBinding {
    pub modmask: u16,
    pub keysym: u32,
    pub action: Action,
}

#[derive(Debug, Clone, Copy)]
pub struct ButtonBinding {
    pub modmask: u16,
    pub button: MouseButton,
    pub action: Action,
    /// Which bar/client region this binding applies to (spec.md §4.1
    /// "classify the click region").
    pub region: ClickRegion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickRegion {
    TagBar,
    LayoutSymbol,
    StatusText,
    WindowTitle,
    ClientArea,
    Root,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_mask_drops_lock_and_numlock_and_masks_to_seven_modifiers() {
        let numlock = ModifierKey::Mod2.mask();
        let raw = ModifierKey::Alt.mask() | ModifierKey::Lock.mask() | numlock | 0x2000;
        assert_eq!(clean_mask(raw, numlock), ModifierKey::Alt.mask());
    }
}
