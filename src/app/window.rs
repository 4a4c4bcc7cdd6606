//! Windows (field groups)
//!
//! Four independently configured display groups live in a fixed ring.
//! Each one carries its persisted settings plus the scroll positions and
//! layout results that are rebuilt at every recalibration.

use crate::constants::{FLD_OFFSET, FLD_ON, GROUPSMAX, WINNAME_MAX};
use crate::system::snapshot::ProcessRecord;
use crate::system::users::{UserFilter, UserMatch};

use super::fields::{FieldId, FIELD_COUNT};
use super::forest::Placement;

// ============================================================================
// Flags
// ============================================================================

/// Summary shows one aggregate cpu line
pub const VIEW_CPUSUM: u32 = 0x8000;
/// Summary shows the load line
pub const VIEW_LOADAV: u32 = 0x4000;
/// Summary shows task and cpu states
pub const VIEW_STATES: u32 = 0x2000;
/// Summary shows memory lines
pub const VIEW_MEMORY: u32 = 0x1000;
/// Bold is disabled everywhere
pub const VIEW_NOBOLD: u32 = 0x0008;
/// Message row shows scroll coordinates
pub const VIEW_SCROLL: u32 = 0x80000;
/// Colors instead of monochrome
pub const SHOW_COLORS: u32 = 0x0800;
/// Highlights use bold instead of reverse
pub const SHOW_HIBOLD: u32 = 0x0400;
/// Sort column is highlighted
pub const SHOW_HICOLS: u32 = 0x0200;
/// Running tasks are highlighted
pub const SHOW_HIROWS: u32 = 0x0100;
/// COMMAND shows the full command line
pub const SHOW_CMDLIN: u32 = 0x0080;
/// TIME includes reaped children
pub const SHOW_CTIMES: u32 = 0x0040;
/// Idle tasks are listed
pub const SHOW_IDLEPS: u32 = 0x0020;
/// Task area is visible (alternate mode)
pub const SHOW_TASKON: u32 = 0x0010;
/// Forest view
pub const SHOW_FOREST: u32 = 0x0002;
/// Largest values sort first
pub const QSRT_NORMAL: u32 = 0x0004;
/// Pseudo flag asking to rebalance every window
pub const EQUWINS: u32 = 0x0001;

/// Flags every default window starts with
pub const DEF_WINFLGS: u32 = VIEW_LOADAV
    | VIEW_STATES
    | VIEW_CPUSUM
    | VIEW_MEMORY
    | SHOW_HIBOLD
    | SHOW_HIROWS
    | SHOW_IDLEPS
    | SHOW_TASKON
    | QSRT_NORMAL;

// ============================================================================
// Field Selection Bytes
// ============================================================================

/// Field encoded in a selection byte, if valid
pub fn field_of(byte: u8) -> Option<FieldId> {
    (byte & !FLD_ON)
        .checked_sub(FLD_OFFSET)
        .and_then(|idx| FieldId::from_index(idx as usize))
}

/// True if a selection byte marks its field as displayed
pub fn field_is_on(byte: u8) -> bool {
    byte & FLD_ON != 0
}

/// Selection bytes with `on` first (displayed, in that order) and every
/// other field after them in catalog order.
pub fn build_fieldscur(on: &[FieldId]) -> Vec<u8> {
    let mut out: Vec<u8> = on
        .iter()
        .map(|f| (f.index() as u8 + FLD_OFFSET) | FLD_ON)
        .collect();
    for f in FieldId::ALL {
        if !on.contains(&f) {
            out.push(f.index() as u8 + FLD_OFFSET);
        }
    }
    out
}

// ============================================================================
// Persisted Settings
// ============================================================================

/// The part of a window that is written to the rc file
#[derive(Debug, Clone, PartialEq)]
pub struct WinRc {
    /// Short name (at most 3 chars)
    pub winname: String,
    /// One selection byte per catalog field
    pub fieldscur: Vec<u8>,
    /// VIEW_/SHOW_/QSRT_ bits
    pub winflags: u32,
    /// Sort field
    pub sortindx: FieldId,
    /// Row limit, 0 meaning "whatever fits"
    pub maxtasks: usize,
    /// Summary color
    pub summclr: u8,
    /// Message and prompt color
    pub msgsclr: u8,
    /// Column header color
    pub headclr: u8,
    /// Task row color
    pub taskclr: u8,
}

impl WinRc {
    /// The four shipped window configurations.
    pub fn defaults() -> [WinRc; GROUPSMAX] {
        use FieldId::*;
        [
            WinRc {
                winname: "Def".to_string(),
                fieldscur: build_fieldscur(&[
                    Pid, User, Pr, Ni, Virt, Res, Shr, State, Cpu, Mem, TimePlus, Command,
                ]),
                winflags: DEF_WINFLGS,
                sortindx: Cpu,
                maxtasks: 0,
                summclr: 1,
                msgsclr: 1,
                headclr: 3,
                taskclr: 1,
            },
            WinRc {
                winname: "Job".to_string(),
                fieldscur: build_fieldscur(&[
                    Pid, Ppid, TimePlus, Cpu, Mem, Pr, Ni, State, Virt, Swap, Res, Uid, Command,
                ]),
                winflags: DEF_WINFLGS,
                sortindx: Pid,
                maxtasks: 0,
                summclr: 6,
                msgsclr: 6,
                headclr: 7,
                taskclr: 6,
            },
            WinRc {
                winname: "Mem".to_string(),
                fieldscur: build_fieldscur(&[
                    Pid, Mem, Virt, Swap, Res, Code, Data, Shr, MajFlt, Dirty, State, Pr, Ni, Cpu,
                    Command,
                ]),
                winflags: DEF_WINFLGS,
                sortindx: Mem,
                maxtasks: 0,
                summclr: 5,
                msgsclr: 5,
                headclr: 4,
                taskclr: 5,
            },
            WinRc {
                winname: "Usr".to_string(),
                fieldscur: build_fieldscur(&[
                    Pid, Ppid, Uid, User, Ruser, Tty, TimePlus, Cpu, Mem, State, Command,
                ]),
                winflags: DEF_WINFLGS,
                sortindx: User,
                maxtasks: 0,
                summclr: 3,
                msgsclr: 3,
                headclr: 2,
                taskclr: 3,
            },
        ]
    }
}

// ============================================================================
// Window
// ============================================================================

/// One display group
#[derive(Debug, Clone)]
pub struct Window {
    /// Persisted settings
    pub rc: WinRc,
    /// 1-based position in the ring
    pub num: usize,
    /// `N:Name`, shown in alternate mode
    pub grpname: String,
    /// Active user filter
    pub usrfilter: Option<UserFilter>,
    /// First displayed field (horizontal scroll)
    pub begpflg: usize,
    /// First displayed task (vertical scroll)
    pub begtask: usize,
    /// Every "on" field, in display order
    pub pflgsall: Vec<FieldId>,
    /// The fields that fit, starting at `begpflg`
    pub procflgs: Vec<FieldId>,
    /// Leftmost `begpflg` that still shows the last field
    pub endpflg: usize,
    /// Width shared by each variable column
    pub varcolsz: usize,
    /// Finished column header
    pub columnhdr: String,
    /// Task rows granted for the current frame
    pub winlines: usize,
    /// Display order of the current frame's records
    pub order: Vec<Placement>,
}

impl Window {
    /// Builds window number `num` (1-based) from persisted settings.
    pub fn new(num: usize, rc: WinRc) -> Self {
        let mut w = Self {
            rc,
            num,
            grpname: String::new(),
            usrfilter: None,
            begpflg: 0,
            begtask: 0,
            pflgsall: Vec::with_capacity(FIELD_COUNT),
            procflgs: Vec::with_capacity(FIELD_COUNT),
            endpflg: 0,
            varcolsz: 0,
            columnhdr: String::new(),
            winlines: 0,
            order: Vec::new(),
        };
        w.refresh_grpname();
        w
    }

    /// True if every bit of `flag` is set
    #[inline]
    pub fn has(&self, flag: u32) -> bool {
        self.rc.winflags & flag == flag
    }

    /// True if any bit of `flags` is set
    #[inline]
    pub fn has_any(&self, flags: u32) -> bool {
        self.rc.winflags & flags != 0
    }

    /// Sets `flag`
    pub fn set(&mut self, flag: u32) {
        self.rc.winflags |= flag;
    }

    /// Clears `flag`
    pub fn clear(&mut self, flag: u32) {
        self.rc.winflags &= !flag;
    }

    /// Flips `flag`
    pub fn toggle(&mut self, flag: u32) {
        self.rc.winflags ^= flag;
    }

    /// Renames the window, truncating to the maximum length.
    pub fn rename(&mut self, name: &str) {
        self.rc.winname = name.chars().take(WINNAME_MAX).collect();
        self.refresh_grpname();
    }

    fn refresh_grpname(&mut self) {
        self.grpname = format!("{}:{}", self.num, self.rc.winname);
    }

    /// Fields in user order with their on/off state.
    pub fn fields(&self) -> impl Iterator<Item = (FieldId, bool)> + '_ {
        self.rc
            .fieldscur
            .iter()
            .filter_map(|&b| field_of(b).map(|f| (f, field_is_on(b))))
    }

    /// Displayed fields in user order
    pub fn on_fields(&self) -> Vec<FieldId> {
        self.fields().filter(|&(_, on)| on).map(|(f, _)| f).collect()
    }

    /// True if `field` is displayed
    pub fn is_on(&self, field: FieldId) -> bool {
        self.fields().any(|(f, on)| f == field && on)
    }

    /// Position of `field` in the selection bytes
    pub fn field_pos(&self, field: FieldId) -> Option<usize> {
        self.rc.fieldscur.iter().position(|&b| field_of(b) == Some(field))
    }

    /// Flips the on/off state of the field at selection position `pos`.
    pub fn toggle_field_at(&mut self, pos: usize) {
        if let Some(b) = self.rc.fieldscur.get_mut(pos) {
            *b ^= FLD_ON;
        }
    }

    /// Field at selection position `pos`
    pub fn field_at(&self, pos: usize) -> Option<FieldId> {
        self.rc.fieldscur.get(pos).copied().and_then(field_of)
    }

    /// Swaps two selection positions (the fields manager "move").
    pub fn swap_fields(&mut self, a: usize, b: usize) {
        if a < self.rc.fieldscur.len() && b < self.rc.fieldscur.len() {
            self.rc.fieldscur.swap(a, b);
        }
    }

    /// Resets scrolling and filtering and makes the window visible.
    pub fn equalize(&mut self) {
        self.rc.maxtasks = 0;
        self.usrfilter = None;
        self.begpflg = 0;
        self.begtask = 0;
        self.set(SHOW_IDLEPS | SHOW_TASKON);
    }

    /// True if `rec` passes the window's user filter
    pub fn user_matches(&self, rec: &ProcessRecord) -> bool {
        match &self.usrfilter {
            None => true,
            Some(UserFilter {
                uid,
                which: UserMatch::Effective,
            }) => rec.euid == *uid,
            Some(UserFilter {
                uid,
                which: UserMatch::Any,
            }) => rec.ruid == *uid || rec.euid == *uid || rec.suid == *uid || rec.fuid == *uid,
        }
    }

    /// True if `rec` is listed: busy or idle-allowed, and user-matched
    pub fn shows(&self, rec: &ProcessRecord) -> bool {
        (self.has(SHOW_IDLEPS) || rec.pcpu > 0) && self.user_matches(rec)
    }
}

// ============================================================================
// Ring
// ============================================================================

/// The fixed ring of four windows plus the current position
#[derive(Debug, Clone)]
pub struct WindowStack {
    /// Windows in ring order
    pub wins: Vec<Window>,
    /// Index of the current window
    pub curwin: usize,
}

impl WindowStack {
    /// Builds the ring from persisted settings.
    pub fn new(rcs: [WinRc; GROUPSMAX], curwin: usize) -> Self {
        let wins = rcs
            .into_iter()
            .enumerate()
            .map(|(i, rc)| Window::new(i + 1, rc))
            .collect();
        Self {
            wins,
            curwin: curwin.min(GROUPSMAX - 1),
        }
    }

    /// Index following `i`
    pub fn next(i: usize) -> usize {
        (i + 1) % GROUPSMAX
    }

    /// Index preceding `i`
    pub fn prev(i: usize) -> usize {
        (i + GROUPSMAX - 1) % GROUPSMAX
    }

    /// The current window
    pub fn current(&self) -> &Window {
        &self.wins[self.curwin]
    }

    /// The current window, mutably
    pub fn current_mut(&mut self) -> &mut Window {
        &mut self.wins[self.curwin]
    }

    /// Makes the next window current
    pub fn select_next(&mut self) {
        self.curwin = Self::next(self.curwin);
    }

    /// Makes the previous window current
    pub fn select_prev(&mut self) {
        self.curwin = Self::prev(self.curwin);
    }

    /// Handles `a`, `w` and `1`-`4` as window selections.
    ///
    /// Returns false for any other character.
    pub fn select_by_key(&mut self, ch: char) -> bool {
        match ch {
            'a' => self.select_next(),
            'w' => self.select_prev(),
            '1'..='4' => self.curwin = ch as usize - '1' as usize,
            _ => return false,
        }
        true
    }

    /// Window indices starting at the current one, around the ring
    pub fn ring_from_current(&self) -> impl Iterator<Item = usize> {
        let start = self.curwin;
        (0..GROUPSMAX).map(move |k| (start + k) % GROUPSMAX)
    }

    /// Applies `f` to every window, starting with the current one.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut Window)) {
        for i in self.ring_from_current() {
            f(&mut self.wins[i]);
        }
    }

    /// Persisted settings of every window, in ring order
    pub fn rcs(&self) -> Vec<WinRc> {
        self.wins.iter().map(|w| w.rc.clone()).collect()
    }
}
