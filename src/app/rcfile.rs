//! Persisted configuration
//!
//! The personal rc file holds two global lines followed by three lines for
//! each of the four windows. The field selection string carries bytes with
//! the high bit set, so the file is handled as bytes rather than text.
//! Files written with an older version id are converted on load.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::constants::{
    APP_NAME, CVT_FIELDS, DEFAULT_DELAY_SECS, FLD_OFFSET, FLD_ON, GROUPSMAX, RCF_EYECATCHER,
    RCF_VERSION_ID, SYS_RCFILESPEC,
};
use crate::system::error::{RcFileError, RcFileResult};

use super::fields::{FieldId, FIELD_COUNT};
use super::window::{
    field_of, WinRc, QSRT_NORMAL, SHOW_HICOLS, SHOW_TASKON, VIEW_NOBOLD,
};

/// Old flag bit to current flag bit; a zero target drops the bit
const FLAGS_CVT: [(u32, u32); 5] = [
    (0x000001, VIEW_NOBOLD),
    (0x000008, SHOW_TASKON),
    (0x000010, QSRT_NORMAL),
    (0x000200, SHOW_HICOLS),
    (0x010000, 0),
];

/// Everything the personal rc file carries
#[derive(Debug, Clone, PartialEq)]
pub struct RcConfig {
    /// Alternate (multi-window) display
    pub altscr: bool,
    /// Irix mode: %CPU is not divided by the cpu count
    pub irixps: bool,
    /// Seconds between frames
    pub delay: f64,
    /// Index of the current window
    pub curwin: usize,
    /// The four windows
    pub wins: [WinRc; GROUPSMAX],
}

impl Default for RcConfig {
    fn default() -> Self {
        Self {
            altscr: false,
            irixps: true,
            delay: DEFAULT_DELAY_SECS,
            curwin: 0,
            wins: WinRc::defaults(),
        }
    }
}

/// Result of loading the personal rc file
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRc {
    /// The configuration
    pub config: RcConfig,
    /// The file used an older layout and was converted
    pub converted: bool,
}

/// Contents of the system wide rc file
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemRc {
    /// Ordinary users may not kill, renice or change the delay
    pub secure: bool,
    /// Delay imposed in secure mode
    pub delay: Option<f64>,
}

// ============================================================================
// Locations
// ============================================================================

/// `$HOME/.ptoprc`, or `./.ptoprc` without a home directory.
pub fn personal_path() -> PathBuf {
    let home = env::var("HOME").ok().filter(|h| !h.is_empty());
    let dir = home.unwrap_or_else(|| ".".to_string());
    PathBuf::from(dir).join(format!(".{}rc", APP_NAME))
}

/// Reads the system wide rc file, treating a missing file as "not secure".
pub fn read_system_rc(path: &Path) -> SystemRc {
    let Ok(content) = fs::read_to_string(path) else {
        return SystemRc::default();
    };
    let mut lines = content.lines();
    let secure = lines.next().map(|l| l.contains('s')).unwrap_or(false);
    let delay = lines
        .next()
        .and_then(|l| l.split_whitespace().next())
        .and_then(|t| t.parse::<f64>().ok());
    debug!(path = %path.display(), secure, ?delay, "system rcfile");
    SystemRc { secure, delay }
}

/// The system wide rc file location
pub fn system_path() -> PathBuf {
    PathBuf::from(SYS_RCFILESPEC)
}

// ============================================================================
// Reading
// ============================================================================

/// Loads the personal rc file. A missing file yields `Ok(None)`.
pub fn load(path: &Path) -> RcFileResult<Option<LoadedRc>> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no rcfile, using defaults");
            return Ok(None);
        }
        Err(e) => {
            return Err(RcFileError::Unreadable {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        }
    };
    let loaded = parse(&bytes, &path.display().to_string())?;
    if loaded.converted {
        info!(path = %path.display(), "converted rcfile from an older version");
    }
    Ok(Some(loaded))
}

/// Parses rc file bytes; `label` names the file in errors.
pub fn parse(bytes: &[u8], label: &str) -> RcFileResult<LoadedRc> {
    let bad_header = || RcFileError::BadHeader {
        path: label.to_string(),
    };
    let mut lines = bytes.split(|&b| b == b'\n');

    // eyecatcher
    lines.next().ok_or_else(bad_header)?;
    let globals = lines.next().ok_or_else(bad_header)?;
    let globals = std::str::from_utf8(globals).map_err(|_| bad_header())?;
    let (id, altscr, irixps, delay, curwin) = parse_globals(globals).ok_or_else(bad_header)?;

    let mut config = RcConfig {
        altscr,
        irixps,
        delay,
        curwin,
        wins: WinRc::defaults(),
    };
    let converting = id != RCF_VERSION_ID;

    for (i, win) in config.wins.iter_mut().enumerate() {
        let bad = |line: &'static str| RcFileError::BadEntry {
            window: i + 1,
            line,
            path: label.to_string(),
        };

        let (name, fields) = lines
            .next()
            .and_then(split_name_line)
            .ok_or_else(|| bad("fieldscur"))?;
        let nums = lines
            .next()
            .and_then(|l| std::str::from_utf8(l).ok())
            .and_then(|l| parse_assignments(l, &["winflags", "sortindx", "maxtasks"]))
            .ok_or_else(|| bad("winflags"))?;
        let clrs = lines
            .next()
            .and_then(|l| std::str::from_utf8(l).ok())
            .and_then(|l| parse_assignments(l, &["summclr", "msgsclr", "headclr", "taskclr"]))
            .ok_or_else(|| bad("colors"))?;

        win.winname = name;
        let winflags = u32::try_from(nums[0]).map_err(|_| bad("winflags"))?;
        let sortindx = usize::try_from(nums[1]).map_err(|_| bad("winflags"))?;
        win.maxtasks = usize::try_from(nums[2]).map_err(|_| bad("winflags"))?;
        let mut colors = [0u8; 4];
        for (slot, v) in colors.iter_mut().zip(clrs) {
            *slot = u8::try_from(v).ok().filter(|c| *c < 8).ok_or_else(|| bad("colors"))?;
        }
        [win.summclr, win.msgsclr, win.headclr, win.taskclr] = colors;

        if converting {
            win.winflags = convert_flags(winflags);
            win.fieldscur = convert_fields(&fields).ok_or_else(|| bad("fieldscur"))?;
            win.sortindx = CVT_FIELDS
                .get(sortindx)
                .and_then(|&b| FieldId::from_index((b - FLD_OFFSET) as usize))
                .ok_or_else(|| bad("winflags"))?;
        } else {
            win.winflags = winflags;
            validate_fields(&fields).ok_or_else(|| bad("fieldscur"))?;
            win.fieldscur = fields;
            win.sortindx = FieldId::from_index(sortindx).ok_or_else(|| bad("winflags"))?;
        }
    }

    Ok(LoadedRc {
        config,
        converted: converting,
    })
}

fn parse_globals(line: &str) -> Option<(char, bool, bool, f64, usize)> {
    let rest = line.trim_end().strip_prefix("Id:")?;
    let mut chars = rest.chars();
    let id = chars.next()?;
    let rest = chars.as_str().strip_prefix(", ")?;
    let vals: Vec<&str> = rest.split(", ").collect();
    if vals.len() != 4 {
        return None;
    }
    let get = |idx: usize, key: &str| vals[idx].strip_prefix(key)?.strip_prefix('=');
    let altscr = get(0, "Mode_altscr")?.parse::<i32>().ok()? != 0;
    let irixps = get(1, "Mode_irixps")?.parse::<i32>().ok()? != 0;
    let delay = get(2, "Delay_time")?.parse::<f64>().ok()?;
    let curwin = get(3, "Curwin")?.parse::<usize>().ok()?;
    if curwin >= GROUPSMAX {
        return None;
    }
    Some((id, altscr, irixps, delay, curwin))
}

/// Splits `<name>\tfieldscur=<bytes>`.
fn split_name_line(line: &[u8]) -> Option<(String, Vec<u8>)> {
    let tab = line.iter().position(|&b| b == b'\t')?;
    let name = std::str::from_utf8(&line[..tab]).ok()?;
    if name.is_empty() || name.chars().count() > crate::constants::WINNAME_MAX {
        return None;
    }
    let fields = line[tab + 1..].strip_prefix(b"fieldscur=")?;
    let fields: Vec<u8> = fields
        .iter()
        .copied()
        .take_while(|b| !b.is_ascii_whitespace())
        .collect();
    Some((name.to_string(), fields))
}

/// Parses `\tkey=N, key=N, ...` with exactly `keys` in order.
fn parse_assignments(line: &str, keys: &[&str]) -> Option<Vec<i64>> {
    let parts: Vec<&str> = line.trim().split(", ").collect();
    if parts.len() != keys.len() {
        return None;
    }
    parts
        .iter()
        .zip(keys)
        .map(|(part, key)| part.strip_prefix(key)?.strip_prefix('=')?.parse::<i64>().ok())
        .collect()
}

/// A current-version field string must name every field exactly once.
fn validate_fields(fields: &[u8]) -> Option<()> {
    if fields.len() != FIELD_COUNT {
        return None;
    }
    let mut seen = [false; FIELD_COUNT];
    for &b in fields {
        let f = field_of(b)?;
        if std::mem::replace(&mut seen[f.index()], true) {
            return None;
        }
    }
    Some(())
}

fn convert_flags(old: u32) -> u32 {
    let mut rest = old;
    let mut out = 0;
    for (from, to) in FLAGS_CVT {
        if rest & from != 0 {
            rest &= !from;
            out |= to;
        }
    }
    out | rest
}

/// Maps an old letter-per-field string onto the current alphabet.
fn convert_fields(old: &[u8]) -> Option<Vec<u8>> {
    if old.len() > CVT_FIELDS.len() {
        return None;
    }
    let mut out = Vec::with_capacity(FIELD_COUNT);
    for &c in old {
        let x = c.to_ascii_lowercase().checked_sub(b'a')? as usize;
        let mut b = *CVT_FIELDS.get(x)?;
        if c.is_ascii_uppercase() {
            b |= FLD_ON;
        }
        out.push(b);
    }
    for f in FieldId::ALL {
        let b = f.index() as u8 + FLD_OFFSET;
        if !out.iter().any(|&o| o & !FLD_ON == b) {
            out.push(b);
        }
    }
    validate_fields(&out)?;
    Some(out)
}

// ============================================================================
// Writing
// ============================================================================

/// Serializes a configuration in the current layout.
pub fn render(config: &RcConfig) -> Vec<u8> {
    let mut out = Vec::with_capacity(512);
    out.extend_from_slice(format!("{}'s {}\n", APP_NAME, RCF_EYECATCHER).as_bytes());
    out.extend_from_slice(
        format!(
            "Id:{}, Mode_altscr={}, Mode_irixps={}, Delay_time={:.3}, Curwin={}\n",
            RCF_VERSION_ID, config.altscr as i32, config.irixps as i32, config.delay, config.curwin
        )
        .as_bytes(),
    );
    for w in &config.wins {
        out.extend_from_slice(w.winname.as_bytes());
        out.extend_from_slice(b"\tfieldscur=");
        out.extend_from_slice(&w.fieldscur);
        out.push(b'\n');
        out.extend_from_slice(
            format!(
                "\twinflags={}, sortindx={}, maxtasks={}\n",
                w.winflags,
                w.sortindx.index(),
                w.maxtasks
            )
            .as_bytes(),
        );
        out.extend_from_slice(
            format!(
                "\tsummclr={}, msgsclr={}, headclr={}, taskclr={}\n",
                w.summclr, w.msgsclr, w.headclr, w.taskclr
            )
            .as_bytes(),
        );
    }
    out
}

/// Writes `config` to `path`.
pub fn write(path: &Path, config: &RcConfig) -> io::Result<()> {
    fs::write(path, render(config)).map_err(|e| {
        warn!(path = %path.display(), error = %e, "rcfile write failed");
        e
    })?;
    info!(path = %path.display(), "wrote rcfile");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::window::DEF_WINFLGS;

    fn old_style(id: char, fields: &str) -> Vec<u8> {
        let mut s = format!(
            "top's Config File (Linux processes with windows)\nId:{}, Mode_altscr=0, Mode_irixps=1, Delay_time=3.000, Curwin=0\n",
            id
        );
        for name in ["Def", "Job", "Mem", "Usr"] {
            s.push_str(&format!(
                "{}\tfieldscur={}\n\twinflags=30137, sortindx=10, maxtasks=0\n\tsummclr=1, msgsclr=1, headclr=3, taskclr=1\n",
                name, fields
            ));
        }
        s.into_bytes()
    }

    #[test]
    fn test_render_then_parse_defaults() {
        let mut config = RcConfig::default();
        config.altscr = true;
        config.curwin = 2;
        config.delay = 1.5;
        config.wins[1].winname = "Xy".to_string();
        let loaded = parse(&render(&config), "test").unwrap();
        assert!(!loaded.converted);
        assert_eq!(loaded.config, config);
    }

    #[test]
    fn test_rendered_header_lines() {
        let bytes = render(&RcConfig::default());
        let text = String::from_utf8_lossy(&bytes);
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            format!("{}'s Config File (Linux processes with windows)", APP_NAME)
        );
        assert_eq!(
            lines.next().unwrap(),
            "Id:f, Mode_altscr=0, Mode_irixps=1, Delay_time=3.000, Curwin=0"
        );
        assert!(lines.nth(1).unwrap().starts_with("\twinflags="));
    }

    #[test]
    fn test_old_version_converts() {
        let loaded = parse(&old_style('e', "AEHIOQTWKNMbcdfgjplrsuvyzX"), "old").unwrap();
        assert!(loaded.converted);
        let w = &loaded.config.wins[0];
        assert_eq!(w.fieldscur.len(), FIELD_COUNT);
        // 'A' -> '%' (PID) on, 'b' -> '&' (PPID) off
        assert_eq!(w.fieldscur[0], b'%' | FLD_ON);
        assert_eq!(field_of(w.fieldscur[0]), Some(FieldId::Pid));
        // old sort index 10 maps through the alphabet
        assert_eq!(w.sortindx.index(), (CVT_FIELDS[10] - FLD_OFFSET) as usize);
        // 0x10 (old normal) became QSRT_NORMAL, 0x8 became TASKON
        assert!(w.winflags & QSRT_NORMAL != 0);
        assert!(w.winflags & SHOW_TASKON != 0);
    }

    #[test]
    fn test_unknown_version_with_bad_fields_is_rejected() {
        let err = parse(&old_style('x', "ABCDEFGHIJKLMNOPQRSTUVWXYZab"), "bad").unwrap_err();
        assert!(matches!(err, RcFileError::BadEntry { window: 1, line: "fieldscur", .. }));
        let err = parse(&old_style('x', "AB1"), "bad").unwrap_err();
        assert!(matches!(err, RcFileError::BadEntry { .. }));
    }

    #[test]
    fn test_current_version_requires_full_field_string() {
        let mut bytes = render(&RcConfig::default());
        // drop one byte from the first field string
        let pos = bytes.windows(10).position(|w| w == b"fieldscur=").unwrap() + 10;
        bytes.remove(pos);
        let err = parse(&bytes, "short").unwrap_err();
        assert!(matches!(err, RcFileError::BadEntry { window: 1, .. }));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut bytes = render(&RcConfig::default());
        let pos = bytes.windows(10).position(|w| w == b"fieldscur=").unwrap() + 10;
        bytes[pos + 1] = bytes[pos];
        assert!(parse(&bytes, "dup").is_err());
    }

    #[test]
    fn test_bad_header_rejected() {
        let err = parse(b"junk\nnot a header\n", "hdr").unwrap_err();
        assert_eq!(err, RcFileError::BadHeader { path: "hdr".to_string() });
        let err = parse(b"x\nId:f, Mode_altscr=0, Mode_irixps=1, Delay_time=3.0, Curwin=7\n", "hdr");
        assert!(err.is_err());
    }

    #[test]
    fn test_flag_conversion_keeps_unknown_bits() {
        assert_eq!(convert_flags(0x1 | 0x10000 | 0x4000), VIEW_NOBOLD | 0x4000);
    }

    #[test]
    fn test_load_missing_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ptoprc");
        assert_eq!(load(&path).unwrap(), None);
        let mut config = RcConfig::default();
        config.wins[0].winflags = DEF_WINFLGS & !SHOW_TASKON;
        write(&path, &config).unwrap();
        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.config, config);
    }

    #[test]
    fn test_system_rc() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ptoprc");
        assert_eq!(read_system_rc(&path), SystemRc::default());
        fs::write(&path, "s\n5.5\n").unwrap();
        assert_eq!(read_system_rc(&path), SystemRc { secure: true, delay: Some(5.5) });
    }
}
