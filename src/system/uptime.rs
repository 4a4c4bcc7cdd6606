//! Uptime, load average and logged-in users
//!
//! This module produces the text of the first summary line.

use std::fs;
use std::io;
use std::path::Path;

/// Size of one glibc `struct utmp` record on Linux
const UTMP_RECORD_SIZE: usize = 384;

/// `ut_type` value for a logged-in user
const UTMP_USER_PROCESS: i16 = 7;

/// Offset of `ut_user` within a utmp record
const UTMP_USER_OFFSET: usize = 44;

/// Load averages over 1, 5 and 15 minutes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadAvg {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Reads `<proc_root>/uptime`, returning seconds since boot.
pub fn read_uptime_secs(proc_root: &Path) -> io::Result<f64> {
    let content = fs::read_to_string(proc_root.join("uptime"))?;
    content
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed uptime"))
}

/// Reads `<proc_root>/loadavg`.
pub fn read_loadavg(proc_root: &Path) -> io::Result<LoadAvg> {
    let content = fs::read_to_string(proc_root.join("loadavg"))?;
    let mut parts = content.split_whitespace().map(|s| s.parse::<f64>().unwrap_or(0.0));
    Ok(LoadAvg {
        one: parts.next().unwrap_or(0.0),
        five: parts.next().unwrap_or(0.0),
        fifteen: parts.next().unwrap_or(0.0),
    })
}

/// Counts user-process records in a utmp image.
pub fn count_users(utmp: &[u8]) -> usize {
    utmp.chunks_exact(UTMP_RECORD_SIZE)
        .filter(|rec| {
            let ut_type = i16::from_ne_bytes([rec[0], rec[1]]);
            ut_type == UTMP_USER_PROCESS && rec[UTMP_USER_OFFSET] != 0
        })
        .count()
}

/// Logged-in users from the system utmp file, 0 if it is unreadable.
pub fn logged_in_users() -> usize {
    fs::read("/var/run/utmp")
        .map(|data| count_users(&data))
        .unwrap_or(0)
}

/// Local wall clock as (hours, minutes, seconds)
pub fn local_clock() -> (u32, u32, u32) {
    // SAFETY: time(NULL) has no preconditions; localtime_r writes only into
    // the tm value we own.
    unsafe {
        let now = libc::time(std::ptr::null_mut());
        let mut tm: libc::tm = std::mem::zeroed();
        if libc::localtime_r(&now, &mut tm).is_null() {
            return (0, 0, 0);
        }
        (tm.tm_hour as u32, tm.tm_min as u32, tm.tm_sec as u32)
    }
}

/// Formats the uptime portion, e.g. `up 3 days, 22:31`.
#[must_use]
pub fn format_uptime(uptime_secs: u64) -> String {
    let days = uptime_secs / 86_400;
    let minutes = (uptime_secs / 60) % 60;
    let hours = (uptime_secs / 3600) % 24;

    let mut out = String::from("up ");
    if days > 0 {
        out.push_str(&format!("{} day{}, ", days, if days == 1 { "" } else { "s" }));
    }
    if hours > 0 {
        out.push_str(&format!("{:2}:{:02}", hours, minutes));
    } else {
        out.push_str(&format!("{} min", minutes));
    }
    out
}

/// Builds the whole uptime/load line after the program name.
#[must_use]
pub fn format_load_line(
    clock: (u32, u32, u32),
    uptime_secs: u64,
    users: usize,
    load: LoadAvg,
) -> String {
    format!(
        "{:02}:{:02}:{:02} {}, {:2} user{},  load average: {:.2}, {:.2}, {:.2}",
        clock.0,
        clock.1,
        clock.2,
        format_uptime(uptime_secs),
        users,
        if users == 1 { "" } else { "s" },
        load.one,
        load.five,
        load.fifteen
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime_minutes() {
        assert_eq!(format_uptime(59), "up 0 min");
        assert_eq!(format_uptime(42 * 60), "up 42 min");
    }

    #[test]
    fn test_format_uptime_hours() {
        assert_eq!(format_uptime(3600 + 5 * 60), "up  1:05");
    }

    #[test]
    fn test_format_uptime_days() {
        assert_eq!(format_uptime(86_400 + 60), "up 1 day, 1 min");
        assert_eq!(format_uptime(3 * 86_400 + 22 * 3600 + 31 * 60), "up 3 days, 22:31");
    }

    #[test]
    fn test_format_load_line() {
        let load = LoadAvg { one: 1.0, five: 1.01, fifteen: 1.05 };
        let line = format_load_line((17, 42, 16), 3 * 86_400 + 22 * 3600 + 31 * 60, 3, load);
        assert_eq!(
            line,
            "17:42:16 up 3 days, 22:31,  3 users,  load average: 1.00, 1.01, 1.05"
        );
    }

    #[test]
    fn test_count_users() {
        let mut image = vec![0u8; UTMP_RECORD_SIZE * 3];
        // record 0: user process with a name
        image[..2].copy_from_slice(&UTMP_USER_PROCESS.to_ne_bytes());
        image[UTMP_USER_OFFSET] = b'u';
        // record 1: user process without a name
        image[UTMP_RECORD_SIZE..UTMP_RECORD_SIZE + 2]
            .copy_from_slice(&UTMP_USER_PROCESS.to_ne_bytes());
        // record 2: boot time entry
        image[2 * UTMP_RECORD_SIZE..2 * UTMP_RECORD_SIZE + 2].copy_from_slice(&2i16.to_ne_bytes());
        image[2 * UTMP_RECORD_SIZE + UTMP_USER_OFFSET] = b'r';
        assert_eq!(count_users(&image), 1);
    }

    #[test]
    fn test_read_uptime_and_loadavg() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("uptime"), "12345.67 54321.00\n").unwrap();
        std::fs::write(dir.path().join("loadavg"), "0.50 0.25 0.10 1/123 4567\n").unwrap();
        assert!((read_uptime_secs(dir.path()).unwrap() - 12345.67).abs() < 1e-9);
        let load = read_loadavg(dir.path()).unwrap();
        assert_eq!(load.five, 0.25);
    }
}
