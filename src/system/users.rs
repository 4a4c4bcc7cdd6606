//! User and group name lookups
//!
//! Names are resolved through the system databases once per id and then
//! served from a cache, since every frame asks for the same few ids.

use std::collections::HashMap;

use nix::unistd::{Gid, Group, Uid, User};

/// Cache of uid/gid to name lookups
#[derive(Debug, Default)]
pub struct UserCache {
    users: HashMap<u32, String>,
    groups: HashMap<u32, String>,
}

impl UserCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Login name for `uid`, or the number when it has no entry
    pub fn user_name(&mut self, uid: u32) -> String {
        self.users
            .entry(uid)
            .or_insert_with(|| match User::from_uid(Uid::from_raw(uid)) {
                Ok(Some(user)) => user.name,
                _ => uid.to_string(),
            })
            .clone()
    }

    /// Group name for `gid`, or the number when it has no entry
    pub fn group_name(&mut self, gid: u32) -> String {
        self.groups
            .entry(gid)
            .or_insert_with(|| match Group::from_gid(Gid::from_raw(gid)) {
                Ok(Some(group)) => group.name,
                _ => gid.to_string(),
            })
            .clone()
    }
}

/// Which uids a user filter compares against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserMatch {
    /// `u`: effective uid only
    Effective,
    /// `U`: real, effective, saved or filesystem uid
    Any,
}

/// An active user filter on a window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFilter {
    /// Resolved uid
    pub uid: u32,
    /// Which ids are compared
    pub which: UserMatch,
}

/// Resolves a user given as a number or a login name.
///
/// An empty string clears the filter (`Ok(None)`).
pub fn user_certify(input: &str, which: UserMatch) -> Result<Option<UserFilter>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    if let Ok(uid) = input.parse::<u32>() {
        return Ok(Some(UserFilter { uid, which }));
    }
    match User::from_name(input) {
        Ok(Some(user)) => Ok(Some(UserFilter {
            uid: user.uid.as_raw(),
            which,
        })),
        _ => Err("Invalid user".to_string()),
    }
}
