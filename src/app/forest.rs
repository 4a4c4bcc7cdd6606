//! Forest view ordering
//!
//! Produces a pre-order parent/child traversal of one frame's records.
//! Records are never moved; the result is a list of indices with a depth.

use std::collections::{HashMap, HashSet};

use crate::system::snapshot::ProcessRecord;

/// Deepest level recorded; deeper descendants keep this depth
pub const MAX_DEPTH: u8 = 127;

/// One row of a window's display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Index into the frame's records
    pub idx: usize,
    /// Tree depth: 1 for roots, 0 for records no traversal reached
    pub depth: u8,
}

impl Placement {
    /// A row outside forest view
    pub fn flat(idx: usize) -> Self {
        Self { idx, depth: 1 }
    }
}

/// The id a record hangs from: threads hang from their group leader,
/// group leaders from their parent.
fn parent_key(rec: &ProcessRecord) -> i32 {
    if rec.tid != rec.tgid && rec.tgid > 0 {
        rec.tgid
    } else {
        rec.ppid
    }
}

/// Orders `records` as a forest.
///
/// Every record appears exactly once. Roots are records whose parent is
/// zero or absent. Anything not reached from a root (a cycle, a duplicate
/// id) is appended at depth 0.
pub fn linearize(records: &[ProcessRecord]) -> Vec<Placement> {
    let mut seed: Vec<usize> = (0..records.len()).collect();
    seed.sort_by_key(|&i| records[i].ppid);

    let present: HashSet<i32> = records.iter().map(|r| r.tid).collect();
    let mut children: HashMap<i32, Vec<usize>> = HashMap::new();
    for &i in &seed {
        children.entry(parent_key(&records[i])).or_default().push(i);
    }

    let mut out = Vec::with_capacity(records.len());
    let mut emitted = vec![false; records.len()];
    let mut stack: Vec<(usize, u8)> = Vec::new();

    for &root in &seed {
        let key = parent_key(&records[root]);
        let is_root = records[root].ppid == 0 || !present.contains(&key);
        if !is_root || emitted[root] {
            continue;
        }
        stack.push((root, 1));
        while let Some((i, depth)) = stack.pop() {
            if emitted[i] {
                continue;
            }
            emitted[i] = true;
            out.push(Placement { idx: i, depth });
            if let Some(kids) = children.get(&records[i].tid) {
                let next = depth.saturating_add(1).min(MAX_DEPTH);
                // reversed so the first child is popped first
                for &k in kids.iter().rev() {
                    if k != i && !emitted[k] {
                        stack.push((k, next));
                    }
                }
            }
        }
    }

    if out.len() != records.len() {
        for &i in &seed {
            if !emitted[i] {
                out.push(Placement { idx: i, depth: 0 });
            }
        }
    }
    out
}

/// Prefixes a command with the indentation art for `depth`.
pub fn decorate(depth: u8, name: &str) -> String {
    match depth {
        0 => format!(" ?  {}", name),
        1 => name.to_string(),
        d => format!("{:>w$}{}", " `- ", name, w = 4 * (d as usize - 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc_rec(tid: i32, ppid: i32) -> ProcessRecord {
        ProcessRecord { tid, tgid: tid, ppid, ..Default::default() }
    }

    fn thread_rec(tid: i32, tgid: i32, ppid: i32) -> ProcessRecord {
        ProcessRecord { tid, tgid, ppid, ..Default::default() }
    }

    fn tids(records: &[ProcessRecord], order: &[Placement]) -> Vec<(i32, u8)> {
        order.iter().map(|p| (records[p.idx].tid, p.depth)).collect()
    }

    #[test]
    fn test_simple_tree_preorder() {
        let recs = vec![proc_rec(10, 1), proc_rec(1, 0), proc_rec(11, 10), proc_rec(2, 0), proc_rec(12, 1)];
        let order = linearize(&recs);
        assert_eq!(tids(&recs, &order), vec![(1, 1), (10, 2), (11, 3), (12, 2), (2, 1)]);
    }

    #[test]
    fn test_threads_hang_from_leader() {
        let recs = vec![proc_rec(1, 0), proc_rec(50, 1), thread_rec(51, 50, 1), thread_rec(52, 50, 1)];
        let order = linearize(&recs);
        assert_eq!(tids(&recs, &order), vec![(1, 1), (50, 2), (51, 3), (52, 3)]);
    }

    #[test]
    fn test_every_record_once_with_dangling_parent() {
        let recs = vec![
            proc_rec(1, 0),
            proc_rec(7, 999),
            proc_rec(8, 7),
            proc_rec(30, 31),
            proc_rec(31, 30),
            proc_rec(5, 1),
        ];
        let order = linearize(&recs);
        assert_eq!(order.len(), recs.len());
        let mut seen: Vec<usize> = order.iter().map(|p| p.idx).collect();
        seen.sort();
        assert_eq!(seen, (0..recs.len()).collect::<Vec<_>>());

        let pos = |tid: i32| order.iter().position(|p| recs[p.idx].tid == tid).unwrap();
        for p in &order {
            let rec = &recs[p.idx];
            if p.depth > 0 && recs.iter().any(|r| r.tid == rec.ppid) {
                assert!(pos(rec.ppid) < pos(rec.tid));
            }
        }
        // the 30 <-> 31 cycle is unreachable
        let depth = |tid: i32| order[pos(tid)].depth;
        assert_eq!(depth(30), 0);
        assert_eq!(depth(31), 0);
        assert_eq!(depth(7), 1);
        assert_eq!(depth(8), 2);
    }

    #[test]
    fn test_duplicate_tid_is_not_repeated() {
        let recs = vec![proc_rec(1, 0), proc_rec(4, 1), proc_rec(4, 1)];
        let order = linearize(&recs);
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_depth_is_capped() {
        let mut recs = vec![proc_rec(1, 0)];
        for tid in 2..300 {
            recs.push(proc_rec(tid, tid - 1));
        }
        let order = linearize(&recs);
        assert_eq!(order.len(), recs.len());
        assert_eq!(order.last().unwrap().depth, MAX_DEPTH);
    }

    #[test]
    fn test_decorate() {
        assert_eq!(decorate(1, "init"), "init");
        assert_eq!(decorate(2, "sh"), " `- sh");
        assert_eq!(decorate(3, "ls"), "     `- ls");
        assert_eq!(decorate(0, "lost"), " ?  lost");
    }
}
