//! Snapshot suffix generation.
//!
//! A suffix is `<prefix>-<host>-<mount>-<backup id>` with every character
//! outside `[A-Za-z0-9]` turned into a single dash, so that array snapshot
//! names stay valid and each snapshot can be traced back to its marker.

use std::collections::HashSet;

/// Default prefix for snapshot suffixes.
pub const DEFAULT_SUFFIX_PREFIX: &str = "SAPHANA";

/// Hands out snapshot suffixes that are unique within one marker.
///
/// Sanitization is lossy (`/a/bc` and `/a-bc` sanitize alike), so the
/// allocator remembers what it issued and appends `-2`, `-3`, ... on clashes.
#[derive(Debug, Clone)]
pub struct SuffixAllocator {
    prefix: String,
    marker_id: String,
    issued: HashSet<String>,
}

impl SuffixAllocator {
    /// Creates an allocator for the given prefix and backup marker id.
    pub fn new(prefix: impl Into<String>, marker_id: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            marker_id: marker_id.into(),
            issued: HashSet::new(),
        }
    }

    /// Returns a suffix for `(host, mount_path)` that this allocator has not
    /// issued before.
    pub fn allocate(&mut self, host: &str, mount_path: &str) -> String {
        let base = compose(&self.prefix, host, mount_path, &self.marker_id);

        let mut candidate = base.clone();
        let mut n = 2;
        while self.issued.contains(&candidate) {
            candidate = format!("{}-{}", base, n);
            n += 1;
        }

        self.issued.insert(candidate.clone());
        candidate
    }

    /// Returns the number of suffixes issued so far.
    pub fn issued(&self) -> usize {
        self.issued.len()
    }
}

/// Builds the suffix for one volume without uniqueness tracking.
pub fn compose(prefix: &str, host: &str, mount_path: &str, marker_id: &str) -> String {
    [prefix, host, mount_path, marker_id]
        .iter()
        .map(|part| sanitize(part))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Replaces every run of non-alphanumeric characters with one dash and trims
/// dashes from both ends.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }

    out
}
