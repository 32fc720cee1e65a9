/// Counters for a single run, emitted once at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub purged: u64,
    pub skipped: u64,
    pub downloaded: u64,
    pub linked: u64,
    pub copied: u64,
    /// Failures the run recovered from: purge deletes, link-then-copy,
    /// timestamp application, unusable remote names.
    pub errors: u64,
}
