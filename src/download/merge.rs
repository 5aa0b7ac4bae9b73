// StreamSync - Offline Video Downloads for Mobile
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Merging engine updates into the live download collection
//!
//! Progress batches update in-flight state only. Completion is never taken
//! from a batch: a `completed` entry is skipped and the record becomes
//! completed only through the resync that follows `DownloadEnd`. A stale
//! completed tick therefore cannot overwrite a newer resync.

use crate::download::status::{DownloadRecord, DownloadStatus};

/// Counters describing what a merge did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub replaced: usize,
    pub appended: usize,
    pub skipped_completed: usize,
}

impl MergeOutcome {
    /// Whether the live collection changed
    pub fn changed(&self) -> bool {
        self.replaced > 0 || self.appended > 0
    }
}

/// Merge one progress batch into `live`
///
/// Entries are matched by id. A live entry created before the engine
/// assigned an id is matched by url instead. Matched entries are replaced
/// wholesale, except that progress never moves backwards while both the
/// live and incoming entry are downloading.
pub fn merge_progress_batch(live: &mut Vec<DownloadRecord>, batch: Vec<DownloadRecord>) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for incoming in batch {
        let incoming = incoming.normalized();
        if incoming.status == DownloadStatus::Completed {
            outcome.skipped_completed += 1;
            continue;
        }

        match find_entry(live, &incoming) {
            Some(index) => {
                let merged = keep_progress_monotonic(&live[index], incoming);
                live[index] = merged;
                outcome.replaced += 1;
            }
            None => {
                live.push(incoming);
                outcome.appended += 1;
            }
        }
    }

    outcome
}

/// Replace `live` with an authoritative list
///
/// Duplicate keys in the authoritative list collapse to the last entry,
/// kept at the position of the first.
pub fn replace_all(live: &mut Vec<DownloadRecord>, authoritative: Vec<DownloadRecord>) {
    let mut next: Vec<DownloadRecord> = Vec::with_capacity(authoritative.len());
    for record in authoritative {
        let record = record.normalized();
        match next.iter().position(|r| r.key() == record.key()) {
            Some(index) => next[index] = record,
            None => next.push(record),
        }
    }
    *live = next;
}

fn find_entry(live: &[DownloadRecord], incoming: &DownloadRecord) -> Option<usize> {
    live.iter()
        .position(|r| r.key() == incoming.key())
        .or_else(|| {
            live.iter()
                .position(|r| r.id.is_none() && r.url == incoming.url)
        })
}

fn keep_progress_monotonic(current: &DownloadRecord, mut incoming: DownloadRecord) -> DownloadRecord {
    if current.status == DownloadStatus::Downloading
        && incoming.status == DownloadStatus::Downloading
        && incoming.progress < current.progress
    {
        incoming.progress = current.progress;
    }
    incoming
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloading(id: &str, url: &str, progress: f64) -> DownloadRecord {
        DownloadRecord::new(id, url, DownloadStatus::Downloading).with_progress(progress)
    }

    #[test]
    fn test_replace_and_append() {
        let mut live = vec![downloading("d1", "u1", 0.1)];
        let outcome = merge_progress_batch(
            &mut live,
            vec![downloading("d1", "u1", 0.4), downloading("d2", "u2", 0.2)],
        );

        assert_eq!(outcome, MergeOutcome { replaced: 1, appended: 1, skipped_completed: 0 });
        assert_eq!(live.len(), 2);
        assert_eq!(live[0].progress, 0.4);
        assert_eq!(live[1].key(), "d2");
    }

    #[test]
    fn test_completed_entries_are_skipped() {
        let mut live = vec![downloading("d1", "u1", 0.9)];
        let done = DownloadRecord::new("d1", "u1", DownloadStatus::Downloading).completed_at("/x/u1.mp4");

        let outcome = merge_progress_batch(&mut live, vec![done]);

        assert!(!outcome.changed());
        assert_eq!(outcome.skipped_completed, 1);
        assert_eq!(live, vec![downloading("d1", "u1", 0.9)]);
    }

    #[test]
    fn test_stale_tick_does_not_rewind_progress() {
        let mut live = vec![downloading("d1", "u1", 0.6)];
        merge_progress_batch(&mut live, vec![downloading("d1", "u1", 0.4)]);
        assert_eq!(live[0].progress, 0.6);
    }

    #[test]
    fn test_pause_resets_monotonic_window() {
        let mut live = vec![downloading("d1", "u1", 0.6)];
        let paused = DownloadRecord::new("d1", "u1", DownloadStatus::Paused).with_progress(0.3);
        merge_progress_batch(&mut live, vec![paused]);
        assert_eq!(live[0].status, DownloadStatus::Paused);
        assert_eq!(live[0].progress, 0.3);
    }

    #[test]
    fn test_placeholder_without_id_is_adopted() {
        let mut live = vec![DownloadRecord {
            id: None,
            url: "u1".to_string(),
            status: DownloadStatus::Pending,
            progress: 0.0,
            local_path: None,
        }];
        merge_progress_batch(&mut live, vec![downloading("d1", "u1", 0.1)]);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].key(), "d1");
    }

    #[test]
    fn test_replace_all_collapses_duplicates() {
        let mut live = vec![downloading("old", "u0", 0.5)];
        replace_all(
            &mut live,
            vec![
                downloading("d1", "u1", 0.1),
                downloading("d2", "u2", 0.2),
                downloading("d1", "u1", 0.3),
            ],
        );
        assert_eq!(live.len(), 2);
        assert_eq!(live[0].progress, 0.3);
        assert_eq!(live[1].key(), "d2");
    }
}
