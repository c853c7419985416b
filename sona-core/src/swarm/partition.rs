//! Deterministic partitioning of the indexing keyspace.
//!
//! The keyspace is the uppercase alphabet of repository-name initials.
//! Partitions are contiguous, pairwise disjoint, and cover the whole
//! keyspace, so a swarm run touches every repository exactly once and a
//! re-run can target a single slice by its stable id.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// First character of the keyspace.
pub const KEYSPACE_START: char = 'A';
/// Last character of the keyspace (inclusive).
pub const KEYSPACE_END: char = 'Z';

/// One contiguous slice of the keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Stable identifier, e.g. `a-f`
    pub id: String,
    /// First character covered
    pub start: char,
    /// Last character covered (inclusive)
    pub end: char,
    /// Optional scheduling priority; higher runs (and reports) first
    pub priority: Option<u32>,
}

impl Partition {
    /// Build a partition over `[start, end]` with the canonical id.
    #[must_use]
    pub fn new(start: char, end: char) -> Self {
        Self {
            id: format!(
                "{}-{}",
                start.to_ascii_lowercase(),
                end.to_ascii_lowercase()
            ),
            start: start.to_ascii_uppercase(),
            end: end.to_ascii_uppercase(),
            priority: None,
        }
    }

    /// Set the scheduling priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Whether `key` (by first character) falls in this partition.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        key.chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .is_some_and(|c| c >= self.start && c <= self.end)
    }
}

/// The default 4-way alphabetic split: A–F, G–L, M–R, S–Z.
#[must_use]
pub fn create_empty_partitions() -> Vec<Partition> {
    vec![
        Partition::new('A', 'F'),
        Partition::new('G', 'L'),
        Partition::new('M', 'R'),
        Partition::new('S', 'Z'),
    ]
}

/// Build partitions from explicit inclusive ranges, validating that they
/// form a disjoint cover of the keyspace.
pub fn create_partitions(ranges: &[(char, char)]) -> Result<Vec<Partition>> {
    let partitions: Vec<Partition> = ranges
        .iter()
        .map(|(start, end)| Partition::new(*start, *end))
        .collect();
    validate_cover(&partitions)?;
    Ok(partitions)
}

/// Check that `partitions` are pairwise disjoint and cover `A..=Z`.
pub fn validate_cover(partitions: &[Partition]) -> Result<()> {
    if partitions.is_empty() {
        return Err(Error::InvalidInput(
            "partition list must not be empty".to_string(),
        ));
    }

    let mut sorted: Vec<&Partition> = partitions.iter().collect();
    sorted.sort_by_key(|p| p.start);

    let mut expected = KEYSPACE_START;
    for partition in sorted {
        if partition.start > partition.end {
            return Err(Error::InvalidInput(format!(
                "partition {} has start after end",
                partition.id
            )));
        }
        if partition.start != expected {
            return Err(Error::InvalidInput(format!(
                "partition ranges leave a gap or overlap at '{expected}'"
            )));
        }
        expected = next_char(partition.end);
    }

    if expected != next_char(KEYSPACE_END) {
        return Err(Error::InvalidInput(format!(
            "partition ranges stop before '{KEYSPACE_END}'"
        )));
    }
    Ok(())
}

fn next_char(c: char) -> char {
    char::from_u32(c as u32 + 1).unwrap_or(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_partitions_cover_keyspace() {
        let partitions = create_empty_partitions();
        assert_eq!(partitions.len(), 4);
        validate_cover(&partitions).unwrap();
    }

    #[test]
    fn test_default_ids_are_stable() {
        let ids: Vec<String> = create_empty_partitions()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["a-f", "g-l", "m-r", "s-z"]);
    }

    #[test]
    fn test_every_letter_lands_in_exactly_one_partition() {
        let partitions = create_empty_partitions();
        for c in 'A'..='Z' {
            let key = c.to_string();
            let holders = partitions.iter().filter(|p| p.contains(&key)).count();
            assert_eq!(holders, 1, "letter {c} covered by {holders} partitions");
        }
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let partition = Partition::new('A', 'F');
        assert!(partition.contains("awesome-skill"));
        assert!(partition.contains("Fuzzing"));
        assert!(!partition.contains("zig-tools"));
    }

    #[test]
    fn test_overlapping_ranges_rejected() {
        assert!(create_partitions(&[('A', 'M'), ('K', 'Z')]).is_err());
    }

    #[test]
    fn test_gapped_ranges_rejected() {
        assert!(create_partitions(&[('A', 'F'), ('H', 'Z')]).is_err());
    }

    #[test]
    fn test_truncated_cover_rejected() {
        assert!(create_partitions(&[('A', 'F'), ('G', 'Q')]).is_err());
    }

    proptest! {
        #[test]
        fn prop_valid_splits_accepted(cuts in prop::collection::btree_set(0u32..25, 0..6)) {
            // Build contiguous ranges from arbitrary cut points.
            let mut starts = vec![0u32];
            starts.extend(cuts.iter().map(|c| c + 1));
            let mut ranges = Vec::new();
            for (i, start) in starts.iter().enumerate() {
                let end = starts.get(i + 1).map_or(25, |next| next - 1);
                let start_char = char::from_u32('A' as u32 + start).unwrap();
                let end_char = char::from_u32('A' as u32 + end).unwrap();
                ranges.push((start_char, end_char));
            }

            let partitions = create_partitions(&ranges).unwrap();
            validate_cover(&partitions).unwrap();

            // Disjoint cover: every letter in exactly one partition.
            for c in 'A'..='Z' {
                let key = c.to_string();
                prop_assert_eq!(partitions.iter().filter(|p| p.contains(&key)).count(), 1);
            }
        }
    }
}
