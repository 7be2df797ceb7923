// src/duplicates/grouper.rs
// Folds the pairwise duplicate signals of one scan into groups.
//
// 1. Partition the pairs by their first key. Every pair contributes both of
//    its sides to the partition, so a partition is the first key plus all the
//    entities it was paired with.
// 2. Order partitions by the number of pair rows they were built from,
//    most first; equal counts keep the order in which their first key was
//    encountered.
// 3. Commit partitions in that order, dropping any whose keys are already
//    covered by a committed group.
//
// Grouping is driven by the first key only. A store that does not emit both
// directions of a relation can leave one cluster split across several groups;
// `key_coverage` reports the shape of the pair graph so callers can notice.

use petgraph::algo::kosaraju_scc;
use petgraph::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

use crate::models::{DuplicateDto, DuplicateGroup, DuplicatesResult};

/// A candidate group built from every pair sharing one first key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub first_key: Uuid,
    /// Pair rows folded in, repeats included.
    pub rows: usize,
    pub keys: HashSet<Uuid>,
    pub group: DuplicateGroup,
}

impl Partition {
    fn new(first_key: Uuid) -> Self {
        Self {
            first_key,
            rows: 0,
            keys: HashSet::new(),
            group: DuplicateGroup::new(),
        }
    }

    fn add_pair(&mut self, dto: &DuplicateDto) {
        self.rows += 1;
        for duplicate in [dto.first(), dto.second()] {
            self.keys.insert(duplicate.key);
            self.group.insert(duplicate);
        }
    }
}

/// Partitions in commit order: descending row count, stable on first-key
/// encounter order.
pub fn build_partitions(pairs: &[DuplicateDto]) -> Vec<Partition> {
    let mut index_by_key: HashMap<Uuid, usize> = HashMap::new();
    let mut partitions: Vec<Partition> = Vec::new();

    for dto in pairs {
        let idx = *index_by_key.entry(dto.key1).or_insert_with(|| {
            partitions.push(Partition::new(dto.key1));
            partitions.len() - 1
        });
        partitions[idx].add_pair(dto);
    }

    // sort_by is stable
    partitions.sort_by(|a, b| b.rows.cmp(&a.rows));
    partitions
}

/// Keeps the partitions not already covered by a committed group.
pub fn commit_partitions(partitions: Vec<Partition>) -> Vec<DuplicateGroup> {
    let mut committed_keys: Vec<HashSet<Uuid>> = Vec::new();
    let mut groups = Vec::new();

    for partition in partitions {
        let covered = committed_keys
            .iter()
            .any(|keys| partition.keys.is_subset(keys));
        if covered {
            continue;
        }
        committed_keys.push(partition.keys);
        groups.push(partition.group);
    }
    groups
}

pub fn group_duplicates(pairs: &[DuplicateDto]) -> DuplicatesResult {
    let Some(first) = pairs.first() else {
        return DuplicatesResult::default();
    };
    DuplicatesResult {
        duplicates: commit_partitions(build_partitions(pairs)),
        generation_date: Some(first.generated_date),
    }
}

/// Shape of the undirected pair graph of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCoverage {
    /// Keys never seen in first position, so never the seed of a partition.
    pub second_only_keys: BTreeSet<Uuid>,
    /// Connected components of the pair graph.
    pub components: Vec<BTreeSet<Uuid>>,
}

impl KeyCoverage {
    /// Components that no single group contains in full.
    pub fn split_components<'a>(&'a self, groups: &[DuplicateGroup]) -> Vec<&'a BTreeSet<Uuid>> {
        let group_keys: Vec<HashSet<Uuid>> = groups
            .iter()
            .map(|group| group.iter().map(|d| d.key).collect())
            .collect();
        self.components
            .iter()
            .filter(|component| {
                !group_keys
                    .iter()
                    .any(|keys| component.iter().all(|k| keys.contains(k)))
            })
            .collect()
    }
}

pub fn key_coverage(pairs: &[DuplicateDto]) -> KeyCoverage {
    let mut graph: UnGraph<Uuid, ()> = UnGraph::new_undirected();
    let mut nodes: HashMap<Uuid, NodeIndex> = HashMap::new();
    let mut first_keys: HashSet<Uuid> = HashSet::new();

    for dto in pairs {
        first_keys.insert(dto.key1);
        let a = *nodes.entry(dto.key1).or_insert_with(|| graph.add_node(dto.key1));
        let b = *nodes.entry(dto.key2).or_insert_with(|| graph.add_node(dto.key2));
        graph.add_edge(a, b, ());
    }

    let second_only_keys = pairs
        .iter()
        .map(|dto| dto.key2)
        .filter(|key| !first_keys.contains(key))
        .collect();

    let mut components: Vec<BTreeSet<Uuid>> = kosaraju_scc(&graph)
        .into_iter()
        .map(|component| component.into_iter().map(|idx| graph[idx]).collect())
        .collect();
    components.sort();

    KeyCoverage {
        second_only_keys,
        components,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn key(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn pair(k1: Uuid, k2: Uuid) -> DuplicateDto {
        DuplicateDto {
            key1: k1,
            code1: Some(format!("C{}", k1.as_u128())),
            name1: None,
            physical_city1: None,
            physical_country1: None,
            mailing_city1: None,
            mailing_country1: None,
            institution_key1: None,
            key2: k2,
            code2: Some(format!("C{}", k2.as_u128())),
            name2: None,
            physical_city2: None,
            physical_country2: None,
            mailing_city2: None,
            mailing_country2: None,
            institution_key2: None,
            generated_date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn keys_of(group: &DuplicateGroup) -> BTreeSet<Uuid> {
        group.iter().map(|d| d.key).collect()
    }

    #[test]
    fn test_empty_input() {
        let result = group_duplicates(&[]);
        assert!(result.duplicates.is_empty());
        assert!(result.generation_date.is_none());
    }

    #[test]
    fn test_disjoint_pairs_make_separate_groups() {
        let (a, b, c, d) = (key(1), key(2), key(3), key(4));
        let result = group_duplicates(&[pair(a, b), pair(c, d)]);
        assert_eq!(result.duplicates.len(), 2);
        assert_eq!(keys_of(&result.duplicates[0]), BTreeSet::from([a, b]));
        assert_eq!(keys_of(&result.duplicates[1]), BTreeSet::from([c, d]));
        assert_eq!(
            result.generation_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_covered_partitions_are_discarded() {
        let (a, b, c) = (key(1), key(2), key(3));
        let result = group_duplicates(&[pair(a, b), pair(a, c), pair(b, c)]);
        assert_eq!(result.duplicates.len(), 1);
        assert_eq!(keys_of(&result.duplicates[0]), BTreeSet::from([a, b, c]));
    }

    #[test]
    fn test_partitions_sorted_by_size_then_encounter_order() {
        let (a, b, c, d, e, f) = (key(1), key(2), key(3), key(4), key(5), key(6));
        let pairs = [pair(e, f), pair(a, b), pair(a, c), pair(a, d)];
        let partitions = build_partitions(&pairs);
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[0].first_key, a);
        assert_eq!(partitions[0].rows, 3);
        assert_eq!(partitions[0].keys.len(), 4);
        assert_eq!(partitions[1].first_key, e);

        let ties = [pair(e, f), pair(a, b)];
        let partitions = build_partitions(&ties);
        assert_eq!(partitions[0].first_key, e);
        assert_eq!(partitions[1].first_key, a);
    }

    #[test]
    fn test_repeated_rows_weigh_in_commit_order() {
        let (a, b, c) = (key(1), key(2), key(3));
        // a has three rows over two keys, c has two rows over three keys
        let pairs = [pair(a, b), pair(a, b), pair(a, b), pair(c, a), pair(c, b)];
        let partitions = build_partitions(&pairs);
        assert_eq!(partitions[0].first_key, a);
        assert_eq!(partitions[0].rows, 3);
        assert_eq!(partitions[1].first_key, c);

        // {a, b} commits first, so {a, b, c} is not covered and survives
        let result = group_duplicates(&pairs);
        assert_eq!(result.duplicates.len(), 2);
        assert_eq!(keys_of(&result.duplicates[0]), BTreeSet::from([a, b]));
        assert_eq!(keys_of(&result.duplicates[1]), BTreeSet::from([a, b, c]));
    }

    #[test]
    fn test_one_directional_pairs_can_split_a_cluster() {
        let (a, b, c) = (key(1), key(2), key(3));
        // a-b and c-b: b is never first, so no partition holds all three
        let pairs = [pair(a, b), pair(c, b)];
        let result = group_duplicates(&pairs);
        assert_eq!(result.duplicates.len(), 2);

        let coverage = key_coverage(&pairs);
        assert_eq!(coverage.second_only_keys, BTreeSet::from([b]));
        assert_eq!(coverage.components, vec![BTreeSet::from([a, b, c])]);
        assert_eq!(coverage.split_components(&result.duplicates).len(), 1);
    }

    #[test]
    fn test_closed_pairs_have_no_split_components() {
        let (a, b, c) = (key(1), key(2), key(3));
        let pairs = [pair(a, b), pair(a, c), pair(b, c)];
        let result = group_duplicates(&pairs);
        let coverage = key_coverage(&pairs);
        assert_eq!(coverage.second_only_keys, BTreeSet::from([c]));
        assert!(coverage.split_components(&result.duplicates).is_empty());
    }
}
