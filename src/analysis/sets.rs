//! Per-scanner artifact sets and Venn region sizes.

use crate::models::ComponentRecord;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Letter used for the scanner at `index` in plots and reports (A, B, C, ...).
pub fn scanner_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

/// Region sizes of a two-set Venn diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairRegions {
    pub left: String,
    pub right: String,
    pub only_left: usize,
    pub only_right: usize,
    pub both: usize,
}

/// Region sizes of a three-set Venn diagram.
///
/// `sizes` follows the usual subset order `100, 010, 110, 001, 101, 011, 111`
/// where the digits mark membership in the first, second and third set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripleRegions {
    pub names: [String; 3],
    pub sizes: [usize; 7],
}

impl TripleRegions {
    /// Size of the region with the given membership bits.
    pub fn region(&self, in_first: bool, in_second: bool, in_third: bool) -> usize {
        match (in_first, in_second, in_third) {
            (true, false, false) => self.sizes[0],
            (false, true, false) => self.sizes[1],
            (true, true, false) => self.sizes[2],
            (false, false, true) => self.sizes[3],
            (true, false, true) => self.sizes[4],
            (false, true, true) => self.sizes[5],
            (true, true, true) => self.sizes[6],
            (false, false, false) => 0,
        }
    }
}

/// Identity keys reported by each scanner.
#[derive(Debug, Clone, Default)]
pub struct ScannerSets {
    order: Vec<String>,
    sets: BTreeMap<String, BTreeSet<String>>,
}

impl ScannerSets {
    /// Build sets for `scanners`, in that order. Records without an identity
    /// key are ignored; a scanner without records gets an empty set.
    pub fn from_records(records: &[ComponentRecord], scanners: &[String]) -> Self {
        let mut sets: BTreeMap<String, BTreeSet<String>> = scanners
            .iter()
            .map(|s| (s.clone(), BTreeSet::new()))
            .collect();

        for record in records {
            if let (Some(set), Some(key)) = (
                sets.get_mut(&record.scanner_name),
                record.name_version.as_ref(),
            ) {
                set.insert(key.clone());
            }
        }

        Self {
            order: scanners.to_vec(),
            sets,
        }
    }

    pub fn scanners(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, scanner: &str) -> Option<&BTreeSet<String>> {
        self.sets.get(scanner)
    }

    /// Scanners paired with their plot letters.
    pub fn letters(&self) -> Vec<(char, &str)> {
        self.order
            .iter()
            .enumerate()
            .map(|(i, s)| (scanner_letter(i), s.as_str()))
            .collect()
    }

    /// Letter of a scanner, if it is part of the comparison.
    pub fn letter_of(&self, scanner: &str) -> Option<char> {
        self.order
            .iter()
            .position(|s| s == scanner)
            .map(scanner_letter)
    }

    fn set_or_empty(&self, scanner: &str) -> BTreeSet<String> {
        self.sets.get(scanner).cloned().unwrap_or_default()
    }

    /// Regions of the two-set diagram `left` vs `right`.
    pub fn pair(&self, left: &str, right: &str) -> PairRegions {
        let a = self.set_or_empty(left);
        let b = self.set_or_empty(right);

        PairRegions {
            left: left.to_string(),
            right: right.to_string(),
            only_left: a.difference(&b).count(),
            only_right: b.difference(&a).count(),
            both: a.intersection(&b).count(),
        }
    }

    /// A-B, B-C, C-D, ... over the configured scanner order.
    pub fn consecutive_pairs(&self) -> Vec<PairRegions> {
        self.order
            .windows(2)
            .map(|w| self.pair(&w[0], &w[1]))
            .collect()
    }

    /// Regions of the three-set diagram.
    pub fn triple(&self, first: &str, second: &str, third: &str) -> TripleRegions {
        let a = self.set_or_empty(first);
        let b = self.set_or_empty(second);
        let c = self.set_or_empty(third);

        let mut sizes = [0usize; 7];
        let universe: BTreeSet<&String> = a.iter().chain(b.iter()).chain(c.iter()).collect();
        for key in universe {
            let idx = match (a.contains(key), b.contains(key), c.contains(key)) {
                (true, false, false) => 0,
                (false, true, false) => 1,
                (true, true, false) => 2,
                (false, false, true) => 3,
                (true, false, true) => 4,
                (false, true, true) => 5,
                (true, true, true) => 6,
                (false, false, false) => continue,
            };
            sizes[idx] += 1;
        }

        TripleRegions {
            names: [first.to_string(), second.to_string(), third.to_string()],
            sizes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(scanner: &str, key: Option<&str>) -> ComponentRecord {
        ComponentRecord {
            scanner_name: scanner.to_string(),
            name_version: key.map(String::from),
            ..Default::default()
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> ScannerSets {
        let records = vec![
            record("a", Some("x@1")),
            record("a", Some("y@1")),
            record("a", Some("z@1")),
            record("a", None),
            record("b", Some("y@1")),
            record("b", Some("w@1")),
            record("c", Some("z@1")),
            record("c", Some("y@1")),
            record("c", Some("v@1")),
            record("ignored", Some("q@1")),
        ];
        ScannerSets::from_records(&records, &names(&["a", "b", "c"]))
    }

    #[test]
    fn test_pair_regions() {
        let sets = sample();
        let ab = sets.pair("a", "b");
        assert_eq!((ab.only_left, ab.only_right, ab.both), (2, 1, 1));
    }

    #[test]
    fn test_consecutive_pairs() {
        let sets = sample();
        let pairs = sets.consecutive_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].left, "b");
        assert_eq!(pairs[1].right, "c");
        assert_eq!((pairs[1].only_left, pairs[1].only_right, pairs[1].both), (1, 2, 1));
    }

    #[test]
    fn test_triple_regions_order() {
        let sets = sample();
        let t = sets.triple("a", "b", "c");
        // x: a only, w: b only, y: all three, z: a and c, v: c only
        assert_eq!(t.sizes, [1, 1, 0, 1, 1, 0, 1]);
        assert_eq!(t.region(true, true, true), 1);
        assert_eq!(t.region(true, false, true), 1);
        assert_eq!(t.sizes.iter().sum::<usize>(), 5);
    }

    #[test]
    fn test_letters() {
        let sets = sample();
        assert_eq!(sets.letter_of("c"), Some('C'));
        assert_eq!(sets.letter_of("ignored"), None);
        assert_eq!(sets.letters()[1], ('B', "b"));
    }

    #[test]
    fn test_missing_scanner_has_empty_set() {
        let sets = ScannerSets::from_records(&[], &names(&["a", "b"]));
        assert_eq!(sets.get("a").map(|s| s.len()), Some(0));
        let ab = sets.pair("a", "missing");
        assert_eq!((ab.only_left, ab.only_right, ab.both), (0, 0, 0));
    }
}
