//! Database scope overlap detection
//!
//! A scope is a database name as written in a grant: either a literal name or
//! a `LIKE`-style pattern. `%` matches any run of characters (including none),
//! `_` matches exactly one character and `\` makes the next character literal.
//! Matching is case-sensitive.
//!
//! Two scopes overlap when at least one database name is matched by both.
//! This is decided by searching the product of the two pattern automata for a
//! path from the start state to the accepting state.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token {
    Literal(char),
    /// `_`
    One,
    /// `%`
    Many,
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => tokens.push(Token::Literal(chars.next().unwrap_or('\\'))),
            '%' => {
                // consecutive `%` are equivalent to one
                if tokens.last() != Some(&Token::Many) {
                    tokens.push(Token::Many);
                }
            }
            '_' => tokens.push(Token::One),
            c => tokens.push(Token::Literal(c)),
        }
    }

    tokens
}

/// Whether two tokens can consume the same character
fn compatible(a: Token, b: Token) -> bool {
    match (a, b) {
        (Token::Literal(x), Token::Literal(y)) => x == y,
        _ => true,
    }
}

/// Whether scopes `a` and `b` can both match the same database name
pub fn overlaps(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }

    let a = tokenize(a);
    let b = tokenize(b);
    let (n, m) = (a.len(), b.len());

    let mut visited = vec![false; (n + 1) * (m + 1)];
    let mut queue = VecDeque::from([(0usize, 0usize)]);

    while let Some((i, j)) = queue.pop_front() {
        let idx = i * (m + 1) + j;
        if visited[idx] {
            continue;
        }
        visited[idx] = true;

        if i == n && j == m {
            return true;
        }

        // `%` matching the empty string
        if i < n && a[i] == Token::Many {
            queue.push_back((i + 1, j));
        }
        if j < m && b[j] == Token::Many {
            queue.push_back((i, j + 1));
        }

        // both sides consume one common character
        if i < n && j < m && compatible(a[i], b[j]) {
            let ni = if a[i] == Token::Many { i } else { i + 1 };
            let nj = if b[j] == Token::Many { j } else { j + 1 };
            queue.push_back((ni, nj));
        }
    }

    false
}

/// One pair of overlapping scopes
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OverlapFinding {
    /// A requested scope overlaps a scope that already has a rule
    NewVsExisting { new: String, existing: String },
    /// Two requested scopes overlap each other; `first <= second`
    NewVsNew { first: String, second: String },
}

impl OverlapFinding {
    /// The overlapping scopes as an unordered (sorted) pair
    pub fn pair(&self) -> (&str, &str) {
        let (x, y) = match self {
            OverlapFinding::NewVsExisting { new, existing } => (new.as_str(), existing.as_str()),
            OverlapFinding::NewVsNew { first, second } => (first.as_str(), second.as_str()),
        };
        if x <= y { (x, y) } else { (y, x) }
    }
}

impl fmt::Display for OverlapFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapFinding::NewVsExisting { new, existing } => write!(
                f,
                "database [`{}`] in the new rules overlaps database [`{}`] in an existing rule, grants may conflict",
                new, existing
            ),
            OverlapFinding::NewVsNew { first, second } => write!(
                f,
                "database [`{}`] in the new rules overlaps database [`{}`] in the new rules, grants may conflict",
                first, second
            ),
        }
    }
}

/// Find overlaps of requested scopes against existing scopes and among
/// themselves.
///
/// Identical strings are skipped: exact duplicates and exact collisions are
/// reported by the preflight check. Each requested/existing pair and each
/// unordered pair of requested scopes is reported at most once.
pub fn find_overlaps(new_scopes: &[String], existing_scopes: &[String]) -> Vec<OverlapFinding> {
    let mut against_existing = BTreeSet::new();
    for new in new_scopes {
        for existing in existing_scopes {
            if new != existing && overlaps(new, existing) {
                against_existing.insert((new.clone(), existing.clone()));
            }
        }
    }
    let mut findings: Vec<OverlapFinding> = against_existing
        .into_iter()
        .map(|(new, existing)| OverlapFinding::NewVsExisting { new, existing })
        .collect();

    let mut pairs = BTreeSet::new();
    for (idx, first) in new_scopes.iter().enumerate() {
        for second in &new_scopes[idx + 1..] {
            if first != second && overlaps(first, second) {
                let pair = if first <= second {
                    (first.clone(), second.clone())
                } else {
                    (second.clone(), first.clone())
                };
                pairs.insert(pair);
            }
        }
    }
    findings.extend(
        pairs
            .into_iter()
            .map(|(first, second)| OverlapFinding::NewVsNew { first, second }),
    );

    findings
}

/// Render findings one per line
pub fn render_findings(findings: &[OverlapFinding]) -> String {
    findings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scopes(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match_overlaps() {
        assert!(overlaps("db1", "db1"));
        assert!(overlaps("db%", "db%"));
    }

    #[test]
    fn test_distinct_literals_do_not_overlap() {
        assert!(!overlaps("db1", "db2"));
        assert!(!overlaps("db1", "db10"));
    }

    #[test]
    fn test_percent_wildcard() {
        assert!(overlaps("a%", "ab"));
        assert!(overlaps("ab", "a%"));
        assert!(overlaps("%", "anything"));
        assert!(overlaps("db%", "db"));
        assert!(!overlaps("db%", "da1"));
    }

    #[test]
    fn test_underscore_wildcard() {
        assert!(overlaps("db_1", "dbx1"));
        assert!(!overlaps("db_1", "db1"));
        assert!(!overlaps("db_", "db"));
    }

    #[test]
    fn test_two_patterns() {
        assert!(overlaps("a%", "%b"));
        assert!(overlaps("a%c", "ab%"));
        assert!(!overlaps("a%", "b%"));
        assert!(!overlaps("%a", "%b"));
        assert!(overlaps("a_c%", "%bc"));
    }

    #[test]
    fn test_escaped_wildcards_are_literal() {
        assert!(!overlaps("db\\_1", "dbx1"));
        assert!(overlaps("db\\_1", "db_1"));
        assert!(!overlaps("db\\%", "dbx"));
        assert!(overlaps("db\\%", "db%"));
    }

    #[test]
    fn test_find_overlaps_symmetry() {
        let forward = find_overlaps(&scopes(&["a%"]), &scopes(&["ab"]));
        let backward = find_overlaps(&scopes(&["ab"]), &scopes(&["a%"]));
        assert_eq!(forward.len(), 1);
        assert_eq!(backward.len(), 1);
        assert_eq!(forward[0].pair(), backward[0].pair());
    }

    #[test]
    fn test_find_overlaps_new_pairs_once() {
        let findings = find_overlaps(&scopes(&["a%", "ab", "abc"]), &[]);
        let pairs: BTreeSet<(&str, &str)> = findings.iter().map(|f| f.pair()).collect();
        // "ab" and "abc" are distinct literals
        assert_eq!(findings.len(), 2);
        assert_eq!(pairs, BTreeSet::from([("a%", "ab"), ("a%", "abc")]));
        assert!(
            findings
                .iter()
                .all(|f| matches!(f, OverlapFinding::NewVsNew { .. }))
        );
    }

    #[test]
    fn test_find_overlaps_repeated_scope_reported_once() {
        let findings = find_overlaps(&scopes(&["a%", "a%"]), &scopes(&["ab"]));
        assert_eq!(
            findings,
            vec![OverlapFinding::NewVsExisting {
                new: "a%".to_string(),
                existing: "ab".to_string(),
            }]
        );
    }

    #[test]
    fn test_find_overlaps_skips_identical() {
        assert!(find_overlaps(&scopes(&["db1"]), &scopes(&["db1"])).is_empty());
        assert!(find_overlaps(&scopes(&["db1", "db1"]), &[]).is_empty());
    }

    #[test]
    fn test_find_overlaps_mixed() {
        let findings = find_overlaps(&scopes(&["db%", "db_a"]), &scopes(&["dbx", "other"]));
        let pairs: BTreeSet<(&str, &str)> = findings.iter().map(|f| f.pair()).collect();
        assert_eq!(
            pairs,
            BTreeSet::from([("db%", "db_a"), ("db%", "dbx")])
        );
    }

    #[test]
    fn test_find_overlaps_does_not_mutate_inputs() {
        let new = scopes(&["b%", "a%"]);
        let existing = scopes(&["ab"]);
        let _ = find_overlaps(&new, &existing);
        assert_eq!(new, scopes(&["b%", "a%"]));
        assert_eq!(existing, scopes(&["ab"]));
    }

    #[test]
    fn test_render_findings() {
        let findings = find_overlaps(&scopes(&["a%"]), &scopes(&["ab"]));
        let text = render_findings(&findings);
        assert!(text.contains("[`a%`]"));
        assert!(text.contains("[`ab`]"));
        assert!(!text.contains('\n'));
    }

    proptest! {
        #[test]
        fn prop_overlaps_is_symmetric(a in "[ab_%]{0,6}", b in "[ab_%]{0,6}") {
            prop_assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
        }

        #[test]
        fn prop_overlaps_is_reflexive(a in "[a-c_%]{0,8}") {
            prop_assert!(overlaps(&a, &a));
        }

        #[test]
        fn prop_literal_overlap_is_equality(a in "[ab]{0,5}", b in "[ab]{0,5}") {
            prop_assert_eq!(overlaps(&a, &b), a == b);
        }

        #[test]
        fn prop_percent_overlaps_everything(a in "[ab_%]{0,6}") {
            prop_assert!(overlaps("%", &a));
        }

        #[test]
        fn prop_new_pairs_reported_once(items in proptest::collection::vec("[ab_%]{1,3}", 0..5)) {
            let findings = find_overlaps(&items, &[]);
            let pairs: BTreeSet<(&str, &str)> = findings.iter().map(|f| f.pair()).collect();
            prop_assert_eq!(pairs.len(), findings.len());
        }
    }
}
