// crates/reproduce-providers/src/semver.rs
// ============================================================================
// Module: Semver Ranges
// Description: Semantic version parsing and registry range matching.
// Purpose: Select the version a range spec resolves to from a packument.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Implements the subset of node-style semver the registry uses for range
//! specs: exact versions, x-ranges, caret and tilde ranges, primitive
//! comparators, hyphen ranges, and `||` unions. Ranges are desugared into
//! comparator sets at parse time.
//!
//! Prerelease versions only satisfy a range when some comparator in the
//! matching set carries a prerelease on the same `major.minor.patch` tuple.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Semver parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemverError {
    /// Input is not a valid semantic version.
    #[error("invalid version: {0}")]
    Version(String),
    /// Input is not a valid range.
    #[error("invalid range: {0}")]
    Range(String),
}

// ============================================================================
// SECTION: Versions
// ============================================================================

/// Prerelease identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// Numeric identifier, compared by value.
    Numeric(u64),
    /// Alphanumeric identifier, compared lexically.
    Alphanumeric(String),
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(left), Self::Numeric(right)) => left.cmp(right),
            (Self::Numeric(_), Self::Alphanumeric(_)) => Ordering::Less,
            (Self::Alphanumeric(_), Self::Numeric(_)) => Ordering::Greater,
            (Self::Alphanumeric(left), Self::Alphanumeric(right)) => left.cmp(right),
        }
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(value) => write!(f, "{value}"),
            Self::Alphanumeric(value) => f.write_str(value),
        }
    }
}

/// Semantic version. Build metadata is discarded at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
    /// Prerelease identifiers; empty for releases.
    pub prerelease: Vec<Identifier>,
}

impl Version {
    /// Creates a release version.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: Vec::new(),
        }
    }

    /// Parses a version, accepting a leading `v` or `=`.
    ///
    /// # Errors
    ///
    /// Returns [`SemverError::Version`] when the input is not `major.minor.patch`
    /// with optional prerelease and build suffixes.
    pub fn parse(input: &str) -> Result<Self, SemverError> {
        let invalid = || SemverError::Version(input.to_string());
        let partial = Partial::parse(input).ok_or_else(invalid)?;
        match partial {
            Partial {
                major: Some(major),
                minor: Some(minor),
                patch: Some(patch),
                prerelease,
            } => Ok(Self {
                major,
                minor,
                patch,
                prerelease,
            }),
            _ => Err(invalid()),
        }
    }

    /// Returns true when the version carries prerelease identifiers.
    #[must_use]
    pub const fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// Returns true when both versions share `major.minor.patch`.
    const fn same_release(&self, other: &Self) -> bool {
        self.major == other.major && self.minor == other.minor && self.patch == other.patch
    }

    /// Lowest possible version on a release tuple (`x.y.z-0`).
    fn floor(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: vec![Identifier::Numeric(0)],
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch)).then_with(|| {
            match (self.prerelease.is_empty(), other.prerelease.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.prerelease.cmp(&other.prerelease),
            }
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        for (index, identifier) in self.prerelease.iter().enumerate() {
            f.write_str(if index == 0 { "-" } else { "." })?;
            write!(f, "{identifier}")?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Ranges
// ============================================================================

/// Comparison operator of a primitive comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    /// Exactly equal.
    Eq,
    /// Strictly greater.
    Gt,
    /// Greater or equal.
    Gte,
    /// Strictly less.
    Lt,
    /// Less or equal.
    Lte,
}

/// Primitive comparator.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Comparator {
    /// Operator.
    op: Op,
    /// Operand.
    version: Version,
}

impl Comparator {
    /// Creates a comparator.
    const fn new(op: Op, version: Version) -> Self {
        Self {
            op,
            version,
        }
    }

    /// Tests a version against this comparator.
    fn matches(&self, version: &Version) -> bool {
        let ordering = version.cmp(&self.version);
        match self.op {
            Op::Eq => ordering == Ordering::Equal,
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Parsed semver range: a union of comparator intersections.
///
/// # Invariants
/// - An empty comparator set matches every release version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    /// Alternatives joined by `||`.
    sets: Vec<Vec<Comparator>>,
}

impl Range {
    /// Parses a range expression.
    ///
    /// # Errors
    ///
    /// Returns [`SemverError::Range`] when any alternative cannot be parsed.
    pub fn parse(input: &str) -> Result<Self, SemverError> {
        let sets = input
            .split("||")
            .map(|alternative| parse_set(alternative.trim()).ok_or_else(|| SemverError::Range(input.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            sets,
        })
    }

    /// Returns true when the version satisfies the range.
    #[must_use]
    pub fn satisfies(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set_matches(set, version))
    }

    /// Returns the highest version satisfying the range.
    pub fn max_satisfying<'a, I>(&self, versions: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        versions.into_iter().filter(|version| self.satisfies(version)).max()
    }
}

/// Tests a version against one comparator set, applying the prerelease rule.
fn set_matches(set: &[Comparator], version: &Version) -> bool {
    if !set.iter().all(|comparator| comparator.matches(version)) {
        return false;
    }
    if !version.is_prerelease() {
        return true;
    }
    set.iter().any(|comparator| comparator.version.is_prerelease() && comparator.version.same_release(version))
}

/// Parses one `||` alternative into a comparator set.
fn parse_set(input: &str) -> Option<Vec<Comparator>> {
    if input.is_empty() {
        return Some(Vec::new());
    }
    if let Some((lower, upper)) = input.split_once(" - ") {
        return hyphen_range(lower.trim(), upper.trim());
    }

    let mut comparators = Vec::new();
    let mut pending_operator: Option<&str> = None;
    for token in input.split_whitespace() {
        if is_bare_operator(token) {
            if pending_operator.is_some() {
                return None;
            }
            pending_operator = Some(token);
            continue;
        }
        let primitive = match pending_operator.take() {
            Some(operator) => format!("{operator}{token}"),
            None => token.to_string(),
        };
        comparators.extend(parse_primitive(&primitive)?);
    }
    if pending_operator.is_some() {
        return None;
    }
    Some(comparators)
}

/// Returns true for tokens made only of operator characters.
fn is_bare_operator(token: &str) -> bool {
    matches!(token, "<" | "<=" | ">" | ">=" | "=" | "~" | "~>" | "^")
}

/// Desugars a single range primitive into comparators.
fn parse_primitive(token: &str) -> Option<Vec<Comparator>> {
    const OPERATORS: [&str; 8] = [">=", "<=", "~>", ">", "<", "=", "~", "^"];
    let (operator, rest) = OPERATORS
        .iter()
        .find_map(|operator| token.strip_prefix(operator).map(|rest| (*operator, rest)))
        .unwrap_or(("", token));
    let partial = Partial::parse(rest.trim())?;
    match operator {
        "" | "=" => x_range(partial),
        "~" | "~>" => tilde_range(partial),
        "^" => caret_range(partial),
        ">" => greater_than(partial),
        ">=" => greater_or_equal(partial),
        "<" => less_than(partial),
        "<=" => less_or_equal(partial),
        _ => None,
    }
}

/// Desugars `1`, `1.2`, `1.2.3`, `1.x`, and `*`.
fn x_range(partial: Partial) -> Option<Vec<Comparator>> {
    Some(match partial.components() {
        (None, _, _) => Vec::new(),
        (Some(major), None, _) => vec![
            Comparator::new(Op::Gte, Version::new(major, 0, 0)),
            Comparator::new(Op::Lt, Version::floor(major.checked_add(1)?, 0, 0)),
        ],
        (Some(major), Some(minor), None) => vec![
            Comparator::new(Op::Gte, Version::new(major, minor, 0)),
            Comparator::new(Op::Lt, Version::floor(major, minor.checked_add(1)?, 0)),
        ],
        (Some(_), Some(_), Some(_)) => vec![Comparator::new(Op::Eq, partial.into_version()?)],
    })
}

/// Desugars `~1.2.3`: patch-level changes only.
fn tilde_range(partial: Partial) -> Option<Vec<Comparator>> {
    match partial.components() {
        (Some(major), Some(minor), Some(_)) => Some(vec![
            Comparator::new(Op::Gte, partial.into_version()?),
            Comparator::new(Op::Lt, Version::floor(major, minor.checked_add(1)?, 0)),
        ]),
        _ => x_range(partial),
    }
}

/// Desugars `^1.2.3`: changes that keep the leftmost non-zero component.
fn caret_range(partial: Partial) -> Option<Vec<Comparator>> {
    match partial.components() {
        (Some(0), Some(minor), None) => Some(vec![
            Comparator::new(Op::Gte, Version::new(0, minor, 0)),
            Comparator::new(Op::Lt, Version::floor(0, minor.checked_add(1)?, 0)),
        ]),
        (Some(major), Some(minor), None) => Some(vec![
            Comparator::new(Op::Gte, Version::new(major, minor, 0)),
            Comparator::new(Op::Lt, Version::floor(major.checked_add(1)?, 0, 0)),
        ]),
        (Some(major), Some(minor), Some(patch)) => {
            let upper = if major > 0 {
                Version::floor(major.checked_add(1)?, 0, 0)
            } else if minor > 0 {
                Version::floor(0, minor.checked_add(1)?, 0)
            } else {
                Version::floor(0, 0, patch.checked_add(1)?)
            };
            Some(vec![Comparator::new(Op::Gte, partial.into_version()?), Comparator::new(Op::Lt, upper)])
        }
        _ => x_range(partial),
    }
}

/// Desugars `>1.2`.
fn greater_than(partial: Partial) -> Option<Vec<Comparator>> {
    Some(match partial.components() {
        (None, _, _) => vec![Comparator::new(Op::Lt, Version::floor(0, 0, 0))],
        (Some(major), None, _) => vec![Comparator::new(Op::Gte, Version::new(major.checked_add(1)?, 0, 0))],
        (Some(major), Some(minor), None) => {
            vec![Comparator::new(Op::Gte, Version::new(major, minor.checked_add(1)?, 0))]
        }
        (Some(_), Some(_), Some(_)) => vec![Comparator::new(Op::Gt, partial.into_version()?)],
    })
}

/// Desugars `>=1.2`.
fn greater_or_equal(partial: Partial) -> Option<Vec<Comparator>> {
    Some(match partial.components() {
        (None, _, _) => Vec::new(),
        (Some(major), None, _) => vec![Comparator::new(Op::Gte, Version::new(major, 0, 0))],
        (Some(major), Some(minor), None) => vec![Comparator::new(Op::Gte, Version::new(major, minor, 0))],
        (Some(_), Some(_), Some(_)) => vec![Comparator::new(Op::Gte, partial.into_version()?)],
    })
}

/// Desugars `<1.2`.
fn less_than(partial: Partial) -> Option<Vec<Comparator>> {
    Some(match partial.components() {
        (None, _, _) => vec![Comparator::new(Op::Lt, Version::floor(0, 0, 0))],
        (Some(major), None, _) => vec![Comparator::new(Op::Lt, Version::floor(major, 0, 0))],
        (Some(major), Some(minor), None) => vec![Comparator::new(Op::Lt, Version::floor(major, minor, 0))],
        (Some(_), Some(_), Some(_)) => vec![Comparator::new(Op::Lt, partial.into_version()?)],
    })
}

/// Desugars `<=1.2`.
fn less_or_equal(partial: Partial) -> Option<Vec<Comparator>> {
    Some(match partial.components() {
        (None, _, _) => Vec::new(),
        (Some(major), None, _) => vec![Comparator::new(Op::Lt, Version::floor(major.checked_add(1)?, 0, 0))],
        (Some(major), Some(minor), None) => {
            vec![Comparator::new(Op::Lt, Version::floor(major, minor.checked_add(1)?, 0))]
        }
        (Some(_), Some(_), Some(_)) => vec![Comparator::new(Op::Lte, partial.into_version()?)],
    })
}

/// Desugars `1.2.3 - 2.3`.
fn hyphen_range(lower: &str, upper: &str) -> Option<Vec<Comparator>> {
    let mut comparators = greater_or_equal(Partial::parse(lower)?)?;
    comparators.extend(less_or_equal(Partial::parse(upper)?)?);
    Some(comparators)
}

// ============================================================================
// SECTION: Partial Versions
// ============================================================================

/// Version with optional trailing components (`1`, `1.2`, `1.x`).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Partial {
    /// Major component; `None` for wildcards.
    major: Option<u64>,
    /// Minor component.
    minor: Option<u64>,
    /// Patch component.
    patch: Option<u64>,
    /// Prerelease identifiers, only present on complete versions.
    prerelease: Vec<Identifier>,
}

impl Partial {
    /// Parses a partial version. Components after a wildcard are wildcards.
    fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('v').or_else(|| trimmed.strip_prefix('=')).unwrap_or(trimmed).trim();
        let (without_build, build) = match trimmed.split_once('+') {
            Some((head, build)) => (head, Some(build)),
            None => (trimmed, None),
        };
        if let Some(build) = build
            && !valid_identifiers(build)
        {
            return None;
        }
        let (core, prerelease) = match without_build.split_once('-') {
            Some((core, prerelease)) => (core, Some(prerelease)),
            None => (without_build, None),
        };

        let mut components = [None; 3];
        if !core.is_empty() {
            let parts: Vec<&str> = core.split('.').collect();
            if parts.len() > 3 {
                return None;
            }
            let mut wildcard = false;
            for (slot, part) in components.iter_mut().zip(parts) {
                if matches!(part, "x" | "X" | "*") {
                    wildcard = true;
                    continue;
                }
                if wildcard {
                    return None;
                }
                *slot = Some(parse_numeric(part)?);
            }
        }

        let prerelease = match prerelease {
            Some(text) => {
                if components.iter().any(Option::is_none) || !valid_identifiers(text) {
                    return None;
                }
                text.split('.').map(parse_identifier).collect::<Option<Vec<_>>>()?
            }
            None => Vec::new(),
        };
        let [major, minor, patch] = components;
        Some(Self {
            major,
            minor,
            patch,
            prerelease,
        })
    }

    /// Returns the numeric components.
    const fn components(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        (self.major, self.minor, self.patch)
    }

    /// Converts a complete partial into a version.
    fn into_version(self) -> Option<Version> {
        Some(Version {
            major: self.major?,
            minor: self.minor?,
            patch: self.patch?,
            prerelease: self.prerelease,
        })
    }
}

/// Parses a numeric component without leading zeros.
fn parse_numeric(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    if part.len() > 1 && part.starts_with('0') {
        return None;
    }
    part.parse().ok()
}

/// Parses one prerelease identifier.
fn parse_identifier(part: &str) -> Option<Identifier> {
    if part.bytes().all(|byte| byte.is_ascii_digit()) {
        return parse_numeric(part).map(Identifier::Numeric);
    }
    Some(Identifier::Alphanumeric(part.to_string()))
}

/// Returns true when every dot-separated identifier is non-empty and `[0-9A-Za-z-]`.
fn valid_identifiers(text: &str) -> bool {
    text.split('.')
        .all(|part| !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'-'))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    fn version(input: &str) -> Version {
        Version::parse(input).unwrap()
    }

    fn satisfies(range: &str, input: &str) -> bool {
        Range::parse(range).unwrap().satisfies(&version(input))
    }

    #[test]
    fn version_ordering_follows_precedence() {
        let ordered = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
            "1.0.1",
            "1.10.0",
            "2.0.0",
        ];
        for pair in ordered.windows(2) {
            assert!(version(pair[0]) < version(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn version_parse_rejects_malformed_input() {
        for input in ["", "1", "1.2", "01.2.3", "1.2.3.4", "1.2.x", "1.2.3-", "1.2.3-a..b", "a.b.c"] {
            assert!(Version::parse(input).is_err(), "{input}");
        }
        assert_eq!(version("v1.2.3+build.5"), Version::new(1, 2, 3));
        assert_eq!(version("1.2.3-rc.1").to_string(), "1.2.3-rc.1");
    }

    #[test]
    fn caret_ranges() {
        assert!(satisfies("^1.2.3", "1.9.0"));
        assert!(!satisfies("^1.2.3", "2.0.0"));
        assert!(!satisfies("^1.2.3", "1.2.2"));
        assert!(satisfies("^0.2.3", "0.2.9"));
        assert!(!satisfies("^0.2.3", "0.3.0"));
        assert!(satisfies("^0.0.3", "0.0.3"));
        assert!(!satisfies("^0.0.3", "0.0.4"));
        assert!(satisfies("^1.x", "1.4.0"));
        assert!(satisfies("^0.0", "0.0.7"));
        assert!(!satisfies("^0.0", "0.1.0"));
    }

    #[test]
    fn tilde_and_x_ranges() {
        assert!(satisfies("~1.2.3", "1.2.9"));
        assert!(!satisfies("~1.2.3", "1.3.0"));
        assert!(satisfies("~1", "1.9.9"));
        assert!(satisfies("1.x", "1.0.0"));
        assert!(!satisfies("1.x", "2.0.0"));
        assert!(satisfies("1.2", "1.2.5"));
        assert!(satisfies("*", "3.4.5"));
        assert!(satisfies("", "0.0.1"));
    }

    #[test]
    fn comparator_and_hyphen_ranges() {
        assert!(satisfies(">=1.2.0 <2", "1.5.0"));
        assert!(!satisfies(">=1.2.0 <2", "2.0.0"));
        assert!(satisfies(">= 1.2.0", "1.2.0"));
        assert!(satisfies(">1", "2.0.0"));
        assert!(!satisfies(">1", "1.9.9"));
        assert!(satisfies("<=1.2", "1.2.9"));
        assert!(!satisfies("<=1.2", "1.3.0"));
        assert!(satisfies("1.2.3 - 2.3", "2.3.9"));
        assert!(!satisfies("1.2.3 - 2.3", "2.4.0"));
        assert!(satisfies("1.x || >=2.5.0", "2.6.0"));
        assert!(!satisfies("1.x || >=2.5.0", "2.4.0"));
    }

    #[test]
    fn prereleases_need_a_matching_tuple() {
        assert!(!satisfies("^1.0.0", "1.1.0-beta"));
        assert!(!satisfies("*", "1.0.0-rc.1"));
        assert!(satisfies("^1.2.3-beta.1", "1.2.3-beta.2"));
        assert!(!satisfies("^1.2.3-beta.1", "1.2.4-beta.1"));
        assert!(!satisfies("<2.0.0", "2.0.0-rc.1"));
    }

    #[test]
    fn max_satisfying_picks_highest() {
        let versions: Vec<Version> = ["1.0.0", "1.4.2", "1.10.0", "2.0.0", "1.11.0-beta"].map(version).into();
        let range = Range::parse("^1.0.0").unwrap();
        assert_eq!(range.max_satisfying(&versions), Some(&version("1.10.0")));
        assert_eq!(Range::parse("^3").unwrap().max_satisfying(&versions), None);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        for input in ["^", ">= >= 1", "1.2.3.4", "~a.b", "x.1", "1.2.3 -"] {
            assert!(Range::parse(input).is_err(), "{input}");
        }
    }
}
