//! CPU affinity list parsing
//!
//! Proxmox stores a VM's pinning as a comma separated list of cores and
//! ranges, e.g. `0,2-4,7`. Ranges are read as `start..end`: the upper bound
//! is not part of the set, so `2-4` pins cores 2 and 3.
//!
//! Every token is checked up front, cores are only expanded on iteration.

use std::ops::RangeInclusive;

/// Raised for a token that is neither a core number nor a range
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AffinityError {
    #[error("Invalid affinity token {0:?}")]
    InvalidToken(String),
}

/// A parsed affinity list, one span per token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Affinity {
    spans: Vec<RangeInclusive<u32>>,
}

impl Affinity {
    /// Core indices in list order, duplicates kept
    pub fn cores(&self) -> impl Iterator<Item = u32> + '_ {
        self.spans.iter().cloned().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(RangeInclusive::is_empty)
    }
}

/// Parse an affinity list.
///
/// An empty list yields no cores. A range whose start is not below its end
/// (`5-3`, `4-4`) yields no cores either.
pub fn parse(spec: &str) -> Result<Affinity, AffinityError> {
    let mut affinity = Affinity::default();
    if spec.trim().is_empty() {
        return Ok(affinity);
    }

    for token in spec.split(',').map(str::trim) {
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            let core = parse_core(token)?;
            affinity.spans.push(core..=core);
            continue;
        }

        let (start, end) = token
            .split_once('-')
            .ok_or_else(|| AffinityError::InvalidToken(token.to_string()))?;
        let (start, end) = (parse_core(start.trim())?, parse_core(end.trim())?);
        let span = if start < end { start..=end - 1 } else { empty_span() };
        affinity.spans.push(span);
    }

    Ok(affinity)
}

/// Same as [`parse`] for an optional list, absent meaning no cores
pub fn parse_optional(spec: Option<&str>) -> Result<Affinity, AffinityError> {
    spec.map_or_else(|| Ok(Affinity::default()), parse)
}

#[allow(clippy::reversed_empty_ranges)]
fn empty_span() -> RangeInclusive<u32> {
    1..=0
}

fn parse_core(token: &str) -> Result<u32, AffinityError> {
    token
        .parse()
        .map_err(|_| AffinityError::InvalidToken(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(spec: &str) -> Vec<u32> {
        parse(spec).unwrap().cores().collect()
    }

    #[test]
    fn test_singles_and_ranges() {
        assert_eq!(expand("0,2-4,7"), vec![0, 2, 3, 7]);
        assert_eq!(expand("3"), vec![3]);
        assert_eq!(expand("8-12"), vec![8, 9, 10, 11]);
    }

    #[test]
    fn test_range_upper_bound_excluded() {
        assert_eq!(expand("0,2-4"), vec![0, 2, 3]);
        assert_eq!(expand("4-5"), vec![4]);
        assert!(parse("4-4").unwrap().is_empty());
        assert!(parse("0-0").unwrap().is_empty());
    }

    #[test]
    fn test_empty_and_absent() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse_optional(None).unwrap().is_empty());
        let listed: Vec<u32> = parse_optional(Some("1,2")).unwrap().cores().collect();
        assert_eq!(listed, vec![1, 2]);
    }

    #[test]
    fn test_reversed_range_is_empty() {
        assert!(parse("5-3").unwrap().is_empty());
        assert_eq!(expand("1,5-3,2"), vec![1, 2]);
    }

    #[test]
    fn test_duplicates_and_overlaps_kept() {
        assert_eq!(expand("1,1,0-3,2-4"), vec![1, 1, 0, 1, 2, 2, 3]);
    }

    #[test]
    fn test_whitespace_around_tokens() {
        assert_eq!(expand(" 0, 2 - 4 "), vec![0, 2, 3]);
    }

    #[test]
    fn test_huge_range_is_expanded_lazily() {
        let affinity = parse("0-4294967295").unwrap();
        assert!(!affinity.is_empty());
        assert_eq!(affinity.cores().take(3).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(affinity.spans, vec![0..=u32::MAX - 1]);

        let top = parse("4294967295").unwrap();
        assert_eq!(top.cores().collect::<Vec<_>>(), vec![u32::MAX]);
    }

    #[test]
    fn test_malformed_tokens() {
        assert_eq!(parse("abc"), Err(AffinityError::InvalidToken("abc".to_string())));
        assert_eq!(parse("1-x"), Err(AffinityError::InvalidToken("x".to_string())));
        assert_eq!(parse("0,,2"), Err(AffinityError::InvalidToken(String::new())));
        assert_eq!(parse("-3"), Err(AffinityError::InvalidToken(String::new())));
        // Out of u32 range
        assert_eq!(
            parse("0-4294967296"),
            Err(AffinityError::InvalidToken("4294967296".to_string()))
        );
    }
}
