use core::fmt;
use std::str::FromStr;

use nom::{
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res},
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::VersionError;

/// A parsed `major.minor.patch` version.
///
/// Field order matters: the derived `Ord` compares `major`, then `minor`,
/// then `patch`, which is exactly semantic-version precedence for plain
/// three-number versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemanticVersion {
    /// The version every context starts from before a backend is known.
    pub const ZERO: SemanticVersion = SemanticVersion::new(0, 0, 0);

    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// True when `self` is at least `minimum`.
    pub fn satisfies(&self, minimum: &SemanticVersion) -> bool {
        satisfies(self, minimum)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemanticVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

fn segment(i: &str) -> IResult<&str, u64> {
    map_res(digit1, |digits: &str| digits.parse::<u64>())(i)
}

fn semantic_version(i: &str) -> IResult<&str, SemanticVersion> {
    let (i, (major, minor, patch)) = tuple((
        segment,
        preceded(char('.'), segment),
        preceded(char('.'), segment),
    ))(i)?;
    Ok((i, SemanticVersion::new(major, minor, patch)))
}

/// Parses `<major>.<minor>.<patch>`.
///
/// Exactly three decimal segments, nothing before or after. Pre-release
/// tags, build metadata, a leading `v` and surrounding whitespace are all
/// rejected rather than truncated. Leading zeros are fine (`2.09.0` is 2.9.0).
pub fn parse(input: &str) -> Result<SemanticVersion, VersionError> {
    all_consuming(semantic_version)(input)
        .map(|(_, version)| version)
        .map_err(|_| VersionError::MalformedVersion {
            input: input.to_string(),
        })
}

/// `candidate >= minimum`, equality included.
pub fn satisfies(candidate: &SemanticVersion, minimum: &SemanticVersion) -> bool {
    candidate >= minimum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_versions() {
        assert_eq!(parse("3.4.0").unwrap(), SemanticVersion::new(3, 4, 0));
        assert_eq!(parse("0.0.0").unwrap(), SemanticVersion::ZERO);
        assert_eq!(parse("2.10.0").unwrap(), SemanticVersion::new(2, 10, 0));
        assert_eq!(
            parse("12.345.6789").unwrap(),
            SemanticVersion::new(12, 345, 6789)
        );
    }

    #[test]
    fn test_parse_leading_zeros() {
        assert_eq!(parse("2.09.0").unwrap(), SemanticVersion::new(2, 9, 0));
        assert_eq!(parse("002.000.001").unwrap(), SemanticVersion::new(2, 0, 1));
    }

    #[test]
    fn test_parse_rejects_wrong_segment_count() {
        assert!(parse("3.4").is_err());
        assert!(parse("3").is_err());
        assert!(parse("3.4.0.1").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        for input in [
            "3.4.0-beta.1",
            "3.4.0+build5",
            "v3.4.0",
            " 3.4.0",
            "3.4.0 ",
            "3..0",
            "3.x.0",
            "-1.0.0",
            "+1.0.0",
            "latest",
            "not-a-version",
        ] {
            assert!(parse(input).is_err(), "{input:?} should not parse");
        }
    }

    #[test]
    fn test_parse_rejects_overflowing_segment() {
        assert!(parse("18446744073709551616.0.0").is_err());
        assert_eq!(
            parse("18446744073709551615.0.0").unwrap().major,
            u64::MAX
        );
    }

    #[test]
    fn test_malformed_error_carries_input() {
        let err = parse("3.4").unwrap_err();
        assert_eq!(
            err,
            VersionError::MalformedVersion {
                input: "3.4".to_string()
            }
        );
        assert!(err.to_string().contains("\"3.4\""));
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(parse("3.4.0").unwrap().to_string(), "3.4.0");
        assert_eq!(parse("02.09.00").unwrap().to_string(), "2.9.0");
    }

    #[test]
    fn test_from_str() {
        let v: SemanticVersion = "3.5.1".parse().unwrap();
        assert_eq!(v, SemanticVersion::new(3, 5, 1));
        assert!("3.5".parse::<SemanticVersion>().is_err());
    }

    #[test]
    fn test_satisfies() {
        let min = SemanticVersion::new(3, 4, 0);
        assert!(satisfies(&SemanticVersion::new(3, 4, 0), &min));
        assert!(!satisfies(&SemanticVersion::new(3, 3, 9), &min));
        assert!(satisfies(&SemanticVersion::new(3, 5, 0), &min));
        assert!(satisfies(&SemanticVersion::new(4, 0, 0), &min));
        assert!(!satisfies(&SemanticVersion::new(2, 99, 99), &min));
        assert!(satisfies(&SemanticVersion::new(3, 4, 1), &min));
    }

    #[test]
    fn test_satisfies_is_numeric_not_lexical() {
        // "2.10.0" sorts before "2.9.0" as a string
        let v2_10 = parse("2.10.0").unwrap();
        let v2_9 = parse("2.9.0").unwrap();
        assert!(v2_10.satisfies(&v2_9));
        assert!(!v2_9.satisfies(&v2_10));
    }

    #[test]
    fn test_satisfies_matches_tuple_order() {
        let samples = [0u64, 1, 2, 9, 10];
        for &a in &samples {
            for &b in &samples {
                let left = SemanticVersion::new(a, b, a);
                let right = SemanticVersion::new(b, a, b);
                assert_eq!(
                    satisfies(&left, &right),
                    (a, b, a) >= (b, a, b),
                    "{left} vs {right}"
                );
            }
        }
    }
}
