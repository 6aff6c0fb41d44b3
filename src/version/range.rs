//! Maven version requirements
//!
//! Supports the requirement forms found in POM `<version>` elements:
//! - `1.0` - soft requirement: prefers exactly 1.0
//! - `[1.0]` - hard requirement: exactly 1.0
//! - `[1.0,2.0)` - 1.0 <= x < 2.0
//! - `(,1.0]` - x <= 1.0
//! - `[1.5,)` - x >= 1.5
//! - `(,1.0],[1.2,)` - union of restrictions

use thiserror::Error;

use crate::version::maven::MavenVersion;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("Unbalanced range: {0}")]
    Unbalanced(String),

    #[error("Single version must be surrounded by []: {0}")]
    InvalidExactVersion(String),

    #[error("Range defies version ordering: {0}")]
    ReversedBounds(String),

    #[error("Unexpected trailing content after range: {0}")]
    TrailingContent(String),
}

/// One interval of a range; `None` bounds are unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    pub lower: Option<MavenVersion>,
    pub lower_inclusive: bool,
    pub upper: Option<MavenVersion>,
    pub upper_inclusive: bool,
}

impl Restriction {
    fn parse(spec: &str) -> Result<Self, RangeError> {
        let lower_inclusive = spec.starts_with('[');
        let upper_inclusive = spec.ends_with(']');
        let inner = spec[1..spec.len() - 1].trim();

        let Some((lower, upper)) = inner.split_once(',') else {
            if !lower_inclusive || !upper_inclusive || inner.is_empty() {
                return Err(RangeError::InvalidExactVersion(spec.to_string()));
            }
            let version = MavenVersion::parse(inner);
            return Ok(Self {
                lower: Some(version.clone()),
                lower_inclusive: true,
                upper: Some(version),
                upper_inclusive: true,
            });
        };

        let lower = Some(lower.trim())
            .filter(|s| !s.is_empty())
            .map(MavenVersion::parse);
        let upper = Some(upper.trim())
            .filter(|s| !s.is_empty())
            .map(MavenVersion::parse);

        if let (Some(l), Some(u)) = (&lower, &upper) {
            if u < l {
                return Err(RangeError::ReversedBounds(spec.to_string()));
            }
        }

        Ok(Self {
            lower,
            lower_inclusive,
            upper,
            upper_inclusive,
        })
    }

    pub fn contains(&self, version: &MavenVersion) -> bool {
        let above_lower = match &self.lower {
            None => true,
            Some(lower) if self.lower_inclusive => version >= lower,
            Some(lower) => version > lower,
        };
        let below_upper = match &self.upper {
            None => true,
            Some(upper) if self.upper_inclusive => version <= upper,
            Some(upper) => version < upper,
        };
        above_lower && below_upper
    }
}

/// A parsed `<version>` requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRequirement {
    /// A plain version; any resolution may override it
    Soft(MavenVersion),
    /// One or more restrictions, satisfied by membership in any of them
    Range(Vec<Restriction>),
}

impl VersionRequirement {
    pub fn parse(spec: &str) -> Result<Self, RangeError> {
        let spec = spec.trim();
        if !spec.starts_with('[') && !spec.starts_with('(') {
            return Ok(VersionRequirement::Soft(MavenVersion::parse(spec)));
        }

        let mut restrictions = Vec::new();
        let mut rest = spec;
        while rest.starts_with('[') || rest.starts_with('(') {
            let Some(close) = rest.find([']', ')']) else {
                return Err(RangeError::Unbalanced(spec.to_string()));
            };
            restrictions.push(Restriction::parse(&rest[..=close])?);
            rest = rest[close + 1..].trim_start();
            if let Some(after_comma) = rest.strip_prefix(',') {
                rest = after_comma.trim_start();
            }
        }

        if !rest.is_empty() {
            return Err(RangeError::TrailingContent(spec.to_string()));
        }

        Ok(VersionRequirement::Range(restrictions))
    }

    /// True if the given string is written as a range rather than a plain version
    pub fn is_range(spec: &str) -> bool {
        let spec = spec.trim();
        spec.starts_with('[') || spec.starts_with('(')
    }

    pub fn contains(&self, version: &MavenVersion) -> bool {
        match self {
            VersionRequirement::Soft(recommended) => recommended == version,
            VersionRequirement::Range(restrictions) => {
                restrictions.iter().any(|r| r.contains(version))
            }
        }
    }

    /// Highest version among `available` that satisfies this requirement.
    ///
    /// A soft requirement selects its own version regardless of availability.
    pub fn select(&self, available: &[String]) -> Option<String> {
        match self {
            VersionRequirement::Soft(recommended) => Some(recommended.to_string()),
            VersionRequirement::Range(_) => available
                .iter()
                .map(|v| MavenVersion::parse(v))
                .filter(|v| self.contains(v))
                .max()
                .map(|v| v.to_string()),
        }
    }
}
