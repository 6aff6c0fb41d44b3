//! Version ordering for Maven artifacts
//!
//! - [`maven`]: `MavenVersion`, the build-tool precedence order used to pick "latest" versions
//! - [`range`]: version requirements (`1.0`, `[1.0,2.0)`, `(,1.0],[1.2,)`) and range membership

pub mod maven;
pub mod range;

pub use maven::{MavenVersion, max_version};
pub use range::{RangeError, VersionRequirement};
