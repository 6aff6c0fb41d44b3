//! POM documents
//! - model.rs: serde model of `pom.xml` and the effective projection (`RawPom`)
//! - xml.rs: span-tracking element tree used for text-preserving rewrites
//! - edit.rs: byte-range text edits
//! - order.rs: canonical section and managed-entry ordering
//! - manage.rs: dependency-management rewriter

pub mod edit;
pub mod manage;
pub mod model;
pub mod order;
pub mod xml;

pub use edit::{TextEdit, apply_edits};
pub use manage::{ManageDependencies, ManageDependenciesError};
pub use model::{Dependency, PomModel, PomSource, RawPom};
pub use xml::{XmlDocument, XmlError, XmlTag};
