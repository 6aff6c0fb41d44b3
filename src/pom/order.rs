//! Canonical ordering of POM sections and managed dependency entries

use crate::pom::xml::XmlTag;

/// Top-level `<project>` children in the order Maven's own model writer emits them
pub const POM_SECTION_ORDER: &[&str] = &[
    "modelVersion",
    "parent",
    "groupId",
    "artifactId",
    "version",
    "packaging",
    "name",
    "description",
    "url",
    "inceptionYear",
    "organization",
    "licenses",
    "developers",
    "contributors",
    "mailingLists",
    "prerequisites",
    "modules",
    "scm",
    "issueManagement",
    "ciManagement",
    "distributionManagement",
    "properties",
    "dependencyManagement",
    "dependencies",
    "repositories",
    "pluginRepositories",
    "build",
    "reporting",
    "profiles",
];

/// Position of `name` in [`POM_SECTION_ORDER`]; unknown sections sort last
pub fn section_rank(name: &str) -> usize {
    POM_SECTION_ORDER
        .iter()
        .position(|section| *section == name)
        .unwrap_or(POM_SECTION_ORDER.len())
}

/// Index of the sibling a new `name` section goes right after.
///
/// `None` means the section belongs before the first existing child.
pub fn section_insertion_index(siblings: &[XmlTag], name: &str) -> Option<usize> {
    let rank = section_rank(name);
    siblings
        .iter()
        .rposition(|sibling| section_rank(&sibling.name) <= rank)
}

/// Index in `existing` before which `new` is inserted.
///
/// Entries are compared by `(groupId, artifactId)`. An unsorted list still
/// gets a deterministic position: before the first greater entry.
pub fn dependency_insertion_index(existing: &[(String, String)], new: &(String, String)) -> usize {
    existing
        .iter()
        .position(|key| key > new)
        .unwrap_or(existing.len())
}
