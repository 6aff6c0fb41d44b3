//! Move matching dependency versions into `<dependencyManagement>`
//!
//! ```text
//! <dependencies>                        <dependencyManagement>
//!   <dependency>                          <dependencies>
//!     <groupId>org.example</groupId>        <dependency>
//!     <artifactId>core</artifactId>   =>      <groupId>org.example</groupId>
//!     <version>1.3.0</version>                <artifactId>core</artifactId>
//!   </dependency>                             <version>1.3.0</version>
//! </dependencies>                           ...
//! ```
//!
//! Every dependency matching the group (and optional artifact) glob ends up
//! sharing one managed version. The rewrite is planned as a list of
//! [`TextEdit`]s against the original source, so untouched parts of the
//! document keep their exact formatting.

use indexmap::IndexSet;
use quick_xml::escape::escape;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::pom::edit::{TextEdit, apply_edits};
use crate::pom::order::{dependency_insertion_index, section_insertion_index};
use crate::pom::xml::{XmlDocument, XmlError, XmlTag};
use crate::version::max_version;

const DEFAULT_INDENT: &str = "    ";

#[derive(Debug, Error)]
pub enum ManageDependenciesError {
    #[error("Invalid rewrite options: {0}")]
    Validation(String),

    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error("Managed dependency {group_id}:{artifact_id} has no <version>")]
    MissingManagedVersion {
        group_id: String,
        artifact_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct ManageDependencies {
    group_pattern: Regex,
    artifact_pattern: Option<Regex>,
    version: Option<String>,
}

impl ManageDependencies {
    pub fn new(group_pattern: &str) -> Result<Self, ManageDependenciesError> {
        if group_pattern.trim().is_empty() {
            return Err(ManageDependenciesError::Validation(
                "groupPattern is required".to_string(),
            ));
        }
        Ok(Self {
            group_pattern: compile_glob(group_pattern)?,
            artifact_pattern: None,
            version: None,
        })
    }

    pub fn with_artifact_pattern(mut self, pattern: &str) -> Result<Self, ManageDependenciesError> {
        self.artifact_pattern = Some(compile_glob(pattern)?);
        Ok(self)
    }

    /// Version to standardize on instead of the highest declared one
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Parse, plan and apply in one step
    pub fn apply(&self, source: &str) -> Result<String, ManageDependenciesError> {
        let document = XmlDocument::parse(source)?;
        let edits = self.plan(&document)?;
        Ok(apply_edits(document.source(), &edits))
    }

    /// Edits that bring `document` under managed versions; empty when
    /// nothing matches or no version can be selected
    pub fn plan(&self, document: &XmlDocument) -> Result<Vec<TextEdit>, ManageDependenciesError> {
        let project = Project::new(document);
        let root = document.root();

        let matching: Vec<&XmlTag> = root
            .child("dependencies")
            .into_iter()
            .flat_map(|deps| deps.children_named("dependency"))
            .filter(|tag| self.matches(&project.coordinates(tag)))
            .collect();
        if matching.is_empty() {
            return Ok(Vec::new());
        }

        let section = root.child("dependencyManagement");
        let managed_list = section.and_then(|s| s.child("dependencies"));
        let managed: Vec<&XmlTag> = managed_list
            .into_iter()
            .flat_map(|deps| deps.children_named("dependency"))
            .collect();
        let managed_keys: Vec<(String, String)> =
            managed.iter().map(|tag| project.coordinates(tag)).collect();

        let pairs: IndexSet<(String, String)> =
            matching.iter().map(|tag| project.coordinates(tag)).collect();

        let Some(selected) = self.select_version(&project, &matching, &managed, &pairs) else {
            debug!("No version to manage for {}", self.group_pattern);
            return Ok(Vec::new());
        };

        let mut uncovered: Vec<(String, String)> = pairs
            .into_iter()
            .filter(|pair| !managed_keys.contains(pair))
            .collect();
        uncovered.sort();

        let mut edits = Vec::new();
        if !uncovered.is_empty() {
            let insert = Insertion {
                document,
                indent: project.indent_unit(),
                version: &selected,
            };
            match (section, managed_list) {
                (None, _) => edits.push(insert.section(&uncovered)),
                (Some(section), None) => edits.push(insert.list(section, &uncovered)),
                (Some(_), Some(list)) if managed.is_empty() => {
                    edits.push(insert.into_empty_list(list, &uncovered))
                }
                (Some(_), Some(_)) => {
                    edits.extend(insert.into_sorted_list(&managed, &managed_keys, &uncovered))
                }
            }
        }

        for (tag, key) in managed.iter().zip(&managed_keys) {
            if !self.matches(key) {
                continue;
            }
            let version =
                tag.child("version")
                    .ok_or_else(|| ManageDependenciesError::MissingManagedVersion {
                        group_id: key.0.clone(),
                        artifact_id: key.1.clone(),
                    })?;
            edits.extend(replace_version(document, version, &selected));
        }

        for tag in &matching {
            if let Some(version) = tag.child("version") {
                edits.push(TextEdit::delete(removal_range(document, version)));
            }
        }

        Ok(edits)
    }

    fn matches(&self, (group_id, artifact_id): &(String, String)) -> bool {
        self.group_pattern.is_match(group_id)
            && self
                .artifact_pattern
                .as_ref()
                .is_none_or(|pattern| pattern.is_match(artifact_id))
    }

    /// Explicit version, else the highest declared one, else what the
    /// section already manages for one of the matching pairs
    fn select_version(
        &self,
        project: &Project<'_>,
        matching: &[&XmlTag],
        managed: &[&XmlTag],
        pairs: &IndexSet<(String, String)>,
    ) -> Option<String> {
        if let Some(version) = &self.version {
            return Some(version.clone());
        }

        let declared = matching
            .iter()
            .filter_map(|tag| project.document.child_value(tag, "version"))
            .filter(|version| !version.is_empty());
        max_version(declared).or_else(|| {
            managed
                .iter()
                .filter(|tag| pairs.contains(&project.coordinates(tag)))
                .find_map(|tag| project.document.child_value(tag, "version"))
                .filter(|version| !version.is_empty())
        })
    }
}

/// `*` matches any sequence; everything else is literal and the whole
/// value must match
fn compile_glob(pattern: &str) -> Result<Regex, ManageDependenciesError> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^(?:{})$", body)).map_err(|e| {
        ManageDependenciesError::Validation(format!("invalid pattern '{}': {}", pattern, e))
    })
}

/// Coordinate defaults taken from the project being rewritten
struct Project<'a> {
    document: &'a XmlDocument,
    group_id: String,
    artifact_id: String,
}

impl<'a> Project<'a> {
    fn new(document: &'a XmlDocument) -> Self {
        let root = document.root();
        let group_id = document
            .child_value(root, "groupId")
            .or_else(|| document.child_value(root.child("parent")?, "groupId"))
            .unwrap_or_default();
        let artifact_id = document.child_value(root, "artifactId").unwrap_or_default();
        Self {
            document,
            group_id,
            artifact_id,
        }
    }

    fn coordinates(&self, dependency: &XmlTag) -> (String, String) {
        let value = |name: &str, default: &str| {
            self.document
                .child_value(dependency, name)
                .unwrap_or_else(|| default.to_string())
        };
        (
            value("groupId", &self.group_id),
            value("artifactId", &self.artifact_id),
        )
    }

    fn indent_unit(&self) -> String {
        self.document
            .root()
            .children
            .first()
            .and_then(|child| self.document.indent_at(child.span.start))
            .filter(|indent| !indent.is_empty())
            .unwrap_or(DEFAULT_INDENT)
            .to_string()
    }
}

struct Insertion<'a> {
    document: &'a XmlDocument,
    indent: String,
    version: &'a str,
}

impl Insertion<'_> {
    fn unit(&self, depth: usize) -> String {
        self.indent.repeat(depth)
    }

    fn indent_of(&self, tag: &XmlTag, depth: usize) -> String {
        self.document
            .indent_at(tag.span.start)
            .map(str::to_string)
            .unwrap_or_else(|| self.unit(depth))
    }

    /// One `<dependency>` block, each line terminated by a newline
    fn entry(&self, indent: &str, (group_id, artifact_id): &(String, String)) -> String {
        let inner = format!("{}{}", indent, self.indent);
        format!(
            "{indent}<dependency>\n\
             {inner}<groupId>{}</groupId>\n\
             {inner}<artifactId>{}</artifactId>\n\
             {inner}<version>{}</version>\n\
             {indent}</dependency>\n",
            escape(group_id.as_str()),
            escape(artifact_id.as_str()),
            escape(self.version),
        )
    }

    fn entries(&self, indent: &str, pairs: &[(String, String)]) -> String {
        pairs.iter().map(|pair| self.entry(indent, pair)).collect()
    }

    /// `<dependencies>` element holding `pairs`, without trailing newline
    fn list_block(&self, indent: &str, pairs: &[(String, String)]) -> String {
        let entries = self.entries(&format!("{}{}", indent, self.indent), pairs);
        format!("{indent}<dependencies>\n{entries}{indent}</dependencies>")
    }

    /// A whole new `<dependencyManagement>` section at its canonical place
    fn section(&self, pairs: &[(String, String)]) -> TextEdit {
        let root = self.document.root();
        let indent = self.unit(1);
        let list = self.list_block(&self.unit(2), pairs);
        let section =
            format!("{indent}<dependencyManagement>\n{list}\n{indent}</dependencyManagement>");

        match section_insertion_index(&root.children, "dependencyManagement") {
            Some(index) => {
                TextEdit::insert(root.children[index].span.end, format!("\n{}", section))
            }
            None => {
                let first = &root.children[0];
                match self.document.indent_at(first.span.start) {
                    Some(_) => TextEdit::insert(
                        self.document.line_start(first.span.start),
                        format!("{}\n", section),
                    ),
                    None => TextEdit::insert(first.span.start, format!("{}\n", section.trim_start())),
                }
            }
        }
    }

    /// New entries among existing managed dependencies, in sorted position
    fn into_sorted_list(
        &self,
        managed: &[&XmlTag],
        managed_keys: &[(String, String)],
        pairs: &[(String, String)],
    ) -> Vec<TextEdit> {
        let indent = self.indent_of(managed[0], 3);
        pairs
            .iter()
            .map(|pair| {
                let index = dependency_insertion_index(managed_keys, pair);
                let entry = self.entry(&indent, pair);
                match managed.get(index) {
                    Some(next) if self.document.indent_at(next.span.start).is_some() => {
                        TextEdit::insert(self.document.line_start(next.span.start), entry)
                    }
                    Some(next) => TextEdit::insert(next.span.start, entry.trim_start().to_string()),
                    None => {
                        let last = managed[managed.len() - 1];
                        TextEdit::insert(
                            last.span.end,
                            format!("\n{}", entry.trim_end_matches('\n')),
                        )
                    }
                }
            })
            .collect()
    }

    /// Fill an empty or self-closing `<dependencies>` inside the section
    fn into_empty_list(&self, list: &XmlTag, pairs: &[(String, String)]) -> TextEdit {
        let indent = self.indent_of(list, 2);
        let block = self.list_block(&indent, pairs);
        TextEdit::replace(list.span.clone(), block.trim_start().to_string())
    }

    /// Add the `<dependencies>` list to a section that has none
    fn list(&self, section: &XmlTag, pairs: &[(String, String)]) -> TextEdit {
        let indent = self.indent_of(section, 1);
        let block = self.list_block(&format!("{}{}", indent, self.indent), pairs);
        if section.self_closing {
            TextEdit::replace(
                section.span.clone(),
                format!("<dependencyManagement>\n{block}\n{indent}</dependencyManagement>"),
            )
        } else {
            TextEdit::insert(section.content.start, format!("\n{}", block))
        }
    }
}

/// Replace the version text, keeping whitespace around it
fn replace_version(document: &XmlDocument, version: &XmlTag, selected: &str) -> Option<TextEdit> {
    if version.self_closing {
        return Some(TextEdit::replace(
            version.span.clone(),
            format!("<version>{}</version>", escape(selected)),
        ));
    }
    if document.text(version).as_deref() == Some(selected) {
        return None;
    }

    let raw = &document.source()[version.content.clone()];
    let leading = raw.len() - raw.trim_start().len();
    let trailing = raw.len() - raw.trim_end().len();
    let start = version.content.start + leading;
    let end = (version.content.end - trailing).max(start);
    Some(TextEdit::replace(start..end, escape(selected).into_owned()))
}

/// The element, or its whole line when nothing else sits on it
fn removal_range(document: &XmlDocument, tag: &XmlTag) -> std::ops::Range<usize> {
    let source = document.source();
    if document.indent_at(tag.span.start).is_some()
        && let Some(newline) = source[tag.span.end..].find('\n')
        && source[tag.span.end..tag.span.end + newline].trim().is_empty()
    {
        return document.line_start(tag.span.start)..tag.span.end + newline + 1;
    }
    tag.span.clone()
}
