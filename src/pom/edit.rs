use std::ops::Range;

/// Replacement of a byte range of the source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub new_text: String,
}

impl TextEdit {
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            range: offset..offset,
            new_text: text.into(),
        }
    }

    pub fn replace(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: text.into(),
        }
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self {
            range,
            new_text: String::new(),
        }
    }
}

/// Apply non-overlapping edits computed against `source`.
///
/// Inserts at the same offset end up in the order they appear in `edits`,
/// after any replacement starting there.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> String {
    let mut ordered: Vec<(usize, &TextEdit)> = edits.iter().enumerate().collect();
    ordered.sort_by(|(ia, a), (ib, b)| {
        b.range
            .start
            .cmp(&a.range.start)
            .then_with(|| a.range.is_empty().cmp(&b.range.is_empty()))
            .then_with(|| ib.cmp(ia))
    });

    let mut result = source.to_string();
    for (_, edit) in ordered {
        result.replace_range(edit.range.clone(), &edit.new_text);
    }
    result
}
