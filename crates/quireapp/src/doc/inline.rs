//! Char-offset operations over inline content.
//!
//! Every function here leaves content in canonical form (see [`normalize`]).

use super::{Inline, Mark};

pub fn content_len(content: &[Inline]) -> usize {
    content.iter().map(Inline::len).sum()
}

pub fn plain_text(content: &[Inline]) -> String {
    let mut out = String::new();
    for inline in content {
        match inline {
            Inline::Text { text, .. } => out.push_str(text),
            Inline::HardBreak => out.push('\n'),
        }
    }
    out
}

/// Sort marks canonically and keep only the last mark of each type.
pub fn canonical_marks(marks: &mut Vec<Mark>) {
    let mut out: Vec<Mark> = Vec::with_capacity(marks.len());
    for mark in marks.drain(..) {
        out.retain(|m| !m.same_type(&mark));
        out.push(mark);
    }
    out.sort_by_key(Mark::rank);
    *marks = out;
}

pub fn normalize(content: &mut Vec<Inline>) {
    let mut out: Vec<Inline> = Vec::with_capacity(content.len());
    for mut inline in content.drain(..) {
        if let Inline::Text { text, marks } = &mut inline {
            if text.is_empty() {
                continue;
            }
            canonical_marks(marks);
        }
        if let (
            Some(Inline::Text {
                text: prev_text,
                marks: prev_marks,
            }),
            Inline::Text { text, marks },
        ) = (out.last_mut(), &inline)
        {
            if prev_marks == marks {
                prev_text.push_str(text);
                continue;
            }
        }
        out.push(inline);
    }
    *content = out;
}

/// Split content at a char offset. Offsets past the end clamp to the end.
pub fn split_at(content: &[Inline], offset: usize) -> (Vec<Inline>, Vec<Inline>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut pos = 0;
    for inline in content {
        let len = inline.len();
        if pos + len <= offset {
            left.push(inline.clone());
        } else if pos >= offset {
            right.push(inline.clone());
        } else if let Inline::Text { text, marks } = inline {
            let cut = offset - pos;
            let byte = text
                .char_indices()
                .nth(cut)
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            left.push(Inline::marked(&text[..byte], marks.clone()));
            right.push(Inline::marked(&text[byte..], marks.clone()));
        }
        pos += len;
    }
    (left, right)
}

/// Marks a character typed at `offset` would receive.
///
/// The run before the offset wins; non-inclusive marks only carry over when
/// the run after the offset has them too. At the start of a textblock the
/// run after the offset is used, minus its non-inclusive marks.
pub fn marks_at(content: &[Inline], offset: usize) -> Vec<Mark> {
    let (before, after) = split_at(content, offset);
    let prev = before.last().map(|i| i.marks().to_vec());
    let next = after.first().map(|i| i.marks().to_vec()).unwrap_or_default();
    match prev {
        Some(prev) => prev
            .into_iter()
            .filter(|m| m.is_inclusive() || next.contains(m))
            .collect(),
        None => next.into_iter().filter(Mark::is_inclusive).collect(),
    }
}

pub fn insert_text(content: &mut Vec<Inline>, offset: usize, text: &str, marks: Vec<Mark>) {
    let (mut left, right) = split_at(content, offset);
    left.push(Inline::marked(text, marks));
    left.extend(right);
    normalize(&mut left);
    *content = left;
}

pub fn delete_range(content: &mut Vec<Inline>, from: usize, to: usize) {
    let (mut left, rest) = split_at(content, from);
    let (_, right) = split_at(&rest, to.saturating_sub(from));
    left.extend(right);
    normalize(&mut left);
    *content = left;
}

fn map_range<F>(content: &mut Vec<Inline>, from: usize, to: usize, mut f: F) -> bool
where
    F: FnMut(&mut Vec<Mark>) -> bool,
{
    let (mut left, rest) = split_at(content, from);
    let (mut middle, right) = split_at(&rest, to.saturating_sub(from));
    let mut changed = false;
    for inline in middle.iter_mut() {
        if let Inline::Text { marks, .. } = inline {
            changed |= f(marks);
        }
    }
    left.append(&mut middle);
    left.extend(right);
    normalize(&mut left);
    *content = left;
    changed
}

/// Apply `mark` to `from..to`, overwriting any mark of the same type.
pub fn add_mark(content: &mut Vec<Inline>, from: usize, to: usize, mark: &Mark) -> bool {
    map_range(content, from, to, |marks| {
        if marks.contains(mark) {
            return false;
        }
        marks.retain(|m| !m.same_type(mark));
        marks.push(mark.clone());
        true
    })
}

/// Remove every mark of `mark`'s type from `from..to`.
pub fn remove_mark(content: &mut Vec<Inline>, from: usize, to: usize, mark: &Mark) -> bool {
    map_range(content, from, to, |marks| {
        let before = marks.len();
        marks.retain(|m| !m.same_type(mark));
        marks.len() != before
    })
}

/// True when every text char in `from..to` carries a mark of `mark`'s type.
pub fn range_has_mark(content: &[Inline], from: usize, to: usize, mark: &Mark) -> bool {
    let (_, rest) = split_at(content, from);
    let (middle, _) = split_at(&rest, to.saturating_sub(from));
    let mut any = false;
    for inline in &middle {
        if let Inline::Text { marks, .. } = inline {
            if !marks.iter().any(|m| m.same_type(mark)) {
                return false;
            }
            any = true;
        }
    }
    any
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(value: &str) -> Mark {
        Mark::DataTag {
            tag_data: value.to_string(),
        }
    }

    #[test]
    fn normalize_merges_runs_and_drops_empty() {
        let mut content = vec![
            Inline::text("ab"),
            Inline::text(""),
            Inline::text("cd"),
            Inline::marked("e", vec![Mark::Italic, Mark::Bold]),
        ];
        normalize(&mut content);
        assert_eq!(
            content,
            vec![
                Inline::text("abcd"),
                Inline::marked("e", vec![Mark::Bold, Mark::Italic]),
            ]
        );
    }

    #[test]
    fn split_handles_multibyte_chars() {
        let content = vec![Inline::text("héllo")];
        let (l, r) = split_at(&content, 2);
        assert_eq!(plain_text(&l), "hé");
        assert_eq!(plain_text(&r), "llo");
    }

    #[test]
    fn add_mark_overwrites_same_type() {
        let mut content = vec![Inline::marked("abc", vec![tag("one")])];
        add_mark(&mut content, 1, 3, &tag("two"));
        assert_eq!(
            content,
            vec![
                Inline::marked("a", vec![tag("one")]),
                Inline::marked("bc", vec![tag("two")]),
            ]
        );
    }

    #[test]
    fn remove_mark_reports_change() {
        let mut content = vec![Inline::marked("abc", vec![Mark::Bold])];
        assert!(remove_mark(&mut content, 0, 3, &Mark::Bold));
        assert_eq!(content, vec![Inline::text("abc")]);
        assert!(!remove_mark(&mut content, 0, 3, &Mark::Bold));
    }

    #[test]
    fn inclusive_mark_extends_at_boundary() {
        let content = vec![Inline::marked("tagged", vec![tag("x")]), Inline::text(" plain")];
        assert_eq!(marks_at(&content, 6), vec![tag("x")]);
    }

    #[test]
    fn link_does_not_extend_at_its_end() {
        let link = Mark::Link {
            href: "https://example.org".into(),
        };
        let content = vec![Inline::marked("site", vec![link.clone()])];
        assert!(marks_at(&content, 4).is_empty());
        assert_eq!(marks_at(&content, 2), vec![link]);
    }

    #[test]
    fn delete_range_joins_runs() {
        let mut content = vec![Inline::text("hello world")];
        delete_range(&mut content, 5, 11);
        assert_eq!(plain_text(&content), "hello");
    }
}
