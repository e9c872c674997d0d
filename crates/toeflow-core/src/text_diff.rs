//! Word-level text diff for rendering reviewer edits.
//!
//! Inputs are split into alternating runs of non-whitespace and whitespace, so
//! concatenating the segment text reproduces each input exactly. The edit
//! script is read off a longest-common-subsequence table filled backward from
//! the ends, which lets the walk proceed forward from the first token. When
//! both neighbours of the table tie, the original token is consumed first.
//!
//! Cost is `O(n * m)` in token counts; inputs are prose fields, not files.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Unchanged,
    Added,
    Removed,
}

/// A maximal run of text sharing one [`SegmentKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSegment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub text: String,
}

impl DiffSegment {
    pub fn new(kind: SegmentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn unchanged(text: impl Into<String>) -> Self {
        Self::new(SegmentKind::Unchanged, text)
    }

    pub fn added(text: impl Into<String>) -> Self {
        Self::new(SegmentKind::Added, text)
    }

    pub fn removed(text: impl Into<String>) -> Self {
        Self::new(SegmentKind::Removed, text)
    }
}

/// Compute the coalesced word-level edit script from `original` to `modified`.
pub fn diff(original: &str, modified: &str) -> Vec<DiffSegment> {
    if original == modified {
        return vec![DiffSegment::unchanged(original)];
    }
    if original.is_empty() {
        return vec![DiffSegment::added(modified)];
    }
    if modified.is_empty() {
        return vec![DiffSegment::removed(original)];
    }

    let old = tokenize(original);
    let new = tokenize(modified);
    let n = old.len();
    let m = new.len();

    // lcs[i][j] = LCS length of old[i..] and new[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut segments = Vec::new();
    let mut i = 0;
    let mut j = 0;
    while i < n && j < m {
        if old[i] == new[j] {
            push(&mut segments, SegmentKind::Unchanged, old[i]);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            push(&mut segments, SegmentKind::Removed, old[i]);
            i += 1;
        } else {
            push(&mut segments, SegmentKind::Added, new[j]);
            j += 1;
        }
    }
    for token in &old[i..] {
        push(&mut segments, SegmentKind::Removed, token);
    }
    for token in &new[j..] {
        push(&mut segments, SegmentKind::Added, token);
    }

    segments
}

/// Append `text`, merging into the previous segment when the kind matches.
fn push(segments: &mut Vec<DiffSegment>, kind: SegmentKind, text: &str) {
    match segments.last_mut() {
        Some(last) if last.kind == kind => last.text.push_str(text),
        _ => segments.push(DiffSegment::new(kind, text)),
    }
}

/// Split into maximal whitespace and non-whitespace runs, keeping both.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut prev_space: Option<bool> = None;
    for (idx, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        if prev_space.is_some_and(|prev| prev != space) {
            tokens.push(&text[start..idx]);
            start = idx;
        }
        prev_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Render segments as inline markup: `[-removed-]` and `{+added+}`.
pub fn to_markup(segments: &[DiffSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment.kind {
            SegmentKind::Unchanged => out.push_str(&segment.text),
            SegmentKind::Removed => {
                out.push_str("[-");
                out.push_str(&segment.text);
                out.push_str("-]");
            }
            SegmentKind::Added => {
                out.push_str("{+");
                out.push_str(&segment.text);
                out.push_str("+}");
            }
        }
    }
    out
}
