//! Per-segment pattern grammar: brace alternation over shell-style globs.
//!
//! A pattern is split on `.` before any of this runs, so nothing here
//! crosses a segment boundary. There is no escape syntax. Malformed
//! constructs (nested or unbalanced braces, unterminated classes) fall
//! back to literal text: half-typed patterns are the normal interactive
//! case and must keep matching rather than error out.

use smallvec::{smallvec, SmallVec};

/// One `.`-delimited pattern token, brace-expanded into glob alternatives.
#[derive(Clone, Debug)]
pub(crate) struct SegmentPattern {
    alts: SmallVec<[String; 2]>,
}

impl SegmentPattern {
    /// Parses one pattern segment.
    pub(crate) fn parse(segment: &str) -> Self {
        Self { alts: expand_braces(segment) }
    }

    /// Whether any brace alternative glob-matches `label` in full.
    pub(crate) fn matches(&self, label: &str) -> bool {
        self.alts.iter().any(|alt| glob_match(alt, label))
    }
}

/// Expands non-nested `{a,b}` groups; several groups multiply out left to
/// right. A group that never closes, or that opens again before closing,
/// is kept as literal text without disturbing the groups around it.
fn expand_braces(segment: &str) -> SmallVec<[String; 2]> {
    let (head, body, tail) = match split_group(segment) {
        Some(parts) => parts,
        None => return smallvec![segment.to_string()],
    };
    let tails = expand_braces(tail);
    let mut out = SmallVec::new();
    for alt in body.split(',') {
        for rest in &tails {
            out.push(format!("{head}{alt}{rest}"));
        }
    }
    out
}

/// Locates the first well-formed group, splitting `head{body}tail`.
fn split_group(segment: &str) -> Option<(&str, &str, &str)> {
    let open = segment.find('{')?;
    let rest = &segment[open + 1..];
    for (i, c) in rest.char_indices() {
        match c {
            '{' => return None,
            '}' => return Some((&segment[..open], &rest[..i], &rest[i + 1..])),
            _ => {}
        }
    }
    None
}

/// Shell-style glob over one segment: `*` any run (including empty), `?`
/// exactly one character, `[...]` one character out of a class. Linear
/// scan with single-star backtracking.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();
    let mut p = 0;
    let mut t = 0;
    // (pattern index after the star, text index the star is pinned to)
    let mut star: Option<(usize, usize)> = None;

    while t < txt.len() {
        let matched = match pat.get(p).copied() {
            Some('*') => {
                star = Some((p + 1, t));
                p += 1;
                continue;
            }
            Some('[') => match parse_class(&pat, p) {
                Some(class) => {
                    if class.contains(txt[t]) {
                        p = class.end;
                        t += 1;
                        continue;
                    }
                    false
                }
                // unterminated class: a literal '[' character
                None => txt[t] == '[',
            },
            Some('?') => true,
            Some(c) => c == txt[t],
            None => false,
        };
        if matched {
            p += 1;
            t += 1;
        } else if let Some((next_p, anchor)) = star {
            p = next_p;
            t = anchor + 1;
            star = Some((next_p, anchor + 1));
        } else {
            return false;
        }
    }
    while pat.get(p).copied() == Some('*') {
        p += 1;
    }
    p == pat.len()
}

/// A parsed `[...]` class; `end` is the pattern index past the closing
/// bracket.
struct CharClass {
    negated: bool,
    members: SmallVec<[(char, char); 4]>,
    end: usize,
}

impl CharClass {
    fn contains(&self, c: char) -> bool {
        let inside = self.members.iter().any(|&(lo, hi)| lo <= c && c <= hi);
        inside != self.negated
    }
}

/// Parses the class opening at `pat[open] == '['`. `^` or `!` right after
/// the bracket negates; a `]` in first member position is a literal
/// member. Returns `None` when the class never closes.
fn parse_class(pat: &[char], open: usize) -> Option<CharClass> {
    let mut i = open + 1;
    let negated = matches!(pat.get(i).copied(), Some('^') | Some('!'));
    if negated {
        i += 1;
    }
    let mut members: SmallVec<[(char, char); 4]> = SmallVec::new();
    let mut first = true;
    loop {
        let c = pat.get(i).copied()?;
        if c == ']' && !first {
            return Some(CharClass { negated, members, end: i + 1 });
        }
        // 'a-z' forms a range unless the dash closes the class
        if pat.get(i + 1).copied() == Some('-') && pat.get(i + 2).map_or(false, |&hi| hi != ']') {
            members.push((c, pat[i + 2]));
            i += 3;
        } else {
            members.push((c, c));
            i += 1;
        }
        first = false;
    }
}
