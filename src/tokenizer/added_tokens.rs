//! Part of Component H: added-token matching over raw text, before
//! normalization runs. Longest-content-first so that overlapping added
//! tokens never get shadowed by a shorter prefix match.

use aho_corasick::{AhoCorasick, MatchKind};

#[derive(Debug, Clone)]
pub struct AddedToken {
    pub content: String,
    pub id: u32,
    pub single_word: bool,
    pub special: bool,
}

pub struct AddedTokenMatcher {
    tokens: Vec<AddedToken>,
    automaton: Option<AhoCorasick>,
}

/// One split produced by [`AddedTokenMatcher::split`]: either raw text that
/// still needs the rest of the pipeline, or a matched added token.
pub enum Segment<'a> {
    Plain(&'a str),
    Added(&'a AddedToken),
}

impl AddedTokenMatcher {
    pub fn new(mut tokens: Vec<AddedToken>) -> Self {
        tokens.sort_by(|a, b| b.content.len().cmp(&a.content.len()));
        let automaton = if tokens.is_empty() {
            None
        } else {
            AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostLongest)
                .build(tokens.iter().map(|t| t.content.as_str()))
                .ok()
        };
        Self { tokens, automaton }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// True if `content` names one of the registered added tokens.
    pub fn contains_content(&self, content: &str) -> bool {
        self.tokens.iter().any(|t| t.content == content)
    }

    pub fn split<'a>(&'a self, input: &'a str) -> Vec<Segment<'a>> {
        let Some(automaton) = &self.automaton else {
            return vec![Segment::Plain(input)];
        };

        let mut segments = Vec::new();
        let mut last = 0;
        for m in automaton.find_iter(input) {
            let token = &self.tokens[m.pattern().as_usize()];
            if token.single_word && !is_word_boundary_match(input, m.start(), m.end()) {
                continue;
            }
            if m.start() > last {
                segments.push(Segment::Plain(&input[last..m.start()]));
            }
            segments.push(Segment::Added(token));
            last = m.end();
        }
        if last < input.len() {
            segments.push(Segment::Plain(&input[last..]));
        }
        segments
    }
}

fn is_word_boundary_match(input: &str, start: usize, end: usize) -> bool {
    let before_ok = input[..start].chars().last().map_or(true, |c| !c.is_alphanumeric());
    let after_ok = input[end..].chars().next().map_or(true, |c| !c.is_alphanumeric());
    before_ok && after_ok
}
