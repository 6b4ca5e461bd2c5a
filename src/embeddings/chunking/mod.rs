
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::{IndexError, Result};

pub const DEFAULT_SENTENCES_PER_CHUNK: usize = 3;

const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "cf", "al",
    "fig", "figs", "eq", "vol", "pp", "inc", "ltd", "corp", "approx", "dept", "u.s", "u.k",
];

/// A group of consecutive sentences embedded as one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Sentences joined with single spaces
    pub content: String,
    /// The sentences this chunk was built from, in source order
    pub sentences: Vec<String>,
    /// Position of this chunk within the document
    pub chunk_index: usize,
}

/// Configuration for sentence chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Number of sentences grouped into each chunk
    pub sentences_per_chunk: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            sentences_per_chunk: DEFAULT_SENTENCES_PER_CHUNK,
        }
    }
}

/// Sentence boundary detection
pub trait SentenceSplitter: Send + Sync {
    fn split_sentences(&self, text: &str) -> Result<Vec<String>>;
}

/// Punctuation-driven sentence splitter.
///
/// A sentence ends at a run of `.`, `!` or `?` (plus any closing quotes or
/// brackets) when whitespace follows and the next word starts like a new
/// sentence. Known abbreviations and single-letter initials other than the
/// pronoun `I` are not treated as boundaries. Whitespace inside a sentence, including line breaks from
/// extracted PDFs, is collapsed to single spaces.
#[derive(Debug, Clone)]
pub struct RuleBasedSplitter {
    abbreviations: HashSet<String>,
}

impl Default for RuleBasedSplitter {
    #[inline]
    fn default() -> Self {
        Self {
            abbreviations: DEFAULT_ABBREVIATIONS
                .iter()
                .map(|abbr| (*abbr).to_string())
                .collect(),
        }
    }
}

impl RuleBasedSplitter {
    /// Add an abbreviation, written without its final period (e.g. `"approx"`)
    #[inline]
    pub fn with_abbreviation(mut self, abbreviation: &str) -> Self {
        self.abbreviations
            .insert(abbreviation.trim_end_matches('.').to_lowercase());
        self
    }

    fn ends_with_abbreviation(&self, sentence: &str) -> bool {
        let Some(last_word) = sentence.split_whitespace().next_back() else {
            return false;
        };

        let word = last_word
            .trim_start_matches(is_opening_punctuation)
            .strip_suffix('.')
            .unwrap_or(last_word);

        let mut chars = word.chars();
        // "I" is far more often the pronoun than an initial
        let is_initial =
            matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase() && c != 'I');

        is_initial || self.abbreviations.contains(&word.to_lowercase())
    }
}

impl SentenceSplitter for RuleBasedSplitter {
    fn split_sentences(&self, text: &str) -> Result<Vec<String>> {
        let chars: Vec<char> = text.chars().collect();
        let mut sentences = Vec::new();
        let mut current = String::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            i += 1;

            if c.is_whitespace() {
                if !current.is_empty() && !current.ends_with(' ') {
                    current.push(' ');
                }
                continue;
            }

            current.push(c);
            if !is_terminator(c) {
                continue;
            }

            let mut terminator_run = 1;
            while i < chars.len() && (is_terminator(chars[i]) || is_closing_punctuation(chars[i]))
            {
                if is_terminator(chars[i]) {
                    terminator_run += 1;
                }
                current.push(chars[i]);
                i += 1;
            }

            // "3.14", "U.S.", "example.com" and friends
            if i < chars.len() && !chars[i].is_whitespace() {
                continue;
            }

            let Some(next) = chars[i..].iter().find(|ch| !ch.is_whitespace()) else {
                continue;
            };

            if c == '.' && terminator_run == 1 && self.ends_with_abbreviation(&current) {
                continue;
            }

            if !starts_sentence(*next) {
                continue;
            }

            push_sentence(&mut sentences, &mut current);
        }

        push_sentence(&mut sentences, &mut current);

        Ok(sentences)
    }
}

fn push_sentence(sentences: &mut Vec<String>, current: &mut String) {
    let sentence = current.trim();
    if !sentence.is_empty() {
        sentences.push(sentence.to_string());
    }
    current.clear();
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…')
}

fn is_closing_punctuation(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '”' | '’' | '»')
}

fn is_opening_punctuation(c: char) -> bool {
    matches!(c, '"' | '\'' | '(' | '[' | '“' | '‘' | '«')
}

fn starts_sentence(c: char) -> bool {
    c.is_uppercase() || c.is_numeric() || is_opening_punctuation(c)
}

/// Chunk `text` into groups of `size` sentences using the default splitter
#[inline]
pub fn chunk_text(text: &str, size: usize) -> Result<Vec<Chunk>> {
    chunk_with(&RuleBasedSplitter::default(), text, size)
}

/// Chunk `text` into consecutive, non-overlapping groups of `size` sentences.
///
/// The last chunk may hold fewer than `size` sentences. Blank input yields no
/// chunks.
#[inline]
pub fn chunk_with<S>(splitter: &S, text: &str, size: usize) -> Result<Vec<Chunk>>
where
    S: SentenceSplitter + ?Sized,
{
    if size == 0 {
        return Err(IndexError::Config(
            "chunk size must be at least one sentence".to_string(),
        ));
    }

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let sentences = splitter.split_sentences(text)?;

    let chunks: Vec<Chunk> = sentences
        .chunks(size)
        .enumerate()
        .map(|(chunk_index, group)| Chunk {
            content: group.join(" "),
            sentences: group.to_vec(),
            chunk_index,
        })
        .collect();

    debug!(
        "Chunked {} sentences into {} chunks of up to {} sentences",
        sentences.len(),
        chunks.len(),
        size
    );

    Ok(chunks)
}
