//! Pacing policy for the typing simulation.
//!
//! Maps a [`ContentBlock`] to the ordered steps that reveal it: each step
//! carries the fragment to append to the display buffer and the pause that
//! follows it. Pure; the controller in [`crate::typing`] does the clocking.

use std::time::Duration;

use crate::segment::ContentBlock;

const CODE_FENCE_DELAY: Duration = Duration::from_millis(300);
const CODE_LINE_DELAY: Duration = Duration::from_millis(30);
const LIST_LINE_DELAY: Duration = Duration::from_millis(150);
const BLOCK_BREAK_DELAY: Duration = Duration::from_millis(300);
const HEADER_PAUSE: Duration = Duration::from_millis(400);
const PLAIN_DELAY: Duration = Duration::from_millis(200);

const SENTENCE_END_SHORT: Duration = Duration::from_millis(200);
const SENTENCE_END_LONG: Duration = Duration::from_millis(100);
const WORD_GROUP_SHORT: Duration = Duration::from_millis(100);
const WORD_GROUP_LONG: Duration = Duration::from_millis(50);
const WORD_SHORT: Duration = Duration::from_millis(50);
const WORD_LONG: Duration = Duration::from_millis(30);

/// Word count below which a paragraph is paced as "short" (slower, more
/// deliberate reveal).
const SHORT_PARAGRAPH_WORDS: usize = 15;

/// One reveal step: append `fragment`, then wait `delay`.
///
/// A `silent` step grows the display buffer without publishing it; the
/// appended text becomes visible with the next published step. Only the
/// header block break uses this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingStep {
    pub fragment: String,
    pub delay: Duration,
    pub silent: bool,
}

impl TypingStep {
    fn new(fragment: impl Into<String>, delay: Duration) -> Self {
        Self {
            fragment: fragment.into(),
            delay,
            silent: false,
        }
    }

    fn silent(fragment: impl Into<String>, delay: Duration) -> Self {
        Self {
            fragment: fragment.into(),
            delay,
            silent: true,
        }
    }
}

/// The ordered reveal steps for one block. Deterministic.
pub fn steps(block: &ContentBlock) -> Vec<TypingStep> {
    match block {
        ContentBlock::Code {
            opening_fence,
            body,
            closing_fence,
        } => code_steps(opening_fence, body, closing_fence),
        ContentBlock::Paragraph(text) => paragraph_steps(text),
        ContentBlock::List(text) => list_steps(text),
        ContentBlock::Header(text) => vec![
            TypingStep::new(text.clone(), Duration::ZERO),
            TypingStep::silent("\n\n", HEADER_PAUSE),
        ],
        ContentBlock::Plain(text) => vec![TypingStep::new(text.clone(), PLAIN_DELAY)],
    }
}

fn code_steps(opening_fence: &str, body: &str, closing_fence: &str) -> Vec<TypingStep> {
    let mut out = vec![TypingStep::new(opening_fence, CODE_FENCE_DELAY)];
    for (idx, line) in body.split('\n').enumerate() {
        let fragment = if idx == 0 {
            line.to_string()
        } else {
            format!("\n{line}")
        };
        out.push(TypingStep::new(fragment, CODE_LINE_DELAY));
    }
    if !closing_fence.is_empty() {
        out.push(TypingStep::new(closing_fence, CODE_FENCE_DELAY));
    }
    out
}

fn paragraph_steps(text: &str) -> Vec<TypingStep> {
    let words: Vec<&str> = text.split(' ').collect();
    let short = words.len() < SHORT_PARAGRAPH_WORDS;

    let mut out = Vec::with_capacity(words.len() + 1);
    for (idx, word) in words.iter().enumerate() {
        let fragment = if idx == 0 {
            (*word).to_string()
        } else {
            format!(" {word}")
        };
        out.push(TypingStep::new(fragment, word_delay(word, idx, short)));
    }
    out.push(TypingStep::new("\n\n", BLOCK_BREAK_DELAY));
    out
}

fn word_delay(word: &str, idx: usize, short: bool) -> Duration {
    if ends_sentence(word) {
        if short {
            SENTENCE_END_SHORT
        } else {
            SENTENCE_END_LONG
        }
    } else if idx % 5 == 4 {
        if short {
            WORD_GROUP_SHORT
        } else {
            WORD_GROUP_LONG
        }
    } else if short {
        WORD_SHORT
    } else {
        WORD_LONG
    }
}

fn ends_sentence(word: &str) -> bool {
    word.ends_with(['.', '!', '?'])
}

fn list_steps(text: &str) -> Vec<TypingStep> {
    let mut out: Vec<TypingStep> = text
        .split('\n')
        .enumerate()
        .map(|(idx, line)| {
            let fragment = if idx == 0 {
                line.to_string()
            } else {
                format!("\n{line}")
            };
            TypingStep::new(fragment, LIST_LINE_DELAY)
        })
        .collect();
    out.push(TypingStep::new("\n\n", BLOCK_BREAK_DELAY));
    out
}
