//! Block segmentation of finished reply text.
//!
//! Splits a complete response string into an ordered sequence of typed
//! content blocks that the pacing layer reveals one step at a time.
//! Segmentation is total: malformed markdown degrades to paragraph blocks,
//! it never fails.

use std::sync::OnceLock;

use regex::Regex;

/// A contiguous, semantically typed span of response text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// Fenced code region.
    Code {
        /// The exact opening fence line, trailing newline included (e.g. "```js\n").
        opening_fence: String,
        /// Trimmed body, lines newline-joined verbatim.
        body: String,
        /// Closing fence with its leading newline (e.g. "\n```"). Empty when
        /// the fence was still open at end of input.
        closing_fence: String,
    },
    /// A heading line, kept raw (`#` markers included).
    Header(String),
    /// Consecutive list-item lines, newline-joined.
    List(String),
    /// Prose lines, space-joined.
    Paragraph(String),
    /// Anything the segmenter does not classify. Never produced by
    /// [`segment`]; accepted by the pacing layer for completeness.
    Plain(String),
}

impl ContentBlock {
    /// The rendered form of this block alone, separators not included.
    pub fn render(&self) -> String {
        match self {
            ContentBlock::Code {
                opening_fence,
                body,
                closing_fence,
            } => format!("{opening_fence}{body}{closing_fence}"),
            ContentBlock::Header(text)
            | ContentBlock::List(text)
            | ContentBlock::Paragraph(text)
            | ContentBlock::Plain(text) => text.clone(),
        }
    }
}

/// Render a block sequence back into canonical text, blocks separated by a
/// blank line. `render(&segment(text)) == text` for block-normalized input,
/// and re-segmenting rendered output is stable for any input.
pub fn render(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .map(ContentBlock::render)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn opening_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(```\w*|~~~\w*)$").expect("opening fence regex"))
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#{1,6}\s+").expect("heading regex"))
}

fn list_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(-|\*|\+|\d+\.)\s+").expect("list item regex"))
}

/// A literal backtick fence closes any code region; the opening delimiter
/// repeated (```` ``` ```` or `~~~`) closes its own kind.
fn closes_fence(line: &str, opening: &str) -> bool {
    line == "```" || line == &opening[..3]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Paragraph,
    List,
}

/// The block currently under construction while scanning outside code regions.
struct Pending {
    kind: PendingKind,
    content: String,
}

impl Pending {
    fn paragraph() -> Self {
        Self {
            kind: PendingKind::Paragraph,
            content: String::new(),
        }
    }

    fn list(first_line: &str) -> Self {
        Self {
            kind: PendingKind::List,
            content: first_line.to_string(),
        }
    }

    fn flush_into(&mut self, blocks: &mut Vec<ContentBlock>) {
        if self.content.is_empty() {
            return;
        }
        let content = std::mem::take(&mut self.content);
        blocks.push(match self.kind {
            PendingKind::Paragraph => ContentBlock::Paragraph(content),
            PendingKind::List => ContentBlock::List(content),
        });
        self.kind = PendingKind::Paragraph;
    }
}

struct OpenCode {
    fence: String,
    body: String,
}

impl OpenCode {
    fn push_line(&mut self, line: &str) {
        if !self.body.is_empty() {
            self.body.push('\n');
        }
        self.body.push_str(line);
    }

    fn close(self, closing_line: Option<&str>) -> ContentBlock {
        ContentBlock::Code {
            opening_fence: format!("{}\n", self.fence),
            body: self.body.trim().to_string(),
            closing_fence: closing_line.map(|l| format!("\n{l}")).unwrap_or_default(),
        }
    }
}

/// Split `text` into typed content blocks. Pure and deterministic; never
/// fails. See [`ContentBlock`] for the block kinds and their payloads.
pub fn segment(text: &str) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();
    let mut pending = Pending::paragraph();
    let mut open_code: Option<OpenCode> = None;

    for line in text.split('\n') {
        if let Some(mut code) = open_code.take() {
            if closes_fence(line, &code.fence) {
                blocks.push(code.close(Some(line)));
                pending = Pending::paragraph();
            } else {
                code.push_line(line);
                open_code = Some(code);
            }
            continue;
        }

        if opening_fence_re().is_match(line) {
            pending.flush_into(&mut blocks);
            open_code = Some(OpenCode {
                fence: line.to_string(),
                body: String::new(),
            });
            continue;
        }

        if heading_re().is_match(line) {
            pending.flush_into(&mut blocks);
            blocks.push(ContentBlock::Header(line.to_string()));
            continue;
        }

        if list_item_re().is_match(line) {
            if pending.kind == PendingKind::List {
                pending.content.push('\n');
                pending.content.push_str(line);
            } else {
                pending.flush_into(&mut blocks);
                pending = Pending::list(line);
            }
            continue;
        }

        if line.trim().is_empty() {
            pending.flush_into(&mut blocks);
            continue;
        }

        if pending.kind != PendingKind::Paragraph {
            pending.flush_into(&mut blocks);
        }
        if !pending.content.is_empty() {
            pending.content.push(' ');
        }
        pending.content.push_str(line.trim_end());
    }

    // End of input: a still-open fence closes implicitly so the accumulated
    // body is not dropped; it renders without a closing fence.
    if let Some(code) = open_code {
        blocks.push(code.close(None));
    } else {
        pending.flush_into(&mut blocks);
    }

    blocks
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn paragraph(text: &str) -> ContentBlock {
        ContentBlock::Paragraph(text.to_string())
    }

    #[test]
    fn paragraph_and_code_scenario() {
        let blocks = segment("Hello world. \n\n```js\nconsole.log(1)\n```");
        assert_eq!(
            blocks,
            vec![
                paragraph("Hello world."),
                ContentBlock::Code {
                    opening_fence: "```js\n".to_string(),
                    body: "console.log(1)".to_string(),
                    closing_fence: "\n```".to_string(),
                },
            ]
        );
    }

    #[test]
    fn paragraph_lines_are_space_joined() {
        let blocks = segment("first line\nsecond line");
        assert_eq!(blocks, vec![paragraph("first line second line")]);
    }

    #[test]
    fn blank_line_splits_paragraphs() {
        let blocks = segment("one\n\ntwo");
        assert_eq!(blocks, vec![paragraph("one"), paragraph("two")]);
    }

    #[test]
    fn heading_is_standalone() {
        let blocks = segment("intro\n## Title\noutro");
        assert_eq!(
            blocks,
            vec![
                paragraph("intro"),
                ContentBlock::Header("## Title".to_string()),
                paragraph("outro"),
            ]
        );
    }

    #[test]
    fn seven_hashes_is_not_a_heading() {
        let blocks = segment("####### nope");
        assert_eq!(blocks, vec![paragraph("####### nope")]);
    }

    #[test]
    fn consecutive_list_items_group() {
        let blocks = segment("- a\n- b\n1. c\n\ndone");
        assert_eq!(
            blocks,
            vec![
                ContentBlock::List("- a\n- b\n1. c".to_string()),
                paragraph("done"),
            ]
        );
    }

    #[test]
    fn list_interrupts_paragraph() {
        let blocks = segment("text\n- item");
        assert_eq!(
            blocks,
            vec![paragraph("text"), ContentBlock::List("- item".to_string())]
        );
    }

    #[test]
    fn code_body_keeps_blank_lines() {
        let blocks = segment("```\na\n\nb\n```");
        assert_eq!(
            blocks,
            vec![ContentBlock::Code {
                opening_fence: "```\n".to_string(),
                body: "a\n\nb".to_string(),
                closing_fence: "\n```".to_string(),
            }]
        );
    }

    #[test]
    fn heading_inside_code_is_verbatim() {
        let blocks = segment("```\n# not a heading\n```");
        assert_eq!(
            blocks,
            vec![ContentBlock::Code {
                opening_fence: "```\n".to_string(),
                body: "# not a heading".to_string(),
                closing_fence: "\n```".to_string(),
            }]
        );
    }

    #[test]
    fn tilde_fence_closes_on_backticks_or_tildes() {
        let by_backticks = segment("~~~py\nx = 1\n```");
        assert_eq!(
            by_backticks,
            vec![ContentBlock::Code {
                opening_fence: "~~~py\n".to_string(),
                body: "x = 1".to_string(),
                closing_fence: "\n```".to_string(),
            }]
        );

        let by_tildes = segment("~~~py\nx = 1\n~~~");
        assert_eq!(
            by_tildes,
            vec![ContentBlock::Code {
                opening_fence: "~~~py\n".to_string(),
                body: "x = 1".to_string(),
                closing_fence: "\n~~~".to_string(),
            }]
        );
    }

    #[test]
    fn unterminated_fence_keeps_body() {
        let blocks = segment("before\n```rs\nlet x = 1;");
        assert_eq!(
            blocks,
            vec![
                paragraph("before"),
                ContentBlock::Code {
                    opening_fence: "```rs\n".to_string(),
                    body: "let x = 1;".to_string(),
                    closing_fence: String::new(),
                },
            ]
        );
    }

    #[test]
    fn empty_input_yields_no_blocks() {
        assert!(segment("").is_empty());
        assert!(segment("\n\n\n").is_empty());
    }

    #[test]
    fn render_round_trips_normalized_text() {
        for text in [
            "Hello world.",
            "Hello world.\n\n```js\nconsole.log(1)\n```",
            "```js\nconsole.log(1)\n```\n\nafter",
            "# Title\n\n- one\n- two\n\nclosing words",
            "```rs\nstill open",
        ] {
            assert_eq!(render(&segment(text)), text, "round trip for {text:?}");
        }
    }

    #[test]
    fn resegmentation_is_idempotent_on_fixtures() {
        for text in [
            "a \nb\n\n\nc",
            "# h\nnext\n- l1\n- l2\ntail",
            "~~~\nbody\n~~~\ntrailing",
            "opened\n```\nnever closed",
        ] {
            let once = segment(text);
            let twice = segment(&render(&once));
            assert_eq!(once, twice, "idempotent segmentation for {text:?}");
        }
    }

    proptest! {
        #[test]
        fn resegmentation_is_idempotent(
            lines in proptest::collection::vec(
                prop_oneof![
                    Just("".to_string()),
                    "[a-z .!?]{0,20}",
                    Just("```".to_string()),
                    Just("```js".to_string()),
                    Just("~~~".to_string()),
                    Just("# heading here".to_string()),
                    Just("- list item".to_string()),
                    Just("2. numbered".to_string()),
                ],
                0..16,
            )
        ) {
            let text = lines.join("\n");
            let once = segment(&text);
            let twice = segment(&render(&once));
            prop_assert_eq!(once, twice);
        }
    }
}
