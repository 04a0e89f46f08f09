//! Notion block model and the text renderer shared by the import path.

/// Closed set of block kinds the renderer understands. Anything else the
/// API returns degrades to [`Block::Unsupported`] with its type name.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph { text: String },
    Heading1 { text: String },
    Heading2 { text: String },
    Heading3 { text: String },
    BulletedListItem { text: String, children: Vec<Block> },
    NumberedListItem { text: String, children: Vec<Block> },
    ToDo { text: String, checked: bool },
    Toggle { text: String, children: Vec<Block> },
    Quote { text: String },
    Code { text: String, language: String },
    Callout { text: String },
    Image { caption: String },
    Video { caption: String },
    Equation { expression: String },
    Divider,
    Unsupported { kind: String },
}

/// Flatten a block tree into Markdown-ish plain text. Deterministic and
/// side-effect free.
pub fn render_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut numbered_position = 0_usize;

    for block in blocks {
        if !matches!(block, Block::NumberedListItem { .. }) {
            numbered_position = 0;
        }

        match block {
            Block::Paragraph { text } => {
                if !text.is_empty() {
                    push_line(&mut out, text);
                }
            }
            Block::Heading1 { text } => push_line(&mut out, &format!("# {text}")),
            Block::Heading2 { text } => push_line(&mut out, &format!("## {text}")),
            Block::Heading3 { text } => push_line(&mut out, &format!("### {text}")),
            Block::BulletedListItem { text, children } => {
                push_line(&mut out, &format!("- {text}"));
                push_children(&mut out, children);
            }
            Block::NumberedListItem { text, children } => {
                numbered_position += 1;
                push_line(&mut out, &format!("{numbered_position}. {text}"));
                push_children(&mut out, children);
            }
            Block::ToDo { text, checked } => {
                let marker = if *checked { "[x]" } else { "[ ]" };
                push_line(&mut out, &format!("{marker} {text}"));
            }
            Block::Toggle { text, children } => {
                push_line(&mut out, text);
                push_children(&mut out, children);
            }
            Block::Quote { text } => push_line(&mut out, &format!("> {text}")),
            Block::Code { text, language } => {
                push_line(&mut out, &format!("```{language}\n{text}\n```"));
            }
            Block::Callout { text } => push_line(&mut out, &format!("> {text}")),
            Block::Image { caption } => {
                if !caption.is_empty() {
                    push_line(&mut out, &format!("[image: {caption}]"));
                }
            }
            Block::Video { caption } => {
                if !caption.is_empty() {
                    push_line(&mut out, &format!("[video: {caption}]"));
                }
            }
            Block::Equation { expression } => push_line(&mut out, expression),
            Block::Divider => push_line(&mut out, "---"),
            Block::Unsupported { kind } => push_line(&mut out, &format!("[{kind} block]")),
        }
    }

    out.trim_end().to_string()
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn push_children(out: &mut String, children: &[Block]) {
    if children.is_empty() {
        return;
    }
    let rendered = render_blocks(children);
    for line in rendered.lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
}
