/*!
 * Prompt template for transcript cleanup.
 *
 * A template is plain text with one `{content}` placeholder that receives
 * the transcript (or chunk) text. `{{` and `}}` produce literal braces so
 * templates can show JSON or code examples.
 */

use crate::errors::ProcessingError;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Content,
}

/// Parsed prompt template
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Placeholder replaced with the text to clean
    pub const PLACEHOLDER: &'static str = "content";

    /// Parse a template, rejecting unknown placeholders and unbalanced braces
    pub fn new(template: &str) -> Result<Self, ProcessingError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();
        let mut has_content = false;

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(ProcessingError::Template("unclosed '{' in template".to_string()));
                    }
                    if name.trim() != Self::PLACEHOLDER {
                        return Err(ProcessingError::Template(format!("unknown placeholder '{{{}}}'", name)));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Content);
                    has_content = true;
                }
                '}' => {
                    return Err(ProcessingError::Template("unmatched '}' in template".to_string()));
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        if !has_content {
            return Err(ProcessingError::Template("template has no {content} placeholder".to_string()));
        }

        Ok(Self { segments })
    }

    /// Substitute `content` for every placeholder
    pub fn render(&self, content: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Content => out.push_str(content),
            }
        }
        out
    }
}
