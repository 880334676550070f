//! a parsed hcl document ([Body] and the text it was parsed from)
//!
//! [Document] keeps the original source so that byte spans reported by [hcl_edit] can be turned into
//! `file:line:column` locations for error messages.
use crate::error::{Error, Location};
use hcl_edit::structure::Body;
use std::ops::Range;
use std::path::Path;

#[derive(Debug)]
pub struct Document {
    name: String,
    text: String,
    body: Body,
}

impl Document {
    /// Parses hcl source bytes
    ///
    /// `name` is only used to describe locations, usually it is the path of the file the source was read from.
    pub fn parse(source: &[u8], name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();

        let text = match std::str::from_utf8(source) {
            Ok(text) => text.to_owned(),
            Err(err) => {
                let location = locate(&name, &String::from_utf8_lossy(source), err.valid_up_to());
                return Err(Error::Parse {
                    location,
                    message: "source is not valid utf-8".to_owned(),
                });
            }
        };

        let body = hcl_edit::parser::parse_body(&text).map_err(|err| Error::Parse {
            location: Location::new(
                name.clone(),
                err.location().line(),
                err.location().column(),
            ),
            message: err.message().to_owned(),
        })?;

        Ok(Self { name, text, body })
    }

    pub fn load_file(path: &Path) -> Result<Self, Error> {
        tracing::info!(path=%path.display(), "loading file");

        let source = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;

        Self::parse(&source, path.display().to_string())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Location of a span as reported by [hcl_edit::Span::span]
    ///
    /// Elements without a span (constructed, not parsed) point at the start of the document.
    pub fn location(&self, span: Option<Range<usize>>) -> Location {
        let offset = span.map(|span| span.start).unwrap_or_default();
        locate(&self.name, &self.text, offset)
    }
}

fn locate(name: &str, text: &str, offset: usize) -> Location {
    let offset = offset.min(text.len());
    let before = text.get(..offset).unwrap_or(text);

    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;

    Location::new(name.to_owned(), line, column)
}

/// Utility macro to create a [Document]
///
/// ```
/// # use hclconf::document;
/// let document = document!("attribute = 42");
/// assert_eq!(document.name(), "test.hcl");
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use hclconf::document;
/// document!("not = valid = hcl");
/// ```
#[macro_export]
macro_rules! document {
    { $expr:expr } => {
        $crate::document::Document::parse($expr.as_bytes(), "test.hcl").expect("document must parse")
    };
}
