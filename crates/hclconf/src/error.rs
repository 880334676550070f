//! error taxonomy
//!
//! Every failure of a load aborts the whole pass and is reported as one [Error]. Callers are expected to match on
//! the variant, e.g. to handle [Error::Cycle] differently from [Error::Diagnostics].
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unable to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{location}: {message}")]
    Parse { location: Location, message: String },
    #[error("{0}")]
    Diagnostics(Diagnostics),
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error("{location}: missing required {field:?} attribute in {type_name} {name:?}")]
    MissingField {
        location: Location,
        type_name: String,
        name: String,
        field: String,
    },
    #[error("{location}: environment variable {name:?} is not set")]
    MissingEnv { location: Location, name: String },
}

impl From<Diagnostic> for Error {
    fn from(value: Diagnostic) -> Self {
        Error::Diagnostics(Diagnostics(vec![value]))
    }
}

impl From<Diagnostics> for Error {
    fn from(value: Diagnostics) -> Self {
        Error::Diagnostics(value)
    }
}

/// Circular dependency between entities
///
/// `cycle` is a closed path: the first and the last element are the same key.
#[derive(thiserror::Error, derive_new::new, Debug, Clone, PartialEq, Eq)]
#[error("circular dependency detected: {}", cycle.join(" -> "))]
pub struct CycleError {
    pub cycle: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(file: String, line: usize, column: usize) -> Self {
        Self { file, line, column }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A single problem found in a document
#[derive(derive_new::new, Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Location,
    pub summary: String,
    pub detail: String,
    /// Top-level block the problem was found in
    #[new(default)]
    pub block: Option<BlockContext>,
}

impl Diagnostic {
    pub fn in_block(mut self, block: BlockContext) -> Self {
        // innermost context is already the most helpful one
        if self.block.is_none() {
            self.block = Some(block);
        }
        self
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}; {}", self.location, self.summary, self.detail)?;
        if let Some(block) = &self.block {
            write!(f, " ({block})")?;
        }
        Ok(())
    }
}

#[derive(derive_new::new, Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    pub type_name: String,
    pub label: Option<String>,
    pub location: Location,
}

impl Display for BlockContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.label {
            Some(label) => write!(
                f,
                "in block {} {label:?} at {}",
                self.type_name, self.location
            ),
            None => write!(f, "in block {} at {}", self.type_name, self.location),
        }
    }
}

/// Aggregated [Diagnostic]s, displayed one per line
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl Diagnostics {
    pub fn log(&mut self, diagnostic: Diagnostic) {
        tracing::trace!(?diagnostic, "issue found");
        self.0.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// `Ok` when nothing was logged
    pub fn into_result(self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Diagnostics(self))
        }
    }

    pub fn in_block(self, block: &BlockContext) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|diagnostic| diagnostic.in_block(block.clone()))
                .collect(),
        )
    }
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, diagnostic) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            diagnostic.fmt(f)?;
        }
        Ok(())
    }
}
