//! decoding of block bodies against a [Schema]
use crate::document::Document;
use crate::error::{Diagnostic, Diagnostics, Error, Location};
use crate::functions;
use crate::schema::{Configuration, Multiplicity, Schema};
use crate::value::Value;
use hcl::eval::{Context, ErrorKind, Evaluate};
use hcl_edit::structure::{Attribute, Block, Body, Structure};
use hcl_edit::Span;
use std::collections::HashMap;
use std::ops::Range;

/// Evaluates expressions of one document against the current environment
pub struct Decoder<'a> {
    document: &'a Document,
    context: &'a Context<'static>,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(document: &'a Document, context: &'a Context<'static>) -> Self {
        Self { document, context }
    }

    pub fn location(&self, span: Option<Range<usize>>) -> Location {
        self.document.location(span)
    }

    pub(crate) fn evaluate(&self, attribute: &Attribute) -> Result<Value, Error> {
        let expression: hcl::Expression = attribute.value.clone().into();

        match expression.evaluate(self.context) {
            Ok(value) => Ok(value.into()),
            Err(error) => Err(self.evaluation_error(attribute, error)),
        }
    }

    fn evaluation_error(&self, attribute: &Attribute, error: hcl::eval::Error) -> Error {
        let location = self.location(attribute.span());

        let summary = match error.kind() {
            ErrorKind::FuncCall(func, message) => {
                if let Some(name) = functions::missing_variable(&func.to_string(), message) {
                    return Error::MissingEnv { location, name };
                }
                "Error in function call"
            }
            ErrorKind::UndefinedVar(_) => "Unknown variable",
            ErrorKind::UndefinedFunc(_) => "Call to unknown function",
            _ => "Invalid expression",
        };

        Diagnostic::new(location, summary.to_owned(), error.to_string()).into()
    }

    /// Decode a block (label and body) into a new `B`
    pub(crate) fn decode_block<B: Configuration>(&self, block: &Block) -> Result<B, Error> {
        let schema = B::schema();
        let mut target = B::default();

        if let (Some(slot), Some(label)) = (schema.label_slot(), block.labels.first()) {
            slot.assign(&mut target, label.as_str());
        }

        self.decode_body(&mut target, &schema, &block.body, block.span())?;
        Ok(target)
    }

    /// Decode every attribute and nested block of `body` into `target`
    ///
    /// All problems of the body are collected before failing. A missing environment variable aborts immediately.
    /// Missing attributes and blocks are reported at `span`.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) fn decode_body<B: 'static>(
        &self,
        target: &mut B,
        schema: &Schema<B>,
        body: &Body,
        span: Option<Range<usize>>,
    ) -> Result<(), Error> {
        let mut e = Diagnostics::default();
        let mut attributes: HashMap<&str, &Attribute> = HashMap::new();
        let mut blocks: HashMap<&str, &Block> = HashMap::new();

        for structure in body.iter() {
            match structure {
                Structure::Attribute(attribute) => {
                    let name = attribute.key.value().as_str();

                    let Some(slot) = schema.find_attribute(name) else {
                        e.log(self.diagnostic(
                            attribute.span(),
                            "Unsupported argument",
                            format!("An argument named {name:?} is not expected here."),
                        ));
                        continue;
                    };

                    if let Some(existing) = attributes.insert(name, attribute) {
                        e.log(self.diagnostic(
                            attribute.span(),
                            "Duplicate argument",
                            format!(
                                "The argument {name:?} was already set at {}.",
                                self.location(existing.span())
                            ),
                        ));
                        continue;
                    }

                    match self.evaluate(attribute) {
                        Ok(value) => {
                            if let Err(err) = slot.assign(target, value) {
                                e.log(self.diagnostic(
                                    attribute.span(),
                                    "Unsuitable value type",
                                    format!("Unsuitable value for {name:?}: {err}"),
                                ));
                            }
                        }
                        Err(Error::Diagnostics(found)) => found.0.into_iter().for_each(|d| e.log(d)),
                        Err(err) => return Err(err),
                    }
                }
                Structure::Block(block) => {
                    let type_name = block.ident.value().as_str();

                    let Some(slot) = schema.find_block(type_name) else {
                        e.log(self.diagnostic(
                            block.span(),
                            "Unsupported block type",
                            format!("Blocks of type {type_name:?} are not expected here."),
                        ));
                        continue;
                    };

                    if let Some(diagnostic) = check_labels(self.document, block, slot.labeled) {
                        e.log(diagnostic);
                        continue;
                    }

                    if slot.multiplicity != Multiplicity::Repeated {
                        if let Some(existing) = blocks.insert(type_name, block) {
                            e.log(self.diagnostic(
                                block.span(),
                                &format!("Duplicate {type_name} block"),
                                format!(
                                    "Only one {type_name} block is allowed. Another was defined at {}.",
                                    self.location(existing.span())
                                ),
                            ));
                            continue;
                        }
                    } else {
                        blocks.entry(type_name).or_insert(block);
                    }

                    match slot.decode(target, block, self) {
                        Ok(_) => {}
                        Err(Error::Diagnostics(found)) => found.0.into_iter().for_each(|d| e.log(d)),
                        Err(err) => return Err(err),
                    }
                }
            }
        }

        for slot in schema.attribute_slots() {
            if slot.required && !attributes.contains_key(slot.name) {
                e.log(self.diagnostic(
                    span.clone(),
                    "Missing required argument",
                    format!(
                        "The argument {:?} is required, but no definition was found.",
                        slot.name
                    ),
                ));
            }
        }

        for slot in schema.block_slots() {
            if slot.multiplicity == Multiplicity::Single && !blocks.contains_key(slot.name) {
                e.log(self.diagnostic(
                    span.clone(),
                    &format!("Missing {} block", slot.name),
                    format!("A {} block is required.", slot.name),
                ));
            }
        }

        e.into_result()
    }

    fn diagnostic(&self, span: Option<Range<usize>>, summary: &str, detail: String) -> Diagnostic {
        Diagnostic::new(self.location(span), summary.to_owned(), detail)
    }
}

/// Blocks of labeled types carry exactly one label, all other blocks none
pub(crate) fn check_labels(document: &Document, block: &Block, labeled: bool) -> Option<Diagnostic> {
    let type_name = block.ident.value().as_str();
    let location = document.location(block.span());

    match (labeled, block.labels.len()) {
        (true, 0) => Some(Diagnostic::new(
            location,
            format!("Missing name for {type_name}"),
            format!("All {type_name} blocks must have 1 label (name)."),
        )),
        (true, 1) | (false, 0) => None,
        (true, _) => Some(Diagnostic::new(
            location,
            format!("Extraneous label for {type_name}"),
            format!("Only 1 label (name) is expected for {type_name} blocks."),
        )),
        (false, _) => Some(Diagnostic::new(
            location,
            format!("Extraneous label for {type_name}"),
            format!("No labels are expected for {type_name} blocks."),
        )),
    }
}
