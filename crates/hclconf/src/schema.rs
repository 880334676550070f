//! target shape description
//!
//! A type that can be loaded from a document implements [Configuration] and describes where attributes, blocks and
//! labels go. The description is plain data built once per decode, no runtime type introspection involved.
//!
//! ```
//! use hclconf::schema::{Configuration, Schema};
//!
//! #[derive(Default, serde::Serialize)]
//! struct Service {
//!     name: String,
//!     port: u16,
//! }
//!
//! impl Configuration for Service {
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .label("name", |service: &mut Self, name| service.name = name)
//!             .attribute("port", |service: &mut Self, port: u16| service.port = port)
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Config {
//!     services: Vec<Service>,
//! }
//!
//! impl Configuration for Config {
//!     fn schema() -> Schema<Self> {
//!         Schema::new().blocks("service", |config: &mut Self, service| config.services.push(service))
//!     }
//! }
//! ```
//!
//! Decoded blocks are published to the expression environment by serializing them, so the serialized field names
//! should match the hcl names used in the schema.
use crate::decode::Decoder;
use crate::error::{Diagnostic, Error};
use crate::value::Value;
use hcl_edit::structure::Block;
use hcl_edit::Span;
use serde::{de::DeserializeOwned, Serialize};

/// A type with a [Schema]
pub trait Configuration: Default + 'static {
    fn schema() -> Schema<Self>;
}

/// How often a block may appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    /// exactly once
    Single,
    /// zero or one time
    Optional,
    /// any number of times
    Repeated,
}

type AssignLabel<T> = Box<dyn Fn(&mut T, String)>;
type AssignAttribute<T> = Box<dyn Fn(&mut T, Value) -> Result<(), serde_json::Error>>;
type DecodeBlock<T> = Box<dyn Fn(&mut T, &Block, &Decoder<'_>) -> Result<Value, Error>>;

pub struct Schema<T> {
    label: Option<LabelSlot<T>>,
    attributes: Vec<AttributeSlot<T>>,
    blocks: Vec<BlockSlot<T>>,
}

impl<T: 'static> Schema<T> {
    pub fn new() -> Self {
        Self {
            label: None,
            attributes: vec![],
            blocks: vec![],
        }
    }

    /// Receive the (single) block label
    ///
    /// Blocks of a type with a label field must carry exactly one label, all others none.
    pub fn label(mut self, name: &'static str, assign: impl Fn(&mut T, String) + 'static) -> Self {
        self.label = Some(LabelSlot {
            name,
            assign: Box::new(assign),
        });
        self
    }

    /// Required attribute
    pub fn attribute<A: DeserializeOwned>(
        self,
        name: &'static str,
        assign: impl Fn(&mut T, A) + 'static,
    ) -> Self {
        self.push_attribute(name, true, assign)
    }

    pub fn optional_attribute<A: DeserializeOwned>(
        self,
        name: &'static str,
        assign: impl Fn(&mut T, A) + 'static,
    ) -> Self {
        self.push_attribute(name, false, assign)
    }

    /// Required block that may appear once
    pub fn block<B>(self, name: &'static str, assign: impl Fn(&mut T, B) + 'static) -> Self
    where
        B: Configuration + Serialize,
    {
        self.push_block(name, Multiplicity::Single, assign)
    }

    pub fn optional_block<B>(self, name: &'static str, assign: impl Fn(&mut T, B) + 'static) -> Self
    where
        B: Configuration + Serialize,
    {
        self.push_block(name, Multiplicity::Optional, assign)
    }

    /// Block that may appear any number of times, `assign` is called once per block in evaluation order
    pub fn blocks<B>(self, name: &'static str, assign: impl Fn(&mut T, B) + 'static) -> Self
    where
        B: Configuration + Serialize,
    {
        self.push_block(name, Multiplicity::Repeated, assign)
    }

    fn push_attribute<A: DeserializeOwned>(
        mut self,
        name: &'static str,
        required: bool,
        assign: impl Fn(&mut T, A) + 'static,
    ) -> Self {
        self.attributes.push(AttributeSlot {
            name,
            required,
            assign: Box::new(move |target: &mut T, value: Value| {
                assign(target, value.decode()?);
                Ok(())
            }),
        });
        self
    }

    fn push_block<B>(
        mut self,
        name: &'static str,
        multiplicity: Multiplicity,
        assign: impl Fn(&mut T, B) + 'static,
    ) -> Self
    where
        B: Configuration + Serialize,
    {
        let label_field = B::schema().label.map(|label| label.name);

        self.blocks.push(BlockSlot {
            name,
            multiplicity,
            labeled: label_field.is_some(),
            decode: Box::new(
                move |target: &mut T, block: &Block, decoder: &Decoder<'_>| -> Result<Value, Error> {
                    let decoded: B = decoder.decode_block(block)?;

                    let mut published = Value::encode(&decoded).map_err(|err| {
                        Diagnostic::new(
                            decoder.location(block.span()),
                            "Unrepresentable value".to_owned(),
                            format!("Decoded {name} block can not be used in expressions: {err}"),
                        )
                    })?;
                    // the label is the key the block is published under, not part of its value
                    if let (Some(label_field), Some(object)) = (label_field, published.as_object_mut()) {
                        object.shift_remove(label_field);
                    }

                    assign(target, decoded);
                    Ok(published)
                },
            ),
        });
        self
    }

    pub(crate) fn label_slot(&self) -> Option<&LabelSlot<T>> {
        self.label.as_ref()
    }

    pub(crate) fn find_attribute(&self, name: &str) -> Option<&AttributeSlot<T>> {
        self.attributes.iter().find(|slot| slot.name == name)
    }

    pub(crate) fn find_block(&self, name: &str) -> Option<&BlockSlot<T>> {
        self.blocks.iter().find(|slot| slot.name == name)
    }

    pub(crate) fn attribute_slots(&self) -> impl Iterator<Item = &AttributeSlot<T>> {
        self.attributes.iter()
    }

    pub(crate) fn block_slots(&self) -> impl Iterator<Item = &BlockSlot<T>> {
        self.blocks.iter()
    }
}

impl<T: 'static> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("label", &self.label.as_ref().map(|label| label.name))
            .field(
                "attributes",
                &self.attributes.iter().map(|a| a.name).collect::<Vec<_>>(),
            )
            .field(
                "blocks",
                &self
                    .blocks
                    .iter()
                    .map(|b| (b.name, b.multiplicity))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

pub(crate) struct LabelSlot<T> {
    name: &'static str,
    assign: AssignLabel<T>,
}

impl<T> LabelSlot<T> {
    pub(crate) fn assign(&self, target: &mut T, label: &str) {
        (self.assign)(target, label.to_owned())
    }
}

pub(crate) struct AttributeSlot<T> {
    pub(crate) name: &'static str,
    pub(crate) required: bool,
    assign: AssignAttribute<T>,
}

impl<T> AttributeSlot<T> {
    pub(crate) fn assign(&self, target: &mut T, value: Value) -> Result<(), serde_json::Error> {
        (self.assign)(target, value)
    }
}

pub(crate) struct BlockSlot<T> {
    pub(crate) name: &'static str,
    pub(crate) multiplicity: Multiplicity,
    pub(crate) labeled: bool,
    decode: DecodeBlock<T>,
}

impl<T> BlockSlot<T> {
    /// Decode `block` into `target` and return the value to publish
    pub(crate) fn decode(
        &self,
        target: &mut T,
        block: &Block,
        decoder: &Decoder<'_>,
    ) -> Result<Value, Error> {
        (self.decode)(target, block, decoder)
    }
}
