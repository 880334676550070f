//! Collection of named [Entity]s
//!
//! Every root attribute and every root block the schema knows about becomes one entity. Its key is what other
//! entities refer to:
//!
//! | document                          | kind              | key           |
//! |-----------------------------------|-------------------|---------------|
//! | `group = "ops"`                   | TopLevelAttribute | `group`       |
//! | `database { ... }`                | TypedBlock        | `database`    |
//! | `service "api" { ... }`           | LabeledBlock      | `service.api` |
//! | `var "base" { default = "..." }`  | Variable          | `var.base`    |
//!
//! Nested blocks do not get keys of their own, whatever they refer to is attributed to the root block.
use crate::decode::check_labels;
use crate::document::Document;
use crate::environment::VARIABLE_NAMESPACE;
use crate::error::{BlockContext, Diagnostic, Diagnostics, Error};
use crate::schema::{Multiplicity, Schema};
use hcl_edit::structure::{Attribute, Block, Structure};
use hcl_edit::Span;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// unlabeled block, e.g. `database {}`
    TypedBlock,
    /// labeled block, e.g. `service "api" {}`
    LabeledBlock,
    /// root attribute, e.g. `group = "ops"`
    TopLevelAttribute,
    /// variable declaration, e.g. `var "base" {}`
    Variable,
}

#[derive(Debug, Clone, Copy)]
pub enum Source<'d> {
    Attribute(&'d Attribute),
    Block(&'d Block),
}

#[derive(Debug)]
pub struct Entity<'d> {
    pub kind: EntityKind,
    pub type_name: String,
    pub label: Option<String>,
    pub key: String,
    pub source: Source<'d>,
}

impl<'d> Entity<'d> {
    fn attribute(attribute: &'d Attribute) -> Self {
        let name = attribute.key.value().as_str().to_owned();
        Self {
            kind: EntityKind::TopLevelAttribute,
            key: name.clone(),
            type_name: name,
            label: None,
            source: Source::Attribute(attribute),
        }
    }

    fn block(block: &'d Block, kind: EntityKind) -> Self {
        let type_name = block.ident.value().as_str().to_owned();
        let label = match kind {
            EntityKind::LabeledBlock | EntityKind::Variable => {
                block.labels.first().map(|label| label.as_str().to_owned())
            }
            _ => None,
        };
        let key = match &label {
            Some(label) => format!("{type_name}.{label}"),
            None => type_name.clone(),
        };

        Self {
            kind,
            type_name,
            label,
            key,
            source: Source::Block(block),
        }
    }

    /// Expressions directly owned by this entity
    pub fn expressions(&self) -> Vec<hcl::Expression> {
        match self.source {
            Source::Attribute(attribute) => vec![attribute.value.clone().into()],
            Source::Block(block) => block
                .body
                .attributes()
                .map(|attribute| attribute.value.clone().into())
                .collect(),
        }
    }

    /// Blocks declared directly inside of this entity
    pub fn nested_children(&self) -> impl Iterator<Item = &'d Block> {
        let body = match self.source {
            Source::Block(block) => Some(&block.body),
            Source::Attribute(_) => None,
        };
        body.into_iter().flat_map(|body| body.blocks())
    }

    pub fn block_context(&self, document: &Document) -> BlockContext {
        let span = match self.source {
            Source::Attribute(attribute) => attribute.span(),
            Source::Block(block) => block.span(),
        };
        BlockContext::new(
            self.type_name.clone(),
            self.label.clone(),
            document.location(span),
        )
    }
}

#[derive(Debug)]
pub struct Catalog<'d> {
    entities: Vec<Entity<'d>>,
}

impl<'d> Catalog<'d> {
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn new<T: 'static>(document: &'d Document, schema: &Schema<T>) -> Result<Self, Error> {
        let mut e = Diagnostics::default();
        let mut entities = vec![];

        for structure in document.body().iter() {
            match structure {
                Structure::Attribute(attribute) => {
                    let name = attribute.key.value().as_str();
                    if name == VARIABLE_NAMESPACE {
                        e.log(Diagnostic::new(
                            document.location(attribute.span()),
                            "Reserved name".to_owned(),
                            format!("{name:?} is reserved for variable declarations."),
                        ));
                        continue;
                    }

                    if schema.find_attribute(name).is_none() {
                        tracing::debug!(name, "attribute not in schema, usable in expressions only");
                    }

                    entities.push(Entity::attribute(attribute));
                }
                Structure::Block(block) => {
                    let type_name = block.ident.value().as_str();

                    let kind = if type_name == VARIABLE_NAMESPACE {
                        EntityKind::Variable
                    } else if let Some(slot) = schema.find_block(type_name) {
                        if slot.labeled {
                            EntityKind::LabeledBlock
                        } else {
                            EntityKind::TypedBlock
                        }
                    } else {
                        tracing::debug!(type_name, "ignoring block not in schema");
                        continue;
                    };

                    let labeled = matches!(kind, EntityKind::LabeledBlock | EntityKind::Variable);
                    if let Some(diagnostic) = check_labels(document, block, labeled) {
                        e.log(diagnostic);
                        continue;
                    }

                    entities.push(Entity::block(block, kind));
                }
            }
        }

        let mut first_seen: IndexMap<&str, &Entity> = IndexMap::new();
        for entity in &entities {
            let Some(existing) = first_seen.get(entity.key.as_str()) else {
                first_seen.insert(&entity.key, entity);
                continue;
            };

            let repeated = entity.kind == EntityKind::TypedBlock
                && existing.kind == EntityKind::TypedBlock
                && schema
                    .find_block(&entity.type_name)
                    .is_some_and(|slot| slot.multiplicity == Multiplicity::Repeated);
            if repeated {
                continue;
            }

            let existing_location = existing.block_context(document).location;
            let location = entity.block_context(document).location;
            let diagnostic = match (existing.kind, entity.kind) {
                (EntityKind::TopLevelAttribute, EntityKind::TopLevelAttribute) => Diagnostic::new(
                    location,
                    "Duplicate argument".to_owned(),
                    format!(
                        "The argument {:?} was already set at {existing_location}.",
                        entity.key
                    ),
                ),
                (a, b) if a == b => Diagnostic::new(
                    location,
                    format!("Duplicate {} block", entity.key),
                    format!(
                        "Only one {} block is allowed. Another was defined at {existing_location}.",
                        entity.key
                    ),
                ),
                _ => Diagnostic::new(
                    location,
                    "Duplicate definition".to_owned(),
                    format!(
                        "{:?} is already defined at {existing_location}.",
                        entity.key
                    ),
                ),
            };
            e.log(diagnostic);
        }

        // `service = ...` and `service "api" {}` would both be published as `service`
        for attribute in entities.iter().filter(|entity| entity.kind == EntityKind::TopLevelAttribute) {
            let labeled = entities
                .iter()
                .find(|entity| entity.kind == EntityKind::LabeledBlock && entity.type_name == attribute.key);
            if let Some(block) = labeled {
                e.log(Diagnostic::new(
                    attribute.block_context(document).location,
                    "Duplicate definition".to_owned(),
                    format!(
                        "{:?} is already used by the {} block at {}.",
                        attribute.key,
                        block.key,
                        block.block_context(document).location
                    ),
                ));
            }
        }

        let start = document.location(None);
        for slot in schema.attribute_slots() {
            let present = entities
                .iter()
                .any(|entity| entity.kind == EntityKind::TopLevelAttribute && entity.key == slot.name);
            if slot.required && !present {
                e.log(Diagnostic::new(
                    start.clone(),
                    "Missing required argument".to_owned(),
                    format!(
                        "The argument {:?} is required, but no definition was found.",
                        slot.name
                    ),
                ));
            }
        }

        for slot in schema.block_slots() {
            let present = entities.iter().any(|entity| {
                matches!(entity.kind, EntityKind::TypedBlock | EntityKind::LabeledBlock)
                    && entity.type_name == slot.name
            });
            if slot.multiplicity == Multiplicity::Single && !present {
                e.log(Diagnostic::new(
                    start.clone(),
                    format!("Missing {} block", slot.name),
                    format!("A {} block is required.", slot.name),
                ));
            }
        }

        e.into_result()?;

        tracing::trace!(count = entities.len(), "entities cataloged");
        Ok(Self { entities })
    }

    pub fn entities(&self) -> &[Entity<'d>] {
        &self.entities
    }

    /// Unique keys in order of first appearance
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = vec![];
        for entity in &self.entities {
            if !keys.contains(&entity.key) {
                keys.push(entity.key.clone());
            }
        }
        keys
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entities.iter().any(|entity| entity.key == key)
    }

    /// All entities sharing `key`, more than one only for repeated unlabeled blocks
    pub fn entities_for<'s>(&'s self, key: &'s str) -> impl Iterator<Item = &'s Entity<'d>> {
        self.entities.iter().filter(move |entity| entity.key == key)
    }
}
