//! evaluation of entities in dependency order
use crate::catalog::{Catalog, Entity, EntityKind, Source};
use crate::decode::Decoder;
use crate::document::Document;
use crate::environment::{Environment, VARIABLE_NAMESPACE};
use crate::error::{BlockContext, Diagnostic, Diagnostics, Error};
use crate::schema::{Multiplicity, Schema};
use hcl_edit::structure::{Attribute, Block, Structure};
use hcl_edit::Span;

#[derive(derive_new::new)]
pub struct Resolver<'a, 'd, T> {
    document: &'d Document,
    catalog: &'a Catalog<'d>,
    schema: &'a Schema<T>,
}

impl<'a, 'd, T: 'static> Resolver<'a, 'd, T> {
    /// Resolve every key of `order` and publish its value before moving on to the next one
    ///
    /// The first failure aborts, `target` must be discarded then.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn resolve(
        &self,
        order: &[String],
        environment: &mut Environment,
        target: &mut T,
    ) -> Result<(), Error> {
        for key in order {
            tracing::debug!(key = %key, "resolving");

            for entity in self.catalog.entities_for(key) {
                let result = self.resolve_entity(entity, environment, target);
                match entity.source {
                    Source::Block(_) => {
                        result.map_err(|err| annotate(err, &entity.block_context(self.document)))?
                    }
                    Source::Attribute(_) => result?,
                }
            }
        }

        Ok(())
    }

    fn resolve_entity(
        &self,
        entity: &Entity<'d>,
        environment: &mut Environment,
        target: &mut T,
    ) -> Result<(), Error> {
        match (entity.source, entity.kind) {
            (Source::Attribute(attribute), _) => self.resolve_attribute(attribute, environment, target),
            (Source::Block(block), EntityKind::Variable) => {
                self.resolve_variable(entity, block, environment)
            }
            (Source::Block(block), _) => self.resolve_block(entity, block, environment, target),
        }
    }

    fn resolve_variable(
        &self,
        entity: &Entity<'d>,
        block: &Block,
        environment: &mut Environment,
    ) -> Result<(), Error> {
        let name = entity.label.clone().unwrap_or_default();

        let mut e = Diagnostics::default();
        let mut default = None;
        for structure in block.body.iter() {
            match structure {
                Structure::Attribute(attribute) => match attribute.key.value().as_str() {
                    "default" => default = Some(attribute),
                    "description" => {}
                    other => e.log(Diagnostic::new(
                        self.document.location(attribute.span()),
                        "Unsupported argument".to_owned(),
                        format!("An argument named {other:?} is not expected in a {VARIABLE_NAMESPACE} block."),
                    )),
                },
                Structure::Block(nested) => e.log(Diagnostic::new(
                    self.document.location(nested.span()),
                    "Unsupported block type".to_owned(),
                    format!("Blocks are not expected in a {VARIABLE_NAMESPACE} block."),
                )),
            }
        }
        e.into_result()?;

        let Some(default) = default else {
            return Err(Error::MissingField {
                location: self.document.location(block.span()),
                type_name: VARIABLE_NAMESPACE.to_owned(),
                name,
                field: "default".to_owned(),
            });
        };

        let value = Decoder::new(self.document, environment.context()).evaluate(default)?;
        environment.publish_variable(&name, value);
        Ok(())
    }

    fn resolve_attribute(
        &self,
        attribute: &Attribute,
        environment: &mut Environment,
        target: &mut T,
    ) -> Result<(), Error> {
        let name = attribute.key.value().as_str();
        let value = Decoder::new(self.document, environment.context()).evaluate(attribute)?;

        if let Some(slot) = self.schema.find_attribute(name) {
            slot.assign(target, value.clone()).map_err(|err| {
                Diagnostic::new(
                    self.document.location(attribute.span()),
                    "Unsuitable value type".to_owned(),
                    format!("Unsuitable value for {name:?}: {err}"),
                )
            })?;
        }

        environment.publish(name, value);
        Ok(())
    }

    fn resolve_block(
        &self,
        entity: &Entity<'d>,
        block: &Block,
        environment: &mut Environment,
        target: &mut T,
    ) -> Result<(), Error> {
        let Some(slot) = self.schema.find_block(&entity.type_name) else {
            tracing::debug!(key = %entity.key, "no slot for block");
            return Ok(());
        };

        let value = slot.decode(
            target,
            block,
            &Decoder::new(self.document, environment.context()),
        )?;

        match (&entity.label, slot.multiplicity) {
            (Some(label), _) => environment.publish_labeled(&entity.type_name, label, value),
            (None, Multiplicity::Repeated) => environment.publish_repeated(&entity.type_name, value),
            (None, _) => environment.publish(&entity.type_name, value),
        }
        Ok(())
    }
}

/// Attach the block an error was found in, unless a nested block already did
fn annotate(err: Error, context: &BlockContext) -> Error {
    match err {
        Error::Diagnostics(diagnostics) => Error::Diagnostics(diagnostics.in_block(context)),
        other => other,
    }
}
