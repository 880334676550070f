//! dependencies between cataloged entities
//!
//! An entity depends on another one if any of its expressions (nested blocks included) contains a traversal rooted
//! at the other entity's type:
//!
//! | reference            | depends on                                       |
//! |----------------------|--------------------------------------------------|
//! | `database.host`      | `database`                                       |
//! | `service.api.port`   | `service.api`                                    |
//! | `service["api"]`     | `service.api`                                    |
//! | `service`            | every `service.*` instance                       |
//! | `var.base`           | `var.base`                                       |
//!
//! Only the first segment after the root is considered. Roots that are not cataloged (function parameters,
//! `for` variables, bindings from [crate::Options]) are left for evaluation to deal with.
use crate::catalog::{Catalog, Entity};
use crate::visit::VisitTraversals;
use hcl::{Expression, Traversal, TraversalOperator};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: IndexMap<String, IndexSet<String>>,
}

impl DependencyGraph {
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn build(catalog: &Catalog) -> Self {
        let roots: HashSet<&str> = catalog
            .entities()
            .iter()
            .map(|entity| entity.type_name.as_str())
            .collect();

        let mut edges: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for entity in catalog.entities() {
            let dependencies = edges.entry(entity.key.clone()).or_default();

            for traversal in traversals(entity) {
                let Some((root, segment)) = reference(&traversal) else {
                    continue;
                };
                if !roots.contains(root.as_str()) {
                    continue;
                }

                for key in targets(catalog, &root, segment.as_deref()) {
                    if key != entity.key {
                        dependencies.insert(key);
                    }
                }
            }

            tracing::trace!(key = %entity.key, ?dependencies, "dependencies found");
        }

        Self { edges }
    }

    /// Keys `key` depends on, in order of first reference
    pub fn dependencies(&self, key: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(key)
            .into_iter()
            .flat_map(|dependencies| dependencies.iter().map(String::as_str))
    }

    pub fn depends_on(&self, key: &str, dependency: &str) -> bool {
        self.edges
            .get(key)
            .is_some_and(|dependencies| dependencies.contains(dependency))
    }
}

/// All traversals of an entity, including those in nested blocks
fn traversals(entity: &Entity) -> Vec<Traversal> {
    let mut found = vec![];
    let mut collect = |traversal: &Traversal| found.push(traversal.clone());

    for expression in entity.expressions() {
        expression.visit_traversals(&mut collect);
    }
    // nested blocks are not entities, their references belong to the root
    for child in entity.nested_children() {
        let body: hcl::Body = child.body.clone().into();
        body.visit_traversals(&mut collect);
    }

    found
}

/// Root variable name and the first attribute segment of a traversal
fn reference(traversal: &Traversal) -> Option<(String, Option<String>)> {
    let Expression::Variable(root) = &traversal.expr else {
        return None;
    };

    let segment = match traversal.operators.first() {
        Some(TraversalOperator::GetAttr(name)) => Some(name.as_str().to_owned()),
        Some(TraversalOperator::Index(Expression::String(name))) => Some(name.clone()),
        _ => None,
    };

    Some((root.as_str().to_owned(), segment))
}

fn targets(catalog: &Catalog, root: &str, segment: Option<&str>) -> Vec<String> {
    if let Some(segment) = segment {
        let labeled = format!("{root}.{segment}");
        if catalog.contains_key(&labeled) {
            return vec![labeled];
        }
    }

    if catalog.contains_key(root) {
        return vec![root.to_owned()];
    }

    match segment {
        // unknown label, evaluation reports it
        Some(_) => vec![],
        // the whole collection of labeled instances
        None => {
            let mut keys: Vec<String> = vec![];
            for entity in catalog.entities().iter().filter(|e| e.type_name == root) {
                if !keys.contains(&entity.key) {
                    keys.push(entity.key.clone());
                }
            }
            keys
        }
    }
}
