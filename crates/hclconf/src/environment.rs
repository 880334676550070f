//! evaluation environment of a single load
//!
//! The environment starts out with the built-in functions and the bindings from [Options]. Resolved entities are
//! published one at a time, in evaluation order:
//!
//! | entity                        | published as                             |
//! |-------------------------------|------------------------------------------|
//! | `name = ...`                  | `name`                                   |
//! | `database { ... }`            | `database`                               |
//! | `step { ... }` (repeated)     | `step = [ ..., ... ]`                    |
//! | `service "api" { ... }`       | `service = { api = ..., ... }`           |
//! | `var "base" { default = ..}`  | `var = { base = ..., ... }`              |
use crate::functions;
use crate::options::Options;
use crate::value::Value;
use hcl::eval::Context;
use indexmap::IndexMap;

/// Reserved namespace of variable declarations
pub const VARIABLE_NAMESPACE: &str = "var";

pub struct Environment {
    context: Context<'static>,
    published: IndexMap<String, Value>,
}

impl Environment {
    pub fn new(options: Options) -> Self {
        let mut context = Context::new();
        functions::declare(&mut context, options.strict_env);

        for (name, value) in options.variables {
            context.declare_var(name, value);
        }

        for (name, func) in options.functions {
            context.declare_func(name, func);
        }

        Self {
            context,
            published: Default::default(),
        }
    }

    pub fn context(&self) -> &Context<'static> {
        &self.context
    }

    /// Value published under `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.published.get(name)
    }

    pub fn publish(&mut self, name: &str, value: Value) {
        if self.published.contains_key(name) {
            tracing::warn!(name, "replacing published value");
        }

        self.published.insert(name.to_owned(), value);
        self.declare(name);
    }

    /// Add one labeled instance to the object published under `type_name`
    pub fn publish_labeled(&mut self, type_name: &str, label: &str, value: Value) {
        let entry = self
            .published
            .entry(type_name.to_owned())
            .or_insert_with(|| Value::Object(Default::default()));

        match entry.as_object_mut() {
            Some(instances) => {
                instances.insert(label.to_owned(), value);
            }
            None => {
                tracing::warn!(type_name, label, "replacing non-object value");
                *entry = Value::Object(IndexMap::from([(label.to_owned(), value)]));
            }
        }

        self.declare(type_name);
    }

    /// Append one unlabeled instance to the list published under `type_name`
    pub fn publish_repeated(&mut self, type_name: &str, value: Value) {
        let entry = self
            .published
            .entry(type_name.to_owned())
            .or_insert_with(|| Value::Array(vec![]));

        match entry {
            Value::Array(instances) => instances.push(value),
            other => {
                tracing::warn!(type_name, "replacing non-list value");
                *other = Value::Array(vec![value]);
            }
        }

        self.declare(type_name);
    }

    /// Add a variable to the variable namespace, so later variables can refer to it
    pub fn publish_variable(&mut self, name: &str, value: Value) {
        self.publish_labeled(VARIABLE_NAMESPACE, name, value);
    }

    fn declare(&mut self, name: &str) {
        let Some(value) = self.published.get(name) else {
            return;
        };

        tracing::trace!(name, ?value, "published");
        self.context
            .declare_var(name.to_owned(), hcl::Value::from(value.clone()));
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("published", &self.published)
            .finish_non_exhaustive()
    }
}
