//! # hclconf - hcl configuration with references
//!
//! Load an hcl document into a rust value. Attributes and blocks may refer to each other regardless of the order
//! they are declared in:
//!
//! ```hcl
//! app {
//!   db_url = "postgres://${database.host}:${database.port}/${var.schema}"
//! }
//!
//! database {
//!   host = env("DB_HOST", "localhost")
//!   port = 5432
//! }
//!
//! var "schema" {
//!   default     = "public"
//!   description = "database schema to connect to"
//! }
//! ```
//!
//! ```
//! use hclconf::{Configuration, Options, Schema};
//!
//! #[derive(Default, serde::Serialize)]
//! struct Database {
//!     host: String,
//!     port: u16,
//! }
//!
//! impl Configuration for Database {
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .attribute("host", |db: &mut Self, host| db.host = host)
//!             .attribute("port", |db: &mut Self, port| db.port = port)
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Config {
//!     name: String,
//!     database: Database,
//! }
//!
//! impl Configuration for Config {
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .attribute("name", |config: &mut Self, name| config.name = name)
//!             .block("database", |config: &mut Self, database| config.database = database)
//!     }
//! }
//!
//! let source = r#"
//!     name = "${database.host}-primary"
//!     database {
//!       host = "db1"
//!       port = 5432
//!     }
//! "#;
//!
//! let config: Config = hclconf::load(source.as_bytes(), "config.hcl", Options::default()).unwrap();
//! assert_eq!(config.name, "db1-primary");
//! assert_eq!(config.database.port, 5432);
//! ```
//!
//! ## Introduction for developers
//!
//! Read this to understand how `hclconf` works internally.
//!
//! ### HCL Terms
//!
//! In hcl terms...
//! - a file gets parsed as a `body`
//! - ...which is just a list of `structures`
//! - ...where there are two kinds:
//!   - `attribute`: a "key = value" pair
//!   - or `block`:
//!     - 1 `identifier`
//!     - followed by 0 or more `labels`
//!     - and a `body` enclosed in `{` and `}`
//!
//! ### Parsing
//!
//! see [document::Document::parse]
//!
//! The source is parsed with [hcl_edit] so every structure keeps its span. Spans are turned into `file:line:column`
//! locations when reporting problems.
//!
//! ### Cataloging
//!
//! see [catalog::Catalog::new]
//!
//! Root attributes and root blocks known to the [Schema] become [catalog::Entity]s, each with a unique key
//! (`database`, `service.api`, `var.schema`, ...). Structural problems are reported here, before anything is
//! evaluated: label counts, duplicate keys, missing required attributes and blocks.
//!
//! ### Ordering
//!
//! see [graph::DependencyGraph::build] and [sort::topological_order]
//!
//! We walk every expression of an entity, nested blocks included, and collect the traversals rooted at a name some
//! entity is declared with. `service.api.port` becomes a dependency on `service.api`, `database.host` one on
//! `database`. The keys are then sorted so every key comes after its dependencies. A circular dependency fails
//! with [error::CycleError] naming the keys involved.
//!
//! ### Evaluation
//!
//! see [resolve::Resolver::resolve]
//!
//! We use [hcl::eval] to evaluate the hcl expressions. Keys are resolved in order, each decoded value is assigned to
//! the target and published to the [hcl::eval::Context] (see [environment::Environment]) for the keys that follow.
//!
//! | entity                       | published as                   |
//! |------------------------------|--------------------------------|
//! | `name = ...`                 | `name`                         |
//! | `database { ... }`           | `database`                     |
//! | `service "api" { ... }`      | `service = { api = ... }`      |
//! | `var "schema" { ... }`       | `var = { schema = ... }`       |
//!
//! Built-in functions: `env(name)`, `env(name, fallback)` and `env_or(name, fallback)`, see [Options::strict_env].
use std::path::Path;

pub mod catalog;
pub mod decode;
pub mod document;
pub mod environment;
pub mod error;
mod functions;
pub mod graph;
pub mod options;
pub mod resolve;
pub mod schema;
pub mod sort;
pub mod value;
mod visit;

pub use error::Error;
pub use options::Options;
pub use schema::{Configuration, Schema};

use catalog::Catalog;
use document::Document;
use environment::Environment;
use graph::DependencyGraph;
use resolve::Resolver;

/// Load a `T` from hcl source
///
/// `filename` is only used in error messages.
pub fn load<T: Configuration>(source: &[u8], filename: &str, options: Options) -> Result<T, Error> {
    let document = Document::parse(source, filename)?;
    resolve(&document, options)
}

/// Load a `T` from an hcl file
pub fn load_file<T: Configuration>(path: impl AsRef<Path>, options: Options) -> Result<T, Error> {
    let document = Document::load_file(path.as_ref())?;
    resolve(&document, options)
}

/// Load a `T` from an already parsed document
#[tracing::instrument(level = "trace", skip_all, fields(document = document.name()))]
pub fn resolve<T: Configuration>(document: &Document, options: Options) -> Result<T, Error> {
    let schema = T::schema();

    let catalog = Catalog::new(document, &schema)?;
    let graph = DependencyGraph::build(&catalog);
    let order = sort::topological_order(&catalog.keys(), &graph)?;

    let mut environment = Environment::new(options);
    let mut target = T::default();
    Resolver::new(document, &catalog, &schema).resolve(&order, &mut environment, &mut target)?;

    Ok(target)
}
