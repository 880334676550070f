//! options for a single load
use hcl::eval::FuncDef;

/// Options for [crate::load] and [crate::load_file]
///
/// ```
/// use hclconf::Options;
///
/// let options = Options::default()
///     .strict_env(true)
///     .variable("region", "eu-central-1");
/// ```
#[derive(Default)]
pub struct Options {
    pub(crate) strict_env: bool,
    pub(crate) variables: Vec<(String, hcl::Value)>,
    pub(crate) functions: Vec<(String, FuncDef)>,
}

impl Options {
    /// Fail when `env(name)` refers to an undefined environment variable (default: evaluate to `""`)
    pub fn strict_env(mut self, strict: bool) -> Self {
        self.strict_env = strict;
        self
    }

    /// Make a variable available to every expression
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<hcl::Value>) -> Self {
        self.variables.push((name.into(), value.into()));
        self
    }

    /// Make a function available to every expression, may replace a built-in function
    pub fn function(mut self, name: impl Into<String>, func: FuncDef) -> Self {
        self.functions.push((name.into(), func));
        self
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("strict_env", &self.strict_env)
            .field("variables", &self.variables)
            .field(
                "functions",
                &self.functions.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
