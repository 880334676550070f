//! built-in functions
//!
//! - `env(name)`: value of an environment variable. Undefined variables evaluate to `""` unless strict mode is
//!   enabled, then the load fails with [crate::Error::MissingEnv].
//! - `env(name, fallback)` and `env_or(name, fallback)`: value of an environment variable or `fallback`.
use hcl::eval::{Context, FuncArgs, FuncDef, ParamType};
use hcl::Value;

const ENV: &str = "env";
// never produced by a message hcl formats itself
const MISSING_VARIABLE: &str = "\u{0}hclconf:missing-env\u{0}";

pub(crate) fn declare(context: &mut Context<'_>, strict: bool) {
    context.declare_func(
        ENV,
        FuncDef::builder()
            .param(ParamType::String)
            .variadic_param(ParamType::String)
            .build(if strict { env_strict } else { env_lenient }),
    );

    context.declare_func(
        "env_or",
        FuncDef::builder()
            .param(ParamType::String)
            .param(ParamType::String)
            .build(env_or),
    );
}

/// Name of the missing variable if `func` failed with `message` in a strict `env` call
pub(crate) fn missing_variable(func: &str, message: &str) -> Option<String> {
    if func != ENV {
        return None;
    }
    message.strip_prefix(MISSING_VARIABLE).map(str::to_owned)
}

fn env_strict(args: FuncArgs) -> Result<Value, String> {
    env(args, true)
}

fn env_lenient(args: FuncArgs) -> Result<Value, String> {
    env(args, false)
}

fn env(args: FuncArgs, strict: bool) -> Result<Value, String> {
    if args.len() > 2 {
        return Err(format!(
            "env takes 1 or 2 arguments, {} were given",
            args.len()
        ));
    }

    let name = string_arg(&args, 0)?;
    if let Some(value) = lookup(name) {
        return Ok(value);
    }

    match args.get(1) {
        Some(fallback) => Ok(fallback.clone()),
        None if strict => Err(format!("{MISSING_VARIABLE}{name}")),
        None => Ok(Value::String(String::new())),
    }
}

fn env_or(args: FuncArgs) -> Result<Value, String> {
    let name = string_arg(&args, 0)?;
    Ok(lookup(name).unwrap_or_else(|| args[1].clone()))
}

fn string_arg(args: &FuncArgs, index: usize) -> Result<&str, String> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("argument {index} must be a string"))
}

fn lookup(name: &str) -> Option<Value> {
    let value = std::env::var_os(name)?;
    tracing::trace!(name, "environment variable read");
    Some(Value::String(value.to_string_lossy().into_owned()))
}

#[cfg(test)]
mod test {
    use super::*;
    use hcl::eval::Evaluate;
    use pretty_assertions::assert_eq;

    fn evaluate(expression: &str, strict: bool) -> Result<Value, hcl::eval::Error> {
        let body: hcl::Body = hcl::parse(&format!("x = {expression}")).unwrap();
        let attribute = body.attributes().next().unwrap();

        let mut context = Context::new();
        declare(&mut context, strict);
        attribute.expr.evaluate(&context)
    }

    fn string(value: &str) -> Value {
        Value::String(value.to_owned())
    }

    #[test]
    fn env_set() {
        std::env::set_var("HCLCONF_FUNCTIONS_SET", "value");

        assert_eq!(evaluate(r#"env("HCLCONF_FUNCTIONS_SET")"#, true).unwrap(), string("value"));
        assert_eq!(
            evaluate(r#"env_or("HCLCONF_FUNCTIONS_SET", "fallback")"#, true).unwrap(),
            string("value")
        );
    }

    #[test]
    fn env_unset_lenient() {
        assert_eq!(evaluate(r#"env("HCLCONF_FUNCTIONS_UNSET")"#, false).unwrap(), string(""));
    }

    #[test]
    fn env_unset_strict() {
        let error = evaluate(r#"env("HCLCONF_FUNCTIONS_UNSET")"#, true).unwrap_err();

        let hcl::eval::ErrorKind::FuncCall(func, message) = error.kind() else {
            panic!("expected a function call error, got {error:?}");
        };
        assert_eq!(
            missing_variable(&func.to_string(), message),
            Some("HCLCONF_FUNCTIONS_UNSET".to_owned())
        );
    }

    #[test]
    fn missing_variable_needs_env() {
        let message = format!("{MISSING_VARIABLE}HOME");

        assert_eq!(missing_variable("env", &message), Some("HOME".to_owned()));
        assert_eq!(missing_variable("lookup", &message), None);
        assert_eq!(
            missing_variable("env", "environment variable is not set: HOME"),
            None
        );
    }

    #[test]
    fn fallbacks() {
        for strict in [true, false] {
            assert_eq!(
                evaluate(r#"env_or("HCLCONF_FUNCTIONS_UNSET", "fallback")"#, strict).unwrap(),
                string("fallback")
            );
            assert_eq!(
                evaluate(r#"env("HCLCONF_FUNCTIONS_UNSET", "fallback")"#, strict).unwrap(),
                string("fallback")
            );
        }
    }
}
