use std::path::PathBuf;

pub fn init_tracing() {
    // every test calls this, only the first one installs the subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("HCLCONF_LOG"))
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
