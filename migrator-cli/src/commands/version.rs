//! `migrator version` - display version information.

use migrator_engine::Provider;

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
const NAME: &str = env!("CARGO_PKG_NAME");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::header("migrator");

    kv("Version", VERSION);
    kv("Binary", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);

    let registry = super::registry();
    let drivers: Vec<&str> = Provider::ALL
        .iter()
        .filter(|p| registry.supports(**p))
        .map(|p| p.as_str())
        .collect();

    if drivers.is_empty() {
        kv("Drivers", "none");
    } else {
        kv("Drivers", &drivers.join(", "));
    }

    Ok(())
}
