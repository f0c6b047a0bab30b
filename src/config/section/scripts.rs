//! `[scripts]` section configuration.
//!
//! ```toml
//! [scripts]
//! target = "es2015"   # transpile target: es5 ... es2024, esnext
//! minify = true       # compress + mangle the bundle
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// ECMAScript version the bundle is lowered to.
    pub target: String,

    /// Compress and mangle the bundle.
    pub minify: bool,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            target: "es2015".into(),
            minify: true,
        }
    }
}

impl ScriptsConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !is_known_target(&self.target) {
            diag.error_with_hint(
                "scripts.target",
                format!("unknown target `{}`", self.target),
                "use es5, es2015 ... es2024 or esnext",
            );
        }
    }
}

fn is_known_target(target: &str) -> bool {
    let target = target.to_ascii_lowercase();
    match target.strip_prefix("es") {
        Some("next" | "5" | "6") => true,
        Some(year) => year
            .parse::<u16>()
            .is_ok_and(|y| (2015..=2024).contains(&y)),
        None => false,
    }
}
