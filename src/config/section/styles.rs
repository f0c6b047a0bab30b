//! `[styles]` section configuration.
//!
//! Browser targets drive vendor prefixing and syntax lowering.
//!
//! ```toml
//! [styles]
//! targets = { chrome = 80, firefox = 78, safari = 12, ios_saf = 12, edge = 18, ie = 11 }
//! ```

use lightningcss::targets::Browsers;
use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StylesConfig {
    pub targets: BrowserTargets,
}

/// Oldest supported major version per browser. Unset browsers are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserTargets {
    pub android: Option<u32>,
    pub chrome: Option<u32>,
    pub edge: Option<u32>,
    pub firefox: Option<u32>,
    pub ie: Option<u32>,
    pub ios_saf: Option<u32>,
    pub opera: Option<u32>,
    pub safari: Option<u32>,
    pub samsung: Option<u32>,
}

impl Default for BrowserTargets {
    fn default() -> Self {
        Self {
            android: None,
            chrome: Some(80),
            edge: Some(18),
            firefox: Some(78),
            ie: Some(11),
            ios_saf: Some(12),
            opera: None,
            safari: Some(12),
            samsung: None,
        }
    }
}

impl BrowserTargets {
    fn entries(&self) -> [(&'static str, Option<u32>); 9] {
        [
            ("android", self.android),
            ("chrome", self.chrome),
            ("edge", self.edge),
            ("firefox", self.firefox),
            ("ie", self.ie),
            ("ios_saf", self.ios_saf),
            ("opera", self.opera),
            ("safari", self.safari),
            ("samsung", self.samsung),
        ]
    }

    /// Lightningcss encodes versions as `major << 16 | minor << 8 | patch`.
    pub fn to_browsers(&self) -> Browsers {
        let v = |major: Option<u32>| major.map(|m| m << 16);
        Browsers {
            android: v(self.android),
            chrome: v(self.chrome),
            edge: v(self.edge),
            firefox: v(self.firefox),
            ie: v(self.ie),
            ios_saf: v(self.ios_saf),
            opera: v(self.opera),
            safari: v(self.safari),
            samsung: v(self.samsung),
        }
    }
}

impl StylesConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        for (name, version) in self.targets.entries() {
            if matches!(version, Some(v) if v == 0 || v > 255) {
                diag.error(
                    format!("styles.targets.{name}"),
                    "major version must be between 1 and 255",
                );
            }
        }
    }
}
