//! Configuration section definitions, one module per `kiln.toml` table.
//!
//! | Module    | TOML Section | Purpose                          |
//! |-----------|--------------|----------------------------------|
//! | `serve`   | `[serve]`    | Dev server and live reload ports |
//! | `styles`  | `[styles]`   | Browser targets for prefixing    |
//! | `scripts` | `[scripts]`  | Transpile target, minification   |
//! | `images`  | `[images]`   | Encoder settings                 |

mod images;
mod scripts;
mod serve;
mod styles;

pub use images::ImagesConfig;
pub use scripts::ScriptsConfig;
pub use serve::ServeConfig;
pub use styles::{BrowserTargets, StylesConfig};
