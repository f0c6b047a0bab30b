//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::core::StageId;

/// Static asset pipeline: Sass, scripts, images and markup into dist/
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Project root (default: current directory)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Show debug output
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// Print version
    #[arg(long, action = clap::ArgAction::Version)]
    pub version: Option<bool>,

    /// subcommands (default: dev)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run every step, then serve dist/ with live reload
    Dev {
        #[command(flatten)]
        serve: ServeArgs,
    },

    /// Run every step once
    #[command(visible_alias = "b")]
    Build,

    /// Delete dist/
    Clean,

    /// Copy src/assets into dist/assets
    #[command(name = "copy-assets", visible_alias = "assets")]
    CopyAssets,

    /// Compile src/scss into dist/css
    #[command(name = "compile-styles", visible_aliases = ["styles", "sass"])]
    CompileStyles,

    /// Optimize src/images into dist/images
    #[command(name = "optimize-images", visible_alias = "images")]
    OptimizeImages,

    /// Bundle src/js/scripts.js into dist/js
    #[command(name = "build-scripts", visible_aliases = ["scripts", "js"])]
    BuildScripts,

    /// Minify src/html into dist/
    #[command(name = "minify-markup", visible_aliases = ["markup", "html"])]
    MinifyMarkup,

    /// Serve dist/ with live reload, without building first
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        serve: ServeArgs,
    },
}

impl Commands {
    /// The single stage a task subcommand runs.
    pub fn single_stage(&self) -> Option<StageId> {
        match self {
            Self::Clean => Some(StageId::Clean),
            Self::CopyAssets => Some(StageId::Assets),
            Self::CompileStyles => Some(StageId::Styles),
            Self::OptimizeImages => Some(StageId::Images),
            Self::BuildScripts => Some(StageId::Scripts),
            Self::MinifyMarkup => Some(StageId::Markup),
            Self::Dev { .. } | Self::Build | Self::Serve { .. } => None,
        }
    }

    pub fn serve_args(&self) -> Option<&ServeArgs> {
        match self {
            Self::Dev { serve } | Self::Serve { serve } => Some(serve),
            _ => None,
        }
    }
}

/// Dev server overrides for `[serve]`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Do not open a browser
    #[arg(long)]
    pub no_open: bool,

    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<IpAddr>,
}

impl Cli {
    /// Subcommand to run, `dev` when none was given.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Dev {
            serve: ServeArgs::default(),
        })
    }
}
