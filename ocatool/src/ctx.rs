//! Application context.
//!
//! [`AppContext`] holds the loaded package, the form compiled from it and
//! the tool configuration. The package is compiled once per run.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use colored::Colorize;
use ocaform::{FormData, FormDefinition, FormError, Package};
use serde::Serialize;

use crate::config::ToolConfig;

/// Everything a subcommand needs.
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Path of the package document.
    pub package_path: PathBuf,
    pub package: Package,
    /// Compiled, ordered form.
    pub form: Arc<FormDefinition>,
    pub config: ToolConfig,
}

impl AppContext {
    /// Read and compile a package.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not a package document, or
    /// compiles to an empty form.
    pub fn load(package_path: impl Into<PathBuf>, config: ToolConfig) -> anyhow::Result<Self> {
        let package_path = package_path.into();
        let content = fs::read_to_string(&package_path)
            .with_context(|| format!("failed to read package {}", package_path.display()))?;
        let package: Package = content
            .parse()
            .with_context(|| format!("failed to parse package {}", package_path.display()))?;

        let form = FormDefinition::compile(&package);
        if form.is_empty() {
            bail!("{}: {}", package_path.display(), FormError::NothingToRender);
        }
        info!(
            "compiled {} step(s) from {}",
            form.len(),
            package_path.display()
        );
        if let Some(cycle) = form.cycle() {
            // stdout may carry the JSON output
            eprintln!("{}", format!("warning: {cycle}").yellow());
        }

        Ok(Self {
            package_path,
            package,
            form: Arc::new(form),
            config,
        })
    }

    /// Language to use: the explicit one, else the configured one.
    pub fn language<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        explicit.unwrap_or(&self.config.language)
    }

    /// Read an answers document.
    pub fn load_answers(path: &Path) -> anyhow::Result<FormData> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read answers {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse answers {}", path.display()))
    }

    /// Serialize `value` as JSON, pretty-printed when configured.
    pub fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> anyhow::Result<String> {
        Ok(if self.config.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        })
    }

    /// Write JSON to `output`, or to stdout.
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        value: &T,
        output: Option<&Path>,
    ) -> anyhow::Result<()> {
        let json = self.to_json(value)?;
        match output {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, json + "\n")
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!(
                    "{}",
                    format!("wrote {}", path.display()).bold().purple()
                );
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}
