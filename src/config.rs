use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "lpassistd",
    version,
    about = "Learning plan assistant sidecar: reads JSON requests on stdin, writes JSON responses on stdout"
)]
pub struct CliConfig {
    /// Catalog JSON to load instead of the builtin one
    #[arg(long, env = "LPASSIST_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Workspace folder to open at startup (same as a `workspace.select` request)
    #[arg(long, env = "LPASSIST_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Debug-level logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(path) = &self.catalog {
            if !path.is_file() {
                return Err(format!(
                    "catalog file not found: {}",
                    path.to_string_lossy()
                ));
            }
        }
        if let Some(path) = &self.workspace {
            if path.exists() && !path.is_dir() {
                return Err(format!(
                    "workspace is not a directory: {}",
                    path.to_string_lossy()
                ));
            }
        }
        Ok(())
    }
}
