//! Spec file discovery

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use specrun_runner::SourceFile;

fn is_pattern(arg: &str) -> bool {
    arg.contains(['*', '?', '['])
}

/// Expand spec arguments into paths, keeping argument order.
///
/// Glob arguments may match nothing; plain paths must exist.
pub fn expand(args: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for arg in args {
        if is_pattern(arg) {
            let matches = glob::glob(arg).with_context(|| format!("invalid pattern '{}'", arg))?;
            for path in matches {
                let path = path.with_context(|| format!("reading matches of '{}'", arg))?;
                if path.is_file() {
                    paths.push(path);
                }
            }
        } else {
            let path = Path::new(arg);
            if !path.exists() {
                bail!("spec file not found: {}", arg);
            }
            paths.push(path.to_path_buf());
        }
    }

    Ok(paths)
}

/// Read every spec into a buffered pipeline entry
pub async fn load(paths: Vec<PathBuf>) -> Result<Vec<SourceFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = SourceFile::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        files.push(file);
    }
    Ok(files)
}
