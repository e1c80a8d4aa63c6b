//! Spec runner harness generation
//!
//! Renders the HTML page the headless browser opens: framework stylesheet,
//! framework scripts, vendor scripts, the embedded spec file list and the
//! in-page runner script, in that order.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{RunConfiguration, HARNESS_FILE_NAME};
use crate::error::{PluginError, PluginResult};

/// Values substituted into the harness template
#[derive(Debug, Clone, Serialize)]
pub struct HarnessData {
    pub files: Vec<PathBuf>,
    pub jasmine_css: PathBuf,
    pub jasmine_js: Vec<PathBuf>,
    pub vendor_js: Vec<String>,
    pub spec_runner: PathBuf,
}

/// Builds harness artifacts for one run
pub struct HarnessGenerator<'a> {
    config: &'a RunConfiguration,
    cwd: PathBuf,
}

impl<'a> HarnessGenerator<'a> {
    pub fn new(config: &'a RunConfiguration) -> PluginResult<Self> {
        Ok(Self::with_cwd(config, std::env::current_dir()?))
    }

    /// Resolve vendor globs against `cwd` instead of the process directory
    pub fn with_cwd(config: &'a RunConfiguration, cwd: impl Into<PathBuf>) -> Self {
        Self { config, cwd: cwd.into() }
    }

    /// Where the harness is written
    pub fn destination(&self) -> PathBuf {
        match self.config.keep_runner_dir() {
            Some(dir) => self.cwd.join(dir).join(HARNESS_FILE_NAME),
            None => self.config.asset_paths().default_harness,
        }
    }

    /// Collect the template inputs for `files`
    pub fn data(&self, files: &[PathBuf]) -> PluginResult<HarnessData> {
        let assets = self.config.asset_paths();
        Ok(HarnessData {
            files: files.to_vec(),
            jasmine_css: assets.jasmine_css,
            jasmine_js: assets.jasmine_js,
            vendor_js: resolve_vendor(&self.config.vendor_entries(), &self.cwd)?,
            spec_runner: assets.spec_runner,
        })
    }

    /// Render and write the harness, returning its path
    pub async fn generate(&self, files: &[PathBuf]) -> PluginResult<PathBuf> {
        let assets = self.config.asset_paths();
        let template = tokio::fs::read_to_string(&assets.template)
            .await
            .map_err(|source| PluginError::TemplateIo { path: assets.template.clone(), source })?;
        assets.check_framework()?;

        let data = self.data(files)?;
        let html = render_template(&template, &data)?;

        let destination = self.destination();
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PluginError::TemplateIo { path: parent.to_path_buf(), source })?;
        }
        tokio::fs::write(&destination, html)
            .await
            .map_err(|source| PluginError::TemplateIo { path: destination.clone(), source })?;

        info!("Spec runner written to {}", destination.display());
        Ok(destination)
    }
}

/// Expand vendor entries into script sources.
///
/// URLs are kept as given; anything else is a glob whose matches are joined
/// onto `cwd`, in expansion order.
pub fn resolve_vendor(entries: &[String], cwd: &Path) -> PluginResult<Vec<String>> {
    let mut scripts = Vec::new();

    for entry in entries {
        if entry.starts_with("http") {
            scripts.push(entry.clone());
            continue;
        }

        let pattern = if Path::new(entry).is_absolute() {
            entry.clone()
        } else {
            let root = glob::Pattern::escape(&cwd.to_string_lossy());
            format!("{}/{}", root.trim_end_matches('/'), entry)
        };
        let matches = glob::glob(&pattern).map_err(|source| PluginError::VendorPattern {
            pattern: entry.clone(),
            source,
        })?;

        let before = scripts.len();
        for path in matches.filter_map(Result::ok) {
            scripts.push(cwd.join(path).to_string_lossy().into_owned());
        }
        debug!("vendor '{}' matched {} file(s)", entry, scripts.len() - before);
    }

    Ok(scripts)
}

/// Substitute `data` into `template`.
///
/// Placeholders: `{{jasmine_css}}`, `{{jasmine_js}}`, `{{vendor_js}}`,
/// `{{files}}` (a JSON array) and `{{spec_runner}}`.
pub fn render_template(template: &str, data: &HarnessData) -> PluginResult<String> {
    let jasmine_js = data
        .jasmine_js
        .iter()
        .map(|p| script_tag(&p.to_string_lossy()))
        .collect::<Vec<_>>()
        .join("\n  ");
    let vendor_js = data
        .vendor_js
        .iter()
        .map(|src| script_tag(src))
        .collect::<Vec<_>>()
        .join("\n  ");
    let files = serde_json::to_string(&data.files)?.replace("</", "<\\/");

    Ok(template
        .replace("{{jasmine_css}}", &escape_attr(&data.jasmine_css.to_string_lossy()))
        .replace("{{jasmine_js}}", &jasmine_js)
        .replace("{{vendor_js}}", &vendor_js)
        .replace("{{files}}", &files)
        .replace("{{spec_runner}}", &script_tag(&data.spec_runner.to_string_lossy())))
}

fn script_tag(src: &str) -> String {
    format!(r#"<script type="text/javascript" src="{}"></script>"#, escape_attr(src))
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeepRunner;
    use std::fs;
    use tempfile::TempDir;

    const TEMPLATE: &str = include_str!("../assets/lib/spec_runner.html");

    fn sample_data(files: Vec<PathBuf>) -> HarnessData {
        HarnessData {
            files,
            jasmine_css: PathBuf::from("/a/jasmine.css"),
            jasmine_js: vec![PathBuf::from("/a/jasmine.js"), PathBuf::from("/a/boot.js")],
            vendor_js: vec!["http://cdn.example.com/jquery.js".to_string()],
            spec_runner: PathBuf::from("/a/spec_runner.js"),
        }
    }

    /// Pull the embedded spec list back out of a rendered page
    fn embedded_files(html: &str) -> Vec<String> {
        let start = html.find("specFiles = ").unwrap() + "specFiles = ".len();
        let end = start + html[start..].find(";\n").unwrap();
        serde_json::from_str(&html[start..end].replace("<\\/", "</")).unwrap()
    }

    #[test]
    fn test_render_orders_assets() {
        let html = render_template(TEMPLATE, &sample_data(vec![])).unwrap();

        let css = html.find("/a/jasmine.css").unwrap();
        let core = html.find("/a/jasmine.js").unwrap();
        let boot = html.find("/a/boot.js").unwrap();
        let vendor = html.find("http://cdn.example.com/jquery.js").unwrap();
        let files = html.find("specFiles = ").unwrap();
        let runner = html.find("/a/spec_runner.js").unwrap();

        assert!(css < core && core < boot && boot < vendor && vendor < files && files < runner);
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_render_embeds_every_file_in_order() {
        let files: Vec<PathBuf> = (0..5).map(|i| PathBuf::from(format!("spec/{}_spec.js", i))).collect();
        let html = render_template(TEMPLATE, &sample_data(files.clone())).unwrap();

        let embedded = embedded_files(&html);
        assert_eq!(embedded.len(), 5);
        for (file, embedded) in files.iter().zip(&embedded) {
            assert_eq!(file.to_string_lossy(), embedded.as_str());
        }
    }

    #[test]
    fn test_render_escapes_script_close() {
        let html = render_template(
            TEMPLATE,
            &sample_data(vec![PathBuf::from("spec/</script>.js")]),
        )
        .unwrap();
        assert!(!html.contains("spec/</script>"));
        assert_eq!(embedded_files(&html), vec!["spec/</script>.js".to_string()]);
    }

    #[test]
    fn test_resolve_vendor_keeps_urls_and_expands_globs() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("lib")).unwrap();
        fs::write(tmp.path().join("lib/a.js"), "").unwrap();
        fs::write(tmp.path().join("lib/b.js"), "").unwrap();
        fs::write(tmp.path().join("lib/c.css"), "").unwrap();

        let scripts = resolve_vendor(
            &["https://cdn.example.com/x.js".to_string(), "lib/*.js".to_string()],
            tmp.path(),
        )
        .unwrap();

        assert_eq!(
            scripts,
            vec![
                "https://cdn.example.com/x.js".to_string(),
                tmp.path().join("lib/a.js").to_string_lossy().into_owned(),
                tmp.path().join("lib/b.js").to_string_lossy().into_owned(),
            ]
        );
        assert!(scripts[1..].iter().all(|s| Path::new(s).is_absolute()));
    }

    #[test]
    fn test_resolve_vendor_rejects_bad_pattern() {
        let tmp = TempDir::new().unwrap();
        let err = resolve_vendor(&["lib/[.js".to_string()], tmp.path()).unwrap_err();
        assert!(matches!(err, PluginError::VendorPattern { .. }));
    }

    #[test]
    fn test_destination_follows_keep_runner_dir() {
        let tmp = TempDir::new().unwrap();
        let mut config = RunConfiguration {
            assets_dir: Some(tmp.path().join("assets")),
            ..Default::default()
        };
        let generator = HarnessGenerator::with_cwd(&config, tmp.path());
        assert_eq!(generator.destination(), tmp.path().join("assets/lib/specRunner.html"));

        config.keep_runner = Some(KeepRunner::Dir(PathBuf::from("kept")));
        let generator = HarnessGenerator::with_cwd(&config, tmp.path());
        assert_eq!(generator.destination(), tmp.path().join("kept/specRunner.html"));
    }

    #[tokio::test]
    async fn test_generate_reports_missing_template() {
        let tmp = TempDir::new().unwrap();
        let config = RunConfiguration {
            assets_dir: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };
        let generator = HarnessGenerator::with_cwd(&config, tmp.path());

        let err = generator.generate(&[]).await.unwrap_err();
        assert!(matches!(err, PluginError::TemplateIo { ref path, .. } if path.ends_with("lib/spec_runner.html")));
    }

    /// Assets dir with the template and, optionally, the 2.0 framework set
    fn install_assets(root: &Path, with_framework: bool) {
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(root.join("lib/spec_runner.html"), TEMPLATE).unwrap();
        if with_framework {
            let framework = root.join("vendor/jasmine-2.0");
            fs::create_dir_all(&framework).unwrap();
            for name in ["jasmine.css", "jasmine.js", "jasmine-html.js", "console.js", "boot.js"] {
                fs::write(framework.join(name), "").unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_generate_requires_framework_assets() {
        let tmp = TempDir::new().unwrap();
        install_assets(tmp.path(), false);
        let config = RunConfiguration {
            assets_dir: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };
        let generator = HarnessGenerator::with_cwd(&config, tmp.path());

        let err = generator.generate(&[PathBuf::from("a_spec.js")]).await.unwrap_err();

        assert!(matches!(
            err,
            PluginError::FrameworkMissing { ref dir, .. } if dir.ends_with("vendor/jasmine-2.0")
        ));
        assert!(!generator.destination().exists());
    }

    #[tokio::test]
    async fn test_generate_writes_harness() {
        let tmp = TempDir::new().unwrap();
        install_assets(tmp.path(), true);
        let config = RunConfiguration {
            assets_dir: Some(tmp.path().to_path_buf()),
            keep_runner: Some(KeepRunner::Dir(PathBuf::from("out/runner"))),
            ..Default::default()
        };
        let generator = HarnessGenerator::with_cwd(&config, tmp.path());

        let path = generator.generate(&[PathBuf::from("a_spec.js")]).await.unwrap();

        assert_eq!(path, tmp.path().join("out/runner/specRunner.html"));
        let html = fs::read_to_string(&path).unwrap();
        assert_eq!(embedded_files(&html), vec!["a_spec.js".to_string()]);
    }
}
