//! Raw export capture.
//!
//! Sends one query per route to the report endpoint and writes each raw
//! response to its own timestamped file. Requests are sequential and
//! paced by a fixed delay. Existing files are never overwritten.

use crate::config::FetchConfig;
use crate::decode::path::{lookup, lookup_mut, Display as PathDisplay, ROUTE_LITERAL};
use crate::error::GridError;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Options for the capture run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub endpoint: String,
    pub resource_key: Option<String>,
    pub origin: String,
    pub delay: Duration,
    pub timeout: Duration,
    pub show_progress: bool,
}

impl From<&FetchConfig> for FetchOptions {
    fn from(config: &FetchConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            resource_key: config.resource_key.clone(),
            origin: config.origin.clone(),
            delay: Duration::from_millis(config.delay_ms),
            timeout: Duration::from_secs(config.timeout_seconds),
            show_progress: true,
        }
    }
}

/// A request body with a route literal to substitute.
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    path: PathBuf,
    body: Value,
}

impl QueryTemplate {
    /// Load a request body and check that it has a route literal.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request body: {}", path.display()))?;
        let body: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse request body: {}", path.display()))?;
        Self::from_value(path, body)
    }

    pub fn from_value(path: &Path, body: Value) -> Result<Self> {
        if !lookup(&body, ROUTE_LITERAL).is_some_and(Value::is_object) {
            return Err(GridError::MissingTemplateLiteral {
                path: path.to_path_buf(),
                location: PathDisplay(ROUTE_LITERAL).to_string(),
            }
            .into());
        }
        Ok(Self {
            path: path.to_path_buf(),
            body,
        })
    }

    /// The request body with the literal set to `'<route>'`.
    pub fn for_route(&self, route: &str) -> Result<Value> {
        let mut body = self.body.clone();
        let literal = lookup_mut(&mut body, ROUTE_LITERAL)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| GridError::MissingTemplateLiteral {
                path: self.path.clone(),
                location: PathDisplay(ROUTE_LITERAL).to_string(),
            })?;
        literal.insert("Value".to_string(), Value::String(format!("'{}'", route)));
        Ok(body)
    }
}

/// Read route names, one per line; blank lines are ignored.
pub fn read_routes(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read routes file: {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Make sure the export directory exists.
pub fn prepare_export_dir(path: &Path) -> Result<()> {
    if path.is_file() {
        return Err(GridError::ExportPathIsFile {
            path: path.to_path_buf(),
        }
        .into());
    }
    if path.is_dir() {
        return Ok(());
    }

    let mut builder = std::fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(path)
        .with_context(|| format!("Failed to create export directory: {}", path.display()))
}

/// `<dir>/<route>_<YYYY_MM_DD-HH_mm>.json`
pub fn export_path(dir: &Path, route: &str, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}_{}.json", route, at.format("%Y_%m_%d-%H_%M")))
}

/// Create a capture target, failing if it already exists.
pub fn create_target(path: &Path) -> Result<File> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(GridError::OutputTargetConflict {
            path: path.to_path_buf(),
        }
        .into()),
        Err(e) => Err(e).with_context(|| format!("Failed to create {}", path.display())),
    }
}

/// Remove a capture target that could not be completed.
fn discard_target(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        debug!("Could not remove {}: {}", path.display(), e);
    }
}

/// Write a response body to its target. A failed write removes the
/// target so no truncated export is left behind.
pub fn write_capture<W: Write>(mut out: W, path: &Path, text: &str) -> Result<()> {
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
        drop(out);
        discard_target(path);
        return Err(e).with_context(|| format!("Failed to write {}", path.display()));
    }
    Ok(())
}

/// Outcome of a capture run.
#[derive(Debug, Default)]
pub struct FetchSummary {
    pub written: Vec<PathBuf>,
    /// Route and error message for each failed request.
    pub failed: Vec<(String, String)>,
}

/// Sequential query client.
pub struct Fetcher {
    client: reqwest::Client,
    options: FetchOptions,
}

impl Fetcher {
    pub fn new(options: FetchOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        if options.resource_key.is_none() {
            warn!("No resource key configured; the endpoint will likely reject requests");
        }

        Ok(Self { client, options })
    }

    /// Capture every route into `export_dir`.
    ///
    /// A failed request is recorded and the run moves on; an existing
    /// target file aborts the run.
    pub async fn run(
        &self,
        export_dir: &Path,
        template: &QueryTemplate,
        routes: &[String],
    ) -> Result<FetchSummary> {
        prepare_export_dir(export_dir)?;

        let progress = if self.options.show_progress {
            let pb = ProgressBar::new(routes.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut summary = FetchSummary::default();

        for (n, route) in routes.iter().enumerate() {
            if n > 0 {
                tokio::time::sleep(self.options.delay).await;
            }
            if let Some(ref pb) = progress {
                pb.set_message(route.clone());
            }

            match self.fetch_route(export_dir, template, route, Local::now()).await {
                Ok(path) => {
                    info!("Captured {} -> {}", route, path.display());
                    summary.written.push(path);
                }
                Err(e) if e.downcast_ref::<GridError>().is_some() => {
                    if let Some(ref pb) = progress {
                        pb.abandon();
                    }
                    return Err(e);
                }
                Err(e) => {
                    warn!("Failed to capture {}: {:#}", route, e);
                    summary.failed.push((route.clone(), format!("{:#}", e)));
                }
            }

            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        Ok(summary)
    }

    /// Capture one route. The target file is created before the request
    /// is sent and removed again if the request fails.
    pub async fn fetch_route(
        &self,
        export_dir: &Path,
        template: &QueryTemplate,
        route: &str,
        at: DateTime<Local>,
    ) -> Result<PathBuf> {
        let body = template.for_route(route)?;
        let path = export_path(export_dir, route, at);
        let mut file = create_target(&path)?;

        let text = match self.query(&body).await {
            Ok(text) => text,
            Err(e) => {
                drop(file);
                discard_target(&path);
                return Err(e);
            }
        };

        write_capture(file, &path, &text)?;
        Ok(path)
    }

    async fn query(&self, body: &Value) -> Result<String> {
        let mut request = self
            .client
            .post(&self.options.endpoint)
            .query(&[("synchronous", "true")])
            .header(reqwest::header::CONTENT_TYPE, "application/json;charset=UTF-8")
            .header(reqwest::header::ORIGIN, &self.options.origin)
            .body(serde_json::to_vec(body)?);
        if let Some(ref key) = self.options.resource_key {
            request = request.header("X-PowerBI-ResourceKey", key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow::anyhow!("Request timed out after {}s", self.options.timeout.as_secs())
            } else {
                anyhow::anyhow!("Request failed: {}", e)
            }
        })?;

        let status = response.status();
        let text = response.text().await.context("Failed to read response body")?;
        if !status.is_success() {
            anyhow::bail!("Endpoint returned {}: {}", status, text.chars().take(200).collect::<String>());
        }
        Ok(text)
    }
}
