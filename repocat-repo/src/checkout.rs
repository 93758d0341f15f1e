//! Local working copies of remote repositories

use futures::FutureExt;
use repocat_core::{
    retry_async, CheckoutConfig, ErrorContext, RepocatError, RepocatResult, RetryConfig,
};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

/// Clones repositories below `<work_dir>/repos`
#[derive(Debug, Clone)]
pub struct CheckoutManager {
    base_path: PathBuf,
    clone_depth: Option<u32>,
    retry_attempts: usize,
}

impl CheckoutManager {
    pub fn new(config: &CheckoutConfig) -> Self {
        Self {
            base_path: config.work_dir_path(),
            clone_depth: config.clone_depth,
            retry_attempts: config.retry_attempts,
        }
    }

    /// Return an up-to-date checkout of `url`.
    ///
    /// An existing valid checkout is fetched and hard-reset to the remote head;
    /// otherwise the repository is cloned.
    pub async fn checkout(&self, url: &str) -> RepocatResult<PathBuf> {
        let local_path = self.checkout_path(url)?;

        let retry = RetryConfig {
            max_attempts: self.retry_attempts,
            ..RetryConfig::default()
        };
        let depth = self.clone_depth;
        let target = local_path.clone();
        let url_owned = url.to_string();

        if is_valid_git_repository(&local_path).await? {
            info!(
                repo_url = %url,
                local_path = %local_path.display(),
                "📁 Repository already cloned, updating"
            );
            retry_async(
                move || update_repository(url_owned.clone(), target.clone(), depth).boxed(),
                retry,
                "update_repository",
            )
            .await?;
            return Ok(local_path);
        }

        retry_async(
            move || clone_repository(url_owned.clone(), target.clone(), depth).boxed(),
            retry,
            "clone_repository",
        )
        .await?;

        Ok(local_path)
    }

    /// Local directory for `url`: `<work_dir>/repos/<owner>_<name>`
    pub fn checkout_path(&self, url: &str) -> RepocatResult<PathBuf> {
        let parsed_url = Url::parse(url).map_err(|e| RepocatError::Repository {
            message: format!("Invalid repository URL: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("checkout_manager")
                .with_operation("checkout_path")
                .with_suggestion("Ensure the URL is valid and properly formatted"),
        })?;

        let path_segments: Vec<&str> = parsed_url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        if path_segments.len() < 2 {
            return Err(RepocatError::Repository {
                message: "URL must contain owner and repository name".to_string(),
                source: None,
                context: ErrorContext::new("checkout_manager")
                    .with_operation("checkout_path")
                    .with_suggestion("URL should be in format: https://host/owner/repo"),
            });
        }

        let owner = path_segments[path_segments.len() - 2];
        let name = path_segments[path_segments.len() - 1].trim_end_matches(".git");

        Ok(self
            .base_path
            .join("repos")
            .join(format!("{}_{}", owner, name)))
    }
}

/// Check if a directory contains a non-empty git checkout
async fn is_valid_git_repository(path: &Path) -> RepocatResult<bool> {
    if !path.join(".git").exists() {
        return Ok(false);
    }

    let mut entries = tokio::fs::read_dir(path)
        .await
        .map_err(|e| RepocatError::Repository {
            message: format!("Failed to read directory: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("checkout_manager")
                .with_operation("is_valid_git_repository"),
        })?;

    let mut has_files = false;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| RepocatError::Repository {
            message: format!("Failed to check directory contents: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("checkout_manager")
                .with_operation("is_valid_git_repository"),
        })?
    {
        if entry.file_name() != ".git" {
            has_files = true;
            break;
        }
    }

    Ok(has_files)
}

/// Clone repository using the git command
async fn clone_repository(
    url: String,
    target_path: PathBuf,
    depth: Option<u32>,
) -> RepocatResult<()> {
    info!(
        repo_url = %url,
        target_path = %target_path.display(),
        "🚀 Starting repository clone"
    );

    if let Some(parent) = target_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| RepocatError::Repository {
                message: format!("Failed to create parent directory: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("checkout_manager").with_operation("clone_repository"),
            })?;
    }

    // A failed earlier attempt may leave a partial directory behind
    if target_path.exists() {
        debug!(target_path = %target_path.display(), "Removing incomplete checkout");
        tokio::fs::remove_dir_all(&target_path).await?;
    }

    let mut args = vec!["clone".to_string()];
    if let Some(depth) = depth {
        args.push("--depth".to_string());
        args.push(depth.to_string());
        args.push("--single-branch".to_string());
    }
    args.push(url.clone());
    args.push(target_path.display().to_string());

    run_git(&args, None, "clone_repository").await?;

    info!(
        repo_url = %url,
        target_path = %target_path.display(),
        "✅ Repository cloned successfully"
    );

    Ok(())
}

/// Bring an existing checkout to the current remote head
async fn update_repository(
    url: String,
    target_path: PathBuf,
    depth: Option<u32>,
) -> RepocatResult<()> {
    let mut fetch = vec!["fetch".to_string()];
    if let Some(depth) = depth {
        fetch.push("--depth".to_string());
        fetch.push(depth.to_string());
    }
    fetch.push(url.clone());

    run_git(&fetch, Some(&target_path), "update_repository").await?;
    run_git(
        &["reset".to_string(), "--hard".to_string(), "FETCH_HEAD".to_string()],
        Some(&target_path),
        "update_repository",
    )
    .await?;

    info!(
        repo_url = %url,
        target_path = %target_path.display(),
        "✅ Repository updated"
    );

    Ok(())
}

async fn run_git(
    args: &[String],
    current_dir: Option<&Path>,
    operation: &str,
) -> RepocatResult<()> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }

    let subcommand = args.first().map(String::as_str).unwrap_or_default();
    debug!(args = ?args, "Running git");

    let output = cmd.output().await.map_err(|e| RepocatError::Repository {
        message: format!("Failed to execute git {}: {}", subcommand, e),
        source: Some(Box::new(e)),
        context: ErrorContext::new("checkout_manager")
            .with_operation(operation)
            .with_suggestion("Ensure git is installed and accessible"),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RepocatError::Repository {
            message: format!("Git {} failed: {}", subcommand, stderr.trim()),
            source: None,
            context: ErrorContext::new("checkout_manager")
                .with_operation(operation)
                .with_suggestion("Check repository URL and access permissions"),
        });
    }

    Ok(())
}
