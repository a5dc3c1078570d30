use regex_lite::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ProvisionError, Result};
use crate::models::{Stencil, StencilPort, Workflow};

const DEFAULT_TEMPLATE: &str = "template.json";

/// Read and parse a workflow file
pub async fn load_workflow(path: &Path) -> Result<Workflow> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        ProvisionError::Config(format!("failed to read workflow {}: {}", path.display(), e))
    })?;
    parse_workflow(&content)
}

pub fn parse_workflow(content: &str) -> Result<Workflow> {
    serde_json::from_str(content)
        .map_err(|e| ProvisionError::Config(format!("malformed workflow: {}", e)))
}

/// Read a stencil file, substitute the workflow subnets into it and parse it
pub async fn load_stencil(path: &Path, subnets: &[String]) -> Result<Stencil> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        ProvisionError::Config(format!("failed to read stencil {}: {}", path.display(), e))
    })?;
    parse_stencil(&substitute_placeholders(&content, subnets)?)
}

pub fn parse_stencil(content: &str) -> Result<Stencil> {
    let raw: HashMap<String, StencilPort> = serde_json::from_str(content)
        .map_err(|e| ProvisionError::Config(format!("malformed stencil: {}", e)))?;
    Stencil::from_raw(raw).map_err(ProvisionError::Config)
}

/// Replace `{{SUBNET_i}}` with the i-th workflow subnet (0-based).
/// Out-of-range indexes and any other `{{...}}` token left behind are errors.
pub fn substitute_placeholders(content: &str, subnets: &[String]) -> Result<String> {
    let placeholder = Regex::new(r"\{\{\s*SUBNET_(\d+)\s*\}\}")
        .map_err(|e| ProvisionError::Config(e.to_string()))?;

    for caps in placeholder.captures_iter(content) {
        let in_range = caps[1]
            .parse::<usize>()
            .map(|i| i < subnets.len())
            .unwrap_or(false);
        if !in_range {
            return Err(ProvisionError::Config(format!(
                "stencil placeholder {} has no matching workflow subnet ({} given)",
                &caps[0],
                subnets.len()
            )));
        }
    }

    let substituted = placeholder
        .replace_all(content, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| subnets.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .to_string();

    let leftover =
        Regex::new(r"\{\{[^{}]*\}\}").map_err(|e| ProvisionError::Config(e.to_string()))?;
    if let Some(m) = leftover.find(&substituted) {
        return Err(ProvisionError::Config(format!(
            "unresolved stencil placeholder {}",
            m.as_str()
        )));
    }

    Ok(substituted)
}

/// Pick the stencil file: an explicit template wins, then `<dir>/<vendor>/<model>.json`,
/// then `template.json` in the working directory.
pub fn resolve_stencil_path(
    template: Option<&Path>,
    stencil_dir: Option<&str>,
    workflow: &Workflow,
) -> Result<PathBuf> {
    if let Some(path) = template {
        return Ok(path.to_path_buf());
    }
    let Some(dir) = stencil_dir else {
        return Ok(PathBuf::from(DEFAULT_TEMPLATE));
    };

    for (field, value) in [("vendor", &workflow.vendor), ("model", &workflow.model)] {
        if !is_safe_component(value) {
            return Err(ProvisionError::Config(format!(
                "workflow {} '{}' cannot name a stencil file",
                field, value
            )));
        }
    }
    Ok(Path::new(dir)
        .join(&workflow.vendor)
        .join(format!("{}.json", workflow.model)))
}

fn is_safe_component(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
