//! Provenance sidecars for generated dataset artifacts.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::ffi::OsString;
use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Write `<artifact>.provenance.json` recording the code revision, the
/// callsite, the full run parameters, and every output path of the run.
/// With an empty `outputs` list the artifact itself is recorded as the
/// sole output.
#[track_caller]
pub fn write_sidecar<P: AsRef<Path>>(
    artifact: P,
    params: Value,
    outputs: &[PathBuf],
) -> Result<PathBuf> {
    let artifact = artifact.as_ref();
    let sidecar = sidecar_path(artifact);
    if let Some(parent) = sidecar.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating provenance dir {}", parent.display()))?;
        }
    }

    let outputs: Vec<String> = if outputs.is_empty() {
        vec![artifact.to_string_lossy().into_owned()]
    } else {
        outputs
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    };
    let callsite = Location::caller();
    let doc = json!({
        "code_rev": current_git_rev(),
        "callsite": {
            "file": callsite.file(),
            "line": callsite.line()
        },
        "params": params,
        "outputs": outputs
    });
    fs::write(&sidecar, serde_json::to_vec_pretty(&doc)?)
        .with_context(|| format!("writing {}", sidecar.display()))?;
    Ok(sidecar)
}

fn sidecar_path(artifact: &Path) -> PathBuf {
    let stem = artifact
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("artifact"));
    let mut name = stem;
    name.push(".provenance.json");
    artifact.with_file_name(name)
}

pub fn current_git_rev() -> String {
    if let Some(from_env) = option_env!("GIT_COMMIT") {
        if !from_env.is_empty() {
            return from_env.to_string();
        }
    }
    if let Ok(env_override) = std::env::var("GIT_COMMIT") {
        if !env_override.is_empty() {
            return env_override;
        }
    }
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
            } else {
                None
            }
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn sidecar_path_rewrites_extension() {
        let base = Path::new("/tmp/output/train_features.csv");
        assert_eq!(
            sidecar_path(base),
            Path::new("/tmp/output/train_features.provenance.json")
        );
    }

    #[test]
    fn write_sidecar_records_params_and_outputs() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("dataset");
        let outputs = vec![dir.path().join("a.csv"), dir.path().join("b.csv")];
        let sidecar = write_sidecar(&artifact, json!({"h11": 30}), &outputs).unwrap();
        assert!(sidecar.exists());
        let parsed: Value = serde_json::from_slice(&fs::read(sidecar).unwrap()).unwrap();
        assert_eq!(parsed["params"]["h11"], 30);
        assert_eq!(
            parsed["outputs"][1],
            outputs[1].to_string_lossy().as_ref()
        );
    }

    #[test]
    fn empty_outputs_fall_back_to_the_artifact() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("dataset");
        let sidecar = write_sidecar(&artifact, json!({}), &[]).unwrap();
        let parsed: Value = serde_json::from_slice(&fs::read(sidecar).unwrap()).unwrap();
        assert_eq!(parsed["outputs"][0], artifact.to_string_lossy().as_ref());
    }
}
