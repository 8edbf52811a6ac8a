use crate::artifacts::RunManifest;
use crate::error::TrainingResult;
use crate::job::JobStatus;
use crate::layout::WorkspaceLayout;
use std::path::Path;

fn read_manifest(path: &Path) -> TrainingResult<RunManifest> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice::<RunManifest>(&bytes)?)
}

/// Writes (or rewrites) the manifest of `manifest.job_id`.
pub fn write_manifest(layout: &WorkspaceLayout, manifest: &RunManifest) -> TrainingResult<()> {
    layout.ensure_run_dir(&manifest.job_id)?;
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(layout.run_manifest_path(&manifest.job_id), json)?;
    Ok(())
}

/// Every recorded run, oldest first.
pub fn discover_runs(layout: &WorkspaceLayout) -> TrainingResult<Vec<RunManifest>> {
    let mut out = Vec::new();

    let dir = match std::fs::read_dir(layout.runs_root()) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(e.into()),
    };

    for entry in dir {
        let run_dir = entry?.path();
        if !run_dir.is_dir() {
            continue;
        }
        let manifest_path = run_dir.join("run_manifest.json");
        if !manifest_path.exists() {
            continue;
        }
        out.push(read_manifest(&manifest_path)?);
    }

    out.sort_by_key(|m| m.created_at);
    Ok(out)
}

/// The model of the most recent run that succeeded, if any.
pub fn latest_fine_tuned_model(layout: &WorkspaceLayout) -> TrainingResult<Option<String>> {
    Ok(discover_runs(layout)?
        .into_iter()
        .rev()
        .filter(|m| m.status == JobStatus::Succeeded)
        .find_map(|m| m.fine_tuned_model))
}
