//! `nbsync validate`: check manifests without touching NetBox

use anyhow::{Result, bail};
use declarative::KindRegistry;

use crate::Context;
use crate::manifest::Manifest;
use crate::resource;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let settings = super::settings(ctx)?;
    let manifest = super::load_manifest(ctx, &settings)?;

    let problems = check(&resource::registry(), &manifest);
    if problems.is_empty() {
        ui::success(&format!("{} resources are valid", manifest.resources.len()));
        return Ok(());
    }

    for problem in &problems {
        ui::error(problem);
    }
    bail!("{} of {} resources are invalid", problems.len(), manifest.resources.len())
}

/// Every problem in the manifest, one line per resource
pub fn check(registry: &KindRegistry, manifest: &Manifest) -> Vec<String> {
    manifest
        .resources
        .iter()
        .filter_map(|(address, declared)| {
            let result = registry
                .get(&address.kind)
                .and_then(|kind| kind.schema().validate(declared));
            let err = result.err()?;
            let source = manifest
                .sources
                .get(address)
                .map(|p| format!(" ({})", p.display()))
                .unwrap_or_default();
            Some(format!("{address}{source}: {err}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{MANIFEST, manifest};

    #[test]
    fn test_valid_manifest() {
        assert!(check(&resource::registry(), &manifest(MANIFEST)).is_empty());
    }

    #[test]
    fn test_reports_every_problem() {
        let bad = manifest(
            r#"
[site.a]
name = "A"
slug = "Not Valid"

[service.ssh]
name = "ssh"
protocol = "tcp"
ports = [22]

[router.r1]
name = "r1"
"#,
        );
        let problems = check(&resource::registry(), &bad);
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().any(|p| p.starts_with("router.r1") && p.contains("unknown")));
        assert!(problems.iter().any(|p| p.starts_with("service.ssh")));
        assert!(problems.iter().any(|p| p.starts_with("site.a") && p.contains("test.toml")));
    }
}
