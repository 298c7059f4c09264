//! Manifest loading
//!
//! A manifest is TOML with one table per resource, keyed by kind and name:
//!
//! ```toml
//! [site.berlin]
//! name = "Berlin DC1"
//! slug = "ber-dc1"
//! tags = ["prod"]
//! ```
//!
//! A manifest path may be a single file or a directory; directories are
//! walked recursively for `*.toml` files in sorted order.

use anyhow::{Context, Result, anyhow, bail};
use declarative::{Address, DeclaredResource, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Declared resources with the file each one came from
#[derive(Debug, Default)]
pub struct Manifest {
    pub resources: BTreeMap<Address, DeclaredResource>,
    pub sources: BTreeMap<Address, PathBuf>,
}

impl Manifest {
    /// Load a manifest file or directory
    pub fn load(path: &Path) -> Result<Self> {
        let mut manifest = Self::default();
        for file in manifest_files(path)? {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read manifest {}", file.display()))?;
            manifest
                .add_str(&content, &file)
                .with_context(|| format!("Invalid manifest {}", file.display()))?;
        }
        log::debug!(
            "Loaded {} resources from {}",
            manifest.resources.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Parse one manifest document and add its resources
    pub fn add_str(&mut self, content: &str, source: &Path) -> Result<()> {
        let table: toml::Table = toml::from_str(content)?;

        for (kind, entries) in table {
            let toml::Value::Table(entries) = entries else {
                bail!("'{kind}' must be a table of resources");
            };
            for (name, attributes) in entries {
                let address = Address::new(kind.as_str(), name.as_str());
                let toml::Value::Table(attributes) = attributes else {
                    bail!("'{address}' must be a table of attributes");
                };
                let declared = attributes
                    .into_iter()
                    .map(|(attr, value)| {
                        let value = convert(&value)
                            .ok_or_else(|| anyhow!("{address}.{attr}: unsupported value {value}"))?;
                        Ok((attr, value))
                    })
                    .collect::<Result<DeclaredResource>>()?;

                if let Some(previous) = self.sources.get(&address) {
                    bail!(
                        "'{address}' is already declared in {}",
                        previous.display()
                    );
                }
                self.sources.insert(address.clone(), source.to_path_buf());
                self.resources.insert(address, declared);
            }
        }
        Ok(())
    }
}

/// Files making up a manifest path
fn manifest_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        bail!("Manifest path {} does not exist", path.display());
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "toml")
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Convert a TOML value to an attribute value
///
/// Arrays become sets and must hold only integers or only strings.
fn convert(value: &toml::Value) -> Option<Value> {
    match value {
        toml::Value::String(s) => Some(Value::String(s.clone())),
        toml::Value::Integer(i) => Some(Value::Int(*i)),
        toml::Value::Float(f) => Some(Value::Float(*f)),
        toml::Value::Boolean(b) => Some(Value::Bool(*b)),
        toml::Value::Array(items) if items.iter().all(toml::Value::is_integer) => Some(
            Value::IntSet(items.iter().filter_map(toml::Value::as_integer).collect()),
        ),
        toml::Value::Array(items) if items.iter().all(toml::Value::is_str) => {
            let set: BTreeSet<String> = items
                .iter()
                .filter_map(toml::Value::as_str)
                .map(ToString::to_string)
                .collect();
            Some(Value::StringSet(set))
        }
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SITES: &str = r#"
[site.berlin]
name = "Berlin DC1"
slug = "ber-dc1"
latitude = 52.5
tenant_id = 7
tags = ["prod", "edge", "prod"]
asn_ids = [64512]
"#;

    #[test]
    fn test_parse_resources() {
        let mut manifest = Manifest::default();
        manifest.add_str(SITES, Path::new("sites.toml")).unwrap();

        let site = &manifest.resources[&Address::new("site", "berlin")];
        assert_eq!(site.str("slug"), Some("ber-dc1"));
        assert_eq!(site.float("latitude"), Some(52.5));
        assert_eq!(site.int("tenant_id"), Some(7));
        assert_eq!(site.get("tags"), Some(&Value::from(["edge", "prod"])));
        assert_eq!(site.get("asn_ids"), Some(&Value::from([64512])));
    }

    #[test]
    fn test_empty_array_is_an_empty_set() {
        let mut manifest = Manifest::default();
        manifest
            .add_str("[service.ssh]\nports = []\n", Path::new("a.toml"))
            .unwrap();
        let ssh = &manifest.resources[&Address::new("service", "ssh")];
        assert!(ssh.get("ports").unwrap().is_empty_set());
    }

    #[test]
    fn test_rejects_unsupported_values() {
        let mut manifest = Manifest::default();
        assert!(
            manifest
                .add_str("[site.a]\nports = [1, \"x\"]\n", Path::new("a.toml"))
                .is_err()
        );
        assert!(
            manifest
                .add_str("[site.a]\nnested = { a = 1 }\n", Path::new("a.toml"))
                .is_err()
        );
        assert!(manifest.add_str("site = 1\n", Path::new("a.toml")).is_err());
    }

    #[test]
    fn test_duplicate_address_across_files() {
        let mut manifest = Manifest::default();
        manifest.add_str(SITES, Path::new("one.toml")).unwrap();
        let err = manifest
            .add_str(SITES, Path::new("two.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("one.toml"));
    }

    #[test]
    fn test_load_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("vms")).unwrap();
        fs::write(dir.path().join("sites.toml"), SITES).unwrap();
        fs::write(
            dir.path().join("vms").join("web.toml"),
            "[virtual_machine.web]\nname = \"web-01\"\nstatus = \"active\"\ncluster_id = 1\n",
        )
        .unwrap();
        fs::write(dir.path().join("README.md"), "# not a manifest").unwrap();

        let manifest = Manifest::load(dir.path()).unwrap();
        assert_eq!(manifest.resources.len(), 2);
        assert_eq!(
            manifest.sources[&Address::new("virtual_machine", "web")],
            dir.path().join("vms").join("web.toml")
        );
    }

    #[test]
    fn test_missing_path() {
        let dir = TempDir::new().unwrap();
        assert!(Manifest::load(&dir.path().join("nope")).is_err());
    }
}
