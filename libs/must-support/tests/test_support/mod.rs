#![allow(dead_code)]

use msfind_core::{Config, PackageSpec};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Minimal profile StructureDefinition with the given differential elements
pub fn make_sd(id: &str, type_name: &str, title: &str, elements: Vec<Value>) -> Value {
    json!({
        "resourceType": "StructureDefinition",
        "id": id,
        "url": format!("http://example.org/fhir/StructureDefinition/{}", id),
        "version": "1.0.0",
        "name": title.replace(' ', ""),
        "title": title,
        "status": "active",
        "kind": "resource",
        "abstract": false,
        "type": type_name,
        "derivation": "constraint",
        "differential": { "element": elements }
    })
}

pub fn collection(resources: Vec<Value>) -> Value {
    let entry: Vec<Value> = resources
        .into_iter()
        .map(|resource| json!({ "resource": resource }))
        .collect();
    json!({ "resourceType": "Bundle", "type": "collection", "entry": entry })
}

/// Temporary workspace: a package cache, an instances folder and a root data folder
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        fs::create_dir_all(dir.path().join("cache")).expect("create cache dir");
        fs::create_dir_all(dir.path().join("instances")).expect("create instances dir");
        Self { dir }
    }

    pub fn cache(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    pub fn instances(&self) -> PathBuf {
        self.dir.path().join("instances")
    }

    pub fn rootdir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    /// Write `<cache>/<name>#<version>/package/` with a manifest and the given resources
    pub fn add_package(&self, name: &str, version: &str, resources: &[Value]) -> PathBuf {
        let dir = self
            .cache()
            .join(format!("{}#{}", name, version))
            .join("package");
        fs::create_dir_all(&dir).expect("create package dir");
        write_json(
            &dir.join("package.json"),
            &json!({ "name": name, "version": version, "fhirVersions": ["4.0.1"] }),
        );
        for resource in resources {
            let file = format!(
                "{}-{}.json",
                resource["resourceType"].as_str().unwrap_or("Resource"),
                resource["id"].as_str().unwrap_or("unknown")
            );
            write_json(&dir.join(file), resource);
        }
        dir
    }

    pub fn add_instance(&self, file: &str, content: &Value) {
        write_json(&self.instances().join(file), content);
    }

    pub fn add_raw_instance(&self, file: &str, content: &str) {
        fs::write(self.instances().join(file), content).expect("write instance");
    }

    pub fn config(&self, packages: &[(&str, &str)]) -> Config {
        serde_json::from_value(json!({
            "init": [{ "mode": "clean" }],
            "fhir-package-cache": self.cache(),
            "packages": packages
                .iter()
                .map(|(name, version)| PackageSpec {
                    name: name.to_string(),
                    version: version.to_string(),
                    title: None,
                })
                .collect::<Vec<_>>(),
            "instances": self.instances(),
        }))
        .expect("valid config")
    }
}

pub fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_vec_pretty(value).expect("serialize")).expect("write json");
}
