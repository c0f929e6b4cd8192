use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("arch-check") => arch_check(),
        Some(cmd) => anyhow::bail!("Unknown xtask command: {cmd}"),
        None => anyhow::bail!("Usage: cargo xtask <command>\n\nCommands:\n  arch-check"),
    }
}

/// Workspace crates each crate may depend on.
fn allowed_internal_deps() -> BTreeMap<&'static str, &'static [&'static str]> {
    BTreeMap::from([
        ("eom-domain", &[][..]),
        ("eom-shared", &[][..]),
        ("eom-engine", &["eom-domain", "eom-shared"][..]),
        ("eom-player", &["eom-shared"][..]),
        ("xtask", &[][..]),
    ])
}

#[derive(Deserialize)]
struct Metadata {
    packages: Vec<Package>,
    workspace_root: PathBuf,
}

#[derive(Deserialize)]
struct Package {
    name: String,
    manifest_path: PathBuf,
    dependencies: Vec<Dependency>,
}

#[derive(Deserialize)]
struct Dependency {
    name: String,
    #[serde(default)]
    kind: Option<String>,
}

fn arch_check() -> anyhow::Result<()> {
    let output = std::process::Command::new("cargo")
        .args(["metadata", "--format-version", "1", "--no-deps"])
        .output()
        .context("running cargo metadata")?;

    if !output.status.success() {
        anyhow::bail!("cargo metadata failed")
    }

    let metadata: Metadata =
        serde_json::from_slice(&output.stdout).context("parsing cargo metadata output")?;
    let allowed = allowed_internal_deps();
    let internal: BTreeSet<&str> = allowed.keys().copied().collect();

    let mut violations = Vec::new();
    for package in &metadata.packages {
        let Some(permitted) = allowed.get(package.name.as_str()) else {
            violations.push(format!("{} is not a known workspace crate", package.name));
            continue;
        };

        for dep in &package.dependencies {
            if dep.kind.as_deref() == Some("dev") || !internal.contains(dep.name.as_str()) {
                continue;
            }
            if !permitted.contains(&dep.name.as_str()) {
                violations.push(format!("{} must not depend on {}", package.name, dep.name));
            }
        }

        let src = package
            .manifest_path
            .parent()
            .map(|dir| dir.join("src"))
            .unwrap_or_default();
        violations.extend(check_sources(&package.name, permitted, &internal, &src)?);
    }

    if violations.is_empty() {
        println!(
            "arch-check passed for {} crates in {}",
            metadata.packages.len(),
            metadata.workspace_root.display()
        );
        return Ok(());
    }

    for violation in &violations {
        eprintln!("  - {violation}");
    }
    anyhow::bail!("arch-check found {} violation(s)", violations.len())
}

/// Flag `use` paths into workspace crates the package may not depend on.
fn check_sources(
    package: &str,
    permitted: &[&str],
    internal: &BTreeSet<&str>,
    src: &Path,
) -> anyhow::Result<Vec<String>> {
    let pattern = regex_lite::Regex::new(r"\b(eom_[a-z]+)::").context("compiling path regex")?;
    let own = package.replace('-', "_");

    let mut violations = Vec::new();
    for file in rust_files(src)? {
        let text = fs::read_to_string(&file)
            .with_context(|| format!("reading {}", file.display()))?;
        for (line_no, line) in text.lines().enumerate() {
            for caps in pattern.captures_iter(line) {
                let krate = caps[1].replace('_', "-");
                if caps[1] == own || !internal.contains(krate.as_str()) {
                    continue;
                }
                if !permitted.contains(&krate.as_str()) {
                    violations.push(format!(
                        "{}:{}: {package} reaches into {krate}",
                        file.display(),
                        line_no + 1
                    ));
                }
            }
        }
    }
    Ok(violations)
}

fn rust_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(rust_files(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
    Ok(files)
}
