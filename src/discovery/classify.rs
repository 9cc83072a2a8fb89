//! Provenance classification.
//!
//! Partitions one pass worth of container facts into stack seeds: one seed
//! per registered stack directory, one per remaining compose project, one per
//! unlabeled container. The partition is pure: every container lands in
//! exactly one seed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::compose;
use crate::docker::ContainerFact;
use crate::error::ResultOkLogExt;

/// Reserved name prefix for orphan pseudo-stacks. `~` cannot appear in a
/// compose project name or a directory-derived stack name, so prefixed names
/// never collide with the other provenance classes.
pub const ORPHAN_PREFIX: &str = "orphan~";

/// How a stack was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Registered under the configured stacks root with a definition file.
    Directory,
    /// Compose project running without a registered directory.
    External,
    /// Unlabeled container treated as a single-container pseudo-stack.
    Orphan,
}

/// One classified stack before its definition is resolved and the unified
/// view is built.
#[derive(Debug, Clone)]
pub struct StackSeed {
    pub name: String,
    pub provenance: Provenance,
    /// Stack directory; `None` for external and orphan seeds.
    pub path: Option<PathBuf>,
    /// Located definition file; `None` when it has to be synthesized.
    pub definition_file: Option<PathBuf>,
    /// Well-known env-file names present next to a directory definition.
    pub env_files: Vec<String>,
    pub containers: Vec<ContainerFact>,
}

impl StackSeed {
    fn directory(name: String, path: PathBuf, containers: Vec<ContainerFact>) -> Self {
        let definition_file = compose::find_definition_file(&path);
        let env_files = compose::existing_env_files(&path);
        Self {
            name,
            provenance: Provenance::Directory,
            path: Some(path),
            definition_file,
            env_files,
            containers,
        }
    }

    fn external(name: String, containers: Vec<ContainerFact>) -> Self {
        Self {
            name,
            provenance: Provenance::External,
            path: None,
            definition_file: None,
            env_files: Vec::new(),
            containers,
        }
    }

    fn orphan(container: ContainerFact) -> Self {
        Self {
            name: format!("{ORPHAN_PREFIX}{}", container.name),
            provenance: Provenance::Orphan,
            path: None,
            definition_file: None,
            env_files: Vec::new(),
            containers: vec![container],
        }
    }
}

/// Partitions `containers` into stack seeds against the registered stack
/// directories under `stacks_root`.
///
/// Directory seeds consume their matching compose-project bucket (possibly
/// empty, yielding an idle stack). Remaining non-empty buckets become
/// external seeds; every unlabeled container becomes one orphan seed. Seeds
/// are returned in deterministic order: directories, then external projects,
/// then orphans, each sorted by name.
pub fn classify(containers: Vec<ContainerFact>, stacks_root: &Path) -> Vec<StackSeed> {
    let mut projects: BTreeMap<String, Vec<ContainerFact>> = BTreeMap::new();
    let mut orphans: Vec<ContainerFact> = Vec::new();
    for container in containers {
        match container.project_name().map(str::to_owned) {
            Some(project) => projects.entry(project).or_default().push(container),
            None => orphans.push(container),
        }
    }

    let mut seeds = Vec::new();
    for dir in stack_directories(stacks_root) {
        let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let members = projects.remove(&name).unwrap_or_default();
        let seed = StackSeed::directory(name, dir, members);
        // A directory without any definition file is not a registered stack;
        // put its containers back so they classify as external.
        if seed.definition_file.is_none() {
            if !seed.containers.is_empty() {
                projects.insert(seed.name.clone(), seed.containers);
            }
            continue;
        }
        seeds.push(seed);
    }

    for (project, members) in projects {
        seeds.push(StackSeed::external(project, members));
    }

    orphans.sort_by(|a, b| a.name.cmp(&b.name));
    for container in orphans {
        seeds.push(StackSeed::orphan(container));
    }

    seeds
}

/// Lists the subdirectories of the stacks root in sorted order.
///
/// An unreadable root is logged and treated as empty; containers then
/// classify as external or orphan.
fn stack_directories(stacks_root: &Path) -> Vec<PathBuf> {
    let context = format!("failed to read stacks root `{}`", stacks_root.display());
    let Some(entries) = std::fs::read_dir(stacks_root).ok_log_ctx(&context) else {
        return Vec::new();
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok_log())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::mock::MockDockerClient;

    fn write_stack_dir(root: &Path, name: &str) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("compose.yaml"), "services:\n  app:\n    image: x\n").unwrap();
        dir
    }

    #[test]
    fn test_directory_consumes_project_bucket() {
        let root = tempfile::tempdir().unwrap();
        write_stack_dir(root.path(), "web");

        let containers = vec![
            MockDockerClient::compose_container("aaa111", "web-app-1", "web", "app", true),
            MockDockerClient::compose_container("bbb222", "web-db-1", "web", "db", true),
        ];
        let seeds = classify(containers, root.path());

        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].name, "web");
        assert_eq!(seeds[0].provenance, Provenance::Directory);
        assert_eq!(seeds[0].containers.len(), 2);
        assert!(seeds[0].definition_file.is_some());
    }

    #[test]
    fn test_empty_directory_stack() {
        let root = tempfile::tempdir().unwrap();
        write_stack_dir(root.path(), "idle");

        let seeds = classify(Vec::new(), root.path());
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].name, "idle");
        assert!(seeds[0].containers.is_empty());
    }

    #[test]
    fn test_unmatched_project_is_external() {
        let root = tempfile::tempdir().unwrap();
        let containers = vec![MockDockerClient::compose_container(
            "aaa111", "caddy-1", "caddy", "proxy", true,
        )];
        let seeds = classify(containers, root.path());

        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].name, "caddy");
        assert_eq!(seeds[0].provenance, Provenance::External);
    }

    #[test]
    fn test_unlabeled_container_is_orphan() {
        let root = tempfile::tempdir().unwrap();
        let containers = vec![MockDockerClient::running_container("aaa111", "redis-cache")];
        let seeds = classify(containers, root.path());

        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].name, "orphan~redis-cache");
        assert_eq!(seeds[0].provenance, Provenance::Orphan);
        assert_eq!(seeds[0].containers.len(), 1);
    }

    #[test]
    fn test_directory_without_definition_file_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("notes")).unwrap();
        let containers = vec![MockDockerClient::compose_container(
            "aaa111", "notes-1", "notes", "app", true,
        )];
        let seeds = classify(containers, root.path());

        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].provenance, Provenance::External);
        assert_eq!(seeds[0].name, "notes");
    }

    #[test]
    fn test_partition_is_exhaustive_and_disjoint() {
        let root = tempfile::tempdir().unwrap();
        write_stack_dir(root.path(), "web");

        let containers = vec![
            MockDockerClient::compose_container("aaa111", "web-app-1", "web", "app", true),
            MockDockerClient::compose_container("bbb222", "caddy-1", "caddy", "proxy", true),
            MockDockerClient::running_container("ccc333", "redis-cache"),
        ];
        let total = containers.len();
        let seeds = classify(containers, root.path());

        let mut seen: Vec<&str> = seeds
            .iter()
            .flat_map(|seed| seed.containers.iter().map(|c| c.id.as_ref()))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen.len(), total);
        seen.dedup();
        assert_eq!(seen.len(), total);
    }

    #[test]
    fn test_directory_env_files_recorded() {
        let root = tempfile::tempdir().unwrap();
        let dir = write_stack_dir(root.path(), "web");
        std::fs::write(dir.join(".env"), "DB_HOST=db\n").unwrap();

        let seeds = classify(Vec::new(), root.path());
        assert_eq!(seeds[0].env_files, vec![".env"]);
    }
}
