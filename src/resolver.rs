//! Backtracking version resolution: takes a root manifest and a registry
//! facade, returns a concrete, acyclic, deduplicated dependency set pinned
//! to exact versions (spec 4.D).

use crate::error::{ConflictLink, Error, Result};
use crate::manifest::{Dependency, DependencySource, GitSelector, Manifest};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use semver::{Version, VersionReq};
use std::collections::{HashMap, HashSet};

use crate::registry::Registry;

/// Where a resolved package's source material comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOrigin {
    /// Fetched from the registry; materialized by the Source Store.
    Registry,
    /// A local path, relative to the manifest that declared it.
    Path(Utf8PathBuf),
    /// A git reference. Cloning it is out of scope for this core (spec 1's
    /// "third-party tool invocation" exclusion extends to VCS tooling);
    /// resolution still records the pin so the graph is complete.
    Git {
        /// The repository URL.
        url: String,
        /// The revision selector.
        selector: GitSelector,
    },
}

/// A manifest merged with an exact chosen version and (once the Source
/// Store runs) a pointer to its local unpacked source directory.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    /// The package name.
    pub name: String,
    /// The exact version chosen for this package.
    pub version: Version,
    /// Where this package's source comes from.
    pub origin: PackageOrigin,
    /// Names of this package's own (non-dev) dependencies.
    pub dependencies: Vec<String>,
}

/// An ordered, deduplicated, acyclic set of [`ResolvedPackage`]s including
/// the root, represented as an arena indexed by integer per spec 9's
/// "Dependency graphs" note.
#[derive(Debug, Clone, Default)]
pub struct ResolutionSet {
    /// Resolved packages, root first.
    pub packages: Vec<ResolvedPackage>,
    /// Dependency edges as `(from_index, to_index)` pairs.
    pub edges: Vec<(usize, usize)>,
}

impl ResolutionSet {
    /// Look up a resolved package's arena index by name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.packages.iter().position(|p| p.name == name)
    }

    /// Return the resolution in topological order (dependencies before
    /// dependents), ties broken lexicographically by name.
    #[must_use]
    pub fn topological_order(&self) -> Vec<usize> {
        let mut indegree = vec![0usize; self.packages.len()];
        for &(from, _to) in &self.edges {
            if let Some(count) = indegree.get_mut(from) {
                *count += 1;
            }
        }
        let name_of = |idx: usize| self.packages.get(idx).map_or("", |p| p.name.as_str());

        let mut ready: Vec<usize> = (0..self.packages.len())
            .filter(|&i| indegree.get(i).copied() == Some(0))
            .collect();
        ready.sort_by(|&a, &b| name_of(a).cmp(name_of(b)));
        let mut order = Vec::with_capacity(self.packages.len());
        let mut ready: std::collections::VecDeque<usize> = ready.into();
        while let Some(idx) = ready.pop_front() {
            order.push(idx);
            let mut newly_ready = Vec::new();
            for &(from, to) in &self.edges {
                if to != idx {
                    continue;
                }
                let Some(count) = indegree.get_mut(from) else {
                    continue;
                };
                *count -= 1;
                if *count == 0 {
                    newly_ready.push(from);
                }
            }
            newly_ready.sort_by(|&a, &b| name_of(a).cmp(name_of(b)));
            for n in newly_ready {
                ready.push_back(n);
            }
        }
        order
    }
}

struct Edge {
    from: String,
    to: String,
    req: VersionReq,
}

struct Explorer<'a> {
    registry: &'a dyn Registry,
    root_dir: &'a Utf8Path,
    manifest_file_name: &'a str,
    edges: Vec<Edge>,
    explored: HashSet<String>,
    visiting: Vec<String>,
    dependencies_of: HashMap<String, Vec<String>>,
    origins: HashMap<String, PackageOrigin>,
    path_manifests: HashMap<String, Manifest>,
}

impl<'a> Explorer<'a> {
    fn explore(&mut self, from: &str, name: &str, dep: &Dependency) -> Result<()> {
        if self.visiting.contains(&name.to_owned()) {
            let mut cycle = self.visiting.clone();
            cycle.push(name.to_owned());
            let start = cycle.iter().position(|n| n == name).unwrap_or(0);
            let rotated: Vec<String> = cycle.get(start..).map(<[String]>::to_vec).unwrap_or_default();
            return Err(Error::DependencyCycle {
                cycle: rotated.join(" -> "),
            });
        }

        if let Some(source) = &dep.source {
            self.explore_pinned(from, name, source)?;
            return Ok(());
        }

        let Some(range) = &dep.range else {
            return Err(Error::ManifestParseError {
                path: self.root_dir.join(self.manifest_file_name),
                message: format!("dependency '{name}' declares neither a version nor a source"),
            });
        };
        let req = VersionReq::parse(range).map_err(|source| Error::ManifestParseError {
            path: self.root_dir.join(self.manifest_file_name),
            message: format!("invalid version requirement for '{name}': {source}"),
        })?;
        self.edges.push(Edge {
            from: from.to_owned(),
            to: name.to_owned(),
            req: req.clone(),
        });

        if self.explored.contains(name) {
            return Ok(());
        }
        self.explored.insert(name.to_owned());
        self.origins
            .entry(name.to_owned())
            .or_insert(PackageOrigin::Registry);

        let candidates = self.registry.versions(name)?;
        let mut sorted = candidates;
        sorted.sort();
        sorted.reverse();
        let Some(best) = sorted.into_iter().find(|v| req.matches(v)) else {
            return Err(Error::NoVersionSatisfies {
                name: name.to_owned(),
                chain: format!("{from}->{name} {range}"),
            });
        };

        self.visiting.push(name.to_owned());
        let deps = self.registry.dependencies(name, &best)?;
        let mut dep_names = Vec::with_capacity(deps.len());
        for (dep_name, dep) in &deps {
            dep_names.push(dep_name.clone());
            self.explore(name, dep_name, dep)?;
        }
        self.visiting.pop();
        self.dependencies_of.insert(name.to_owned(), dep_names);
        Ok(())
    }

    fn explore_pinned(&mut self, from: &str, name: &str, source: &DependencySource) -> Result<()> {
        if self.explored.contains(name) {
            return Ok(());
        }
        self.explored.insert(name.to_owned());

        match source {
            DependencySource::Path(rel) => {
                let dir = self.root_dir.join(rel);
                let manifest_path = dir.join(self.manifest_file_name);
                let manifest = Manifest::load(&manifest_path)?;
                self.origins
                    .insert(name.to_owned(), PackageOrigin::Path(dir.clone()));

                self.visiting.push(name.to_owned());
                let mut dep_names = Vec::new();
                for (dep_name, dep) in &manifest.dependencies {
                    dep_names.push(dep_name.clone());
                    let mut nested = Explorer {
                        registry: self.registry,
                        root_dir: &dir,
                        manifest_file_name: self.manifest_file_name,
                        edges: Vec::new(),
                        explored: self.explored.clone(),
                        visiting: self.visiting.clone(),
                        dependencies_of: HashMap::new(),
                        origins: HashMap::new(),
                        path_manifests: HashMap::new(),
                    };
                    nested.explore(name, dep_name, dep)?;
                    self.edges.extend(nested.edges);
                    self.explored.extend(nested.explored);
                    self.dependencies_of.extend(nested.dependencies_of);
                    self.origins.extend(nested.origins);
                    self.path_manifests.extend(nested.path_manifests);
                }
                self.visiting.pop();
                self.dependencies_of.insert(name.to_owned(), dep_names);
                self.path_manifests.insert(name.to_owned(), manifest);
                Ok(())
            }
            DependencySource::Git { url, selector } => {
                self.origins.insert(
                    name.to_owned(),
                    PackageOrigin::Git {
                        url: url.clone(),
                        selector: selector.clone(),
                    },
                );
                self.dependencies_of.insert(name.to_owned(), Vec::new());
                let _ = from;
                Ok(())
            }
        }
    }
}

/// Resolve `root` against `registry`, returning a frozen [`ResolutionSet`].
///
/// `manifest_file_name` names the manifest file expected inside path
/// dependency directories (matching the root manifest's own file name).
/// When `include_dev` is set, `dev-dependencies` are resolved alongside the
/// default dependency graph (spec 8's open question: by default dev
/// dependencies are excluded from the link graph).
///
/// # Errors
///
/// Returns [`Error::NoVersionSatisfies`] when constraint intersection fails,
/// [`Error::DependencyCycle`] on a back-edge, or a registry/manifest error
/// propagated from lower layers.
pub fn resolve(
    root: &Manifest,
    root_dir: &Utf8Path,
    manifest_file_name: &str,
    registry: &dyn Registry,
    include_dev: bool,
) -> Result<ResolutionSet> {
    let mut explorer = Explorer {
        registry,
        root_dir,
        manifest_file_name,
        edges: Vec::new(),
        explored: HashSet::new(),
        visiting: vec![root.package.name.clone()],
        dependencies_of: HashMap::new(),
        origins: HashMap::new(),
        path_manifests: HashMap::new(),
    };

    let mut root_deps: IndexMap<String, Dependency> = root.dependencies.clone();
    if include_dev {
        for (name, dep) in &root.dev_dependencies {
            root_deps.entry(name.clone()).or_insert_with(|| dep.clone());
        }
    }
    for (name, dep) in &root_deps {
        explorer.explore(&root.package.name, name, dep)?;
    }

    // Constraint intersection: for every name with edges, pick the highest
    // candidate satisfying every requirement that reaches it (spec 4.D's
    // "intersect all active constraints").
    let mut reqs_by_name: IndexMap<String, Vec<&Edge>> = IndexMap::new();
    for edge in &explorer.edges {
        reqs_by_name.entry(edge.to.clone()).or_default().push(edge);
    }

    let mut chosen: IndexMap<String, Version> = IndexMap::new();
    for (name, edges) in &reqs_by_name {
        if matches!(explorer.origins.get(name), Some(PackageOrigin::Path(_)) | Some(PackageOrigin::Git { .. })) {
            continue;
        }
        let mut candidates = registry.versions(name)?;
        candidates.sort();
        candidates.reverse();
        let best = candidates
            .into_iter()
            .find(|v| edges.iter().all(|e| e.req.matches(v)));
        match best {
            Some(version) => {
                chosen.insert(name.clone(), version);
            }
            None => {
                let chain = edges
                    .iter()
                    .map(|e| {
                        ConflictLink {
                            from: e.from.clone(),
                            to: e.to.clone(),
                            range: e.req.to_string(),
                        }
                        .to_string()
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(Error::NoVersionSatisfies {
                    name: name.clone(),
                    chain,
                });
            }
        }
    }

    let mut packages = vec![ResolvedPackage {
        name: root.package.name.clone(),
        version: root.package.version.clone(),
        origin: PackageOrigin::Registry,
        dependencies: root_deps.keys().cloned().collect(),
    }];
    let mut names = vec![root.package.name.clone()];

    for name in explorer.explored.iter().collect::<std::collections::BTreeSet<_>>() {
        let origin = explorer
            .origins
            .get(name)
            .cloned()
            .unwrap_or(PackageOrigin::Registry);
        let version = match &origin {
            PackageOrigin::Path(_) => explorer
                .path_manifests
                .get(name)
                .map(|m| m.package.version.clone())
                .unwrap_or_else(|| Version::new(0, 0, 0)),
            PackageOrigin::Git { .. } => Version::new(0, 0, 0),
            PackageOrigin::Registry => chosen.get(name).cloned().unwrap_or_else(|| Version::new(0, 0, 0)),
        };
        packages.push(ResolvedPackage {
            name: name.clone(),
            version,
            origin,
            dependencies: explorer
                .dependencies_of
                .get(name)
                .cloned()
                .unwrap_or_default(),
        });
        names.push(name.clone());
    }

    let mut edges = Vec::new();
    for (from_idx, package) in packages.iter().enumerate() {
        for dep_name in &package.dependencies {
            if let Some(to_idx) = names.iter().position(|n| n == dep_name) {
                edges.push((from_idx, to_idx));
            }
        }
    }

    Ok(ResolutionSet { packages, edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Package;
    use std::collections::HashMap as Map;
    use std::sync::Mutex;

    struct MockRegistry {
        versions: Map<String, Vec<Version>>,
        deps: Mutex<Map<(String, Version), Vec<(String, Dependency)>>>,
    }

    impl Registry for MockRegistry {
        fn search(&self, _query: &str, _limit: usize) -> Result<Vec<crate::registry::SearchResult>> {
            Ok(Vec::new())
        }

        fn versions(&self, name: &str) -> Result<Vec<Version>> {
            self.versions
                .get(name)
                .cloned()
                .ok_or_else(|| Error::PackageNotFound {
                    name: name.to_owned(),
                })
        }

        fn fetch(&self, _name: &str, _version: &Version) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }

        fn dependencies(&self, name: &str, version: &Version) -> Result<Vec<(String, Dependency)>> {
            Ok(self
                .deps
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .get(&(name.to_owned(), version.clone()))
                .cloned()
                .unwrap_or_default())
        }
    }

    fn range_dep(range: &str) -> Dependency {
        Dependency {
            range: Some(range.to_owned()),
            source: None,
        }
    }

    fn root_manifest(deps: &[(&str, &str)]) -> Manifest {
        let mut dependencies = IndexMap::new();
        for (name, range) in deps {
            dependencies.insert((*name).to_owned(), range_dep(range));
        }
        Manifest::for_test(
            Package {
                name: "root".to_owned(),
                version: Version::new(0, 1, 0),
                edition: None,
            },
            dependencies,
            IndexMap::new(),
        )
    }

    #[rstest::rstest]
    #[case("~1.2", true)]
    #[case("^2.0", false)]
    fn s6_constraint_intersection_across_transitive_edges(#[case] b_requires_a: &str, #[case] should_resolve: bool) {
        let registry = MockRegistry {
            versions: Map::from([
                (
                    "A".to_owned(),
                    vec![Version::new(1, 0, 0), Version::new(1, 2, 3), Version::new(2, 0, 0)],
                ),
                ("B".to_owned(), vec![Version::new(1, 0, 0)]),
            ]),
            deps: Mutex::new(Map::from([(
                ("B".to_owned(), Version::new(1, 0, 0)),
                vec![("A".to_owned(), range_dep(b_requires_a))],
            )])),
        };
        let manifest = root_manifest(&[("A", "^1.0"), ("B", "^1.0")]);
        let result = resolve(&manifest, Utf8Path::new("."), "poac.toml", &registry, false);

        if should_resolve {
            let resolved = result.expect("resolution succeeds");
            let a = resolved
                .packages
                .iter()
                .find(|p| p.name == "A")
                .expect("A resolved");
            assert_eq!(a.version, Version::new(1, 2, 3));
        } else {
            assert!(matches!(result, Err(Error::NoVersionSatisfies { .. })));
        }
    }

    #[test]
    fn s5_resolution_picks_highest_satisfying_candidate() {
        let registry = MockRegistry {
            versions: Map::from([(
                "A".to_owned(),
                vec![
                    Version::new(1, 0, 0),
                    Version::new(1, 2, 3),
                    Version::new(2, 0, 0),
                ],
            )]),
            deps: Mutex::new(Map::new()),
        };
        let manifest = root_manifest(&[("A", "^1.0")]);
        let resolved = resolve(&manifest, Utf8Path::new("."), "poac.toml", &registry, false)
            .expect("resolution succeeds");
        let a = resolved
            .packages
            .iter()
            .find(|p| p.name == "A")
            .expect("A resolved");
        assert_eq!(a.version, Version::new(1, 2, 3));
    }
}
