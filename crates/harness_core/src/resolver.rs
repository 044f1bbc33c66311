//! Dependency resolution: turns a flat list of loaded plugins into the
//! order their `init`/`start` hooks must run in, via Kahn's algorithm over
//! the `requires` graph.
//!
//! Unlike the upstream harness, which panics on an unsatisfiable graph,
//! every failure here is a [`ResolveError`] the caller can report and exit
//! on cleanly (§2C).

use std::collections::VecDeque;

use hashbrown::HashMap;

use crate::error::ResolveError;
use crate::manifest::PluginManifest;

/// Checks conflicts and `requires` constraints, then returns plugin names
/// in a valid initialization order (dependencies before dependents).
///
/// `plugins` is scanned in the order given; ties among independently
/// orderable plugins are broken by that input order, so resolving the same
/// input twice always yields the same order.
pub fn resolve(plugins: &[PluginManifest]) -> Result<Vec<String>, ResolveError> {
    let index: HashMap<&str, usize> = plugins
        .iter()
        .enumerate()
        .map(|(i, p)| (p.name.as_str(), i))
        .collect();

    check_conflicts(plugins, &index)?;
    check_requirements(plugins, &index)?;

    let order = topological_order(plugins, &index);
    if order.len() == plugins.len() {
        return Ok(order.into_iter().map(|i| plugins[i].name.clone()).collect());
    }

    let resolved: std::collections::HashSet<usize> = order.into_iter().collect();
    let stuck: Vec<String> = (0..plugins.len())
        .filter(|i| !resolved.contains(i))
        .map(|i| plugins[i].name.clone())
        .collect();
    Err(ResolveError::CycleDetected(stuck))
}

/// Reverses an initialization order into a teardown order, per §4.5's
/// reverse-order `deinit` rule.
#[must_use]
pub fn teardown_order(init_order: &[String]) -> Vec<String> {
    init_order.iter().rev().cloned().collect()
}

fn check_conflicts(
    plugins: &[PluginManifest],
    index: &HashMap<&str, usize>,
) -> Result<(), ResolveError> {
    for plugin in plugins {
        for conflict in &plugin.conflicts {
            if index.contains_key(conflict.as_str()) {
                return Err(ResolveError::ConflictDeclared(
                    plugin.name.clone(),
                    conflict.clone(),
                ));
            }
        }
    }
    Ok(())
}

fn check_requirements(
    plugins: &[PluginManifest],
    index: &HashMap<&str, usize>,
) -> Result<(), ResolveError> {
    for plugin in plugins {
        for requirement in &plugin.requires {
            let Some(&dep_idx) = index.get(requirement.name.as_str()) else {
                return Err(ResolveError::MissingDependency {
                    plugin: plugin.name.clone(),
                    dependency: requirement.name.clone(),
                });
            };
            requirement.check(plugins[dep_idx].version)?;
        }
    }
    Ok(())
}

fn topological_order(plugins: &[PluginManifest], index: &HashMap<&str, usize>) -> Vec<usize> {
    let n = plugins.len();
    let mut indegree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (dependent_idx, plugin) in plugins.iter().enumerate() {
        for requirement in &plugin.requires {
            // Presence already verified by `check_requirements`.
            let dep_idx = index[requirement.name.as_str()];
            dependents[dep_idx].push(dependent_idx);
            indegree[dependent_idx] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(i) = queue.pop_front() {
        order.push(i);
        for &dependent in &dependents[i] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Version;

    fn plugin(name: &str, requires: &[&str]) -> PluginManifest {
        PluginManifest {
            name: name.to_owned(),
            abi_version: crate::manifest::ABI_VERSION,
            brief: String::new(),
            version: Version::new(1, 0, 0),
            requires: requires
                .iter()
                .map(|r| crate::version::Requirement::parse(r).unwrap())
                .collect(),
            conflicts: Vec::new(),
            has_init: true,
            has_deinit: true,
            has_start: false,
        }
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let plugins = vec![
            plugin("routing", &["fabric_cache"]),
            plugin("fabric_cache", &[]),
            plugin("logger", &[]),
        ];
        let order = resolve(&plugins).unwrap();
        let fc_pos = order.iter().position(|n| n == "fabric_cache").unwrap();
        let routing_pos = order.iter().position(|n| n == "routing").unwrap();
        assert!(fc_pos < routing_pos);
    }

    #[test]
    fn missing_dependency_is_reported() {
        let plugins = vec![plugin("routing", &["fabric_cache"])];
        let err = resolve(&plugins).unwrap_err();
        assert!(matches!(err, ResolveError::MissingDependency { .. }));
    }

    #[test]
    fn cycle_is_detected_and_named() {
        let plugins = vec![plugin("a", &["b"]), plugin("b", &["a"])];
        let err = resolve(&plugins).unwrap_err();
        match err {
            ResolveError::CycleDetected(names) => {
                assert_eq!(names.len(), 2);
                assert!(names.contains(&"a".to_owned()));
                assert!(names.contains(&"b".to_owned()));
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn declared_conflict_is_rejected() {
        let mut routing = plugin("routing", &[]);
        routing.conflicts.push("legacy_routing".to_owned());
        let plugins = vec![routing, plugin("legacy_routing", &[])];
        let err = resolve(&plugins).unwrap_err();
        assert!(matches!(err, ResolveError::ConflictDeclared(..)));
    }

    #[test]
    fn teardown_reverses_init_order() {
        let order = vec!["fabric_cache".to_owned(), "routing".to_owned()];
        assert_eq!(
            teardown_order(&order),
            vec!["routing".to_owned(), "fabric_cache".to_owned()]
        );
    }
}
