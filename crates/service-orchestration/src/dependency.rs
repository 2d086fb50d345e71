//! Service startup ordering from `dependsOn`.

use crate::config::ServiceConfig;
use crate::error::ConfigError;
use std::collections::{BTreeSet, HashMap};

/// Dependency graph over a service list
///
/// Nodes are positions in the list, so ties are always broken by
/// configuration-file order.
pub struct DependencyGraph<'a> {
    services: &'a [ServiceConfig],
    index: HashMap<&'a str, usize>,
    /// dependency -> services that depend on it
    dependents: Vec<Vec<usize>>,
    /// service -> its dependencies
    dependencies: Vec<Vec<usize>>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the graph; every `dependsOn` entry must name a listed service
    pub fn from_services(services: &'a [ServiceConfig]) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(services.len());
        for (i, service) in services.iter().enumerate() {
            index.entry(service.name.as_str()).or_insert(i);
        }

        let mut dependents = vec![Vec::new(); services.len()];
        let mut dependencies = vec![Vec::new(); services.len()];

        for (i, service) in services.iter().enumerate() {
            for dep in &service.depends_on {
                let Some(&d) = index.get(dep.as_str()) else {
                    return Err(ConfigError::UnknownDependency {
                        service: service.name.clone(),
                        dependency: dep.clone(),
                    });
                };
                dependents[d].push(i);
                dependencies[i].push(d);
            }
        }

        Ok(Self {
            services,
            index,
            dependents,
            dependencies,
        })
    }

    /// Stable topological order (Kahn's algorithm)
    ///
    /// Among services whose dependencies are all placed, the one declared
    /// first goes next. Without dependencies this is file order.
    pub fn topological_order(&self) -> Result<Vec<&'a ServiceConfig>, ConfigError> {
        let mut in_degree: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();
        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(self.services.len());

        while let Some(next) = ready.pop_first() {
            order.push(next);
            for &dependent in &self.dependents[next] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != self.services.len() {
            let stuck = in_degree
                .iter()
                .enumerate()
                .filter(|(_, degree)| **degree > 0)
                .map(|(i, _)| self.services[i].name.clone())
                .collect();
            return Err(ConfigError::DependencyCycle(stuck));
        }

        Ok(order.into_iter().map(|i| &self.services[i]).collect())
    }

    /// Positions of `names` plus everything they transitively depend on
    pub fn with_dependencies<S: AsRef<str>>(&self, names: &[S]) -> Result<BTreeSet<usize>, ConfigError> {
        let mut selected = BTreeSet::new();
        let mut stack = Vec::new();

        for name in names {
            let name = name.as_ref();
            let &i = self
                .index
                .get(name)
                .ok_or_else(|| ConfigError::UnknownService(name.to_string()))?;
            stack.push(i);
        }

        while let Some(i) = stack.pop() {
            if selected.insert(i) {
                stack.extend(self.dependencies[i].iter().copied());
            }
        }

        Ok(selected)
    }
}

/// Services in startup order, optionally restricted to `only` and their dependencies
///
/// An empty `only` selects every service.
pub fn resolve_services<S: AsRef<str>>(
    services: &[ServiceConfig],
    only: &[S],
) -> Result<Vec<ServiceConfig>, ConfigError> {
    let graph = DependencyGraph::from_services(services)?;
    let order = graph.topological_order()?;

    if only.is_empty() {
        return Ok(order.into_iter().cloned().collect());
    }

    let selected = graph.with_dependencies(only)?;
    Ok(order
        .into_iter()
        .filter(|service| {
            graph
                .index
                .get(service.name.as_str())
                .is_some_and(|i| selected.contains(i))
        })
        .cloned()
        .collect())
}
