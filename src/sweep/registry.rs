//! Resource type registry
//!
//! All resource types are registered explicitly through [`RegistryBuilder`]
//! and validated in one place: no duplicate names, no dependency on a type
//! that is not registered, no dependency cycles. The built registry is
//! immutable and owns the dependency layering the sweeper executes.
//!
//! "A depends on B" means B's instances must be drained before A's removal
//! starts; B therefore lands in an earlier wave than A.

use super::error::ConfigError;
use super::params::ScanScope;
use super::resource::{Capabilities, Lister};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Who owns instances of a resource type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OwnerScope {
    Workspace,
    Organization,
    #[default]
    Project,
}

impl fmt::Display for OwnerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OwnerScope::Workspace => "workspace",
            OwnerScope::Organization => "organization",
            OwnerScope::Project => "project",
        };
        f.write_str(s)
    }
}

/// One resource type's complete registration
pub struct Registration {
    pub kind: &'static str,
    pub owner: OwnerScope,
    pub scope: ScanScope,
    pub api: &'static str,
    pub dependencies: Vec<&'static str>,
    pub settings: Vec<&'static str>,
    pub capabilities: Capabilities,
    pub lister: Arc<dyn Lister>,
}

impl Registration {
    pub fn new(
        kind: &'static str,
        scope: ScanScope,
        api: &'static str,
        lister: Arc<dyn Lister>,
    ) -> Self {
        Self {
            kind,
            owner: OwnerScope::Project,
            scope,
            api,
            dependencies: Vec::new(),
            settings: Vec::new(),
            capabilities: Capabilities::NONE,
            lister,
        }
    }

    pub fn owned_by(mut self, owner: OwnerScope) -> Self {
        self.owner = owner;
        self
    }

    /// Declare the types whose instances must be gone before this one runs
    pub fn depends_on(mut self, kinds: &[&'static str]) -> Self {
        self.dependencies.extend_from_slice(kinds);
        self
    }

    /// Declare the setting names instances of this type understand.
    ///
    /// Settings are only injected into types that declare them.
    pub fn settings(mut self, names: &[&'static str]) -> Self {
        self.settings.extend_from_slice(names);
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("kind", &self.kind)
            .field("owner", &self.owner)
            .field("scope", &self.scope)
            .field("api", &self.api)
            .field("dependencies", &self.dependencies)
            .field("settings", &self.settings)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Collects registrations, validated into a [`Registry`] by [`build`](Self::build)
#[derive(Default)]
pub struct RegistryBuilder {
    registrations: Vec<Registration>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, registration: Registration) -> Self {
        self.registrations.push(registration);
        self
    }

    pub fn build(self) -> Result<Registry, ConfigError> {
        let registrations = self.registrations;

        let mut index: HashMap<&str, usize> = HashMap::with_capacity(registrations.len());
        for (i, reg) in registrations.iter().enumerate() {
            if index.insert(reg.kind, i).is_some() {
                return Err(ConfigError::DuplicateResourceType(reg.kind.to_string()));
            }
        }

        for reg in &registrations {
            for dep in &reg.dependencies {
                if !index.contains_key(dep) {
                    return Err(ConfigError::UnknownDependency {
                        kind: reg.kind.to_string(),
                        dependency: dep.to_string(),
                    });
                }
            }
        }

        let waves = layer(&registrations, &index)?;

        Ok(Registry {
            registrations,
            waves,
        })
    }
}

/// Kahn's algorithm, grouped by depth so independent types share a wave
fn layer(
    registrations: &[Registration],
    index: &HashMap<&str, usize>,
) -> Result<Vec<Vec<usize>>, ConfigError> {
    let n = registrations.len();
    let mut indegree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (i, reg) in registrations.iter().enumerate() {
        for dep in &reg.dependencies {
            indegree[i] += 1;
            dependents[index[dep]].push(i);
        }
    }

    let mut current: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut waves = Vec::new();
    let mut placed = 0;

    while !current.is_empty() {
        current.sort_unstable();
        placed += current.len();

        let mut next = Vec::new();
        for &i in &current {
            for &j in &dependents[i] {
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    next.push(j);
                }
            }
        }
        waves.push(std::mem::replace(&mut current, next));
    }

    if placed != n {
        let mut stuck: Vec<&str> = (0..n)
            .filter(|&i| indegree[i] > 0)
            .map(|i| registrations[i].kind)
            .collect();
        stuck.sort_unstable();
        return Err(ConfigError::DependencyCycle(stuck.join(", ")));
    }

    Ok(waves)
}

/// Validated, immutable set of resource types in execution order
pub struct Registry {
    registrations: Vec<Registration>,
    waves: Vec<Vec<usize>>,
}

impl Registry {
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn get(&self, kind: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.kind == kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.get(kind).is_some()
    }

    /// Every registered kind, in registration order
    pub fn kinds(&self) -> Vec<&'static str> {
        self.registrations.iter().map(|r| r.kind).collect()
    }

    /// Execution waves: types in wave N depend only on types in waves < N
    pub fn waves(&self) -> Vec<Vec<&Registration>> {
        self.waves
            .iter()
            .map(|wave| wave.iter().map(|&i| &self.registrations[i]).collect())
            .collect()
    }

    /// Flattened wave order; every type appears after all its dependencies
    pub fn order(&self) -> Vec<&Registration> {
        self.waves.iter().flatten().map(|&i| &self.registrations[i]).collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.kinds())
            .field("waves", &self.waves.len())
            .finish()
    }
}
