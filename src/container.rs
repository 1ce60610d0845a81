//! Dependency-injection container
//!
//! Components are registered under a name together with a factory and the
//! names of the components it depends on. Singletons are built once and
//! cached, prototypes are built on every `get`. A dependency declared as
//! `name?` is optional and resolves to `None` when nothing is registered
//! under that name, letting the factory fall back to its own default.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Error, Result};
use crate::logger;

type Component = Arc<dyn Any + Send + Sync>;
type Factory = Box<dyn Fn(&Deps) -> Result<Component> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Singleton,
    Prototype,
}

#[derive(Debug, Clone)]
struct Dependency {
    name: String,
    optional: bool,
}

impl Dependency {
    fn parse(decl: &str) -> Self {
        decl.strip_suffix('?').map_or_else(
            || Self {
                name: decl.to_string(),
                optional: false,
            },
            |name| Self {
                name: name.to_string(),
                optional: true,
            },
        )
    }
}

struct Entry {
    lifecycle: Lifecycle,
    dependencies: Vec<Dependency>,
    factory: Factory,
    cached: Mutex<Option<Component>>,
}

/// Named component registry
#[derive(Default)]
pub struct Container {
    entries: HashMap<String, Entry>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("Container").field("components", &names).finish()
    }
}

/// Resolved dependencies handed to a factory
pub struct Deps {
    resolved: HashMap<String, Option<Component>>,
}

impl Deps {
    /// A required dependency
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        self.optional(name)?
            .ok_or_else(|| Error::ComponentNotFound(name.to_string()))
    }

    /// An optional dependency; `None` when it is not registered
    pub fn optional<T: Any + Send + Sync>(&self, name: &str) -> Result<Option<Arc<T>>> {
        match self.resolved.get(name) {
            Some(Some(component)) => downcast(name, Arc::clone(component)).map(Some),
            Some(None) => Ok(None),
            None => Err(Error::ComponentNotFound(name.to_string())),
        }
    }
}

fn downcast<T: Any + Send + Sync>(name: &str, component: Component) -> Result<Arc<T>> {
    component.downcast::<T>().map_err(|_| {
        Error::ComponentType(format!("{name} (requested {})", type_name::<T>()))
    })
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component built once and shared afterwards
    pub fn singleton<T, F>(
        &mut self,
        name: &str,
        dependencies: &[&str],
        init: F,
    ) -> Result<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(&Deps) -> Result<T> + Send + Sync + 'static,
    {
        self.register(name, Lifecycle::Singleton, dependencies, init)
    }

    /// Register a component built anew on every lookup
    pub fn prototype<T, F>(
        &mut self,
        name: &str,
        dependencies: &[&str],
        init: F,
    ) -> Result<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(&Deps) -> Result<T> + Send + Sync + 'static,
    {
        self.register(name, Lifecycle::Prototype, dependencies, init)
    }

    /// Register an already built value as a singleton
    pub fn instance<T: Any + Send + Sync>(&mut self, name: &str, value: T) -> Result<&mut Self> {
        self.ensure_free(name)?;
        let component: Component = Arc::new(value);
        let shared = Arc::clone(&component);
        self.entries.insert(
            name.to_string(),
            Entry {
                lifecycle: Lifecycle::Singleton,
                dependencies: Vec::new(),
                factory: Box::new(move |_| Ok(Arc::clone(&shared))),
                cached: Mutex::new(Some(component)),
            },
        );
        Ok(self)
    }

    pub fn registered(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Look up a component, building it and its dependencies as needed
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        let component = self.resolve(name, &mut Vec::new())?;
        downcast(name, component)
    }

    fn ensure_free(&self, name: &str) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(Error::NameInUse(name.to_string()));
        }
        Ok(())
    }

    fn register<T, F>(
        &mut self,
        name: &str,
        lifecycle: Lifecycle,
        dependencies: &[&str],
        init: F,
    ) -> Result<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(&Deps) -> Result<T> + Send + Sync + 'static,
    {
        self.ensure_free(name)?;
        self.entries.insert(
            name.to_string(),
            Entry {
                lifecycle,
                dependencies: dependencies.iter().map(|d| Dependency::parse(d)).collect(),
                factory: Box::new(move |deps| Ok(Arc::new(init(deps)?) as Component)),
                cached: Mutex::new(None),
            },
        );
        Ok(self)
    }

    fn resolve(&self, name: &str, stack: &mut Vec<String>) -> Result<Component> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| Error::ComponentNotFound(name.to_string()))?;

        if let Some(component) = entry
            .cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(component));
        }

        if stack.iter().any(|n| n == name) {
            let mut chain = stack.clone();
            chain.push(name.to_string());
            return Err(Error::DependencyCycle(chain.join(" -> ")));
        }
        stack.push(name.to_string());

        let mut resolved = HashMap::with_capacity(entry.dependencies.len());
        for dep in &entry.dependencies {
            let component = if self.entries.contains_key(&dep.name) {
                Some(self.resolve(&dep.name, stack)?)
            } else if dep.optional {
                None
            } else {
                return Err(Error::UnsatisfiedDependency {
                    name: name.to_string(),
                    dependency: dep.name.clone(),
                });
            };
            resolved.insert(dep.name.clone(), component);
        }
        stack.pop();

        logger::log_debug(&format!("Building component {name}"));
        let component = (entry.factory)(&Deps { resolved })?;

        if entry.lifecycle == Lifecycle::Singleton {
            let mut cached = entry.cached.lock().unwrap_or_else(PoisonError::into_inner);
            // A concurrent build may have won; keep the first instance
            return Ok(Arc::clone(cached.get_or_insert(component)));
        }
        Ok(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Settings {
        dsn: String,
    }

    #[derive(Debug)]
    struct Store {
        dsn: String,
        prefix: String,
    }

    fn with_settings() -> Container {
        let mut container = Container::new();
        container
            .instance(
                "settings",
                Settings {
                    dsn: "memory://".to_string(),
                },
            )
            .unwrap();
        container
    }

    #[test]
    fn test_singleton_is_shared() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let mut container = with_settings();
        container
            .singleton("store", &["settings"], move |deps| {
                counter.fetch_add(1, Ordering::SeqCst);
                let settings = deps.get::<Settings>("settings")?;
                Ok(Store {
                    dsn: settings.dsn.clone(),
                    prefix: String::new(),
                })
            })
            .unwrap();

        let a = container.get::<Store>("store").unwrap();
        let b = container.get::<Store>("store").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.dsn, "memory://");
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prototype_is_rebuilt() {
        let mut container = Container::new();
        container
            .prototype("counter", &[], |_| Ok(AtomicUsize::new(0)))
            .unwrap();
        let a = container.get::<AtomicUsize>("counter").unwrap();
        let b = container.get::<AtomicUsize>("counter").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_optional_dependency_uses_default() {
        let mut container = with_settings();
        container
            .singleton("store", &["settings", "prefix?"], |deps| {
                let prefix = deps
                    .optional::<String>("prefix")?
                    .map_or_else(|| "app_".to_string(), |p| p.to_string());
                Ok(Store {
                    dsn: deps.get::<Settings>("settings")?.dsn.clone(),
                    prefix,
                })
            })
            .unwrap();
        assert_eq!(container.get::<Store>("store").unwrap().prefix, "app_");

        let mut container = with_settings();
        container.instance("prefix", "t_".to_string()).unwrap();
        container
            .singleton("store", &["settings", "prefix?"], |deps| {
                Ok(Store {
                    dsn: deps.get::<Settings>("settings")?.dsn.clone(),
                    prefix: deps
                        .optional::<String>("prefix")?
                        .map(|p| p.to_string())
                        .unwrap_or_default(),
                })
            })
            .unwrap();
        assert_eq!(container.get::<Store>("store").unwrap().prefix, "t_");
    }

    #[test]
    fn test_unsatisfied_dependency() {
        let mut container = Container::new();
        container
            .singleton("store", &["settings"], |deps| {
                deps.get::<Settings>("settings").map(|s| s.dsn.clone())
            })
            .unwrap();
        let err = container.get::<String>("store").unwrap_err();
        assert!(matches!(
            err,
            Error::UnsatisfiedDependency { ref name, ref dependency }
                if name == "store" && dependency == "settings"
        ));
    }

    #[test]
    fn test_name_in_use_and_unknown() {
        let mut container = with_settings();
        let err = container.instance("settings", 1_u32).unwrap_err();
        assert_eq!(err.to_string(), "The name: settings is already in use");
        assert!(container.registered("settings"));
        assert!(!container.registered("cache"));
        assert!(matches!(
            container.get::<Settings>("cache"),
            Err(Error::ComponentNotFound(_))
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let container = with_settings();
        assert!(matches!(
            container.get::<Store>("settings"),
            Err(Error::ComponentType(_))
        ));
    }

    #[test]
    fn test_cycle_detected() {
        let mut container = Container::new();
        container
            .singleton("a", &["b"], |deps| deps.get::<u32>("b").map(|b| *b))
            .unwrap();
        container
            .singleton("b", &["a"], |deps| deps.get::<u32>("a").map(|a| *a))
            .unwrap();
        match container.get::<u32>("a") {
            Err(Error::DependencyCycle(chain)) => assert_eq!(chain, "a -> b -> a"),
            other => panic!("expected a cycle, got {other:?}"),
        }
    }
}
