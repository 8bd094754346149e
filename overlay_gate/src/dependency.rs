use std::rc::Rc;

use crate::boundary::PageDom;
use crate::error::GateError;
use crate::resolve::Resolvable;
use crate::trace::EventTrace;

/// A named bundle of external script/style resources loaded as one unit.
pub struct Dependency {
    name: String,
    scripts: Vec<Resolvable>,
    styles: Vec<Resolvable>,
    /// Readiness probe other components may consult. Independent of
    /// `loaded`: a dependency can be appended to the page long before the
    /// script it points at has actually executed.
    is_loaded: Box<dyn Fn() -> bool>,
    /// Owned by the loader. Set exactly once, after the first load attempt.
    loaded: bool,
}

impl Dependency {
    pub fn new(name: impl Into<String>, is_loaded: impl Fn() -> bool + 'static) -> Self {
        Dependency {
            name: name.into(),
            scripts: Vec::new(),
            styles: Vec::new(),
            is_loaded: Box::new(is_loaded),
            loaded: false,
        }
    }

    pub fn with_script(mut self, script: Resolvable) -> Self {
        self.scripts.push(script);
        self
    }

    pub fn with_style(mut self, style: Resolvable) -> Self {
        self.styles.push(style);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_loaded(&self) -> bool {
        (self.is_loaded)()
    }
}

/// Loads registered dependencies into the page, at most once each.
///
/// The registry is instance-owned so independent loaders can coexist under
/// test; declaration order is load order.
pub struct ResourceLoader {
    dependencies: Vec<Dependency>,
    page: Rc<dyn PageDom>,
    trace: EventTrace,
}

impl ResourceLoader {
    pub fn new(page: Rc<dyn PageDom>, trace: EventTrace) -> Self {
        ResourceLoader {
            dependencies: Vec::new(),
            page,
            trace,
        }
    }

    pub fn register(&mut self, dependency: Dependency) -> Result<(), GateError> {
        if self.dependencies.iter().any(|d| d.name == dependency.name) {
            return Err(GateError::DuplicateDependency(dependency.name));
        }
        self.dependencies.push(dependency);
        Ok(())
    }

    /// Load one dependency. No-op when it was already attempted.
    ///
    /// Resources whose resolver is not ready yet are skipped silently, and
    /// the dependency is still marked loaded afterwards: attempted is what
    /// is tracked, not succeeded. A caller that wants late resolution must
    /// hold off calling this until the resolver can produce a URL.
    pub fn load_dependency(&mut self, name: &str) -> Result<(), GateError> {
        let dependency = self
            .dependencies
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| GateError::UnknownDependency(name.to_string()))?;

        if dependency.loaded {
            self.trace
                .log(format!("dependency '{}' already loaded, skipping", name));
            return Ok(());
        }

        for script in &dependency.scripts {
            if let Some(url) = script.resolve() {
                self.page.append_script(&url);
                self.trace
                    .log(format!("dependency '{}' appended script {url}", name));
            }
        }
        for style in &dependency.styles {
            if let Some(url) = style.resolve() {
                self.page.append_style(&url);
                self.trace
                    .log(format!("dependency '{}' appended style {url}", name));
            }
        }

        dependency.loaded = true;
        Ok(())
    }

    /// Load the named subset, or every registered dependency, in
    /// declaration order.
    pub fn load_all(&mut self, subset: Option<&[&str]>) -> Result<(), GateError> {
        match subset {
            Some(names) => {
                for name in names {
                    self.load_dependency(name)?;
                }
            }
            None => {
                let names: Vec<String> =
                    self.dependencies.iter().map(|d| d.name.clone()).collect();
                for name in names {
                    self.load_dependency(&name)?;
                }
            }
        }
        Ok(())
    }

    /// Query a dependency's readiness probe without touching load state.
    pub fn is_loaded(&self, name: &str) -> Result<bool, GateError> {
        self.dependencies
            .iter()
            .find(|d| d.name == name)
            .map(Dependency::is_loaded)
            .ok_or_else(|| GateError::UnknownDependency(name.to_string()))
    }

    pub fn was_attempted(&self, name: &str) -> Result<bool, GateError> {
        self.dependencies
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.loaded)
            .ok_or_else(|| GateError::UnknownDependency(name.to_string()))
    }
}
