/// Outcome of resolving a lazy resource URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Ready(String),
    /// The sentinel for "not resolvable yet" -- the loader skips the
    /// resource silently rather than treating it as an error.
    NotYet,
}

/// A resource URL that is either known at configuration time or produced on
/// demand when the dependency is loaded.
pub enum Resolvable {
    Literal(String),
    Lazy(Box<dyn Fn() -> Resolution>),
}

impl Resolvable {
    pub fn literal(url: impl Into<String>) -> Self {
        Resolvable::Literal(url.into())
    }

    pub fn lazy(resolver: impl Fn() -> Resolution + 'static) -> Self {
        Resolvable::Lazy(Box::new(resolver))
    }

    /// Resolve to a concrete URL, or `None` when the value is not ready.
    pub fn resolve(&self) -> Option<String> {
        match self {
            Resolvable::Literal(url) => Some(url.clone()),
            Resolvable::Lazy(resolver) => match resolver() {
                Resolution::Ready(url) => Some(url),
                Resolution::NotYet => None,
            },
        }
    }
}

impl std::fmt::Debug for Resolvable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolvable::Literal(url) => f.debug_tuple("Literal").field(url).finish(),
            Resolvable::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::{Resolution, Resolvable};

    #[test]
    fn literal_resolves_immediately() {
        let resolvable = Resolvable::literal("https://example.test/app.js");
        assert_eq!(
            resolvable.resolve().as_deref(),
            Some("https://example.test/app.js")
        );
    }

    #[test]
    fn lazy_resolver_is_consulted_each_time() {
        let ready = Rc::new(Cell::new(false));
        let flag = ready.clone();
        let resolvable = Resolvable::lazy(move || {
            if flag.get() {
                Resolution::Ready("https://example.test/late.js".to_string())
            } else {
                Resolution::NotYet
            }
        });

        assert_eq!(resolvable.resolve(), None);
        ready.set(true);
        assert_eq!(
            resolvable.resolve().as_deref(),
            Some("https://example.test/late.js")
        );
    }
}
