use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use crate::chain::{HandledMethods, Handlers, MethodTag, RouteChain};
use crate::error::RegistrationError;
use crate::matcher::{combine_urls, trim_slashes, PathMatcher, PatternMatcher};
use crate::server::{Request, Response};

/// One or more route paths.
///
/// Every registration that takes paths accepts a single `&str`/`String` or a
/// list of them; the operation is applied to each path in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paths(Vec<String>);

impl Paths {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for Paths {
    fn from(path: &str) -> Self {
        Paths(vec![path.to_string()])
    }
}

impl From<String> for Paths {
    fn from(path: String) -> Self {
        Paths(vec![path])
    }
}

impl From<Vec<String>> for Paths {
    fn from(paths: Vec<String>) -> Self {
        Paths(paths)
    }
}

impl From<Vec<&str>> for Paths {
    fn from(paths: Vec<&str>) -> Self {
        Paths(paths.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Paths {
    fn from(paths: [&str; N]) -> Self {
        Paths(paths.into_iter().map(str::to_string).collect())
    }
}

/// Chain registered under a literal path.
pub struct RouteEntry<Req, Res> {
    pub(crate) chain: RouteChain<Req, Res>,
    pub(crate) handled_methods: HandledMethods,
}

impl<Req, Res> RouteEntry<Req, Res> {
    #[must_use]
    pub fn chain(&self) -> &RouteChain<Req, Res> {
        &self.chain
    }

    #[must_use]
    pub fn handled_methods(&self) -> HandledMethods {
        self.handled_methods
    }

    fn append(&mut self, chain: &RouteChain<Req, Res>) {
        self.chain.append([chain]);
        self.handled_methods = self.chain.handled_methods();
    }
}

/// Chain registered under a parameterized path, kept in registration order.
pub struct PatternRouteEntry<Req, Res> {
    pub(crate) matcher: PatternMatcher,
    pub(crate) chain: RouteChain<Req, Res>,
    pub(crate) handled_methods: HandledMethods,
}

impl<Req, Res> PatternRouteEntry<Req, Res> {
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.matcher.pattern()
    }

    #[must_use]
    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    #[must_use]
    pub fn chain(&self) -> &RouteChain<Req, Res> {
        &self.chain
    }

    #[must_use]
    pub fn handled_methods(&self) -> HandledMethods {
        self.handled_methods
    }

    fn append(&mut self, chain: &RouteChain<Req, Res>) {
        self.chain.append([chain]);
        self.handled_methods = self.chain.handled_methods();
    }
}

/// Anything that can be mounted into a [`Router`].
///
/// Mounting only reads routes and error handlers. `handle` lets a source also
/// serve requests on its own.
pub trait RouteSource<Req, Res> {
    /// Literal routes as `(path, chain)` in registration order
    fn routes(&self) -> Box<dyn Iterator<Item = (&str, &RouteChain<Req, Res>)> + '_>;

    /// Pattern routes as `(pattern, chain)` in priority order
    fn pattern_routes(&self) -> Box<dyn Iterator<Item = (&str, &RouteChain<Req, Res>)> + '_>;

    fn error_handlers(&self) -> &RouteChain<Req, Res>;

    /// Dispatch one request through this source.
    fn handle<'a>(&'a self, req: &'a mut Req, res: &'a mut Res) -> BoxFuture<'a, ()>
    where
        Req: Request,
        Res: Response;
}

/// Argument to [`Router::use_`].
pub enum Use<'r, Req, Res> {
    /// Mount routers under each base path
    Mount(Paths, Vec<&'r dyn RouteSource<Req, Res>>),
    /// Mount routers at the root
    Routers(Vec<&'r dyn RouteSource<Req, Res>>),
    /// Register global middleware
    Middleware(Handlers<Req, Res>),
}

/// Request router.
///
/// Built with `&mut self` registration calls, then shared (typically behind an
/// `Arc`) and driven with [`Router::handle`].
pub struct Router<Req, Res> {
    pub(crate) routes: HashMap<String, RouteEntry<Req, Res>>,
    /// Literal paths in registration order
    route_order: Vec<String>,
    pub(crate) pattern_routes: Vec<PatternRouteEntry<Req, Res>>,
    pub(crate) middleware: RouteChain<Req, Res>,
    pub(crate) error_handlers: RouteChain<Req, Res>,
}

impl<Req, Res> Router<Req, Res> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            route_order: Vec::new(),
            pattern_routes: Vec::new(),
            middleware: RouteChain::new(),
            error_handlers: RouteChain::new(),
        }
    }

    /// Look up a literal route by path. Slashes are trimmed first.
    #[must_use]
    pub fn route(&self, path: &str) -> Option<&RouteEntry<Req, Res>> {
        self.routes.get(trim_slashes(path))
    }

    /// Look up a pattern route by its source pattern. Slashes are trimmed first.
    #[must_use]
    pub fn pattern_route(&self, pattern: &str) -> Option<&PatternRouteEntry<Req, Res>> {
        let pattern = trim_slashes(pattern);
        self.pattern_routes.iter().find(|e| e.pattern() == pattern)
    }

    /// Pattern routes in match priority order
    pub fn pattern_entries(&self) -> impl Iterator<Item = &PatternRouteEntry<Req, Res>> {
        self.pattern_routes.iter()
    }

    #[must_use]
    pub fn middleware(&self) -> &RouteChain<Req, Res> {
        &self.middleware
    }

    /// Append `chain` to the route at every path.
    ///
    /// A new route starts with a copy of the current middleware. Pattern routes
    /// keep registration order; re-registering a pattern appends to its chain
    /// without changing its priority.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::InvalidPattern`] if any path fails to compile. The
    /// router is left untouched in that case.
    pub fn add_route(
        &mut self,
        paths: impl Into<Paths>,
        chain: RouteChain<Req, Res>,
    ) -> Result<&mut Self, RegistrationError> {
        let paths: Paths = paths.into();
        let matchers = paths
            .iter()
            .map(|path| PathMatcher::compile(trim_slashes(path)))
            .collect::<Result<Vec<_>, _>>()?;

        for matcher in matchers {
            match matcher {
                PathMatcher::Exact(path) => self.add_exact(path, &chain),
                PathMatcher::Pattern(matcher) => self.add_pattern(matcher, &chain),
            }
        }
        Ok(self)
    }

    fn add_exact(&mut self, path: String, chain: &RouteChain<Req, Res>) {
        let middleware = &self.middleware;
        let route_order = &mut self.route_order;
        let entry = self.routes.entry(path.clone()).or_insert_with(|| {
            debug!(path = %path, "Creating route");
            route_order.push(path.clone());
            RouteEntry {
                chain: middleware.clone(),
                handled_methods: middleware.handled_methods(),
            }
        });
        entry.append(chain);
        info!(
            path = %path,
            handlers = chain.len(),
            handled_methods = ?entry.handled_methods,
            "Route registered"
        );
    }

    fn add_pattern(&mut self, matcher: PatternMatcher, chain: &RouteChain<Req, Res>) {
        if let Some(entry) = self
            .pattern_routes
            .iter_mut()
            .find(|e| e.pattern() == matcher.pattern())
        {
            entry.append(chain);
            info!(
                pattern = %entry.pattern(),
                handlers = chain.len(),
                handled_methods = ?entry.handled_methods,
                "Pattern route extended"
            );
            return;
        }

        let mut seeded = self.middleware.clone();
        seeded.append([chain]);
        let handled_methods = seeded.handled_methods();
        info!(
            pattern = %matcher.pattern(),
            priority = self.pattern_routes.len(),
            handlers = seeded.len(),
            handled_methods = ?handled_methods,
            "Pattern route registered"
        );
        self.pattern_routes.push(PatternRouteEntry {
            matcher,
            chain: seeded,
            handled_methods,
        });
    }

    /// Append `chain` to the global middleware and to every existing route.
    pub fn add_middleware(&mut self, chain: RouteChain<Req, Res>) -> &mut Self {
        self.middleware.append([&chain]);
        for entry in self.routes.values_mut() {
            entry.append(&chain);
        }
        for entry in &mut self.pattern_routes {
            entry.append(&chain);
        }
        info!(
            handlers = chain.len(),
            routes = self.routes.len(),
            pattern_routes = self.pattern_routes.len(),
            "Middleware registered"
        );
        self
    }

    /// Append `chain` to the global error-handler chain.
    pub fn add_error_handlers(&mut self, chain: RouteChain<Req, Res>) -> &mut Self {
        self.error_handlers.append([&chain]);
        info!(
            handlers = chain.len(),
            total = self.error_handlers.len(),
            "Error handlers registered"
        );
        self
    }

    /// Mount a router under each base path.
    ///
    /// Every route of `router` is re-registered under `base/path` (so this
    /// router's middleware runs first), and its error handlers are appended to
    /// this router's error chain.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::InvalidPattern`] if a combined path fails to compile.
    pub fn mount(
        &mut self,
        base_paths: impl Into<Paths>,
        router: &dyn RouteSource<Req, Res>,
    ) -> Result<&mut Self, RegistrationError> {
        self.mount_all(base_paths, [router])
    }

    /// [`Router::mount`] for several routers, mounted in order under each base path.
    pub fn mount_all<'r, I>(
        &mut self,
        base_paths: impl Into<Paths>,
        routers: I,
    ) -> Result<&mut Self, RegistrationError>
    where
        I: IntoIterator<Item = &'r dyn RouteSource<Req, Res>>,
        Req: 'r,
        Res: 'r,
    {
        let base_paths: Paths = base_paths.into();
        let routers: Vec<_> = routers.into_iter().collect();

        for base in base_paths.iter() {
            for router in &routers {
                for (path, chain) in router.routes().chain(router.pattern_routes()) {
                    self.add_route(combine_urls(base, path), chain.clone())?;
                }
                self.add_error_handlers(router.error_handlers().clone());
                debug!(base = %base, "Router mounted");
            }
        }
        Ok(self)
    }

    fn method_route(
        &mut self,
        method: MethodTag,
        paths: impl Into<Paths>,
        handlers: impl Into<Handlers<Req, Res>>,
    ) -> Result<&mut Self, RegistrationError> {
        let chain = RouteChain::create(method, handlers)?;
        self.add_route(paths, chain)
    }

    /// Register handlers for every method
    pub fn all(
        &mut self,
        paths: impl Into<Paths>,
        handlers: impl Into<Handlers<Req, Res>>,
    ) -> Result<&mut Self, RegistrationError> {
        self.method_route(MethodTag::All, paths, handlers)
    }

    pub fn get(
        &mut self,
        paths: impl Into<Paths>,
        handlers: impl Into<Handlers<Req, Res>>,
    ) -> Result<&mut Self, RegistrationError> {
        self.method_route(MethodTag::Get, paths, handlers)
    }

    pub fn put(
        &mut self,
        paths: impl Into<Paths>,
        handlers: impl Into<Handlers<Req, Res>>,
    ) -> Result<&mut Self, RegistrationError> {
        self.method_route(MethodTag::Put, paths, handlers)
    }

    pub fn post(
        &mut self,
        paths: impl Into<Paths>,
        handlers: impl Into<Handlers<Req, Res>>,
    ) -> Result<&mut Self, RegistrationError> {
        self.method_route(MethodTag::Post, paths, handlers)
    }

    pub fn patch(
        &mut self,
        paths: impl Into<Paths>,
        handlers: impl Into<Handlers<Req, Res>>,
    ) -> Result<&mut Self, RegistrationError> {
        self.method_route(MethodTag::Patch, paths, handlers)
    }

    pub fn delete(
        &mut self,
        paths: impl Into<Paths>,
        handlers: impl Into<Handlers<Req, Res>>,
    ) -> Result<&mut Self, RegistrationError> {
        self.method_route(MethodTag::Delete, paths, handlers)
    }

    /// Register error handlers. Entries that are [`Handler::Route`](crate::chain::Handler::Route)
    /// also run during error propagation, without the error.
    pub fn error(
        &mut self,
        handlers: impl Into<Handlers<Req, Res>>,
    ) -> Result<&mut Self, RegistrationError> {
        let chain = RouteChain::create(MethodTag::All, handlers)?;
        Ok(self.add_error_handlers(chain))
    }

    /// Register middleware or mount routers.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::MissingRouters`] when a mount is given no routers,
    /// plus anything the underlying operation returns.
    pub fn use_(&mut self, what: Use<'_, Req, Res>) -> Result<&mut Self, RegistrationError> {
        match what {
            Use::Mount(base_paths, routers) => {
                if routers.is_empty() {
                    return Err(RegistrationError::MissingRouters {
                        base_paths: base_paths.into_vec(),
                    });
                }
                self.mount_all(base_paths, routers)
            }
            Use::Routers(routers) => self.use_(Use::Mount(Paths::from(""), routers)),
            Use::Middleware(handlers) => {
                let chain = RouteChain::create(MethodTag::All, handlers)?;
                Ok(self.add_middleware(chain))
            }
        }
    }
}

impl<Req, Res> Default for Router<Req, Res> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res> fmt::Debug for Router<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes: Vec<_> = self.routes.keys().collect();
        routes.sort();
        let patterns: Vec<_> = self.pattern_routes.iter().map(|e| e.pattern()).collect();
        f.debug_struct("Router")
            .field("routes", &routes)
            .field("pattern_routes", &patterns)
            .field("middleware", &self.middleware.len())
            .field("error_handlers", &self.error_handlers.len())
            .finish()
    }
}

impl<Req, Res> RouteSource<Req, Res> for Router<Req, Res> {
    fn routes(&self) -> Box<dyn Iterator<Item = (&str, &RouteChain<Req, Res>)> + '_> {
        Box::new(self.route_order.iter().filter_map(|path| {
            self.routes
                .get(path)
                .map(|entry| (path.as_str(), &entry.chain))
        }))
    }

    fn pattern_routes(&self) -> Box<dyn Iterator<Item = (&str, &RouteChain<Req, Res>)> + '_> {
        Box::new(
            self.pattern_routes
                .iter()
                .map(|entry| (entry.pattern(), &entry.chain)),
        )
    }

    fn error_handlers(&self) -> &RouteChain<Req, Res> {
        &self.error_handlers
    }

    fn handle<'a>(&'a self, req: &'a mut Req, res: &'a mut Res) -> BoxFuture<'a, ()>
    where
        Req: Request,
        Res: Response,
    {
        Box::pin(Router::handle(self, req, res))
    }
}
