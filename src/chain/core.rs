use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{HandlerError, RegistrationError};
use crate::server::{Request, Response};

/// Method a chain entry responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodTag {
    All,
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl MethodTag {
    pub const TAGS: [MethodTag; 6] = [
        MethodTag::All,
        MethodTag::Get,
        MethodTag::Put,
        MethodTag::Post,
        MethodTag::Patch,
        MethodTag::Delete,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MethodTag::All => "all",
            MethodTag::Get => "get",
            MethodTag::Put => "put",
            MethodTag::Post => "post",
            MethodTag::Patch => "patch",
            MethodTag::Delete => "delete",
        }
    }

    /// Whether an entry with this tag runs for a request method.
    #[inline]
    #[must_use]
    pub fn matches(self, method: &str) -> bool {
        self == MethodTag::All || self.as_str().eq_ignore_ascii_case(method)
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for MethodTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MethodTag::TAGS
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unsupported method tag '{s}'"))
    }
}

impl TryFrom<&http::Method> for MethodTag {
    type Error = String;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

/// Set of method tags serviced by a chain.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct HandledMethods(u8);

impl HandledMethods {
    pub fn insert(&mut self, tag: MethodTag) {
        self.0 |= tag.bit();
    }

    #[must_use]
    pub fn contains(self, tag: MethodTag) -> bool {
        self.0 & tag.bit() != 0
    }

    /// `true` when the set contains `all` or the tag for `method`.
    #[must_use]
    pub fn supports(self, method: &str) -> bool {
        self.contains(MethodTag::All)
            || method
                .parse::<MethodTag>()
                .is_ok_and(|tag| self.contains(tag))
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = MethodTag> {
        MethodTag::TAGS.into_iter().filter(move |t| self.contains(*t))
    }
}

impl fmt::Debug for HandledMethods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Continuation handed to every handler invocation.
///
/// Consumed by [`Next::proceed`]; dropping it without proceeding halts the chain.
pub struct Next {
    _private: (),
}

impl Next {
    fn new() -> Self {
        Self { _private: () }
    }

    /// Continue with the next matching entry in the chain
    #[must_use]
    pub fn proceed<'a>(self) -> Outcome<'a> {
        Outcome(Step::Proceed)
    }
}

/// What a handler wants the traversal to do next.
#[must_use]
pub struct Outcome<'a>(Step<'a>);

enum Step<'a> {
    Proceed,
    Halt,
    Defer(BoxFuture<'a, Result<(), HandlerError>>),
}

impl<'a> Outcome<'a> {
    /// Stop the chain without an error
    pub fn halt() -> Self {
        Outcome(Step::Halt)
    }

    /// Suspend the chain until `fut` settles: `Ok(())` continues with the
    /// next entry, `Err` routes the error to the failure sink.
    pub fn defer<F>(fut: F) -> Self
    where
        F: Future<Output = Result<(), HandlerError>> + Send + 'a,
    {
        Outcome(Step::Defer(Box::pin(fut)))
    }
}

impl fmt::Debug for Outcome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Step::Proceed => f.write_str("Outcome::Proceed"),
            Step::Halt => f.write_str("Outcome::Halt"),
            Step::Defer(_) => f.write_str("Outcome::Defer"),
        }
    }
}

pub type HandlerResult<'a> = Result<Outcome<'a>, HandlerError>;

pub type RouteFn<Req, Res> =
    dyn for<'a> Fn(&'a mut Req, &'a mut Res, Next) -> HandlerResult<'a> + Send + Sync;

pub type ErrorFn<Req, Res> = dyn for<'a> Fn(&'a HandlerError, &'a mut Req, &'a mut Res, Next) -> HandlerResult<'a>
    + Send
    + Sync;

/// A request or error handler.
pub enum Handler<Req, Res> {
    Route(Arc<RouteFn<Req, Res>>),
    Error(Arc<ErrorFn<Req, Res>>),
}

impl<Req, Res> Clone for Handler<Req, Res> {
    fn clone(&self) -> Self {
        match self {
            Handler::Route(f) => Handler::Route(Arc::clone(f)),
            Handler::Error(f) => Handler::Error(Arc::clone(f)),
        }
    }
}

impl<Req, Res> fmt::Debug for Handler<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Route(_) => f.write_str("Handler::Route"),
            Handler::Error(_) => f.write_str("Handler::Error"),
        }
    }
}

/// Wrap a closure as a [`Handler::Route`].
pub fn handler<Req, Res, F>(f: F) -> Handler<Req, Res>
where
    F: for<'a> Fn(&'a mut Req, &'a mut Res, Next) -> HandlerResult<'a> + Send + Sync + 'static,
{
    Handler::Route(Arc::new(f))
}

/// Wrap a closure as a [`Handler::Error`].
pub fn error_handler<Req, Res, F>(f: F) -> Handler<Req, Res>
where
    F: for<'a> Fn(&'a HandlerError, &'a mut Req, &'a mut Res, Next) -> HandlerResult<'a>
        + Send
        + Sync
        + 'static,
{
    Handler::Error(Arc::new(f))
}

/// One handler or an arbitrarily nested list of handlers.
pub enum Handlers<Req, Res> {
    One(Handler<Req, Res>),
    Many(Vec<Handlers<Req, Res>>),
}

impl<Req, Res> From<Handler<Req, Res>> for Handlers<Req, Res> {
    fn from(handler: Handler<Req, Res>) -> Self {
        Handlers::One(handler)
    }
}

impl<Req, Res> From<Vec<Handler<Req, Res>>> for Handlers<Req, Res> {
    fn from(handlers: Vec<Handler<Req, Res>>) -> Self {
        Handlers::Many(handlers.into_iter().map(Handlers::One).collect())
    }
}

impl<Req, Res> From<Vec<Handlers<Req, Res>>> for Handlers<Req, Res> {
    fn from(handlers: Vec<Handlers<Req, Res>>) -> Self {
        Handlers::Many(handlers)
    }
}

/// A handler tagged with the method it serves.
pub struct ChainEntry<Req, Res> {
    method: MethodTag,
    handler: Handler<Req, Res>,
}

impl<Req, Res> ChainEntry<Req, Res> {
    #[must_use]
    pub fn new(method: MethodTag, handler: Handler<Req, Res>) -> Self {
        Self { method, handler }
    }

    #[must_use]
    pub fn method(&self) -> MethodTag {
        self.method
    }

    #[must_use]
    pub fn handler(&self) -> &Handler<Req, Res> {
        &self.handler
    }
}

impl<Req, Res> Clone for ChainEntry<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            handler: self.handler.clone(),
        }
    }
}

impl<Req, Res> fmt::Debug for ChainEntry<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainEntry")
            .field("method", &self.method)
            .field("handler", &self.handler)
            .finish()
    }
}

/// How a traversal that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Every matching entry proceeded
    Exhausted,
    /// A handler stopped the chain
    Halted,
}

/// Ordered, method-tagged handler list.
pub struct RouteChain<Req, Res> {
    entries: Vec<ChainEntry<Req, Res>>,
}

impl<Req, Res> RouteChain<Req, Res> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a chain from one handler or a nested list of handlers, tagging
    /// every leaf with `method`.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::EmptyHandlers`] when the list, or any list nested
    /// inside it, is empty.
    pub fn create(
        method: MethodTag,
        handlers: impl Into<Handlers<Req, Res>>,
    ) -> Result<Self, RegistrationError> {
        let mut chain = Self::new();
        chain.flatten_into(method, handlers.into())?;
        Ok(chain)
    }

    fn flatten_into(
        &mut self,
        method: MethodTag,
        handlers: Handlers<Req, Res>,
    ) -> Result<(), RegistrationError> {
        match handlers {
            Handlers::One(handler) => self.entries.push(ChainEntry::new(method, handler)),
            Handlers::Many(list) if list.is_empty() => {
                return Err(RegistrationError::EmptyHandlers {
                    method: method.to_string(),
                })
            }
            Handlers::Many(list) => {
                for nested in list {
                    self.flatten_into(method, nested)?;
                }
            }
        }
        Ok(())
    }

    /// Method tags serviced by this chain
    #[must_use]
    pub fn handled_methods(&self) -> HandledMethods {
        self.entries
            .iter()
            .fold(HandledMethods::default(), |mut set, entry| {
                set.insert(entry.method);
                set
            })
    }

    /// Copy the entries of each chain onto the end of this one, skipping empty
    /// chains. Returns `self` for chaining.
    pub fn append<'c, I>(&mut self, chains: I) -> &mut Self
    where
        I: IntoIterator<Item = &'c RouteChain<Req, Res>>,
        Req: 'c,
        Res: 'c,
    {
        for chain in chains {
            if !chain.is_empty() {
                self.entries.extend(chain.entries.iter().cloned());
            }
        }
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChainEntry<Req, Res>> {
        self.entries.iter()
    }
}

impl<Req, Res> Default for RouteChain<Req, Res> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res> Clone for RouteChain<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<Req, Res> fmt::Debug for RouteChain<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

impl<Req: Request, Res: Response> RouteChain<Req, Res> {
    /// Run the chain against a request.
    ///
    /// With `error` set, [`Handler::Error`] entries receive it; without it they
    /// are skipped. `Err` is returned at most once, for the first failure, and
    /// nothing runs after it.
    ///
    /// A deferred outcome that never settles leaves this future pending forever;
    /// there is no timeout.
    pub async fn traverse(
        &self,
        req: &mut Req,
        res: &mut Res,
        error: Option<&HandlerError>,
    ) -> Result<Traversal, HandlerError> {
        for (cursor, entry) in self.entries.iter().enumerate() {
            if !entry.method.matches(req.method()) {
                trace!(cursor, method = %entry.method, "Skipping entry for other method");
                continue;
            }

            let Some(result) = invoke(cursor, &entry.handler, &mut *req, &mut *res, error) else {
                continue;
            };

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(err) => {
                    debug!(cursor, error = %err, "Handler failed");
                    return Err(err);
                }
            };

            match outcome.0 {
                Step::Proceed => {}
                Step::Halt => {
                    trace!(cursor, "Handler halted chain");
                    return Ok(Traversal::Halted);
                }
                Step::Defer(fut) => match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        debug!(cursor, error = %err, "Deferred handler rejected");
                        return Err(err);
                    }
                    Err(payload) => return Err(panicked(cursor, payload)),
                },
            }
        }

        Ok(Traversal::Exhausted)
    }
}

/// Call a handler with the shape it expects. `None` means the handler does not
/// apply (an error handler outside error propagation).
fn invoke<'a, Req, Res>(
    cursor: usize,
    handler: &Handler<Req, Res>,
    req: &'a mut Req,
    res: &'a mut Res,
    error: Option<&'a HandlerError>,
) -> Option<HandlerResult<'a>> {
    let args = (req, res);
    let call = move || {
        let (req, res) = args;
        match (handler, error) {
            (Handler::Route(f), _) => Some(f(req, res, Next::new())),
            (Handler::Error(f), Some(err)) => Some(f(err, req, res, Next::new())),
            (Handler::Error(_), None) => None,
        }
    };

    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Some(Err(panicked(cursor, payload))),
    }
}

fn panicked(cursor: usize, payload: Box<dyn std::any::Any + Send>) -> HandlerError {
    let err = HandlerError::from_panic(payload);
    tracing::error!(cursor, error = %err, "Handler panicked - CRITICAL");
    err
}
