use serde::Serialize;
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum number of path parameters stored inline before spilling to the heap.
/// Routes rarely carry more than a handful (`users/:id/posts/:post_id`).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage.
///
/// Names are `Arc<str>` because they come from the compiled pattern and are
/// shared by every request that matches it; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Path parameters extracted from a pattern route match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: ParamVec,
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a parameter by name.
    ///
    /// Uses "last write wins" semantics when the same name was pushed twice.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn push(&mut self, name: Arc<str>, value: String) {
        self.inner.push((name, value));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }
}

impl FromIterator<(Arc<str>, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (Arc<str>, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Params {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// The request side of the router contract.
///
/// `method` is compared against route method tags without regard to ASCII
/// case. `url` may carry a `?query` suffix; the router ignores it when
/// matching.
pub trait Request: Send {
    fn method(&self) -> &str;
    fn url(&self) -> &str;
    fn params(&self) -> &Params;
    /// Replace the path parameters. Called once per pattern-route match.
    fn set_params(&mut self, params: Params);
}
