use std::fmt;
use std::sync::Arc;

/// A persistent event callback.
///
/// Unlike a native completion callback, a listener is kept by the adapter and
/// invoked on every matching native event until it is replaced or the map is
/// destroyed.
pub struct Listener<T>(Arc<dyn Fn(T) + Send + Sync + 'static>);

impl<T> Listener<T> {
    pub fn new(f: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, value: T) {
        (self.0)(value)
    }
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Listener(..)")
    }
}

impl<T, F> From<F> for Listener<T>
where
    F: Fn(T) + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Listener::new(f)
    }
}
