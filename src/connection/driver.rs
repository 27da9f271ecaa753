//! Driver and handle traits
//!
//! A [`Driver`] turns a descriptor into a live [`Handle`]. The crate only
//! needs a handle to answer pings and close; query execution lives in
//! whatever concrete driver the caller registers.

use crate::health::AttemptContext;
use crate::Result;
use futures::future::BoxFuture;

/// Opens database handles from descriptors
pub trait Driver: Send + Sync {
    /// Open a handle for `descriptor`
    fn open<'a>(&'a self, descriptor: &'a str) -> BoxFuture<'a, Result<Box<dyn Handle>>>;
}

/// Live database handle
pub trait Handle: Send + Sync {
    /// Address of the server this handle is bound to
    fn peer(&self) -> &str;

    /// Liveness check bounded by `ctx`
    fn ping<'a>(&'a self, ctx: &'a AttemptContext) -> BoxFuture<'a, Result<()>>;

    /// Release the handle; later pings fail
    fn close(&self) -> BoxFuture<'_, Result<()>>;
}
