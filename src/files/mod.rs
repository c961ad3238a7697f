//! Static file lookup.
//!
//! Request targets are resolved here into paths under the document root. The
//! resolver only ever consults the target itself; nothing else in the request
//! influences which file is served.

pub mod resolver;

pub use resolver::{ResolveError, ResolvedPath, normalize_target, resolve};
