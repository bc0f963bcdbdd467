//! The filter chain.
//!
//! Every forward runs the controller action through a fresh
//! [`FilterChain`]. Filters are nested like an onion: each one receives a
//! [`Next`] continuation over the filters after it and decides whether and
//! when to run it. Code before `next.run(..)` wraps the rest of the chain on
//! the way in, code after it on the way out.
//!
//! A chain built by [`FilterChain::load_configuration`] looks like
//! `[Rendering, <application filters>..., Execution]`: the execution filter
//! always runs last and calls the controller, and the rendering filter
//! renders the action template once everything inside it has returned.

pub mod execution;
pub mod rendering;

use std::fmt;
use std::sync::Arc;

use portico_core::PorticoResult;

use crate::application::Application;
use crate::dispatcher::Dispatcher;

pub use execution::ExecutionFilter;
pub use rendering::RenderingFilter;

/// A link of the filter chain.
///
/// # Examples
///
/// ```
/// use portico_core::PorticoResult;
/// use portico_views::dispatcher::Dispatcher;
/// use portico_views::filter::{Filter, Next};
///
/// #[derive(Debug)]
/// struct SiteFilter;
///
/// impl Filter for SiteFilter {
///     fn name(&self) -> &str {
///         "site"
///     }
///
///     fn execute(&self, dispatcher: &mut Dispatcher<'_>, next: Next<'_>) -> PorticoResult<()> {
///         let site = dispatcher.request().host().to_string();
///         dispatcher.view_mut().add_variable("site", site.into());
///         next.run(dispatcher)
///     }
/// }
/// ```
pub trait Filter: fmt::Debug + Send + Sync {
    /// Name used by [`FilterChain::has_filter`] and in logs.
    fn name(&self) -> &str;

    /// Runs this filter. Call `next.run(dispatcher)` to continue the chain.
    fn execute(&self, dispatcher: &mut Dispatcher<'_>, next: Next<'_>) -> PorticoResult<()>;
}

/// The rest of a filter chain.
///
/// Running it invokes the next filter. Running an exhausted chain, or
/// running it once the dispatcher is halted, does nothing.
#[derive(Debug, Clone, Copy)]
pub struct Next<'c> {
    filters: &'c [Arc<dyn Filter>],
}

impl<'c> Next<'c> {
    /// Creates a continuation over `filters`.
    pub const fn new(filters: &'c [Arc<dyn Filter>]) -> Self {
        Self { filters }
    }

    /// Returns the number of filters left to run.
    pub const fn remaining(&self) -> usize {
        self.filters.len()
    }

    /// Runs the next filter.
    pub fn run(self, dispatcher: &mut Dispatcher<'_>) -> PorticoResult<()> {
        if dispatcher.is_halted() {
            return Ok(());
        }
        match self.filters.split_first() {
            Some((filter, rest)) => {
                tracing::trace!(filter = filter.name(), "running filter");
                filter.execute(dispatcher, Next::new(rest))
            }
            None => Ok(()),
        }
    }
}

/// An ordered list of filters.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the chain for `app`: the rendering filter when rendering is
    /// enabled, then the application's filters, then the execution filter.
    pub fn load_configuration(app: &Application) -> Self {
        let mut chain = Self::new();
        if app.settings().views.rendering {
            chain.register(Arc::new(RenderingFilter));
        }
        for filter in app.filters() {
            chain.register(Arc::clone(filter));
        }
        chain.register(Arc::new(ExecutionFilter));
        chain
    }

    /// Appends a filter.
    pub fn register(&mut self, filter: Arc<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Returns `true` if a filter named `name` is registered.
    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.iter().any(|filter| filter.name() == name)
    }

    /// Returns the filter names in chain order.
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|filter| filter.name()).collect()
    }

    /// Returns the number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if the chain has no filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Runs the chain from its first filter.
    pub fn execute(&self, dispatcher: &mut Dispatcher<'_>) -> PorticoResult<()> {
        Next::new(&self.filters).run(dispatcher)
    }
}
