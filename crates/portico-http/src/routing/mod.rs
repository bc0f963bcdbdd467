//! Token-based URL routing.
//!
//! Patterns such as `/who/:name` or `/search/*` are split into tokens
//! ([`token`]), compiled into immutable [`Route`] templates, and kept in
//! priority order by a [`RoutingTable`]. Matching a request yields a
//! [`MatchedRoute`]: the shared route plus the parameters bound for that one
//! request. The same routes generate URLs with [`Route::create_url`] and
//! [`RoutingTable::url_for`].

pub mod cache;
pub mod definition;
pub mod matched;
pub mod params;
pub mod route;
pub mod table;
pub mod token;
pub mod validators;

pub use cache::RouteCache;
pub use definition::{DefinitionKind, RouteDefinition, RouteFile};
pub use matched::{MatchedRoute, PathMatch};
pub use params::{ParamValue, RouteParams};
pub use route::{Route, RouteKind};
pub use table::RoutingTable;
pub use token::Token;
pub use validators::{RouteValidator, Validation, ValidatorRegistry, ValidatorSpec};
