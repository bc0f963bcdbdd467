//! # portico-http
//!
//! HTTP layer for the portico framework. Provides the request and response
//! types, redirect helpers, and the routing layer: pattern tokenizer, route
//! matcher, parameter validators, the ordered routing table, URL generation,
//! declarative route files and the compiled route cache.

pub mod querydict;
pub mod redirect;
pub mod request;
pub mod response;
pub mod routing;

pub use querydict::QueryDict;
pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::{HttpResponse, JsonResponse, ResponseContent};
pub use routing::{MatchedRoute, ParamValue, Route, RouteKind, RouteParams, RoutingTable};
