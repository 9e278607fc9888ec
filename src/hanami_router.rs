//! Contains the impl of the router.

use crate::http::request::{Request, RequestHead};
use crate::route::{
  Endpoint, ParamList, RequestCallback, Route, RouteMatch, RouteMatchResult, StaticRoute,
};
use crate::streaming_pipeline::{StreamingArgs, StreamingHandler};
use crate::{HanamiResult, Method, Response, StatusCode};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A handler in the router's status-code fallback table. Receives the
/// original request and produces the substitute response.
pub trait ErrorEndpoint: Send + Sync {
  /// Produces the fallback response for the request.
  fn handle(&self, request: &Request) -> HanamiResult<Response>;
}

impl<F, R> ErrorEndpoint for F
where
  F: Fn(&Request) -> R + Send + Sync,
  R: Into<HanamiResult<Response>>,
{
  fn handle(&self, request: &Request) -> HanamiResult<Response> {
    self(request).into()
  }
}

struct DefaultErrorEndpoint(u16);

impl ErrorEndpoint for DefaultErrorEndpoint {
  fn handle(&self, _request: &Request) -> HanamiResult<Response> {
    Ok(Response::new(StatusCode::from_code(self.0)))
  }
}

/// The routing table: an ordered list of static routes, an ordered list of
/// dynamic routes and a status-code fallback table.
///
/// Immutable after construction; dispatch is pure apart from whatever the
/// selected handler does, so concurrent dispatches need no synchronization.
pub struct Router {
  static_routes: Vec<StaticRoute>,
  routes: Vec<Route>,
  error_handlers: HashMap<u16, Arc<dyn ErrorEndpoint>>,
}

impl Debug for Router {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!(
      "Router(static_routes={:?}, routes={:?}, error_handlers={})",
      self.static_routes,
      self.routes,
      self.error_handlers.len()
    ))
  }
}

impl Router {
  /// Finds the handler that will answer the request.
  ///
  /// Static routes are consulted strictly before dynamic ones, each list in
  /// insertion order. A method mismatch is remembered but scanning continues,
  /// so a later route matching both path and method still wins. When nothing
  /// matches, the returned `RouteMatch` carries the 405 fallback (if some
  /// route matched the path but rejected the method) or the 404 fallback.
  ///
  /// The router does not retry near-misses with a trailing slash appended;
  /// `/a` and `/a/` are different paths.
  pub fn dispatch(&self, head: &RequestHead) -> RouteMatch {
    let mut method_seen = false;

    for route in &self.static_routes {
      let matched = route.matches(head);
      match matched.result() {
        RouteMatchResult::PathNotMatched => continue,
        RouteMatchResult::MethodNotMatched => {
          method_seen = true;
          continue;
        }
        RouteMatchResult::RouteMatched => return matched,
      }
    }

    for route in &self.routes {
      let matched = route.matches(head);
      match matched.result() {
        RouteMatchResult::PathNotMatched => continue,
        RouteMatchResult::MethodNotMatched => {
          method_seen = true;
          continue;
        }
        RouteMatchResult::RouteMatched => return matched,
      }
    }

    if method_seen {
      log::debug!("Method not allowed {} {}", head.method(), head.path());
      return RouteMatch::fallback(RouteMatchResult::MethodNotMatched, self.error_callback(405));
    }

    log::debug!("Not found {} {}", head.method(), head.path());
    RouteMatch::fallback(RouteMatchResult::PathNotMatched, self.error_callback(404))
  }

  /// Returns the fallback handler for a status code. When no handler was
  /// registered for the code, a default that emits an empty response with
  /// that status is synthesized.
  pub fn error_handler(&self, status: u16) -> Arc<dyn ErrorEndpoint> {
    match self.error_handlers.get(&status) {
      Some(handler) => Arc::clone(handler),
      None => Arc::new(DefaultErrorEndpoint(status)),
    }
  }

  fn error_callback(&self, status: u16) -> RequestCallback {
    let handler = self.error_handler(status);
    Box::new(move |request: &Request| handler.handle(request))
  }
}

/// Builder for a [`Router`].
pub struct RouterBuilder {
  static_routes: Vec<StaticRoute>,
  routes: Vec<Route>,
  error_handlers: HashMap<u16, Arc<dyn ErrorEndpoint>>,
}

impl Default for RouterBuilder {
  fn default() -> Self {
    Self { static_routes: Vec::new(), routes: Vec::new(), error_handlers: HashMap::new() }
  }
}

impl RouterBuilder {
  /// Creates an empty builder.
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds a dynamic route for a buffered handler.
  pub fn route<Args, E>(
    mut self,
    pattern: impl ToString,
    methods: impl IntoIterator<Item = Method>,
    endpoint: E,
  ) -> HanamiResult<Self>
  where
    Args: ParamList + 'static,
    E: Endpoint<Args> + 'static,
  {
    self.routes.push(Route::new(pattern, methods, endpoint)?);
    Ok(self)
  }

  /// Adds a dynamic `GET` route.
  pub fn get<Args, E>(self, pattern: impl ToString, endpoint: E) -> HanamiResult<Self>
  where
    Args: ParamList + 'static,
    E: Endpoint<Args> + 'static,
  {
    self.route(pattern, [Method::Get], endpoint)
  }

  /// Adds a dynamic `POST` route.
  pub fn post<Args, E>(self, pattern: impl ToString, endpoint: E) -> HanamiResult<Self>
  where
    Args: ParamList + 'static,
    E: Endpoint<Args> + 'static,
  {
    self.route(pattern, [Method::Post], endpoint)
  }

  /// Adds a dynamic `PUT` route.
  pub fn put<Args, E>(self, pattern: impl ToString, endpoint: E) -> HanamiResult<Self>
  where
    Args: ParamList + 'static,
    E: Endpoint<Args> + 'static,
  {
    self.route(pattern, [Method::Put], endpoint)
  }

  /// Adds a dynamic `DELETE` route.
  pub fn delete<Args, E>(self, pattern: impl ToString, endpoint: E) -> HanamiResult<Self>
  where
    Args: ParamList + 'static,
    E: Endpoint<Args> + 'static,
  {
    self.route(pattern, [Method::Delete], endpoint)
  }

  /// Adds a dynamic route for a streaming handler factory.
  pub fn streaming_route<F, H>(
    mut self,
    pattern: impl ToString,
    methods: impl IntoIterator<Item = Method>,
    factory: F,
  ) -> HanamiResult<Self>
  where
    F: Fn() -> H + Send + Sync + 'static,
    H: StreamingHandler + StreamingArgs + 'static,
  {
    self.routes.push(Route::streaming(pattern, methods, factory)?);
    Ok(self)
  }

  /// Adds a pre-built dynamic route.
  pub fn add_route(mut self, route: Route) -> Self {
    self.routes.push(route);
    self
  }

  /// Adds an exact-path route for a buffered handler.
  pub fn static_route<E>(
    mut self,
    path: impl ToString,
    methods: impl IntoIterator<Item = Method>,
    endpoint: E,
  ) -> Self
  where
    E: Endpoint<()> + 'static,
  {
    self.static_routes.push(StaticRoute::new(path, methods, endpoint));
    self
  }

  /// Adds an exact-path route for a streaming handler factory.
  pub fn static_streaming_route<F, H>(
    mut self,
    path: impl ToString,
    methods: impl IntoIterator<Item = Method>,
    factory: F,
  ) -> HanamiResult<Self>
  where
    F: Fn() -> H + Send + Sync + 'static,
    H: StreamingHandler + StreamingArgs + 'static,
  {
    self.static_routes.push(StaticRoute::streaming(path, methods, factory)?);
    Ok(self)
  }

  /// Registers a fallback handler for a status code.
  pub fn error_handler(mut self, status: u16, handler: impl ErrorEndpoint + 'static) -> Self {
    self.error_handlers.insert(status, Arc::new(handler));
    self
  }

  /// Finishes the router.
  pub fn build(self) -> Router {
    Router {
      static_routes: self.static_routes,
      routes: self.routes,
      error_handlers: self.error_handlers,
    }
  }

  /// Finishes the router wrapped in an `Arc`.
  pub fn build_arc(self) -> Arc<Router> {
    Arc::new(self.build())
  }

  /// Helper fn to make builder code look a bit cleaner.
  pub fn ok(self) -> HanamiResult<Self> {
    Ok(self)
  }
}
