//! Routes: a pattern, a method set and a type-checked handler.
//!
//! Dynamic routes match through the compiled pattern regex; static routes
//! match by exact string equality and skip the regex machinery entirely. Both
//! produce a [`RouteMatch`] that carries the closure (or streaming handler
//! constructor) the pipeline will drive.

use crate::hanami_error::SchemaError;
use crate::http::request::{Request, RequestHead};
use crate::route_pattern::{
  compile_pattern, extract_args, snapshot_captures, CompiledPattern, PathArg, PathArgs,
  RouteParamType,
};
use crate::streaming_pipeline::{
  ErasedStreamingFactory, FnStreamingFactory, StreamingArgs, StreamingHandler,
};
use crate::{HanamiResult, Method, Response};
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

/// How one route relates to one request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RouteMatchResult {
  /// The path didn't match.
  PathNotMatched,
  /// The path matched but the method didn't.
  MethodNotMatched,
  /// The route matched entirely.
  RouteMatched,
}

/// The closure a matched buffered route hands to the pipeline. Invoking it
/// extracts the typed arguments and calls the user handler.
pub type RequestCallback = Box<dyn FnOnce(&Request) -> HanamiResult<Response> + Send>;

/// The constructor a matched streaming route hands to the pipeline. Invoking
/// it creates the handler with `set_request_args` already applied.
pub type StreamingConstructor = Box<dyn FnOnce() -> Box<dyn StreamingHandler> + Send>;

/// The result of matching one route (or a whole router) against one request.
///
/// When `result` is [`RouteMatchResult::RouteMatched`], exactly one of the two
/// handler slots is populated. When it is not, both are empty - except where
/// the router substitutes its error-code fallback as the buffered callback.
pub struct RouteMatch {
  result: RouteMatchResult,
  handler: Option<RequestCallback>,
  streaming_handler: Option<StreamingConstructor>,
}

impl Debug for RouteMatch {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!(
      "RouteMatch({:?}, handler={}, streaming={})",
      self.result,
      self.handler.is_some(),
      self.streaming_handler.is_some()
    ))
  }
}

impl RouteMatch {
  pub(crate) fn not_matched(result: RouteMatchResult) -> Self {
    debug_assert!(result != RouteMatchResult::RouteMatched);
    Self { result, handler: None, streaming_handler: None }
  }

  pub(crate) fn fallback(result: RouteMatchResult, handler: RequestCallback) -> Self {
    debug_assert!(result != RouteMatchResult::RouteMatched);
    Self { result, handler: Some(handler), streaming_handler: None }
  }

  pub(crate) fn matched(handler: RequestCallback) -> Self {
    Self { result: RouteMatchResult::RouteMatched, handler: Some(handler), streaming_handler: None }
  }

  pub(crate) fn matched_streaming(constructor: StreamingConstructor) -> Self {
    Self {
      result: RouteMatchResult::RouteMatched,
      handler: None,
      streaming_handler: Some(constructor),
    }
  }

  /// The match result.
  pub fn result(&self) -> RouteMatchResult {
    self.result
  }

  /// Returns `true` if a buffered callback is attached.
  pub fn has_handler(&self) -> bool {
    self.handler.is_some()
  }

  /// Returns `true` if a streaming constructor is attached.
  pub fn has_streaming_handler(&self) -> bool {
    self.streaming_handler.is_some()
  }

  /// Takes the buffered callback, if any.
  pub fn into_handler(self) -> Option<RequestCallback> {
    self.handler
  }

  /// Runs the streaming constructor, if any.
  pub fn into_streaming_handler(self) -> Option<Box<dyn StreamingHandler>> {
    self.streaming_handler.map(|constructor| constructor())
  }

  pub(crate) fn split(self) -> (Option<RequestCallback>, Option<StreamingConstructor>) {
    (self.handler, self.streaming_handler)
  }
}

/// A handler parameter type that a route placeholder can bind to.
pub trait RouteParam: Send + 'static {
  /// The schema element this type corresponds to.
  fn param_type() -> RouteParamType;

  /// Converts the extracted tagged value. The construction-time schema check
  /// makes a tag mismatch unreachable.
  fn from_arg(arg: PathArg) -> Self;
}

impl RouteParam for i64 {
  fn param_type() -> RouteParamType {
    RouteParamType::Int64
  }

  fn from_arg(arg: PathArg) -> Self {
    match arg {
      PathArg::Int(v) => v,
      _ => crate::util::unreachable(),
    }
  }
}

impl RouteParam for f64 {
  fn param_type() -> RouteParamType {
    RouteParamType::Double
  }

  fn from_arg(arg: PathArg) -> Self {
    match arg {
      PathArg::Double(v) => v,
      _ => crate::util::unreachable(),
    }
  }
}

impl RouteParam for String {
  fn param_type() -> RouteParamType {
    RouteParamType::String
  }

  fn from_arg(arg: PathArg) -> Self {
    match arg {
      PathArg::Str(v) => v,
      _ => crate::util::unreachable(),
    }
  }
}

impl RouteParam for Option<i64> {
  fn param_type() -> RouteParamType {
    RouteParamType::OptionalInt64
  }

  fn from_arg(arg: PathArg) -> Self {
    match arg {
      PathArg::OptInt(v) => v,
      _ => crate::util::unreachable(),
    }
  }
}

impl RouteParam for Option<f64> {
  fn param_type() -> RouteParamType {
    RouteParamType::OptionalDouble
  }

  fn from_arg(arg: PathArg) -> Self {
    match arg {
      PathArg::OptDouble(v) => v,
      _ => crate::util::unreachable(),
    }
  }
}

impl RouteParam for Option<String> {
  fn param_type() -> RouteParamType {
    RouteParamType::OptionalString
  }

  fn from_arg(arg: PathArg) -> Self {
    match arg {
      PathArg::OptStr(v) => v,
      _ => crate::util::unreachable(),
    }
  }
}

/// A tuple of [`RouteParam`]s, used to reflect a handler's parameter list
/// into a schema.
pub trait ParamList {
  /// The parameter types in declaration order.
  fn schema() -> Vec<RouteParamType>;
}

/// A buffered route handler taking the request plus the typed parameters
/// described by `Args`. Implemented for closures of every supported arity.
pub trait Endpoint<Args>: Send + Sync {
  /// Invokes the handler with the extracted parameters.
  fn call(&self, request: &Request, args: PathArgs) -> HanamiResult<Response>;
}

macro_rules! impl_param_tuple {
  ($($ty:ident),*) => {
    impl<$($ty: RouteParam,)*> ParamList for ($($ty,)*) {
      fn schema() -> Vec<RouteParamType> {
        vec![$($ty::param_type()),*]
      }
    }

    impl<F, R, $($ty,)*> Endpoint<($($ty,)*)> for F
    where
      F: Fn(&Request, $($ty),*) -> R + Send + Sync,
      R: Into<HanamiResult<Response>>,
      $($ty: RouteParam,)*
    {
      #[allow(unused_variables, unused_mut)]
      fn call(&self, request: &Request, args: PathArgs) -> HanamiResult<Response> {
        let mut args = args.into_vec().into_iter();
        self(request, $($ty::from_arg(crate::util::unwrap_some(args.next()))),*).into()
      }
    }
  };
}

impl_param_tuple!();
impl_param_tuple!(A0);
impl_param_tuple!(A0, A1);
impl_param_tuple!(A0, A1, A2);
impl_param_tuple!(A0, A1, A2, A3);
impl_param_tuple!(A0, A1, A2, A3, A4);
impl_param_tuple!(A0, A1, A2, A3, A4, A5);
impl_param_tuple!(A0, A1, A2, A3, A4, A5, A6);
impl_param_tuple!(A0, A1, A2, A3, A4, A5, A6, A7);
impl_param_tuple!(A0, A1, A2, A3, A4, A5, A6, A7, A8);
impl_param_tuple!(A0, A1, A2, A3, A4, A5, A6, A7, A8, A9);
impl_param_tuple!(A0, A1, A2, A3, A4, A5, A6, A7, A8, A9, A10);
impl_param_tuple!(A0, A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11);

pub(crate) trait ErasedEndpoint: Send + Sync {
  fn invoke(&self, request: &Request, args: PathArgs) -> HanamiResult<Response>;
}

struct FnEndpoint<E, Args> {
  endpoint: E,
  _args: PhantomData<fn(Args)>,
}

impl<E, Args> ErasedEndpoint for FnEndpoint<E, Args>
where
  E: Endpoint<Args> + 'static,
  Args: 'static,
{
  fn invoke(&self, request: &Request, args: PathArgs) -> HanamiResult<Response> {
    self.endpoint.call(request, args)
  }
}

enum RouteTarget {
  Buffered(Arc<dyn ErasedEndpoint>),
  Streaming(Arc<dyn ErasedStreamingFactory>),
}

fn check_schema(
  pattern: &str,
  pattern_params: &[RouteParamType],
  handler_params: &[RouteParamType],
) -> Result<(), SchemaError> {
  if pattern_params.len() != handler_params.len() {
    return Err(SchemaError::ParamCountMismatch {
      pattern: pattern.to_string(),
      pattern_params: pattern_params.to_vec(),
      handler_params: handler_params.to_vec(),
    });
  }

  for (index, (pattern_type, handler_type)) in
    pattern_params.iter().zip(handler_params.iter()).enumerate()
  {
    if pattern_type != handler_type {
      return Err(SchemaError::ParamTypeMismatch {
        pattern: pattern.to_string(),
        index,
        pattern_type: *pattern_type,
        handler_type: *handler_type,
      });
    }
  }

  Ok(())
}

/// A dynamic route: a compiled pattern, a method set and a type-checked
/// handler. Created at server configuration and immutable thereafter.
pub struct Route {
  pattern: String,
  methods: HashSet<Method>,
  compiled: CompiledPattern,
  target: RouteTarget,
}

impl Debug for Route {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("Route({})", self.pattern))
  }
}

impl Route {
  /// Builds a route for a buffered handler. Compiles the pattern, reflects
  /// the handler's parameter list and verifies both schemas agree.
  pub fn new<Args, E>(
    pattern: impl ToString,
    methods: impl IntoIterator<Item = Method>,
    endpoint: E,
  ) -> HanamiResult<Self>
  where
    Args: ParamList + 'static,
    E: Endpoint<Args> + 'static,
  {
    let pattern = pattern.to_string();
    let compiled = compile_pattern(&pattern)?;
    check_schema(&pattern, &compiled.schema, &Args::schema())?;

    Ok(Self {
      pattern,
      methods: methods.into_iter().collect(),
      compiled,
      target: RouteTarget::Buffered(Arc::new(FnEndpoint { endpoint, _args: PhantomData })),
    })
  }

  /// Builds a route for a streaming handler factory. The handler type's
  /// reflected schema is cross-checked against the pattern the same way.
  pub fn streaming<F, H>(
    pattern: impl ToString,
    methods: impl IntoIterator<Item = Method>,
    factory: F,
  ) -> HanamiResult<Self>
  where
    F: Fn() -> H + Send + Sync + 'static,
    H: StreamingHandler + StreamingArgs + 'static,
  {
    let pattern = pattern.to_string();
    let compiled = compile_pattern(&pattern)?;
    let factory = FnStreamingFactory { factory, _handler: PhantomData };
    check_schema(&pattern, &compiled.schema, &factory.schema())?;

    Ok(Self {
      pattern,
      methods: methods.into_iter().collect(),
      compiled,
      target: RouteTarget::Streaming(Arc::new(factory)),
    })
  }

  /// The original pattern string.
  pub fn pattern(&self) -> &str {
    self.pattern.as_str()
  }

  /// The methods this route accepts.
  pub fn methods(&self) -> &HashSet<Method> {
    &self.methods
  }

  /// The pattern's parameter schema.
  pub fn schema(&self) -> &[RouteParamType] {
    self.compiled.schema.as_slice()
  }

  /// Matches this route against a request head.
  pub fn matches(&self, head: &RequestHead) -> RouteMatch {
    let Some(captures) = self.compiled.regex.captures(head.path()) else {
      return RouteMatch::not_matched(RouteMatchResult::PathNotMatched);
    };

    if !self.methods.contains(head.method()) {
      return RouteMatch::not_matched(RouteMatchResult::MethodNotMatched);
    }

    // The captures borrow the request path, so the capture texts are
    // snapshotted into the closure and parsed when it is invoked.
    let raw = snapshot_captures(&self.compiled.schema, &captures);
    let schema = self.compiled.schema.clone();

    match &self.target {
      RouteTarget::Buffered(endpoint) => {
        let endpoint = Arc::clone(endpoint);
        RouteMatch::matched(Box::new(move |request: &Request| {
          endpoint.invoke(request, extract_args(&schema, &raw))
        }))
      }
      RouteTarget::Streaming(factory) => {
        let factory = Arc::clone(factory);
        RouteMatch::matched_streaming(Box::new(move || {
          let mut handler = factory.create();
          handler.set_request_args(extract_args(&schema, &raw));
          handler
        }))
      }
    }
  }
}

/// A static route: an exact path, a method set and a handler with no route
/// parameters. Faster than a regex route and consulted first by the router.
pub struct StaticRoute {
  path: String,
  methods: HashSet<Method>,
  target: RouteTarget,
}

impl Debug for StaticRoute {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("StaticRoute({})", self.path))
  }
}

impl StaticRoute {
  /// Builds a static route for a buffered handler taking the request only.
  pub fn new<E>(
    path: impl ToString,
    methods: impl IntoIterator<Item = Method>,
    endpoint: E,
  ) -> Self
  where
    E: Endpoint<()> + 'static,
  {
    Self {
      path: path.to_string(),
      methods: methods.into_iter().collect(),
      target: RouteTarget::Buffered(Arc::new(FnEndpoint::<E, ()> {
        endpoint,
        _args: PhantomData,
      })),
    }
  }

  /// Builds a static route for a streaming handler factory. The handler must
  /// not expect route parameters.
  pub fn streaming<F, H>(
    path: impl ToString,
    methods: impl IntoIterator<Item = Method>,
    factory: F,
  ) -> HanamiResult<Self>
  where
    F: Fn() -> H + Send + Sync + 'static,
    H: StreamingHandler + StreamingArgs + 'static,
  {
    let path = path.to_string();
    let factory = FnStreamingFactory { factory, _handler: PhantomData };
    check_schema(&path, &[], &factory.schema())?;

    Ok(Self {
      path,
      methods: methods.into_iter().collect(),
      target: RouteTarget::Streaming(Arc::new(factory)),
    })
  }

  /// The exact path this route serves.
  pub fn path(&self) -> &str {
    self.path.as_str()
  }

  /// The methods this route accepts.
  pub fn methods(&self) -> &HashSet<Method> {
    &self.methods
  }

  /// Matches this route against a request head.
  pub fn matches(&self, head: &RequestHead) -> RouteMatch {
    if head.path() != self.path {
      return RouteMatch::not_matched(RouteMatchResult::PathNotMatched);
    }

    if !self.methods.contains(head.method()) {
      return RouteMatch::not_matched(RouteMatchResult::MethodNotMatched);
    }

    match &self.target {
      RouteTarget::Buffered(endpoint) => {
        let endpoint = Arc::clone(endpoint);
        RouteMatch::matched(Box::new(move |request: &Request| {
          endpoint.invoke(request, PathArgs::default())
        }))
      }
      RouteTarget::Streaming(factory) => {
        let factory = Arc::clone(factory);
        RouteMatch::matched_streaming(Box::new(move || {
          let mut handler = factory.create();
          handler.set_request_args(PathArgs::default());
          handler
        }))
      }
    }
  }
}
