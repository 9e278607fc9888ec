//! Hanami is an HTTP server framework core built around a typed, pattern-based
//! request router. Route patterns declare typed placeholders (`{{i}}`, `{{d}}`,
//! `{{s:regex}}` and optional variants), handlers are cross-checked against the
//! pattern's parameter schema at construction time, and two request pipelines
//! (buffered and streaming) drive handlers from header receipt to response
//! emission. The wire transport itself is an external collaborator reached
//! through the [`ResponseTransport`] trait.

#![warn(missing_docs)]

pub mod http;

mod buffered_pipeline;
mod config;
mod executor;
mod hanami_error;
mod hanami_router;
mod percent;
mod pipeline_factory;
mod route;
mod route_pattern;
mod static_files;
mod streaming_pipeline;
mod timer;
mod util;

pub use buffered_pipeline::BufferedPipeline;
pub use config::{Listener, Protocol, ServerConfig, DEFAULT_FILE_READER_BUFFER_SIZE};
pub use executor::{global_io_pool, EventLoop, EventLoopHandle, WorkerPool};
pub use hanami_error::{
  ConfigError, HanamiError, HanamiResult, PatternError, SchemaError, TransportError,
};
pub use hanami_router::{ErrorEndpoint, Router, RouterBuilder};
pub use http::cookie::Cookie;
pub use http::headers::{HeaderName, Headers};
pub use http::method::Method;
pub use http::request::{BodyChain, Request, RequestHead};
pub use http::response::Response;
pub use http::status::StatusCode;
pub use pipeline_factory::{PipelineFactory, RequestPipeline, ResponseTransport};
pub use route::{
  Endpoint, ParamList, RequestCallback, Route, RouteMatch, RouteMatchResult, RouteParam,
  StaticRoute, StreamingConstructor,
};
pub use route_pattern::{PathArg, PathArgs, RouteParamType};
pub use static_files::StreamingFileHandler;
pub use streaming_pipeline::{StreamSink, StreamingArgs, StreamingHandler, StreamingPipeline};
pub use timer::{Timer, TimerToken};
