use hanami::{Method, Request, Response, RouteMatchResult, RouterBuilder};

mod common;
use common::{make_head, make_request};

#[test]
fn checks_static_routes_before_dynamic_ones() {
  let router = RouterBuilder::new()
    .static_route("/1", [Method::Get], |_: &Request| Response::new(201))
    .get("/{{i}}", |_: &Request, _: i64| Response::new(202))
    .expect("route")
    .build();

  let matched = router.dispatch(&make_head(Method::Get, "/1"));
  assert_eq!(matched.result(), RouteMatchResult::RouteMatched);

  let response = matched.into_handler().expect("handler")(&make_request(Method::Get, "/1"))
    .expect("response");
  assert_eq!(response.status_code().code(), 201);
}

#[test]
fn returns_405_when_only_the_method_failed_to_match() {
  let router = RouterBuilder::new()
    .static_route("/1", [Method::Get], |_: &Request| Response::new(201))
    .route(r"/\d+", [Method::Get, Method::Put], |_: &Request| Response::new(202))
    .expect("route")
    .build();

  let matched = router.dispatch(&make_head(Method::Post, "/5"));
  assert_eq!(matched.result(), RouteMatchResult::MethodNotMatched);

  let response = matched.into_handler().expect("fallback")(&make_request(Method::Post, "/5"))
    .expect("response");
  assert_eq!(response.status_code().code(), 405);
  assert!(response.body().is_empty());
}

#[test]
fn later_route_matching_path_and_method_beats_an_earlier_405() {
  let router = RouterBuilder::new()
    .static_route("/1", [Method::Get], |_: &Request| Response::new(201))
    .route(r"/\d+", [Method::Get, Method::Post], |_: &Request| Response::new(202))
    .expect("route")
    .build();

  let matched = router.dispatch(&make_head(Method::Post, "/1"));
  assert_eq!(matched.result(), RouteMatchResult::RouteMatched);

  let response = matched.into_handler().expect("handler")(&make_request(Method::Post, "/1"))
    .expect("response");
  assert_eq!(response.status_code().code(), 202);
}

#[test]
fn uses_registered_error_fallbacks() {
  let router = RouterBuilder::new()
    .static_route("/1", [Method::Get], |_: &Request| Response::new(201))
    .route(r"/\d+", [Method::Get, Method::Put], |_: &Request| Response::new(202))
    .expect("route")
    .error_handler(405, |_: &Request| Response::new(415))
    .error_handler(404, |_: &Request| Response::new(410))
    .build();

  let method_mismatch = router.dispatch(&make_head(Method::Post, "/1"));
  let response = method_mismatch.into_handler().expect("fallback")(&make_request(
    Method::Post,
    "/1",
  ))
  .expect("response");
  assert_eq!(response.status_code().code(), 415);

  let path_mismatch = router.dispatch(&make_head(Method::Get, "/invalid_path"));
  let response = path_mismatch.into_handler().expect("fallback")(&make_request(
    Method::Get,
    "/invalid_path",
  ))
  .expect("response");
  assert_eq!(response.status_code().code(), 410);
}

#[test]
fn synthesizes_defaults_when_no_fallback_is_registered_for_the_code() {
  let router = RouterBuilder::new()
    .static_route("/1", [Method::Get], |_: &Request| Response::new(201))
    .route(r"/\d+", [Method::Get, Method::Put], |_: &Request| Response::new(202))
    .expect("route")
    .error_handler(401, |_: &Request| Response::new(411))
    .error_handler(402, |_: &Request| Response::new(412))
    .build();

  let method_mismatch = router.dispatch(&make_head(Method::Post, "/1"));
  let response = method_mismatch.into_handler().expect("fallback")(&make_request(
    Method::Post,
    "/1",
  ))
  .expect("response");
  assert_eq!(response.status_code().code(), 405);
  assert!(response.body().is_empty());

  let path_mismatch = router.dispatch(&make_head(Method::Get, "/invalid_path"));
  let response = path_mismatch.into_handler().expect("fallback")(&make_request(
    Method::Get,
    "/invalid_path",
  ))
  .expect("response");
  assert_eq!(response.status_code().code(), 404);
  assert!(response.body().is_empty());
}

#[test]
fn returns_404_when_nothing_matches() {
  let router = RouterBuilder::new()
    .static_route("/1", [Method::Get], |_: &Request| Response::new(201))
    .route(r"/\d+", [Method::Get, Method::Put], |_: &Request| Response::new(202))
    .expect("route")
    .build();

  let matched = router.dispatch(&make_head(Method::Get, "/invalid_path"));
  assert_eq!(matched.result(), RouteMatchResult::PathNotMatched);

  let response = matched.into_handler().expect("fallback")(&make_request(
    Method::Get,
    "/invalid_path",
  ))
  .expect("response");
  assert_eq!(response.status_code().code(), 404);
}

#[test]
fn error_handler_lookup_prefers_the_registered_handler() {
  let router = RouterBuilder::new()
    .error_handler(404, |_: &Request| Response::from_string(414, "registered"))
    .build();

  let registered = router
    .error_handler(404)
    .handle(&make_request(Method::Get, "/missing"))
    .expect("response");
  assert_eq!(registered.status_code().code(), 414);

  let synthesized = router
    .error_handler(500)
    .handle(&make_request(Method::Get, "/missing"))
    .expect("response");
  assert_eq!(synthesized.status_code().code(), 500);
  assert!(synthesized.body().is_empty());
}

#[test]
fn does_not_retry_with_a_trailing_slash() {
  let router = RouterBuilder::new()
    .static_route("/exact", [Method::Get], |_: &Request| Response::new(200))
    .build();

  let matched = router.dispatch(&make_head(Method::Get, "/exact/"));
  assert_eq!(matched.result(), RouteMatchResult::PathNotMatched);
}

#[test]
fn fallbacks_receive_the_original_request() {
  let router = RouterBuilder::new()
    .error_handler(404, |request: &Request| {
      Response::from_string(404, format!("missing: {}", request.path()))
    })
    .build();

  let matched = router.dispatch(&make_head(Method::Get, "/somewhere"));
  let response = matched.into_handler().expect("fallback")(&make_request(
    Method::Get,
    "/somewhere",
  ))
  .expect("response");
  assert_eq!(response.body(), b"missing: /somewhere");
}
