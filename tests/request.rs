use hanami::{BodyChain, Headers, Method, Request, RequestHead};

mod common;

fn request_for(target: &str) -> Request {
  Request::new(RequestHead::new(Method::Get, target, Headers::new()), BodyChain::new())
}

fn request_with_headers<'a>(
  target: &str,
  headers: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Request {
  Request::new(
    RequestHead::new(Method::Get, target, headers.into_iter().collect()),
    BodyChain::new(),
  )
}

#[test]
fn methods_parse_from_their_names() {
  assert_eq!(Method::from_name("GET"), Method::Get);
  assert_eq!(Method::from_name("POST"), Method::Post);
  assert_eq!(Method::from_name("PUT"), Method::Put);
  assert_eq!(Method::from_name("DELETE"), Method::Delete);
  assert_eq!(Method::from_name("PATCH"), Method::Patch);
  assert_eq!(Method::from_name("HEAD"), Method::Head);
  assert_eq!(Method::from_name("OPTIONS"), Method::Options);
  assert_eq!(Method::from_name("CONNECT"), Method::Connect);
  assert_eq!(Method::from_name("TRACE"), Method::Trace);
  assert_eq!(Method::from_name("BREW"), Method::Custom("BREW".to_string()));
}

#[test]
fn path_is_decoded_and_plus_stays_literal() {
  let request = request_for("/testing%20path+here");
  assert_eq!(request.path(), "/testing path+here");
}

#[test]
fn broken_path_encodings_leave_the_path_undecoded() {
  let request = request_for("/testing%GGpath%20");
  assert_eq!(request.path(), "/testing%GGpath%20");
}

#[test]
fn query_params_are_decoded_at_lookup() {
  let request = request_for("/index.php?test%20variable=value%26&key=value");
  assert_eq!(request.query_param("test variable").as_deref(), Some("value&"));
  assert_eq!(request.query_param("key").as_deref(), Some("value"));
}

#[test]
fn query_plus_decodes_to_space() {
  let request = request_for("/index.php?a+b=c+d");
  assert_eq!(request.query_param("a b").as_deref(), Some("c d"));
}

#[test]
fn encoded_lookup_keys_round_trip() {
  let key = "weird key&";
  let target =
    format!("/q?{}={}", urlencoding::encode(key), urlencoding::encode("first value"));
  let request = request_for(&target);
  assert_eq!(request.query_param(key).as_deref(), Some("first value"));
}

#[test]
fn missing_query_params_are_absent() {
  let request = request_for("/index.php");
  assert_eq!(request.query_param("arg1"), None);
}

#[test]
fn badly_encoded_query_params_are_skipped() {
  let bad_key = request_for("/index.php?test%=value");
  assert_eq!(bad_key.query_param("test "), None);

  let bad_value = request_for("/index.php?test%20value=value%");
  assert_eq!(bad_value.query_param("test value"), None);
}

#[test]
fn multi_valued_query_params_keep_their_order() {
  let request = request_for("/search?tag=a&tag=b&other=c");
  assert_eq!(request.query_params("tag"), vec!["a".to_string(), "b".to_string()]);
  assert_eq!(request.query_param("tag").as_deref(), Some("a"));
}

#[test]
fn header_lookup_returns_the_single_value_only() {
  let request = request_with_headers("/", [("Location", "/index.php")]);
  assert_eq!(request.header("Location").as_deref(), Some("/index.php"));
  assert_eq!(request.header("location").as_deref(), Some("/index.php"));
  assert_eq!(request.header("Content-Type"), None);

  let doubled = request_with_headers("/", [("Accept", "text/html"), ("Accept", "text/plain")]);
  assert_eq!(doubled.header("Accept"), None);
  assert_eq!(doubled.headers().get_all("accept"), vec!["text/html", "text/plain"]);
}

#[test]
fn headers_are_case_insensitive() {
  let mut headers = Headers::new();
  headers.add("content-type", "text/plain");
  assert_eq!(headers.get("Content-Type"), Some("text/plain"));

  headers.set("CONTENT-TYPE", "application/json");
  assert_eq!(headers.get_all("content-type"), vec!["application/json"]);
}

#[test]
fn cookies_parse_from_the_cookie_header() {
  let request = request_with_headers("/", [("Cookie", "key1=value1; key2=value2;")]);
  assert_eq!(request.cookie("key1").expect("cookie").value, "value1");
  assert_eq!(request.cookie("key2").expect("cookie").value, "value2");
  assert_eq!(request.cookie("key3"), None);

  let bare = request_for("/");
  assert_eq!(bare.cookie("arg1"), None);
}

#[test]
fn body_chains_flatten_in_arrival_order() {
  let mut body = BodyChain::new();
  body.append(b"The first string".to_vec());
  body.append(b"The second string".to_vec());
  let request = Request::new(RequestHead::new(Method::Post, "/", Headers::new()), body);

  assert_eq!(request.body_as_string(), "The first stringThe second string");
  assert_eq!(request.body().len(), 33);
}

#[test]
fn json_bodies_parse_across_chunk_boundaries() {
  let mut body = BodyChain::new();
  body.append(b"{\"key\": ".to_vec());
  body.append(b"\"value\"}".to_vec());
  let request = Request::new(RequestHead::new(Method::Post, "/", Headers::new()), body);

  let json = request.body_as_json().expect("json");
  assert_eq!(json.get("key").and_then(|v| v.as_str()), Some("value"));
}

#[test]
fn json_decoding_fails_on_garbage() {
  let request = Request::new(
    RequestHead::new(Method::Post, "/", Headers::new()),
    BodyChain::from("The first string"),
  );
  assert!(request.body_as_json().is_err());
}

#[test]
fn empty_bodies_read_as_empty() {
  let request = request_for("/");
  assert!(request.body().is_empty());
  assert_eq!(request.body_as_string(), "");
}
