//! End-to-end tests through the umbrella crate.

use axis::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_prelude_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/count"))
        .and(header("x-client", "axis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder().base_url(server.uri()).build().unwrap();
    client.use_request_interceptor([request_headers_interceptor(
        RequestHeadersOptions::new([("X-Client", "axis")]).include(["/api/**"]),
    )]);
    client.use_response_interceptor([response_retry_interceptor(ResponseRetryOptions::new(1))]);

    let factory = UseRequest::new(UseRequestConfig::new(client));
    let hook = factory.use_request(UseRequestOptions::client_with_transform(
        RunnerMethod::Get,
        "/api/count",
        |response: &Response, _: &HookRefs<u64>| {
            response
                .data
                .as_json()
                .and_then(|v| v["count"].as_u64())
                .unwrap_or_default()
        },
    ));

    let seen = Reactive::new(Vec::new());
    let log = seen.clone();
    hook.loading().subscribe(move |loading| log.update(|v| v.push(*loading)));

    hook.run(None, None).await.unwrap();
    assert_eq!(hook.value().get(), Some(7));
    assert_eq!(seen.get(), vec![true, false]);
}
