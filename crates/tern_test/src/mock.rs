use httpmock::{Method::GET, Mock, MockServer};

use crate::sse::SseBody;

/// Serve `body` as a server-sent events stream on `path`.
pub async fn serve_sse<'a>(server: &'a MockServer, path: &str, body: SseBody) -> Mock<'a> {
    let body = body.build();

    server
        .mock_async(|when, then| {
            when.method(GET).path(path);
            then.status(200)
                .header("content-type", "text/event-stream")
                .header("cache-control", "no-cache")
                .body(body);
        })
        .await
}
