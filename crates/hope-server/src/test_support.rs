//! Shared fixtures for the server's tests.

use std::{collections::HashMap, time::Duration};

use axum::{
  Json, Router,
  extract::Query,
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::get,
};
use tokio::net::TcpListener;

/// Serve a stand-in tokeninfo endpoint on an ephemeral port and return its
/// URL. It answers `info` for `id_token=good` and 400 for anything else.
pub async fn fake_tokeninfo(info: serde_json::Value) -> String {
  slow_tokeninfo(info, Duration::ZERO).await
}

/// [`fake_tokeninfo`] that waits `delay` before every answer.
pub async fn slow_tokeninfo(info: serde_json::Value, delay: Duration) -> String {
  let app = Router::new().route(
    "/tokeninfo",
    get(move |Query(params): Query<HashMap<String, String>>| {
      let info = info.clone();
      async move {
        tokio::time::sleep(delay).await;
        let response: Response = match params.get("id_token").map(String::as_str) {
          Some("good") => (StatusCode::OK, Json(info)).into_response(),
          _ => (StatusCode::BAD_REQUEST, "invalid_token").into_response(),
        };
        response
      }
    }),
  );

  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let address = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  format!("http://{address}/tokeninfo")
}
