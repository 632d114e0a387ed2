use axum::body::Body;
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use reject_countries_types::config::StaticResponseConfig;
use tracing::warn;

/// The response served instead of the downstream handler for rejected requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: String,
}

impl StaticResponse {
    /// Status codes outside `100..=999` are served as `200 OK`. A `1xx` status is
    /// kept as configured but logged, since it is not a valid final response.
    /// Header names or values that are not valid HTTP are dropped with a warning.
    pub fn from_config(config: &StaticResponseConfig) -> Self {
        let status = u16::try_from(config.status_code)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::OK);
        if status.is_informational() {
            warn!(
                "Static response status {status} is informational and cannot end a request. HTTP servers answer it with 500 instead"
            );
        }

        let mut headers = vec![];
        for (name, values) in config.headers.iter().flatten() {
            let Ok(header_name) = HeaderName::try_from(name.as_str()) else {
                warn!("Ignoring static response header with invalid name: {name}");
                continue;
            };
            for value in values {
                match HeaderValue::try_from(value.as_str()) {
                    Ok(header_value) => headers.push((header_name.clone(), header_value)),
                    Err(_) => {
                        warn!("Ignoring invalid value for static response header {name}: {value}")
                    }
                }
            }
        }

        Self {
            status,
            headers,
            body: config.body.clone(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn render(&self) -> Response<Body> {
        let mut writer = ResponseWriter::new();
        for (name, value) in &self.headers {
            writer.append_header(name.clone(), value.clone());
        }
        let written = writer.write_status(self.status);
        if self.body.is_empty() {
            written.finish()
        } else {
            written.write_body(self.body.clone())
        }
    }
}

/// Collects headers until the status is written. Writing the status consumes
/// the writer, so no header can be added after it.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    headers: HeaderMap,
}

#[derive(Debug)]
pub struct StatusWritten {
    status: StatusCode,
    headers: HeaderMap,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.append(name, value);
        self
    }

    pub fn write_status(self, status: StatusCode) -> StatusWritten {
        StatusWritten {
            status,
            headers: self.headers,
        }
    }
}

impl StatusWritten {
    pub fn write_body(self, body: impl Into<Body>) -> Response<Body> {
        self.into_response(body.into())
    }

    pub fn finish(self) -> Response<Body> {
        self.into_response(Body::empty())
    }

    fn into_response(self, body: Body) -> Response<Body> {
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use test_case::test_case;
    use tracing_test::traced_test;

    fn config(status_code: i64, headers: Option<Vec<(&str, Vec<&str>)>>, body: &str) -> StaticResponseConfig {
        StaticResponseConfig {
            status_code,
            headers: headers.map(|headers| {
                headers
                    .into_iter()
                    .map(|(name, values)| {
                        (
                            name.to_string(),
                            values.into_iter().map(String::from).collect(),
                        )
                    })
                    .collect()
            }),
            body: body.to_string(),
        }
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test_case(403, 403; "forbidden is kept")]
    #[test_case(100, 100; "lower bound is kept")]
    #[test_case(999, 999; "upper bound is kept")]
    #[test_case(99, 200; "below range becomes ok")]
    #[test_case(1000, 200; "above range becomes ok")]
    #[test_case(-403, 200; "negative becomes ok")]
    fn normalizes_status_code(configured: i64, expected: u16) {
        let response = StaticResponse::from_config(&config(configured, None, ""));
        assert_eq!(response.status().as_u16(), expected);
    }

    #[test]
    #[traced_test]
    fn warns_about_informational_status() {
        let lowest = StaticResponse::from_config(&config(100, None, ""));
        let highest = StaticResponse::from_config(&config(199, None, ""));
        assert_eq!(lowest.status(), StatusCode::CONTINUE);
        assert_eq!(highest.status().as_u16(), 199);
        assert!(logs_contain("Static response status 100 Continue is informational"));
        assert!(logs_contain("Static response status 199"));
    }

    #[test]
    #[traced_test]
    fn final_statuses_are_not_warned_about() {
        StaticResponse::from_config(&config(200, None, ""));
        StaticResponse::from_config(&config(403, None, ""));
        assert!(!logs_contain("is informational"));
    }

    #[test]
    fn unset_headers_become_empty() {
        let response = StaticResponse::from_config(&config(403, None, "denied"));
        assert!(response.headers().is_empty());
        assert!(response.render().headers().is_empty());
    }

    #[test]
    fn invalid_headers_are_dropped() {
        let response = StaticResponse::from_config(&config(
            403,
            Some(vec![
                ("Bad Header", vec!["value"]),
                ("X-Good", vec!["ok", "not\nok"]),
            ]),
            "",
        ));
        assert_eq!(
            response.headers(),
            &[(
                HeaderName::from_static("x-good"),
                HeaderValue::from_static("ok")
            )]
        );
    }

    #[tokio::test]
    async fn renders_configured_headers_status_and_body() {
        let response = StaticResponse::from_config(&config(
            403,
            Some(vec![
                ("Content-Type", vec!["text/plain"]),
                ("X-Custom", vec!["first", "second"]),
            ]),
            "Access denied from your country",
        ))
        .render();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers().len(), 3);
        assert_eq!(response.headers()["content-type"], "text/plain");
        let custom: Vec<&HeaderValue> = response.headers().get_all("x-custom").iter().collect();
        assert_eq!(custom, vec!["first", "second"]);
        assert_eq!(body_text(response).await, "Access denied from your country");
    }

    #[tokio::test]
    async fn empty_body_renders_empty_response_body() {
        let response = StaticResponse::from_config(&config(451, None, "")).render();
        assert_eq!(response.status().as_u16(), 451);
        assert_eq!(body_text(response).await, "");
    }

    #[test]
    fn writer_keeps_repeated_values_in_order() {
        let mut writer = ResponseWriter::new();
        writer
            .append_header(HeaderName::from_static("vary"), HeaderValue::from_static("a"))
            .append_header(HeaderName::from_static("vary"), HeaderValue::from_static("b"));
        let response = writer.write_status(StatusCode::IM_A_TEAPOT).finish();
        let vary: Vec<&HeaderValue> = response.headers().get_all("vary").iter().collect();
        assert_eq!(vary, vec!["a", "b"]);
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}
