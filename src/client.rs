use crate::config::{Auth, Connection};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue, USER_AGENT};
use reqwest::{Method, StatusCode, Url};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

const UA: &str = concat!("fgtctl/", env!("CARGO_PKG_VERSION"));
const API_PREFIX: &str = "api/v2/";
const CSRF_COOKIE: &str = "ccsrftoken";
const CSRF_HEADER: &str = "X-CSRFTOKEN";

#[derive(Debug, Clone)]
pub struct ResponseData {
    pub status: u16,
    pub body: String,
    pub json: Option<Value>,
}

impl ResponseData {
    /// Parsed body, or the raw text when it is not JSON.
    pub fn into_value(self) -> Value {
        match self.json {
            Some(json) => json,
            None if self.body.trim().is_empty() => Value::Null,
            None => Value::String(self.body),
        }
    }
}

/// Local failure classes. Each maps onto a negative status code.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("invalid session: {0}")]
    Session(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ClientError {
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Connection(_) | Self::Timeout(_) => -1,
            Self::Session(_) => -2,
            Self::Api(_) => -3,
            Self::Unexpected(_) => -4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Connection(_) | Self::Timeout(_) => "Connection failed",
            Self::Session(_) => "Invalid session",
            Self::Api(_) => "API error",
            Self::Unexpected(_) => "Unexpected error",
        }
    }

    fn details(&self) -> &str {
        match self {
            Self::Connection(d)
            | Self::Timeout(d)
            | Self::Session(d)
            | Self::Api(d)
            | Self::Unexpected(d) => d.as_str(),
        }
    }

    /// `{"error": ..., "details": ...}` body reported in place of a response.
    pub fn to_body(&self) -> Value {
        json!({"error": self.label(), "details": self.details()})
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let text = err.to_string();
        if err.is_timeout() {
            Self::Timeout(text)
        } else if err.is_connect() || err.is_request() {
            Self::Connection(text)
        } else if err.is_decode() || err.is_body() {
            Self::Api(text)
        } else {
            Self::Unexpected(text)
        }
    }
}

/// `vdom=root` → `("vdom", "root")`; a bare `key` becomes `("key", "")`.
pub fn parse_query(params: &[String]) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| match p.split_once('=') {
            Some((k, v)) => (k.trim().to_string(), v.to_string()),
            None => (p.trim().to_string(), String::new()),
        })
        .collect()
}

/// Session against one FortiGate. Password sessions log in lazily and keep
/// the CSRF token for write requests.
#[derive(Debug)]
pub struct FortiClient {
    root: Url,
    api: Url,
    http: Client,
    username: String,
    auth: Auth,
    csrf: Option<String>,
    logged_in: bool,
}

impl FortiClient {
    pub fn new(conn: &Connection) -> Result<Self, ClientError> {
        let scheme = if conn.use_ssl { "https" } else { "http" };
        let root = Url::parse(&format!("{scheme}://{}/", conn.host.trim_end_matches('/')))
            .map_err(|e| ClientError::Unexpected(format!("invalid host `{}`: {e}", conn.host)))?;
        let api = root
            .join(API_PREFIX)
            .map_err(|e| ClientError::Unexpected(e.to_string()))?;
        let http = Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!conn.verify_tls)
            .user_agent(HeaderValue::from_static(UA))
            .timeout(conn.timeout)
            .build()
            .map_err(|e| ClientError::Unexpected(format!("building HTTP client: {e}")))?;

        Ok(Self {
            root,
            api,
            http,
            username: conn.username.clone(),
            auth: conn.auth.clone(),
            csrf: None,
            logged_in: false,
        })
    }

    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, ClientError> {
        let trimmed = endpoint.trim().trim_start_matches('/');
        let relative = trimmed.strip_prefix(API_PREFIX).unwrap_or(trimmed);
        self.api
            .join(relative)
            .map_err(|e| ClientError::Unexpected(format!("joining `{endpoint}` to base URL: {e}")))
    }

    /// Runs one request and reports failures the way the appliance API does:
    /// a negative status code and an `{"error", "details"}` body.
    pub fn perform_request(
        &mut self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        query: &[(String, String)],
    ) -> (i32, Value) {
        match self.request(method, endpoint, body, query) {
            Ok(response) => (i32::from(response.status), response.into_value()),
            Err(err) => {
                debug!(error = %err, "request failed");
                (err.status_code(), err.to_body())
            }
        }
    }

    /// Non-2xx responses come back as data; only local failures are errors.
    pub fn request(
        &mut self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        query: &[(String, String)],
    ) -> Result<ResponseData, ClientError> {
        self.ensure_login()?;
        let url = self.endpoint_url(endpoint)?;
        debug!(%method, %url, "sending request");

        let mut response = self.build(method.clone(), &url, body, query).send()?;
        if response.status() == StatusCode::UNAUTHORIZED && matches!(self.auth, Auth::Password(_))
        {
            debug!("session rejected, logging in again");
            self.logged_in = false;
            self.ensure_login()?;
            response = self.build(method, &url, body, query).send()?;
        }

        let status = response.status().as_u16();
        let text = response.text()?;
        let json = serde_json::from_str(&text).ok();
        debug!(status, bytes = text.len(), "response received");
        Ok(ResponseData {
            status,
            body: text,
            json,
        })
    }

    fn build(
        &self,
        method: Method,
        url: &Url,
        body: Option<&Value>,
        query: &[(String, String)],
    ) -> RequestBuilder {
        let mut request = self
            .http
            .request(method, url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(USER_AGENT, HeaderValue::from_static(UA));

        match &self.auth {
            Auth::ApiKey(key) => request = request.header(AUTHORIZATION, format!("Bearer {key}")),
            Auth::Password(_) => {
                if let Some(token) = &self.csrf {
                    request = request.header(CSRF_HEADER, token);
                }
            }
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
    }

    fn ensure_login(&mut self) -> Result<(), ClientError> {
        if self.logged_in {
            return Ok(());
        }
        let Auth::Password(password) = &self.auth else {
            self.logged_in = true;
            return Ok(());
        };

        let url = self
            .root
            .join("logincheck")
            .map_err(|e| ClientError::Unexpected(e.to_string()))?;
        debug!(%url, user = %self.username, "logging in");
        let response = self
            .http
            .post(url)
            .form(&[
                ("username", self.username.as_str()),
                ("secretkey", password.as_str()),
                ("ajax", "1"),
            ])
            .send()?;

        if !response.status().is_success() {
            return Err(ClientError::Session(format!(
                "login returned HTTP {}",
                response.status().as_u16()
            )));
        }
        let token = extract_csrf(&response);
        let text = response.text()?;
        if !text.trim_start().starts_with('1') {
            return Err(ClientError::Session(format!(
                "login rejected for user `{}`",
                self.username
            )));
        }

        self.csrf = token;
        self.logged_in = true;
        Ok(())
    }

    /// Ends a password session. API-key clients have nothing to close.
    pub fn logout(&mut self) -> Result<(), ClientError> {
        if !self.logged_in || !matches!(self.auth, Auth::Password(_)) {
            return Ok(());
        }
        let url = self
            .root
            .join("logout")
            .map_err(|e| ClientError::Unexpected(e.to_string()))?;
        self.http.post(url).send()?;
        self.logged_in = false;
        self.csrf = None;
        Ok(())
    }
}

fn extract_csrf(resp: &Response) -> Option<String> {
    resp.cookies()
        .find(|c| c.name().starts_with(CSRF_COOKIE))
        .map(|c| c.value().trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn connection(server: &MockServer, auth: Auth) -> Connection {
        Connection {
            host: server.address().to_string(),
            username: "admin".into(),
            auth,
            use_ssl: false,
            verify_tls: false,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn parses_query_pairs_and_flags() {
        let params = vec!["vdom=root".to_string(), "with_meta".into(), "filter=name==h1".into()];
        assert_eq!(
            parse_query(&params),
            vec![
                ("vdom".to_string(), "root".to_string()),
                ("with_meta".to_string(), String::new()),
                ("filter".to_string(), "name==h1".to_string()),
            ]
        );
    }

    #[test]
    fn sends_bearer_token_and_query() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/cmdb/firewall/address")
                .header("Authorization", "Bearer test-key")
                .query_param("vdom", "root");
            then.status(200)
                .json_body(serde_json::json!({"status": "success", "results": []}));
        });

        let mut client = FortiClient::new(&connection(&server, Auth::ApiKey("test-key".into())))
            .unwrap();
        let query = parse_query(&["vdom=root".to_string()]);
        let response = client
            .request(Method::GET, "/cmdb/firewall/address", None, &query)
            .unwrap();

        mock.assert();
        assert_eq!(response.status, 200);
        assert_eq!(response.json.unwrap()["status"], "success");
    }

    #[test]
    fn strips_api_prefix_from_endpoint() {
        let server = MockServer::start();
        let client = FortiClient::new(&connection(&server, Auth::ApiKey("k".into()))).unwrap();
        let url = client.endpoint_url("/api/v2/monitor/system/status").unwrap();
        assert_eq!(url.path(), "/api/v2/monitor/system/status");
        let url = client.endpoint_url("cmdb/system/interface").unwrap();
        assert_eq!(url.path(), "/api/v2/cmdb/system/interface");
    }

    #[test]
    fn password_login_sends_csrf_token() {
        let server = MockServer::start();
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/logincheck")
                .x_www_form_urlencoded_tuple("username", "admin")
                .x_www_form_urlencoded_tuple("secretkey", "pw");
            then.status(200)
                .header("Set-Cookie", "ccsrftoken=\"TOKEN123\"; path=/")
                .body("1document.location=\"/ng/\";\n");
        });
        let create = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/cmdb/firewall/address")
                .header("X-CSRFTOKEN", "TOKEN123")
                .json_body(serde_json::json!({"name": "h1", "subnet": "10.1.1.1/32"}));
            then.status(200)
                .json_body(serde_json::json!({"status": "success", "mkey": "h1"}));
        });

        let mut client =
            FortiClient::new(&connection(&server, Auth::Password("pw".into()))).unwrap();
        let body = serde_json::json!({"name": "h1", "subnet": "10.1.1.1/32"});
        let (status, response) =
            client.perform_request(Method::POST, "/cmdb/firewall/address", Some(&body), &[]);

        login.assert();
        create.assert();
        assert_eq!(status, 200);
        assert_eq!(response["mkey"], "h1");
    }

    #[test]
    fn rejected_login_is_session_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/logincheck");
            then.status(200).body("0");
        });

        let mut client =
            FortiClient::new(&connection(&server, Auth::Password("bad".into()))).unwrap();
        let (status, body) =
            client.perform_request(Method::GET, "/monitor/system/status", None, &[]);
        assert_eq!(status, -2);
        assert_eq!(body["error"], "Invalid session");
    }

    #[test]
    fn unauthorized_triggers_one_relogin() {
        let server = MockServer::start();
        let login = server.mock(|when, then| {
            when.method(POST).path("/logincheck");
            then.status(200)
                .header("Set-Cookie", "ccsrftoken=\"T\"; path=/")
                .body("1");
        });
        let status = server.mock(|when, then| {
            when.method(GET).path("/api/v2/monitor/system/status");
            then.status(401).body("");
        });

        let mut client =
            FortiClient::new(&connection(&server, Auth::Password("pw".into()))).unwrap();
        let response = client
            .request(Method::GET, "/monitor/system/status", None, &[])
            .unwrap();

        assert_eq!(response.status, 401);
        login.assert_hits(2);
        status.assert_hits(2);
    }

    #[test]
    fn api_errors_are_returned_as_data() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/cmdb/firewall/missing");
            then.status(404)
                .json_body(serde_json::json!({"status": "error", "http_status": 404}));
        });

        let mut client = FortiClient::new(&connection(&server, Auth::ApiKey("k".into()))).unwrap();
        let (status, body) = client.perform_request(Method::GET, "/cmdb/firewall/missing", None, &[]);
        assert_eq!(status, 404);
        assert_eq!(body["status"], "error");
    }

    #[test]
    fn unreachable_host_maps_to_connection_error() {
        let conn = Connection {
            host: "127.0.0.1:1".into(),
            username: "admin".into(),
            auth: Auth::ApiKey("k".into()),
            use_ssl: false,
            verify_tls: false,
            timeout: Duration::from_secs(5),
        };
        let mut client = FortiClient::new(&conn).unwrap();
        let (status, body) = client.perform_request(Method::GET, "/monitor/system/status", None, &[]);
        assert_eq!(status, -1);
        assert_eq!(body["error"], "Connection failed");
        assert!(body["details"].as_str().is_some());
    }

    #[test]
    fn non_json_body_is_kept_as_text() {
        let data = ResponseData {
            status: 200,
            body: "plain".into(),
            json: None,
        };
        assert_eq!(data.into_value(), Value::String("plain".into()));
        let empty = ResponseData {
            status: 204,
            body: String::new(),
            json: None,
        };
        assert_eq!(empty.into_value(), Value::Null);
    }
}
