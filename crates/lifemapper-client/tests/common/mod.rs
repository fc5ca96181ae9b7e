//! In-process Lifemapper mock server
//!
//! Binds an ephemeral port, serves from a background thread with its own
//! tokio runtime and records every request it receives.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};

pub const SESSION_COOKIE: &str = "LMSESSION=s3cr3t";

pub const CURRENT_VERSIONS: &str = "<clients>\
    <client><name>lmClientLib</name>\
    <versions><minimum>1.0.0</minimum><current>3.0.1 release</current></versions>\
    </client></clients>";

/// A request as seen by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

struct MockState {
    versions: String,
    log: Mutex<Vec<RecordedRequest>>,
}

pub struct MockServer {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockServer {
    pub fn start() -> Self {
        Self::with_versions(CURRENT_VERSIONS)
    }

    pub fn with_versions(versions: &str) -> Self {
        let state = Arc::new(MockState {
            versions: versions.to_string(),
            log: Mutex::new(Vec::new()),
        });

        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();

        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                axum::serve(listener, app).await
            })
            .unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.log.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

fn xml(body: impl Into<String>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        body.into(),
    )
        .into_response()
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let recorded = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: headers.clone(),
        body: body.clone(),
    };
    state.log.lock().unwrap().push(recorded);

    match uri.path() {
        "/clients/versions.xml" => xml(state.versions.clone()),
        "/login" => (
            StatusCode::OK,
            [(header::SET_COOKIE, format!("{}; Path=/", SESSION_COOKIE))],
            "<login>ok</login>",
        )
            .into_response(),
        "/logout" => xml("<logout>ok</logout>"),
        "/services/sdm/layers/count" | "/count" => {
            xml("<response><items><itemCount>42</itemCount></items></response>")
        }
        "/count/missing" => xml("<response><items><item>1</item></items></response>"),
        "/count/bare" => xml("<items><itemCount>42</itemCount></items>"),
        "/services/sdm/layers" | "/list/many" => xml(
            "<response><items><itemCount>3</itemCount>\
             <item><id>1</id></item><item><id>2</id></item><item><id>3</id></item>\
             </items></response>",
        ),
        "/list/one" => {
            xml("<response><items><item><id>7</id><name>bio1</name></item></items></response>")
        }
        "/list/pretty" => xml(
            "<?xml version=\"1.0\"?>\n<response>\n  <items>\n    <itemCount>2</itemCount>\n    \
             <item>\n      <id> 4 </id>\n    </item>\n    <item><id>5</id></item>\n  </items>\n\
             </response>\n",
        ),
        "/list/none" => xml("<response><status>empty</status></response>"),
        "/list/empty" => xml("<response><items/></response>"),
        "/broken" => xml("<items><item>1</item>"),
        "/whoami" => {
            let cookie = headers
                .get(header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            xml(format!("<session><cookie>{}</cookie></session>", cookie))
        }
        "/error" => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header(HeaderName::from_static("error-message"), "Layer 12 not found")
            .body(Body::from("not found"))
            .unwrap(),
        "/fail" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "/echo" => xml(format!(
            "<echo><query><![CDATA[{}]]></query><body><![CDATA[{}]]></body></echo>",
            uri.query().unwrap_or(""),
            body
        )),
        _ => xml("<ok/>"),
    }
}
