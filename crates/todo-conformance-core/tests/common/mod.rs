// crates/todo-conformance-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: In-memory simulation of the remote todo API.
// Purpose: Run the full scenario suite without a network.
// Dependencies: todo-conformance-core, base64, serde_json, url
// ============================================================================

//! ## Overview
//! [`SimulatedTodoService`] implements [`Transport`] and answers requests the
//! way the public todo API does: per-session todo lists, content negotiation,
//! restore endpoints, heartbeat status codes, and token-gated notes. Every
//! request that completes a challenge flips its flag, so a clean run leaves
//! every flag true. Faults can be injected per method and path.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]
#![allow(dead_code, reason = "Each test binary uses a subset of the shared helpers.")]

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use todo_conformance_core::ApiClient;
use todo_conformance_core::CancelToken;
use todo_conformance_core::EventSink;
use todo_conformance_core::HttpMethod;
use todo_conformance_core::HttpRequest;
use todo_conformance_core::HttpResponse;
use todo_conformance_core::RunEvent;
use todo_conformance_core::Transport;
use todo_conformance_core::TransportError;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Base URL every simulated client uses.
pub const BASE_URL: &str = "http://todos.test/api/";

/// Challenges tracked by the simulated service.
pub const CHALLENGES: [&str; 59] = [
    "CREATE_NEW_CHALLENGER",
    "GET_CHALLENGES",
    "GET_TODOS",
    "GET_TODO_404",
    "GET_TODO",
    "GET_TODOS_NOT_FOUND",
    "GET_TODOS_FILTERED",
    "HEAD_TODOS",
    "POST_TODOS",
    "POST_TODOS_BAD_DONE_STATUS",
    "POST_TODOS_TOO_LONG_TITLE_LENGTH",
    "POST_TODOS_TOO_LONG_DESCRIPTION_LENGTH",
    "POST_MAX_OUT_TITLE_DESCRIPTION_LENGTH",
    "POST_TODOS_TOO_LONG_PAYLOAD_SIZE",
    "POST_TODOS_INVALID_EXTRA_FIELD",
    "PUT_TODOS_400",
    "POST_UPDATE_TODO",
    "POST_TODOS_404",
    "PUT_TODOS_FULL_200",
    "PUT_TODOS_PARTIAL_200",
    "PUT_TODOS_MISSING_TITLE_400",
    "PUT_TODOS_400_NO_AMEND_ID",
    "DELETE_A_TODO",
    "OPTIONS_TODOS",
    "GET_ACCEPT_XML",
    "GET_ACCEPT_JSON",
    "GET_ACCEPT_ANY_DEFAULT_JSON",
    "GET_ACCEPT_XML_PREFERRED",
    "GET_JSON_BY_DEFAULT_NO_ACCEPT",
    "GET_UNSUPPORTED_ACCEPT_406",
    "POST_CREATE_XML",
    "POST_CREATE_JSON",
    "POST_TODOS_415",
    "GET_RESTORABLE_CHALLENGER_PROGRESS_STATUS",
    "PUT_RESTORABLE_CHALLENGER_PROGRESS_STATUS",
    "PUT_NEW_RESTORED_CHALLENGER_PROGRESS_STATUS",
    "GET_RESTORABLE_TODOS",
    "PUT_RESTORABLE_TODOS",
    "POST_CREATE_XML_ACCEPT_JSON",
    "POST_CREATE_JSON_ACCEPT_XML",
    "DELETE_HEARTBEAT_405",
    "PATCH_HEARTBEAT_500",
    "TRACE_HEARTBEAT_501",
    "GET_HEARTBEAT_204",
    "OVERRIDE_DELETE_HEARTBEAT_405",
    "OVERRIDE_PATCH_HEARTBEAT_500",
    "OVERRIDE_TRACE_HEARTBEAT_501",
    "CREATE_SECRET_TOKEN_401",
    "CREATE_SECRET_TOKEN_201",
    "GET_SECRET_NOTE_403",
    "GET_SECRET_NOTE_401",
    "GET_SECRET_NOTE_200",
    "POST_SECRET_NOTE_200",
    "POST_SECRET_NOTE_401",
    "POST_SECRET_NOTE_403",
    "GET_SECRET_NOTE_BEARER_200",
    "POST_SECRET_NOTE_BEARER_200",
    "DELETE_ALL_TODOS",
    "POST_ALL_TODOS",
];

const MAX_TITLE_CHARS: usize = 50;
const MAX_DESCRIPTION_CHARS: usize = 200;
const MAX_BODY_BYTES: usize = 5000;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Injected misbehavior.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Answer `method path` with `status` and an empty body.
    Status {
        /// Matched method.
        method: HttpMethod,
        /// Matched path relative to the base URL.
        path: String,
        /// Status to return.
        status: u16,
    },
    /// Fail `method path` at the transport level.
    Drop {
        /// Matched method.
        method: HttpMethod,
        /// Matched path relative to the base URL.
        path: String,
    },
    /// Rewrite the body text of answers to `method` under `prefix`.
    RewriteBody {
        /// Matched method.
        method: HttpMethod,
        /// Matched path prefix relative to the base URL.
        prefix: String,
        /// Body rewrite.
        rewrite: fn(&str) -> String,
    },
    /// Assign new todos the lowest id already in the session.
    ReuseIds,
    /// Store created titles through `rewrite` while echoing the request.
    StoredTitle {
        /// Title rewrite.
        rewrite: fn(&str) -> String,
    },
}

/// Simulation knobs.
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Issue sessions without the `x-challenger` header.
    pub omit_token: bool,
    /// Todos present in a new session.
    pub seed_todos: usize,
    /// Per-session todo ceiling.
    pub max_todos: usize,
    /// Injected faults.
    pub faults: Vec<Fault>,
    /// Cancels the token the first time the path is requested.
    pub cancel_on: Option<(String, CancelToken)>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            omit_token: false,
            seed_todos: 10,
            max_todos: 20,
            faults: Vec::new(),
            cancel_on: None,
        }
    }
}

impl SimOptions {
    /// Returns true when created todos take an existing id.
    fn reuses_ids(&self) -> bool {
        self.faults.iter().any(|fault| matches!(fault, Fault::ReuseIds))
    }

    /// Returns the title to store for a created todo.
    fn stored_title(&self, title: &str) -> String {
        self.faults
            .iter()
            .find_map(|fault| match fault {
                Fault::StoredTitle {
                    rewrite,
                } => Some(rewrite(title)),
                _ => None,
            })
            .unwrap_or_else(|| title.to_string())
    }

    /// Applies every matching body rewrite to `response`.
    fn rewrite_body(&self, method: HttpMethod, path: &str, response: HttpResponse) -> HttpResponse {
        self.faults.iter().fold(response, |response, fault| match fault {
            Fault::RewriteBody {
                method: target,
                prefix,
                rewrite,
            } if *target == method && path.starts_with(prefix.as_str()) => {
                let body = rewrite(&response.body_text());
                HttpResponse {
                    body: body.into_bytes(),
                    ..response
                }
            }
            _ => response,
        })
    }
}

// ============================================================================
// SECTION: Service State
// ============================================================================

#[derive(Debug, Clone)]
struct SimTodo {
    title: String,
    description: String,
    done_status: bool,
}

#[derive(Debug)]
struct SimSession {
    todos: BTreeMap<u64, SimTodo>,
    next_id: u64,
    flags: BTreeMap<String, bool>,
    auth_token: Option<String>,
    note: String,
}

impl SimSession {
    fn new(seed_todos: usize) -> Self {
        let mut todos = BTreeMap::new();
        for index in 1 ..= seed_todos {
            todos.insert(
                index as u64,
                SimTodo {
                    title: format!("seed todo {index}"),
                    description: String::new(),
                    done_status: false,
                },
            );
        }
        let mut flags: BTreeMap<String, bool> =
            CHALLENGES.iter().map(|name| ((*name).to_string(), false)).collect();
        flags.insert("CREATE_NEW_CHALLENGER".to_string(), true);
        Self {
            todos,
            next_id: seed_todos as u64 + 1,
            flags,
            auth_token: None,
            note: String::new(),
        }
    }

    fn complete(&mut self, challenge: &str) {
        self.flags.insert(challenge.to_string(), true);
    }
}

#[derive(Debug, Default)]
struct SimState {
    sessions: HashMap<String, SimSession>,
    issued: u64,
}

// ============================================================================
// SECTION: Simulated Service
// ============================================================================

/// In-memory todo API.
pub struct SimulatedTodoService {
    options: SimOptions,
    state: Mutex<SimState>,
    log: Mutex<Vec<(HttpMethod, String, u16)>>,
}

impl SimulatedTodoService {
    /// Creates a service with default options.
    pub fn new() -> Self {
        Self::with_options(SimOptions::default())
    }

    /// Creates a service with `options`.
    pub fn with_options(options: SimOptions) -> Self {
        Self {
            options,
            state: Mutex::new(SimState::default()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Returns every answered request as `(method, path, status)`.
    pub fn requests(&self) -> Vec<(HttpMethod, String, u16)> {
        self.log.lock().unwrap().clone()
    }

    /// Returns the number of todos held by `token`'s session.
    pub fn todo_count(&self, token: &str) -> usize {
        self.state.lock().unwrap().sessions.get(token).map_or(0, |session| session.todos.len())
    }

    /// Returns the challenge flags for `token`'s session.
    pub fn flags(&self, token: &str) -> BTreeMap<String, bool> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .get(token)
            .map(|session| session.flags.clone())
            .unwrap_or_default()
    }

    /// Returns the number of sessions issued.
    pub fn sessions_issued(&self) -> u64 {
        self.state.lock().unwrap().issued
    }
}

impl Transport for SimulatedTodoService {
    fn send(&self, url: &Url, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = url.path().strip_prefix("/api/").unwrap_or(url.path()).to_string();
        if let Some((target, token)) = &self.options.cancel_on {
            if *target == path {
                token.cancel();
            }
        }
        for fault in &self.options.faults {
            match fault {
                Fault::Status {
                    method,
                    path: target,
                    status,
                } if *method == request.method && *target == path => {
                    self.log.lock().unwrap().push((request.method, path, *status));
                    return Ok(HttpResponse::new(*status));
                }
                Fault::Drop {
                    method,
                    path: target,
                } if *method == request.method && *target == path => {
                    return Err(TransportError::Request("connection reset by peer".to_string()));
                }
                _ => {}
            }
        }
        let query: Vec<(String, String)> =
            url.query_pairs().map(|(key, value)| (key.into_owned(), value.into_owned())).collect();
        let response = self.state.lock().unwrap().handle(&self.options, request, &path, &query);
        let response = self.options.rewrite_body(request.method, &path, response);
        self.log.lock().unwrap().push((request.method, path, response.status));
        Ok(response)
    }
}

/// Builds a client for `service`.
pub fn client(service: &Arc<SimulatedTodoService>) -> ApiClient {
    ApiClient::new(BASE_URL, Arc::clone(service) as Arc<dyn Transport>).unwrap()
}

// ============================================================================
// SECTION: Event Capture
// ============================================================================

/// Sink that keeps every event in memory.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<(usize, RunEvent)>>,
}

impl CollectingSink {
    /// Returns the captured events in arrival order.
    pub fn events(&self) -> Vec<(usize, RunEvent)> {
        self.events.lock().unwrap().clone()
    }

    /// Returns the captured event names for `session`.
    pub fn names(&self, session: usize) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(index, _)| *index == session)
            .map(|(_, event)| event.name())
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn record(&self, session: usize, event: &RunEvent) {
        self.events.lock().unwrap().push((session, event.clone()));
    }
}

// ============================================================================
// SECTION: Responses
// ============================================================================

fn empty(status: u16) -> HttpResponse {
    HttpResponse::new(status)
}

fn json_response(status: u16, body: &Value) -> HttpResponse {
    HttpResponse::new(status)
        .with_header("Content-Type", "application/json")
        .with_body(body.to_string())
}

fn xml_response(status: u16, body: String) -> HttpResponse {
    HttpResponse::new(status).with_header("Content-Type", "application/xml").with_body(body)
}

fn error(status: u16, message: impl Into<String>) -> HttpResponse {
    json_response(status, &json!({"errorMessages": [message.into()]}))
}

fn todo_json(id: u64, todo: &SimTodo) -> Value {
    json!({
        "id": id,
        "title": todo.title,
        "doneStatus": todo.done_status,
        "description": todo.description,
    })
}

fn escape(value: &str) -> String {
    value.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn todo_xml(id: u64, todo: &SimTodo) -> String {
    format!(
        "<todo><id>{id}</id><title>{}</title><doneStatus>{}</doneStatus><description>{}</description></todo>",
        escape(&todo.title),
        todo.done_status,
        escape(&todo.description)
    )
}

// ============================================================================
// SECTION: Negotiation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Xml,
}

fn essence(value: &str) -> String {
    value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

fn accept_format(request: &HttpRequest) -> Option<Format> {
    let Some(accept) = request.header_value("accept").filter(|value| !value.trim().is_empty()) else {
        return Some(Format::Json);
    };
    accept.split(',').find_map(|range| match essence(range).as_str() {
        "application/json" | "*/*" => Some(Format::Json),
        "application/xml" => Some(Format::Xml),
        _ => None,
    })
}

fn content_format(request: &HttpRequest) -> Result<Format, String> {
    let Some(value) = request.header_value("content-type").filter(|value| !value.trim().is_empty())
    else {
        return Ok(Format::Json);
    };
    match essence(value).as_str() {
        "application/json" => Ok(Format::Json),
        "application/xml" => Ok(Format::Xml),
        _ => Err(value.to_string()),
    }
}

/// Extracts `<tag>` fields from a flat XML todo document.
fn parse_xml(body: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    for tag in ["title", "description", "doneStatus"] {
        let open = format!("<{tag}>");
        let close = format!("</{tag}>");
        if let (Some(start), Some(end)) = (body.find(&open), body.find(&close)) {
            let text = body[start + open.len() .. end]
                .replace("&lt;", "<")
                .replace("&gt;", ">")
                .replace("&quot;", "\"")
                .replace("&apos;", "'")
                .replace("&amp;", "&");
            let value = match (tag, text.as_str()) {
                ("doneStatus", "true") => Value::Bool(true),
                ("doneStatus", "false") => Value::Bool(false),
                _ => Value::String(text),
            };
            fields.insert(tag.to_string(), value);
        }
    }
    fields
}

const fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Bool(_) => "BOOLEAN",
        Value::Number(_) => "NUMBER",
        Value::String(_) => "STRING",
        Value::Array(_) => "ARRAY",
        Value::Object(_) => "OBJECT",
    }
}

/// Validates submitted fields, returning the flag and message of the first violation.
fn validate_fields(fields: &Map<String, Value>) -> Result<(), (&'static str, String)> {
    for key in fields.keys() {
        if !["title", "description", "doneStatus"].contains(&key.as_str()) {
            return Err(("POST_TODOS_INVALID_EXTRA_FIELD", format!("Could not find field: {key}")));
        }
    }
    for (field, expected) in [("doneStatus", "BOOLEAN"), ("title", "STRING"), ("description", "STRING")] {
        if let Some(value) = fields.get(field) {
            let actual = type_label(value);
            if actual != expected {
                return Err((
                    "POST_TODOS_BAD_DONE_STATUS",
                    format!("Failed Validation: {field} should be {expected} but was {actual}"),
                ));
            }
        }
    }
    for (field, max, flag) in [
        ("title", MAX_TITLE_CHARS, "POST_TODOS_TOO_LONG_TITLE_LENGTH"),
        ("description", MAX_DESCRIPTION_CHARS, "POST_TODOS_TOO_LONG_DESCRIPTION_LENGTH"),
    ] {
        let length = fields.get(field).and_then(Value::as_str).map_or(0, |text| text.chars().count());
        if length > max {
            return Err((
                flag,
                format!(
                    "Failed Validation: Maximum allowable length exceeded for {field} - maximum \
                     allowed is {max}"
                ),
            ));
        }
    }
    Ok(())
}

fn text_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields.get(name).and_then(Value::as_str).map(str::to_string)
}

// ============================================================================
// SECTION: Routing
// ============================================================================

impl SimState {
    fn handle(
        &mut self,
        options: &SimOptions,
        request: &HttpRequest,
        path: &str,
        query: &[(String, String)],
    ) -> HttpResponse {
        let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
        match (request.method, segments.as_slice()) {
            (HttpMethod::Post, ["challenger"]) => return self.create_session(options),
            (_, ["challenger", "database", token]) => {
                let Some(session) = self.sessions.get_mut(*token) else {
                    return empty(404);
                };
                return database(session, request);
            }
            (_, ["challenger", token]) => {
                let Some(session) = self.sessions.get_mut(*token) else {
                    return empty(404);
                };
                return progress(session, token, request);
            }
            _ => {}
        }
        let Some(token) = request.header_value("x-challenger") else {
            return empty(401);
        };
        let Some(session) = self.sessions.get_mut(token) else {
            return empty(401);
        };
        match (request.method, segments.as_slice()) {
            (HttpMethod::Get, ["challenges"]) => {
                session.complete("GET_CHALLENGES");
                let challenges: Vec<Value> =
                    CHALLENGES.iter().map(|name| json!({"name": name})).collect();
                json_response(200, &json!({"challenges": challenges}))
            }
            (HttpMethod::Get, ["todos"]) => list_todos(session, request, query),
            (HttpMethod::Head, ["todos"]) => {
                session.complete("HEAD_TODOS");
                HttpResponse::new(200).with_header("Content-Type", "application/json")
            }
            (HttpMethod::Options, ["todos"]) => {
                session.complete("OPTIONS_TODOS");
                HttpResponse::new(200).with_header("Allow", "OPTIONS, GET, HEAD, POST")
            }
            (HttpMethod::Post, ["todos"]) => create_todo(session, options, request, token),
            (HttpMethod::Get, ["todo"]) => {
                session.complete("GET_TODO_404");
                empty(404)
            }
            (method, ["todos", id]) => {
                let id = id.parse::<u64>().unwrap_or(0);
                match method {
                    HttpMethod::Get => get_todo(session, id),
                    HttpMethod::Post => amend_todo(session, request, id),
                    HttpMethod::Put => replace_todo(session, request, id),
                    HttpMethod::Delete => delete_todo(session, id),
                    _ => empty(405),
                }
            }
            (method, ["heartbeat"]) => heartbeat(session, request, method),
            (HttpMethod::Post, ["secret", "token"]) => issue_token(session, request, token),
            (method, ["secret", "note"]) => note(session, request, method),
            _ => empty(404),
        }
    }

    fn create_session(&mut self, options: &SimOptions) -> HttpResponse {
        self.issued += 1;
        let token = format!("sim-session-{}", self.issued);
        self.sessions.insert(token.clone(), SimSession::new(options.seed_todos));
        if options.omit_token {
            empty(201)
        } else {
            HttpResponse::new(201).with_header("X-Challenger", token)
        }
    }
}

// ============================================================================
// SECTION: Todo Handlers
// ============================================================================

fn list_todos(session: &mut SimSession, request: &HttpRequest, query: &[(String, String)]) -> HttpResponse {
    let Some(format) = accept_format(request) else {
        session.complete("GET_UNSUPPORTED_ACCEPT_406");
        return error(406, "Unrecognised Accept Type");
    };
    let flag = match request.header_value("accept").map(str::trim) {
        None => "GET_TODOS",
        Some("") => "GET_JSON_BY_DEFAULT_NO_ACCEPT",
        Some("application/xml") => "GET_ACCEPT_XML",
        Some("application/json") => "GET_ACCEPT_JSON",
        Some("*/*") => "GET_ACCEPT_ANY_DEFAULT_JSON",
        Some(_) => "GET_ACCEPT_XML_PREFERRED",
    };
    session.complete(flag);
    let done_filter = query
        .iter()
        .find(|(key, _)| key == "doneStatus")
        .map(|(_, value)| value == "true");
    if done_filter.is_some() {
        session.complete("GET_TODOS_FILTERED");
    }
    let todos = session
        .todos
        .iter()
        .filter(|(_, todo)| done_filter.is_none_or(|done| todo.done_status == done));
    match format {
        Format::Json => {
            let items: Vec<Value> = todos.map(|(id, todo)| todo_json(*id, todo)).collect();
            json_response(200, &json!({"todos": items}))
        }
        Format::Xml => {
            let items: String = todos.map(|(id, todo)| todo_xml(*id, todo)).collect();
            xml_response(200, format!("<todos>{items}</todos>"))
        }
    }
}

fn get_todo(session: &mut SimSession, id: u64) -> HttpResponse {
    match session.todos.get(&id) {
        Some(todo) => {
            let body = json!({"todos": [todo_json(id, todo)]});
            session.complete("GET_TODO");
            json_response(200, &body)
        }
        None => {
            session.complete("GET_TODOS_NOT_FOUND");
            error(404, format!("Could not find an instance with todos/{id}"))
        }
    }
}

fn create_todo(
    session: &mut SimSession,
    options: &SimOptions,
    request: &HttpRequest,
    token: &str,
) -> HttpResponse {
    let request_format = match content_format(request) {
        Ok(format) => format,
        Err(value) => {
            session.complete("POST_TODOS_415");
            return error(415, format!("Unsupported Content Type - {value}"));
        }
    };
    let Some(response_format) = accept_format(request) else {
        return error(406, "Unrecognised Accept Type");
    };
    let body = request.body.clone().unwrap_or_default();
    if body.len() > MAX_BODY_BYTES {
        session.complete("POST_TODOS_TOO_LONG_PAYLOAD_SIZE");
        return error(413, format!("Error: Request body too large, max allowed is {MAX_BODY_BYTES} bytes"));
    }
    let text = String::from_utf8_lossy(&body);
    let fields = match request_format {
        Format::Json => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(fields)) => fields,
            _ => return error(400, "Invalid JSON"),
        },
        Format::Xml => parse_xml(&text),
    };
    if let Err((flag, message)) = validate_fields(&fields) {
        session.complete(flag);
        return error(400, message);
    }
    let Some(title) = text_field(&fields, "title") else {
        return error(400, "title : field is mandatory");
    };
    if session.todos.len() >= options.max_todos {
        session.complete("POST_ALL_TODOS");
        return error(
            400,
            format!("ERROR: Cannot add instance, maximum limit of {} reached", options.max_todos),
        );
    }
    let todo = SimTodo {
        title,
        description: text_field(&fields, "description").unwrap_or_default(),
        done_status: fields.get("doneStatus").and_then(Value::as_bool).unwrap_or(false),
    };
    let reused = session.todos.keys().next().copied().filter(|_| options.reuses_ids());
    let id = reused.unwrap_or(session.next_id);
    if reused.is_none() {
        session.next_id += 1;
    }

    session.complete("POST_TODOS");
    if todo.title.chars().count() == MAX_TITLE_CHARS
        && todo.description.chars().count() == MAX_DESCRIPTION_CHARS
    {
        session.complete("POST_MAX_OUT_TITLE_DESCRIPTION_LENGTH");
    }
    let explicit_accept = request.header_value("accept").is_some();
    match (request_format, response_format, explicit_accept) {
        (Format::Xml, _, false) => session.complete("POST_CREATE_XML"),
        (Format::Json, _, false) => session.complete("POST_CREATE_JSON"),
        (Format::Xml, Format::Json, true) => session.complete("POST_CREATE_XML_ACCEPT_JSON"),
        (Format::Json, Format::Xml, true) => session.complete("POST_CREATE_JSON_ACCEPT_XML"),
        _ => {}
    }

    let response = match response_format {
        Format::Json => json_response(201, &todo_json(id, &todo)),
        Format::Xml => xml_response(201, todo_xml(id, &todo)),
    };
    let stored = SimTodo {
        title: options.stored_title(&todo.title),
        ..todo
    };
    session.todos.insert(id, stored);
    response.with_header("X-Challenger", token)
}

fn request_fields(request: &HttpRequest) -> Option<Map<String, Value>> {
    let body = request.body.as_deref().unwrap_or_default();
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Some(fields),
        _ => None,
    }
}

fn amend_todo(session: &mut SimSession, request: &HttpRequest, id: u64) -> HttpResponse {
    if !session.todos.contains_key(&id) {
        session.complete("POST_TODOS_404");
        return error(404, format!("No such todo entity instance with id == {id} found"));
    }
    let Some(fields) = request_fields(request) else {
        return error(400, "Invalid JSON");
    };
    if let Err((_, message)) = validate_fields(&fields) {
        return error(400, message);
    }
    let Some(todo) = session.todos.get_mut(&id) else {
        return empty(404);
    };
    if let Some(title) = text_field(&fields, "title") {
        todo.title = title;
    }
    if let Some(description) = text_field(&fields, "description") {
        todo.description = description;
    }
    if let Some(done) = fields.get("doneStatus").and_then(Value::as_bool) {
        todo.done_status = done;
    }
    let body = todo_json(id, todo);
    session.complete("POST_UPDATE_TODO");
    json_response(200, &body)
}

fn replace_todo(session: &mut SimSession, request: &HttpRequest, id: u64) -> HttpResponse {
    if !session.todos.contains_key(&id) {
        session.complete("PUT_TODOS_400");
        return error(400, "Cannot create todo with PUT due to Auto fields id");
    }
    let Some(mut fields) = request_fields(request) else {
        return error(400, "Invalid JSON");
    };
    if let Some(body_id) = fields.remove("id") {
        let body_id = body_id.as_u64().or_else(|| body_id.as_str().and_then(|text| text.parse().ok()));
        if body_id != Some(id) {
            session.complete("PUT_TODOS_400_NO_AMEND_ID");
            let shown = body_id.map_or_else(String::new, |value| value.to_string());
            return error(400, format!("Can not amend id from {id} to {shown}"));
        }
    }
    if let Err((_, message)) = validate_fields(&fields) {
        return error(400, message);
    }
    let Some(title) = text_field(&fields, "title") else {
        session.complete("PUT_TODOS_MISSING_TITLE_400");
        return error(400, "title : field is mandatory");
    };
    let partial = fields.len() == 1;
    let todo = SimTodo {
        title,
        description: text_field(&fields, "description").unwrap_or_default(),
        done_status: fields.get("doneStatus").and_then(Value::as_bool).unwrap_or(false),
    };
    let body = todo_json(id, &todo);
    session.todos.insert(id, todo);
    session.complete(if partial { "PUT_TODOS_PARTIAL_200" } else { "PUT_TODOS_FULL_200" });
    json_response(200, &body)
}

fn delete_todo(session: &mut SimSession, id: u64) -> HttpResponse {
    if session.todos.remove(&id).is_none() {
        return error(404, format!("Could not find any instances with todos/{id}"));
    }
    session.complete("DELETE_A_TODO");
    if session.todos.is_empty() {
        session.complete("DELETE_ALL_TODOS");
    }
    empty(200)
}

// ============================================================================
// SECTION: Restore Handlers
// ============================================================================

fn challenger_document(session: &SimSession, token: &str) -> Value {
    json!({
        "xChallenger": token,
        "xAuthToken": session.auth_token.clone().unwrap_or_default(),
        "secretNote": session.note,
        "challengeStatus": session.flags,
    })
}

fn progress(session: &mut SimSession, token: &str, request: &HttpRequest) -> HttpResponse {
    match request.method {
        HttpMethod::Get => {
            session.complete("GET_RESTORABLE_CHALLENGER_PROGRESS_STATUS");
            json_response(200, &challenger_document(session, token))
        }
        HttpMethod::Put => {
            let Some(fields) = request_fields(request) else {
                return error(400, "Invalid JSON");
            };
            if fields.get("xChallenger").and_then(Value::as_str) != Some(token) {
                return error(400, "xChallenger does not match the session");
            }
            if let Some(status) = fields.get("challengeStatus").and_then(Value::as_object) {
                for (name, done) in status {
                    if done.as_bool() == Some(true) {
                        session.complete(name);
                    }
                }
            }
            session.complete("PUT_RESTORABLE_CHALLENGER_PROGRESS_STATUS");
            json_response(200, &challenger_document(session, token))
        }
        _ => empty(405),
    }
}

fn database(session: &mut SimSession, request: &HttpRequest) -> HttpResponse {
    match request.method {
        HttpMethod::Get => {
            session.complete("GET_RESTORABLE_TODOS");
            let items: Vec<Value> =
                session.todos.iter().map(|(id, todo)| todo_json(*id, todo)).collect();
            json_response(200, &json!({"todos": items}))
        }
        HttpMethod::Put => {
            let Some(fields) = request_fields(request) else {
                return error(400, "Invalid JSON");
            };
            let items = fields.get("todos").and_then(Value::as_array).cloned().unwrap_or_default();
            let mut todos = BTreeMap::new();
            for item in items {
                let Some(id) = item.get("id").and_then(Value::as_u64) else {
                    return error(400, "todo id missing");
                };
                todos.insert(
                    id,
                    SimTodo {
                        title: item.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
                        description: item
                            .get("description")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        done_status: item.get("doneStatus").and_then(Value::as_bool).unwrap_or(false),
                    },
                );
            }
            let highest = todos.keys().next_back().copied().unwrap_or(0);
            session.next_id = session.next_id.max(highest + 1);
            session.todos = todos;
            session.complete("PUT_RESTORABLE_TODOS");
            empty(204)
        }
        _ => empty(405),
    }
}

// ============================================================================
// SECTION: Status and Auth Handlers
// ============================================================================

fn heartbeat(session: &mut SimSession, request: &HttpRequest, method: HttpMethod) -> HttpResponse {
    let overridden = request.header_value("x-http-method-override");
    match (method, overridden) {
        (HttpMethod::Get, None) => {
            session.complete("GET_HEARTBEAT_204");
            empty(204)
        }
        (HttpMethod::Delete, None) => {
            session.complete("DELETE_HEARTBEAT_405");
            empty(405)
        }
        (HttpMethod::Patch, None) => {
            session.complete("PATCH_HEARTBEAT_500");
            empty(500)
        }
        (HttpMethod::Trace, None) => {
            session.complete("TRACE_HEARTBEAT_501");
            empty(501)
        }
        (HttpMethod::Post, Some("DELETE")) => {
            session.complete("OVERRIDE_DELETE_HEARTBEAT_405");
            empty(405)
        }
        (HttpMethod::Post, Some("PATCH")) => {
            session.complete("OVERRIDE_PATCH_HEARTBEAT_500");
            empty(500)
        }
        (HttpMethod::Post, Some("TRACE")) => {
            session.complete("OVERRIDE_TRACE_HEARTBEAT_501");
            empty(501)
        }
        _ => empty(405),
    }
}

fn issue_token(session: &mut SimSession, request: &HttpRequest, token: &str) -> HttpResponse {
    let expected = format!("Basic {}", STANDARD.encode("admin:password"));
    if request.header_value("authorization") != Some(expected.as_str()) {
        session.complete("CREATE_SECRET_TOKEN_401");
        return empty(401);
    }
    let auth_token = format!("auth-{token}");
    session.auth_token = Some(auth_token.clone());
    session.complete("CREATE_SECRET_TOKEN_201");
    HttpResponse::new(201).with_header("X-AUTH-TOKEN", auth_token)
}

fn note(session: &mut SimSession, request: &HttpRequest, method: HttpMethod) -> HttpResponse {
    let header_token = request.header_value("x-auth-token");
    let bearer_token =
        request.header_value("authorization").and_then(|value| value.strip_prefix("Bearer "));
    let verb = match method {
        HttpMethod::Get => "GET",
        HttpMethod::Post => "POST",
        _ => return empty(405),
    };
    let Some(presented) = header_token.or(bearer_token) else {
        session.complete(&format!("{verb}_SECRET_NOTE_401"));
        return empty(401);
    };
    if session.auth_token.as_deref() != Some(presented) {
        session.complete(&format!("{verb}_SECRET_NOTE_403"));
        return empty(403);
    }
    if method == HttpMethod::Post {
        let Some(text) = request_fields(request).and_then(|fields| text_field(&fields, "note")) else {
            return error(400, "note missing");
        };
        session.note = text;
    }
    if header_token.is_some() {
        session.complete(&format!("{verb}_SECRET_NOTE_200"));
    }
    if bearer_token.is_some() {
        session.complete(&format!("{verb}_SECRET_NOTE_BEARER_200"));
    }
    json_response(200, &json!({"note": session.note}))
}
