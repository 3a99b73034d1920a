//! In-memory stand-in for the search service's skillset API
//!
//! Keeps skillsets in a map, mints a fresh ETag on every write and enforces
//! `If-Match` / `If-None-Match` the way the real service does, so the client
//! can be exercised end to end against a `wiremock` server.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use skillset_core::SkillsetClient;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const API_KEY: &str = "test-api-key";

#[derive(Clone, Default)]
pub struct FakeSearchService {
    state: Arc<Mutex<ServiceState>>,
}

#[derive(Default)]
struct ServiceState {
    skillsets: BTreeMap<String, Value>,
    version: u64,
    resets: Vec<(String, Vec<String>)>,
}

impl FakeSearchService {
    /// Start a mock server backed by a fresh, empty service
    pub async fn start() -> (MockServer, Self) {
        let server = MockServer::start().await;
        let service = Self::default();
        Mock::given(any())
            .respond_with(service.clone())
            .with_priority(10)
            .mount(&server)
            .await;
        (server, service)
    }

    /// Client pointed at `server` with near-zero retry backoff
    pub fn client(server: &MockServer) -> SkillsetClient {
        SkillsetClient::builder()
            .endpoint(server.uri())
            .api_key(API_KEY)
            .backoff_base_ms(1)
            .build()
            .expect("client should build")
    }

    /// Store a raw document as if it had been written by another client
    pub fn seed(&self, document: Value) -> String {
        let mut state = self.state.lock().unwrap();
        let name = document["name"].as_str().unwrap().to_string();
        state.store(&name, document)
    }

    pub fn etag_of(&self, name: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.skillsets.get(name).map(|doc| doc["@odata.etag"].as_str().unwrap().to_string())
    }

    pub fn resets(&self) -> Vec<(String, Vec<String>)> {
        self.state.lock().unwrap().resets.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().skillsets.len()
    }
}

impl Respond for FakeSearchService {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.state.lock().unwrap().handle(request)
    }
}

fn error(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "error": {"code": code, "message": message}
    }))
}

fn with_etag(status: u16, document: &Value) -> ResponseTemplate {
    let etag = document["@odata.etag"].as_str().unwrap_or_default().to_string();
    let mut body = document.clone();
    body["@odata.context"] = json!("https://fake.search/$metadata#skillsets/$entity");
    ResponseTemplate::new(status)
        .insert_header("ETag", etag.as_str())
        .set_body_json(body)
}

fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

impl ServiceState {
    fn store(&mut self, name: &str, mut document: Value) -> String {
        self.version += 1;
        let etag = format!("\"0x8D{:010X}\"", self.version);

        let mut counter = 0;
        if let Some(skills) = document["skills"].as_array_mut() {
            for skill in skills {
                counter += 1;
                if skill.get("name").is_none() {
                    skill["name"] = json!(format!("#{}", counter));
                }
            }
        }
        document["@odata.etag"] = json!(etag);
        self.skillsets.insert(name.to_string(), document);
        etag
    }

    fn current_etag(&self, name: &str) -> Option<String> {
        self.skillsets
            .get(name)
            .and_then(|doc| doc["@odata.etag"].as_str())
            .map(str::to_string)
    }

    /// Evaluate conditional headers; `Some` carries the 412 response
    fn check_preconditions(&self, request: &Request, name: &str) -> Option<ResponseTemplate> {
        let current = self.current_etag(name);
        let failed = || Some(error(412, "PreconditionFailed", "The precondition given in one or more of the request-header fields evaluated to false"));

        if let Some(expected) = header(request, "if-match") {
            match &current {
                None => return failed(),
                Some(etag) if expected != "*" && expected != etag => return failed(),
                _ => {}
            }
        }
        if let Some(unexpected) = header(request, "if-none-match") {
            match &current {
                Some(_) if unexpected == "*" => return failed(),
                Some(etag) if unexpected == etag => return failed(),
                _ => {}
            }
        }
        None
    }

    fn handle(&mut self, request: &Request) -> ResponseTemplate {
        if header(request, "api-key") != Some(API_KEY) {
            return error(403, "Forbidden", "Invalid api-key");
        }
        if !request.url.query_pairs().any(|(k, _)| k == "api-version") {
            return error(400, "MissingApiVersionParameter", "api-version is required");
        }

        let path = request.url.path().to_string();
        let method = request.method.as_str().to_string();

        if path == "/skillsets" {
            return match method.as_str() {
                "GET" => self.list(request),
                "POST" => self.create(request),
                _ => error(405, "MethodNotAllowed", &method),
            };
        }

        let Some(rest) = path.strip_prefix("/skillsets('") else {
            return error(404, "ResourceNotFound", &path);
        };
        let (key, action) = match rest.split_once("')") {
            Some(parts) => parts,
            None => return error(400, "BadRequest", &path),
        };
        let name = key.replace("''", "'").replace("%20", " ");

        match (method.as_str(), action) {
            ("GET", "") => match self.skillsets.get(&name) {
                Some(doc) => with_etag(200, doc),
                None => error(404, "ResourceNotFound", &name),
            },
            ("PUT", "") => self.put(request, &name),
            ("DELETE", "") => {
                if !self.skillsets.contains_key(&name) {
                    return error(404, "ResourceNotFound", &name);
                }
                if let Some(response) = self.check_preconditions(request, &name) {
                    return response;
                }
                self.skillsets.remove(&name);
                ResponseTemplate::new(204)
            }
            ("POST", "/search.resetskills") => {
                if !self.skillsets.contains_key(&name) {
                    return error(404, "ResourceNotFound", &name);
                }
                let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();
                let skills = body["skillNames"]
                    .as_array()
                    .map(|names| {
                        names
                            .iter()
                            .filter_map(|n| n.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                self.resets.push((name, skills));
                ResponseTemplate::new(204)
            }
            _ => error(405, "MethodNotAllowed", &method),
        }
    }

    fn list(&self, request: &Request) -> ResponseTemplate {
        let names_only = request
            .url
            .query_pairs()
            .any(|(k, v)| k == "$select" && v == "name");
        let value: Vec<Value> = self
            .skillsets
            .values()
            .map(|doc| {
                if names_only {
                    json!({"name": doc["name"]})
                } else {
                    doc.clone()
                }
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({
            "@odata.context": "https://fake.search/$metadata#skillsets",
            "value": value
        }))
    }

    fn create(&mut self, request: &Request) -> ResponseTemplate {
        let document: Value = match serde_json::from_slice(&request.body) {
            Ok(doc) => doc,
            Err(e) => return error(400, "BadRequest", &e.to_string()),
        };
        let Some(name) = document["name"].as_str().map(str::to_string) else {
            return error(400, "BadRequest", "name is required");
        };
        if self.skillsets.contains_key(&name) {
            return error(409, "Conflict", &format!("Skillset '{}' already exists", name));
        }
        self.store(&name, document);
        with_etag(201, &self.skillsets[&name])
    }

    fn put(&mut self, request: &Request, name: &str) -> ResponseTemplate {
        if let Some(response) = self.check_preconditions(request, name) {
            return response;
        }
        let document: Value = match serde_json::from_slice(&request.body) {
            Ok(doc) => doc,
            Err(e) => return error(400, "BadRequest", &e.to_string()),
        };
        if document["name"].as_str() != Some(name) {
            return error(400, "BadRequest", "name in body does not match the URL");
        }
        let existed = self.skillsets.contains_key(name);
        self.store(name, document);
        with_etag(if existed { 200 } else { 201 }, &self.skillsets[name])
    }
}
