//! In-process stand-in for the Gist service
//!
//! A stateful `wiremock` responder implementing the subset of the Gist API
//! the client uses: ids and versions are assigned from counters, so a run
//! is deterministic. Responses carry the same kind of volatile headers the
//! real service sends (rate-limit counters, request ids, etags).

#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const PUBLIC_GIST_ID: &str = "d51de2311dfd92dfa56feb3e3f9f96a6";
pub const PUBLIC_GIST_DESCRIPTION: &str = "Workaround for https://youtrack.jetbrains.com/issue/IDEA-171273 (use https://github.com/dkandalov/live-plugin to run the code snippet)";
pub const PUBLIC_GIST_FILE: &str = "plugin.kts";
pub const PUBLIC_GIST_CONTENT: &str = "import com.intellij.openapi.actionSystem.*

val newElementActionGroup = ActionManager.getInstance().getAction(IdeActions.GROUP_NEW) as DefaultActionGroup
val newKotlinFileAction = ActionManager.getInstance().getAction(\"Kotlin.NewFile\") as AnAction

newElementActionGroup.remove(newKotlinFileAction)
newElementActionGroup.add(newKotlinFileAction, Constraints.FIRST)
";
/// Newest first
pub const PUBLIC_GIST_VERSIONS: [&str; 2] = [
    "a6e4e0c2fe4664ce76c2cb5b5d22c60b3b484e70",
    "d4375bcd40b8a241ba656c8162de1cfe478f7db0",
];

struct Revision {
    version: String,
    files: BTreeMap<String, String>,
}

struct StoredGist {
    description: String,
    public: bool,
    /// Oldest first
    revisions: Vec<Revision>,
}

#[derive(Default)]
struct State {
    calls: usize,
    next_id: u64,
    next_version: u64,
    gists: HashMap<String, StoredGist>,
}

impl State {
    fn version(&mut self) -> String {
        self.next_version += 1;
        format!("{:040x}", self.next_version)
    }
}

/// Handle to the running service
#[derive(Clone)]
pub struct GistService {
    state: Arc<Mutex<State>>,
}

impl GistService {
    /// Start a mock server answering every request with this service
    pub async fn start() -> (MockServer, GistService) {
        let service = GistService::seeded();
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(service.clone())
            .mount(&server)
            .await;
        (server, service)
    }

    fn seeded() -> Self {
        let mut state = State::default();
        let files: BTreeMap<String, String> =
            [(PUBLIC_GIST_FILE.to_string(), PUBLIC_GIST_CONTENT.to_string())].into();
        state.gists.insert(
            PUBLIC_GIST_ID.to_string(),
            StoredGist {
                description: PUBLIC_GIST_DESCRIPTION.to_string(),
                public: true,
                revisions: PUBLIC_GIST_VERSIONS
                    .iter()
                    .rev()
                    .map(|v| Revision {
                        version: v.to_string(),
                        files: files.clone(),
                    })
                    .collect(),
            },
        );
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Number of requests that reached the service
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    /// Number of gists currently stored (including the seeded public one)
    pub fn gist_count(&self) -> usize {
        self.state.lock().unwrap().gists.len()
    }
}

fn gist_json(id: &str, gist: &StoredGist, revision: &Revision) -> Value {
    let files: serde_json::Map<String, Value> = revision
        .files
        .iter()
        .map(|(name, content)| {
            (
                name.clone(),
                json!({
                    "filename": name,
                    "type": "text/plain",
                    "size": content.len(),
                    "truncated": false,
                    "content": content,
                }),
            )
        })
        .collect();
    json!({
        "url": format!("https://api.github.com/gists/{}", id),
        "id": id,
        "html_url": format!("https://gist.github.com/{}", id),
        "description": gist.description,
        "public": gist.public,
        "files": files,
        "comments": 0,
    })
}

fn message(status: u16, text: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "message": text,
        "documentation_url": "https://docs.github.com/rest/gists",
    }))
}

fn is_authorized(request: &Request) -> bool {
    request
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| !token.trim().is_empty())
}

/// `files` of a request body; `null` entries mean "remove this file"
fn requested_files(body: &Value) -> BTreeMap<String, Option<String>> {
    body["files"]
        .as_object()
        .map(|files| {
            files
                .iter()
                .map(|(name, file)| (name.clone(), file["content"].as_str().map(str::to_string)))
                .collect()
        })
        .unwrap_or_default()
}

impl State {
    fn create(&mut self, request: &Request) -> ResponseTemplate {
        if !is_authorized(request) {
            return message(401, "Requires authentication");
        }
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return message(400, "Problems parsing JSON"),
        };
        let files: BTreeMap<String, String> = requested_files(&body)
            .into_iter()
            .filter_map(|(name, content)| content.map(|c| (name, c)))
            .collect();
        if files.is_empty() {
            return message(422, "Validation Failed");
        }

        self.next_id += 1;
        let id = format!("{:032x}", self.next_id);
        let version = self.version();
        let gist = StoredGist {
            description: body["description"].as_str().unwrap_or_default().to_string(),
            public: body["public"].as_bool().unwrap_or(false),
            revisions: vec![Revision { version, files }],
        };
        let json = gist_json(&id, &gist, gist.revisions.last().unwrap());
        self.gists.insert(id, gist);
        ResponseTemplate::new(201).set_body_json(json)
    }

    fn update(&mut self, request: &Request, id: &str) -> ResponseTemplate {
        if !is_authorized(request) {
            return message(401, "Requires authentication");
        }
        if !self.gists.contains_key(id) {
            return message(404, "Not Found");
        }
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return message(400, "Problems parsing JSON"),
        };
        let version = self.version();
        let gist = self.gists.get_mut(id).unwrap();

        let mut files = gist.revisions.last().unwrap().files.clone();
        for (name, content) in requested_files(&body) {
            match content {
                Some(content) => {
                    files.insert(name, content);
                }
                None => {
                    files.remove(&name);
                }
            }
        }
        if let Some(description) = body["description"].as_str() {
            gist.description = description.to_string();
        }
        gist.revisions.push(Revision { version, files });

        ResponseTemplate::new(200).set_body_json(gist_json(id, gist, gist.revisions.last().unwrap()))
    }

    fn delete(&mut self, request: &Request, id: &str) -> ResponseTemplate {
        if !is_authorized(request) {
            return message(401, "Requires authentication");
        }
        match self.gists.remove(id) {
            Some(_) => ResponseTemplate::new(204),
            None => message(404, "Not Found"),
        }
    }

    fn get(&self, id: &str) -> ResponseTemplate {
        match self.gists.get(id) {
            Some(gist) => ResponseTemplate::new(200)
                .set_body_json(gist_json(id, gist, gist.revisions.last().unwrap())),
            None => message(404, "Not Found"),
        }
    }

    fn commits(&self, id: &str) -> ResponseTemplate {
        match self.gists.get(id) {
            Some(gist) => {
                let commits: Vec<Value> = gist
                    .revisions
                    .iter()
                    .rev()
                    .map(|r| {
                        json!({
                            "url": format!("https://api.github.com/gists/{}/{}", id, r.version),
                            "version": r.version,
                            "change_status": { "total": r.files.len() },
                        })
                    })
                    .collect();
                ResponseTemplate::new(200).set_body_json(commits)
            }
            None => message(404, "Not Found"),
        }
    }

    fn revision(&self, id: &str, version: &str) -> ResponseTemplate {
        let found = self.gists.get(id).and_then(|gist| {
            gist.revisions
                .iter()
                .find(|r| r.version == version)
                .map(|r| gist_json(id, gist, r))
        });
        match found {
            Some(json) => ResponseTemplate::new(200).set_body_json(json),
            None => message(404, "Not Found"),
        }
    }
}

impl Respond for GistService {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        let call = state.calls;

        let path = request.url.path().to_string();
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let response = match (request.method.as_str(), segments.as_slice()) {
            ("POST", ["gists"]) => state.create(request),
            ("PATCH", ["gists", id]) => state.update(request, id),
            ("DELETE", ["gists", id]) => state.delete(request, id),
            ("GET", ["gists", id]) => state.get(id),
            ("GET", ["gists", id, "commits"]) => state.commits(id),
            ("GET", ["gists", id, version]) => state.revision(id, version),
            _ => message(404, "Not Found"),
        };

        response
            .insert_header("etag", format!("W/\"{:08x}\"", call))
            .insert_header("x-ratelimit-remaining", (5000 - call).to_string())
            .insert_header("x-github-request-id", format!("CAFE:{:04X}", call))
    }
}
