//! In-process axum server and API declarations shared by the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, RawQuery};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use restify_client::{ApiDeclaration, MethodDeclaration, ParameterDeclaration};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}

async fn find_user(Path(id): Path<u64>) -> Result<Json<Value>, (StatusCode, &'static str)> {
    if id == 42 {
        Ok(Json(json!({"id": 42, "name": "Ann"})))
    } else {
        Err((StatusCode::NOT_FOUND, "user not found"))
    }
}

async fn search(RawQuery(query): RawQuery) -> String {
    query.unwrap_or_default()
}

async fn create_user(Json(user): Json<Value>) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(user))
}

async fn file(Path(name): Path<String>) -> String {
    name
}

fn header_or(headers: &HeaderMap, name: &str, default: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(default)
        .to_string()
}

async fn form(headers: HeaderMap, body: String) -> String {
    format!("{}|{}", header_or(&headers, "content-type", "none"), body)
}

async fn whoami(headers: HeaderMap) -> String {
    header_or(&headers, "authorization", "anonymous")
}

async fn trace(headers: HeaderMap) -> String {
    header_or(&headers, "x-trace", "none")
}

async fn items() -> ([(&'static str, &'static str); 1], Json<Value>) {
    ([("x-total", "3")], Json(json!(["a", "b", "c"])))
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(2)).await;
    "late"
}

/// Requests to `/abandonable` the server gave up on before answering.
pub static ABANDONED: AtomicUsize = AtomicUsize::new(0);

struct Unanswered(bool);

impl Drop for Unanswered {
    fn drop(&mut self) {
        if self.0 {
            ABANDONED.fetch_add(1, Ordering::SeqCst);
        }
    }
}

async fn abandonable() -> &'static str {
    let mut pending = Unanswered(true);
    tokio::time::sleep(Duration::from_secs(5)).await;
    pending.0 = false;
    "late"
}

async fn empty() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn greeting() -> &'static str {
    "hello"
}

fn router() -> Router {
    Router::new()
        .route("/users/", post(create_user))
        .route("/users/search", get(search))
        .route("/users/{id}", get(find_user))
        .route("/files/{name}", get(file))
        .route("/form", post(form))
        .route("/whoami", get(whoami))
        .route("/trace", get(trace))
        .route("/items", get(items))
        .route("/slow", get(slow))
        .route("/abandonable", get(abandonable))
        .route("/empty", get(empty))
        .route("/greeting", get(greeting))
}

/// Start the test server on its own runtime thread and return its base URL.
pub fn start() -> String {
    let (tx, rx) = std::sync::mpsc::channel::<SocketAddr>();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, router()).await.unwrap();
        });
    });
    format!("http://{}", rx.recv().unwrap())
}

/// An endpoint nothing listens on.
pub fn unreachable() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn id() -> ParameterDeclaration {
    ParameterDeclaration::new("id", "u64").path()
}

pub fn users_api() -> ApiDeclaration {
    ApiDeclaration::new("Users")
        .path("/users/")
        .header("accept", "application/json")
        .method(MethodDeclaration::get("find", "{id}").param(id()).returns("Optional<User>"))
        .method(MethodDeclaration::get("get", "{id}").param(id()).returns("User"))
        .method(
            MethodDeclaration::get("getResponse", "{id}")
                .param(id())
                .returns("EndpointResponse<User>"),
        )
        .method(
            MethodDeclaration::get("findAsync", "{id}")
                .param(id())
                .returns("Future<Optional<User>>"),
        )
        .method(MethodDeclaration::get("status", "{id}").param(id()).returns("StatusCode"))
        .method(MethodDeclaration::get("watch", "{id}").param(id()).returns("Stream<User>"))
        .method(
            MethodDeclaration::get("findLater", "{id}")
                .param(id())
                .param(ParameterDeclaration::new("onSuccess", "SuccessCallback<User>"))
                .param(ParameterDeclaration::new("onFailure", "FailureCallback")),
        )
        .method(
            MethodDeclaration::get("search", "search")
                .param(ParameterDeclaration::new("name", "String").query())
                .param(ParameterDeclaration::new("tag", "Vec<String>").query())
                .returns("String"),
        )
        .method(
            MethodDeclaration::post("create", "/")
                .param(ParameterDeclaration::new("user", "User").body())
                .returns("User"),
        )
        .method(
            MethodDeclaration::post("createStatus", "/")
                .param(ParameterDeclaration::new("user", "User").body())
                .returns("StatusCode"),
        )
}

pub fn misc_api() -> ApiDeclaration {
    ApiDeclaration::new("Misc")
        .method(MethodDeclaration::get("greet", "greeting").returns("Future<String>"))
        .method(MethodDeclaration::get("greetBlocking", "greeting").returns("String"))
        .method(
            MethodDeclaration::get("file", "/files/{name}")
                .param(ParameterDeclaration::new("name", "String").path())
                .returns("String"),
        )
        .method(
            MethodDeclaration::post("form", "/form")
                .header("content-type", "application/x-www-form-urlencoded")
                .param(ParameterDeclaration::new("fields", "Map<String, String>").body())
                .returns("String"),
        )
        .method(MethodDeclaration::get("whoami", "/whoami").returns("String"))
        .method(MethodDeclaration::get("whoamiAsync", "/whoami").returns("Future<String>"))
        .method(
            MethodDeclaration::get("trace", "/trace")
                .param(ParameterDeclaration::new("trace", "String").header_named("x-trace"))
                .returns("String"),
        )
        .method(MethodDeclaration::get("items", "/items").returns("Iterator<String>"))
        .method(MethodDeclaration::get("queue", "/items").returns("Queue<String>"))
        .method(MethodDeclaration::get("itemHeaders", "/items").returns("Headers"))
        .method(MethodDeclaration::get("slow", "/slow").returns("Future<String>"))
        .method(MethodDeclaration::get("abandonable", "/abandonable").returns("Future<String>"))
        .method(MethodDeclaration::get("empty", "/empty").returns("Optional<User>"))
}
