//! In-memory stand-in for the Graph and Lark APIs.
//!
//! [`FakeRemote`] implements [`HttpSession`] and routes requests by URL the
//! way the real services would: paginated posts, tenant token exchange,
//! record search with page tokens, and batch create/update that mutate an
//! in-memory table. Faults can be injected on the Nth call of a route.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{json, Map, Value};

use crate::http::{HttpSession, TransportError};
use crate::lark::fields::{extract_key, DEFAULT_KEY_FIELD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Route {
    Posts,
    Token,
    Search,
    BatchCreate,
    BatchUpdate,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Fault {
    /// Non-2xx HTTP status.
    Transport(u16),
    /// 200 response carrying an application error code.
    ApiCode(i64),
}

struct Call {
    route: Route,
    url: String,
    payload: Value,
}

#[derive(Default)]
struct State {
    posts: Vec<Value>,
    records: Vec<(String, Map<String, Value>)>,
    next_id: u64,
    calls: Vec<Call>,
    counters: HashMap<Route, usize>,
    faults: HashMap<(Route, usize), Fault>,
}

#[derive(Default)]
pub(crate) struct FakeRemote {
    state: Mutex<State>,
}

impl FakeRemote {
    pub(crate) const GRAPH_BASE: &'static str = "https://graph.test/v21.0";
    pub(crate) const LARK_BASE: &'static str = "https://lark.test/open-apis";
    pub(crate) const TENANT_TOKEN: &'static str = "t-fake-tenant";
    pub(crate) const CREATED_TIME: &'static str = "2024-01-02T08:00:00+0000";

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn add_posts(&self, ids: &[&str]) {
        for id in ids {
            self.add_post(id, Self::CREATED_TIME);
        }
    }

    pub(crate) fn add_post(&self, id: &str, created_time: &str) {
        self.state()
            .posts
            .push(json!({"id": id, "created_time": created_time}));
    }

    /// Insert a record directly, bypassing the API. Returns its record id.
    pub(crate) fn seed_record(&self, fields: Value) -> String {
        let mut state = self.state();
        let fields = match fields {
            Value::Object(map) => map,
            other => panic!("record fields must be an object, got {other}"),
        };
        insert_record(&mut state, fields)
    }

    pub(crate) fn record_count(&self) -> usize {
        self.state().records.len()
    }

    pub(crate) fn record(&self, record_id: &str) -> Option<Map<String, Value>> {
        self.state()
            .records
            .iter()
            .find(|(id, _)| id == record_id)
            .map(|(_, fields)| fields.clone())
    }

    /// Natural keys of every stored record, sorted.
    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .state()
            .records
            .iter()
            .filter_map(|(_, fields)| extract_key(fields.get(DEFAULT_KEY_FIELD)))
            .collect();
        keys.sort();
        keys
    }

    /// Fail the `nth` (1-based) call to `route`.
    pub(crate) fn inject(&self, route: Route, nth: usize, fault: Fault) {
        self.state().faults.insert((route, nth), fault);
    }

    /// Query (GET) or body (POST) of every call to `route`, in order.
    pub(crate) fn calls(&self, route: Route) -> Vec<Value> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.route == route)
            .map(|c| c.payload.clone())
            .collect()
    }

    pub(crate) fn urls(&self, route: Route) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.route == route)
            .map(|c| c.url.clone())
            .collect()
    }

    /// Number of calls to any Lark endpoint.
    pub(crate) fn lark_calls(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.route != Route::Posts)
            .count()
    }

    /// Log the call and return the fault scheduled for it, if any.
    fn begin(&self, route: Route, url: &str, payload: Value) -> Option<Fault> {
        let mut state = self.state();
        state.calls.push(Call {
            route,
            url: url.to_string(),
            payload,
        });
        let counter = state.counters.entry(route).or_insert(0);
        *counter += 1;
        let nth = *counter;
        state.faults.remove(&(route, nth))
    }
}

fn insert_record(state: &mut State, fields: Map<String, Value>) -> String {
    state.next_id += 1;
    let id = format!("rec{}", state.next_id);
    state.records.push((id.clone(), fields));
    id
}

fn route_of(url: &str) -> Route {
    if url.contains("/tenant_access_token/internal") {
        Route::Token
    } else if url.contains("/records/search") {
        Route::Search
    } else if url.contains("/records/batch_create") {
        Route::BatchCreate
    } else if url.contains("/records/batch_update") {
        Route::BatchUpdate
    } else if url.contains("/posts") {
        Route::Posts
    } else {
        panic!("no fake route for {url}")
    }
}

fn url_params(url: &str) -> impl Iterator<Item = (&str, &str)> {
    url.split_once('?')
        .map(|(_, q)| q)
        .unwrap_or("")
        .split('&')
        .filter_map(|pair| pair.split_once('='))
}

fn fault_response(route: Route, fault: Fault) -> Result<Value, TransportError> {
    match fault {
        Fault::Transport(status) => Err(TransportError::Status {
            status,
            body: "injected fault".to_string(),
        }),
        Fault::ApiCode(code) if route == Route::Posts => Ok(json!({
            "error": {"message": "injected fault", "type": "OAuthException", "code": code}
        })),
        Fault::ApiCode(code) => Ok(json!({"code": code, "msg": "injected fault", "data": {}})),
    }
}

fn as_usize(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[async_trait::async_trait]
impl HttpSession for FakeRemote {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, TransportError> {
        let route = route_of(url);
        let mut params = Map::new();
        for (k, v) in url_params(url) {
            params.insert(k.to_string(), Value::String(v.to_string()));
        }
        for (k, v) in query {
            params.insert(k.to_string(), Value::String(v.clone()));
        }
        let payload = Value::Object(params);
        if let Some(fault) = self.begin(route, url, payload.clone()) {
            return fault_response(route, fault);
        }
        assert_eq!(route, Route::Posts, "GET is only used for posts");

        let state = self.state();
        let limit = payload.get("limit").and_then(as_usize).unwrap_or(25);
        let after = payload.get("after").and_then(as_usize).unwrap_or(0);
        let start = after.min(state.posts.len());
        let end = (after + limit).min(state.posts.len());
        let data = state.posts[start..end].to_vec();

        let path = url.split('?').next().unwrap_or(url);
        let mut paging = json!({"cursors": {"before": start.to_string(), "after": end.to_string()}});
        if end < state.posts.len() {
            paging["next"] = json!(format!("{path}?limit={limit}&after={end}"));
        }
        Ok(json!({"data": data, "paging": paging}))
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<Value, TransportError> {
        let route = route_of(url);
        if let Some(fault) = self.begin(route, url, body.clone()) {
            return fault_response(route, fault);
        }

        if route == Route::Token {
            return Ok(json!({
                "code": 0,
                "msg": "ok",
                "tenant_access_token": Self::TENANT_TOKEN,
                "expire": 7200
            }));
        }
        if bearer != Some(Self::TENANT_TOKEN) {
            return Ok(json!({"code": 99991663, "msg": "Invalid access token for authorization"}));
        }

        let mut state = self.state();
        match route {
            Route::Search => {
                let page_size = body.get("page_size").and_then(as_usize).unwrap_or(20);
                let offset = body.get("page_token").and_then(as_usize).unwrap_or(0);
                let start = offset.min(state.records.len());
                let end = (offset + page_size).min(state.records.len());
                let items: Vec<Value> = state.records[start..end]
                    .iter()
                    .map(|(id, fields)| json!({"record_id": id, "fields": fields}))
                    .collect();
                let has_more = end < state.records.len();
                let mut data = json!({
                    "items": items,
                    "has_more": has_more,
                    "total": state.records.len(),
                });
                if has_more {
                    data["page_token"] = json!(end.to_string());
                }
                Ok(json!({"code": 0, "msg": "success", "data": data}))
            }
            Route::BatchCreate => {
                let mut created = Vec::new();
                for rec in body["records"].as_array().cloned().unwrap_or_default() {
                    let fields = rec["fields"].as_object().cloned().unwrap_or_default();
                    let id = insert_record(&mut state, fields.clone());
                    created.push(json!({"record_id": id, "fields": fields}));
                }
                Ok(json!({"code": 0, "msg": "success", "data": {"records": created}}))
            }
            Route::BatchUpdate => {
                let records = body["records"].as_array().cloned().unwrap_or_default();
                let all_exist = records.iter().all(|rec| {
                    state
                        .records
                        .iter()
                        .any(|(id, _)| Some(id.as_str()) == rec["record_id"].as_str())
                });
                if !all_exist {
                    return Ok(json!({"code": 1254043, "msg": "RecordIdNotFound"}));
                }
                for rec in records {
                    let target = rec["record_id"].as_str().unwrap_or_default();
                    if let Some((_, fields)) = state.records.iter_mut().find(|(id, _)| id == target) {
                        if let Some(update) = rec["fields"].as_object() {
                            for (k, v) in update {
                                fields.insert(k.clone(), v.clone());
                            }
                        }
                    }
                }
                Ok(json!({"code": 0, "msg": "success", "data": {}}))
            }
            Route::Posts | Route::Token => unreachable!("handled above"),
        }
    }
}
