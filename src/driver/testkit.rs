//! In-process Bolt server for tests.
//!
//! Listens on 127.0.0.1 and answers HELLO, RUN, PULL, DISCARD, RESET, ROUTE
//! and GOODBYE. Queries are a tiny Cypher subset, enough to create and match
//! nodes:
//!
//! - `CREATE (p:Person {name: $name, year: 1853}) RETURN p`
//! - `MATCH (p:Person) WHERE p.name = $name RETURN p` (or `RETURN p.name`)
//! - `RETURN <expr> AS <name>`
//! - `UNWIND range(1, 5) AS i RETURN i`
//! - `CALL test.sleep(<ms>)`
//!
//! A trailing `;` is accepted. CREATE in a read-mode RUN fails with
//! `Neo.ClientError.Statement.AccessMode`.
//!
//! Several servers can share one [`GraphStore`] to stand in for a cluster.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use super::config::ServerAddress;
use crate::bolt::codec::BoltCodec;
use crate::bolt::handshake::{BOLT_MAGIC, HANDSHAKE_SIZE};
use crate::bolt::message::tag as msg;
use crate::bolt::packstream::tag;
use crate::bolt::{BoltResponse, BoltVersion, Failure, PackStreamStructure, PackStreamValue, Success};

type Map = HashMap<String, PackStreamValue>;

// ============================================================================
// GraphStore
// ============================================================================

struct StoredNode {
    id: i64,
    labels: Vec<String>,
    props: Map,
}

struct StoreInner {
    nodes: Vec<StoredNode>,
    commits: u64,
}

/// Nodes shared by every server started with the same store.
pub(crate) struct GraphStore {
    db_id: String,
    inner: Mutex<StoreInner>,
}

impl GraphStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            db_id: format!("{:08x}", rand::random::<u32>()),
            inner: Mutex::new(StoreInner {
                nodes: Vec::new(),
                commits: 0,
            }),
        })
    }

    fn bookmark(&self, commits: u64) -> String {
        format!("FB:{}:{}", self.db_id, commits)
    }
}

// ============================================================================
// Observations
// ============================================================================

/// One RUN as the server saw it.
#[derive(Debug, Clone)]
pub(crate) struct RunLog {
    pub query: String,
    pub parameters: Map,
    pub read_only: bool,
    pub bookmarks: Vec<String>,
    pub database: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ServerStats {
    pub connections: usize,
    pub hellos: usize,
    pub resets: usize,
    pub routes: usize,
    pub goodbyes: usize,
    pub runs: Vec<RunLog>,
    pub last_route_context: HashMap<String, String>,
}

/// Routing table handed out in answer to ROUTE.
#[derive(Debug, Clone)]
pub(crate) struct RouteConfig {
    pub ttl: i64,
    pub writers: Vec<ServerAddress>,
    pub readers: Vec<ServerAddress>,
    pub routers: Vec<ServerAddress>,
}

impl RouteConfig {
    fn single(address: ServerAddress) -> Self {
        Self {
            ttl: 300,
            writers: vec![address.clone()],
            readers: vec![address.clone()],
            routers: vec![address],
        }
    }

    fn to_rt(&self) -> PackStreamValue {
        let entry = |role: &str, addresses: &[ServerAddress]| {
            PackStreamValue::Map(HashMap::from([
                ("role".to_string(), PackStreamValue::from(role)),
                (
                    "addresses".to_string(),
                    PackStreamValue::List(addresses.iter().map(|a| a.to_string().into()).collect()),
                ),
            ]))
        };
        PackStreamValue::Map(HashMap::from([
            ("ttl".to_string(), PackStreamValue::Integer(self.ttl)),
            ("db".to_string(), PackStreamValue::from("neo4j")),
            (
                "servers".to_string(),
                PackStreamValue::List(vec![
                    entry("ROUTE", &self.routers),
                    entry("WRITE", &self.writers),
                    entry("READ", &self.readers),
                ]),
            ),
        ]))
    }
}

// ============================================================================
// MockServer
// ============================================================================

struct Shared {
    address: ServerAddress,
    version: BoltVersion,
    store: Arc<GraphStore>,
    stats: Mutex<ServerStats>,
    routes: Mutex<Option<RouteConfig>>,
    read_only: AtomicBool,
    password: Mutex<Option<String>>,
    next_connection: AtomicU64,
    connections: Mutex<Vec<JoinHandle<()>>>,
}

pub(crate) struct MockServer {
    shared: Arc<Shared>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl MockServer {
    pub(crate) async fn start() -> Self {
        Self::launch(GraphStore::new(), BoltVersion::V5_0).await
    }

    pub(crate) async fn start_with_store(store: Arc<GraphStore>) -> Self {
        Self::launch(store, BoltVersion::V5_0).await
    }

    pub(crate) async fn start_with_version(version: BoltVersion) -> Self {
        Self::launch(GraphStore::new(), version).await
    }

    async fn launch(store: Arc<GraphStore>, version: BoltVersion) -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let shared = Arc::new(Shared {
            address: ServerAddress::new("127.0.0.1", port),
            version,
            store,
            stats: Mutex::new(ServerStats::default()),
            routes: Mutex::new(None),
            read_only: AtomicBool::new(false),
            password: Mutex::new(None),
            next_connection: AtomicU64::new(1),
            connections: Mutex::new(Vec::new()),
        });

        let accept = {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    shared.stats.lock().connections += 1;
                    let task = tokio::spawn(serve(stream, Arc::clone(&shared)));
                    shared.connections.lock().push(task);
                }
            })
        };

        Self {
            shared,
            listener: Mutex::new(Some(accept)),
        }
    }

    pub(crate) fn address(&self) -> ServerAddress {
        self.shared.address.clone()
    }

    pub(crate) fn stats(&self) -> ServerStats {
        self.shared.stats.lock().clone()
    }

    pub(crate) fn set_routes(&self, routes: RouteConfig) {
        *self.shared.routes.lock() = Some(routes);
    }

    /// Writes fail with `Neo.ClientError.Cluster.NotALeader`.
    pub(crate) fn set_read_only(&self, read_only: bool) {
        self.shared.read_only.store(read_only, Ordering::SeqCst);
    }

    /// HELLO must carry this password.
    pub(crate) fn set_password(&self, password: &str) {
        *self.shared.password.lock() = Some(password.to_string());
    }

    /// Poll the stats until `check` holds; panics after five seconds.
    pub(crate) async fn wait_until(&self, check: impl Fn(&ServerStats) -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !check(&self.stats()) {
            assert!(tokio::time::Instant::now() < deadline, "server never reached the expected state");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Stop listening and drop every open connection.
    pub(crate) async fn stop(&self) {
        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            listener.abort();
            let _ = listener.await;
        }
        let connections: Vec<_> = self.shared.connections.lock().drain(..).collect();
        for connection in connections {
            connection.abort();
            let _ = connection.await;
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
        for connection in self.shared.connections.lock().drain(..) {
            connection.abort();
        }
    }
}

/// `RUST_LOG=neo4j_bolt_driver=debug cargo test` shows driver logs.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Connection handling
// ============================================================================

async fn serve(mut stream: TcpStream, shared: Arc<Shared>) {
    let mut preamble = [0u8; HANDSHAKE_SIZE];
    if stream.read_exact(&mut preamble).await.is_err() || preamble[..4] != BOLT_MAGIC {
        return;
    }
    if stream.write_all(&shared.version.to_bytes()).await.is_err() {
        return;
    }

    let id = shared.next_connection.fetch_add(1, Ordering::Relaxed);
    let mut framed = Framed::new(stream, BoltCodec::new());
    let mut connection = ServerConnection {
        shared,
        id,
        failed: false,
        pending: None,
    };

    while let Some(Ok(PackStreamValue::Structure(request))) = framed.next().await {
        let (responses, keep_open) = connection.handle(request).await;
        for response in responses {
            if framed
                .send(PackStreamValue::Structure(response.into_structure()))
                .await
                .is_err()
            {
                return;
            }
        }
        if !keep_open {
            return;
        }
    }
}

/// Result of a RUN waiting to be pulled.
struct Pending {
    records: VecDeque<Vec<PackStreamValue>>,
    write: Option<WriteStats>,
}

#[derive(Clone, Copy)]
struct WriteStats {
    nodes_created: i64,
    properties_set: i64,
    labels_added: i64,
}

struct Outcome {
    fields: Vec<String>,
    records: Vec<Vec<PackStreamValue>>,
    write: Option<WriteStats>,
}

impl Outcome {
    fn read(fields: Vec<String>, records: Vec<Vec<PackStreamValue>>) -> Self {
        Self {
            fields,
            records,
            write: None,
        }
    }
}

struct ServerConnection {
    shared: Arc<Shared>,
    id: u64,
    failed: bool,
    pending: Option<Pending>,
}

fn success(entries: Vec<(&str, PackStreamValue)>) -> BoltResponse {
    BoltResponse::Success(Success::new(
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    ))
}

fn failure(code: &str, message: impl Into<String>) -> BoltResponse {
    BoltResponse::Failure(Failure::new(code, message))
}

fn syntax_error(query: &str) -> Failure {
    Failure::new(
        "Neo.ClientError.Statement.SyntaxError",
        format!("Invalid input '{}'", query.split_whitespace().next().unwrap_or("")),
    )
}

impl ServerConnection {
    async fn handle(&mut self, request: PackStreamStructure) -> (Vec<BoltResponse>, bool) {
        match request.tag {
            msg::HELLO => self.hello(request),
            msg::GOODBYE => {
                self.shared.stats.lock().goodbyes += 1;
                (vec![], false)
            }
            msg::RESET => {
                self.shared.stats.lock().resets += 1;
                self.failed = false;
                self.pending = None;
                (vec![success(vec![])], true)
            }
            _ if self.failed => (vec![BoltResponse::Ignored], true),
            msg::RUN => (vec![self.run(request).await], true),
            msg::PULL => (self.pull(request), true),
            msg::DISCARD => {
                self.pending = None;
                (vec![success(vec![])], true)
            }
            msg::ROUTE => (vec![self.route(request)], true),
            other => (
                vec![failure(
                    "Neo.ClientError.Request.Invalid",
                    format!("unsupported message 0x{:02X}", other),
                )],
                false,
            ),
        }
    }

    fn hello(&mut self, request: PackStreamStructure) -> (Vec<BoltResponse>, bool) {
        self.shared.stats.lock().hellos += 1;
        let expected = self.shared.password.lock().clone();
        if let Some(expected) = expected {
            let given = request
                .fields
                .first()
                .and_then(PackStreamValue::as_map)
                .and_then(|extra| extra.get("credentials"))
                .and_then(PackStreamValue::as_str);
            if given != Some(expected.as_str()) {
                return (
                    vec![failure(
                        "Neo.ClientError.Security.Unauthorized",
                        "The client is unauthorized due to authentication failure.",
                    )],
                    false,
                );
            }
        }
        (
            vec![success(vec![
                ("server", "Neo4j/5.13.0".into()),
                ("connection_id", format!("bolt-{}", self.id).into()),
            ])],
            true,
        )
    }

    async fn run(&mut self, request: PackStreamStructure) -> BoltResponse {
        let mut fields = request.fields.into_iter();
        let query = fields.next().and_then(|q| q.as_str().map(String::from)).unwrap_or_default();
        let parameters = match fields.next() {
            Some(PackStreamValue::Map(map)) => map,
            _ => Map::new(),
        };
        let extra = match fields.next() {
            Some(PackStreamValue::Map(map)) => map,
            _ => Map::new(),
        };
        let read_only = extra.get("mode").and_then(PackStreamValue::as_str) == Some("r");
        let bookmarks: Vec<String> = extra
            .get("bookmarks")
            .and_then(PackStreamValue::as_list)
            .map(|list| list.iter().filter_map(|b| b.as_str().map(String::from)).collect())
            .unwrap_or_default();
        let database = extra.get("db").and_then(PackStreamValue::as_str).map(String::from);

        self.shared.stats.lock().runs.push(RunLog {
            query: query.clone(),
            parameters: parameters.clone(),
            read_only,
            bookmarks,
            database,
        });

        if let Some(millis) = query
            .trim()
            .strip_prefix("CALL test.sleep(")
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|ms| ms.trim().parse::<u64>().ok())
        {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            self.pending = Some(Pending {
                records: VecDeque::new(),
                write: None,
            });
            return success(vec![("fields", PackStreamValue::List(vec![]))]);
        }

        match self.execute(&query, &parameters, read_only) {
            Ok(outcome) => {
                self.pending = Some(Pending {
                    records: outcome.records.into(),
                    write: outcome.write,
                });
                success(vec![
                    (
                        "fields",
                        PackStreamValue::List(outcome.fields.into_iter().map(PackStreamValue::String).collect()),
                    ),
                    ("t_first", PackStreamValue::Integer(1)),
                ])
            }
            Err(e) => {
                self.failed = true;
                BoltResponse::Failure(e)
            }
        }
    }

    fn pull(&mut self, request: PackStreamStructure) -> Vec<BoltResponse> {
        let n = request
            .fields
            .first()
            .and_then(PackStreamValue::as_map)
            .and_then(|extra| extra.get("n"))
            .and_then(PackStreamValue::as_int)
            .unwrap_or(-1);

        let Some(pending) = self.pending.as_mut() else {
            self.failed = true;
            return vec![failure("Neo.ClientError.Request.Invalid", "PULL without a result")];
        };

        let take = if n < 0 {
            pending.records.len()
        } else {
            (n as usize).min(pending.records.len())
        };
        let mut responses: Vec<BoltResponse> = pending.records.drain(..take).map(BoltResponse::Record).collect();
        if !pending.records.is_empty() {
            responses.push(success(vec![("has_more", true.into())]));
            return responses;
        }

        let write = pending.write;
        self.pending = None;
        let store = &self.shared.store;
        let commits = store.inner.lock().commits;
        let mut metadata: Vec<(&str, PackStreamValue)> = vec![
            ("bookmark", store.bookmark(commits).into()),
            ("db", "neo4j".into()),
            ("t_last", PackStreamValue::Integer(1)),
        ];
        match write {
            Some(stats) => {
                metadata.push(("type", "rw".into()));
                metadata.push((
                    "stats",
                    PackStreamValue::Map(HashMap::from([
                        ("nodes-created".to_string(), stats.nodes_created.into()),
                        ("properties-set".to_string(), stats.properties_set.into()),
                        ("labels-added".to_string(), stats.labels_added.into()),
                    ])),
                ));
            }
            None => metadata.push(("type", "r".into())),
        }
        responses.push(success(metadata));
        responses
    }

    fn route(&mut self, request: PackStreamStructure) -> BoltResponse {
        let context: HashMap<String, String> = request
            .fields
            .first()
            .and_then(PackStreamValue::as_map)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        {
            let mut stats = self.shared.stats.lock();
            stats.routes += 1;
            stats.last_route_context = context;
        }
        let routes = self
            .shared
            .routes
            .lock()
            .clone()
            .unwrap_or_else(|| RouteConfig::single(self.shared.address.clone()));
        success(vec![("rt", routes.to_rt())])
    }

    // ------------------------------------------------------------------------
    // Cypher subset
    // ------------------------------------------------------------------------

    fn execute(&self, query: &str, params: &Map, read_only: bool) -> Result<Outcome, Failure> {
        let query = query.trim();
        let query = query.strip_suffix(';').unwrap_or(query).trim_end();
        if let Some(rest) = query.strip_prefix("CREATE ") {
            if read_only {
                return Err(Failure::new(
                    "Neo.ClientError.Statement.AccessMode",
                    "Writing in read access mode not allowed.",
                ));
            }
            self.create(query, rest, params)
        } else if let Some(rest) = query.strip_prefix("MATCH ") {
            self.match_nodes(query, rest, params)
        } else if let Some(rest) = query.strip_prefix("UNWIND range(") {
            unwind(query, rest)
        } else if let Some(rest) = query.strip_prefix("RETURN ") {
            let (expr, name) = match rest.split_once(" AS ") {
                Some((expr, name)) => (expr.trim(), name.trim()),
                None => (rest.trim(), rest.trim()),
            };
            Ok(Outcome::read(vec![name.to_string()], vec![vec![eval(expr, params)?]]))
        } else {
            Err(syntax_error(query))
        }
    }

    fn create(&self, query: &str, rest: &str, params: &Map) -> Result<Outcome, Failure> {
        if self.shared.read_only.load(Ordering::SeqCst) {
            return Err(Failure::new(
                "Neo.ClientError.Cluster.NotALeader",
                "No write operations are allowed on this database. This is a read only database.",
            ));
        }
        let pattern = parse_pattern(rest).ok_or_else(|| syntax_error(query))?;
        let props = pattern
            .props
            .iter()
            .map(|(k, expr)| Ok((k.clone(), eval(expr, params)?)))
            .collect::<Result<Map, Failure>>()?;
        let returned = match pattern.rest.trim() {
            "" => None,
            tail => match tail.strip_prefix("RETURN ") {
                Some(var) if var.trim() == pattern.var => Some(var.trim().to_string()),
                _ => return Err(syntax_error(tail)),
            },
        };

        let store = &self.shared.store;
        let mut inner = store.inner.lock();
        let node = StoredNode {
            id: inner.nodes.len() as i64,
            labels: vec![pattern.label],
            props,
        };
        let value = node_value(&node, &store.db_id, self.shared.version);
        let write = WriteStats {
            nodes_created: 1,
            properties_set: node.props.len() as i64,
            labels_added: 1,
        };
        inner.nodes.push(node);
        inner.commits += 1;

        Ok(match returned {
            Some(var) => Outcome {
                fields: vec![var],
                records: vec![vec![value]],
                write: Some(write),
            },
            None => Outcome {
                fields: vec![],
                records: vec![],
                write: Some(write),
            },
        })
    }

    fn match_nodes(&self, query: &str, rest: &str, params: &Map) -> Result<Outcome, Failure> {
        let pattern = parse_pattern(rest).ok_or_else(|| syntax_error(query))?;
        let mut filters = pattern
            .props
            .iter()
            .map(|(k, expr)| Ok((k.clone(), eval(expr, params)?)))
            .collect::<Result<Vec<_>, Failure>>()?;

        let tail = pattern.rest.trim();
        let (condition, returned) = match tail.find("RETURN ") {
            Some(at) => (tail[..at].trim(), tail[at + "RETURN ".len()..].trim()),
            None => return Err(syntax_error(tail)),
        };
        if let Some(condition) = condition.strip_prefix("WHERE ") {
            let (lhs, rhs) = condition.split_once('=').ok_or_else(|| syntax_error(condition))?;
            let key = lhs
                .trim()
                .strip_prefix(&format!("{}.", pattern.var))
                .ok_or_else(|| syntax_error(condition))?;
            filters.push((key.to_string(), eval(rhs.trim(), params)?));
        } else if !condition.is_empty() {
            return Err(syntax_error(condition));
        }

        let property = if returned == pattern.var {
            None
        } else {
            let key = returned
                .strip_prefix(&format!("{}.", pattern.var))
                .ok_or_else(|| syntax_error(returned))?;
            Some(key.to_string())
        };

        let store = &self.shared.store;
        let inner = store.inner.lock();
        let records = inner
            .nodes
            .iter()
            .filter(|node| node.labels.contains(&pattern.label))
            .filter(|node| filters.iter().all(|(k, v)| node.props.get(k) == Some(v)))
            .map(|node| match &property {
                None => vec![node_value(node, &store.db_id, self.shared.version)],
                Some(key) => vec![node.props.get(key).cloned().unwrap_or(PackStreamValue::Null)],
            })
            .collect();
        Ok(Outcome::read(vec![returned.to_string()], records))
    }
}

fn unwind(query: &str, rest: &str) -> Result<Outcome, Failure> {
    let (range, tail) = rest.split_once(')').ok_or_else(|| syntax_error(query))?;
    let (from, to) = range.split_once(',').ok_or_else(|| syntax_error(query))?;
    let from: i64 = from.trim().parse().map_err(|_| syntax_error(query))?;
    let to: i64 = to.trim().parse().map_err(|_| syntax_error(query))?;
    let (var, returned) = tail
        .trim()
        .strip_prefix("AS ")
        .and_then(|t| t.split_once(" RETURN "))
        .ok_or_else(|| syntax_error(query))?;
    if var.trim() != returned.trim() {
        return Err(syntax_error(query));
    }
    Ok(Outcome::read(
        vec![var.trim().to_string()],
        (from..=to).map(|i| vec![PackStreamValue::Integer(i)]).collect(),
    ))
}

struct Pattern<'a> {
    var: String,
    label: String,
    props: Vec<(String, String)>,
    rest: &'a str,
}

/// `(var:Label {key: expr, ...})` followed by the rest of the query.
fn parse_pattern(text: &str) -> Option<Pattern<'_>> {
    let text = text.trim_start().strip_prefix('(')?;
    let close = text.find(')')?;
    let (inner, rest) = (&text[..close], &text[close + 1..]);
    let (head, props) = match inner.find('{') {
        Some(at) => (&inner[..at], inner[at + 1..].trim_end().strip_suffix('}')?),
        None => (inner, ""),
    };
    let (var, label) = head.trim().split_once(':')?;
    let props = props
        .split(',')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| {
            let (key, expr) = pair.split_once(':')?;
            Some((key.trim().to_string(), expr.trim().to_string()))
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Pattern {
        var: var.trim().to_string(),
        label: label.trim().to_string(),
        props,
        rest,
    })
}

fn eval(expr: &str, params: &Map) -> Result<PackStreamValue, Failure> {
    let expr = expr.trim();
    if let Some(name) = expr.strip_prefix('$') {
        return params.get(name).cloned().ok_or_else(|| {
            Failure::new(
                "Neo.ClientError.Statement.ParameterMissing",
                format!("Expected parameter(s): {}", name),
            )
        });
    }
    for quote in ['\'', '"'] {
        if let Some(text) = expr.strip_prefix(quote).and_then(|e| e.strip_suffix(quote)) {
            return Ok(PackStreamValue::from(text));
        }
    }
    match expr {
        "null" => return Ok(PackStreamValue::Null),
        "true" => return Ok(PackStreamValue::Boolean(true)),
        "false" => return Ok(PackStreamValue::Boolean(false)),
        _ => {}
    }
    if let Ok(i) = expr.parse::<i64>() {
        return Ok(PackStreamValue::Integer(i));
    }
    if let Ok(f) = expr.parse::<f64>() {
        return Ok(PackStreamValue::Float(f));
    }
    Err(syntax_error(expr))
}

fn node_value(node: &StoredNode, db_id: &str, version: BoltVersion) -> PackStreamValue {
    let mut fields = vec![
        PackStreamValue::Integer(node.id),
        PackStreamValue::List(node.labels.iter().cloned().map(PackStreamValue::String).collect()),
        PackStreamValue::Map(node.props.clone()),
    ];
    if version.has_element_ids() {
        fields.push(PackStreamValue::String(format!("4:{}:{}", db_id, node.id)));
    }
    PackStreamStructure::new(tag::NODE, fields).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pattern() {
        let pattern = parse_pattern("(p:Person {name: $name, year: 1853}) RETURN p").unwrap();
        assert_eq!(pattern.var, "p");
        assert_eq!(pattern.label, "Person");
        assert_eq!(
            pattern.props,
            vec![("name".to_string(), "$name".to_string()), ("year".to_string(), "1853".to_string())]
        );
        assert_eq!(pattern.rest.trim(), "RETURN p");
        assert!(parse_pattern("p:Person").is_none());
    }

    #[test]
    fn test_eval() {
        let params = Map::from([("x".to_string(), PackStreamValue::Integer(7))]);
        assert_eq!(eval("$x", &params).unwrap(), PackStreamValue::Integer(7));
        assert_eq!(eval("'Italia'", &params).unwrap(), PackStreamValue::from("Italia"));
        assert_eq!(eval("1.5", &params).unwrap(), PackStreamValue::Float(1.5));
        assert_eq!(eval("$missing", &params).unwrap_err().code, "Neo.ClientError.Statement.ParameterMissing");
    }
}
