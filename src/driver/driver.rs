//! Driver
//!
//! 드라이버 인스턴스
//!
//! 드라이버는 설정, 라우팅 테이블, 서버 주소별 연결 풀을 소유합니다.
//! 복제 비용이 낮으므로 (`Arc`) 여러 태스크에서 같은 드라이버를 공유합니다.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::bolt::ConnectOptions;
use super::config::{DriverConfig, ServerAddress};
use super::error::{DriverError, DriverResult};
use super::pool::{ConnectionPool, PoolConfig, PoolMetrics};
use super::record::EagerResult;
use super::routing::{RouteRediscovery, RoutingTable, RoutingTableManager, ServerSelector};
use super::session::{AccessMode, Query, Session, SessionConfig};
use super::types::Value;

/// 드라이버 생성
///
/// URI 와 자격 증명은 이 시점에 검증되며, 연결은 첫 쿼리 때 열립니다.
pub fn new_driver(config: DriverConfig) -> DriverResult<Driver> {
    Driver::new(config)
}

// ============================================================================
// Driver - 드라이버
// ============================================================================

/// 그래프 데이터베이스 드라이버
#[derive(Clone)]
pub struct Driver {
    inner: Arc<DriverInner>,
}

struct DriverInner {
    /// 설정
    config: DriverConfig,
    /// 새 연결 옵션
    options: ConnectOptions,
    /// 풀 설정
    pool_config: PoolConfig,
    /// 라우팅 테이블
    routing: RoutingTableManager,
    /// 읽기 서버 선택기
    selector: ServerSelector,
    /// 서버별 연결 풀
    pools: RwLock<HashMap<ServerAddress, Arc<ConnectionPool>>>,
    /// 다음 쿼리와 함께 보낼 북마크
    bookmarks: Mutex<Bookmarks>,
    /// 열린 상태
    open: AtomicBool,
}

impl Driver {
    /// 설정으로 드라이버 생성
    pub fn new(config: DriverConfig) -> DriverResult<Self> {
        let resolved = config.resolve()?;
        let options = ConnectOptions {
            auth: resolved.auth,
            user_agent: config.user_agent.clone(),
            routing_context: resolved.routing_context,
            connection_timeout: config.connection_timeout,
        };

        let routing = if options.routing_context.is_some() {
            RoutingTableManager::new(
                resolved.address.clone(),
                config.database.clone(),
                Arc::new(RouteRediscovery::new(options.clone())),
            )
        } else {
            RoutingTableManager::direct(resolved.address.clone())
        };

        tracing::debug!(
            address = %resolved.address,
            routing = options.routing_context.is_some(),
            "driver created"
        );

        Ok(Self {
            inner: Arc::new(DriverInner {
                pool_config: PoolConfig::from(&config),
                selector: ServerSelector::new(config.routing_policy),
                config,
                options,
                routing,
                pools: RwLock::new(HashMap::new()),
                bookmarks: Mutex::new(Bookmarks::default()),
                open: AtomicBool::new(true),
            }),
        })
    }

    /// 쓰기 쿼리 실행 (리더)
    pub async fn write(
        &self,
        query: impl Into<Query>,
        params: Option<HashMap<String, Value>>,
    ) -> DriverResult<EagerResult> {
        self.execute_query(AccessMode::Write, query, params).await
    }

    /// 읽기 쿼리 실행 (팔로워 또는 읽기 복제본, 없으면 리더)
    pub async fn read(
        &self,
        query: impl Into<Query>,
        params: Option<HashMap<String, Value>>,
    ) -> DriverResult<EagerResult> {
        self.execute_query(AccessMode::Read, query, params).await
    }

    /// 쿼리 실행
    ///
    /// 연결을 빌려 쿼리를 실행하고 반환합니다. 실패한 호출은 다른 서버로 재시도하지 않으며,
    /// 대상 서버가 응답하지 않거나 역할이 바뀌었으면 라우팅 테이블에서 제외합니다.
    pub async fn execute_query(
        &self,
        mode: AccessMode,
        query: impl Into<Query>,
        params: Option<HashMap<String, Value>>,
    ) -> DriverResult<EagerResult> {
        let query = query.into().with_params(params);
        let mut session = self.session(mode).await?;
        let address = session.address().clone();
        let sent = session.initial_bookmarks().to_vec();

        let result = session.run(query).await;
        if let Some(bookmark) = session.close().await {
            self.inner.bookmarks.lock().update(&sent, bookmark);
        }

        result.map_err(|e| self.on_error(&address, e))
    }

    /// 세션 생성
    ///
    /// 접근 모드에 맞는 서버에서 연결을 빌립니다. 세션은 드라이버의 최근 북마크로 시작합니다.
    pub async fn session(&self, mode: AccessMode) -> DriverResult<Session> {
        self.ensure_open()?;

        let table = self.inner.routing.table().await?;
        let route = self.inner.selector.select(&table, mode);
        tracing::debug!(%mode, role = %route.role, address = %route.address, "route selected");

        let pool = self.pool_for(&route.address)?;
        let connection = pool.acquire().await.map_err(|e| self.on_error(&route.address, e))?;

        let config = &self.inner.config;
        Ok(Session::new(
            connection,
            SessionConfig {
                access_mode: mode,
                database: config.database.clone(),
                fetch_size: config.fetch_size,
                query_timeout: config.query_timeout,
                bookmarks: self.inner.bookmarks.lock().current().to_vec(),
            },
        ))
    }

    /// 연결 테스트
    ///
    /// 리더에 연결해 인증까지 마친 뒤 연결을 반환합니다.
    pub async fn verify_connectivity(&self) -> DriverResult<()> {
        self.session(AccessMode::Write).await?.close().await;
        Ok(())
    }

    /// 드라이버 종료
    ///
    /// 모든 풀을 닫습니다. 이후 호출은 실패합니다.
    pub async fn close(&self) {
        if !self.inner.open.swap(false, Ordering::AcqRel) {
            return;
        }
        let pools: Vec<Arc<ConnectionPool>> = self.inner.pools.write().drain().map(|(_, pool)| pool).collect();
        for pool in pools {
            pool.close().await;
        }
        tracing::debug!("driver closed");
    }

    /// 열린 상태 확인
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    /// 드라이버 설정
    pub fn config(&self) -> &DriverConfig {
        &self.inner.config
    }

    /// 현재 라우팅 테이블
    pub fn routing_table(&self) -> Option<Arc<RoutingTable>> {
        self.inner.routing.current()
    }

    /// 가장 최근 북마크
    pub fn last_bookmark(&self) -> Option<String> {
        self.inner.bookmarks.lock().latest().map(String::from)
    }

    /// 다음 쿼리와 함께 보낼 북마크들
    pub fn bookmarks(&self) -> Vec<String> {
        self.inner.bookmarks.lock().current().to_vec()
    }

    /// 메트릭 조회
    pub fn metrics(&self) -> DriverMetrics {
        DriverMetrics {
            pools: self
                .inner
                .pools
                .read()
                .iter()
                .map(|(address, pool)| (address.clone(), pool.metrics()))
                .collect(),
            routing_refreshes: self.inner.routing.refresh_count(),
        }
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(DriverError::connection("driver is closed"))
        }
    }

    fn pool_for(&self, address: &ServerAddress) -> DriverResult<Arc<ConnectionPool>> {
        if let Some(pool) = self.inner.pools.read().get(address) {
            return Ok(Arc::clone(pool));
        }

        let mut pools = self.inner.pools.write();
        // close() 와 경합하면 새 풀을 만들지 않음
        self.ensure_open()?;
        let pool = pools.entry(address.clone()).or_insert_with(|| {
            ConnectionPool::new(address.clone(), self.inner.pool_config.clone(), self.inner.options.clone())
        });
        Ok(Arc::clone(pool))
    }

    fn on_error(&self, address: &ServerAddress, error: DriverError) -> DriverError {
        if error.invalidates_route() {
            tracing::warn!(%address, error = %error, "removing server from routing table");
            self.inner.routing.forget(address);
        }
        error
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("uri", &self.inner.config.uri)
            .field("open", &self.is_open())
            .field("routing", &self.inner.routing)
            .finish()
    }
}

// ============================================================================
// Bookmarks - 북마크
// ============================================================================

/// 인과적 체이닝용 북마크 집합
///
/// 호출이 끝나면 그 호출이 보낸 북마크를 서버가 돌려준 새 북마크로 대체합니다.
/// 동시에 끝난 호출들의 북마크는 모두 남으므로, 늦게 끝난 호출이 더 새로운 북마크를
/// 덮어쓰지 않습니다.
#[derive(Debug, Default)]
struct Bookmarks {
    current: Vec<String>,
}

impl Bookmarks {
    fn current(&self) -> &[String] {
        &self.current
    }

    fn latest(&self) -> Option<&str> {
        self.current.last().map(String::as_str)
    }

    fn update(&mut self, sent: &[String], received: String) {
        self.current.retain(|bookmark| !sent.contains(bookmark));
        self.current.retain(|bookmark| *bookmark != received);
        self.current.push(received);
    }
}

// ============================================================================
// DriverMetrics - 드라이버 메트릭
// ============================================================================

/// 드라이버 메트릭
#[derive(Debug, Clone, Default)]
pub struct DriverMetrics {
    /// 서버별 풀 메트릭
    pub pools: HashMap<ServerAddress, PoolMetrics>,
    /// 성공한 라우팅 테이블 갱신 횟수
    pub routing_refreshes: u64,
}

impl DriverMetrics {
    /// 전체 사용 중인 연결 수
    pub fn in_use_connections(&self) -> usize {
        self.pools.values().map(|m| m.in_use).sum()
    }

    /// 전체 유휴 연결 수
    pub fn idle_connections(&self) -> usize {
        self.pools.values().map(|m| m.idle).sum()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::routing::ServerRole;
    use crate::driver::testkit::{GraphStore, MockServer, RouteConfig};
    use crate::params;
    use std::collections::HashSet;
    use std::time::Duration;

    fn direct_driver(server: &MockServer) -> Driver {
        new_driver(DriverConfig::new(
            format!("bolt://{}", server.address()),
            "neo4j",
            "secret",
        ))
        .unwrap()
    }

    /// 리더 하나와 팔로워 둘, 같은 그래프를 공유
    struct Cluster {
        leader: MockServer,
        followers: Vec<MockServer>,
    }

    impl Cluster {
        async fn start(ttl: i64) -> Self {
            let store = GraphStore::new();
            let leader = MockServer::start_with_store(Arc::clone(&store)).await;
            let mut followers = Vec::new();
            for _ in 0..2 {
                followers.push(MockServer::start_with_store(Arc::clone(&store)).await);
            }

            let follower_addresses: Vec<ServerAddress> = followers.iter().map(|f| f.address()).collect();
            let mut routers = vec![leader.address()];
            routers.extend(follower_addresses.iter().cloned());
            let routes = RouteConfig {
                ttl,
                writers: vec![leader.address()],
                readers: follower_addresses,
                routers,
            };
            leader.set_routes(routes.clone());
            for follower in &followers {
                follower.set_routes(routes.clone());
                follower.set_read_only(true);
            }
            Self { leader, followers }
        }

        fn driver(&self) -> Driver {
            self.driver_with(|builder| builder)
        }

        fn driver_with(
            &self,
            tune: impl FnOnce(crate::driver::config::DriverConfigBuilder) -> crate::driver::config::DriverConfigBuilder,
        ) -> Driver {
            let builder = DriverConfig::builder(format!("neo4j://{}", self.leader.address()), "neo4j", "secret");
            new_driver(tune(builder).build()).unwrap()
        }

        fn route_requests(&self) -> usize {
            self.leader.stats().routes + self.followers.iter().map(|f| f.stats().routes).sum::<usize>()
        }
    }

    fn person_params() -> HashMap<String, Value> {
        params! {
            "name" => "Errico",
            "country" => "Italia",
            "year" => 1853,
        }
    }

    const CREATE_PERSON: &str =
        "CREATE (p:Person {name: $name, country: $country, year: $year}) RETURN p;";
    const MATCH_ERRICO: &str = "MATCH (p:Person) WHERE p.name = 'Errico' RETURN p;";
    const MATCH_PERSON: &str = "MATCH (p:Person) WHERE p.name = $name RETURN p";

    #[test]
    fn test_new_driver_rejects_bad_config() {
        let err = new_driver(DriverConfig::new("http://localhost:7474", "neo4j", "pw")).unwrap_err();
        assert!(matches!(err, DriverError::Config(_)));

        let err = new_driver(DriverConfig::new("bolt://localhost", "", "pw")).unwrap_err();
        assert!(matches!(err, DriverError::Config(_)));
    }

    #[tokio::test]
    async fn test_person_write_then_read() {
        let server = MockServer::start().await;
        let driver = direct_driver(&server);

        let written = driver.write(CREATE_PERSON, Some(person_params())).await.unwrap();
        assert_eq!(written.keys, vec!["p".to_string()]);
        assert_eq!(written.summary.counters.nodes_created, 1);
        let node = written.single().unwrap().get_node("p").unwrap();
        assert_eq!(node.labels, vec!["Person".to_string()]);
        assert_eq!(node.props["name"], Value::from("Errico"));
        assert_eq!(node.props["country"], Value::from("Italia"));
        assert_eq!(node.props["year"], Value::Integer(1853));

        let read = driver.read(MATCH_ERRICO, None).await.unwrap();
        assert_eq!(read.keys, vec!["p".to_string()]);
        let found = read.single().unwrap().get_node("p").unwrap();
        assert_eq!(found.element_id, node.element_id);
        assert_eq!(found.props, node.props);

        driver.close().await;
    }

    #[tokio::test]
    async fn test_write_in_read_mode_is_rejected() {
        let server = MockServer::start().await;
        let driver = direct_driver(&server);

        let err = driver
            .execute_query(AccessMode::try_from(1).unwrap(), CREATE_PERSON, Some(person_params()))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Query { .. }), "{}", err);
        assert_eq!(err.code(), Some("Neo.ClientError.Statement.AccessMode"));

        // reset on release, the same connection serves the next call
        driver.write(CREATE_PERSON, Some(person_params())).await.unwrap();
        let stats = server.stats();
        assert_eq!((stats.connections, stats.resets), (1, 1));
        assert!(stats.runs[0].read_only);
        assert!(!stats.runs[1].read_only);
    }

    #[tokio::test]
    async fn test_bolt_4_4_server() {
        let server = MockServer::start_with_version(crate::bolt::BoltVersion::V4_4).await;
        let driver = direct_driver(&server);

        let written = driver.write(CREATE_PERSON, Some(person_params())).await.unwrap();
        let node = written.single().unwrap().get_node("p").unwrap();
        // 4.4 has no element ids, the numeric id stands in
        assert_eq!(node.element_id, node.id.to_string());
        assert_eq!(node.props["name"], Value::from("Errico"));
    }

    #[tokio::test]
    async fn test_result_serializes_as_records() {
        let server = MockServer::start().await;
        let driver = direct_driver(&server);
        driver.write(CREATE_PERSON, Some(person_params())).await.unwrap();

        let result = driver
            .execute_query(AccessMode::try_from(1).unwrap(), MATCH_PERSON, Some(params! { "name" => "Errico" }))
            .await
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();

        let records = json.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["keys"], serde_json::json!(["p"]));
        let node = &records[0]["values"][0];
        assert_eq!(node["labels"], serde_json::json!(["Person"]));
        assert_eq!(node["props"]["name"], "Errico");
        assert_eq!(node["props"]["country"], "Italia");
        assert_eq!(node["props"]["year"], 1853);
        assert!(node["id"].is_i64());
        assert!(node["element_id"].is_string());
    }

    #[tokio::test]
    async fn test_execute_query_without_params() {
        let server = MockServer::start().await;
        let driver = direct_driver(&server);
        let result = driver.execute_query(AccessMode::Write, "RETURN 1 AS n", None).await.unwrap();
        assert_eq!(result.single().unwrap().get("n"), Some(&Value::Integer(1)));
    }

    #[tokio::test]
    async fn test_unreferenced_params_are_forwarded() {
        let server = MockServer::start().await;
        let driver = direct_driver(&server);
        driver
            .write("RETURN 1 AS n", Some(params! { "unused" => "x" }))
            .await
            .unwrap();
        assert_eq!(
            server.stats().runs[0].parameters.get("unused").and_then(|v| v.as_str()),
            Some("x")
        );
    }

    #[tokio::test]
    async fn test_query_error_is_reported_once() {
        let server = MockServer::start().await;
        let driver = direct_driver(&server);

        let err = driver.write("CRATE (p:Person)", None).await.unwrap_err();
        assert_eq!(err.code(), Some("Neo.ClientError.Statement.SyntaxError"));
        assert_eq!(server.stats().runs.len(), 1);

        // the connection was reset and is reused
        driver.write("RETURN 1 AS n", None).await.unwrap();
        assert_eq!(server.stats().connections, 1);
    }

    #[test]
    fn test_bookmarks_keep_concurrent_results() {
        let mut bookmarks = Bookmarks::default();
        bookmarks.update(&[], "FB:1".into());
        assert_eq!(bookmarks.current(), ["FB:1".to_string()]);

        // two calls start from FB:1, the newer one finishes first
        let sent = bookmarks.current().to_vec();
        bookmarks.update(&sent, "FB:3".into());
        bookmarks.update(&sent, "FB:2".into());
        assert_eq!(bookmarks.current(), ["FB:3".to_string(), "FB:2".to_string()]);

        // a call that saw both replaces both
        let sent = bookmarks.current().to_vec();
        bookmarks.update(&sent, "FB:4".into());
        assert_eq!(bookmarks.current(), ["FB:4".to_string()]);
        assert_eq!(bookmarks.latest(), Some("FB:4"));

        // a read returning the bookmark it was given changes nothing
        bookmarks.update(&["FB:4".to_string()], "FB:4".into());
        assert_eq!(bookmarks.current(), ["FB:4".to_string()]);
    }

    #[tokio::test]
    async fn test_bookmarks_chain_write_to_read() {
        let server = MockServer::start().await;
        let driver = direct_driver(&server);

        let written = driver.write(CREATE_PERSON, Some(person_params())).await.unwrap();
        let bookmark = written.summary.bookmark.clone().unwrap();
        assert_eq!(driver.last_bookmark(), Some(bookmark.clone()));

        driver.read(MATCH_PERSON, Some(params! { "name" => "Errico" })).await.unwrap();
        let runs = server.stats().runs;
        assert_eq!(runs[1].bookmarks, vec![bookmark]);
        assert!(runs[1].read_only);
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let server = MockServer::start().await;
        server.set_password("secret");
        let driver = new_driver(DriverConfig::new(
            format!("bolt://{}", server.address()),
            "neo4j",
            "wrong",
        ))
        .unwrap();

        let err = driver.write("RETURN 1 AS n", None).await.unwrap_err();
        assert!(matches!(err, DriverError::Auth { .. }), "{}", err);
        assert!(!err.to_string().contains("wrong"));
    }

    #[tokio::test]
    async fn test_pool_exhausted_at_deadline() {
        let server = MockServer::start().await;
        let driver = new_driver(
            DriverConfig::builder(format!("bolt://{}", server.address()), "neo4j", "secret")
                .with_max_connection_pool_size(1)
                .with_connection_acquisition_timeout(Duration::from_millis(200))
                .build(),
        )
        .unwrap();

        let held = driver.session(AccessMode::Write).await.unwrap();
        let started = std::time::Instant::now();
        let err = driver.write("RETURN 1 AS n", None).await.unwrap_err();
        assert!(matches!(err, DriverError::PoolExhausted { .. }), "{}", err);
        assert!(started.elapsed() >= Duration::from_millis(200));

        held.close().await;
        driver.write("RETURN 1 AS n", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_query_timeout() {
        let server = MockServer::start().await;
        let driver = new_driver(
            DriverConfig::builder(format!("bolt://{}", server.address()), "neo4j", "secret")
                .with_query_timeout(Duration::from_millis(100))
                .build(),
        )
        .unwrap();

        let err = driver.write("CALL test.sleep(2000)", None).await.unwrap_err();
        assert!(matches!(err, DriverError::Timeout(_)), "{}", err);

        let metrics = driver.metrics().pools[&server.address()].clone();
        assert_eq!((metrics.idle, metrics.in_use, metrics.total_destroyed), (0, 0, 1));
    }

    #[tokio::test]
    async fn test_closed_driver_rejects_calls() {
        let server = MockServer::start().await;
        let driver = direct_driver(&server);
        driver.write("RETURN 1 AS n", None).await.unwrap();

        let clone = driver.clone();
        driver.close().await;
        assert!(!clone.is_open());
        assert!(matches!(
            clone.read("RETURN 1 AS n", None).await,
            Err(DriverError::Connection(_))
        ));
        assert!(driver.metrics().pools.is_empty());
        server.wait_until(|stats| stats.goodbyes == 1).await;
    }

    #[tokio::test]
    async fn test_verify_connectivity() {
        let server = MockServer::start().await;
        let driver = direct_driver(&server);
        driver.verify_connectivity().await.unwrap();
        assert_eq!(server.stats().hellos, 1);

        let dead = MockServer::start().await;
        let driver = direct_driver(&dead);
        dead.stop().await;
        assert!(matches!(driver.verify_connectivity().await, Err(DriverError::Connection(_))));
    }

    #[tokio::test]
    async fn test_cluster_person_scenario() {
        let cluster = Cluster::start(300).await;
        let driver = cluster.driver();

        let written = driver.write(CREATE_PERSON, Some(person_params())).await.unwrap();
        assert_eq!(written.summary.server, cluster.leader.address().to_string());
        let created = written.single().unwrap().get_node("p").unwrap();

        let read = driver.read(MATCH_PERSON, Some(params! { "name" => "Errico" })).await.unwrap();
        assert_ne!(read.summary.server, cluster.leader.address().to_string());
        let found = read.single().unwrap().get_node("p").unwrap();
        assert_eq!(found.element_id, created.element_id);

        let table = driver.routing_table().unwrap();
        assert_eq!(table.leader, cluster.leader.address());
        assert_eq!(table.followers.len(), 2);
    }

    #[tokio::test]
    async fn test_writes_stay_on_stable_leader() {
        let cluster = Cluster::start(300).await;
        let driver = cluster.driver();

        for i in 0..5 {
            let result = driver
                .write("CREATE (p:Person {name: $name}) RETURN p", Some(params! { "name" => format!("p{}", i) }))
                .await
                .unwrap();
            assert_eq!(result.summary.server, cluster.leader.address().to_string());
        }
        assert_eq!(cluster.leader.stats().runs.len(), 5);
        assert!(cluster.followers.iter().all(|f| f.stats().runs.is_empty()));
    }

    #[tokio::test]
    async fn test_reads_never_reach_leader() {
        let cluster = Cluster::start(300).await;
        let driver = cluster.driver();

        let mut servers = HashSet::new();
        for _ in 0..6 {
            let result = driver.read("RETURN 1 AS n", None).await.unwrap();
            servers.insert(result.summary.server);
        }
        assert!(!servers.contains(&cluster.leader.address().to_string()));
        // round robin visits both followers
        assert_eq!(servers.len(), 2);
        assert!(cluster.leader.stats().runs.is_empty());
        assert!(cluster.followers.iter().all(|f| f.stats().runs.iter().all(|r| r.read_only)));
    }

    #[tokio::test]
    async fn test_concurrent_callers_trigger_one_refresh() {
        let cluster = Cluster::start(300).await;
        let driver = cluster.driver();

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let driver = driver.clone();
                tokio::spawn(async move {
                    let mode = if i % 2 == 0 { AccessMode::Read } else { AccessMode::Write };
                    driver.execute_query(mode, "RETURN 1 AS n", None).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(cluster.route_requests(), 1);
        assert_eq!(driver.metrics().routing_refreshes, 1);
    }

    #[tokio::test]
    async fn test_expired_table_is_refreshed() {
        let cluster = Cluster::start(0).await;
        let driver = cluster.driver();
        driver.write("RETURN 1 AS n", None).await.unwrap();
        driver.write("RETURN 1 AS n", None).await.unwrap();
        assert_eq!(cluster.route_requests(), 2);
    }

    #[tokio::test]
    async fn test_not_a_leader_forces_refresh() {
        let cluster = Cluster::start(300).await;
        let driver = cluster.driver();
        driver.write("RETURN 1 AS n", None).await.unwrap();

        cluster.leader.set_read_only(true);
        let err = driver.write(CREATE_PERSON, Some(person_params())).await.unwrap_err();
        assert_eq!(err.code(), Some("Neo.ClientError.Cluster.NotALeader"));
        assert!(driver.routing_table().unwrap().is_expired());

        // no retry happened; the next call refreshes
        cluster.leader.set_read_only(false);
        driver.write(CREATE_PERSON, Some(person_params())).await.unwrap();
        assert_eq!(driver.metrics().routing_refreshes, 2);
    }

    #[tokio::test]
    async fn test_dead_follower_is_forgotten() {
        let cluster = Cluster::start(300).await;
        let driver = cluster.driver();
        driver.write("RETURN 1 AS n", None).await.unwrap();

        let dead = cluster.followers[0].address();
        cluster.followers[0].stop().await;

        // round robin hits the dead follower within two reads
        let mut failures = 0;
        for _ in 0..2 {
            if let Err(e) = driver.read("RETURN 1 AS n", None).await {
                assert!(matches!(e, DriverError::Connection(_)), "{}", e);
                failures += 1;
            }
        }
        assert_eq!(failures, 1);

        let table = driver.routing_table().unwrap();
        assert!(!table.followers.contains(&dead));
        for _ in 0..4 {
            let result = driver.read("RETURN 1 AS n", None).await.unwrap();
            assert_eq!(result.summary.server, cluster.followers[1].address().to_string());
        }
    }

    #[tokio::test]
    async fn test_unreachable_cluster_is_routing_error() {
        let dead = MockServer::start().await;
        let address = dead.address();
        dead.stop().await;

        let driver = new_driver(DriverConfig::new(format!("neo4j://{}", address), "neo4j", "secret")).unwrap();
        let err = driver.read("RETURN 1 AS n", None).await.unwrap_err();
        assert!(matches!(err, DriverError::Routing(_)), "{}", err);
    }

    #[tokio::test]
    async fn test_direct_reads_fall_back_to_server() {
        let server = MockServer::start().await;
        let driver = direct_driver(&server);
        driver.read("RETURN 1 AS n", None).await.unwrap();

        let table = driver.routing_table().unwrap();
        assert!(table.is_static());
        assert_eq!(
            crate::driver::routing::select_route(&table, AccessMode::Read, 0).role,
            ServerRole::Leader
        );
        assert_eq!(server.stats().routes, 0);
    }
}
