//! 라우팅 테이블 관리자
//!
//! 현재 테이블을 공유하고, 갱신은 한 번에 하나만 수행합니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::super::config::ServerAddress;
use super::super::error::{DriverError, DriverResult};
use super::rediscovery::Rediscovery;
use super::table::RoutingTable;

/// 라우팅 테이블 관리자
///
/// - 많은 호출자가 동시에 테이블을 읽습니다 (`Arc` 스냅샷).
/// - 동시에 갱신이 필요해져도 네트워크 조회는 한 번만 일어납니다.
/// - 갱신 실패 시 아직 만료되지 않은 테이블은 계속 사용합니다.
pub struct RoutingTableManager {
    /// 초기 라우터 (URI 주소)
    initial_router: ServerAddress,
    /// 대상 데이터베이스
    database: Option<String>,
    /// 조회 구현, 없으면 고정 테이블 (`bolt://`)
    rediscovery: Option<Arc<dyn Rediscovery>>,
    /// 현재 테이블
    table: RwLock<Option<Arc<RoutingTable>>>,
    /// 갱신 직렬화
    refresh_lock: tokio::sync::Mutex<()>,
    /// 성공한 갱신 횟수
    refreshes: AtomicU64,
}

impl RoutingTableManager {
    /// 클러스터 라우팅 관리자 (`neo4j://`)
    ///
    /// 첫 호출 때 테이블을 가져옵니다.
    pub fn new(
        initial_router: ServerAddress,
        database: Option<String>,
        rediscovery: Arc<dyn Rediscovery>,
    ) -> Self {
        Self {
            initial_router,
            database,
            rediscovery: Some(rediscovery),
            table: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            refreshes: AtomicU64::new(0),
        }
    }

    /// 직접 연결 관리자 (`bolt://`)
    pub fn direct(address: ServerAddress) -> Self {
        Self {
            table: RwLock::new(Some(Arc::new(RoutingTable::direct(address.clone())))),
            initial_router: address,
            database: None,
            rediscovery: None,
            refresh_lock: tokio::sync::Mutex::new(()),
            refreshes: AtomicU64::new(0),
        }
    }

    /// 현재 테이블 (갱신하지 않음)
    pub fn current(&self) -> Option<Arc<RoutingTable>> {
        self.table.read().clone()
    }

    /// 성공한 갱신 횟수
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// 사용할 수 있는 테이블 조회, 필요하면 갱신
    pub async fn table(&self) -> DriverResult<Arc<RoutingTable>> {
        let rediscovery = match &self.rediscovery {
            Some(rediscovery) => rediscovery,
            None => return self.current().ok_or_else(|| DriverError::routing("no routing table")),
        };

        let cached = self.current();
        if let Some(table) = &cached {
            if !table.needs_refresh() {
                return Ok(Arc::clone(table));
            }
        }

        // 다른 호출자가 갱신 중이면 만료 전 테이블은 기다리지 않고 사용
        let _guard = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => match cached {
                Some(table) if !table.is_expired() => return Ok(table),
                _ => self.refresh_lock.lock().await,
            },
        };

        // 잠금을 기다리는 동안 갱신되었을 수 있음
        let stale = self.current();
        if let Some(table) = &stale {
            if !table.needs_refresh() {
                return Ok(Arc::clone(table));
            }
        }

        let routers = self.routers(stale.as_deref());
        match rediscovery.discover(&routers, self.database.as_deref()).await {
            Ok(table) => {
                tracing::info!(
                    leader = %table.leader,
                    followers = table.followers.len(),
                    read_replicas = table.read_replicas.len(),
                    ttl = ?table.ttl,
                    "routing table refreshed"
                );
                let table = Arc::new(table);
                *self.table.write() = Some(Arc::clone(&table));
                self.refreshes.fetch_add(1, Ordering::Relaxed);
                Ok(table)
            }
            Err(e) => match stale {
                Some(table) if !table.is_expired() => {
                    tracing::warn!(error = %e, leader = %table.leader, "routing refresh failed; serving stale table");
                    Ok(table)
                }
                _ => Err(match e {
                    e @ (DriverError::Routing(_) | DriverError::Auth { .. }) => e,
                    other => DriverError::routing(format!("cannot fetch routing table: {}", other)),
                }),
            },
        }
    }

    /// 조회할 라우터 목록 (직전 테이블의 라우터, 그 다음 초기 라우터)
    fn routers(&self, table: Option<&RoutingTable>) -> Vec<ServerAddress> {
        let mut routers: Vec<ServerAddress> = table.map(|t| t.routers.clone()).unwrap_or_default();
        if !routers.contains(&self.initial_router) {
            routers.push(self.initial_router.clone());
        }
        routers
    }

    /// 실패한 서버를 테이블에서 제외
    ///
    /// 리더였다면 테이블이 만료되어 다음 호출이 갱신합니다. 고정 테이블은 그대로 둡니다.
    pub fn forget(&self, address: &ServerAddress) {
        if self.rediscovery.is_none() {
            return;
        }
        let mut table = self.table.write();
        let next = table
            .as_ref()
            .map(|current| (current.leader == *address, current.without(address)));
        if let Some((was_leader, next)) = next {
            *table = Some(Arc::new(next));
            tracing::debug!(%address, was_leader, "server removed from routing table");
        }
    }
}

impl std::fmt::Debug for RoutingTableManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingTableManager")
            .field("initial_router", &self.initial_router)
            .field("database", &self.database)
            .field("table", &self.current())
            .field("refreshes", &self.refresh_count())
            .finish()
    }
}
