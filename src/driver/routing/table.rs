//! 라우팅 테이블
//!
//! 클러스터의 리더/팔로워/읽기 복제본 목록과 유효 기한을 관리합니다.
//! 테이블은 만들어진 뒤 변경되지 않으며, 갱신은 새 테이블로 교체하는 방식입니다.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::super::config::ServerAddress;
use super::super::error::{DriverError, DriverResult};
use super::super::session::AccessMode;
use crate::bolt::PackStreamValue;

/// 테이블 갱신 시점 (TTL 대비 비율)
const REFRESH_RATIO: f64 = 0.8;

/// 서버가 보낸 TTL 의 상한 (30일)
pub const MAX_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

// ============================================================================
// ServerRole - 서버 역할
// ============================================================================

/// 서버 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerRole {
    /// 쓰기 처리 (리더)
    Leader,
    /// 읽기 처리, 라우터 겸임
    Follower,
    /// 읽기 전용 복제본
    ReadReplica,
}

impl ServerRole {
    /// 역할 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leader => "LEADER",
            Self::Follower => "FOLLOWER",
            Self::ReadReplica => "READ_REPLICA",
        }
    }
}

impl std::fmt::Display for ServerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 라우팅 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// 선택된 서버의 역할
    pub role: ServerRole,
    /// 서버 주소
    pub address: ServerAddress,
}

// ============================================================================
// RoutingTable - 라우팅 테이블
// ============================================================================

/// 라우팅 테이블
///
/// 만료되지 않은 테이블에는 항상 리더가 정확히 하나 있습니다.
/// 팔로워와 읽기 복제본은 비어 있을 수 있으며, 이 경우 읽기는 리더로 갑니다.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    /// 리더 (쓰기 대상)
    pub leader: ServerAddress,
    /// 팔로워 목록
    pub followers: Vec<ServerAddress>,
    /// 읽기 복제본 목록
    pub read_replicas: Vec<ServerAddress>,
    /// 다음 갱신 때 질의할 라우터 목록
    pub routers: Vec<ServerAddress>,
    /// 데이터베이스 이름 (서버가 알려준 경우)
    pub database: Option<String>,
    /// TTL
    pub ttl: Duration,
    /// 갱신 시점, 없으면 갱신하지 않음
    refresh_at: Option<Instant>,
    /// 만료 시점, 없으면 만료되지 않음
    expiry: Option<Instant>,
}

impl RoutingTable {
    /// 직접 연결용 고정 테이블 (`bolt://`)
    ///
    /// 리더 하나뿐이고 만료되지 않습니다.
    pub fn direct(address: ServerAddress) -> Self {
        Self {
            leader: address.clone(),
            followers: Vec::new(),
            read_replicas: Vec::new(),
            routers: vec![address],
            database: None,
            ttl: Duration::MAX,
            refresh_at: None,
            expiry: None,
        }
    }

    /// ROUTE 응답의 `rt` 항목으로 테이블 생성
    ///
    /// `rt = {ttl, db, servers: [{role, addresses}]}`
    ///
    /// - 첫 WRITE 주소가 리더 (나머지 WRITE 주소는 무시)
    /// - ROUTE 에도 있는 READ 주소는 팔로워, 나머지 READ 주소는 읽기 복제본
    /// - WRITE 주소가 없으면 에러
    pub fn from_route_response(rt: &PackStreamValue, received_at: Instant) -> DriverResult<Self> {
        let rt = rt
            .as_map()
            .ok_or_else(|| DriverError::routing("ROUTE response 'rt' is not a map"))?;

        let ttl_secs = rt
            .get("ttl")
            .and_then(PackStreamValue::as_int)
            .ok_or_else(|| DriverError::routing("ROUTE response has no integer 'ttl'"))?;
        let ttl = Duration::from_secs(ttl_secs.max(0) as u64).min(MAX_TTL);
        let database = rt.get("db").and_then(PackStreamValue::as_str).map(String::from);

        let servers = rt
            .get("servers")
            .and_then(PackStreamValue::as_list)
            .ok_or_else(|| DriverError::routing("ROUTE response has no 'servers' list"))?;

        let mut by_role: HashMap<String, Vec<ServerAddress>> = HashMap::new();
        for server in servers {
            let entry = server
                .as_map()
                .ok_or_else(|| DriverError::routing("ROUTE server entry is not a map"))?;
            let role = entry
                .get("role")
                .and_then(PackStreamValue::as_str)
                .ok_or_else(|| DriverError::routing("ROUTE server entry has no role"))?;
            let addresses = entry
                .get("addresses")
                .and_then(PackStreamValue::as_list)
                .ok_or_else(|| DriverError::routing("ROUTE server entry has no addresses"))?;

            let list = by_role.entry(role.to_ascii_uppercase()).or_default();
            for address in addresses {
                let text = address
                    .as_str()
                    .ok_or_else(|| DriverError::routing("ROUTE address is not a string"))?;
                let address = ServerAddress::parse(text)
                    .map_err(|e| DriverError::routing(format!("ROUTE returned a bad address: {}", e)))?;
                if !list.contains(&address) {
                    list.push(address);
                }
            }
        }

        let mut writers = by_role.remove("WRITE").unwrap_or_default().into_iter();
        let leader = writers
            .next()
            .ok_or_else(|| DriverError::routing("routing table has no leader (no WRITE address)"))?;
        let ignored: Vec<ServerAddress> = writers.collect();
        if !ignored.is_empty() {
            tracing::warn!(%leader, ?ignored, "routing table lists several writers; using the first");
        }

        let routers = by_role.remove("ROUTE").unwrap_or_default();
        let (followers, read_replicas): (Vec<_>, Vec<_>) = by_role
            .remove("READ")
            .unwrap_or_default()
            .into_iter()
            .filter(|address| *address != leader)
            .partition(|address| routers.contains(address));

        Ok(Self {
            leader,
            followers,
            read_replicas,
            routers,
            database,
            ttl,
            refresh_at: Some(received_at + ttl.mul_f64(REFRESH_RATIO)),
            expiry: Some(received_at + ttl),
        })
    }

    /// TTL 의 100% 가 지났는지 여부
    pub fn is_expired(&self) -> bool {
        self.expiry.is_some_and(|expiry| Instant::now() >= expiry)
    }

    /// TTL 의 80% 가 지났는지 여부
    pub fn needs_refresh(&self) -> bool {
        self.refresh_at.is_some_and(|at| Instant::now() >= at)
    }

    /// 갱신이 필요 없는 고정 테이블인지 여부
    pub fn is_static(&self) -> bool {
        self.expiry.is_none()
    }

    /// 읽기 대상 (팔로워 다음 읽기 복제본)
    pub fn readers(&self) -> impl Iterator<Item = &ServerAddress> {
        self.followers.iter().chain(self.read_replicas.iter())
    }

    /// 실패한 서버를 뺀 테이블
    ///
    /// 리더를 빼면 테이블은 즉시 만료되어 다음 호출이 갱신합니다.
    pub fn without(&self, address: &ServerAddress) -> Self {
        let mut table = self.clone();
        table.followers.retain(|a| a != address);
        table.read_replicas.retain(|a| a != address);
        table.routers.retain(|a| a != address);
        if table.leader == *address && !table.is_static() {
            let now = Instant::now();
            table.refresh_at = Some(now);
            table.expiry = Some(now);
        }
        table
    }
}

// ============================================================================
// select_route - 라우팅 함수
// ============================================================================

/// 접근 모드에 따른 대상 서버 선택
///
/// - WRITE: 항상 리더
/// - READ: 팔로워와 읽기 복제본을 순서대로 이어 `cursor % len` 번째,
///   둘 다 없으면 리더
pub fn select_route(table: &RoutingTable, mode: AccessMode, cursor: usize) -> Route {
    let leader = || Route {
        role: ServerRole::Leader,
        address: table.leader.clone(),
    };

    match mode {
        AccessMode::Write => leader(),
        AccessMode::Read => {
            let readers = table.followers.len() + table.read_replicas.len();
            if readers == 0 {
                return leader();
            }
            let index = cursor % readers;
            if let Some(address) = table.followers.get(index) {
                Route {
                    role: ServerRole::Follower,
                    address: address.clone(),
                }
            } else {
                Route {
                    role: ServerRole::ReadReplica,
                    address: table.read_replicas[index - table.followers.len()].clone(),
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
