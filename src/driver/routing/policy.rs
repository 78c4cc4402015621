//! 라우팅 정책
//!
//! 읽기 서버 선택 커서를 공급합니다. 실제 선택은 [`select_route`] 가 합니다.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use serde::Deserialize;

use super::super::session::AccessMode;
use super::table::{select_route, Route, RoutingTable};

/// 라우팅 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPolicy {
    /// 라운드 로빈 (기본값)
    #[default]
    RoundRobin,
    /// 랜덤
    Random,
}

/// 서버 선택기
#[derive(Debug)]
pub struct ServerSelector {
    /// 라우팅 정책
    policy: RoutingPolicy,
    /// 라운드 로빈 인덱스
    round_robin_index: AtomicUsize,
}

impl ServerSelector {
    /// 새 선택기 생성
    pub fn new(policy: RoutingPolicy) -> Self {
        Self {
            policy,
            round_robin_index: AtomicUsize::new(0),
        }
    }

    /// 다음 커서
    pub fn cursor(&self) -> usize {
        match self.policy {
            RoutingPolicy::RoundRobin => self.round_robin_index.fetch_add(1, Ordering::Relaxed),
            RoutingPolicy::Random => rand::thread_rng().gen(),
        }
    }

    /// 테이블에서 접근 모드에 맞는 서버 선택
    pub fn select(&self, table: &RoutingTable, mode: AccessMode) -> Route {
        // 쓰기는 커서를 소비하지 않음
        match mode {
            AccessMode::Write => select_route(table, mode, 0),
            AccessMode::Read => select_route(table, mode, self.cursor()),
        }
    }

    /// 현재 정책 조회
    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }
}

impl Default for ServerSelector {
    fn default() -> Self {
        Self::new(RoutingPolicy::default())
    }
}
