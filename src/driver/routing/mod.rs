//! 라우팅 모듈
//!
//! 클러스터 환경에서 접근 모드별 대상 서버를 결정합니다.
//!
//! # 개요
//!
//! `neo4j://` 스킴은 클러스터 라우팅을 사용합니다. 쓰기는 리더로,
//! 읽기는 팔로워 또는 읽기 복제본으로 라운드 로빈 분산됩니다.
//! `bolt://` 는 URI 의 서버 하나를 리더로 하는 고정 테이블을 사용합니다.
//!
//! - [`RoutingTable`] - 리더/팔로워/읽기 복제본과 유효 기한
//! - [`select_route`] - 테이블과 접근 모드로 대상을 고르는 순수 함수
//! - [`RoutingTableManager`] - 단일 갱신과 만료 전 테이블 재사용
//! - [`Rediscovery`] - ROUTE 조회 경계
//!
//! # 예시
//!
//! ```ignore
//! use neo4j_bolt_driver::driver::routing::{select_route, RoutingTable};
//! use neo4j_bolt_driver::{AccessMode, ServerAddress};
//!
//! let table = RoutingTable::direct(ServerAddress::new("localhost", 7687));
//! let route = select_route(&table, AccessMode::Read, 0);
//! assert_eq!(route.address, table.leader);
//! ```

mod manager;
mod policy;
mod rediscovery;
mod table;

pub use manager::RoutingTableManager;
pub use policy::{RoutingPolicy, ServerSelector};
pub use rediscovery::{Rediscovery, RouteRediscovery};
pub use table::{select_route, Route, RoutingTable, ServerRole};
