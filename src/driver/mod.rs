//! Driver Module
//!
//! 클라이언트 드라이버
//!
//! # 구성
//!
//! - [`Driver`] - 설정, 라우팅 테이블, 서버별 연결 풀을 소유
//! - [`ConnectionPool`] - 서버 주소별 상한이 있는 연결 풀
//! - [`routing`] - 라우팅 테이블, 대상 선택, 단일 갱신
//! - [`Session`] - 빌린 연결 하나로 auto-commit 쿼리 실행
//! - [`bolt`] - 연결 상태 기계와 Bolt 클라이언트
//!
//! # Example
//!
//! ```ignore
//! use neo4j_bolt_driver::driver::{new_driver, AccessMode, DriverConfig};
//! use neo4j_bolt_driver::params;
//!
//! // 단일 서버 (bolt://) 또는 클러스터 (neo4j://)
//! let driver = new_driver(DriverConfig::new("neo4j://localhost:7687", "neo4j", "password"))?;
//!
//! // 쓰기는 리더로
//! driver
//!     .write(
//!         "CREATE (p:Person {name: $name, country: $country, year: $year}) RETURN p",
//!         Some(params! { "name" => "Errico", "country" => "Italia", "year" => 1853 }),
//!     )
//!     .await?;
//!
//! // 읽기는 팔로워로, 결과는 JSON 으로 직렬화
//! let result = driver
//!     .execute_query(
//!         AccessMode::Read,
//!         "MATCH (p:Person) WHERE p.name = $name RETURN p",
//!         Some(params! { "name" => "Errico" }),
//!     )
//!     .await?;
//! println!("{}", serde_json::to_string(&result)?);
//!
//! driver.close().await;
//! ```

pub mod bolt;
pub mod routing;
mod config;
mod driver;
mod error;
mod pool;
mod record;
mod session;
mod types;

#[cfg(test)]
mod testkit;

// Re-exports
pub use config::{AuthToken, DriverConfig, DriverConfigBuilder, ServerAddress, DEFAULT_PORT};
pub use driver::{new_driver, Driver, DriverMetrics};
pub use error::{DriverError, DriverResult};
pub use pool::{ConnectionPool, PoolConfig, PoolMetrics, PooledConnection};
pub use record::{Counters, EagerResult, QueryType, Record, ResultSummary};
pub use session::{AccessMode, Query, Session, SessionConfig};
pub use types::{Duration, Node, Path, Point, Relationship, Value};

/// 파라미터 맵 생성 매크로
///
/// ```ignore
/// let params = params! { "name" => "Errico", "year" => 1853 };
/// ```
#[macro_export]
macro_rules! params {
    () => {
        std::collections::HashMap::<String, $crate::driver::Value>::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = std::collections::HashMap::<String, $crate::driver::Value>::new();
        $(
            map.insert(String::from($key), $crate::driver::Value::from($value));
        )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_macro() {
        let empty = params! {};
        assert!(empty.is_empty());

        let params = params! { "name" => "Errico", "year" => 1853, };
        assert_eq!(params.len(), 2);
        assert_eq!(params["name"], Value::from("Errico"));
        assert_eq!(params["year"], Value::Integer(1853));
    }
}
