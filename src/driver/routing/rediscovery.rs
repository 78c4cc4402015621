//! 라우팅 테이블 조회
//!
//! 라우터에 연결해 ROUTE 로 현재 클러스터 구성을 받아옵니다.

use std::time::Instant;

use futures::future::BoxFuture;

use super::super::bolt::{BoltClient, ConnectOptions};
use super::super::config::ServerAddress;
use super::super::error::{DriverError, DriverResult};
use super::table::RoutingTable;

/// 라우팅 테이블을 가져오는 네트워크 호출
///
/// 갱신 관리자는 이 트레이트만 알고, 실제 연결은 구현체가 담당합니다.
pub trait Rediscovery: Send + Sync {
    /// `routers` 를 순서대로 시도해 `database` 의 라우팅 테이블을 가져옴
    fn discover<'a>(
        &'a self,
        routers: &'a [ServerAddress],
        database: Option<&'a str>,
    ) -> BoxFuture<'a, DriverResult<RoutingTable>>;
}

/// ROUTE 메시지 기반 구현
///
/// 라우터마다 전용 연결을 열고 (HELLO + ROUTE) 바로 닫습니다.
/// 풀의 연결을 쓰지 않으므로 풀이 가득 차도 갱신은 막히지 않습니다.
#[derive(Debug, Clone)]
pub struct RouteRediscovery {
    options: ConnectOptions,
}

impl RouteRediscovery {
    /// 새 구현 생성
    pub fn new(options: ConnectOptions) -> Self {
        Self { options }
    }

    async fn fetch(&self, router: &ServerAddress, database: Option<&str>) -> DriverResult<RoutingTable> {
        let mut client = BoltClient::connect(router, &self.options).await?;
        let routing = self.options.routing_context.clone().unwrap_or_default();
        let response = client.route(routing, Vec::new(), database.map(String::from)).await;
        client.close().await;

        let success = response?;
        let rt = success
            .get("rt")
            .ok_or_else(|| DriverError::routing(format!("ROUTE response from {} has no 'rt'", router)))?;
        RoutingTable::from_route_response(rt, Instant::now())
    }
}

impl Rediscovery for RouteRediscovery {
    fn discover<'a>(
        &'a self,
        routers: &'a [ServerAddress],
        database: Option<&'a str>,
    ) -> BoxFuture<'a, DriverResult<RoutingTable>> {
        Box::pin(async move {
            let mut last_error = None;
            for router in routers {
                match self.fetch(router, database).await {
                    Ok(table) => return Ok(table),
                    // 다른 라우터도 같은 자격 증명을 거부함
                    Err(e @ DriverError::Auth { .. }) => return Err(e),
                    Err(e) => {
                        tracing::warn!(%router, error = %e, "router failed to provide a routing table");
                        last_error = Some(e);
                    }
                }
            }
            Err(DriverError::routing(match last_error {
                Some(e) => format!("no router could provide a routing table, last error: {}", e),
                None => "no routers to query".to_string(),
            }))
        })
    }
}
