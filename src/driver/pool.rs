//! Connection Pool
//!
//! 서버 주소별 연결 풀
//!
//! - 용량은 세마포어로 제한되며, 살아있는 연결(유휴 또는 대여 중)마다 permit 하나를 보유합니다.
//!   연결이 폐기되면 permit 이 즉시 반납되어 대기자가 새 연결을 열 수 있습니다.
//! - 유휴 집합은 주소별 잠금으로 보호되므로 한 서버의 경합이 다른 서버를 막지 않습니다.
//! - 대여된 연결은 [`PooledConnection::release`] 로 한 번만 반환됩니다 (소유권 소비).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore, TryAcquireError};

use super::bolt::{BoltClient, ConnectOptions, ConnectionState};
use super::config::{DriverConfig, ServerAddress};
use super::error::{DriverError, DriverResult};

// ============================================================================
// PoolConfig - 풀 설정
// ============================================================================

/// 연결 풀 설정
///
/// | 필드 | 기본값 | 설명 |
/// |------|--------|------|
/// | `max_size` | 100 | 주소별 최대 연결 수 |
/// | `max_lifetime` | 1시간 | 생성 후 이 시간이 지난 유휴 연결은 폐기 |
/// | `idle_timeout` | 5분 | 이 시간 이상 쉰 유휴 연결은 폐기 |
/// | `connection_timeout` | 30초 | 새 연결(TCP + 핸드셰이크 + HELLO) 제한 시간 |
/// | `acquisition_timeout` | 60초 | 기본 획득 대기 시간 |
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// 최대 연결 수
    pub max_size: usize,
    /// 연결 최대 수명
    pub max_lifetime: Duration,
    /// 유휴 타임아웃
    pub idle_timeout: Duration,
    /// 연결 타임아웃
    pub connection_timeout: Duration,
    /// 획득 타임아웃
    pub acquisition_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            max_lifetime: Duration::from_secs(3600),
            idle_timeout: Duration::from_secs(300),
            connection_timeout: Duration::from_secs(30),
            acquisition_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&DriverConfig> for PoolConfig {
    fn from(config: &DriverConfig) -> Self {
        Self {
            max_size: config.max_connection_pool_size,
            max_lifetime: config.max_connection_lifetime,
            idle_timeout: config.idle_timeout,
            connection_timeout: config.connection_timeout,
            acquisition_timeout: config.connection_acquisition_timeout,
        }
    }
}

// ============================================================================
// PooledConnection - 대여된 연결
// ============================================================================

/// 풀에 있는 유휴 연결
struct IdleConnection {
    id: u64,
    client: BoltClient,
    permit: OwnedSemaphorePermit,
    created_at: Instant,
    last_used: Instant,
}

impl IdleConnection {
    fn is_reusable(&self, config: &PoolConfig, now: Instant) -> bool {
        self.client.state() == ConnectionState::Ready
            && now.duration_since(self.created_at) < config.max_lifetime
            && now.duration_since(self.last_used) < config.idle_timeout
    }
}

/// 반환되지 않고 drop 된 연결을 감지
struct Lease {
    pool: Arc<ConnectionPool>,
    id: u64,
    released: bool,
}

impl Drop for Lease {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(
                address = %self.pool.address,
                connection = self.id,
                "pooled connection dropped without release; closing it"
            );
            self.pool.in_use.fetch_sub(1, Ordering::Relaxed);
            self.pool.total_destroyed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// 풀에서 대여한 연결
///
/// [`release`](Self::release) 가 `self` 를 소비하므로 이중 반환이나 반환 후 사용은
/// 컴파일되지 않습니다. 반환 없이 drop 되면 연결은 닫히고 용량이 회수됩니다.
pub struct PooledConnection {
    client: BoltClient,
    permit: OwnedSemaphorePermit,
    created_at: Instant,
    lease: Lease,
}

impl PooledConnection {
    /// 연결 ID (풀 안에서 고유)
    pub fn id(&self) -> u64 {
        self.lease.id
    }

    /// 서버 주소
    pub fn address(&self) -> &ServerAddress {
        &self.lease.pool.address
    }

    /// 연결 상태
    pub fn state(&self) -> ConnectionState {
        self.client.state()
    }

    /// Bolt 클라이언트
    pub fn client_mut(&mut self) -> &mut BoltClient {
        &mut self.client
    }

    /// 연결 반환
    ///
    /// - `Ready`: 유휴 집합으로 복귀
    /// - `AwaitingReset`: RESET 후 복귀, RESET 실패 시 폐기
    /// - 그 외: 폐기
    pub async fn release(self) {
        let PooledConnection {
            mut client,
            permit,
            created_at,
            mut lease,
        } = self;
        lease.released = true;
        let pool = Arc::clone(&lease.pool);
        pool.in_use.fetch_sub(1, Ordering::Relaxed);

        if client.state() == ConnectionState::AwaitingReset {
            if let Err(e) = client.reset().await {
                tracing::warn!(address = %pool.address, connection = lease.id, error = %e, "RESET failed");
            }
        }

        if pool.closed.load(Ordering::Acquire) || client.state() != ConnectionState::Ready {
            tracing::debug!(
                address = %pool.address,
                connection = lease.id,
                state = ?client.state(),
                "destroying released connection"
            );
            pool.destroy(client).await;
            drop(permit);
            return;
        }

        tracing::debug!(address = %pool.address, connection = lease.id, "connection returned to pool");
        pool.idle.lock().push_back(IdleConnection {
            id: lease.id,
            client,
            permit,
            created_at,
            last_used: Instant::now(),
        });
        pool.returned.notify_one();
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.lease.id)
            .field("address", &self.lease.pool.address)
            .field("state", &self.client.state())
            .field("age", &self.created_at.elapsed())
            .finish()
    }
}

// ============================================================================
// PoolMetrics - 풀 메트릭
// ============================================================================

/// 풀 메트릭
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolMetrics {
    /// 유휴 연결 수
    pub idle: usize,
    /// 사용 중인 연결 수
    pub in_use: usize,
    /// 현재 연결 수 (유휴 + 사용 중)
    pub total: usize,
    /// 총 생성 횟수
    pub total_created: u64,
    /// 총 폐기 횟수
    pub total_destroyed: u64,
    /// 총 획득 횟수
    pub total_acquisitions: u64,
    /// 총 획득 타임아웃 횟수
    pub total_timeouts: u64,
}

// ============================================================================
// ConnectionPool - 연결 풀
// ============================================================================

/// 한 서버 주소에 대한 연결 풀
pub struct ConnectionPool {
    /// 서버 주소
    address: ServerAddress,
    /// 풀 설정
    config: PoolConfig,
    /// 새 연결 옵션
    options: ConnectOptions,
    /// 유휴 연결들
    idle: Mutex<VecDeque<IdleConnection>>,
    /// 세마포어 (연결 수 제한)
    semaphore: Arc<Semaphore>,
    /// 연결 반환 알림
    returned: Notify,
    /// 닫힘 여부
    closed: AtomicBool,
    /// 사용 중인 연결 수
    in_use: AtomicUsize,
    /// 다음 연결 ID
    next_id: AtomicU64,
    total_created: AtomicU64,
    total_destroyed: AtomicU64,
    total_acquisitions: AtomicU64,
    total_timeouts: AtomicU64,
}

impl ConnectionPool {
    /// 새 연결 풀 생성
    pub fn new(address: ServerAddress, config: PoolConfig, options: ConnectOptions) -> Arc<Self> {
        let semaphore = Arc::new(Semaphore::new(config.max_size));
        Arc::new(Self {
            address,
            config,
            options,
            idle: Mutex::new(VecDeque::new()),
            semaphore,
            returned: Notify::new(),
            closed: AtomicBool::new(false),
            in_use: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
            total_created: AtomicU64::new(0),
            total_destroyed: AtomicU64::new(0),
            total_acquisitions: AtomicU64::new(0),
            total_timeouts: AtomicU64::new(0),
        })
    }

    /// 서버 주소
    pub fn address(&self) -> &ServerAddress {
        &self.address
    }

    /// 설정된 기본 대기 시간으로 연결 획득
    pub async fn acquire(self: &Arc<Self>) -> DriverResult<PooledConnection> {
        self.acquire_within(self.config.acquisition_timeout).await
    }

    /// 연결 획득
    ///
    /// 1. 재사용 가능한 유휴 연결 (수명/유휴 한도를 넘긴 연결은 이때 폐기)
    /// 2. 용량이 남아 있으면 새 연결
    /// 3. 둘 다 안 되면 반환 또는 용량 회수를 `timeout` 까지 대기 후 `PoolExhausted`
    pub async fn acquire_within(self: &Arc<Self>, timeout: Duration) -> DriverResult<PooledConnection> {
        let started = Instant::now();
        let deadline = tokio::time::Instant::from_std(started + timeout);

        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(self.closed_error());
            }

            // 확인과 대기 사이의 반환 알림을 놓치지 않도록 먼저 등록
            let returned = self.returned.notified();
            tokio::pin!(returned);
            returned.as_mut().enable();

            if let Some(idle) = self.take_idle().await {
                return Ok(self.lend(idle.id, idle.client, idle.permit, idle.created_at));
            }

            let permit = match Arc::clone(&self.semaphore).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(TryAcquireError::Closed) => return Err(self.closed_error()),
                Err(TryAcquireError::NoPermits) => None,
            };
            if let Some(permit) = permit {
                return self.open(permit).await;
            }

            tokio::select! {
                _ = &mut returned => continue,
                permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                    Ok(permit) => return self.open(permit).await,
                    Err(_) => return Err(self.closed_error()),
                },
                _ = tokio::time::sleep_until(deadline) => {
                    self.total_timeouts.fetch_add(1, Ordering::Relaxed);
                    return Err(DriverError::PoolExhausted {
                        address: self.address.clone(),
                        waited: started.elapsed(),
                    });
                }
            }
        }
    }

    /// 재사용 가능한 유휴 연결 꺼내기, 만료된 연결은 폐기
    async fn take_idle(&self) -> Option<IdleConnection> {
        let now = Instant::now();
        let mut expired = Vec::new();
        let found = {
            let mut idle = self.idle.lock();
            let mut found = None;
            while let Some(conn) = idle.pop_front() {
                if conn.is_reusable(&self.config, now) {
                    found = Some(conn);
                    break;
                }
                expired.push(conn);
            }
            found
        };

        for conn in expired {
            tracing::debug!(
                address = %self.address,
                connection = conn.id,
                age = ?now.duration_since(conn.created_at),
                idle = ?now.duration_since(conn.last_used),
                "evicting idle connection"
            );
            self.destroy(conn.client).await;
        }
        found
    }

    /// 새 연결 열기 (permit 은 연결 수명 동안 보유)
    async fn open(self: &Arc<Self>, permit: OwnedSemaphorePermit) -> DriverResult<PooledConnection> {
        let client = tokio::time::timeout(
            self.config.connection_timeout,
            BoltClient::connect(&self.address, &self.options),
        )
        .await
        .map_err(|_| {
            DriverError::timeout(format!(
                "opening a connection to {} took longer than {:?}",
                self.address, self.config.connection_timeout
            ))
        })??;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.total_created.fetch_add(1, Ordering::Relaxed);
        Ok(self.lend(id, client, permit, Instant::now()))
    }

    fn lend(
        self: &Arc<Self>,
        id: u64,
        client: BoltClient,
        permit: OwnedSemaphorePermit,
        created_at: Instant,
    ) -> PooledConnection {
        self.total_acquisitions.fetch_add(1, Ordering::Relaxed);
        self.in_use.fetch_add(1, Ordering::Relaxed);
        PooledConnection {
            client,
            permit,
            created_at,
            lease: Lease {
                pool: Arc::clone(self),
                id,
                released: false,
            },
        }
    }

    async fn destroy(&self, mut client: BoltClient) {
        client.close().await;
        self.total_destroyed.fetch_add(1, Ordering::Relaxed);
    }

    fn closed_error(&self) -> DriverError {
        DriverError::connection(format!("connection pool for {} is closed", self.address))
    }

    /// 풀 닫기
    ///
    /// 유휴 연결을 닫고, 이후 획득은 실패합니다. 대여 중인 연결은 반환될 때 닫힙니다.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.semaphore.close();
        self.returned.notify_waiters();

        let idle: Vec<IdleConnection> = self.idle.lock().drain(..).collect();
        for conn in idle {
            self.destroy(conn.client).await;
        }
        tracing::debug!(address = %self.address, "connection pool closed");
    }

    /// 닫힘 여부
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 메트릭 조회
    pub fn metrics(&self) -> PoolMetrics {
        let idle = self.idle.lock().len();
        let in_use = self.in_use.load(Ordering::Relaxed);
        PoolMetrics {
            idle,
            in_use,
            total: idle + in_use,
            total_created: self.total_created.load(Ordering::Relaxed),
            total_destroyed: self.total_destroyed.load(Ordering::Relaxed),
            total_acquisitions: self.total_acquisitions.load(Ordering::Relaxed),
            total_timeouts: self.total_timeouts.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("address", &self.address)
            .field("metrics", &self.metrics())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
