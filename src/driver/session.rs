//! Session
//!
//! 세션 관리
//!
//! 세션은 풀에서 빌린 연결 하나를 독점합니다. `run` 은 `&mut self` 를 받으므로
//! 한 세션에서 동시에 두 쿼리가 실행될 수 없고, `close` 는 `self` 를 소비하므로
//! 연결은 정확히 한 번 반환됩니다.

use std::collections::HashMap;
use std::time::Duration;

use super::bolt::ConnectionState;
use super::error::{DriverError, DriverResult};
use super::pool::PooledConnection;
use super::record::EagerResult;
use super::types::Value;
use crate::bolt::message::Run;
use crate::bolt::BoltVersion;

// ============================================================================
// AccessMode - 접근 모드
// ============================================================================

/// 접근 모드
///
/// 호스트 경계에서는 정수로 전달됩니다 (0 = 쓰기, 1 = 읽기).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessMode {
    /// 쓰기 (리더)
    #[default]
    Write,
    /// 읽기 (팔로워 또는 읽기 복제본)
    Read,
}

impl AccessMode {
    /// 모드 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Write => "WRITE",
            Self::Read => "READ",
        }
    }
}

impl TryFrom<i64> for AccessMode {
    type Error = DriverError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Write),
            1 => Ok(Self::Read),
            other => Err(DriverError::config(format!(
                "Invalid access mode {} (expected 0 for WRITE or 1 for READ)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Query - 쿼리
// ============================================================================

/// 쿼리
///
/// 쿼리 텍스트가 참조하지 않는 파라미터도 그대로 서버에 전달됩니다.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// 쿼리 텍스트
    pub text: String,
    /// 파라미터
    pub parameters: HashMap<String, Value>,
}

impl Query {
    /// 새 쿼리 생성
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: HashMap::new(),
        }
    }

    /// 파라미터 추가
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// 파라미터들 추가 (`None` 은 빈 파라미터)
    pub fn with_params(mut self, params: Option<HashMap<String, Value>>) -> Self {
        if let Some(params) = params {
            self.parameters.extend(params);
        }
        self
    }

    /// RUN 메시지로 변환
    pub(crate) fn into_run(self, version: BoltVersion, config: &SessionConfig, bookmarks: Vec<String>) -> DriverResult<Run> {
        let parameters = self
            .parameters
            .into_iter()
            .map(|(k, v)| Ok((k, v.into_packstream(version)?)))
            .collect::<DriverResult<_>>()?;
        Ok(Run {
            query: self.text,
            parameters,
            database: config.database.clone(),
            bookmarks,
            read_only: config.access_mode == AccessMode::Read,
        })
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Query {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// SessionConfig - 세션 설정
// ============================================================================

/// 세션 설정
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// 접근 모드
    pub access_mode: AccessMode,
    /// 데이터베이스 이름
    pub database: Option<String>,
    /// Fetch Size (-1 = 전체)
    pub fetch_size: i64,
    /// 쿼리 타임아웃
    pub query_timeout: Option<Duration>,
    /// 첫 쿼리와 함께 보낼 북마크
    pub bookmarks: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_mode: AccessMode::Write,
            database: None,
            fetch_size: -1,
            query_timeout: None,
            bookmarks: Vec::new(),
        }
    }
}

// ============================================================================
// Session - 세션
// ============================================================================

/// 데이터베이스 세션
pub struct Session {
    /// 빌린 연결
    connection: PooledConnection,
    /// 세션 설정
    config: SessionConfig,
    /// 마지막 북마크
    last_bookmark: Option<String>,
}

impl Session {
    /// 빌린 연결로 세션 생성
    pub fn new(connection: PooledConnection, config: SessionConfig) -> Self {
        Self {
            connection,
            config,
            last_bookmark: None,
        }
    }

    /// 접근 모드
    pub fn access_mode(&self) -> AccessMode {
        self.config.access_mode
    }

    /// 연결된 서버 주소
    pub fn address(&self) -> &super::config::ServerAddress {
        self.connection.address()
    }

    /// 세션이 시작할 때 받은 북마크
    pub fn initial_bookmarks(&self) -> &[String] {
        &self.config.bookmarks
    }

    /// 서버가 마지막으로 돌려준 북마크
    pub fn last_bookmark(&self) -> Option<&str> {
        self.last_bookmark.as_deref()
    }

    /// 쿼리 실행 (auto-commit)
    ///
    /// 쿼리 타임아웃이 지나면 연결은 `Failed` 가 되고 반환 시 폐기됩니다.
    pub async fn run(&mut self, query: impl Into<Query>) -> DriverResult<EagerResult> {
        let bookmarks = match &self.last_bookmark {
            Some(bookmark) => vec![bookmark.clone()],
            None => self.config.bookmarks.clone(),
        };
        let client = self.connection.client_mut();
        // 앞선 쿼리가 실패했으면 RESET 후 재사용
        if client.state() == ConnectionState::AwaitingReset {
            client.reset().await?;
        }
        let run = query.into().into_run(client.version(), &self.config, bookmarks)?;
        let fetch_size = self.config.fetch_size;

        let result = match self.config.query_timeout {
            Some(limit) => match tokio::time::timeout(limit, client.run(run, fetch_size)).await {
                Ok(result) => result,
                Err(_) => {
                    client.mark_failed();
                    return Err(DriverError::timeout(format!(
                        "query on {} did not complete within {:?}",
                        self.connection.address(),
                        limit
                    )));
                }
            },
            None => client.run(run, fetch_size).await,
        };

        let mut result = result?;
        let client = self.connection.client_mut();
        result.summary.server_agent = client.server_agent().map(String::from);
        result.summary.server = self.connection.address().to_string();
        if let Some(bookmark) = &result.summary.bookmark {
            self.last_bookmark = Some(bookmark.clone());
        }
        Ok(result)
    }

    /// 세션 종료, 연결 반환
    ///
    /// 마지막 북마크를 돌려줍니다.
    pub async fn close(self) -> Option<String> {
        self.connection.release().await;
        self.last_bookmark
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connection", &self.connection)
            .field("access_mode", &self.config.access_mode)
            .field("last_bookmark", &self.last_bookmark)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
