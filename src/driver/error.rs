//! Driver Error Types
//!
//! 드라이버 에러 정의

use std::io;
use std::time::Duration;

use thiserror::Error;

use super::bolt::IllegalTransition;
use super::config::ServerAddress;
use crate::bolt::{BoltError, Failure, PackStreamError};

// ============================================================================
// DriverError - 드라이버 에러
// ============================================================================

/// 드라이버 에러
///
/// 에러 메시지에는 서버 주소와 서버 코드가 포함되며, 인증 정보는 포함되지 않습니다.
#[derive(Error, Debug)]
pub enum DriverError {
    /// 설정 에러 (잘못된 URI, 자격 증명 조합 등)
    #[error("Configuration error: {0}")]
    Config(String),

    /// 인증 거부
    #[error("Authentication error: {code} - {message}")]
    Auth { code: String, message: String },

    /// 프로토콜 에러 (연결에 치명적)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// 라우팅 에러 (사용 가능한 라우팅 테이블 없음)
    #[error("Routing error: {0}")]
    Routing(String),

    /// 서버가 보고한 쿼리 에러 (RESET 후 연결 재사용 가능)
    #[error("Query error: {code} - {message}")]
    Query { code: String, message: String },

    /// 풀 획득 기한 초과
    #[error("Connection pool for {address} exhausted: no connection available within {waited:?}")]
    PoolExhausted { address: ServerAddress, waited: Duration },

    /// 작업 기한 초과
    #[error("Timeout: {0}")]
    Timeout(String),

    /// 연결 에러 (연결 거부, 끊김, 닫힌 드라이버)
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O 에러
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 타입 변환 에러
    #[error("Type conversion error: {0}")]
    TypeConversion(String),
}

impl DriverError {
    /// 설정 에러 생성
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// 프로토콜 에러 생성
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// 라우팅 에러 생성
    pub fn routing(msg: impl Into<String>) -> Self {
        Self::Routing(msg.into())
    }

    /// 쿼리 에러 생성
    pub fn query(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 타임아웃 에러 생성
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// 연결 에러 생성
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// 타입 변환 에러 생성
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion(msg.into())
    }

    /// 서버 FAILURE 분류
    ///
    /// `Neo.ClientError.Security.*` 는 인증 에러, 나머지는 쿼리 에러입니다.
    pub fn from_failure(failure: Failure) -> Self {
        if failure.code.starts_with("Neo.ClientError.Security.") {
            Self::Auth {
                code: failure.code,
                message: failure.message,
            }
        } else {
            Self::Query {
                code: failure.code,
                message: failure.message,
            }
        }
    }

    /// 서버 에러 코드
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Auth { code, .. } | Self::Query { code, .. } => Some(code),
            _ => None,
        }
    }

    /// 이 에러 이후 연결을 재사용할 수 없는지 여부
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::Connection(_) | Self::Io(_) | Self::Timeout(_)
        )
    }

    /// 대상 서버를 라우팅 테이블에서 제외해야 하는지 여부
    ///
    /// 연결 실패, 또는 클러스터 역할이 바뀌었음을 알리는 서버 코드.
    pub fn invalidates_route(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Io(_) => true,
            Self::Query { code, .. } => {
                code == "Neo.ClientError.Cluster.NotALeader"
                    || code == "Neo.ClientError.General.ForbiddenOnReadOnlyDatabase"
            }
            _ => false,
        }
    }
}

impl From<BoltError> for DriverError {
    fn from(err: BoltError) -> Self {
        match err {
            BoltError::Io(e) => DriverError::Io(e),
            BoltError::ConnectionClosed => DriverError::connection("connection closed by server"),
            other => DriverError::Protocol(other.to_string()),
        }
    }
}

impl From<IllegalTransition> for DriverError {
    fn from(err: IllegalTransition) -> Self {
        DriverError::Protocol(err.to_string())
    }
}

impl From<PackStreamError> for DriverError {
    fn from(err: PackStreamError) -> Self {
        DriverError::Protocol(err.to_string())
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// 드라이버 결과 타입
pub type DriverResult<T> = Result<T, DriverError>;

// ============================================================================
// Tests
// ============================================================================
