//! Driver Configuration
//!
//! 드라이버 설정, 인증 토큰, 서버 주소

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::error::{DriverError, DriverResult};
use super::routing::RoutingPolicy;
use crate::bolt::PackStreamValue;

/// Bolt 기본 포트
pub const DEFAULT_PORT: u16 = 7687;

// ============================================================================
// ServerAddress - 서버 주소
// ============================================================================

/// 서버 주소
///
/// 풀과 라우팅 대상을 식별합니다. 생성 후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerAddress {
    /// 호스트
    pub host: String,
    /// 포트
    pub port: u16,
}

impl ServerAddress {
    /// 새 서버 주소 생성
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host[:port]` 형식 파싱 (라우팅 테이블 응답에서 사용)
    pub fn parse(text: &str) -> DriverResult<Self> {
        let text = text.trim();
        // [::1]:7687 형식의 IPv6
        let (host, port) = if let Some(rest) = text.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| DriverError::config(format!("Invalid server address: {}", text)))?;
            (format!("[{}]", host), tail.strip_prefix(':'))
        } else {
            match text.rsplit_once(':') {
                Some((host, port)) => (host.to_string(), Some(port)),
                None => (text.to_string(), None),
            }
        };

        if host.is_empty() {
            return Err(DriverError::config(format!("Invalid server address: {}", text)));
        }
        let port = match port {
            Some(p) => p
                .parse()
                .map_err(|_| DriverError::config(format!("Invalid port in address: {}", text)))?,
            None => DEFAULT_PORT,
        };
        Ok(Self::new(host, port))
    }

    /// 소켓 주소 문자열
    pub fn to_socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ============================================================================
// AuthToken - 인증 토큰
// ============================================================================

/// 인증 토큰
#[derive(Clone, PartialEq, Eq)]
pub enum AuthToken {
    /// 인증 없음
    None,
    /// Basic 인증 (사용자명/비밀번호, 선택적 realm)
    Basic {
        username: String,
        password: String,
        realm: Option<String>,
    },
}

impl AuthToken {
    /// Basic 인증 토큰 생성
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
            realm: None,
        }
    }

    /// 인증 스킴
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
        }
    }

    /// HELLO 메시지의 인증 항목
    pub(crate) fn to_hello_entries(&self) -> HashMap<String, PackStreamValue> {
        let mut entries = HashMap::new();
        entries.insert("scheme".to_string(), PackStreamValue::from(self.scheme()));
        if let Self::Basic {
            username,
            password,
            realm,
        } = self
        {
            entries.insert("principal".to_string(), PackStreamValue::from(username.as_str()));
            entries.insert("credentials".to_string(), PackStreamValue::from(password.as_str()));
            if let Some(realm) = realm {
                entries.insert("realm".to_string(), PackStreamValue::from(realm.as_str()));
            }
        }
        entries
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, realm, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .field("realm", realm)
                .finish(),
        }
    }
}

// ============================================================================
// DriverConfig - 드라이버 설정
// ============================================================================

/// 드라이버 설정
///
/// `uri`, `user`, `password`, `realm` 네 필드가 기본 연결 정보이며,
/// 나머지는 풀/라우팅/쿼리 튜닝 값입니다. JSON 등에서 역직렬화할 수 있고,
/// 생략된 필드는 기본값을 사용합니다.
///
/// # 필드
///
/// | 필드 | 기본값 | 설명 |
/// |------|--------|------|
/// | `max_connection_pool_size` | 100 | 주소별 최대 연결 수 |
/// | `connection_acquisition_timeout` | 60초 | 풀 획득 대기 기한 |
/// | `connection_timeout` | 30초 | 새 연결 수립 기한 |
/// | `max_connection_lifetime` | 1시간 | 연결 최대 수명 |
/// | `idle_timeout` | 5분 | 유휴 연결 타임아웃 |
/// | `query_timeout` | 없음 | RUN+PULL 전체 기한 |
/// | `fetch_size` | -1 | PULL 당 레코드 수 (-1 = 전체) |
///
/// # 예시
///
/// ```rust,ignore
/// use neo4j_bolt_driver::DriverConfig;
///
/// let config = DriverConfig::builder("neo4j://localhost:7687", "neo4j", "password")
///     .with_max_connection_pool_size(20)
///     .build();
/// ```
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// 연결 URI (`bolt://` 직접 연결, `neo4j://` 클러스터 라우팅)
    pub uri: String,
    /// 사용자명 (비어 있으면 인증 없음)
    pub user: String,
    /// 비밀번호
    pub password: String,
    /// 인증 realm (비어 있으면 생략)
    pub realm: String,
    /// 주소별 최대 연결 수
    pub max_connection_pool_size: usize,
    /// 연결 획득 타임아웃
    pub connection_acquisition_timeout: Duration,
    /// 연결 타임아웃
    pub connection_timeout: Duration,
    /// 연결 최대 수명
    pub max_connection_lifetime: Duration,
    /// 유휴 타임아웃
    pub idle_timeout: Duration,
    /// 쿼리 타임아웃
    pub query_timeout: Option<Duration>,
    /// Fetch Size
    pub fetch_size: i64,
    /// User Agent
    pub user_agent: String,
    /// 대상 데이터베이스 (없으면 서버 기본값)
    pub database: Option<String>,
    /// 읽기 서버 선택 정책
    pub routing_policy: RoutingPolicy,
}

impl DriverConfig {
    /// 새 설정 생성
    pub fn new(uri: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            user: user.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// 빌더 시작
    pub fn builder(
        uri: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> DriverConfigBuilder {
        DriverConfigBuilder {
            config: Self::new(uri, user, password),
        }
    }

    /// 설정 검증 및 해석
    pub(crate) fn resolve(&self) -> DriverResult<ResolvedConfig> {
        let url = Url::parse(self.uri.trim())
            .map_err(|e| DriverError::config(format!("Invalid URI '{}': {}", self.uri, e)))?;

        let routing = match url.scheme() {
            "bolt" => false,
            "neo4j" => true,
            s @ ("bolt+s" | "bolt+ssc" | "neo4j+s" | "neo4j+ssc") => {
                return Err(DriverError::config(format!(
                    "URI scheme '{}' requires TLS, which this driver does not support",
                    s
                )))
            }
            other => {
                return Err(DriverError::config(format!(
                    "Unsupported URI scheme '{}' (expected bolt or neo4j)",
                    other
                )))
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| DriverError::config(format!("URI '{}' has no host", self.uri)))?;
        if !matches!(url.path(), "" | "/") {
            return Err(DriverError::config(format!("URI '{}' must not have a path", self.uri)));
        }
        let address = ServerAddress::new(host, url.port().unwrap_or(DEFAULT_PORT));

        let auth = match (self.user.is_empty(), self.password.is_empty()) {
            (true, true) => AuthToken::None,
            (true, false) => {
                return Err(DriverError::config("A password was given without a user"))
            }
            (false, _) => AuthToken::Basic {
                username: self.user.clone(),
                password: self.password.clone(),
                realm: Some(self.realm.clone()).filter(|r| !r.is_empty()),
            },
        };

        if self.max_connection_pool_size == 0 {
            return Err(DriverError::config("max_connection_pool_size must be at least 1"));
        }
        if self.fetch_size == 0 || self.fetch_size < -1 {
            return Err(DriverError::config("fetch_size must be positive or -1"));
        }

        // 쿼리 파라미터는 라우팅 컨텍스트로 전달
        let routing_context = routing.then(|| {
            let mut context: HashMap<String, String> = url.query_pairs().into_owned().collect();
            context.insert("address".to_string(), address.to_string());
            context
        });

        Ok(ResolvedConfig {
            address,
            auth,
            routing_context,
        })
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            uri: format!("bolt://localhost:{}", DEFAULT_PORT),
            user: String::new(),
            password: String::new(),
            realm: String::new(),
            max_connection_pool_size: 100,
            connection_acquisition_timeout: Duration::from_secs(60),
            connection_timeout: Duration::from_secs(30),
            max_connection_lifetime: Duration::from_secs(3600),
            idle_timeout: Duration::from_secs(300),
            query_timeout: None,
            fetch_size: -1,
            user_agent: super::bolt::CLIENT_USER_AGENT.to_string(),
            database: None,
            routing_policy: RoutingPolicy::default(),
        }
    }
}

impl fmt::Debug for DriverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("realm", &self.realm)
            .field("max_connection_pool_size", &self.max_connection_pool_size)
            .field("connection_acquisition_timeout", &self.connection_acquisition_timeout)
            .field("connection_timeout", &self.connection_timeout)
            .field("max_connection_lifetime", &self.max_connection_lifetime)
            .field("idle_timeout", &self.idle_timeout)
            .field("query_timeout", &self.query_timeout)
            .field("fetch_size", &self.fetch_size)
            .field("user_agent", &self.user_agent)
            .field("database", &self.database)
            .field("routing_policy", &self.routing_policy)
            .finish()
    }
}

/// 검증된 연결 정보
#[derive(Debug, Clone)]
pub(crate) struct ResolvedConfig {
    /// URI의 서버 (bolt://: 유일한 서버, neo4j://: 초기 라우터)
    pub address: ServerAddress,
    pub auth: AuthToken,
    /// neo4j:// 일 때만 존재
    pub routing_context: Option<HashMap<String, String>>,
}

// ============================================================================
// DriverConfigBuilder - 설정 빌더
// ============================================================================

/// 드라이버 설정 빌더
pub struct DriverConfigBuilder {
    config: DriverConfig,
}

impl DriverConfigBuilder {
    /// 인증 realm 설정
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.config.realm = realm.into();
        self
    }

    /// 연결 풀 크기 설정
    pub fn with_max_connection_pool_size(mut self, size: usize) -> Self {
        self.config.max_connection_pool_size = size;
        self
    }

    /// 연결 획득 타임아웃 설정
    pub fn with_connection_acquisition_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_acquisition_timeout = timeout;
        self
    }

    /// 연결 타임아웃 설정
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// 연결 최대 수명 설정
    pub fn with_max_connection_lifetime(mut self, lifetime: Duration) -> Self {
        self.config.max_connection_lifetime = lifetime;
        self
    }

    /// 유휴 타임아웃 설정
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// 쿼리 타임아웃 설정
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.config.query_timeout = Some(timeout);
        self
    }

    /// Fetch Size 설정
    pub fn with_fetch_size(mut self, size: i64) -> Self {
        self.config.fetch_size = size;
        self
    }

    /// User Agent 설정
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// 데이터베이스 설정
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.config.database = Some(database.into());
        self
    }

    /// 읽기 라우팅 정책 설정
    pub fn with_routing_policy(mut self, policy: RoutingPolicy) -> Self {
        self.config.routing_policy = policy;
        self
    }

    /// 빌드
    pub fn build(self) -> DriverConfig {
        self.config
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_address_parse() {
        assert_eq!(ServerAddress::parse("db1:7688").unwrap(), ServerAddress::new("db1", 7688));
        assert_eq!(ServerAddress::parse("db1").unwrap(), ServerAddress::new("db1", 7687));
        assert_eq!(ServerAddress::parse("[::1]:9000").unwrap(), ServerAddress::new("[::1]", 9000));
        assert!(ServerAddress::parse("db1:http").is_err());
        assert!(ServerAddress::parse(":7687").is_err());
    }

    #[test]
    fn test_resolve_direct_uri() {
        let config = DriverConfig::new("bolt://localhost:7687", "neo4j", "password");
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.address, ServerAddress::new("localhost", 7687));
        assert!(resolved.routing_context.is_none());
        assert_eq!(resolved.auth, AuthToken::basic("neo4j", "password"));
    }

    #[test]
    fn test_resolve_routing_uri() {
        let config = DriverConfig::new("neo4j://cluster.local?region=eu", "neo4j", "pw");
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.address, ServerAddress::new("cluster.local", DEFAULT_PORT));
        let context = resolved.routing_context.unwrap();
        assert_eq!(context["address"], "cluster.local:7687");
        assert_eq!(context["region"], "eu");
    }

    #[test]
    fn test_resolve_rejects_bad_uris() {
        for uri in [
            "http://localhost:7474",
            "bolt+s://localhost:7687",
            "not a uri",
            "bolt://localhost:7687/db",
            "bolt://",
        ] {
            let err = DriverConfig::new(uri, "neo4j", "pw").resolve().unwrap_err();
            assert!(matches!(err, DriverError::Config(_)), "{}: {:?}", uri, err);
        }
    }

    #[test]
    fn test_resolve_credentials() {
        let resolved = DriverConfig::new("bolt://localhost", "", "").resolve().unwrap();
        assert_eq!(resolved.auth, AuthToken::None);

        let err = DriverConfig::new("bolt://localhost", "", "secret").resolve().unwrap_err();
        assert!(matches!(err, DriverError::Config(_)));
        assert!(!err.to_string().contains("secret"));

        let config = DriverConfig::builder("bolt://localhost", "neo4j", "pw")
            .with_realm("native")
            .build();
        match config.resolve().unwrap().auth {
            AuthToken::Basic { realm, .. } => assert_eq!(realm.as_deref(), Some("native")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_resolve_rejects_bad_tuning() {
        let config = DriverConfig::builder("bolt://localhost", "neo4j", "pw")
            .with_max_connection_pool_size(0)
            .build();
        assert!(config.resolve().is_err());

        let config = DriverConfig::builder("bolt://localhost", "neo4j", "pw")
            .with_fetch_size(0)
            .build();
        assert!(config.resolve().is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = DriverConfig::new("bolt://localhost", "neo4j", "hunter2");
        assert!(!format!("{:?}", config).contains("hunter2"));
        assert!(!format!("{:?}", AuthToken::basic("neo4j", "hunter2")).contains("hunter2"));
    }

    #[test]
    fn test_deserialize_from_json() {
        let config: DriverConfig = serde_json::from_str(
            r#"{"uri":"neo4j://localhost:7687","user":"neo4j","password":"password","realm":""}"#,
        )
        .unwrap();
        assert_eq!(config.uri, "neo4j://localhost:7687");
        assert_eq!(config.max_connection_pool_size, 100);
        assert_eq!(config.fetch_size, -1);
        assert!(config.resolve().is_ok());
    }

    #[test]
    fn test_hello_entries() {
        let auth = AuthToken::Basic {
            username: "neo4j".into(),
            password: "pw".into(),
            realm: Some("native".into()),
        };
        let entries = auth.to_hello_entries();
        assert_eq!(entries["scheme"].as_str(), Some("basic"));
        assert_eq!(entries["principal"].as_str(), Some("neo4j"));
        assert_eq!(entries["realm"].as_str(), Some("native"));

        let entries = AuthToken::None.to_hello_entries();
        assert_eq!(entries.len(), 1);
    }
}
