//! Record - 쿼리 결과 레코드
//!
//! 서버가 보낸 RECORD 스트림을 `{keys, values}` 형태로 조립합니다.
//! 레코드 순서와 필드 순서는 서버가 보낸 그대로 유지됩니다.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::error::{DriverError, DriverResult};
use super::types::{Node, Path, Relationship, Value};
use crate::bolt::{PackStreamValue, Success};

// ============================================================================
// Record - 단일 레코드
// ============================================================================

/// 쿼리 결과 레코드
///
/// 같은 결과의 레코드들은 키 목록을 공유합니다.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 컬럼 키
    keys: Arc<[String]>,
    /// 값들 (키와 같은 순서)
    values: Vec<Value>,
}

impl Record {
    /// 새 레코드 생성
    pub fn new(keys: impl Into<Arc<[String]>>, values: Vec<Value>) -> Self {
        Self {
            keys: keys.into(),
            values,
        }
    }

    /// RECORD 필드 디코딩
    ///
    /// 필드 수가 키 수와 다르거나 값 디코딩에 실패하면 프로토콜 에러입니다.
    pub(crate) fn decode(keys: &Arc<[String]>, fields: Vec<PackStreamValue>) -> DriverResult<Self> {
        if fields.len() != keys.len() {
            return Err(DriverError::protocol(format!(
                "record has {} fields but the result has {} keys",
                fields.len(),
                keys.len()
            )));
        }
        let values = fields
            .into_iter()
            .map(Value::try_from)
            .collect::<DriverResult<Vec<_>>>()?;
        Ok(Self {
            keys: Arc::clone(keys),
            values,
        })
    }

    /// 키 목록
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// 값 목록
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// 레코드 길이
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 빈 레코드 여부
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 키로 값 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.keys
            .iter()
            .position(|k| k == key)
            .and_then(|i| self.values.get(i))
    }

    /// 인덱스로 값 가져오기
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// 키로 타입 변환된 값 가져오기
    pub fn get_as<T>(&self, key: &str) -> DriverResult<T>
    where
        T: TryFrom<Value, Error = DriverError>,
    {
        self.get(key)
            .cloned()
            .ok_or_else(|| DriverError::type_conversion(format!("Key '{}' not found", key)))
            .and_then(|v| T::try_from(v))
    }

    /// Node 값 가져오기
    pub fn get_node(&self, key: &str) -> DriverResult<Node> {
        self.get_as::<Node>(key)
    }

    /// Relationship 값 가져오기
    pub fn get_relationship(&self, key: &str) -> DriverResult<Relationship> {
        self.get_as::<Relationship>(key)
    }

    /// Path 값 가져오기
    pub fn get_path(&self, key: &str) -> DriverResult<Path> {
        self.get_as::<Path>(key)
    }

    /// Optional 값 가져오기 (Null 또는 없는 키는 None)
    pub fn get_optional<T>(&self, key: &str) -> DriverResult<Option<T>>
    where
        T: TryFrom<Value, Error = DriverError>,
    {
        match self.get(key) {
            Some(Value::Null) | None => Ok(None),
            Some(v) => T::try_from(v.clone()).map(Some),
        }
    }

    /// Map으로 변환
    pub fn to_map(&self) -> HashMap<String, Value> {
        self.keys
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }
}

/// `{"values": [...], "keys": [...]}`
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Record", 2)?;
        state.serialize_field("values", &self.values)?;
        state.serialize_field("keys", &*self.keys)?;
        state.end()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .keys
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::iter::Zip<std::slice::Iter<'a, String>, std::slice::Iter<'a, Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter().zip(self.values.iter())
    }
}

// ============================================================================
// ResultSummary - 결과 요약
// ============================================================================

/// 쿼리 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryType {
    /// 읽기 전용
    #[default]
    ReadOnly,
    /// 읽기/쓰기
    ReadWrite,
    /// 쓰기 전용
    WriteOnly,
    /// 스키마 변경
    SchemaWrite,
}

impl QueryType {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "r" => Some(Self::ReadOnly),
            "rw" => Some(Self::ReadWrite),
            "w" => Some(Self::WriteOnly),
            "s" => Some(Self::SchemaWrite),
            _ => None,
        }
    }
}

/// 카운터
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    /// 생성된 노드 수
    pub nodes_created: i64,
    /// 삭제된 노드 수
    pub nodes_deleted: i64,
    /// 생성된 관계 수
    pub relationships_created: i64,
    /// 삭제된 관계 수
    pub relationships_deleted: i64,
    /// 설정된 속성 수
    pub properties_set: i64,
    /// 추가된 레이블 수
    pub labels_added: i64,
    /// 제거된 레이블 수
    pub labels_removed: i64,
    /// 생성된 인덱스 수
    pub indexes_added: i64,
    /// 제거된 인덱스 수
    pub indexes_removed: i64,
    /// 추가된 제약조건 수
    pub constraints_added: i64,
    /// 제거된 제약조건 수
    pub constraints_removed: i64,
}

impl Counters {
    /// PULL SUCCESS 의 `stats` 맵에서 생성 (키는 하이픈 표기)
    fn from_stats(stats: &HashMap<String, PackStreamValue>) -> Self {
        let count = |key: &str| stats.get(key).and_then(|v| v.as_int()).unwrap_or(0);
        Self {
            nodes_created: count("nodes-created"),
            nodes_deleted: count("nodes-deleted"),
            relationships_created: count("relationships-created"),
            relationships_deleted: count("relationships-deleted"),
            properties_set: count("properties-set"),
            labels_added: count("labels-added"),
            labels_removed: count("labels-removed"),
            indexes_added: count("indexes-added"),
            indexes_removed: count("indexes-removed"),
            constraints_added: count("constraints-added"),
            constraints_removed: count("constraints-removed"),
        }
    }

    /// 변경 사항 존재 여부
    pub fn contains_updates(&self) -> bool {
        self.nodes_created > 0
            || self.nodes_deleted > 0
            || self.relationships_created > 0
            || self.relationships_deleted > 0
            || self.properties_set > 0
            || self.labels_added > 0
            || self.labels_removed > 0
    }

    /// 스키마 변경 존재 여부
    pub fn contains_system_updates(&self) -> bool {
        self.indexes_added > 0
            || self.indexes_removed > 0
            || self.constraints_added > 0
            || self.constraints_removed > 0
    }
}

/// 결과 요약
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSummary {
    /// 쿼리 타입
    pub query_type: QueryType,
    /// 카운터
    pub counters: Counters,
    /// 커밋 후 받은 북마크
    pub bookmark: Option<String>,
    /// 쿼리를 실행한 데이터베이스
    pub database: Option<String>,
    /// 쿼리를 실행한 서버 주소
    pub server: String,
    /// 서버 에이전트
    pub server_agent: Option<String>,
    /// 첫 레코드까지 걸린 시간
    pub result_available_after: Option<Duration>,
    /// 마지막 레코드까지 걸린 시간
    pub result_consumed_after: Option<Duration>,
}

impl ResultSummary {
    /// RUN 과 마지막 PULL 의 SUCCESS 메타데이터를 합칩니다.
    pub(crate) fn from_metadata(run: &Success, pull: &Success) -> Self {
        let millis = |ms: Option<i64>| ms.and_then(|ms| u64::try_from(ms).ok()).map(Duration::from_millis);
        Self {
            query_type: pull
                .query_type()
                .and_then(QueryType::from_code)
                .unwrap_or_default(),
            counters: pull.stats().map(Counters::from_stats).unwrap_or_default(),
            bookmark: pull.bookmark().map(String::from),
            database: pull.database().or(run.database()).map(String::from),
            server: String::new(),
            server_agent: None,
            result_available_after: millis(run.t_first()),
            result_consumed_after: millis(pull.t_last()),
        }
    }
}

// ============================================================================
// EagerResult - 전체 결과
// ============================================================================

/// 모두 수신된 쿼리 결과
///
/// 직렬화하면 레코드 목록 `[{"values": [...], "keys": [...]}]` 이 됩니다.
#[derive(Debug, Clone, PartialEq)]
pub struct EagerResult {
    /// 컬럼 키
    pub keys: Vec<String>,
    /// 레코드 (서버 순서)
    pub records: Vec<Record>,
    /// 결과 요약
    pub summary: ResultSummary,
}

impl EagerResult {
    /// 레코드 수
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 빈 결과 여부
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 정확히 하나의 레코드
    pub fn single(mut self) -> DriverResult<Record> {
        if self.records.len() != 1 {
            return Err(DriverError::type_conversion(format!(
                "Expected single record, got {}",
                self.records.len()
            )));
        }
        Ok(self.records.remove(0))
    }

    /// 첫 번째 레코드
    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }
}

impl Serialize for EagerResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.records)
    }
}

impl IntoIterator for EagerResult {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

// ============================================================================
// Tests
// ============================================================================
