//! Driver Types
//!
//! 드라이버에서 사용하는 값 타입과 PackStream 변환

use std::collections::HashMap;
use std::fmt;

use chrono::{Datelike, DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::error::{DriverError, DriverResult};
use crate::bolt::packstream::{tag, PackStreamStructure, PackStreamValue, StructFields};
use crate::bolt::BoltVersion;

/// 1970-01-01 의 CE 기준 일 수
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;
const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ============================================================================
// Value - 그래프 값
// ============================================================================

/// 그래프 값 타입
///
/// 서버가 보낸 레코드 값과 쿼리 파라미터 모두에 사용됩니다.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer (i64)
    Integer(i64),
    /// Float (f64)
    Float(f64),
    /// String
    String(String),
    /// Bytes
    Bytes(Vec<u8>),
    /// List
    List(Vec<Value>),
    /// Map
    Map(HashMap<String, Value>),
    /// Node
    Node(Node),
    /// Relationship
    Relationship(Relationship),
    /// Path
    Path(Path),
    /// Point (2D/3D)
    Point(Point),
    /// Date
    Date(NaiveDate),
    /// Time (오프셋 포함)
    Time(OffsetTime),
    /// LocalTime
    LocalTime(NaiveTime),
    /// DateTime (오프셋 포함)
    DateTime(DateTime<FixedOffset>),
    /// DateTime (IANA 타임존 포함)
    DateTimeZoneId(DateTime<Tz>),
    /// LocalDateTime
    LocalDateTime(NaiveDateTime),
    /// Duration
    Duration(Duration),
}

impl Value {
    /// Null 여부
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean으로 변환
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer로 변환
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Float로 변환
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// String으로 변환
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// List로 변환
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Map으로 변환
    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Node로 변환
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Relationship으로 변환
    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Value::Relationship(r) => Some(r),
            _ => None,
        }
    }

    /// Path로 변환
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }

    /// 타입 이름
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Node(_) => "Node",
            Value::Relationship(_) => "Relationship",
            Value::Path(_) => "Path",
            Value::Point(_) => "Point",
            Value::Date(_) => "Date",
            Value::Time(_) => "Time",
            Value::LocalTime(_) => "LocalTime",
            Value::DateTime(_) => "DateTime",
            Value::DateTimeZoneId(_) => "DateTimeZoneId",
            Value::LocalDateTime(_) => "LocalDateTime",
            Value::Duration(_) => "Duration",
        }
    }

    /// 쿼리 파라미터로 인코딩
    ///
    /// 그래프 엔티티(Node, Relationship, Path)는 파라미터로 보낼 수 없습니다.
    /// 오프셋/타임존 날짜시간은 협상된 버전에 맞는 구조체 태그를 사용합니다.
    pub fn into_packstream(self, version: BoltVersion) -> DriverResult<PackStreamValue> {
        let packed = match self {
            Value::Null => PackStreamValue::Null,
            Value::Boolean(b) => PackStreamValue::Boolean(b),
            Value::Integer(i) => PackStreamValue::Integer(i),
            Value::Float(f) => PackStreamValue::Float(f),
            Value::String(s) => PackStreamValue::String(s),
            Value::Bytes(b) => PackStreamValue::Bytes(b),
            Value::List(items) => PackStreamValue::List(
                items
                    .into_iter()
                    .map(|v| v.into_packstream(version))
                    .collect::<DriverResult<_>>()?,
            ),
            Value::Map(map) => PackStreamValue::Map(
                map.into_iter()
                    .map(|(k, v)| Ok((k, v.into_packstream(version)?)))
                    .collect::<DriverResult<_>>()?,
            ),
            v @ (Value::Node(_) | Value::Relationship(_) | Value::Path(_)) => {
                return Err(DriverError::type_conversion(format!(
                    "{} cannot be sent as a query parameter",
                    v.type_name()
                )));
            }
            Value::Point(p) => p.into_structure().into(),
            Value::Date(d) => {
                let days = i64::from(d.num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE;
                PackStreamStructure::new(tag::DATE, vec![days.into()]).into()
            }
            Value::Time(t) => PackStreamStructure::new(
                tag::TIME,
                vec![
                    nanos_of_day(&t.time).into(),
                    i64::from(t.offset.local_minus_utc()).into(),
                ],
            )
            .into(),
            Value::LocalTime(t) => {
                PackStreamStructure::new(tag::LOCAL_TIME, vec![nanos_of_day(&t).into()]).into()
            }
            Value::DateTime(dt) => {
                let offset = i64::from(dt.offset().local_minus_utc());
                let (struct_tag, seconds) = if version.has_utc_date_times() {
                    (tag::DATE_TIME, dt.timestamp())
                } else {
                    (tag::LEGACY_DATE_TIME, dt.naive_local().and_utc().timestamp())
                };
                PackStreamStructure::new(
                    struct_tag,
                    vec![
                        seconds.into(),
                        i64::from(dt.timestamp_subsec_nanos()).into(),
                        offset.into(),
                    ],
                )
                .into()
            }
            Value::DateTimeZoneId(dt) => {
                let (struct_tag, seconds) = if version.has_utc_date_times() {
                    (tag::DATE_TIME_ZONE_ID, dt.timestamp())
                } else {
                    (tag::LEGACY_DATE_TIME_ZONE_ID, dt.naive_local().and_utc().timestamp())
                };
                PackStreamStructure::new(
                    struct_tag,
                    vec![
                        seconds.into(),
                        i64::from(dt.timestamp_subsec_nanos()).into(),
                        dt.timezone().name().into(),
                    ],
                )
                .into()
            }
            Value::LocalDateTime(dt) => {
                let utc = dt.and_utc();
                PackStreamStructure::new(
                    tag::LOCAL_DATE_TIME,
                    vec![utc.timestamp().into(), i64::from(utc.timestamp_subsec_nanos()).into()],
                )
                .into()
            }
            Value::Duration(d) => PackStreamStructure::new(
                tag::DURATION,
                vec![
                    d.months.into(),
                    d.days.into(),
                    d.seconds.into(),
                    i64::from(d.nanoseconds).into(),
                ],
            )
            .into(),
        };
        Ok(packed)
    }
}

fn nanos_of_day(time: &NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight()) * NANOS_PER_SECOND + i64::from(time.nanosecond())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(l) => write!(f, "[{} items]", l.len()),
            Value::Map(m) => write!(f, "{{{} entries}}", m.len()),
            Value::Node(n) => write!(f, "{}", n),
            Value::Relationship(r) => write!(f, "{}", r),
            Value::Path(p) => write!(f, "{}", p),
            Value::Point(p) => write!(f, "{}", p),
            Value::Date(d) => write!(f, "{}", d),
            Value::Time(t) => write!(f, "{}", t),
            Value::LocalTime(t) => write!(f, "{}", t),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::DateTimeZoneId(dt) => write!(f, "{}", zoned_iso(dt)),
            Value::LocalDateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::Duration(d) => write!(f, "{}", d),
        }
    }
}

fn zoned_iso(dt: &DateTime<Tz>) -> String {
    format!("{}[{}]", dt.to_rfc3339(), dt.timezone().name())
}

/// 스칼라와 컬렉션은 JSON 기본형으로, 시간 값은 ISO-8601 문자열로 직렬화됩니다.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => {
                let mut seq = serializer.serialize_seq(Some(b.len()))?;
                for byte in b {
                    seq.serialize_element(byte)?;
                }
                seq.end()
            }
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Node(n) => n.serialize(serializer),
            Value::Relationship(r) => r.serialize(serializer),
            Value::Path(p) => p.serialize(serializer),
            Value::Point(p) => p.serialize(serializer),
            Value::Duration(d) => serializer.collect_str(d),
            temporal => serializer.collect_str(temporal),
        }
    }
}

// From implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(v: HashMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::DateTime(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::LocalDateTime(v)
    }
}

/// JSON 파라미터 변환
///
/// 정수로 표현 가능한 숫자는 Integer, 나머지는 Float가 됩니다.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(entries) => {
                Value::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

// ============================================================================
// Node - 그래프 노드
// ============================================================================

/// 그래프 노드
///
/// `id`는 연결 범위에서만 유효하며, 노드를 식별하려면 `element_id`를 사용합니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    /// 노드 ID
    pub id: i64,
    /// 엘리먼트 ID
    pub element_id: String,
    /// 레이블
    pub labels: Vec<String>,
    /// 속성
    pub props: HashMap<String, Value>,
}

impl Node {
    /// 새 노드 생성 (엘리먼트 ID는 숫자 ID에서 파생)
    pub fn new(id: i64, labels: Vec<String>, props: HashMap<String, Value>) -> Self {
        Self {
            id,
            element_id: id.to_string(),
            labels,
            props,
        }
    }

    /// 레이블 포함 여부
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// 속성 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    /// 속성 가져오기 (타입 변환)
    pub fn get_as<T: TryFrom<Value, Error = DriverError>>(&self, key: &str) -> DriverResult<T> {
        self.props
            .get(key)
            .cloned()
            .ok_or_else(|| DriverError::type_conversion(format!("Property '{}' not found", key)))
            .and_then(|v| T::try_from(v))
    }

    fn from_structure(s: PackStreamStructure) -> DriverResult<Self> {
        s.expect_arity("Node", &[3, 4])?;
        let mut fields = s.into_fields("Node");
        let id = fields.next_int()?;
        let labels = fields
            .next_list()?
            .into_iter()
            .map(|l| match l {
                PackStreamValue::String(s) => Ok(s),
                other => Err(DriverError::protocol(format!(
                    "Node label must be a String, found {}",
                    other.type_name()
                ))),
            })
            .collect::<DriverResult<_>>()?;
        let props = decode_props(fields.next_map()?)?;
        let element_id = optional_element_id(&mut fields, id)?;
        Ok(Self {
            id,
            element_id,
            labels,
            props,
        })
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = if self.labels.is_empty() {
            String::new()
        } else {
            format!(":{}", self.labels.join(":"))
        };
        write!(f, "({}{})", self.element_id, labels)
    }
}

// ============================================================================
// Relationship - 그래프 관계
// ============================================================================

/// 그래프 관계
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    /// 관계 ID
    pub id: i64,
    /// 엘리먼트 ID
    pub element_id: String,
    /// 시작 노드 ID
    #[serde(rename = "start_id")]
    pub start_node_id: i64,
    /// 시작 노드 엘리먼트 ID
    #[serde(rename = "start_element_id")]
    pub start_node_element_id: String,
    /// 끝 노드 ID
    #[serde(rename = "end_id")]
    pub end_node_id: i64,
    /// 끝 노드 엘리먼트 ID
    #[serde(rename = "end_element_id")]
    pub end_node_element_id: String,
    /// 타입
    #[serde(rename = "type")]
    pub rel_type: String,
    /// 속성
    pub props: HashMap<String, Value>,
}

impl Relationship {
    /// 새 관계 생성 (엘리먼트 ID는 숫자 ID에서 파생)
    pub fn new(
        id: i64,
        start_node_id: i64,
        end_node_id: i64,
        rel_type: impl Into<String>,
        props: HashMap<String, Value>,
    ) -> Self {
        Self {
            id,
            element_id: id.to_string(),
            start_node_id,
            start_node_element_id: start_node_id.to_string(),
            end_node_id,
            end_node_element_id: end_node_id.to_string(),
            rel_type: rel_type.into(),
            props,
        }
    }

    /// 속성 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    fn from_structure(s: PackStreamStructure) -> DriverResult<Self> {
        s.expect_arity("Relationship", &[5, 8])?;
        let mut fields = s.into_fields("Relationship");
        let id = fields.next_int()?;
        let start_node_id = fields.next_int()?;
        let end_node_id = fields.next_int()?;
        let rel_type = fields.next_string()?;
        let props = decode_props(fields.next_map()?)?;
        let element_id = optional_element_id(&mut fields, id)?;
        let start_node_element_id = optional_element_id(&mut fields, start_node_id)?;
        let end_node_element_id = optional_element_id(&mut fields, end_node_id)?;
        Ok(Self {
            id,
            element_id,
            start_node_id,
            start_node_element_id,
            end_node_id,
            end_node_element_id,
            rel_type,
            props,
        })
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})-[:{}]->({})",
            self.start_node_element_id, self.rel_type, self.end_node_element_id
        )
    }
}

/// 경로 안의 관계 (양 끝 노드는 경로가 결정)
struct UnboundRelationship {
    id: i64,
    element_id: String,
    rel_type: String,
    props: HashMap<String, Value>,
}

impl UnboundRelationship {
    fn from_value(value: PackStreamValue) -> DriverResult<Self> {
        let s = match value {
            PackStreamValue::Structure(s) if s.tag == tag::UNBOUND_RELATIONSHIP => s,
            other => {
                return Err(DriverError::protocol(format!(
                    "Path relationship must be an UnboundRelationship, found {}",
                    other.type_name()
                )))
            }
        };
        s.expect_arity("UnboundRelationship", &[3, 4])?;
        let mut fields = s.into_fields("UnboundRelationship");
        let id = fields.next_int()?;
        let rel_type = fields.next_string()?;
        let props = decode_props(fields.next_map()?)?;
        let element_id = optional_element_id(&mut fields, id)?;
        Ok(Self {
            id,
            element_id,
            rel_type,
            props,
        })
    }

    fn bind(&self, start: &Node, end: &Node) -> Relationship {
        Relationship {
            id: self.id,
            element_id: self.element_id.clone(),
            start_node_id: start.id,
            start_node_element_id: start.element_id.clone(),
            end_node_id: end.id,
            end_node_element_id: end.element_id.clone(),
            rel_type: self.rel_type.clone(),
            props: self.props.clone(),
        }
    }
}

// ============================================================================
// Path - 그래프 경로
// ============================================================================

/// 그래프 경로
///
/// `nodes`는 경로 순서대로 나열되며 `relationships.len() + 1` 개입니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Path {
    /// 노드들
    pub nodes: Vec<Node>,
    /// 관계들
    pub relationships: Vec<Relationship>,
}

impl Path {
    /// 새 경로 생성
    pub fn new(nodes: Vec<Node>, relationships: Vec<Relationship>) -> Self {
        Self { nodes, relationships }
    }

    /// 경로 길이 (관계 수)
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// 빈 경로 여부
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    /// 시작 노드
    pub fn start(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// 끝 노드
    pub fn end(&self) -> Option<&Node> {
        self.nodes.last()
    }

    /// Path 구조체 디코딩
    ///
    /// 인덱스 목록은 (관계 번호, 노드 번호) 쌍의 나열입니다. 관계 번호는 1부터
    /// 시작하며, 음수이면 관계가 경로 진행 방향의 역방향입니다.
    fn from_structure(s: PackStreamStructure) -> DriverResult<Self> {
        s.expect_arity("Path", &[3])?;
        let mut fields = s.into_fields("Path");
        let unique_nodes = fields
            .next_list()?
            .into_iter()
            .map(|v| match v {
                PackStreamValue::Structure(s) if s.tag == tag::NODE => Node::from_structure(s),
                other => Err(DriverError::protocol(format!(
                    "Path node must be a Node, found {}",
                    other.type_name()
                ))),
            })
            .collect::<DriverResult<Vec<_>>>()?;
        let unique_rels = fields
            .next_list()?
            .into_iter()
            .map(UnboundRelationship::from_value)
            .collect::<DriverResult<Vec<_>>>()?;
        let indices = fields
            .next_list()?
            .into_iter()
            .map(|v| {
                v.as_int()
                    .ok_or_else(|| DriverError::protocol("Path index must be an Integer"))
            })
            .collect::<DriverResult<Vec<_>>>()?;

        if indices.len() % 2 != 0 {
            return Err(DriverError::protocol("Path indices must come in pairs"));
        }
        let mut previous = unique_nodes
            .first()
            .ok_or_else(|| DriverError::protocol("Path has no nodes"))?;

        let mut nodes = vec![previous.clone()];
        let mut relationships = Vec::with_capacity(indices.len() / 2);
        for pair in indices.chunks_exact(2) {
            let (rel_index, node_index) = (pair[0], pair[1]);
            let next = usize::try_from(node_index)
                .ok()
                .and_then(|i| unique_nodes.get(i))
                .ok_or_else(|| DriverError::protocol(format!("Path node index {} out of range", node_index)))?;
            let unbound = usize::try_from(rel_index.unsigned_abs())
                .ok()
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| unique_rels.get(i))
                .ok_or_else(|| {
                    DriverError::protocol(format!("Path relationship index {} out of range", rel_index))
                })?;
            let rel = if rel_index > 0 {
                unbound.bind(previous, next)
            } else {
                unbound.bind(next, previous)
            };
            relationships.push(rel);
            nodes.push(next.clone());
            previous = next;
        }
        Ok(Self { nodes, relationships })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Path: {} nodes, {} rels>", self.nodes.len(), self.relationships.len())
    }
}

// ============================================================================
// Point - 공간 좌표
// ============================================================================

/// 공간 좌표
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    /// SRID (Spatial Reference ID)
    pub srid: i32,
    /// X 좌표 (경도)
    pub x: f64,
    /// Y 좌표 (위도)
    pub y: f64,
    /// Z 좌표 (고도, 선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Point {
    /// 2D 포인트 생성
    pub fn new_2d(srid: i32, x: f64, y: f64) -> Self {
        Self { srid, x, y, z: None }
    }

    /// 3D 포인트 생성
    pub fn new_3d(srid: i32, x: f64, y: f64, z: f64) -> Self {
        Self { srid, x, y, z: Some(z) }
    }

    /// WGS84 2D 포인트 (경도, 위도)
    pub fn wgs84_2d(longitude: f64, latitude: f64) -> Self {
        Self::new_2d(4326, longitude, latitude)
    }

    /// Cartesian 2D 포인트
    pub fn cartesian_2d(x: f64, y: f64) -> Self {
        Self::new_2d(7203, x, y)
    }

    /// 3D 여부
    pub fn is_3d(&self) -> bool {
        self.z.is_some()
    }

    fn into_structure(self) -> PackStreamStructure {
        let mut fields = vec![i64::from(self.srid).into(), self.x.into(), self.y.into()];
        match self.z {
            Some(z) => {
                fields.push(z.into());
                PackStreamStructure::new(tag::POINT_3D, fields)
            }
            None => PackStreamStructure::new(tag::POINT_2D, fields),
        }
    }

    fn from_fields(mut fields: StructFields, three_d: bool) -> DriverResult<Self> {
        let srid = fields.next_int()?;
        let srid = i32::try_from(srid)
            .map_err(|_| DriverError::protocol(format!("Point SRID {} out of range", srid)))?;
        let x = fields.next_float()?;
        let y = fields.next_float()?;
        let z = if three_d { Some(fields.next_float()?) } else { None };
        Ok(Self { srid, x, y, z })
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.z {
            Some(z) => write!(f, "Point(srid={}, x={}, y={}, z={})", self.srid, self.x, self.y, z),
            None => write!(f, "Point(srid={}, x={}, y={})", self.srid, self.x, self.y),
        }
    }
}

// ============================================================================
// OffsetTime / Duration - 시간 값
// ============================================================================

/// UTC 오프셋이 있는 시각
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetTime {
    /// 현지 시각
    pub time: NaiveTime,
    /// UTC 오프셋
    pub offset: FixedOffset,
}

impl fmt::Display for OffsetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.time.format("%H:%M:%S%.f"), self.offset)
    }
}

/// 시간 간격
///
/// 개월/일/초는 서로 환산되지 않으므로 각각 따로 보관합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    /// 개월
    pub months: i64,
    /// 일
    pub days: i64,
    /// 초
    pub seconds: i64,
    /// 나노초
    pub nanoseconds: i32,
}

impl Duration {
    /// 새 Duration 생성
    pub fn new(months: i64, days: i64, seconds: i64, nanoseconds: i32) -> Self {
        Self {
            months,
            days,
            seconds,
            nanoseconds,
        }
    }

    /// 초에서 생성
    pub fn from_seconds(seconds: i64) -> Self {
        Self::new(0, 0, seconds, 0)
    }
}

/// ISO-8601 형식 (`P{months}M{days}DT{seconds}S`)
impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}M{}DT{}", self.months, self.days, self.seconds)?;
        if self.nanoseconds != 0 {
            write!(f, ".{:09}", self.nanoseconds)?;
        }
        write!(f, "S")
    }
}

// ============================================================================
// PackStreamValue -> Value
// ============================================================================

/// 레코드 값 디코딩
///
/// 알 수 없는 구조체 태그나 필드가 잘못된 구조체는 프로토콜 에러입니다.
impl TryFrom<PackStreamValue> for Value {
    type Error = DriverError;

    fn try_from(value: PackStreamValue) -> Result<Self, Self::Error> {
        Ok(match value {
            PackStreamValue::Null => Value::Null,
            PackStreamValue::Boolean(b) => Value::Boolean(b),
            PackStreamValue::Integer(i) => Value::Integer(i),
            PackStreamValue::Float(f) => Value::Float(f),
            PackStreamValue::String(s) => Value::String(s),
            PackStreamValue::Bytes(b) => Value::Bytes(b),
            PackStreamValue::List(l) => {
                Value::List(l.into_iter().map(Value::try_from).collect::<DriverResult<_>>()?)
            }
            PackStreamValue::Map(m) => Value::Map(decode_props(m)?),
            PackStreamValue::Structure(s) => decode_structure(s)?,
        })
    }
}

fn decode_props(map: HashMap<String, PackStreamValue>) -> DriverResult<HashMap<String, Value>> {
    map.into_iter()
        .map(|(k, v)| Ok((k, Value::try_from(v)?)))
        .collect()
}

/// Bolt 5 구조체의 엘리먼트 ID, Bolt 4.4 에서는 숫자 ID로 대체
fn optional_element_id(fields: &mut StructFields, id: i64) -> DriverResult<String> {
    match fields.next_optional() {
        Some(PackStreamValue::String(s)) => Ok(s),
        Some(other) => Err(DriverError::protocol(format!(
            "element id must be a String, found {}",
            other.type_name()
        ))),
        None => Ok(id.to_string()),
    }
}

fn decode_structure(s: PackStreamStructure) -> DriverResult<Value> {
    let invalid = |what: &str| DriverError::protocol(format!("{} out of range", what));

    match s.tag {
        tag::NODE => Ok(Value::Node(Node::from_structure(s)?)),
        tag::RELATIONSHIP => Ok(Value::Relationship(Relationship::from_structure(s)?)),
        tag::PATH => Ok(Value::Path(Path::from_structure(s)?)),
        tag::POINT_2D => {
            s.expect_arity("Point2D", &[3])?;
            Ok(Value::Point(Point::from_fields(s.into_fields("Point2D"), false)?))
        }
        tag::POINT_3D => {
            s.expect_arity("Point3D", &[4])?;
            Ok(Value::Point(Point::from_fields(s.into_fields("Point3D"), true)?))
        }
        tag::DATE => {
            s.expect_arity("Date", &[1])?;
            let days = s.into_fields("Date").next_int()?;
            days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                .and_then(|days| i32::try_from(days).ok())
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .map(Value::Date)
                .ok_or_else(|| invalid("Date"))
        }
        tag::TIME => {
            s.expect_arity("Time", &[2])?;
            let mut fields = s.into_fields("Time");
            let time = time_of_day(fields.next_int()?).ok_or_else(|| invalid("Time"))?;
            let offset = fixed_offset(fields.next_int()?).ok_or_else(|| invalid("Time offset"))?;
            Ok(Value::Time(OffsetTime { time, offset }))
        }
        tag::LOCAL_TIME => {
            s.expect_arity("LocalTime", &[1])?;
            let nanos = s.into_fields("LocalTime").next_int()?;
            time_of_day(nanos)
                .map(Value::LocalTime)
                .ok_or_else(|| invalid("LocalTime"))
        }
        tag::DATE_TIME | tag::LEGACY_DATE_TIME => {
            s.expect_arity("DateTime", &[3])?;
            let utc_seconds = s.tag == tag::DATE_TIME;
            let mut fields = s.into_fields("DateTime");
            let seconds = fields.next_int()?;
            let nanos = fields.next_int()?;
            let offset = fixed_offset(fields.next_int()?).ok_or_else(|| invalid("DateTime offset"))?;
            let utc = if utc_seconds {
                Some(seconds)
            } else {
                seconds.checked_sub(i64::from(offset.local_minus_utc()))
            };
            utc.and_then(|utc| timestamp(utc, nanos))
                .map(|dt| Value::DateTime(dt.with_timezone(&offset)))
                .ok_or_else(|| invalid("DateTime"))
        }
        tag::DATE_TIME_ZONE_ID | tag::LEGACY_DATE_TIME_ZONE_ID => {
            s.expect_arity("DateTimeZoneId", &[3])?;
            let utc_seconds = s.tag == tag::DATE_TIME_ZONE_ID;
            let mut fields = s.into_fields("DateTimeZoneId");
            let seconds = fields.next_int()?;
            let nanos = fields.next_int()?;
            let zone_id = fields.next_string()?;
            let zone: Tz = zone_id
                .parse()
                .map_err(|_| DriverError::protocol(format!("unknown time zone '{}'", zone_id)))?;
            let instant = timestamp(seconds, nanos).ok_or_else(|| invalid("DateTimeZoneId"))?;
            let zoned = if utc_seconds {
                Some(instant.with_timezone(&zone))
            } else {
                zone.from_local_datetime(&instant.naive_utc()).earliest()
            };
            zoned
                .map(Value::DateTimeZoneId)
                .ok_or_else(|| invalid("DateTimeZoneId"))
        }
        tag::LOCAL_DATE_TIME => {
            s.expect_arity("LocalDateTime", &[2])?;
            let mut fields = s.into_fields("LocalDateTime");
            let seconds = fields.next_int()?;
            let nanos = fields.next_int()?;
            timestamp(seconds, nanos)
                .map(|dt| Value::LocalDateTime(dt.naive_utc()))
                .ok_or_else(|| invalid("LocalDateTime"))
        }
        tag::DURATION => {
            s.expect_arity("Duration", &[4])?;
            let mut fields = s.into_fields("Duration");
            let months = fields.next_int()?;
            let days = fields.next_int()?;
            let seconds = fields.next_int()?;
            let nanoseconds = i32::try_from(fields.next_int()?).map_err(|_| invalid("Duration"))?;
            Ok(Value::Duration(Duration::new(months, days, seconds, nanoseconds)))
        }
        other => Err(DriverError::protocol(format!(
            "unknown structure tag 0x{:02X} in record",
            other
        ))),
    }
}

fn time_of_day(nanos: i64) -> Option<NaiveTime> {
    let seconds = u32::try_from(nanos.div_euclid(NANOS_PER_SECOND)).ok()?;
    let subsec = u32::try_from(nanos.rem_euclid(NANOS_PER_SECOND)).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, subsec)
}

fn fixed_offset(seconds: i64) -> Option<FixedOffset> {
    FixedOffset::east_opt(i32::try_from(seconds).ok()?)
}

fn timestamp(seconds: i64, nanos: i64) -> Option<DateTime<chrono::Utc>> {
    DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
}

// ============================================================================
// TryFrom implementations
// ============================================================================

macro_rules! impl_try_from_value {
    ($target:ty, $name:literal, $($pattern:pat => $out:expr),+ $(,)?) => {
        impl TryFrom<Value> for $target {
            type Error = DriverError;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    $($pattern => Ok($out),)+
                    other => Err(DriverError::type_conversion(format!(
                        "Cannot convert {} to {}",
                        other.type_name(),
                        $name
                    ))),
                }
            }
        }
    };
}

impl_try_from_value!(bool, "bool", Value::Boolean(b) => b);
impl_try_from_value!(i64, "i64", Value::Integer(i) => i);
impl_try_from_value!(f64, "f64", Value::Float(f) => f, Value::Integer(i) => i as f64);
impl_try_from_value!(String, "String", Value::String(s) => s);
impl_try_from_value!(Node, "Node", Value::Node(n) => n);
impl_try_from_value!(Relationship, "Relationship", Value::Relationship(r) => r);
impl_try_from_value!(Path, "Path", Value::Path(p) => p);
impl_try_from_value!(NaiveDate, "Date", Value::Date(d) => d);
impl_try_from_value!(DateTime<FixedOffset>, "DateTime", Value::DateTime(dt) => dt);

// ============================================================================
// Tests
// ============================================================================
