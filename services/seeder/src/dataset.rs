//! Declarative dataset descriptors.
//!
//! Each source file is described by a `Dataset` value: which file, which
//! table, how every Korean header maps to a target column and what happens
//! when a cell does not parse. One generic routine (`Dataset::normalize`)
//! turns a `SourceTable` into insertable rows.

use crate::error::{IngestError, Result};
use crate::source::{coerce_integer, coerce_real, SourceTable};

/// Reference period kept for the high-volume detail datasets.
pub const REFERENCE_PERIOD: &str = "202501";

/// Placeholder meaning "all continents".
const CONTINENT_SENTINELS: &[&str] = &["대륙전체"];
/// Header artifacts standing in for "no country breakdown".
const COUNTRY_SENTINELS: &[&str] = &["연도", "연도대륙"];

/// How a source cell becomes a stored value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Stored verbatim.
    Text,
    /// Stored verbatim unless it is a placeholder, which becomes NULL.
    Label { sentinels: &'static [&'static str] },
    /// Required number; unparsable input becomes 0.
    Real,
    /// Optional number; blank, unparsable or zero input becomes NULL.
    OptionalReal,
    /// Required integer; unparsable input becomes 0.
    Integer,
    /// Optional integer; unparsable or zero input becomes NULL.
    OptionalInteger,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub source: &'static str,
    pub target: &'static str,
    pub kind: FieldKind,
}

const fn col(source: &'static str, target: &'static str, kind: FieldKind) -> Column {
    Column {
        source,
        target,
        kind,
    }
}

/// Keep only rows whose `column` cell equals `equals`.
#[derive(Debug, Clone, Copy)]
pub struct RowFilter {
    pub column: &'static str,
    pub equals: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Dataset {
    pub name: &'static str,
    pub file: &'static str,
    pub table: &'static str,
    pub columns: &'static [Column],
    pub filter: Option<RowFilter>,
}

/// A normalized cell ready to bind.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Real(f64),
    Integer(i64),
    Null,
}

pub type Row = Vec<Value>;

impl FieldKind {
    pub fn apply(self, raw: &str) -> Value {
        match self {
            FieldKind::Text => Value::Text(raw.to_string()),
            FieldKind::Label { sentinels } => {
                if sentinels.contains(&raw) {
                    Value::Null
                } else {
                    Value::Text(raw.to_string())
                }
            }
            FieldKind::Real => Value::Real(coerce_real(raw).unwrap_or(0.0)),
            FieldKind::OptionalReal => match coerce_real(raw) {
                Some(v) if v != 0.0 => Value::Real(v),
                _ => Value::Null,
            },
            FieldKind::Integer => Value::Integer(coerce_integer(raw).unwrap_or(0)),
            FieldKind::OptionalInteger => match coerce_integer(raw) {
                Some(v) if v != 0 => Value::Integer(v),
                _ => Value::Null,
            },
        }
    }
}

impl Dataset {
    pub fn target_columns(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.target).collect()
    }

    /// Apply the row filter and column mapping to a parsed source file.
    pub fn normalize(&self, table: &SourceTable) -> Result<Vec<Row>> {
        let resolve = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| IngestError::MissingColumn {
                    path: table.path.clone(),
                    column: name.to_string(),
                })
        };

        let indices = self
            .columns
            .iter()
            .map(|c| resolve(c.source))
            .collect::<Result<Vec<_>>>()?;

        let filter = match self.filter {
            Some(f) => Some((resolve(f.column)?, f.equals)),
            None => None,
        };

        let rows: Vec<Row> = table
            .records
            .iter()
            .filter(|record| match filter {
                Some((idx, wanted)) => record.get(idx) == Some(wanted),
                None => true,
            })
            .map(|record| {
                self.columns
                    .iter()
                    .zip(&indices)
                    .map(|(c, &idx)| c.kind.apply(record.get(idx).unwrap_or("")))
                    .collect::<Row>()
            })
            .collect();

        Ok(rows)
    }
}

use FieldKind::*;

const CONTINENT: FieldKind = Label {
    sentinels: CONTINENT_SENTINELS,
};
const COUNTRY: FieldKind = Label {
    sentinels: COUNTRY_SENTINELS,
};

const REFERENCE_FILTER: Option<RowFilter> = Some(RowFilter {
    column: "기준일자",
    equals: REFERENCE_PERIOD,
});

/// Every source file, in ingestion order.
pub const DATASETS: &[Dataset] = &[
    Dataset {
        name: "1인당 관광수입",
        file: "20260213173604_1인당 관광수입.csv",
        table: "tourist_spending",
        columns: &[
            col("기준연월", "year_month", Text),
            col("1인당 관광수입(달러)", "spending_per_person", Real),
        ],
        filter: None,
    },
    Dataset {
        name: "관광수입 총액",
        file: "20260213173604_관광수입 .csv",
        table: "tourist_revenue",
        columns: &[
            col("기준연월", "year_month", Text),
            col("관광수입(백만달러)", "revenue_million_usd", Real),
        ],
        filter: None,
    },
    Dataset {
        name: "방한여행 행태 및 만족도",
        file: "20260213173604_방한여행 행태 및 만족도 평가.csv",
        table: "tourist_behavior",
        columns: &[
            col("기준년도", "year", Integer),
            col("재방문율(%)", "revisit_rate", OptionalReal),
            col("체재 기간(일)", "stay_duration", Real),
            col("1인 평균 지출 경비(USS)", "avg_spending", Real),
            col("1일 평균 지출 경비(USS)", "daily_spending", OptionalReal),
            col("전반적 만족도(긍정 응답 비율)", "satisfaction", OptionalReal),
            col(
                "관광목적 재방문 의향(긍정 응답 비율)",
                "revisit_intention",
                OptionalReal,
            ),
            col(
                "타인 추천 의향(긍정 응답 비율)",
                "recommendation_intention",
                OptionalReal,
            ),
        ],
        filter: None,
    },
    Dataset {
        name: "대륙별 방한관광객",
        file: "20260213173604_방한여행 요약(대륙별).csv",
        table: "tourist_by_continent",
        columns: &[
            col("대륙", "continent", Text),
            col("방한관광객", "tourist_count", Real),
            col("방한관광객 비율", "percentage", Real),
        ],
        filter: None,
    },
    Dataset {
        name: "국가별 방한관광객",
        file: "20260213173604_글로벌 방한관광객.csv",
        table: "tourist_by_country",
        columns: &[
            col("국가", "country", Text),
            col("방한 외래관광객", "tourist_count", Real),
            col("전년동기 관광객", "previous_year_count", OptionalReal),
            col("전년대비 증감률", "growth_rate", OptionalReal),
            col("구성비", "percentage", OptionalReal),
            col("순위", "rank", OptionalInteger),
        ],
        filter: None,
    },
    Dataset {
        name: "국적별 방한관광객 요약",
        file: "20260213173604_방한여행 요약(국적별).csv",
        table: "tourist_by_nationality",
        columns: &[
            col("국적", "nationality", Text),
            col("방한관광객", "tourist_count", Real),
        ],
        filter: None,
    },
    Dataset {
        name: "월별 추이",
        file: "20260213173604_방한 외래관광객 추이.csv",
        table: "tourist_trend",
        columns: &[
            col("기준년월", "year_month", Text),
            col("방한 외래관광객", "tourist_count", Real),
            col("환율(원)", "exchange_rate", OptionalReal),
            col("국제유가(달러)", "oil_price", OptionalReal),
        ],
        filter: None,
    },
    Dataset {
        name: "연령별 관광객",
        file: "20260213173821_방한 외래관광객 연령별.csv",
        table: "tourist_by_age",
        columns: &[
            col("기준일자", "year_month", Text),
            col("주요국가대륙명", "continent", CONTINENT),
            col("국가명", "country", COUNTRY),
            col("연령", "age_group", Text),
            col("인원", "count", Real),
            col("전년동기", "previous_year_count", OptionalReal),
            col("증감률", "growth_rate", OptionalReal),
        ],
        filter: REFERENCE_FILTER,
    },
    Dataset {
        name: "성별 관광객",
        file: "20260213173645_방한 외래관광객 성별.csv",
        table: "tourist_by_gender",
        columns: &[
            col("기준일자", "year_month", Text),
            col("주요국가대륙명", "continent", CONTINENT),
            col("국가명", "country", COUNTRY),
            col("성별", "gender", Text),
            col("인원", "count", Real),
            col("전년동기", "previous_year_count", OptionalReal),
            col("증감률", "growth_rate", OptionalReal),
        ],
        filter: REFERENCE_FILTER,
    },
    Dataset {
        name: "성·연령별 특성",
        file: "20260213173604_방한 외래관광객 특성(성·연령별).csv",
        table: "tourist_by_gender_age",
        columns: &[
            col("연령대", "age_group", Text),
            col("남성", "male_count", Real),
            col("여성", "female_count", Real),
            col("남성(비율)", "male_percentage", OptionalReal),
            col("여성(비율)", "female_percentage", OptionalReal),
        ],
        filter: None,
    },
    Dataset {
        name: "목적별 관광객",
        file: "20260213173836_방한 외래관광객 목적별.csv",
        table: "tourist_by_purpose",
        columns: &[
            col("기준일자", "year_month", Text),
            col("주요국가대륙명", "continent", CONTINENT),
            col("국가명", "country", COUNTRY),
            col("목적구분", "purpose", Text),
            col("인원", "count", Real),
            col("전년동기", "previous_year_count", OptionalReal),
            col("증감률", "growth_rate", OptionalReal),
        ],
        filter: REFERENCE_FILTER,
    },
    Dataset {
        name: "목적별 요약",
        file: "20260213173604_방한 외래관광객 특성(목적별).csv",
        table: "tourist_by_purpose_summary",
        columns: &[
            col("목적", "purpose", Text),
            col("방한 외래관광객", "tourist_count", Real),
            col("방한 외래관광객(비율)", "percentage", OptionalReal),
        ],
        filter: None,
    },
    Dataset {
        name: "교통수단별 월별",
        file: "20260213180601_방한 외래관광객 교통수단별.csv",
        table: "tourist_by_transport",
        columns: &[
            col("기준년월", "year_month", Text),
            col("인천공항", "incheon_airport", OptionalReal),
            col("김해공항", "gimhae_airport", OptionalReal),
            col("김포공항", "gimpo_airport", OptionalReal),
            col("제주공항", "jeju_airport", OptionalReal),
            col("기타공항", "other_airports", OptionalReal),
            col("부산항구", "busan_port", OptionalReal),
            col("인천항구", "incheon_port", OptionalReal),
            col("제주항구", "jeju_port", OptionalReal),
            col("기타항구", "other_ports", OptionalReal),
            col("환율", "exchange_rate", OptionalReal),
            col("두바이유", "oil_price", OptionalReal),
        ],
        filter: None,
    },
    Dataset {
        name: "교통수단별 요약",
        file: "20260213173604_방한 외래관광객 특성(교통수단별).csv",
        table: "tourist_by_transport_summary",
        columns: &[
            col("교통수단", "transport", Text),
            col("방한 외래관광객(명)", "tourist_count", Real),
            col("비중(%)", "percentage", OptionalReal),
        ],
        filter: None,
    },
    Dataset {
        name: "방한 여행 이미지",
        file: "20260213173604_방한 여행 이미지.csv",
        table: "korea_image",
        columns: &[
            col("기준연도", "year", Integer),
            col("구분", "category", Text),
            col("값", "value", Real),
        ],
        filter: None,
    },
    Dataset {
        name: "한국여행 경험 및 의향",
        file: "20260213173604_한국여행 경험 및 의향.csv",
        table: "korea_visit_intention",
        columns: &[
            col("기준연도", "year", Integer),
            col("구분", "category", Text),
            col("값(%)", "value", Text),
        ],
        filter: None,
    },
    Dataset {
        name: "방한여행 관심도 추이",
        file: "20260213173604_방한여행 관심도 추이.csv",
        table: "korea_interest_trend",
        columns: &[
            col("기준연월", "year_month", Text),
            col("값(%)", "interest_percentage", Real),
        ],
        filter: None,
    },
];

/// Look up a descriptor by target table.
pub fn by_table(table: &str) -> Option<&'static Dataset> {
    DATASETS.iter().find(|d| d.table == table)
}
