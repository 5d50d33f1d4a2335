//! Analyst-authored insight records.
//!
//! These are written by hand against the ingested tables and stored
//! verbatim. Nothing here is computed from the data.

#[derive(Debug, Clone, Copy)]
pub struct Insight {
    pub category: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub data_source: &'static str,
    pub priority: i64,
}

pub const INSIGHTS: &[Insight] = &[
    Insight {
        category: "rwa_value",
        title: "아시아권 관광객 집중도 80.5%",
        description: "전체 방한 외래관광객의 80.5%가 아시아 대륙 출신으로, 농촌 관광 마케팅은 아시아 시장을 최우선으로 집중해야 합니다.",
        data_source: "tourist_by_continent",
        priority: 1,
    },
    Insight {
        category: "rwa_value",
        title: "1인당 평균 지출액 $1,712 (6.6일 체류)",
        description: "2015년 기준 방한 관광객은 평균 $1,712를 지출하고 6.6일 체류합니다. 농촌 체험 상품 가격 책정 시 이 지표를 참고해야 합니다.",
        data_source: "tourist_behavior",
        priority: 1,
    },
    Insight {
        category: "target_reality",
        title: "Top 5 국가: 중국(549만), 일본(365만), 대만(189만), 미국(148만), 홍콩(62만)",
        description: "상위 5개 국가가 전체 방한객의 대부분을 차지합니다. 농촌 관광 콘텐츠는 이들 국가의 언어와 문화적 특성을 반영해야 합니다.",
        data_source: "tourist_by_nationality",
        priority: 2,
    },
    Insight {
        category: "target_reality",
        title: "관광 목적 방문객 83.5% (1,582만명)",
        description: "방한객의 83.5%가 관광 목적으로 입국합니다. 농촌 관광은 이들을 타겟으로 한 레저 및 체험 콘텐츠 개발이 필수입니다.",
        data_source: "tourist_by_purpose_summary",
        priority: 2,
    },
    Insight {
        category: "marketing_priority",
        title: "인천공항 입국 비중 65.4%",
        description: "전체 관광객의 65.4%가 인천공항을 통해 입국합니다. 공항에서 농촌 관광지로의 교통 연계성 강화가 필요합니다.",
        data_source: "tourist_by_transport_summary",
        priority: 3,
    },
    Insight {
        category: "marketing_priority",
        title: "MZ세대(21~40세) 높은 비중",
        description: "21~30세와 31~40세 연령층이 전체 관광객의 상당 부분을 차지합니다. SNS 마케팅과 인스타그래머블 콘텐츠 개발이 효과적입니다.",
        data_source: "tourist_by_gender_age",
        priority: 3,
    },
    Insight {
        category: "rwa_value",
        title: "여성 관광객 비중 우세",
        description: "성별 분석 결과, 여성 관광객 비중이 남성보다 높습니다. 여성 친화적 시설 및 안전 요소를 강조해야 합니다.",
        data_source: "tourist_by_gender_age",
        priority: 2,
    },
    Insight {
        category: "marketing_priority",
        title: "관광 만족도 93.5%, 재방문 의향 85.6%",
        description: "방한 관광객의 전반적 만족도는 93.5%로 매우 높으며, 85.6%가 재방문 의향을 보입니다. 충성 고객 확보 전략이 유효합니다.",
        data_source: "tourist_behavior",
        priority: 2,
    },
];
