//! Derived dashboard values.
//!
//! Everything here is a pure function over loaded rows. Percentages keep
//! full precision unless a function says it rounds.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::queries::{
    AgeRow, BehaviorRow, ContinentRow, CountryRow, DashboardData, GenderAgeRow, InterestRow,
    TransportSummaryRow, TrendRow,
};

/// Grand-total pseudo-row of the age and gender-age breakdowns.
pub const TOTAL_BRACKET: &str = "전체";
/// Crew members, not tourists.
pub const CREW_BRACKET: &str = "승무원";
/// Grand-total row of the country table.
pub const TOTAL_COUNTRY: &str = "총계";
pub const PRIMARY_AIRPORT: &str = "인천공항";

const EXCLUDED_CONTINENTS: &[&str] = &["기타", "교포"];
/// Decades whose visitors count toward the young-adult share.
const YOUNG_ADULT_DECADES: std::ops::RangeInclusive<u32> = 20..=39;
pub const TOP_COUNTRIES: usize = 10;

pub const BASELINE_YEAR: i64 = 2015;
pub const LATEST_YEAR: i64 = 2024;

const MONTHS: [&str; 12] = [
    "1월", "2월", "3월", "4월", "5월", "6월", "7월", "8월", "9월", "10월", "11월", "12월",
];

// ============================================================================
// Output types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinentShare {
    pub name: String,
    pub value: f64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryShare {
    pub name: String,
    pub percentage: f64,
    pub count: i64,
    pub growth_rate: Option<f64>,
    pub rank: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgePoint {
    pub age: String,
    /// Thousands of visitors, rounded.
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeDistribution {
    pub series: Vec<AgePoint>,
    pub share_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Growth {
    pub signed: f64,
    pub magnitude: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenderSplit {
    pub female: f64,
    pub male: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub label: String,
    pub count: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderAgePoint {
    pub age_group: String,
    /// Units of 10,000 visitors, rounded.
    pub male: i64,
    pub female: i64,
    pub male_percent: f64,
    pub female_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterestPoint {
    pub month: String,
    pub interest: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyInterest {
    pub series: Vec<InterestPoint>,
    pub seasonality_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirportShare {
    pub name: String,
    pub value: f64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirportShares {
    pub airports: Vec<AirportShare>,
    pub non_primary_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingPoint {
    pub year: i64,
    pub spending: f64,
    pub stay_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingTrend {
    pub series: Vec<SpendingPoint>,
    pub growth_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSnapshot {
    pub year: i64,
    pub avg_spending: f64,
    pub stay_duration: f64,
    pub satisfaction: Option<f64>,
    pub revisit_intention: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Headline {
    pub baseline: Option<YearSnapshot>,
    pub latest: Option<YearSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalVisitors {
    pub count: f64,
    pub formatted: String,
    pub previous: Option<f64>,
    pub previous_formatted: Option<String>,
    pub yoy: Option<Growth>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub headline: Headline,
    pub total_visitors: TotalVisitors,
    pub continent_shares: Vec<ContinentShare>,
    pub top_countries: Vec<CountryShare>,
    pub age_distribution: AgeDistribution,
    pub gender_split: Option<GenderSplit>,
    pub top_segment: Option<Segment>,
    pub gender_age_series: Vec<GenderAgePoint>,
    pub monthly_interest: MonthlyInterest,
    pub airport_shares: AirportShares,
    pub spending_trend: SpendingTrend,
}

// ============================================================================
// Helpers
// ============================================================================

/// Round half-up to one decimal place.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Count in units of 10,000 (만), no decimals: 18_938_339 -> "1894만".
pub fn format_man(v: f64) -> String {
    format!("{:.0}만", (v / 10_000.0).round())
}

/// Sum that yields `0.0` (not `-0.0`) for no items.
fn sum(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, |acc, v| acc + v)
}

fn is_breakdown(age_group: &str) -> bool {
    age_group != TOTAL_BRACKET && age_group != CREW_BRACKET
}

/// Whether a bracket falls in the 20s or 30s, whatever the labeling:
/// `21~30세`, `31~40세`, `20대` and `30대` match; `20세이하` does not.
pub fn is_young_adult(age_group: &str) -> bool {
    let label = age_group.trim();
    if label.contains("이하") || label.contains("이상") {
        return false;
    }
    let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits
        .parse::<u32>()
        .is_ok_and(|start| YOUNG_ADULT_DECADES.contains(&start))
}

/// Canonical position of an age bracket; unknown labels sort last.
pub fn age_order(age_group: &str) -> u8 {
    match age_group {
        "20세이하" | "20세 이하" => 0,
        "21~30세" => 1,
        "31~40세" => 2,
        "41~50세" => 3,
        "51~60세" => 4,
        "61세이상" | "61세 이상" => 5,
        _ => 99,
    }
}

// ============================================================================
// Derivations
// ============================================================================

pub fn continent_shares(rows: &[ContinentRow]) -> Vec<ContinentShare> {
    rows.iter()
        .filter(|r| !EXCLUDED_CONTINENTS.contains(&r.continent.as_str()))
        .map(|r| ContinentShare {
            name: r.continent.clone(),
            value: r.percentage,
            count: r.tourist_count.round() as i64,
        })
        .collect()
}

/// Countries with a positive share, largest first. Equal shares keep input
/// order. The grand-total row carries no share and drops out here.
pub fn top_countries(rows: &[CountryRow], k: usize) -> Vec<CountryShare> {
    let mut ranked: Vec<(&CountryRow, f64)> = rows
        .iter()
        .filter_map(|r| match r.percentage {
            Some(p) if p > 0.0 => Some((r, p)),
            _ => None,
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    ranked
        .into_iter()
        .take(k)
        .map(|(r, p)| CountryShare {
            name: r.country.clone(),
            percentage: round1(p),
            count: r.tourist_count.round() as i64,
            growth_rate: r.growth_rate,
            rank: r.rank,
        })
        .collect()
}

/// Chart series without crew and total rows, plus the share of the brackets
/// selected by `in_share` against the total row. The share is `None` without
/// a non-zero total or without any selected bracket.
pub fn age_distribution(rows: &[AgeRow], in_share: impl Fn(&str) -> bool) -> AgeDistribution {
    let series = rows
        .iter()
        .filter(|r| is_breakdown(&r.age_group))
        .map(|r| AgePoint {
            age: r.age_group.clone(),
            count: (r.count / 1000.0).round() as i64,
        })
        .collect();

    let total = rows
        .iter()
        .find(|r| r.age_group == TOTAL_BRACKET)
        .map(|r| r.count)
        .filter(|c| *c != 0.0);

    let selected: Vec<f64> = rows
        .iter()
        .filter(|r| is_breakdown(&r.age_group) && in_share(&r.age_group))
        .map(|r| r.count)
        .collect();
    let share_percent = match total {
        Some(total) if !selected.is_empty() => Some(sum(selected.into_iter()) / total * 100.0),
        _ => None,
    };

    AgeDistribution {
        series,
        share_percent,
    }
}

/// Signed percent change. Undefined without a positive previous value.
pub fn yoy_growth(current: f64, previous: Option<f64>) -> Option<Growth> {
    let previous = previous.filter(|p| *p > 0.0)?;
    let signed = (current - previous) / previous * 100.0;
    Some(Growth {
        signed,
        magnitude: signed.abs(),
        direction: if signed >= 0.0 {
            Direction::Increase
        } else {
            Direction::Decrease
        },
    })
}

pub fn gender_split(rows: &[GenderAgeRow]) -> Option<GenderSplit> {
    let (male, female) = rows
        .iter()
        .filter(|r| is_breakdown(&r.age_group))
        .fold((0.0, 0.0), |(m, f), r| (m + r.male_count, f + r.female_count));

    let sum = male + female;
    if sum <= 0.0 {
        return None;
    }
    let female = female / sum * 100.0;
    Some(GenderSplit {
        female,
        male: 100.0 - female,
    })
}

/// Largest single (bracket, gender) cell. On ties the first in input order
/// wins, male before female within a bracket.
pub fn top_segment(rows: &[GenderAgeRow]) -> Option<Segment> {
    let mut best: Option<Segment> = None;
    for r in rows.iter().filter(|r| is_breakdown(&r.age_group)) {
        let cells = [
            ("남성", r.male_count, r.male_percentage),
            ("여성", r.female_count, r.female_percentage),
        ];
        for (gender, count, percent) in cells {
            if best.as_ref().map_or(true, |b| count > b.count) {
                best = Some(Segment {
                    label: format!("{} {}", r.age_group, gender),
                    count,
                    percent: percent.unwrap_or(0.0),
                });
            }
        }
    }
    best
}

pub fn gender_age_series(rows: &[GenderAgeRow]) -> Vec<GenderAgePoint> {
    let mut series: Vec<GenderAgePoint> = rows
        .iter()
        .filter(|r| is_breakdown(&r.age_group))
        .map(|r| GenderAgePoint {
            age_group: r.age_group.clone(),
            male: (r.male_count / 10_000.0).round() as i64,
            female: (r.female_count / 10_000.0).round() as i64,
            male_percent: r.male_percentage.unwrap_or(0.0),
            female_percent: r.female_percentage.unwrap_or(0.0),
        })
        .collect();
    series.sort_by_key(|p| age_order(&p.age_group));
    series
}

/// Month-labelled interest series. Only a full 12-point year gets month
/// names; anything else keeps the stored year-month keys.
pub fn monthly_interest(rows: &[InterestRow]) -> MonthlyInterest {
    let labelled = rows.len() == MONTHS.len();
    let series = rows
        .iter()
        .enumerate()
        .map(|(i, r)| InterestPoint {
            month: if labelled {
                MONTHS[i].to_string()
            } else {
                r.year_month.clone()
            },
            interest: r.interest_percentage,
        })
        .collect();

    MonthlyInterest {
        series,
        seasonality_ratio: seasonality_ratio(rows),
    }
}

/// Peak over trough; a zero trough counts as 1.
pub fn seasonality_ratio(rows: &[InterestRow]) -> Option<f64> {
    let values = rows.iter().map(|r| r.interest_percentage);
    let max = values.clone().reduce(f64::max)?;
    let min = values.reduce(f64::min)?;
    let min = if min == 0.0 { 1.0 } else { min };
    Some(max / min)
}

pub fn airport_shares(rows: &[TransportSummaryRow]) -> AirportShares {
    let mut airports: Vec<AirportShare> = rows
        .iter()
        .filter(|r| r.transport.contains("공항"))
        .map(|r| AirportShare {
            name: r.transport.clone(),
            value: r.percentage.unwrap_or(0.0),
            count: r.tourist_count.round() as i64,
        })
        .collect();
    airports.sort_by(|a, b| b.value.total_cmp(&a.value));

    let non_primary_share = sum(
        airports
            .iter()
            .filter(|a| a.name != PRIMARY_AIRPORT)
            .map(|a| a.value),
    );

    AirportShares {
        airports,
        non_primary_share,
    }
}

/// Per-year spending and stay, with growth from the first to the last year.
pub fn spending_trend(rows: &[BehaviorRow]) -> SpendingTrend {
    let series: Vec<SpendingPoint> = rows
        .iter()
        .map(|r| SpendingPoint {
            year: r.year,
            spending: r.avg_spending,
            stay_duration: r.stay_duration,
        })
        .collect();

    let growth_percent = match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() > 1 => {
            yoy_growth(last.spending, Some(first.spending)).map(|g| g.signed)
        }
        _ => None,
    };

    SpendingTrend {
        series,
        growth_percent,
    }
}

fn snapshot(rows: &[BehaviorRow], year: i64) -> Option<YearSnapshot> {
    rows.iter().find(|r| r.year == year).map(|r| YearSnapshot {
        year: r.year,
        avg_spending: r.avg_spending,
        stay_duration: r.stay_duration,
        satisfaction: r.satisfaction,
        revisit_intention: r.revisit_intention,
    })
}

pub fn headline(rows: &[BehaviorRow]) -> Headline {
    Headline {
        baseline: snapshot(rows, BASELINE_YEAR),
        latest: snapshot(rows, LATEST_YEAR),
    }
}

/// Visitors from the country grand-total row, else the sum of the monthly
/// trend. Year-over-year growth needs the grand-total row.
pub fn total_visitors(countries: &[CountryRow], trend: &[TrendRow]) -> TotalVisitors {
    let total_row = countries.iter().find(|c| c.country == TOTAL_COUNTRY);
    let count = match total_row {
        Some(row) => row.tourist_count,
        None => sum(trend.iter().map(|t| t.tourist_count)),
    };
    let previous = total_row.and_then(|r| r.previous_year_count);

    TotalVisitors {
        count,
        formatted: format_man(count),
        previous,
        previous_formatted: previous.map(format_man),
        yoy: yoy_growth(count, previous),
    }
}

pub fn build_dashboard(data: &DashboardData) -> Dashboard {
    Dashboard {
        generated_at: Utc::now(),
        headline: headline(&data.behavior),
        total_visitors: total_visitors(&data.countries, &data.trend),
        continent_shares: continent_shares(&data.continents),
        top_countries: top_countries(&data.countries, TOP_COUNTRIES),
        age_distribution: age_distribution(&data.ages, is_young_adult),
        gender_split: gender_split(&data.gender_ages),
        top_segment: top_segment(&data.gender_ages),
        gender_age_series: gender_age_series(&data.gender_ages),
        monthly_interest: monthly_interest(&data.interest),
        airport_shares: airport_shares(&data.transport),
        spending_trend: spending_trend(&data.behavior),
    }
}
