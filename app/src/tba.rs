use chrono::{Datelike, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::error::{BotError, Result};

const API_TIMEOUT: Duration = Duration::from_secs(10);
const API_BASE: &str = "https://www.thebluealliance.com/api/v3";
const USER_AGENT: &str = "Latesh-Analysis-Bot/1.0";

pub const RECENT_MATCHES: usize = 5;
pub const MAX_AWARDS: usize = 10;
pub const MAX_EVENTS: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub key: String,
    pub team_number: u32,
    pub nickname: Option<String>,
    pub name: Option<String>,
    pub city: Option<String>,
    pub state_prov: Option<String>,
    pub country: Option<String>,
    pub rookie_year: Option<i32>,
    pub website: Option<String>,
    pub school_name: Option<String>,
}

impl Team {
    pub fn location(&self) -> String {
        [&self.city, &self.state_prov, &self.country]
            .iter()
            .map(|part| part.as_deref().unwrap_or("Unknown"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Alliance {
    #[serde(default)]
    pub team_keys: Vec<String>,
    /// TBA reports -1 for unplayed matches.
    pub score: Option<i32>,
}

impl Alliance {
    pub fn teams(&self) -> Vec<u32> {
        self.team_keys.iter().filter_map(|k| team_number(k)).collect()
    }

    pub fn display_teams(&self) -> String {
        self.team_keys
            .iter()
            .map(|k| k.trim_start_matches("frc"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn score_or_zero(&self) -> i32 {
        self.score.filter(|s| *s >= 0).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Alliances {
    pub red: Alliance,
    pub blue: Alliance,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Match {
    pub key: String,
    pub comp_level: String,
    pub match_number: u32,
    pub event_key: String,
    pub alliances: Alliances,
}

impl Match {
    pub fn is_played(&self) -> bool {
        matches!(self.alliances.red.score, Some(s) if s >= 0)
    }

    pub fn level_label(&self) -> String {
        comp_level_label(&self.comp_level)
    }

    /// Whether `team` was on the alliance with the higher score.
    pub fn won_by(&self, team: u32) -> bool {
        let red = self.alliances.red.score_or_zero();
        let blue = self.alliances.blue.score_or_zero();
        (self.alliances.red.teams().contains(&team) && red > blue)
            || (self.alliances.blue.teams().contains(&team) && blue > red)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub key: String,
    pub name: String,
    pub city: Option<String>,
    pub state_prov: Option<String>,
    pub country: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub event_type_string: Option<String>,
}

impl Event {
    pub fn location(&self) -> String {
        format!(
            "{}, {}",
            self.city.as_deref().unwrap_or("Unknown"),
            self.state_prov.as_deref().unwrap_or("Unknown")
        )
    }

    pub fn dates(&self) -> String {
        let fmt = |d: Option<NaiveDate>| {
            d.map(|d| d.format("%-m/%-d/%Y").to_string())
                .unwrap_or_else(|| "TBD".to_string())
        };
        format!("{} - {}", fmt(self.start_date), fmt(self.end_date))
    }

    pub fn in_progress(&self, today: NaiveDate) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= today && today <= end,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Award {
    pub name: String,
    pub event_key: String,
    pub year: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Red,
    Blue,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Red => "RED",
            Side::Blue => "BLUE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub winner: Side,
    pub confidence: f64,
    pub red_score: i64,
    pub blue_score: i64,
}

impl Prediction {
    pub const ANALYSIS: &'static str = "Basic prediction based on team experience (team numbers)";
    pub const DISCLAIMER: &'static str =
        "This is a simplified prediction model for demonstration purposes";
}

/// Experience heuristic: older (lower-numbered) teams weigh more.
/// `None` entries are teams that could not be fetched and count as zero.
pub fn predict(red: &[Option<u32>], blue: &[Option<u32>]) -> Prediction {
    let weight = |teams: &[Option<u32>]| -> i64 {
        teams
            .iter()
            .flatten()
            .map(|n| 10_000 - i64::from(*n))
            .sum()
    };
    let r = weight(red);
    let b = weight(blue);
    let max = r.max(b);
    let confidence = if max == 0 {
        0.0
    } else {
        (r - b).abs() as f64 / max as f64
    };

    Prediction {
        winner: if r > b { Side::Red } else { Side::Blue },
        confidence,
        red_score: (r as f64 / 100.0).round() as i64,
        blue_score: (b as f64 / 100.0).round() as i64,
    }
}

pub fn team_number(key: &str) -> Option<u32> {
    key.strip_prefix("frc").unwrap_or(key).parse().ok()
}

pub fn comp_level_label(level: &str) -> String {
    match level {
        "qm" => "Qualification".to_string(),
        "ef" => "Elimination".to_string(),
        other => other.to_uppercase(),
    }
}

/// Event keys are a four digit season followed by a lowercase event code, e.g. `2024casd`.
pub fn is_event_key(key: &str) -> bool {
    let (Some(year), Some(code)) = (key.get(..4), key.get(4..)) else {
        return false;
    };
    year.bytes().all(|b| b.is_ascii_digit())
        && !code.is_empty()
        && code.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

pub fn qualification_key(event: &str, number: u32) -> String {
    format!("{}_qm{number}", event.trim().to_lowercase())
}

#[derive(Debug)]
pub struct TbaClient {
    client: Client,
    api_key: Option<String>,
}

impl TbaClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(API_TIMEOUT)
                .user_agent(USER_AGENT)
                .build()?,
            api_key,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let mut req = self.client.get(format!("{API_BASE}{path}"));
        if let Some(key) = &self.api_key {
            req = req.header("X-TBA-Auth-Key", key);
        }
        let resp = req.send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(resp.json().await?)),
            status => Err(BotError::Tba {
                status: status.as_u16(),
            }),
        }
    }

    async fn fetch_list<T: DeserializeOwned>(&self, path: &str, limit: usize) -> Result<Vec<T>> {
        let mut items: Vec<T> = self.fetch(path).await?.unwrap_or_default();
        items.truncate(limit);
        Ok(items)
    }

    pub async fn team(&self, number: u32) -> Result<Option<Team>> {
        self.fetch(&format!("/team/frc{number}")).await
    }

    pub async fn team_matches(&self, number: u32, year: i32) -> Result<Vec<Match>> {
        self.fetch_list(&format!("/team/frc{number}/matches/{year}"), RECENT_MATCHES)
            .await
    }

    pub async fn team_awards(&self, number: u32, year: i32) -> Result<Vec<Award>> {
        self.fetch_list(&format!("/team/frc{number}/awards/{year}"), MAX_AWARDS)
            .await
    }

    pub async fn team_events(&self, number: u32, year: i32) -> Result<Vec<Event>> {
        self.fetch_list(&format!("/team/frc{number}/events/{year}"), MAX_EVENTS)
            .await
    }

    pub async fn event(&self, key: &str) -> Result<Option<Event>> {
        self.fetch(&format!("/event/{key}")).await
    }

    pub async fn event_matches(&self, key: &str) -> Result<Vec<Match>> {
        self.fetch_list(&format!("/event/{key}/matches"), usize::MAX)
            .await
    }

    pub async fn match_detail(&self, key: &str) -> Result<Option<Match>> {
        self.fetch(&format!("/match/{key}")).await
    }

    pub async fn current_events(&self, today: NaiveDate) -> Result<Vec<Event>> {
        let events: Vec<Event> = self
            .fetch_list(&format!("/events/{}", today.year()), usize::MAX)
            .await?;
        Ok(events.into_iter().filter(|e| e.in_progress(today)).collect())
    }

    async fn team_numbers(&self, alliance: &Alliance) -> Vec<Option<u32>> {
        let mut numbers = Vec::with_capacity(alliance.team_keys.len());
        for key in &alliance.team_keys {
            let fetched = match team_number(key) {
                Some(n) => self.team(n).await,
                None => Ok(None),
            };
            numbers.push(match fetched {
                Ok(team) => team.map(|t| t.team_number),
                Err(e) => {
                    warn!("Could not fetch {key} for prediction: {e}");
                    None
                }
            });
        }
        numbers
    }

    pub async fn predict_match(&self, m: &Match) -> Prediction {
        let red = self.team_numbers(&m.alliances.red).await;
        let blue = self.team_numbers(&m.alliances.blue).await;
        predict(&red, &blue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_keys_are_validated() {
        assert!(is_event_key("2024casd"));
        assert!(is_event_key("2023mrcmp2"));
        assert!(!is_event_key("2024"));
        assert!(!is_event_key("24casd"));
        assert!(!is_event_key("2024casd/../../team/frc254"));
        assert!(!is_event_key("2024ca sd"));
        assert!(!is_event_key("2024casd?x=1"));
        assert!(!is_event_key(""));
        assert!(!is_event_key("é2024casd"));
    }

    fn sample_match(red_score: i32, blue_score: i32) -> Match {
        serde_json::from_value(serde_json::json!({
            "key": "2024casd_qm12",
            "comp_level": "qm",
            "match_number": 12,
            "event_key": "2024casd",
            "alliances": {
                "red": {"team_keys": ["frc254", "frc1678", "frc971"], "score": red_score},
                "blue": {"team_keys": ["frc8033", "frc9999", "frc604"], "score": blue_score}
            }
        }))
        .unwrap()
    }

    #[test]
    fn lower_numbers_predict_win() {
        let p = predict(&[Some(254), Some(1678)], &[Some(8033), Some(9000)]);
        assert_eq!(p.winner, Side::Red);
        // red = 9746 + 8322, blue = 1967 + 1000
        assert_eq!(p.red_score, 181);
        assert_eq!(p.blue_score, 30);
        assert!((p.confidence - (18068.0 - 2967.0) / 18068.0).abs() < 1e-9);
    }

    #[test]
    fn ties_and_empty_go_blue() {
        let tie = predict(&[Some(100)], &[Some(100)]);
        assert_eq!(tie.winner, Side::Blue);
        assert_eq!(tie.confidence, 0.0);

        let empty = predict(&[None, None], &[]);
        assert_eq!(empty.winner, Side::Blue);
        assert_eq!(empty.confidence, 0.0);
        assert_eq!(empty.red_score, 0);
    }

    #[test]
    fn team_keys_parse() {
        assert_eq!(team_number("frc254"), Some(254));
        assert_eq!(team_number("254"), Some(254));
        assert_eq!(team_number("frcB"), None);
        assert_eq!(qualification_key(" 2024CASD ", 7), "2024casd_qm7");
    }

    #[test]
    fn comp_levels_are_labelled() {
        assert_eq!(comp_level_label("qm"), "Qualification");
        assert_eq!(comp_level_label("ef"), "Elimination");
        assert_eq!(comp_level_label("sf"), "SF");
    }

    #[test]
    fn match_outcome_follows_alliance() {
        let m = sample_match(120, 80);
        assert!(m.is_played());
        assert!(m.won_by(254));
        assert!(!m.won_by(604));
        assert!(!m.won_by(1));
        assert_eq!(m.alliances.blue.display_teams(), "8033, 9999, 604");
    }

    #[test]
    fn unplayed_match_has_no_winner() {
        let m = sample_match(-1, -1);
        assert!(!m.is_played());
        assert!(!m.won_by(254));
    }

    #[test]
    fn in_progress_is_inclusive() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "key": "2024casd",
            "name": "San Diego Regional",
            "city": "San Diego",
            "state_prov": "CA",
            "start_date": "2024-03-06",
            "end_date": "2024-03-09"
        }))
        .unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        assert!(event.in_progress(day(6)));
        assert!(event.in_progress(day(9)));
        assert!(!event.in_progress(day(10)));
        assert_eq!(event.location(), "San Diego, CA");
        assert_eq!(event.dates(), "3/6/2024 - 3/9/2024");
    }
}
