//! Game identifiers and the schedule lookups that produce them.
//!
//! A game id reads `SSSSTTNNNN`: season start year, game type, game number.
//! `2021020001` is the first regular season game of 2021-2022.

use crate::config::FetcherConfig;
use crate::error::FetchError;
use crate::models::{TableType, Unit};
use crate::scraper::PageFetcher;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};
use url::Url;

/// HTML game reports start with the 2007-2008 season; shift data (and this
/// tool) with 2010-2011.
pub const FIRST_SEASON: u16 = 2010;

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid game id '{input}': {reason}")]
    InvalidGameId { input: String, reason: String },

    #[error("invalid date range {start} → {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not decode schedule from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("bad URL: {0}")]
    Url(#[from] url::ParseError),
}

// ── Game type ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum GameType {
    Preseason,
    Regular,
    Playoffs,
    AllStar,
}

impl GameType {
    pub fn code(&self) -> u32 {
        match self {
            Self::Preseason => 1,
            Self::Regular => 2,
            Self::Playoffs => 3,
            Self::AllStar => 4,
        }
    }

    /// `gameType` parameter of the schedule API.
    pub fn api_code(&self) -> &'static str {
        match self {
            Self::Preseason => "PR",
            Self::Regular => "R",
            Self::Playoffs => "P",
            Self::AllStar => "A",
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Preseason),
            2 => Some(Self::Regular),
            3 => Some(Self::Playoffs),
            4 => Some(Self::AllStar),
            _ => None,
        }
    }
}

// ── Game id ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameId(u64);

impl GameId {
    pub fn new(season: u16, game_type: GameType, number: u32) -> Result<Self, ScheduleError> {
        let invalid = |reason: String| ScheduleError::InvalidGameId {
            input: format!("{}/{:?}/{}", season, game_type, number),
            reason,
        };
        if !(FIRST_SEASON..=9998).contains(&season) {
            return Err(invalid(format!("season must be {} or later", FIRST_SEASON)));
        }
        if !(1..=9999).contains(&number) {
            return Err(invalid("game number must be within 1..=9999".to_string()));
        }
        Ok(Self(season as u64 * 1_000_000 + game_type.code() as u64 * 10_000 + number as u64))
    }

    pub fn season(&self) -> u16 {
        (self.0 / 1_000_000) as u16
    }

    pub fn game_type(&self) -> GameType {
        // Validated on construction.
        GameType::from_code((self.0 / 10_000 % 100) as u32).unwrap_or(GameType::Regular)
    }

    pub fn number(&self) -> u32 {
        (self.0 % 10_000) as u32
    }

    /// "20212022" for any 2021 game.
    pub fn season_code(&self) -> String {
        let start = self.season();
        format!("{}{}", start, start + 1)
    }

    /// `{base}/20212022/ES020001.HTM`
    pub fn report_url(&self, base: &str, report_code: &str) -> Result<Url, ScheduleError> {
        let base = Url::parse(&format!("{}/", base.trim_end_matches('/')))?;
        let path = format!(
            "{}/{}{:02}{:04}.HTM",
            self.season_code(),
            report_code,
            self.game_type().code(),
            self.number()
        );
        Ok(base.join(&path)?)
    }

    /// `{base}/shiftcharts?cayenneExp=gameId=2021020001`
    pub fn shift_chart_url(&self, base: &str) -> Result<Url, ScheduleError> {
        Ok(Url::parse_with_params(
            &format!("{}/shiftcharts", base.trim_end_matches('/')),
            [("cayenneExp", format!("gameId={}", self))],
        )?)
    }

    /// The unit that fetches this game's page for `table_type`.
    pub fn unit(&self, fetcher: &FetcherConfig, table_type: TableType) -> Result<Unit, ScheduleError> {
        let url = match table_type.report_code() {
            Some(code) => self.report_url(&fetcher.report_base_url, code)?,
            None => self.shift_chart_url(&fetcher.shift_base_url)?,
        };
        Ok(Unit::new(self.to_string(), url.as_str()))
    }
}

impl TryFrom<u64> for GameId {
    type Error = ScheduleError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        let invalid = |reason: &str| ScheduleError::InvalidGameId {
            input: raw.to_string(),
            reason: reason.to_string(),
        };
        if !(1_000_000_000..=9_999_999_999).contains(&raw) {
            return Err(invalid("expected 10 digits"));
        }
        let game_type = GameType::from_code((raw / 10_000 % 100) as u32)
            .ok_or_else(|| invalid("game type must be 01-04"))?;
        GameId::new((raw / 1_000_000) as u16, game_type, (raw % 10_000) as u32)
    }
}

impl FromStr for GameId {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 10 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ScheduleError::InvalidGameId {
                input: s.to_string(),
                reason: "expected 10 digits".to_string(),
            });
        }
        let raw: u64 = s.parse().map_err(|_| ScheduleError::InvalidGameId {
            input: s.to_string(),
            reason: "out of range".to_string(),
        })?;
        GameId::try_from(raw)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every game of a season: `{season}{type}0001` through `{season}{type}{n}`.
pub fn season_game_ids(season: u16, game_type: GameType, n_games: u32) -> Result<Vec<GameId>, ScheduleError> {
    (1..=n_games).map(|n| GameId::new(season, game_type, n)).collect()
}

// ── Schedule API ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SeasonSchedule {
    #[serde(rename = "totalGames")]
    total_games: u32,
}

#[derive(Debug, Deserialize)]
struct DateSchedule {
    #[serde(default)]
    dates: Vec<ScheduleDate>,
}

#[derive(Debug, Deserialize)]
struct ScheduleDate {
    #[serde(default)]
    games: Vec<ScheduleGame>,
}

#[derive(Debug, Deserialize)]
struct ScheduleGame {
    #[serde(rename = "gamePk")]
    game_pk: u64,
}

pub fn parse_total_games(url: &str, json: &str) -> Result<u32, ScheduleError> {
    let schedule: SeasonSchedule = serde_json::from_str(json).map_err(|e| ScheduleError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    Ok(schedule.total_games)
}

pub fn parse_game_ids(url: &str, json: &str) -> Result<Vec<GameId>, ScheduleError> {
    let schedule: DateSchedule = serde_json::from_str(json).map_err(|e| ScheduleError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    schedule
        .dates
        .into_iter()
        .flat_map(|d| d.games)
        .map(|g| GameId::try_from(g.game_pk))
        .collect()
}

pub struct ScheduleClient<'a> {
    fetcher: &'a dyn PageFetcher,
    base_url: String,
}

impl<'a> ScheduleClient<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn schedule_url(&self, params: &[(&str, String)]) -> Result<Url, ScheduleError> {
        Ok(Url::parse_with_params(&format!("{}/schedule", self.base_url), params)?)
    }

    pub async fn total_games(&self, season: u16, game_type: GameType) -> Result<u32, ScheduleError> {
        let url = self.schedule_url(&[
            ("season", format!("{}{}", season, season + 1)),
            ("gameType", game_type.api_code().to_string()),
        ])?;
        let doc = self.fetcher.fetch(url.as_str()).await?;
        let n = parse_total_games(doc.url(), doc.body())?;
        info!("{} {:?} season: {} games", season, game_type, n);
        Ok(n)
    }

    pub async fn game_ids_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<GameId>, ScheduleError> {
        if end < start {
            return Err(ScheduleError::InvalidRange { start, end });
        }
        let url = self.schedule_url(&[
            ("startDate", start.format("%Y-%m-%d").to_string()),
            ("endDate", end.format("%Y-%m-%d").to_string()),
        ])?;
        let doc = self.fetcher.fetch(url.as_str()).await?;
        let ids = parse_game_ids(doc.url(), doc.body())?;
        debug!("{} → {}: {} games", start, end, ids.len());
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawDocument;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn test_game_id_parts() {
        let id: GameId = "2021020001".parse().unwrap();
        assert_eq!(id.season(), 2021);
        assert_eq!(id.game_type(), GameType::Regular);
        assert_eq!(id.number(), 1);
        assert_eq!(id.season_code(), "20212022");
        assert_eq!(id.to_string(), "2021020001");
    }

    #[test]
    fn test_rejects_bad_game_ids() {
        assert!("2021020000".parse::<GameId>().is_err());
        assert!("2021090001".parse::<GameId>().is_err());
        assert!("2005020001".parse::<GameId>().is_err());
        assert!("202102001".parse::<GameId>().is_err());
        assert!("20210200ab".parse::<GameId>().is_err());
    }

    #[test]
    fn test_report_url() {
        let id: GameId = "2021030412".parse().unwrap();
        let url = id.report_url("https://www.nhl.com/scores/htmlreports/", "ES").unwrap();
        assert_eq!(url.as_str(), "https://www.nhl.com/scores/htmlreports/20212022/ES030412.HTM");

        let fetcher = FetcherConfig::default();
        let unit = id.unit(&fetcher, TableType::Roster).unwrap();
        assert_eq!(unit.id, "2021030412");
        assert!(unit.url.ends_with("/20212022/RO030412.HTM"));
        let pbp = id.unit(&fetcher, TableType::PlayByPlay).unwrap();
        assert!(pbp.url.ends_with("/20212022/PL030412.HTM"));
    }

    #[test]
    fn test_shift_chart_url() {
        let id: GameId = "2021020001".parse().unwrap();
        let unit = id.unit(&FetcherConfig::default(), TableType::Shifts).unwrap();
        assert_eq!(unit.id, "2021020001");
        assert_eq!(
            unit.url,
            "https://api.nhle.com/stats/rest/en/shiftcharts?cayenneExp=gameId%3D2021020001"
        );
    }

    #[test]
    fn test_season_game_ids() {
        let ids = season_game_ids(2021, GameType::Regular, 1312).unwrap();
        assert_eq!(ids.len(), 1312);
        assert_eq!(ids[0].to_string(), "2021020001");
        assert_eq!(ids[1311].to_string(), "2021021312");
        assert!(season_game_ids(2009, GameType::Regular, 1).is_err());
    }

    #[test]
    fn test_parse_schedule_json() {
        assert_eq!(parse_total_games("u", r#"{"totalGames": 1312, "dates": []}"#).unwrap(), 1312);

        let json = r#"{"dates": [
            {"date": "2021-10-31", "games": [{"gamePk": 2021020127}, {"gamePk": 2021020131}]},
            {"date": "2021-11-01", "games": [{"gamePk": 2021020132}]}
        ]}"#;
        let ids: Vec<String> = parse_game_ids("u", json).unwrap().iter().map(|g| g.to_string()).collect();
        assert_eq!(ids, vec!["2021020127", "2021020131", "2021020132"]);

        assert!(parse_game_ids("u", r#"{"totalGames": 0}"#).unwrap().is_empty());
        assert!(matches!(parse_total_games("u", "<html>"), Err(ScheduleError::Decode { .. })));
    }

    struct JsonFetcher {
        body: &'static str,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageFetcher for JsonFetcher {
        async fn fetch(&self, url: &str) -> Result<RawDocument, FetchError> {
            self.seen.lock().unwrap().push(url.to_string());
            Ok(RawDocument::new(url, self.body))
        }
    }

    #[tokio::test]
    async fn test_schedule_client_queries() {
        let fetcher = JsonFetcher {
            body: r#"{"totalGames": 1312, "dates": [{"games": [{"gamePk": 2021020566}]}]}"#,
            seen: Mutex::new(Vec::new()),
        };
        let client = ScheduleClient::new(&fetcher, "https://statsapi.web.nhl.com/api/v1/");

        assert_eq!(client.total_games(2021, GameType::Regular).await.unwrap(), 1312);
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2022, 1, 2).unwrap();
        let ids = client.game_ids_between(start, end).await.unwrap();
        assert_eq!(ids[0].to_string(), "2021020566");
        assert!(client.game_ids_between(end, start).await.is_err());

        let seen = fetcher.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            "https://statsapi.web.nhl.com/api/v1/schedule?season=20212022&gameType=R"
        );
        assert_eq!(
            seen[1],
            "https://statsapi.web.nhl.com/api/v1/schedule?startDate=2022-01-01&endDate=2022-01-02"
        );
    }
}
