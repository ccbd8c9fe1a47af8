use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

const TMDB_BASE: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
const KEY_PLACEHOLDER: &str = "YOUR_TMDB_API_KEY_HERE";
const TOP_FILMOGRAPHY_CAP: usize = 7;

/// The access key is absent or still the placeholder. Detected before any
/// network I/O; remote-dependent features run degraded without it.
#[derive(Debug, Error)]
#[error("TMDB_API_KEY is not configured; remote lookups are disabled")]
pub struct NotConfigured;

/// Outcome of one remote call. Transport and parse failures never cross this
/// boundary as errors; they collapse into `Unavailable` for that single call
/// so sibling lookups keep going.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteLookup<T> {
    Found(T),
    NotFound,
    Unavailable,
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    /// Relevance order comes from TMDB; results are never re-ranked here.
    async fn search_movies(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> RemoteLookup<Vec<MovieSummary>>;
    async fn search_people(&self, name: &str) -> RemoteLookup<Vec<PersonSummary>>;
    async fn movie_detail(&self, id: i64) -> RemoteLookup<MovieDetail>;
    async fn person_detail(&self, id: i64) -> RemoteLookup<PersonDetail>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieSummary {
    pub id: i64,
    pub title: String,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieDetail {
    pub id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub runtime_minutes: Option<i32>,
    pub genres: Vec<String>,
    pub production_companies: Vec<Company>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonSummary {
    pub id: i64,
    pub name: String,
    pub photo_url: Option<String>,
    pub known_for_department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonDetail {
    pub id: i64,
    pub name: String,
    pub biography: Option<String>,
    pub photo_url: Option<String>,
    pub birthday: Option<String>,
    pub place_of_birth: Option<String>,
    pub known_for_department: Option<String>,
    pub gender: i32,
    pub also_known_as: Vec<String>,
    pub top_filmography: Vec<FilmographyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilmographyEntry {
    pub title: String,
    pub release_date: String,
    pub character: Option<String>,
    pub popularity: f64,
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    language: String,
}

impl TmdbClient {
    pub fn new(api_key: String, language: String) -> Result<Self, NotConfigured> {
        if api_key.trim().is_empty() || api_key == KEY_PLACEHOLDER {
            return Err(NotConfigured);
        }
        Ok(Self {
            client: Client::new(),
            api_key,
            language,
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<Option<T>> {
        let res = self.client.get(url).send().await.context("request failed")?;
        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {}", status, text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(Some(parsed))
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search_movies(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> RemoteLookup<Vec<MovieSummary>> {
        let mut url = format!(
            "{TMDB_BASE}/search/movie?api_key={}&query={}&language={}",
            self.api_key,
            urlencoding::encode(title),
            self.language
        );
        if let Some(year) = year {
            url.push_str(&format!("&year={year}"));
        }
        lookup(
            "movie search",
            self.get_json::<SearchPage<RawMovie>>(&url).await,
        )
        .map(|page| page.results.into_iter().map(RawMovie::into_summary).collect())
    }

    async fn search_people(&self, name: &str) -> RemoteLookup<Vec<PersonSummary>> {
        let url = format!(
            "{TMDB_BASE}/search/person?api_key={}&query={}&language={}",
            self.api_key,
            urlencoding::encode(name),
            self.language
        );
        lookup(
            "person search",
            self.get_json::<SearchPage<RawPerson>>(&url).await,
        )
        .map(|page| {
            page.results
                .into_iter()
                .map(RawPerson::into_summary)
                .collect()
        })
    }

    async fn movie_detail(&self, id: i64) -> RemoteLookup<MovieDetail> {
        let url = format!(
            "{TMDB_BASE}/movie/{id}?api_key={}&language={}",
            self.api_key, self.language
        );
        lookup("movie detail", self.get_json::<RawMovieDetail>(&url).await)
            .map(RawMovieDetail::into_detail)
    }

    async fn person_detail(&self, id: i64) -> RemoteLookup<PersonDetail> {
        // movie_credits rides along to avoid a third round trip for the
        // filmography.
        let url = format!(
            "{TMDB_BASE}/person/{id}?append_to_response=movie_credits&api_key={}&language={}",
            self.api_key, self.language
        );
        lookup("person detail", self.get_json::<RawPersonDetail>(&url).await)
            .map(RawPersonDetail::into_detail)
    }
}

impl<T> RemoteLookup<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RemoteLookup<U> {
        match self {
            RemoteLookup::Found(v) => RemoteLookup::Found(f(v)),
            RemoteLookup::NotFound => RemoteLookup::NotFound,
            RemoteLookup::Unavailable => RemoteLookup::Unavailable,
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            RemoteLookup::Found(v) => Some(v),
            _ => None,
        }
    }
}

fn lookup<T>(what: &str, result: Result<Option<T>>) -> RemoteLookup<T> {
    match result {
        Ok(Some(value)) => RemoteLookup::Found(value),
        Ok(None) => RemoteLookup::NotFound,
        Err(err) => {
            warn!("TMDB {} failed: {:#}", what, err);
            RemoteLookup::Unavailable
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawMovie {
    id: i64,
    title: String,
    release_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    vote_average: Option<f64>,
}

impl RawMovie {
    fn into_summary(self) -> MovieSummary {
        MovieSummary {
            id: self.id,
            title: self.title,
            release_date: non_empty(self.release_date),
            overview: non_empty(self.overview),
            poster_url: image_url(self.poster_path),
            vote_average: self.vote_average,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPerson {
    id: i64,
    name: String,
    profile_path: Option<String>,
    known_for_department: Option<String>,
}

impl RawPerson {
    fn into_summary(self) -> PersonSummary {
        PersonSummary {
            id: self.id,
            name: self.name,
            photo_url: image_url(self.profile_path),
            known_for_department: non_empty(self.known_for_department),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawCompany {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawMovieDetail {
    id: i64,
    title: String,
    overview: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    vote_average: Option<f64>,
    runtime: Option<i32>,
    #[serde(default)]
    genres: Vec<RawGenre>,
    #[serde(default)]
    production_companies: Vec<RawCompany>,
    budget: Option<i64>,
    revenue: Option<i64>,
}

impl RawMovieDetail {
    fn into_detail(self) -> MovieDetail {
        MovieDetail {
            id: self.id,
            title: self.title,
            overview: non_empty(self.overview),
            poster_url: image_url(self.poster_path),
            release_date: non_empty(self.release_date),
            vote_average: self.vote_average,
            runtime_minutes: self.runtime.filter(|r| *r > 0),
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            production_companies: self
                .production_companies
                .into_iter()
                .map(|c| Company {
                    id: c.id,
                    name: c.name,
                })
                .collect(),
            // TMDB reports 0 for unknown budget/revenue.
            budget: self.budget.filter(|b| *b > 0),
            revenue: self.revenue.filter(|r| *r > 0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCredit {
    title: Option<String>,
    release_date: Option<String>,
    character: Option<String>,
    popularity: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct RawCredits {
    #[serde(default)]
    cast: Vec<RawCredit>,
}

#[derive(Debug, Deserialize)]
struct RawPersonDetail {
    id: i64,
    name: String,
    biography: Option<String>,
    profile_path: Option<String>,
    birthday: Option<String>,
    place_of_birth: Option<String>,
    known_for_department: Option<String>,
    #[serde(default)]
    gender: i32,
    #[serde(default)]
    also_known_as: Vec<String>,
    #[serde(default)]
    movie_credits: Option<RawCredits>,
}

impl RawPersonDetail {
    fn into_detail(self) -> PersonDetail {
        let credits = self.movie_credits.unwrap_or_default();
        PersonDetail {
            id: self.id,
            name: self.name,
            biography: non_empty(self.biography),
            photo_url: image_url(self.profile_path),
            birthday: non_empty(self.birthday),
            place_of_birth: non_empty(self.place_of_birth),
            known_for_department: non_empty(self.known_for_department),
            gender: self.gender,
            also_known_as: self.also_known_as,
            top_filmography: top_filmography(credits.cast),
        }
    }
}

/// Most popular credits first, skipping anything without a release date,
/// capped at seven entries.
fn top_filmography(cast: Vec<RawCredit>) -> Vec<FilmographyEntry> {
    let mut entries: Vec<FilmographyEntry> = cast
        .into_iter()
        .filter_map(|credit| {
            let title = non_empty(credit.title)?;
            let release_date = non_empty(credit.release_date)?;
            Some(FilmographyEntry {
                title,
                release_date,
                character: non_empty(credit.character),
                popularity: credit.popularity.unwrap_or(0.0),
            })
        })
        .collect();
    entries.sort_by(|a, b| {
        b.popularity
            .partial_cmp(&a.popularity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries.truncate(TOP_FILMOGRAPHY_CAP);
    entries
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn image_url(path: Option<String>) -> Option<String> {
    path.map(|p| format!("{IMAGE_BASE}{p}"))
}
