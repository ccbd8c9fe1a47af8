use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{Catalog, PerformerRecord, WorkRecord};
use crate::text::{clean_multi_value, title_prefix};
use crate::tmdb::{MovieDetail, MovieSummary, PersonDetail, PersonSummary, RemoteLookup, TmdbApi};

const DEFAULT_SCAN_BUDGET: usize = 5;

/// Identity of a work for duplicate suppression: title prefix before the
/// first colon (lowercased, trimmed) plus release year, 0 when unknown.
/// Two records with equal keys are the same work; the remote copy loses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupeKey {
    pub title: String,
    pub year: i32,
}

impl DedupeKey {
    pub fn new(title: &str, year: Option<i32>) -> Self {
        Self {
            title: title_prefix(title),
            year: year.unwrap_or(0),
        }
    }

    /// Key from a remote record whose year hides inside a `YYYY-MM-DD` date.
    pub fn from_release_date(title: &str, release_date: Option<&str>) -> Self {
        Self::new(title, release_date.and_then(parse_year))
    }
}

fn parse_year(date: &str) -> Option<i32> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| d.year())
}

/// Candidate selection policy for `enrich_*`. With an empty allow-list the
/// first search result wins; otherwise details are scanned, at most
/// `scan_budget` of them, until one is produced by an allowed company.
#[derive(Debug, Clone)]
pub struct MatchPolicy {
    pub allowed_companies: Vec<i64>,
    pub scan_budget: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            allowed_companies: Vec::new(),
            scan_budget: DEFAULT_SCAN_BUDGET,
        }
    }
}

/// Per-record (or per-section) remote outcome, serialized as a tagged status
/// so the presentation layer can say "nothing on the internet" and "internet
/// lookup unavailable" as different things.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteOutcome<T> {
    Matched { record: T },
    NoMatch,
    Unavailable,
    NotConfigured,
}

/// Local work row shaped for display: multi-value cells are cleaned into
/// lists (the `["-"]` placeholder marks "no data", distinct from empty).
#[derive(Debug, Clone, Serialize)]
pub struct WorkView {
    pub name: String,
    pub year: Option<i32>,
    pub kind: Option<String>,
    pub genre: Option<String>,
    pub content_rating: Option<String>,
    pub age_rating: Option<String>,
    pub duration: Option<String>,
    pub studio: Vec<String>,
    pub box_office: Option<String>,
    pub awards: Option<String>,
    pub characters: Vec<String>,
    pub performers: Vec<String>,
    pub songs: Vec<String>,
}

impl From<&WorkRecord> for WorkView {
    fn from(record: &WorkRecord) -> Self {
        Self {
            name: record.name.clone(),
            year: record.year,
            kind: record.kind.clone(),
            genre: record.genre.clone(),
            content_rating: record.content_rating.clone(),
            age_rating: record.age_rating.clone(),
            duration: record.duration.clone(),
            studio: clean_multi_value(record.studio.as_deref()),
            box_office: record.box_office.clone(),
            awards: record.awards.clone(),
            characters: clean_multi_value(record.characters.as_deref()),
            performers: clean_multi_value(record.performers.as_deref()),
            songs: clean_multi_value(record.songs.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformerView {
    pub name: String,
    pub career: Option<String>,
    pub birth_date: Option<String>,
    pub death_date: Option<String>,
    pub birthplace: Option<String>,
    pub death_place: Option<String>,
    pub zodiac: Option<String>,
    pub height: Option<f32>,
    pub projects: Option<i32>,
    pub filmography: Vec<String>,
    pub played_characters: Vec<String>,
}

impl From<&PerformerRecord> for PerformerView {
    fn from(record: &PerformerRecord) -> Self {
        Self {
            name: record.name.clone(),
            career: record.career.clone(),
            birth_date: record.birth_date.clone(),
            death_date: record.death_date.clone(),
            birthplace: record.birthplace.clone(),
            death_place: record.death_place.clone(),
            zodiac: record.zodiac.clone(),
            height: record.height,
            projects: record.projects,
            filmography: clean_multi_value(record.filmography.as_deref()),
            played_characters: clean_multi_value(record.played_characters.as_deref()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnrichedWork {
    #[serde(flatten)]
    pub local: WorkView,
    pub remote: RemoteOutcome<MovieDetail>,
}

#[derive(Debug, Serialize)]
pub struct EnrichedPerformer {
    #[serde(flatten)]
    pub local: PerformerView,
    pub remote: RemoteOutcome<PersonDetail>,
}

/// Everything one work query produces: local matches paired with their
/// remote counterparts, plus remote-only results with local duplicates
/// suppressed. Local order follows the catalog; remote order follows TMDB.
#[derive(Debug, Serialize)]
pub struct WorkQueryResult {
    pub local: Vec<EnrichedWork>,
    pub remote_only: RemoteOutcome<Vec<MovieSummary>>,
}

#[derive(Debug, Serialize)]
pub struct PerformerQueryResult {
    pub local: Vec<EnrichedPerformer>,
    pub remote_only: RemoteOutcome<Vec<PersonSummary>>,
}

/// Matches local rows to their remote counterparts and keeps the remote-only
/// section free of duplicates. Stateless between calls; `shown` keys live for
/// one query only.
pub struct Reconciler {
    tmdb: Option<Arc<dyn TmdbApi>>,
    policy: MatchPolicy,
}

impl Reconciler {
    pub fn new(tmdb: Option<Arc<dyn TmdbApi>>, policy: MatchPolicy) -> Self {
        Self { tmdb, policy }
    }

    pub async fn work_query(&self, catalog: &Catalog, query: &str) -> WorkQueryResult {
        let query = query.trim();
        if query.is_empty() {
            return WorkQueryResult {
                local: Vec::new(),
                remote_only: RemoteOutcome::NoMatch,
            };
        }

        let locals = catalog.find_works(query);
        let mut shown = HashSet::with_capacity(locals.len());
        let mut enriched = Vec::with_capacity(locals.len());
        for work in locals {
            shown.insert(DedupeKey::new(&work.name, work.year));
            let remote = self.enrich_work(work).await;
            enriched.push(EnrichedWork {
                local: WorkView::from(work),
                remote,
            });
        }

        let remote_only = match self.search_movies(query, None).await {
            RemoteOutcome::Matched { record } => {
                let kept = dedupe_remote_batch(record, &shown);
                if kept.is_empty() {
                    RemoteOutcome::NoMatch
                } else {
                    RemoteOutcome::Matched { record: kept }
                }
            }
            other => other,
        };

        WorkQueryResult {
            local: enriched,
            remote_only,
        }
    }

    pub async fn performer_query(&self, catalog: &Catalog, query: &str) -> PerformerQueryResult {
        let query = query.trim();
        if query.is_empty() {
            return PerformerQueryResult {
                local: Vec::new(),
                remote_only: RemoteOutcome::NoMatch,
            };
        }

        let locals = catalog.find_performers(query);
        let mut shown = HashSet::with_capacity(locals.len());
        let mut enriched = Vec::with_capacity(locals.len());
        for performer in locals {
            // Performers carry no year; their key is the normalized name.
            shown.insert(DedupeKey::new(&performer.name, None));
            let remote = self.enrich_performer(performer).await;
            enriched.push(EnrichedPerformer {
                local: PerformerView::from(performer),
                remote,
            });
        }

        let remote_only = match self.search_people(query).await {
            RemoteOutcome::Matched { record } => {
                let kept: Vec<PersonSummary> = record
                    .into_iter()
                    .filter(|p| !shown.contains(&DedupeKey::new(&p.name, None)))
                    .collect();
                if kept.is_empty() {
                    RemoteOutcome::NoMatch
                } else {
                    RemoteOutcome::Matched { record: kept }
                }
            }
            other => other,
        };

        PerformerQueryResult {
            local: enriched,
            remote_only,
        }
    }

    /// Finds the remote counterpart of one local work. Searches by the
    /// normalized title prefix (plus year when the row has one) and fetches
    /// detail for the first qualifying candidate. No qualifying candidate is
    /// a normal `NoMatch`, never an error.
    pub async fn enrich_work(&self, work: &WorkRecord) -> RemoteOutcome<MovieDetail> {
        let Some(tmdb) = &self.tmdb else {
            return RemoteOutcome::NotConfigured;
        };
        let title = title_prefix(&work.name);
        let results = match tmdb.search_movies(&title, work.year).await {
            RemoteLookup::Found(results) => results,
            RemoteLookup::NotFound => return RemoteOutcome::NoMatch,
            RemoteLookup::Unavailable => return RemoteOutcome::Unavailable,
        };
        if results.is_empty() {
            return RemoteOutcome::NoMatch;
        }
        self.pick_movie(tmdb.as_ref(), &results).await
    }

    pub async fn enrich_performer(
        &self,
        performer: &PerformerRecord,
    ) -> RemoteOutcome<PersonDetail> {
        let Some(tmdb) = &self.tmdb else {
            return RemoteOutcome::NotConfigured;
        };
        let results = match tmdb.search_people(&performer.name).await {
            RemoteLookup::Found(results) => results,
            RemoteLookup::NotFound => return RemoteOutcome::NoMatch,
            RemoteLookup::Unavailable => return RemoteOutcome::Unavailable,
        };
        let Some(first) = results.first() else {
            return RemoteOutcome::NoMatch;
        };
        match tmdb.person_detail(first.id).await {
            RemoteLookup::Found(detail) => RemoteOutcome::Matched { record: detail },
            RemoteLookup::NotFound => RemoteOutcome::NoMatch,
            RemoteLookup::Unavailable => RemoteOutcome::Unavailable,
        }
    }

    /// Without an allow-list the first result's detail wins. With one, scan
    /// candidate details in relevance order until a detail names an allowed
    /// production company, giving up after `scan_budget` candidates to bound
    /// remote calls.
    async fn pick_movie(
        &self,
        tmdb: &dyn TmdbApi,
        results: &[MovieSummary],
    ) -> RemoteOutcome<MovieDetail> {
        if self.policy.allowed_companies.is_empty() {
            return match tmdb.movie_detail(results[0].id).await {
                RemoteLookup::Found(detail) => RemoteOutcome::Matched { record: detail },
                RemoteLookup::NotFound => RemoteOutcome::NoMatch,
                RemoteLookup::Unavailable => RemoteOutcome::Unavailable,
            };
        }

        let mut lookup_failed = false;
        for candidate in results.iter().take(self.policy.scan_budget) {
            match tmdb.movie_detail(candidate.id).await {
                RemoteLookup::Found(detail) if self.company_allowed(&detail) => {
                    return RemoteOutcome::Matched { record: detail };
                }
                RemoteLookup::Found(detail) => {
                    debug!(
                        "Skipping '{}' ({}): no allowed production company",
                        detail.title, detail.id
                    );
                }
                RemoteLookup::NotFound => {}
                // One failed detail fetch must not sink the scan.
                RemoteLookup::Unavailable => lookup_failed = true,
            }
        }
        if lookup_failed {
            RemoteOutcome::Unavailable
        } else {
            RemoteOutcome::NoMatch
        }
    }

    fn company_allowed(&self, detail: &MovieDetail) -> bool {
        detail
            .production_companies
            .iter()
            .any(|c| self.policy.allowed_companies.contains(&c.id))
    }

    async fn search_movies(
        &self,
        query: &str,
        year: Option<i32>,
    ) -> RemoteOutcome<Vec<MovieSummary>> {
        let Some(tmdb) = &self.tmdb else {
            return RemoteOutcome::NotConfigured;
        };
        match tmdb.search_movies(query, year).await {
            RemoteLookup::Found(results) if results.is_empty() => RemoteOutcome::NoMatch,
            RemoteLookup::Found(results) => RemoteOutcome::Matched { record: results },
            RemoteLookup::NotFound => RemoteOutcome::NoMatch,
            RemoteLookup::Unavailable => RemoteOutcome::Unavailable,
        }
    }

    async fn search_people(&self, query: &str) -> RemoteOutcome<Vec<PersonSummary>> {
        let Some(tmdb) = &self.tmdb else {
            return RemoteOutcome::NotConfigured;
        };
        match tmdb.search_people(query).await {
            RemoteLookup::Found(results) if results.is_empty() => RemoteOutcome::NoMatch,
            RemoteLookup::Found(results) => RemoteOutcome::Matched { record: results },
            RemoteLookup::NotFound => RemoteOutcome::NoMatch,
            RemoteLookup::Unavailable => RemoteOutcome::Unavailable,
        }
    }
}

/// Drops remote movies whose key is already on screen. Input order survives.
pub fn dedupe_remote_batch(
    batch: Vec<MovieSummary>,
    shown: &HashSet<DedupeKey>,
) -> Vec<MovieSummary> {
    batch
        .into_iter()
        .filter(|movie| {
            !shown.contains(&DedupeKey::from_release_date(
                &movie.title,
                movie.release_date.as_deref(),
            ))
        })
        .collect()
}
