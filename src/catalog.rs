use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog file not found: {0}")]
    DataNotFound(String),
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: String,
        source: csv::Error,
    },
}

/// One row of the works export. `name` is the lookup key and is not unique;
/// the multi-value columns stay raw here and are cleaned at presentation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Year")]
    pub year: Option<i32>,
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    #[serde(rename = "Genre")]
    pub genre: Option<String>,
    #[serde(rename = "Rating")]
    pub content_rating: Option<String>,
    #[serde(rename = "Age")]
    pub age_rating: Option<String>,
    #[serde(rename = "Duration")]
    pub duration: Option<String>,
    #[serde(rename = "Studio")]
    pub studio: Option<String>,
    #[serde(rename = "Box Office")]
    pub box_office: Option<String>,
    #[serde(rename = "Awards")]
    pub awards: Option<String>,
    #[serde(rename = "Characters")]
    pub characters: Option<String>,
    #[serde(rename = "Performers")]
    pub performers: Option<String>,
    #[serde(rename = "Songs")]
    pub songs: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformerRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Career")]
    pub career: Option<String>,
    #[serde(rename = "Birth Date")]
    pub birth_date: Option<String>,
    #[serde(rename = "Death Date")]
    pub death_date: Option<String>,
    #[serde(rename = "Birthplace")]
    pub birthplace: Option<String>,
    #[serde(rename = "Death Place")]
    pub death_place: Option<String>,
    #[serde(rename = "Zodiac")]
    pub zodiac: Option<String>,
    #[serde(rename = "Height")]
    pub height: Option<f32>,
    #[serde(rename = "Projects")]
    pub projects: Option<i32>,
    #[serde(rename = "Filmography")]
    pub filmography: Option<String>,
    #[serde(rename = "Characters")]
    pub played_characters: Option<String>,
}

/// In-memory copy of both exports. Loaded once at startup and shared behind
/// an `Arc` for the process lifetime; rows are never mutated after load.
#[derive(Debug)]
pub struct Catalog {
    works: Vec<WorkRecord>,
    performers: Vec<PerformerRecord>,
}

impl Catalog {
    pub fn load(works_path: &Path, performers_path: &Path) -> Result<Self, CatalogError> {
        let works = read_rows(works_path)?;
        let performers = read_rows(performers_path)?;
        info!(
            "Loaded catalog: {} works, {} performers",
            works.len(),
            performers.len()
        );
        Ok(Self { works, performers })
    }

    pub fn from_records(works: Vec<WorkRecord>, performers: Vec<PerformerRecord>) -> Self {
        Self { works, performers }
    }

    /// Case-insensitive substring match on the name column. A blank query
    /// matches nothing, not everything. Source order is preserved.
    pub fn find_works(&self, query: &str) -> Vec<&WorkRecord> {
        find_by_name(&self.works, query, |w| &w.name)
    }

    pub fn find_performers(&self, query: &str) -> Vec<&PerformerRecord> {
        find_by_name(&self.performers, query, |p| &p.name)
    }

    pub fn works_len(&self) -> usize {
        self.works.len()
    }

    pub fn performers_len(&self) -> usize {
        self.performers.len()
    }
}

fn find_by_name<'a, T>(rows: &'a [T], query: &str, name: impl Fn(&T) -> &str) -> Vec<&'a T> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    rows.iter()
        .filter(|row| name(row).to_lowercase().contains(&needle))
        .collect()
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, CatalogError> {
    if !path.exists() {
        return Err(CatalogError::DataNotFound(path.display().to_string()));
    }
    let mut reader = csv::Reader::from_path(path).map_err(|source| CatalogError::Read {
        path: path.display().to_string(),
        source,
    })?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })
}
