use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cinedex::app::{build_router, AppState};
use cinedex::catalog::{Catalog, PerformerRecord, WorkRecord};
use cinedex::reconcile::{MatchPolicy, Reconciler};
use cinedex::tmdb::{
    FilmographyEntry, MovieDetail, MovieSummary, PersonDetail, PersonSummary, RemoteLookup,
    TmdbApi,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::util::ServiceExt;

#[derive(Default)]
struct FakeTmdb {
    movie_searches: HashMap<String, RemoteLookup<Vec<MovieSummary>>>,
    movie_details: HashMap<i64, RemoteLookup<MovieDetail>>,
    person_searches: HashMap<String, RemoteLookup<Vec<PersonSummary>>>,
    person_details: HashMap<i64, RemoteLookup<PersonDetail>>,
}

#[async_trait::async_trait]
impl TmdbApi for FakeTmdb {
    async fn search_movies(
        &self,
        title: &str,
        _year: Option<i32>,
    ) -> RemoteLookup<Vec<MovieSummary>> {
        self.movie_searches
            .get(&title.to_lowercase())
            .cloned()
            .unwrap_or(RemoteLookup::Found(Vec::new()))
    }

    async fn search_people(&self, name: &str) -> RemoteLookup<Vec<PersonSummary>> {
        self.person_searches
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or(RemoteLookup::Found(Vec::new()))
    }

    async fn movie_detail(&self, id: i64) -> RemoteLookup<MovieDetail> {
        self.movie_details
            .get(&id)
            .cloned()
            .unwrap_or(RemoteLookup::NotFound)
    }

    async fn person_detail(&self, id: i64) -> RemoteLookup<PersonDetail> {
        self.person_details
            .get(&id)
            .cloned()
            .unwrap_or(RemoteLookup::NotFound)
    }
}

fn lion_king_work() -> WorkRecord {
    WorkRecord {
        name: "Король лев".to_string(),
        year: Some(1994),
        kind: Some("Movie".to_string()),
        genre: Some("Animation".to_string()),
        content_rating: Some("8.8".to_string()),
        age_rating: Some("0+".to_string()),
        duration: Some("88 min".to_string()),
        studio: Some("Walt Disney Pictures (https://www.notion.so/abc123)".to_string()),
        box_office: Some("$968M".to_string()),
        awards: None,
        characters: Some(
            "Симба (https://www.notion.so/a1), Муфаса (https://www.notion.so/b2)".to_string(),
        ),
        performers: None,
        songs: Some("Circle of Life".to_string()),
    }
}

fn work(name: &str, year: Option<i32>) -> WorkRecord {
    WorkRecord {
        name: name.to_string(),
        year,
        kind: None,
        genre: None,
        content_rating: None,
        age_rating: None,
        duration: None,
        studio: None,
        box_office: None,
        awards: None,
        characters: None,
        performers: None,
        songs: None,
    }
}

fn performer(name: &str) -> PerformerRecord {
    PerformerRecord {
        name: name.to_string(),
        career: Some("Actor".to_string()),
        birth_date: Some("1956-07-09".to_string()),
        death_date: None,
        birthplace: None,
        death_place: None,
        zodiac: None,
        height: Some(1.83),
        projects: Some(100),
        filmography: Some("Toy Story, Forrest Gump".to_string()),
        played_characters: None,
    }
}

fn movie_summary(id: i64, title: &str, date: Option<&str>) -> MovieSummary {
    MovieSummary {
        id,
        title: title.to_string(),
        release_date: date.map(|d| d.to_string()),
        overview: Some("Overview".to_string()),
        poster_url: None,
        vote_average: Some(8.0),
    }
}

fn movie_detail(id: i64, title: &str) -> MovieDetail {
    MovieDetail {
        id,
        title: title.to_string(),
        overview: Some("Full overview".to_string()),
        poster_url: Some("https://image.tmdb.org/t/p/w500/p.jpg".to_string()),
        release_date: Some("1994-06-24".to_string()),
        vote_average: Some(8.3),
        runtime_minutes: Some(88),
        genres: vec!["Animation".to_string()],
        production_companies: Vec::new(),
        budget: Some(45_000_000),
        revenue: Some(968_000_000),
    }
}

fn person_summary(id: i64, name: &str) -> PersonSummary {
    PersonSummary {
        id,
        name: name.to_string(),
        photo_url: None,
        known_for_department: Some("Acting".to_string()),
    }
}

fn person_detail(id: i64, name: &str) -> PersonDetail {
    PersonDetail {
        id,
        name: name.to_string(),
        biography: Some("Биография".to_string()),
        photo_url: Some("https://image.tmdb.org/t/p/w500/t.jpg".to_string()),
        birthday: Some("1956-07-09".to_string()),
        place_of_birth: Some("Concord, California, USA".to_string()),
        known_for_department: Some("Acting".to_string()),
        gender: 2,
        also_known_as: vec!["Tom Hanks".to_string()],
        top_filmography: vec![FilmographyEntry {
            title: "Forrest Gump".to_string(),
            release_date: "1994-07-06".to_string(),
            character: Some("Forrest Gump".to_string()),
            popularity: 60.0,
        }],
    }
}

fn app_with(catalog: Catalog, tmdb: Option<FakeTmdb>) -> Router {
    let tmdb: Option<Arc<dyn TmdbApi>> = tmdb.map(|f| Arc::new(f) as Arc<dyn TmdbApi>);
    let state = AppState {
        catalog: Arc::new(catalog),
        reconciler: Arc::new(Reconciler::new(tmdb, MatchPolicy::default())),
    };
    build_router(state)
}

async fn get_json(app: Router, uri: &str) -> Value {
    let res = app
        .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = app_with(Catalog::from_records(Vec::new(), Vec::new()), None);
    let res = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn work_search_pairs_local_row_with_remote_match() {
    let mut tmdb = FakeTmdb::default();
    tmdb.movie_searches.insert(
        "король лев".to_string(),
        RemoteLookup::Found(vec![
            movie_summary(1, "Король лев", Some("1994-06-24")),
            movie_summary(2, "Король лев: Гордость Симбы", Some("1998-10-27")),
        ]),
    );
    tmdb.movie_details
        .insert(1, RemoteLookup::Found(movie_detail(1, "Король лев")));

    let catalog = Catalog::from_records(vec![lion_king_work()], Vec::new());
    let body = get_json(
        app_with(catalog, Some(tmdb)),
        "/search/works?q=%D0%9A%D0%BE%D1%80%D0%BE%D0%BB%D1%8C%20%D0%BB%D0%B5%D0%B2",
    )
    .await;

    let local = body["local"].as_array().expect("local array");
    assert_eq!(local.len(), 1);
    assert_eq!(local[0]["name"], "Король лев");
    assert_eq!(local[0]["year"], 1994);
    // Notion link fragments are stripped from multi-value fields.
    assert_eq!(local[0]["studio"], serde_json::json!(["Walt Disney Pictures"]));
    assert_eq!(
        local[0]["characters"],
        serde_json::json!(["Симба", "Муфаса"])
    );
    // Absent fields keep the placeholder so the UI can tell "no data" apart
    // from an empty list.
    assert_eq!(local[0]["performers"], serde_json::json!(["-"]));

    assert_eq!(local[0]["remote"]["status"], "matched");
    assert_eq!(local[0]["remote"]["record"]["id"], 1);
    assert_eq!(local[0]["remote"]["record"]["runtime_minutes"], 88);

    // The 1994 remote record duplicates the local row and is suppressed;
    // the sequel survives in its TMDB relevance position.
    assert_eq!(body["remote_only"]["status"], "matched");
    let remote = body["remote_only"]["record"].as_array().expect("remote");
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0]["id"], 2);
}

#[tokio::test]
async fn one_failed_lookup_does_not_sink_the_others() {
    let mut tmdb = FakeTmdb::default();
    tmdb.movie_searches
        .insert("frozen".to_string(), RemoteLookup::Unavailable);
    tmdb.movie_searches.insert(
        "frozen ii".to_string(),
        RemoteLookup::Found(vec![movie_summary(22, "Frozen II", Some("2019-11-22"))]),
    );
    tmdb.movie_details
        .insert(22, RemoteLookup::Found(movie_detail(22, "Frozen II")));

    let catalog = Catalog::from_records(
        vec![work("Frozen", Some(2013)), work("Frozen II", Some(2019))],
        Vec::new(),
    );
    let body = get_json(app_with(catalog, Some(tmdb)), "/search/works?q=Frozen").await;

    let local = body["local"].as_array().expect("local array");
    assert_eq!(local.len(), 2);
    assert_eq!(local[0]["remote"]["status"], "unavailable");
    assert_eq!(local[1]["remote"]["status"], "matched");
    assert_eq!(local[1]["remote"]["record"]["id"], 22);
    // The remote-only section used the failing query and reports it as such,
    // separately from the per-record outcomes.
    assert_eq!(body["remote_only"]["status"], "unavailable");
}

#[tokio::test]
async fn missing_api_key_serves_local_data_only() {
    let catalog = Catalog::from_records(vec![lion_king_work()], Vec::new());
    let body = get_json(
        app_with(catalog, None),
        "/search/works?q=%D0%BB%D0%B5%D0%B2",
    )
    .await;

    let local = body["local"].as_array().expect("local array");
    assert_eq!(local.len(), 1);
    assert_eq!(local[0]["remote"]["status"], "not_configured");
    assert_eq!(body["remote_only"]["status"], "not_configured");
}

#[tokio::test]
async fn blank_query_returns_nothing_and_skips_remote() {
    let catalog = Catalog::from_records(vec![lion_king_work()], Vec::new());
    let body = get_json(app_with(catalog, Some(FakeTmdb::default())), "/search/works").await;

    assert_eq!(body["local"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["remote_only"]["status"], "no_match");
}

#[tokio::test]
async fn remote_only_results_appear_without_local_matches() {
    let mut tmdb = FakeTmdb::default();
    tmdb.movie_searches.insert(
        "encanto".to_string(),
        RemoteLookup::Found(vec![movie_summary(5, "Encanto", Some("2021-11-24"))]),
    );

    let catalog = Catalog::from_records(vec![lion_king_work()], Vec::new());
    let body = get_json(app_with(catalog, Some(tmdb)), "/search/works?q=Encanto").await;

    assert_eq!(body["local"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["remote_only"]["status"], "matched");
    assert_eq!(body["remote_only"]["record"][0]["title"], "Encanto");
}

#[tokio::test]
async fn performer_search_enriches_with_biography_and_filmography() {
    let mut tmdb = FakeTmdb::default();
    tmdb.person_searches.insert(
        "том хэнкс".to_string(),
        RemoteLookup::Found(vec![
            person_summary(31, "Том Хэнкс"),
            person_summary(32, "Colin Hanks"),
        ]),
    );
    tmdb.person_details
        .insert(31, RemoteLookup::Found(person_detail(31, "Том Хэнкс")));

    let catalog = Catalog::from_records(Vec::new(), vec![performer("Том Хэнкс")]);
    let body = get_json(
        app_with(catalog, Some(tmdb)),
        "/search/performers?q=%D0%A2%D0%BE%D0%BC%20%D0%A5%D1%8D%D0%BD%D0%BA%D1%81",
    )
    .await;

    let local = body["local"].as_array().expect("local array");
    assert_eq!(local.len(), 1);
    assert_eq!(local[0]["name"], "Том Хэнкс");
    assert_eq!(
        local[0]["filmography"],
        serde_json::json!(["Toy Story", "Forrest Gump"])
    );
    assert_eq!(local[0]["remote"]["status"], "matched");
    assert_eq!(local[0]["remote"]["record"]["biography"], "Биография");
    assert_eq!(
        local[0]["remote"]["record"]["top_filmography"][0]["title"],
        "Forrest Gump"
    );

    // The person already shown locally is suppressed from the remote-only
    // list; the namesake is kept.
    assert_eq!(body["remote_only"]["status"], "matched");
    let remote = body["remote_only"]["record"].as_array().expect("remote");
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0]["name"], "Colin Hanks");
}

#[tokio::test]
async fn person_detail_not_found_is_a_normal_no_match() {
    let mut tmdb = FakeTmdb::default();
    tmdb.person_searches.insert(
        "том хэнкс".to_string(),
        RemoteLookup::Found(vec![person_summary(31, "Том Хэнкс")]),
    );
    // No detail scripted for id 31: the fake answers NotFound.

    let catalog = Catalog::from_records(Vec::new(), vec![performer("Том Хэнкс")]);
    let body = get_json(
        app_with(catalog, Some(tmdb)),
        "/search/performers?q=%D0%A2%D0%BE%D0%BC",
    )
    .await;

    let local = body["local"].as_array().expect("local array");
    assert_eq!(local.len(), 1);
    assert_eq!(local[0]["remote"]["status"], "no_match");
}
