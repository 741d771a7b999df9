use std::path::Path;

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use thiserror::Error;

/// One parsed ranking entry. `detail_url` is the natural key; every other
/// field is a mutable attribute of that identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub rank: u32,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    pub rating: f64,
    pub rating_count: u32,
    pub quote: Option<String>,
    pub poster_url: String,
    pub detail_url: String,
    pub regions: Vec<String>,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub actors: Vec<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not resolve movie id for {detail_url} after upsert")]
    IdentityResolution { detail_url: String },
    #[error("failed to store {detail_url}: {source}")]
    Persistence {
        detail_url: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS movies (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            rank           INTEGER NOT NULL,
            title          TEXT NOT NULL,
            original_title TEXT,
            year           INTEGER,
            rating         REAL NOT NULL,
            rating_count   INTEGER NOT NULL,
            quote          TEXT,
            poster_url     TEXT,
            detail_url     TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS movie_regions (
            movie_id INTEGER NOT NULL,
            region   TEXT NOT NULL,
            PRIMARY KEY (movie_id, region),
            FOREIGN KEY (movie_id) REFERENCES movies(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS movie_genres (
            movie_id INTEGER NOT NULL,
            genre    TEXT NOT NULL,
            PRIMARY KEY (movie_id, genre),
            FOREIGN KEY (movie_id) REFERENCES movies(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS movie_directors (
            movie_id INTEGER NOT NULL,
            director TEXT NOT NULL,
            PRIMARY KEY (movie_id, director),
            FOREIGN KEY (movie_id) REFERENCES movies(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS movie_actors (
            movie_id INTEGER NOT NULL,
            actor    TEXT NOT NULL,
            PRIMARY KEY (movie_id, actor),
            FOREIGN KEY (movie_id) REFERENCES movies(id) ON DELETE CASCADE
        );
        ",
    )?;
    Ok(())
}

/// Upsert a batch of movies inside one transaction.
///
/// Each movie is matched by `detail_url`: an existing row has all mutable
/// attributes overwritten, a new row is inserted. The four child tables are
/// fully replaced to mirror the incoming record, so re-running the same batch
/// leaves the store unchanged.
pub fn upsert_movies(conn: &Connection, movies: &[Movie]) -> Result<(), StoreError> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut upsert = tx.prepare(
            "INSERT INTO movies (
                rank, title, original_title, year, rating, rating_count,
                quote, poster_url, detail_url
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(detail_url) DO UPDATE SET
                rank=excluded.rank,
                title=excluded.title,
                original_title=excluded.original_title,
                year=excluded.year,
                rating=excluded.rating,
                rating_count=excluded.rating_count,
                quote=excluded.quote,
                poster_url=excluded.poster_url",
        )?;
        let mut select_id = tx.prepare("SELECT id FROM movies WHERE detail_url = ?1")?;

        for movie in movies {
            upsert
                .execute(params![
                    movie.rank,
                    movie.title,
                    movie.original_title,
                    movie.year,
                    movie.rating,
                    movie.rating_count,
                    movie.quote,
                    movie.poster_url,
                    movie.detail_url,
                ])
                .map_err(|source| StoreError::Persistence {
                    detail_url: movie.detail_url.clone(),
                    source,
                })?;

            // The upsert may have updated instead of inserted, so
            // last_insert_rowid is unreliable here. Resolve by natural key.
            let movie_id: i64 = select_id
                .query_row(params![movie.detail_url], |row| row.get(0))
                .optional()?
                .ok_or_else(|| StoreError::IdentityResolution {
                    detail_url: movie.detail_url.clone(),
                })?;

            for (table, column, values) in [
                ("movie_regions", "region", &movie.regions),
                ("movie_genres", "genre", &movie.genres),
                ("movie_directors", "director", &movie.directors),
                ("movie_actors", "actor", &movie.actors),
            ] {
                replace_values(&tx, table, column, movie_id, values).map_err(|source| {
                    StoreError::Persistence {
                        detail_url: movie.detail_url.clone(),
                        source,
                    }
                })?;
            }
        }
    }
    tx.commit()?;
    Ok(())
}

/// Delete-then-insert one child collection. Insertion order preserves credit
/// order; OR IGNORE gives set semantics under the (movie_id, value) key.
fn replace_values(
    tx: &Transaction,
    table: &str,
    column: &str,
    movie_id: i64,
    values: &[String],
) -> rusqlite::Result<()> {
    tx.execute(
        &format!("DELETE FROM {table} WHERE movie_id = ?1"),
        params![movie_id],
    )?;
    let mut insert = tx.prepare(&format!(
        "INSERT OR IGNORE INTO {table} (movie_id, {column}) VALUES (?1, ?2)"
    ))?;
    for value in values {
        insert.execute(params![movie_id, value])?;
    }
    Ok(())
}

// ── Read side ──

pub struct Stats {
    pub movies: usize,
    pub regions: usize,
    pub genres: usize,
    pub directors: usize,
    pub actors: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |table: &str| -> rusqlite::Result<usize> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
    };
    Ok(Stats {
        movies: count("movies")?,
        regions: count("movie_regions")?,
        genres: count("movie_genres")?,
        directors: count("movie_directors")?,
        actors: count("movie_actors")?,
    })
}

pub struct TopRow {
    pub rank: u32,
    pub title: String,
    pub year: Option<i32>,
    pub rating: f64,
    pub rating_count: u32,
    pub quote: Option<String>,
}

pub fn fetch_top(conn: &Connection, limit: usize) -> Result<Vec<TopRow>> {
    let mut stmt = conn.prepare(
        "SELECT rank, title, year, rating, rating_count, quote
         FROM movies ORDER BY rank LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(TopRow {
                rank: row.get(0)?,
                title: row.get(1)?,
                year: row.get(2)?,
                rating: row.get(3)?,
                rating_count: row.get(4)?,
                quote: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Tests ──
