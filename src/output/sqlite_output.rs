//! SQLite sink
//!
//! Listing items and detail records live in two tables keyed by game id.
//! Writing a record that already exists replaces it, so a re-crawled game
//! keeps only its latest data. List fields are stored as JSON text.

use crate::crawler::{GameDetail, ItemRecord};
use crate::output::{ItemSink, OutputResult};
use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;

/// SQL schema for the sink database
pub const SCHEMA_SQL: &str = r#"
-- Games as seen on category listings
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY,
    category TEXT NOT NULL,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    image_address TEXT,
    description TEXT,
    tags TEXT NOT NULL,
    review_category TEXT,
    review_count INTEGER,
    release_date TEXT,
    platforms TEXT NOT NULL,
    price TEXT,
    discount TEXT,
    discounted_price TEXT,
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_category ON items(category);

-- Full detail pages
CREATE TABLE IF NOT EXISTS details (
    id INTEGER PRIMARY KEY,
    address TEXT NOT NULL,
    name TEXT,
    is_dlc INTEGER NOT NULL,
    image_address TEXT,
    short_description TEXT,
    recent_reviews TEXT,
    recent_reviews_count TEXT,
    all_reviews TEXT,
    all_reviews_count TEXT,
    review_anomaly INTEGER NOT NULL,
    release_date TEXT,
    developer TEXT,
    developer_address TEXT,
    publisher TEXT,
    publisher_address TEXT,
    tags TEXT NOT NULL,
    price TEXT,
    discount TEXT,
    discount_original_price TEXT,
    discount_final_price TEXT,
    bundled_content TEXT NOT NULL,
    genre TEXT,
    website TEXT,
    metacritic_score TEXT,
    metacritic_address TEXT,
    scraped_at TEXT NOT NULL
);
"#;

pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Opens or creates the database and its tables
    pub fn open(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        Self::with_connection(conn)
    }

    /// Uses an already open connection
    pub fn with_connection(conn: Connection) -> OutputResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Number of listing items stored
    pub fn count_items(&self) -> OutputResult<u64> {
        self.count("SELECT COUNT(*) FROM items")
    }

    /// Number of detail records stored
    pub fn count_details(&self) -> OutputResult<u64> {
        self.count("SELECT COUNT(*) FROM details")
    }

    fn count(&self, sql: &str) -> OutputResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl ItemSink for SqliteSink {
    fn write_item(&mut self, item: &ItemRecord) -> OutputResult<()> {
        self.conn.execute(
            "INSERT INTO items (
                id, category, name, address, image_address, description, tags,
                review_category, review_count, release_date, platforms,
                price, discount, discounted_price, scraped_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(id) DO UPDATE SET
                category = excluded.category,
                name = excluded.name,
                address = excluded.address,
                image_address = excluded.image_address,
                description = excluded.description,
                tags = excluded.tags,
                review_category = excluded.review_category,
                review_count = excluded.review_count,
                release_date = excluded.release_date,
                platforms = excluded.platforms,
                price = excluded.price,
                discount = excluded.discount,
                discounted_price = excluded.discounted_price,
                scraped_at = excluded.scraped_at",
            params![
                item.id as i64,
                item.category,
                item.name,
                item.address,
                item.image_address,
                item.description,
                serde_json::to_string(&item.tags)?,
                item.review.category,
                item.review.count.map(|c| c as i64),
                item.release_date,
                serde_json::to_string(&item.platforms)?,
                item.price,
                item.discount,
                item.discounted_price,
                item.scraped_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn write_detail(&mut self, detail: &GameDetail) -> OutputResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO details (
                id, address, name, is_dlc, image_address, short_description,
                recent_reviews, recent_reviews_count, all_reviews, all_reviews_count,
                review_anomaly, release_date, developer, developer_address,
                publisher, publisher_address, tags, price, discount,
                discount_original_price, discount_final_price, bundled_content,
                genre, website, metacritic_score, metacritic_address, scraped_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                      ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)",
            params![
                detail.id as i64,
                detail.address,
                detail.name,
                detail.is_dlc,
                detail.image_address,
                detail.short_description,
                detail.recent_reviews,
                detail.recent_reviews_count,
                detail.all_reviews,
                detail.all_reviews_count,
                detail.review_anomaly,
                detail.release_date,
                detail.developer,
                detail.developer_address,
                detail.publisher,
                detail.publisher_address,
                serde_json::to_string(&detail.tags)?,
                detail.price,
                detail.discount,
                detail.discount_original_price,
                detail.discount_final_price,
                serde_json::to_string(&detail.bundled_content)?,
                detail.genre,
                detail.website,
                detail.metacritic_score,
                detail.metacritic_address,
                detail.scraped_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
