//! SQLite storage layer for Dealerdesk.
//!
//! Three tables, each scoped by `dealer_id`:
//!
//! - `tracking_events`: client-side instrumentation (page views, clicks, ...)
//! - `leads`: form submissions and their funnel status
//! - `vehicle_photos`: photos registered through the upload flow
//!
//! Timestamps are stored as unix seconds. Fetches used by the dashboard come
//! back newest first, which the aggregator's recent-activity lists rely on.

use anyhow::{Context, anyhow};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use crate::model::{Lead, LeadRequest, LeadStatus, TrackingEvent, VehiclePhoto};
use crate::photos::AngleCode;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:dealerdesk.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // every connection to an in-memory database gets its own empty copy
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .with_context(|| format!("connecting to {}", database_url))?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    /// Create the database schema if it doesn't exist.
    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tracking_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dealer_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                source TEXT NOT NULL,
                vehicle_name TEXT,
                ts INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_tracking_events_dealer_ts
            ON tracking_events(dealer_id, ts)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS leads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dealer_id TEXT NOT NULL,
                name TEXT NOT NULL,
                email TEXT,
                phone TEXT,
                status TEXT NOT NULL,
                source TEXT NOT NULL,
                agent TEXT,
                vehicle_interest TEXT,
                ts INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_leads_dealer_ts
            ON leads(dealer_id, ts)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vehicle_photos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dealer_id TEXT NOT NULL,
                filename TEXT NOT NULL,
                year INTEGER NOT NULL,
                model_code TEXT NOT NULL,
                angle TEXT NOT NULL,
                make TEXT,
                model TEXT,
                ts INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a tracking event.
    pub async fn insert_tracking_event(
        &self,
        dealer_id: &str,
        event: &TrackingEvent,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tracking_events (dealer_id, event_type, source, vehicle_name, ts)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(dealer_id)
        .bind(event.event_type.as_str())
        .bind(&event.source)
        .bind(&event.vehicle_name)
        .bind(event.created_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a new lead and return its id.
    pub async fn insert_lead(
        &self,
        dealer_id: &str,
        lead: &LeadRequest,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO leads (dealer_id, name, email, phone, status, source, agent, vehicle_interest, ts)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(dealer_id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(lead.status.as_str())
        .bind(&lead.source)
        .bind(&lead.agent)
        .bind(&lead.vehicle_interest)
        .bind(created_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Move a lead to a new status.
    ///
    /// Returns `false` if no lead with that id exists for the dealer.
    pub async fn update_lead_status(
        &self,
        dealer_id: &str,
        id: i64,
        status: LeadStatus,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leads SET status = ?
            WHERE dealer_id = ? AND id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(dealer_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All tracking events at or after `since`, newest first.
    pub async fn fetch_events_since(
        &self,
        dealer_id: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<TrackingEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT event_type, source, vehicle_name, ts
            FROM tracking_events
            WHERE dealer_id = ? AND ts >= ?
            ORDER BY ts DESC, id DESC
            "#,
        )
        .bind(dealer_id)
        .bind(since.timestamp())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    /// All leads created at or after `since`, newest first.
    pub async fn fetch_leads_since(
        &self,
        dealer_id: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Lead>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, phone, status, source, agent, vehicle_interest, ts
            FROM leads
            WHERE dealer_id = ? AND ts >= ?
            ORDER BY ts DESC, id DESC
            "#,
        )
        .bind(dealer_id)
        .bind(since.timestamp())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(lead_from_row).collect()
    }

    /// Register a validated vehicle photo.
    pub async fn insert_photo(&self, dealer_id: &str, photo: &VehiclePhoto) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO vehicle_photos (dealer_id, filename, year, model_code, angle, make, model, ts)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(dealer_id)
        .bind(&photo.filename)
        .bind(photo.year)
        .bind(&photo.model_code)
        .bind(photo.angle.as_str())
        .bind(&photo.make)
        .bind(&photo.model)
        .bind(photo.uploaded_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Photos for one vehicle (year + model code), in upload order.
    pub async fn list_photos(
        &self,
        dealer_id: &str,
        year: i32,
        model_code: &str,
    ) -> anyhow::Result<Vec<VehiclePhoto>> {
        let rows = sqlx::query(
            r#"
            SELECT filename, year, model_code, angle, make, model, ts
            FROM vehicle_photos
            WHERE dealer_id = ? AND year = ? AND model_code = ?
            ORDER BY id
            "#,
        )
        .bind(dealer_id)
        .bind(year)
        .bind(model_code)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(photo_from_row).collect()
    }
}

#[cfg(test)]
impl Storage {
    /// Drop a table so queries against it fail.
    pub(crate) async fn drop_table(&self, table: &str) -> anyhow::Result<()> {
        sqlx::query(&format!("DROP TABLE {}", table))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn from_unix(ts: i64) -> anyhow::Result<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .ok_or_else(|| anyhow!("invalid timestamp {}", ts))
}

fn event_from_row(row: &SqliteRow) -> anyhow::Result<TrackingEvent> {
    let event_type: String = row.try_get("event_type")?;

    Ok(TrackingEvent {
        event_type: event_type.parse()?,
        source: row.try_get("source")?,
        vehicle_name: row.try_get("vehicle_name")?,
        created_at: from_unix(row.try_get("ts")?)?,
    })
}

fn lead_from_row(row: &SqliteRow) -> anyhow::Result<Lead> {
    let status: String = row.try_get("status")?;

    Ok(Lead {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        status: status.parse()?,
        source: row.try_get("source")?,
        agent: row.try_get("agent")?,
        vehicle_interest: row.try_get("vehicle_interest")?,
        created_at: from_unix(row.try_get("ts")?)?,
    })
}

fn photo_from_row(row: &SqliteRow) -> anyhow::Result<VehiclePhoto> {
    let angle: String = row.try_get("angle")?;

    Ok(VehiclePhoto {
        filename: row.try_get("filename")?,
        year: row.try_get("year")?,
        model_code: row.try_get("model_code")?,
        angle: angle.parse::<AngleCode>()?,
        make: row.try_get("make")?,
        model: row.try_get("model")?,
        uploaded_at: from_unix(row.try_get("ts")?)?,
    })
}
