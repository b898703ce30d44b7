//! Get-or-create for media sources and formats.
//!
//! Rows are never overwritten: the first fetch of a canonical URL (or the
//! first job selecting a format id) wins.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::db::{parse_uuid, unix_timestamp, JobStore};
use crate::media::{MediaFormat, MediaSource, NewMediaFormat, NewMediaSource};

fn source_from_row(row: &SqliteRow) -> Result<MediaSource> {
    let id: String = row.get("id");
    let raw: String = row.get("raw_metadata");
    let duration: Option<i64> = row.get("duration_secs");
    Ok(MediaSource {
        id: parse_uuid(&id)?,
        canonical_url: row.get("canonical_url"),
        provider: row.get("provider"),
        provider_video_id: row.get("provider_video_id"),
        title: row.get("title"),
        channel: row.get("channel"),
        thumbnail_url: row.get("thumbnail_url"),
        duration_secs: duration.map(|d| d.max(0) as u32),
        raw_metadata: serde_json::from_str(&raw)
            .with_context(|| format!("invalid metadata for source {id}"))?,
        created_at: row.get("created_at"),
    })
}

fn format_from_row(row: &SqliteRow) -> Result<MediaFormat> {
    let id: String = row.get("id");
    let source_id: String = row.get("source_id");
    let width: Option<i64> = row.get("width");
    let height: Option<i64> = row.get("height");
    let size: Option<i64> = row.get("size_bytes");
    Ok(MediaFormat {
        id: parse_uuid(&id)?,
        source_id: parse_uuid(&source_id)?,
        format_id: row.get("format_id"),
        container: row.get("container"),
        quality_label: row.get("quality_label"),
        width: width.map(|w| w.max(0) as u32),
        height: height.map(|h| h.max(0) as u32),
        codec_video: row.get("codec_video"),
        codec_audio: row.get("codec_audio"),
        is_audio_only: row.get("is_audio_only"),
        is_premium_only: row.get("is_premium_only"),
        size_bytes: size.map(|s| s.max(0) as u64),
    })
}

impl JobStore {
    /// Return the source for `new.canonical_url`, inserting it if unseen.
    pub async fn get_or_create_source(&self, new: &NewMediaSource) -> Result<MediaSource> {
        let raw = serde_json::to_string(&new.raw_metadata)?;
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO media_sources (
                id, canonical_url, provider, provider_video_id, title, channel,
                thumbnail_url, duration_secs, raw_metadata, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&new.canonical_url)
        .bind(&new.provider)
        .bind(&new.provider_video_id)
        .bind(&new.title)
        .bind(&new.channel)
        .bind(&new.thumbnail_url)
        .bind(new.duration_secs.map(i64::from))
        .bind(raw)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT * FROM media_sources WHERE canonical_url = ?1")
            .bind(&new.canonical_url)
            .fetch_one(&self.pool)
            .await?;
        source_from_row(&row)
    }

    pub async fn get_source(&self, id: Uuid) -> Result<Option<MediaSource>> {
        let row = sqlx::query("SELECT * FROM media_sources WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(source_from_row).transpose()
    }

    /// Return the `(source_id, format_id)` row, inserting it if unseen.
    pub async fn get_or_create_format(
        &self,
        source_id: Uuid,
        new: &NewMediaFormat,
    ) -> Result<MediaFormat> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO media_formats (
                id, source_id, format_id, container, quality_label, width, height,
                codec_video, codec_audio, is_audio_only, is_premium_only, size_bytes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(source_id.to_string())
        .bind(&new.format_id)
        .bind(&new.container)
        .bind(&new.quality_label)
        .bind(new.width.map(i64::from))
        .bind(new.height.map(i64::from))
        .bind(&new.codec_video)
        .bind(&new.codec_audio)
        .bind(new.is_audio_only)
        .bind(new.is_premium_only)
        .bind(new.size_bytes.map(|s| i64::try_from(s).unwrap_or(i64::MAX)))
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT * FROM media_formats WHERE source_id = ?1 AND format_id = ?2",
        )
        .bind(source_id.to_string())
        .bind(&new.format_id)
        .fetch_one(&self.pool)
        .await?;
        format_from_row(&row)
    }

    pub async fn get_format(&self, id: Uuid) -> Result<Option<MediaFormat>> {
        let row = sqlx::query("SELECT * FROM media_formats WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(format_from_row).transpose()
    }
}
