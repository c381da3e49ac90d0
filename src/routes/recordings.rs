use crate::{config::Config, db::Db, errors::ApiError, models::{NewRecording, Recording}, storage};
use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, web};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use futures_util::TryStreamExt as _;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Multipart field carrying the recording.
pub const VIDEO_FIELD: &str = "video";

#[derive(Serialize)]
pub struct UploadResp {
    pub message: &'static str,
    pub recording: Recording,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Recording not found".into())
}

fn no_file() -> ApiError {
    ApiError::BadRequest("No file uploaded".into())
}

pub async fn upload_recording(
    cfg: web::Data<Config>,
    db: web::Data<Db>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut saved: Option<NewRecording> = None;
    loop {
        let field = match payload.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                log::debug!("rejecting upload body: {e}");
                if let Some(new) = &saved {
                    discard(&cfg, new);
                }
                return Err(no_file());
            }
        };
        if saved.is_some() || field.name() != Some(VIDEO_FIELD) {
            continue;
        }
        saved = Some(save_video_field(&cfg, field).await?);
    }
    let new = saved.ok_or_else(no_file)?;

    let recording = match db.insert_recording(new.clone()).await {
        Ok(r) => r,
        Err(e) => {
            discard(&cfg, &new);
            return Err(e.into());
        }
    };
    log::info!(
        "stored recording {} at {} ({} bytes)",
        recording.id, recording.filepath, recording.filesize
    );

    Ok(HttpResponse::Created().json(UploadResp {
        message: "Recording uploaded successfully",
        recording,
    }))
}

fn discard(cfg: &Config, new: &NewRecording) {
    if let Some(p) = storage::disk_path(Path::new(&cfg.uploads_dir), &new.filepath) {
        if let Err(e) = std::fs::remove_file(&p) {
            log::warn!("failed to remove {}: {e}", p.display());
        }
    }
}

async fn save_video_field(
    cfg: &Config,
    field: actix_multipart::Field,
) -> Result<NewRecording, ApiError> {
    let original = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .unwrap_or(storage::FALLBACK_NAME)
        .to_string();
    let filename = storage::display_name(&original);
    let stored = storage::stored_name(&filename, chrono::Utc::now().timestamp_millis());

    let size = storage::write_field(
        Path::new(&cfg.uploads_dir),
        &stored,
        field,
        cfg.max_upload_size,
    )
    .await?;

    Ok(NewRecording {
        filename,
        filepath: storage::public_path(&stored),
        filesize: size as i64,
    })
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

pub async fn list_recordings(
    db: web::Data<Db>,
    q: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let rows = db.list_recordings(q.limit).await?;
    Ok(HttpResponse::Ok().json(rows))
}

// Malformed ids get the same 404 body as missing ones.
pub async fn get_recording(
    cfg: web::Data<Config>,
    db: web::Data<Db>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id: i64 = path.into_inner().parse().map_err(|_| not_found())?;

    let rec = db.find_recording(id).await?.ok_or_else(not_found)?;
    let p = storage::disk_path(Path::new(&cfg.uploads_dir), &rec.filepath).ok_or_else(|| {
        log::warn!("recording {} has an unusable filepath {:?}", rec.id, rec.filepath);
        not_found()
    })?;
    if !p.exists() {
        log::warn!("recording {} is missing from disk: {}", rec.id, p.display());
        return Err(not_found());
    }

    let named = actix_files::NamedFile::open_async(p).await?
        .use_last_modified(true)
        .set_content_disposition(ContentDisposition {
            disposition: DispositionType::Inline,
            parameters: vec![DispositionParam::Filename(rec.filename)],
        });
    Ok(named.into_response(&req))
}
