pub mod health;
pub mod recordings;

use crate::config::Config;
use crate::errors::ApiError;
use crate::storage::UPLOADS_PREFIX;
use actix_web::web;

/// Registers the API, the uploads mount and the browser client. The client is mounted at `/`
/// and must stay last so it does not shadow anything else.
pub fn configure(settings: &Config, cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(err.to_string()).into()
    }))
    .service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(web::scope("/recordings")
                .route("", web::get().to(recordings::list_recordings))
                .route("", web::post().to(recordings::upload_recording))
                .route("/{id}", web::get().to(recordings::get_recording))
            )
    )
    .service(actix_files::Files::new(&format!("/{UPLOADS_PREFIX}"), &settings.uploads_dir))
    .service(actix_files::Files::new("/", &settings.static_dir).index_file("index.html"));
}
