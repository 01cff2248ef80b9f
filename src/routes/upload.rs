use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::image_processor::{self, extension_for_mime};
use crate::utils::{date_prefix, get_extension};

const SVG: &str = "image/svg+xml";

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub content_type: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadStatusResponse {
    pub status: String,
    pub method: String,
}

#[utoipa::path(
    get,
    path = "/api/upload",
    tag = "Upload",
    responses(
        (status = 200, description = "Upload route is reachable", body = UploadStatusResponse)
    )
)]
pub async fn upload_status() -> Json<UploadStatusResponse> {
    Json(UploadStatusResponse {
        status: "Upload endpoint is working".to_string(),
        method: "GET".to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "Upload",
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Logo stored", body = UploadResponse),
        (status = 400, description = "Not multipart, or no file part"),
        (status = 429, description = "Rate limited"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|_| {
        tracing::info!("Upload | POST /api/upload | res=400 | not multipart");
        AppError::BadRequest("Expected multipart/form-data".to_string())
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Invalid multipart data".to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        // A plain text field named "file" is not a file.
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let declared = field
            .content_type()
            .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
            .map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| {
                tracing::info!(error = %e, "Upload | POST /api/upload | res=400 | unreadable file part");
                AppError::BadRequest(format!("Failed to read file: {}", e))
            })?;
        if data.is_empty() {
            break;
        }
        let content_type = declared.unwrap_or_else(|| sniff_mime(&data));

        let (bytes, content_type) =
            prepare_upload(data.to_vec(), content_type, state.config.pipeline.normalize_uploads).await;

        let ext = match extension_for_mime(&content_type) {
            "bin" => get_extension(&filename).unwrap_or_else(|| "bin".to_string()),
            ext => ext.to_string(),
        };
        let key = format!("{}/{}.{}", date_prefix(), Uuid::new_v4(), ext);
        let size = bytes.len();

        let url = state
            .storage
            .put_object(&state.config.storage.buckets.uploads, &key, bytes, &content_type)
            .await?;

        tracing::info!(
            file = %filename,
            %key,
            size,
            content_type = %content_type,
            "Upload | POST /api/upload | res=200"
        );
        return Ok(Json(UploadResponse { url, content_type }));
    }

    tracing::info!("Upload | POST /api/upload | res=400 | missing file");
    Err(AppError::BadRequest("missing_file".to_string()))
}

/// Untyped parts are sniffed; anything unrecognised is assumed to be PNG.
fn sniff_mime(data: &[u8]) -> String {
    image::guess_format(data)
        .map(image_processor::mime_for_format)
        .unwrap_or("image/png")
        .to_string()
}

/// SVG passes through untouched. Raster input is re-encoded to PNG only when
/// normalization is on; undecodable bytes are stored as received.
async fn prepare_upload(data: Vec<u8>, content_type: String, normalize: bool) -> (Vec<u8>, String) {
    if content_type == SVG || !normalize {
        return (data, content_type);
    }

    let original = data.clone();
    match tokio::task::spawn_blocking(move || image_processor::normalize_to_png(&data)).await {
        Ok(Ok(png)) => (png.bytes, "image/png".to_string()),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, %content_type, "upload could not be normalized, storing original bytes");
            (original, content_type)
        }
        Err(e) => {
            tracing::warn!(error = %e, "normalize task failed, storing original bytes");
            (original, content_type)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untyped_parts_are_sniffed() {
        let jpeg_magic = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
        assert_eq!(sniff_mime(&jpeg_magic), "image/jpeg");
        assert_eq!(sniff_mime(b"????"), "image/png");
    }

    #[tokio::test]
    async fn svg_is_never_normalized() {
        let svg = b"<svg xmlns='http://www.w3.org/2000/svg'/>".to_vec();
        let (bytes, ct) = prepare_upload(svg.clone(), SVG.to_string(), true).await;
        assert_eq!(bytes, svg);
        assert_eq!(ct, SVG);
    }

    #[tokio::test]
    async fn undecodable_bytes_pass_through() {
        let junk = b"not really a jpeg".to_vec();
        let (bytes, ct) = prepare_upload(junk.clone(), "image/jpeg".to_string(), true).await;
        assert_eq!(bytes, junk);
        assert_eq!(ct, "image/jpeg");
    }

    #[tokio::test]
    async fn disabled_normalization_keeps_input() {
        let junk = b"raw".to_vec();
        let (bytes, ct) = prepare_upload(junk.clone(), "image/webp".to_string(), false).await;
        assert_eq!(bytes, junk);
        assert_eq!(ct, "image/webp");
    }
}
