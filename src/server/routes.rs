//! Request handlers. Each flow route performs exactly one model call and
//! returns its typed result as JSON.

use super::protocol::{EmbeddingResponse, PhotoRequest, ProxyQuery, TextRequest};
use super::{AppState, WebError};
use crate::error::Error;
use crate::fetch::SAMPLES;
use crate::flows;
use actix_web::{get, post, web, HttpResponse, Responder};
use tracing::info;
use url::Url;

type Result<T> = std::result::Result<T, WebError>;

#[post("/api/classify")]
pub async fn classify(
    req: web::Json<PhotoRequest>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let result = flows::classify(&state.client, &req.photo_data_uri).await?;
    Ok(web::Json(result))
}

#[post("/api/detect")]
pub async fn detect(
    req: web::Json<PhotoRequest>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let result = flows::detect(&state.client, &req.photo_data_uri).await?;
    Ok(web::Json(result))
}

#[post("/api/attention-map")]
pub async fn attention_map(
    req: web::Json<PhotoRequest>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let result = flows::attention_map(&state.client, &req.photo_data_uri).await?;
    Ok(web::Json(result))
}

#[post("/api/embed/image")]
pub async fn embed_image(
    req: web::Json<PhotoRequest>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let embedding = flows::embed_image(&state.client, &req.photo_data_uri).await?;
    Ok(web::Json(EmbeddingResponse { embedding }))
}

#[post("/api/embed/text")]
pub async fn embed_text(
    req: web::Json<TextRequest>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let embedding = flows::embed_text(&state.client, &req.text).await?;
    Ok(web::Json(EmbeddingResponse { embedding }))
}

/// Fetch a remote image server-side and stream its bytes back
#[get("/api/image-proxy")]
pub async fn image_proxy(
    query: web::Query<ProxyQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let url = query
        .url
        .as_deref()
        .ok_or_else(|| Error::MalformedInput("missing `url` query parameter".into()))?;
    let url = Url::parse(url)
        .map_err(|e| Error::MalformedInput(format!("invalid URL {url:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        let message = format!("unsupported URL scheme {:?}", url.scheme());
        return Err(Error::MalformedInput(message).into());
    }

    let image = state.fetcher.fetch(&url).await?;
    info!("proxied {url}");
    Ok(HttpResponse::Ok()
        .content_type(image.mime_type)
        .body(image.bytes))
}

/// The built-in sample images
#[get("/api/samples")]
pub async fn samples() -> impl Responder {
    web::Json(SAMPLES)
}
