//! The JSON web server. One route per flow, plus the image proxy used to
//! turn sample URLs into data URIs.

use crate::config::Settings;
use crate::error::Error;
use crate::fetch::ImageFetcher;
use crate::model::ModelClient;
use crate::view::FAILURE_TITLE;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use tracing::{error, info};

mod protocol;
pub mod routes;

/// Everything a request handler needs. Nothing in here is mutable, so
/// requests never wait on each other.
#[derive(Debug, Clone)]
pub struct AppState {
    pub client: ModelClient,
    pub fetcher: ImageFetcher,
}

impl AppState {
    pub fn new(settings: &Settings) -> crate::Result<Self> {
        let client = ModelClient::new(settings)?;
        let fetcher = ImageFetcher::new(client.http().clone());
        Ok(AppState { client, fetcher })
    }
}

#[derive(Debug)]
pub struct WebError {
    err: Error,
}

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.err)
    }
}

impl actix_web::error::ResponseError for WebError {
    fn error_response(&self) -> HttpResponse {
        error!("{FAILURE_TITLE} ({}): {}", self.err.kind(), self.err);
        let body = protocol::ErrorBody {
            title: FAILURE_TITLE,
            kind: self.err.kind(),
            errors: vec![self.to_string()],
        };

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self.err {
            Error::MalformedInput(_) => StatusCode::BAD_REQUEST,
            Error::Fetch(_) | Error::Remote(_) => StatusCode::BAD_GATEWAY,
            Error::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for WebError {
    fn from(err: Error) -> WebError {
        WebError { err }
    }
}

/// Register the routes and the extractor error handlers
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json = web::JsonConfig::default().error_handler(|err, _req| {
        WebError::from(Error::MalformedInput(err.to_string())).into()
    });
    let query = web::QueryConfig::default().error_handler(|err, _req| {
        WebError::from(Error::MalformedInput(err.to_string())).into()
    });

    cfg.app_data(json)
        .app_data(query)
        .service(routes::classify)
        .service(routes::detect)
        .service(routes::attention_map)
        .service(routes::embed_image)
        .service(routes::embed_text)
        .service(routes::image_proxy)
        .service(routes::samples);
}

/// Start the HTTP server and run until it is stopped
pub async fn serve(state: AppState, bind: &str) -> std::io::Result<()> {
    let state = web::Data::new(state);
    info!("listening on {bind}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await
}
