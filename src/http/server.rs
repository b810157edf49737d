use log::info;
use rouille::{Request, Response, input::json_input};
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    config::HttpConfig,
    domain::{
        reference::ExternalId,
        track::Level,
        video::{NewVideo, VideoPatch},
    },
    http::error::ApiError,
    metadata::{TitleResolver, enrich},
    storage::operations::{Change, Outcome, Store},
};

pub type SharedTitleResolver = Box<dyn TitleResolver + Send + Sync>;

/// JSON API over the store.
///
/// Requests are served from several threads, so every store access goes
/// through the mutex and each operation runs to completion under it.
pub struct HttpServer {
    store: Arc<Mutex<Store>>,
    titles: Option<SharedTitleResolver>,
    pub config: HttpConfig,
}

#[derive(Deserialize)]
struct BlockSizeRequest {
    block_size_sec: u32,
}

#[derive(Deserialize)]
struct LevelRequest {
    level: u8,
}

impl HttpServer {
    pub fn new(store: Store, titles: Option<SharedTitleResolver>, config: HttpConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            titles,
            config,
        }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let result = rouille::router!(request,
            (GET) (/videos) => {
                self.handle_list_videos()
            },
            (POST) (/videos) => {
                self.handle_add_video(request)
            },
            (GET) (/videos/{id: String}) => {
                self.handle_get_video(&id)
            },
            (PATCH) (/videos/{id: String}) => {
                self.handle_update_video(&id, request)
            },
            (DELETE) (/videos/{id: String}) => {
                self.handle_remove_video(&id)
            },
            (GET) (/tracks/{video_id: String}) => {
                self.handle_get_track(&video_id)
            },
            (PUT) (/tracks/{video_id: String}/block_size) => {
                self.handle_update_block_size(&video_id, request)
            },
            (PUT) (/tracks/{video_id: String}/levels/{index: usize}) => {
                self.handle_set_level(&video_id, index, request)
            },
            _ => Ok(Response::empty_404())
        );

        let response = result.unwrap_or_else(ApiError::into_response);
        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>, ApiError> {
        self.store
            .lock()
            .map_err(|e| ApiError::Internal(format!("store lock poisoned: {e}")))
    }

    fn parse_video_id(video_id: &str) -> Result<ExternalId, ApiError> {
        ExternalId::parse(video_id)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid video id '{video_id}'")))
    }

    fn parse_body<T: serde::de::DeserializeOwned>(request: &Request) -> Result<T, ApiError> {
        json_input(request).map_err(|e| ApiError::BadRequest(format!("invalid body: {e}")))
    }

    fn handle_list_videos(&self) -> Result<Response, ApiError> {
        let videos = self.lock()?.list_videos()?;
        Ok(Response::json(&videos))
    }

    fn handle_add_video(&self, request: &Request) -> Result<Response, ApiError> {
        let params: NewVideo = Self::parse_body(request)?;
        // the title lookup goes over the network, keep it outside the lock
        let titles = self.titles.as_deref().map(|t| t as &dyn TitleResolver);
        let params = enrich(params, titles, None);

        let video = self.lock()?.add_video(&params)?;
        Ok(Response::json(&video).with_status_code(201))
    }

    fn handle_get_video(&self, id: &str) -> Result<Response, ApiError> {
        match self.lock()?.get_video(id)? {
            Some(video) => Ok(Response::json(&video)),
            None => Err(ApiError::NotFound(format!("video {id} not found"))),
        }
    }

    fn handle_update_video(&self, id: &str, request: &Request) -> Result<Response, ApiError> {
        let patch: VideoPatch = Self::parse_body(request)?;

        match self.lock()?.update_video(id, &patch)? {
            Outcome::Applied(video) => Ok(Response::json(&video)),
            Outcome::NotFound => Err(ApiError::NotFound(format!("video {id} not found"))),
        }
    }

    fn handle_remove_video(&self, id: &str) -> Result<Response, ApiError> {
        match self.lock()?.remove_video(id)? {
            Outcome::Applied(_) => Ok(Response::empty_204()),
            Outcome::NotFound => Err(ApiError::NotFound(format!("video {id} not found"))),
        }
    }

    fn handle_get_track(&self, video_id: &str) -> Result<Response, ApiError> {
        let external = Self::parse_video_id(video_id)?;

        match self.lock()?.get_track(&external)? {
            Some(track) => Ok(Response::json(&track)),
            None => Err(ApiError::NotFound(format!("track {video_id} not found"))),
        }
    }

    fn handle_update_block_size(
        &self,
        video_id: &str,
        request: &Request,
    ) -> Result<Response, ApiError> {
        let external = Self::parse_video_id(video_id)?;
        let body: BlockSizeRequest = Self::parse_body(request)?;

        let mut store = self.lock()?;
        match store.update_track_block_size(&external, body.block_size_sec)? {
            Change::Applied(track) => Ok(Response::json(&track)),
            Change::Unchanged => match store.get_track(&external)? {
                Some(track) => Ok(Response::json(&track)),
                None => Err(ApiError::NotFound(format!("track {video_id} not found"))),
            },
            Change::NotFound => Err(ApiError::NotFound(format!("track {video_id} not found"))),
        }
    }

    fn handle_set_level(
        &self,
        video_id: &str,
        index: usize,
        request: &Request,
    ) -> Result<Response, ApiError> {
        let external = Self::parse_video_id(video_id)?;
        let body: LevelRequest = Self::parse_body(request)?;
        if Level::new(body.level).value() != body.level {
            return Err(ApiError::BadRequest(format!(
                "level must be between {} and {}",
                Level::MIN.value(),
                Level::MAX.value()
            )));
        }

        let mut store = self.lock()?;
        match store.set_level(&external, index, Level::new(body.level))? {
            Change::Applied(track) => Ok(Response::json(&track)),
            Change::Unchanged => match store.get_track(&external)? {
                Some(track) => Ok(Response::json(&track)),
                None => Err(ApiError::NotFound(format!("track {video_id} not found"))),
            },
            Change::NotFound => Err(ApiError::NotFound(format!("track {video_id} not found"))),
        }
    }
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}
