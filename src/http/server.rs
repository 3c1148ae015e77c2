use log::info;
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    config::{HttpConfig, PublicEndpoint},
    domain::{
        id::MixtapeId,
        mixtape::{Mixtape, MixtapeUpdate, NewMixtape, Track, normalize_recipient},
        resolve::{self, ResolvedTrack},
        tracklist,
    },
    http::{deck, error::ApiError},
    public_endpoint,
    storage::{error::StoreError, operations::Store},
};

pub struct HttpServer {
    store: Arc<Mutex<Store>>,
    pub config: HttpConfig,
    assets_dir: Option<PathBuf>,
    public: PublicEndpoint,
}

impl HttpServer {
    pub fn new(
        store: Store,
        config: HttpConfig,
        assets_dir: Option<PathBuf>,
        public: PublicEndpoint,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            config,
            assets_dir,
            public,
        }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let url = request.url();
        // cue audio lives in nested paths under /assets/, which router!
        // can't express
        let response = if let Some(asset) = url.strip_prefix("/assets/") {
            if request.method() == "GET" {
                self.handle_asset(asset)
            } else {
                Response::empty_404()
            }
        } else {
            rouille::router!(request,
                (GET) (/) => {
                    Self::handle_create_page()
                },

                (GET) (/playback/{_id: String}) => {
                    Self::handle_playback_page()
                },

                (GET) (/remix/{_id: String}) => {
                    Self::handle_remix_page()
                },

                (POST) (/api/mixtapes) => {
                    self.handle_create_mixtape(request)
                },

                (GET) (/api/mixtapes/{id: String}) => {
                    self.handle_get_mixtape(id)
                },

                (PUT) (/api/mixtapes/{id: String}) => {
                    self.handle_update_mixtape(id, request)
                },

                (GET) (/deck/{id: String}) => {
                    deck::handle_deck_socket(id, &self.store, request)
                },

                _ => Response::empty_404()
            )
        };

        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, Store>, ApiError> {
        self.store.lock().map_err(|e| {
            ApiError::Internal(format!("could not access the mixtape store under lock: {e}"))
        })
    }

    fn handle_create_page() -> Response {
        Response::html(include_str!("../../html/create.html"))
    }

    fn handle_playback_page() -> Response {
        Response::html(include_str!("../../html/playback.html"))
    }

    fn handle_remix_page() -> Response {
        Response::html(include_str!("../../html/remix.html"))
    }

    fn handle_create_mixtape(&self, request: &Request) -> Response {
        match self.create_mixtape(request) {
            Ok(body) => Response::json(&body).with_status_code(201),
            Err(e) => e.into_response(),
        }
    }

    fn create_mixtape(&self, request: &Request) -> Result<CreateMixtapeResponse, ApiError> {
        let body: CreateMixtapeRequest = rouille::input::json_input(request)
            .map_err(|e| ApiError::BadRequest(format!("invalid mixtape payload: {e}")))?;

        let recipient_name = normalize_recipient(&body.recipient_name);
        tracklist::validate_for_save(&recipient_name, &body.tracks)?;

        let mixtape = self.lock_store()?.create(NewMixtape {
            recipient_name,
            tracks: body.tracks,
        })?;
        info!(
            "created mixtape {} ({} tracks)",
            mixtape.id,
            mixtape.tracks.len()
        );

        let playback_url = public_endpoint::playback_url(&self.public, &mixtape.id);
        Ok(CreateMixtapeResponse {
            mixtape: MixtapeResponse::from_domain(&mixtape),
            playback_url,
        })
    }

    fn handle_get_mixtape(&self, id: String) -> Response {
        match self.get_mixtape(id) {
            Ok(body) => Response::json(&body),
            Err(e) => e.into_response(),
        }
    }

    fn get_mixtape(&self, id: String) -> Result<FetchMixtapeResponse, ApiError> {
        let id = MixtapeId::parse(&id).map_err(|_| StoreError::InvalidMixtapeId)?;

        let fetched = self.lock_store()?.fetch(&id)?;
        let fallback = fetched.is_fallback();
        let mixtape = fetched.into_mixtape();
        let resolved = resolve::resolve_tracks(&mixtape.tracks);

        Ok(FetchMixtapeResponse {
            mixtape: MixtapeResponse::from_domain(&mixtape),
            resolved,
            fallback,
        })
    }

    fn handle_update_mixtape(&self, id: String, request: &Request) -> Response {
        match self.update_mixtape(id, request) {
            Ok(body) => Response::json(&body),
            Err(e) => e.into_response(),
        }
    }

    fn update_mixtape(&self, id: String, request: &Request) -> Result<MixtapeResponse, ApiError> {
        let id = MixtapeId::parse(&id).map_err(|_| StoreError::InvalidMixtapeId)?;
        let body: UpdateMixtapeRequest = rouille::input::json_input(request)
            .map_err(|e| ApiError::BadRequest(format!("invalid mixtape payload: {e}")))?;

        let recipient_name = body.recipient_name.map(|name| normalize_recipient(&name));
        if let Some(name) = &recipient_name {
            tracklist::validate_recipient(name)?;
        }
        if let Some(tracks) = &body.tracks {
            tracklist::validate_tracks(tracks)?;
        }

        let updated = self.lock_store()?.update(
            &id,
            MixtapeUpdate {
                recipient_name,
                tracks: body.tracks,
            },
        )?;
        info!("remixed mixtape {}", updated.id);

        Ok(MixtapeResponse::from_domain(&updated))
    }

    fn handle_asset(&self, asset: &str) -> Response {
        let Some(dir) = &self.assets_dir else {
            return Response::empty_404();
        };

        // no parent traversal, no hidden files
        let suspicious = asset
            .split('/')
            .any(|seg| seg.is_empty() || seg.starts_with('.'));
        if suspicious {
            return Response::empty_404();
        }

        let path = dir.join(asset);
        match std::fs::File::open(&path) {
            Ok(file) => Response::from_file(Self::mime_for_asset(&path), file),
            Err(_) => Response::empty_404(),
        }
    }

    fn mime_for_asset(path: &Path) -> String {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy())
            .map(|s| s.to_lowercase());
        let default = || {
            mime_guess::from_path(path)
                .first_or_octet_stream()
                .to_string()
        };
        ext.and_then(|ext| Self::mime_from_ext(ext.as_str()))
            .unwrap_or_else(default)
    }

    /// Map file extension (without dot) to proper MIME type for browser playback.
    /// Returns None if the extension is not recognized.
    pub fn mime_from_ext(ext: &str) -> Option<String> {
        match ext {
            "m4a" => Some("audio/x-m4a".to_string()), // Safari iOS compatible
            "aac" => Some("audio/aac".to_string()),
            "mp3" => Some("audio/mpeg".to_string()),
            "wav" => Some("audio/wav".to_string()),
            "ogg" => Some("audio/ogg".to_string()),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateMixtapeRequest {
    #[serde(default)]
    recipient_name: String,
    tracks: Vec<Track>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateMixtapeRequest {
    recipient_name: Option<String>,
    tracks: Option<Vec<Track>>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MixtapeResponse {
    id: String,
    recipient_name: String,
    tracks: Vec<Track>,
    created_at: i64,
}

impl MixtapeResponse {
    fn from_domain(mixtape: &Mixtape) -> Self {
        Self {
            id: mixtape.id.to_string(),
            recipient_name: mixtape.recipient_name.clone(),
            tracks: mixtape.tracks.clone(),
            created_at: mixtape.created_at,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateMixtapeResponse {
    mixtape: MixtapeResponse,
    playback_url: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchMixtapeResponse {
    mixtape: MixtapeResponse,
    resolved: Vec<ResolvedTrack>,
    fallback: bool,
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}
