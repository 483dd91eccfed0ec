use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dispatch::NamedHandler;
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::storage::persistence::{FilePersistence, JsonWrite, StorageError};

/// Methods answered in `Allow` by the OPTIONS handler.
pub const ALLOWED_METHODS: &str = "DELETE, GET, HEAD, OPTIONS, POST, PUT";

/// Resource path of a request: the URL path without its leading `/`.
fn resource(request: &Request) -> &str {
    request.uri().path().trim_start_matches('/')
}

fn created() -> Response {
    Response::builder()
        .status(StatusCode::Created)
        .header("Content-Length", "0")
        .build()
}

fn no_content() -> Response {
    Response::builder().status(StatusCode::NoContent).build()
}

fn log_content(operation: &str, resource: &str, body: &[u8]) {
    debug!(
        resource,
        preview = %String::from_utf8_lossy(&body[..body.len().min(100)]),
        "{operation} body content"
    );
    info!(resource, length = body.len(), "{operation} body content");
}

/// `file-storage-get`: the stored bytes, or 404.
pub struct GetFileHandler {
    persistence: FilePersistence,
}

impl GetFileHandler {
    pub fn new(persistence: FilePersistence) -> Self {
        Self { persistence }
    }
}

impl NamedHandler for GetFileHandler {
    fn name(&self) -> &str {
        "file-storage-get"
    }

    fn handle(&self, request: &Request) -> anyhow::Result<Response> {
        let resource = resource(request);
        match self.persistence.read_bytes(resource) {
            Ok(body) => {
                log_content("Read", resource, &body);
                Ok(Response::ok(body))
            }
            Err(e) => {
                warn!(error = %e, "Failed reading resource");
                Ok(Response::error(StatusCode::NotFound))
            }
        }
    }
}

/// `file-storage-head`: 204 if the resource exists, else 404.
pub struct HeadFileHandler {
    persistence: FilePersistence,
}

impl HeadFileHandler {
    pub fn new(persistence: FilePersistence) -> Self {
        Self { persistence }
    }
}

impl NamedHandler for HeadFileHandler {
    fn name(&self) -> &str {
        "file-storage-head"
    }

    fn handle(&self, request: &Request) -> anyhow::Result<Response> {
        match self.persistence.read_bytes(resource(request)) {
            Ok(_) => Ok(no_content()),
            Err(e) => {
                warn!(error = %e, "Failed reading resource");
                Ok(Response::error(StatusCode::NotFound))
            }
        }
    }
}

/// `file-storage-put`: replaces the resource with the request body.
pub struct PutFileHandler {
    persistence: FilePersistence,
}

impl PutFileHandler {
    pub fn new(persistence: FilePersistence) -> Self {
        Self { persistence }
    }
}

impl NamedHandler for PutFileHandler {
    fn name(&self) -> &str {
        "file-storage-put"
    }

    fn handle(&self, request: &Request) -> anyhow::Result<Response> {
        let resource = resource(request);
        let body = request.body().as_bytes();
        match self.persistence.write_bytes(resource, body) {
            Ok(()) => {
                log_content("Wrote", resource, body);
                Ok(created())
            }
            Err(e) => {
                warn!(error = %e, "Failed writing to resource");
                Ok(Response::error(StatusCode::NotFound))
            }
        }
    }
}

/// `file-storage-post`: JSON resources are created or merged into, any
/// other resource is written like PUT.
pub struct PostFileHandler {
    persistence: FilePersistence,
}

impl PostFileHandler {
    pub fn new(persistence: FilePersistence) -> Self {
        Self { persistence }
    }

    fn post(&self, resource: &str, body: &[u8]) -> Result<Response, StorageError> {
        if !resource.ends_with(".json") {
            self.persistence.write_bytes(resource, body)?;
            log_content("Wrote", resource, body);
            return Ok(created());
        }

        let update = String::from_utf8_lossy(body);
        match self.persistence.create_or_update_json(resource, &update)? {
            JsonWrite::Created => {
                log_content("Created JSON with", resource, body);
                Ok(created())
            }
            JsonWrite::Updated => {
                log_content("Updated JSON with", resource, body);
                Ok(Response::ok(self.persistence.read_bytes(resource)?))
            }
        }
    }
}

impl NamedHandler for PostFileHandler {
    fn name(&self) -> &str {
        "file-storage-post"
    }

    fn handle(&self, request: &Request) -> anyhow::Result<Response> {
        match self.post(resource(request), request.body().as_bytes()) {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!(error = %e, "Failed writing to resource");
                Ok(Response::error(StatusCode::NotFound))
            }
        }
    }
}

/// `file-storage-delete`: 204 once deleted, 404 otherwise.
pub struct DeleteFileHandler {
    persistence: FilePersistence,
}

impl DeleteFileHandler {
    pub fn new(persistence: FilePersistence) -> Self {
        Self { persistence }
    }
}

impl NamedHandler for DeleteFileHandler {
    fn name(&self) -> &str {
        "file-storage-delete"
    }

    fn handle(&self, request: &Request) -> anyhow::Result<Response> {
        let resource = resource(request);
        match self.persistence.delete(resource) {
            Ok(()) => {
                info!(resource, "Deleted resource");
                Ok(no_content())
            }
            Err(e) => {
                warn!(error = %e, "Failed deleting resource");
                Ok(Response::error(StatusCode::NotFound))
            }
        }
    }
}

/// `file-storage-options`: lists the supported methods for an existing
/// resource.
pub struct OptionsFileHandler {
    persistence: FilePersistence,
}

impl OptionsFileHandler {
    pub fn new(persistence: FilePersistence) -> Self {
        Self { persistence }
    }
}

impl NamedHandler for OptionsFileHandler {
    fn name(&self) -> &str {
        "file-storage-options"
    }

    fn handle(&self, request: &Request) -> anyhow::Result<Response> {
        match self.persistence.read_bytes(resource(request)) {
            Ok(_) => Ok(Response::builder()
                .status(StatusCode::NoContent)
                .header("Allow", ALLOWED_METHODS)
                .build()),
            Err(e) => {
                warn!(error = %e, "Failed reading resource");
                Ok(Response::error(StatusCode::NotFound))
            }
        }
    }
}

/// All file storage handlers over one persistence root.
pub fn file_storage_handlers(persistence: &FilePersistence) -> Vec<Arc<dyn NamedHandler>> {
    vec![
        Arc::new(GetFileHandler::new(persistence.clone())),
        Arc::new(HeadFileHandler::new(persistence.clone())),
        Arc::new(PutFileHandler::new(persistence.clone())),
        Arc::new(PostFileHandler::new(persistence.clone())),
        Arc::new(DeleteFileHandler::new(persistence.clone())),
        Arc::new(OptionsFileHandler::new(persistence.clone())),
    ]
}
