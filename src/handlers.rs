use std::io;
use std::path::{Component, Path, PathBuf};

use axum::{
    body::Body,
    extract::{RawQuery, Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use tokio::fs;
use tokio_util::io::ReaderStream;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, error, warn};

use crate::AppState;
use crate::error::ServeError;
use crate::listing::{self, Listing};
use crate::qr;

pub const TEXT_PLAIN_UTF8: &str = "text/plain;charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Query parameters understood on every path
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ForceQuery {
    /// `txt`, `download` or `view`; anything else is ignored
    pub force: Option<String>,
    /// Declared MIME type for `force=view`
    pub mime: Option<String>,
}

impl ForceQuery {
    /// Parse a raw query string without ever rejecting it.
    ///
    /// A repeated `force` is ambiguous and ignored, so the request falls through to
    /// the listing or static response. A repeated `mime` keeps its first value.
    /// Undecodable pairs and unknown keys are skipped.
    pub fn parse(raw: Option<&str>) -> Self {
        let mut query = ForceQuery::default();
        let mut force_seen = false;

        for pair in raw.unwrap_or_default().split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let (Some(key), Some(value)) = (decode_component(key), decode_component(value))
            else {
                continue;
            };

            match key.as_str() {
                "force" if force_seen => query.force = None,
                "force" => {
                    force_seen = true;
                    query.force = Some(value);
                }
                "mime" if query.mime.is_none() => query.mime = Some(value),
                _ => {}
            }
        }

        query
    }
}

fn decode_component(raw: &str) -> Option<String> {
    urlencoding::decode(&raw.replace('+', " "))
        .ok()
        .map(|s| s.into_owned())
}

/// Override of the default file response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Force {
    /// Raw bytes as UTF-8 plain text
    Text,
    /// Raw bytes as an octet-stream attachment
    Download,
    /// Video player page for videos, plain text otherwise
    View,
}

impl Force {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "txt" => Some(Force::Text),
            "download" => Some(Force::Download),
            "view" => Some(Force::View),
            _ => None,
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Build the filesystem path for a decoded request path.
///
/// The path is built component-by-component; parent directory references and
/// embedded null bytes are rejected so the result always stays under `root`.
fn resolve_path(root: &Path, relative: &str) -> Result<PathBuf, ServeError> {
    let relative = relative.trim_start_matches('/');

    if relative.is_empty() || relative == "." {
        return Ok(root.to_path_buf());
    }

    let mut result = root.to_path_buf();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(name) => {
                if name.to_string_lossy().contains('\0') {
                    warn!("Path component contains null byte: {:?}", name);
                    return Err(ServeError::PathTraversal);
                }
                result.push(name);
            }
            Component::ParentDir => {
                warn!("Path traversal attempt detected: parent directory (..) in path");
                return Err(ServeError::PathTraversal);
            }
            Component::CurDir => continue,
            Component::RootDir | Component::Prefix(_) => {
                warn!("Absolute path component in relative path");
                return Err(ServeError::PathTraversal);
            }
        }
    }

    if !result.starts_with(root) {
        error!("Path resolution resulted in path outside root: {:?}", result);
        return Err(ServeError::PathTraversal);
    }

    Ok(result)
}

/// Canonicalize an existing path and verify it is still inside the canonical root.
async fn verify_within_root(root: &Path, path: &Path) -> Result<PathBuf, ServeError> {
    let canonical_root = fs::canonicalize(root).await?;
    let canonical_path = fs::canonicalize(path).await?;

    if !canonical_path.starts_with(&canonical_root) {
        warn!(
            "Symlink escape attempt: {:?} resolved to {:?} which is outside {:?}",
            path, canonical_path, canonical_root
        );
        return Err(ServeError::PathTraversal);
    }

    Ok(canonical_path)
}

/// `Content-Disposition` value forcing a download under the original file name.
fn attachment_disposition(file_name: &str) -> String {
    let ascii_name: String = file_name
        .chars()
        .map(|c| match c {
            '"' => '\'',
            '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_name,
        urlencoding::encode(file_name)
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Any method, any path - directory listing, forced file response or static file
pub async fn serve_path(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    request: Request,
) -> Result<Response, ServeError> {
    let query = ForceQuery::parse(raw_query.as_deref());
    let request_path = request.uri().path().to_string();
    let current_path = urlencoding::decode(&request_path)
        .map_err(|_| ServeError::InvalidPath(request_path.clone()))?
        .into_owned();

    let path = resolve_path(state.root_dir(), &current_path)?;

    let metadata = match fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
            ) =>
        {
            debug!("Not found: {}", path.display());
            return Err(ServeError::NotFound(path.display().to_string()));
        }
        Err(err) => return Err(ServeError::Io(err)),
    };

    let path = verify_within_root(state.root_dir(), &path).await?;

    if metadata.is_dir() {
        return render_directory(&state, &current_path, path).await;
    }

    match query.force.as_deref().and_then(Force::parse) {
        Some(Force::Text) => stream_file(&path, TEXT_PLAIN_UTF8).await,
        Some(Force::Download) => download_file(&path).await,
        Some(Force::View) => view_file(&path, &request_path, query.mime.as_deref()).await,
        None => serve_static(path, request).await,
    }
}

/// Render the listing page of `dir`
async fn render_directory(
    state: &AppState,
    current_path: &str,
    dir: PathBuf,
) -> Result<Response, ServeError> {
    debug!("Listing directory: {}", dir.display());

    let (dir, entries) = tokio::task::spawn_blocking(move || {
        let entries = listing::read_entries(&dir);
        (dir, entries)
    })
    .await
    .map_err(|err| ServeError::Io(io::Error::other(err.to_string())))?;

    let listing = Listing::new(current_path, &dir, entries?);
    let options = &state.config.listing;

    let qr_svg = if options.show_qrcode {
        directory_qrcode(state, &listing)
    } else {
        None
    };

    Ok(Html(listing::render(&listing, options, qr_svg.as_deref())).into_response())
}

/// QR code of the absolute URL of the listed directory; `None` if encoding fails.
fn directory_qrcode(state: &AppState, listing: &Listing) -> Option<String> {
    let url = format!(
        "{}{}",
        state.public_url.trim_end_matches('/'),
        listing.href()
    );

    match qr::render_svg(&url) {
        Ok(svg) => Some(svg),
        Err(err) => {
            warn!("Failed to generate QR code for {}: {:?}", url, err);
            None
        }
    }
}

/// Stream the raw bytes of `path` with a fixed content type.
async fn stream_file(path: &Path, content_type: &'static str) -> Result<Response, ServeError> {
    debug!("Streaming file as {}: {}", content_type, path.display());

    let file = fs::File::open(path).await?;
    let file_size = file.metadata().await?.len();
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_LENGTH, file_size.to_string()),
        ],
        body,
    )
        .into_response())
}

/// Raw bytes as an attachment, whatever the file type.
async fn download_file(path: &Path) -> Result<Response, ServeError> {
    let mut response = stream_file(path, OCTET_STREAM).await?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());

    if let Ok(value) = HeaderValue::from_str(&attachment_disposition(&file_name)) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}

/// Video player page for videos, plain text for everything else.
///
/// The MIME type comes from the `mime` parameter, or from the file name when absent.
async fn view_file(
    path: &Path,
    request_path: &str,
    declared_mime: Option<&str>,
) -> Result<Response, ServeError> {
    let mime = match declared_mime {
        Some(mime) if !mime.is_empty() => mime.to_string(),
        _ => listing::guess_mime(path),
    };

    if mime.starts_with("video/") {
        return Ok(Html(listing::render_video_page(request_path, &mime)).into_response());
    }

    stream_file(path, TEXT_PLAIN_UTF8).await
}

/// Serve through `ServeFile`, which handles byte ranges and conditional requests.
async fn serve_static(path: PathBuf, mut request: Request) -> Result<Response, ServeError> {
    // ServeFile only answers GET and HEAD
    if request.method() != Method::HEAD {
        *request.method_mut() = Method::GET;
    }

    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => Ok(response.into_response()),
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_force_parse() {
        assert_eq!(Force::parse("txt"), Some(Force::Text));
        assert_eq!(Force::parse("download"), Some(Force::Download));
        assert_eq!(Force::parse("view"), Some(Force::View));
        assert_eq!(Force::parse("TXT"), None);
        assert_eq!(Force::parse(""), None);
    }

    #[test]
    fn test_force_query_parse() {
        let query = ForceQuery::parse(Some("force=view&mime=video%2Fmp4"));
        assert_eq!(query.force.as_deref(), Some("view"));
        assert_eq!(query.mime.as_deref(), Some("video/mp4"));

        assert_eq!(ForceQuery::parse(None), ForceQuery::default());
        assert_eq!(ForceQuery::parse(Some("")), ForceQuery::default());
    }

    #[test]
    fn test_force_query_repeated_keys() {
        let query = ForceQuery::parse(Some("force=txt&force=download"));
        assert_eq!(query.force, None);

        let query = ForceQuery::parse(Some("force=txt&force=download&force=view"));
        assert_eq!(query.force, None);

        let query = ForceQuery::parse(Some("force=view&mime=a&mime=b"));
        assert_eq!(query.force.as_deref(), Some("view"));
        assert_eq!(query.mime.as_deref(), Some("a"));
    }

    #[test]
    fn test_force_query_tolerates_malformed_pairs() {
        let query = ForceQuery::parse(Some("force&%FF=x&mime=text+plain&other=1"));
        assert_eq!(query.force.as_deref(), Some(""));
        assert_eq!(query.mime.as_deref(), Some("text plain"));
    }

    #[test]
    fn test_resolve_path_normal() {
        let root = PathBuf::from("/tmp/testroot");

        let result = resolve_path(&root, "/subdir/file.txt");
        assert_eq!(result.unwrap(), root.join("subdir/file.txt"));
    }

    #[test]
    fn test_resolve_path_root() {
        let root = PathBuf::from("/tmp/testroot");

        assert_eq!(resolve_path(&root, "/").unwrap(), root);
        assert_eq!(resolve_path(&root, "").unwrap(), root);
        assert_eq!(resolve_path(&root, "./").unwrap(), root);
    }

    #[test]
    fn test_resolve_path_trailing_slash() {
        let root = PathBuf::from("/tmp/testroot");

        assert_eq!(resolve_path(&root, "/a/b/").unwrap(), root.join("a/b"));
    }

    #[test]
    fn test_resolve_path_rejects_parent_dir() {
        let root = PathBuf::from("/tmp/testroot");

        let result = resolve_path(&root, "/..");
        assert!(matches!(result, Err(ServeError::PathTraversal)));

        let result = resolve_path(&root, "/subdir/../..");
        assert!(matches!(result, Err(ServeError::PathTraversal)));

        let result = resolve_path(&root, "/../etc/passwd");
        assert!(matches!(result, Err(ServeError::PathTraversal)));
    }

    #[test]
    fn test_resolve_path_rejects_null_bytes() {
        let root = PathBuf::from("/tmp/testroot");

        let result = resolve_path(&root, "/file\0.txt");
        assert!(matches!(result, Err(ServeError::PathTraversal)));
    }

    #[tokio::test]
    async fn test_verify_within_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        std::fs::write(root.join("inside.txt"), "ok").unwrap();

        let verified = verify_within_root(&root, &root.join("inside.txt"))
            .await
            .unwrap();
        assert_eq!(verified, root.join("inside.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_verify_within_root_detects_symlink_escape() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();

        let outside_dir = TempDir::new().unwrap();
        std::fs::write(outside_dir.path().join("secret.txt"), "secret data").unwrap();
        std::os::unix::fs::symlink(outside_dir.path(), root.join("escape")).unwrap();

        let result = verify_within_root(&root, &root.join("escape/secret.txt")).await;
        assert!(matches!(result, Err(ServeError::PathTraversal)));
    }

    #[test]
    fn test_attachment_disposition() {
        assert_eq!(
            attachment_disposition("notes.txt"),
            "attachment; filename=\"notes.txt\"; filename*=UTF-8''notes.txt"
        );
        assert_eq!(
            attachment_disposition("say \"hi\".txt"),
            "attachment; filename=\"say 'hi'.txt\"; filename*=UTF-8''say%20%22hi%22.txt"
        );
        let unicode = attachment_disposition("résumé.pdf");
        assert!(unicode.starts_with("attachment; filename=\"r_sum_.pdf\""));
        assert!(HeaderValue::from_str(&unicode).is_ok());
    }
}
