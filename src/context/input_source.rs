//! Classification of the `input_source` option.
//!
//! The first matching rule wins:
//! 1. an integer is a local camera/device index
//! 2. a `host:port` or `scheme://host[:port]` string is a network endpoint
//!    (the filesystem is never consulted for these)
//! 3. anything else is a path, classified by what exists there

use log::warn;
use std::fmt;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "jpe", "bmp", "dib", "tif", "tiff", "gif", "ppm", "pgm", "pbm", "pnm",
    "webp", "jp2", "sr", "ras",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "mpg", "mpeg", "m4v", "wmv", "flv", "webm", "ogv", "3gp", "mts",
];

/// A network address identifying a remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: Option<String>,
    pub host: String,
    pub port: Option<u16>,
}

impl Endpoint {
    /// Parse `host:port`, `[v6]:port` or `scheme://host[:port][/path]`.
    ///
    /// Returns `None` for anything that looks like a filesystem path,
    /// including `file://` URLs.
    pub fn parse(text: &str) -> Option<Self> {
        match text.split_once("://") {
            Some((scheme, rest)) => {
                let valid_scheme = !scheme.is_empty()
                    && scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
                if !valid_scheme || scheme.eq_ignore_ascii_case("file") {
                    return None;
                }
                let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
                let (host, port) = split_authority(authority)?;
                Some(Self {
                    scheme: Some(scheme.to_ascii_lowercase()),
                    host,
                    port,
                })
            }
            None => {
                let (host, port) = split_authority(text)?;
                // Without a scheme only an explicit port marks a network address.
                if port.is_none() {
                    return None;
                }
                Some(Self {
                    scheme: None,
                    host,
                    port,
                })
            }
        }
    }

    /// `host:port`, or just the host when no port is known.
    pub fn address(&self) -> String {
        match self.port {
            Some(port) if self.host.contains(':') => format!("[{}]:{}", self.host, port),
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scheme {
            Some(scheme) => write!(f, "{}://{}", scheme, self.address()),
            None => f.write_str(&self.address()),
        }
    }
}

fn split_authority(authority: &str) -> Option<(String, Option<u16>)> {
    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        match after {
            "" => (host, None),
            _ => (host, Some(after.strip_prefix(':')?)),
        }
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    let valid_host = !host.is_empty()
        && !host
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '\\'));
    if !valid_host {
        return None;
    }
    let port = match port {
        Some(digits) if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
            Some(digits.parse().ok()?)
        }
        Some(_) => return None,
        None => None,
    };
    Some((host.to_string(), port))
}

/// What the input source turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Local camera or capture device number
    Device(i32),
    Remote(Endpoint),
    Directory(PathBuf),
    Image(PathBuf),
    Video(PathBuf),
    /// Exists but is neither a directory nor a known image/video type
    Unknown(PathBuf),
    /// Does not exist
    Missing(PathBuf),
}

impl InputSource {
    pub fn device_index(&self) -> Option<i32> {
        match self {
            Self::Device(index) => Some(*index),
            _ => None,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub fn remote_endpoint(&self) -> Option<&Endpoint> {
        match self {
            Self::Remote(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    /// Resolved path for file-based sources.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Directory(path)
            | Self::Image(path)
            | Self::Video(path)
            | Self::Unknown(path)
            | Self::Missing(path) => Some(path),
            Self::Device(_) | Self::Remote(_) => None,
        }
    }
}

/// Classify an `input_source` string. Never fails; problems are logged.
pub fn classify_input_source(source: &str) -> InputSource {
    if let Ok(index) = source.trim().parse::<i32>() {
        return InputSource::Device(index);
    }

    if let Some(endpoint) = Endpoint::parse(source) {
        return InputSource::Remote(endpoint);
    }

    let path = absolute_path(Path::new(source));
    if !path.exists() {
        warn!("Input source doesn't exist: {}", path.display());
        return InputSource::Missing(path);
    }
    if path.is_dir() {
        InputSource::Directory(path)
    } else if is_image_file(&path) {
        InputSource::Image(path)
    } else if is_video_file(&path) {
        InputSource::Video(path)
    } else {
        warn!(
            "Input source type could not be determined: {}",
            path.display()
        );
        InputSource::Unknown(path)
    }
}

pub fn is_image_file(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

pub fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

fn has_extension(path: &Path, known: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| known.iter().any(|k| k.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Make `path` absolute against the current directory without touching it.
pub fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_is_device() {
        let source = classify_input_source("0");
        assert_eq!(source.device_index(), Some(0));
        assert!(!source.is_dir() && !source.is_image() && !source.is_video() && !source.is_remote());
        assert_eq!(classify_input_source("2").device_index(), Some(2));
    }

    #[test]
    fn test_url_is_remote() {
        let source = classify_input_source("tcp://host:9000");
        let endpoint = source.remote_endpoint().unwrap();
        assert_eq!(endpoint.scheme.as_deref(), Some("tcp"));
        assert_eq!(endpoint.host, "host");
        assert_eq!(endpoint.port, Some(9000));
        assert!(!source.is_dir() && !source.is_image() && !source.is_video());
    }

    #[test]
    fn test_endpoint_shapes() {
        assert_eq!(
            Endpoint::parse("localhost:61616"),
            Some(Endpoint {
                scheme: None,
                host: "localhost".into(),
                port: Some(61616)
            })
        );
        let v6 = Endpoint::parse("[::1]:9000").unwrap();
        assert_eq!(v6.host, "::1");
        assert_eq!(v6.address(), "[::1]:9000");
        let stream = Endpoint::parse("rtsp://cam.local/stream1").unwrap();
        assert_eq!((stream.host.as_str(), stream.port), ("cam.local", None));
        assert_eq!(stream.to_string(), "rtsp://cam.local");
    }

    #[test]
    fn test_paths_are_not_endpoints() {
        assert!(Endpoint::parse("video.mp4").is_none());
        assert!(Endpoint::parse("C:\\videos\\a.mp4").is_none());
        assert!(Endpoint::parse("dir/name:1").is_none());
        assert!(Endpoint::parse("file:///tmp/a.png").is_none());
        assert!(Endpoint::parse("host:port").is_none());
        assert!(Endpoint::parse("host:99999").is_none());
    }

    #[test]
    fn test_directory_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let dir_source = classify_input_source(dir.path().to_str().unwrap());
        assert!(dir_source.is_dir());
        assert!(!dir_source.is_image() && !dir_source.is_video() && !dir_source.is_remote());

        let image = dir.path().join("frame.PNG");
        std::fs::write(&image, b"not really a png").unwrap();
        let image_source = classify_input_source(image.to_str().unwrap());
        assert!(image_source.is_image());
        assert!(!image_source.is_dir() && !image_source.is_video());

        let video = dir.path().join("clip.avi");
        std::fs::write(&video, b"").unwrap();
        assert!(classify_input_source(video.to_str().unwrap()).is_video());

        let other = dir.path().join("notes.txt");
        std::fs::write(&other, b"").unwrap();
        let unknown = classify_input_source(other.to_str().unwrap());
        assert_eq!(unknown, InputSource::Unknown(other.clone()));
    }

    #[test]
    fn test_missing_path_sets_no_flags() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.png");
        let source = classify_input_source(missing.to_str().unwrap());
        assert_eq!(source, InputSource::Missing(missing));
        assert!(!source.is_dir() && !source.is_image() && !source.is_video() && !source.is_remote());
    }

    #[test]
    fn test_relative_path_is_made_absolute() {
        let path = absolute_path(Path::new("some/relative.png"));
        assert!(path.is_absolute());
        assert!(path.ends_with("some/relative.png"));
    }
}
