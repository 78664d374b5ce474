//! Helpers for turning user input into playlist entries

use aria_core::CrossOriginRelay;
use url::Url;

/// Extensions that are loadable without going through a resolver
pub const DIRECT_AUDIO_EXTENSIONS: [&str; 9] =
    ["mp3", "wav", "ogg", "oga", "flac", "m4a", "aac", "opus", "webm"];

fn path_of(input: &str) -> String {
    match Url::parse(input) {
        Ok(url) => percent_decode(url.path()),
        Err(_) => input
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

fn percent_decode(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let decoded = (bytes[i] == b'%')
            .then(|| path.get(i + 1..i + 3))
            .flatten()
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match decoded {
            Some(byte) => {
                out.push(byte);
                i += 3;
            }
            None => {
                out.push(bytes[i]);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn file_stem(input: &str) -> Option<String> {
    let path = path_of(input);
    let name = path.rsplit('/').next()?;
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Whether `input` points straight at an audio file
pub fn looks_like_direct_audio(input: &str) -> bool {
    let path = path_of(input);
    path.rsplit_once('.').is_some_and(|(_, ext)| {
        DIRECT_AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
    })
}

/// True for http(s) URLs served from a different origin than `app_origin`
pub fn is_cross_origin(url: &str, app_origin: &str) -> bool {
    let (Ok(target), Ok(origin)) = (Url::parse(url), Url::parse(app_origin)) else {
        return false;
    };
    matches!(target.scheme(), "http" | "https") && target.origin() != origin.origin()
}

/// Playlist id derived from the file name, `track` when there is none
pub fn track_id_for(input: &str) -> String {
    let id: String = file_stem(input)
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let id = id.trim_matches('-');
    if id.is_empty() {
        "track".to_string()
    } else {
        id.to_string()
    }
}

/// Display title derived from the file name
pub fn title_for(input: &str) -> String {
    file_stem(input)
        .map(|stem| stem.replace('_', " "))
        .unwrap_or_else(|| "Unknown Track".to_string())
}

/// Relay reached as `<endpoint>?url=<encoded target>`
#[derive(Debug, Clone)]
pub struct QueryRelay {
    endpoint: String,
}

impl QueryRelay {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl CrossOriginRelay for QueryRelay {
    fn relay(&self, url: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
        format!("{}?url={}", self.endpoint, encoded)
    }
}
