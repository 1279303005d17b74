use std::path::Path;

/// Cover image bytes ready to embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl CoverImage {
    /// Accept the bytes only if they carry a JPEG or PNG signature
    pub fn from_bytes(data: Vec<u8>) -> Option<Self> {
        let mime_type = sniff_mime(&data)?;
        Some(Self {
            data,
            mime_type: mime_type.to_string(),
        })
    }

    pub fn is_png(&self) -> bool {
        self.mime_type.contains("png")
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    // Check for JPEG magic bytes
    let is_jpeg = bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] == 0xD8;
    // Check for PNG magic bytes
    let is_png = bytes.len() >= 8
        && bytes[0] == 0x89
        && bytes[1] == 0x50
        && bytes[2] == 0x4E
        && bytes[3] == 0x47;

    if is_png {
        Some("image/png")
    } else if is_jpeg {
        Some("image/jpeg")
    } else {
        None
    }
}

/// Read a user-supplied cover file
///
/// `None` when the path is not an existing regular file or cannot be read.
/// Unrecognized bytes are kept and typed from the extension.
pub fn load_cover_file(path: &Path) -> Option<CoverImage> {
    if !path.is_file() {
        return None;
    }

    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("could not read cover {}: {}", path.display(), e);
            return None;
        }
    };

    let mime_type = match sniff_mime(&data) {
        Some(mime) => mime,
        None => {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            if ext == "png" {
                "image/png"
            } else {
                "image/jpeg"
            }
        }
    };

    Some(CoverImage {
        data,
        mime_type: mime_type.to_string(),
    })
}

/// Download a cover image; every failure collapses to `None`
pub async fn download_cover(client: &reqwest::Client, url: &str) -> Option<CoverImage> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    let parsed = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("ignoring malformed cover url '{}': {}", url, e);
            return None;
        }
    };

    let response = match client.get(parsed).send().await {
        Ok(response) => response,
        Err(e) => {
            log::warn!("cover download failed for {}: {}", url, e);
            return None;
        }
    };

    if !response.status().is_success() {
        log::warn!("cover download returned {} for {}", response.status(), url);
        return None;
    }

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("cover body unreadable for {}: {}", url, e);
            return None;
        }
    };

    // Tiny bodies are placeholder or error pages
    if bytes.len() < 100 {
        return None;
    }

    let cover = CoverImage::from_bytes(bytes.to_vec());
    if cover.is_none() {
        log::warn!("cover at {} is not a JPEG or PNG", url);
    }
    cover
}
