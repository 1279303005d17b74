use crate::cover_art::CoverImage;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Final values written into a file on commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFields {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genres: Vec<String>,
    pub cover: Option<CoverImage>,
}

/// Embedded metadata access for one audio file at a time
pub trait TagStore {
    /// Existing title and artist; empty strings when unset
    fn read_title_artist(&self, path: &Path) -> Result<(String, String)>;

    /// Replace the tag fields of `path`. Either every field lands or the
    /// file is left as it was.
    fn write_fields(&self, path: &Path, fields: &TrackFields) -> Result<()>;
}

/// Tag store backed by lofty (mp3/flac/ogg/opus) and mp4ameta (m4a)
#[derive(Debug, Default, Clone, Copy)]
pub struct FileTagStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Mp4,
    Standard,
}

fn container_of(path: &Path) -> Result<(Container, String)> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "m4a" => Ok((Container::Mp4, ext)),
        "mp3" | "flac" | "ogg" | "opus" => Ok((Container::Standard, ext)),
        _ => anyhow::bail!("Unsupported format: {}", path.display()),
    }
}

impl TagStore for FileTagStore {
    fn read_title_artist(&self, path: &Path) -> Result<(String, String)> {
        let (container, _) = container_of(path)?;
        match container {
            Container::Mp4 => read_m4a(path),
            Container::Standard => read_standard(path),
        }
    }

    fn write_fields(&self, path: &Path, fields: &TrackFields) -> Result<()> {
        if !path.is_file() {
            anyhow::bail!("File does not exist: {}", path.display());
        }
        let (container, ext) = container_of(path)?;
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        // Tags go into a sibling copy that replaces the original only once
        // the write has fully succeeded
        let staged = tempfile::Builder::new()
            .prefix(".track-tagger-")
            .suffix(&format!(".{}", ext))
            .tempfile_in(parent)
            .with_context(|| format!("cannot stage {}", path.display()))?;
        fs::copy(path, staged.path())?;

        match container {
            Container::Mp4 => write_m4a(staged.path(), fields)?,
            Container::Standard => write_standard(staged.path(), fields)?,
        }

        staged
            .persist(path)
            .with_context(|| format!("cannot replace {}", path.display()))?;
        log::debug!("wrote tags to {}", path.display());
        Ok(())
    }
}

fn read_m4a(path: &Path) -> Result<(String, String)> {
    let tag = mp4ameta::Tag::read_from_path(path)?;
    Ok((
        tag.title().unwrap_or_default().to_string(),
        tag.artist().unwrap_or_default().to_string(),
    ))
}

fn read_standard(path: &Path) -> Result<(String, String)> {
    use lofty::prelude::*;
    use lofty::probe::Probe;

    let tagged_file = Probe::open(path)?.read()?;
    let tag = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        Some(tag) => tag,
        None => return Ok((String::new(), String::new())),
    };

    Ok((
        tag.title().map(|t| t.to_string()).unwrap_or_default(),
        tag.artist().map(|a| a.to_string()).unwrap_or_default(),
    ))
}

// iTunes M4A files
fn write_m4a(path: &Path, fields: &TrackFields) -> Result<()> {
    use mp4ameta::{Data, Fourcc, Tag};

    let genre = Fourcc(*b"\xa9gen");
    let artwork = Fourcc(*b"covr");

    let mut tag = Tag::read_from_path(path).unwrap_or_else(|_| Tag::default());

    tag.set_title(fields.title.clone());
    tag.set_artist(fields.artist.clone());
    if let Some(album) = &fields.album {
        tag.set_album(album.clone());
    }
    if let Some(album_artist) = &fields.album_artist {
        tag.set_album_artist(album_artist.clone());
    }

    tag.remove_data_of(&genre);
    for name in &fields.genres {
        tag.add_data(genre, Data::Utf8(name.clone()));
    }

    if let Some(cover) = &fields.cover {
        tag.remove_data_of(&artwork);
        if cover.is_png() {
            tag.add_data(artwork, Data::Png(cover.data.clone()));
        } else {
            tag.add_data(artwork, Data::Jpeg(cover.data.clone()));
        }
    }

    tag.write_to_path(path)?;
    Ok(())
}

// MP3, FLAC, OGG and Opus via lofty
fn write_standard(path: &Path, fields: &TrackFields) -> Result<()> {
    use lofty::config::WriteOptions;
    use lofty::picture::{MimeType, Picture, PictureType};
    use lofty::prelude::*;
    use lofty::probe::Probe;
    use lofty::tag::{ItemValue, Tag, TagItem};

    let mut tagged_file = Probe::open(path)?.read()?;

    if tagged_file.primary_tag().is_none() {
        let tag_type = tagged_file.primary_tag_type();
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .primary_tag_mut()
        .ok_or_else(|| anyhow::anyhow!("{} cannot hold tags", path.display()))?;

    tag.set_title(fields.title.clone());
    tag.set_artist(fields.artist.clone());
    if let Some(album) = &fields.album {
        tag.set_album(album.clone());
    }
    if let Some(album_artist) = &fields.album_artist {
        tag.remove_key(&ItemKey::AlbumArtist);
        tag.insert_text(ItemKey::AlbumArtist, album_artist.clone());
    }

    tag.remove_key(&ItemKey::Genre);
    for name in &fields.genres {
        tag.push(TagItem::new(ItemKey::Genre, ItemValue::Text(name.clone())));
    }

    if let Some(cover) = &fields.cover {
        let mime = if cover.is_png() { MimeType::Png } else { MimeType::Jpeg };
        let picture = Picture::new_unchecked(PictureType::CoverFront, Some(mime), None, cover.data.clone());
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(picture);
    }

    tagged_file.save_to_path(path, WriteOptions::default())?;
    Ok(())
}
