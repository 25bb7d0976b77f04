//! Frame sources feeding the pipeline.

use std::collections::VecDeque;
#[cfg(feature = "image")]
use std::path::{Path, PathBuf};
#[cfg(feature = "image")]
use std::time::Instant;

use tictac_core::{Frame, FrameError};

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("no images found in {dir}")]
    NoImages { dir: String },
}

/// Produces frames on demand. `Ok(None)` means the source is exhausted.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        (**self).next_frame()
    }
}

/// Pre-built frames, handed out in order.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<Frame>,
}

impl MemorySource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FromIterator<Frame> for MemorySource {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(feature = "image")]
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "pgm"];

/// Image files from a directory in file-name order, decoded to luma.
#[cfg(feature = "image")]
#[derive(Debug)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    looping: bool,
    started: Instant,
}

#[cfg(feature = "image")]
impl ImageSequenceSource {
    /// List `dir`; fails if it cannot be read or holds no images.
    pub fn open(dir: impl AsRef<Path>, looping: bool) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if path.is_file() && is_image {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(SourceError::NoImages {
                dir: dir.display().to_string(),
            });
        }
        paths.sort();
        log::info!("{} images in {}", paths.len(), dir.display());
        Ok(Self {
            paths,
            next: 0,
            looping,
            started: Instant::now(),
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

#[cfg(feature = "image")]
impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.next >= self.paths.len() {
            if !self.looping {
                return Ok(None);
            }
            self.next = 0;
        }
        let path = &self.paths[self.next];
        self.next += 1;
        log::debug!("reading {}", path.display());
        let img = image::open(path)?.to_luma8();
        let (w, h) = img.dimensions();
        let captured_at = self.started.elapsed();
        let frame = Frame::from_gray8(w as usize, h as usize, img.as_raw(), captured_at)?;
        Ok(Some(frame))
    }
}

/// Decode a single image file into a frame captured at time zero.
#[cfg(feature = "image")]
pub fn load_frame(path: impl AsRef<Path>) -> Result<Frame, SourceError> {
    let img = image::open(path)?.to_luma8();
    let (w, h) = img.dimensions();
    Ok(Frame::from_gray8(
        w as usize,
        h as usize,
        img.as_raw(),
        std::time::Duration::ZERO,
    )?)
}

/// Encode a gray image as PNG (or whatever `path`'s extension selects).
#[cfg(feature = "image")]
pub fn save_gray(img: &tictac_core::GrayImage, path: impl AsRef<Path>) -> Result<(), SourceError> {
    let buf = image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
        .ok_or(FrameError::InvalidBuffer {
            expected: img.width * img.height,
            got: img.data.len(),
        })?;
    buf.save(path)?;
    Ok(())
}
