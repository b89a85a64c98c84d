//! # Input and Output Devices
//!
//! The capabilities the RPC components plug into. Real capture and display
//! live elsewhere; [`StillImageInput`] covers image files and image
//! directories.

use anyhow::{anyhow, Context as _, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::messages::Frame;
use crate::context::input_source::is_image_file;

/// Something frames can be read from.
pub trait InputDevice {
    /// Next frame, or `None` once the source is exhausted or failed.
    fn read(&mut self) -> Option<Frame>;

    /// Release the underlying resource.
    fn release(&mut self) {}
}

/// Something frames can be written to.
pub trait OutputDevice {
    fn write(&mut self, frame: Frame);

    fn stop(&mut self) {}
}

/// Reads a single image file, or every image of a directory in name order.
pub struct StillImageInput {
    paths: Vec<PathBuf>,
    next: usize,
    looping: bool,
}

impl StillImageInput {
    /// Open an image file or a directory of images.
    pub fn open(path: &Path, looping: bool) -> Result<Self> {
        let paths = if path.is_dir() {
            let mut paths: Vec<PathBuf> = fs::read_dir(path)
                .with_context(|| format!("cannot list {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image_file(p))
                .collect();
            paths.sort();
            paths
        } else {
            vec![path.to_path_buf()]
        };

        if paths.is_empty() {
            return Err(anyhow!("no images found in {}", path.display()));
        }
        debug!("StillImageInput: {} image(s) from {}", paths.len(), path.display());
        Ok(Self {
            paths,
            next: 0,
            looping,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl InputDevice for StillImageInput {
    fn read(&mut self) -> Option<Frame> {
        // Each image gets at most one attempt per call.
        for _ in 0..self.paths.len() {
            if self.next >= self.paths.len() {
                if !self.looping {
                    return None;
                }
                self.next = 0;
            }
            let path = &self.paths[self.next];
            self.next += 1;
            match image::open(path) {
                Ok(img) => return Some(Frame::from_image(&img)),
                Err(e) => warn!("Skipping unreadable image {}: {}", path.display(), e),
            }
        }
        None
    }

    fn release(&mut self) {
        self.next = self.paths.len();
        self.looping = false;
    }
}
