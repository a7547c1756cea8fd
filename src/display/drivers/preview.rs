/*
 *  display/drivers/preview.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Preview device - renders the panel to PBM files instead of e-paper
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use log::{debug, info};
use std::fs;
use std::path::PathBuf;

use crate::display::error::DisplayError;
use crate::display::layout::Region;
use crate::display::surface::MonoSurface;
use crate::display::traits::{check_window, DisplayCapabilities, DisplayDevice};

/// Keeps its own copy of the panel and writes it out as
/// `frame-NNNNN.pbm` after every successful write, so the update
/// sequence can be inspected without hardware.
#[derive(Debug)]
pub struct PreviewDevice {
    capabilities: DisplayCapabilities,
    dir: PathBuf,
    panel: MonoSurface,
    frames: u32,
}

impl PreviewDevice {
    pub fn new(dir: impl Into<PathBuf>, capabilities: DisplayCapabilities) -> Self {
        let panel = MonoSurface::new(capabilities.width, capabilities.height);
        Self {
            capabilities,
            dir: dir.into(),
            panel,
            frames: 0,
        }
    }

    /// Number of frames written so far
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Write `staged` out, then adopt it as the panel. A failed write
    /// leaves the panel as it was.
    fn commit(&mut self, staged: MonoSurface, what: &str) -> Result<(), DisplayError> {
        let path = self.dir.join(format!("frame-{:05}.pbm", self.frames));
        fs::write(&path, staged.to_pbm())?;
        debug!("Preview {} written to {}", what, path.display());
        self.panel = staged;
        self.frames += 1;
        Ok(())
    }
}

impl DisplayDevice for PreviewDevice {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| DisplayError::InitializationFailed(format!("{}: {}", self.dir.display(), e)))?;
        info!("Preview frames go to {}", self.dir.display());
        Ok(())
    }

    fn full_write(&mut self, frame: &MonoSurface) -> Result<(), DisplayError> {
        if !self.capabilities.supports_full_write {
            return Err(DisplayError::UnsupportedOperation);
        }
        if frame.len() != self.panel.len() {
            return Err(DisplayError::BufferSizeMismatch { expected: self.panel.len(), actual: frame.len() });
        }
        self.commit(frame.clone(), "full write")
    }

    fn windowed_write(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        surface: &MonoSurface,
    ) -> Result<(), DisplayError> {
        if !self.capabilities.supports_windowed_write {
            return Err(DisplayError::UnsupportedOperation);
        }
        check_window(&self.capabilities, x, y, width, height, surface)?;
        let mut staged = self.panel.clone();
        staged.blit(surface, x, y);
        self.commit(staged, "windowed write")
    }

    fn partial_image_write(&mut self, surface: &MonoSurface, region: &Region) -> Result<(), DisplayError> {
        if !self.capabilities.supports_partial_image {
            return Err(DisplayError::UnsupportedOperation);
        }
        check_window(&self.capabilities, region.x, region.y, region.width, region.height, surface)?;
        let mut staged = self.panel.clone();
        staged.blit(surface, region.x, region.y);
        self.commit(staged, "partial image")
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        info!("Preview device asleep after {} frames", self.frames);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::surface::INK;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("inkstat-preview-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_preview_writes_pbm_frames() {
        let dir = scratch_dir("frames");
        let caps = DisplayCapabilities {
            supports_windowed_write: true,
            ..DisplayCapabilities::full_only(16, 8)
        };
        let mut dev = PreviewDevice::new(&dir, caps);
        dev.init().unwrap();

        dev.full_write(&MonoSurface::new(16, 8)).unwrap();
        let mut patch = MonoSurface::new(8, 8);
        patch.fill(INK);
        dev.windowed_write(8, 0, 8, 8, &patch).unwrap();
        assert_eq!(dev.frames(), 2);

        let second = fs::read(dir.join("frame-00001.pbm")).unwrap();
        assert!(second.starts_with(b"P4\n16 8\n"));
        // right half inked: second byte of each row
        assert_eq!(&second[8..10], &[0x00, 0xFF]);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_preview_respects_capabilities() {
        let mut dev = PreviewDevice::new(scratch_dir("caps"), DisplayCapabilities::full_only(16, 8));
        assert_eq!(
            dev.windowed_write(0, 0, 8, 8, &MonoSurface::new(8, 8)),
            Err(DisplayError::UnsupportedOperation)
        );
    }

    #[test]
    fn test_failed_dump_keeps_panel() {
        let dir = scratch_dir("unwritable");
        let caps = DisplayCapabilities {
            supports_windowed_write: true,
            ..DisplayCapabilities::full_only(16, 8)
        };
        // init never ran, so the frame directory does not exist
        let mut dev = PreviewDevice::new(&dir, caps);
        let mut patch = MonoSurface::new(8, 8);
        patch.fill(INK);
        assert!(matches!(dev.windowed_write(0, 0, 8, 8, &patch), Err(DisplayError::Transport(_))));
        assert!(dev.full_write(&patch_frame()).is_err());
        assert_eq!(dev.panel.count_ink(), 0);
        assert_eq!(dev.frames(), 0);
    }

    fn patch_frame() -> MonoSurface {
        let mut frame = MonoSurface::new(16, 8);
        frame.fill(INK);
        frame
    }

    #[test]
    fn test_preview_init_fails_on_bad_dir() {
        let mut dev = PreviewDevice::new("/proc/inkstat/not-here", DisplayCapabilities::full_only(16, 8));
        assert!(matches!(dev.init(), Err(DisplayError::InitializationFailed(_))));
    }
}
