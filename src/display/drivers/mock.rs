/*
 *  display/drivers/mock.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock display device for testing without hardware
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

use std::sync::{Arc, Mutex, MutexGuard};

use crate::display::error::DisplayError;
use crate::display::layout::{Region, RegionId};
use crate::display::surface::MonoSurface;
use crate::display::traits::{check_window, DisplayCapabilities, DisplayDevice};

/// Mock display device
///
/// Simulates a panel without hardware. Useful for:
/// - Unit tests
/// - Integration tests
/// - Dry runs of the update loop
///
/// Every operation is recorded in a shared state that tests keep a handle
/// to after the device has been boxed and handed to the controller.
#[derive(Debug, Clone)]
pub struct MockDevice {
    /// Shared state for testing
    state: Arc<Mutex<MockDeviceState>>,

    /// Capabilities as of the last init
    capabilities: DisplayCapabilities,
}

/// Internal state for the mock device (shared for inspection in tests)
#[derive(Debug)]
pub struct MockDeviceState {
    /// What the panel currently shows
    pub panel: MonoSurface,

    /// Number of times init() was called
    pub init_count: usize,

    /// Successful full writes
    pub full_writes: usize,

    /// Successful windowed writes
    pub windowed_writes: usize,

    /// Successful partial image writes
    pub partial_image_writes: usize,

    /// Number of times sleep() was called
    pub sleep_count: usize,

    /// Regions written partially, in order, where the window is known
    pub written_regions: Vec<RegionId>,

    /// Every window written with windowed_write, as (x, y, width, height)
    pub written_windows: Vec<(u32, u32, u32, u32)>,

    /// Known layout, used to name windows
    pub regions: Vec<Region>,

    /// Every write call, including failed ones
    pub write_attempts: usize,

    /// Fail this many upcoming write calls of any kind
    pub fail_next_writes: usize,

    /// Fail every write touching this region
    pub fail_region: Option<RegionId>,

    /// Simulate init failure
    pub simulate_init_failure: bool,

    /// Capabilities to report after the next init, as a reset device might
    pub capabilities_after_init: Option<DisplayCapabilities>,
}

impl MockDeviceState {
    /// Successful writes of any kind
    pub fn total_writes(&self) -> usize {
        self.full_writes + self.windowed_writes + self.partial_image_writes
    }
}

impl MockDevice {
    /// Create a mock device with the given capability surface
    pub fn with_capabilities(capabilities: DisplayCapabilities) -> Self {
        let state = MockDeviceState {
            panel: MonoSurface::new(capabilities.width, capabilities.height),
            init_count: 0,
            full_writes: 0,
            windowed_writes: 0,
            partial_image_writes: 0,
            sleep_count: 0,
            written_regions: Vec::new(),
            written_windows: Vec::new(),
            regions: Vec::new(),
            write_attempts: 0,
            fail_next_writes: 0,
            fail_region: None,
            simulate_init_failure: false,
            capabilities_after_init: None,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            capabilities,
        }
    }

    /// Only full frame writes
    pub fn full_only(width: u32, height: u32) -> Self {
        Self::with_capabilities(DisplayCapabilities::full_only(width, height))
    }

    /// Full and windowed writes
    pub fn windowed(width: u32, height: u32) -> Self {
        Self::with_capabilities(DisplayCapabilities {
            supports_windowed_write: true,
            ..DisplayCapabilities::full_only(width, height)
        })
    }

    /// Full writes plus the partial image call
    pub fn partial_image(width: u32, height: u32) -> Self {
        Self::with_capabilities(DisplayCapabilities {
            supports_partial_image: true,
            ..DisplayCapabilities::full_only(width, height)
        })
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockDeviceState>> {
        Arc::clone(&self.state)
    }

    /// Copy of what the panel shows
    pub fn panel(&self) -> MonoSurface {
        self.lock().panel.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockDeviceState> {
        // a test that panicked while holding the lock already failed
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Tell the mock which windows belong to which region
    pub fn set_regions(&self, regions: &[Region]) {
        self.lock().regions = regions.to_vec();
    }

    /// Count the attempt and decide whether it fails
    fn attempt<'a>(
        mut state: MutexGuard<'a, MockDeviceState>,
        target: Option<RegionId>,
    ) -> Result<MutexGuard<'a, MockDeviceState>, DisplayError> {
        state.write_attempts += 1;
        if state.fail_next_writes > 0 {
            state.fail_next_writes -= 1;
            return Err(DisplayError::Transport("simulated write failure".to_string()));
        }
        if target.is_some() && state.fail_region == target {
            return Err(DisplayError::Transport(format!(
                "simulated failure of {}",
                target.map(|t| t.to_string()).unwrap_or_default()
            )));
        }
        Ok(state)
    }

    /// Name a window by matching it against the regions the test
    /// registered; a whole-panel window is the panel
    fn window_id(&self, state: &MockDeviceState, x: u32, y: u32, width: u32, height: u32) -> Option<RegionId> {
        if (x, y, width, height) == (0, 0, self.capabilities.width, self.capabilities.height) {
            return Some(RegionId::Panel);
        }
        state
            .regions
            .iter()
            .find(|r| (r.x, r.y, r.width, r.height) == (x, y, width, height))
            .map(|r| r.id)
    }
}

impl DisplayDevice for MockDevice {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let next = {
            let mut state = self.lock();
            if state.simulate_init_failure {
                return Err(DisplayError::InitializationFailed("simulated init failure".to_string()));
            }
            state.init_count += 1;
            state.capabilities_after_init.take()
        };
        if let Some(caps) = next {
            self.capabilities = caps;
        }
        Ok(())
    }

    fn full_write(&mut self, frame: &MonoSurface) -> Result<(), DisplayError> {
        if !self.capabilities.supports_full_write {
            return Err(DisplayError::UnsupportedOperation);
        }
        let expected = (self.capabilities.width * self.capabilities.height) as usize;
        if frame.len() != expected {
            return Err(DisplayError::BufferSizeMismatch { expected, actual: frame.len() });
        }
        let mut state = Self::attempt(self.lock(), Some(RegionId::Panel))?;
        state.panel = frame.clone();
        state.full_writes += 1;
        Ok(())
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
        let state = self.lock();
        let target = self.window_id(&state, x, y, width, height);
        let mut state = Self::attempt(state, target)?;
        state.panel.blit(surface, x, y);
        state.windowed_writes += 1;
        state.written_windows.push((x, y, width, height));
        if let Some(id) = target {
            state.written_regions.push(id);
        }
        Ok(())
    }

    fn partial_image_write(&mut self, surface: &MonoSurface, region: &Region) -> Result<(), DisplayError> {
        if !self.capabilities.supports_partial_image {
            return Err(DisplayError::UnsupportedOperation);
        }
        check_window(&self.capabilities, region.x, region.y, region.width, region.height, surface)?;
        let mut state = Self::attempt(self.lock(), Some(region.id))?;
        state.panel.blit(surface, region.x, region.y);
        state.partial_image_writes += 1;
        state.written_regions.push(region.id);
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        if !self.capabilities.supports_sleep {
            return Err(DisplayError::UnsupportedOperation);
        }
        self.lock().sleep_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::surface::INK;

    fn inked(width: u32, height: u32) -> MonoSurface {
        let mut s = MonoSurface::new(width, height);
        s.fill(INK);
        s
    }

    #[test]
    fn test_mock_device_init() {
        let mut dev = MockDevice::full_only(16, 8);
        let state = dev.state();
        assert_eq!(state.lock().unwrap().init_count, 0);
        dev.init().unwrap();
        assert_eq!(state.lock().unwrap().init_count, 1);
    }

    #[test]
    fn test_mock_device_full_write() {
        let mut dev = MockDevice::full_only(16, 8);
        dev.full_write(&inked(16, 8)).unwrap();
        assert_eq!(dev.panel().count_ink(), 128);
        assert_eq!(dev.state().lock().unwrap().full_writes, 1);
    }

    #[test]
    fn test_mock_device_full_write_size_mismatch() {
        let mut dev = MockDevice::full_only(16, 8);
        assert!(matches!(
            dev.full_write(&inked(8, 8)),
            Err(DisplayError::BufferSizeMismatch { expected: 128, actual: 64 })
        ));
    }

    #[test]
    fn test_mock_device_unsupported_operations() {
        let mut dev = MockDevice::full_only(16, 8);
        assert_eq!(dev.windowed_write(0, 0, 4, 4, &inked(4, 4)), Err(DisplayError::UnsupportedOperation));
        let region = Region { id: RegionId::Clock, x: 0, y: 0, width: 4, height: 4 };
        assert_eq!(dev.partial_image_write(&inked(4, 4), &region), Err(DisplayError::UnsupportedOperation));
    }

    #[test]
    fn test_mock_device_windowed_write() {
        let mut dev = MockDevice::windowed(16, 8);
        dev.windowed_write(4, 2, 4, 4, &inked(4, 4)).unwrap();
        let panel = dev.panel();
        assert_eq!(panel.count_ink(), 16);
        assert_eq!(panel.pixel(4, 2), Some(INK));
        assert!(dev.windowed_write(14, 0, 4, 4, &inked(4, 4)).is_err());
        assert_eq!(dev.state().lock().unwrap().written_windows, vec![(4, 2, 4, 4)]);
    }

    #[test]
    fn test_mock_device_names_known_windows() {
        let mut dev = MockDevice::windowed(16, 8);
        let room = Region { id: RegionId::Room(1), x: 0, y: 4, width: 16, height: 4 };
        dev.set_regions(&[room]);
        dev.state().lock().unwrap().fail_region = Some(RegionId::Room(1));
        assert!(dev.windowed_write(0, 4, 16, 4, &inked(16, 4)).is_err());
        assert!(dev.windowed_write(0, 0, 16, 4, &inked(16, 4)).is_ok());
        assert!(dev.windowed_write(0, 0, 16, 8, &inked(16, 8)).is_ok());
        assert_eq!(dev.state().lock().unwrap().written_regions, vec![RegionId::Panel]);
    }

    #[test]
    fn test_mock_device_partial_image_write() {
        let mut dev = MockDevice::partial_image(16, 8);
        let region = Region { id: RegionId::Room(0), x: 0, y: 4, width: 16, height: 4 };
        dev.partial_image_write(&inked(16, 4), &region).unwrap();
        let state = dev.state();
        let state = state.lock().unwrap();
        assert_eq!(state.written_regions, vec![RegionId::Room(0)]);
        assert_eq!(state.panel.count_ink(), 64);
    }

    #[test]
    fn test_mock_device_simulated_failures() {
        let mut dev = MockDevice::full_only(16, 8);
        dev.state().lock().unwrap().fail_next_writes = 1;
        assert!(matches!(dev.full_write(&inked(16, 8)), Err(DisplayError::Transport(_))));
        assert!(dev.full_write(&inked(16, 8)).is_ok());
        assert_eq!(dev.state().lock().unwrap().write_attempts, 2);
    }

    #[test]
    fn test_mock_device_fail_region() {
        let mut dev = MockDevice::partial_image(16, 8);
        dev.state().lock().unwrap().fail_region = Some(RegionId::Room(1));
        let region = Region { id: RegionId::Room(1), x: 0, y: 4, width: 16, height: 4 };
        assert!(dev.partial_image_write(&inked(16, 4), &region).is_err());
        assert!(dev.full_write(&inked(16, 8)).is_ok());
    }

    #[test]
    fn test_mock_device_capabilities_change_on_init() {
        let mut dev = MockDevice::windowed(16, 8);
        dev.state().lock().unwrap().capabilities_after_init = Some(DisplayCapabilities::full_only(16, 8));
        dev.init().unwrap();
        assert!(!dev.capabilities().supports_windowed_write);
    }
}
