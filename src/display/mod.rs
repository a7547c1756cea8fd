/*
 *  display/mod.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - incremental e-paper updates
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod surface;
pub mod framebuffer;

// Region registry and change detection
pub mod layout;
pub mod dirty;

// Strategy selection and the update loop
pub mod probe;
pub mod renderer;
pub mod controller;

// Display devices
pub mod drivers;

// Re-exports for convenience
pub use traits::{BoxedDevice, DisplayCapabilities, DisplayDevice};
pub use error::{ControllerError, DisplayError, RenderError};
pub use surface::MonoSurface;
pub use framebuffer::ShadowFrame;
pub use layout::{LayoutConfig, Region, RegionId};
pub use dirty::DirtySet;
pub use probe::UpdateStrategy;
pub use renderer::{CardRenderer, Renderer};
pub use controller::{
    ControllerConfig, ControllerState, FailureKind, FullReason, TickAction, TickReport, UpdateController,
};
