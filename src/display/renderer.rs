/*
 *  display/renderer.rs
 *
 *  InkStat - e-paper room status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Card renderer - draws the clock band and room cards
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

use core::convert::Infallible;
use embedded_graphics::mono_font::{ascii::{FONT_10X20, FONT_6X10}, iso_8859_1::FONT_9X18_BOLD, MonoFont, MonoTextStyle};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Polyline, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};

use crate::display::error::RenderError;
use crate::display::layout::Region;
use crate::display::surface::{MonoSurface, BACKGROUND, INK};
use crate::scene::{BoxContent, ClockValue, RoomReading};

/// Turns one region's content into pixels. Pure, never touches the device.
pub trait Renderer {
    /// Returns a surface exactly `region.width` x `region.height`
    fn render(&self, region: &Region, content: &BoxContent<'_>) -> Result<MonoSurface, RenderError>;
}

/// Pixels left blank below each band
const GAP: i32 = 3;
/// Horizontal inset of the room cards
const MARGIN: i32 = 4;
/// Size of the cut top-right corner
const CUT: i32 = 10;
/// Card outline thickness
const BORDER: u32 = 3;

/// Default renderer: inverted clock band and cut-corner room cards
#[derive(Debug, Clone, Default)]
pub struct CardRenderer;

impl CardRenderer {
    pub fn new() -> Self {
        Self
    }

    fn draw_clock(&self, s: &mut MonoSurface, clock: &ClockValue) -> Result<(), RenderError> {
        let (w, h) = (s.width() as i32, s.height() as i32);
        let font = &FONT_10X20;
        if text_width(font, clock.as_str()) > w {
            return Err(RenderError::Drawing(format!("clock text '{}' wider than {}px", clock, w)));
        }

        drawn(
            Rectangle::new(Point::zero(), Size::new(w as u32, (h - GAP).max(1) as u32))
                .into_styled(PrimitiveStyle::with_fill(INK))
                .draw(s),
        );

        let style = MonoTextStyle::new(font, BACKGROUND);
        let centred = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Middle)
            .build();
        drawn(Text::with_text_style(clock.as_str(), Point::new(w / 2, (h - GAP) / 2), style, centred).draw(s));
        Ok(())
    }

    fn draw_room(&self, s: &mut MonoSurface, room: &RoomReading) {
        let (w, h) = (s.width() as i32, s.height() as i32);
        let (left, right, bottom) = (MARGIN, w - MARGIN - 1, (h - GAP - 1).max(CUT));

        let outline = [
            Point::new(left, 0),
            Point::new(right - CUT, 0),
            Point::new(right, CUT),
            Point::new(right, bottom),
            Point::new(left, bottom),
            Point::new(left, 0),
        ];
        drawn(
            Polyline::new(&outline)
                .into_styled(PrimitiveStyle::with_stroke(INK, BORDER))
                .draw(s),
        );

        let inner = left + BORDER as i32 + 3;
        let top = TextStyleBuilder::new().baseline(Baseline::Top).build();
        let top_right = TextStyleBuilder::new()
            .baseline(Baseline::Top)
            .alignment(Alignment::Right)
            .build();
        let small = MonoTextStyle::new(&FONT_6X10, INK);
        let large = MonoTextStyle::new(&FONT_9X18_BOLD, INK);
        let right_edge = right - BORDER as i32 - 3;

        drawn(Text::with_text_style(&room.name, Point::new(inner, 5), small, top).draw(s));
        drawn(
            Text::with_text_style(&format!("{:.1}\u{b0}C", room.temperature), Point::new(inner, 17), large, top)
                .draw(s),
        );
        drawn(
            Text::with_text_style(&format!("{}%rh", room.humidity), Point::new(right_edge, 17), small, top_right)
                .draw(s),
        );
        drawn(
            Text::with_text_style(&format!("{}%bat", room.battery), Point::new(right_edge, 28), small, top_right)
                .draw(s),
        );
    }
}

impl Renderer for CardRenderer {
    fn render(&self, region: &Region, content: &BoxContent<'_>) -> Result<MonoSurface, RenderError> {
        if region.width == 0 || region.height == 0 {
            return Err(RenderError::EmptyRegion(region.id.to_string()));
        }
        let mut surface = MonoSurface::new(region.width, region.height);
        match content {
            BoxContent::Clock(clock) => self.draw_clock(&mut surface, clock)?,
            BoxContent::Room(room) => self.draw_room(&mut surface, room),
        }
        Ok(surface)
    }
}

fn text_width(font: &MonoFont<'_>, text: &str) -> i32 {
    let n = text.chars().count() as i32;
    n * (font.character_size.width + font.character_spacing) as i32
}

/// Unwrap a draw on an infallible target
fn drawn<T>(r: Result<T, Infallible>) -> T {
    match r {
        Ok(v) => v,
        Err(e) => match e {},
    }
}
