//! Screen layouts
//!
//! Everything here is pure: layouts draw into a [`Canvas`] and come back as
//! 8-bit grayscale images sized for the panel. Sending them is the caller's
//! business.
//!
//! Mono fonts are tiny on a 1872-pixel panel, so text screens are laid out
//! on a coarse logical grid and every logical pixel becomes a
//! `scale`×`scale` block.

use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10, FONT_8X13};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::{Gray8, GrayColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Arc, Circle, Line, PrimitiveStyle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use image::{GrayImage, Luma};
use platform::WHITE;

/// Logical width text screens are designed for.
const LAYOUT_WIDTH: u32 = 400;

/// Grayscale draw target backed by an [`image::GrayImage`].
#[derive(Debug, Clone)]
pub struct Canvas {
    image: GrayImage,
    scale: u32,
}

impl Canvas {
    /// White canvas, one logical pixel per device pixel.
    pub fn new(width: u32, height: u32) -> Self {
        Self::scaled(width, height, 1)
    }

    /// White canvas where each logical pixel covers `scale`×`scale` device pixels.
    pub fn scaled(width: u32, height: u32, scale: u32) -> Self {
        Self {
            image: GrayImage::from_pixel(width, height, Luma([WHITE])),
            scale: scale.max(1),
        }
    }

    /// Device pixels per logical pixel along each axis.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Finished image at device resolution.
    pub fn into_image(self) -> GrayImage {
        self.image
    }
}

impl DrawTarget for Canvas {
    type Color = Gray8;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = self.image.dimensions();
        for Pixel(point, color) in pixels {
            let (Ok(lx), Ok(ly)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            let (x0, y0) = (lx * self.scale, ly * self.scale);
            for y in y0..(y0 + self.scale).min(height) {
                for x in x0..(x0 + self.scale).min(width) {
                    self.image.put_pixel(x, y, Luma([color.luma()]));
                }
            }
        }
        Ok(())
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        let (width, height) = self.image.dimensions();
        Size::new(width / self.scale, height / self.scale)
    }
}

fn finish(canvas: Canvas, drawn: Result<(), core::convert::Infallible>) -> GrayImage {
    match drawn {
        Ok(()) => canvas.into_image(),
        Err(never) => match never {},
    }
}

fn text_scale(width: u32) -> u32 {
    (width / LAYOUT_WIDTH).max(1)
}

fn centered<'a>(text: &'a str, at: Point, font: &'a MonoFont<'a>, luma: u8) -> Text<'a, MonoTextStyle<'a, Gray8>> {
    let style = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();
    Text::with_text_style(text, at, MonoTextStyle::new(font, Gray8::new(luma)), style)
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// One spinner frame: a light ring with a dark quarter arc rotated by
/// `frame * 45` degrees.
pub fn spinner_frame(size: u32, frame: u32) -> GrayImage {
    let mut canvas = Canvas::new(size, size);
    let drawn = draw_spinner(&mut canvas, size, frame);
    finish(canvas, drawn)
}

fn draw_spinner<D: DrawTarget<Color = Gray8>>(target: &mut D, size: u32, frame: u32) -> Result<(), D::Error> {
    let center = Point::new(to_i32(size / 2), to_i32(size / 2));
    let diameter = size * 2 / 3;
    Circle::with_center(center, diameter)
        .into_styled(PrimitiveStyle::with_stroke(Gray8::new(180), 6))
        .draw(target)?;

    let start = ((frame % 8) * 45) as f32;
    Arc::with_center(center, diameter, start.deg(), 90.0_f32.deg())
        .into_styled(PrimitiveStyle::with_stroke(Gray8::BLACK, 8))
        .draw(target)?;
    Ok(())
}

/// Centered title with optional subtitle and body line.
pub fn text_screen(width: u32, height: u32, title: &str, subtitle: Option<&str>, body: Option<&str>) -> GrayImage {
    let mut canvas = Canvas::scaled(width, height, text_scale(width));
    let drawn = draw_text_screen(&mut canvas, title, subtitle, body);
    finish(canvas, drawn)
}

fn draw_text_screen<D: DrawTarget<Color = Gray8>>(
    target: &mut D,
    title: &str,
    subtitle: Option<&str>,
    body: Option<&str>,
) -> Result<(), D::Error> {
    let size = target.bounding_box().size;
    let cx = to_i32(size.width / 2);
    let mut y = to_i32(size.height / 2);
    if subtitle.is_some() || body.is_some() {
        y -= 20;
    }

    centered(title, Point::new(cx, y), &FONT_10X20, 0).draw(target)?;
    if let Some(subtitle) = subtitle {
        centered(subtitle, Point::new(cx, y + 25), &FONT_8X13, 60).draw(target)?;
    }
    if let Some(body) = body {
        centered(body, Point::new(cx, y + 45), &FONT_6X10, 100).draw(target)?;
    }
    Ok(())
}

/// Generated text under an upper-case style title, word-wrapped.
pub fn text_result(width: u32, height: u32, style_name: &str, text: &str) -> GrayImage {
    let mut canvas = Canvas::scaled(width, height, text_scale(width));
    let drawn = draw_text_result(&mut canvas, style_name, text);
    finish(canvas, drawn)
}

fn draw_text_result<D: DrawTarget<Color = Gray8>>(target: &mut D, style_name: &str, text: &str) -> Result<(), D::Error> {
    let size = target.bounding_box().size;
    let margin = 25;
    let title = style_name.to_uppercase();

    let title_y = 20;
    centered(&title, Point::new(to_i32(size.width / 2), title_y), &FONT_10X20, 0).draw(target)?;

    let divider_y = title_y + 14;
    Line::new(
        Point::new(margin, divider_y),
        Point::new(to_i32(size.width) - margin, divider_y),
    )
    .into_styled(PrimitiveStyle::with_stroke(Gray8::new(120), 1))
    .draw(target)?;

    let font = &FONT_8X13;
    let line_height = to_i32(font.character_size.height) + 2;
    let usable = size.width.saturating_sub(2 * margin.unsigned_abs());
    let max_chars = (usable / font.character_size.width).max(1) as usize;
    let bottom = to_i32(size.height) - 10;

    let style = MonoTextStyle::new(font, Gray8::new(30));
    let mut y = divider_y + 10;
    for line in wrap_text(text, max_chars) {
        if y + line_height > bottom {
            break;
        }
        Text::with_baseline(&line, Point::new(margin, y), style, Baseline::Top).draw(target)?;
        y += line_height;
    }
    Ok(())
}

/// Vertical carousel: the previous entry faded above, the current one
/// large with a short description, the next one faded below.
pub fn carousel(width: u32, height: u32, names: &[&str], descriptions: &[&str], current: usize) -> GrayImage {
    let mut canvas = Canvas::scaled(width, height, text_scale(width));
    let drawn = draw_carousel(&mut canvas, names, descriptions, current);
    finish(canvas, drawn)
}

fn draw_carousel<D: DrawTarget<Color = Gray8>>(
    target: &mut D,
    names: &[&str],
    descriptions: &[&str],
    current: usize,
) -> Result<(), D::Error> {
    if names.is_empty() {
        return Ok(());
    }
    let size = target.bounding_box().size;
    let total = names.len();
    let current = current % total;
    let prev = (current + total - 1) % total;
    let next = (current + 1) % total;

    let cx = to_i32(size.width / 2);
    let cy = to_i32(size.height / 2);
    let inset = to_i32(size.width / 6);
    let rule = PrimitiveStyle::with_stroke(Gray8::new(160), 1);

    centered(&names[prev].to_uppercase(), Point::new(cx, cy - 62), &FONT_8X13, 180).draw(target)?;
    Line::new(Point::new(inset, cy - 38), Point::new(to_i32(size.width) - inset, cy - 38))
        .into_styled(rule)
        .draw(target)?;

    centered(&names[current].to_uppercase(), Point::new(cx, cy - 8), &FONT_10X20, 0).draw(target)?;
    if let Some(description) = descriptions.get(current) {
        let short = truncate(description, 55);
        centered(&short, Point::new(cx, cy + 18), &FONT_6X10, 100).draw(target)?;
    }

    Line::new(Point::new(inset, cy + 38), Point::new(to_i32(size.width) - inset, cy + 38))
        .into_styled(rule)
        .draw(target)?;
    centered(&names[next].to_uppercase(), Point::new(cx, cy + 62), &FONT_8X13, 180).draw(target)?;
    Ok(())
}

/// Full-width band with one centered word, for brief status feedback.
pub fn overlay_band(width: u32, band_height: u32, text: &str) -> GrayImage {
    let mut canvas = Canvas::scaled(width, band_height, text_scale(width));
    let drawn = {
        let size = canvas.bounding_box().size;
        let at = Point::new(to_i32(size.width / 2), to_i32(size.height / 2));
        centered(text, at, &FONT_10X20, 0).draw(&mut canvas).map(|_| ())
    };
    finish(canvas, drawn)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let mut short: String = text.chars().take(max_chars).collect();
    short.push_str("...");
    short
}

/// Greedy word wrap at `max_chars` columns.
///
/// Paragraph breaks survive as empty lines; a word longer than a line is
/// placed on its own line unbroken.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut words = paragraph.split_whitespace();
        let Some(first) = words.next() else {
            lines.push(String::new());
            continue;
        };
        let mut line = first.to_owned();
        for word in words {
            if line.chars().count() + 1 + word.chars().count() <= max_chars {
                line.push(' ');
                line.push_str(word);
            } else {
                lines.push(std::mem::replace(&mut line, word.to_owned()));
            }
        }
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::BLACK;

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
    }

    #[test]
    fn test_wrap_keeps_paragraphs_and_long_words() {
        let lines = wrap_text("one\n\nsupercalifragilistic two", 8);
        assert_eq!(lines, vec!["one", "", "supercalifragilistic", "two"]);
    }

    #[test]
    fn test_spinner_frame_has_ring_and_arc() {
        let frame = spinner_frame(120, 0);
        assert_eq!(frame.dimensions(), (120, 120));
        assert_eq!(frame.get_pixel(0, 0).0[0], WHITE);
        assert!(frame.pixels().any(|p| p.0[0] == 180));
        assert!(frame.pixels().any(|p| p.0[0] == BLACK));
    }

    #[test]
    fn test_spinner_rotates() {
        assert_ne!(spinner_frame(120, 0), spinner_frame(120, 1));
        // Eight steps of 45 degrees are a full turn.
        assert_eq!(spinner_frame(120, 3), spinner_frame(120, 11));
    }

    #[test]
    fn test_scaled_canvas_draws_blocks() {
        let mut canvas = Canvas::scaled(8, 8, 4);
        assert_eq!(canvas.size(), Size::new(2, 2));
        Pixel(Point::new(1, 0), Gray8::BLACK).draw(&mut canvas).ok();
        Pixel(Point::new(-1, 0), Gray8::BLACK).draw(&mut canvas).ok();
        let image = canvas.into_image();
        assert_eq!(image.get_pixel(4, 0).0[0], BLACK);
        assert_eq!(image.get_pixel(7, 3).0[0], BLACK);
        assert_eq!(image.get_pixel(3, 0).0[0], WHITE);
        assert_eq!(image.get_pixel(4, 4).0[0], WHITE);
    }

    #[test]
    fn test_text_screens_fill_the_panel() {
        let screen = text_screen(1872, 1404, "Capture", Some("Press to capture"), None);
        assert_eq!(screen.dimensions(), (1872, 1404));
        assert!(screen.pixels().any(|p| p.0[0] == BLACK));

        let result = text_result(1872, 1404, "haiku", "old pond\nfrog leaps in\nsplash");
        assert_eq!(result.dimensions(), (1872, 1404));
        assert!(result.pixels().any(|p| p.0[0] == BLACK));
    }

    #[test]
    fn test_carousel_and_overlay() {
        let image = carousel(800, 600, &["a", "b", "c"], &["first", "second", "third"], 4);
        assert_eq!(image.dimensions(), (800, 600));
        assert!(image.pixels().any(|p| p.0[0] == BLACK));

        let band = overlay_band(800, 160, "Paused");
        assert_eq!(band.dimensions(), (800, 160));
        assert!(band.pixels().any(|p| p.0[0] == BLACK));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 55), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
