//! Dream style registry
//!
//! Order here is carousel order. Image categories produce a picture; the
//! text category produces a few lines rendered on a full screen.

/// What a style does with the photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleCategory {
    /// Re-render the whole photo in an artistic style.
    Art,
    /// Creative framing with text and layout.
    Frame,
    /// Keep the subject, replace the surroundings.
    Environment,
    /// Write about the photo instead of drawing it.
    Text,
}

/// One named transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    /// Short name used on the CLI, in file names and on screen.
    pub name: &'static str,
    /// Processing category.
    pub category: StyleCategory,
    /// Prompt handed to the transformer.
    pub prompt: &'static str,
}

impl Style {
    const fn new(name: &'static str, category: StyleCategory, prompt: &'static str) -> Self {
        Self { name, category, prompt }
    }

    /// True for the text category.
    pub fn is_text(&self) -> bool {
        self.category == StyleCategory::Text
    }

    /// True for categories that produce an image.
    pub fn is_image(&self) -> bool {
        !self.is_text()
    }

    /// Art and frame styles restyle the whole picture; environments only the background.
    pub fn restyles_subject(&self) -> bool {
        matches!(self.category, StyleCategory::Art | StyleCategory::Frame)
    }

    /// Full instruction for an image transformation.
    pub fn image_prompt(&self) -> String {
        if self.restyles_subject() {
            format!(
                "Transform this photo into: {}\n\n\
                 Keep the same composition, pose, and subject but completely change the \
                 artistic style. Make it look like an authentic piece in this style, not a filter.",
                self.prompt
            )
        } else {
            format!(
                "Take this photo and place the person into a new environment: {}\n\n\
                 Keep the person looking exactly the same: same face, same clothes, same pose, \
                 same expression. Only change the background around them. Make it look like a \
                 real photograph with matching lighting and shadows.",
                self.prompt
            )
        }
    }
}

use StyleCategory::{Art, Environment, Frame, Text};

/// Every style, in carousel order.
pub const STYLES: &[Style] = &[
    Style::new("clay", Art, "transform into a claymation character like Wallace and Gromit, smooth clay texture, stop-motion animation style, handcrafted look"),
    Style::new("pencil", Art, "detailed pencil sketch drawing, fine graphite lines, subtle shading, artist sketchbook style, hand-drawn"),
    Style::new("sharpie", Art, "bold black sharpie marker drawing, thick confident lines, high contrast, minimal detail, street art style"),
    Style::new("lineart", Art, "clean line art illustration, precise outlines, no shading, coloring book style, vector-like"),
    Style::new("charcoal", Art, "expressive charcoal drawing, smudged edges, dramatic shadows, fine art style, textured paper"),
    Style::new("watercolor", Art, "soft watercolor painting, flowing colors bleeding together, wet on wet technique, artistic"),
    Style::new("comic", Art, "comic book style, bold outlines, halftone dots, pop art colors, superhero illustration"),
    Style::new("pixel", Art, "retro pixel art, 16-bit video game style, blocky pixels, nostalgic gaming aesthetic"),
    Style::new("sculpture", Art, "classical marble sculpture, ancient Greek/Roman statue, carved stone, museum quality"),
    Style::new("woodcut", Art, "traditional woodblock print, bold black lines, vintage illustration style, old book aesthetic"),
    Style::new("wanted", Frame, "old west wanted poster on aged yellowed parchment, big bold text WANTED DEAD OR ALIVE at top, reward amount at bottom, rough sketch portrait style"),
    Style::new("card", Frame, "collectible trading card with ornate portrait frame, character stats and attributes along the bottom, name plate, holographic border, game card style"),
    Style::new("newspaper", Frame, "old-timey newspaper front page, large dramatic headline, grainy halftone photo, columns of text, vintage newsprint, The Daily Chronicle masthead"),
    Style::new("poster", Frame, "dramatic cinematic movie poster, epic lighting, movie title at bottom in bold typography, credits text, theatrical one-sheet style"),
    Style::new("album", Frame, "music album cover, artistic composition, band name text at top, album title, vinyl record aesthetic, iconic cover art style"),
    Style::new("lego", Art, "Lego minifigure version, plastic brick style, yellow skin, blocky proportions, Lego set box art aesthetic"),
    Style::new("stained", Art, "stained glass window design, lead lines between colored glass segments, cathedral window style, jewel tones, backlit glow"),
    Style::new("tattoo", Art, "traditional tattoo flash sheet, bold black outlines, classic American traditional tattoo style, banner with text, old school ink"),
    Style::new("victorian", Art, "daguerreotype portrait, sepia toned, formal Victorian-era pose, ornate oval frame, 1860s photography style, slight vignette"),
    Style::new("renaissance", Art, "classical Renaissance oil painting portrait, ornate gilded frame, Rembrandt lighting, rich dark background, Old Masters style"),
    Style::new("future", Art, "cyberpunk sci-fi portrait, neon accents, holographic elements, futuristic HUD overlay, digital glitch effects, year 2084 aesthetic"),
    Style::new("describe", Text, "Describe what you see in this photo in vivid, evocative detail. Write 2-3 sentences that paint a picture with words."),
    Style::new("poem", Text, "Write a short poem (4-8 lines) inspired by what you see in this photo. Be creative and evocative."),
    Style::new("haiku", Text, "Write a haiku (three lines: 5 syllables, 7 syllables, 5 syllables) inspired by this photo."),
    Style::new("roast", Text, "Write a funny, playful roast of what you see in this photo. Keep it lighthearted and good-natured. 1-2 sentences."),
    Style::new("fortune", Text, "Look at this photo and write a mysterious, cryptic fortune cookie prediction inspired by what you see. One sentence only."),
    Style::new("story", Text, "Write a 3-sentence flash fiction story inspired by this photo. Make it intriguing and complete."),
    Style::new("jungle", Environment, "dense tropical rainforest with lush green foliage, exotic plants, hanging vines, dappled sunlight through the canopy"),
    Style::new("underwater", Environment, "deep ocean scene with blue water, coral reefs, tropical fish swimming around, light rays from above, bubbles"),
    Style::new("city", Environment, "Times Square New York City at night with bright neon signs, yellow taxis, crowds of people, urban energy"),
    Style::new("space", Environment, "floating in outer space with Earth visible below, stars and galaxies in background, astronaut vibes"),
    Style::new("beach", Environment, "beautiful tropical beach at sunset, palm trees, golden sand, turquoise water, orange and pink sky"),
    Style::new("mountain", Environment, "top of a snowy mountain peak, dramatic clouds below, bright blue sky, epic alpine vista"),
    Style::new("mars", Environment, "surface of Mars with red rocky terrain, dusty atmosphere, distant mountains, alien landscape"),
    Style::new("tokyo", Environment, "neon-lit Tokyo street at night, Japanese signs, rain-slicked streets, cyberpunk atmosphere"),
    Style::new("safari", Environment, "African savanna at golden hour, acacia trees, distant elephants, dramatic sky, wild adventure"),
    Style::new("castle", Environment, "inside a grand medieval castle, stone walls, torches, red banners, dramatic lighting"),
];

/// Style selected at start-up.
pub const DEFAULT_STYLE: &str = "clay";

/// Look a style up by name.
pub fn find(name: &str) -> Option<&'static Style> {
    STYLES.iter().find(|s| s.name == name)
}

/// The default style.
pub fn default_style() -> &'static Style {
    find(DEFAULT_STYLE).unwrap_or(&STYLES[0])
}

/// Style after `current` in carousel order, wrapping around.
pub fn next_after(current: &Style) -> &'static Style {
    let index = STYLES.iter().position(|s| s.name == current.name).unwrap_or(0);
    &STYLES[(index + 1) % STYLES.len()]
}

/// All names, in carousel order.
pub fn names() -> impl Iterator<Item = &'static str> {
    STYLES.iter().map(|s| s.name)
}

/// clap value parser for `--style`.
pub fn parse_style(name: &str) -> Result<&'static Style, String> {
    find(name).ok_or_else(|| {
        let known: Vec<_> = names().collect();
        format!("unknown style '{name}' (known: {})", known.join(", "))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = names().collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_default_is_clay() {
        let style = default_style();
        assert_eq!(style.name, "clay");
        assert!(style.is_image());
        assert!(style.restyles_subject());
    }

    #[test]
    fn test_next_wraps() {
        let last = STYLES.last().unwrap();
        assert_eq!(next_after(last).name, "clay");
        assert_eq!(next_after(default_style()).name, "pencil");
    }

    #[test]
    fn test_categories() {
        assert!(find("haiku").unwrap().is_text());
        let jungle = find("jungle").unwrap();
        assert!(jungle.is_image());
        assert!(!jungle.restyles_subject());
        assert!(jungle.image_prompt().contains("new environment"));
        assert!(find("wanted").unwrap().image_prompt().starts_with("Transform this photo into"));
    }

    #[test]
    fn test_parse_style() {
        assert_eq!(parse_style("poem").unwrap().name, "poem");
        let err = parse_style("oil").unwrap_err();
        assert!(err.contains("clay"), "{err}");
    }
}
