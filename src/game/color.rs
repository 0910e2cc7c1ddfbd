//! Player color assignment

use rand::Rng;

/// Fixed palette tried before falling back to random colors
pub const PALETTE: [&str; 8] = [
    "#FF5733", // Orange-red
    "#33FF57", // Green
    "#3357FF", // Blue
    "#F3FF33", // Yellow
    "#FF33F3", // Pink
    "#33FFF3", // Cyan
    "#8333FF", // Purple
    "#FF8333", // Orange
];

/// Something that proposes candidate colors
pub trait ColorSource {
    fn draw(&mut self) -> String;
}

/// Uniform draw from [`PALETTE`]
pub struct PaletteSource<'a, R: Rng> {
    rng: &'a mut R,
}

impl<'a, R: Rng> PaletteSource<'a, R> {
    pub fn new(rng: &'a mut R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> ColorSource for PaletteSource<'_, R> {
    fn draw(&mut self) -> String {
        PALETTE[self.rng.gen_range(0..PALETTE.len())].to_string()
    }
}

/// Random `#RRGGBB` from independent channels
pub struct RgbSource<'a, R: Rng> {
    rng: &'a mut R,
}

impl<'a, R: Rng> RgbSource<'a, R> {
    pub fn new(rng: &'a mut R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> ColorSource for RgbSource<'_, R> {
    fn draw(&mut self) -> String {
        let [r, g, b]: [u8; 3] = self.rng.gen();
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    }
}

/// Draw from `source` until a color not `in_use` turns up, at most `max_attempts` times
pub fn pick_unique<S, F>(source: &mut S, in_use: F, max_attempts: usize) -> Option<String>
where
    S: ColorSource + ?Sized,
    F: Fn(&str) -> bool,
{
    (0..max_attempts)
        .map(|_| source.draw())
        .find(|candidate| !in_use(candidate))
}

/// First unused color scanning the whole 24-bit space; only `None` if every color is taken
pub fn first_free<F>(in_use: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    (0u32..=0xFF_FFFF)
        .map(|rgb| format!("#{:06X}", rgb))
        .find(|candidate| !in_use(candidate))
}

/// Full assignment policy: palette, then random channels, then a deterministic scan
pub fn assign<R, F>(rng: &mut R, in_use: F, max_attempts: usize) -> String
where
    R: Rng,
    F: Fn(&str) -> bool,
{
    if let Some(color) = pick_unique(&mut PaletteSource::new(rng), &in_use, max_attempts) {
        return color;
    }
    if let Some(color) = pick_unique(&mut RgbSource::new(rng), &in_use, max_attempts) {
        return color;
    }
    first_free(&in_use).unwrap_or_else(|| PALETTE[0].to_string())
}
