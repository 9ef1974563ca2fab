use crate::{
    config,
    types::{Extent, Palette, ParticleSnapshot, Rgb},
};

pub const RAMP_LEN: usize = 6;

const GOLD: [Rgb; RAMP_LEN] = [
    Rgb(0xff, 0xfc, 0xeb),
    Rgb(0xfc, 0xe2, 0x77),
    Rgb(0xf4, 0xce, 0x42),
    Rgb(0xd4, 0xaf, 0x37),
    Rgb(0xb8, 0x94, 0x2b),
    Rgb(0x8c, 0x6e, 0x1a),
];

const GREEN: [Rgb; RAMP_LEN] = [
    Rgb(0xe1, 0xff, 0xf0),
    Rgb(0xa1, 0xff, 0xcf),
    Rgb(0x57, 0xf2, 0xa4),
    Rgb(0x00, 0xed, 0x64),
    Rgb(0x00, 0x9e, 0x4a),
    Rgb(0x00, 0x68, 0x4a),
];

pub const PLACEHOLDER_TEXT: &str = "Fast Descent Initializing...";
pub const PLACEHOLDER_COLOR: Rgb = Rgb(0x64, 0x74, 0x8b);
pub const FOCUS_COLOR: Rgb = Rgb(0xff, 0xff, 0xff);
const MARKER: char = '●';

pub fn ramp(palette: Palette) -> &'static [Rgb; RAMP_LEN] {
    match palette {
        Palette::Gold => &GOLD,
        Palette::Green => &GREEN,
    }
}

/// Ramp index for a count ratio in `[0, 1]`.
pub fn color_index(ratio: f32) -> usize {
    let scaled = (ratio.clamp(0.0, 1.0) * (RAMP_LEN - 1) as f32).floor();
    (scaled as usize).min(RAMP_LEN - 1)
}

pub fn particle_color(p: &ParticleSnapshot) -> Rgb {
    ramp(p.palette)[p.color_index.min(RAMP_LEN - 1)].scaled(p.opacity)
}

#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

#[derive(Clone, Copy, Debug)]
pub struct RenderCell {
    pub ch: char,
    pub depth: f32,
    pub color: Rgb,
}

const BLANK: RenderCell = RenderCell {
    ch: ' ',
    depth: f32::NEG_INFINITY,
    color: Rgb(0, 0, 0),
};

#[derive(Debug)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<RenderCell>,
}

impl FrameBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        let mut buffer = Self {
            width,
            height,
            cells: Vec::new(),
        };
        buffer.resize(width, height);
        buffer
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        let len = (width as usize).saturating_mul(height as usize);
        self.cells.resize(len, BLANK);
        self.clear();
    }

    pub fn clear(&mut self) {
        self.cells.fill(BLANK);
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn get(&self, x: u16, y: u16) -> RenderCell {
        debug_assert!(x < self.width && y < self.height, "get() out of bounds");
        let idx = (y as usize) * (self.width as usize) + (x as usize);
        self.cells[idx]
    }

    /// Writes a cell unless something deeper-priority already owns it.
    fn set(&mut self, x: i32, y: i32, ch: char, depth: f32, color: Rgb) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = (y as usize) * (self.width as usize) + (x as usize);
        let cell = &mut self.cells[idx];
        if depth >= cell.depth {
            cell.depth = depth;
            cell.ch = ch;
            cell.color = color;
        }
    }

    fn put_str(&mut self, x: i32, y: i32, text: &str, depth: f32, color: Rgb) {
        for (i, ch) in text.chars().enumerate() {
            self.set(x + i as i32, y, ch, depth, color);
        }
    }
}

/// Pixel extent covered by a viewport of terminal cells.
pub fn viewport_extent(viewport: Viewport) -> Extent {
    Extent::new(
        viewport.width as f32 * config::CELL_PX_W,
        viewport.height as f32 * config::CELL_PX_H,
    )
}

/// Projects particle snapshots into the frame buffer. Labels are centred on
/// the particle position; higher count ratios draw on top. An empty
/// snapshot renders the neutral placeholder instead.
pub fn draw(
    snapshot: &[ParticleSnapshot],
    focus: Option<usize>,
    viewport: Viewport,
    frame: &mut FrameBuffer,
) {
    if frame.width() != viewport.width || frame.height() != viewport.height {
        frame.resize(viewport.width, viewport.height);
    } else {
        frame.clear();
    }

    if snapshot.is_empty() {
        draw_placeholder(viewport, frame);
        return;
    }

    for (idx, p) in snapshot.iter().enumerate() {
        let label = format!("{MARKER} {}", p.text);
        let width = label.chars().count() as i32;
        let cx = (p.pos.x / config::CELL_PX_W).round() as i32;
        let cy = (p.pos.y / config::CELL_PX_H).floor() as i32;
        let x = cx - width / 2;

        let (color, depth) = if focus == Some(idx) {
            (FOCUS_COLOR, f32::MAX)
        } else {
            (particle_color(p), p.ratio)
        };
        frame.put_str(x, cy, &label, depth, color);
    }
}

fn draw_placeholder(viewport: Viewport, frame: &mut FrameBuffer) {
    let width = PLACEHOLDER_TEXT.chars().count() as i32;
    let x = (viewport.width as i32 - width) / 2;
    let y = viewport.height as i32 / 2;
    frame.put_str(x, y, PLACEHOLDER_TEXT, 0.0, PLACEHOLDER_COLOR);
}
