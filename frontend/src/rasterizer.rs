//! Software renderer for Mathbox display lists.
//!
//! Batches are drawn onto a persistent screen buffer: a batch tagged erase
//! clears it first, otherwise it draws over the previous picture. Vertices
//! are in view space (world units, +z into the screen, +y down) and are
//! projected through a 45 degree vertical field of view.

use irobot_core::device::display_list::{DisplayList, DisplayListQueue, RenderMode, Vertex};
use irobot_core::device::mathbox::fixed::Vector3;
use irobot_core::device::palette::Rgb;
use log::trace;

/// World units per camera unit.
const WORLD_SCALE: f32 = 128.0;
/// Distance from the eye to the view-space origin, in camera units.
const EYE_DISTANCE: f32 = 1.0;
const NEAR: f32 = 0.1;
/// Vertical field of view in degrees.
const FOV: f32 = 45.0;
/// The picture sits slightly below the optical center (fraction of height).
const CENTER_DROP: f32 = 0.05;

pub struct Rasterizer {
    width: usize,
    height: usize,
    screen: Vec<u8>,
    focal: f32,
}

impl Rasterizer {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width as usize, height as usize);
        Self {
            width,
            height,
            screen: vec![0; width * height * 3],
            focal: (height as f32 / 2.0) / (FOV.to_radians() / 2.0).tan(),
        }
    }

    /// Draw every pending batch and hand each back to the pool. Returns
    /// how many batches were drawn.
    pub fn drain(&mut self, queue: &DisplayListQueue) -> usize {
        let mut drawn = 0;
        while let Some(list) = queue.dequeue() {
            self.draw(&list);
            queue.recycle(list);
            drawn += 1;
        }
        drawn
    }

    pub fn draw(&mut self, list: &DisplayList) {
        if list.erase() {
            self.screen.fill(0);
        }
        trace!("rasterize: {} primitives, erase={}", list.len(), list.erase());
        for (mode, vertices) in list.iter() {
            match mode {
                RenderMode::Dot => vertices.iter().for_each(|v| self.dot(v)),
                RenderMode::Vector => self.polyline(vertices),
                RenderMode::Polygon => self.polygon(vertices),
            }
        }
    }

    /// Copy the screen into an RGB24 frame of the same size.
    pub fn compose(&self, frame: &mut [u8]) {
        let n = frame.len().min(self.screen.len());
        frame[..n].copy_from_slice(&self.screen[..n]);
    }

    pub fn screen(&self) -> &[u8] {
        &self.screen
    }

    /// Screen position of a view-space point, or `None` behind the near plane.
    pub fn project(&self, p: Vector3) -> Option<(f32, f32)> {
        let depth = p.z as f32 / WORLD_SCALE + EYE_DISTANCE;
        if depth < NEAR {
            return None;
        }
        let scale = self.focal / (depth * WORLD_SCALE);
        let x = self.width as f32 / 2.0 + p.x as f32 * scale;
        let y = self.height as f32 * (0.5 + CENTER_DROP) + p.y as f32 * scale;
        Some((x, y))
    }

    fn plot(&mut self, x: i32, y: i32, rgb: Rgb) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let p = (y as usize * self.width + x as usize) * 3;
        self.screen[p..p + 3].copy_from_slice(&[rgb.r, rgb.g, rgb.b]);
    }

    fn dot(&mut self, v: &Vertex) {
        if let Some((x, y)) = self.project(v.position) {
            self.plot(x.round() as i32, y.round() as i32, v.color);
        }
    }

    fn polyline(&mut self, vertices: &[Vertex]) {
        for pair in vertices.windows(2) {
            let ends = (self.project(pair[0].position), self.project(pair[1].position));
            if let (Some(a), Some(b)) = ends {
                self.line(a, b, pair[0].color);
            }
        }
    }

    /// Bresenham, both endpoints inclusive.
    fn line(&mut self, a: (f32, f32), b: (f32, f32), rgb: Rgb) {
        let clamp = |v: f32| v.round().clamp(-32768.0, 32767.0) as i32;
        let (mut x0, mut y0) = (clamp(a.0), clamp(a.1));
        let (x1, y1) = (clamp(b.0), clamp(b.1));
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.plot(x0, y0, rgb);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Even-odd scanline fill sampled at pixel centers. A polygon with any
    /// vertex behind the near plane is skipped.
    fn polygon(&mut self, vertices: &[Vertex]) {
        let Some(points) = vertices
            .iter()
            .map(|v| self.project(v.position))
            .collect::<Option<Vec<_>>>()
        else {
            return;
        };
        let rgb = vertices[0].color;

        let top = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let bottom = points.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
        let first_row = top.floor().max(0.0) as usize;
        let last_row = (bottom.ceil().max(0.0) as usize).min(self.height);

        let mut crossings = Vec::with_capacity(points.len());
        for row in first_row..last_row {
            let yc = row as f32 + 0.5;
            crossings.clear();
            for (i, &(xa, ya)) in points.iter().enumerate() {
                let (xb, yb) = points[(i + 1) % points.len()];
                if (ya <= yc) != (yb <= yc) {
                    crossings.push(xa + (yc - ya) * (xb - xa) / (yb - ya));
                }
            }
            crossings.sort_by(f32::total_cmp);
            for span in crossings.chunks_exact(2) {
                let from = (span[0] - 0.5).ceil().max(0.0) as usize;
                let to = ((span[1] - 0.5).floor() + 1.0).clamp(0.0, self.width as f32) as usize;
                for x in from..to {
                    self.plot(x as i32, row as i32, rgb);
                }
            }
        }
    }
}
