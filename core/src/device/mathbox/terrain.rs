//! Playfield (terrain) generation.
//!
//! The playfield is a 32-row circular table of 16 tile words per row at
//! word 0x0E00. Rows are drawn from `z_max` toward `z_min`; inside a row the
//! tiles left of the camera are drawn outside-in from the left, then the
//! rest outside-in from the right.
//!
//! Tile word:
//!
//! ```text
//! hhhhhhhh ofcccccc
//! |        ||\_____ color index
//! |        | \_____ 1 = flat, 0 = sloped (corners from neighbours)
//! |        \_______ an object list belongs to this tile's row
//! \________________ signed height, 4 world units per step
//! ```
//!
//! `0x80xx` is an empty tile.

use super::fixed::{Matrix3, Vector3};
use super::interpreter::{Interpreter, VIEW_MATRIX};
use crate::device::display_list::RenderMode;

pub const TILE_TABLE: u16 = 0x0E00;
pub const TILE_SIZE_X: i32 = 128;
pub const TILE_SIZE_Y: i32 = 256;
pub const TILE_SIZE_Z: i32 = 128;

const ROWS: i32 = 32;
const TILES_PER_ROW: i32 = 15;

// Terrain globals.
const OBJECT_LIST: u16 = 0x6B;
const Z_MAX: u16 = 0x6C;
const Z_MIN: u16 = 0x6D;
const RENDER_MODE: u16 = 0x72;
const X_POSITION: u16 = 0x74;
const Z_FRACTION: u16 = 0x75;
const X_OFFSET: u16 = 0x76;
const Z_OFFSET: u16 = 0x77;

const TILE_COLOR: u16 = 0x003F;
const TILE_FLAT: u16 = 0x0040;
const TILE_HOLDS_OBJECT: u16 = 0x0080;

fn is_empty(tile: u16) -> bool {
    tile & 0xFF00 == 0x8000
}

fn is_flat(tile: u16) -> bool {
    tile & TILE_FLAT != 0
}

fn raw_height(tile: u16) -> i32 {
    ((tile >> 8) as u8 as i8 as i32) << 2
}

/// Corner heights of a tile top, as seen from the camera.
///
/// ```text
///    d +-------+ c
///     /       /
///  a +-------+ b
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Heights {
    a: i32,
    b: i32,
    c: i32,
    d: i32,
}

impl Heights {
    fn level(h: i32) -> Self {
        Self { a: h, b: h, c: h, d: h }
    }
}

/// Row pointers for the row being drawn and its neighbours.
#[derive(Clone, Copy)]
struct Rows {
    prev: u16,
    this: u16,
    next: u16,
}

struct Playfield {
    mode: RenderMode,
    rotation: Matrix3,
    object_list: u16,
    /// Rows left to draw after the current one.
    rows_remaining: i32,
    /// Tiles in the current row that hold objects.
    row_objects: u32,
}

impl Interpreter<'_> {
    /// Render the playfield and the objects standing on it.
    pub fn generate_terrain(&mut self) {
        let rotation = self.load_matrix(VIEW_MATRIX);
        self.view = rotation;
        self.world.rotation = rotation;

        let signed = |s: &Self, addr: u16| s.word(addr) as i16 as i32;
        let z_max = signed(self, Z_MAX);
        let z_min = signed(self, Z_MIN);
        let x = signed(self, X_POSITION);
        let z_frac = signed(self, Z_FRACTION);
        let x_offset = signed(self, X_OFFSET);
        let z_offset = signed(self, Z_OFFSET);

        let mut field = Playfield {
            mode: RenderMode::from_terrain_word(self.word(RENDER_MODE)),
            rotation,
            object_list: self.word(OBJECT_LIST),
            rows_remaining: z_max - z_min + 1,
            row_objects: 0,
        };

        let mut corner = Vector3::new(
            TILE_SIZE_X - x_offset * 128 - x,
            -self.view_position.y,
            z_max * 128 - z_frac,
        );

        let mut row = z_offset / 16 + z_max;
        while field.rows_remaining > 0 {
            field.rows_remaining -= 1;
            self.draw_row(&mut field, row & (ROWS - 1), corner);
            row -= 1;
            corner.z -= TILE_SIZE_Z;
        }
    }

    fn draw_row(&mut self, field: &mut Playfield, row: i32, mut corner: Vector3) {
        let row_addr = |r: i32| TILE_TABLE.wrapping_add((16 * (r & (ROWS - 1))) as u16);
        let rows = Rows {
            prev: row_addr(row - 1),
            this: row_addr(row),
            next: row_addr(row + 1),
        };

        field.row_objects = 0;
        let mut tiles_left = TILES_PER_ROW;

        // Left of the camera, outside-in.
        let mut n = 1;
        while corner.x < -TILE_SIZE_X && tiles_left > 0 {
            self.draw_tile(field, &rows, n, corner);
            n += 1;
            corner.x += TILE_SIZE_X;
            tiles_left -= 1;
        }

        // Right of the camera including the centre, outside-in.
        if tiles_left > 0 {
            corner.x += (tiles_left - 1) * TILE_SIZE_X;
            let mut n = TILES_PER_ROW;
            while tiles_left > 0 {
                self.draw_tile(field, &rows, n, corner);
                n -= 1;
                tiles_left -= 1;
                corner.x -= TILE_SIZE_X;
            }
        }

        if field.row_objects > 0 && self.config.terrain_objects {
            while field.row_objects > 0 {
                let count = self.word(field.object_list) as u32 + 1;
                field.object_list = field.object_list.wrapping_add(1);
                for _ in 0..count {
                    let object = self.word(field.object_list);
                    field.object_list = field.object_list.wrapping_add(1);
                    self.parse_object_list(object, 0);
                }
                field.row_objects -= 1;
            }
            self.world.rotation = field.rotation;
        }
    }

    fn tile(&self, row: u16, index: i32) -> u16 {
        self.word(row.wrapping_add((index & 15) as u16))
    }

    fn floor(&self) -> i32 {
        TILE_SIZE_Y - self.view_position.y
    }

    /// Heights of the corners of `a`; `b`, `c`, `d` supply the other
    /// corners of a sloped tile.
    fn heights(&self, a: u16, b: u16, c: u16, d: u16) -> Heights {
        let vy = self.view_position.y;
        if is_empty(a) {
            Heights::level(self.floor())
        } else if is_flat(a) {
            Heights::level(raw_height(a) - vy)
        } else {
            Heights {
                a: raw_height(a) - vy,
                b: raw_height(b) - vy,
                c: raw_height(c) - vy,
                d: raw_height(d) - vy,
            }
        }
    }

    fn emit(&mut self, mode: RenderMode, rotation: &Matrix3, quad: [Vector3; 4], color: i32) {
        let quad = quad.map(|v| rotation.transform(v));
        let color = self.palette.color(color);
        self.out.push(mode, &quad, color);
    }

    /// Draw tile `index` of the current row with its left-front corner at
    /// `corner`.
    ///
    /// ```text
    ///  F D C
    ///  E A B     A is the tile being drawn, D/C are one row further away,
    ///    G H     G/H one row nearer.
    /// ```
    fn draw_tile(&mut self, field: &mut Playfield, rows: &Rows, index: i32, corner: Vector3) {
        let tile_a = self.tile(rows.this, index);
        if tile_a & TILE_HOLDS_OBJECT != 0 {
            field.row_objects += 1;
        }
        if is_empty(tile_a) {
            return;
        }

        let color = (tile_a & TILE_COLOR) as i32;
        let mode = field.mode;
        let rotation = field.rotation;

        let x1 = corner.x;
        let x2 = x1 + TILE_SIZE_X;
        let z1 = corner.z;
        let z2 = z1 + TILE_SIZE_Z;

        let tile_b = self.tile(rows.this, index + 1);
        let tile_c = self.tile(rows.next, index + 1);
        let tile_d = self.tile(rows.next, index);
        let h = self.heights(tile_a, tile_b, tile_c, tile_d);
        let floor = self.floor();
        let v = Vector3::new;

        if x1 > 0 {
            // Left side, visible when the tile to the left is lower.
            let (side_b, side_c) = if index == 1 {
                (floor, floor)
            } else {
                let tile_e = self.tile(rows.this, index - 1);
                let tile_f = self.tile(rows.next, index - 1);
                let side = self.heights(tile_e, tile_a, tile_d, tile_f);
                (side.b, side.c)
            };
            if h.a < side_b || h.d < side_c {
                let quad = [v(x1, h.a, z1), v(x1, h.d, z2), v(x1, side_c, z2), v(x1, side_b, z1)];
                self.emit(mode, &rotation, quad, color - 1);
            }
        } else if x2 < 0 {
            // Right side, visible when the tile to the right is lower.
            let (side_a, side_d) = if index == TILES_PER_ROW {
                (floor, floor)
            } else {
                let side = self.heights(tile_b, tile_b, tile_c, tile_c);
                (side.a, side.d)
            };
            if h.b < side_a || h.c < side_d {
                let quad = [v(x2, h.b, z1), v(x2, side_a, z1), v(x2, side_d, z2), v(x2, h.c, z2)];
                self.emit(mode, &rotation, quad, color - 1);
            }
        }

        if is_flat(tile_a) {
            // Front, visible on the nearest row or when the tile in front is
            // lower.
            let (side_c, side_d) = if field.rows_remaining == 0 {
                (floor, floor)
            } else {
                let tile_g = self.tile(rows.prev, index);
                let tile_h = self.tile(rows.prev, index + 1);
                let side = self.heights(tile_g, tile_h, tile_b, tile_a);
                (side.c, side.d)
            };
            if h.a < side_d || h.b < side_c {
                let quad = [v(x1, h.a, z1), v(x1, side_d, z1), v(x2, side_c, z1), v(x2, h.b, z1)];
                self.emit(mode, &rotation, quad, color - 2);
            }
        }

        let top = [v(x1, h.a, z1), v(x2, h.b, z1), v(x2, h.c, z2), v(x1, h.d, z2)];
        self.emit(mode, &rotation, top, color);
        if !is_flat(tile_a) && mode == RenderMode::Polygon && self.config.sloped_tile_outline {
            self.emit(RenderMode::Vector, &rotation, top, color);
        }

        let bottom = [v(x1, floor, z1), v(x1, floor, z2), v(x2, floor, z2), v(x2, floor, z1)];
        self.emit(mode, &rotation, bottom, color);
    }
}
