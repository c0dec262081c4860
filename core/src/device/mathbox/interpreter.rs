//! Object and surface list interpreter.
//!
//! Walks the object graph stored in Mathbox memory and turns visible
//! surfaces into display-list primitives. Each command gets a fresh
//! interpreter: nothing carries over from one MATH_START to the next.
//!
//! Object node layout (word offsets):
//!
//! ```text
//! +0..2  position x, y, z
//! +3     control
//!          0x4000  keep current view matrix
//!          0x0800  keep current surface list and rotation
//!          0x0400  position is relative to the parent
//! +4     view matrix pointer
//! +5     rotation matrix pointer   (absent with 0x0800)
//! +6     surface list pointer      (absent with 0x0800)
//! +7..   child object pointers, ended by 0 or >= 0x8000;
//!        0x0002 continues with the node 8 words further on
//! ```

use log::{trace, warn};

use super::fixed::{Matrix3, Transform, Vector3};
use super::{ADDRESS_MASK, MathboxConfig};
use crate::device::display_list::{DisplayList, RenderMode};
use crate::device::palette::Palette;

pub const VIEW_POSITION: u16 = 0x12;
pub const VIEW_MATRIX: u16 = 0x15;
pub const LIGHT_VECTOR: u16 = 0x44;

/// Pointer value the game uses for "the camera matrix".
const VIEW_MATRIX_ALIAS: u16 = 0x787C;

/// Addresses at or above this value end a list.
pub const END_OF_LIST: u16 = 0x8000;

/// Largest vertex run a single surface may produce.
pub const MAX_VERTICES: usize = 500;

/// Nesting limit for child objects, so a cyclic graph cannot overflow the
/// stack.
const MAX_DEPTH: usize = 64;

/// Surfaces evaluated per list before the walk is abandoned. Backward
/// branches can otherwise loop forever.
const MAX_SURFACES: usize = 0x4000;

// Surface flag bits.
const SURFACE_COLOR: u16 = 0x003F;
const SURFACE_SHADED: u16 = 0x0040;
const SURFACE_ABSOLUTE_BRANCH: u16 = 0x0800;
const SURFACE_BRANCH_IF_VISIBLE: u16 = 0x1000;
const SURFACE_BRANCH_IF_HIDDEN: u16 = 0x2000;
const SURFACE_NO_RENDER: u16 = 0x3000;
const SURFACE_BRANCH: u16 = 0x8000;

// Object control bits.
const OBJECT_KEEP_VIEW: u16 = 0x4000;
const OBJECT_KEEP_SURFACES: u16 = 0x0800;
const OBJECT_RELATIVE: u16 = 0x0400;

const NEXT_SIBLING_BLOCK: u16 = 0x0002;

/// Face header bit meaning "no normal, always visible".
const FACE_NO_NORMAL: u16 = 0x4000;
const LAST_VERTEX: u16 = 0x8000;

/// Normal . light is scaled down by 2^25 into a 0..=7 shade step.
const SHADE_SCALE: f32 = 1.0 / (1u32 << 25) as f32;
const MAX_SHADE: f32 = 7.0;

pub struct Interpreter<'a> {
    pub(super) memory: &'a [u16],
    pub(super) out: &'a mut DisplayList,
    pub(super) palette: &'a dyn Palette,
    pub(super) config: &'a MathboxConfig,
    pub(super) light: Vector3,
    pub(super) view_position: Vector3,
    pub(super) view: Matrix3,
    pub(super) world: Transform,
    surface_list: u16,
    vertex_table: u16,
    vertices: Vec<Vector3>,
}

impl<'a> Interpreter<'a> {
    /// Loads the light vector, the view position and the default view
    /// matrix.
    pub fn new(
        memory: &'a [u16],
        out: &'a mut DisplayList,
        palette: &'a dyn Palette,
        config: &'a MathboxConfig,
    ) -> Self {
        let view = Matrix3::read(memory, VIEW_MATRIX);
        Self {
            memory,
            out,
            palette,
            config,
            light: Vector3::read(memory, LIGHT_VECTOR),
            view_position: Vector3::read(memory, VIEW_POSITION),
            view,
            world: Transform {
                rotation: view,
                position: Vector3::ZERO,
            },
            surface_list: END_OF_LIST,
            vertex_table: 0,
            vertices: Vec::with_capacity(MAX_VERTICES),
        }
    }

    pub(super) fn word(&self, addr: u16) -> u16 {
        self.memory[(addr & ADDRESS_MASK) as usize]
    }

    pub(super) fn load_matrix(&self, addr: u16) -> Matrix3 {
        debug_assert!(addr < END_OF_LIST, "matrix pointer {addr:#06x}");
        let addr = if addr == VIEW_MATRIX_ALIAS { VIEW_MATRIX } else { addr };
        Matrix3::read(self.memory, addr)
    }

    fn vertex(&self, word: u16) -> Vector3 {
        Vector3::read(self.memory, self.vertex_table.wrapping_add(word & 0x3FFF))
    }

    /// Render the object graph rooted at `address`.
    pub fn rasterize_object(&mut self, address: u16) {
        self.parse_object_list(address, 0);
    }

    pub(super) fn parse_object_list(&mut self, mut address: u16, depth: usize) {
        if depth > MAX_DEPTH {
            trace!("object list at {address:#06x} nested too deep");
            return;
        }

        loop {
            if address == 0 || address >= END_OF_LIST {
                return;
            }

            let control = self.word(address.wrapping_add(3));
            if control & OBJECT_KEEP_VIEW == 0 {
                self.view = self.load_matrix(self.word(address.wrapping_add(4)));
            }

            let mut index: u16 = if control & OBJECT_KEEP_SURFACES != 0 {
                5
            } else {
                self.surface_list = self.word(address.wrapping_add(6));
                if self.surface_list >= END_OF_LIST {
                    return;
                }
                self.world.rotation = self.load_matrix(self.word(address.wrapping_add(5)));
                7
            };

            if self.surface_list >= END_OF_LIST {
                return;
            }

            let position = Vector3::read(self.memory, address);
            if control & OBJECT_RELATIVE != 0 {
                self.world.position += self.view.transform(position);
            } else {
                self.world.position = self.view.transform(position - self.view_position);
            }

            self.parse_surface_list(self.surface_list);

            loop {
                let child = self.word(address.wrapping_add(index));
                index = index.wrapping_add(1);
                if child == 0 || child >= END_OF_LIST {
                    return;
                }
                if child == NEXT_SIBLING_BLOCK {
                    address = address.wrapping_add(8);
                    break;
                }
                self.parse_object_list(child, depth + 1);
            }
        }
    }

    /// Walk `(surface, flags)` pairs after the vertex-table pointer.
    fn parse_surface_list(&mut self, mut address: u16) {
        self.vertex_table = self.word(address);
        address = address.wrapping_add(1);

        for _ in 0..MAX_SURFACES {
            let face = self.word(address);
            address = address.wrapping_add(1);
            if face >= END_OF_LIST {
                return;
            }
            let flags = self.word(address);
            address = address.wrapping_add(1);

            let visible = self.render_face(face, flags);

            if flags & SURFACE_BRANCH != 0 {
                let skip = (flags & SURFACE_BRANCH_IF_HIDDEN != 0 && visible)
                    || (flags & SURFACE_BRANCH_IF_VISIBLE != 0 && !visible);
                address = if skip {
                    address.wrapping_add(1)
                } else if flags & SURFACE_ABSOLUTE_BRANCH != 0 {
                    self.word(address)
                } else {
                    address.wrapping_add(self.word(address))
                };
            }
        }
        trace!("surface list did not terminate");
    }

    /// Cull, shade and emit one surface. Returns its visibility.
    fn render_face(&mut self, face: u16, flags: u16) -> bool {
        let mut shade = 0.0;

        let header = self.word(face);
        if header & FACE_NO_NORMAL == 0 {
            let normal = self.world.rotation.transform(self.vertex(header));
            let point = self.world.apply(self.vertex(self.word(face.wrapping_add(1))));
            if normal.dot(point) <= 0 {
                return false;
            }
            if flags & SURFACE_SHADED != 0 {
                shade = (normal.dot(self.light) as f32 * SHADE_SCALE).clamp(0.0, MAX_SHADE);
            }
        }

        if flags & SURFACE_NO_RENDER != 0 {
            return true;
        }

        let color = self.palette.shaded((flags & SURFACE_COLOR) as i32, shade);

        self.vertices.clear();
        let mut cursor = face.wrapping_add(1);
        loop {
            let word = self.word(cursor);
            cursor = cursor.wrapping_add(1);
            if self.vertices.len() >= MAX_VERTICES {
                warn!("surface at {face:#06x} exceeds {MAX_VERTICES} vertices, truncated");
                break;
            }
            let v = self.world.apply(self.vertex(word));
            self.vertices.push(v);
            if word & LAST_VERTEX != 0 {
                break;
            }
        }
        let mode = RenderMode::from_vertex_count(self.vertices.len());
        self.out.push(mode, &self.vertices, color);
        true
    }
}
