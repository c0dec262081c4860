//! Fixed-point vector and matrix types read out of Mathbox memory.
//!
//! Matrices hold 14 fractional bits (0x4000 = 1.0) and are stored column
//! first: words 0..9 are M11, M21, M31, M12, M22, M32, M13, M23, M33.
//! Vectors are integer world units.

use std::ops::{Add, AddAssign, Sub};

use super::ADDRESS_MASK;

pub const ONE: i32 = 0x4000;
pub const FRACTION_BITS: u32 = 14;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Vector3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0, 0, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Read three signed words starting at `addr`. Each word address is
    /// masked to the 15-bit Mathbox space.
    pub fn read(memory: &[u16], addr: u16) -> Self {
        let w = |n: u16| memory[(addr.wrapping_add(n) & ADDRESS_MASK) as usize] as i16 as i32;
        Self::new(w(0), w(1), w(2))
    }

    pub fn dot(self, other: Self) -> i64 {
        self.x as i64 * other.x as i64 + self.y as i64 * other.y as i64 + self.z as i64 * other.z as i64
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.x.wrapping_add(rhs.x),
            self.y.wrapping_add(rhs.y),
            self.z.wrapping_add(rhs.z),
        )
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(
            self.x.wrapping_sub(rhs.x),
            self.y.wrapping_sub(rhs.y),
            self.z.wrapping_sub(rhs.z),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Matrix3 {
    /// Words in Mathbox memory order.
    pub m: [i32; 9],
}

impl Matrix3 {
    pub const IDENTITY: Self = Self {
        m: [ONE, 0, 0, 0, ONE, 0, 0, 0, ONE],
    };

    pub fn read(memory: &[u16], addr: u16) -> Self {
        let mut m = [0i32; 9];
        for (n, v) in m.iter_mut().enumerate() {
            *v = memory[(addr.wrapping_add(n as u16) & ADDRESS_MASK) as usize] as i16 as i32;
        }
        Self { m }
    }

    /// Row-vector transform: `x' = (x*M11 + y*M21 + z*M31) >> 14`, and so on
    /// for the other two columns.
    pub fn transform(&self, v: Vector3) -> Vector3 {
        let m = &self.m;
        let col = |a: i32, b: i32, c: i32| {
            ((v.x as i64 * a as i64 + v.y as i64 * b as i64 + v.z as i64 * c as i64)
                >> FRACTION_BITS) as i32
        };
        Vector3::new(col(m[0], m[1], m[2]), col(m[3], m[4], m[5]), col(m[6], m[7], m[8]))
    }
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Rotation plus translation, applied as `rotation * v + position`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transform {
    pub rotation: Matrix3,
    pub position: Vector3,
}

impl Transform {
    pub fn apply(&self, v: Vector3) -> Vector3 {
        self.rotation.transform(v) + self.position
    }
}
