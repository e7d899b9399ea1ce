//! Fixed-dimension coordinate vectors
//!
//! Positions, velocities and accelerations all share one representation whose
//! length is fixed by the const parameter `D`, so one-dimensional and planar
//! systems run through exactly the same code.

use glam::DVec2;
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub, SubAssign};

/// A `D`-dimensional vector of `f64` coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector<const D: usize>(pub [f64; D]);

impl<const D: usize> Vector<D> {
    pub const ZERO: Self = Self([0.0; D]);

    pub const fn new(coords: [f64; D]) -> Self {
        Self(coords)
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }

    pub fn length_squared(&self) -> f64 {
        self.dot(self)
    }

    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Euclidean distance to `other`
    pub fn distance(&self, other: &Self) -> f64 {
        (*other - *self).length()
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }

    pub fn as_array(&self) -> &[f64; D] {
        &self.0
    }

    /// Coordinates narrowed to `f32` for device buffers
    pub fn to_f32(&self) -> [f32; D] {
        self.0.map(|c| c as f32)
    }

    pub fn from_f32(coords: &[f32]) -> Self {
        let mut out = Self::ZERO;
        for (dst, src) in out.0.iter_mut().zip(coords) {
            *dst = f64::from(*src);
        }
        out
    }
}

impl<const D: usize> Default for Vector<D> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const D: usize> From<[f64; D]> for Vector<D> {
    fn from(coords: [f64; D]) -> Self {
        Self(coords)
    }
}

impl From<DVec2> for Vector<2> {
    fn from(v: DVec2) -> Self {
        Self([v.x, v.y])
    }
}

impl From<Vector<2>> for DVec2 {
    fn from(v: Vector<2>) -> Self {
        DVec2::new(v.0[0], v.0[1])
    }
}

impl<const D: usize> Index<usize> for Vector<D> {
    type Output = f64;

    fn index(&self, d: usize) -> &f64 {
        &self.0[d]
    }
}

impl<const D: usize> IndexMut<usize> for Vector<D> {
    fn index_mut(&mut self, d: usize) -> &mut f64 {
        &mut self.0[d]
    }
}

impl<const D: usize> Add for Vector<D> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl<const D: usize> AddAssign for Vector<D> {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a += b;
        }
    }
}

impl<const D: usize> Sub for Vector<D> {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

impl<const D: usize> SubAssign for Vector<D> {
    fn sub_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a -= b;
        }
    }
}

impl<const D: usize> Mul<f64> for Vector<D> {
    type Output = Self;

    fn mul(self, s: f64) -> Self {
        Self(self.0.map(|c| c * s))
    }
}

impl<const D: usize> Div<f64> for Vector<D> {
    type Output = Self;

    fn div(self, s: f64) -> Self {
        Self(self.0.map(|c| c / s))
    }
}

impl<const D: usize> Neg for Vector<D> {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.map(|c| -c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Vector::new([1.0, 2.0, 2.0]);
        assert_eq!(Vector::ZERO.distance(&a), 3.0);
    }

    #[test]
    fn glam_round_trip_keeps_components() {
        let v: Vector<2> = DVec2::new(3.0, -4.0).into();
        assert_eq!(v, Vector::new([3.0, -4.0]));
        assert_eq!(DVec2::from(v).length(), 5.0);
    }

    #[test]
    fn widening_from_f32_ignores_extra_input() {
        let v = Vector::<1>::from_f32(&[1.5, 9.0]);
        assert_eq!(v, Vector::new([1.5]));
    }
}
