//! Geometry oracles consulted when refinement places new vertices.
//!
//! The topology store never interprets coordinates itself. Whenever a line,
//! face or cell is refined, the surrounding points are handed to the
//! manifold registered for the object's manifold id, which returns the new
//! vertex. Unregistered ids (and [`FLAT_MANIFOLD_ID`]) fall back to
//! [`FlatManifold`].

use crate::types::{FLAT_MANIFOLD_ID, ManifoldId, Point};
use hashbrown::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// A geometry description placing new points between existing ones.
pub trait Manifold: Debug + Send + Sync {
    /// New point from surrounding points and weights summing to one.
    fn get_new_point(&self, points: &[Point], weights: &[f64]) -> Point;

    /// `true` for straight-sided geometry. Non-flat boundary faces trigger the
    /// boundary-distortion guard of flag preparation.
    fn is_flat(&self) -> bool {
        false
    }
}

/// Straight-sided geometry: new points are weighted averages.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatManifold;

impl Manifold for FlatManifold {
    fn get_new_point(&self, points: &[Point], weights: &[f64]) -> Point {
        weighted_average(points, weights)
    }

    fn is_flat(&self) -> bool {
        true
    }
}

/// Points on spheres around `center`: the direction and the radius of the
/// new point are weighted averages of those of the surrounding points.
#[derive(Clone, Copy, Debug)]
pub struct SphericalManifold {
    pub center: Point,
}

impl SphericalManifold {
    pub fn new(center: Point) -> Self {
        SphericalManifold { center }
    }
}

impl Manifold for SphericalManifold {
    fn get_new_point(&self, points: &[Point], weights: &[f64]) -> Point {
        let mut dir = [0.0; 3];
        let mut radius = 0.0;
        for (p, &w) in points.iter().zip(weights) {
            let d = sub(p, &self.center);
            let r = norm(&d);
            radius += w * r;
            if r > 0.0 {
                for k in 0..3 {
                    dir[k] += w * d[k] / r;
                }
            }
        }
        let n = norm(&dir);
        if n <= f64::EPSILON {
            return weighted_average(points, weights);
        }
        let mut out = self.center;
        for k in 0..3 {
            out[k] += radius * dir[k] / n;
        }
        out
    }
}

/// Manifolds keyed by manifold id.
#[derive(Clone, Debug, Default)]
pub struct ManifoldRegistry {
    manifolds: HashMap<ManifoldId, Arc<dyn Manifold>>,
}

static FLAT: FlatManifold = FlatManifold;

impl ManifoldRegistry {
    pub fn set(&mut self, id: ManifoldId, manifold: Arc<dyn Manifold>) {
        if id == FLAT_MANIFOLD_ID {
            log::warn!("ignoring attempt to replace the flat manifold id");
            return;
        }
        self.manifolds.insert(id, manifold);
    }

    pub fn reset(&mut self, id: ManifoldId) {
        self.manifolds.remove(&id);
    }

    pub fn clear(&mut self) {
        self.manifolds.clear();
    }

    /// Manifold for `id`, falling back to the flat manifold.
    pub fn get(&self, id: ManifoldId) -> &dyn Manifold {
        match self.manifolds.get(&id) {
            Some(m) => m.as_ref(),
            None => &FLAT,
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = ManifoldId> + '_ {
        self.manifolds.keys().copied()
    }
}

pub fn weighted_average(points: &[Point], weights: &[f64]) -> Point {
    let mut out = [0.0; 3];
    for (p, &w) in points.iter().zip(weights) {
        for k in 0..3 {
            out[k] += w * p[k];
        }
    }
    out
}

#[inline]
pub(crate) fn sub(a: &Point, b: &Point) -> Point {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub(crate) fn norm(a: &Point) -> f64 {
    (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt()
}

#[inline]
pub(crate) fn distance(a: &Point, b: &Point) -> f64 {
    norm(&sub(a, b))
}
