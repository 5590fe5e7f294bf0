//! Polygon triangulation contract.
//!
//! The kernel never triangulates polygons itself. Callers supply a
//! [`Triangulator`] when adding or copying a polygon; the kernel hands
//! it the outer loop and hole loops as raw coordinates and caches the
//! resulting triangles as `Tri` entities. This keeps the geometric
//! algorithm (ear clipping, Delaunay, whatever the host application
//! prefers) outside the topology kernel.

use crate::attribs::value::Vec3;

/// Produces a triangulation of a polygon face.
///
/// Corner indices in the returned triangles address the concatenation
/// of `outer` followed by each hole loop in order. Implementations that
/// return an empty list mark the polygon as untriangulated (zero cached
/// `Tri` entities), which is valid for degenerate faces.
pub trait Triangulator {
    /// Triangulate a face given its outer loop and hole loops.
    fn triangulate(&self, outer: &[Vec3], holes: &[Vec<Vec3>]) -> Vec<[usize; 3]>;
}

impl<F> Triangulator for F
where
    F: Fn(&[Vec3], &[Vec<Vec3>]) -> Vec<[usize; 3]>,
{
    fn triangulate(&self, outer: &[Vec3], holes: &[Vec<Vec3>]) -> Vec<[usize; 3]> {
        self(outer, holes)
    }
}

/// Fan triangulation from the first corner of the outer loop.
///
/// Correct for convex faces without holes; hole loops are ignored. Used
/// as the default in tests and simple hosts.
#[derive(Copy, Clone, Debug, Default)]
pub struct FanTriangulator;

impl Triangulator for FanTriangulator {
    fn triangulate(&self, outer: &[Vec3], _holes: &[Vec<Vec3>]) -> Vec<[usize; 3]> {
        if outer.len() < 3 {
            return Vec::new();
        }
        (1..outer.len() - 1).map(|i| [0, i, i + 1]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_over_a_square() {
        let square = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let tris = FanTriangulator.triangulate(&square, &[]);
        assert_eq!(tris, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn degenerate_loops_yield_no_triangles() {
        let tris = FanTriangulator.triangulate(&[[0.0; 3], [1.0, 0.0, 0.0]], &[]);
        assert!(tris.is_empty());
    }

    #[test]
    fn closures_are_triangulators() {
        let custom = |outer: &[Vec3], _holes: &[Vec<Vec3>]| vec![[0usize, 1, outer.len() - 1]];
        let tris = custom.triangulate(&[[0.0; 3], [1.0; 3], [2.0; 3]], &[]);
        assert_eq!(tris, vec![[0, 1, 2]]);
    }
}
