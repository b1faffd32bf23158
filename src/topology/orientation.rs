//! Face orientations as small symmetry groups.
//!
//! A face shared by two cells is stored once; each cell sees it through a
//! symmetry of the face's reference cell. Lines know two such symmetries
//! (C₂), triangles six (D₃) and quadrilaterals eight (D₄). All of them are
//! packed into one byte, [`FaceOrientation`], whose encoding is shared with
//! [`crate::topology::cell_type::ReferenceCell::standard_to_real_face_vertex`].

use core::fmt::{Debug, Formatter};
use serde::{Deserialize, Serialize};

/// Group structure shared by all orientation encodings.
pub trait Orientation: Copy + Default + Eq {
    /// `compose(a, b)` acts like applying `b` first, then `a`.
    fn compose(a: Self, b: Self) -> Self;
    fn inverse(a: Self) -> Self;
}

/// Dihedral group D_N acting on the positions of an N-ring:
/// `p ↦ rot + (flip ? -p : p) mod N`.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Dihedral<const N: u8> {
    pub rot: u8,
    pub flip: bool,
}

impl<const N: u8> Default for Dihedral<N> {
    fn default() -> Self {
        Self {
            rot: 0,
            flip: false,
        }
    }
}

impl<const N: u8> Debug for Dihedral<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dihedral")
            .field("rot", &self.rot)
            .field("flip", &self.flip)
            .finish()
    }
}

impl<const N: u8> Dihedral<N> {
    /// Image of ring position `p`.
    #[inline]
    pub fn apply(self, p: u8) -> u8 {
        let p = p % N;
        let q = if self.flip { (N - p) % N } else { p };
        (q + self.rot) % N
    }
}

impl<const N: u8> Orientation for Dihedral<N> {
    #[inline]
    fn compose(a: Self, b: Self) -> Self {
        let add = if a.flip {
            (N - (b.rot % N)) % N
        } else {
            b.rot % N
        };
        Self {
            rot: (a.rot + add) % N,
            flip: a.flip ^ b.flip,
        }
    }
    #[inline]
    fn inverse(a: Self) -> Self {
        if a.flip {
            Self {
                rot: a.rot % N,
                flip: true,
            }
        } else {
            Self {
                rot: (N - (a.rot % N)) % N,
                flip: false,
            }
        }
    }
}

/// Quad face orientation.
pub type D4 = Dihedral<4>;

/// Packed face orientation: bit 0 is a reflection fixing vertex 0, the
/// higher bits count ring rotations. The default (`0`) is the standard
/// orientation.
///
/// For quadrilaterals the byte decomposes into the three classic booleans:
/// `orientation = bit0 == 0`, `rotation = bit1`, `flip = bit2`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FaceOrientation(pub u8);

impl Debug for FaceOrientation {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "FaceOrientation(o={}, f={}, r={})",
            self.orientation(),
            self.flip(),
            self.rotation()
        )
    }
}

impl FaceOrientation {
    pub const STANDARD: FaceOrientation = FaceOrientation(0);
    /// Line faces seen against their stored direction.
    pub const REVERSED: FaceOrientation = FaceOrientation(1);

    /// Pack the classic `(orientation, flip, rotation)` triple.
    pub const fn from_bits(orientation: bool, flip: bool, rotation: bool) -> Self {
        FaceOrientation((!orientation) as u8 | ((rotation as u8) << 1) | ((flip as u8) << 2))
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// `true` iff the face is seen without reflection.
    #[inline]
    pub const fn orientation(self) -> bool {
        self.0 & 1 == 0
    }

    #[inline]
    pub const fn rotation(self) -> bool {
        (self.0 >> 1) & 1 == 1
    }

    #[inline]
    pub const fn flip(self) -> bool {
        (self.0 >> 2) & 1 == 1
    }

    #[inline]
    pub const fn is_standard(self) -> bool {
        self.0 == 0
    }

    /// Orientation seen from the other member of a periodic pair: the
    /// inverse group element. In terms of the classic booleans,
    /// orientation and rotation carry over and flip becomes
    /// `orientation ? rotation ^ flip : flip`.
    pub fn reversed_pair(self) -> Self {
        Self::from_d4(D4::inverse(self.as_d4()))
    }

    /// Group element acting on the quad vertex ring.
    pub fn as_d4(self) -> D4 {
        D4 {
            rot: (self.0 >> 1) & 3,
            flip: self.0 & 1 == 1,
        }
    }

    pub fn from_d4(d: D4) -> Self {
        FaceOrientation((d.flip as u8) | ((d.rot % 4) << 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::cell_type::ReferenceCell;

    #[test]
    fn packed_bits_roundtrip() {
        for o in [false, true] {
            for f in [false, true] {
                for r in [false, true] {
                    let fo = FaceOrientation::from_bits(o, f, r);
                    assert_eq!((fo.orientation(), fo.flip(), fo.rotation()), (o, f, r));
                }
            }
        }
        assert!(FaceOrientation::from_bits(true, false, false).is_standard());
    }

    #[test]
    fn d4_action_matches_face_vertex_table() {
        let q = ReferenceCell::Quadrilateral;
        let ring = [0usize, 1, 3, 2];
        for raw in 0..8u8 {
            let d = FaceOrientation(raw).as_d4();
            for j in 0..4 {
                let p = q.ring_position(j) as u8;
                assert_eq!(ring[d.apply(p) as usize], q.standard_to_real_face_vertex(j, raw));
            }
        }
    }

    #[test]
    fn pair_reversal_matches_boolean_rule() {
        for raw in 0..8u8 {
            let fo = FaceOrientation(raw);
            let (o, r, f) = (fo.orientation(), fo.rotation(), fo.flip());
            let expected = FaceOrientation::from_bits(o, if o { r ^ f } else { f }, r);
            assert_eq!(fo.reversed_pair(), expected, "raw {raw}");
            assert_eq!(fo.reversed_pair().reversed_pair(), fo);
        }
    }

    #[test]
    fn dihedral_inverse_composes_to_identity() {
        for rot in 0..4 {
            for flip in [false, true] {
                let a = D4 { rot, flip };
                assert_eq!(D4::compose(a, D4::inverse(a)), D4::default());
            }
        }
    }
}
