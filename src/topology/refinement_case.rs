//! Refinement cases: which coordinate axes a cell or face is cut along.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Bitset over the coordinate axes of a reference cell.
    ///
    /// Simplices only know the empty case and their isotropic case
    /// (`(1 << dim) - 1`).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct RefinementCase: u8 {
        const CUT_X = 0b001;
        const CUT_Y = 0b010;
        const CUT_Z = 0b100;
        const CUT_XY = Self::CUT_X.bits() | Self::CUT_Y.bits();
        const CUT_XZ = Self::CUT_X.bits() | Self::CUT_Z.bits();
        const CUT_YZ = Self::CUT_Y.bits() | Self::CUT_Z.bits();
        const CUT_XYZ = Self::CUT_XY.bits() | Self::CUT_Z.bits();
    }
}

impl RefinementCase {
    /// The "do not refine" case.
    pub const NONE: RefinementCase = RefinementCase::empty();

    /// Isotropic refinement of a `dim`-dimensional cell.
    #[inline]
    pub fn isotropic(dim: usize) -> Self {
        RefinementCase::from_bits_truncate(((1u16 << dim) - 1) as u8)
    }

    /// Cut along a single axis.
    #[inline]
    pub fn cut_axis(axis: usize) -> Self {
        RefinementCase::from_bits_truncate(1 << axis)
    }

    #[inline]
    pub fn cuts_axis(self, axis: usize) -> bool {
        self.bits() & (1 << axis) != 0
    }

    #[inline]
    pub fn is_refined(self) -> bool {
        !self.is_empty()
    }

    /// Number of children a tensor-product cell refined with this case has.
    #[inline]
    pub fn n_children(self) -> usize {
        if self.is_empty() {
            0
        } else {
            1 << self.bits().count_ones()
        }
    }

    /// Axes (in increasing order) this case cuts.
    pub fn axes(self) -> impl Iterator<Item = usize> {
        (0..3).filter(move |&a| self.cuts_axis(a))
    }

    /// Axes of a `dim`-dimensional cell that this case leaves uncut.
    pub fn uncut_in(self, dim: usize) -> Self {
        Self::isotropic(dim).difference(self)
    }

    /// Raw byte for flag storage.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self.bits()
    }

    #[inline]
    pub fn from_u8(raw: u8) -> Self {
        RefinementCase::from_bits_truncate(raw)
    }

    /// Whether the case is valid for a `dim`-dimensional cell.
    pub fn is_valid_for(self, dim: usize, simplex: bool) -> bool {
        if self.bits() & !Self::isotropic(dim).bits() != 0 {
            return false;
        }
        !simplex || dim <= 1 || self.is_empty() || self == Self::isotropic(dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isotropic_cases_per_dimension() {
        assert_eq!(RefinementCase::isotropic(1), RefinementCase::CUT_X);
        assert_eq!(RefinementCase::isotropic(2), RefinementCase::CUT_XY);
        assert_eq!(RefinementCase::isotropic(3), RefinementCase::CUT_XYZ);
        assert_eq!(RefinementCase::CUT_XZ.n_children(), 4);
        assert_eq!(RefinementCase::NONE.n_children(), 0);
    }

    #[test]
    fn uncut_axes_and_axes() {
        let c = RefinementCase::CUT_X.uncut_in(2);
        assert_eq!(c, RefinementCase::CUT_Y);
        assert_eq!(RefinementCase::CUT_XZ.axes().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn simplices_only_accept_isotropic() {
        assert!(RefinementCase::CUT_XY.is_valid_for(2, true));
        assert!(!RefinementCase::CUT_X.is_valid_for(2, true));
        assert!(RefinementCase::CUT_X.is_valid_for(2, false));
        assert!(!RefinementCase::CUT_Z.is_valid_for(2, false));
    }
}
