//! Framed little-endian persistence of refine, coarsen and user flags.
//!
//! A stream is `FlagHeader` (opening magic, bit count), the bits packed
//! eight per byte with bit `i` in byte `i / 8` at position `i % 8`, and
//! the closing magic of the same kind. Refine flags take `dim` bits per
//! active cell, one per axis; everything else takes one bit per object.

use crate::mesh_error::MeshError;
use crate::topology::refinement_case::RefinementCase;
use crate::topology::store::TriaObjects;
use crate::topology::triangulation::Triangulation;
use bytemuck::{Pod, Zeroable};
use bytes::{Buf, BufMut, BytesMut};
use static_assertions::assert_eq_size;
use std::mem::size_of;

/// Which flag vector a stream carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlagKind {
    Refine,
    Coarsen,
    UserLine,
    UserQuad,
    UserHex,
}

impl FlagKind {
    /// Opening and closing magic numbers.
    pub const fn magic(self) -> (u32, u32) {
        match self {
            FlagKind::Refine => (0x7452_0a01, 0x7452_0a81),
            FlagKind::Coarsen => (0x7452_0a02, 0x7452_0a82),
            FlagKind::UserLine => (0x7452_0a11, 0x7452_0a91),
            FlagKind::UserQuad => (0x7452_0a12, 0x7452_0a92),
            FlagKind::UserHex => (0x7452_0a13, 0x7452_0a93),
        }
    }

    /// User-flag kind for objects of dimension `structdim`.
    pub fn user(structdim: usize) -> Option<Self> {
        match structdim {
            1 => Some(FlagKind::UserLine),
            2 => Some(FlagKind::UserQuad),
            3 => Some(FlagKind::UserHex),
            _ => None,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct FlagHeader {
    magic_le: u32,
    reserved_le: u32,
    n_bits_le: u64,
}

#[repr(transparent)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct FlagTrailer {
    magic_le: u32,
}

assert_eq_size!(FlagHeader, [u8; 16]);
assert_eq_size!(FlagTrailer, u32);

/// Append `bits` to `out` as a framed stream of `kind`.
pub fn write_flags(kind: FlagKind, bits: &[bool], out: &mut BytesMut) {
    let (open, close) = kind.magic();
    let header = FlagHeader {
        magic_le: open.to_le(),
        reserved_le: 0,
        n_bits_le: (bits.len() as u64).to_le(),
    };
    out.reserve(size_of::<FlagHeader>() + bits.len().div_ceil(8) + size_of::<FlagTrailer>());
    out.put_slice(bytemuck::bytes_of(&header));
    for chunk in bits.chunks(8) {
        let byte = chunk
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, &b)| acc | ((b as u8) << i));
        out.put_u8(byte);
    }
    out.put_slice(bytemuck::bytes_of(&FlagTrailer {
        magic_le: close.to_le(),
    }));
}

fn take<T: Pod>(buf: &mut impl Buf, what: &str) -> Result<T, MeshError> {
    if buf.remaining() < size_of::<T>() {
        return Err(MeshError::FlagStream(format!(
            "truncated {what}: {} bytes left, need {}",
            buf.remaining(),
            size_of::<T>()
        )));
    }
    let mut raw = vec![0u8; size_of::<T>()];
    buf.copy_to_slice(&mut raw);
    Ok(bytemuck::pod_read_unaligned(&raw))
}

/// Read one framed stream of `kind` from the front of `buf`.
pub fn read_flags(kind: FlagKind, buf: &mut impl Buf) -> Result<Vec<bool>, MeshError> {
    let (open, close) = kind.magic();
    let header: FlagHeader = take(buf, "header")?;
    let magic = u32::from_le(header.magic_le);
    if magic != open {
        return Err(MeshError::FlagStream(format!(
            "expected {kind:?} opening magic {open:#010x}, found {magic:#010x}"
        )));
    }
    let n_bits = usize::try_from(u64::from_le(header.n_bits_le))
        .map_err(|_| MeshError::FlagStream("bit count does not fit in memory".into()))?;
    let n_bytes = n_bits.div_ceil(8);
    if buf.remaining() < n_bytes {
        return Err(MeshError::FlagStream(format!(
            "truncated payload: {} bytes left, need {n_bytes}",
            buf.remaining()
        )));
    }
    let mut packed = vec![0u8; n_bytes];
    buf.copy_to_slice(&mut packed);
    let bits = (0..n_bits)
        .map(|i| packed[i / 8] & (1 << (i % 8)) != 0)
        .collect();
    let trailer: FlagTrailer = take(buf, "trailer")?;
    let magic = u32::from_le(trailer.magic_le);
    if magic != close {
        return Err(MeshError::FlagStream(format!(
            "expected {kind:?} closing magic {close:#010x}, found {magic:#010x}"
        )));
    }
    Ok(bits)
}

fn check_len(what: &str, got: usize, expected: usize) -> Result<(), MeshError> {
    if got == expected {
        Ok(())
    } else {
        Err(MeshError::FlagStream(format!(
            "{what}: expected {expected} entries, got {got}"
        )))
    }
}

impl Triangulation {
    /// Stores holding the objects of dimension `structdim`, in save order.
    fn objects_of(&self, structdim: usize) -> Vec<&TriaObjects> {
        if structdim == self.dim {
            self.levels.iter().map(|l| &l.cells).collect()
        } else {
            match structdim {
                1 if self.dim > 1 => vec![&self.faces.lines],
                2 if self.dim > 2 => vec![&self.faces.quads],
                _ => Vec::new(),
            }
        }
    }

    fn objects_of_mut(&mut self, structdim: usize) -> Vec<&mut TriaObjects> {
        if structdim == self.dim {
            self.levels.iter_mut().map(|l| &mut l.cells).collect()
        } else {
            match structdim {
                1 if self.dim > 1 => vec![&mut self.faces.lines],
                2 if self.dim > 2 => vec![&mut self.faces.quads],
                _ => Vec::new(),
            }
        }
    }

    fn n_used_objects(&self, structdim: usize) -> usize {
        self.objects_of(structdim).iter().map(|o| o.n_used()).sum()
    }

    /// `dim` bits per active cell, set for each axis the cell is cut along.
    pub fn save_refine_flags(&self) -> Vec<bool> {
        let dim = self.dim;
        self.active_cells()
            .into_iter()
            .flat_map(|c| {
                let flag = self.levels[c.level()].refine_flags[c.index()];
                (0..dim).map(move |axis| flag.cuts_axis(axis))
            })
            .collect()
    }

    /// Inverse of [`save_refine_flags`](Self::save_refine_flags). Simplex
    /// cells with any bit set are flagged isotropically.
    pub fn load_refine_flags(&mut self, bits: &[bool]) -> Result<(), MeshError> {
        let active = self.active_cells();
        check_len("refine flags", bits.len(), active.len() * self.dim)?;
        for (cell, axes) in active.into_iter().zip(bits.chunks(self.dim)) {
            let mut flag = axes
                .iter()
                .enumerate()
                .filter(|(_, b)| **b)
                .fold(RefinementCase::NONE, |acc, (axis, _)| acc | RefinementCase::cut_axis(axis));
            if flag.is_refined() && self.cell_kind(cell).is_simplex() {
                flag = RefinementCase::isotropic(self.dim);
            }
            self.levels[cell.level()].refine_flags[cell.index()] = flag;
        }
        Ok(())
    }

    /// One bit per active cell.
    pub fn save_coarsen_flags(&self) -> Vec<bool> {
        self.active_cells()
            .into_iter()
            .map(|c| self.levels[c.level()].coarsen_flags[c.index()])
            .collect()
    }

    pub fn load_coarsen_flags(&mut self, bits: &[bool]) -> Result<(), MeshError> {
        let active = self.active_cells();
        check_len("coarsen flags", bits.len(), active.len())?;
        for (cell, &b) in active.into_iter().zip(bits) {
            self.levels[cell.level()].coarsen_flags[cell.index()] = b;
        }
        Ok(())
    }

    /// User flags of the used objects of dimension `structdim`. Empty when
    /// the mesh has no such objects.
    pub fn save_user_flags_of(&self, structdim: usize) -> Vec<bool> {
        self.objects_of(structdim)
            .into_iter()
            .flat_map(|o| (0..o.len()).filter(|&i| o.used[i]).map(|i| o.user_flags[i]))
            .collect()
    }

    pub fn load_user_flags_of(&mut self, structdim: usize, bits: &[bool]) -> Result<(), MeshError> {
        check_len("user flags", bits.len(), self.n_used_objects(structdim))?;
        let mut it = bits.iter();
        for objects in self.objects_of_mut(structdim) {
            for i in 0..objects.len() {
                if objects.used[i] {
                    objects.user_flags[i] = it.next().copied().unwrap_or(false);
                }
            }
        }
        Ok(())
    }

    /// User flags of lines, then quads, then hexes, for every object
    /// dimension the mesh has.
    pub fn save_user_flags(&self) -> Vec<bool> {
        (1..=self.dim).flat_map(|d| self.save_user_flags_of(d)).collect()
    }

    pub fn load_user_flags(&mut self, bits: &[bool]) -> Result<(), MeshError> {
        let total: usize = (1..=self.dim).map(|d| self.n_used_objects(d)).sum();
        check_len("user flags", bits.len(), total)?;
        let mut offset = 0;
        for d in 1..=self.dim {
            let n = self.n_used_objects(d);
            self.load_user_flags_of(d, &bits[offset..offset + n])?;
            offset += n;
        }
        Ok(())
    }

    /// User data of lines, then quads, then hexes.
    pub fn save_user_indices(&self) -> Vec<u64> {
        (1..=self.dim)
            .flat_map(|d| {
                self.objects_of(d)
                    .into_iter()
                    .flat_map(|o| (0..o.len()).filter(|&i| o.used[i]).map(|i| o.user_data[i]))
            })
            .collect()
    }

    pub fn load_user_indices(&mut self, data: &[u64]) -> Result<(), MeshError> {
        let total: usize = (1..=self.dim).map(|d| self.n_used_objects(d)).sum();
        check_len("user indices", data.len(), total)?;
        let mut it = data.iter();
        for d in 1..=self.dim {
            for objects in self.objects_of_mut(d) {
                for i in 0..objects.len() {
                    if objects.used[i] {
                        objects.user_data[i] = it.next().copied().unwrap_or(0);
                    }
                }
            }
        }
        Ok(())
    }

    /// Append the refine flags as a framed stream.
    pub fn write_refine_flags(&self, out: &mut BytesMut) {
        write_flags(FlagKind::Refine, &self.save_refine_flags(), out);
    }

    pub fn read_refine_flags(&mut self, buf: &mut impl Buf) -> Result<(), MeshError> {
        let bits = read_flags(FlagKind::Refine, buf)?;
        self.load_refine_flags(&bits)
    }

    pub fn write_coarsen_flags(&self, out: &mut BytesMut) {
        write_flags(FlagKind::Coarsen, &self.save_coarsen_flags(), out);
    }

    pub fn read_coarsen_flags(&mut self, buf: &mut impl Buf) -> Result<(), MeshError> {
        let bits = read_flags(FlagKind::Coarsen, buf)?;
        self.load_coarsen_flags(&bits)
    }

    /// Append one framed stream per object dimension, lines first.
    pub fn write_user_flags(&self, out: &mut BytesMut) {
        for d in 1..=self.dim {
            if let Some(kind) = FlagKind::user(d) {
                write_flags(kind, &self.save_user_flags_of(d), out);
            }
        }
    }

    pub fn read_user_flags(&mut self, buf: &mut impl Buf) -> Result<(), MeshError> {
        for d in 1..=self.dim {
            if let Some(kind) = FlagKind::user(d) {
                let bits = read_flags(kind, buf)?;
                self.load_user_flags_of(d, &bits)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_layout_is_little_endian() {
        let mut out = BytesMut::new();
        write_flags(FlagKind::Coarsen, &[true, false, true, true, false, false, false, false, true], &mut out);
        assert_eq!(out.len(), 16 + 2 + 4);
        assert_eq!(&out[0..4], &0x7452_0a02u32.to_le_bytes());
        assert_eq!(&out[8..16], &9u64.to_le_bytes());
        assert_eq!(out[16], 0b0000_1101);
        assert_eq!(out[17], 0b0000_0001);
        assert_eq!(&out[18..22], &0x7452_0a82u32.to_le_bytes());
    }

    #[test]
    fn wrong_kind_and_truncation_are_rejected() {
        let mut out = BytesMut::new();
        write_flags(FlagKind::Refine, &[true; 12], &mut out);
        let frozen = out.freeze();

        let mut buf = frozen.clone();
        assert!(matches!(
            read_flags(FlagKind::Coarsen, &mut buf),
            Err(MeshError::FlagStream(_))
        ));

        let mut short = frozen.slice(..frozen.len() - 1);
        assert!(read_flags(FlagKind::Refine, &mut short).is_err());

        let mut buf = frozen.clone();
        assert_eq!(read_flags(FlagKind::Refine, &mut buf).unwrap(), vec![true; 12]);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn empty_vector_still_framed() {
        let mut out = BytesMut::new();
        write_flags(FlagKind::UserHex, &[], &mut out);
        assert_eq!(out.len(), 20);
        let mut buf = out.freeze();
        assert!(read_flags(FlagKind::UserHex, &mut buf).unwrap().is_empty());
    }
}
