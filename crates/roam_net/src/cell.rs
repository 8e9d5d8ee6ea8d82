//! Hierarchical sphere cells
//!
//! The sphere is projected onto the six faces of a cube, each face warped
//! with a quadratic transform and walked by a Hilbert curve 30 levels deep.
//! A 64-bit id packs the face in the top three bits, two bits of curve
//! position per level, then a sentinel `1` followed by zeros.

use glam::DVec3;
use roam_core::{CellId, GeoPoint};

pub const MAX_LEVEL: u8 = 30;

const POS_BITS: u32 = 2 * MAX_LEVEL as u32 + 1;
const MAX_SIZE: u32 = 1 << MAX_LEVEL;

const SWAP_MASK: u8 = 0x01;
const INVERT_MASK: u8 = 0x02;

/// Hilbert position of quadrant `(i << 1) | j`, per orientation.
const IJ_TO_POS: [[u8; 4]; 4] = [[0, 1, 3, 2], [0, 3, 1, 2], [2, 3, 1, 0], [2, 1, 3, 0]];
/// Inverse of `IJ_TO_POS`.
const POS_TO_IJ: [[u8; 4]; 4] = [[0, 1, 3, 2], [0, 2, 3, 1], [3, 2, 0, 1], [3, 1, 0, 2]];
const POS_TO_ORIENTATION: [u8; 4] = [SWAP_MASK, 0, 0, INVERT_MASK | SWAP_MASK];

/// Padding added to cell bounds so rounding never shrinks them.
const BOUND_EPSILON_DEG: f64 = 1e-7;

/// A cell at any level, by raw id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell(u64);

impl Cell {
    /// The level-0 cell covering a whole cube face.
    pub fn from_face(face: u8) -> Self {
        Self((u64::from(face) << POS_BITS) | lsb_for_level(0))
    }

    /// Every level-0 cell.
    pub fn faces() -> [Cell; 6] {
        [0, 1, 2, 3, 4, 5].map(Cell::from_face)
    }

    /// The leaf cell containing `point`.
    pub fn from_point(point: GeoPoint) -> Self {
        let xyz = point_to_xyz(point);
        let (face, u, v) = xyz_to_face_uv(xyz);
        let i = st_to_ij(uv_to_st(u));
        let j = st_to_ij(uv_to_st(v));
        Self::from_face_ij(face, i, j)
    }

    /// Wrap a raw id. Returns `None` unless it is a well-formed cell id.
    pub fn from_raw(id: u64) -> Option<Self> {
        let trailing = id.trailing_zeros();
        let valid =
            (id >> POS_BITS) < 6 && trailing <= 2 * u32::from(MAX_LEVEL) && trailing % 2 == 0;
        valid.then_some(Self(id))
    }

    pub fn from_cell_id(cell: &CellId) -> Option<Self> {
        cell.raw().and_then(Self::from_raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn cell_id(self) -> CellId {
        CellId::from_raw(self.0)
    }

    pub fn face(self) -> u8 {
        (self.0 >> POS_BITS) as u8
    }

    pub fn level(self) -> u8 {
        MAX_LEVEL - (self.0.trailing_zeros() / 2) as u8
    }

    pub fn is_leaf(self) -> bool {
        self.0 & 1 == 1
    }

    fn lsb(self) -> u64 {
        self.0 & self.0.wrapping_neg()
    }

    /// Ancestor at `level`, or `self` when already at or above it.
    pub fn parent(self, level: u8) -> Self {
        if level >= self.level() {
            return self;
        }
        let lsb = lsb_for_level(level);
        Self((self.0 & lsb.wrapping_neg()) | lsb)
    }

    /// The four children in Hilbert order. `None` for leaf cells.
    pub fn children(self) -> Option<[Cell; 4]> {
        if self.is_leaf() {
            return None;
        }
        let lsb = self.lsb();
        let child_lsb = lsb >> 2;
        let first = self.0 - lsb + child_lsb;
        Some([0u64, 1, 2, 3].map(|k| Cell(first + k * 2 * child_lsb)))
    }

    pub fn range_min(self) -> u64 {
        self.0 - (self.lsb() - 1)
    }

    pub fn range_max(self) -> u64 {
        self.0 + (self.lsb() - 1)
    }

    /// Whether `other` is this cell or one of its descendants.
    pub fn contains(self, other: Cell) -> bool {
        self.range_min() <= other.0 && other.0 <= self.range_max()
    }

    /// Face coordinates of the cell's corner and its size, in leaf units.
    fn face_ij(self) -> (u8, u32, u32, u32) {
        let face = self.face();
        let level = self.level();
        let mut orientation = face & SWAP_MASK;
        let (mut i, mut j) = (0u32, 0u32);
        for k in 0..u32::from(level) {
            let pos = ((self.0 >> (POS_BITS - 2 * (k + 1))) & 3) as usize;
            let ij = POS_TO_IJ[orientation as usize][pos];
            i = (i << 1) | u32::from(ij >> 1);
            j = (j << 1) | u32::from(ij & 1);
            orientation ^= POS_TO_ORIENTATION[pos];
        }
        let shift = u32::from(MAX_LEVEL - level);
        (face, i << shift, j << shift, 1u32 << shift)
    }

    fn from_face_ij(face: u8, i: u32, j: u32) -> Self {
        let mut orientation = face & SWAP_MASK;
        let mut pos = 0u64;
        for k in (0..u32::from(MAX_LEVEL)).rev() {
            let ij = ((((i >> k) & 1) << 1) | ((j >> k) & 1)) as usize;
            let bits = IJ_TO_POS[orientation as usize][ij];
            pos = (pos << 2) | u64::from(bits);
            orientation ^= POS_TO_ORIENTATION[bits as usize];
        }
        Self((u64::from(face) << POS_BITS) | (pos << 1) | 1)
    }

    /// Corner points in counter-clockwise face order.
    fn vertices(self) -> (u8, [f64; 4], [DVec3; 4]) {
        let (face, i, j, size) = self.face_ij();
        let scale = f64::from(MAX_SIZE);
        let u_lo = st_to_uv(f64::from(i) / scale);
        let u_hi = st_to_uv(f64::from(i + size) / scale);
        let v_lo = st_to_uv(f64::from(j) / scale);
        let v_hi = st_to_uv(f64::from(j + size) / scale);
        let corners = [
            face_uv_to_xyz(face, u_lo, v_lo).normalize(),
            face_uv_to_xyz(face, u_hi, v_lo).normalize(),
            face_uv_to_xyz(face, u_hi, v_hi).normalize(),
            face_uv_to_xyz(face, u_lo, v_hi).normalize(),
        ];
        (face, [u_lo, u_hi, v_lo, v_hi], corners)
    }

    /// Centre of the cell on the sphere.
    pub fn center(self) -> GeoPoint {
        self.point_at(0.5, 0.5)
    }

    /// Point at fractional offsets `(fs, ft)` across the cell, each in `[0, 1]`.
    pub fn point_at(self, fs: f64, ft: f64) -> GeoPoint {
        let (face, i, j, size) = self.face_ij();
        let s = (f64::from(i) + fs.clamp(0.0, 1.0) * f64::from(size)) / f64::from(MAX_SIZE);
        let t = (f64::from(j) + ft.clamp(0.0, 1.0) * f64::from(size)) / f64::from(MAX_SIZE);
        xyz_to_point(face_uv_to_xyz(face, st_to_uv(s), st_to_uv(t)))
    }

    /// Latitude/longitude box enclosing the cell, padded slightly.
    pub fn bound(self) -> CellBound {
        let (face, [u_lo, u_hi, v_lo, v_hi], corners) = self.vertices();

        let mut lat_lo = f64::INFINITY;
        let mut lat_hi = f64::NEG_INFINITY;
        for (k, a) in corners.iter().enumerate() {
            let b = corners[(k + 1) % 4];
            lat_lo = lat_lo.min(latitude_of(*a));
            lat_hi = lat_hi.max(latitude_of(*a));
            if let Some((lo, hi)) = edge_latitude_extrema(*a, b) {
                lat_lo = lat_lo.min(lo);
                lat_hi = lat_hi.max(hi);
            }
        }

        let holds_pole = (face == 2 || face == 5)
            && (u_lo..=u_hi).contains(&0.0)
            && (v_lo..=v_hi).contains(&0.0);
        if holds_pole {
            if face == 2 {
                lat_hi = 90.0;
            } else {
                lat_lo = -90.0;
            }
            return CellBound {
                lat_lo: (lat_lo - BOUND_EPSILON_DEG).max(-90.0),
                lat_hi: (lat_hi + BOUND_EPSILON_DEG).min(90.0),
                lng_lo: -180.0,
                lng_hi: 180.0,
                full_longitude: true,
            };
        }

        // Edges are great-circle arcs shorter than a half turn, so longitude
        // is monotonic along each one and the corners fix the range.
        let first = longitude_of(corners[0]);
        let (mut lng_lo, mut lng_hi, mut previous) = (first, first, first);
        for corner in &corners[1..] {
            let mut delta = longitude_of(*corner) - previous;
            if delta > 180.0 {
                delta -= 360.0;
            } else if delta < -180.0 {
                delta += 360.0;
            }
            previous += delta;
            lng_lo = lng_lo.min(previous);
            lng_hi = lng_hi.max(previous);
        }

        CellBound {
            lat_lo: (lat_lo - BOUND_EPSILON_DEG).max(-90.0),
            lat_hi: (lat_hi + BOUND_EPSILON_DEG).min(90.0),
            lng_lo: lng_lo - BOUND_EPSILON_DEG,
            lng_hi: lng_hi + BOUND_EPSILON_DEG,
            full_longitude: false,
        }
    }
}

/// Degree box around a cell. Longitudes are unwrapped, so `lng_lo` may fall
/// below -180 or `lng_hi` above 180 for cells straddling the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBound {
    pub lat_lo: f64,
    pub lat_hi: f64,
    pub lng_lo: f64,
    pub lng_hi: f64,
    pub full_longitude: bool,
}

fn lsb_for_level(level: u8) -> u64 {
    1u64 << (2 * u32::from(MAX_LEVEL - level))
}

fn point_to_xyz(point: GeoPoint) -> DVec3 {
    let lat = point.latitude.to_radians();
    let lng = point.longitude.to_radians();
    DVec3::new(lat.cos() * lng.cos(), lat.cos() * lng.sin(), lat.sin())
}

fn xyz_to_point(p: DVec3) -> GeoPoint {
    GeoPoint::new(latitude_of(p), longitude_of(p))
}

fn latitude_of(p: DVec3) -> f64 {
    p.z.atan2((p.x * p.x + p.y * p.y).sqrt()).to_degrees()
}

fn longitude_of(p: DVec3) -> f64 {
    p.y.atan2(p.x).to_degrees()
}

fn xyz_to_face_uv(p: DVec3) -> (u8, f64, f64) {
    let abs = p.abs();
    let mut face = if abs.x >= abs.y && abs.x >= abs.z {
        0
    } else if abs.y >= abs.z {
        1
    } else {
        2
    };
    let component = [p.x, p.y, p.z][face as usize];
    if component < 0.0 {
        face += 3;
    }
    let (u, v) = match face {
        0 => (p.y / p.x, p.z / p.x),
        1 => (-p.x / p.y, p.z / p.y),
        2 => (-p.x / p.z, -p.y / p.z),
        3 => (p.z / p.x, p.y / p.x),
        4 => (p.z / p.y, -p.x / p.y),
        _ => (-p.y / p.z, -p.x / p.z),
    };
    (face, u, v)
}

fn face_uv_to_xyz(face: u8, u: f64, v: f64) -> DVec3 {
    match face {
        0 => DVec3::new(1.0, u, v),
        1 => DVec3::new(-u, 1.0, v),
        2 => DVec3::new(-u, -v, 1.0),
        3 => DVec3::new(-1.0, -v, -u),
        4 => DVec3::new(v, -1.0, -u),
        _ => DVec3::new(v, u, -1.0),
    }
}

fn uv_to_st(u: f64) -> f64 {
    if u >= 0.0 {
        0.5 * (1.0 + 3.0 * u).sqrt()
    } else {
        1.0 - 0.5 * (1.0 - 3.0 * u).sqrt()
    }
}

fn st_to_uv(s: f64) -> f64 {
    if s >= 0.5 {
        (4.0 * s * s - 1.0) / 3.0
    } else {
        (1.0 - 4.0 * (1.0 - s) * (1.0 - s)) / 3.0
    }
}

fn st_to_ij(s: f64) -> u32 {
    let scaled = (f64::from(MAX_SIZE) * s).floor();
    scaled.clamp(0.0, f64::from(MAX_SIZE - 1)) as u32
}

/// Lowest and highest latitude reached strictly inside the arc `a -> b`,
/// if either extremum of the great circle lies on it.
fn edge_latitude_extrema(a: DVec3, b: DVec3) -> Option<(f64, f64)> {
    let n = a.cross(b);
    let n_hat = n.try_normalize()?;
    let m = (DVec3::Z - n_hat.z * n_hat).try_normalize()?;

    let on_arc = |p: DVec3| a.cross(p).dot(n) > 0.0 && p.cross(b).dot(n) > 0.0;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for p in [m, -m] {
        if on_arc(p) {
            let lat = latitude_of(p);
            lo = lo.min(lat);
            hi = hi.max(lat);
        }
    }
    (lo <= hi).then_some((lo, hi))
}
