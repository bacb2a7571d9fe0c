//! Element types and the dynamic scalar value.
//!
//! The element type of a tensor is one of a closed enumeration of eleven
//! [`Dtype`] tags, ordered by precision. [`AnyElem`] is the matching dynamic
//! scalar (one variant per tag); it is the single dispatch table through
//! which every typed read, write, and cast goes.

use std::fmt;

use num_complex::{Complex32, Complex64};
use num_traits::Zero;

/// Closed enumeration of supported element types, ordered by precision.
///
/// The derived `Ord` follows declaration order, so `Dtype::Double >
/// Dtype::Float` and complex types compare above all real types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dtype {
    Bool,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float,
    Double,
    ComplexFloat,
    ComplexDouble,
}

impl Dtype {
    /// All supported element types, in precision order.
    pub const ALL: [Dtype; 11] = [
        Dtype::Bool,
        Dtype::Int16,
        Dtype::Uint16,
        Dtype::Int32,
        Dtype::Uint32,
        Dtype::Int64,
        Dtype::Uint64,
        Dtype::Float,
        Dtype::Double,
        Dtype::ComplexFloat,
        Dtype::ComplexDouble,
    ];

    /// Check if this type has an imaginary component.
    pub fn is_complex(self) -> bool {
        matches!(self, Dtype::ComplexFloat | Dtype::ComplexDouble)
    }

    /// Check if this type is a real floating-point type.
    pub fn is_float(self) -> bool {
        matches!(self, Dtype::Float | Dtype::Double)
    }

    /// Check if this type is an integer type (bool excluded).
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Dtype::Int16 | Dtype::Uint16 | Dtype::Int32 | Dtype::Uint32 | Dtype::Int64 | Dtype::Uint64
        )
    }

    /// Human-readable type name.
    pub fn name(self) -> &'static str {
        match self {
            Dtype::Bool => "Bool",
            Dtype::Int16 => "Int16",
            Dtype::Uint16 => "Uint16",
            Dtype::Int32 => "Int32",
            Dtype::Uint32 => "Uint32",
            Dtype::Int64 => "Int64",
            Dtype::Uint64 => "Uint64",
            Dtype::Float => "Float",
            Dtype::Double => "Double",
            Dtype::ComplexFloat => "ComplexFloat",
            Dtype::ComplexDouble => "ComplexDouble",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dynamic scalar value covering the closed dtype enumeration.
///
/// Both the mandatory and soft element-read paths return `AnyElem`, and every
/// element write accepts one; the dtype switch lives here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnyElem {
    Bool(bool),
    Int16(i16),
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Float(f32),
    Double(f64),
    ComplexFloat(Complex32),
    ComplexDouble(Complex64),
}

impl AnyElem {
    /// The dtype tag of this value.
    pub fn dtype(&self) -> Dtype {
        match self {
            AnyElem::Bool(_) => Dtype::Bool,
            AnyElem::Int16(_) => Dtype::Int16,
            AnyElem::Uint16(_) => Dtype::Uint16,
            AnyElem::Int32(_) => Dtype::Int32,
            AnyElem::Uint32(_) => Dtype::Uint32,
            AnyElem::Int64(_) => Dtype::Int64,
            AnyElem::Uint64(_) => Dtype::Uint64,
            AnyElem::Float(_) => Dtype::Float,
            AnyElem::Double(_) => Dtype::Double,
            AnyElem::ComplexFloat(_) => Dtype::ComplexFloat,
            AnyElem::ComplexDouble(_) => Dtype::ComplexDouble,
        }
    }

    /// Widen to `Complex64`. Real values get a zero imaginary part.
    pub fn to_c64(self) -> Complex64 {
        match self {
            AnyElem::Bool(x) => Complex64::new(if x { 1.0 } else { 0.0 }, 0.0),
            AnyElem::Int16(x) => Complex64::new(x as f64, 0.0),
            AnyElem::Uint16(x) => Complex64::new(x as f64, 0.0),
            AnyElem::Int32(x) => Complex64::new(x as f64, 0.0),
            AnyElem::Uint32(x) => Complex64::new(x as f64, 0.0),
            AnyElem::Int64(x) => Complex64::new(x as f64, 0.0),
            AnyElem::Uint64(x) => Complex64::new(x as f64, 0.0),
            AnyElem::Float(x) => Complex64::new(x as f64, 0.0),
            AnyElem::Double(x) => Complex64::new(x, 0.0),
            AnyElem::ComplexFloat(z) => Complex64::new(z.re as f64, z.im as f64),
            AnyElem::ComplexDouble(z) => z,
        }
    }

    /// The real part as `f64` (imaginary part dropped for complex values).
    pub fn to_f64(self) -> f64 {
        self.to_c64().re
    }

    /// Check for the additive identity of the value's own dtype.
    pub fn is_zero(&self) -> bool {
        self.to_c64().is_zero()
    }

    /// Cast to another dtype under the documented lossy rule.
    ///
    /// The value is routed through `Complex64`; complex-to-real drops the
    /// imaginary part, float-to-integer truncates toward zero saturating at
    /// the target bounds, and anything nonzero maps to `true` for `Bool`.
    pub fn cast(self, dtype: Dtype) -> AnyElem {
        if self.dtype() == dtype {
            return self;
        }
        let z = self.to_c64();
        match dtype {
            Dtype::Bool => AnyElem::Bool(!z.is_zero()),
            Dtype::Int16 => AnyElem::Int16(z.re as i16),
            Dtype::Uint16 => AnyElem::Uint16(z.re as u16),
            Dtype::Int32 => AnyElem::Int32(z.re as i32),
            Dtype::Uint32 => AnyElem::Uint32(z.re as u32),
            Dtype::Int64 => AnyElem::Int64(z.re as i64),
            Dtype::Uint64 => AnyElem::Uint64(z.re as u64),
            Dtype::Float => AnyElem::Float(z.re as f32),
            Dtype::Double => AnyElem::Double(z.re),
            Dtype::ComplexFloat => AnyElem::ComplexFloat(Complex32::new(z.re as f32, z.im as f32)),
            Dtype::ComplexDouble => AnyElem::ComplexDouble(z),
        }
    }
}

impl fmt::Display for AnyElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyElem::Bool(x) => write!(f, "{}", x),
            AnyElem::Int16(x) => write!(f, "{}", x),
            AnyElem::Uint16(x) => write!(f, "{}", x),
            AnyElem::Int32(x) => write!(f, "{}", x),
            AnyElem::Uint32(x) => write!(f, "{}", x),
            AnyElem::Int64(x) => write!(f, "{}", x),
            AnyElem::Uint64(x) => write!(f, "{}", x),
            AnyElem::Float(x) => write!(f, "{}", x),
            AnyElem::Double(x) => write!(f, "{}", x),
            AnyElem::ComplexFloat(z) => write!(f, "{}", z),
            AnyElem::ComplexDouble(z) => write!(f, "{}", z),
        }
    }
}

macro_rules! impl_from_scalar {
    ($t:ty, $tag:ident) => {
        impl From<$t> for AnyElem {
            fn from(x: $t) -> Self {
                AnyElem::$tag(x)
            }
        }
    };
}

impl_from_scalar!(bool, Bool);
impl_from_scalar!(i16, Int16);
impl_from_scalar!(u16, Uint16);
impl_from_scalar!(i32, Int32);
impl_from_scalar!(u32, Uint32);
impl_from_scalar!(i64, Int64);
impl_from_scalar!(u64, Uint64);
impl_from_scalar!(f32, Float);
impl_from_scalar!(f64, Double);
impl_from_scalar!(Complex32, ComplexFloat);
impl_from_scalar!(Complex64, ComplexDouble);

/// Rust scalar types backing one dtype tag each.
///
/// The trait carries the element-wise kernels used by the block store
/// (conjugate, power, scaling, squared modulus) together with the cast rule
/// between the typed world and [`AnyElem`]. Every method is total: integer
/// and bool types route transcendental operations through `f64` and cast
/// back under the same rule as [`AnyElem::cast`].
pub trait Elem: Copy + fmt::Debug + Default + PartialEq + Send + Sync + 'static {
    /// The dtype tag of this scalar type.
    const DTYPE: Dtype;

    /// Convert from a dynamic scalar, applying the cast rule if needed.
    fn from_any(v: AnyElem) -> Self;

    /// Wrap into a dynamic scalar.
    fn to_any(self) -> AnyElem;

    /// Wrap an owned vector into the matching [`ElemVec`] variant.
    fn wrap_vec(v: Vec<Self>) -> crate::dense::ElemVec;

    /// Complex conjugate; identity for real types.
    fn conj(self) -> Self {
        self
    }

    /// Element-wise power with a real exponent.
    fn powf(self, p: f64) -> Self;

    /// Multiply by a real factor.
    fn scale(self, s: f64) -> Self;

    /// Squared modulus as `f64`.
    fn abs_sq(self) -> f64;

    /// Addition (wrapping for integer types).
    fn add(self, rhs: Self) -> Self;
}

macro_rules! impl_int_elem {
    ($t:ty, $tag:ident) => {
        impl Elem for $t {
            const DTYPE: Dtype = Dtype::$tag;

            fn from_any(v: AnyElem) -> Self {
                match v.cast(Dtype::$tag) {
                    AnyElem::$tag(x) => x,
                    _ => unreachable!("cast returned a foreign variant"),
                }
            }

            fn to_any(self) -> AnyElem {
                AnyElem::$tag(self)
            }

            fn wrap_vec(v: Vec<Self>) -> crate::dense::ElemVec {
                crate::dense::ElemVec::$tag(v)
            }

            fn powf(self, p: f64) -> Self {
                (self as f64).powf(p) as $t
            }

            fn scale(self, s: f64) -> Self {
                (self as f64 * s) as $t
            }

            fn abs_sq(self) -> f64 {
                let x = self as f64;
                x * x
            }

            fn add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }
        }
    };
}

impl_int_elem!(i16, Int16);
impl_int_elem!(u16, Uint16);
impl_int_elem!(i32, Int32);
impl_int_elem!(u32, Uint32);
impl_int_elem!(i64, Int64);
impl_int_elem!(u64, Uint64);

impl Elem for bool {
    const DTYPE: Dtype = Dtype::Bool;

    fn from_any(v: AnyElem) -> Self {
        !v.is_zero()
    }

    fn to_any(self) -> AnyElem {
        AnyElem::Bool(self)
    }

    fn wrap_vec(v: Vec<Self>) -> crate::dense::ElemVec {
        crate::dense::ElemVec::Bool(v)
    }

    fn powf(self, p: f64) -> Self {
        let x = if self { 1.0f64 } else { 0.0 };
        x.powf(p) != 0.0
    }

    fn scale(self, s: f64) -> Self {
        let x = if self { 1.0f64 } else { 0.0 };
        x * s != 0.0
    }

    fn abs_sq(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }

    fn add(self, rhs: Self) -> Self {
        self || rhs
    }
}

impl Elem for f32 {
    const DTYPE: Dtype = Dtype::Float;

    fn from_any(v: AnyElem) -> Self {
        v.to_f64() as f32
    }

    fn to_any(self) -> AnyElem {
        AnyElem::Float(self)
    }

    fn wrap_vec(v: Vec<Self>) -> crate::dense::ElemVec {
        crate::dense::ElemVec::Float(v)
    }

    fn powf(self, p: f64) -> Self {
        f32::powf(self, p as f32)
    }

    fn scale(self, s: f64) -> Self {
        self * s as f32
    }

    fn abs_sq(self) -> f64 {
        let x = self as f64;
        x * x
    }

    fn add(self, rhs: Self) -> Self {
        self + rhs
    }
}

impl Elem for f64 {
    const DTYPE: Dtype = Dtype::Double;

    fn from_any(v: AnyElem) -> Self {
        v.to_f64()
    }

    fn to_any(self) -> AnyElem {
        AnyElem::Double(self)
    }

    fn wrap_vec(v: Vec<Self>) -> crate::dense::ElemVec {
        crate::dense::ElemVec::Double(v)
    }

    fn powf(self, p: f64) -> Self {
        f64::powf(self, p)
    }

    fn scale(self, s: f64) -> Self {
        self * s
    }

    fn abs_sq(self) -> f64 {
        self * self
    }

    fn add(self, rhs: Self) -> Self {
        self + rhs
    }
}

impl Elem for Complex32 {
    const DTYPE: Dtype = Dtype::ComplexFloat;

    fn from_any(v: AnyElem) -> Self {
        let z = v.to_c64();
        Complex32::new(z.re as f32, z.im as f32)
    }

    fn to_any(self) -> AnyElem {
        AnyElem::ComplexFloat(self)
    }

    fn wrap_vec(v: Vec<Self>) -> crate::dense::ElemVec {
        crate::dense::ElemVec::ComplexFloat(v)
    }

    fn conj(self) -> Self {
        Complex32::conj(&self)
    }

    fn powf(self, p: f64) -> Self {
        Complex32::powf(self, p as f32)
    }

    fn scale(self, s: f64) -> Self {
        self * s as f32
    }

    fn abs_sq(self) -> f64 {
        self.norm_sqr() as f64
    }

    fn add(self, rhs: Self) -> Self {
        self + rhs
    }
}

impl Elem for Complex64 {
    const DTYPE: Dtype = Dtype::ComplexDouble;

    fn from_any(v: AnyElem) -> Self {
        v.to_c64()
    }

    fn to_any(self) -> AnyElem {
        AnyElem::ComplexDouble(self)
    }

    fn wrap_vec(v: Vec<Self>) -> crate::dense::ElemVec {
        crate::dense::ElemVec::ComplexDouble(v)
    }

    fn conj(self) -> Self {
        Complex64::conj(&self)
    }

    fn powf(self, p: f64) -> Self {
        Complex64::powf(self, p)
    }

    fn scale(self, s: f64) -> Self {
        self * s
    }

    fn abs_sq(self) -> f64 {
        self.norm_sqr()
    }

    fn add(self, rhs: Self) -> Self {
        self + rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_order() {
        assert!(Dtype::Bool < Dtype::Int16);
        assert!(Dtype::Double > Dtype::Float);
        assert!(Dtype::ComplexDouble > Dtype::Double);
        for pair in Dtype::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_cast_complex_to_real_drops_imag() {
        let z = AnyElem::ComplexDouble(Complex64::new(2.5, -1.0));
        assert_eq!(z.cast(Dtype::Double), AnyElem::Double(2.5));
        assert_eq!(z.cast(Dtype::Int32), AnyElem::Int32(2));
    }

    #[test]
    fn test_cast_truncates_toward_zero() {
        assert_eq!(AnyElem::Double(-2.9).cast(Dtype::Int64), AnyElem::Int64(-2));
        assert_eq!(AnyElem::Double(2.9).cast(Dtype::Int64), AnyElem::Int64(2));
        // Saturation at the target bounds
        assert_eq!(AnyElem::Double(1e9).cast(Dtype::Int16), AnyElem::Int16(i16::MAX));
        assert_eq!(AnyElem::Double(-1.0).cast(Dtype::Uint16), AnyElem::Uint16(0));
    }

    #[test]
    fn test_cast_to_bool() {
        assert_eq!(AnyElem::Double(0.0).cast(Dtype::Bool), AnyElem::Bool(false));
        assert_eq!(AnyElem::Double(-0.5).cast(Dtype::Bool), AnyElem::Bool(true));
        // Purely imaginary is still nonzero
        let z = AnyElem::ComplexDouble(Complex64::new(0.0, 3.0));
        assert_eq!(z.cast(Dtype::Bool), AnyElem::Bool(true));
    }

    #[test]
    fn test_cast_same_dtype_identity() {
        let x = AnyElem::Float(1.5);
        assert_eq!(x.cast(Dtype::Float), x);
    }

    #[test]
    fn test_elem_round_trip() {
        let x: i32 = Elem::from_any(AnyElem::Int32(-7));
        assert_eq!(x, -7);
        assert_eq!(x.to_any(), AnyElem::Int32(-7));
        let z: Complex64 = Elem::from_any(AnyElem::Double(2.0));
        assert_eq!(z, Complex64::new(2.0, 0.0));
    }
}
