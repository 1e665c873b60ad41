use super::MemberRef;
use crate::jvm::class_file::HandleKind;

/// Constant which can be pushed with `ldc`, stored in a `ConstantValue`, or passed to a bootstrap
/// method
#[derive(Clone, Debug)]
pub enum LoadableConstant {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),

    /// Internal name of a class, or an array descriptor
    Class(String),

    /// Method descriptor
    MethodType(String),
    MethodHandle(Handle),
}

impl LoadableConstant {
    /// `long` and `double` constants need `ldc2_w` and take two stack slots
    pub fn is_wide(&self) -> bool {
        matches!(self, LoadableConstant::Long(_) | LoadableConstant::Double(_))
    }
}

/// Floating point constants are compared by bit pattern, so that a `NaN` in the input compares
/// equal to itself after a round trip.
impl PartialEq for LoadableConstant {
    fn eq(&self, other: &Self) -> bool {
        use LoadableConstant::*;
        match (self, other) {
            (Integer(i1), Integer(i2)) => i1 == i2,
            (Float(f1), Float(f2)) => f1.to_bits() == f2.to_bits(),
            (Long(l1), Long(l2)) => l1 == l2,
            (Double(d1), Double(d2)) => d1.to_bits() == d2.to_bits(),
            (String(s1), String(s2)) => s1 == s2,
            (Class(c1), Class(c2)) => c1 == c2,
            (MethodType(m1), MethodType(m2)) => m1 == m2,
            (MethodHandle(h1), MethodHandle(h2)) => h1 == h2,
            _ => false,
        }
    }
}

/// Method handle constant
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    pub kind: HandleKind,
    pub member: MemberRef,

    /// Does `member` refer to an interface method?
    pub is_interface: bool,
}
