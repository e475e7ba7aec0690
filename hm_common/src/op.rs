//! Arithmetic operator boilerplate for newtypes over a numeric field.
//!
//! * `arith` implements a binary operator together with its compound-assignment form.
//! * `scalar` implements a binary operator with a bare number on the right-hand side.
//! * `unary` implements a prefix operator.
#[macro_export]
macro_rules! op {
    (arith $for_struct:ident, $op_trait:ident :: $op_fn:ident, $assign_trait:ident :: $assign_fn:ident) => {
        impl $op_trait for $for_struct {
            type Output = Self;

            fn $op_fn(self, rhs: Self) -> Self::Output {
                Self($op_trait::$op_fn(self.0, rhs.0))
            }
        }

        impl $assign_trait for $for_struct {
            fn $assign_fn(&mut self, rhs: Self) {
                $assign_trait::$assign_fn(&mut self.0, rhs.0)
            }
        }
    };

    (scalar $for_struct:ident, $scalar:ty, $op_trait:ident :: $op_fn:ident) => {
        impl $op_trait<$scalar> for $for_struct {
            type Output = Self;

            fn $op_fn(self, rhs: $scalar) -> Self::Output {
                Self($op_trait::$op_fn(self.0, rhs))
            }
        }
    };

    (unary $for_struct:ident, $op_trait:ident :: $op_fn:ident) => {
        impl $op_trait for $for_struct {
            type Output = Self;

            fn $op_fn(self) -> Self::Output {
                Self($op_trait::$op_fn(self.0))
            }
        }
    };
}
