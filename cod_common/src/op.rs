/// Implements integer arithmetic for a single-field newtype by forwarding to the inner value.
///
/// ```ignore
/// newtype_ops!(Cents { binary: [Add add, Sub sub], assign: [AddAssign add_assign], unary: [Neg neg] });
/// ```
#[macro_export]
macro_rules! newtype_ops {
    (
        $name:ident {
            binary: [$($bin_trait:ident $bin_fn:ident),* $(,)?],
            assign: [$($asg_trait:ident $asg_fn:ident),* $(,)?],
            unary: [$($un_trait:ident $un_fn:ident),* $(,)?] $(,)?
        }
    ) => {
        $(
            impl $bin_trait for $name {
                type Output = Self;

                fn $bin_fn(self, rhs: Self) -> Self {
                    Self($bin_trait::$bin_fn(self.0, rhs.0))
                }
            }
        )*
        $(
            impl $asg_trait for $name {
                fn $asg_fn(&mut self, rhs: Self) {
                    $asg_trait::$asg_fn(&mut self.0, rhs.0)
                }
            }
        )*
        $(
            impl $un_trait for $name {
                type Output = Self;

                fn $un_fn(self) -> Self {
                    Self($un_trait::$un_fn(self.0))
                }
            }
        )*
    };
}
