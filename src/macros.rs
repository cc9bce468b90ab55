/// Declares a field-less enum over an ELF integer with an `Other` catch-all, so that
/// decoding never fails on values this crate doesn't know about.
macro_rules! elf_enum {
    {
        $(#[$meta: meta])*
        pub enum $enum: ident: $int: ty {
            $(
                $(#[$variant_meta: meta])*
                $name: ident = $value: literal,
            )*
        }
    } => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        pub enum $enum {
            $(
                $(#[$variant_meta])*
                $name,
            )*
            /// Any other value.
            Other($int),
        }

        impl $enum {
            /// Numeric value as stored in the file.
            pub const fn as_number(self) -> $int {
                match self {
                    $( Self::$name => $value, )*
                    Self::Other(n) => n,
                }
            }
        }

        impl From<$int> for $enum {
            fn from(n: $int) -> Self {
                match n {
                    $( $value => Self::$name, )*
                    n => Self::Other(n),
                }
            }
        }

        #[cfg(test)]
        impl<'a> ::arbitrary::Arbitrary<'a> for $enum {
            fn arbitrary(u: &mut ::arbitrary::Unstructured<'a>) -> ::arbitrary::Result<Self> {
                Ok(Self::from(u.arbitrary::<$int>()?))
            }
        }
    };
}

pub(crate) use elf_enum;
