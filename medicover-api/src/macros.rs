/// Builder-style setters for request query structs.
///
/// `setter!(opt field: Ty)` takes a value or an `Option` of one (so optional
/// filters pass straight through), and `setter!(each field: Ty)` extends a
/// collection field.
macro_rules! setter {
    (opt $field:ident : $ty:ty) => {
        pub fn $field<T>(mut self, $field: T) -> Self
        where
            T: Into<std::option::Option<$ty>>,
        {
            self.$field = $field.into();
            self
        }
    };

    (each $field:ident : $ty:ty) => {
        pub fn $field<I>(mut self, $field: I) -> Self
        where
            I: IntoIterator<Item = $ty>,
        {
            self.$field.extend($field);
            self
        }
    };
}

pub(crate) use setter;
