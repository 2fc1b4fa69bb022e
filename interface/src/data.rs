use std::{
    fmt::{self, Debug},
    marker::PhantomData,
    ops::Deref,
    sync::Arc,
};

use super::{UniqueIdentifier, Value};

/// Field data wrapper
///
/// `U` is the data unique identifier (UID).
pub struct Data<U: UniqueIdentifier>(Arc<<U as UniqueIdentifier>::DataType>, PhantomData<U>);
impl<T, U: UniqueIdentifier<DataType = T>> Deref for Data<U> {
    type Target = T;
    /// Returns a reference to the data
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T, U: UniqueIdentifier<DataType = T>> Clone for Data<U> {
    /// Makes a clone of the inner `Arc` pointer, returning a new instance of `Data<U>` with the cloned [Arc] within
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0), PhantomData)
    }
}

impl<T, U: UniqueIdentifier<DataType = T>> Data<U> {
    /// Moves `data` into an `Arc` pointer and places into `Data<U>`
    pub fn new(data: T) -> Self {
        Data(Arc::new(data), PhantomData)
    }
    /// Returns the name of the field the data is published to
    #[inline]
    pub fn field(&self) -> &'static str {
        U::FIELD
    }
}

impl<T, U: UniqueIdentifier<DataType = Vec<T>>> From<Vec<T>> for Data<U> {
    fn from(u: Vec<T>) -> Self {
        Data(Arc::new(u), PhantomData)
    }
}
impl<'a, T: Clone, U: UniqueIdentifier<DataType = Vec<T>>> From<&'a [T]> for Data<U> {
    fn from(u: &'a [T]) -> Self {
        Data(Arc::new(u.to_vec()), PhantomData)
    }
}

impl<T, U> From<Data<U>> for Value
where
    T: Clone + Into<Value>,
    U: UniqueIdentifier<DataType = T>,
{
    fn from(data: Data<U>) -> Self {
        match Arc::try_unwrap(data.0) {
            Ok(inner) => inner.into(),
            Err(shared) => (*shared).clone().into(),
        }
    }
}

impl<T, U> fmt::Debug for Data<U>
where
    T: fmt::Debug,
    U: UniqueIdentifier<DataType = T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Data")
            .field(&U::FIELD)
            .field(&self.0)
            .finish()
    }
}

impl<T, U> PartialEq for Data<U>
where
    T: PartialEq,
    U: UniqueIdentifier<DataType = T>,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
