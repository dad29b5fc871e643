use accessgate_core::AccountId;

/// A protected resource sitting behind a [`Gateway`](crate::Gateway).
///
/// Implementations contain no authorization logic. They receive the full,
/// unmodified encoded call (selector included) and the original caller, exactly
/// as if called directly.
pub trait Resource {
    type Error: core::fmt::Debug;

    fn invoke(&mut self, caller: AccountId, call: &[u8]) -> Result<Vec<u8>, Self::Error>;
}

impl<R> Resource for &mut R
where
    R: Resource + ?Sized,
{
    type Error = R::Error;

    fn invoke(&mut self, caller: AccountId, call: &[u8]) -> Result<Vec<u8>, Self::Error> {
        (**self).invoke(caller, call)
    }
}
