//! Query execution context.

use crate::error::Result;
use crate::query::SelectQuery;
use crate::value::Value;

/// Something that can run a [`SelectQuery`] and hand back its rows.
///
/// Each returned row has one value per projection, in projection order.
/// Transactions and commits stay with whoever owns the session.
pub trait Session {
    fn fetch(&self, query: &SelectQuery) -> Result<Vec<Vec<Value>>>;
}

impl<S: Session + ?Sized> Session for &S {
    fn fetch(&self, query: &SelectQuery) -> Result<Vec<Vec<Value>>> {
        (**self).fetch(query)
    }
}
