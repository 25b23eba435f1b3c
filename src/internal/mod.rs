//! Internal implementation details.

pub(crate) mod dispose_bag;
pub(crate) mod trail;

pub(crate) use dispose_bag::DisposeBag;
pub(crate) use trail::CreationTrail;
