mod growth;
mod into_iter;
mod lifecycle;
mod storage;
mod vec;

pub use into_iter::IntoIter;
pub use vec::Vec;
