pub mod archiver;
pub mod backend;
pub mod filename;
pub mod ledger;
pub mod normalize;
pub mod track;
pub mod video;

pub use archiver::*;
pub use normalize::*;
