pub mod phlpost;

pub use phlpost::PhlpostClient;
