pub mod id;
pub mod model;

pub use id::RecordId;
pub use model::Record;
