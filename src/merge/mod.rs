//! Three-way merge algorithms: structured documents (§4.1), templated text
//! (§4.2), and applying a completed [`crate::model::conflict::ConflictReport`]'s
//! resolutions back onto merged output (§4.4).

pub mod resolve;
pub mod structured;
pub mod templated;

#[cfg(all(test, feature = "proptests"))]
mod structured_properties;
