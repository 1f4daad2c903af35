pub mod claim;
pub mod denormalize;
pub mod uri;
