pub mod feedback;
pub mod record;
