pub(crate) mod admin;
pub(crate) mod checkpoints;
pub(crate) mod runs;
