pub(crate) mod backend;
pub(crate) mod behaviors;
pub(crate) mod bootstrap;
pub(crate) mod director;
pub(crate) mod layout;
