pub mod async_task;

pub mod convert;

pub mod fs;
