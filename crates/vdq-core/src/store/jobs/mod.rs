//! Job CRUD, split by concern: reads, lifecycle writes, and the quota
//! operations that need the write lock.

mod quota;
mod read;
mod write;
