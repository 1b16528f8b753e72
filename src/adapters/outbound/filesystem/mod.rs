/// Filesystem adapters for manifests, artifacts and the metadata cache
mod disk_cache;
mod file_reader;
mod file_writer;

pub use disk_cache::DiskCache;
pub use file_reader::FileSystemReader;
pub use file_writer::FileSystemWriter;
