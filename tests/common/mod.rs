
pub use heapdb::common::logger::initialize_logger;
