use env_logger::Builder;
use log::LevelFilter;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn initialize_logger() {
    INIT.call_once(|| {
        let mut builder = Builder::new();

        builder
            .filter_level(LevelFilter::Info)
            .filter_module("heapdb", LevelFilter::Debug)
            .filter_module("heapdb::buffer", LevelFilter::Debug)
            .filter_module("heapdb::concurrency", LevelFilter::Debug)
            .filter_module("heapdb::recovery", LevelFilter::Info)
            .format_timestamp_millis()
            .parse_default_env()
            .init();
    });
}
