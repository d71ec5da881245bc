//! Fetch Adapter - 参考音频下载

mod http_fetcher;

pub use http_fetcher::{HttpAudioFetcher, HttpAudioFetcherConfig};
