/// Data layer: energy series, file loading, and the multi-file reader.
///
/// Architecture:
/// ```text
///  .en + .info / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse one file → EnergySeries
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  reader   │  Vec<Arc<EnergySeries>>, same quantities everywhere,
///   └──────────┘  swap in a re-read last file
///        │
///        ▼
///   statistics / overlay
/// ```

pub mod loader;
pub mod model;
pub mod reader;
