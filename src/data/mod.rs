/// Data layer: tagged cells, loading, filtering, paging and export.
///
/// Architecture:
/// ```text
///  URL / file / bytes
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  fetch + parse delimited text → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  columns + Vec<Row>, Row = column → Value
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐      ┌──────────┐
///   │  filter   │ ──▶ │  paging   │  visible indices → current page
///   └──────────┘      └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  Table → delimited text
///   └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod paging;
