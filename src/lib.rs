//! # hitokoto
//!
//! Fetch short quotes ("hitokoto") from the public API or from a local,
//! integrity-checked copy of the sentence bundle.
//!
//! The local bundle is downloaded category by category from three mirrors
//! with per-category failover, stored as flat JSON files, and served through
//! a rebuildable line-oriented index.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌────────────┐   ┌──────────────────┐
//! │  Mirrors    │──▶│ Downloader │──▶│ bundle/          │
//! │ of/gh/jsd   │   │ + Fetcher  │   │ a..l.json        │
//! └─────────────┘   └────────────┘   │ index.jsonl      │
//!                                    │ package-info.json│
//!                                    └────────┬─────────┘
//!                        ┌────────────────────┼───────────────┐
//!                        ▼                    ▼               ▼
//!                  ┌──────────┐        ┌───────────┐    ┌──────────┐
//!                  │  Query   │        │ Integrity │    │  Export  │
//!                  └──────────┘        └───────────┘    └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! hitokoto bundle get gh        # download the bundle
//! hitokoto -t d -f              # random literature quote with attribution
//! hitokoto -i 1                 # exact lookup by id
//! hitokoto export 20 -p out/    # 20 random quotes to out/hitokoto.txt
//! hitokoto --api cn             # ask the online API instead
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`sources`] | Bundle mirrors and their try order |
//! | [`http`] | Blocking HTTP seam |
//! | [`fetch`] | Download one category file from one mirror |
//! | [`download`] | Per-category failover across mirrors |
//! | [`index`] | `index.jsonl` rebuild and loading |
//! | [`integrity`] | Metadata vs. files vs. index check |
//! | [`query`] | Lookup by id/uuid, filtered random pick |
//! | [`export`] | Bulk export to a text file |
//! | [`format`] | Text and JSON rendering |
//! | [`bundle`] | On-disk layout and package metadata |
//! | [`api`] | Remote hitokoto API client |
//! | [`progress`] | User-facing progress reporting |
//! | [`stats`] | Bundle summary |
//! | [`config`] | TOML configuration |
//! | [`error`] | Error types |

pub mod api;
pub mod bundle;
pub mod config;
pub mod download;
pub mod error;
pub mod export;
pub mod fetch;
pub mod format;
pub mod http;
pub mod index;
pub mod integrity;
pub mod models;
pub mod progress;
pub mod query;
pub mod sources;
pub mod stats;
